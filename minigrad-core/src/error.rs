use crate::autograd::NodeId;
use thiserror::Error;

/// Custom error type for the Minigrad autodiff core.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum MinigradError {
    #[error("Argument index {index} out of range for {len} values")]
    ArgumentOutOfRange { index: usize, len: usize },

    #[error("Finite-difference epsilon must be positive and finite, got {0}")]
    InvalidEpsilon(f64),

    #[error("Cycle detected in the computation graph at node {node}")]
    CycleDetected { node: NodeId },

    #[error("No derivative was accumulated for node {node} during backward pass")]
    MissingDerivative { node: NodeId },

    #[error("Cannot accumulate a derivative on non-leaf node {node}")]
    NotALeaf { node: NodeId },

    #[error("Backward of '{function}' returned {actual} derivatives, but expected {expected}")]
    GradientCountMismatch {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Function '{function}' takes {expected} inputs, got {actual}")]
    ArityMismatch {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Function '{function}' was applied to no inputs")]
    EmptyInputs { function: &'static str },

    #[error("Backward of '{function}' expected {expected} saved values, found {actual}")]
    MissingSavedValues {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Operation inputs were numbered by different id generators")]
    MixedIdGenerators,
}
