pub mod backward;
pub mod context;
pub mod grad_check;
pub mod graph;
pub mod node_id;

#[cfg(test)]
pub(crate) mod mock_node;

pub use backward::backpropagate;
pub use context::Context;
pub use grad_check::{
    approximate_partial, approximate_partial_with, check_grad, try_approximate_partial,
    FiniteDifference, GradCheckConfig, GradCheckError, DEFAULT_EPSILON,
};
pub use graph::topological_sort;
pub use node_id::{IdGenerator, NodeId};

use crate::error::MinigradError;
use std::ops::AddAssign;

/// Capability every node of a computation graph must provide to take part in
/// the backward pass.
///
/// Concrete node types (leaf inputs, constants, results of operations) are
/// supplied by the layer that builds the graph. The algorithms in this module
/// only ever talk to nodes through this trait.
///
/// Implementors are expected to be cheap handles (`Clone` shares the node, it
/// does not copy it), in the same way a `Scalar` wraps an `Arc`.
pub trait Variable: Clone {
    /// Type of the derivative flowing through the graph.
    type Grad: Clone + AddAssign;

    /// Error type of the node implementation. Errors raised by the core
    /// algorithms are converted into it, errors raised by `chain_rule` or
    /// `accumulate_derivative` are returned unchanged.
    type Error: From<MinigradError>;

    /// Stable identity of this node, assigned once at creation.
    ///
    /// Used as the only key for visited-tracking and derivative accumulation.
    fn node_id(&self) -> NodeId;

    /// True for independent inputs which receive derivatives directly.
    /// Leaves have no parents.
    fn is_leaf(&self) -> bool;

    /// True for nodes excluded from differentiation. Constants are never
    /// visited and never receive or produce a derivative.
    fn is_constant(&self) -> bool;

    /// The nodes this node was computed from, in the order the operation
    /// received them. Empty for leaves and constants.
    ///
    /// The order must be stable: it drives traversal order and therefore the
    /// floating-point summation order of accumulated derivatives.
    fn parents(&self) -> Vec<Self>;

    /// Applies the chain rule locally.
    ///
    /// Given the derivative of the final output with respect to this node
    /// (`d_output`), returns one `(parent, contribution)` pair per parent
    /// contribution. A parent may appear zero, one or several times; repeated
    /// entries are summed by the caller.
    fn chain_rule(&self, d_output: &Self::Grad) -> Result<Vec<(Self, Self::Grad)>, Self::Error>;

    /// Adds `d` to the derivative stored on a leaf.
    ///
    /// Derivatives accumulate across separate backward passes until the owner
    /// of the leaf resets them.
    fn accumulate_derivative(&self, d: Self::Grad) -> Result<(), Self::Error>;
}
