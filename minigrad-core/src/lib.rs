//! Reverse-mode automatic differentiation core.
//!
//! The [`autograd`] module holds the graph algorithms (topological ordering,
//! backpropagation, finite differences, forward/backward context). The
//! [`scalar`] module provides a concrete node type and differentiable
//! functions built on top of it.

pub mod autograd;
pub mod scalar;
pub mod utils;

pub mod error;
pub use error::MinigradError;

pub use autograd::{backpropagate, topological_sort, Context, IdGenerator, NodeId, Variable};
pub use scalar::Scalar;
// Re-export traits required by public functions
pub use num_traits;
