// src/scalar/mod.rs

use crate::autograd::{backpropagate, Context, IdGenerator, NodeId, Variable};
use crate::error::MinigradError;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

mod functions;
pub mod ops;

pub use functions::{
    apply, AddFunction, EqFunction, ExpFunction, InvFunction, LogFunction, LtFunction,
    MulFunction, NegFunction, ReluFunction, ScalarFunction, SigmoidFunction,
};
pub use ops::{
    add_op, div_op, eq_op, exp_op, gt_op, inv_op, log_op, lt_op, mul_op, neg_op, relu_op,
    sigmoid_op, sub_op,
};

/// How a scalar came to be.
///
/// A leaf has a history without a function; a computed scalar remembers the
/// function, the context its forward filled, and the inputs it was called
/// with.
pub(crate) struct History {
    pub(crate) last_fn: Option<Arc<dyn ScalarFunction>>,
    pub(crate) ctx: Context<f64>,
    pub(crate) inputs: Vec<Scalar>,
}

/// Internal storage of a [`Scalar`].
pub(crate) struct ScalarData {
    pub(crate) id: NodeId,
    pub(crate) value: f64,
    pub(crate) derivative: Option<f64>,
    /// `None` for constants.
    pub(crate) history: Option<History>,
    pub(crate) ids: Arc<IdGenerator>,
}

// Unlinks inputs iteratively. The default drop recurses once per node and
// overflows the stack on long chains.
impl Drop for ScalarData {
    fn drop(&mut self) {
        let mut pending: Vec<Scalar> = match self.history.as_mut() {
            Some(history) => std::mem::take(&mut history.inputs),
            None => return,
        };
        while let Some(scalar) = pending.pop() {
            // Only the last handle to a node may take its inputs.
            if let Ok(lock) = Arc::try_unwrap(scalar.data) {
                let mut data = lock.into_inner().unwrap_or_else(PoisonError::into_inner);
                if let Some(history) = data.history.as_mut() {
                    pending.append(&mut history.inputs);
                }
            }
        }
    }
}

/// A differentiable floating-point value.
///
/// `Scalar` uses `Arc<RwLock<ScalarData>>` internally: clones share the same
/// node, so the derivative accumulated on a leaf is visible through every
/// handle to it.
///
/// Three kinds exist:
/// * leaves, created with [`Scalar::new`], which receive derivatives;
/// * constants, created with [`Scalar::constant`] or [`Scalar::detach`],
///   which are ignored by backward;
/// * computed scalars, returned by the functions in [`ops`] when at least one
///   input requires grad. Results computed only from constants are
///   constants themselves.
#[derive(Clone)]
pub struct Scalar {
    pub(crate) data: Arc<RwLock<ScalarData>>,
}

impl Scalar {
    /// Creates a leaf scalar numbered by `ids`.
    pub fn new(value: f64, ids: &Arc<IdGenerator>) -> Self {
        let history = History {
            last_fn: None,
            ctx: Context::new(),
            inputs: Vec::new(),
        };
        Self::from_parts(value, Some(history), ids)
    }

    /// Creates a scalar excluded from differentiation.
    pub fn constant(value: f64, ids: &Arc<IdGenerator>) -> Self {
        Self::from_parts(value, None, ids)
    }

    pub(crate) fn from_parts(value: f64, history: Option<History>, ids: &Arc<IdGenerator>) -> Self {
        Scalar {
            data: Arc::new(RwLock::new(ScalarData {
                id: ids.next_id(),
                value,
                derivative: None,
                history,
                ids: Arc::clone(ids),
            })),
        }
    }

    pub(crate) fn read_data(&self) -> std::sync::RwLockReadGuard<'_, ScalarData> {
        self.data.read().expect("RwLock poisoned")
    }

    pub(crate) fn write_data(&self) -> std::sync::RwLockWriteGuard<'_, ScalarData> {
        self.data.write().expect("RwLock poisoned")
    }

    pub fn id(&self) -> NodeId {
        self.read_data().id
    }

    pub fn value(&self) -> f64 {
        self.read_data().value
    }

    /// Derivative accumulated so far, `None` if nothing was delivered yet.
    pub fn derivative(&self) -> Option<f64> {
        self.read_data().derivative
    }

    /// Clears the accumulated derivative.
    pub fn zero_grad(&self) {
        self.write_data().derivative = None;
    }

    /// True for leaves and computed scalars.
    pub fn requires_grad(&self) -> bool {
        self.read_data().history.is_some()
    }

    /// Returns a constant with the same value, cut off from the graph.
    pub fn detach(&self) -> Scalar {
        let guard = self.read_data();
        Scalar::from_parts(guard.value, None, &guard.ids)
    }

    /// Back-propagates from this scalar.
    ///
    /// `d_output` defaults to `1.0`. Derivatives are added to the leaves'
    /// existing values; call [`Scalar::zero_grad`] on them to start over.
    pub fn backward(&self, d_output: Option<f64>) -> Result<(), MinigradError> {
        backpropagate(self, d_output.unwrap_or(1.0))
    }

    /// Name of the function that produced this scalar, if any.
    pub fn function_name(&self) -> Option<&'static str> {
        self.read_data()
            .history
            .as_ref()
            .and_then(|h| h.last_fn.as_ref())
            .map(|f| f.name())
    }

    pub(crate) fn same_generator(&self, ids: &Arc<IdGenerator>) -> bool {
        Arc::ptr_eq(&self.read_data().ids, ids)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.read_data();
        f.debug_struct("Scalar")
            .field("id", &guard.id)
            .field("value", &guard.value)
            .field("derivative", &guard.derivative)
            .finish()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", self.value())
    }
}

impl Variable for Scalar {
    type Grad = f64;
    type Error = MinigradError;

    fn node_id(&self) -> NodeId {
        self.id()
    }

    fn is_leaf(&self) -> bool {
        matches!(&self.read_data().history, Some(h) if h.last_fn.is_none())
    }

    fn is_constant(&self) -> bool {
        self.read_data().history.is_none()
    }

    fn parents(&self) -> Vec<Scalar> {
        match &self.read_data().history {
            Some(history) => history.inputs.clone(),
            None => Vec::new(),
        }
    }

    fn chain_rule(&self, d_output: &f64) -> Result<Vec<(Scalar, f64)>, MinigradError> {
        let guard = self.read_data();
        let history = match &guard.history {
            Some(history) => history,
            None => return Ok(Vec::new()),
        };
        let function = match &history.last_fn {
            Some(function) => function,
            None => return Ok(Vec::new()),
        };

        let derivatives = function.backward(&history.ctx, *d_output)?;
        if derivatives.len() != history.inputs.len() {
            return Err(MinigradError::GradientCountMismatch {
                function: function.name(),
                expected: history.inputs.len(),
                actual: derivatives.len(),
            });
        }
        Ok(history
            .inputs
            .iter()
            .zip(derivatives)
            .filter(|(input, _)| !input.is_constant())
            .map(|(input, d)| (input.clone(), d))
            .collect())
    }

    fn accumulate_derivative(&self, d: f64) -> Result<(), MinigradError> {
        let mut guard = self.write_data();
        let is_leaf = matches!(&guard.history, Some(h) if h.last_fn.is_none());
        if !is_leaf {
            return Err(MinigradError::NotALeaf { node: guard.id });
        }
        guard.derivative = Some(guard.derivative.unwrap_or(0.0) + d);
        Ok(())
    }
}

#[cfg(test)]
#[path = "scalar_test.rs"]
mod tests;
