use crate::autograd::Context;
use crate::error::MinigradError;
use crate::scalar::{History, Scalar};
use log::trace;
use std::fmt::Debug;
use std::sync::Arc;

/// A differentiable function of scalars.
///
/// `forward` computes the result from plain values and may stash whatever
/// its backward needs in `ctx`. `backward` receives the same context (read
/// only) and the derivative of the output, and returns one derivative per
/// input, in input order.
pub trait ScalarFunction: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of inputs the function takes.
    fn arity(&self) -> usize;

    fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64;

    fn backward(&self, ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError>;
}

/// Runs `function` on `inputs` and links the result into the graph.
///
/// The context is created with `no_grad` set when no input requires grad; in
/// that case the result is a constant and carries no history.
///
/// # Errors
/// * `MinigradError::ArityMismatch` if the number of inputs is wrong.
/// * `MinigradError::EmptyInputs` if `inputs` is empty.
/// * `MinigradError::MixedIdGenerators` if the inputs were numbered by
///   different generators.
pub fn apply(
    function: Arc<dyn ScalarFunction>,
    inputs: &[&Scalar],
) -> Result<Scalar, MinigradError> {
    if inputs.len() != function.arity() {
        return Err(MinigradError::ArityMismatch {
            function: function.name(),
            expected: function.arity(),
            actual: inputs.len(),
        });
    }
    let first = inputs.first().ok_or(MinigradError::EmptyInputs {
        function: function.name(),
    })?;
    let ids = Arc::clone(&first.read_data().ids);
    if !inputs.iter().all(|s| s.same_generator(&ids)) {
        return Err(MinigradError::MixedIdGenerators);
    }

    let values: Vec<f64> = inputs.iter().map(|s| s.value()).collect();
    let need_grad = inputs.iter().any(|s| s.requires_grad());

    let mut ctx = Context::with_no_grad(!need_grad);
    let value = function.forward(&mut ctx, &values);
    trace!("apply: {}({:?}) = {}", function.name(), values, value);

    let history = if need_grad {
        Some(History {
            last_fn: Some(function),
            ctx,
            inputs: inputs.iter().map(|s| (*s).clone()).collect(),
        })
    } else {
        None
    };
    Ok(Scalar::from_parts(value, history, &ids))
}

/// Reads exactly `N` saved values back from `ctx`.
fn saved<const N: usize>(
    ctx: &Context<f64>,
    function: &'static str,
) -> Result<[f64; N], MinigradError> {
    <[f64; N]>::try_from(ctx.saved_values()).map_err(|_| MinigradError::MissingSavedValues {
        function,
        expected: N,
        actual: ctx.saved_values().len(),
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddFunction;

impl ScalarFunction for AddFunction {
    fn name(&self) -> &'static str {
        "add"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, _ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        inputs[0] + inputs[1]
    }

    fn backward(&self, _ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        Ok(vec![d_output, d_output])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MulFunction;

impl ScalarFunction for MulFunction {
    fn name(&self) -> &'static str {
        "mul"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        ctx.save_for_backward([inputs[0], inputs[1]]);
        inputs[0] * inputs[1]
    }

    fn backward(&self, ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        let [a, b] = saved::<2>(ctx, self.name())?;
        Ok(vec![d_output * b, d_output * a])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NegFunction;

impl ScalarFunction for NegFunction {
    fn name(&self) -> &'static str {
        "neg"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, _ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        -inputs[0]
    }

    fn backward(&self, _ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        Ok(vec![-d_output])
    }
}

/// `1 / a`
#[derive(Debug, Clone, Copy, Default)]
pub struct InvFunction;

impl ScalarFunction for InvFunction {
    fn name(&self) -> &'static str {
        "inv"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        ctx.save_for_backward([inputs[0]]);
        1.0 / inputs[0]
    }

    fn backward(&self, ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        let [a] = saved::<1>(ctx, self.name())?;
        Ok(vec![-d_output / (a * a)])
    }
}

/// Natural logarithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFunction;

impl ScalarFunction for LogFunction {
    fn name(&self) -> &'static str {
        "log"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        ctx.save_for_backward([inputs[0]]);
        inputs[0].ln()
    }

    fn backward(&self, ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        let [a] = saved::<1>(ctx, self.name())?;
        Ok(vec![d_output / a])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpFunction;

impl ScalarFunction for ExpFunction {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        let out = inputs[0].exp();
        ctx.save_for_backward([out]);
        out
    }

    fn backward(&self, ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        let [out] = saved::<1>(ctx, self.name())?;
        Ok(vec![d_output * out])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SigmoidFunction;

impl SigmoidFunction {
    /// Avoids `exp` overflow for large negative inputs.
    fn sigmoid(x: f64) -> f64 {
        if x >= 0.0 {
            1.0 / (1.0 + (-x).exp())
        } else {
            let e = x.exp();
            e / (1.0 + e)
        }
    }
}

impl ScalarFunction for SigmoidFunction {
    fn name(&self) -> &'static str {
        "sigmoid"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        let out = Self::sigmoid(inputs[0]);
        ctx.save_for_backward([out]);
        out
    }

    fn backward(&self, ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        let [s] = saved::<1>(ctx, self.name())?;
        Ok(vec![d_output * s * (1.0 - s)])
    }
}

/// `max(a, 0)`. The derivative at `0` is taken as `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReluFunction;

impl ScalarFunction for ReluFunction {
    fn name(&self) -> &'static str {
        "relu"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        ctx.save_for_backward([inputs[0]]);
        if inputs[0] > 0.0 {
            inputs[0]
        } else {
            0.0
        }
    }

    fn backward(&self, ctx: &Context<f64>, d_output: f64) -> Result<Vec<f64>, MinigradError> {
        let [a] = saved::<1>(ctx, self.name())?;
        Ok(vec![if a > 0.0 { d_output } else { 0.0 }])
    }
}

/// `1.0` if `a < b`, else `0.0`. Not differentiable: both derivatives are 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct LtFunction;

impl ScalarFunction for LtFunction {
    fn name(&self) -> &'static str {
        "lt"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, _ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        if inputs[0] < inputs[1] {
            1.0
        } else {
            0.0
        }
    }

    fn backward(&self, _ctx: &Context<f64>, _d_output: f64) -> Result<Vec<f64>, MinigradError> {
        Ok(vec![0.0, 0.0])
    }
}

/// `1.0` if `a == b`, else `0.0`. Both derivatives are 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqFunction;

impl ScalarFunction for EqFunction {
    fn name(&self) -> &'static str {
        "eq"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, _ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
        if inputs[0] == inputs[1] {
            1.0
        } else {
            0.0
        }
    }

    fn backward(&self, _ctx: &Context<f64>, _d_output: f64) -> Result<Vec<f64>, MinigradError> {
        Ok(vec![0.0, 0.0])
    }
}

#[cfg(test)]
#[path = "functions_test.rs"]
mod tests;
