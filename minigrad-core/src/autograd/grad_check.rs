use crate::autograd::IdGenerator;
use crate::error::MinigradError;
use crate::scalar::Scalar;
use approx::relative_eq;
use log::{debug, warn};
use num_traits::Float;
use std::sync::Arc;
use thiserror::Error;

/// Perturbation used when the caller has no better choice.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Finite-difference formula used to estimate a partial derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FiniteDifference {
    /// `(f(x + eps) - f(x)) / eps`
    #[default]
    Forward,
    /// `(f(x + eps) - f(x - eps)) / (2 * eps)`
    Central,
}

/// Estimates the partial derivative of `f` with respect to `values[arg]`.
///
/// Uses the one-sided forward difference `(f(x + eps) - f(x)) / eps`. Only a
/// private copy of `values` is perturbed. Use [`approximate_partial_with`]
/// for the central formula.
///
/// # Errors
/// * `MinigradError::ArgumentOutOfRange` if `arg >= values.len()`.
/// * `MinigradError::InvalidEpsilon` if `epsilon` is not positive and finite.
///
/// # Example
/// ```
/// use minigrad_core::autograd::{approximate_partial, DEFAULT_EPSILON};
///
/// let d = approximate_partial(|v: &[f64]| v[0] * v[0], &[3.0], 0, DEFAULT_EPSILON).unwrap();
/// assert!((d - 6.0).abs() < 1e-4);
/// ```
pub fn approximate_partial<T, F>(
    f: F,
    values: &[T],
    arg: usize,
    epsilon: T,
) -> Result<T, MinigradError>
where
    T: Float,
    F: Fn(&[T]) -> T,
{
    approximate_partial_with(FiniteDifference::Forward, f, values, arg, epsilon)
}

/// Same as [`approximate_partial`] with an explicit difference scheme.
pub fn approximate_partial_with<T, F>(
    scheme: FiniteDifference,
    f: F,
    values: &[T],
    arg: usize,
    epsilon: T,
) -> Result<T, MinigradError>
where
    T: Float,
    F: Fn(&[T]) -> T,
{
    try_approximate_partial(scheme, |v: &[T]| Ok::<T, MinigradError>(f(v)), values, arg, epsilon)
}

/// Fallible variant: errors returned by `f` are passed through unchanged.
pub fn try_approximate_partial<T, E, F>(
    scheme: FiniteDifference,
    f: F,
    values: &[T],
    arg: usize,
    epsilon: T,
) -> Result<T, E>
where
    T: Float,
    E: From<MinigradError>,
    F: Fn(&[T]) -> Result<T, E>,
{
    if arg >= values.len() {
        return Err(MinigradError::ArgumentOutOfRange {
            index: arg,
            len: values.len(),
        }
        .into());
    }
    if !(epsilon > T::zero() && epsilon.is_finite()) {
        return Err(MinigradError::InvalidEpsilon(epsilon.to_f64().unwrap_or(f64::NAN)).into());
    }

    let mut shifted = values.to_vec();
    match scheme {
        FiniteDifference::Forward => {
            shifted[arg] = values[arg] + epsilon;
            let f_plus = f(&shifted)?;
            let f_base = f(values)?;
            Ok((f_plus - f_base) / epsilon)
        }
        FiniteDifference::Central => {
            shifted[arg] = values[arg] + epsilon;
            let f_plus = f(&shifted)?;
            shifted[arg] = values[arg] - epsilon;
            let f_minus = f(&shifted)?;
            Ok((f_plus - f_minus) / (epsilon + epsilon))
        }
    }
}

/// Settings for [`check_grad`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheckConfig {
    pub epsilon: f64,
    /// Maximum absolute and relative difference tolerated.
    pub tolerance: f64,
    pub scheme: FiniteDifference,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        GradCheckConfig {
            epsilon: DEFAULT_EPSILON,
            tolerance: 1e-4,
            scheme: FiniteDifference::Central,
        }
    }
}

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input {input_index}: analytical grad {analytical_grad:?} != numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        input_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(MinigradError),
    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(MinigradError),
    #[error("Numerical gradient is NaN or infinite for input {input_index}: {value:?}")]
    NumericalGradNonFinite { input_index: usize, value: f64 },
    #[error("Analytical gradient is NaN or infinite for input {input_index}: {value:?}")]
    AnalyticalGradNonFinite { input_index: usize, value: f64 },
    #[error("Autograd error during gradient check: {0}")]
    Autograd(MinigradError),
}

impl From<MinigradError> for GradCheckError {
    fn from(err: MinigradError) -> Self {
        GradCheckError::Autograd(err)
    }
}

/// Checks the derivatives computed by backpropagation against finite
/// differences.
///
/// `func` is evaluated once on fresh leaves built from `values` and
/// back-propagated with a seed of `1`. It is then re-evaluated on constant
/// scalars around `values` to estimate each partial derivative. An input the
/// output does not depend on is expected to have a zero derivative.
///
/// A mismatch is only reported when both the absolute and the relative
/// difference exceed `config.tolerance`.
pub fn check_grad<F>(func: F, values: &[f64], config: &GradCheckConfig) -> Result<(), GradCheckError>
where
    F: Fn(&[Scalar]) -> Result<Scalar, MinigradError>,
{
    let ids = Arc::new(IdGenerator::new());
    let inputs: Vec<Scalar> = values.iter().map(|&v| Scalar::new(v, &ids)).collect();

    let output = func(&inputs).map_err(GradCheckError::ForwardPassError)?;
    output
        .backward(None)
        .map_err(GradCheckError::BackwardPassError)?;

    let evaluate = |point: &[f64]| -> Result<f64, GradCheckError> {
        let constants: Vec<Scalar> = point.iter().map(|&v| Scalar::constant(v, &ids)).collect();
        let result = func(&constants).map_err(GradCheckError::ForwardPassError)?;
        Ok(result.value())
    };

    for (i, input) in inputs.iter().enumerate() {
        let analytical_grad = input.derivative().unwrap_or(0.0);
        let numerical_grad =
            try_approximate_partial(config.scheme, &evaluate, values, i, config.epsilon)?;

        if !numerical_grad.is_finite() {
            warn!("check_grad: non-finite numerical gradient for input {}", i);
            return Err(GradCheckError::NumericalGradNonFinite {
                input_index: i,
                value: numerical_grad,
            });
        }
        if !analytical_grad.is_finite() {
            return Err(GradCheckError::AnalyticalGradNonFinite {
                input_index: i,
                value: analytical_grad,
            });
        }

        if !relative_eq!(
            analytical_grad,
            numerical_grad,
            epsilon = config.tolerance,
            max_relative = config.tolerance
        ) {
            let difference = (analytical_grad - numerical_grad).abs();
            debug!(
                "check_grad: input {} analytical {} numerical {}",
                i, analytical_grad, numerical_grad
            );
            return Err(GradCheckError::GradientMismatch {
                input_index: i,
                analytical_grad,
                numerical_grad,
                difference,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
