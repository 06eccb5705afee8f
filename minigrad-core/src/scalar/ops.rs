//! Forward operations on [`Scalar`]s.
//!
//! Each `*_op` runs the matching [`ScalarFunction`](super::ScalarFunction)
//! through [`apply`], so the result is linked into the graph whenever one of
//! the inputs requires grad.

use crate::error::MinigradError;
use crate::scalar::functions::{
    apply, AddFunction, EqFunction, ExpFunction, InvFunction, LogFunction, LtFunction,
    MulFunction, NegFunction, ReluFunction, SigmoidFunction,
};
use crate::scalar::Scalar;
use std::sync::Arc;

pub fn add_op(a: &Scalar, b: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(AddFunction), &[a, b])
}

/// `a + (-b)`
pub fn sub_op(a: &Scalar, b: &Scalar) -> Result<Scalar, MinigradError> {
    let neg_b = neg_op(b)?;
    add_op(a, &neg_b)
}

pub fn mul_op(a: &Scalar, b: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(MulFunction), &[a, b])
}

/// `a * inv(b)`
pub fn div_op(a: &Scalar, b: &Scalar) -> Result<Scalar, MinigradError> {
    let inv_b = inv_op(b)?;
    mul_op(a, &inv_b)
}

pub fn neg_op(a: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(NegFunction), &[a])
}

pub fn inv_op(a: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(InvFunction), &[a])
}

pub fn log_op(a: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(LogFunction), &[a])
}

pub fn exp_op(a: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(ExpFunction), &[a])
}

pub fn sigmoid_op(a: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(SigmoidFunction), &[a])
}

pub fn relu_op(a: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(ReluFunction), &[a])
}

pub fn lt_op(a: &Scalar, b: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(LtFunction), &[a, b])
}

/// `b < a`
pub fn gt_op(a: &Scalar, b: &Scalar) -> Result<Scalar, MinigradError> {
    lt_op(b, a)
}

pub fn eq_op(a: &Scalar, b: &Scalar) -> Result<Scalar, MinigradError> {
    apply(Arc::new(EqFunction), &[a, b])
}
