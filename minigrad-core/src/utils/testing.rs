use crate::scalar::Scalar;

/// Checks that the derivative accumulated on `scalar` is within `tolerance`
/// of `expected`.
/// Panics if no derivative was delivered or if it differs too much.
pub fn check_derivative_near(scalar: &Scalar, expected: f64, tolerance: f64) {
    let actual = match scalar.derivative() {
        Some(d) => d,
        None => panic!("No derivative delivered to {:?}", scalar),
    };
    let diff = (actual - expected).abs();
    if diff > tolerance {
        panic!(
            "Derivative mismatch for {:?}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
            scalar, actual, expected, diff, tolerance
        );
    }
}

/// Checks that `scalar` holds `expected` within `tolerance`.
pub fn check_value_near(scalar: &Scalar, expected: f64, tolerance: f64) {
    let actual = scalar.value();
    let diff = (actual - expected).abs();
    if diff > tolerance {
        panic!(
            "Value mismatch for {:?}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
            scalar, actual, expected, diff, tolerance
        );
    }
}
