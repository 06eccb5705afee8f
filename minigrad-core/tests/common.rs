use minigrad_core::{IdGenerator, Scalar};
use std::sync::Arc;

// Helper functions shared by the integration tests.
// Added allow(dead_code) because usage across different test crates isn't detected easily.
#[allow(dead_code)]
pub fn new_generator() -> Arc<IdGenerator> {
    Arc::new(IdGenerator::new())
}

#[allow(dead_code)]
pub fn leaves(values: &[f64], ids: &Arc<IdGenerator>) -> Vec<Scalar> {
    values.iter().map(|&v| Scalar::new(v, ids)).collect()
}
