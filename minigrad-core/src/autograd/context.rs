/// Scratch storage bridging one forward computation to its backward.
///
/// A `Context` is created right before an operation's forward runs. The
/// forward may stash values it will need to compute derivatives later; the
/// resulting node then keeps the context so that its backward can read them.
///
/// When `no_grad` is set, nothing will ever be differentiated through this
/// invocation and `save_for_backward` drops the values instead of keeping
/// them alive.
#[derive(Debug, Clone, PartialEq)]
pub struct Context<T> {
    no_grad: bool,
    saved_values: Vec<T>,
}

impl<T> Context<T> {
    /// Creates a context with gradient tracking enabled and nothing saved.
    pub fn new() -> Self {
        Context {
            no_grad: false,
            saved_values: Vec::new(),
        }
    }

    /// Creates a context with an explicit `no_grad` flag.
    pub fn with_no_grad(no_grad: bool) -> Self {
        Context {
            no_grad,
            saved_values: Vec::new(),
        }
    }

    pub fn no_grad(&self) -> bool {
        self.no_grad
    }

    /// Stores `values` for use during backward.
    ///
    /// Replaces anything saved before (last call wins). No-op when `no_grad`
    /// is set.
    pub fn save_for_backward<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        if self.no_grad {
            return;
        }
        self.saved_values = values.into_iter().collect();
    }

    /// Values stored by the last `save_for_backward` call.
    pub fn saved_values(&self) -> &[T] {
        &self.saved_values
    }
}

impl<T> Default for Context<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
