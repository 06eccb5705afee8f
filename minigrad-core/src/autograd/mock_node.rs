//! Instrumented `Variable` used by the autograd unit tests.
//!
//! Each computed node multiplies the upstream derivative by a fixed weight per
//! edge, so expected derivatives are easy to work out by hand. All calls into
//! the capability are counted.

use crate::autograd::{IdGenerator, NodeId, Variable};
use crate::error::MinigradError;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MockKind {
    Leaf,
    Constant,
    Computed,
    /// Computed node whose `chain_rule` always fails.
    Failing,
    /// Computed node whose `chain_rule` reports no contributions at all.
    Silent,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MockError {
    Core(MinigradError),
    Rule(NodeId),
}

impl From<MinigradError> for MockError {
    fn from(err: MinigradError) -> Self {
        MockError::Core(err)
    }
}

struct MockInner {
    id: NodeId,
    kind: MockKind,
    edges: RwLock<Vec<(MockNode, f64)>>,
    parents_calls: Mutex<usize>,
    chain_rule_calls: Mutex<usize>,
    received: Mutex<Vec<f64>>,
}

impl Drop for MockInner {
    fn drop(&mut self) {
        let mut pending = take_edges(self);
        while let Some(node) = pending.pop() {
            if let Ok(mut inner) = Arc::try_unwrap(node.inner) {
                pending.extend(take_edges(&mut inner));
            }
        }
    }
}

fn take_edges(inner: &mut MockInner) -> Vec<MockNode> {
    let edges = inner.edges.get_mut().unwrap_or_else(PoisonError::into_inner);
    std::mem::take(edges).into_iter().map(|(p, _)| p).collect()
}

#[derive(Clone)]
pub(crate) struct MockNode {
    inner: Arc<MockInner>,
}

impl fmt::Debug for MockNode {
    // Edges are left out, a cyclic test graph would recurse forever.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockNode")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .finish()
    }
}

impl MockNode {
    fn with_kind(ids: &IdGenerator, kind: MockKind, edges: Vec<(MockNode, f64)>) -> Self {
        MockNode {
            inner: Arc::new(MockInner {
                id: ids.next_id(),
                kind,
                edges: RwLock::new(edges),
                parents_calls: Mutex::new(0),
                chain_rule_calls: Mutex::new(0),
                received: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn leaf(ids: &IdGenerator) -> Self {
        Self::with_kind(ids, MockKind::Leaf, Vec::new())
    }

    pub(crate) fn constant(ids: &IdGenerator) -> Self {
        Self::with_kind(ids, MockKind::Constant, Vec::new())
    }

    /// Computed node with `(parent, local derivative)` edges.
    pub(crate) fn computed(ids: &IdGenerator, edges: &[(&MockNode, f64)]) -> Self {
        let edges = edges.iter().map(|(p, w)| ((*p).clone(), *w)).collect();
        Self::with_kind(ids, MockKind::Computed, edges)
    }

    pub(crate) fn failing(ids: &IdGenerator, parents: &[&MockNode]) -> Self {
        let edges = parents.iter().map(|p| ((*p).clone(), 1.0)).collect();
        Self::with_kind(ids, MockKind::Failing, edges)
    }

    pub(crate) fn silent(ids: &IdGenerator, parents: &[&MockNode]) -> Self {
        let edges = parents.iter().map(|p| ((*p).clone(), 1.0)).collect();
        Self::with_kind(ids, MockKind::Silent, edges)
    }

    /// Adds an edge after construction. Only needed to build cycles.
    pub(crate) fn connect(&self, parent: &MockNode, weight: f64) {
        self.inner
            .edges
            .write()
            .expect("RwLock poisoned")
            .push((parent.clone(), weight));
    }

    pub(crate) fn id(&self) -> NodeId {
        self.inner.id
    }

    pub(crate) fn parents_calls(&self) -> usize {
        *self.inner.parents_calls.lock().expect("Mutex poisoned")
    }

    pub(crate) fn chain_rule_calls(&self) -> usize {
        *self.inner.chain_rule_calls.lock().expect("Mutex poisoned")
    }

    pub(crate) fn received(&self) -> Vec<f64> {
        self.inner.received.lock().expect("Mutex poisoned").clone()
    }

    pub(crate) fn total_received(&self) -> f64 {
        self.received().iter().sum()
    }
}

impl Variable for MockNode {
    type Grad = f64;
    type Error = MockError;

    fn node_id(&self) -> NodeId {
        self.inner.id
    }

    fn is_leaf(&self) -> bool {
        self.inner.kind == MockKind::Leaf
    }

    fn is_constant(&self) -> bool {
        self.inner.kind == MockKind::Constant
    }

    fn parents(&self) -> Vec<Self> {
        *self.inner.parents_calls.lock().expect("Mutex poisoned") += 1;
        match self.inner.kind {
            MockKind::Leaf | MockKind::Constant => Vec::new(),
            MockKind::Computed | MockKind::Failing | MockKind::Silent => self
                .inner
                .edges
                .read()
                .expect("RwLock poisoned")
                .iter()
                .map(|(p, _)| p.clone())
                .collect(),
        }
    }

    fn chain_rule(&self, d_output: &f64) -> Result<Vec<(Self, f64)>, MockError> {
        *self.inner.chain_rule_calls.lock().expect("Mutex poisoned") += 1;
        match self.inner.kind {
            MockKind::Failing => Err(MockError::Rule(self.inner.id)),
            MockKind::Leaf | MockKind::Constant | MockKind::Silent => Ok(Vec::new()),
            MockKind::Computed => Ok(self
                .inner
                .edges
                .read()
                .expect("RwLock poisoned")
                .iter()
                .map(|(p, w)| (p.clone(), d_output * w))
                .collect()),
        }
    }

    fn accumulate_derivative(&self, d: f64) -> Result<(), MockError> {
        if !self.is_leaf() {
            return Err(MinigradError::NotALeaf { node: self.inner.id }.into());
        }
        self.inner.received.lock().expect("Mutex poisoned").push(d);
        Ok(())
    }
}
