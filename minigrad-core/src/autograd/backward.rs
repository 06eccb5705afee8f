use crate::autograd::graph::topological_sort;
use crate::autograd::{NodeId, Variable};
use crate::error::MinigradError;
use log::{debug, trace};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Runs backpropagation from `variable` and delivers derivatives to the leaves.
///
/// `deriv` is the derivative of the final quantity with respect to
/// `variable` (usually `1` for a scalar loss). Every leaf reachable from
/// `variable` receives exactly one `accumulate_derivative` call carrying the
/// sum over all paths of the chain-rule products.
///
/// Nodes are processed in [`topological_sort`] order, so by the time a node
/// is reached every consumer has already added its contribution. Leaves are
/// only written to once propagation is finished, which keeps partial sums
/// away from them.
///
/// # Errors
/// * `MinigradError::CycleDetected` if the graph is not acyclic.
/// * `MinigradError::MissingDerivative` if a reachable node never received a
///   contribution (a defect in how the graph was built).
/// * Any error returned by `chain_rule` or `accumulate_derivative`, unchanged.
///
/// On error, leaves may already have received their derivative; the whole
/// pass should be treated as failed.
pub fn backpropagate<V: Variable>(variable: &V, deriv: V::Grad) -> Result<(), V::Error> {
    let mut grad_map: HashMap<NodeId, V::Grad> = HashMap::new();
    grad_map.insert(variable.node_id(), deriv);

    let sorted_nodes = topological_sort(variable)?;
    debug!(
        "backpropagate: {} nodes reachable from {}",
        sorted_nodes.len(),
        variable.node_id()
    );

    for node in &sorted_nodes {
        if node.is_constant() || node.is_leaf() {
            continue;
        }
        let node_id = node.node_id();
        let d_output = grad_map
            .get(&node_id)
            .cloned()
            .ok_or(MinigradError::MissingDerivative { node: node_id })?;

        let contributions = node.chain_rule(&d_output)?;
        trace!(
            "backpropagate: node {} produced {} contributions",
            node_id,
            contributions.len()
        );
        for (parent, grad_to_add) in contributions {
            match grad_map.entry(parent.node_id()) {
                Entry::Occupied(mut entry) => *entry.get_mut() += grad_to_add,
                Entry::Vacant(entry) => {
                    entry.insert(grad_to_add);
                }
            }
        }
    }

    let mut delivered = 0usize;
    for node in sorted_nodes.iter().filter(|n| n.is_leaf()) {
        let node_id = node.node_id();
        let total = grad_map
            .remove(&node_id)
            .ok_or(MinigradError::MissingDerivative { node: node_id })?;
        node.accumulate_derivative(total)?;
        delivered += 1;
    }
    debug!("backpropagate: delivered derivatives to {} leaves", delivered);

    Ok(())
}

#[cfg(test)]
#[path = "backward_test.rs"]
mod tests;
