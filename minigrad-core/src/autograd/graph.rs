use crate::autograd::{NodeId, Variable};
use crate::error::MinigradError;
use log::trace;
use std::collections::HashSet;

/// A node whose parents are still being explored.
struct Frame<V> {
    node: V,
    pending_parents: std::vec::IntoIter<V>,
}

/// Computes the order in which `variable`'s graph is processed by backward.
///
/// Returns every non-constant node reachable from `variable` exactly once,
/// consumers before producers: if `a` lists `b` among its parents, `a` comes
/// before `b`. `variable` itself is therefore first. Constants are skipped
/// together with everything only reachable through them.
///
/// The traversal is a depth-first search over `parents()` in listed order,
/// driven by an explicit stack so deep graphs do not exhaust the call stack.
/// Nodes are appended once all their parents are finished and the list is
/// reversed at the end, so the result is fully determined by the graph
/// structure and parent ordering.
///
/// # Errors
/// Returns `MinigradError::CycleDetected` if a node is reached again while it
/// is still on the active path.
pub fn topological_sort<V: Variable>(variable: &V) -> Result<Vec<V>, MinigradError> {
    let mut sorted_list: Vec<V> = Vec::new();
    if variable.is_constant() {
        return Ok(sorted_list);
    }

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut on_path: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<Frame<V>> = Vec::new();
    push_frame(variable.clone(), &mut visited, &mut on_path, &mut stack);

    loop {
        let next_parent = match stack.last_mut() {
            Some(frame) => frame.pending_parents.next(),
            None => break,
        };

        match next_parent {
            Some(parent) => {
                if parent.is_constant() {
                    continue;
                }
                let parent_id = parent.node_id();
                if on_path.contains(&parent_id) {
                    return Err(MinigradError::CycleDetected { node: parent_id });
                }
                if visited.contains(&parent_id) {
                    trace!("[topological_sort] Node {} already visited.", parent_id);
                    continue;
                }
                push_frame(parent, &mut visited, &mut on_path, &mut stack);
            }
            None => {
                // All parents done: the node is finished.
                if let Some(frame) = stack.pop() {
                    let node_id = frame.node.node_id();
                    on_path.remove(&node_id);
                    trace!("[topological_sort] Adding node {} to sorted list", node_id);
                    sorted_list.push(frame.node);
                }
            }
        }
    }

    sorted_list.reverse();
    Ok(sorted_list)
}

fn push_frame<V: Variable>(
    node: V,
    visited: &mut HashSet<NodeId>,
    on_path: &mut HashSet<NodeId>,
    stack: &mut Vec<Frame<V>>,
) {
    let node_id = node.node_id();
    trace!("[topological_sort] Visiting node {}", node_id);
    visited.insert(node_id);
    on_path.insert(node_id);
    let pending_parents = node.parents().into_iter();
    stack.push(Frame {
        node,
        pending_parents,
    });
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
