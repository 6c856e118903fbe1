//! Structural integrity checks for loaded or corrupted trees.
//!
//! A tree built only through `TreeMutator` is always consistent. Trees that
//! come from storage, the clipboard or another screen are not, so every
//! invariant the rest of the core relies on is re-checked here.

use crate::error::IntegrityError;
use crate::id::ComponentId;
use crate::model::Tree;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

// ─── Parent-link cycles ──────────────────────────────────────────────────

/// Find a component whose recorded `parent` links loop back on themselves.
///
/// `links` pairs each component with the parent it *claims*; claimed parents
/// that do not exist as components are still graph nodes, so dangling links
/// never hide a cycle.
pub fn find_parent_cycle(links: &[(ComponentId, Option<ComponentId>)]) -> Option<ComponentId> {
    let mut graph: DiGraph<ComponentId, ()> = DiGraph::new();
    let mut index: HashMap<ComponentId, NodeIndex> = HashMap::new();
    let mut node = |graph: &mut DiGraph<ComponentId, ()>, id: ComponentId| {
        *index.entry(id).or_insert_with(|| graph.add_node(id))
    };

    for &(child, parent) in links {
        let c = node(&mut graph, child);
        if let Some(parent) = parent {
            let p = node(&mut graph, parent);
            graph.add_edge(c, p, ());
        }
    }

    tarjan_scc(&graph).into_iter().find_map(|scc| match scc.as_slice() {
        [single] if graph.find_edge(*single, *single).is_some() => Some(graph[*single]),
        [first, _, ..] => Some(graph[*first]),
        _ => None,
    })
}

// ─── Full report ─────────────────────────────────────────────────────────

/// Every integrity problem in `tree`, in discovery order. Empty means the
/// tree is safe to index.
#[must_use]
pub fn validate(tree: &Tree) -> Vec<IntegrityError> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for root in tree.roots() {
        check_node(root, None, &mut seen, &mut links, &mut problems);
    }

    if let Some(id) = find_parent_cycle(&links) {
        problems.push(IntegrityError::ParentCycle(id));
    }
    problems
}

fn check_node(
    node: &crate::model::Component,
    actual_parent: Option<ComponentId>,
    seen: &mut HashSet<ComponentId>,
    links: &mut Vec<(ComponentId, Option<ComponentId>)>,
    problems: &mut Vec<IntegrityError>,
) {
    if !seen.insert(node.id) {
        problems.push(IntegrityError::DuplicateId(node.id));
    }
    if node.parent != actual_parent {
        problems.push(IntegrityError::ParentMismatch {
            id: node.id,
            recorded: node.parent,
            actual: actual_parent,
        });
    }
    if !node.is_group() && !node.components.is_empty() {
        problems.push(IntegrityError::LeafWithChildren(node.id));
    }
    links.push((node.id, node.parent));
    for child in &node.components {
        check_node(child, Some(node.id), seen, links, problems);
    }
}
