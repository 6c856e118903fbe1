//! Copy, cut and paste of component subtrees, within a screen or across
//! screens through an encoded blob.
//!
//! Pasting never reuses ids: every pasted component, at every depth, gets a
//! fresh one and its children are re-linked to it.

use crate::pool::Intent;
use sd_core::serialize::{from_msgpack, to_msgpack};
use sd_core::{Component, ComponentId, CoreError, IdPathMap, Tree, merge_into};
use serde_json::json;
use std::sync::Arc;

/// Detached copies of the selected subtrees, top-most first in tree order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    components: Vec<Component>,
}

impl Clipboard {
    /// Copy the selected components out of `tree`. Ids nested inside
    /// another selected component are covered by it and skipped; unknown
    /// ids are ignored.
    pub fn copy(tree: &Tree, map: &IdPathMap, ids: &[ComponentId]) -> Self {
        let mut picked: Vec<(&[usize], &Arc<Component>)> = ids
            .iter()
            .filter(|&&id| !ids.iter().any(|&other| map.is_ancestor_of(other, id)))
            .filter_map(|&id| {
                let path = map.resolve_path(id)?;
                Some((path, map.component(tree, id)?))
            })
            .collect();
        picked.sort_by(|a, b| a.0.cmp(b.0));
        picked.dedup_by(|a, b| a.0 == b.0);

        let components = picked
            .into_iter()
            .map(|(_, node)| {
                let mut copy = Component::clone(node);
                copy.parent = None;
                copy
            })
            .collect();
        Self { components }
    }

    /// Copy, plus the intent that removes the originals.
    pub fn cut(tree: &Tree, map: &IdPathMap, ids: &[ComponentId]) -> (Self, Intent) {
        let clipboard = Self::copy(tree, map, ids);
        let remove = Intent::RemoveMany {
            ids: clipboard.components.iter().map(|c| c.id).collect(),
        };
        (clipboard, remove)
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Insert intents for a paste under `parent`, each top-level copy
    /// nudged by `offset` pixels right and down.
    pub fn paste(&self, parent: Option<ComponentId>, offset: f64) -> Vec<Intent> {
        self.components
            .iter()
            .map(|c| {
                let mut fresh = regenerate(c, parent);
                let style = fresh.style();
                let config = Arc::make_mut(&mut fresh.config);
                merge_into(
                    config,
                    &json!({ "style": { "left": style.left + offset, "top": style.top + offset } }),
                );
                Intent::Insert {
                    component: fresh,
                    parent,
                    index: None,
                }
            })
            .collect()
    }

    /// Compact blob for the cross-screen clipboard.
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        to_msgpack(&Tree::from_components(self.components.iter().cloned()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        let tree = from_msgpack(bytes)?;
        Ok(Self {
            components: tree.roots().iter().map(|c| Component::clone(c)).collect(),
        })
    }
}

/// Deep copy of `node` with new ids everywhere and `parent` links pointing
/// at the new ids.
fn regenerate(node: &Component, parent: Option<ComponentId>) -> Component {
    let prefix = if node.is_group() { "group" } else { "component" };
    let id = ComponentId::generate(prefix);
    let children = node
        .components
        .iter()
        .map(|c| Arc::new(regenerate(c, Some(id))))
        .collect();
    let mut fresh = node.clone().with_children(children);
    fresh.id = id;
    fresh.parent = parent;
    fresh
}
