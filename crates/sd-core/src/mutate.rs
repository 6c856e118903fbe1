//! Structural tree operations: insert, remove, update, reparent, reorder,
//! group and ungroup.
//!
//! Every operation is a pure function from one tree version to the next.
//! Only the components on the path from the top level to the edited node
//! are rebuilt; every other `Arc<Component>` is carried over as-is, so a
//! renderer memoized on subtree identity skips untouched siblings.
//!
//! Failures leave the input tree untouched and come back as `CoreError`
//! values: `MutateError` for rejected operations, `IntegrityError` when
//! the tree itself turned out to be corrupt while indexing it.

use crate::error::{CoreError, MutateError};
use crate::geometry::{GroupLayout, project_out_of_group, to_group_local};
use crate::id::ComponentId;
use crate::merge::{ComponentPatch, merge_into, merge_maps};
use crate::model::{Component, Tree, base_config};
use crate::path_index::{IdPathMap, IndexPath, PathIndex};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;

// ─── Z-order ─────────────────────────────────────────────────────────────

/// Where to move a component among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZOrder {
    /// One step toward the back.
    Backward,
    /// One step toward the front.
    Forward,
    /// First child (painted first).
    ToBack,
    /// Last child (painted last).
    ToFront,
    /// Explicit index among the siblings, clamped.
    To(usize),
}

// ─── Copy-on-write helpers ───────────────────────────────────────────────

/// Rebuild the sibling list found at `parent_path` (empty = top level) with
/// `edit` applied, copying every ancestor on the way back up.
fn edit_children<R, F>(
    siblings: &[Arc<Component>],
    parent_path: &[usize],
    target: ComponentId,
    edit: F,
) -> Result<(Vec<Arc<Component>>, R), MutateError>
where
    F: FnOnce(&mut Vec<Arc<Component>>) -> Result<R, MutateError>,
{
    match parent_path.split_first() {
        None => {
            let mut list = siblings.to_vec();
            let out = edit(&mut list)?;
            Ok((list, out))
        }
        Some((&idx, rest)) => {
            let node = siblings.get(idx).ok_or(MutateError::NotFound(target))?;
            let (children, out) = edit_children(&node.components, rest, target, edit)?;
            let mut list = siblings.to_vec();
            list[idx] = Arc::new(node.replace_children(children));
            Ok((list, out))
        }
    }
}

/// `edit_children` on a whole tree.
fn edit_tree<R, F>(
    tree: &Tree,
    parent_path: &[usize],
    target: ComponentId,
    edit: F,
) -> Result<(Tree, R), MutateError>
where
    F: FnOnce(&mut Vec<Arc<Component>>) -> Result<R, MutateError>,
{
    let (roots, out) = edit_children(tree.roots(), parent_path, target, edit)?;
    Ok((Tree::new(roots), out))
}

/// Swap the component at `path` for `node`.
fn replace_at(tree: &Tree, path: &[usize], node: Component) -> Result<Tree, MutateError> {
    let id = node.id;
    let (parent_path, last) = split_path(path, id)?;
    let (tree, ()) = edit_tree(tree, parent_path, id, |list| {
        let slot = list.get_mut(last).ok_or(MutateError::NotFound(id))?;
        *slot = Arc::new(node);
        Ok(())
    })?;
    Ok(tree)
}

fn split_path(path: &[usize], id: ComponentId) -> Result<(&[usize], usize), MutateError> {
    match path.split_last() {
        Some((&last, parent)) => Ok((parent, last)),
        None => Err(MutateError::NotFound(id)),
    }
}

/// Point `node` at `parent` and every descendant at its holder.
fn adopt(mut node: Component, parent: Option<ComponentId>) -> Component {
    node.parent = parent;
    if node
        .components
        .iter()
        .any(|c| c.parent != Some(node.id) || !c.components.is_empty())
    {
        let id = node.id;
        node.components = node
            .components
            .into_iter()
            .map(|c| {
                if c.parent == Some(id) && c.components.is_empty() {
                    c
                } else {
                    Arc::new(adopt(Arc::unwrap_or_clone(c), Some(id)))
                }
            })
            .collect();
    }
    node
}

/// Apply one patch to a component's serialized fields.
///
/// `config` deep-merges; `name` and `componentType` are replaced; any other
/// key merges into `extra`. Structural keys (`id`, `type`, `components`,
/// `parent`) belong to the tree, not to patches, and are ignored.
pub fn apply_patch(node: &Component, patch: &Value) -> Component {
    let Some(fields) = patch.as_object() else {
        log::warn!("ignoring non-record patch for {}", node.id);
        return node.clone();
    };
    let mut next = node.clone();
    for (key, value) in fields {
        match key.as_str() {
            "config" => {
                let config = Arc::make_mut(&mut next.config);
                if value.is_null() {
                    *config = json!({});
                } else {
                    merge_into(config, value);
                }
            }
            "name" => next.name = value.as_str().unwrap_or_default().to_string(),
            "componentType" => {
                next.component_type = value.as_str().unwrap_or_default().to_string();
            }
            "id" | "type" | "components" | "parent" => {
                log::trace!("patch for {} touches structural key `{key}`", node.id);
            }
            _ => {
                let mut extra = serde_json::Map::new();
                extra.insert(key.clone(), value.clone());
                merge_maps(&mut next.extra, &extra);
            }
        }
    }
    next
}

/// Position of `target` once the component at `removed` is taken out.
fn shift_after_removal(target: &[usize], removed: &[usize]) -> IndexPath {
    let mut out = IndexPath::from_slice(target);
    let depth = removed.len() - 1;
    if target.len() > depth
        && target[..depth] == removed[..depth]
        && target[depth] > removed[depth]
    {
        out[depth] -= 1;
    }
    out
}

// ─── Mutator ─────────────────────────────────────────────────────────────

/// Applies structural operations against trees indexed by an injected
/// `PathIndex`.
#[derive(Debug, Clone, Copy)]
pub struct TreeMutator<'a> {
    index: &'a PathIndex,
    layout: GroupLayout,
}

impl<'a> TreeMutator<'a> {
    pub fn new(index: &'a PathIndex) -> Self {
        Self {
            index,
            layout: GroupLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: GroupLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn index(&self) -> &'a PathIndex {
        self.index
    }

    fn map(&self, tree: &Tree) -> Result<Arc<IdPathMap>, CoreError> {
        Ok(self.index.map(tree)?)
    }

    // ─── Insert / remove ─────────────────────────────────────────────────

    /// Insert `component` (and its subtree) under `parent` at `index`,
    /// appending when `index` is `None` or past the end.
    pub fn insert(
        &self,
        tree: &Tree,
        component: Component,
        parent: Option<ComponentId>,
        index: Option<usize>,
    ) -> Result<Tree, CoreError> {
        let map = self.map(tree)?;
        let mut incoming = HashSet::new();
        for node in component.walk() {
            if map.contains(node.id) || !incoming.insert(node.id) {
                return Err(MutateError::DuplicateId(node.id).into());
            }
            if !node.is_group() && !node.components.is_empty() {
                return Err(MutateError::NotAGroup(node.id).into());
            }
        }

        let parent_path: IndexPath = match parent {
            None => IndexPath::new(),
            Some(pid) => {
                let target = map.component(tree, pid).ok_or(MutateError::NotFound(pid))?;
                if !target.is_group() {
                    return Err(MutateError::NotAGroup(pid).into());
                }
                map.get(pid).map(|e| e.path.clone()).unwrap_or_default()
            }
        };

        let node = Arc::new(adopt(component, parent));
        let id = node.id;
        let (next, ()) = edit_tree(tree, &parent_path, id, |list| {
            let at = index.unwrap_or(list.len()).min(list.len());
            list.insert(at, node);
            Ok(())
        })?;
        log::debug!("inserted {id} under {parent:?}");
        Ok(next)
    }

    /// Remove `id` and everything below it.
    pub fn remove(&self, tree: &Tree, id: ComponentId) -> Result<Tree, CoreError> {
        let (next, removed) = self.take(tree, id)?;
        log::debug!("removed {id} ({} descendants)", removed.walk().count() - 1);
        Ok(next)
    }

    /// Remove several components against one base tree. Ids nested inside
    /// another removed component go with it. Any unknown id fails the whole
    /// call.
    pub fn remove_many(&self, tree: &Tree, ids: &[ComponentId]) -> Result<Tree, CoreError> {
        let map = self.map(tree)?;
        if let Some(&missing) = ids.iter().find(|&&id| !map.contains(id)) {
            return Err(MutateError::NotFound(missing).into());
        }
        let outermost: Vec<ComponentId> = ids
            .iter()
            .copied()
            .filter(|&id| !ids.iter().any(|&other| map.is_ancestor_of(other, id)))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        // Deepest / last paths first so earlier paths stay valid.
        let mut paths: Vec<(IndexPath, ComponentId)> = outermost
            .iter()
            .filter_map(|&id| map.get(id).map(|e| (e.path.clone(), id)))
            .collect();
        paths.sort_by(|a, b| b.0.cmp(&a.0));

        let mut next = tree.clone();
        for (path, id) in paths {
            let (parent_path, last) = split_path(&path, id)?;
            let (t, ()) = edit_tree(&next, parent_path, id, |list| {
                if last < list.len() {
                    list.remove(last);
                    Ok(())
                } else {
                    Err(MutateError::NotFound(id))
                }
            })?;
            next = t;
        }
        Ok(next)
    }

    fn take(&self, tree: &Tree, id: ComponentId) -> Result<(Tree, Arc<Component>), CoreError> {
        let map = self.map(tree)?;
        let path = map.resolve_path(id).ok_or(MutateError::NotFound(id))?;
        let (parent_path, last) = split_path(path, id)?;
        let (next, removed) = edit_tree(tree, parent_path, id, |list| {
            if last < list.len() {
                Ok(list.remove(last))
            } else {
                Err(MutateError::NotFound(id))
            }
        })?;
        Ok((next, removed))
    }

    // ─── Update ──────────────────────────────────────────────────────────

    /// Merge `patch` into the component `id`.
    pub fn update(&self, tree: &Tree, id: ComponentId, patch: &Value) -> Result<Tree, CoreError> {
        self.update_batch(tree, &[ComponentPatch::new(id, patch.clone())])
    }

    /// Apply every patch against the same base tree, or none of them.
    ///
    /// Patches for the same id apply in order, so later fields win.
    pub fn update_batch(&self, tree: &Tree, patches: &[ComponentPatch]) -> Result<Tree, CoreError> {
        let map = self.map(tree)?;
        if let Some(missing) = patches.iter().find(|p| !map.contains(p.id)) {
            return Err(MutateError::NotFound(missing.id).into());
        }

        let mut next = tree.clone();
        let mut done: HashSet<ComponentId> = HashSet::new();
        for p in patches {
            if !done.insert(p.id) {
                continue;
            }
            let path = map.resolve_path(p.id).ok_or(MutateError::NotFound(p.id))?;
            let current = next.get(path).ok_or(MutateError::NotFound(p.id))?;
            let updated = patches
                .iter()
                .filter(|q| q.id == p.id)
                .fold(Component::clone(current), |node, q| apply_patch(&node, &q.patch));
            next = replace_at(&next, path, updated)?;
        }
        log::trace!("applied {} patches to {} components", patches.len(), done.len());
        Ok(next)
    }

    // ─── Reparent / reorder ──────────────────────────────────────────────

    /// Move `id` under `new_parent` (top level when `None`) at `index`,
    /// as one operation. `index` counts positions after `id` has been taken
    /// out of its old place.
    pub fn reparent(
        &self,
        tree: &Tree,
        id: ComponentId,
        new_parent: Option<ComponentId>,
        index: Option<usize>,
    ) -> Result<Tree, CoreError> {
        let map = self.map(tree)?;
        let from = map.resolve_path(id).ok_or(MutateError::NotFound(id))?;

        let target_path = match new_parent {
            None => IndexPath::new(),
            Some(pid) => {
                if pid == id || map.is_ancestor_of(id, pid) {
                    return Err(MutateError::Cycle { id, parent: pid }.into());
                }
                let target = map.component(tree, pid).ok_or(MutateError::NotFound(pid))?;
                if !target.is_group() {
                    return Err(MutateError::NotAGroup(pid).into());
                }
                let to = map.resolve_path(pid).ok_or(MutateError::NotFound(pid))?;
                shift_after_removal(to, from)
            }
        };

        let (parent_path, last) = split_path(from, id)?;
        let (without, moved) = edit_tree(tree, parent_path, id, |list| {
            if last < list.len() {
                Ok(list.remove(last))
            } else {
                Err(MutateError::NotFound(id))
            }
        })?;

        let mut node = Arc::unwrap_or_clone(moved);
        node.parent = new_parent;
        let node = Arc::new(node);
        let (next, ()) = edit_tree(&without, &target_path, id, |list| {
            let at = index.unwrap_or(list.len()).min(list.len());
            list.insert(at, node);
            Ok(())
        })?;
        log::debug!("reparented {id} under {new_parent:?}");
        Ok(next)
    }

    /// Move `id` among its siblings. Returns the input tree (same identity)
    /// when the position would not change.
    pub fn reorder(&self, tree: &Tree, id: ComponentId, order: ZOrder) -> Result<Tree, CoreError> {
        let map = self.map(tree)?;
        let path = map.resolve_path(id).ok_or(MutateError::NotFound(id))?;
        let (parent_path, pos) = split_path(path, id)?;
        let count = match parent_path {
            [] => tree.roots().len(),
            p => tree.get(p).map(|g| g.components.len()).unwrap_or(0),
        };
        let last = count.saturating_sub(1);
        let to = match order {
            ZOrder::Backward => pos.saturating_sub(1),
            ZOrder::Forward => (pos + 1).min(last),
            ZOrder::ToBack => 0,
            ZOrder::ToFront => last,
            ZOrder::To(i) => i.min(last),
        };
        if to == pos {
            return Ok(tree.clone());
        }
        let (next, ()) = edit_tree(tree, parent_path, id, |list| {
            let node = list.remove(pos);
            list.insert(to, node);
            Ok(())
        })?;
        Ok(next)
    }

    // ─── Group / ungroup ─────────────────────────────────────────────────

    /// Wrap `ids` in a new group placed where the first of them (in tree
    /// order) was. Returns the new tree and the group's id.
    pub fn group(&self, tree: &Tree, ids: &[ComponentId]) -> Result<(Tree, ComponentId), CoreError> {
        let map = self.map(tree)?;
        if ids.is_empty() {
            return Err(MutateError::EmptySelection.into());
        }

        let mut selected: Vec<(IndexPath, Arc<Component>)> = Vec::with_capacity(ids.len());
        let mut seen = HashSet::new();
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let entry = map.get(id).ok_or(MutateError::NotFound(id))?;
            let node = tree.get(&entry.path).ok_or(MutateError::NotFound(id))?;
            selected.push((entry.path.clone(), Arc::clone(node)));
        }
        let parent = map.get(selected[0].1.id).and_then(|e| e.parent);
        if selected
            .iter()
            .any(|(_, c)| map.get(c.id).and_then(|e| e.parent) != parent)
        {
            return Err(MutateError::MixedParents.into());
        }
        selected.sort_by(|a, b| a.0.cmp(&b.0));

        let styles: Vec<_> = selected.iter().map(|(_, c)| c.style()).collect();
        let frame = self
            .layout
            .frame(styles.iter())
            .ok_or(MutateError::EmptySelection)?;

        let group_id = ComponentId::generate("group");
        let children: Vec<Arc<Component>> = selected
            .iter()
            .zip(&styles)
            .map(|((_, child), style)| {
                let (left, top) = to_group_local(style, &frame);
                let mut local = apply_patch(
                    child,
                    &json!({ "config": { "style": { "left": left, "top": top } } }),
                );
                local.parent = Some(group_id);
                Arc::new(local)
            })
            .collect();

        let mut config = base_config();
        merge_into(
            &mut config,
            &json!({
                "style": {
                    "left": frame.left,
                    "top": frame.top,
                    "width": frame.width,
                    "height": frame.height,
                },
                "options": { "condition": [] }
            }),
        );
        let mut group = Component::group(group_id, config)
            .with_name(group_id.as_str())
            .with_children(children);
        group.parent = parent;

        let parent_path = &selected[0].0[..selected[0].0.len() - 1];
        let mut positions: Vec<usize> = selected
            .iter()
            .filter_map(|(p, _)| p.last().copied())
            .collect();
        let insert_at = positions[0];
        let group = Arc::new(group);
        let (next, ()) = edit_tree(tree, parent_path, group_id, |list| {
            positions.sort_unstable_by(|a, b| b.cmp(a));
            for pos in positions {
                list.remove(pos);
            }
            list.insert(insert_at.min(list.len()), group);
            Ok(())
        })?;
        log::debug!("grouped {} components into {group_id}", selected.len());
        Ok((next, group_id))
    }

    /// Dissolve group `id`, splicing its children into the group's parent at
    /// the group's position, projected into the parent's coordinate space.
    pub fn ungroup(&self, tree: &Tree, id: ComponentId) -> Result<Tree, CoreError> {
        let map = self.map(tree)?;
        let path = map.resolve_path(id).ok_or(MutateError::NotFound(id))?;
        let group = tree.get(path).ok_or(MutateError::NotFound(id))?;
        if !group.is_group() {
            return Err(MutateError::NotAGroup(id).into());
        }
        let group_style = group.style();
        let group_attr = group.attr();

        let children: Vec<Arc<Component>> = group
            .components
            .iter()
            .map(|child| {
                let p = project_out_of_group(&child.style(), &group_style, &group_attr);
                let mut out = apply_patch(
                    child,
                    &json!({ "config": { "style": {
                        "left": p.left,
                        "top": p.top,
                        "width": p.width,
                        "height": p.height,
                        "rotate": p.rotate,
                    } } }),
                );
                out.parent = group.parent;
                Arc::new(out)
            })
            .collect();
        let count = children.len();

        let (parent_path, pos) = split_path(path, id)?;
        let (next, ()) = edit_tree(tree, parent_path, id, |list| {
            list.splice(pos..=pos, children);
            Ok(())
        })?;
        log::debug!("ungrouped {id} ({count} children)");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntegrityError;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ComponentId {
        ComponentId::intern(s)
    }

    fn at(left: f64, top: f64, width: f64, height: f64) -> Value {
        json!({ "style": { "left": left, "top": top, "width": width, "height": height } })
    }

    fn leaf(name: &str, config: Value) -> Component {
        Component::leaf(id(name), "BAR_CHART", config)
    }

    /// [ g { a, b }, c ]
    fn sample(prefix: &str) -> Tree {
        let n = |s: &str| format!("{prefix}_{s}");
        let mut a = leaf(&n("a"), at(0.0, 0.0, 10.0, 10.0));
        let mut b = leaf(&n("b"), at(20.0, 0.0, 10.0, 10.0));
        a.parent = Some(id(&n("g")));
        b.parent = Some(id(&n("g")));
        let g = Component::group(id(&n("g")), at(100.0, 100.0, 30.0, 10.0))
            .with_children(vec![Arc::new(a), Arc::new(b)]);
        let c = leaf(&n("c"), at(50.0, 50.0, 10.0, 10.0));
        Tree::from_components([g, c])
    }

    fn ids(tree: &Tree) -> Vec<String> {
        tree.iter().map(|c| c.id.as_str().to_string()).collect()
    }

    #[test]
    fn update_shares_untouched_subtrees() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("u");
        let next = m
            .update(&tree, id("u_a"), &json!({ "config": { "style": { "left": 10 } } }))
            .unwrap();

        assert_eq!(next.get(&[0, 0]).unwrap().style().left, 10.0);
        // Sibling inside the group and the other top-level are the same Arcs.
        assert!(Arc::ptr_eq(tree.get(&[0, 1]).unwrap(), next.get(&[0, 1]).unwrap()));
        assert!(Arc::ptr_eq(&tree.roots()[1], &next.roots()[1]));
        // The group itself was rebuilt, but shares its config.
        assert!(!Arc::ptr_eq(&tree.roots()[0], &next.roots()[0]));
        assert!(Arc::ptr_eq(&tree.roots()[0].config, &next.roots()[0].config));
        assert!(!tree.ptr_eq(&next));
    }

    #[test]
    fn update_batch_is_all_or_nothing() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("ub");
        let patches = vec![
            ComponentPatch::new(id("ub_a"), json!({ "name": "first" })),
            ComponentPatch::new(id("ub_ghost"), json!({ "name": "nope" })),
        ];
        assert_eq!(
            m.update_batch(&tree, &patches).unwrap_err(),
            CoreError::Mutate(MutateError::NotFound(id("ub_ghost")))
        );
    }

    #[test]
    fn update_batch_applies_same_id_in_order() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("uo");
        let patches = vec![
            ComponentPatch::new(id("uo_c"), json!({ "config": { "style": { "left": 1, "top": 1 } } })),
            ComponentPatch::new(id("uo_b"), json!({ "config": { "style": { "top": 7 } } })),
            ComponentPatch::new(id("uo_c"), json!({ "config": { "style": { "left": 2 } } })),
        ];
        let next = m.update_batch(&tree, &patches).unwrap();
        let c = next.get(&[1]).unwrap().style();
        assert_eq!((c.left, c.top), (2.0, 1.0));
        assert_eq!(next.get(&[0, 1]).unwrap().style().top, 7.0);
    }

    #[test]
    fn patch_ignores_structural_keys_and_keeps_extras() {
        let node = leaf("pk_leaf", json!({}));
        let out = apply_patch(
            &node,
            &json!({ "id": "other", "type": "GROUP_COMPONENT", "name": "Sales", "description": "q3" }),
        );
        assert_eq!(out.id, id("pk_leaf"));
        assert!(!out.is_group());
        assert_eq!(out.name, "Sales");
        assert_eq!(out.extra.get("description"), Some(&json!("q3")));
    }

    #[test]
    fn insert_sets_parent_and_position() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("in");
        let next = m
            .insert(&tree, leaf("in_new", json!({})), Some(id("in_g")), Some(1))
            .unwrap();
        assert_eq!(ids(&next), ["in_g", "in_a", "in_new", "in_b", "in_c"]);
        assert_eq!(next.get(&[0, 1]).unwrap().parent, Some(id("in_g")));

        let appended = m.insert(&next, leaf("in_top", json!({})), None, None).unwrap();
        assert_eq!(appended.roots().last().unwrap().id, id("in_top"));
        assert_eq!(appended.roots().last().unwrap().parent, None);
    }

    #[test]
    fn insert_fixes_nested_parent_links() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let inner = leaf("nl_child", json!({}));
        let group = Component::group(id("nl_group"), json!({})).with_children(vec![Arc::new(inner)]);
        let next = m.insert(&Tree::default(), group, None, None).unwrap();
        assert_eq!(next.get(&[0, 0]).unwrap().parent, Some(id("nl_group")));
        assert!(IdPathMap::build(&next).is_ok());
    }

    #[test]
    fn insert_rejects_unknown_parent_leaf_parent_and_duplicates() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("ir");
        assert_eq!(
            m.insert(&tree, leaf("ir_x", json!({})), Some(id("ir_nowhere")), None).unwrap_err(),
            CoreError::Mutate(MutateError::NotFound(id("ir_nowhere")))
        );
        assert_eq!(
            m.insert(&tree, leaf("ir_y", json!({})), Some(id("ir_c")), None).unwrap_err(),
            CoreError::Mutate(MutateError::NotAGroup(id("ir_c")))
        );
        assert_eq!(
            m.insert(&tree, leaf("ir_a", json!({})), None, None).unwrap_err(),
            CoreError::Mutate(MutateError::DuplicateId(id("ir_a")))
        );
    }

    #[test]
    fn insert_rejects_leaf_carrying_children() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("lc");
        let holder = leaf("lc_holder", json!({}))
            .with_children(vec![Arc::new(leaf("lc_kid", json!({})))]);
        assert_eq!(
            m.insert(&tree, holder, None, None).unwrap_err(),
            CoreError::Mutate(MutateError::NotAGroup(id("lc_holder")))
        );
    }

    #[test]
    fn remove_cascades_to_descendants() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("rm");
        let next = m.remove(&tree, id("rm_g")).unwrap();
        assert_eq!(ids(&next), ["rm_c"]);
        let map = index.map(&next).unwrap();
        assert!(map.resolve_path(id("rm_a")).is_none());
        assert!(map.resolve_path(id("rm_b")).is_none());
        assert!(Arc::ptr_eq(&tree.roots()[1], &next.roots()[0]));
    }

    #[test]
    fn remove_missing_is_not_found() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        assert_eq!(
            m.remove(&sample("rn"), id("rn_zzz")).unwrap_err(),
            CoreError::Mutate(MutateError::NotFound(id("rn_zzz")))
        );
    }

    #[test]
    fn remove_many_handles_nested_selection() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("rmm");
        let next = m
            .remove_many(&tree, &[id("rmm_a"), id("rmm_g"), id("rmm_c")])
            .unwrap();
        assert!(next.is_empty());
    }

    #[test]
    fn reparent_moves_in_one_step() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("rp");
        let next = m.reparent(&tree, id("rp_c"), Some(id("rp_g")), Some(0)).unwrap();
        assert_eq!(ids(&next), ["rp_g", "rp_c", "rp_a", "rp_b"]);
        assert_eq!(next.get(&[0, 0]).unwrap().parent, Some(id("rp_g")));

        let out = m.reparent(&next, id("rp_a"), None, None).unwrap();
        assert_eq!(ids(&out), ["rp_g", "rp_c", "rp_b", "rp_a"]);
        assert_eq!(out.roots()[1].parent, None);
    }

    #[test]
    fn reparent_adjusts_target_path_after_removal() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        // [ x, g2 {} ]: moving x into g2 shifts g2 from index 1 to 0.
        let x = leaf("ra_x", json!({}));
        let g2 = Component::group(id("ra_g2"), json!({}));
        let tree = Tree::from_components([x, g2]);
        let next = m.reparent(&tree, id("ra_x"), Some(id("ra_g2")), None).unwrap();
        assert_eq!(ids(&next), ["ra_g2", "ra_x"]);
        assert!(IdPathMap::build(&next).is_ok());
    }

    #[test]
    fn reparent_into_descendant_is_cycle() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let mut inner = Component::group(id("cy_inner"), json!({}));
        inner.parent = Some(id("cy_outer"));
        let outer = Component::group(id("cy_outer"), json!({})).with_children(vec![Arc::new(inner)]);
        let tree = Tree::from_components([outer]);

        let err = m.reparent(&tree, id("cy_outer"), Some(id("cy_inner")), None).unwrap_err();
        assert_eq!(
            err,
            CoreError::Mutate(MutateError::Cycle {
                id: id("cy_outer"),
                parent: id("cy_inner"),
            })
        );
        assert_eq!(
            m.reparent(&tree, id("cy_outer"), Some(id("cy_outer")), None).unwrap_err(),
            CoreError::Mutate(MutateError::Cycle {
                id: id("cy_outer"),
                parent: id("cy_outer"),
            })
        );
    }

    #[test]
    fn reorder_within_siblings() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("zo");
        let front = m.reorder(&tree, id("zo_a"), ZOrder::ToFront).unwrap();
        assert_eq!(ids(&front), ["zo_g", "zo_b", "zo_a", "zo_c"]);

        let same = m.reorder(&tree, id("zo_a"), ZOrder::Backward).unwrap();
        assert!(same.ptr_eq(&tree));

        let back = m.reorder(&tree, id("zo_c"), ZOrder::ToBack).unwrap();
        assert_eq!(back.roots()[0].id, id("zo_c"));
    }

    #[test]
    fn group_then_ungroup_restores_geometry() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let a = leaf("gu_a", at(10.0, 20.0, 30.0, 40.0));
        let b = leaf("gu_b", at(100.0, 50.0, 20.0, 20.0));
        let c = leaf("gu_c", at(0.0, 0.0, 5.0, 5.0));
        let tree = Tree::from_components([c, a, b]);

        let (grouped, gid) = m.group(&tree, &[id("gu_b"), id("gu_a")]).unwrap();
        assert_eq!(ids(&grouped), ["gu_c", gid.as_str(), "gu_a", "gu_b"]);
        let group = grouped.get(&[1]).unwrap();
        let s = group.style();
        assert_eq!((s.left, s.top, s.width, s.height), (10.0, 20.0, 110.0, 50.0));
        let a_local = group.components[0].style();
        assert_eq!((a_local.left, a_local.top), (0.0, 0.0));
        let b_local = group.components[1].style();
        assert_eq!((b_local.left, b_local.top), (90.0, 30.0));
        assert_eq!(group.components[1].parent, Some(gid));

        let restored = m.ungroup(&grouped, gid).unwrap();
        assert_eq!(ids(&restored), ["gu_c", "gu_a", "gu_b"]);
        let ra = restored.get(&[1]).unwrap().style();
        let rb = restored.get(&[2]).unwrap().style();
        assert_eq!((ra.left, ra.top, ra.width, ra.height), (10.0, 20.0, 30.0, 40.0));
        assert_eq!((rb.left, rb.top, rb.width, rb.height), (100.0, 50.0, 20.0, 20.0));
        assert_eq!(restored.get(&[1]).unwrap().parent, None);
        assert!(Arc::ptr_eq(&tree.roots()[0], &restored.roots()[0]));
    }

    #[test]
    fn group_requires_shared_parent() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("gp");
        assert_eq!(
            m.group(&tree, &[id("gp_a"), id("gp_c")]).unwrap_err(),
            CoreError::Mutate(MutateError::MixedParents)
        );
        assert_eq!(
            m.group(&tree, &[]).unwrap_err(),
            CoreError::Mutate(MutateError::EmptySelection)
        );
    }

    #[test]
    fn group_inside_group_keeps_parent_link() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = sample("gn");
        let (next, gid) = m.group(&tree, &[id("gn_b")]).unwrap();
        let map = index.map(&next).unwrap();
        assert_eq!(map.get(gid).unwrap().parent, Some(id("gn_g")));
        assert_eq!(map.get(id("gn_b")).unwrap().parent, Some(gid));
    }

    #[test]
    fn ungroup_leaf_is_rejected() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        assert_eq!(
            m.ungroup(&sample("ul"), id("ul_c")).unwrap_err(),
            CoreError::Mutate(MutateError::NotAGroup(id("ul_c")))
        );
    }

    #[test]
    fn corrupt_tree_surfaces_integrity_error() {
        let index = PathIndex::new();
        let m = TreeMutator::new(&index);
        let tree = Tree::from_components([leaf("ce_dup", json!({})), leaf("ce_dup", json!({}))]);
        assert_eq!(
            m.remove(&tree, id("ce_dup")).unwrap_err(),
            CoreError::Integrity(IntegrityError::DuplicateId(id("ce_dup")))
        );
    }
}
