//! Path index: component id → location in the current tree.
//!
//! `IdPathMap::build` walks a tree once (O(n)) and records, per id, the
//! child-index path from the top level, the parent id, the effective
//! visibility/lock and the data filter. `PathIndex` memoizes the map against
//! the tree's root identity: asking again for the same version is free, any
//! new version (every mutation produces one) triggers a rebuild.

use crate::error::IntegrityError;
use crate::id::ComponentId;
use crate::integrity::find_parent_cycle;
use crate::model::{Component, Tree};
use serde_json::Value;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Child indices from the top level down to a component.
pub type IndexPath = SmallVec<[usize; 4]>;

// ─── Entries ─────────────────────────────────────────────────────────────

/// Location metadata for one component.
#[derive(Debug, Clone, PartialEq)]
pub struct PathEntry {
    pub path: IndexPath,
    pub parent: Option<ComponentId>,
    /// Visible only if the component and every ancestor are visible.
    pub visible: bool,
    /// Locked if the component or any ancestor is locked.
    pub lock: bool,
    /// The component's `config.data.filter`, when it has one.
    pub filter: Option<Value>,
    /// Own `attr.scaleX` / `attr.scaleY`.
    pub scale: (f64, f64),
    /// Position in pre-order and end of the subtree (exclusive).
    order: usize,
    subtree_end: usize,
}

// ─── Id → path map ───────────────────────────────────────────────────────

/// Snapshot index for one tree version.
#[derive(Debug, Default)]
pub struct IdPathMap {
    entries: HashMap<ComponentId, PathEntry>,
    /// Every id in pre-order; a subtree is a contiguous run.
    order: Vec<ComponentId>,
    /// Top-level ids in tree order.
    top: Vec<ComponentId>,
}

struct Inherited {
    parent: Option<ComponentId>,
    visible: bool,
    lock: bool,
}

impl IdPathMap {
    /// Index `tree` in a single traversal.
    ///
    /// # Errors
    /// Duplicate ids, `parent` fields that disagree with the structure, or
    /// `parent` links that loop.
    pub fn build(tree: &Tree) -> Result<Self, IntegrityError> {
        let mut map = IdPathMap {
            entries: HashMap::with_capacity(tree.roots().len() * 4),
            order: Vec::new(),
            top: Vec::with_capacity(tree.roots().len()),
        };
        let mut mismatch = None;
        let mut path = IndexPath::new();
        let top = Inherited {
            parent: None,
            visible: true,
            lock: false,
        };
        for (i, root) in tree.roots().iter().enumerate() {
            map.top.push(root.id);
            path.push(i);
            map.visit(root, &top, &mut path, &mut mismatch)?;
            path.pop();
        }

        if let Some(err) = mismatch {
            // A mismatch can be one edge of a corrupted parent cycle; report
            // the cycle when there is one since it is the root cause.
            let links: Vec<_> = tree.iter().map(|c| (c.id, c.parent)).collect();
            return Err(match find_parent_cycle(&links) {
                Some(id) => IntegrityError::ParentCycle(id),
                None => err,
            });
        }

        log::trace!("indexed {} components", map.order.len());
        Ok(map)
    }

    fn visit(
        &mut self,
        node: &Component,
        inherited: &Inherited,
        path: &mut IndexPath,
        mismatch: &mut Option<IntegrityError>,
    ) -> Result<(), IntegrityError> {
        if self.entries.contains_key(&node.id) {
            return Err(IntegrityError::DuplicateId(node.id));
        }
        if !node.is_group() && !node.components.is_empty() {
            return Err(IntegrityError::LeafWithChildren(node.id));
        }
        if node.parent != inherited.parent && mismatch.is_none() {
            *mismatch = Some(IntegrityError::ParentMismatch {
                id: node.id,
                recorded: node.parent,
                actual: inherited.parent,
            });
        }

        let attr = node.attr();
        let visible = inherited.visible && attr.visible;
        let lock = inherited.lock || attr.lock;
        let order = self.order.len();
        self.order.push(node.id);
        self.entries.insert(
            node.id,
            PathEntry {
                path: path.clone(),
                parent: inherited.parent,
                visible,
                lock,
                filter: node.filter().cloned(),
                scale: (attr.scale_x, attr.scale_y),
                order,
                subtree_end: order + 1,
            },
        );

        let below = Inherited {
            parent: Some(node.id),
            visible,
            lock,
        };
        for (i, child) in node.components.iter().enumerate() {
            path.push(i);
            self.visit(child, &below, path, mismatch)?;
            path.pop();
        }

        let end = self.order.len();
        if let Some(entry) = self.entries.get_mut(&node.id) {
            entry.subtree_end = end;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: ComponentId) -> Option<&PathEntry> {
        self.entries.get(&id)
    }

    /// Path of `id`; `None` means the component no longer exists.
    pub fn resolve_path(&self, id: ComponentId) -> Option<&[usize]> {
        self.entries.get(&id).map(|e| e.path.as_slice())
    }

    /// Ancestor ids, nearest parent first. Empty for top-level or unknown ids.
    ///
    /// # Errors
    /// `ParentCycle` if the recorded parent links revisit a component.
    pub fn resolve_ancestor_chain(&self, id: ComponentId) -> Result<Vec<ComponentId>, IntegrityError> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut current = self.entries.get(&id).and_then(|e| e.parent);
        while let Some(parent) = current {
            if !visited.insert(parent) {
                return Err(IntegrityError::ParentCycle(id));
            }
            chain.push(parent);
            current = self.entries.get(&parent).and_then(|e| e.parent);
        }
        Ok(chain)
    }

    /// Every id below `id` (not including `id`). Empty for leaves and
    /// unknown ids.
    pub fn resolve_descendant_ids(&self, id: ComponentId) -> HashSet<ComponentId> {
        self.descendants(id).iter().copied().collect()
    }

    /// Descendants of `id` in pre-order.
    pub fn descendants(&self, id: ComponentId) -> &[ComponentId] {
        match self.entries.get(&id) {
            Some(e) => &self.order[e.order + 1..e.subtree_end],
            None => &[],
        }
    }

    /// `true` when `ancestor` strictly contains `id`.
    pub fn is_ancestor_of(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        match (self.entries.get(&ancestor), self.entries.get(&id)) {
            (Some(a), Some(d)) => d.order > a.order && d.order < a.subtree_end,
            _ => false,
        }
    }

    /// Outermost ancestor of `id`, or `id` itself at top level.
    pub fn top_level_of(&self, id: ComponentId) -> Option<ComponentId> {
        let first = *self.entries.get(&id)?.path.first()?;
        self.top.get(first).copied()
    }

    /// Product of scale factors from the top level down to `id`, inclusive.
    ///
    /// # Errors
    /// `ParentCycle` from the ancestor walk.
    pub fn effective_scale(&self, id: ComponentId) -> Result<Option<(f64, f64)>, IntegrityError> {
        let Some(entry) = self.entries.get(&id) else {
            return Ok(None);
        };
        let mut scale = entry.scale;
        for ancestor in self.resolve_ancestor_chain(id)? {
            if let Some(a) = self.entries.get(&ancestor) {
                scale.0 *= a.scale.0;
                scale.1 *= a.scale.1;
            }
        }
        Ok(Some(scale))
    }

    /// Absent, hidden or locked components cannot be interacted with.
    pub fn is_disabled(&self, id: ComponentId) -> bool {
        self.entries.get(&id).is_none_or(|e| e.lock || !e.visible)
    }

    /// Selection containment: `id` is selected, lives inside a selected
    /// group, or is a group containing a selected component.
    pub fn is_selected(&self, id: ComponentId, selection: &[ComponentId]) -> bool {
        selection
            .iter()
            .any(|&s| s == id || self.is_ancestor_of(s, id) || self.is_ancestor_of(id, s))
    }

    /// Component at `id`'s path in `tree`. `tree` must be the version this
    /// map was built from.
    pub fn component<'t>(&self, tree: &'t Tree, id: ComponentId) -> Option<&'t Arc<Component>> {
        tree.get(self.resolve_path(id)?)
    }
}

// ─── Memoizing index ─────────────────────────────────────────────────────

/// Memoized `IdPathMap` keyed on tree identity.
///
/// Single-threaded by construction (interior `RefCell`), like the rest of
/// the mutation pipeline.
#[derive(Debug, Default)]
pub struct PathIndex {
    cached: RefCell<Option<(Tree, Arc<IdPathMap>)>>,
    rebuilds: Cell<usize>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `tree`, rebuilt only when `tree` is a different version
    /// from the last one seen.
    ///
    /// # Errors
    /// Any `IntegrityError` from `IdPathMap::build`. Failed builds are not
    /// cached.
    pub fn map(&self, tree: &Tree) -> Result<Arc<IdPathMap>, IntegrityError> {
        if let Some((seen, map)) = self.cached.borrow().as_ref()
            && seen.ptr_eq(tree)
        {
            return Ok(Arc::clone(map));
        }
        let map = Arc::new(IdPathMap::build(tree)?);
        self.rebuilds.set(self.rebuilds.get() + 1);
        *self.cached.borrow_mut() = Some((tree.clone(), Arc::clone(&map)));
        Ok(map)
    }

    /// How many times the map has been rebuilt.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds.get()
    }

    /// Drop the cached map (and the tree version it pins).
    pub fn invalidate(&self) {
        self.cached.borrow_mut().take();
    }

    pub fn resolve_path(&self, tree: &Tree, id: ComponentId) -> Result<Option<IndexPath>, IntegrityError> {
        Ok(self.map(tree)?.get(id).map(|e| e.path.clone()))
    }

    pub fn resolve_ancestor_chain(
        &self,
        tree: &Tree,
        id: ComponentId,
    ) -> Result<Vec<ComponentId>, IntegrityError> {
        self.map(tree)?.resolve_ancestor_chain(id)
    }

    pub fn resolve_descendant_ids(
        &self,
        tree: &Tree,
        id: ComponentId,
    ) -> Result<HashSet<ComponentId>, IntegrityError> {
        Ok(self.map(tree)?.resolve_descendant_ids(id))
    }
}
