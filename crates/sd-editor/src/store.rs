//! The screen store: the one mutable cell of an editing session.
//!
//! Holds the published tree and its version counter. Every new tree comes
//! out of a pool flush or a history move and is published here, and every
//! read (path lookups, ancestor chains, the render layer) goes through the
//! store's `PathIndex`, which stays warm until the next publish.

use crate::clipboard::Clipboard;
use crate::config::EditorConfig;
use crate::history::HistoryEngine;
use crate::pool::{DataChangePool, FlushReport, Intent};
use crate::theme::theme_patches;
use sd_core::{
    Component, ComponentId, ComponentRegistry, CoreError, IndexPath, PathIndex, Tree, TreeMutator,
    serialize,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of applying one intent immediately.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// The published tree after the call (unchanged on error).
    pub tree: Tree,
    pub error: Option<CoreError>,
}

pub struct ScreenStore {
    tree: Tree,
    version: u64,
    index: PathIndex,
    history: HistoryEngine,
    pool: DataChangePool,
    registry: ComponentRegistry,
    config: EditorConfig,
}

impl ScreenStore {
    /// An empty screen.
    pub fn new(config: EditorConfig, registry: ComponentRegistry) -> Self {
        let tree = Tree::default();
        Self {
            history: HistoryEngine::new(tree.clone(), config.history_limit),
            tree,
            version: 0,
            index: PathIndex::new(),
            pool: DataChangePool::new(),
            registry,
            config,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Bumped on every publish.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &HistoryEngine {
        &self.history
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    fn publish(&mut self, tree: Tree) {
        self.tree = tree;
        self.version += 1;
        log::debug!("store: published version {}", self.version);
    }

    // ─── Load / save ─────────────────────────────────────────────────────

    /// Replace the whole screen. History restarts from it and anything
    /// queued for the old screen is dropped.
    pub fn load(&mut self, tree: Tree) -> Result<(), CoreError> {
        self.index.map(&tree)?;
        let dropped = self.pool.clear();
        if dropped > 0 {
            log::debug!("store: load dropped {dropped} pending intents");
        }
        self.history.clear(tree.clone());
        self.publish(tree);
        Ok(())
    }

    pub fn load_json(&mut self, value: Value) -> Result<(), CoreError> {
        self.load(serialize::deserialize(value)?)
    }

    pub fn save(&self) -> Result<Value, CoreError> {
        serialize::serialize(&self.tree)
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    pub fn submit(&mut self, intent: Intent) {
        self.pool.submit(intent);
    }

    pub fn submit_untracked(&mut self, intent: Intent) {
        self.pool.submit_untracked(intent);
    }

    pub fn pending(&self) -> usize {
        self.pool.len()
    }

    /// Apply everything queued, publish the result and record it in
    /// history when asked to.
    pub fn flush(&mut self) -> FlushReport {
        let mut pool = std::mem::take(&mut self.pool);
        self.commit(&mut pool)
    }

    fn commit(&mut self, pool: &mut DataChangePool) -> FlushReport {
        let mutator = TreeMutator::new(&self.index).with_layout(self.config.group);
        let report = pool.flush(&self.tree, &mutator);
        if report.aborted.is_none() && !report.tree.ptr_eq(&self.tree) {
            if report.record {
                self.history.enqueue(&report.tree, &self.tree);
            }
            self.publish(report.tree.clone());
        }
        report
    }

    /// Apply `intent` on its own and publish the result. Intents already
    /// queued stay queued for the next `flush`, so the outcome only ever
    /// describes `intent`.
    pub fn apply_intent(&mut self, intent: Intent) -> ApplyOutcome {
        let mut single = DataChangePool::new();
        single.submit(intent);
        let report = self.commit(&mut single);
        ApplyOutcome {
            error: report.first_error().cloned(),
            tree: self.tree.clone(),
        }
    }

    /// Step back one recorded version. Pending intents were issued against
    /// the tree being left and are dropped.
    pub fn undo(&mut self) -> Option<Tree> {
        let tree = self.history.undo()?;
        self.pool.clear();
        self.publish(tree.clone());
        Some(tree)
    }

    pub fn redo(&mut self) -> Option<Tree> {
        let tree = self.history.redo()?;
        self.pool.clear();
        self.publish(tree.clone());
        Some(tree)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn resolve(&self, id: ComponentId) -> Result<Option<IndexPath>, CoreError> {
        Ok(self.index.resolve_path(&self.tree, id)?)
    }

    pub fn resolve_ancestors(&self, id: ComponentId) -> Result<Vec<ComponentId>, CoreError> {
        Ok(self.index.resolve_ancestor_chain(&self.tree, id)?)
    }

    pub fn resolve_descendants(&self, id: ComponentId) -> Result<HashSet<ComponentId>, CoreError> {
        Ok(self.index.resolve_descendant_ids(&self.tree, id)?)
    }

    pub fn component(&self, id: ComponentId) -> Result<Option<Arc<Component>>, CoreError> {
        let map = self.index.map(&self.tree)?;
        Ok(map.component(&self.tree, id).cloned())
    }

    // ─── Palette, clipboard, theme ───────────────────────────────────────

    /// Template a new component of type `tag` and queue its insertion.
    /// Returns the new id.
    pub fn add_component(&mut self, tag: &str, name: &str, parent: Option<ComponentId>) -> ComponentId {
        let component = self.registry.create_component(tag, name);
        let id = component.id;
        self.submit(Intent::Insert {
            component,
            parent,
            index: None,
        });
        id
    }

    pub fn copy(&self, ids: &[ComponentId]) -> Result<Clipboard, CoreError> {
        let map = self.index.map(&self.tree)?;
        Ok(Clipboard::copy(&self.tree, &map, ids))
    }

    /// Copy and queue removal of the originals.
    pub fn cut(&mut self, ids: &[ComponentId]) -> Result<Clipboard, CoreError> {
        let map = self.index.map(&self.tree)?;
        let (clipboard, remove) = Clipboard::cut(&self.tree, &map, ids);
        if !clipboard.is_empty() {
            self.submit(remove);
        }
        Ok(clipboard)
    }

    /// Queue inserts for the clipboard's contents under `parent`.
    pub fn paste(&mut self, clipboard: &Clipboard, parent: Option<ComponentId>) -> usize {
        let intents = clipboard.paste(parent, self.config.paste_offset);
        let n = intents.len();
        for intent in intents {
            self.submit(intent);
        }
        n
    }

    /// Queue option patches recolouring every component for `palette`.
    /// Returns how many components the theme touches.
    pub fn set_theme(&mut self, palette: &[String]) -> usize {
        let patches = theme_patches(&self.tree, &self.registry, palette);
        let n = patches.len();
        if n > 0 {
            self.submit(Intent::UpdateEach { patches });
        }
        n
    }
}

impl std::fmt::Debug for ScreenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenStore")
            .field("version", &self.version)
            .field("components", &self.tree.node_count())
            .field("pending", &self.pool.len())
            .field("history", &self.history.len())
            .finish()
    }
}
