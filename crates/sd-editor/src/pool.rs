//! Intent pool: buffers the edits of one UI tick and applies them as a
//! single transaction.
//!
//! Panels fire intents as fast as the user types or drags. The pool keeps
//! them in arrival order and folds consecutive `Update`s to the same
//! component into one application step. `flush` then runs everything
//! against the current tree in one pass. The render layer and history only
//! ever see the tree that comes out of a flush, never the intermediate
//! states.

use sd_core::{
    Component, ComponentId, ComponentPatch, CoreError, PathIndex, Tree, TreeMutator, ZOrder,
    fan_out,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

// ─── Intents ─────────────────────────────────────────────────────────────

/// One edit requested by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Intent {
    Insert {
        component: Component,
        #[serde(default)]
        parent: Option<ComponentId>,
        #[serde(default)]
        index: Option<usize>,
    },
    Remove {
        id: ComponentId,
    },
    RemoveMany {
        ids: Vec<ComponentId>,
    },
    Update {
        id: ComponentId,
        patch: Value,
    },
    /// The same patch for every id.
    UpdateMany {
        ids: Vec<ComponentId>,
        patch: Value,
    },
    /// A computed patch per id.
    UpdateEach {
        patches: Vec<ComponentPatch>,
    },
    Reparent {
        id: ComponentId,
        #[serde(default)]
        parent: Option<ComponentId>,
        #[serde(default)]
        index: Option<usize>,
    },
    Reorder {
        id: ComponentId,
        order: ZOrder,
    },
    Group {
        ids: Vec<ComponentId>,
    },
    Ungroup {
        id: ComponentId,
    },
}

/// What applying one intent produced.
#[derive(Debug, Clone)]
pub struct Applied {
    pub tree: Tree,
    /// Id of a group created by a `Group` intent.
    pub created: Option<ComponentId>,
}

impl Intent {
    /// Structural intents change the shape of the tree, not just configs.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Intent::Update { .. } | Intent::UpdateMany { .. } | Intent::UpdateEach { .. }
        )
    }

    /// Apply to `tree`. The input tree is never modified.
    pub fn apply(&self, tree: &Tree, mutator: &TreeMutator<'_>) -> Result<Applied, CoreError> {
        self.apply_with(tree, mutator, &[])
    }

    /// `apply`, with further patches for an `Update` applied after its own.
    fn apply_with(
        &self,
        tree: &Tree,
        mutator: &TreeMutator<'_>,
        follow_up: &[Value],
    ) -> Result<Applied, CoreError> {
        let mut created = None;
        let tree = match self {
            Intent::Insert {
                component,
                parent,
                index,
            } => mutator.insert(tree, component.clone(), *parent, *index)?,
            Intent::Remove { id } => mutator.remove(tree, *id)?,
            Intent::RemoveMany { ids } => mutator.remove_many(tree, ids)?,
            Intent::Update { id, patch } => {
                let patches: Vec<ComponentPatch> = std::iter::once(patch)
                    .chain(follow_up)
                    .map(|p| ComponentPatch::new(*id, p.clone()))
                    .collect();
                mutator.update_batch(tree, &patches)?
            }
            Intent::UpdateMany { ids, patch } => mutator.update_batch(tree, &fan_out(ids, patch))?,
            Intent::UpdateEach { patches } => mutator.update_batch(tree, patches)?,
            Intent::Reparent { id, parent, index } => {
                mutator.reparent(tree, *id, *parent, *index)?
            }
            Intent::Reorder { id, order } => mutator.reorder(tree, *id, *order)?,
            Intent::Group { ids } => {
                let (tree, gid) = mutator.group(tree, ids)?;
                created = Some(gid);
                tree
            }
            Intent::Ungroup { id } => mutator.ungroup(tree, *id)?,
        };
        Ok(Applied { tree, created })
    }
}

// ─── Pool ────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Pending {
    intent: Intent,
    /// Later patches folded into an `Update`, applied in order after its own.
    follow_up: SmallVec<[Value; 2]>,
    record: bool,
}

/// Result of one flush.
#[derive(Debug, Clone)]
pub struct FlushReport {
    /// The tree to publish. The input tree (same identity) when nothing
    /// applied or the flush aborted.
    pub tree: Tree,
    /// Intents that applied (coalesced updates count once).
    pub applied: usize,
    /// Intents dropped on their own, with the reason.
    pub rejected: Vec<(Intent, CoreError)>,
    /// Groups created during the flush, in order.
    pub created: Vec<ComponentId>,
    /// At least one applied intent asked to be recorded in history.
    pub record: bool,
    /// Set when the flush was abandoned as a whole.
    pub aborted: Option<CoreError>,
}

impl FlushReport {
    fn unchanged(tree: &Tree) -> Self {
        Self {
            tree: tree.clone(),
            applied: 0,
            rejected: Vec::new(),
            created: Vec::new(),
            record: false,
            aborted: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.aborted.is_none()
    }

    /// The first thing that went wrong, if anything did.
    pub fn first_error(&self) -> Option<&CoreError> {
        self.aborted
            .as_ref()
            .or_else(|| self.rejected.first().map(|(_, e)| e))
    }
}

/// Per-tick intent buffer.
#[derive(Debug, Default)]
pub struct DataChangePool {
    pending: Vec<Pending>,
}

impl DataChangePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an intent whose result goes into undo history.
    pub fn submit(&mut self, intent: Intent) {
        self.push(intent, true);
    }

    /// Queue an intent that should not get its own undo step (drag frames,
    /// live previews).
    pub fn submit_untracked(&mut self, intent: Intent) {
        self.push(intent, false);
    }

    fn push(&mut self, intent: Intent, record: bool) {
        if let Intent::Update { id, patch } = &intent {
            // Fold into an earlier update of the same component, looking
            // past single-component updates of other components only.
            for pending in self.pending.iter_mut().rev() {
                match &pending.intent {
                    Intent::Update { id: other, .. } if other == id => {
                        pending.follow_up.push(patch.clone());
                        pending.record |= record;
                        log::trace!("pool: coalesced update for {id}");
                        return;
                    }
                    Intent::Update { .. } => continue,
                    _ => break,
                }
            }
        }
        self.pending.push(Pending {
            intent,
            follow_up: SmallVec::new(),
            record,
        });
    }

    /// Number of queued entries after coalescing.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything queued. Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Apply every queued intent, in order, against `tree`.
    ///
    /// Rejected intents are skipped and reported. An integrity failure,
    /// whether while applying or while indexing the result, abandons the
    /// whole flush and hands back `tree` unchanged. The queue is empty
    /// afterwards either way.
    pub fn flush(&mut self, tree: &Tree, mutator: &TreeMutator<'_>) -> FlushReport {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return FlushReport::unchanged(tree);
        }

        let mut report = FlushReport::unchanged(tree);
        let mut running = tree.clone();
        for Pending {
            intent,
            follow_up,
            record,
        } in pending
        {
            match intent.apply_with(&running, mutator, &follow_up) {
                Ok(applied) => {
                    running = applied.tree;
                    report.created.extend(applied.created);
                    report.applied += 1;
                    report.record |= record;
                }
                Err(err) if err.is_fatal() => {
                    log::warn!("pool: flush aborted: {err}");
                    return Self::aborted(tree, err);
                }
                Err(err) => {
                    log::warn!("pool: dropped {intent:?}: {err}");
                    report.rejected.push((intent, err));
                }
            }
        }

        if let Err(err) = check(mutator.index(), &running) {
            log::warn!("pool: flush produced a corrupt tree: {err}");
            return Self::aborted(tree, err);
        }

        log::debug!(
            "pool: flushed {} intents ({} rejected)",
            report.applied,
            report.rejected.len()
        );
        report.tree = running;
        report
    }

    fn aborted(tree: &Tree, err: CoreError) -> FlushReport {
        FlushReport {
            aborted: Some(err),
            ..FlushReport::unchanged(tree)
        }
    }
}

/// Index the flushed tree so the next reader gets a warm cache and a
/// corrupt result is caught here.
fn check(index: &PathIndex, tree: &Tree) -> Result<(), CoreError> {
    index.map(tree)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sd_core::MutateError;
    use serde_json::json;

    fn id(s: &str) -> ComponentId {
        ComponentId::intern(s)
    }

    fn leaf(name: &str) -> Component {
        Component::leaf(id(name), "TEXT", json!({ "style": { "left": 0, "top": 0 } }))
    }

    fn update(name: &str, patch: Value) -> Intent {
        Intent::Update { id: id(name), patch }
    }

    #[test]
    fn consecutive_updates_coalesce() {
        let mut pool = DataChangePool::new();
        pool.submit(update("pl_a", json!({ "name": "1" })));
        pool.submit(update("pl_b", json!({ "name": "x" })));
        pool.submit(update("pl_a", json!({ "name": "2" })));
        assert_eq!(pool.len(), 2);

        pool.submit(Intent::Remove { id: id("pl_b") });
        pool.submit(update("pl_a", json!({ "name": "3" })));
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn coalesced_updates_apply_in_order() {
        let index = PathIndex::new();
        let mutator = TreeMutator::new(&index);
        let tree = Tree::from_components([leaf("pc_a")]);
        let mut pool = DataChangePool::new();
        pool.submit(update("pc_a", json!({ "config": { "style": { "left": 5, "top": 5 } } })));
        pool.submit(update("pc_a", json!({ "config": { "style": { "left": 9 } } })));
        pool.submit(update("pc_a", json!({ "config": { "style": { "top": null } } })));

        let report = pool.flush(&tree, &mutator);
        assert!(report.is_clean());
        assert_eq!(report.applied, 1);
        let style = &report.tree.roots()[0].config["style"];
        assert_eq!(style, &json!({ "left": 9 }));
        assert!(pool.is_empty());
    }

    #[test]
    fn rejected_intent_does_not_block_the_rest() {
        let index = PathIndex::new();
        let mutator = TreeMutator::new(&index);
        let tree = Tree::from_components([leaf("pr_a")]);
        let mut pool = DataChangePool::new();
        pool.submit(Intent::Remove { id: id("pr_ghost") });
        pool.submit(update("pr_a", json!({ "name": "kept" })));

        let report = pool.flush(&tree, &mutator);
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(
            report.rejected[0].1,
            CoreError::Mutate(MutateError::NotFound(id("pr_ghost")))
        );
        assert_eq!(report.tree.roots()[0].name, "kept");
        assert!(report.record);
    }

    #[test]
    fn corrupt_tree_aborts_everything() {
        let index = PathIndex::new();
        let mutator = TreeMutator::new(&index);
        let tree = Tree::from_components([leaf("pa_dup"), leaf("pa_dup")]);
        let mut pool = DataChangePool::new();
        pool.submit(update("pa_dup", json!({ "name": "n" })));

        let report = pool.flush(&tree, &mutator);
        assert!(report.aborted.as_ref().is_some_and(CoreError::is_fatal));
        assert!(report.tree.ptr_eq(&tree));
        assert_eq!(report.applied, 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn empty_flush_keeps_identity() {
        let index = PathIndex::new();
        let mutator = TreeMutator::new(&index);
        let tree = Tree::from_components([leaf("pe_a")]);
        let report = DataChangePool::new().flush(&tree, &mutator);
        assert!(report.tree.ptr_eq(&tree));
        assert!(!report.record);
    }

    #[test]
    fn untracked_flush_is_not_recorded() {
        let index = PathIndex::new();
        let mutator = TreeMutator::new(&index);
        let tree = Tree::from_components([leaf("pu_a")]);
        let mut pool = DataChangePool::new();
        pool.submit_untracked(update("pu_a", json!({ "name": "drag" })));
        let report = pool.flush(&tree, &mutator);
        assert_eq!(report.applied, 1);
        assert!(!report.record);
    }

    #[test]
    fn group_intent_reports_created_id() {
        let index = PathIndex::new();
        let mutator = TreeMutator::new(&index);
        let tree = Tree::from_components([leaf("pg_a"), leaf("pg_b")]);
        let mut pool = DataChangePool::new();
        pool.submit(Intent::Group {
            ids: vec![id("pg_a"), id("pg_b")],
        });
        let report = pool.flush(&tree, &mutator);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.tree.roots()[0].id, report.created[0]);
    }

    #[test]
    fn intents_use_action_tags() {
        let intent: Intent = serde_json::from_value(json!({
            "action": "updateMany",
            "ids": ["pt_a", "pt_b"],
            "patch": { "config": { "attr": { "visible": false } } }
        }))
        .unwrap();
        assert!(matches!(&intent, Intent::UpdateMany { ids, .. } if ids.len() == 2));
        assert!(!intent.is_structural());

        let reorder = serde_json::to_value(Intent::Reorder {
            id: id("pt_a"),
            order: ZOrder::ToFront,
        })
        .unwrap();
        assert_eq!(
            reorder,
            json!({ "action": "reorder", "id": "pt_a", "order": "toFront" })
        );
    }
}
