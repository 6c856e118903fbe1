//! Error taxonomy for the component tree core.
//!
//! Structural failures are ordinary values: a caller (usually the intent
//! pool) decides whether to drop the operation, surface a notice, or abort
//! a flush. Nothing here is ever raised as a panic on the render path.

use crate::id::ComponentId;
use thiserror::Error;

/// A structural operation could not be applied to the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutateError {
    /// The referenced component is not in the current tree.
    #[error("component `{0}` not found")]
    NotFound(ComponentId),
    /// Moving `id` under `parent` would make it its own ancestor.
    #[error("cannot move `{id}` under `{parent}`: target is inside the moved subtree")]
    Cycle {
        id: ComponentId,
        parent: ComponentId,
    },
    /// Children can only be placed inside group components.
    #[error("component `{0}` is not a group")]
    NotAGroup(ComponentId),
    /// Grouping needs every selected component to share one parent.
    #[error("selected components do not share a parent")]
    MixedParents,
    /// Grouping was asked for with no components.
    #[error("empty selection")]
    EmptySelection,
    /// An inserted subtree carries an id that already exists.
    #[error("component id `{0}` already exists")]
    DuplicateId(ComponentId),
}

/// The existing tree data is corrupt. Fatal to the command that found it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("duplicate component id `{0}`")]
    DuplicateId(ComponentId),
    /// A child's `parent` field disagrees with the group that holds it.
    #[error("component `{id}` records parent {recorded:?} but sits under {actual:?}")]
    ParentMismatch {
        id: ComponentId,
        recorded: Option<ComponentId>,
        actual: Option<ComponentId>,
    },
    /// Following `parent` links from `id` revisits a component.
    #[error("parent links starting at `{0}` form a cycle")]
    ParentCycle(ComponentId),
    /// Only group components may hold children.
    #[error("leaf component `{0}` has children")]
    LeafWithChildren(ComponentId),
}

/// Any failure the core can report across its public surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Mutate(#[from] MutateError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    /// Encoding or decoding a persisted tree failed.
    #[error("codec error: {0}")]
    Codec(String),
}

impl CoreError {
    /// `true` for errors that must abort a whole flush rather than one intent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::Integrity(_) | CoreError::Codec(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_component() {
        let id = ComponentId::intern("pie_1");
        assert_eq!(
            MutateError::NotFound(id).to_string(),
            "component `pie_1` not found"
        );
    }

    #[test]
    fn only_integrity_and_codec_are_fatal() {
        let id = ComponentId::intern("x");
        assert!(!CoreError::from(MutateError::NotFound(id)).is_fatal());
        assert!(CoreError::from(IntegrityError::DuplicateId(id)).is_fatal());
        assert!(CoreError::Codec("bad".into()).is_fatal());
    }
}
