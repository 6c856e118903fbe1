//! Persistence shape of a tree: JSON for storage, MessagePack for compact
//! clipboard blobs.
//!
//! Every decoder runs the integrity checks before handing a tree back, so
//! a corrupt document is refused at the boundary instead of surfacing later
//! as a failed flush.

use crate::error::CoreError;
use crate::integrity::validate;
use crate::model::Tree;
use serde_json::Value;

fn codec(e: impl std::fmt::Display) -> CoreError {
    CoreError::Codec(e.to_string())
}

fn checked(tree: Tree) -> Result<Tree, CoreError> {
    match validate(&tree).into_iter().next() {
        Some(problem) => {
            log::warn!("refusing corrupt tree: {problem}");
            Err(problem.into())
        }
        None => Ok(tree),
    }
}

/// Tree → JSON array of components.
pub fn serialize(tree: &Tree) -> Result<Value, CoreError> {
    serde_json::to_value(tree).map_err(codec)
}

/// JSON array of components → validated tree.
pub fn deserialize(value: Value) -> Result<Tree, CoreError> {
    checked(serde_json::from_value(value).map_err(codec)?)
}

pub fn to_json_string(tree: &Tree) -> Result<String, CoreError> {
    serde_json::to_string(tree).map_err(codec)
}

pub fn from_json_str(text: &str) -> Result<Tree, CoreError> {
    checked(serde_json::from_str(text).map_err(codec)?)
}

/// Compact binary form. Goes through `Value` so flattened unknown keys
/// survive with their field names.
pub fn to_msgpack(tree: &Tree) -> Result<Vec<u8>, CoreError> {
    let value = serialize(tree)?;
    rmp_serde::to_vec_named(&value).map_err(codec)
}

pub fn from_msgpack(bytes: &[u8]) -> Result<Tree, CoreError> {
    let value: Value = rmp_serde::from_slice(bytes).map_err(codec)?;
    deserialize(value)
}
