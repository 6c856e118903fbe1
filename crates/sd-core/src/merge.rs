//! Config merging: the one deep-merge used everywhere a patch meets a config.
//!
//! Rules, in order of precedence:
//! - a key absent from the patch leaves the base untouched;
//! - `null` in the patch clears the key (it is removed from the result);
//! - an array in the patch replaces the base value wholesale; arrays are
//!   atomic, never merged element by element;
//! - two records merge recursively;
//! - anything else (scalar over record, record over scalar, …) is a type
//!   conflict and the patch value wins.

use crate::id::ComponentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Merge ───────────────────────────────────────────────────────────────

/// Merge `patch` into a copy of `base`.
#[must_use]
pub fn merge(base: &Value, patch: &Value) -> Value {
    let mut out = base.clone();
    merge_into(&mut out, patch);
    out
}

/// Merge `patch` into `base` in place.
pub fn merge_into(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(dst), Value::Object(src)) => merge_maps(dst, src),
        (base, patch) => {
            if is_type_conflict(base, patch) {
                log::trace!("merge type conflict: patch value overwrites base");
            }
            *base = patch.clone();
        }
    }
}

#[derive(PartialEq, Eq)]
enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

fn kind(value: &Value) -> Kind {
    match value {
        Value::Null => Kind::Null,
        Value::Bool(_) => Kind::Bool,
        Value::Number(_) => Kind::Number,
        Value::String(_) => Kind::String,
        Value::Array(_) => Kind::Array,
        Value::Object(_) => Kind::Object,
    }
}

/// Both sides carry a value and the kinds differ.
fn is_type_conflict(base: &Value, patch: &Value) -> bool {
    let (b, p) = (kind(base), kind(patch));
    b != Kind::Null && p != Kind::Null && b != p
}

/// Record-level merge used for configs and for a component's extra keys.
pub fn merge_maps(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, value) in src {
        match value {
            Value::Null => {
                dst.remove(key);
            }
            Value::Object(_) => match dst.get_mut(key) {
                Some(existing @ Value::Object(_)) => merge_into(existing, value),
                existing => {
                    if existing.is_some_and(|e| is_type_conflict(e, value)) {
                        log::trace!("merge type conflict at `{key}`: record overwrites base");
                    }
                    // Fresh or conflicting slot: strip nulls so "clear" keys
                    // inside a new record do not materialise as nulls.
                    dst.insert(key.clone(), without_nulls(value));
                }
            },
            other => {
                if dst.get(key).is_some_and(|e| is_type_conflict(e, other)) {
                    log::trace!("merge type conflict at `{key}`: patch value overwrites base");
                }
                dst.insert(key.clone(), other.clone());
            }
        }
    }
}

/// Left fold of `merge` over `layers`, starting from an empty record.
#[must_use]
pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut out = Value::Object(Map::new());
    for layer in layers {
        merge_into(&mut out, layer);
    }
    out
}

fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// ─── Fan-out ─────────────────────────────────────────────────────────────

/// A patch addressed to one component: `{ id, patch }`.
///
/// `patch` is shaped like a serialized component, e.g.
/// `{ "config": { "style": { "left": 10 } } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPatch {
    pub id: ComponentId,
    pub patch: Value,
}

impl ComponentPatch {
    pub fn new(id: ComponentId, patch: Value) -> Self {
        Self { id, patch }
    }
}

/// The same patch for every target, e.g. "hide selection".
#[must_use]
pub fn fan_out(ids: &[ComponentId], patch: &Value) -> Vec<ComponentPatch> {
    ids.iter()
        .map(|&id| ComponentPatch::new(id, patch.clone()))
        .collect()
}

/// A computed patch per target, e.g. "align selection to left edge".
#[must_use]
pub fn fan_out_each(pairs: impl IntoIterator<Item = (ComponentId, Value)>) -> Vec<ComponentPatch> {
    pairs
        .into_iter()
        .map(|(id, patch)| ComponentPatch::new(id, patch))
        .collect()
}
