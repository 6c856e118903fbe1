//! Theme switching: ask each component type how it recolours itself and
//! turn the answers into option patches.

use sd_core::{ComponentPatch, ComponentRegistry, Tree};
use serde_json::{Value, json};

/// One `{ config: { options } }` patch per leaf whose type has a theme
/// converter that wants to change something. Components of unknown types,
/// types without a converter and converters returning an empty record are
/// skipped.
pub fn theme_patches(tree: &Tree, registry: &ComponentRegistry, palette: &[String]) -> Vec<ComponentPatch> {
    let empty = Value::Null;
    tree.iter()
        .filter(|c| !c.is_group())
        .filter_map(|c| {
            let convert = registry.get(&c.component_type)?.theme_converter?;
            let options = c.config.get("options").unwrap_or(&empty);
            let patch = convert(palette, options);
            match patch.as_object() {
                Some(fields) if !fields.is_empty() => Some(ComponentPatch::new(
                    c.id,
                    json!({ "config": { "options": patch } }),
                )),
                _ => None,
            }
        })
        .collect()
}
