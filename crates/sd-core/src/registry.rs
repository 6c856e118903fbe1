//! Component type registry: `componentType` → defaults, theme conversion and
//! renderer handle.
//!
//! The registry is how the tree meets the outside world. New components are
//! templated from it, a theme switch asks it how each type recolours itself,
//! and the render layer asks it which renderer draws a leaf.

use crate::id::ComponentId;
use crate::merge::merge_all;
use crate::model::{Component, base_config};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Recolours a type's `config.options` from a theme palette.
///
/// Returns the options patch to apply; an empty record means "nothing to
/// change" and produces no intent.
pub type ThemeConverter = fn(&[String], &Value) -> Value;

/// Opaque handle the render layer resolves to a concrete renderer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RendererHandle(Arc<str>);

impl RendererHandle {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Everything the core knows about one component type.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Layered over the base and data defaults when templating.
    pub default_config: Value,
    pub theme_converter: Option<ThemeConverter>,
    pub renderer: RendererHandle,
}

impl ComponentDescriptor {
    pub fn new(renderer: &str, default_config: Value) -> Self {
        Self {
            default_config,
            theme_converter: None,
            renderer: RendererHandle::new(renderer),
        }
    }

    pub fn with_theme_converter(mut self, convert: ThemeConverter) -> Self {
        self.theme_converter = Some(convert);
        self
    }
}

/// Data-source defaults every leaf starts with: a static, empty request and a
/// disabled filter.
static DATA_DEFAULTS: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "interactive": { "base": [] },
        "data": {
            "request": {
                "url": "",
                "method": "POST",
                "headers": "{}",
                "body": "{}",
                "frequency": { "show": false, "value": 15 },
                "type": "static",
                "value": [],
                "valueType": "array"
            },
            "filter": { "show": false, "fields": [], "value": {}, "map": [] }
        }
    })
});

/// Lookup table of component types.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    types: HashMap<String, ComponentDescriptor>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a type.
    pub fn register(&mut self, tag: &str, descriptor: ComponentDescriptor) {
        if self.types.insert(tag.to_string(), descriptor).is_some() {
            log::debug!("component type `{tag}` re-registered");
        }
    }

    pub fn get(&self, tag: &str) -> Option<&ComponentDescriptor> {
        self.types.get(tag)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Renderer for a leaf. Groups draw their children and have none.
    pub fn renderer_for(&self, component: &Component) -> Option<&RendererHandle> {
        if component.is_group() {
            return None;
        }
        self.get(&component.component_type).map(|d| &d.renderer)
    }

    /// A fresh leaf of type `tag`, configured `base ← data ← type defaults`.
    ///
    /// Unknown tags still produce a component (with the shared defaults
    /// only) so a screen saved by a newer build can be edited.
    pub fn create_component(&self, tag: &str, name: &str) -> Component {
        let base = base_config();
        let config = match self.get(tag) {
            Some(d) => merge_all([&base, &*DATA_DEFAULTS, &d.default_config]),
            None => {
                log::warn!("creating component of unregistered type `{tag}`");
                merge_all([&base, &*DATA_DEFAULTS])
            }
        };
        let id = ComponentId::generate("component");
        let name = if name.is_empty() { id.as_str() } else { name };
        let mut component = Component::leaf(id, tag, config).with_name(name);
        component
            .extra
            .insert("description".into(), Value::String(name.to_string()));
        component
    }

    /// An empty group with default geometry and an empty condition list.
    pub fn create_group(&self, name: &str) -> Component {
        let id = ComponentId::generate("group");
        let config = merge_all([&base_config(), &json!({ "options": { "condition": [] } })]);
        let name = if name.is_empty() { id.as_str() } else { name };
        let mut group = Component::group(id, config).with_name(name);
        group
            .extra
            .insert("description".into(), Value::String(name.to_string()));
        group
    }
}
