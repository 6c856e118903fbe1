//! Core component-tree data model for SD screens.
//!
//! A screen is an ordered forest of `Component` nodes. Groups own their
//! children through `Arc`, so a new tree version shares every subtree it did
//! not touch with the previous one. Identity of a version is the identity of
//! its root `Arc` (`Tree::ptr_eq`), never deep equality.
//!
//! Configuration is a plain JSON record. `style` and `attr` have typed,
//! read-only views (`StyleConfig`, `AttrConfig`); writes always go through a
//! merge patch so unknown keys survive untouched.

use crate::id::ComponentId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::sync::Arc;

// ─── Component kind ──────────────────────────────────────────────────────

/// Discriminates leaves from containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Leaf widget rendered by the renderer registered for its `componentType`.
    #[serde(rename = "COMPONENT")]
    Component,
    /// Container that owns child components.
    #[serde(rename = "GROUP_COMPONENT")]
    Group,
}

/// `componentType` tag carried by every group.
pub const GROUP_COMPONENT_TYPE: &str = "GROUP_COMPONENT";

// ─── Config views ────────────────────────────────────────────────────────

/// Horizontal/vertical skew in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Skew {
    pub x: f64,
    pub y: f64,
}

/// Typed view of `config.style`, geometry only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, clockwise, about the component's centre.
    pub rotate: f64,
    pub skew: Skew,
    pub opacity: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            rotate: 0.0,
            skew: Skew::default(),
            opacity: 1.0,
        }
    }
}

/// Typed view of `config.attr`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttrConfig {
    pub visible: bool,
    pub lock: bool,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for AttrConfig {
    fn default() -> Self {
        Self {
            visible: true,
            lock: false,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Read a typed sub-record out of a config, falling back to defaults when the
/// key is missing or holds something unreadable.
fn view<'a, T>(config: &'a Value, key: &str) -> T
where
    T: Deserialize<'a> + Default,
{
    match config.get(key) {
        Some(v) => T::deserialize(v).unwrap_or_else(|e| {
            log::trace!("unreadable config.{key}: {e}");
            T::default()
        }),
        None => T::default(),
    }
}

/// The config every component starts from before type defaults are layered on.
pub fn base_config() -> Value {
    json!({
        "style": {
            "left": 0,
            "top": 0,
            "width": 400,
            "height": 300,
            "rotate": 0,
            "skew": { "x": 0, "y": 0 },
            "opacity": 1,
            "border": { "show": false, "width": 0, "color": "rgba(0,0,0,0)" }
        },
        "attr": {
            "visible": true,
            "lock": false,
            "scaleX": 1,
            "scaleY": 1
        },
        "interactive": { "base": [] },
        "options": {}
    })
}

// ─── Component ───────────────────────────────────────────────────────────

/// A single node in the screen tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Stable, unique identifier.
    pub id: ComponentId,

    /// User-editable display label.
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ComponentKind,

    /// Renderer / config-schema tag, e.g. `BAR_CHART`.
    #[serde(default)]
    pub component_type: String,

    /// Nested configuration record (`style`, `attr`, `data`, `options`, …).
    /// Shared between tree versions until a patch touches it.
    #[serde(default = "empty_config")]
    pub config: Arc<Value>,

    /// Ordered children, back to front. Empty for leaves.
    #[serde(default)]
    pub components: Vec<Arc<Component>>,

    /// Id of the containing group, absent at top level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ComponentId>,

    /// Keys this model does not know about, kept for lossless round-trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn empty_config() -> Arc<Value> {
    Arc::new(Value::Object(Map::new()))
}

impl Component {
    /// A leaf component with the given config.
    pub fn leaf(id: ComponentId, component_type: &str, config: Value) -> Self {
        Self {
            id,
            name: String::new(),
            kind: ComponentKind::Component,
            component_type: component_type.to_string(),
            config: Arc::new(config),
            components: Vec::new(),
            parent: None,
            extra: Map::new(),
        }
    }

    /// An empty group component.
    pub fn group(id: ComponentId, config: Value) -> Self {
        Self {
            kind: ComponentKind::Group,
            ..Self::leaf(id, GROUP_COMPONENT_TYPE, config)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_children(mut self, children: Vec<Arc<Component>>) -> Self {
        self.components = children;
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == ComponentKind::Group
    }

    pub fn style(&self) -> StyleConfig {
        view(&self.config, "style")
    }

    pub fn attr(&self) -> AttrConfig {
        view(&self.config, "attr")
    }

    /// `config.data.filter`, when the component declares one.
    pub fn filter(&self) -> Option<&Value> {
        self.config.get("data").and_then(|d| d.get("filter"))
    }

    /// Shallow copy that swaps in a new child list. Config and extras are
    /// shared, not deep-cloned.
    pub(crate) fn replace_children(&self, children: Vec<Arc<Component>>) -> Component {
        Component {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            component_type: self.component_type.clone(),
            config: Arc::clone(&self.config),
            components: children,
            parent: self.parent,
            extra: self.extra.clone(),
        }
    }

    /// Pre-order walk over this component and all descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Pre-order iterator over a subtree.
pub struct Walk<'a> {
    stack: Vec<&'a Component>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Component;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(node.components.iter().rev().map(|c| c.as_ref()));
        Some(node)
    }
}

// ─── Tree ────────────────────────────────────────────────────────────────

/// One immutable version of the screen: an ordered forest of top-level
/// components. Cloning is an `Arc` bump.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    roots: Arc<Vec<Arc<Component>>>,
}

impl Tree {
    pub fn new(roots: Vec<Arc<Component>>) -> Self {
        Self {
            roots: Arc::new(roots),
        }
    }

    /// Build a tree from owned components, wrapping each in an `Arc`.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self::new(components.into_iter().map(Arc::new).collect())
    }

    pub fn roots(&self) -> &[Arc<Component>] {
        &self.roots
    }

    /// Version identity: `true` only when both handles point at the same root.
    pub fn ptr_eq(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.roots, &other.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of components at every depth.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order walk over every component in z-order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.roots.iter().flat_map(|root| root.walk())
    }

    /// Follow a child-index path from the top level.
    pub fn get(&self, path: &[usize]) -> Option<&Arc<Component>> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for &i in rest {
            node = node.components.get(i)?;
        }
        Some(node)
    }

    /// Linear search by id. Hot paths go through `PathIndex` instead.
    pub fn find(&self, id: ComponentId) -> Option<&Component> {
        self.iter().find(|c| c.id == id)
    }
}

/// Structural equality. Version identity is `ptr_eq`.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.roots == other.roots
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.roots.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Arc<Component>>::deserialize(deserializer).map(Tree::new)
    }
}
