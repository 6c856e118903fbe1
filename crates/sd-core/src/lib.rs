pub mod error;
pub mod geometry;
pub mod id;
pub mod integrity;
pub mod merge;
pub mod model;
pub mod mutate;
pub mod path_index;
pub mod registry;
pub mod serialize;

pub use error::{CoreError, IntegrityError, MutateError};
pub use geometry::{GroupLayout, Rect};
pub use id::ComponentId;
pub use merge::{ComponentPatch, fan_out, fan_out_each, merge, merge_all, merge_into};
pub use model::*;
pub use mutate::{TreeMutator, ZOrder};
pub use path_index::{IdPathMap, IndexPath, PathEntry, PathIndex};
pub use registry::{ComponentDescriptor, ComponentRegistry, RendererHandle, ThemeConverter};
pub use serialize::{deserialize, from_json_str, from_msgpack, serialize, to_json_string, to_msgpack};
