//! Decodes glTF 2.0 assets (`.gltf` with external or `data:` buffers, and
//! `.glb`) into a flat list of drawable primitives: interleaved vertex data,
//! indices, a world transform and a texture path each.
//!
//! ```no_run
//! let model = scene_decoder::Model::load("assets/airport.gltf")?;
//! for primitive in &model.primitives {
//!     println!("{} vertices", primitive.vertices.len());
//! }
//! # Ok::<(), scene_decoder::DecodeError>(())
//! ```

pub mod accessor;
pub mod buffer_store;
mod config;
mod draw_calls;
mod error;
pub mod gltf;
pub mod material;
mod model;
pub mod primitive;
pub mod transform;
pub mod walker;

pub use accessor::{decode_accessor, AccessorData, ComponentType, ElementShape};
pub use buffer_store::BufferStore;
pub use config::{LoaderConfig, DEFAULT_TEXTURE_DIR, DEFAULT_TEXTURE_FILENAME};
pub use draw_calls::{DrawCall, DrawCalls, RenderContext};
pub use error::{DecodeError, TextureResolutionWarning};
pub use gltf::AssetDocument;
pub use material::{MaterialResolver, TextureBinding};
pub use model::Model;
pub use primitive::{build_primitive, Primitive, Vertex};
pub use walker::{walk, MeshInstance};
