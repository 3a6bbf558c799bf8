//! The parsed asset document: a read-only index of everything the JSON part of
//! a glTF file declares. Nothing here touches buffer bytes; see
//! [`BufferStore`](crate::BufferStore) and [`accessor`](crate::accessor) for
//! that.

use glam::{Mat4, Quat, Vec3};

mod loader;

pub use loader::{load_document, parse_document, split_glb};

/// glTF primitive mode for triangle lists, the default when `mode` is absent.
pub const MODE_TRIANGLES: u32 = 4;

#[derive(Debug, Clone, Default)]
pub struct AssetDocument {
    /// The `scene` property: which of the scenes is meant to be shown.
    /// Informational only; the walk visits every scene in document order.
    pub scene: Option<usize>,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
    pub textures: Vec<Texture>,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub node_indices: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub mesh_index: Option<usize>,
    pub child_node_indices: Vec<usize>,
    pub transform: NodeTransform,
}

/// A node's local transform as written in the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    /// Column-major 4x4 matrix.
    Matrix(Mat4),
    /// Separate components, each defaulting to identity when absent.
    Decomposed {
        translation: Option<Vec3>,
        rotation: Option<Quat>,
        scale: Option<Vec3>,
    },
}

impl Default for NodeTransform {
    fn default() -> Self {
        NodeTransform::Decomposed {
            translation: None,
            rotation: None,
            scale: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub primitives: Vec<MeshPrimitive>,
}

#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    pub attributes: Attributes,
    pub indices: Option<usize>,
    pub material_index: Option<usize>,
    pub mode: u32,
}

/// Accessor indices of the vertex attributes the decoder consumes. Other
/// semantics (tangents, colors, joints...) are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    pub position: Option<usize>,
    pub normal: Option<usize>,
    pub tex_coord_0: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    /// Texture index of `pbrMetallicRoughness.baseColorTexture`.
    pub base_color_texture: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    /// Raw `componentType` code, e.g. 5126 for float32.
    pub component_type: u32,
    /// Raw `type` string, e.g. "VEC3".
    pub kind: String,
    pub count: usize,
    pub normalized: bool,
}

#[derive(Debug, Clone)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Buffer {
    /// Relative file path or `data:` URI. `None` refers to the GLB BIN chunk.
    pub uri: Option<String>,
    pub byte_length: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub source: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Uri(String),
    BufferView(usize),
}

#[derive(Debug, Clone)]
pub struct Image {
    pub source: Option<ImageSource>,
    pub mime_type: Option<String>,
}
