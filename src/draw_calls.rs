use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::Mat4;
use log::debug;

use crate::primitive::Primitive;

/// The renderer side of a load: creates GPU objects for decoded primitives.
/// Must be driven from the thread that owns the rendering context.
pub trait RenderContext {
    type VertexBuffer;
    type Texture: Clone;

    /// Uploads the primitive's vertex and index data. The context becomes the
    /// primitive's owner.
    fn upload_primitive(&mut self, primitive: Primitive) -> Self::VertexBuffer;

    /// Creates a texture from an image file. `None` if it cannot be decoded.
    fn load_texture(&mut self, path: &Path) -> Option<Self::Texture>;
}

/// Everything needed to issue one indexed draw.
pub struct DrawCall<C: RenderContext> {
    pub vertex_buffer: C::VertexBuffer,
    pub index_count: usize,
    pub transform: Mat4,
    pub texture: Option<C::Texture>,
    pub mode: u32,
    pub front_face_ccw: bool,
}

/// The draw calls for a set of primitives, one per primitive, in order.
pub struct DrawCalls<C: RenderContext> {
    calls: Vec<DrawCall<C>>,
}

impl<C: RenderContext> DrawCalls<C> {
    /// Uploads every primitive through `context`. Each distinct texture path
    /// is loaded once.
    pub fn build(primitives: Vec<Primitive>, context: &mut C) -> DrawCalls<C> {
        let mut textures: HashMap<PathBuf, Option<C::Texture>> = HashMap::new();
        let mut calls = Vec::with_capacity(primitives.len());
        for primitive in primitives {
            let texture = match &primitive.texture {
                Some(path) => textures
                    .entry(path.clone())
                    .or_insert_with(|| context.load_texture(path))
                    .clone(),
                None => None,
            };
            let index_count = primitive.index_count();
            let transform = primitive.world_transform;
            let mode = primitive.mode;
            let front_face_ccw = primitive.front_face_is_ccw();
            calls.push(DrawCall {
                vertex_buffer: context.upload_primitive(primitive),
                index_count,
                transform,
                texture,
                mode,
                front_face_ccw,
            });
        }
        debug!(
            "built {} draw calls with {} textures",
            calls.len(),
            textures.len()
        );
        DrawCalls { calls }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawCall<C>> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Vertex;
    use glam::Vec3;

    #[derive(Default)]
    struct Recorder {
        uploaded_bytes: Vec<usize>,
        textures_loaded: Vec<PathBuf>,
    }

    impl RenderContext for Recorder {
        type VertexBuffer = usize;
        type Texture = u32;

        fn upload_primitive(&mut self, primitive: Primitive) -> usize {
            self.uploaded_bytes.push(primitive.vertex_bytes().len());
            self.uploaded_bytes.len() - 1
        }

        fn load_texture(&mut self, path: &Path) -> Option<u32> {
            self.textures_loaded.push(path.to_path_buf());
            (path != Path::new("broken.png")).then_some(self.textures_loaded.len() as u32)
        }
    }

    fn primitive(texture: Option<&str>, transform: Mat4) -> Primitive {
        Primitive {
            mesh: 0,
            vertices: vec![Vertex::default(); 3],
            indices: vec![0, 1, 2, 2, 1, 0],
            world_transform: transform,
            texture: texture.map(PathBuf::from),
            mode: 4,
        }
    }

    #[test]
    fn textures_are_loaded_once_per_path() {
        let mut recorder = Recorder::default();
        let calls = DrawCalls::build(
            vec![
                primitive(Some("a.png"), Mat4::IDENTITY),
                primitive(Some("broken.png"), Mat4::IDENTITY),
                primitive(Some("a.png"), Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))),
                primitive(None, Mat4::IDENTITY),
            ],
            &mut recorder,
        );
        assert_eq!(calls.len(), 4);
        assert_eq!(
            recorder.textures_loaded,
            vec![PathBuf::from("a.png"), PathBuf::from("broken.png")]
        );
        assert_eq!(recorder.uploaded_bytes, vec![96; 4]);

        let calls: Vec<_> = calls.iter().collect();
        assert_eq!(calls[0].texture, Some(1));
        assert_eq!(calls[1].texture, None);
        assert_eq!(calls[2].texture, Some(1));
        assert_eq!(calls[3].texture, None);
        assert_eq!(calls[2].vertex_buffer, 2);
        assert_eq!(calls[0].index_count, 6);
        assert!(calls[0].front_face_ccw);
        assert!(!calls[2].front_face_ccw);
    }
}
