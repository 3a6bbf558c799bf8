use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use log::{debug, warn};

use crate::error::DecodeError;

/// One interleaved vertex: position, normal, texture coordinate, as 32-bit
/// floats in that order (8 floats, 32 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

/// Byte offsets of the attributes within a [`Vertex`].
pub const POSITION_OFFSET: usize = 0;
pub const NORMAL_OFFSET: usize = 12;
pub const TEX_COORD_OFFSET: usize = 24;
pub const VERTEX_STRIDE: usize = std::mem::size_of::<Vertex>();

/// The decoded vertex attributes of a mesh primitive. Absent attributes are
/// `None`; see [`build_primitive`] for how each one is filled in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexAttributes {
    pub positions: Option<Vec<[f32; 3]>>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
}

/// Everything decoded for one mesh primitive, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSource {
    pub mesh: usize,
    pub primitive: usize,
    pub attributes: VertexAttributes,
    pub indices: Option<Vec<u32>>,
    pub mode: u32,
}

/// A drawable primitive with everything resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub mesh: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Object-to-world transform, see [`transform`](crate::transform) for the
    /// convention.
    pub world_transform: Mat4,
    pub texture: Option<PathBuf>,
    pub mode: u32,
}

impl Primitive {
    /// The vertex buffer contents, `VERTEX_STRIDE` bytes per vertex.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether counter-clockwise triangles face front. A mirroring world
    /// transform flips the winding.
    pub fn front_face_is_ccw(&self) -> bool {
        self.world_transform.determinant() > 0.0
    }
}

/// Validates and repairs a primitive's attributes and interleaves them.
///
/// - Positions and indices are required; missing or empty ones make the
///   primitive malformed.
/// - Normals that are missing or do not match the position count become
///   zero vectors. Texture coordinates likewise become (0, 0).
/// - If an index points past the last position, the primitive is unrolled to
///   one vertex per index, each repaired attribute looked up through the index and
///   zeroed where the lookup falls outside its array. This keeps bad data
///   drawable rather than guaranteeing it is correct.
pub fn build_primitive(
    source: PrimitiveSource,
    world_transform: Mat4,
    texture: Option<PathBuf>,
) -> Result<Primitive, DecodeError> {
    let PrimitiveSource {
        mesh,
        primitive,
        attributes,
        indices,
        mode,
    } = source;
    let malformed = |reason: &str| DecodeError::MalformedPrimitive {
        mesh,
        primitive,
        reason: reason.to_string(),
    };

    let positions = attributes
        .positions
        .filter(|positions| !positions.is_empty())
        .ok_or_else(|| malformed("no POSITION data"))?;
    let indices = indices
        .filter(|indices| !indices.is_empty())
        .ok_or_else(|| malformed("no index data"))?;
    let vertex_count = positions.len();
    debug!(
        "mesh {mesh} primitive {primitive}: {vertex_count} vertices, {} indices",
        indices.len()
    );

    let normals = match_vertex_count(attributes.normals, vertex_count, "normals", || {
        format!("mesh {mesh} primitive {primitive}")
    });
    let tex_coords =
        match_vertex_count(attributes.tex_coords, vertex_count, "texture coordinates", || {
            format!("mesh {mesh} primitive {primitive}")
        });

    let (vertices, indices) = if indices.iter().any(|&i| i as usize >= vertex_count) {
        warn!(
            "mesh {mesh} primitive {primitive}: indices reach past {vertex_count} vertices, unrolling"
        );
        unroll(&positions, &normals, &tex_coords, &indices)
    } else {
        let vertices = positions
            .iter()
            .zip(&normals)
            .zip(&tex_coords)
            .map(|((&position, &normal), &tex_coord)| Vertex {
                position,
                normal,
                tex_coord,
            })
            .collect();
        (vertices, indices)
    };

    Ok(Primitive {
        mesh,
        vertices,
        indices,
        world_transform,
        texture,
        mode,
    })
}

/// Returns `values` if it has one entry per vertex, zeroes otherwise.
fn match_vertex_count<const N: usize>(
    values: Option<Vec<[f32; N]>>,
    vertex_count: usize,
    what: &str,
    context: impl Fn() -> String,
) -> Vec<[f32; N]> {
    match values {
        Some(values) if values.len() == vertex_count => values,
        Some(values) => {
            warn!(
                "{}: {} {what} for {vertex_count} vertices, using zeroes",
                context(),
                values.len()
            );
            vec![[0.0; N]; vertex_count]
        }
        None => {
            debug!("{}: no {what}, using zeroes", context());
            vec![[0.0; N]; vertex_count]
        }
    }
}

fn unroll(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    indices: &[u32],
) -> (Vec<Vertex>, Vec<u32>) {
    let vertices = indices
        .iter()
        .map(|&index| {
            let index = index as usize;
            Vertex {
                position: positions.get(index).copied().unwrap_or_default(),
                normal: normals.get(index).copied().unwrap_or_default(),
                tex_coord: tex_coords.get(index).copied().unwrap_or_default(),
            }
        })
        .collect();
    (vertices, (0..indices.len() as u32).collect())
}
