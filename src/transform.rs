//! Node transforms.
//!
//! Matrices are glam's `Mat4`: column-major storage, column vectors, so a
//! point is transformed as `m * p` and the translation lives in `w_axis`.
//! Composition reads right to left: `parent * local` applies `local` first.

use glam::{Mat4, Quat, Vec3};
use log::warn;

use crate::gltf::{Node, NodeTransform};

/// The node's transform relative to its parent.
pub fn local_transform(node: &Node) -> Mat4 {
    compile(&node.transform)
}

/// `parent_world * local_transform(node)`.
pub fn world_transform(node: &Node, parent_world: Mat4) -> Mat4 {
    parent_world * local_transform(node)
}

/// An explicit matrix is used as is; otherwise the matrix is
/// `translation * rotation * scale` with missing parts set to identity.
pub fn compile(transform: &NodeTransform) -> Mat4 {
    match *transform {
        NodeTransform::Matrix(matrix) => matrix,
        NodeTransform::Decomposed {
            translation,
            rotation,
            scale,
        } => Mat4::from_scale_rotation_translation(
            scale.unwrap_or(Vec3::ONE),
            unit_rotation(rotation),
            translation.unwrap_or(Vec3::ZERO),
        ),
    }
}

fn unit_rotation(rotation: Option<Quat>) -> Quat {
    let Some(rotation) = rotation else {
        return Quat::IDENTITY;
    };
    if rotation.length_squared() <= f32::EPSILON {
        warn!("rotation quaternion {rotation} has no length, using identity");
        Quat::IDENTITY
    } else if rotation.is_normalized() {
        rotation
    } else {
        rotation.normalize()
    }
}
