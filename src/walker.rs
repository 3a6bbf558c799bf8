use glam::Mat4;
use log::{debug, warn};

use crate::gltf::AssetDocument;
use crate::transform::world_transform;

/// A mesh placed in the world by a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub node: usize,
    pub mesh: usize,
    pub world_transform: Mat4,
}

/// Walks every scene of the document depth-first from an identity root.
pub fn walk(document: &AssetDocument) -> Vec<MeshInstance> {
    walk_from(document, Mat4::IDENTITY)
}

/// Walks every scene of the document depth-first, parents before children
/// and children in document order, composing transforms on the way down.
///
/// Each node is processed at most once per walk, so shared or cyclic child
/// references only take effect the first time they are reached. Missing
/// nodes and meshes are skipped.
pub fn walk_from(document: &AssetDocument, root_transform: Mat4) -> Vec<MeshInstance> {
    let mut visited = vec![false; document.nodes.len()];
    let mut instances = Vec::new();

    for roots in root_lists(document) {
        let mut node_stack = roots
            .iter()
            .rev()
            .map(|&node_index| (node_index, root_transform))
            .collect::<Vec<_>>();
        while let Some((node_index, parent_transform)) = node_stack.pop() {
            let Some(node) = document.nodes.get(node_index) else {
                warn!("node {node_index} does not exist, skipping");
                continue;
            };
            if visited[node_index] {
                warn!("node {node_index} was already visited, skipping");
                continue;
            }
            visited[node_index] = true;

            let transform = world_transform(node, parent_transform);
            if let Some(mesh_index) = node.mesh_index {
                if mesh_index < document.meshes.len() {
                    instances.push(MeshInstance {
                        node: node_index,
                        mesh: mesh_index,
                        world_transform: transform,
                    });
                } else {
                    warn!("node {node_index} refers to missing mesh {mesh_index}");
                }
            }
            for &child_index in node.child_node_indices.iter().rev() {
                node_stack.push((child_index, transform));
            }
        }
    }

    debug!("scene walk found {} mesh instances", instances.len());
    instances
}

/// The root node lists to start from: every scene's, or when the document
/// has no scenes, the nodes that are nobody's child.
fn root_lists(document: &AssetDocument) -> Vec<Vec<usize>> {
    if !document.scenes.is_empty() {
        return document
            .scenes
            .iter()
            .map(|scene| scene.node_indices.clone())
            .collect();
    }
    let mut is_child = vec![false; document.nodes.len()];
    for node in &document.nodes {
        for &child in &node.child_node_indices {
            if let Some(flag) = is_child.get_mut(child) {
                *flag = true;
            }
        }
    }
    let roots = (0..document.nodes.len()).filter(|&i| !is_child[i]).collect();
    vec![roots]
}
