use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::accessor::decode_accessor;
use crate::buffer_store::BufferStore;
use crate::config::LoaderConfig;
use crate::error::{DecodeError, TextureResolutionWarning};
use crate::gltf::{self, AssetDocument, MeshPrimitive};
use crate::material::{build_texture_table, MaterialResolver};
use crate::primitive::{build_primitive, Primitive, PrimitiveSource, VertexAttributes};
use crate::walker;

/// The drawable contents of an asset, decoded in one pass.
#[derive(Debug)]
pub struct Model {
    /// In scene-walk order.
    pub primitives: Vec<Primitive>,
    /// The directory the asset's relative URIs were resolved against.
    pub directory: PathBuf,
    /// Why each dropped primitive was dropped.
    pub skipped: Vec<DecodeError>,
    pub texture_warnings: Vec<TextureResolutionWarning>,
}

impl Model {
    pub fn load(path: impl AsRef<Path>) -> Result<Model, DecodeError> {
        Model::load_with(path, &LoaderConfig::default())
    }

    /// Loads the `.gltf` or `.glb` file at `path`. Only an unreadable or
    /// unparseable document is an error; broken primitives are dropped and
    /// listed in [`Model::skipped`].
    pub fn load_with(path: impl AsRef<Path>, config: &LoaderConfig) -> Result<Model, DecodeError> {
        let path = path.as_ref();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let (document, glb_bin) = gltf::load_document(path)?;
        let model = Model::from_document(&document, glb_bin, directory, config);
        info!(
            "loaded {}: {} primitives, {} skipped",
            path.display(),
            model.primitives.len(),
            model.skipped.len()
        );
        Ok(model)
    }

    /// Decodes an already parsed document whose relative URIs resolve against
    /// `directory`.
    pub fn from_document(
        document: &AssetDocument,
        glb_bin: Option<Vec<u8>>,
        directory: PathBuf,
        config: &LoaderConfig,
    ) -> Model {
        let mut store = BufferStore::new(&directory, &document.buffers, glb_bin);
        let textures = build_texture_table(document, &mut store, &directory, config);
        let resolver = MaterialResolver::new(
            &document.materials,
            textures,
            config.default_texture_in(&directory),
        );

        let mut model = Model {
            primitives: Vec::new(),
            directory,
            skipped: Vec::new(),
            texture_warnings: Vec::new(),
        };
        for instance in walker::walk(document) {
            let Some(mesh) = document.meshes.get(instance.mesh) else {
                continue;
            };
            for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
                let texture = resolver.resolve(primitive.material_index);
                let built = decode_primitive(
                    document,
                    &mut store,
                    instance.mesh,
                    primitive_index,
                    primitive,
                )
                .and_then(|source| build_primitive(source, instance.world_transform, texture.path));
                match built {
                    Ok(primitive) => {
                        model.texture_warnings.extend(texture.warning);
                        model.primitives.push(primitive);
                    }
                    Err(err) => {
                        warn!(
                            "skipping mesh {} primitive {primitive_index} of node {}: {err}",
                            instance.mesh, instance.node
                        );
                        model.skipped.push(err);
                    }
                }
            }
        }
        model
    }

    /// Hands the primitives over, for a renderer to take ownership of.
    pub fn into_primitives(self) -> Vec<Primitive> {
        self.primitives
    }
}

fn decode_primitive(
    document: &AssetDocument,
    store: &mut BufferStore,
    mesh: usize,
    primitive_index: usize,
    primitive: &MeshPrimitive,
) -> Result<PrimitiveSource, DecodeError> {
    let attributes = &primitive.attributes;
    let positions = read_rows::<3>(document, store, attributes.position, "POSITION")?;
    let normals = optional(read_rows::<3>(document, store, attributes.normal, "NORMAL"))?;
    let tex_coords = optional(read_rows::<2>(
        document,
        store,
        attributes.tex_coord_0,
        "TEXCOORD_0",
    ))?;
    let indices = match primitive.indices {
        Some(index) => {
            let data = decode_accessor(document, index, store)?;
            let indices = data.to_u32().ok_or_else(|| DecodeError::UnsupportedAccessor {
                accessor: index,
                reason: "indices must be unsigned integer scalars".to_string(),
            })?;
            Some(indices)
        }
        None => None,
    };
    Ok(PrimitiveSource {
        mesh,
        primitive: primitive_index,
        attributes: VertexAttributes {
            positions,
            normals,
            tex_coords,
        },
        indices,
        mode: primitive.mode,
    })
}

fn read_rows<const N: usize>(
    document: &AssetDocument,
    store: &mut BufferStore,
    accessor: Option<usize>,
    semantic: &str,
) -> Result<Option<Vec<[f32; N]>>, DecodeError> {
    let Some(index) = accessor else {
        return Ok(None);
    };
    let data = decode_accessor(document, index, store)?;
    data.to_f32_rows::<N>()
        .map(Some)
        .ok_or_else(|| DecodeError::UnsupportedAccessor {
            accessor: index,
            reason: format!(
                "{semantic} needs {N} components per element, found {}",
                data.arity
            ),
        })
}

/// Optional attributes that cannot be decoded are treated as absent, unless
/// their buffer itself is unavailable.
fn optional<T>(result: Result<Option<T>, DecodeError>) -> Result<Option<T>, DecodeError> {
    match result {
        Err(err @ (DecodeError::MissingBuffer { .. } | DecodeError::InvalidDataUri(_))) => Err(err),
        Err(err) => {
            warn!("ignoring attribute: {err}");
            Ok(None)
        }
        ok => ok,
    }
}
