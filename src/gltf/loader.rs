use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use log::{debug, warn};
use tinyjson::JsonValue;

use crate::error::DecodeError;
use crate::gltf::{
    Accessor, AssetDocument, Attributes, Buffer, BufferView, Image, ImageSource, Material, Mesh,
    MeshPrimitive, Node, NodeTransform, Scene, Texture, MODE_TRIANGLES,
};

type Object = HashMap<String, JsonValue>;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_HEADER_LEN: usize = 12;
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const GLB_CHUNK_BIN: u32 = 0x004E_4942;

/// Reads the asset document at `path`. For `.glb` containers the BIN chunk is
/// returned alongside the document, for the buffer without an `uri` to use.
pub fn load_document(path: &Path) -> Result<(AssetDocument, Option<Vec<u8>>), DecodeError> {
    let bytes = fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.starts_with(GLB_MAGIC) {
        let (json, bin) = split_glb(&bytes)?;
        let json = std::str::from_utf8(json)
            .map_err(|err| DecodeError::Glb(format!("JSON chunk is not UTF-8: {err}")))?;
        Ok((parse_document(json)?, bin.map(<[u8]>::to_vec)))
    } else {
        let json = std::str::from_utf8(&bytes)
            .map_err(|err| DecodeError::Document(format!("document is not UTF-8: {err}")))?;
        Ok((parse_document(json)?, None))
    }
}

/// Splits a GLB container into its JSON chunk and optional BIN chunk.
pub fn split_glb(bytes: &[u8]) -> Result<(&[u8], Option<&[u8]>), DecodeError> {
    if !bytes.starts_with(GLB_MAGIC) {
        return Err(DecodeError::Glb("missing \"glTF\" magic".to_string()));
    }
    let version = read_u32(bytes, 4)?;
    if version != 2 {
        return Err(DecodeError::Glb(format!("unsupported version {version}")));
    }
    let total_length = read_u32(bytes, 8)? as usize;
    if total_length > bytes.len() {
        return Err(DecodeError::Glb(format!(
            "header declares {total_length} bytes but the file has {}",
            bytes.len()
        )));
    }

    let mut json = None;
    let mut bin = None;
    let mut offset = GLB_HEADER_LEN;
    while offset + 8 <= total_length {
        let chunk_length = read_u32(bytes, offset)? as usize;
        let chunk_type = read_u32(bytes, offset + 4)?;
        let start = offset + 8;
        let end = start
            .checked_add(chunk_length)
            .filter(|&end| end <= total_length)
            .ok_or_else(|| {
                DecodeError::Glb(format!("chunk at byte {offset} overruns the container"))
            })?;
        match chunk_type {
            GLB_CHUNK_JSON if json.is_none() => json = Some(&bytes[start..end]),
            GLB_CHUNK_BIN if bin.is_none() => bin = Some(&bytes[start..end]),
            _ => debug!("skipping GLB chunk of type {chunk_type:#010x}"),
        }
        offset = end;
    }

    let json = json.ok_or_else(|| DecodeError::Glb("no JSON chunk".to_string()))?;
    Ok((json, bin))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, DecodeError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| DecodeError::Glb(format!("truncated at byte {offset}")))
}

/// Parses the JSON part of an asset. Structural problems (wrong JSON types,
/// missing required fields) are errors; dangling indices are not checked here
/// and are dealt with by whoever follows them.
pub fn parse_document(json: &str) -> Result<AssetDocument, DecodeError> {
    let json: JsonValue = json.parse()?;
    let root = take_object(&json, "the document root")?;

    let document = AssetDocument {
        scene: usize_field(root, "scene")?,
        scenes: parse_all(root, "scenes", parse_scene)?,
        nodes: parse_all(root, "nodes", parse_node)?,
        meshes: parse_all(root, "meshes", parse_mesh)?,
        materials: parse_all(root, "materials", parse_material)?,
        accessors: parse_all(root, "accessors", parse_accessor)?,
        buffer_views: parse_all(root, "bufferViews", parse_buffer_view)?,
        buffers: parse_all(root, "buffers", parse_buffer)?,
        textures: parse_all(root, "textures", parse_texture)?,
        images: parse_all(root, "images", parse_image)?,
    };
    debug!(
        "parsed document: {} scenes, {} nodes, {} meshes, {} accessors, {} buffers",
        document.scenes.len(),
        document.nodes.len(),
        document.meshes.len(),
        document.accessors.len(),
        document.buffers.len(),
    );
    Ok(document)
}

fn parse_all<T>(
    object: &Object,
    key: &str,
    parse: impl Fn(&Object) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    array_field(object, key)?
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let what = format!("{key}[{i}]");
            parse(take_object(value, &what)?).map_err(|err| match err {
                DecodeError::Document(msg) => DecodeError::Document(format!("{what}: {msg}")),
                err => err,
            })
        })
        .collect()
}

fn parse_scene(scene: &Object) -> Result<Scene, DecodeError> {
    Ok(Scene {
        node_indices: usize_array_field(scene, "nodes")?,
    })
}

fn parse_node(node: &Object) -> Result<Node, DecodeError> {
    let translation = node.get("translation").map(take_vec3).transpose()?;
    let rotation = node.get("rotation").map(take_quat).transpose()?;
    let scale = node.get("scale").map(take_vec3).transpose()?;
    let transform = if let Some(matrix) = node.get("matrix") {
        if translation.is_some() || rotation.is_some() || scale.is_some() {
            warn!("node has both a matrix and translation/rotation/scale, using the matrix");
        }
        NodeTransform::Matrix(Mat4::from_cols_array(&take_floats::<16>(matrix)?))
    } else {
        NodeTransform::Decomposed {
            translation,
            rotation,
            scale,
        }
    };
    Ok(Node {
        mesh_index: usize_field(node, "mesh")?,
        child_node_indices: usize_array_field(node, "children")?,
        transform,
    })
}

fn parse_mesh(mesh: &Object) -> Result<Mesh, DecodeError> {
    Ok(Mesh {
        primitives: parse_all(mesh, "primitives", parse_primitive)?,
    })
}

fn parse_primitive(primitive: &Object) -> Result<MeshPrimitive, DecodeError> {
    let attributes = match primitive.get("attributes") {
        Some(attributes) => {
            let attributes = take_object(attributes, "attributes")?;
            Attributes {
                position: usize_field(attributes, "POSITION")?,
                normal: usize_field(attributes, "NORMAL")?,
                tex_coord_0: usize_field(attributes, "TEXCOORD_0")?,
            }
        }
        None => Attributes::default(),
    };
    let mode = match usize_field(primitive, "mode")? {
        Some(mode) => u32::try_from(mode)
            .map_err(|_| DecodeError::Document(format!("primitive mode {mode} is out of range")))?,
        None => MODE_TRIANGLES,
    };
    Ok(MeshPrimitive {
        attributes,
        indices: usize_field(primitive, "indices")?,
        material_index: usize_field(primitive, "material")?,
        mode,
    })
}

fn parse_material(material: &Object) -> Result<Material, DecodeError> {
    let base_color_texture = match material.get("pbrMetallicRoughness") {
        Some(pbr) => match take_object(pbr, "pbrMetallicRoughness")?.get("baseColorTexture") {
            Some(info) => Some(required_usize(take_object(info, "baseColorTexture")?, "index")?),
            None => None,
        },
        None => None,
    };
    Ok(Material { base_color_texture })
}

fn parse_accessor(accessor: &Object) -> Result<Accessor, DecodeError> {
    let component_type = required_usize(accessor, "componentType")?;
    let component_type = u32::try_from(component_type).map_err(|_| {
        DecodeError::Document(format!("componentType {component_type} is out of range"))
    })?;
    let kind = string_field(accessor, "type")?
        .ok_or_else(|| DecodeError::Document("missing required \"type\"".to_string()))?;
    Ok(Accessor {
        buffer_view: usize_field(accessor, "bufferView")?,
        byte_offset: usize_field(accessor, "byteOffset")?.unwrap_or(0),
        component_type,
        kind: kind.to_string(),
        count: required_usize(accessor, "count")?,
        normalized: bool_field(accessor, "normalized")?.unwrap_or(false),
    })
}

fn parse_buffer_view(view: &Object) -> Result<BufferView, DecodeError> {
    Ok(BufferView {
        buffer: required_usize(view, "buffer")?,
        byte_offset: usize_field(view, "byteOffset")?.unwrap_or(0),
        byte_length: required_usize(view, "byteLength")?,
        byte_stride: usize_field(view, "byteStride")?,
    })
}

fn parse_buffer(buffer: &Object) -> Result<Buffer, DecodeError> {
    Ok(Buffer {
        uri: string_field(buffer, "uri")?.map(str::to_string),
        byte_length: required_usize(buffer, "byteLength")?,
    })
}

fn parse_texture(texture: &Object) -> Result<Texture, DecodeError> {
    Ok(Texture {
        source: usize_field(texture, "source")?,
    })
}

fn parse_image(image: &Object) -> Result<Image, DecodeError> {
    let source = match (string_field(image, "uri")?, usize_field(image, "bufferView")?) {
        (Some(uri), _) => Some(ImageSource::Uri(uri.to_string())),
        (None, Some(view)) => Some(ImageSource::BufferView(view)),
        (None, None) => None,
    };
    Ok(Image {
        source,
        mime_type: string_field(image, "mimeType")?.map(str::to_string),
    })
}

fn take_object<'a>(value: &'a JsonValue, what: &str) -> Result<&'a Object, DecodeError> {
    value
        .get::<Object>()
        .ok_or_else(|| DecodeError::Document(format!("expected {what} to be an object")))
}

/// A missing array is treated as empty.
fn array_field<'a>(object: &'a Object, key: &str) -> Result<&'a [JsonValue], DecodeError> {
    match object.get(key) {
        Some(value) => value
            .get::<Vec<JsonValue>>()
            .map(Vec::as_slice)
            .ok_or_else(|| DecodeError::Document(format!("expected \"{key}\" to be an array"))),
        None => Ok(&[]),
    }
}

/// Return usize if JsonValue is a non-negative integer.
fn take_usize(value: &JsonValue) -> Result<usize, DecodeError> {
    match value.get::<f64>() {
        Some(&n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(n as usize),
        _ => Err(DecodeError::Document(format!(
            "expected a non-negative integer, found {value:?}"
        ))),
    }
}

fn usize_field(object: &Object, key: &str) -> Result<Option<usize>, DecodeError> {
    object.get(key).map(take_usize).transpose()
}

fn required_usize(object: &Object, key: &str) -> Result<usize, DecodeError> {
    usize_field(object, key)?
        .ok_or_else(|| DecodeError::Document(format!("missing required \"{key}\"")))
}

fn usize_array_field(object: &Object, key: &str) -> Result<Vec<usize>, DecodeError> {
    array_field(object, key)?.iter().map(take_usize).collect()
}

fn string_field<'a>(object: &'a Object, key: &str) -> Result<Option<&'a str>, DecodeError> {
    match object.get(key) {
        Some(value) => value
            .get::<String>()
            .map(|s| Some(s.as_str()))
            .ok_or_else(|| DecodeError::Document(format!("expected \"{key}\" to be a string"))),
        None => Ok(None),
    }
}

fn bool_field(object: &Object, key: &str) -> Result<Option<bool>, DecodeError> {
    match object.get(key) {
        Some(value) => value
            .get::<bool>()
            .map(|b| Some(*b))
            .ok_or_else(|| DecodeError::Document(format!("expected \"{key}\" to be a boolean"))),
        None => Ok(None),
    }
}

fn take_floats<const N: usize>(value: &JsonValue) -> Result<[f32; N], DecodeError> {
    let values = value
        .get::<Vec<JsonValue>>()
        .filter(|values| values.len() == N)
        .ok_or_else(|| DecodeError::Document(format!("expected an array of {N} numbers")))?;
    let mut floats = [0.0; N];
    for (float, value) in floats.iter_mut().zip(values) {
        let n = value
            .get::<f64>()
            .ok_or_else(|| DecodeError::Document(format!("expected a number, found {value:?}")))?;
        *float = *n as f32;
    }
    Ok(floats)
}

fn take_vec3(value: &JsonValue) -> Result<Vec3, DecodeError> {
    take_floats::<3>(value).map(Vec3::from_array)
}

fn take_quat(value: &JsonValue) -> Result<Quat, DecodeError> {
    take_floats::<4>(value).map(Quat::from_array)
}
