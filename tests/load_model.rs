use std::fs;
use std::path::Path;

use base64::Engine;
use glam::{Mat4, Vec3};
use scene_decoder::{DecodeError, LoaderConfig, Model};
use tempfile::TempDir;

const POSITIONS: [f32; 12] = [
    0.0, 0.0, 0.0, //
    1.0, 0.0, 0.0, //
    1.0, 1.0, 0.0, //
    0.0, 1.0, 0.0,
];
const NORMALS: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
const TEX_COORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
const INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Positions (48 bytes), three normals (36), texture coordinates (32) and
/// indices (12): 128 bytes.
fn quad_bin() -> Vec<u8> {
    let mut bin = Vec::new();
    bin.extend_from_slice(bytemuck::cast_slice(&POSITIONS));
    bin.extend_from_slice(bytemuck::cast_slice(&NORMALS));
    bin.extend_from_slice(bytemuck::cast_slice(&TEX_COORDS));
    bin.extend_from_slice(bytemuck::cast_slice(&INDICES));
    bin
}

const QUAD_VIEWS_AND_ACCESSORS: &str = r#"
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "type": "VEC3", "count": 4 },
        { "bufferView": 1, "componentType": 5126, "type": "VEC3", "count": 3 },
        { "bufferView": 2, "componentType": 5126, "type": "VEC2", "count": 4 },
        { "bufferView": 3, "componentType": 5123, "type": "SCALAR", "count": 6 },
        { "bufferView": 3, "componentType": 5123, "type": "SCALAR", "count": 0 }
    ],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 48 },
        { "buffer": 0, "byteOffset": 48, "byteLength": 36 },
        { "buffer": 0, "byteOffset": 84, "byteLength": 32 },
        { "buffer": 0, "byteOffset": 116, "byteLength": 12 }
    ]"#;

fn write_default_texture(dir: &Path) {
    fs::create_dir_all(dir.join("textures")).unwrap();
    fs::write(dir.join("textures/default_texture.png"), b"\x89PNG\r\n\x1a\n").unwrap();
}

#[test]
fn decodes_a_scene_with_repairs_and_skips() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("quad.bin"), quad_bin()).unwrap();
    write_default_texture(dir.path());
    let document = format!(
        r#"{{
            "scene": 0,
            "scenes": [{{ "nodes": [0] }}],
            "nodes": [
                {{ "mesh": 0, "children": [1], "translation": [1, 2, 3] }},
                {{ "mesh": 1, "children": [0], "scale": [2, 2, 2] }}
            ],
            "meshes": [
                {{ "primitives": [
                    {{ "attributes": {{ "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 }}, "indices": 3, "material": 0 }},
                    {{ "attributes": {{ "POSITION": 0 }}, "indices": 4 }}
                ] }},
                {{ "primitives": [
                    {{ "attributes": {{ "POSITION": 0, "TEXCOORD_0": 2 }}, "indices": 3 }}
                ] }}
            ],
            "materials": [{{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }}],
            "textures": [{{ "source": 0 }}],
            "images": [{{ "uri": "textures/missing.png" }}],
            {QUAD_VIEWS_AND_ACCESSORS},
            "buffers": [{{ "uri": "quad.bin", "byteLength": 128 }}]
        }}"#
    );
    let path = dir.path().join("scene.gltf");
    fs::write(&path, document).unwrap();

    let model = Model::load(&path).unwrap();
    let default_texture = dir.path().join("textures/default_texture.png");

    assert_eq!(model.primitives.len(), 2);
    assert_eq!(model.skipped.len(), 1);
    assert!(matches!(
        model.skipped[0],
        DecodeError::MalformedPrimitive {
            mesh: 0,
            primitive: 1,
            ..
        }
    ));

    let quad = &model.primitives[0];
    assert_eq!(quad.mesh, 0);
    assert_eq!(quad.vertices.len(), 4);
    assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
    assert!(quad.vertices.iter().all(|v| v.normal == [0.0; 3]));
    assert_eq!(quad.vertices[2].position, [1.0, 1.0, 0.0]);
    assert_eq!(quad.vertices[2].tex_coord, [1.0, 1.0]);
    assert_eq!(quad.world_transform, Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
    assert_eq!(quad.texture.as_deref(), Some(default_texture.as_path()));
    assert!(default_texture.is_file());

    let child = &model.primitives[1];
    assert_eq!(child.mesh, 1);
    assert_eq!(
        child.world_transform,
        Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_scale(Vec3::splat(2.0))
    );
    assert_eq!(child.texture.as_deref(), Some(default_texture.as_path()));

    assert_eq!(model.texture_warnings.len(), 1);
    assert_eq!(
        model.texture_warnings[0].requested,
        dir.path().join("textures/missing.png")
    );
}

#[test]
fn skipped_primitives_leave_no_texture_warnings() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("quad.bin"), quad_bin()).unwrap();
    write_default_texture(dir.path());
    let document = format!(
        r#"{{
            "scenes": [{{ "nodes": [0] }}],
            "nodes": [{{ "mesh": 0 }}],
            "meshes": [{{ "primitives": [
                {{ "attributes": {{ "POSITION": 0 }}, "indices": 4, "material": 0 }}
            ] }}],
            "materials": [{{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }}],
            "textures": [{{ "source": 0 }}],
            "images": [{{ "uri": "textures/missing.png" }}],
            {QUAD_VIEWS_AND_ACCESSORS},
            "buffers": [{{ "uri": "quad.bin", "byteLength": 128 }}]
        }}"#
    );
    let path = dir.path().join("scene.gltf");
    fs::write(&path, document).unwrap();

    let model = Model::load(&path).unwrap();
    assert!(model.primitives.is_empty());
    assert_eq!(model.skipped.len(), 1);
    assert!(model.texture_warnings.is_empty());
}

#[test]
fn a_missing_buffer_only_drops_its_primitives() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("quad.bin"), quad_bin()).unwrap();
    let document = r#"{
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [{ "mesh": 0 }, { "mesh": 1 }],
        "meshes": [
            { "primitives": [{ "attributes": { "POSITION": 5 }, "indices": 3 }] },
            { "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 3 }] }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "type": "VEC3", "count": 4 },
            { "bufferView": 1, "componentType": 5126, "type": "VEC3", "count": 3 },
            { "bufferView": 2, "componentType": 5126, "type": "VEC2", "count": 4 },
            { "bufferView": 3, "componentType": 5123, "type": "SCALAR", "count": 6 },
            { "bufferView": 3, "componentType": 5123, "type": "SCALAR", "count": 0 },
            { "bufferView": 4, "componentType": 5126, "type": "VEC3", "count": 4 }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 48 },
            { "buffer": 0, "byteOffset": 48, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 84, "byteLength": 32 },
            { "buffer": 0, "byteOffset": 116, "byteLength": 12 },
            { "buffer": 1, "byteOffset": 0, "byteLength": 48 }
        ],
        "buffers": [
            { "uri": "quad.bin", "byteLength": 128 },
            { "uri": "gone.bin", "byteLength": 48 }
        ]
    }"#;
    let path = dir.path().join("scene.gltf");
    fs::write(&path, document).unwrap();

    let model = Model::load(&path).unwrap();
    assert_eq!(model.primitives.len(), 1);
    assert_eq!(model.primitives[0].mesh, 1);
    assert!(matches!(
        model.skipped[..],
        [DecodeError::MissingBuffer { index: 1, .. }]
    ));
    // No default texture on disk.
    assert_eq!(model.primitives[0].texture, None);
}

#[test]
fn loads_glb_containers() {
    let dir = TempDir::new().unwrap();
    let mut json = format!(
        r#"{{
            "scenes": [{{ "nodes": [0] }}],
            "nodes": [{{ "mesh": 0 }}],
            "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0, "TEXCOORD_0": 2 }}, "indices": 3 }}] }}],
            {QUAD_VIEWS_AND_ACCESSORS},
            "buffers": [{{ "byteLength": 128 }}]
        }}"#
    )
    .into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let bin = quad_bin();

    let mut glb = Vec::new();
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&((12 + 8 + json.len() + 8 + bin.len()) as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    let path = dir.path().join("quad.glb");
    fs::write(&path, glb).unwrap();

    let model = Model::load(&path).unwrap();
    assert!(model.skipped.is_empty());
    assert_eq!(model.primitives.len(), 1);
    let floats: &[f32] = bytemuck::cast_slice(model.primitives[0].vertex_bytes());
    assert_eq!(&floats[8..16], &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn decodes_strided_data_uri_buffers() {
    let dir = TempDir::new().unwrap();
    // Position and normal interleaved, 24 bytes per vertex.
    let mut interleaved = Vec::new();
    for (position, normal) in POSITIONS.chunks(3).zip([[0.0f32, 0.0, 1.0]; 4]) {
        interleaved.extend_from_slice(bytemuck::cast_slice(position));
        interleaved.extend_from_slice(bytemuck::cast_slice(&normal));
    }
    interleaved.extend_from_slice(bytemuck::cast_slice(&INDICES));
    let payload = base64::engine::general_purpose::STANDARD.encode(&interleaved);
    let document = format!(
        r#"{{
            "scenes": [{{ "nodes": [0] }}],
            "nodes": [{{ "mesh": 0, "matrix": [2,0,0,0, 0,2,0,0, 0,0,2,0, 0,0,5,1] }}],
            "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0, "NORMAL": 1 }}, "indices": 2 }}] }}],
            "accessors": [
                {{ "bufferView": 0, "componentType": 5126, "type": "VEC3", "count": 4 }},
                {{ "bufferView": 0, "byteOffset": 12, "componentType": 5126, "type": "VEC3", "count": 4 }},
                {{ "bufferView": 1, "componentType": 5123, "type": "SCALAR", "count": 6 }}
            ],
            "bufferViews": [
                {{ "buffer": 0, "byteLength": 96, "byteStride": 24 }},
                {{ "buffer": 0, "byteOffset": 96, "byteLength": 12 }}
            ],
            "buffers": [{{ "uri": "data:application/octet-stream;base64,{payload}", "byteLength": 108 }}]
        }}"#
    );
    let path = dir.path().join("strided.gltf");
    fs::write(&path, document).unwrap();

    let model = Model::load_with(&path, &LoaderConfig::default()).unwrap();
    let primitive = &model.primitives[0];
    assert_eq!(primitive.vertices.len(), 4);
    assert_eq!(primitive.vertices[3].position, [0.0, 1.0, 0.0]);
    assert!(primitive.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    assert_eq!(primitive.world_transform.w_axis.truncate(), Vec3::new(0.0, 0.0, 5.0));
}

#[test]
fn unreadable_documents_abort_the_load() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Model::load(dir.path().join("nothing.gltf")),
        Err(DecodeError::Io { .. })
    ));

    let path = dir.path().join("broken.gltf");
    fs::write(&path, "{ \"nodes\": ").unwrap();
    assert!(matches!(Model::load(&path), Err(DecodeError::Json(_))));
}
