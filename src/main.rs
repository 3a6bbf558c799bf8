//! Headless inspector: decodes an asset, hands every primitive to a render
//! context that only records what it is given, and prints what would be drawn.
//!
//! ```bash
//! scene-decoder path/to/model.gltf
//! RUST_LOG=debug scene-decoder model.glb --no-extract
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use image::GenericImageView;
use log::warn;

use scene_decoder::{DrawCalls, LoaderConfig, Model, Primitive, RenderContext};

#[derive(Parser)]
#[command(name = "scene-decoder", version, about = "Decode a glTF asset into drawable primitives")]
struct Args {
    /// The .gltf or .glb file to load
    asset: PathBuf,

    /// Texture used when a primitive has none (relative to the asset)
    #[arg(long)]
    default_texture: Option<PathBuf>,

    /// Where embedded images are extracted to (relative to the asset)
    #[arg(long)]
    texture_dir: Option<PathBuf>,

    /// Do not write embedded images to disk
    #[arg(long)]
    no_extract: bool,
}

/// Stands in for a GPU: vertex buffers are byte counts, textures are the
/// decoded image dimensions.
#[derive(Default)]
struct HeadlessContext {
    uploaded_bytes: usize,
}

struct HeadlessBuffer {
    vertex_count: usize,
    byte_len: usize,
}

impl RenderContext for HeadlessContext {
    type VertexBuffer = HeadlessBuffer;
    type Texture = (u32, u32);

    fn upload_primitive(&mut self, primitive: Primitive) -> HeadlessBuffer {
        let byte_len = primitive.vertex_bytes().len() + primitive.index_count() * 4;
        self.uploaded_bytes += byte_len;
        HeadlessBuffer {
            vertex_count: primitive.vertices.len(),
            byte_len,
        }
    }

    fn load_texture(&mut self, path: &Path) -> Option<(u32, u32)> {
        match image::open(path) {
            Ok(image) => Some(image.dimensions()),
            Err(err) => {
                warn!("cannot decode texture {}: {err}", path.display());
                None
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = LoaderConfig::default().with_embedded_texture_extraction(!args.no_extract);
    if let Some(path) = args.default_texture {
        config = config.with_default_texture(path);
    }
    if let Some(path) = args.texture_dir {
        config = config.with_texture_dir(path);
    }

    let model = Model::load_with(&args.asset, &config)
        .with_context(|| format!("failed to load {}", args.asset.display()))?;
    let textures: Vec<Option<PathBuf>> =
        model.primitives.iter().map(|p| p.texture.clone()).collect();
    let skipped = model.skipped.len();
    let texture_warnings = model.texture_warnings.len();

    let mut context = HeadlessContext::default();
    let draw_calls = DrawCalls::build(model.into_primitives(), &mut context);
    for (i, (call, texture)) in draw_calls.iter().zip(&textures).enumerate() {
        let translation = call.transform.w_axis.truncate();
        let texture = match (texture, call.texture) {
            (Some(path), Some((w, h))) => format!("{} ({w}x{h})", path.display()),
            (Some(path), None) => format!("{} (undecodable)", path.display()),
            (None, _) => "none".to_string(),
        };
        println!(
            "#{i}: {} vertices, {} indices, {} bytes, translation {translation}, texture {texture}",
            call.vertex_buffer.vertex_count, call.index_count, call.vertex_buffer.byte_len,
        );
    }
    println!(
        "{} primitives ({} bytes), {skipped} skipped, {texture_warnings} texture fallbacks",
        draw_calls.len(),
        context.uploaded_bytes,
    );
    Ok(())
}
