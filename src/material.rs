//! Which texture each primitive is drawn with.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::buffer_store::{decode_data_uri, resolve_uri, BufferStore};
use crate::config::LoaderConfig;
use crate::error::{DecodeError, TextureResolutionWarning};
use crate::gltf::{AssetDocument, Image, ImageSource, Material};

/// What a material says about its base color texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureBinding {
    /// The material's base color texture, as a file path.
    Texture(PathBuf),
    /// No material, or a material/texture reference that leads nowhere.
    Default,
    /// A material that has no base color texture.
    Untextured,
}

/// The outcome of resolving a primitive's texture against the filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTexture {
    /// `None` only when even the default texture does not exist.
    pub path: Option<PathBuf>,
    pub warning: Option<TextureResolutionWarning>,
}

pub struct MaterialResolver<'a> {
    materials: &'a [Material],
    textures: HashMap<usize, PathBuf>,
    default_texture: PathBuf,
}

impl<'a> MaterialResolver<'a> {
    /// `textures` maps texture indices to image files, see
    /// [`build_texture_table`].
    pub fn new(
        materials: &'a [Material],
        textures: HashMap<usize, PathBuf>,
        default_texture: PathBuf,
    ) -> Self {
        MaterialResolver {
            materials,
            textures,
            default_texture,
        }
    }

    pub fn default_texture(&self) -> &Path {
        &self.default_texture
    }

    pub fn binding(&self, material_index: Option<usize>) -> TextureBinding {
        let Some(material_index) = material_index else {
            return TextureBinding::Default;
        };
        let Some(material) = self.materials.get(material_index) else {
            warn!("material {material_index} does not exist");
            return TextureBinding::Default;
        };
        let Some(texture_index) = material.base_color_texture else {
            return TextureBinding::Untextured;
        };
        match self.textures.get(&texture_index) {
            Some(path) => TextureBinding::Texture(path.clone()),
            None => {
                debug!("material {material_index}: texture {texture_index} has no image file");
                TextureBinding::Default
            }
        }
    }

    /// Resolves the texture file for a primitive using `material_index`.
    /// A texture file that does not exist falls back to the default texture.
    pub fn resolve(&self, material_index: Option<usize>) -> ResolvedTexture {
        let mut warning = None;
        if let TextureBinding::Texture(path) = self.binding(material_index) {
            if path.is_file() {
                return ResolvedTexture {
                    path: Some(path),
                    warning,
                };
            }
            let fallback = TextureResolutionWarning {
                requested: path,
                fallback: self.default_texture.clone(),
            };
            warn!("{fallback}");
            warning = Some(fallback);
        }
        if self.default_texture.is_file() {
            ResolvedTexture {
                path: Some(self.default_texture.clone()),
                warning,
            }
        } else {
            warn!(
                "default texture '{}' does not exist, drawing without a texture",
                self.default_texture.display()
            );
            ResolvedTexture {
                path: None,
                warning,
            }
        }
    }
}

/// Maps each texture index to the image file it samples. External images are
/// resolved relative to `base_dir`; embedded ones (buffer views and `data:`
/// URIs) are written out as `embedded_texture_<index>.<ext>` to the configured
/// texture directory when extraction is enabled. Textures whose image cannot
/// be located are left out and logged.
pub fn build_texture_table(
    document: &AssetDocument,
    store: &mut BufferStore,
    base_dir: &Path,
    config: &LoaderConfig,
) -> HashMap<usize, PathBuf> {
    let mut textures = HashMap::new();
    for (texture_index, texture) in document.textures.iter().enumerate() {
        let Some(image_index) = texture.source else {
            debug!("texture {texture_index} has no source image");
            continue;
        };
        let Some(image) = document.images.get(image_index) else {
            warn!("texture {texture_index} refers to missing image {image_index}");
            continue;
        };
        match image_path(document, store, base_dir, config, texture_index, image) {
            Ok(Some(path)) => {
                info!("texture {texture_index}: {}", path.display());
                textures.insert(texture_index, path);
            }
            Ok(None) => {}
            Err(err) => warn!("texture {texture_index} skipped: {err}"),
        }
    }
    textures
}

fn image_path(
    document: &AssetDocument,
    store: &mut BufferStore,
    base_dir: &Path,
    config: &LoaderConfig,
    texture_index: usize,
    image: &Image,
) -> Result<Option<PathBuf>, DecodeError> {
    let mime_type = image.mime_type.as_deref();
    match &image.source {
        Some(ImageSource::Uri(uri)) if uri.starts_with("data:") => {
            let bytes = decode_data_uri(uri).map_err(DecodeError::InvalidDataUri)?;
            let mime_type = mime_type.or_else(|| data_uri_media_type(uri));
            extract(base_dir, config, texture_index, &bytes, mime_type)
        }
        Some(ImageSource::Uri(uri)) => Ok(Some(resolve_uri(base_dir, uri))),
        Some(ImageSource::BufferView(view_index)) => {
            let view = document.buffer_views.get(*view_index).ok_or_else(|| {
                DecodeError::Document(format!("buffer view {view_index} does not exist"))
            })?;
            let bytes = store.view_bytes(view)?;
            extract(base_dir, config, texture_index, bytes, mime_type)
        }
        None => Ok(None),
    }
}

fn extract(
    base_dir: &Path,
    config: &LoaderConfig,
    texture_index: usize,
    bytes: &[u8],
    mime_type: Option<&str>,
) -> Result<Option<PathBuf>, DecodeError> {
    if !config.extract_embedded_textures {
        debug!("texture {texture_index} is embedded and extraction is disabled");
        return Ok(None);
    }
    let dir = config.texture_dir_in(base_dir);
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| DecodeError::Io { path, source }
    };
    fs::create_dir_all(&dir).map_err(io_error(&dir))?;
    let path = dir.join(format!(
        "embedded_texture_{texture_index}.{}",
        image_extension(bytes, mime_type)
    ));
    fs::write(&path, bytes).map_err(io_error(&path))?;
    Ok(Some(path))
}

/// `image/jpeg` out of `data:image/jpeg;base64,...`.
fn data_uri_media_type(uri: &str) -> Option<&str> {
    let header = uri.strip_prefix("data:")?.split(',').next()?;
    header.split(';').next().filter(|media_type| !media_type.is_empty())
}

/// The file extension for embedded image bytes, sniffed from the data first,
/// then taken from the mime type, `png` otherwise.
fn image_extension<'a>(bytes: &[u8], mime_type: Option<&'a str>) -> &'a str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .or_else(|| mime_type.and_then(|mime| mime.strip_prefix("image/")))
        .unwrap_or("png")
}
