use std::path::{Path, PathBuf};

/// The file name of the texture used when a primitive has no usable texture.
pub const DEFAULT_TEXTURE_FILENAME: &str = "default_texture.png";
/// The directory, relative to the asset, holding textures.
pub const DEFAULT_TEXTURE_DIR: &str = "textures";

/// Options for a single [`Model::load`](crate::Model::load).
///
/// Relative paths are resolved against the directory containing the asset
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub default_texture: PathBuf,
    pub texture_dir: PathBuf,
    pub extract_embedded_textures: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            default_texture: Path::new(DEFAULT_TEXTURE_DIR).join(DEFAULT_TEXTURE_FILENAME),
            texture_dir: PathBuf::from(DEFAULT_TEXTURE_DIR),
            extract_embedded_textures: true,
        }
    }
}

impl LoaderConfig {
    pub fn with_default_texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_texture = path.into();
        self
    }

    pub fn with_texture_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture_dir = path.into();
        self
    }

    pub fn with_embedded_texture_extraction(mut self, extract: bool) -> Self {
        self.extract_embedded_textures = extract;
        self
    }

    /// The default texture path for an asset living in `base_dir`.
    pub fn default_texture_in(&self, base_dir: &Path) -> PathBuf {
        resolve_against(base_dir, &self.default_texture)
    }

    /// The texture extraction directory for an asset living in `base_dir`.
    pub fn texture_dir_in(&self, base_dir: &Path) -> PathBuf {
        resolve_against(base_dir, &self.texture_dir)
    }
}

fn resolve_against(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
