use std::path::PathBuf;

/// Errors produced while decoding an asset.
///
/// `Io`, `Json`, `Document` and `Glb` abort the whole load. The rest are local
/// to a single primitive: they are logged where they happen and the primitive
/// is dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read asset document '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset document is not valid JSON: {0}")]
    Json(#[from] tinyjson::JsonParseError),

    #[error("invalid asset document: {0}")]
    Document(String),

    #[error("invalid GLB container: {0}")]
    Glb(String),

    #[error("buffer {index} could not be resolved from {location}")]
    MissingBuffer { index: usize, location: String },

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("accessor {accessor} is not supported: {reason}")]
    UnsupportedAccessor { accessor: usize, reason: String },

    #[error("accessor {accessor} needs {needed} bytes but only {available} are available")]
    AccessorOutOfBounds {
        accessor: usize,
        needed: usize,
        available: usize,
    },

    #[error("mesh {mesh} primitive {primitive} is malformed: {reason}")]
    MalformedPrimitive {
        mesh: usize,
        primitive: usize,
        reason: String,
    },
}

/// A texture reference that could not be honoured and was replaced with the
/// default texture. Never returned as an error, only logged and collected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("texture '{}' does not exist, using '{}' instead", .requested.display(), .fallback.display())]
pub struct TextureResolutionWarning {
    pub requested: PathBuf,
    pub fallback: PathBuf,
}
