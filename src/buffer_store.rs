use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use log::{debug, error, warn};

use crate::error::DecodeError;
use crate::gltf::{Buffer, BufferView};

/// Lazily resolves the raw bytes of a document's buffers and keeps them for
/// the rest of the load. Each buffer is fetched at most once; failures are
/// remembered too, so a missing file is reported once and then fails fast.
///
/// One store belongs to one load. Loading several assets in parallel means
/// one store per asset.
pub struct BufferStore<'a> {
    base_dir: PathBuf,
    buffers: &'a [Buffer],
    glb_bin: Option<Vec<u8>>,
    slots: Vec<Option<Result<Vec<u8>, Unresolvable>>>,
}

#[derive(Debug, Clone)]
enum Unresolvable {
    Missing(String),
    InvalidDataUri(String),
}

impl Unresolvable {
    fn to_error(&self, index: usize) -> DecodeError {
        match self {
            Unresolvable::Missing(location) => DecodeError::MissingBuffer {
                index,
                location: location.clone(),
            },
            Unresolvable::InvalidDataUri(reason) => DecodeError::InvalidDataUri(reason.clone()),
        }
    }
}

impl<'a> BufferStore<'a> {
    /// `base_dir` is the directory relative buffer URIs are resolved against.
    /// `glb_bin` is the BIN chunk of a GLB container, used for the buffer
    /// without an URI.
    pub fn new(base_dir: impl Into<PathBuf>, buffers: &'a [Buffer], glb_bin: Option<Vec<u8>>) -> Self {
        BufferStore {
            base_dir: base_dir.into(),
            buffers,
            glb_bin,
            slots: vec![None; buffers.len()],
        }
    }

    pub fn resolve(&mut self, index: usize) -> Result<&[u8], DecodeError> {
        let buffers = self.buffers;
        let Some(buffer) = buffers.get(index) else {
            return Err(DecodeError::MissingBuffer {
                index,
                location: format!("a document with {} buffers", buffers.len()),
            });
        };
        let slot = self.slots[index].get_or_insert_with(|| {
            let fetched = fetch(&self.base_dir, buffer, &mut self.glb_bin);
            match &fetched {
                Ok(bytes) => debug!("resolved buffer {index}: {} bytes", bytes.len()),
                Err(Unresolvable::Missing(location)) => {
                    error!("buffer {index} could not be resolved from {location}")
                }
                Err(Unresolvable::InvalidDataUri(reason)) => {
                    error!("buffer {index} has an invalid data URI: {reason}")
                }
            }
            fetched
        });
        match slot {
            Ok(bytes) => Ok(bytes.as_slice()),
            Err(unresolvable) => Err(unresolvable.to_error(index)),
        }
    }

    /// The bytes a buffer view covers, clipped to what its buffer actually
    /// holds. A view reaching past the end of its buffer yields a shorter
    /// slice rather than an error.
    pub fn view_bytes(&mut self, view: &BufferView) -> Result<&[u8], DecodeError> {
        let bytes = self.resolve(view.buffer)?;
        let start = view.byte_offset.min(bytes.len());
        let end = view.byte_offset.saturating_add(view.byte_length).min(bytes.len());
        if end - start < view.byte_length {
            warn!(
                "buffer view over buffer {} wants bytes {}..{} but the buffer has {}",
                view.buffer,
                view.byte_offset,
                view.byte_offset.saturating_add(view.byte_length),
                bytes.len(),
            );
        }
        Ok(&bytes[start..end])
    }
}

fn fetch(
    base_dir: &Path,
    buffer: &Buffer,
    glb_bin: &mut Option<Vec<u8>>,
) -> Result<Vec<u8>, Unresolvable> {
    let mut bytes = match buffer.uri.as_deref() {
        None => glb_bin
            .take()
            .ok_or_else(|| Unresolvable::Missing("the GLB BIN chunk".to_string()))?,
        Some(uri) if uri.starts_with("data:") => {
            decode_data_uri(uri).map_err(Unresolvable::InvalidDataUri)?
        }
        Some(uri) => {
            let path = resolve_uri(base_dir, uri);
            fs::read(&path)
                .map_err(|err| Unresolvable::Missing(format!("'{}' ({err})", path.display())))?
        }
    };
    if bytes.len() > buffer.byte_length {
        // GLB BIN chunks are padded to four bytes.
        bytes.truncate(buffer.byte_length);
    } else if bytes.len() < buffer.byte_length {
        warn!(
            "buffer declares {} bytes but only {} were found",
            buffer.byte_length,
            bytes.len()
        );
    }
    Ok(bytes)
}

/// Decodes an RFC 2397 `data:` URI with a base64 payload.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| "missing \"data:\" prefix".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "missing ',' before the payload".to_string())?;
    if !header.ends_with(";base64") {
        return Err(format!("only base64 payloads are supported, found \"{header}\""));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|err| err.to_string())
}

/// Resolves a relative URI from the document against `base_dir`, accepting
/// either slash direction.
pub fn resolve_uri(base_dir: &Path, uri: &str) -> PathBuf {
    base_dir.join(uri.replace('\\', "/"))
}
