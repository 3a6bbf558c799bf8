//! Turning accessors into typed arrays.
//!
//! Component bytes are reinterpreted in host byte order. glTF data is
//! little-endian, so big-endian hosts are not supported.

use bytemuck::{AnyBitPattern, Zeroable};
use log::{debug, warn};

use crate::buffer_store::BufferStore;
use crate::error::DecodeError;
use crate::gltf::AssetDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Option<ComponentType> {
        match code {
            5120 => Some(ComponentType::I8),
            5121 => Some(ComponentType::U8),
            5122 => Some(ComponentType::I16),
            5123 => Some(ComponentType::U16),
            5125 => Some(ComponentType::U32),
            5126 => Some(ComponentType::F32),
            _ => None,
        }
    }

    pub fn byte_width(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementShape {
    pub fn from_name(name: &str) -> Option<ElementShape> {
        match name {
            "SCALAR" => Some(ElementShape::Scalar),
            "VEC2" => Some(ElementShape::Vec2),
            "VEC3" => Some(ElementShape::Vec3),
            "VEC4" => Some(ElementShape::Vec4),
            "MAT2" => Some(ElementShape::Mat2),
            "MAT3" => Some(ElementShape::Mat3),
            "MAT4" => Some(ElementShape::Mat4),
            _ => None,
        }
    }

    /// Number of components per element.
    pub fn arity(self) -> usize {
        match self {
            ElementShape::Scalar => 1,
            ElementShape::Vec2 => 2,
            ElementShape::Vec3 => 3,
            ElementShape::Vec4 | ElementShape::Mat2 => 4,
            ElementShape::Mat3 => 9,
            ElementShape::Mat4 => 16,
        }
    }

    fn is_matrix(self) -> bool {
        matches!(
            self,
            ElementShape::Mat2 | ElementShape::Mat3 | ElementShape::Mat4
        )
    }
}

/// The flat component values of an accessor, in their stored type.
#[derive(Debug, Clone, PartialEq)]
pub enum Components {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl Components {
    fn from_bytes(component_type: ComponentType, bytes: &[u8]) -> Components {
        match component_type {
            ComponentType::I8 => Components::I8(collect(bytes)),
            ComponentType::U8 => Components::U8(bytes.to_vec()),
            ComponentType::I16 => Components::I16(collect(bytes)),
            ComponentType::U16 => Components::U16(collect(bytes)),
            ComponentType::U32 => Components::U32(collect(bytes)),
            ComponentType::F32 => Components::F32(collect(bytes)),
        }
    }

    /// `len` zeroed components, or `None` if they cannot be allocated.
    fn zeroed(component_type: ComponentType, len: usize) -> Option<Components> {
        Some(match component_type {
            ComponentType::I8 => Components::I8(zeroes(len)?),
            ComponentType::U8 => Components::U8(zeroes(len)?),
            ComponentType::I16 => Components::I16(zeroes(len)?),
            ComponentType::U16 => Components::U16(zeroes(len)?),
            ComponentType::U32 => Components::U32(zeroes(len)?),
            ComponentType::F32 => Components::F32(zeroes(len)?),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Components::I8(values) => values.len(),
            Components::U8(values) => values.len(),
            Components::I16(values) => values.len(),
            Components::U16(values) => values.len(),
            Components::U32(values) => values.len(),
            Components::F32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn zeroes<T: Zeroable + Clone>(len: usize) -> Option<Vec<T>> {
    let mut values = Vec::new();
    values.try_reserve_exact(len).ok()?;
    values.resize(len, T::zeroed());
    Some(values)
}

fn collect<T: AnyBitPattern + bytemuck::NoUninit>(bytes: &[u8]) -> Vec<T> {
    bytemuck::pod_collect_to_vec(bytes)
}

/// A decoded accessor: `len()` rows of `arity` components each, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorData {
    pub arity: usize,
    pub normalized: bool,
    pub components: Components,
}

impl AccessorData {
    /// Number of rows (elements).
    pub fn len(&self) -> usize {
        self.components.len() / self.arity
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All components as floats. Integer components of a normalized accessor
    /// are mapped to [0, 1] (unsigned) or [-1, 1] (signed).
    pub fn to_f32(&self) -> Vec<f32> {
        if !self.normalized {
            return match &self.components {
                Components::F32(values) => values.clone(),
                Components::I8(values) => convert(values, |v| v as f32),
                Components::U8(values) => convert(values, |v| v as f32),
                Components::I16(values) => convert(values, |v| v as f32),
                Components::U16(values) => convert(values, |v| v as f32),
                Components::U32(values) => convert(values, |v| v as f32),
            };
        }
        match &self.components {
            Components::F32(values) => values.clone(),
            Components::I8(values) => convert(values, |v| (v as f32 / 127.0).max(-1.0)),
            Components::U8(values) => convert(values, |v| v as f32 / 255.0),
            Components::I16(values) => convert(values, |v| (v as f32 / 32767.0).max(-1.0)),
            Components::U16(values) => convert(values, |v| v as f32 / 65535.0),
            Components::U32(values) => convert(values, |v| v as f32 / u32::MAX as f32),
        }
    }

    /// The rows as fixed-size float arrays, or `None` when the accessor does
    /// not have exactly `N` components per element.
    pub fn to_f32_rows<const N: usize>(&self) -> Option<Vec<[f32; N]>> {
        if self.arity != N {
            return None;
        }
        let floats = self.to_f32();
        Some(
            floats
                .chunks_exact(N)
                .map(|row| std::array::from_fn(|i| row[i]))
                .collect(),
        )
    }

    /// The values of an unsigned integer scalar accessor, as used for indices.
    pub fn to_u32(&self) -> Option<Vec<u32>> {
        if self.arity != 1 {
            return None;
        }
        match &self.components {
            Components::U8(values) => Some(values.iter().map(|&v| v as u32).collect()),
            Components::U16(values) => Some(values.iter().map(|&v| v as u32).collect()),
            Components::U32(values) => Some(values.clone()),
            Components::I8(_) | Components::I16(_) | Components::F32(_) => None,
        }
    }
}

fn convert<T: Copy>(values: &[T], f: impl Fn(T) -> f32) -> Vec<f32> {
    values.iter().map(|&v| f(v)).collect()
}

/// Decodes accessor `index` of `document`, fetching buffer bytes through
/// `store`.
///
/// Without a stride (or for scalars, where the stride is ignored) the
/// `count` elements are read contiguously from `view.offset + accessor.offset`
/// and must all fit in the view. With a stride, element `i` is read from
/// `view.offset + accessor.offset + i * stride`, skipping any padding after
/// the element; if the view runs out, the rows read so far are returned.
pub fn decode_accessor(
    document: &AssetDocument,
    index: usize,
    store: &mut BufferStore,
) -> Result<AccessorData, DecodeError> {
    let unsupported = |reason: String| DecodeError::UnsupportedAccessor {
        accessor: index,
        reason,
    };
    let accessor = document
        .accessors
        .get(index)
        .ok_or_else(|| unsupported("no such accessor".to_string()))?;
    let component_type = ComponentType::from_code(accessor.component_type).ok_or_else(|| {
        unsupported(format!("component type {}", accessor.component_type))
    })?;
    let shape = ElementShape::from_name(&accessor.kind)
        .ok_or_else(|| unsupported(format!("element type \"{}\"", accessor.kind)))?;
    if shape.is_matrix() && component_type != ComponentType::F32 {
        return Err(unsupported(format!("{shape:?} of {component_type:?}")));
    }

    let arity = shape.arity();
    let element_size = arity * component_type.byte_width();
    let count = accessor.count;
    let data = |components| AccessorData {
        arity,
        normalized: accessor.normalized,
        components,
    };

    let Some(view_index) = accessor.buffer_view else {
        debug!("accessor {index}: no buffer view, {count} zeroed elements");
        let components = count
            .checked_mul(arity)
            .and_then(|len| Components::zeroed(component_type, len))
            .ok_or_else(|| unsupported(format!("cannot allocate {count} zeroed elements")))?;
        return Ok(data(components));
    };
    let view = document
        .buffer_views
        .get(view_index)
        .ok_or_else(|| unsupported(format!("buffer view {view_index} does not exist")))?;
    let bytes = store.view_bytes(view)?;
    let stride = view.byte_stride.filter(|_| shape != ElementShape::Scalar);
    debug!(
        "accessor {index}: {shape:?} of {component_type:?}, count {count}, stride {stride:?}"
    );

    let components = match stride {
        None => {
            let start = accessor.byte_offset;
            let end = count
                .checked_mul(element_size)
                .and_then(|len| len.checked_add(start))
                .unwrap_or(usize::MAX);
            let packed = bytes.get(start..end).ok_or(DecodeError::AccessorOutOfBounds {
                accessor: index,
                needed: end,
                available: bytes.len(),
            })?;
            Components::from_bytes(component_type, packed)
        }
        Some(stride) => {
            if stride < element_size {
                return Err(unsupported(format!(
                    "stride {stride} is smaller than the {element_size} byte element"
                )));
            }
            // Never reserve more rows than the view can hold.
            let fitting = bytes.len().saturating_sub(accessor.byte_offset) / stride + 1;
            let mut packed = Vec::with_capacity(count.min(fitting) * element_size);
            for i in 0..count {
                let row = i
                    .checked_mul(stride)
                    .and_then(|offset| offset.checked_add(accessor.byte_offset))
                    .and_then(|row_start| bytes.get(row_start..row_start + element_size));
                let Some(row) = row else {
                    warn!("accessor {index}: data runs out at element {i} of {count}");
                    break;
                };
                packed.extend_from_slice(row);
            }
            Components::from_bytes(component_type, &packed)
        }
    };
    Ok(data(components))
}
