//! N-dimensional array values
//!
//! `NDArrayValue` stores elements in row-major order alongside the shape.
//! It also implements the NPY v1.0 interchange format used when an ndarray
//! is written to or read from disk.

// SAFETY: u64→usize casts are on extents that already index an in-memory Vec.
#![allow(clippy::cast_possible_truncation)]

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::convert::{cast, ScalarKind};
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;

/// Magic string that opens every NPY file
pub const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Total preamble (magic + version + header length + header) alignment
const NPY_ALIGN: usize = 64;

/// Row-major n-dimensional array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NDArrayValue {
    /// Extent of each axis
    pub shape: Vec<u64>,
    /// Elements in row-major order
    pub data: Vec<Value>,
}

impl NDArrayValue {
    /// Create an array, checking that the element count matches the shape
    pub fn new(shape: Vec<u64>, data: Vec<Value>) -> RuntimeResult<Self> {
        let expected: u64 = shape.iter().product();
        if expected != data.len() as u64 {
            return Err(RuntimeError::shape_error(format!(
                "shape {:?} requires {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(NDArrayValue { shape, data })
    }

    /// Zero-dimensional array holding one element
    pub fn scalar(value: Value) -> Self {
        NDArrayValue {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major strides in elements
    pub fn strides(&self) -> Vec<u64> {
        row_major_strides(&self.shape)
    }

    /// Flat offset of a multi-index, bounds-checked per axis
    pub fn offset(&self, index: &[u64]) -> RuntimeResult<usize> {
        if index.len() != self.shape.len() {
            return Err(RuntimeError::shape_error(format!(
                "expected {} indices, got {}",
                self.shape.len(),
                index.len()
            )));
        }
        let mut offset = 0u64;
        for ((&i, &extent), stride) in index.iter().zip(&self.shape).zip(self.strides()) {
            if i >= extent {
                return Err(RuntimeError::bounds_error(i as i64, extent as usize));
            }
            offset += i * stride;
        }
        Ok(offset as usize)
    }

    /// Element at a multi-index
    pub fn get(&self, index: &[u64]) -> RuntimeResult<&Value> {
        let offset = self.offset(index)?;
        Ok(&self.data[offset])
    }

    /// Iterate all multi-indices of `shape` in row-major order
    pub fn indices(shape: &[u64]) -> impl Iterator<Item = Vec<u64>> + '_ {
        let total: u64 = shape.iter().product();
        let strides = row_major_strides(shape);
        (0..total).map(move |flat| {
            strides
                .iter()
                .zip(shape)
                .map(|(&stride, &extent)| (flat / stride) % extent.max(1))
                .collect()
        })
    }

    /// Encode as an NPY v1.0 byte buffer with the given element kind
    pub fn to_npy_bytes(&self, kind: ScalarKind) -> RuntimeResult<Vec<u8>> {
        let shape = match self.shape.len() {
            0 => "()".to_string(),
            1 => format!("({},)", self.shape[0]),
            _ => {
                let parts: Vec<String> = self.shape.iter().map(|e| e.to_string()).collect();
                format!("({})", parts.join(", "))
            }
        };
        let mut header = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
            kind.descr(),
            shape
        );
        let preamble = NPY_MAGIC.len() + 2 + 2;
        let unpadded = preamble + header.len() + 1;
        let padding = (NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN;
        header.push_str(&" ".repeat(padding));
        header.push('\n');

        let header_len = u16::try_from(header.len())
            .map_err(|_| RuntimeError::format_error("NPY header too long"))?;

        let mut out = Vec::with_capacity(preamble + header.len() + self.len() * kind.byte_width());
        out.extend_from_slice(NPY_MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(header.as_bytes());

        for element in &self.data {
            if element.is_missing() {
                return Err(RuntimeError::format_error(
                    "cannot encode a missing element in NPY format",
                ));
            }
            match cast(element, kind)? {
                Value::Bool(b) => out.push(u8::from(b)),
                Value::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
                Value::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
                Value::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
                Value::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "cannot encode {} in NPY format",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Decode an NPY v1.0 byte buffer
    pub fn from_npy_bytes(bytes: &[u8]) -> RuntimeResult<(Self, ScalarKind)> {
        if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
            return Err(RuntimeError::format_error("missing NPY magic string"));
        }
        if bytes[6] != 1 {
            return Err(RuntimeError::format_error(format!(
                "unsupported NPY version {}.{}",
                bytes[6], bytes[7]
            )));
        }
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let body_start = 10 + header_len;
        let header = bytes
            .get(10..body_start)
            .and_then(|h| std::str::from_utf8(h).ok())
            .ok_or_else(|| RuntimeError::format_error("truncated NPY header"))?;

        let descr = header_entry(header, "descr")?
            .trim_matches('\'')
            .to_string();
        let kind = ScalarKind::from_descr(&descr)
            .ok_or_else(|| RuntimeError::format_error(format!("unsupported dtype '{}'", descr)))?;
        if header_entry(header, "fortran_order")? != "False" {
            return Err(RuntimeError::format_error(
                "column-major NPY data is not supported",
            ));
        }
        let shape = parse_shape(header_entry(header, "shape")?)?;

        let count: u64 = shape.iter().product();
        let width = kind.byte_width();
        let body = &bytes[body_start..];
        if body.len() != count as usize * width {
            return Err(RuntimeError::format_error(format!(
                "expected {} data bytes, found {}",
                count as usize * width,
                body.len()
            )));
        }

        let data = body
            .chunks_exact(width)
            .map(|chunk| decode_element(chunk, kind))
            .collect::<RuntimeResult<Vec<_>>>()?;
        Ok((NDArrayValue { shape, data }, kind))
    }
}

fn row_major_strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1u64; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

fn decode_element(chunk: &[u8], kind: ScalarKind) -> RuntimeResult<Value> {
    let bad = || RuntimeError::format_error("truncated NPY element");
    Ok(match kind {
        ScalarKind::Bool => Value::Bool(chunk[0] != 0),
        ScalarKind::Int32 => Value::I32(i32::from_le_bytes(chunk.try_into().map_err(|_| bad())?)),
        ScalarKind::Int64 => Value::I64(i64::from_le_bytes(chunk.try_into().map_err(|_| bad())?)),
        ScalarKind::Float32 => {
            Value::F32(f32::from_le_bytes(chunk.try_into().map_err(|_| bad())?))
        }
        ScalarKind::Float64 => {
            Value::F64(f64::from_le_bytes(chunk.try_into().map_err(|_| bad())?))
        }
    })
}

/// Extract the raw text of one entry from the header dictionary literal
fn header_entry<'a>(header: &'a str, key: &str) -> RuntimeResult<&'a str> {
    let pattern = format!("'{}':", key);
    let start = header
        .find(&pattern)
        .ok_or_else(|| RuntimeError::format_error(format!("NPY header lacks '{}'", key)))?
        + pattern.len();
    let rest = header[start..].trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find(',')
    }
    .ok_or_else(|| RuntimeError::format_error(format!("malformed NPY entry '{}'", key)))?;
    Ok(rest[..end].trim())
}

fn parse_shape(text: &str) -> RuntimeResult<Vec<u64>> {
    text.trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| RuntimeError::format_error(format!("bad NPY extent '{}'", s)))
        })
        .collect()
}

impl fmt::Display for NDArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render(
            f: &mut fmt::Formatter<'_>,
            shape: &[u64],
            data: &[Value],
        ) -> fmt::Result {
            match shape.split_first() {
                None => write!(f, "{}", data.first().unwrap_or(&Value::Missing)),
                Some((&extent, rest)) => {
                    let chunk = rest.iter().product::<u64>() as usize;
                    write!(f, "[")?;
                    for i in 0..extent as usize {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        render(f, rest, &data[i * chunk..(i + 1) * chunk])?;
                    }
                    write!(f, "]")
                }
            }
        }
        render(f, &self.shape, &self.data)
    }
}
