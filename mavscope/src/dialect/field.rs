use std::fmt::{Display, Formatter};

use crate::codec::{Scalar, Value};
use crate::dialect::WireType;
use crate::errors::EncodeErrorKind;

/// <sup>[`serde`](https://serde.rs)</sup>
/// Resolved field declaration.
///
/// Unlike [`FieldDescription`](super::FieldDescription), the wire type is already resolved and
/// the array length is known.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDefinition {
    /// Position of the field in declaration order.
    pub index: usize,
    /// Element wire type.
    pub wire_type: WireType,
    /// Field name.
    pub name: String,
    /// Name of the enum describing field values.
    pub enum_name: Option<String>,
    /// Array length or `0` for scalars.
    pub array_length: usize,
    /// Whether the field is an extension field.
    pub extension: bool,
}

impl FieldDefinition {
    /// Whether the field is an array (including `char` strings).
    #[inline]
    pub fn is_array(&self) -> bool {
        self.array_length > 0
    }

    /// Field size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.wire_type.size() * self.array_length.max(1)
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Encoder and decoder for the bytes of a single field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldCodec {
    /// Single value.
    Scalar(WireType),
    /// Fixed-length sequence of numeric values.
    Array {
        /// Element type.
        element: WireType,
        /// Number of elements.
        length: usize,
    },
    /// Fixed-length `char` array, decoded as text truncated at the first zero byte.
    Text {
        /// Number of bytes.
        length: usize,
    },
}

impl FieldCodec {
    /// Picks codec for a field definition.
    pub fn for_definition(definition: &FieldDefinition) -> Self {
        match (definition.wire_type, definition.array_length) {
            (wire_type, 0) => FieldCodec::Scalar(wire_type),
            (WireType::Char, length) => FieldCodec::Text { length },
            (element, length) => FieldCodec::Array { element, length },
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        match *self {
            FieldCodec::Scalar(wire_type) => wire_type.size(),
            FieldCodec::Array { element, length } => element.size() * length,
            FieldCodec::Text { length } => length,
        }
    }

    /// Element wire type.
    pub fn wire_type(&self) -> WireType {
        match *self {
            FieldCodec::Scalar(wire_type) => wire_type,
            FieldCodec::Array { element, .. } => element,
            FieldCodec::Text { .. } => WireType::Char,
        }
    }

    /// Decodes field value from exactly [`size`](Self::size) bytes.
    pub(crate) fn decode(&self, bytes: &[u8]) -> Value {
        match *self {
            FieldCodec::Scalar(wire_type) => Value::Scalar(read_scalar(wire_type, bytes)),
            FieldCodec::Array { element, .. } => Value::Array(
                bytes
                    .chunks_exact(element.size())
                    .map(|chunk| read_scalar(element, chunk))
                    .collect(),
            ),
            FieldCodec::Text { .. } => Value::Scalar(Scalar::String(read_text(bytes))),
        }
    }

    /// Encodes field value into exactly [`size`](Self::size) bytes of `out`.
    ///
    /// Arrays and text are truncated or zero-padded to the declared length.
    pub(crate) fn encode(&self, value: &Value, out: &mut [u8]) -> Result<(), EncodeErrorKind> {
        out.fill(0);

        match (*self, value) {
            (FieldCodec::Scalar(wire_type), Value::Scalar(scalar)) => {
                write_scalar(wire_type, scalar, out)
            }
            (FieldCodec::Text { length }, Value::Scalar(scalar)) => {
                let bytes = match scalar {
                    Scalar::String(text) => text.as_bytes(),
                    Scalar::Bytes(bytes) => bytes.as_slice(),
                    other => return Err(mismatch("string or bytes", other.kind())),
                };
                let n = bytes.len().min(length);
                out[..n].copy_from_slice(&bytes[..n]);
                Ok(())
            }
            (FieldCodec::Array { element, length }, Value::Array(items)) => {
                for (item, chunk) in items
                    .iter()
                    .take(length)
                    .zip(out.chunks_exact_mut(element.size()))
                {
                    write_scalar(element, item, chunk)?;
                }
                Ok(())
            }
            (FieldCodec::Array { element, length }, Value::Scalar(Scalar::Bytes(bytes)))
                if element.size() == 1 =>
            {
                for (byte, chunk) in bytes.iter().take(length).zip(out.iter_mut()) {
                    write_scalar(element, &Scalar::UInt(*byte as u64), std::slice::from_mut(chunk))?;
                }
                Ok(())
            }
            (FieldCodec::Scalar(_), other) => Err(mismatch("scalar", other.kind())),
            (FieldCodec::Text { .. }, other) => Err(mismatch("string or bytes", other.kind())),
            (FieldCodec::Array { .. }, other) => Err(mismatch("array", other.kind())),
        }
    }
}

fn mismatch(expected: &'static str, found: &'static str) -> EncodeErrorKind {
    EncodeErrorKind::TypeMismatch { expected, found }
}

fn read_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn read_scalar(wire_type: WireType, bytes: &[u8]) -> Scalar {
    let mut le = [0u8; 8];
    le[..bytes.len()].copy_from_slice(bytes);
    let raw = u64::from_le_bytes(le);

    match wire_type {
        WireType::UInt8 | WireType::UInt16 | WireType::UInt32 | WireType::UInt64 => {
            Scalar::UInt(raw)
        }
        WireType::Int8 => Scalar::Int(raw as u8 as i8 as i64),
        WireType::Int16 => Scalar::Int(raw as u16 as i16 as i64),
        WireType::Int32 => Scalar::Int(raw as u32 as i32 as i64),
        WireType::Int64 => Scalar::Int(raw as i64),
        WireType::Float => Scalar::Float(f32::from_bits(raw as u32) as f64),
        WireType::Double => Scalar::Float(f64::from_bits(raw)),
        WireType::Char => Scalar::String(read_text(bytes)),
    }
}

fn write_scalar(wire_type: WireType, value: &Scalar, out: &mut [u8]) -> Result<(), EncodeErrorKind> {
    let out_of_range = || EncodeErrorKind::OutOfRange {
        value: value.to_string(),
        wire_type,
    };

    let raw: u64 = match wire_type {
        WireType::UInt8 | WireType::UInt16 | WireType::UInt32 | WireType::UInt64 => {
            let v = match value {
                Scalar::UInt(_) | Scalar::Int(_) => value.as_u64().ok_or_else(out_of_range)?,
                other => return Err(mismatch("integer", other.kind())),
            };
            let bits = wire_type.size() * 8;
            if bits < 64 && v >> bits != 0 {
                return Err(out_of_range());
            }
            v
        }
        WireType::Int8 | WireType::Int16 | WireType::Int32 | WireType::Int64 => {
            let v = match value {
                Scalar::UInt(_) | Scalar::Int(_) => value.as_i64().ok_or_else(out_of_range)?,
                other => return Err(mismatch("integer", other.kind())),
            };
            let bits = wire_type.size() * 8;
            let (min, max) = (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1);
            if (v as i128) < min || (v as i128) > max {
                return Err(out_of_range());
            }
            v as u64
        }
        WireType::Float => {
            let v = value
                .as_f64()
                .ok_or_else(|| mismatch("number", value.kind()))?;
            if v.is_finite() && v.abs() > f32::MAX as f64 {
                return Err(out_of_range());
            }
            (v as f32).to_bits() as u64
        }
        WireType::Double => value
            .as_f64()
            .ok_or_else(|| mismatch("number", value.kind()))?
            .to_bits(),
        WireType::Char => match value {
            Scalar::String(text) => text.as_bytes().first().copied().unwrap_or(0) as u64,
            Scalar::Bytes(bytes) => bytes.first().copied().unwrap_or(0) as u64,
            Scalar::UInt(_) | Scalar::Int(_) => match value.as_u64() {
                Some(v) if v <= u8::MAX as u64 => v,
                _ => return Err(out_of_range()),
            },
            other => return Err(mismatch("character", other.kind())),
        },
    };

    out.copy_from_slice(&raw.to_le_bytes()[..wire_type.size()]);
    Ok(())
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Field bound to its codec and position within the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompiledField {
    /// Resolved declaration.
    pub definition: FieldDefinition,
    /// Byte codec.
    pub codec: FieldCodec,
    /// Offset from the payload start.
    pub offset: usize,
    /// Size in bytes.
    pub size: usize,
}

impl CompiledField {
    /// Field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Offset of the first byte after this field.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

impl Display for CompiledField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let def = &self.definition;
        write!(f, "{} {}", def.wire_type, def.name)?;
        if def.is_array() {
            write!(f, "[{}]", def.array_length)?;
        }
        write!(f, " @{}+{}", self.offset, self.size)?;
        if let Some(enum_name) = &def.enum_name {
            write!(f, " enum={enum_name}")?;
        }
        if def.extension {
            f.write_str(" (extension)")?;
        }
        Ok(())
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////
