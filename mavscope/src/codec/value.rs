use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Decoded payload or encoder input: field name to value.
pub type Fields = BTreeMap<String, Value>;

/// <sup>[`serde`](https://serde.rs)</sup>
/// Single field value.
///
/// Decoding produces [`Scalar::UInt`] for unsigned wire types, [`Scalar::Int`] for signed ones,
/// [`Scalar::Float`] for `float` and `double`, and [`Scalar::String`] for `char` fields.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Scalar {
    /// Unsigned integer.
    UInt(u64),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text, or a symbolic enum entry name.
    String(String),
    /// Raw bytes, accepted by `char` and 8-bit arrays.
    Bytes(Vec<u8>),
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Field value: either a scalar or an ordered sequence of scalars.
///
/// Arrays are used for numeric array fields and for bitmask enum fields given as a set of
/// flags.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Ordered sequence of values.
    Array(Vec<Scalar>),
    /// Single value.
    Scalar(Scalar),
}

impl Scalar {
    /// Short description of the value shape used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::UInt(_) => "unsigned integer",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
            Scalar::Bytes(_) => "bytes",
        }
    }

    /// Returns text if this is a [`Scalar::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns value as `u64` for non-negative integers.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Scalar::UInt(v) => Some(v),
            Scalar::Int(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns value as `i64` for integers that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Scalar::Int(v) => Some(v),
            Scalar::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns value as `f64` for any numeric scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::Float(v) => Some(v),
            Scalar::Int(v) => Some(v as f64),
            Scalar::UInt(v) => Some(v as f64),
            _ => None,
        }
    }
}

impl Value {
    /// Short description of the value shape used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(scalar) => scalar.kind(),
            Value::Array(_) => "array",
        }
    }

    /// Returns scalar if this is a [`Value::Scalar`].
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            Value::Array(_) => None,
        }
    }

    /// Returns elements if this is a [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Scalar]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            Value::Scalar(_) => None,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(v) => write!(f, "{v:?}"),
            Scalar::Bytes(v) => write!(f, "{v:02x?}"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Scalar(scalar) => scalar.fmt(f),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from_uint {
    ($($t:ty),*) => {$(
        impl From<$t> for Scalar {
            fn from(value: $t) -> Self { Scalar::UInt(value as u64) }
        }
        impl From<$t> for Value {
            fn from(value: $t) -> Self { Value::Scalar(value.into()) }
        }
    )*};
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Scalar {
            fn from(value: $t) -> Self { Scalar::Int(value as i64) }
        }
        impl From<$t> for Value {
            fn from(value: $t) -> Self { Value::Scalar(value.into()) }
        }
    )*};
}

impl_from_uint!(u8, u16, u32, u64);
impl_from_int!(i8, i16, i32, i64);

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(value as f64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Scalar::Bytes(value)
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value.into())
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_the_right_shape() {
        assert_eq!(Value::from(7u16), Value::Scalar(Scalar::UInt(7)));
        assert_eq!(Value::from(-7i8), Value::Scalar(Scalar::Int(-7)));
        assert_eq!(Value::from("armed"), Value::Scalar(Scalar::from("armed")));
        assert_eq!(
            Value::from(vec![1.5f32, 2.0]),
            Value::Array(vec![Scalar::Float(1.5), Scalar::Float(2.0)])
        );
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(Scalar::Int(-1).as_u64(), None);
        assert_eq!(Scalar::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Scalar::UInt(3).as_f64(), Some(3.0));
        assert_eq!(Value::from(vec![1u8, 2]).to_string(), "[1, 2]");
    }
}
