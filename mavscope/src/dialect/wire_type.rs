use std::fmt::{Display, Formatter};

/// <sup>[`serde`](https://serde.rs)</sup>
/// Scalar MAVLink wire type.
///
/// All multibyte values are transmitted in little-endian byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WireType {
    /// `int8_t`
    Int8,
    /// `uint8_t`
    UInt8,
    /// `int16_t`
    Int16,
    /// `uint16_t`
    UInt16,
    /// `int32_t`
    Int32,
    /// `uint32_t`
    UInt32,
    /// `int64_t`
    Int64,
    /// `uint64_t`
    UInt64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `char`
    Char,
}

/// Legacy type of the `HEARTBEAT.mavlink_version` field, transmitted as `uint8_t`.
const MAVLINK_VERSION_ALIAS: &str = "uint8_t_mavlink_version";

impl WireType {
    /// All wire types.
    pub const ALL: [WireType; 11] = [
        WireType::Int8,
        WireType::UInt8,
        WireType::Int16,
        WireType::UInt16,
        WireType::Int32,
        WireType::UInt32,
        WireType::Int64,
        WireType::UInt64,
        WireType::Float,
        WireType::Double,
        WireType::Char,
    ];

    /// Size of a single value in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            WireType::Int8 | WireType::UInt8 | WireType::Char => 1,
            WireType::Int16 | WireType::UInt16 => 2,
            WireType::Int32 | WireType::UInt32 | WireType::Float => 4,
            WireType::Int64 | WireType::UInt64 | WireType::Double => 8,
        }
    }

    /// Canonical type name as used in dialect definitions and CRC-extra calculation.
    pub const fn name(&self) -> &'static str {
        match self {
            WireType::Int8 => "int8_t",
            WireType::UInt8 => "uint8_t",
            WireType::Int16 => "int16_t",
            WireType::UInt16 => "uint16_t",
            WireType::Int32 => "int32_t",
            WireType::UInt32 => "uint32_t",
            WireType::Int64 => "int64_t",
            WireType::UInt64 => "uint64_t",
            WireType::Float => "float",
            WireType::Double => "double",
            WireType::Char => "char",
        }
    }

    /// Returns `true` for signed and unsigned integer types.
    #[inline]
    pub const fn is_integer(&self) -> bool {
        !matches!(self, WireType::Float | WireType::Double | WireType::Char)
    }

    /// Returns `true` for `float` and `double`.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, WireType::Float | WireType::Double)
    }

    /// Resolves a dialect type string.
    ///
    /// Array brackets are stripped (`char[16]` resolves to [`WireType::Char`]) and the legacy
    /// `uint8_t_mavlink_version` alias resolves to [`WireType::UInt8`]. Returns [`None`] for
    /// unsupported types.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mavscope::dialect::WireType;
    ///
    /// assert_eq!(WireType::resolve("float"), Some(WireType::Float));
    /// assert_eq!(WireType::resolve("char[16]"), Some(WireType::Char));
    /// assert_eq!(WireType::resolve("uint8_t_mavlink_version"), Some(WireType::UInt8));
    /// assert_eq!(WireType::resolve("bool"), None);
    /// ```
    pub fn resolve(type_name: &str) -> Option<WireType> {
        let mut base = type_name.trim();
        if base == MAVLINK_VERSION_ALIAS {
            return Some(WireType::UInt8);
        }
        if let Some(bracket) = base.find('[') {
            base = base[..bracket].trim_end();
        }

        WireType::ALL.into_iter().find(|t| t.name() == base)
    }
}

impl Display for WireType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
