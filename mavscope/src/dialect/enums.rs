use crate::errors::EncodeErrorKind;

/// <sup>[`serde`](https://serde.rs)</sup>
/// Dialect enum used to translate symbolic field values.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumDefinition {
    /// Enum name, for example `MAV_MODE_FLAG`.
    pub name: String,
    /// Whether entries are flags that may be combined.
    #[cfg_attr(feature = "serde", serde(default))]
    pub bitmask: bool,
    /// Entries in declaration order.
    pub entries: Vec<EnumEntry>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Single named enum value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumEntry {
    /// Entry name, for example `MAV_MODE_FLAG_SAFETY_ARMED`.
    pub name: String,
    /// Entry value.
    pub value: u64,
}

/// Element of a bitmask value passed to [`EnumDefinition::by_bitmask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag<'a> {
    /// Flag referenced by entry name.
    Name(&'a str),
    /// Raw flag value. Only bits covered by declared entries are kept.
    Value(u64),
}

impl EnumDefinition {
    /// Creates a plain (non-bitmask) enum.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bitmask: false,
            entries: Vec::new(),
        }
    }

    /// Creates a bitmask enum.
    pub fn bitmask(name: impl Into<String>) -> Self {
        Self {
            bitmask: true,
            ..Self::new(name)
        }
    }

    /// Adds an entry.
    pub fn entry(mut self, name: impl Into<String>, value: u64) -> Self {
        self.entries.push(EnumEntry {
            name: name.into(),
            value,
        });
        self
    }

    /// Resolves a numeric value.
    ///
    /// Numeric input is trusted as is and not checked against declared entries, since dialects
    /// routinely lag behind the values sent by newer firmware.
    #[inline]
    pub fn by_integer(&self, value: i64) -> i64 {
        value
    }

    /// Resolves an entry name into its value.
    pub fn by_name(&self, name: &str) -> Result<u64, EncodeErrorKind> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
            .ok_or_else(|| EncodeErrorKind::UnknownEnumEntry {
                enum_name: self.name.clone(),
                entry: name.to_string(),
            })
    }

    /// Combines a sequence of flags into a single bitmask value.
    ///
    /// Names resolve to their entry value. Raw values are reduced to the declared entries they
    /// fully cover. All results are OR'd together.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mavscope::dialect::{EnumDefinition, Flag};
    ///
    /// let flags = EnumDefinition::bitmask("FLAGS")
    ///     .entry("A", 1)
    ///     .entry("B", 4);
    ///
    /// assert_eq!(flags.by_bitmask([Flag::Name("A"), Flag::Name("B")]).unwrap(), 5);
    /// assert_eq!(flags.by_bitmask([Flag::Value(0b111)]).unwrap(), 5);
    /// ```
    pub fn by_bitmask<'a>(
        &self,
        flags: impl IntoIterator<Item = Flag<'a>>,
    ) -> Result<u64, EncodeErrorKind> {
        if !self.bitmask {
            return Err(EncodeErrorKind::NotBitmask(self.name.clone()));
        }

        let mut mask = 0u64;
        for flag in flags {
            mask |= match flag {
                Flag::Name(name) => self.by_name(name)?,
                Flag::Value(value) => self
                    .flags_in_mask(value)
                    .fold(0, |acc, entry| acc | entry.value),
            };
        }
        Ok(mask)
    }

    /// Returns the first entry with the specified value.
    pub fn entry_for_value(&self, value: u64) -> Option<&EnumEntry> {
        self.entries.iter().find(|entry| entry.value == value)
    }

    /// Returns declared non-zero entries whose bits are all set in `mask`.
    pub fn flags_in_mask(&self, mask: u64) -> impl Iterator<Item = &EnumEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.value != 0 && entry.value & mask == entry.value)
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_flags() -> EnumDefinition {
        EnumDefinition::bitmask("MAV_MODE_FLAG")
            .entry("MAV_MODE_FLAG_CUSTOM_MODE_ENABLED", 1)
            .entry("MAV_MODE_FLAG_GUIDED_ENABLED", 8)
            .entry("MAV_MODE_FLAG_SAFETY_ARMED", 128)
    }

    #[test]
    fn by_name_resolves_entries() {
        let flags = mode_flags();
        assert_eq!(flags.by_name("MAV_MODE_FLAG_SAFETY_ARMED").unwrap(), 128);
        assert!(matches!(
            flags.by_name("MAV_MODE_FLAG_UNKNOWN"),
            Err(EncodeErrorKind::UnknownEnumEntry { .. })
        ));
    }

    #[test]
    fn bitmask_combines_names_and_values() {
        let flags = mode_flags();

        let mask = flags
            .by_bitmask([
                Flag::Name("MAV_MODE_FLAG_SAFETY_ARMED"),
                Flag::Value(1 | 2 | 8),
            ])
            .unwrap();
        assert_eq!(mask, 128 | 1 | 8);

        let covered: Vec<&str> = flags
            .flags_in_mask(mask)
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(covered.len(), 3);
    }

    #[test]
    fn bitmask_rejected_for_plain_enum() {
        let plain = EnumDefinition::new("MAV_STATE").entry("MAV_STATE_ACTIVE", 4);
        assert!(matches!(
            plain.by_bitmask([Flag::Value(4)]),
            Err(EncodeErrorKind::NotBitmask(_))
        ));
        assert_eq!(plain.entry_for_value(4).unwrap().name, "MAV_STATE_ACTIVE");
        assert_eq!(plain.by_integer(-3), -3);
    }
}
