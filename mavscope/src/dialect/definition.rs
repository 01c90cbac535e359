//! Parsed dialect tree as produced by a dialect loader.
//!
//! These types carry no wire-level knowledge. They are compiled into a
//! [`MessageRegistry`](super::MessageRegistry) which fixes field order, offsets, and CRC-extra.

use crate::dialect::EnumDefinition;
use crate::protocol::MessageId;

/// <sup>[`serde`](https://serde.rs)</sup>
/// A named set of message and enum definitions.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DialectDefinition {
    /// Dialect name, for example `common`.
    pub name: String,
    /// Message definitions.
    pub messages: Vec<MessageDefinition>,
    /// Enum definitions referenced by message fields.
    #[cfg_attr(feature = "serde", serde(default))]
    pub enums: Vec<EnumDefinition>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Message as declared in a dialect.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageDefinition {
    /// Message `ID`.
    pub id: MessageId,
    /// Message name, for example `HEARTBEAT`.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescription>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Field as declared in a dialect, before compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDescription {
    /// Declared type, for example `uint16_t` or `char[16]`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub type_name: String,
    /// Field name.
    pub name: String,
    /// Array length or `0` for scalars.
    ///
    /// When `0` and [`type_name`](Self::type_name) carries brackets, the length is taken from
    /// the type string.
    #[cfg_attr(feature = "serde", serde(default))]
    pub array_length: usize,
    /// Whether the field was declared after the `<extensions/>` marker.
    #[cfg_attr(feature = "serde", serde(default))]
    pub extension: bool,
    /// Name of the enum describing field values.
    #[cfg_attr(feature = "serde", serde(default))]
    pub enum_name: Option<String>,
}

impl DialectDefinition {
    /// Creates an empty dialect definition with the specified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a message definition.
    pub fn message(mut self, message: MessageDefinition) -> Self {
        self.messages.push(message);
        self
    }

    /// Adds an enum definition.
    pub fn enumeration(mut self, enum_def: EnumDefinition) -> Self {
        self.enums.push(enum_def);
        self
    }
}

impl MessageDefinition {
    /// Creates a message definition without fields.
    pub fn new(id: MessageId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    pub fn field(mut self, field: FieldDescription) -> Self {
        self.fields.push(field);
        self
    }
}

impl FieldDescription {
    /// Creates a base scalar field description.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mavscope::dialect::FieldDescription;
    ///
    /// let field = FieldDescription::new("char[16]", "param_id");
    /// let field = FieldDescription::new("uint8_t", "type").with_enum("MAV_TYPE");
    /// let field = FieldDescription::new("uint16_t", "id").extension();
    /// ```
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            array_length: 0,
            extension: false,
            enum_name: None,
        }
    }

    /// Sets array length explicitly.
    pub fn with_array_length(mut self, array_length: usize) -> Self {
        self.array_length = array_length;
        self
    }

    /// Sets the enum describing field values.
    pub fn with_enum(mut self, enum_name: impl Into<String>) -> Self {
        self.enum_name = Some(enum_name.into());
        self
    }

    /// Marks the field as an extension field.
    pub fn extension(mut self) -> Self {
        self.extension = true;
        self
    }
}
