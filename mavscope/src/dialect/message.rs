use std::fmt::{Display, Formatter};

use crate::consts::PAYLOAD_MAX_SIZE;
use crate::dialect::{
    CompiledField, FieldCodec, FieldDefinition, FieldDescription, MessageDefinition, WireType,
};
use crate::errors::CompileError;
use crate::protocol::{Crc, CrcExtra, MessageId};

/// <sup>[`serde`](https://serde.rs)</sup>
/// Wire-accurate layout of a single message.
///
/// Fields are stored in wire order: base fields first, then extensions. Within each group,
/// fields are sorted by element size (descending) and then by declaration index.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompiledMessage {
    id: MessageId,
    name: String,
    fields: Vec<CompiledField>,
    crc_extra: CrcExtra,
    max_payload_size: usize,
    min_payload_size: usize,
}

impl CompiledMessage {
    /// Compiles a message definition.
    ///
    /// Fails if any field type can't be resolved, if array declarations are inconsistent, or if
    /// the resulting payload is empty or exceeds 255 bytes.
    pub fn compile(definition: &MessageDefinition) -> Result<Self, CompileError> {
        let mut base = Vec::new();
        let mut extensions = Vec::new();

        for (index, field) in definition.fields.iter().enumerate() {
            let resolved = resolve_field(&definition.name, index, field)?;
            if resolved.extension {
                extensions.push(resolved);
            } else {
                base.push(resolved);
            }
        }

        let by_wire_order = |a: &FieldDefinition, b: &FieldDefinition| {
            b.wire_type
                .size()
                .cmp(&a.wire_type.size())
                .then(a.index.cmp(&b.index))
        };
        base.sort_by(by_wire_order);
        extensions.sort_by(by_wire_order);

        let crc_extra = compute_crc_extra(&definition.name, &base);

        let mut offset = 0;
        let mut min_payload_size = 0;
        let mut fields = Vec::with_capacity(base.len() + extensions.len());
        for def in base.into_iter().chain(extensions) {
            let codec = FieldCodec::for_definition(&def);
            let size = codec.size();
            if !def.extension {
                min_payload_size = offset + size;
            }
            fields.push(CompiledField {
                definition: def,
                codec,
                offset,
                size,
            });
            offset += size;
        }

        if offset == 0 {
            return Err(CompileError::EmptyPayload {
                message: definition.name.clone(),
                id: definition.id,
            });
        }
        if offset > PAYLOAD_MAX_SIZE {
            return Err(CompileError::PayloadTooLarge {
                message: definition.name.clone(),
                id: definition.id,
                size: offset,
            });
        }

        Ok(Self {
            id: definition.id,
            name: definition.name.clone(),
            fields,
            crc_extra,
            max_payload_size: offset,
            min_payload_size,
        })
    }

    /// Message `ID`.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Message name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in wire order.
    #[inline]
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Field with the specified name.
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Base fields in wire order.
    pub fn base_fields(&self) -> impl Iterator<Item = &CompiledField> {
        self.fields.iter().filter(|f| !f.definition.extension)
    }

    /// Extension fields in wire order.
    pub fn extension_fields(&self) -> impl Iterator<Item = &CompiledField> {
        self.fields.iter().filter(|f| f.definition.extension)
    }

    /// CRC-extra byte folded into the frame checksum.
    #[inline]
    pub fn crc_extra(&self) -> CrcExtra {
        self.crc_extra
    }

    /// Payload size with all extension fields present.
    #[inline]
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Payload size of base fields only.
    #[inline]
    pub fn min_payload_size(&self) -> usize {
        self.min_payload_size
    }
}

impl Display for CompiledMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} #{} crc_extra={} size={}..={}",
            self.name, self.id, self.crc_extra, self.min_payload_size, self.max_payload_size
        )?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        Ok(())
    }
}

fn resolve_field(
    message: &str,
    index: usize,
    field: &FieldDescription,
) -> Result<FieldDefinition, CompileError> {
    let wire_type =
        WireType::resolve(&field.type_name).ok_or_else(|| CompileError::UnknownWireType {
            message: message.to_string(),
            field: field.name.clone(),
            type_name: field.type_name.clone(),
        })?;

    let invalid_array = || CompileError::InvalidArrayLength {
        message: message.to_string(),
        field: field.name.clone(),
        type_name: field.type_name.clone(),
    };

    let declared = match (field.type_name.find('['), field.type_name.find(']')) {
        (Some(open), Some(close)) if close > open + 1 => Some(
            field.type_name[open + 1..close]
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid_array())?,
        ),
        (None, None) => None,
        _ => return Err(invalid_array()),
    };

    let array_length = match (declared, field.array_length) {
        (Some(0), _) => return Err(invalid_array()),
        (Some(len), 0) => len,
        (Some(len), explicit) if len == explicit => len,
        (Some(_), _) => return Err(invalid_array()),
        (None, explicit) => explicit,
    };

    Ok(FieldDefinition {
        index,
        wire_type,
        name: field.name.clone(),
        enum_name: field.enum_name.clone(),
        array_length,
        extension: field.extension,
    })
}

fn compute_crc_extra(name: &str, base_fields: &[FieldDefinition]) -> CrcExtra {
    let mut crc = Crc::new();
    crc.update(name.as_bytes());
    crc.update_byte(b' ');

    for field in base_fields {
        crc.update(field.wire_type.name().as_bytes());
        crc.update_byte(b' ');
        crc.update(field.name.as_bytes());
        crc.update_byte(b' ');
        if field.is_array() {
            crc.update_byte(field.array_length as u8);
        }
    }

    let value = crc.value();
    ((value & 0xFF) ^ (value >> 8)) as CrcExtra
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::sample_dialect;

    fn compile(name: &str) -> CompiledMessage {
        let dialect = sample_dialect();
        let definition = dialect
            .messages
            .iter()
            .find(|m| m.name == name)
            .unwrap();
        CompiledMessage::compile(definition).unwrap()
    }

    #[test]
    fn crc_extra_matches_reference_values() {
        assert_eq!(compile("HEARTBEAT").crc_extra(), 50);
        assert_eq!(compile("SYS_STATUS").crc_extra(), 124);
        assert_eq!(compile("PARAM_VALUE").crc_extra(), 220);
        assert_eq!(compile("STATUSTEXT").crc_extra(), 83);
        assert_eq!(compile("ATTITUDE_QUATERNION_COV").crc_extra(), 167);
    }

    #[test]
    fn fields_are_in_wire_order() {
        let heartbeat = compile("HEARTBEAT");
        let names: Vec<&str> = heartbeat.fields().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            [
                "custom_mode",
                "type",
                "autopilot",
                "base_mode",
                "system_status",
                "mavlink_version"
            ]
        );
        assert_eq!(heartbeat.max_payload_size(), 9);
        assert_eq!(heartbeat.min_payload_size(), 9);
    }

    #[test]
    fn extensions_follow_base_fields() {
        let status_text = compile("STATUSTEXT");
        let names: Vec<&str> = status_text.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["severity", "text", "id", "chunk_seq"]);
        assert_eq!(status_text.min_payload_size(), 51);
        assert_eq!(status_text.max_payload_size(), 54);

        let mut expected_offset = 0;
        for field in status_text.fields() {
            assert_eq!(field.offset, expected_offset);
            expected_offset = field.end();
        }
    }

    #[test]
    fn compile_errors() {
        let unknown = MessageDefinition::new(1000, "BROKEN")
            .field(FieldDescription::new("uint128_t", "value"));
        assert!(matches!(
            CompiledMessage::compile(&unknown),
            Err(CompileError::UnknownWireType { .. })
        ));

        let empty = MessageDefinition::new(1001, "EMPTY");
        assert!(matches!(
            CompiledMessage::compile(&empty),
            Err(CompileError::EmptyPayload { .. })
        ));

        let huge = MessageDefinition::new(1002, "HUGE")
            .field(FieldDescription::new("uint64_t[32]", "values"));
        assert!(matches!(
            CompiledMessage::compile(&huge),
            Err(CompileError::PayloadTooLarge { size: 256, .. })
        ));

        let inconsistent = MessageDefinition::new(1003, "INCONSISTENT")
            .field(FieldDescription::new("char[4]", "name").with_array_length(5));
        assert!(matches!(
            CompiledMessage::compile(&inconsistent),
            Err(CompileError::InvalidArrayLength { .. })
        ));
    }
}
