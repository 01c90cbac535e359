use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::consts::MESSAGE_ID_V2_MAX;
use crate::dialect::{CompiledMessage, DialectDefinition, EnumDefinition};
use crate::errors::CompileError;
use crate::protocol::{CrcExtra, MavLinkVersion, MessageId};

/// Immutable set of compiled messages and enums of a single dialect.
///
/// The registry is built once by [`MessageRegistry::compile`] and never changes afterwards, so
/// it can be freely shared between threads behind an [`Arc`](std::sync::Arc).
///
/// # Examples
///
/// ```rust
/// use mavscope::dialect::{DialectDefinition, FieldDescription, MessageDefinition, MessageRegistry};
///
/// let dialect = DialectDefinition::new("minimal").message(
///     MessageDefinition::new(0, "HEARTBEAT")
///         .field(FieldDescription::new("uint8_t", "type"))
///         .field(FieldDescription::new("uint8_t", "autopilot"))
///         .field(FieldDescription::new("uint8_t", "base_mode"))
///         .field(FieldDescription::new("uint32_t", "custom_mode"))
///         .field(FieldDescription::new("uint8_t", "system_status"))
///         .field(FieldDescription::new("uint8_t_mavlink_version", "mavlink_version")),
/// );
///
/// let registry = MessageRegistry::compile(&dialect).unwrap();
/// assert_eq!(registry.crc_extra(0), Some(50));
/// ```
#[derive(Clone, Debug)]
pub struct MessageRegistry {
    dialect_name: String,
    messages: HashMap<MessageId, CompiledMessage>,
    names: HashMap<String, MessageId>,
    enums: HashMap<String, EnumDefinition>,
}

impl MessageRegistry {
    /// Compiles all messages of a dialect definition.
    ///
    /// Any failure is fatal for the whole dialect.
    pub fn compile(dialect: &DialectDefinition) -> Result<Self, CompileError> {
        let mut messages: HashMap<MessageId, CompiledMessage> =
            HashMap::with_capacity(dialect.messages.len());
        let mut names = HashMap::with_capacity(dialect.messages.len());

        for definition in &dialect.messages {
            if definition.id > MESSAGE_ID_V2_MAX {
                return Err(CompileError::MessageIdOutOfRange {
                    message: definition.name.clone(),
                    id: definition.id,
                });
            }
            if let Some(existing) = messages.get(&definition.id) {
                return Err(CompileError::DuplicateMessageId {
                    id: definition.id,
                    first: existing.name().to_string(),
                    second: definition.name.clone(),
                });
            }

            let message = CompiledMessage::compile(definition)?;
            log::trace!(
                "[registry:{}] compiled {} #{} (crc_extra={})",
                dialect.name,
                message.name(),
                message.id(),
                message.crc_extra()
            );
            names.insert(message.name().to_string(), message.id());
            messages.insert(message.id(), message);
        }

        let enums = dialect
            .enums
            .iter()
            .map(|e| (e.name.clone(), e.clone()))
            .collect::<HashMap<_, _>>();

        log::debug!(
            "[registry:{}] compiled {} messages and {} enums",
            dialect.name,
            messages.len(),
            enums.len()
        );

        Ok(Self {
            dialect_name: dialect.name.clone(),
            messages,
            names,
            enums,
        })
    }

    /// Name of the compiled dialect.
    #[inline]
    pub fn dialect_name(&self) -> &str {
        &self.dialect_name
    }

    /// Compiled message by `ID`.
    #[inline]
    pub fn message(&self, id: MessageId) -> Option<&CompiledMessage> {
        self.messages.get(&id)
    }

    /// Compiled message by name.
    pub fn message_by_name(&self, name: &str) -> Option<&CompiledMessage> {
        self.names.get(name).and_then(|id| self.messages.get(id))
    }

    /// All compiled messages ordered by `ID`.
    pub fn messages(&self) -> Vec<&CompiledMessage> {
        let mut messages: Vec<&CompiledMessage> = self.messages.values().collect();
        messages.sort_by_key(|m| m.id());
        messages
    }

    /// Number of compiled messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the registry contains no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Enum definition by name.
    #[inline]
    pub fn enum_def(&self, name: &str) -> Option<&EnumDefinition> {
        self.enums.get(name)
    }

    /// CRC-extra byte of a message.
    #[inline]
    pub fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        self.messages.get(&id).map(CompiledMessage::crc_extra)
    }

    /// Smallest payload a frame of the specified version must carry for this message.
    ///
    /// `MAVLink 1` has no extensions and no payload truncation, so the full size is required.
    /// `MAVLink 2` frames may omit extension fields. Returns [`None`] for unknown messages.
    pub fn min_payload_size(&self, version: MavLinkVersion, id: MessageId) -> Option<usize> {
        self.messages.get(&id).map(|m| match version {
            MavLinkVersion::V1 => m.max_payload_size(),
            MavLinkVersion::V2 => m.min_payload_size(),
        })
    }
}

impl Display for MessageRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "dialect '{}': {} messages, {} enums",
            self.dialect_name,
            self.messages.len(),
            self.enums.len()
        )?;
        for message in self.messages() {
            message.fmt(f)?;
        }
        Ok(())
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{FieldDescription, MessageDefinition};
    use crate::utils::test::sample_dialect;

    #[test]
    fn lookups() {
        let registry = MessageRegistry::compile(&sample_dialect()).unwrap();

        assert_eq!(registry.dialect_name(), "sample");
        assert_eq!(registry.message_by_name("STATUSTEXT").unwrap().id(), 253);
        assert!(registry.message(9999).is_none());
        assert!(registry.enum_def("MAV_MODE_FLAG").unwrap().bitmask);

        let ids: Vec<MessageId> = registry.messages().iter().map(|m| m.id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        assert_eq!(registry.min_payload_size(MavLinkVersion::V1, 1), Some(43));
        assert_eq!(registry.min_payload_size(MavLinkVersion::V2, 1), Some(31));
        assert_eq!(registry.min_payload_size(MavLinkVersion::V2, 9999), None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let dialect = sample_dialect().message(
            MessageDefinition::new(0, "HEARTBEAT_COPY")
                .field(FieldDescription::new("uint8_t", "value")),
        );
        assert!(matches!(
            MessageRegistry::compile(&dialect),
            Err(CompileError::DuplicateMessageId { id: 0, .. })
        ));
    }

    #[test]
    fn wide_ids_are_rejected() {
        let dialect = DialectDefinition::new("wide").message(
            MessageDefinition::new(1 << 24, "TOO_WIDE")
                .field(FieldDescription::new("uint8_t", "value")),
        );
        assert!(matches!(
            MessageRegistry::compile(&dialect),
            Err(CompileError::MessageIdOutOfRange { .. })
        ));
    }
}
