use std::sync::Arc;

use crate::codec::{Fields, Scalar, Value};
use crate::dialect::{CompiledField, CompiledMessage, FieldCodec, Flag, MessageRegistry};
use crate::errors::{EncodeError, EncodeErrorKind, PayloadError};
use crate::protocol::MessageId;

/// Encodes and decodes message payloads according to compiled layouts.
///
/// Encoding writes base fields in wire order (zero-filled when absent) followed by extension
/// fields up to and including the last one supplied. Trailing extensions that were not supplied
/// are never written, so the payload length depends on which extensions were given.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use mavscope::codec::{Fields, PayloadCodec, Value};
/// use mavscope::dialect::MessageRegistry;
/// # use mavscope::dialect::{DialectDefinition, EnumDefinition, FieldDescription, MessageDefinition};
/// # let dialect = DialectDefinition::new("demo")
/// #     .message(
/// #         MessageDefinition::new(253, "STATUSTEXT")
/// #             .field(FieldDescription::new("uint8_t", "severity").with_enum("MAV_SEVERITY"))
/// #             .field(FieldDescription::new("char[50]", "text"))
/// #             .field(FieldDescription::new("uint16_t", "id").extension())
/// #             .field(FieldDescription::new("uint8_t", "chunk_seq").extension()),
/// #     )
/// #     .enumeration(EnumDefinition::new("MAV_SEVERITY").entry("MAV_SEVERITY_INFO", 6));
///
/// let registry = Arc::new(MessageRegistry::compile(&dialect).unwrap());
/// let codec = PayloadCodec::new(registry);
///
/// let mut fields = Fields::new();
/// fields.insert("severity".into(), Value::from("MAV_SEVERITY_INFO"));
/// fields.insert("text".into(), Value::from("hello"));
///
/// let payload = codec.encode(253, &fields).unwrap();
/// assert_eq!(payload.len(), 51);
///
/// let decoded = codec.decode(253, &payload).unwrap();
/// assert_eq!(decoded["severity"], Value::from(6u8));
/// assert_eq!(decoded["text"], Value::from("hello"));
/// ```
#[derive(Clone, Debug)]
pub struct PayloadCodec {
    registry: Arc<MessageRegistry>,
}

impl PayloadCodec {
    /// Creates codec for a registry.
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self { registry }
    }

    /// Message registry.
    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.registry
    }

    /// Encodes field values into a payload.
    pub fn encode(&self, id: MessageId, fields: &Fields) -> Result<Vec<u8>, PayloadError> {
        let message = self.message(id)?;

        let len = message
            .extension_fields()
            .filter(|f| fields.contains_key(f.name()))
            .map(CompiledField::end)
            .max()
            .unwrap_or(message.min_payload_size());

        if log::log_enabled!(log::Level::Trace) {
            for name in fields.keys().filter(|name| message.field(name).is_none()) {
                log::trace!("[payload] {} has no field '{name}', ignored", message.name());
            }
        }

        let mut payload = vec![0u8; len];
        for field in message.fields().iter().take_while(|f| f.end() <= len) {
            let Some(value) = fields.get(field.name()) else {
                continue;
            };

            let encode_error = |kind: EncodeErrorKind| EncodeError {
                field: field.name().to_string(),
                kind,
            };
            let resolved = self.resolve_enum(field, value).map_err(encode_error)?;
            field
                .codec
                .encode(&resolved, &mut payload[field.offset..field.end()])
                .map_err(encode_error)?;
        }

        Ok(payload)
    }

    /// Decodes a payload into field values.
    ///
    /// Extension fields not covered by the payload are omitted from the result.
    pub fn decode(&self, id: MessageId, payload: &[u8]) -> Result<Fields, PayloadError> {
        let message = self.message(id)?;
        if payload.len() < message.min_payload_size() {
            return Err(PayloadError::TooShort {
                message: message.name().to_string(),
                required: message.min_payload_size(),
                actual: payload.len(),
            });
        }

        Ok(message
            .fields()
            .iter()
            .take_while(|f| f.end() <= payload.len())
            .map(|f| {
                let value = f.codec.decode(&payload[f.offset..f.end()]);
                (f.name().to_string(), value)
            })
            .collect())
    }

    fn message(&self, id: MessageId) -> Result<&CompiledMessage, PayloadError> {
        self.registry
            .message(id)
            .ok_or(PayloadError::UnknownMessage(id))
    }

    /// Turns symbolic enum values into numbers. Values of fields without enums pass unchanged.
    fn resolve_enum(&self, field: &CompiledField, value: &Value) -> Result<Value, EncodeErrorKind> {
        let Some(enum_name) = field.definition.enum_name.as_deref() else {
            return Ok(value.clone());
        };
        let enum_def = || {
            self.registry
                .enum_def(enum_name)
                .ok_or_else(|| EncodeErrorKind::UnknownEnum(enum_name.to_string()))
        };

        match (field.codec, value) {
            (_, Value::Scalar(Scalar::Int(v))) => Ok(Value::Scalar(Scalar::Int(
                enum_def().map(|e| e.by_integer(*v)).unwrap_or(*v),
            ))),
            (FieldCodec::Text { .. }, _) => Ok(value.clone()),
            (_, Value::Scalar(Scalar::String(name))) => {
                Ok(Value::Scalar(Scalar::UInt(enum_def()?.by_name(name)?)))
            }
            (FieldCodec::Scalar(_), Value::Array(items)) => {
                let flags = items
                    .iter()
                    .map(|item| match item {
                        Scalar::String(name) => Ok(Flag::Name(name)),
                        Scalar::UInt(v) => Ok(Flag::Value(*v)),
                        Scalar::Int(v) => u64::try_from(*v).map(Flag::Value).map_err(|_| {
                            EncodeErrorKind::OutOfRange {
                                value: v.to_string(),
                                wire_type: field.codec.wire_type(),
                            }
                        }),
                        other => Err(EncodeErrorKind::TypeMismatch {
                            expected: "flag name or value",
                            found: other.kind(),
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Scalar(Scalar::UInt(enum_def()?.by_bitmask(flags)?)))
            }
            (FieldCodec::Array { .. }, Value::Array(items)) => {
                let enum_def = enum_def()?;
                items
                    .iter()
                    .map(|item| match item {
                        Scalar::String(name) => enum_def.by_name(name).map(Scalar::UInt),
                        other => Ok(other.clone()),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            _ => Ok(value.clone()),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////
