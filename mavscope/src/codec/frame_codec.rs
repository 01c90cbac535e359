use std::sync::Arc;

use crate::codec::{Fields, PayloadCodec};
use crate::dialect::MessageRegistry;
use crate::errors::{FrameError, PayloadError};
use crate::prelude::*;
use crate::protocol::{
    ComponentId, Frame, FramePacker, Framer, MavLinkVersion, MessageId, Sequence,
    SigningKeyProvider, SystemId, ValidationOutcome,
};

/// <sup>[`serde`](https://serde.rs)</sup>
/// Frame header with the raw payload, for routing without decoding fields.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameEnvelope {
    /// Protocol version.
    pub version: MavLinkVersion,
    /// Packet sequence number.
    pub sequence: Sequence,
    /// Sender system `ID`.
    pub system_id: SystemId,
    /// Sender component `ID`.
    pub component_id: ComponentId,
    /// Message `ID`.
    pub message_id: MessageId,
    /// Message name, if known to the dialect.
    pub message_name: Option<String>,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Validation result.
    pub outcome: ValidationOutcome,
}

/// Frame and payload codec bound to a single dialect.
///
/// Combines [`Framer`], [`FramePacker`] and [`PayloadCodec`] sharing one registry and one
/// signing key provider.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use mavscope::codec::{FrameCodec, Fields, Value};
/// use mavscope::dialect::MessageRegistry;
/// use mavscope::protocol::{Frame, MavLinkVersion};
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
/// let codec = FrameCodec::new(registry);
///
/// let mut fields = Fields::new();
/// fields.insert("text".into(), Value::from("ready"));
///
/// let mut frame = Frame::builder()
///     .version(MavLinkVersion::V2)
///     .system_id(1)
///     .component_id(1)
///     .build()
///     .unwrap();
/// codec.encode_payload_into_frame(&mut frame, 253, &fields).unwrap();
///
/// let mut bytes = Vec::new();
/// codec.pack_frame(&mut bytes, &mut frame).unwrap();
///
/// let decoded = codec.try_unpack_frame(&mut bytes).unwrap();
/// let fields = codec.parse_payload(&decoded).unwrap();
/// assert_eq!(fields["text"], Value::from("ready"));
/// ```
#[derive(Clone, Debug)]
pub struct FrameCodec {
    framer: Framer,
    packer: FramePacker,
    payloads: PayloadCodec,
}

impl FrameCodec {
    /// Creates codec that neither validates nor produces signatures.
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self {
            framer: Framer::new(registry.clone()),
            packer: FramePacker::new(registry.clone()),
            payloads: PayloadCodec::new(registry),
        }
    }

    /// Sets signing key provider for both validation and packing.
    pub fn with_signing_keys(mut self, keys: Arc<dyn SigningKeyProvider>) -> Self {
        self.framer = self.framer.with_signing_keys(keys.clone());
        self.packer = self.packer.with_signing_keys(keys);
        self
    }

    /// Name of the dialect this codec is bound to.
    pub fn dialect_name(&self) -> &str {
        self.framer.registry().dialect_name()
    }

    /// Message registry.
    pub fn registry(&self) -> &Arc<MessageRegistry> {
        self.framer.registry()
    }

    /// Frame decoder.
    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    /// Payload codec.
    pub fn payloads(&self) -> &PayloadCodec {
        &self.payloads
    }

    /// Decodes at most one frame from `buffer`. See [`Framer::try_decode`].
    pub fn try_unpack_frame(&self, buffer: &mut Vec<u8>) -> Option<Frame> {
        self.framer.try_decode(buffer)
    }

    /// Decodes at most one frame from `buffer` into an envelope.
    pub fn try_unpack_envelope(&self, buffer: &mut Vec<u8>) -> Option<FrameEnvelope> {
        self.framer.try_decode(buffer).map(|frame| FrameEnvelope {
            message_name: self
                .registry()
                .message(frame.message_id)
                .map(|m| m.name().to_string()),
            version: frame.version,
            sequence: frame.sequence,
            system_id: frame.system_id,
            component_id: frame.component_id,
            message_id: frame.message_id,
            payload: frame.payload,
            outcome: frame.outcome,
        })
    }

    /// Appends serialized frame to `out`. See [`FramePacker::pack`].
    pub fn pack_frame(&self, out: &mut Vec<u8>, frame: &mut Frame) -> core::result::Result<usize, FrameError> {
        self.packer.pack(out, frame)
    }

    /// Decodes frame payload into fields.
    pub fn parse_payload(&self, frame: &Frame) -> core::result::Result<Fields, PayloadError> {
        self.payloads.decode(frame.message_id, &frame.payload)
    }

    /// Encodes fields into a payload.
    pub fn encode_payload(&self, id: MessageId, fields: &Fields) -> core::result::Result<Vec<u8>, PayloadError> {
        self.payloads.encode(id, fields)
    }

    /// Encodes fields and stores them as the frame's message `ID` and payload.
    pub fn encode_payload_into_frame(
        &self,
        frame: &mut Frame,
        id: MessageId,
        fields: &Fields,
    ) -> Result<()> {
        frame.payload = self.payloads.encode(id, fields)?;
        frame.message_id = id;
        Ok(())
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////
