//! # Telemetry pipeline
//!
//! [`TelemetryPipeline`] is the complete data path: raw bytes of a stream go in, a decoded
//! [`ProcessedFrame`] with stream health [`Detection`]s comes out.

use std::time::{Duration, Instant};

use crate::analyzer::{AnalyzerConf, Detection, FrameFailureReason, StreamHealthAnalyzer};
use crate::codec::{Fields, FrameCodec};
use crate::prelude::*;
use crate::protocol::Frame;

/// <sup>[`serde`](https://serde.rs)</sup>
/// Frame decoded by [`TelemetryPipeline`] together with its analysis.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessedFrame {
    /// Message name, if the message is known to the dialect.
    pub name: Option<String>,
    /// Decoded frame.
    pub frame: Frame,
    /// Decoded fields. Empty for invalid frames.
    pub fields: Fields,
    /// Whether the frame passed validation.
    pub valid: bool,
    /// Detections raised by this frame.
    pub detections: Vec<Detection>,
}

/// Frame codec feeding a stream health analyzer.
///
/// Valid frames (outcome `Ok` or `Unsigned`) get their fields decoded and go through the
/// analyzer's validated path. Other frames go through the invalid path with the mapped
/// [`FrameFailureReason`] and carry no fields.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use mavscope::codec::{Fields, FrameCodec, Value};
/// use mavscope::dialect::{DialectDefinition, FieldDescription, MessageDefinition, MessageRegistry};
/// use mavscope::pipeline::TelemetryPipeline;
/// use mavscope::protocol::{Frame, MavLinkVersion};
///
/// let dialect = DialectDefinition::new("demo").message(
///     MessageDefinition::new(42, "PING").field(FieldDescription::new("uint32_t", "counter")),
/// );
/// let codec = FrameCodec::new(Arc::new(MessageRegistry::compile(&dialect).unwrap()));
///
/// let mut bytes = Vec::new();
/// for sequence in [0u8, 3] {
///     let mut frame = Frame::builder()
///         .version(MavLinkVersion::V2)
///         .sequence(sequence)
///         .system_id(1)
///         .build()
///         .unwrap();
///     let mut fields = Fields::new();
///     fields.insert("counter".into(), Value::from(sequence as u32));
///     codec.encode_payload_into_frame(&mut frame, 42, &fields).unwrap();
///     codec.pack_frame(&mut bytes, &mut frame).unwrap();
/// }
///
/// let mut pipeline = TelemetryPipeline::new(codec);
///
/// let first = pipeline.unpack_at("udp", &mut bytes, Duration::from_millis(1)).unwrap().unwrap();
/// assert_eq!(first.name.as_deref(), Some("PING"));
/// assert!(first.detections.is_empty());
///
/// let second = pipeline.unpack_at("udp", &mut bytes, Duration::from_millis(2)).unwrap().unwrap();
/// assert_eq!(second.fields["counter"], Value::from(3u32));
/// assert_eq!(second.detections[0].details, "lost=2");
/// ```
#[derive(Debug)]
pub struct TelemetryPipeline {
    codec: FrameCodec,
    analyzer: StreamHealthAnalyzer,
    origin: Instant,
}

impl TelemetryPipeline {
    /// Creates a pipeline with default analyzer settings.
    pub fn new(codec: FrameCodec) -> Self {
        Self::with_conf(codec, AnalyzerConf::default())
    }

    /// Creates a pipeline with the given analyzer settings.
    pub fn with_conf(codec: FrameCodec, conf: AnalyzerConf) -> Self {
        Self {
            codec,
            analyzer: StreamHealthAnalyzer::new(conf),
            origin: Instant::now(),
        }
    }

    /// Frame codec.
    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Stream health analyzer.
    pub fn analyzer(&self) -> &StreamHealthAnalyzer {
        &self.analyzer
    }

    /// Mutable access to the analyzer, for example to [`sweep`](StreamHealthAnalyzer::sweep).
    pub fn analyzer_mut(&mut self) -> &mut StreamHealthAnalyzer {
        &mut self.analyzer
    }

    /// Time elapsed since the pipeline was created.
    ///
    /// This is the clock used by [`unpack`](Self::unpack).
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Decodes at most one frame from `buffer` and analyzes it at the current time.
    pub fn unpack(
        &mut self,
        stream_id: &str,
        buffer: &mut Vec<u8>,
    ) -> Result<Option<ProcessedFrame>> {
        let now = self.now();
        self.unpack_at(stream_id, buffer, now)
    }

    /// Decodes at most one frame from `buffer` and analyzes it as observed at `now`.
    ///
    /// Returns [`None`] when the buffer holds no complete frame. Fails only when a valid frame
    /// carries a payload its message cannot be decoded from.
    pub fn unpack_at(
        &mut self,
        stream_id: &str,
        buffer: &mut Vec<u8>,
        now: Duration,
    ) -> Result<Option<ProcessedFrame>> {
        let Some(frame) = self.codec.try_unpack_frame(buffer) else {
            return Ok(None);
        };

        let name = self
            .codec
            .registry()
            .message(frame.message_id)
            .map(|message| message.name().to_string());

        let processed = match FrameFailureReason::from_outcome(frame.outcome) {
            None => {
                let fields = self.codec.parse_payload(&frame)?;
                let detections = self.analyzer.on_validated_frame(&frame, stream_id, now);
                ProcessedFrame {
                    name,
                    frame,
                    fields,
                    valid: true,
                    detections,
                }
            }
            Some(reason) => {
                let detections =
                    self.analyzer
                        .on_invalid_frame(frame.system_id, stream_id, now, reason);
                ProcessedFrame {
                    name,
                    frame,
                    fields: Fields::new(),
                    valid: false,
                    detections,
                }
            }
        };

        Ok(Some(processed))
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::DetectionKind;
    use crate::codec::Value;
    use crate::protocol::{MavLinkVersion, Sequence, ValidationOutcome};
    use crate::utils::test::sample_registry;

    fn heartbeat_bytes(codec: &FrameCodec, sequence: Sequence) -> Vec<u8> {
        let mut fields = Fields::new();
        fields.insert("type".into(), Value::from("MAV_TYPE_QUADROTOR"));
        fields.insert("mavlink_version".into(), Value::from(3u8));

        let mut frame = Frame::builder()
            .version(MavLinkVersion::V1)
            .sequence(sequence)
            .system_id(1)
            .component_id(1)
            .build()
            .unwrap();
        codec.encode_payload_into_frame(&mut frame, 0, &fields).unwrap();

        let mut bytes = Vec::new();
        codec.pack_frame(&mut bytes, &mut frame).unwrap();
        bytes
    }

    #[test]
    fn valid_frames_are_decoded_and_analyzed() {
        crate::utils::test::init_logger();
        let mut pipeline = TelemetryPipeline::new(FrameCodec::new(sample_registry()));

        let mut buffer = heartbeat_bytes(pipeline.codec(), 10);
        buffer.extend(heartbeat_bytes(pipeline.codec(), 10));

        let first = pipeline
            .unpack_at("udp", &mut buffer, Duration::from_millis(5))
            .unwrap()
            .unwrap();
        assert!(first.valid);
        assert_eq!(first.name.as_deref(), Some("HEARTBEAT"));
        assert_eq!(first.fields["type"], Value::from(2u8));
        assert!(first.detections.is_empty());

        let second = pipeline
            .unpack_at("udp", &mut buffer, Duration::from_millis(6))
            .unwrap()
            .unwrap();
        assert_eq!(second.detections.len(), 1);
        assert_eq!(second.detections[0].kind, DetectionKind::Duplicate);

        assert!(buffer.is_empty());
        assert!(pipeline.unpack("udp", &mut buffer).unwrap().is_none());
    }

    #[test]
    fn corrupted_frames_go_through_invalid_path() {
        let mut pipeline = TelemetryPipeline::new(FrameCodec::new(sample_registry()));

        let mut buffer = heartbeat_bytes(pipeline.codec(), 1);
        pipeline
            .unpack_at("udp", &mut buffer, Duration::from_secs(1))
            .unwrap();

        let mut corrupted = heartbeat_bytes(pipeline.codec(), 2);
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;

        let processed = pipeline
            .unpack_at("udp", &mut corrupted, Duration::from_secs(2))
            .unwrap()
            .unwrap();
        assert!(!processed.valid);
        assert_eq!(processed.frame.outcome, ValidationOutcome::CrcFailed);
        assert!(processed.fields.is_empty());
        assert_eq!(processed.detections.len(), 1);
        assert_eq!(processed.detections[0].kind, DetectionKind::FrameInvalid);
        assert_eq!(processed.detections[0].details, "CRC_FAILED");

        let snapshot = pipeline.analyzer().snapshot(1).unwrap();
        assert_eq!(snapshot.stats.invalid_frames, 1);
    }
}
