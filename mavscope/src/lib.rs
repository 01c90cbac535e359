//! # Mavscope
//!
//! A dialect-driven [MAVLink](https://mavlink.io/en/) frame codec with per-system stream health
//! analysis.
//!
//! Mavscope compiles a dialect definition into wire-accurate message layouts, scans unreliable byte
//! streams for `MAVLink 1` and `MAVLink 2` frames, validates checksums and signatures, decodes
//! payloads into named fields and tracks the sequence numbers of every system it hears from.
//! Duplicates, gaps, reordering, spoofed sequence numbers and packets of one system arriving over
//! several links are reported as [`Detection`](analyzer::Detection)s.
//!
//! Mavscope performs no I/O. Callers read bytes from their transports and hand them over together
//! with a stream identifier and an observation time.
//!
//! # Layers
//!
//! * [`dialect`] compiles a [`DialectDefinition`](dialect::DialectDefinition) into an immutable
//!   [`MessageRegistry`](dialect::MessageRegistry).
//! * [`protocol`] frames, validates, signs and packs raw bytes.
//! * [`codec`] translates payloads to and from named [`Fields`](codec::Fields).
//! * [`analyzer`] classifies sequence numbers per system.
//! * [`pipeline`] ties all of the above into a single data path.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mavscope::prelude::*;
//! use mavscope::codec::{Fields, FrameCodec, Value};
//! use mavscope::dialect::{DialectDefinition, FieldDescription, MessageDefinition, MessageRegistry};
//! use mavscope::pipeline::TelemetryPipeline;
//! use mavscope::protocol::{Frame, MavLinkVersion};
//!
//! # fn main() -> Result<()> {
//! let dialect = DialectDefinition::new("demo").message(
//!     MessageDefinition::new(0, "HEARTBEAT")
//!         .field(FieldDescription::new("uint8_t", "type"))
//!         .field(FieldDescription::new("uint8_t", "autopilot"))
//!         .field(FieldDescription::new("uint8_t", "base_mode"))
//!         .field(FieldDescription::new("uint32_t", "custom_mode"))
//!         .field(FieldDescription::new("uint8_t", "system_status"))
//!         .field(FieldDescription::new("uint8_t_mavlink_version", "mavlink_version")),
//! );
//! let codec = FrameCodec::new(Arc::new(MessageRegistry::compile(&dialect)?));
//!
//! let mut fields = Fields::new();
//! fields.insert("type".into(), Value::from(2u8));
//! let mut frame = Frame::builder()
//!     .version(MavLinkVersion::V2)
//!     .system_id(1)
//!     .component_id(1)
//!     .build()?;
//! codec.encode_payload_into_frame(&mut frame, 0, &fields)?;
//!
//! let mut bytes = vec![0x00, 0x42];
//! codec.pack_frame(&mut bytes, &mut frame)?;
//!
//! let mut pipeline = TelemetryPipeline::new(codec);
//! let processed = pipeline
//!     .unpack_at("udp", &mut bytes, Duration::from_secs(1))?
//!     .unwrap();
//!
//! assert!(processed.valid);
//! assert_eq!(processed.fields["type"], Value::from(2u8));
//! assert!(bytes.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! * `serde` derives `Serialize` and `Deserialize` for configuration, dialect definitions,
//!   frames, field values, snapshots and detections.
//! * `test_utils` exposes `utils::test` with a sample dialect. Do not use it in production.

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod analyzer;
pub mod codec;
pub mod consts;
pub mod dialect;
pub mod errors;
pub mod pipeline;
pub mod prelude;
pub mod protocol;
pub mod utils;
