//! # Stream health analysis
//!
//! [`StreamHealthAnalyzer`] follows the sequence numbers of every system it hears from and reports
//! anomalies as [`Detection`]s: duplicates, gaps, reordering, reused sequence numbers with
//! different content, suspicious backward jumps, suspected sender restarts and packets of one
//! system arriving over several streams.
//!
//! The analyzer never reads a clock. Every call receives the observation time as a [`Duration`]
//! measured from an origin chosen by the caller.
//!
//! ```rust
//! use std::time::Duration;
//! use mavscope::analyzer::{DetectionKind, StreamHealthAnalyzer};
//! use mavscope::protocol::{Frame, MavLinkVersion};
//!
//! let mut analyzer = StreamHealthAnalyzer::default();
//! let frame = |sequence| {
//!     Frame::builder()
//!         .version(MavLinkVersion::V2)
//!         .sequence(sequence)
//!         .system_id(1)
//!         .component_id(1)
//!         .message_id(0)
//!         .payload(&[sequence])
//!         .build()
//!         .unwrap()
//! };
//!
//! assert!(analyzer.on_validated_frame(&frame(10), "udp", Duration::from_millis(10)).is_empty());
//!
//! let detections = analyzer.on_validated_frame(&frame(13), "udp", Duration::from_millis(20));
//! assert_eq!(detections[0].kind, DetectionKind::Gap);
//! assert_eq!(detections[0].details, "lost=2");
//! ```
//!
//! Use [`SharedAnalyzer`] to feed frames from several threads.

mod conf;
mod context;
mod detection;
mod fingerprint;
mod ring;
mod sequence;
mod shared;
mod stats;

use std::collections::HashMap;
use std::time::Duration;

pub use conf::{
    AnalyzerConf, AnalyzerConfBuilder, SequenceConf, SequenceConfBuilder, SweepConf,
    SweepConfBuilder,
};
pub use detection::{Detection, DetectionKind, FrameFailureReason, Severity};
pub use shared::SharedAnalyzer;
pub use stats::{SequenceStats, SourceSnapshot, SystemSnapshot};

use crate::protocol::{Frame, SystemId};
use context::SystemContext;
use sequence::SequenceProcessor;

/// <sup>[`serde`](https://serde.rs)</sup>
/// What a [`sweep`](StreamHealthAnalyzer::sweep) removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepResult {
    /// Systems forgotten entirely.
    pub removed_systems: usize,
    /// Streams dropped from systems that remain.
    pub removed_sources: usize,
}

/// Per-system stream health analyzer.
///
/// Systems are created on the first validated frame and live until a [`sweep`](Self::sweep)
/// finds them idle for longer than [`SweepConf::system_ttl`].
#[derive(Clone, Debug, Default)]
pub struct StreamHealthAnalyzer {
    conf: AnalyzerConf,
    processor: SequenceProcessor,
    systems: HashMap<SystemId, SystemContext>,
}

impl StreamHealthAnalyzer {
    /// Creates an analyzer with the given configuration.
    pub fn new(conf: AnalyzerConf) -> Self {
        Self {
            conf,
            processor: SequenceProcessor::new(*conf.sequence()),
            systems: HashMap::new(),
        }
    }

    /// Analyzer configuration.
    pub fn conf(&self) -> &AnalyzerConf {
        &self.conf
    }

    /// Processes a frame that passed validation.
    ///
    /// The first frame of a new system establishes its head sequence and yields no detections.
    pub fn on_validated_frame(
        &mut self,
        frame: &Frame,
        stream_id: &str,
        now: Duration,
    ) -> Vec<Detection> {
        let system_id = frame.system_id;
        let ctx = self.systems.entry(system_id).or_insert_with(|| {
            log::debug!("[analyzer] new system {system_id} on stream '{stream_id}'");
            SystemContext::new(system_id)
        });

        let detections = ctx.on_validated_frame(&self.processor, frame, stream_id, now);
        log_detections(&detections);
        detections
    }

    /// Processes a frame that failed validation.
    ///
    /// Frames of systems that have never delivered a valid frame are ignored, since their
    /// system `ID` cannot be trusted.
    pub fn on_invalid_frame(
        &mut self,
        system_id: SystemId,
        stream_id: &str,
        now: Duration,
        reason: FrameFailureReason,
    ) -> Vec<Detection> {
        let Some(ctx) = self.systems.get_mut(&system_id) else {
            log::trace!("[analyzer] ignoring {reason} for unknown system {system_id}");
            return Vec::new();
        };

        let detections = vec![ctx.on_invalid_frame(stream_id, now, reason)];
        log_detections(&detections);
        detections
    }

    /// Drops idle streams and systems.
    pub fn sweep(&mut self, now: Duration) -> SweepResult {
        let sweep = self.conf.sweep();
        let sequence = self.conf.sequence();
        let mut result = SweepResult::default();

        self.systems.retain(|system_id, ctx| {
            result.removed_sources += ctx.sweep(now, sweep, sequence);
            if ctx.is_expired(now, sweep) {
                log::debug!("[analyzer] system {system_id} expired");
                result.removed_systems += 1;
                false
            } else {
                true
            }
        });

        if result != SweepResult::default() {
            log::debug!(
                "[analyzer] sweep removed {} systems and {} sources",
                result.removed_systems,
                result.removed_sources
            );
        }
        result
    }

    /// Snapshot of a single system.
    pub fn snapshot(&self, system_id: SystemId) -> Option<SystemSnapshot> {
        self.systems.get(&system_id).map(SystemContext::snapshot)
    }

    /// Snapshots of all known systems ordered by system `ID`.
    pub fn snapshot_all(&self) -> Vec<SystemSnapshot> {
        let mut snapshots: Vec<_> = self.systems.values().map(SystemContext::snapshot).collect();
        snapshots.sort_by_key(|s| s.system_id);
        snapshots
    }

    /// Number of tracked systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether no system is tracked.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

pub(crate) fn log_detections(detections: &[Detection]) {
    for detection in detections.iter().filter(|d| d.severity > Severity::Info) {
        log::debug!("[analyzer] {detection}");
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////
