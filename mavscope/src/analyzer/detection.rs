use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::protocol::{SystemId, ValidationOutcome};

/// <sup>[`serde`](https://serde.rs)</sup>
/// Anomaly reported by the stream health analyzer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Detection {
    /// System the anomaly was observed for.
    pub system_id: SystemId,
    /// Stream that delivered the offending frame.
    pub stream_id: String,
    /// Time of observation.
    pub at: Duration,
    /// What was detected.
    pub kind: DetectionKind,
    /// How serious it is.
    pub severity: Severity,
    /// Short `key=value` description, for example `lost=2`.
    pub details: String,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Kind of [`Detection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DetectionKind {
    /// The same packet was received again.
    Duplicate,
    /// Sequence numbers were skipped.
    Gap,
    /// A slightly older packet arrived shortly after a newer one.
    Reorder,
    /// The same sequence number was reused with different content.
    SameSequenceDifferentFingerprint,
    /// Sequence jumped backward beyond the reordering window.
    SuspiciousBackward,
    /// The sender looks like it restarted its sequence counter.
    ResetSuspected,
    /// More than one stream delivers packets of the same system.
    MultiSourceActive,
    /// A frame failed validation.
    FrameInvalid,
}

impl DetectionKind {
    /// Stable upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            DetectionKind::Duplicate => "SEQ_DUPLICATE",
            DetectionKind::Gap => "SEQ_GAP",
            DetectionKind::Reorder => "SEQ_REORDER",
            DetectionKind::SameSequenceDifferentFingerprint => {
                "SEQ_SAME_SEQ_DIFFERENT_FINGERPRINT"
            }
            DetectionKind::SuspiciousBackward => "SEQ_SUSPICIOUS_BACKWARDS",
            DetectionKind::ResetSuspected => "SEQ_RESET_SUSPECTED",
            DetectionKind::MultiSourceActive => "SYSTEM_MULTI_SOURCE_ACTIVE",
            DetectionKind::FrameInvalid => "FRAME_INVALID",
        }
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Severity of a [`Detection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Expected on lossy links.
    Info,
    /// Worth attention.
    Warn,
    /// Likely spoofing or misconfiguration.
    Alert,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Why a frame was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameFailureReason {
    /// Checksum mismatch.
    CrcFailed,
    /// Signature mismatch or missing key.
    SignatureFailed,
    /// Both checksum and signature are wrong.
    CrcAndSignatureFailed,
    /// Frame structure is broken.
    Malformed,
    /// Unclassified failure.
    Unknown,
}

impl FrameFailureReason {
    /// Maps a validation outcome to a failure reason. Returns [`None`] for valid outcomes.
    pub fn from_outcome(outcome: ValidationOutcome) -> Option<Self> {
        match outcome {
            ValidationOutcome::Ok | ValidationOutcome::Unsigned => None,
            ValidationOutcome::CrcFailed => Some(FrameFailureReason::CrcFailed),
            ValidationOutcome::SignatureFailed => Some(FrameFailureReason::SignatureFailed),
            ValidationOutcome::CrcAndSignatureFailed => {
                Some(FrameFailureReason::CrcAndSignatureFailed)
            }
            ValidationOutcome::Malformed => Some(FrameFailureReason::Malformed),
            ValidationOutcome::Unknown => Some(FrameFailureReason::Unknown),
        }
    }

    /// Stable upper-case name, used as detection details.
    pub fn name(&self) -> &'static str {
        match self {
            FrameFailureReason::CrcFailed => "CRC_FAILED",
            FrameFailureReason::SignatureFailed => "SIGNATURE_FAILED",
            FrameFailureReason::CrcAndSignatureFailed => "CRC_AND_SIGNATURE_FAILED",
            FrameFailureReason::Malformed => "MALFORMED",
            FrameFailureReason::Unknown => "UNKNOWN",
        }
    }
}

impl Display for Detection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:?}] {} system={} stream={} {}",
            self.severity,
            self.kind.name(),
            self.system_id,
            self.stream_id,
            self.details
        )
    }
}

impl Display for FrameFailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
