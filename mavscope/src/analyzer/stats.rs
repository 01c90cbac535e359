use std::time::Duration;

use crate::protocol::{Sequence, SystemId};

/// <sup>[`serde`](https://serde.rs)</sup>
/// Anomaly counters of a single system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceStats {
    /// Duplicate packets.
    pub duplicates: u64,
    /// Forward jumps that skipped sequence numbers.
    pub gaps: u64,
    /// Total number of skipped sequence numbers.
    pub lost_packets: u64,
    /// Benign reorderings.
    pub reorders: u64,
    /// Backward jumps outside the reordering window.
    pub suspicious_backwards: u64,
    /// Suspected sender restarts.
    pub resets_suspected: u64,
    /// Frames that failed validation.
    pub invalid_frames: u64,
    /// Packets received from a stream other than the active primary.
    pub multi_source_active: u64,
}

/// Per-stream bookkeeping within a system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SourceStats {
    pub(crate) stream_id: String,
    pub(crate) last_seen: Duration,
    pub(crate) packet_count: u64,
    pub(crate) invalid_count: u64,
    pub(crate) primary: bool,
    pub(crate) primary_since: Option<Duration>,
    pub(crate) last_accepted_sequence: Option<Sequence>,
}

impl SourceStats {
    pub(crate) fn new(stream_id: &str, now: Duration) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            last_seen: now,
            packet_count: 0,
            invalid_count: 0,
            primary: false,
            primary_since: None,
            last_accepted_sequence: None,
        }
    }

    /// Whether the stream was seen within `window` before `now`.
    ///
    /// Observations stamped after `now` are not considered recent.
    pub(crate) fn seen_within(&self, now: Duration, window: Duration) -> bool {
        matches!(now.checked_sub(self.last_seen), Some(age) if age <= window)
    }

    pub(crate) fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            stream_id: self.stream_id.clone(),
            last_seen: self.last_seen,
            packet_count: self.packet_count,
            invalid_count: self.invalid_count,
            primary: self.primary,
            primary_since: self.primary_since,
            last_accepted_sequence: self.last_accepted_sequence,
        }
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Read-only view of a stream delivering packets of a system.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceSnapshot {
    /// Stream identifier.
    pub stream_id: String,
    /// Last time the stream delivered anything.
    pub last_seen: Duration,
    /// Valid packets received.
    pub packet_count: u64,
    /// Invalid frames received.
    pub invalid_count: u64,
    /// Whether the stream is the system's primary.
    pub primary: bool,
    /// Since when the stream has been primary.
    pub primary_since: Option<Duration>,
    /// Last sequence that advanced the head via this stream.
    pub last_accepted_sequence: Option<Sequence>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Read-only view of a system's analysis state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemSnapshot {
    /// System `ID`.
    pub system_id: SystemId,
    /// Whether a head sequence has been established.
    pub initialized: bool,
    /// Highest accepted sequence.
    pub head_sequence: Option<Sequence>,
    /// When the head was last advanced.
    pub head_at: Option<Duration>,
    /// Last time any frame for this system was observed.
    pub last_activity: Duration,
    /// Anomaly counters.
    pub stats: SequenceStats,
    /// Known streams ordered by identifier.
    pub sources: Vec<SourceSnapshot>,
}

impl SystemSnapshot {
    /// Snapshot of the stream with the given identifier.
    pub fn source(&self, stream_id: &str) -> Option<&SourceSnapshot> {
        self.sources.iter().find(|s| s.stream_id == stream_id)
    }

    /// Current primary stream, if any.
    pub fn primary(&self) -> Option<&SourceSnapshot> {
        self.sources.iter().find(|s| s.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_within_ignores_future_observations() {
        let source = SourceStats::new("udp", Duration::from_secs(10));
        let window = Duration::from_secs(2);

        assert!(source.seen_within(Duration::from_secs(12), window));
        assert!(!source.seen_within(Duration::from_millis(12_001), window));
        assert!(!source.seen_within(Duration::from_secs(9), window));
    }
}
