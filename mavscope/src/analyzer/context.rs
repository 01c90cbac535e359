use std::collections::HashMap;
use std::time::Duration;

use crate::analyzer::conf::{SequenceConf, SweepConf};
use crate::analyzer::detection::{Detection, DetectionKind, FrameFailureReason, Severity};
use crate::analyzer::ring::SequenceRing;
use crate::analyzer::sequence::SequenceProcessor;
use crate::analyzer::stats::{SequenceStats, SourceStats, SystemSnapshot};
use crate::protocol::{Frame, Sequence, SystemId};

/// Highest accepted sequence of a system and when it was accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Head {
    pub(crate) sequence: Sequence,
    pub(crate) at: Duration,
}

/// Analysis state of a single system.
#[derive(Clone, Debug)]
pub(crate) struct SystemContext {
    pub(crate) system_id: SystemId,
    pub(crate) head: Option<Head>,
    pub(crate) last_activity: Duration,
    pub(crate) ring: SequenceRing,
    pub(crate) sources: HashMap<String, SourceStats>,
    pub(crate) stats: SequenceStats,
}

impl SystemContext {
    pub(crate) fn new(system_id: SystemId) -> Self {
        Self {
            system_id,
            head: None,
            last_activity: Duration::ZERO,
            ring: SequenceRing::new(),
            sources: HashMap::new(),
            stats: SequenceStats::default(),
        }
    }

    pub(crate) fn on_validated_frame(
        &mut self,
        processor: &SequenceProcessor,
        frame: &Frame,
        stream_id: &str,
        now: Duration,
    ) -> Vec<Detection> {
        self.last_activity = now;

        let source = self.source_mut(stream_id, now);
        source.last_seen = now;
        source.packet_count += 1;

        processor.process(self, frame, stream_id, now)
    }

    pub(crate) fn on_invalid_frame(
        &mut self,
        stream_id: &str,
        now: Duration,
        reason: FrameFailureReason,
    ) -> Detection {
        self.last_activity = now;

        let source = self.source_mut(stream_id, now);
        source.last_seen = now;
        source.invalid_count += 1;

        self.stats.invalid_frames += 1;
        self.detection(
            stream_id,
            now,
            DetectionKind::FrameInvalid,
            Severity::Warn,
            reason.name().to_string(),
        )
    }

    /// Drops streams idle past the source TTL and clears a primary flag that went stale.
    ///
    /// Returns the number of removed streams.
    pub(crate) fn sweep(&mut self, now: Duration, sweep: &SweepConf, seq: &SequenceConf) -> usize {
        let before = self.sources.len();
        self.sources.retain(|_, source| {
            !matches!(now.checked_sub(source.last_seen), Some(age) if age > sweep.source_ttl())
        });
        let removed = before - self.sources.len();

        let window = seq.multi_source_active_window();
        let has_active_primary = self
            .sources
            .values()
            .any(|source| source.primary && source.seen_within(now, window));
        if !has_active_primary {
            for source in self.sources.values_mut() {
                source.primary = false;
                source.primary_since = None;
            }
        }

        removed
    }

    pub(crate) fn is_expired(&self, now: Duration, sweep: &SweepConf) -> bool {
        matches!(now.checked_sub(self.last_activity), Some(age) if age > sweep.system_ttl())
    }

    pub(crate) fn snapshot(&self) -> SystemSnapshot {
        let mut sources: Vec<_> = self.sources.values().map(SourceStats::snapshot).collect();
        sources.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));

        SystemSnapshot {
            system_id: self.system_id,
            initialized: self.head.is_some(),
            head_sequence: self.head.map(|head| head.sequence),
            head_at: self.head.map(|head| head.at),
            last_activity: self.last_activity,
            stats: self.stats,
            sources,
        }
    }

    pub(crate) fn detection(
        &self,
        stream_id: &str,
        at: Duration,
        kind: DetectionKind,
        severity: Severity,
        details: String,
    ) -> Detection {
        Detection {
            system_id: self.system_id,
            stream_id: stream_id.to_string(),
            at,
            kind,
            severity,
            details,
        }
    }

    fn source_mut(&mut self, stream_id: &str, now: Duration) -> &mut SourceStats {
        self.sources
            .entry(stream_id.to_string())
            .or_insert_with(|| SourceStats::new(stream_id, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MavLinkVersion;

    fn heartbeat(sequence: Sequence) -> Frame {
        Frame::builder()
            .version(MavLinkVersion::V1)
            .sequence(sequence)
            .system_id(7)
            .component_id(1)
            .message_id(0)
            .payload(&[0; 9])
            .build()
            .unwrap()
    }

    #[test]
    fn invalid_frame_updates_counters() {
        let mut ctx = SystemContext::new(7);
        let now = Duration::from_secs(3);

        let detection = ctx.on_invalid_frame("udp", now, FrameFailureReason::CrcFailed);
        assert_eq!(detection.kind, DetectionKind::FrameInvalid);
        assert_eq!(detection.details, "CRC_FAILED");
        assert_eq!(ctx.stats.invalid_frames, 1);
        assert_eq!(ctx.sources["udp"].invalid_count, 1);
        assert_eq!(ctx.last_activity, now);
        assert!(ctx.head.is_none());
    }

    #[test]
    fn sweep_drops_stale_sources_and_primary() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(7);

        ctx.on_validated_frame(&processor, &heartbeat(1), "udp", Duration::from_secs(1));
        ctx.on_validated_frame(&processor, &heartbeat(2), "serial", Duration::from_secs(50));

        let sweep = SweepConf::default();
        let seq = SequenceConf::default();

        let removed = ctx.sweep(Duration::from_secs(62), &sweep, &seq);
        assert_eq!(removed, 1);
        assert!(!ctx.sources.contains_key("udp"));
        assert!(!ctx.sources["serial"].primary);
        assert!(!ctx.is_expired(Duration::from_secs(62), &sweep));
        assert!(ctx.is_expired(Duration::from_secs(651), &sweep));
    }

    #[test]
    fn snapshot_reports_head_and_sources() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(7);
        ctx.on_validated_frame(&processor, &heartbeat(42), "udp", Duration::from_secs(1));

        let snapshot = ctx.snapshot();
        assert!(snapshot.initialized);
        assert_eq!(snapshot.head_sequence, Some(42));
        assert_eq!(snapshot.head_at, Some(Duration::from_secs(1)));

        let udp = snapshot.source("udp").unwrap();
        assert_eq!(udp.packet_count, 1);
        assert_eq!(udp.last_accepted_sequence, Some(42));
        assert!(udp.primary);
        assert_eq!(snapshot.primary().unwrap().stream_id, "udp");
    }
}
