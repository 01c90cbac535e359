use std::time::Duration;

use crate::analyzer::conf::SequenceConf;
use crate::analyzer::context::{Head, SystemContext};
use crate::analyzer::detection::{Detection, DetectionKind, Severity};
use crate::analyzer::fingerprint::fingerprint;
use crate::analyzer::ring::RingEntry;
use crate::consts::{RESET_HEAD_RANGE, RESET_MAX_NEW_SEQUENCE};
use crate::protocol::{Frame, Sequence};

/// Largest forward distance that still counts as progress.
const MAX_FORWARD_DELTA: u8 = 127;

/// Classifies the sequence number of each validated frame against the state of its system.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SequenceProcessor {
    conf: SequenceConf,
}

/// A single validated packet being classified.
struct Observation<'a> {
    sequence: Sequence,
    fingerprint: u32,
    stream_id: &'a str,
    now: Duration,
}

impl SequenceProcessor {
    pub(crate) fn new(conf: SequenceConf) -> Self {
        Self { conf }
    }

    /// Classifies `frame` and updates the context.
    ///
    /// The caller must have registered `stream_id` as a source of the context beforehand.
    pub(crate) fn process(
        &self,
        ctx: &mut SystemContext,
        frame: &Frame,
        stream_id: &str,
        now: Duration,
    ) -> Vec<Detection> {
        let observation = Observation {
            sequence: frame.sequence,
            fingerprint: fingerprint(frame),
            stream_id,
            now,
        };
        let mut detections = Vec::new();

        self.classify(ctx, &observation, &mut detections);

        ctx.ring.put(RingEntry {
            sequence: observation.sequence,
            fingerprint: observation.fingerprint,
            stream_id: stream_id.to_string(),
            last_seen: now,
        });
        self.arbitrate(ctx, &observation, &mut detections);

        detections
    }

    fn classify(&self, ctx: &mut SystemContext, obs: &Observation, out: &mut Vec<Detection>) {
        if let Some(previous) = ctx.ring.get(obs.sequence) {
            let recent = matches!(
                obs.now.checked_sub(previous.last_seen),
                Some(age) if age <= self.conf.duplicate_time_window()
            );
            if recent {
                if previous.fingerprint == obs.fingerprint {
                    self.duplicate(ctx, obs, out);
                } else {
                    let details = format!(
                        "seq={} previousStream={}",
                        obs.sequence, previous.stream_id
                    );
                    out.push(ctx.detection(
                        obs.stream_id,
                        obs.now,
                        DetectionKind::SameSequenceDifferentFingerprint,
                        Severity::Alert,
                        details,
                    ));
                }
                return;
            }
        }

        let head = match ctx.head {
            Some(head) => head,
            None => {
                self.accept(ctx, obs);
                return;
            }
        };

        let delta = obs.sequence.wrapping_sub(head.sequence);
        if delta == 0 {
            self.duplicate(ctx, obs, out);
            return;
        }

        if delta <= MAX_FORWARD_DELTA {
            if delta > 1 {
                let lost = (delta - 1) as u64;
                ctx.stats.gaps += 1;
                ctx.stats.lost_packets += lost;
                out.push(ctx.detection(
                    obs.stream_id,
                    obs.now,
                    DetectionKind::Gap,
                    Severity::Warn,
                    format!("lost={lost}"),
                ));
            }
            self.accept(ctx, obs);
            return;
        }

        let back = head.sequence.wrapping_sub(obs.sequence);
        let since_head = obs.now.checked_sub(head.at);

        let within_distance = back <= self.conf.reorder_distance_window();
        let within_time =
            matches!(since_head, Some(age) if age <= self.conf.reorder_time_window());

        if within_distance && within_time {
            ctx.stats.reorders += 1;
            out.push(ctx.detection(
                obs.stream_id,
                obs.now,
                DetectionKind::Reorder,
                Severity::Info,
                format!("back={back}"),
            ));
            return;
        }

        let severity = if back >= self.conf.suspicious_backward_distance() {
            Severity::Alert
        } else {
            Severity::Warn
        };
        ctx.stats.suspicious_backwards += 1;
        out.push(ctx.detection(
            obs.stream_id,
            obs.now,
            DetectionKind::SuspiciousBackward,
            severity,
            format!("back={back}"),
        ));

        let silent_long_enough = matches!(
            since_head,
            Some(silence) if silence > self.conf.multi_source_active_window()
        );
        if RESET_HEAD_RANGE.contains(&head.sequence)
            && obs.sequence <= RESET_MAX_NEW_SEQUENCE
            && silent_long_enough
        {
            ctx.stats.resets_suspected += 1;
            out.push(ctx.detection(
                obs.stream_id,
                obs.now,
                DetectionKind::ResetSuspected,
                Severity::Warn,
                format!("head={} seq={}", head.sequence, obs.sequence),
            ));
        }
    }

    fn duplicate(&self, ctx: &mut SystemContext, obs: &Observation, out: &mut Vec<Detection>) {
        ctx.stats.duplicates += 1;
        out.push(ctx.detection(
            obs.stream_id,
            obs.now,
            DetectionKind::Duplicate,
            Severity::Info,
            format!("seq={}", obs.sequence),
        ));
    }

    fn accept(&self, ctx: &mut SystemContext, obs: &Observation) {
        ctx.head = Some(Head {
            sequence: obs.sequence,
            at: obs.now,
        });
        if let Some(source) = ctx.sources.get_mut(obs.stream_id) {
            source.last_accepted_sequence = Some(obs.sequence);
        }
    }

    fn arbitrate(&self, ctx: &mut SystemContext, obs: &Observation, out: &mut Vec<Detection>) {
        let window = self.conf.multi_source_active_window();
        let primary = ctx
            .sources
            .values()
            .find(|source| source.primary && source.seen_within(obs.now, window))
            .map(|source| source.stream_id.clone());

        match primary {
            None => {
                for source in ctx.sources.values_mut() {
                    if source.stream_id == obs.stream_id {
                        source.primary = true;
                        source.primary_since = Some(obs.now);
                    } else {
                        source.primary = false;
                        source.primary_since = None;
                    }
                }
            }
            Some(primary) if primary == obs.stream_id => {}
            Some(primary) => {
                ctx.stats.multi_source_active += 1;
                out.push(ctx.detection(
                    obs.stream_id,
                    obs.now,
                    DetectionKind::MultiSourceActive,
                    Severity::Warn,
                    format!("primary={primary}"),
                ));
            }
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MavLinkVersion;

    const MS: Duration = Duration::from_millis(1);

    fn frame(sequence: Sequence, payload: &[u8]) -> Frame {
        Frame::builder()
            .version(MavLinkVersion::V2)
            .sequence(sequence)
            .system_id(1)
            .component_id(1)
            .message_id(0)
            .payload(payload)
            .build()
            .unwrap()
    }

    fn observe(
        ctx: &mut SystemContext,
        processor: &SequenceProcessor,
        sequence: Sequence,
        stream_id: &str,
        now: Duration,
    ) -> Vec<Detection> {
        ctx.on_validated_frame(processor, &frame(sequence, &[sequence]), stream_id, now)
    }

    fn kinds(detections: &[Detection]) -> Vec<DetectionKind> {
        detections.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn forward_progress_and_gaps() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(1);

        assert!(observe(&mut ctx, &processor, 10, "udp", MS).is_empty());
        assert!(observe(&mut ctx, &processor, 11, "udp", 2 * MS).is_empty());

        let detections = observe(&mut ctx, &processor, 14, "udp", 3 * MS);
        assert_eq!(kinds(&detections), [DetectionKind::Gap]);
        assert_eq!(detections[0].details, "lost=2");
        assert_eq!(ctx.head.unwrap().sequence, 14);
        assert_eq!(ctx.stats.lost_packets, 2);
    }

    #[test]
    fn forward_progress_wraps_around() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(1);

        observe(&mut ctx, &processor, 254, "udp", MS);
        assert!(observe(&mut ctx, &processor, 255, "udp", 2 * MS).is_empty());
        assert!(observe(&mut ctx, &processor, 0, "udp", 3 * MS).is_empty());
        assert_eq!(ctx.head.unwrap().sequence, 0);
    }

    #[test]
    fn short_backward_jump_is_reorder() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(1);

        observe(&mut ctx, &processor, 20, "udp", MS);
        let detections = observe(&mut ctx, &processor, 17, "udp", 2 * MS);
        assert_eq!(kinds(&detections), [DetectionKind::Reorder]);
        assert_eq!(detections[0].details, "back=3");
        assert_eq!(detections[0].severity, Severity::Info);
        assert_eq!(ctx.head.unwrap().sequence, 20);
    }

    #[test]
    fn late_backward_jump_is_suspicious() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(1);

        observe(&mut ctx, &processor, 20, "udp", MS);
        let detections = observe(&mut ctx, &processor, 17, "udp", Duration::from_secs(1));
        assert_eq!(kinds(&detections), [DetectionKind::SuspiciousBackward]);
        assert_eq!(detections[0].severity, Severity::Warn);

        let detections = observe(&mut ctx, &processor, 200, "udp", Duration::from_millis(1001));
        assert_eq!(kinds(&detections), [DetectionKind::SuspiciousBackward]);
        assert_eq!(detections[0].details, "back=76");
        assert_eq!(detections[0].severity, Severity::Alert);
    }

    #[test]
    fn restart_after_silence_is_reset() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(1);

        observe(&mut ctx, &processor, 120, "udp", MS);
        let detections = observe(&mut ctx, &processor, 2, "udp", Duration::from_secs(5));
        assert_eq!(
            kinds(&detections),
            [DetectionKind::SuspiciousBackward, DetectionKind::ResetSuspected]
        );
        assert_eq!(detections[1].details, "head=120 seq=2");
        assert_eq!(ctx.stats.resets_suspected, 1);
    }

    #[test]
    fn repeated_sequence_is_compared_by_content() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(1);

        ctx.on_validated_frame(&processor, &frame(5, &[1, 2]), "udp", MS);
        let detections = ctx.on_validated_frame(&processor, &frame(5, &[1, 2]), "udp", 2 * MS);
        assert_eq!(kinds(&detections), [DetectionKind::Duplicate]);
        assert_eq!(detections[0].details, "seq=5");

        let detections = ctx.on_validated_frame(&processor, &frame(5, &[9, 9]), "udp", 3 * MS);
        assert_eq!(
            kinds(&detections),
            [DetectionKind::SameSequenceDifferentFingerprint]
        );
        assert_eq!(detections[0].severity, Severity::Alert);
        assert_eq!(detections[0].details, "seq=5 previousStream=udp");
    }

    #[test]
    fn second_stream_raises_multi_source() {
        let processor = SequenceProcessor::default();
        let mut ctx = SystemContext::new(1);

        observe(&mut ctx, &processor, 1, "udp", MS);
        let detections = observe(&mut ctx, &processor, 2, "serial", 2 * MS);
        assert_eq!(kinds(&detections), [DetectionKind::MultiSourceActive]);
        assert_eq!(detections[0].details, "primary=udp");

        // Primary silent past the window, the other stream takes over.
        let later = Duration::from_secs(5);
        assert!(observe(&mut ctx, &processor, 3, "serial", later).is_empty());
        assert!(ctx.sources["serial"].primary);
        assert!(!ctx.sources["udp"].primary);
    }
}
