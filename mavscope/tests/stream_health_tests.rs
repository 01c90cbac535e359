use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mavscope::analyzer::{
    AnalyzerConf, DetectionKind, Severity, SharedAnalyzer, SweepConf, SweepResult,
};
use mavscope::codec::{Fields, FrameCodec, Value};
use mavscope::dialect::{DialectDefinition, FieldDescription, MessageDefinition, MessageRegistry};
use mavscope::pipeline::TelemetryPipeline;
use mavscope::protocol::{Frame, MavLinkVersion, SystemId};

fn codec() -> FrameCodec {
    let dialect = DialectDefinition::new("integration").message(
        MessageDefinition::new(24, "GPS_RAW_INT_LITE")
            .field(FieldDescription::new("uint64_t", "time_usec"))
            .field(FieldDescription::new("int32_t", "lat"))
            .field(FieldDescription::new("int32_t", "lon"))
            .field(FieldDescription::new("uint8_t", "satellites_visible")),
    );
    FrameCodec::new(Arc::new(MessageRegistry::compile(&dialect).unwrap()))
}

fn packet(codec: &FrameCodec, system_id: SystemId, sequence: u8, time_usec: u64) -> Vec<u8> {
    let mut fields = Fields::new();
    fields.insert("time_usec".into(), Value::from(time_usec));
    fields.insert("lat".into(), Value::from(-353_632_610i32));
    fields.insert("lon".into(), Value::from(1_491_652_300i32));
    fields.insert("satellites_visible".into(), Value::from(12u8));

    let mut frame = Frame::builder()
        .version(MavLinkVersion::V2)
        .sequence(sequence)
        .system_id(system_id)
        .component_id(1)
        .build()
        .unwrap();
    codec.encode_payload_into_frame(&mut frame, 24, &fields).unwrap();

    let mut bytes = Vec::new();
    codec.pack_frame(&mut bytes, &mut frame).unwrap();
    bytes
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[test]
fn lossy_link_reports_gaps_and_reorders() {
    let mut pipeline = TelemetryPipeline::new(codec());
    let mut kinds = Vec::new();

    // 0, 1, 4, 3, 5: two packets lost then one arrives late
    for (step, sequence) in [0u8, 1, 4, 3, 5].into_iter().enumerate() {
        let mut bytes = packet(pipeline.codec(), 1, sequence, sequence as u64 * 1000);
        let processed = pipeline
            .unpack_at("udp", &mut bytes, ms(step as u64 * 20))
            .unwrap()
            .unwrap();
        assert!(processed.valid);
        kinds.extend(processed.detections.iter().map(|d| d.kind));
    }

    assert_eq!(kinds, [DetectionKind::Gap, DetectionKind::Reorder]);

    let snapshot = pipeline.analyzer().snapshot(1).unwrap();
    assert_eq!(snapshot.head_sequence, Some(5));
    assert_eq!(snapshot.stats.gaps, 1);
    assert_eq!(snapshot.stats.lost_packets, 2);
    assert_eq!(snapshot.stats.reorders, 1);
}

#[test]
fn second_link_is_flagged_and_replayed_packets_alert() {
    let mut pipeline = TelemetryPipeline::new(codec());

    let mut radio = packet(pipeline.codec(), 1, 40, 1);
    let first = pipeline.unpack_at("radio", &mut radio, ms(0)).unwrap().unwrap();
    assert!(first.detections.is_empty());

    // Same packet relayed over a second link
    let mut relay = packet(pipeline.codec(), 1, 40, 1);
    let relayed = pipeline.unpack_at("relay", &mut relay, ms(5)).unwrap().unwrap();
    let kinds: Vec<_> = relayed.detections.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        [DetectionKind::Duplicate, DetectionKind::MultiSourceActive]
    );
    assert_eq!(relayed.detections[1].details, "primary=radio");

    // Same sequence, different content
    let mut spoofed = packet(pipeline.codec(), 1, 40, 999);
    let spoofed = pipeline.unpack_at("relay", &mut spoofed, ms(10)).unwrap().unwrap();
    let alert = &spoofed.detections[0];
    assert_eq!(alert.kind, DetectionKind::SameSequenceDifferentFingerprint);
    assert_eq!(alert.severity, Severity::Alert);
    assert_eq!(alert.details, "seq=40 previousStream=relay");

    let snapshot = pipeline.analyzer().snapshot(1).unwrap();
    assert_eq!(snapshot.primary().unwrap().stream_id, "radio");
    assert_eq!(snapshot.stats.multi_source_active, 2);
}

#[test]
fn sweep_forgets_idle_links_and_systems() {
    let conf = AnalyzerConf::builder()
        .sweep(
            SweepConf::builder()
                .source_ttl(Duration::from_secs(5))
                .system_ttl(Duration::from_secs(30))
                .build(),
        )
        .build();
    let mut pipeline = TelemetryPipeline::with_conf(codec(), conf);

    for (system_id, stream_id, at) in [(1, "radio", 0), (1, "relay", 9_000), (2, "radio", 0)] {
        let mut bytes = packet(pipeline.codec(), system_id, 0, 0);
        pipeline.unpack_at(stream_id, &mut bytes, ms(at)).unwrap();
    }

    let result = pipeline.analyzer_mut().sweep(ms(10_000));
    assert_eq!(
        result,
        SweepResult {
            removed_systems: 0,
            removed_sources: 2
        }
    );
    assert_eq!(pipeline.analyzer().len(), 2);

    let result = pipeline.analyzer_mut().sweep(ms(40_000));
    assert_eq!(result.removed_systems, 2);
    assert!(pipeline.analyzer().is_empty());
}

#[test]
fn shared_analyzer_serializes_each_system() {
    let codec = Arc::new(codec());
    let analyzer = SharedAnalyzer::default();

    let handles: Vec<_> = (1..=4u8)
        .map(|system_id| {
            let codec = codec.clone();
            let analyzer = analyzer.clone();
            thread::spawn(move || {
                let mut gaps = 0;
                for step in 0..200u64 {
                    // Every tenth packet is lost
                    if step % 10 == 9 {
                        continue;
                    }
                    let mut bytes = packet(&codec, system_id, step as u8, step);
                    let frame = codec.try_unpack_frame(&mut bytes).unwrap();
                    gaps += analyzer
                        .on_validated_frame(&frame, "udp", ms(step * 10))
                        .iter()
                        .filter(|d| d.kind == DetectionKind::Gap)
                        .count();
                }
                gaps
            })
        })
        .collect();

    for handle in handles {
        // The final loss is never followed by a packet
        assert_eq!(handle.join().unwrap(), 19);
    }
    for snapshot in analyzer.snapshot_all() {
        assert_eq!(snapshot.stats.lost_packets, 19);
        assert_eq!(snapshot.source("udp").unwrap().packet_count, 180);
    }
}
