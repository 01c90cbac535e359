use std::time::Instant;

use mavscope::codec::{Fields, FrameCodec, Value};
use mavscope::protocol::{Frame, MavLinkVersion};
use mavscope::utils::test::sample_registry;

fn make_stream(codec: &FrameCodec, n_frames: usize) -> Vec<u8> {
    let mut stream = Vec::new();

    for i in 0..n_frames {
        let mut fields = Fields::new();
        fields.insert("severity".into(), Value::from("MAV_SEVERITY_INFO"));
        fields.insert("text".into(), Value::from(format!("status #{i}")));

        let mut frame = Frame::builder()
            .version(MavLinkVersion::V2)
            .sequence(i as u8)
            .system_id(1)
            .component_id(1)
            .build()
            .unwrap();
        codec.encode_payload_into_frame(&mut frame, 253, &fields).unwrap();
        codec.pack_frame(&mut stream, &mut frame).unwrap();

        // Line noise between frames
        stream.extend_from_slice(&[0x00, 0x55, 0xAA]);
    }

    stream
}

/// Scans a noisy byte stream and decodes the payload of every frame.
///
/// Returns the number of decoded frames.
pub fn benchmark_frame_decoding(n_frames: usize, chunk_size: usize) -> usize {
    let codec = FrameCodec::new(sample_registry());
    let stream = make_stream(&codec, n_frames);

    let start = Instant::now();
    let mut buffer = Vec::new();
    let mut decoded = 0;
    for chunk in stream.chunks(chunk_size) {
        buffer.extend_from_slice(chunk);
        while let Some(frame) = codec.try_unpack_frame(&mut buffer) {
            if codec.parse_payload(&frame).is_ok() {
                decoded += 1;
            }
        }
    }
    let duration = start.elapsed();

    log::info!(
        "[benchmark_frame_decoding] {decoded} frames from {} bytes in {chunk_size}-byte chunks: {}s, ({}us per frame)",
        stream.len(),
        duration.as_secs_f32(),
        (duration.as_secs_f64() / n_frames as f64 * 1_000_000.0) as f32
    );

    decoded
}
