use std::thread;
use std::time::{Duration, Instant};

use mavscope::analyzer::SharedAnalyzer;
use mavscope::protocol::{Frame, MavLinkVersion};

/// Feeds a [`SharedAnalyzer`] from `n_threads` threads, one system per thread.
///
/// Returns the total number of detections.
pub fn benchmark_shared_analyzer(n_threads: u8, n_frames: usize) -> usize {
    let analyzer = SharedAnalyzer::default();

    let start = Instant::now();
    let handles: Vec<_> = (0..n_threads)
        .map(|system_id| {
            let analyzer = analyzer.clone();
            thread::spawn(move || {
                let mut detections = 0;
                for i in 0..n_frames {
                    let frame = Frame::builder()
                        .version(MavLinkVersion::V2)
                        .sequence(i as u8)
                        .system_id(system_id)
                        .component_id(1)
                        .message_id(0)
                        .payload(&(i as u32).to_le_bytes())
                        .build()
                        .unwrap();
                    let now = Duration::from_millis(i as u64 * 10);
                    detections += analyzer.on_validated_frame(&frame, "udp", now).len();
                }
                detections
            })
        })
        .collect();

    let detections = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .sum();
    let duration = start.elapsed();

    log::info!(
        "[benchmark_shared_analyzer] {n_frames} frames for each of {n_threads} systems: {}s, ({}us per frame)",
        duration.as_secs_f32(),
        (duration.as_secs_f64() / (n_frames * n_threads as usize) as f64 * 1_000_000.0) as f32
    );

    detections
}
