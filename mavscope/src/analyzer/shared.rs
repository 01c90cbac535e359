use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use crate::analyzer::conf::AnalyzerConf;
use crate::analyzer::context::SystemContext;
use crate::analyzer::detection::{Detection, FrameFailureReason};
use crate::analyzer::sequence::SequenceProcessor;
use crate::analyzer::stats::SystemSnapshot;
use crate::analyzer::{log_detections, SweepResult};
use crate::protocol::{Frame, SystemId};

type Contexts = HashMap<SystemId, Arc<Mutex<SystemContext>>>;

/// Thread-safe [`StreamHealthAnalyzer`](crate::analyzer::StreamHealthAnalyzer).
///
/// Frames of different systems are processed in parallel. Frames of the same system are
/// serialized by a per-system lock. The analyzer is cheap to clone and clones share state.
///
/// ```rust
/// use std::thread;
/// use std::time::Duration;
/// use mavscope::analyzer::SharedAnalyzer;
/// use mavscope::protocol::{Frame, MavLinkVersion};
///
/// let analyzer = SharedAnalyzer::default();
///
/// let handles: Vec<_> = (1..=4u8)
///     .map(|system_id| {
///         let analyzer = analyzer.clone();
///         thread::spawn(move || {
///             for sequence in 0..100u8 {
///                 let frame = Frame::builder()
///                     .version(MavLinkVersion::V2)
///                     .sequence(sequence)
///                     .system_id(system_id)
///                     .message_id(0)
///                     .payload(&[sequence])
///                     .build()
///                     .unwrap();
///                 let now = Duration::from_millis(sequence as u64);
///                 assert!(analyzer.on_validated_frame(&frame, "udp", now).is_empty());
///             }
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(analyzer.len(), 4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SharedAnalyzer {
    conf: AnalyzerConf,
    processor: SequenceProcessor,
    systems: Arc<RwLock<Contexts>>,
}

impl SharedAnalyzer {
    /// Creates an analyzer with the given configuration.
    pub fn new(conf: AnalyzerConf) -> Self {
        Self {
            conf,
            processor: SequenceProcessor::new(*conf.sequence()),
            systems: Default::default(),
        }
    }

    /// Analyzer configuration.
    pub fn conf(&self) -> &AnalyzerConf {
        &self.conf
    }

    /// Processes a frame that passed validation.
    ///
    /// See [`StreamHealthAnalyzer::on_validated_frame`](crate::analyzer::StreamHealthAnalyzer::on_validated_frame).
    pub fn on_validated_frame(
        &self,
        frame: &Frame,
        stream_id: &str,
        now: Duration,
    ) -> Vec<Detection> {
        let detections = self
            .with_context(frame.system_id, true, |ctx| {
                ctx.on_validated_frame(&self.processor, frame, stream_id, now)
            })
            .unwrap_or_default();
        log_detections(&detections);
        detections
    }

    /// Processes a frame that failed validation.
    ///
    /// See [`StreamHealthAnalyzer::on_invalid_frame`](crate::analyzer::StreamHealthAnalyzer::on_invalid_frame).
    pub fn on_invalid_frame(
        &self,
        system_id: SystemId,
        stream_id: &str,
        now: Duration,
        reason: FrameFailureReason,
    ) -> Vec<Detection> {
        let detections = self
            .with_context(system_id, false, |ctx| {
                vec![ctx.on_invalid_frame(stream_id, now, reason)]
            })
            .unwrap_or_default();
        log_detections(&detections);
        detections
    }

    /// Drops idle streams and systems.
    pub fn sweep(&self, now: Duration) -> SweepResult {
        let mut result = SweepResult::default();
        let mut systems = match self.systems.write() {
            Ok(systems) => systems,
            Err(err) => {
                log::error!("[analyzer] poisoned system map: {err:?}");
                return result;
            }
        };

        let sweep = self.conf.sweep();
        let sequence = self.conf.sequence();
        systems.retain(|system_id, context| {
            let Some(mut ctx) = lock_context(context) else {
                return true;
            };
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
        self.with_context(system_id, false, |ctx| ctx.snapshot())
    }

    /// Snapshots of all known systems ordered by system `ID`.
    pub fn snapshot_all(&self) -> Vec<SystemSnapshot> {
        let contexts: Vec<_> = match self.systems.read() {
            Ok(systems) => systems.values().cloned().collect(),
            Err(err) => {
                log::error!("[analyzer] poisoned system map: {err:?}");
                return Vec::new();
            }
        };

        let mut snapshots: Vec<_> = contexts
            .iter()
            .filter_map(|context| lock_context(context).map(|ctx| ctx.snapshot()))
            .collect();
        snapshots.sort_by_key(|s| s.system_id);
        snapshots
    }

    /// Number of tracked systems.
    pub fn len(&self) -> usize {
        self.systems.read().map(|systems| systems.len()).unwrap_or(0)
    }

    /// Whether no system is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` on the context of a system while the system map stays locked.
    ///
    /// Holding the map guard keeps [`sweep`](Self::sweep) from dropping the context while `f`
    /// runs. Missing contexts are created only when `create` is set.
    fn with_context<T>(
        &self,
        system_id: SystemId,
        create: bool,
        f: impl FnOnce(&mut SystemContext) -> T,
    ) -> Option<T> {
        {
            let systems = match self.systems.read() {
                Ok(systems) => systems,
                Err(err) => {
                    log::error!("[analyzer] poisoned system map: {err:?}");
                    return None;
                }
            };
            if let Some(context) = systems.get(&system_id) {
                let mut ctx = lock_context(context)?;
                return Some(f(&mut ctx));
            }
        }

        if !create {
            return None;
        }

        let mut systems = match self.systems.write() {
            Ok(systems) => systems,
            Err(err) => {
                log::error!("[analyzer] poisoned system map: {err:?}");
                return None;
            }
        };
        let context = systems.entry(system_id).or_insert_with(|| {
            log::debug!("[analyzer] new system {system_id}");
            Arc::new(Mutex::new(SystemContext::new(system_id)))
        });
        let mut ctx = lock_context(context)?;
        Some(f(&mut ctx))
    }
}

fn lock_context(context: &Mutex<SystemContext>) -> Option<MutexGuard<'_, SystemContext>> {
    match context.lock() {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            log::error!("[analyzer] poisoned system context: {err:?}");
            None
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////
