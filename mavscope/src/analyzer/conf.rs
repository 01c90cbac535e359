//! Stream health analyzer configuration.

use std::time::Duration;

use crate::consts::{
    DEFAULT_DUPLICATE_TIME_WINDOW, DEFAULT_MULTI_SOURCE_ACTIVE_WINDOW,
    DEFAULT_REORDER_DISTANCE_WINDOW, DEFAULT_REORDER_TIME_WINDOW,
    DEFAULT_SUSPICIOUS_BACKWARD_DISTANCE, DEFAULT_SOURCE_TTL, DEFAULT_SYSTEM_TTL,
};

/// <sup>[`serde`](https://serde.rs)</sup>
/// Sequence classification settings.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use mavscope::analyzer::SequenceConf;
///
/// let conf = SequenceConf::builder()
///     .reorder_distance_window(8)
///     .duplicate_time_window(Duration::from_millis(250))
///     .build();
///
/// assert_eq!(conf.reorder_distance_window(), 8);
/// assert_eq!(conf.suspicious_backward_distance(), 64);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceConf {
    reorder_distance_window: u8,
    reorder_time_window: Duration,
    duplicate_time_window: Duration,
    suspicious_backward_distance: u8,
    multi_source_active_window: Duration,
}

impl Default for SequenceConf {
    fn default() -> Self {
        Self {
            reorder_distance_window: DEFAULT_REORDER_DISTANCE_WINDOW,
            reorder_time_window: DEFAULT_REORDER_TIME_WINDOW,
            duplicate_time_window: DEFAULT_DUPLICATE_TIME_WINDOW,
            suspicious_backward_distance: DEFAULT_SUSPICIOUS_BACKWARD_DISTANCE,
            multi_source_active_window: DEFAULT_MULTI_SOURCE_ACTIVE_WINDOW,
        }
    }
}

impl SequenceConf {
    /// Creates a [`SequenceConfBuilder`] populated with defaults.
    pub fn builder() -> SequenceConfBuilder {
        SequenceConfBuilder {
            conf: Self::default(),
        }
    }

    /// Largest backward jump still treated as benign reordering.
    ///
    /// Default is [`DEFAULT_REORDER_DISTANCE_WINDOW`].
    #[inline]
    pub fn reorder_distance_window(&self) -> u8 {
        self.reorder_distance_window
    }

    /// Time since the head within which a short backward jump is reordering.
    ///
    /// Default is [`DEFAULT_REORDER_TIME_WINDOW`].
    #[inline]
    pub fn reorder_time_window(&self) -> Duration {
        self.reorder_time_window
    }

    /// Time within which a repeated sequence is compared against the previous packet.
    ///
    /// Default is [`DEFAULT_DUPLICATE_TIME_WINDOW`].
    #[inline]
    pub fn duplicate_time_window(&self) -> Duration {
        self.duplicate_time_window
    }

    /// Backward distance from which suspicious jumps are raised as alerts.
    ///
    /// Default is [`DEFAULT_SUSPICIOUS_BACKWARD_DISTANCE`].
    #[inline]
    pub fn suspicious_backward_distance(&self) -> u8 {
        self.suspicious_backward_distance
    }

    /// Window during which a primary stream stays active without new packets.
    ///
    /// Default is [`DEFAULT_MULTI_SOURCE_ACTIVE_WINDOW`].
    #[inline]
    pub fn multi_source_active_window(&self) -> Duration {
        self.multi_source_active_window
    }
}

/// Builder for [`SequenceConf`].
#[derive(Clone, Debug)]
pub struct SequenceConfBuilder {
    conf: SequenceConf,
}

impl SequenceConfBuilder {
    /// Sets [`SequenceConf::reorder_distance_window`].
    pub fn reorder_distance_window(mut self, distance: u8) -> Self {
        self.conf.reorder_distance_window = distance;
        self
    }

    /// Sets [`SequenceConf::reorder_time_window`].
    pub fn reorder_time_window(mut self, window: Duration) -> Self {
        self.conf.reorder_time_window = window;
        self
    }

    /// Sets [`SequenceConf::duplicate_time_window`].
    pub fn duplicate_time_window(mut self, window: Duration) -> Self {
        self.conf.duplicate_time_window = window;
        self
    }

    /// Sets [`SequenceConf::suspicious_backward_distance`].
    pub fn suspicious_backward_distance(mut self, distance: u8) -> Self {
        self.conf.suspicious_backward_distance = distance;
        self
    }

    /// Sets [`SequenceConf::multi_source_active_window`].
    pub fn multi_source_active_window(mut self, window: Duration) -> Self {
        self.conf.multi_source_active_window = window;
        self
    }

    /// Builds configuration.
    pub fn build(self) -> SequenceConf {
        self.conf
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Expiry settings applied by [`sweep`](crate::analyzer::StreamHealthAnalyzer::sweep).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepConf {
    system_ttl: Duration,
    source_ttl: Duration,
}

impl Default for SweepConf {
    fn default() -> Self {
        Self {
            system_ttl: DEFAULT_SYSTEM_TTL,
            source_ttl: DEFAULT_SOURCE_TTL,
        }
    }
}

impl SweepConf {
    /// Creates a [`SweepConfBuilder`] populated with defaults.
    pub fn builder() -> SweepConfBuilder {
        SweepConfBuilder {
            conf: Self::default(),
        }
    }

    /// Idle time after which a whole system is forgotten.
    ///
    /// Default is [`DEFAULT_SYSTEM_TTL`].
    #[inline]
    pub fn system_ttl(&self) -> Duration {
        self.system_ttl
    }

    /// Idle time after which a single stream of a system is forgotten.
    ///
    /// Default is [`DEFAULT_SOURCE_TTL`].
    #[inline]
    pub fn source_ttl(&self) -> Duration {
        self.source_ttl
    }
}

/// Builder for [`SweepConf`].
#[derive(Clone, Debug)]
pub struct SweepConfBuilder {
    conf: SweepConf,
}

impl SweepConfBuilder {
    /// Sets [`SweepConf::system_ttl`].
    pub fn system_ttl(mut self, ttl: Duration) -> Self {
        self.conf.system_ttl = ttl;
        self
    }

    /// Sets [`SweepConf::source_ttl`].
    pub fn source_ttl(mut self, ttl: Duration) -> Self {
        self.conf.source_ttl = ttl;
        self
    }

    /// Builds configuration.
    pub fn build(self) -> SweepConf {
        self.conf
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Complete analyzer configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyzerConf {
    sequence: SequenceConf,
    sweep: SweepConf,
}

impl AnalyzerConf {
    /// Creates an [`AnalyzerConfBuilder`] populated with defaults.
    pub fn builder() -> AnalyzerConfBuilder {
        AnalyzerConfBuilder {
            conf: Self::default(),
        }
    }

    /// Sequence classification settings.
    #[inline]
    pub fn sequence(&self) -> &SequenceConf {
        &self.sequence
    }

    /// Expiry settings.
    #[inline]
    pub fn sweep(&self) -> &SweepConf {
        &self.sweep
    }
}

/// Builder for [`AnalyzerConf`].
#[derive(Clone, Debug)]
pub struct AnalyzerConfBuilder {
    conf: AnalyzerConf,
}

impl AnalyzerConfBuilder {
    /// Sets sequence classification settings.
    pub fn sequence(mut self, sequence: SequenceConf) -> Self {
        self.conf.sequence = sequence;
        self
    }

    /// Sets expiry settings.
    pub fn sweep(mut self, sweep: SweepConf) -> Self {
        self.conf.sweep = sweep;
        self
    }

    /// Builds configuration.
    pub fn build(self) -> AnalyzerConf {
        self.conf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let conf = AnalyzerConf::default();
        assert_eq!(conf.sequence().reorder_distance_window(), 20);
        assert_eq!(
            conf.sequence().reorder_time_window(),
            Duration::from_millis(500)
        );
        assert_eq!(conf.sequence().duplicate_time_window(), Duration::from_secs(1));
        assert_eq!(
            conf.sequence().multi_source_active_window(),
            Duration::from_secs(2)
        );
        assert_eq!(conf.sweep().system_ttl(), Duration::from_secs(600));
        assert_eq!(conf.sweep().source_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn builders_override_selected_values() {
        let conf = AnalyzerConf::builder()
            .sweep(SweepConf::builder().source_ttl(Duration::from_secs(5)).build())
            .build();
        assert_eq!(conf.sweep().source_ttl(), Duration::from_secs(5));
        assert_eq!(conf.sweep().system_ttl(), DEFAULT_SYSTEM_TTL);
        assert_eq!(*conf.sequence(), SequenceConf::default());
    }
}
