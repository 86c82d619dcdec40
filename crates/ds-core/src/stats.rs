use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Compteurs partagés entre le producteur et le consommateur.
///
/// Tous les champs sont atomiques : ni allocation ni verrou.
/// Each counter is written by exactly one side; readers only need an
/// approximate view, so every access is `Relaxed`.
///
/// # Example
/// ```
/// use ds_core::stats::PipelineStats;
/// let stats = PipelineStats::default();
/// stats.record_shed();
/// assert_eq!(stats.snapshot().frames_shed, 1);
/// ```
#[derive(Debug, Default)]
pub struct PipelineStats {
    cycles: AtomicU64,
    short_reads: AtomicU64,
    frames_produced: AtomicU64,
    frames_shed: AtomicU64,
    alloc_failures: AtomicU64,
    frames_sent: AtomicU64,
    frames_invalid: AtomicU64,
    frames_oversize: AtomicU64,
}

/// Copie instantanée des compteurs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Acquisition cycles started.
    pub cycles: u64,
    /// Cycles aborted on a short read.
    pub short_reads: u64,
    /// Frames enqueued successfully.
    pub frames_produced: u64,
    /// Frames dropped because the queue was full.
    pub frames_shed: u64,
    /// Cycles skipped because a frame buffer could not be allocated.
    pub alloc_failures: u64,
    /// Frames serialized and handed to the sink.
    pub frames_sent: u64,
    /// Frames discarded on a bad magic.
    pub frames_invalid: u64,
    /// Frames dropped because the transmit buffer was too small.
    pub frames_oversize: u64,
}

impl PipelineStats {
    #[inline]
    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_short_read(&self) {
        self.short_reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_produced(&self) {
        self.frames_produced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_shed(&self) {
        self.frames_shed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alloc_failure(&self) {
        self.alloc_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalid(&self) {
        self.frames_invalid.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_oversize(&self) {
        self.frames_oversize.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames enqueued so far.
    #[inline]
    #[must_use]
    pub fn frames_produced(&self) -> u64 {
        self.frames_produced.load(Ordering::Relaxed)
    }

    /// Read every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            short_reads: self.short_reads.load(Ordering::Relaxed),
            frames_produced: self.frames_produced.load(Ordering::Relaxed),
            frames_shed: self.frames_shed.load(Ordering::Relaxed),
            alloc_failures: self.alloc_failures.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_invalid: self.frames_invalid.load(Ordering::Relaxed),
            frames_oversize: self.frames_oversize.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} short_reads={} produced={} shed={} alloc_failures={} sent={} invalid={} oversize={}",
            self.cycles,
            self.short_reads,
            self.frames_produced,
            self.frames_shed,
            self.alloc_failures,
            self.frames_sent,
            self.frames_invalid,
            self.frames_oversize
        )
    }
}
