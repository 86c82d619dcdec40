use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use ds_audio::classify::SceneClassifier;
use ds_audio::error::AudioError;
use ds_audio::features::FeatureExtractor;
use ds_audio::gain::apply_gain;
use ds_core::config::PipelineConfig;
use ds_core::frame::Frame;
use ds_core::stats::{PipelineStats, StatsSnapshot};
use ds_core::traits::{SampleSource, TransportSink};

use crate::packager::package_frame;
use crate::queue::{EnqueueError, FrameReceiver, FrameSender, frame_queue};
use crate::wire::{WireError, serialize};

/// Outcome of one producer cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Frame handed to the queue.
    Enqueued,
    /// Queue full, frame dropped.
    Shed,
    /// Fewer samples than a block; nothing produced.
    ShortRead,
    /// Frame buffers could not be allocated; nothing produced.
    AllocFailed,
    /// Source closed for good.
    SourceClosed,
    /// Consumer gone.
    QueueClosed,
}

/// État du producteur : extracteur, classifieur et buffers de travail.
///
/// The two `i32` work buffers never leave this struct and are reused each
/// cycle. Every frame gets its own freshly allocated 16-bit buffers from
/// the packager.
pub struct ProducerLoop {
    extractor: FeatureExtractor,
    classifier: SceneClassifier,
    raw: Vec<i32>,
    processed: Vec<i32>,
}

impl ProducerLoop {
    /// Allocate the fixed work buffers and the FFT plan.
    ///
    /// # Errors
    /// Returns an error if the block size is not a valid FFT length.
    pub fn new(config: &PipelineConfig) -> Result<Self, AudioError> {
        let extractor = FeatureExtractor::new(config.sample_count, config.sample_rate)?
            .with_rms_floor(config.centroid_rms_floor);
        Ok(Self {
            extractor,
            classifier: SceneClassifier::new(config.scene.clone()),
            raw: vec![0; config.sample_count],
            processed: vec![0; config.sample_count],
        })
    }

    /// Acquire one block and push the resulting frame, never blocking after the read.
    pub fn cycle<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
        queue: &FrameSender,
        stats: &PipelineStats,
    ) -> CycleOutcome {
        let Some(n) = source.read(&mut self.raw) else {
            return CycleOutcome::SourceClosed;
        };
        stats.record_cycle();
        if n != self.raw.len() {
            log::warn!("Short read: {n}/{} samples", self.raw.len());
            stats.record_short_read();
            return CycleOutcome::ShortRead;
        }

        let features = self.extractor.extract(&self.raw);
        let class = self.classifier.classify(features.rms, features.centroid);

        self.processed.copy_from_slice(&self.raw);
        apply_gain(&mut self.processed, class.gain);

        log::debug!(
            "RMS: {:.5} | Centroid: {:.1} Hz | Scene: {} | Gain: {:.1}x",
            features.rms,
            features.centroid,
            class.scene,
            class.gain
        );

        let frame = match package_frame(&self.raw, &self.processed, features, class) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to package frame: {e}");
                stats.record_alloc_failure();
                return CycleOutcome::AllocFailed;
            }
        };

        match queue.try_enqueue(frame) {
            Ok(()) => {
                stats.record_produced();
                CycleOutcome::Enqueued
            }
            // Rejected frame is dropped here, buffers included.
            Err(EnqueueError::Full(_)) => {
                log::trace!("Queue full, frame shed");
                stats.record_shed();
                CycleOutcome::Shed
            }
            Err(EnqueueError::Closed(_)) => CycleOutcome::QueueClosed,
        }
    }
}

/// Outcome of handling one dequeued frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Serialized and broadcast; carries the packet size.
    Sent(usize),
    /// Discarded on a bad magic.
    Invalid,
    /// Discarded because the transmit buffer is too small.
    Oversize,
}

/// État du consommateur : buffer d'émission alloué une fois au démarrage.
pub struct ConsumerLoop {
    tx_buffer: Vec<u8>,
}

impl ConsumerLoop {
    #[must_use]
    pub fn new(tx_buffer_size: usize) -> Self {
        Self {
            tx_buffer: vec![0; tx_buffer_size],
        }
    }

    /// Serialize and broadcast `frame`, then drop it whatever happened.
    pub fn handle<T: TransportSink + ?Sized>(
        &mut self,
        frame: Frame,
        sink: &mut T,
        stats: &PipelineStats,
    ) -> ConsumeOutcome {
        match serialize(&frame, &mut self.tx_buffer) {
            Ok(len) => {
                sink.broadcast(&self.tx_buffer[..len]);
                stats.record_sent();
                ConsumeOutcome::Sent(len)
            }
            Err(WireError::BadMagic(magic)) => {
                log::warn!("Invalid audio frame received (magic {magic:#010x})");
                stats.record_invalid();
                ConsumeOutcome::Invalid
            }
            Err(e) => {
                log::warn!("Packet too large, dropping frame: {e}");
                stats.record_oversize();
                ConsumeOutcome::Oversize
            }
        }
    }
}

/// Producer entry point: runs until stopped, the source closes, the
/// consumer disappears, or `max_frames` frames have been enqueued.
///
/// Dropping `queue` on return lets the consumer drain and exit.
///
/// # Errors
/// Returns an error if the FFT cannot be planned for the configured block size.
pub fn run_producer<S: SampleSource + ?Sized>(
    source: &mut S,
    config: &PipelineConfig,
    queue: FrameSender,
    stats: &PipelineStats,
    stop: &AtomicBool,
    max_frames: Option<u64>,
) -> Result<()> {
    let mut producer = ProducerLoop::new(config)?;

    if let Some(rate) = source.sample_rate()
        && rate != config.sample_rate
    {
        log::warn!(
            "Source runs at {rate}Hz but the pipeline expects {}Hz; centroids will be scaled",
            config.sample_rate
        );
    }

    log::info!(
        "Producer started: {} samples @ {}Hz, queue capacity {}",
        config.sample_count,
        config.sample_rate,
        queue.capacity()
    );

    while !stop.load(Ordering::Relaxed) {
        match producer.cycle(source, &queue, stats) {
            CycleOutcome::SourceClosed => {
                log::info!("Sample source closed");
                break;
            }
            CycleOutcome::QueueClosed => {
                log::info!("Consumer disconnected");
                break;
            }
            CycleOutcome::Enqueued => {
                if max_frames.is_some_and(|max| stats.frames_produced() >= max) {
                    log::info!("Frame limit reached");
                    break;
                }
            }
            CycleOutcome::Shed | CycleOutcome::ShortRead | CycleOutcome::AllocFailed => {}
        }
    }
    Ok(())
}

/// Consumer entry point: dequeues until the producer is gone and the queue is empty.
pub fn run_consumer<T: TransportSink + ?Sized>(
    queue: &FrameReceiver,
    sink: &mut T,
    tx_buffer_size: usize,
    stats: &PipelineStats,
) {
    let mut consumer = ConsumerLoop::new(tx_buffer_size);
    log::info!("Consumer started, tx buffer {tx_buffer_size} bytes");

    while let Some(frame) = queue.dequeue() {
        consumer.handle(frame, sink, stats);
    }
}

/// Running pipeline: two named threads sharing only the frame queue.
pub struct PipelineHandle {
    stop: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
    producer: JoinHandle<Result<()>>,
    consumer: JoinHandle<()>,
}

impl PipelineHandle {
    /// Ask the producer to stop after its current cycle.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Shared stop flag, e.g. for a Ctrl-C handler.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Live counters.
    #[must_use]
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Wait for both threads and return the final counters.
    ///
    /// # Errors
    /// Returns an error if a thread panicked or the producer failed to start.
    pub fn join(self) -> Result<StatsSnapshot> {
        let produced = self
            .producer
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
        self.consumer
            .join()
            .map_err(|_| anyhow::anyhow!("consumer thread panicked"))?;
        produced?;

        let snapshot = self.stats.snapshot();
        log::info!("Pipeline stopped: {snapshot}");
        Ok(snapshot)
    }
}

/// Validate `config` and start the producer (`ds-producer`) and consumer
/// (`ds-consumer`) threads.
///
/// No thread priority is set; a hard real-time deployment should raise
/// the producer above the consumer with its platform's scheduler API.
///
/// # Errors
/// Returns an error if the configuration is invalid or a thread cannot be spawned.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use ds_audio::tone::ToneSource;
/// use ds_core::config::PipelineConfig;
/// use ds_core::traits::TransportSink;
/// use ds_pipeline::runtime::spawn_pipeline;
///
/// struct Discard;
/// impl TransportSink for Discard {
///     fn broadcast(&mut self, _bytes: &[u8]) {}
/// }
///
/// let config = Arc::new(PipelineConfig::default());
/// let source = ToneSource::new(1000.0, 0.05, 16_000).with_limit(512 * 3);
/// let handle = spawn_pipeline(config, source, Discard, None).unwrap();
/// let stats = handle.join().unwrap();
/// assert_eq!(stats.frames_produced + stats.frames_shed, 3);
/// ```
pub fn spawn_pipeline<S, T>(
    config: Arc<PipelineConfig>,
    mut source: S,
    mut sink: T,
    max_frames: Option<u64>,
) -> Result<PipelineHandle>
where
    S: SampleSource + 'static,
    T: TransportSink + 'static,
{
    config.validate().context("Invalid pipeline configuration")?;

    let (sender, receiver) = frame_queue(config.queue_capacity);
    let stop = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(PipelineStats::default());

    let tx_buffer_size = config.tx_buffer_size;
    let consumer_stats = Arc::clone(&stats);
    let consumer = thread::Builder::new()
        .name("ds-consumer".to_string())
        .spawn(move || {
            run_consumer(&receiver, &mut sink, tx_buffer_size, &consumer_stats);
        })
        .context("Failed to spawn consumer thread")?;

    let producer_stop = Arc::clone(&stop);
    let producer_stats = Arc::clone(&stats);
    let producer = thread::Builder::new()
        .name("ds-producer".to_string())
        .spawn(move || {
            let result = run_producer(
                &mut source,
                &config,
                sender,
                &producer_stats,
                &producer_stop,
                max_frames,
            );
            if let Err(e) = &result {
                log::error!("Producer failed: {e:#}");
            }
            result
        })
        .context("Failed to spawn producer thread")?;

    Ok(PipelineHandle {
        stop,
        stats,
        producer,
        consumer,
    })
}
