use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ds_core::traits::SampleSource;
use rtrb::{Consumer, RingBuffer};

use crate::error::AudioError;
use crate::sample::to_left_aligned;

/// Microphone capture via cpal.
///
/// The cpal stream lives on its own `ds-mic` thread (streams are not `Send`
/// on every platform); its callback downmixes to mono, converts to
/// left-aligned 24-bit words and pushes into a lock-free ring buffer. `read`
/// blocks until a full block is available.
///
/// # Example
/// ```no_run
/// use ds_audio::capture::MicSource;
/// let mic = MicSource::start_default(512).unwrap();
/// ```
pub struct MicSource {
    consumer: Consumer<i32>,
    sample_rate: u32,
    stream_failed: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl MicSource {
    /// Start capturing from the default input device, for reads of `block` samples.
    ///
    /// # Errors
    /// Returns an error if the audio device is unavailable.
    pub fn start_default(block: usize) -> Result<Self> {
        let (ready_tx, ready_rx) = flume::bounded::<Result<(u32, Consumer<i32>), String>>(1);
        let stream_failed = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let failed = Arc::clone(&stream_failed);
        let keep_running = Arc::clone(&running);
        thread::Builder::new()
            .name("ds-mic".to_string())
            .spawn(move || {
                let stream = match open_stream(failed, block) {
                    Ok((stream, rate, consumer)) => {
                        let _ = ready_tx.send(Ok((rate, consumer)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                // Keep the stream alive in this thread
                while keep_running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(50));
                }
                drop(stream);
            })?;

        let (sample_rate, consumer) = ready_rx
            .recv()
            .map_err(|e| AudioError::StreamError(e.to_string()))?
            .map_err(AudioError::StreamError)?;

        log::info!("Microphone capture started @ {sample_rate}Hz");
        Ok(Self {
            consumer,
            sample_rate,
            stream_failed,
            running,
        })
    }
}

/// Ring size: two seconds of audio, and never fewer than four blocks.
fn ring_capacity(sample_rate: u32, block: usize) -> usize {
    (sample_rate as usize * 2).max(block.saturating_mul(4))
}

fn open_stream(
    failed: Arc<AtomicBool>,
    block: usize,
) -> Result<(cpal::Stream, u32, Consumer<i32>)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioError::NoInputDevice)?;

    let config = device.default_input_config()?;
    let sample_rate = config.sample_rate().0;
    let channels = usize::from(config.channels()).max(1);

    let (mut producer, consumer) = RingBuffer::new(ring_capacity(sample_rate, block));

    let stream = device.build_input_stream(
        &config.into(),
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            for chunk in data.chunks(channels) {
                let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                let _ = producer.push(to_left_aligned(mono));
            }
        },
        move |err| {
            log::error!("Audio stream error: {err}");
            failed.store(true, Ordering::Relaxed);
        },
        None,
    )?;

    stream.play()?;
    Ok((stream, sample_rate, consumer))
}

impl SampleSource for MicSource {
    fn read(&mut self, buf: &mut [i32]) -> Option<usize> {
        // A block the ring can never hold would wait forever.
        let capacity = self.consumer.buffer().capacity();
        if buf.len() > capacity {
            log::error!("Block of {} samples exceeds the {capacity}-slot capture ring", buf.len());
            return Some(0);
        }
        while self.consumer.slots() < buf.len() {
            if self.consumer.is_abandoned() {
                return None;
            }
            // A stream error yields a short read, the producer retries.
            if self.stream_failed.swap(false, Ordering::Relaxed) {
                return Some(0);
            }
            thread::sleep(Duration::from_millis(1));
        }

        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.consumer.pop() {
                Ok(sample) => {
                    *slot = sample;
                    count += 1;
                }
                Err(_) => break,
            }
        }
        Some(count)
    }

    fn sample_rate(&self) -> Option<u32> {
        Some(self.sample_rate)
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}
