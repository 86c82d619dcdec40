use std::thread;
use std::time::{Duration, Instant};

/// Largest positive signed 24-bit value.
pub const MAX_24: f32 = 8_388_607.0;

/// Convert a normalized `f32` sample to a 24-bit value left-aligned in 32 bits.
///
/// Input is clamped to [-1, 1]; the low 8 bits of the result are zero,
/// matching what an I²S MEMS microphone delivers.
///
/// # Example
/// ```
/// use ds_audio::sample::to_left_aligned;
/// assert_eq!(to_left_aligned(0.0), 0);
/// assert_eq!(to_left_aligned(1.0), 8_388_607 << 8);
/// assert_eq!(to_left_aligned(-2.0), -8_388_607 << 8);
/// ```
#[inline(always)]
#[must_use]
pub fn to_left_aligned(sample: f32) -> i32 {
    let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    ((clamped * MAX_24) as i32) << 8
}

/// Cadence temps réel : bloque jusqu'à l'échéance du prochain bloc.
///
/// Used by synthetic and file sources to emulate a blocking acquisition
/// bus. Deadlines accumulate from the first call so sleep jitter does not
/// drift the cadence; if the caller falls behind, the schedule resets
/// instead of bursting.
#[derive(Debug)]
pub struct Pacer {
    sample_rate: u32,
    next_deadline: Option<Instant>,
}

impl Pacer {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            next_deadline: None,
        }
    }

    /// Wait for the time `samples` samples take to acquire.
    pub fn wait(&mut self, samples: usize) {
        let block = Duration::from_secs_f64(samples as f64 / f64::from(self.sample_rate));
        let now = Instant::now();
        let deadline = match self.next_deadline {
            Some(d) if d > now => d,
            _ => now,
        } + block;

        if let Some(remaining) = deadline.checked_duration_since(now) {
            thread::sleep(remaining);
        }
        self.next_deadline = Some(deadline);
    }
}
