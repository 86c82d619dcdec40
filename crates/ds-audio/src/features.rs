use ds_core::frame::Features;

use crate::error::AudioError;
use crate::fft::FftPipeline;

/// Full-scale magnitude of a signed 24-bit sample (2^23).
pub const FULL_SCALE_24: f64 = 8_388_608.0;

/// Default RMS floor under which the spectrum is not worth computing.
pub const SILENCE_RMS_FLOOR: f32 = 1e-6;

/// RMS of a block of left-aligned 24-bit samples, normalized to [0, 1].
///
/// Squares are accumulated in `f64` so large blocks cannot overflow.
/// An empty block returns 0.
///
/// # Example
/// ```
/// use ds_audio::features::compute_rms;
/// assert_eq!(compute_rms(&[]), 0.0);
/// assert_eq!(compute_rms(&[0; 512]), 0.0);
/// let full = compute_rms(&[i32::MIN; 16]);
/// assert!((full - 1.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn compute_rms(samples: &[i32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let v = f64::from(s >> 8);
            v * v
        })
        .sum();

    let mean_sq = sum_sq / samples.len() as f64;
    (mean_sq.sqrt() / FULL_SCALE_24) as f32
}

/// Magnitude-weighted mean frequency of a spectrum.
///
/// `magnitudes` holds bins 0..=N/2 of an `fft_size`-point transform. Only
/// bins 1..N/2 are used: DC and Nyquist are excluded. Returns 0 when the
/// weighted bins carry no energy.
///
/// # Example
/// ```
/// use ds_audio::features::spectral_centroid;
/// // 8-point FFT, all energy in bin 2 → 2 * 8000 / 8 = 2000 Hz
/// let mags = [9.0, 0.0, 1.0, 0.0, 9.0];
/// assert_eq!(spectral_centroid(&mags, 8, 8000), 2000.0);
/// ```
#[must_use]
pub fn spectral_centroid(magnitudes: &[f32], fft_size: usize, sample_rate: u32) -> f32 {
    if fft_size == 0 {
        return 0.0;
    }
    let half = (fft_size / 2).min(magnitudes.len());
    let bin_hz = f64::from(sample_rate) / fft_size as f64;

    let mut weighted = 0.0f64;
    let mut total = 0.0f64;
    for (k, &mag) in magnitudes.iter().enumerate().take(half).skip(1) {
        let mag = f64::from(mag);
        weighted += k as f64 * bin_hz * mag;
        total += mag;
    }

    if total > 0.0 {
        (weighted / total) as f32
    } else {
        0.0
    }
}

/// Extracteur de features : RMS + centroïde spectral via FFT.
///
/// Owns its FFT plan and buffers; one instance lives on the producer thread.
///
/// # Example
/// ```
/// use ds_audio::features::FeatureExtractor;
/// let mut extractor = FeatureExtractor::new(512, 16_000).unwrap();
/// let features = extractor.extract(&[0i32; 512]);
/// assert_eq!(features.rms, 0.0);
/// assert_eq!(features.centroid, 0.0);
/// ```
pub struct FeatureExtractor {
    fft: FftPipeline,
    sample_rate: u32,
    rms_floor: f32,
}

impl FeatureExtractor {
    /// Create an extractor for blocks of `sample_count` samples.
    ///
    /// # Errors
    /// Returns [`AudioError::InvalidFftSize`] if `sample_count` is zero or
    /// not a power of two.
    pub fn new(sample_count: usize, sample_rate: u32) -> Result<Self, AudioError> {
        Ok(Self {
            fft: FftPipeline::new(sample_count)?,
            sample_rate,
            rms_floor: SILENCE_RMS_FLOOR,
        })
    }

    /// Override the RMS floor under which the centroid is skipped.
    #[must_use]
    pub fn with_rms_floor(mut self, floor: f32) -> Self {
        self.rms_floor = floor;
        self
    }

    /// Block length this extractor was built for.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.fft.fft_size()
    }

    /// Spectral centroid of `samples`, in Hz.
    ///
    /// Callers are expected to skip this for near-silent blocks; see
    /// [`FeatureExtractor::extract`].
    pub fn compute_spectral_centroid(&mut self, samples: &[i32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let fft_size = self.fft.fft_size();
        let magnitudes = self.fft.process(samples);
        spectral_centroid(magnitudes, fft_size, self.sample_rate)
    }

    /// RMS, then the centroid only if RMS is above the silence floor.
    pub fn extract(&mut self, samples: &[i32]) -> Features {
        let rms = compute_rms(samples);
        let centroid = if rms > self.rms_floor {
            self.compute_spectral_centroid(samples)
        } else {
            0.0
        };
        Features { rms, centroid }
    }
}
