use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::AudioError;

/// FFT pipeline: unwindowed real FFT on left-aligned 24-bit samples.
///
/// Pre-allocates the FFT plan, input, spectrum and magnitude buffers so the
/// hot path never allocates. For real input the N/2+1 complex bins are
/// exactly bins 0..=N/2 of the full N-point complex transform, bit-reversal
/// included.
///
/// # Example
/// ```
/// use ds_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(512).unwrap();
/// assert_eq!(fft.fft_size(), 512);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    plan: Arc<dyn RealToComplex<f32>>,
}

impl FftPipeline {
    /// Create a new FFT pipeline of the given length.
    ///
    /// # Errors
    /// Returns [`AudioError::InvalidFftSize`] if `size` is zero or not a power of two.
    pub fn new(size: usize) -> Result<Self, AudioError> {
        if size == 0 || !size.is_power_of_two() {
            return Err(AudioError::InvalidFftSize(size));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        let magnitudes = vec![0.0; spectrum_buf.len()];

        Ok(Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            magnitudes,
            plan,
        })
    }

    /// Transform `samples` (24-bit left-aligned in 32-bit words).
    ///
    /// Each sample is shifted right 8 bits before conversion. Shorter input
    /// is zero-padded, longer input truncated to the FFT length.
    ///
    /// Returns the unnormalized magnitude of bins 0..=N/2.
    ///
    /// # Example
    /// ```
    /// use ds_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256).unwrap();
    /// let spectrum = fft.process(&[0i32; 256]);
    /// assert_eq!(spectrum.len(), 129); // N/2 + 1
    /// ```
    pub fn process(&mut self, samples: &[i32]) -> &[f32] {
        let n = self.fft_size.min(samples.len());

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { (samples[i] >> 8) as f32 } else { 0.0 };
        }

        if self
            .plan
            .process_with_scratch(
                &mut self.input_buf,
                &mut self.spectrum_buf,
                &mut self.scratch,
            )
            .is_err()
        {
            self.magnitudes.fill(0.0);
            return &self.magnitudes;
        }

        for (mag, c) in self.magnitudes.iter_mut().zip(&self.spectrum_buf) {
            *mag = (c.re * c.re + c.im * c.im).sqrt();
        }
        &self.magnitudes
    }

    /// FFT length.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two() {
        assert!(matches!(
            FftPipeline::new(0),
            Err(AudioError::InvalidFftSize(0))
        ));
        assert!(matches!(
            FftPipeline::new(500),
            Err(AudioError::InvalidFftSize(500))
        ));
    }

    #[test]
    fn dc_block_lands_in_bin_zero() {
        let mut fft = FftPipeline::new(64).unwrap();
        let spectrum = fft.process(&[1000 << 8; 64]);
        assert!((spectrum[0] - 64_000.0).abs() < 1.0);
        assert!(spectrum[1..].iter().all(|&m| m < 1.0));
    }

    #[test]
    fn bin_aligned_cosine_peaks_at_its_bin() {
        let n = 128;
        let samples: Vec<i32> = (0..n)
            .map(|i| {
                let v = (2.0 * std::f64::consts::PI * 8.0 * i as f64 / n as f64).cos() * 100_000.0;
                (v as i32) << 8
            })
            .collect();
        let mut fft = FftPipeline::new(n).unwrap();
        let spectrum = fft.process(&samples);
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(8));
    }
}
