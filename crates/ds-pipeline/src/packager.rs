use ds_core::error::CoreError;
use ds_core::frame::{Classification, Features, Frame};
use thiserror::Error;

/// Errors raised while assembling a frame.
#[derive(Error, Debug)]
pub enum PackError {
    /// A 16-bit buffer could not be allocated; the cycle is skipped.
    #[error("Allocation impossible pour {samples} échantillons")]
    Alloc {
        /// Requested buffer length.
        samples: usize,
    },

    /// The frame itself rejected its buffers.
    #[error(transparent)]
    Frame(#[from] CoreError),
}

/// Narrow a left-aligned 24-bit sample to 16 bits.
///
/// Shifts right by 8 then saturates to the `i16` range.
///
/// # Example
/// ```
/// use ds_pipeline::packager::to_i16;
/// assert_eq!(to_i16(1000 << 8), 1000);
/// assert_eq!(to_i16(i32::MAX), i16::MAX);
/// assert_eq!(to_i16(i32::MIN), i16::MIN);
/// ```
#[inline(always)]
#[must_use]
pub fn to_i16(sample: i32) -> i16 {
    (sample >> 8).clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Convert a block into a freshly allocated 16-bit buffer.
///
/// # Errors
/// Returns [`PackError::Alloc`] if the allocator refuses the buffer.
pub fn convert_block(samples: &[i32]) -> Result<Box<[i16]>, PackError> {
    let mut out = Vec::new();
    out.try_reserve_exact(samples.len())
        .map_err(|_| PackError::Alloc {
            samples: samples.len(),
        })?;
    out.extend(samples.iter().map(|&s| to_i16(s)));
    Ok(out.into_boxed_slice())
}

/// Assemble one complete frame from the raw and processed blocks.
///
/// Both 16-bit buffers are allocated here, per frame, and never shared
/// with any other frame: the returned frame may sit in the queue or be
/// mid-serialization while the producer acquires the next block. The
/// caller owns the result and must either enqueue it or drop it.
///
/// # Errors
/// Returns [`PackError::Alloc`] on allocation failure, or
/// [`PackError::Frame`] if the two blocks differ in length.
///
/// # Example
/// ```
/// use ds_core::frame::{Classification, Features, Scene};
/// use ds_pipeline::packager::package_frame;
///
/// let raw = [256, -512, 1 << 30];
/// let processed = [512, -1024, i32::MAX];
/// let frame = package_frame(
///     &raw,
///     &processed,
///     Features { rms: 0.3, centroid: 900.0 },
///     Classification { scene: Scene::Noise, gain: 2.0 },
/// ).unwrap();
/// assert_eq!(frame.samples_in(), &[1, -2, i16::MAX]);
/// assert_eq!(frame.samples_out(), &[2, -4, i16::MAX]);
/// ```
pub fn package_frame(
    raw: &[i32],
    processed: &[i32],
    features: Features,
    classification: Classification,
) -> Result<Frame, PackError> {
    let samples_in = convert_block(raw)?;
    let samples_out = convert_block(processed)?;
    Ok(Frame::new(features, classification, samples_in, samples_out)?)
}

#[cfg(test)]
mod tests {
    use ds_core::frame::{FRAME_MAGIC, Scene};

    use super::*;

    fn speech() -> Classification {
        Classification {
            scene: Scene::Speech,
            gain: 1.0,
        }
    }

    #[test]
    fn conversion_saturates_rather_than_wraps() {
        assert_eq!(to_i16(40_000 << 8), i16::MAX);
        assert_eq!(to_i16(-40_000 << 8), i16::MIN);
        assert_eq!(to_i16(32_767 << 8), 32_767);
        assert_eq!(to_i16(-32_768 << 8), -32_768);
        // Padding bits are discarded, sign is kept.
        assert_eq!(to_i16(0xFF), 0);
        assert_eq!(to_i16(-1), -1);
    }

    #[test]
    fn frame_carries_every_field() {
        let raw = vec![100 << 8; 8];
        let processed = vec![300 << 8; 8];
        let frame = package_frame(
            &raw,
            &processed,
            Features {
                rms: 0.05,
                centroid: 1500.0,
            },
            speech(),
        )
        .unwrap();

        assert_eq!(frame.magic, FRAME_MAGIC);
        assert_eq!(frame.sample_count(), 8);
        assert_eq!(frame.scene, Scene::Speech);
        assert_eq!(frame.gain, 1.0);
        assert_eq!(frame.rms, 0.05);
        assert_eq!(frame.centroid, 1500.0);
        assert!(frame.samples_in().iter().all(|&s| s == 100));
        assert!(frame.samples_out().iter().all(|&s| s == 300));
    }

    #[test]
    fn consecutive_frames_never_share_buffers() {
        let mut block = vec![1 << 8; 16];
        let first = package_frame(&block, &block, Features::default(), speech()).unwrap();
        block.fill(2 << 8);
        let second = package_frame(&block, &block, Features::default(), speech()).unwrap();

        // Writing the next block must not disturb the frame still alive.
        assert!(first.samples_in().iter().all(|&s| s == 1));
        assert!(second.samples_in().iter().all(|&s| s == 2));
        assert_ne!(first.samples_in().as_ptr(), second.samples_in().as_ptr());
        assert_ne!(first.samples_in().as_ptr(), first.samples_out().as_ptr());
    }

    #[test]
    fn mismatched_blocks_are_refused() {
        let err = package_frame(&[0; 4], &[0; 3], Features::default(), speech()).unwrap_err();
        assert!(matches!(err, PackError::Frame(CoreError::SampleCountMismatch { .. })));
    }
}
