use std::fmt;

use crate::error::CoreError;

/// Sentinel written into every frame by the packager ("AUD0").
pub const FRAME_MAGIC: u32 = 0x4155_4430;

/// Size of the packed wire header: magic, sample_count, rms, centroid, gain, scene.
pub const WIRE_HEADER_LEN: usize = 4 + 4 + 4 + 4 + 4 + 1;

/// Total wire size of a frame carrying `sample_count` samples per buffer.
///
/// # Example
/// ```
/// use ds_core::frame::wire_len;
/// assert_eq!(wire_len(0), 21);
/// assert_eq!(wire_len(512), 2069);
/// ```
#[inline]
#[must_use]
pub const fn wire_len(sample_count: usize) -> usize {
    WIRE_HEADER_LEN + 2 * 2 * sample_count
}

/// Acoustic scene label.
///
/// The discriminant is the `scene` byte on the wire.
///
/// # Example
/// ```
/// use ds_core::frame::Scene;
/// assert_eq!(Scene::from_u8(1), Some(Scene::Speech));
/// assert_eq!(Scene::Noise.as_u8(), 2);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Scene {
    /// Energy below the quiet threshold.
    #[default]
    Quiet = 0,
    /// Moderate energy with a centroid inside the speech band.
    Speech = 1,
    /// Everything else.
    Noise = 2,
}

impl Scene {
    /// Wire byte for this scene.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte. Unknown values return `None`.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Quiet),
            1 => Some(Self::Speech),
            2 => Some(Self::Noise),
            _ => None,
        }
    }

    /// Lowercase label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Speech => "speech",
            Self::Noise => "noise",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Features extracted from one acquisition block.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Features {
    /// RMS normalisé [0.0, 1.0].
    pub rms: f32,
    /// Centroïde spectral en Hz, [0, sample_rate/2). 0 si le bloc est silencieux.
    pub centroid: f32,
}

/// Result of scene classification: label plus the gain to apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    /// Scene label.
    pub scene: Scene,
    /// Scalar gain for the processed buffer.
    pub gain: f32,
}

/// One processed block: features, classification and both 16-bit buffers.
///
/// A frame owns its buffers exclusively and is not `Clone`:
/// it moves from the producer into the queue and from the queue into the
/// consumer, and is dropped (buffers included) wherever its journey ends.
/// The buffer length is the frame's `sample_count`, so the two buffers can
/// never disagree.
///
/// # Example
/// ```
/// use ds_core::frame::{Classification, Features, Frame, Scene, FRAME_MAGIC};
///
/// let frame = Frame::new(
///     Features { rms: 0.5, centroid: 1000.0 },
///     Classification { scene: Scene::Noise, gain: 0.5 },
///     vec![0i16; 4].into_boxed_slice(),
///     vec![0i16; 4].into_boxed_slice(),
/// ).unwrap();
/// assert_eq!(frame.sample_count(), 4);
/// assert_eq!(frame.magic, FRAME_MAGIC);
/// ```
#[derive(Debug)]
pub struct Frame {
    /// Sanity value; anything but [`FRAME_MAGIC`] marks a corrupted frame.
    pub magic: u32,
    /// RMS of the raw block.
    pub rms: f32,
    /// Spectral centroid of the raw block, in Hz.
    pub centroid: f32,
    /// Scene label.
    pub scene: Scene,
    /// Gain applied to produce `samples_out`.
    pub gain: f32,
    samples_in: Box<[i16]>,
    samples_out: Box<[i16]>,
}

impl Frame {
    /// Assemble a frame from freshly allocated buffers.
    ///
    /// # Errors
    /// Returns [`CoreError::SampleCountMismatch`] if the buffers differ in
    /// length, or [`CoreError::SampleCountOverflow`] if the length does not
    /// fit the 32-bit `sample_count` field.
    pub fn new(
        features: Features,
        classification: Classification,
        samples_in: Box<[i16]>,
        samples_out: Box<[i16]>,
    ) -> Result<Self, CoreError> {
        if samples_in.len() != samples_out.len() {
            return Err(CoreError::SampleCountMismatch {
                samples_in: samples_in.len(),
                samples_out: samples_out.len(),
            });
        }
        if u32::try_from(samples_in.len()).is_err() {
            return Err(CoreError::SampleCountOverflow(samples_in.len()));
        }
        Ok(Self {
            magic: FRAME_MAGIC,
            rms: features.rms,
            centroid: features.centroid,
            scene: classification.scene,
            gain: classification.gain,
            samples_in,
            samples_out,
        })
    }

    /// Number of samples in each buffer.
    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        // Bounded by the check in `new`.
        self.samples_in.len() as u32
    }

    /// Raw input, pre-gain.
    #[inline]
    #[must_use]
    pub fn samples_in(&self) -> &[i16] {
        &self.samples_in
    }

    /// Processed output, post-gain.
    #[inline]
    #[must_use]
    pub fn samples_out(&self) -> &[i16] {
        &self.samples_out
    }

    /// `true` if the sentinel is intact.
    #[inline]
    #[must_use]
    pub fn has_valid_magic(&self) -> bool {
        self.magic == FRAME_MAGIC
    }

    /// Features carried by this frame.
    #[must_use]
    pub fn features(&self) -> Features {
        Features {
            rms: self.rms,
            centroid: self.centroid,
        }
    }
}
