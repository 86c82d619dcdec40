// Acquisition sources, feature extraction, scene classification and gain for dynsense.

#[cfg(feature = "mic")]
pub mod capture;
pub mod classify;
pub mod decode;
pub mod error;
pub mod features;
pub mod fft;
pub mod gain;
pub mod sample;
pub mod tone;

pub use classify::SceneClassifier;
pub use error::AudioError;
pub use features::FeatureExtractor;
