//! Frame model, configuration, and collaborator traits for dynsense.
//!
//! This crate holds every type shared between the producer side
//! (acquisition, DSP) and the consumer side (serialization, transport).

pub mod config;
pub mod error;
pub mod frame;
pub mod stats;
pub mod traits;

pub use config::{PipelineConfig, SceneThresholds};
pub use error::CoreError;
pub use frame::{Classification, FRAME_MAGIC, Features, Frame, Scene};
pub use stats::{PipelineStats, StatsSnapshot};
pub use traits::{SampleSource, TransportSink};
