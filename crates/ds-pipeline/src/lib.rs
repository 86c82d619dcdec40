// Frame packaging, bounded handoff, wire format and the producer/consumer runtime.

pub mod packager;
pub mod queue;
pub mod runtime;
pub mod sink;
pub mod wire;

pub use packager::{PackError, package_frame};
pub use queue::{EnqueueError, FrameReceiver, FrameSender, frame_queue};
pub use runtime::{PipelineHandle, spawn_pipeline};
pub use sink::UdpSink;
pub use wire::{WireError, encoded_len, parse_frame, serialize};
