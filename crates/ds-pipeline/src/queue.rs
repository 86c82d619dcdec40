use ds_core::frame::Frame;
use flume::{Receiver, Sender, TrySendError};
use thiserror::Error;

/// A frame the queue refused. The caller gets ownership back and drops it.
#[derive(Error, Debug)]
pub enum EnqueueError {
    /// Queue at capacity: the newest frame is shed.
    #[error("file d'attente pleine, frame abandonnée")]
    Full(Frame),

    /// Consumer side is gone.
    #[error("consommateur déconnecté")]
    Closed(Frame),
}

impl EnqueueError {
    /// Take the rejected frame back.
    #[must_use]
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Full(frame) | Self::Closed(frame) => frame,
        }
    }
}

/// Create the bounded frame handoff between producer and consumer.
///
/// Built once at pipeline construction; the sender goes to the producer
/// loop, the receiver to the consumer loop. Neither end is `Clone`, which
/// keeps the channel single-producer/single-consumer. Frames travel by
/// ownership, never by copy.
///
/// # Example
/// ```
/// use ds_core::frame::{Classification, Features, Frame, Scene};
/// use ds_pipeline::queue::frame_queue;
///
/// let (tx, rx) = frame_queue(1);
/// let frame = || Frame::new(
///     Features::default(),
///     Classification { scene: Scene::Quiet, gain: 3.0 },
///     Box::default(),
///     Box::default(),
/// ).unwrap();
///
/// assert!(tx.try_enqueue(frame()).is_ok());
/// assert!(tx.try_enqueue(frame()).is_err()); // full: shed
/// assert!(rx.dequeue().is_some());
/// ```
#[must_use]
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = flume::bounded(capacity);
    (FrameSender { tx, capacity }, FrameReceiver { rx })
}

/// Producer end of the frame queue.
#[derive(Debug)]
pub struct FrameSender {
    tx: Sender<Frame>,
    capacity: usize,
}

impl FrameSender {
    /// Hand `frame` to the queue without blocking.
    ///
    /// On success ownership moves into the queue and the producer must not
    /// look at the frame again (the move enforces it). On failure the frame
    /// comes back inside the error; it is never retried.
    ///
    /// # Errors
    /// [`EnqueueError::Full`] when at capacity, [`EnqueueError::Closed`]
    /// when the receiver has been dropped.
    pub fn try_enqueue(&self, frame: Frame) -> Result<(), EnqueueError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(frame) => EnqueueError::Full(frame),
            TrySendError::Disconnected(frame) => EnqueueError::Closed(frame),
        })
    }

    /// Frames currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// `true` if no frame is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Maximum number of waiting frames.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer end of the frame queue.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<Frame>,
}

impl FrameReceiver {
    /// Block until a frame is available, FIFO.
    ///
    /// No timeout. Returns `None` only once the sender has been dropped and
    /// every queued frame has been taken.
    #[must_use]
    pub fn dequeue(&self) -> Option<Frame> {
        self.rx.recv().ok()
    }

    /// Take a frame if one is waiting.
    #[must_use]
    pub fn try_dequeue(&self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Frames currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// `true` if no frame is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
