/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] threewire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] threewire_frame::FrameError),

    /// The payload does not fit the 12-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The receive queue has no free slot; the frame was dropped.
    #[error("receive queue full ({capacity} frames)")]
    QueueFull { capacity: usize },

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(std::io::Error),

    /// The worker thread panicked inside the receive callback.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, LinkError>;
