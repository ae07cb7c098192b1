/// Errors that can occur on the serial side of the link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred while writing to the serial device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device accepted zero bytes; the other end is gone.
    #[error("transport closed")]
    Closed,

    /// The receive pump could not be started.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
