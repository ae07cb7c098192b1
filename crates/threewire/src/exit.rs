use std::fmt;
use std::io;

use threewire_frame::FrameError;
use threewire_link::LinkError;
use threewire_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => TRANSPORT_ERROR,
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) | TransportError::Spawn(source) => io_error(context, source),
        TransportError::Closed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::PayloadTooLarge { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        LinkError::QueueFull { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        LinkError::WorkerSpawn(source) => io_error(context, source),
        LinkError::WorkerPanicked => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
