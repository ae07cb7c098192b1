/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// An escape byte was followed by something other than `0xDC`/`0xDD`.
    #[error("invalid SLIP escape byte 0x{0:02x}")]
    InvalidEscape(u8),

    /// The header bytes do not sum to `0xFF`.
    #[error("invalid header checksum (expected 0x{expected:02x}, got 0x{actual:02x})")]
    HeaderChecksum { expected: u8, actual: u8 },

    /// Fewer than 4 bytes between the delimiters.
    #[error("frame too short for header ({0} bytes)")]
    ShortHeader(usize),

    /// The frame ended before the length announced by its header.
    #[error("truncated payload ({actual} of {expected} bytes)")]
    Truncated { expected: usize, actual: usize },

    /// The payload exceeds the 12-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// No closing delimiter within the largest possible encoded frame.
    #[error("no frame delimiter within {0} bytes")]
    Oversized(usize),
}

pub type Result<T> = std::result::Result<T, FrameError>;
