//! SLIP byte-stuffing.
//!
//! Two byte values are reserved on the wire: the frame delimiter `0xC0` and
//! the escape `0xDB`. Inside a frame they are replaced by two-byte escapes so
//! a delimiter is unambiguous in an arbitrary stream.

use bytes::BufMut;

use crate::error::{FrameError, Result};

/// Frame delimiter.
pub const DELIMITER: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// Escaped form of [`DELIMITER`] (follows [`ESC`]).
pub const ESC_DELIMITER: u8 = 0xDC;
/// Escaped form of [`ESC`] (follows [`ESC`]).
pub const ESC_ESC: u8 = 0xDD;

/// Append `byte` to `out`, escaping it if it is reserved.
#[inline]
pub fn encode_byte<B: BufMut>(out: &mut B, byte: u8) {
    match byte {
        DELIMITER => out.put_slice(&[ESC, ESC_DELIMITER]),
        ESC => out.put_slice(&[ESC, ESC_ESC]),
        _ => out.put_u8(byte),
    }
}

/// Incremental SLIP unstuffer.
///
/// The only state is the escape flag, which survives across calls so the
/// decoder can be driven one byte or one partial chunk at a time.
#[derive(Debug, Default, Clone)]
pub struct SlipDecoder {
    escaped: bool,
}

impl SlipDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte, appending any decoded output to `out`.
    ///
    /// An invalid escape clears the escape flag and returns
    /// [`FrameError::InvalidEscape`]; the caller is expected to abandon the
    /// frame in progress.
    pub fn decode_byte<B: BufMut>(&mut self, out: &mut B, byte: u8) -> Result<()> {
        if !self.escaped {
            if byte == ESC {
                self.escaped = true;
            } else {
                out.put_u8(byte);
            }
            return Ok(());
        }

        self.escaped = false;
        match byte {
            ESC_DELIMITER => out.put_u8(DELIMITER),
            ESC_ESC => out.put_u8(ESC),
            other => return Err(FrameError::InvalidEscape(other)),
        }
        Ok(())
    }

    /// Whether the last byte fed was an unfinished escape.
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// Forget any half-read escape sequence.
    pub fn reset(&mut self) {
        self.escaped = false;
    }
}

/// Escape a whole buffer (no delimiters are added).
pub fn slip_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8 + 2);
    for &byte in data {
        encode_byte(&mut out, byte);
    }
    out
}

/// Unescape a whole buffer (which must not contain delimiters).
pub fn slip_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = SlipDecoder::new();
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        decoder.decode_byte(&mut out, byte)?;
    }
    Ok(out)
}
