use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::header::{Header, PacketType, HEADER_SIZE, MAX_PAYLOAD};
use crate::slip::{encode_byte, SlipDecoder, DELIMITER};

/// Optional data integrity check appended after the payload.
const CRC_SIZE: usize = 2;

/// A validated frame: parsed header plus the unescaped header+payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: Header,
    raw: Bytes,
}

impl Frame {
    /// Assemble a frame from a header and payload.
    ///
    /// The header length is rewritten to match `payload`.
    pub fn new(mut header: Header, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        header.length = payload.len() as u16;

        let mut raw = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        raw.put_slice(&header.encode());
        raw.put_slice(payload);
        Ok(Self {
            header,
            raw: raw.freeze(),
        })
    }

    /// Re-parse a frame from unescaped header+payload bytes.
    pub fn from_raw(raw: Bytes) -> Result<Self> {
        let header = Header::decode(&raw)?;
        let wanted = HEADER_SIZE + header.payload_len();
        if raw.len() < wanted {
            return Err(FrameError::Truncated {
                expected: header.payload_len(),
                actual: raw.len() - HEADER_SIZE,
            });
        }
        Ok(Self {
            header,
            raw: raw.slice(..wanted),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn packet_type(&self) -> PacketType {
        self.header.packet_type
    }

    /// The payload, without the header.
    pub fn payload(&self) -> Bytes {
        self.raw.slice(HEADER_SIZE..)
    }

    /// Header and payload as they appear before SLIP escaping.
    pub fn as_bytes(&self) -> &Bytes {
        &self.raw
    }

    pub fn into_bytes(self) -> Bytes {
        self.raw
    }
}

/// Worst-case size on the wire of a frame carrying `payload_len` bytes: every
/// byte escaped, room for the optional CRC, plus two delimiters.
pub const fn max_encoded_len(payload_len: usize) -> usize {
    (HEADER_SIZE + payload_len + CRC_SIZE) * 2 + 2
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────┬──────────────────────────┬──────┐
/// │ 0xC0 │ SLIP(header, 4B)     │ SLIP(payload, 0..4095B)  │ 0xC0 │
/// └──────┴──────────────────────┴──────────────────────────┴──────┘
/// ```
///
/// The header length is taken from `payload`.
pub fn encode_frame(header: &Header, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let mut header = *header;
    header.length = payload.len() as u16;

    dst.reserve(max_encoded_len(payload.len()));
    dst.put_u8(DELIMITER);
    for byte in header.encode() {
        encode_byte(dst, byte);
    }
    for &byte in payload {
        encode_byte(dst, byte);
    }
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Outcome of one [`decode_frame`] attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// No complete frame yet; nothing consumed.
    Incomplete,
    /// Bytes before the next delimiter that belong to no frame.
    Noise(usize),
    /// A complete frame with a valid header checksum.
    Frame { frame: Frame, consumed: usize },
    /// A complete but unusable frame; skip `consumed` bytes.
    Invalid { error: FrameError, consumed: usize },
}

impl Decoded {
    /// Bytes the caller should drop from the front of its buffer.
    pub fn consumed(&self) -> usize {
        match self {
            Decoded::Incomplete => 0,
            Decoded::Noise(n) => *n,
            Decoded::Frame { consumed, .. } | Decoded::Invalid { consumed, .. } => *consumed,
        }
    }
}

/// Try to decode one frame from the front of `src`.
///
/// A run of delimiters opens a frame and the next delimiter closes it. The
/// closing delimiter is never consumed: it doubles as the opening delimiter
/// of whatever follows, so a lost or stray `0xC0` costs at most one frame.
/// A buffer holding nothing but delimiters is [`Decoded::Incomplete`].
///
/// `slip` carries the escape flag; it is reset at every frame boundary and
/// whenever a frame is abandoned.
pub fn decode_frame(src: &[u8], slip: &mut SlipDecoder) -> Decoded {
    let Some(&first) = src.first() else {
        return Decoded::Incomplete;
    };

    if first != DELIMITER {
        let noise = src.iter().position(|&b| b == DELIMITER).unwrap_or(src.len());
        return Decoded::Noise(noise);
    }

    let start = src.iter().take_while(|&&b| b == DELIMITER).count();
    let Some(end) = src[start..].iter().position(|&b| b == DELIMITER).map(|i| i + start) else {
        let limit = max_encoded_len(MAX_PAYLOAD);
        if src.len() > limit {
            // Drop the opening delimiters; the rest is re-scanned as noise.
            return Decoded::Invalid {
                error: FrameError::Oversized(limit),
                consumed: start,
            };
        }
        return Decoded::Incomplete;
    };

    let consumed = end;
    slip.reset();

    let mut raw = BytesMut::with_capacity(end - start);
    for &byte in &src[start..end] {
        if let Err(error) = slip.decode_byte(&mut raw, byte) {
            slip.reset();
            return Decoded::Invalid { error, consumed };
        }
    }
    if slip.is_escaped() {
        slip.reset();
        return Decoded::Invalid {
            error: FrameError::InvalidEscape(DELIMITER),
            consumed,
        };
    }

    match Frame::from_raw(raw.freeze()) {
        Ok(frame) => Decoded::Frame { frame, consumed },
        Err(error) => Decoded::Invalid { error, consumed },
    }
}
