//! SLIP byte-stuffing and H5 header codec for three-wire UART links.
//!
//! Every frame on the wire is:
//! - a `0xC0` delimiter
//! - the SLIP-escaped 4-byte header (sequence, ack, flags, type, length, checksum)
//! - the SLIP-escaped payload (0..=4095 bytes)
//! - a closing `0xC0` delimiter
//!
//! This crate is pure codec: it holds no sequencing state. The reliability
//! and link-control logic lives in `threewire-link`.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod header;
pub mod link;
pub mod slip;

#[cfg(feature = "async")]
pub use async_codec::H5Codec;
pub use codec::{decode_frame, encode_frame, max_encoded_len, Decoded, Frame};
pub use error::{FrameError, Result};
pub use header::{Header, PacketType, SeqNum, HEADER_SIZE, MAX_PAYLOAD};
pub use link::{LinkMessage, MAX_WINDOW};
pub use slip::{slip_decode, slip_encode, SlipDecoder};
