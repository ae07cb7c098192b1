//! `tokio_util::codec` adapter for async serial streams.
//!
//! The codec only frames: it skips noise and invalid frames and yields every
//! checksum-valid [`Frame`]. Sequencing and acknowledgment stay with the link
//! engine.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Decoded, Frame};
use crate::slip::{SlipDecoder, DELIMITER};

#[derive(Debug, Default)]
pub struct H5Codec {
    slip: SlipDecoder,
}

impl H5Codec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for H5Codec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        loop {
            match decode_frame(src, &mut self.slip) {
                Decoded::Incomplete => return Ok(None),
                Decoded::Noise(n) => src.advance(n),
                Decoded::Invalid { error, consumed } => {
                    tracing::warn!(%error, "dropping invalid frame");
                    src.advance(consumed);
                }
                Decoded::Frame { frame, consumed } => {
                    src.advance(consumed);
                    return Ok(Some(frame));
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        // The last closing delimiter is never consumed by `decode`.
        if src.iter().all(|&b| b == DELIMITER) {
            src.clear();
            return Ok(None);
        }
        Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "partial frame at end of stream",
        ))
    }
}

impl Encoder<Frame> for H5Codec {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), io::Error> {
        encode_frame(item.header(), &item.payload(), dst)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio_util::codec::FramedRead;

    use super::*;
    use crate::header::{Header, PacketType, SeqNum};

    fn frame(packet_type: PacketType, payload: &[u8]) -> Frame {
        let header = Header::new(packet_type, false, SeqNum::ZERO, SeqNum::ZERO, 0);
        Frame::new(header, payload).unwrap()
    }

    #[tokio::test]
    async fn framed_read_skips_noise_and_bad_frames() {
        let mut codec = H5Codec::new();
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&[0x00, 0x01]);
        codec.encode(frame(PacketType::Event, b"one"), &mut wire).unwrap();
        wire.extend_from_slice(&[0xC0, 0x00, 0x00, 0x00, 0x00, 0xC0]);
        codec.encode(frame(PacketType::Sco, b"two"), &mut wire).unwrap();

        let bytes = wire.to_vec();
        let mut reader = FramedRead::new(bytes.as_slice(), H5Codec::new());

        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(first.packet_type(), PacketType::Event);
        assert_eq!(first.payload().as_ref(), b"one");

        let second = reader.next().await.unwrap().unwrap();
        assert_eq!(second.packet_type(), PacketType::Sco);
        assert_eq!(second.payload().as_ref(), b"two");

        assert!(reader.next().await.is_none());
    }

    #[test]
    fn decode_waits_for_closing_delimiter() {
        let mut codec = H5Codec::new();
        let mut wire = BytesMut::new();
        codec.encode(frame(PacketType::Iso, b"late"), &mut wire).unwrap();

        let tail = wire.split_off(wire.len() - 1);
        assert!(codec.decode(&mut wire).unwrap().is_none());

        wire.unsplit(tail);
        let decoded = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(decoded.payload().as_ref(), b"late");
        assert_eq!(&wire[..], &[DELIMITER]);
        assert!(codec.decode_eof(&mut wire).unwrap().is_none());
        assert!(wire.is_empty());
    }

    #[test]
    fn decode_eof_rejects_partial_frame() {
        let mut codec = H5Codec::new();
        let mut wire = BytesMut::from(&[DELIMITER, 0x80, 0x01][..]);
        let err = codec.decode_eof(&mut wire).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
