use std::fmt;

use crate::error::{FrameError, Result};

/// Header: flags/seq/ack (1) + type/len-lo (1) + len-hi (1) + checksum (1).
pub const HEADER_SIZE: usize = 4;

/// Largest payload expressible in the 12-bit length field.
pub const MAX_PAYLOAD: usize = 0x0FFF;

/// A 3-bit sequence or acknowledgment number (modulo 8).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeqNum(u8);

impl SeqNum {
    pub const ZERO: SeqNum = SeqNum(0);

    /// Build from any value, keeping the low three bits.
    pub const fn wrapping(value: u8) -> Self {
        Self(value & 0x07)
    }

    /// Build from a value that must already be in `0..=7`.
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 7 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The successor modulo 8.
    pub const fn next(self) -> Self {
        Self::wrapping(self.0 + 1)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SeqNum> for u8 {
    fn from(value: SeqNum) -> Self {
        value.0
    }
}

/// The 4-bit packet type carried in header byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Acknowledgment-only frame (no payload).
    Ack,
    /// HCI command.
    Command,
    /// ACL data.
    Acl,
    /// SCO data.
    Sco,
    /// HCI event.
    Event,
    /// ISO data.
    Iso,
    /// Vendor specific.
    Vendor,
    /// Link establishment and power management.
    LinkControl,
    /// Any other nibble value.
    Reserved(u8),
}

impl PacketType {
    /// The wire nibble.
    pub const fn code(self) -> u8 {
        match self {
            PacketType::Ack => 0x0,
            PacketType::Command => 0x1,
            PacketType::Acl => 0x2,
            PacketType::Sco => 0x3,
            PacketType::Event => 0x4,
            PacketType::Iso => 0x5,
            PacketType::Vendor => 0xE,
            PacketType::LinkControl => 0xF,
            PacketType::Reserved(code) => code & 0x0F,
        }
    }

    /// Decode a nibble (upper bits are ignored).
    pub const fn from_code(code: u8) -> Self {
        match code & 0x0F {
            0x0 => PacketType::Ack,
            0x1 => PacketType::Command,
            0x2 => PacketType::Acl,
            0x3 => PacketType::Sco,
            0x4 => PacketType::Event,
            0x5 => PacketType::Iso,
            0xE => PacketType::Vendor,
            0xF => PacketType::LinkControl,
            other => PacketType::Reserved(other),
        }
    }

    /// Whether frames of this type are sent with the reliable bit and a
    /// sequence number.
    pub const fn is_reliable(self) -> bool {
        matches!(self, PacketType::Command | PacketType::Acl)
    }

    /// Whether this type carries application traffic that is handed to the
    /// receive callback.
    pub const fn is_deliverable(self) -> bool {
        matches!(
            self,
            PacketType::Event | PacketType::Acl | PacketType::Sco | PacketType::Iso
        )
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Ack => "ACK",
            PacketType::Command => "COMMAND",
            PacketType::Acl => "ACL",
            PacketType::Sco => "SCO",
            PacketType::Event => "EVENT",
            PacketType::Iso => "ISO",
            PacketType::Vendor => "VENDOR",
            PacketType::LinkControl => "LINK_CONTROL",
            PacketType::Reserved(_) => "RESERVED",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded three-wire packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub seq: SeqNum,
    pub ack: SeqNum,
    /// A 16-bit data integrity check follows the payload.
    pub crc_present: bool,
    pub reliable: bool,
    pub packet_type: PacketType,
    /// Payload length, `0..=4095`.
    pub length: u16,
}

impl Header {
    /// Build a header.
    ///
    /// # Panics
    ///
    /// Panics if `length` exceeds [`MAX_PAYLOAD`]; oversized payloads must be
    /// rejected before framing.
    pub fn new(
        packet_type: PacketType,
        reliable: bool,
        seq: SeqNum,
        ack: SeqNum,
        length: usize,
    ) -> Self {
        assert!(
            length <= MAX_PAYLOAD,
            "H5 payload length {length} exceeds {MAX_PAYLOAD}"
        );
        Self {
            seq,
            ack,
            crc_present: false,
            reliable,
            packet_type,
            length: length as u16,
        }
    }

    /// Serialize into the four header bytes, checksum included.
    ///
    /// ```text
    /// byte0: seq[0:2] | ack[3:5] | crc_present[6] | reliable[7]
    /// byte1: type[0:3] | len[0:3] << 4
    /// byte2: len[4:11]
    /// byte3: ~(byte0 + byte1 + byte2)
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut hdr = [0u8; HEADER_SIZE];
        hdr[0] = self.seq.get() | (self.ack.get() << 3);
        if self.crc_present {
            hdr[0] |= 1 << 6;
        }
        if self.reliable {
            hdr[0] |= 1 << 7;
        }
        hdr[1] = self.packet_type.code() | (((self.length & 0x0F) as u8) << 4);
        hdr[2] = (self.length >> 4) as u8;
        hdr[3] = checksum(hdr[0], hdr[1], hdr[2]);
        hdr
    }

    /// Parse and verify the first four bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::ShortHeader(bytes.len()));
        }

        let expected = checksum(bytes[0], bytes[1], bytes[2]);
        if expected != bytes[3] {
            return Err(FrameError::HeaderChecksum {
                expected,
                actual: bytes[3],
            });
        }

        Ok(Self {
            seq: SeqNum::wrapping(bytes[0]),
            ack: SeqNum::wrapping(bytes[0] >> 3),
            crc_present: bytes[0] & (1 << 6) != 0,
            reliable: bytes[0] & (1 << 7) != 0,
            packet_type: PacketType::from_code(bytes[1]),
            length: u16::from(bytes[1] >> 4) | (u16::from(bytes[2]) << 4),
        })
    }

    /// Payload length as `usize`.
    pub fn payload_len(&self) -> usize {
        usize::from(self.length)
    }
}

/// Header checksum: one's complement of the byte sum.
#[inline]
pub fn checksum(b0: u8, b1: u8, b2: u8) -> u8 {
    !(b0.wrapping_add(b1).wrapping_add(b2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seqnum_wraps_modulo_eight() {
        assert_eq!(SeqNum::wrapping(7).next(), SeqNum::ZERO);
        assert_eq!(SeqNum::wrapping(9).get(), 1);
        assert_eq!(SeqNum::new(8), None);
        assert_eq!(SeqNum::new(3).map(SeqNum::get), Some(3));
    }

    #[test]
    fn packet_type_codes() {
        for code in 0..16u8 {
            assert_eq!(PacketType::from_code(code).code(), code);
        }
        assert_eq!(PacketType::from_code(0x0F), PacketType::LinkControl);
        assert_eq!(PacketType::from_code(0x07), PacketType::Reserved(7));
        assert!(PacketType::Acl.is_reliable());
        assert!(PacketType::Command.is_reliable());
        assert!(!PacketType::Event.is_reliable());
        assert!(!PacketType::LinkControl.is_reliable());
        assert!(PacketType::Iso.is_deliverable());
        assert!(!PacketType::Ack.is_deliverable());
    }

    #[test]
    fn known_encoding() {
        // Reliable ACL, seq 0, ack 0, 3-byte payload.
        let hdr = Header::new(PacketType::Acl, true, SeqNum::ZERO, SeqNum::ZERO, 3);
        assert_eq!(hdr.encode(), [0x80, 0x32, 0x00, 0x4D]);

        // Unreliable link control, ack 5, 2-byte payload.
        let hdr = Header::new(PacketType::LinkControl, false, SeqNum::ZERO, SeqNum::wrapping(5), 2);
        let bytes = hdr.encode();
        assert_eq!(bytes[0], 0x28);
        assert_eq!(bytes[1], 0x2F);
        assert_eq!(bytes[2], 0x00);
    }

    #[test]
    fn roundtrip_across_fields() {
        let lengths = [0usize, 1, 15, 16, 255, 256, 1000, MAX_PAYLOAD];
        for seq in 0..8u8 {
            for ack in 0..8u8 {
                for &length in &lengths {
                    let mut hdr = Header::new(
                        PacketType::from_code(seq + ack),
                        (seq + ack) % 2 == 0,
                        SeqNum::wrapping(seq),
                        SeqNum::wrapping(ack),
                        length,
                    );
                    hdr.crc_present = seq % 3 == 0;
                    assert_eq!(Header::decode(&hdr.encode()).unwrap(), hdr);
                }
            }
        }
    }

    #[test]
    fn checksum_catches_single_byte_corruption() {
        let hdr = Header::new(PacketType::Event, false, SeqNum::ZERO, SeqNum::wrapping(2), 300);
        let good = hdr.encode();
        assert_eq!(
            good[0].wrapping_add(good[1]).wrapping_add(good[2]).wrapping_add(good[3]),
            0xFF
        );

        for index in 0..3 {
            for flip in 1..=255u8 {
                let mut bad = good;
                bad[index] ^= flip;
                assert!(
                    matches!(Header::decode(&bad), Err(FrameError::HeaderChecksum { .. })),
                    "corruption of byte {index} by {flip:#04x} went unnoticed"
                );
            }
        }
    }

    #[test]
    fn short_input_rejected() {
        assert_eq!(Header::decode(&[0x00, 0x00]), Err(FrameError::ShortHeader(2)));
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn oversized_length_panics() {
        let _ = Header::new(PacketType::Acl, true, SeqNum::ZERO, SeqNum::ZERO, MAX_PAYLOAD + 1);
    }
}
