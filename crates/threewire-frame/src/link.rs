//! Link-control payloads (packet type 15).
//!
//! Each message is a fixed two-byte signature; the CONFIG messages may carry
//! one extra configuration byte whose low three bits are the sliding window.

use std::fmt;

/// Largest sliding window expressible in the 3-bit config field.
pub const MAX_WINDOW: u8 = 7;

const SYNC_REQ: [u8; 2] = [0x01, 0x7E];
const SYNC_RESP: [u8; 2] = [0x02, 0x7D];
const CONFIG_REQ: [u8; 2] = [0x03, 0xFC];
const CONFIG_RESP: [u8; 2] = [0x04, 0x7B];
const SLEEP_REQ: [u8; 2] = [0x05, 0xFA];
const WOKEN_REQ: [u8; 2] = [0x06, 0xF9];
const WAKEUP_REQ: [u8; 2] = [0x07, 0x78];

/// A link-control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMessage {
    SyncReq,
    SyncResp,
    /// Carries the sender's advertised window.
    ConfigReq { window: u8 },
    /// The window byte is optional on the wire.
    ConfigResp { window: Option<u8> },
    SleepReq,
    WokenReq,
    WakeupReq,
}

impl LinkMessage {
    /// Recognize a link-control payload. Returns `None` for anything shorter
    /// than two bytes or with an unknown signature.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let signature: [u8; 2] = payload.get(..2)?.try_into().ok()?;
        let config = payload.get(2).map(|b| b & MAX_WINDOW);

        let msg = match signature {
            SYNC_REQ => LinkMessage::SyncReq,
            SYNC_RESP => LinkMessage::SyncResp,
            CONFIG_REQ => LinkMessage::ConfigReq {
                window: config.unwrap_or(0),
            },
            CONFIG_RESP => LinkMessage::ConfigResp { window: config },
            SLEEP_REQ => LinkMessage::SleepReq,
            WOKEN_REQ => LinkMessage::WokenReq,
            WAKEUP_REQ => LinkMessage::WakeupReq,
            _ => return None,
        };
        Some(msg)
    }

    /// Wire payload for this message.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            LinkMessage::SyncReq => SYNC_REQ.to_vec(),
            LinkMessage::SyncResp => SYNC_RESP.to_vec(),
            LinkMessage::ConfigReq { window } => {
                vec![CONFIG_REQ[0], CONFIG_REQ[1], window & MAX_WINDOW]
            }
            LinkMessage::ConfigResp { window: Some(window) } => {
                vec![CONFIG_RESP[0], CONFIG_RESP[1], window & MAX_WINDOW]
            }
            LinkMessage::ConfigResp { window: None } => CONFIG_RESP.to_vec(),
            LinkMessage::SleepReq => SLEEP_REQ.to_vec(),
            LinkMessage::WokenReq => WOKEN_REQ.to_vec(),
            LinkMessage::WakeupReq => WAKEUP_REQ.to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LinkMessage::SyncReq => "SYNC_REQ",
            LinkMessage::SyncResp => "SYNC_RESP",
            LinkMessage::ConfigReq { .. } => "CONFIG_REQ",
            LinkMessage::ConfigResp { .. } => "CONFIG_RESP",
            LinkMessage::SleepReq => "SLEEP_REQ",
            LinkMessage::WokenReq => "WOKEN_REQ",
            LinkMessage::WakeupReq => "WAKEUP_REQ",
        }
    }
}

impl fmt::Display for LinkMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
