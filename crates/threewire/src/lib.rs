//! Three-wire (H5) UART transport.
//!
//! threewire carries an HCI-style byte stream (commands, events, ACL/SCO/ISO
//! data) over a plain asynchronous serial line: SLIP byte-stuffing, a
//! checksummed four-byte header, modulo-8 sequencing with acknowledgments,
//! and the SYNC/CONFIG link establishment handshake.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial-side plumbing (sinks, intake accumulator, reader thread)
//! - [`frame`]: SLIP, header and link-control codecs; `H5Codec` behind `async`
//! - [`link`]: the protocol engine, `H5Link` (behind the default `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use threewire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use threewire_frame::*;
}

/// Re-export link engine types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use threewire_link::*;
}
