//! Three-wire (H5) reliability, link control and delivery engine.
//!
//! This is the layer applications talk to. An [`H5Link`] owns the protocol
//! state for one serial session: it answers the SYNC/CONFIG handshake,
//! enforces in-order delivery of reliable frames, acknowledges what it
//! accepted, and hands application packets to a worker thread that invokes
//! the registered receive callback.
//!
//! Unacknowledged reliable frames are never retransmitted. The peer's
//! acknowledgment number is tracked but only out-of-order detection (three
//! strikes, then a fresh SYNC) recovers a desynchronized link.

pub mod config;
pub mod control;
pub mod error;
pub mod link;
pub mod queue;
pub mod reliability;
pub mod state;
pub mod stats;
mod worker;

pub use config::LinkConfig;
pub use control::{ControlOutcome, LinkControl};
pub use error::{LinkError, Result};
pub use link::{H5Link, InitCallback, Intake, Packet, ReceiveCallback};
pub use queue::RxQueue;
pub use reliability::{Inbound, Reliability};
pub use state::{LinkState, SeqCounters, SleepState};
pub use stats::LinkStats;
pub use threewire_frame::PacketType;
