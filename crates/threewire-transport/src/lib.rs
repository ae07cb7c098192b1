//! Serial-side collaborator interface for the three-wire engine.
//!
//! The engine never talks to a UART driver directly. It hands finished frames
//! to a [`SerialSink`] and is fed raw byte chunks by whoever owns the receive
//! side:
//! - [`WriteSink`] adapts any `std::io::Write` (a serial device, a socket)
//! - [`CaptureSink`] records every transmitted buffer, for tests and loopbacks
//! - [`RxAccumulator`] and [`spawn_reader`] implement the "consumed count"
//!   intake contract on top of any `std::io::Read`
//!
//! This is the lowest layer of threewire. Everything else builds on top of
//! the [`SerialSink`] trait provided here.

pub mod capture;
pub mod error;
pub mod pump;
pub mod traits;

pub use capture::CaptureSink;
pub use error::{Result, TransportError};
pub use pump::{spawn_reader, ReaderHandle, RxAccumulator};
pub use traits::{SerialSink, WriteSink};
