use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::Result;
use crate::traits::SerialSink;

/// A [`SerialSink`] that keeps every transmitted buffer in memory.
///
/// Used to wire two engines together without a device: drain one side's
/// capture and feed it to the other side's intake.
#[derive(Debug, Default)]
pub struct CaptureSink {
    sent: Mutex<Vec<Bytes>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffer transmitted since the last call, oldest first.
    pub fn take(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Take everything transmitted since the last call as one contiguous stream.
    pub fn take_stream(&self) -> Vec<u8> {
        self.take().iter().flat_map(|b| b.iter().copied()).collect()
    }

    /// Number of buffers waiting to be taken.
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl SerialSink for CaptureSink {
    fn transmit(&self, bytes: &[u8]) -> Result<()> {
        self.sent.lock().push(Bytes::copy_from_slice(bytes));
        Ok(())
    }
}
