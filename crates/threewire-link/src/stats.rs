use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time copy of the link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Frames with a valid header checksum.
    pub frames_received: u64,
    /// Frames that passed state and sequencing checks.
    pub frames_accepted: u64,
    /// Frames dropped for a header checksum mismatch.
    pub checksum_errors: u64,
    /// Frames dropped for bad escapes, short headers or truncation.
    pub framing_errors: u64,
    /// Bytes skipped outside any frame.
    pub noise_bytes: u64,
    /// Application frames dropped because the link was not active.
    pub not_active_drops: u64,
    /// Reliable frames dropped as out of order.
    pub out_of_order: u64,
    /// SYNC_REQ emitted because of repeated out-of-order frames.
    pub resyncs: u64,
    /// Frames dropped because the receive queue was full.
    pub queue_drops: u64,
    /// Packets handed to the receive callback.
    pub packets_delivered: u64,
    /// Frames written to the sink.
    pub frames_sent: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub frames_received: AtomicU64,
    pub frames_accepted: AtomicU64,
    pub checksum_errors: AtomicU64,
    pub framing_errors: AtomicU64,
    pub noise_bytes: AtomicU64,
    pub not_active_drops: AtomicU64,
    pub out_of_order: AtomicU64,
    pub resyncs: AtomicU64,
    pub queue_drops: AtomicU64,
    pub packets_delivered: AtomicU64,
    pub frames_sent: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LinkStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        LinkStats {
            frames_received: get(&self.frames_received),
            frames_accepted: get(&self.frames_accepted),
            checksum_errors: get(&self.checksum_errors),
            framing_errors: get(&self.framing_errors),
            noise_bytes: get(&self.noise_bytes),
            not_active_drops: get(&self.not_active_drops),
            out_of_order: get(&self.out_of_order),
            resyncs: get(&self.resyncs),
            queue_drops: get(&self.queue_drops),
            packets_delivered: get(&self.packets_delivered),
            frames_sent: get(&self.frames_sent),
        }
    }
}
