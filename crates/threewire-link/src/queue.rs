//! Bounded FIFO between the intake context and the delivery worker.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use threewire_frame::Frame;

use crate::error::{LinkError, Result};

/// Fixed-capacity receive queue. A full queue rejects the newest frame.
#[derive(Debug, Clone)]
pub struct RxQueue {
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
    capacity: usize,
}

impl RxQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Enqueue without blocking. Returns the free slots left afterwards.
    pub fn push(&self, frame: Frame) -> Result<usize> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(self.free()),
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                Err(LinkError::QueueFull {
                    capacity: self.capacity,
                })
            }
        }
    }

    pub fn try_pop(&self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Consumer side, for `select!`.
    pub fn receiver(&self) -> &Receiver<Frame> {
        &self.rx
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    /// Discard everything queued. Returns how many frames were dropped.
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }
}

#[cfg(test)]
mod tests {
    use threewire_frame::{Header, PacketType, SeqNum};

    use super::*;

    fn event(tag: u8) -> Frame {
        let header = Header::new(PacketType::Event, false, SeqNum::ZERO, SeqNum::ZERO, 0);
        Frame::new(header, &[tag]).unwrap()
    }

    #[test]
    fn full_queue_drops_newest() {
        let queue = RxQueue::new(10);
        let mut dropped = 0;
        for tag in 0..15u8 {
            if queue.push(event(tag)).is_err() {
                dropped += 1;
            }
        }
        assert_eq!(queue.len(), 10);
        assert_eq!(dropped, 5);

        let kept: Vec<u8> = std::iter::from_fn(|| queue.try_pop())
            .map(|f| f.payload()[0])
            .collect();
        assert_eq!(kept, (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn push_reports_free_slots() {
        let queue = RxQueue::new(3);
        assert_eq!(queue.push(event(0)).unwrap(), 2);
        assert_eq!(queue.push(event(1)).unwrap(), 1);
        assert_eq!(queue.push(event(2)).unwrap(), 0);
        assert!(matches!(
            queue.push(event(3)),
            Err(LinkError::QueueFull { capacity: 3 })
        ));
    }

    #[test]
    fn clear_empties_queue() {
        let queue = RxQueue::new(4);
        queue.push(event(0)).unwrap();
        queue.push(event(1)).unwrap();
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.free(), 4);
    }
}
