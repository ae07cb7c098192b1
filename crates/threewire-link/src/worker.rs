//! Delivery worker: one thread that drains the receive queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use threewire_frame::Frame;

use crate::error::{LinkError, Result};

pub(crate) struct Worker {
    stop_tx: Option<Sender<()>>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker. `deliver` runs on the worker thread for every frame
    /// popped while the worker has not been told to stop.
    pub fn spawn<F>(name: &str, rx: Receiver<Frame>, capacity: usize, mut deliver: F) -> Result<Self>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop_flag);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(rx) -> msg => {
                        let Ok(frame) = msg else { break };
                        if flag.load(Ordering::Acquire) {
                            break;
                        }

                        let depth = rx.len();
                        if depth > capacity / 2 {
                            tracing::info!(depth, capacity, "receive queue filling up");
                        }
                        deliver(frame);
                    }
                }
            })
            .map_err(LinkError::WorkerSpawn)?;

        tracing::debug!(worker = name, "delivery worker started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            stop_flag,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the thread and wait for it. Frames still queued stay queued.
    pub fn stop(&mut self) -> Result<()> {
        self.stop_flag.store(true, Ordering::Release);
        // Disconnecting wakes the select.
        self.stop_tx.take();

        match self.thread.take() {
            Some(thread) if thread.thread().id() == thread::current().id() => {
                // Called from inside the receive callback; the loop exits on
                // its own once the callback returns.
                Ok(())
            }
            Some(thread) => thread.join().map_err(|_| LinkError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(%err, "delivery worker did not exit cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;
    use threewire_frame::{Header, PacketType, SeqNum};

    use super::*;

    fn event(tag: u8) -> Frame {
        let header = Header::new(PacketType::Event, false, SeqNum::ZERO, SeqNum::ZERO, 0);
        Frame::new(header, &[tag]).unwrap()
    }

    #[test]
    fn delivers_in_order_then_stops() {
        let (tx, rx) = crossbeam_channel::bounded(10);
        let (seen_tx, seen_rx) = crossbeam_channel::unbounded();

        let mut worker = Worker::spawn("test-worker", rx, 10, move |frame: Frame| {
            seen_tx.send(frame.payload()[0]).unwrap();
        })
        .unwrap();
        assert!(worker.is_running());

        for tag in 0..4u8 {
            tx.send(event(tag)).unwrap();
        }
        let seen: Vec<u8> = (0..4)
            .map(|_| seen_rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(seen, vec![0, 1, 2, 3]);

        worker.stop().unwrap();
        assert!(!worker.is_running());
    }

    #[test]
    fn stop_does_not_drain() {
        let (tx, rx) = crossbeam_channel::bounded(10);
        let delivered = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&delivered);

        let mut worker = Worker::spawn("test-worker", rx.clone(), 10, move |_| {
            *count.lock() += 1;
        })
        .unwrap();
        worker.stop().unwrap();

        tx.send(event(1)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(*delivered.lock(), 0);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn panicking_callback_is_reported_on_stop() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut worker = Worker::spawn("test-worker", rx, 1, |_| panic!("boom")).unwrap();
        tx.send(event(0)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while worker.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(worker.stop(), Err(LinkError::WorkerPanicked)));
    }
}
