use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};

const READ_CHUNK_SIZE: usize = 1024;

/// Default cap on bytes held while the intake keeps asking for more.
pub const DEFAULT_MAX_BUFFERED: usize = 64 * 1024;

/// Holds unconsumed receive bytes between intake calls.
///
/// The intake callback returns how many bytes it consumed. Zero means "need
/// more bytes": the remainder stays buffered and is offered again, with the
/// next chunk appended, on the following [`feed`](Self::feed).
#[derive(Debug)]
pub struct RxAccumulator {
    buf: BytesMut,
    max_buffered: usize,
}

impl Default for RxAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl RxAccumulator {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_BUFFERED)
    }

    /// Create an accumulator that discards its backlog past `max_buffered` bytes.
    pub fn with_limit(max_buffered: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            max_buffered,
        }
    }

    /// Append `chunk` and offer the buffered bytes to `intake` until it stops
    /// consuming. Returns the number of bytes consumed by this call.
    pub fn feed<F>(&mut self, chunk: &[u8], mut intake: F) -> usize
    where
        F: FnMut(&[u8]) -> usize,
    {
        self.buf.extend_from_slice(chunk);

        let mut total = 0usize;
        while !self.buf.is_empty() {
            let consumed = intake(&self.buf[..]).min(self.buf.len());
            if consumed == 0 {
                break;
            }
            self.buf.advance(consumed);
            total += consumed;
        }

        if self.buf.len() > self.max_buffered {
            tracing::warn!(
                buffered = self.buf.len(),
                max = self.max_buffered,
                "receive backlog exceeded limit, discarding"
            );
            self.buf.clear();
        }

        total
    }

    /// Bytes waiting for more data.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Handle to a running reader thread created by [`spawn_reader`].
#[derive(Debug)]
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Ask the reader to exit.
    ///
    /// A blocking `read` only notices this after it returns, so pair it with a
    /// read timeout on the device or with closing the stream.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether the reader thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the reader thread to exit.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("reader thread panicked");
            }
        }
    }
}

/// Spawn a thread that reads chunks from `reader` and drives `intake` with
/// them through an [`RxAccumulator`].
///
/// The thread exits on EOF, on a non-transient I/O error, or once
/// [`ReaderHandle::stop`] was called and the next read returns.
pub fn spawn_reader<R, F>(name: &str, mut reader: R, mut intake: F) -> Result<ReaderHandle>
where
    R: Read + Send + 'static,
    F: FnMut(&[u8]) -> usize + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    let thread = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut acc = RxAccumulator::new();
            let mut chunk = [0u8; READ_CHUNK_SIZE];

            while !thread_stop.load(Ordering::SeqCst) {
                let read = match reader.read(&mut chunk) {
                    Ok(0) => {
                        tracing::debug!("serial reader reached EOF");
                        break;
                    }
                    Ok(n) => n,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err)
                        if err.kind() == ErrorKind::WouldBlock
                            || err.kind() == ErrorKind::TimedOut =>
                    {
                        continue
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "serial read failed");
                        break;
                    }
                };

                acc.feed(&chunk[..read], &mut intake);
            }
        })
        .map_err(TransportError::Spawn)?;

    Ok(ReaderHandle {
        stop,
        thread: Some(thread),
    })
}
