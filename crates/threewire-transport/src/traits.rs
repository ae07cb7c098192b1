use std::io::{ErrorKind, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, TransportError};

/// The transmit half of a serial link.
///
/// Implementations accept one complete, already SLIP-encoded frame per call
/// and write it out synchronously. There is no send queue behind this trait:
/// a slow device stalls the caller.
pub trait SerialSink: Send + Sync {
    /// Transmit one encoded frame.
    fn transmit(&self, bytes: &[u8]) -> Result<()>;
}

impl<S: SerialSink + ?Sized> SerialSink for Arc<S> {
    fn transmit(&self, bytes: &[u8]) -> Result<()> {
        (**self).transmit(bytes)
    }
}

impl<S: SerialSink + ?Sized> SerialSink for Box<S> {
    fn transmit(&self, bytes: &[u8]) -> Result<()> {
        (**self).transmit(bytes)
    }
}

/// Adapts any `Write` stream (serial device file, socket) into a [`SerialSink`].
///
/// Writes are serialized through an internal lock so that concurrent senders
/// never interleave bytes of two frames.
pub struct WriteSink<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> WriteSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Consume the sink and return the inner writer.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: Write + Send> SerialSink for WriteSink<W> {
    fn transmit(&self, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();

        let mut offset = 0usize;
        while offset < bytes.len() {
            match inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<W> std::fmt::Debug for WriteSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn writes_whole_buffer() {
        let sink = WriteSink::new(Cursor::new(Vec::<u8>::new()));
        sink.transmit(&[0xC0, 0x01, 0xC0]).unwrap();
        sink.transmit(&[0xC0, 0x02, 0xC0]).unwrap();

        let wire = sink.into_inner().into_inner();
        assert_eq!(wire, vec![0xC0, 0x01, 0xC0, 0xC0, 0x02, 0xC0]);
    }

    #[test]
    fn arc_sink_forwards() {
        let sink: Arc<dyn SerialSink> = Arc::new(WriteSink::new(Cursor::new(Vec::<u8>::new())));
        sink.transmit(b"abc").unwrap();
    }

    #[test]
    fn handles_interrupted_and_would_block() {
        let sink = WriteSink::new(FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
            data: Vec::new(),
            flushed: Arc::new(AtomicBool::new(false)),
        });
        sink.transmit(b"retry").unwrap();

        let inner = sink.into_inner();
        assert_eq!(inner.data, b"retry");
        assert!(inner.flushed.load(Ordering::SeqCst));
    }

    #[test]
    fn zero_write_means_closed() {
        let sink = WriteSink::new(ZeroWriter);
        let err = sink.transmit(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn hard_io_error_propagates() {
        let sink = WriteSink::new(FlakyWriter {
            failures: vec![ErrorKind::BrokenPipe],
            data: Vec::new(),
            flushed: Arc::new(AtomicBool::new(false)),
        });
        let err = sink.transmit(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        data: Vec<u8>,
        flushed: Arc<AtomicBool>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.failures.is_empty() {
                return Err(std::io::Error::from(self.failures.remove(0)));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
