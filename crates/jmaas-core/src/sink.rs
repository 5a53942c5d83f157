//! Output plumbing between a running job and the callers watching it.
//!
//! A [`RedirectableSink`] tees every chunk to two destinations:
//! - the *primary* destination supplied by the submitter, which stays bound for the whole run;
//! - the *attached* destination, initially a discard sink, which any caller holding the job key may re-point at any time.
//!
//! Destinations are plain blocking writers. A destination whose write fails (typically a caller that went away) is
//! detached and replaced by a discard sink; the producer never sees the error.
use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use jmaas_model::JobKey;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Owned byte destination.
pub type Destination = Box<dyn Write + Send>;

/// Destination that drops everything written to it.
pub fn discard() -> Destination {
    Box::new(io::sink())
}

/// Destination writing to the process standard output.
pub fn stdout() -> Destination {
    Box::new(io::stdout())
}

/// Chunks buffered by a [`stream`] destination before its reader counts as stalled.
pub const STREAM_CAPACITY: usize = 256;

/// Destination forwarding chunks to an async reader, buffering at most [`STREAM_CAPACITY`] chunks.
///
/// The returned [`OutputStream`] ends once the destination is dropped, i.e. when the sink re-points elsewhere or the
/// job is cleaned up. Dropping the stream, or falling behind by a full buffer, detaches the destination on the next
/// write.
pub fn stream() -> (Destination, OutputStream) {
    stream_with_capacity(STREAM_CAPACITY)
}

/// [`stream`] with an explicit buffer size (at least one chunk).
pub fn stream_with_capacity(capacity: usize) -> (Destination, OutputStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Box::new(ChannelWriter { tx }), OutputStream { rx })
}

struct ChannelWriter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.tx.try_send(buf.to_vec()) {
            Ok(()) => Ok(buf.len()),
            Err(TrySendError::Full(_)) => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "output stream reader fell behind",
            )),
            Err(TrySendError::Closed(_)) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output stream receiver dropped",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Async receiving side of [`stream`].
#[derive(Debug)]
pub struct OutputStream {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl OutputStream {
    /// Next chunk, or `None` once the destination was released.
    pub async fn next(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Drain the stream until the destination is released.
    pub async fn collect(mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk);
        }
        out
    }
}

/// In-memory destination; clones share the same buffer.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boxed clone usable as a [`Destination`].
    pub fn destination(&self) -> Destination {
        Box::new(self.clone())
    }

    pub fn contents(&self) -> Vec<u8> {
        lock(&self.0).clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&lock(&self.0)).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture")
            .field("len", &lock(&self.0).len())
            .finish()
    }
}

type Slot = Arc<Mutex<Destination>>;

struct Attached {
    dest: Slot,
    closed: bool,
}

fn slot(dest: Destination) -> Slot {
    Arc::new(Mutex::new(dest))
}

/// Tee sink with a swappable second destination.
///
/// The primary and attached destinations sit behind separate locks: re-pointing the attached side never waits on a
/// slow primary. The attached lock only guards the swap; a write clones the current slot and writes to it outside
/// that lock, so a chunk lands entirely in the old or entirely in the new destination and a slow attached
/// destination never holds up [`rebind`](Self::rebind).
pub struct RedirectableSink {
    key: JobKey,
    primary: Mutex<Destination>,
    attached: Mutex<Attached>,
}

impl RedirectableSink {
    pub fn new(key: JobKey, primary: Destination) -> Self {
        Self {
            key,
            primary: Mutex::new(primary),
            attached: Mutex::new(Attached {
                dest: slot(discard()),
                closed: false,
            }),
        }
    }

    #[inline]
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    /// Forward `buf` to the primary and the attached destination.
    pub fn write(&self, buf: &[u8]) {
        if buf.is_empty() {
            return;
        }

        {
            let mut primary = lock(&self.primary);
            if let Err(e) = primary.write_all(buf) {
                warn!(target: "jmaas.core.sink", key = %self.key, error = %e, "primary destination failed; detaching it");
                *primary = discard();
            }
        }

        let current = self.current();
        let written = lock(&*current).write_all(buf);
        if let Err(e) = written {
            warn!(target: "jmaas.core.sink", key = %self.key, error = %e, "attached destination failed; detaching it");
            let mut attached = lock(&self.attached);
            if Arc::ptr_eq(&attached.dest, &current) {
                attached.dest = slot(discard());
            }
        }
    }

    /// Replace the attached destination with `dest`, then flush the previous one unless a write still holds it.
    ///
    /// Returns `false` (dropping `dest`) once the sink has been closed by cleanup.
    pub fn rebind(&self, dest: Destination) -> bool {
        let previous = {
            let mut attached = lock(&self.attached);
            if attached.closed {
                return false;
            }
            std::mem::replace(&mut attached.dest, slot(dest))
        };

        if let Ok(mut guard) = previous.try_lock()
            && let Err(e) = guard.flush()
        {
            debug!(target: "jmaas.core.sink", key = %self.key, error = %e, "flush of previous destination failed");
        }
        true
    }

    /// Flush both destinations.
    pub fn flush(&self) -> io::Result<()> {
        let primary = lock(&self.primary).flush();
        let current = self.current();
        let attached = lock(&*current).flush();
        primary.and(attached)
    }

    /// Final flush; both destinations are released and later [`rebind`](Self::rebind) calls are refused.
    ///
    /// Destinations are released even when the flush fails.
    pub fn close(&self) -> io::Result<()> {
        let primary = {
            let mut primary = lock(&self.primary);
            let flushed = primary.flush();
            *primary = discard();
            flushed
        };

        let previous = {
            let mut attached = lock(&self.attached);
            attached.closed = true;
            std::mem::replace(&mut attached.dest, slot(discard()))
        };
        let flushed = lock(&*previous).flush();

        primary.and(flushed)
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.attached).closed
    }

    fn current(&self) -> Slot {
        Arc::clone(&lock(&self.attached).dest)
    }
}

impl fmt::Debug for RedirectableSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectableSink")
            .field("key", &self.key)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    fn sink_with_primary() -> (RedirectableSink, Capture) {
        let primary = Capture::new();
        let sink = RedirectableSink::new(JobKey::from("t1"), primary.destination());
        (sink, primary)
    }

    #[test]
    fn unattached_output_only_reaches_primary() {
        let (sink, primary) = sink_with_primary();
        sink.write(b"hello");
        assert_eq!(primary.contents(), b"hello");
    }

    #[test]
    fn rebind_splits_output_between_destinations() {
        let (sink, primary) = sink_with_primary();
        let a = Capture::new();
        let b = Capture::new();

        assert!(sink.rebind(a.destination()));
        sink.write(b"one;");
        assert!(sink.rebind(b.destination()));
        sink.write(b"two;");

        assert_eq!(a.contents(), b"one;");
        assert_eq!(b.contents(), b"two;");
        assert_eq!(primary.contents(), b"one;two;");
    }

    #[test]
    fn closed_sink_refuses_rebind_and_discards_writes() {
        let (sink, primary) = sink_with_primary();
        let late = Capture::new();

        sink.write(b"before");
        sink.close().unwrap();
        assert!(sink.is_closed());
        assert!(!sink.rebind(late.destination()));

        sink.write(b"after");
        assert_eq!(primary.contents(), b"before");
        assert!(late.contents().is_empty());
    }

    #[test]
    fn failing_destination_is_detached_without_stopping_the_tee() {
        let (sink, primary) = sink_with_primary();
        assert!(sink.rebind(Box::new(Broken)));

        sink.write(b"a");
        sink.write(b"b");
        assert_eq!(primary.contents(), b"ab");

        let next = Capture::new();
        assert!(sink.rebind(next.destination()));
        sink.write(b"c");
        assert_eq!(next.contents(), b"c");
    }

    #[test]
    fn failing_primary_is_detached() {
        let sink = RedirectableSink::new(JobKey::from("t1"), Box::new(Broken));
        let attached = Capture::new();
        sink.rebind(attached.destination());

        sink.write(b"x");
        sink.write(b"y");
        assert_eq!(attached.contents(), b"xy");
        assert!(sink.flush().is_ok());
    }

    #[tokio::test]
    async fn stream_ends_when_destination_is_replaced() {
        let (sink, _primary) = sink_with_primary();
        let (dest, stream) = stream();

        sink.rebind(dest);
        sink.write(b"chunk-1 ");
        sink.write(b"chunk-2");
        sink.rebind(discard());

        assert_eq!(stream.collect().await, b"chunk-1 chunk-2");
    }

    #[tokio::test]
    async fn stalled_stream_is_detached_with_bounded_backlog() {
        let (sink, primary) = sink_with_primary();
        let (dest, stream) = stream_with_capacity(4);
        sink.rebind(dest);

        for _ in 0..64 {
            sink.write(&[7u8; 1024]);
        }
        assert_eq!(primary.contents().len(), 64 * 1024);

        // The reader never polled: it keeps what fit in the buffer and then sees the end of the stream.
        assert_eq!(stream.collect().await.len(), 4 * 1024);
    }

    #[test]
    fn rebind_does_not_wait_for_a_write_in_progress() {
        use std::sync::mpsc::{Receiver, Sender, channel};

        struct Gate {
            entered: Sender<()>,
            open: Receiver<()>,
        }

        impl Write for Gate {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let _ = self.entered.send(());
                let _ = self.open.recv();
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let (sink, _primary) = sink_with_primary();
        let sink = Arc::new(sink);
        let (entered_tx, entered_rx) = channel();
        let (open_tx, open_rx) = channel();
        sink.rebind(Box::new(Gate {
            entered: entered_tx,
            open: open_rx,
        }));

        let writer = {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || sink.write(b"slow"))
        };
        entered_rx.recv().unwrap();

        let next = Capture::new();
        assert!(sink.rebind(next.destination()));
        sink.write(b"fast");
        assert_eq!(next.contents(), b"fast");

        open_tx.send(()).unwrap();
        writer.join().unwrap();
        assert_eq!(next.contents(), b"fast");
    }

    #[tokio::test]
    async fn dropped_stream_is_detached() {
        let (sink, primary) = sink_with_primary();
        let (dest, stream) = stream();
        sink.rebind(dest);
        drop(stream);

        sink.write(b"still flowing");
        assert_eq!(primary.contents(), b"still flowing");
    }
}
