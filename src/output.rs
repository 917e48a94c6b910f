//! Buffered output sink.
//!
//! Every emission for a terminal lands in its [`OutputSink`] buffer; the
//! event loop drains the buffer to the descriptor when it signals writable,
//! so a whole burst of rendering reaches the terminal in one write. An
//! optional process-wide tee copies every buffered byte to a debug log.
//!
//! [`raw_write`] bypasses the buffer for teardown, when the event loop may
//! already be gone and best effort is all that is left.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::RawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use log::warn;

// Opened once per process, never closed.
static TEE: OnceLock<Mutex<File>> = OnceLock::new();

/// Open the debug log (`muxtty-out-<pid>.log`) and start teeing every
/// buffered emission into it. Raw teardown writes are not copied.
pub fn enable_tee() {
    if TEE.get().is_some() {
        return;
    }
    let path = format!("muxtty-out-{}.log", std::process::id());
    match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o644)
        .custom_flags(libc::O_CLOEXEC)
        .open(&path)
    {
        Ok(file) => {
            let _ = TEE.set(Mutex::new(file));
        }
        Err(err) => warn!("could not open {path}: {err}"),
    }
}

fn tee_write(bytes: &[u8]) {
    if let Some(tee) = TEE.get() {
        if let Ok(mut file) = tee.lock() {
            let _ = file.write_all(bytes);
        }
    }
}

/// Append-only buffer of bytes headed for one terminal.
#[derive(Debug, Default)]
pub struct OutputSink {
    buf: Vec<u8>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(4096),
        }
    }

    /// Queue bytes for the terminal, copying them to the tee if enabled.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        tee_write(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The queued bytes, without draining them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take everything queued, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Drop everything queued, e.g. on client disconnect.
    pub fn discard(&mut self) {
        self.buf.clear();
    }

    /// Write as much as the descriptor accepts, keeping the rest queued.
    ///
    /// Driven by the event loop on writability; `EAGAIN` is not an error.
    pub fn flush_to(&mut self, fd: RawFd) -> io::Result<()> {
        while !self.buf.is_empty() {
            match write_fd(fd, &self.buf) {
                Ok(0) => break,
                Ok(n) => {
                    self.buf.drain(..n);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

fn write_fd(fd: RawFd, bytes: &[u8]) -> io::Result<usize> {
    let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Synchronous best-effort write for teardown sequences.
///
/// Retries partial writes and `EAGAIN` up to five times, 100 µs apart, then
/// gives up quietly; the terminal may already be gone.
pub fn raw_write(fd: RawFd, bytes: &[u8]) {
    let mut remaining = bytes;
    for _ in 0..5 {
        match write_fd(fd, remaining) {
            Ok(n) if n >= remaining.len() => return,
            Ok(n) => remaining = &remaining[n..],
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(_) => return,
        }
        std::thread::sleep(Duration::from_micros(100));
    }
    warn!("raw write abandoned with {} bytes left", remaining.len());
}

#[cfg(test)]
mod tests {
    use super::OutputSink;

    #[test]
    fn append_accumulates() {
        let mut sink = OutputSink::new();
        assert!(sink.is_empty());
        sink.append(b"\x1b[H");
        sink.append(b"ab");
        assert_eq!(sink.as_bytes(), b"\x1b[Hab");
        assert_eq!(sink.len(), 5);
    }

    #[test]
    fn take_drains() {
        let mut sink = OutputSink::new();
        sink.append(b"xyz");
        assert_eq!(sink.take(), b"xyz");
        assert!(sink.is_empty());
    }

    #[test]
    fn discard_drops() {
        let mut sink = OutputSink::new();
        sink.append(b"xyz");
        sink.discard();
        assert!(sink.is_empty());
    }
}
