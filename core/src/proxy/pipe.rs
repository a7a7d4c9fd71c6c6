//! Owned pipe ends: a raw descriptor with closed-once-on-drop semantics.
//!
//! `None` denotes a disconnected placeholder produced by
//! [`ApprovalChannel`](super::ApprovalChannel)'s `Clone` impl — every
//! operation on it fails immediately rather than touching a descriptor this
//! instance doesn't actually own.

use std::io;
use std::time::Duration;

#[cfg(unix)]
pub type RawHandle = std::os::unix::io::RawFd;
#[cfg(windows)]
pub type RawHandle = super::windows::RawHandle;

use super::platform;

pub struct PipeReader(Option<RawHandle>);
pub struct PipeWriter(Option<RawHandle>);

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "pipe end not owned by this clone")
}

impl PipeReader {
    /// # Safety
    /// `handle` must be a valid, open descriptor exclusively owned by the
    /// caller from this point on.
    #[must_use]
    pub unsafe fn from_raw(handle: RawHandle) -> Self {
        Self(Some(handle))
    }

    /// A disconnected placeholder (see module docs).
    #[must_use]
    pub fn invalid_clone(&self) -> Self {
        Self(None)
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        platform::set_nonblocking(self.0.ok_or_else(disconnected)?, nonblocking)
    }

    pub fn read_some(&self, buf: &mut [u8]) -> io::Result<usize> {
        platform::read(self.0.ok_or_else(disconnected)?, buf)
    }

    /// Wait up to `timeout` for this descriptor to become readable.
    pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let handle = self.0.ok_or_else(disconnected)?;
        Ok(!platform::poll_readable(&[handle], timeout)?.is_empty())
    }

    #[must_use]
    pub(crate) fn raw(&self) -> Option<RawHandle> {
        self.0
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            platform::close(handle);
        }
    }
}

impl PipeWriter {
    /// # Safety
    /// `handle` must be a valid, open descriptor exclusively owned by the
    /// caller from this point on.
    #[must_use]
    pub unsafe fn from_raw(handle: RawHandle) -> Self {
        Self(Some(handle))
    }

    /// A disconnected placeholder (see module docs).
    #[must_use]
    pub fn invalid_clone(&self) -> Self {
        Self(None)
    }

    pub fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        let handle = self.0.ok_or_else(disconnected)?;
        while !buf.is_empty() {
            let n = platform::write(handle, buf)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "pipe accepted zero bytes"));
            }
            buf = &buf[n..];
        }
        Ok(())
    }

    #[must_use]
    pub(crate) fn raw(&self) -> Option<RawHandle> {
        self.0
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            platform::close(handle);
        }
    }
}
