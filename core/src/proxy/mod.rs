//! The subagent approval proxy (spec §4.4): a pair of anonymous pipes
//! connecting a child process that runs tools but owns no terminal to its
//! parent, which does.

pub mod child;
pub mod parent;
mod pipe;

#[cfg(unix)]
#[path = "unix.rs"]
mod platform;

#[cfg(windows)]
#[path = "windows.rs"]
mod platform;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

pub use parent::{ParentChannelHandle, ProxyServer};
pub use pipe::{PipeReader, PipeWriter};

/// Environment variables a spawned subagent reads at startup to reconstruct
/// its [`ApprovalChannel`]. Mirrors the "pass identity via environment, not
/// a file" pattern used elsewhere in this workspace for handing a child
/// process facts established before `exec`.
pub const REQUEST_FD_ENV: &str = "WARDEN_APPROVAL_REQUEST_FD";
pub const RESPONSE_FD_ENV: &str = "WARDEN_APPROVAL_RESPONSE_FD";

/// The child side's half of the channel: the end it writes requests to, and
/// the end it reads responses from, plus its own process id (spec §3).
pub struct ApprovalChannel {
    pub(crate) request_write: PipeWriter,
    pub(crate) response_read: PipeReader,
    pub(crate) own_pid: u32,
    pub(crate) next_request_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for ApprovalChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalChannel")
            .field("own_pid", &self.own_pid)
            .finish_non_exhaustive()
    }
}

impl Clone for ApprovalChannel {
    fn clone(&self) -> Self {
        // A channel is a single physical resource; `GateConfig::clone`
        // (used when forking config for *another* subagent) should not
        // duplicate it. Cloning yields a disconnected placeholder instead
        // of silently sharing file descriptors across two owners.
        Self {
            request_write: self.request_write.invalid_clone(),
            response_read: self.response_read.invalid_clone(),
            own_pid: self.own_pid,
            next_request_id: Arc::clone(&self.next_request_id),
        }
    }
}

impl ApprovalChannel {
    /// Reconstruct the channel from the environment variables the parent
    /// set before spawning this process.
    pub fn from_env() -> std::io::Result<Self> {
        let request_fd = read_fd_env(REQUEST_FD_ENV)?;
        let response_fd = read_fd_env(RESPONSE_FD_ENV)?;
        // Safety: the parent guarantees these descriptors are open, valid,
        // and owned solely by this process for the lifetime of the channel.
        let request_write = unsafe { PipeWriter::from_raw(request_fd) };
        let response_read = unsafe { PipeReader::from_raw(response_fd) };
        Ok(Self {
            request_write,
            response_read,
            own_pid: std::process::id(),
            next_request_id: Arc::new(AtomicU64::new(0)),
        })
    }
}

fn read_fd_env(name: &str) -> std::io::Result<pipe::RawHandle> {
    let value = std::env::var(name)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string()))?;
    value
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, name.to_string()))
}

/// Create a new pipe pair for a subagent about to be spawned.
///
/// Returns the [`ApprovalChannel`]-shaped descriptors destined for the
/// child (left inheritable) and the [`ParentChannelHandle`] the parent
/// keeps in its own registry (its ends marked close-on-exec immediately).
pub fn create_channel_pair(subagent_pid: u32) -> std::io::Result<(ChildChannelFds, ParentChannelHandle)> {
    platform::create_channel_pair(subagent_pid)
}

/// Raw, not-yet-owned descriptor pair handed to a child process via
/// environment variables before `exec`.
pub struct ChildChannelFds {
    pub request_write_fd: pipe::RawHandle,
    pub response_read_fd: pipe::RawHandle,
}

impl ChildChannelFds {
    /// Close the parent's own copies of the two descriptors destined for the
    /// child, once the child process has been spawned and holds its own
    /// inherited copies. Closing one process's descriptor table entry does
    /// not affect another process's entry for the same underlying pipe, so
    /// this must be called explicitly rather than relying on the child's
    /// exit (spec §4.4: "All four non-kept ends are closed in both
    /// processes").
    pub fn close_in_parent(self) {
        platform::close(self.request_write_fd);
        platform::close(self.response_read_fd);
    }
}
