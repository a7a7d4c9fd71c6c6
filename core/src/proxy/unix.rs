//! Unix pipe primitives for the subagent approval proxy: anonymous pipes via
//! `pipe2`, raw `read`/`write`/`poll`, and the descriptor bookkeeping around
//! `fork`+`exec` inheritance. Mirrors the raw-libc idiom
//! `warden-fsverify::unix` uses for directory-relative opens — this crate
//! reaches for `libc` directly wherever `std` can't express the needed
//! flags, rather than layering a higher-level pipe abstraction on top.

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use super::parent::ParentChannelHandle;
use super::pipe::{PipeReader, PipeWriter};
use super::ChildChannelFds;

/// Create the two pipes backing one subagent's approval channel.
///
/// Both pipes are created without `O_CLOEXEC` so a `fork`+`exec`'d child
/// inherits all four descriptors by default; the parent's own two kept ends
/// are then marked close-on-exec so they vanish from the child's exec'd
/// image automatically (spec §4.4: "the other two ends" are closed in the
/// child). The parent must separately close its *own* inherited copies of
/// the child's two ends once the child has been spawned — see
/// [`ChildChannelFds::close_in_parent`](super::ChildChannelFds::close_in_parent).
pub fn create_channel_pair(
    subagent_pid: u32,
) -> io::Result<(ChildChannelFds, ParentChannelHandle)> {
    let (req_read, req_write) = pipe2_inheritable()?;
    let (resp_read, resp_write) = pipe2_inheritable()?;

    set_cloexec(req_read)?;
    set_cloexec(resp_write)?;
    set_nonblocking(req_read, true)?;

    let parent_handle = ParentChannelHandle {
        request_read: unsafe { PipeReader::from_raw(req_read) },
        response_write: unsafe { PipeWriter::from_raw(resp_write) },
        subagent_pid,
    };

    let child_fds = ChildChannelFds {
        request_write_fd: req_write,
        response_read_fd: resp_read,
    };

    Ok((child_fds, parent_handle))
}

fn pipe2_inheritable() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0; 2];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), 0) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(super) fn set_nonblocking(fd: RawFd, nonblocking: bool) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let new_flags = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, new_flags) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(super) fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

pub(super) fn write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

pub(super) fn close(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// Wait up to `timeout` for any of `fds` to become readable. Returns the
/// subset that are ready (possibly empty on timeout).
pub(super) fn poll_readable(fds: &[RawFd], timeout: Duration) -> io::Result<Vec<RawFd>> {
    if fds.is_empty() {
        std::thread::sleep(timeout);
        return Ok(Vec::new());
    }
    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();
    let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    let rc = unsafe { libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Vec::new());
        }
        return Err(err);
    }
    Ok(pollfds
        .iter()
        .filter(|p| p.revents & libc::POLLIN != 0)
        .map(|p| p.fd)
        .collect())
}
