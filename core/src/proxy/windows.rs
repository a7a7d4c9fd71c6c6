//! Windows pipe primitives for the subagent approval proxy.
//!
//! Windows has no `fork`+`exec` descriptor-inheritance split to rely on, so
//! anonymous pipes are created with an inheritable `SECURITY_ATTRIBUTES` up
//! front via `CreatePipe`, and anonymous pipes have no native readiness
//! notification, so [`poll_readable`] falls back to polling with
//! `PeekNamedPipe`.

use std::io;
use std::time::{Duration, Instant};

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows_sys::Win32::System::Pipes::{CreatePipe, PeekNamedPipe};

use super::parent::ParentChannelHandle;
use super::pipe::{PipeReader, PipeWriter};
use super::ChildChannelFds;

/// A Windows `HANDLE`, carried by value so it can round-trip through an
/// environment variable the same way a Unix raw fd does.
pub type RawHandle = isize;

/// Create the two pipes backing one subagent's approval channel, both
/// inheritable so a subsequently spawned child process (with
/// `bInheritHandles = TRUE`) receives its two ends.
pub fn create_channel_pair(
    subagent_pid: u32,
) -> io::Result<(ChildChannelFds, ParentChannelHandle)> {
    let (req_read, req_write) = new_inheritable_pipe()?;
    let (resp_read, resp_write) = new_inheritable_pipe()?;

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

fn new_inheritable_pipe() -> io::Result<(RawHandle, RawHandle)> {
    let mut attrs = SECURITY_ATTRIBUTES {
        nLength: std::mem::size_of::<SECURITY_ATTRIBUTES>() as u32,
        lpSecurityDescriptor: std::ptr::null_mut(),
        bInheritHandle: 1,
    };
    let mut read_handle: HANDLE = 0;
    let mut write_handle: HANDLE = 0;
    let ok = unsafe { CreatePipe(&mut read_handle, &mut write_handle, &mut attrs, 0) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((read_handle as RawHandle, write_handle as RawHandle))
}

/// Anonymous pipes have no non-blocking mode on Windows; readiness is
/// instead polled with `PeekNamedPipe` (see [`poll_readable`]).
pub(super) fn set_nonblocking(_handle: RawHandle, _nonblocking: bool) -> io::Result<()> {
    Ok(())
}

pub(super) fn read(handle: RawHandle, buf: &mut [u8]) -> io::Result<usize> {
    let mut read_bytes: u32 = 0;
    let ok = unsafe {
        ReadFile(
            handle as HANDLE,
            buf.as_mut_ptr().cast(),
            buf.len() as u32,
            &mut read_bytes,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(read_bytes as usize)
}

pub(super) fn write(handle: RawHandle, buf: &[u8]) -> io::Result<usize> {
    let mut written: u32 = 0;
    let ok = unsafe {
        WriteFile(
            handle as HANDLE,
            buf.as_ptr().cast(),
            buf.len() as u32,
            &mut written,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(written as usize)
}

pub(super) fn close(handle: RawHandle) {
    unsafe {
        CloseHandle(handle as HANDLE);
    }
}

/// Wait up to `timeout` for any of `handles` to have data available,
/// polling with `PeekNamedPipe` at a short interval since anonymous pipes
/// have no native readiness notification on this platform.
pub(super) fn poll_readable(handles: &[RawHandle], timeout: Duration) -> io::Result<Vec<RawHandle>> {
    if handles.is_empty() {
        std::thread::sleep(timeout);
        return Ok(Vec::new());
    }
    let deadline = Instant::now() + timeout;
    loop {
        let mut ready = Vec::new();
        for &handle in handles {
            let mut available: u32 = 0;
            let ok = unsafe {
                PeekNamedPipe(
                    handle as HANDLE,
                    std::ptr::null_mut(),
                    0,
                    std::ptr::null_mut(),
                    &mut available,
                    std::ptr::null_mut(),
                )
            };
            if ok != 0 && available > 0 {
                ready.push(handle);
            }
        }
        if !ready.is_empty() {
            return Ok(ready);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(Vec::new());
        }
        std::thread::sleep(Duration::from_millis(5).min(deadline - now));
    }
}
