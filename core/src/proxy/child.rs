//! The subagent side of the approval proxy (spec §4.4): write one request,
//! then wait for its response with a 5-minute deadline. Requests from one
//! subagent are serialised — `request_approval` takes `&mut ApprovalChannel`
//! and there is exactly one in flight at a time.

use std::io;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use warden_types::{proxy_wire, ApprovalRequestMsg, ApprovalResponseMsg, ApprovalResult, ToolCall};

use super::pipe::RawHandle;
use super::{platform, ApprovalChannel};

/// How long the child waits for its parent to answer before giving up and
/// denying the call (spec §4.4).
pub const RESPONSE_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// How long a single `poll` call inside the wait loop blocks for, bounding
/// how promptly a slow clock correction or process shutdown is noticed.
const POLL_SLICE: Duration = Duration::from_millis(200);

/// Ask the parent process to evaluate `call`, asking it to prompt on this
/// subagent's behalf.
///
/// Every failure mode here — encode failure, write failure, deadline, pipe
/// error, unparseable response, request-id mismatch — resolves to `Denied`
/// rather than propagating an error (spec §4.4, §7 class 5: "IPC failures...
/// always fail closed").
pub async fn request_approval(channel: &mut ApprovalChannel, call: &ToolCall) -> ApprovalResult {
    let request_id = channel.next_request_id.fetch_add(1, Ordering::SeqCst);
    let request = ApprovalRequestMsg {
        tool_name: call.name.clone(),
        arguments_json: call.arguments.clone(),
        display_summary: format!("{}: {}", call.name, call.arguments),
        request_id,
    };

    let Ok(encoded) = proxy_wire::encode(&request) else {
        return ApprovalResult::Denied;
    };
    if channel.request_write.write_all(&encoded).is_err() {
        return ApprovalResult::Denied;
    }

    let Some(response_raw) = channel.response_read.raw() else {
        return ApprovalResult::Denied;
    };

    tokio::task::spawn_blocking(move || blocking_wait_for_response(response_raw, request_id))
        .await
        .unwrap_or(ApprovalResult::Denied)
}

/// Runs on a blocking-pool thread: polls `response_raw` until a complete,
/// matching response arrives or [`RESPONSE_DEADLINE`] passes.
fn blocking_wait_for_response(response_raw: RawHandle, request_id: u64) -> ApprovalResult {
    let deadline = Instant::now() + RESPONSE_DEADLINE;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let now = Instant::now();
        if now >= deadline {
            return ApprovalResult::Denied;
        }
        let slice = (deadline - now).min(POLL_SLICE);

        match platform::poll_readable(&[response_raw], slice) {
            Ok(ready) if ready.is_empty() => continue,
            Ok(_) => {}
            Err(_) => return ApprovalResult::Denied,
        }

        match platform::read(response_raw, &mut chunk) {
            Ok(0) => return ApprovalResult::Denied, // parent closed the pipe
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(_) => return ApprovalResult::Denied,
        }

        match proxy_wire::try_decode::<ApprovalResponseMsg>(&buf) {
            Ok((response, _consumed)) => {
                return if response.request_id == request_id {
                    response.result
                } else {
                    ApprovalResult::Denied
                };
            }
            Err(proxy_wire::WireError::Incomplete) => continue,
            Err(_) => return ApprovalResult::Denied,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn raw_pipe() -> (RawHandle, RawHandle) {
        let mut fds = [0; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0);
        (fds[0], fds[1])
    }

    #[test]
    fn matching_response_is_returned() {
        let (read_fd, write_fd) = raw_pipe();
        let response = ApprovalResponseMsg {
            request_id: 7,
            result: ApprovalResult::Allowed,
            pattern: None,
        };
        let encoded = proxy_wire::encode(&response).unwrap();
        assert_eq!(platform::write(write_fd, &encoded).unwrap(), encoded.len());

        assert_eq!(blocking_wait_for_response(read_fd, 7), ApprovalResult::Allowed);

        platform::close(read_fd);
        platform::close(write_fd);
    }

    #[test]
    fn mismatched_request_id_is_denied() {
        let (read_fd, write_fd) = raw_pipe();
        let response = ApprovalResponseMsg {
            request_id: 1,
            result: ApprovalResult::Allowed,
            pattern: None,
        };
        let encoded = proxy_wire::encode(&response).unwrap();
        platform::write(write_fd, &encoded).unwrap();

        assert_eq!(blocking_wait_for_response(read_fd, 2), ApprovalResult::Denied);

        platform::close(read_fd);
        platform::close(write_fd);
    }

    #[test]
    fn closed_pipe_before_any_data_is_denied() {
        let (read_fd, write_fd) = raw_pipe();
        platform::close(write_fd);

        assert_eq!(blocking_wait_for_response(read_fd, 1), ApprovalResult::Denied);

        platform::close(read_fd);
    }
}
