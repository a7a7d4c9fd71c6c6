//! The parent side of the subagent approval proxy (spec §4.4): a poll loop
//! that multiplexes over every registered subagent's request pipe, prompts
//! on the single TTY this process owns, and writes the answer back.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use warden_types::{proxy_wire, ApprovalRequestMsg, ApprovalResponseMsg, ApprovalResult, ToolCall};

use crate::config::GateConfig;
use crate::config_allow_always;
use crate::prompt::{self, PromptOutcome};

use super::pipe::{PipeReader, PipeWriter};

/// The parent's handle onto one subagent's channel: the end it reads
/// requests from, and the end it writes responses to.
pub struct ParentChannelHandle {
    pub(crate) request_read: PipeReader,
    pub(crate) response_write: PipeWriter,
    pub subagent_pid: u32,
}

/// How long one call to [`ProxyServer::poll_once`] waits for a readable
/// pipe before returning control to its caller (spec §4.4: "a short
/// sub-timeout (<=100 ms) so it stays responsive to new requests").
pub const POLL_SUB_TIMEOUT: Duration = Duration::from_millis(100);

/// Registry of active subagent channels plus each one's partial-message
/// accumulation buffer. Owned by the root process; the root's own event
/// loop drives [`ProxyServer::poll_once`] interleaved with its other
/// activities (spec §5: suspension point bounded by the documented
/// timeout).
pub struct ProxyServer {
    channels: HashMap<u32, ParentChannelHandle>,
    buffers: HashMap<u32, Vec<u8>>,
}

impl ProxyServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            buffers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handle: ParentChannelHandle) {
        let pid = handle.subagent_pid;
        self.buffers.insert(pid, Vec::new());
        self.channels.insert(pid, handle);
    }

    /// Drop a subagent's channel, e.g. once its process has exited.
    pub fn deregister(&mut self, pid: u32) {
        self.channels.remove(&pid);
        self.buffers.remove(&pid);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Poll every registered channel for up to [`POLL_SUB_TIMEOUT`], service
    /// at most one complete request if one arrived, and report whether any
    /// work happened. Ordering across subagents follows the OS's own
    /// readiness reporting (spec §4.4: "fairness is not guaranteed beyond
    /// the OS's poll semantics").
    pub async fn poll_once(
        &mut self,
        config: &mut GateConfig,
        interrupt: &Arc<AtomicBool>,
    ) -> std::io::Result<bool> {
        let Some(pid) = self.poll_ready_pid(POLL_SUB_TIMEOUT)? else {
            return Ok(false);
        };

        let mut chunk = [0u8; 4096];
        let n = {
            let handle = self
                .channels
                .get(&pid)
                .expect("pid came from this registry's own keys");
            handle.request_read.read_some(&mut chunk)?
        };
        if n == 0 {
            self.deregister(pid);
            return Ok(true);
        }
        let buf = self
            .buffers
            .get_mut(&pid)
            .expect("every registered pid has a buffer");
        buf.extend_from_slice(&chunk[..n]);

        let Some((request, consumed)) = try_take_message(buf) else {
            return Ok(true);
        };
        buf.drain(..consumed);

        let response = service_request(&request, config, interrupt).await;
        let encoded = proxy_wire::encode(&response).unwrap_or_default();
        if let Some(handle) = self.channels.get(&pid) {
            let _ = handle.response_write.write_all(&encoded);
        }
        Ok(true)
    }

    fn poll_ready_pid(&self, timeout: Duration) -> std::io::Result<Option<u32>> {
        if self.channels.is_empty() {
            std::thread::sleep(timeout);
            return Ok(None);
        }
        let mut raw_to_pid = HashMap::new();
        let mut raws = Vec::new();
        for (pid, handle) in &self.channels {
            if let Some(raw) = handle.request_read.raw() {
                raw_to_pid.insert(raw, *pid);
                raws.push(raw);
            }
        }
        let ready = super::platform::poll_readable(&raws, timeout)?;
        Ok(ready.first().and_then(|raw| raw_to_pid.get(raw).copied()))
    }
}

impl Default for ProxyServer {
    fn default() -> Self {
        Self::new()
    }
}

fn try_take_message(buf: &[u8]) -> Option<(ApprovalRequestMsg, usize)> {
    proxy_wire::try_decode::<ApprovalRequestMsg>(buf).ok()
}

async fn service_request(
    request: &ApprovalRequestMsg,
    config: &mut GateConfig,
    interrupt: &Arc<AtomicBool>,
) -> ApprovalResponseMsg {
    let call = ToolCall::new(
        request.request_id.to_string(),
        request.tool_name.clone(),
        request.arguments_json.clone(),
    );

    let outcome = prompt::prompt_user(&call, interrupt)
        .await
        .unwrap_or(PromptOutcome::Aborted);

    let (result, pattern) = match outcome {
        PromptOutcome::Allow => (ApprovalResult::Allowed, None),
        PromptOutcome::Deny => (ApprovalResult::Denied, None),
        PromptOutcome::AllowAlways => {
            // The parent updates its own allowlist and echoes the pattern
            // back purely for display; the child does not persist allowlist
            // state in this architecture (spec §4.4).
            let entry = config_allow_always::synthesize_entry(&call);
            let pattern = describe_entry(&entry);
            config.add_allowlist_entry(entry);
            (ApprovalResult::AllowedAlways, Some(pattern))
        }
        PromptOutcome::Aborted => (ApprovalResult::Aborted, None),
    };

    ApprovalResponseMsg {
        request_id: request.request_id,
        result,
        pattern,
    }
}

fn describe_entry(entry: &warden_types::AllowlistEntry) -> String {
    match entry {
        warden_types::AllowlistEntry::Regex(r) => format!("{}:{}", r.tool, r.pattern),
        warden_types::AllowlistEntry::ShellPrefix(s) => format!("shell:{}", s.tokens.join(",")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_server_has_no_channels() {
        let server = ProxyServer::new();
        assert!(server.is_empty());
    }
}
