//! The subagent approval proxy's wire format: JSON objects terminated by a
//! single null byte, capped at 64 KiB (spec §4.4, §6).

use crate::ApprovalResult;

/// Maximum encoded message size, including the terminator, per spec §6.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

const TERMINATOR: u8 = 0x00;

/// A request from a subagent to its parent, asking the parent to evaluate
/// (and if necessary, prompt for) a tool call on the subagent's behalf.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApprovalRequestMsg {
    pub tool_name: String,
    pub arguments_json: String,
    pub display_summary: String,
    pub request_id: u64,
}

/// The parent's answer to an [`ApprovalRequestMsg`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApprovalResponseMsg {
    pub request_id: u64,
    pub result: ApprovalResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Errors from decoding a single wire message out of an accumulation buffer.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("message exceeds {MAX_MESSAGE_BYTES} byte limit")]
    TooLarge,
    #[error("buffer does not yet contain a complete message")]
    Incomplete,
    #[error("message body is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Serialize `value` and append the null terminator. Returns
/// [`WireError::TooLarge`] if the encoded message (including terminator)
/// would exceed [`MAX_MESSAGE_BYTES`].
pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut bytes =
        serde_json::to_vec(value).map_err(|e| WireError::InvalidJson(e.to_string()))?;
    if bytes.len() + 1 > MAX_MESSAGE_BYTES {
        return Err(WireError::TooLarge);
    }
    bytes.push(TERMINATOR);
    Ok(bytes)
}

/// Find and decode one complete message at the front of `buf`, if present.
///
/// On success, returns the decoded value and the number of bytes consumed
/// from `buf` (including the terminator) so the caller can drain its
/// accumulation buffer. Returns [`WireError::Incomplete`] if no terminator
/// has arrived yet within the size cap, and [`WireError::TooLarge`] if more
/// than [`MAX_MESSAGE_BYTES`] bytes have accumulated without one.
pub fn try_decode<T: serde::de::DeserializeOwned>(buf: &[u8]) -> Result<(T, usize), WireError> {
    match buf.iter().position(|&b| b == TERMINATOR) {
        Some(pos) => {
            if pos + 1 > MAX_MESSAGE_BYTES {
                return Err(WireError::TooLarge);
            }
            let value = serde_json::from_slice(&buf[..pos])
                .map_err(|e| WireError::InvalidJson(e.to_string()))?;
            Ok((value, pos + 1))
        }
        None if buf.len() >= MAX_MESSAGE_BYTES => Err(WireError::TooLarge),
        None => Err(WireError::Incomplete),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_wire_encoding() {
        let req = ApprovalRequestMsg {
            tool_name: "shell".into(),
            arguments_json: r#"{"command":"git status"}"#.into(),
            display_summary: "run: git status".into(),
            request_id: 42,
        };
        let encoded = encode(&req).unwrap();
        assert_eq!(*encoded.last().unwrap(), TERMINATOR);
        let (decoded, consumed): (ApprovalRequestMsg, usize) = try_decode(&encoded).unwrap();
        assert_eq!(decoded, req);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn response_round_trips_with_absent_pattern() {
        let resp = ApprovalResponseMsg {
            request_id: 7,
            result: ApprovalResult::Denied,
            pattern: None,
        };
        let encoded = encode(&resp).unwrap();
        let (decoded, _): (ApprovalResponseMsg, usize) = try_decode(&encoded).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn incomplete_buffer_without_terminator_is_incomplete() {
        let partial = br#"{"request_id":1"#.to_vec();
        let result: Result<(ApprovalResponseMsg, usize), _> = try_decode(&partial);
        assert_eq!(result.unwrap_err(), WireError::Incomplete);
    }

    #[test]
    fn oversized_message_is_rejected_at_encode_time() {
        let req = ApprovalRequestMsg {
            tool_name: "shell".into(),
            arguments_json: "x".repeat(MAX_MESSAGE_BYTES),
            display_summary: String::new(),
            request_id: 1,
        };
        assert_eq!(encode(&req).unwrap_err(), WireError::TooLarge);
    }

    #[test]
    fn oversized_buffer_without_terminator_is_too_large() {
        let buf = vec![b'x'; MAX_MESSAGE_BYTES + 1];
        let result: Result<(ApprovalResponseMsg, usize), _> = try_decode(&buf);
        assert_eq!(result.unwrap_err(), WireError::TooLarge);
    }

    #[test]
    fn two_messages_back_to_back_decode_one_at_a_time() {
        let first = ApprovalResponseMsg {
            request_id: 1,
            result: ApprovalResult::Allowed,
            pattern: None,
        };
        let second = ApprovalResponseMsg {
            request_id: 2,
            result: ApprovalResult::AllowedAlways,
            pattern: Some("shell:git,status".into()),
        };
        let mut buf = encode(&first).unwrap();
        buf.extend(encode(&second).unwrap());

        let (decoded_first, consumed): (ApprovalResponseMsg, usize) = try_decode(&buf).unwrap();
        assert_eq!(decoded_first, first);
        let (decoded_second, _): (ApprovalResponseMsg, usize) =
            try_decode(&buf[consumed..]).unwrap();
        assert_eq!(decoded_second, second);
    }
}
