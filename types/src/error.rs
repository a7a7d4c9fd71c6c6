//! A unifying error type for callers that want one `Result` to return
//! through, e.g. the binary's top-level `main`. Internal APIs keep their own
//! narrow enums (`VerifyError`, `OpenError`, `ConfigError`, `WireError`, ...)
//! so callers that care can match on the specific kind; this type exists
//! only to let a caller that doesn't care collapse all of them into one.

use crate::proxy_wire::WireError;

#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    #[error("path verification failed: {0}")]
    Verification(String),

    #[error("tool arguments could not be parsed: {0}")]
    ArgumentParse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("subagent proxy error: {0}")]
    Proxy(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
