//! Policy evaluator, interactive prompt protocol, and subagent approval
//! proxy: the three pieces that turn a [`warden_types::ToolCall`] into an
//! [`warden_types::ApprovalResult`] (spec §4.1, §4.1.2, §4.4).

pub mod config;
mod config_allow_always;
pub mod evaluator;
pub mod prompt;
pub mod proxy;

pub use config::GateConfig;
pub use evaluator::{evaluate, EvalError};
