//! Cross-shell command tokeniser: turns a raw command string into a
//! [`ParsedShellCommand`] carrying the unsafe-construct flags that the
//! policy evaluator's allowlist matching depends on.
//!
//! Parsing is total. Malformed input never returns an error; it returns
//! whatever tokens were accumulated plus `has_chain = true`, which makes the
//! result unsafe for allowlist matching without the caller having to special
//! case a parse failure.

mod cmd;
mod common;
mod dangerous;
mod posix;
mod powershell;

pub use dangerous::scan_dangerous;
use warden_types::{ParsedShellCommand, ShellDialect};

/// Commands longer than this are rejected outright (spec §4.2).
pub const MAX_COMMAND_BYTES: usize = 65_536;

/// Tokenise `raw` under `dialect`, flagging unsafe constructs.
///
/// The dangerous-pattern scan (spec §4.2) runs over the raw string before
/// tokenisation and its result is folded into `is_dangerous` regardless of
/// dialect.
#[must_use]
pub fn parse(raw: &str, dialect: ShellDialect) -> ParsedShellCommand {
    if raw.len() > MAX_COMMAND_BYTES {
        return ParsedShellCommand {
            tokens: Vec::new(),
            has_chain: true,
            has_pipe: false,
            has_subshell: false,
            has_redirect: false,
            is_dangerous: true,
            dialect,
        };
    }

    let non_ascii = raw.bytes().any(|b| b > 0x7F);
    let dangerous = dangerous::scan_dangerous(raw);

    let mut parsed = match dialect {
        ShellDialect::Posix => posix::tokenize(raw),
        ShellDialect::Cmd => cmd::tokenize(raw),
        ShellDialect::PowerShell => powershell::tokenize(raw),
    };

    parsed.has_chain |= non_ascii;
    parsed.is_dangerous |= dangerous;
    parsed.dialect = dialect;
    parsed
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_dialect() -> impl Strategy<Value = ShellDialect> {
        prop_oneof![
            Just(ShellDialect::Posix),
            Just(ShellDialect::Cmd),
            Just(ShellDialect::PowerShell),
        ]
    }

    proptest! {
        /// Parsing never panics on arbitrary input, and the safety
        /// predicate is exactly the negation of the five unsafe flags
        /// (spec §8 invariant).
        #[test]
        fn parsing_is_total_and_safety_matches_flags(
            raw in ".{0,512}",
            dialect in any_dialect(),
        ) {
            let parsed = parse(&raw, dialect);
            let any_flag = parsed.has_chain
                || parsed.has_pipe
                || parsed.has_subshell
                || parsed.has_redirect
                || parsed.is_dangerous;
            prop_assert_eq!(parsed.is_safe_for_matching(), !any_flag);
        }

        #[test]
        fn oversized_inputs_are_always_unsafe(raw in ".{65537,65600}") {
            let parsed = parse(&raw, ShellDialect::Posix);
            prop_assert!(!parsed.is_safe_for_matching());
        }
    }
}
