//! cmd.exe tokenisation (spec §4.2).

use crate::common::Builder;
use warden_types::ParsedShellCommand;

pub fn tokenize(raw: &str) -> ParsedShellCommand {
    let mut builder = Builder::new();
    let mut in_quotes = false;
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // `%` is a variable-expansion trigger even inside double quotes.
        if c == '%' {
            builder.has_subshell = true;
            builder.push_char(c);
            i += 1;
            continue;
        }

        if in_quotes {
            if c == '"' {
                in_quotes = false;
            } else {
                builder.push_char(c);
            }
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            builder.end_token();
            i += 1;
            continue;
        }

        match c {
            '"' => {
                builder.mark_started();
                in_quotes = true;
                i += 1;
            }
            '^' => {
                // Escape character; also unconditionally flags the command.
                builder.has_chain = true;
                if i + 1 < chars.len() {
                    builder.push_char(chars[i + 1]);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            '&' => {
                builder.has_chain = true;
                builder.end_token();
                if chars.get(i + 1) == Some(&'&') {
                    i += 2;
                } else {
                    i += 1;
                }
            }
            '|' => {
                builder.end_token();
                if chars.get(i + 1) == Some(&'|') {
                    builder.has_chain = true;
                    i += 2;
                } else {
                    builder.has_pipe = true;
                    i += 1;
                }
            }
            '<' | '>' => {
                builder.has_redirect = true;
                builder.end_token();
                i += 1;
            }
            _ => {
                builder.push_char(c);
                i += 1;
            }
        }
    }

    builder.finish(in_quotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_quote_is_a_literal_byte() {
        let p = tokenize("echo it's fine");
        assert_eq!(p.tokens, vec!["echo", "it's", "fine"]);
    }

    #[test]
    fn single_ampersand_chains() {
        assert!(tokenize("dir & del file").has_chain);
    }

    #[test]
    fn double_pipe_chains_single_pipes() {
        let p = tokenize("dir | find \"x\"");
        assert!(p.has_pipe);
        assert!(!p.has_chain);
        let chained = tokenize("dir || echo fail");
        assert!(chained.has_chain);
    }

    #[test]
    fn caret_is_escape_and_flags_chain() {
        assert!(tokenize("echo hi^&there").has_chain);
    }

    #[test]
    fn percent_flags_subshell_even_inside_quotes() {
        assert!(tokenize("echo %PATH%").has_subshell);
        assert!(tokenize("echo \"%PATH%\"").has_subshell);
    }

    #[test]
    fn unterminated_quote_is_unbalanced() {
        assert!(tokenize("echo \"unterminated").has_chain);
    }
}
