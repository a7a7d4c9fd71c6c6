//! The interactive four-choice prompt protocol (spec §4.1.2).

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures_util::StreamExt;
use warden_types::{PromptChoice, ToolCall};

/// Outcome of one completed prompt interaction (`?` is handled internally
/// as an iterative re-prompt and never escapes this module).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    Allow,
    Deny,
    AllowAlways,
    Aborted,
}

/// Whether this process owns a terminal it could prompt on at all.
#[must_use]
pub fn owns_terminal() -> bool {
    std::io::stdout().is_terminal() && std::io::stdin().is_terminal()
}

/// Switches the terminal to raw mode for the duration of the guard and
/// unconditionally restores it on every exit path, including panics.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Prompt the user about `call`, returning once a `y`/`n`/`a` answer comes
/// in, the interrupt flag is set, or the input stream ends.
///
/// While the read is in progress the interrupt flag is polled on a short
/// interval alongside the keystroke stream; no signal-unsafe work happens
/// here (the flag itself is set entirely from the `ctrlc` handler, not from
/// this function).
pub async fn prompt_user(
    call: &ToolCall,
    interrupt: &Arc<AtomicBool>,
) -> std::io::Result<PromptOutcome> {
    let _raw_mode = RawModeGuard::enter()?;
    print_prompt_line(call);

    let mut events = EventStream::new();
    let mut interrupt_poll = tokio::time::interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            _ = interrupt_poll.tick() => {
                if interrupt.load(Ordering::SeqCst) {
                    return Ok(PromptOutcome::Aborted);
                }
            }
            maybe_event = events.next() => {
                let Some(event) = maybe_event else {
                    return Ok(PromptOutcome::Aborted);
                };
                let Ok(Event::Key(key)) = event else { continue };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let KeyCode::Char(c) = key.code else { continue };
                match PromptChoice::from_key(c) {
                    Some(PromptChoice::Allow) => return Ok(PromptOutcome::Allow),
                    Some(PromptChoice::Deny) => return Ok(PromptOutcome::Deny),
                    Some(PromptChoice::AllowAlways) => return Ok(PromptOutcome::AllowAlways),
                    Some(PromptChoice::ShowDetails) => {
                        print_details(call);
                        print_prompt_line(call);
                    }
                    None => {}
                }
            }
        }
    }
}

fn print_prompt_line(call: &ToolCall) {
    eprint!(
        "\r\napprove {}? [y]es / [n]o / [a]lways / [?]details: ",
        call.name
    );
}

fn print_details(call: &ToolCall) {
    eprintln!("\r\n  tool: {}\r\n  arguments: {}", call.name, call.arguments);
}
