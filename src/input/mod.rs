//! # Local Input
//!
//! Producers of local input lines. The interactive reader runs rustyline
//! on its own thread with tab completion for commands and joined
//! channels and a prompt that follows the active channel; the piped
//! reader consumes stdin line by line. Both feed the same channel the
//! event loop selects on, so the core never blocks on the terminal.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.4.0
//!
//! ## Changelog
//! - 1.1.0: channel name completion from the live registry
//! - 1.0.0: readline thread and piped stdin reader

use std::borrow::Cow;
use std::sync::{Arc, RwLock};

use log::{debug, error};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use crate::commands::COMMAND_TABLE;

/// One unit of local input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// The writing end of stdin closed.
    Eof,
    /// Ctrl-C at the readline prompt.
    Interrupted,
}

/// Channel names shared with the completer; the session refreshes it on
/// join and leave.
pub type ChannelNames = Arc<RwLock<Vec<String>>>;

/// Rustyline helper providing completion and hints for commands and
/// channel names.
struct PromptHelper {
    channels: ChannelNames,
}

impl Helper for PromptHelper {}

impl Completer for PromptHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let start = line
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..];

        let candidates: Vec<Pair> = if word.starts_with('/') && start == 0 {
            COMMAND_TABLE
                .iter()
                .filter(|spec| spec.name.starts_with(word))
                .map(|spec| Pair {
                    display: spec.name.to_string(),
                    replacement: spec.name.to_string(),
                })
                .collect()
        } else if word.starts_with('#') {
            match self.channels.read() {
                Ok(channels) => channels
                    .iter()
                    .filter(|name| name.starts_with(word))
                    .map(|name| Pair {
                        display: name.clone(),
                        replacement: name.clone(),
                    })
                    .collect(),
                Err(_) => Vec::new(),
            }
        } else {
            Vec::new()
        };

        Ok((start, candidates))
    }
}

impl Hinter for PromptHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            COMMAND_TABLE
                .iter()
                .map(|spec| spec.name)
                .find(|name| name.starts_with(line) && name.len() > line.len())
                .map(|name| name[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Highlighter for PromptHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Borrowed(hint)
    }
}

impl Validator for PromptHelper {}

/// Start the interactive readline thread.
///
/// The prompt is re-read from the watch channel before every line.
/// readline blocks while a line is being edited, so a prompt change
/// (`/channel`, the first join confirmation) takes effect on the next
/// prompt rather than mid-edit; reprinting an already issued prompt
/// would need rustyline's external printer.
pub fn spawn_interactive(prompt: watch::Receiver<String>, channels: ChannelNames) -> mpsc::Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel(64);

    std::thread::spawn(move || {
        let mut editor: Editor<PromptHelper, DefaultHistory> = match Editor::new() {
            Ok(editor) => editor,
            Err(e) => {
                error!("cannot initialize readline: {e}");
                let _ = tx.blocking_send(InputEvent::Eof);
                return;
            }
        };
        editor.set_helper(Some(PromptHelper { channels }));

        loop {
            let current_prompt = prompt.borrow().clone();
            match editor.readline(&current_prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    if tx.blocking_send(InputEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    let _ = tx.blocking_send(InputEvent::Interrupted);
                    break;
                }
                Err(ReadlineError::Eof) => {
                    let _ = tx.blocking_send(InputEvent::Eof);
                    break;
                }
                Err(e) => {
                    error!("readline failed: {e}");
                    let _ = tx.blocking_send(InputEvent::Eof);
                    break;
                }
            }
        }
        debug!("readline thread exiting");
    });

    rx
}

/// Start the non-interactive stdin reader.
pub fn spawn_piped() -> mpsc::Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(InputEvent::Line(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = tx.send(InputEvent::Eof).await;
                    break;
                }
                Err(e) => {
                    error!("error in fetching message from stdin: {e}");
                    let _ = tx.send(InputEvent::Eof).await;
                    break;
                }
            }
        }
        debug!("stdin reader exiting");
    });

    rx
}
