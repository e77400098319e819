//! # Command Dispatcher
//!
//! Parsing of local input lines. A line starting with the command prefix
//! is split into a command token and a trimmed argument tail and looked
//! up in a fixed table; anything else is outgoing chat text, optionally
//! addressed with a leading channel token. Execution effects live on the
//! session, which owns the registry and the connection adapter.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.5.0
//!
//! ## Changelog
//! - 1.1.0: /channel and /leave commands
//! - 1.0.0: Initial table with /help, /quit, /join and /list

pub const COMMAND_PREFIX: char = '/';

/// The recognized local commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Quit,
    Join,
    List,
    Channel,
    Leave,
}

/// One entry of the fixed command table.
pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    pub help: &'static str,
    pub requires_arg: bool,
}

/// All local commands. `/exit` and `/quit` share a handler.
pub const COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec {
        name: "/help",
        kind: CommandKind::Help,
        help: "displays this help",
        requires_arg: false,
    },
    CommandSpec {
        name: "/exit",
        kind: CommandKind::Quit,
        help: "quits the application",
        requires_arg: false,
    },
    CommandSpec {
        name: "/quit",
        kind: CommandKind::Quit,
        help: "quits the application",
        requires_arg: false,
    },
    CommandSpec {
        name: "/join",
        kind: CommandKind::Join,
        help: "joins a given channel",
        requires_arg: true,
    },
    CommandSpec {
        name: "/list",
        kind: CommandKind::List,
        help: "lists all joined channels",
        requires_arg: false,
    },
    CommandSpec {
        name: "/channel",
        kind: CommandKind::Channel,
        help: "switch to channel",
        requires_arg: true,
    },
    CommandSpec {
        name: "/leave",
        kind: CommandKind::Leave,
        help: "leaves the current or given channel",
        requires_arg: false,
    },
];

/// Result of parsing one local line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A recognized command with its (possibly empty) argument tail.
    Command { kind: CommandKind, arg: String },
    /// Outgoing chat text.
    Chat(String),
    /// Command prefix with an unknown command token.
    Unknown(String),
    /// A known command that requires an argument, called without one.
    MissingArgument(&'static str),
    /// Nothing to do.
    Empty,
}

/// Parse a local input line.
pub fn parse(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Empty;
    }
    if !line.starts_with(COMMAND_PREFIX) {
        return ParsedLine::Chat(line.to_string());
    }

    let (token, tail) = match line.split_once(' ') {
        Some((token, tail)) => (token, tail.trim()),
        None => (line, ""),
    };

    match COMMAND_TABLE.iter().find(|spec| spec.name == token) {
        None => ParsedLine::Unknown(token.to_string()),
        Some(spec) if spec.requires_arg && tail.is_empty() => {
            ParsedLine::MissingArgument(spec.name)
        }
        Some(spec) => ParsedLine::Command {
            kind: spec.kind,
            arg: tail.to_string(),
        },
    }
}

/// Split an optional leading channel token off a chat line.
///
/// Returns the explicit destination, if any, and the remaining message
/// text. `#lobby hi there` becomes `(Some("#lobby"), "hi there")`.
pub fn split_channel_prefix(text: &str) -> (Option<&str>, &str) {
    let text = text.trim();
    if !text.starts_with('#') {
        return (None, text);
    }
    match text.split_once(' ') {
        Some((channel, rest)) => (Some(channel), rest.trim_start()),
        None => (Some(text), ""),
    }
}

/// The `/help` overview.
pub fn help_text() -> String {
    let mut out = String::from("This is the commands overview of irccmd\n\n");
    for spec in COMMAND_TABLE {
        out.push_str(&format!("{}\t\t{}\n", spec.name, spec.help));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_line() {
        assert_eq!(parse("hello world"), ParsedLine::Chat("hello world".to_string()));
        assert_eq!(parse("  hello  "), ParsedLine::Chat("hello".to_string()));
        assert_eq!(parse(""), ParsedLine::Empty);
        assert_eq!(parse("   "), ParsedLine::Empty);
    }

    #[test]
    fn test_parse_command_with_argument() {
        assert_eq!(
            parse("/join #test secret"),
            ParsedLine::Command {
                kind: CommandKind::Join,
                arg: "#test secret".to_string(),
            }
        );
        // Tail is trimmed.
        assert_eq!(
            parse("/channel   #beta  "),
            ParsedLine::Command {
                kind: CommandKind::Channel,
                arg: "#beta".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_argument_free_commands() {
        assert_eq!(
            parse("/list"),
            ParsedLine::Command {
                kind: CommandKind::List,
                arg: String::new(),
            }
        );
        // /leave takes an optional argument.
        assert_eq!(
            parse("/leave"),
            ParsedLine::Command {
                kind: CommandKind::Leave,
                arg: String::new(),
            }
        );
        assert_eq!(
            parse("/quit"),
            ParsedLine::Command {
                kind: CommandKind::Quit,
                arg: String::new(),
            }
        );
        assert_eq!(
            parse("/exit"),
            ParsedLine::Command {
                kind: CommandKind::Quit,
                arg: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_missing_required_argument() {
        assert_eq!(parse("/join"), ParsedLine::MissingArgument("/join"));
        assert_eq!(parse("/join   "), ParsedLine::MissingArgument("/join"));
        assert_eq!(parse("/channel"), ParsedLine::MissingArgument("/channel"));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(parse("/frobnicate now"), ParsedLine::Unknown("/frobnicate".to_string()));
    }

    #[test]
    fn test_split_channel_prefix() {
        assert_eq!(split_channel_prefix("hello"), (None, "hello"));
        assert_eq!(
            split_channel_prefix("#lobby hi there"),
            (Some("#lobby"), "hi there")
        );
        // Channel token without a message.
        assert_eq!(split_channel_prefix("#lobby"), (Some("#lobby"), ""));
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for spec in COMMAND_TABLE {
            assert!(help.contains(spec.name));
        }
    }
}
