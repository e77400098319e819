//! Error taxonomy for the client core.
//!
//! Registry errors are user-facing command errors, transport errors are
//! logged and fed back into the session state machine, and session errors
//! are the only fatal conditions that unwind to process exit.

use thiserror::Error;

/// Errors raised by channel registry operations.
///
/// These surface as messages to the local user and never affect the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("already joined channel {0}")]
    DuplicateChannel(String),

    #[error("channel list is full ({0} entries)")]
    RegistryFull(usize),

    #[error("cannot close the last channel")]
    LastChannel,

    #[error("channel {0} not found")]
    ChannelNotFound(String),
}

/// Errors raised by the connection adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("join failed: {0}")]
    Join(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("not connected")]
    NotConnected,
}

/// Fatal session failures.
///
/// Everything else the session encounters is retried; these terminate the
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no free nickname found for {0}, giving up")]
    NickRetriesExhausted(String),
}
