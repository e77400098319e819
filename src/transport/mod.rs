//! # Connection Adapter
//!
//! Capability object owning the single network session. The session
//! manager drives it through the [`Transport`] trait and receives
//! [`TransportEvent`]s back; the real implementation wraps the `irc`
//! protocol crate, tests substitute a fake.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod irc;

use async_trait::async_trait;

use crate::core::TransportError;

pub use self::irc::IrcTransport;

/// Parameters for one connection attempt.
///
/// A fresh set is produced for every attempt because the nickname can
/// change between attempts during collision retry.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub password: String,
    pub nickname: String,
    pub username: String,
    pub realname: String,
}

/// Events surfaced by the adapter, one variant per protocol callback the
/// session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Registration with the server completed; channels can be joined.
    Welcome,
    /// Somebody (possibly us) joined a channel.
    Joined { channel: String, nick: String },
    /// PRIVMSG traffic. `target` is a channel, or our nick for queries.
    Message {
        target: String,
        sender: String,
        text: String,
    },
    /// The requested nickname is taken (numeric 433/436).
    NickInUse { code: u16 },
    /// The server connection dropped.
    Disconnected { reason: String },
    /// Anything else; only interesting as a liveness signal and for
    /// debug logging.
    Other { raw: String },
}

/// The connection adapter capability.
///
/// One live adapter exists at a time; it is replaced wholesale on every
/// reconnect. Senders are fire-and-forget: they queue the command and
/// never await a server response.
#[async_trait]
pub trait Transport: Send {
    /// Open a connection and start protocol registration.
    async fn connect(&mut self, params: &ConnectParams) -> Result<(), TransportError>;

    /// Next protocol event. `None` means the connection is gone and a
    /// new [`Transport::connect`] is required.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Close the connection, sending a QUIT when still possible.
    async fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn send_join(&mut self, channel: &str, password: &str) -> Result<(), TransportError>;

    fn send_part(&mut self, channel: &str) -> Result<(), TransportError>;

    fn send_message(&mut self, target: &str, text: &str) -> Result<(), TransportError>;

    /// Keepalive probe for the liveness watchdog.
    fn send_ping(&mut self) -> Result<(), TransportError>;

    fn send_raw(&mut self, line: &str) -> Result<(), TransportError>;
}
