//! Real connection adapter over the `irc` crate.
//!
//! The crate owns the wire format (framing, CTCP, numerics) and hands us
//! a message stream; this module translates the handful of messages the
//! session cares about into [`TransportEvent`]s and forwards the send
//! operations.

use async_trait::async_trait;
use futures::StreamExt;
use irc::client::prelude::{Client, Command, Config as IrcConfig, Message, Response};
use irc::client::ClientStream;
use log::trace;

use super::{ConnectParams, Transport, TransportEvent};
use crate::core::TransportError;

/// Adapter state: both fields are `Some` between a successful
/// [`Transport::connect`] and the next disconnect.
#[derive(Default)]
pub struct IrcTransport {
    client: Option<Client>,
    stream: Option<ClientStream>,
    server: String,
}

impl IrcTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&mut self) -> Result<&mut Client, TransportError> {
        self.client.as_mut().ok_or(TransportError::NotConnected)
    }

    /// Map a protocol message onto the event set the session understands.
    fn translate(message: Message) -> TransportEvent {
        let sender = message.source_nickname().unwrap_or("").to_string();
        match message.command {
            Command::Response(Response::RPL_WELCOME, _) => TransportEvent::Welcome,
            Command::Response(Response::ERR_NICKNAMEINUSE, _) => TransportEvent::NickInUse {
                code: Response::ERR_NICKNAMEINUSE as u16,
            },
            Command::Response(Response::ERR_NICKCOLLISION, _) => TransportEvent::NickInUse {
                code: Response::ERR_NICKCOLLISION as u16,
            },
            Command::JOIN(channel, _, _) => TransportEvent::Joined {
                channel,
                nick: sender,
            },
            Command::PRIVMSG(target, text) => TransportEvent::Message {
                target,
                sender,
                text,
            },
            other => TransportEvent::Other {
                raw: Message::from(other).to_string().trim_end().to_string(),
            },
        }
    }
}

#[async_trait]
impl Transport for IrcTransport {
    async fn connect(&mut self, params: &ConnectParams) -> Result<(), TransportError> {
        let config = IrcConfig {
            server: Some(params.server.clone()),
            port: Some(params.port),
            use_tls: Some(params.use_tls),
            password: (!params.password.is_empty()).then(|| params.password.clone()),
            nickname: Some(params.nickname.clone()),
            username: Some(params.username.clone()),
            realname: Some(params.realname.clone()),
            // Channels are joined by the session so confirmations can be
            // tracked per entry; no autojoin here.
            channels: Vec::new(),
            ..IrcConfig::default()
        };

        let mut client = Client::from_config(config)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        client
            .identify()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let stream = client
            .stream()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        self.server = params.server.clone();
        self.stream = Some(stream);
        self.client = Some(client);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        let stream = self.stream.as_mut()?;
        match stream.next().await {
            Some(Ok(message)) => {
                trace!("<< {}", message.to_string().trim_end());
                Some(Self::translate(message))
            }
            Some(Err(e)) => {
                self.stream = None;
                Some(TransportEvent::Disconnected {
                    reason: e.to_string(),
                })
            }
            None => {
                self.stream = None;
                Some(TransportEvent::Disconnected {
                    reason: "connection closed by server".to_string(),
                })
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(client) = self.client.take() {
            // Closing is best-effort; the socket goes away with the client.
            let _ = client.send(Command::QUIT(Some("leaving".to_string())));
        }
        self.stream = None;
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn send_join(&mut self, channel: &str, password: &str) -> Result<(), TransportError> {
        let command = if password.is_empty() {
            Command::JOIN(channel.to_string(), None, None)
        } else {
            Command::JOIN(channel.to_string(), Some(password.to_string()), None)
        };
        self.client()?
            .send(command)
            .map_err(|e| TransportError::Join(e.to_string()))
    }

    fn send_part(&mut self, channel: &str) -> Result<(), TransportError> {
        self.client()?
            .send(Command::PART(channel.to_string(), None))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn send_message(&mut self, target: &str, text: &str) -> Result<(), TransportError> {
        self.client()?
            .send_privmsg(target, text)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn send_ping(&mut self) -> Result<(), TransportError> {
        let server = self.server.clone();
        self.client()?
            .send(Command::PING(server, None))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn send_raw(&mut self, line: &str) -> Result<(), TransportError> {
        self.client()?
            .send(Command::Raw(line.to_string(), Vec::new()))
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(raw: &str) -> Message {
        raw.parse::<Message>().unwrap()
    }

    #[test]
    fn test_translate_welcome() {
        let event = IrcTransport::translate(message(":server 001 omega :Welcome\r\n"));
        assert_eq!(event, TransportEvent::Welcome);
    }

    #[test]
    fn test_translate_nick_in_use() {
        let event = IrcTransport::translate(message(
            ":server 433 * omega :Nickname is already in use\r\n",
        ));
        assert_eq!(event, TransportEvent::NickInUse { code: 433 });
    }

    #[test]
    fn test_translate_channel_message() {
        let event =
            IrcTransport::translate(message(":alice!a@host PRIVMSG #lobby :hello there\r\n"));
        assert_eq!(
            event,
            TransportEvent::Message {
                target: "#lobby".to_string(),
                sender: "alice".to_string(),
                text: "hello there".to_string(),
            }
        );
    }

    #[test]
    fn test_translate_join() {
        let event = IrcTransport::translate(message(":omega!o@host JOIN #lobby\r\n"));
        assert_eq!(
            event,
            TransportEvent::Joined {
                channel: "#lobby".to_string(),
                nick: "omega".to_string(),
            }
        );
    }

    #[test]
    fn test_translate_unhandled_is_other() {
        let event = IrcTransport::translate(message(":server NOTICE * :Looking up hostname\r\n"));
        assert!(matches!(event, TransportEvent::Other { .. }));
    }
}
