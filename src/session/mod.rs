//! # Session Manager
//!
//! Owns the single server connection and everything hanging off it: the
//! connect → nick-negotiate → join → active state machine, the nickname
//! collision retry, the liveness watchdog, the channel registry and the
//! command effects. One task drives it all through a single bounded
//! `select!` loop, so no locks guard any of this state.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 2.0.0: watchdog-driven reconnects, flood guard
//! - 1.1.0: bounded nickname collision retry
//! - 1.0.0: Initial connect/join/relay loop

pub mod flood;
pub mod nick;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::MissedTickBehavior;

use crate::channels::ChannelRegistry;
use crate::commands::{self, CommandKind, ParsedLine};
use crate::core::{Config, Mode, SessionError};
use crate::display::{DisplayPrefs, Presenter};
use crate::input::{ChannelNames, InputEvent};
use crate::transport::{ConnectParams, Transport, TransportEvent};

use self::flood::FloodGuard;
use self::nick::NickAllocator;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    NickNegotiating,
    Joining,
    Active,
    Reconnecting,
}

/// Why a connection attempt ended and a new one is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconnectReason {
    /// The connect call itself failed.
    ConnectFailed,
    /// The server closed or dropped the connection.
    ConnectionLost,
    /// Nickname collision; retry with the next candidate.
    NickCollision,
    /// The watchdog saw no traffic within the timeout.
    WatchdogTimeout,
}

/// Control flow out of an event or input handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopSignal {
    Reconnect(ReconnectReason),
    Shutdown,
    /// Nick retries exhausted; terminal.
    Fatal,
}

/// Result of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Retry(ReconnectReason),
    Shutdown,
    Fatal,
}

/// The session singleton. Generic over the transport so tests can drive
/// the state machine with a scripted fake.
pub struct Session<T: Transport> {
    settings: Arc<Config>,
    transport: T,
    registry: ChannelRegistry,
    presenter: Presenter,
    nick: NickAllocator,
    current_nick: String,
    state: SessionState,
    last_contact: Instant,
    mode: Mode,
    flood: FloodGuard,
    relayed: u64,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    input: mpsc::Receiver<InputEvent>,
    prompt: watch::Sender<String>,
    channel_names: ChannelNames,
}

impl<T: Transport> Session<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Arc<Config>,
        transport: T,
        input: mpsc::Receiver<InputEvent>,
        prompt: watch::Sender<String>,
        channel_names: ChannelNames,
        running: Arc<AtomicBool>,
        shutdown: Arc<Notify>,
    ) -> Result<Self> {
        let registry = ChannelRegistry::from_config(&settings.channels, settings.max_channels)?;
        let presenter = Presenter::new(DisplayPrefs::from_config(&settings));
        let flood = FloodGuard::new(
            settings.flood_limit,
            Duration::from_secs(settings.flood_window_secs),
        );
        let nick = NickAllocator::new(&settings.botname);
        let current_nick = settings.botname.clone();
        let mode = settings.mode;

        let session = Session {
            settings,
            transport,
            registry,
            presenter,
            nick,
            current_nick,
            state: SessionState::Disconnected,
            last_contact: Instant::now(),
            mode,
            flood,
            relayed: 0,
            running,
            shutdown,
            input,
            prompt,
            channel_names,
        };
        session.publish_channel_names();
        session.refresh_prompt();
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Access the presentation filter, e.g. to install plugin text
    /// filters before the session starts.
    pub fn presenter_mut(&mut self) -> &mut Presenter {
        &mut self.presenter
    }

    /// Run the session until shutdown or a fatal failure.
    ///
    /// Transient failures reconnect forever; the only error this returns
    /// is nickname-retry exhaustion.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        while self.running.load(Ordering::SeqCst) {
            let outcome = self.run_connection().await;
            self.transport.disconnect().await;

            match outcome {
                Outcome::Shutdown => break,
                Outcome::Fatal => {
                    self.fatal_shutdown();
                    return Err(SessionError::NickRetriesExhausted(
                        self.nick.base().to_string(),
                    ));
                }
                Outcome::Retry(reason) => {
                    self.state = SessionState::Reconnecting;
                    self.registry.clear_joined();
                    match reason {
                        // Collision retries keep the new candidate and
                        // the counter; that is what bounds them.
                        ReconnectReason::NickCollision => {}
                        // Timeouts retry with the same nickname and do
                        // not touch the collision counter.
                        ReconnectReason::WatchdogTimeout => {}
                        // Fresh attempt: back to the configured name.
                        ReconnectReason::ConnectFailed | ReconnectReason::ConnectionLost => {
                            self.nick.reset();
                            self.current_nick = self.nick.base().to_string();
                        }
                    }
                    info!("reconnecting ({reason:?}) as {}", self.current_nick);
                    if reason == ReconnectReason::ConnectFailed {
                        self.pause_before_retry().await;
                    }
                }
            }
        }

        self.state = SessionState::Disconnected;
        self.running.store(false, Ordering::SeqCst);
        info!("session closed");
        Ok(())
    }

    /// One connection attempt: connect, then multiplex transport events,
    /// local input and the watchdog tick until something ends it.
    async fn run_connection(&mut self) -> Outcome {
        self.state = SessionState::Connecting;
        self.note_contact();

        let params = self.connect_params();
        info!(
            "connecting to {}:{} as {}",
            params.server, params.port, params.nickname
        );
        // The connect itself can hang in DNS or the TCP handshake, so it
        // races the shutdown signal and the liveness timeout like every
        // other wait in the loop.
        let connected = tokio::select! {
            biased;
            _ = self.shutdown.notified() => return Outcome::Shutdown,
            result = tokio::time::timeout(
                self.settings.timeout(),
                self.transport.connect(&params),
            ) => result,
        };
        match connected {
            Err(_) => {
                warn!(
                    "connect did not complete within {}s",
                    self.settings.connection_timeout_secs
                );
                return Outcome::Retry(ReconnectReason::WatchdogTimeout);
            }
            Ok(Err(e)) => {
                error!("irc connection setup has failed: {e}");
                return Outcome::Retry(ReconnectReason::ConnectFailed);
            }
            Ok(Ok(())) => {}
        }
        self.state = SessionState::NickNegotiating;

        // The tick bound is what lets the watchdog fire with no I/O at
        // all, and what bounds shutdown latency.
        let mut ticker = tokio::time::interval(self.settings.watchdog_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Outcome::Shutdown;
            }
            let accepts_input = self.accepts_input();

            // biased: network events are dispatched before local input,
            // so commands observe up-to-date registry state.
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => return Outcome::Shutdown,
                event = self.transport.next_event() => match event {
                    None => {
                        warn!("server connection lost");
                        return Outcome::Retry(ReconnectReason::ConnectionLost);
                    }
                    Some(event) => {
                        self.note_contact();
                        if let Some(signal) = self.handle_event(event) {
                            return Self::outcome_from(signal);
                        }
                    }
                },
                line = self.input.recv(), if accepts_input => {
                    let event = line.unwrap_or(InputEvent::Eof);
                    if let Some(signal) = self.handle_input(event) {
                        return Self::outcome_from(signal);
                    }
                },
                _ = ticker.tick() => {
                    if self.watchdog_expired() {
                        warn!(
                            "no server contact for {}s, forcing reconnect",
                            self.settings.connection_timeout_secs
                        );
                        return Outcome::Retry(ReconnectReason::WatchdogTimeout);
                    }
                    if let Err(e) = self.transport.send_ping() {
                        debug!("keepalive probe failed: {e}");
                    }
                },
            }
        }
    }

    fn outcome_from(signal: LoopSignal) -> Outcome {
        match signal {
            LoopSignal::Reconnect(reason) => Outcome::Retry(reason),
            LoopSignal::Shutdown => Outcome::Shutdown,
            LoopSignal::Fatal => Outcome::Fatal,
        }
    }

    // ----- transport events -----

    fn handle_event(&mut self, event: TransportEvent) -> Option<LoopSignal> {
        match event {
            TransportEvent::Welcome => self.on_welcome(),
            TransportEvent::Joined { channel, nick } => self.on_joined(&channel, &nick),
            TransportEvent::Message {
                target,
                sender,
                text,
            } => self.on_message(&target, &sender, &text),
            TransportEvent::NickInUse { code } => self.on_nick_in_use(code),
            TransportEvent::Disconnected { reason } => {
                warn!("disconnected: {reason}");
                Some(LoopSignal::Reconnect(ReconnectReason::ConnectionLost))
            }
            TransportEvent::Other { raw } => {
                debug!("irc event: {raw}");
                None
            }
        }
    }

    fn on_welcome(&mut self) -> Option<LoopSignal> {
        info!("connected to server");
        self.state = SessionState::Joining;

        if let Some(login) = &self.settings.login_command {
            if let Err(e) = self.transport.send_message(&login.target, &login.text) {
                warn!("services login failed: {e}");
            }
        }

        for channel in self.registry.iter() {
            info!("joining channel: {}", channel.name);
            if let Err(e) = self.transport.send_join(&channel.name, &channel.password) {
                error!("cannot join {}: {e}", channel.name);
            }
        }
        None
    }

    fn on_joined(&mut self, channel: &str, nick: &str) -> Option<LoopSignal> {
        if nick.eq_ignore_ascii_case(&self.current_nick) {
            info!("joined channel {channel}");
            if !self.registry.mark_joined(channel) {
                debug!("join confirmation for unknown channel {channel}");
            }
            if self.state != SessionState::Active {
                // The first confirmed join gates outgoing traffic.
                self.state = SessionState::Active;
                self.refresh_prompt();
            }
        } else if self.mode.prints_output() {
            if let Some(notice) = self.presenter.render_join(channel, nick) {
                println!("{notice}");
            }
        }
        None
    }

    fn on_message(&mut self, target: &str, sender: &str, text: &str) -> Option<LoopSignal> {
        if !self.mode.prints_output() {
            return None;
        }
        println!("{}", self.presenter.render_message(target, sender, text));

        self.relayed += 1;
        if self.settings.max_lines > 0 && self.relayed >= self.settings.max_lines {
            info!("{} lines relayed, quitting", self.relayed);
            return Some(LoopSignal::Shutdown);
        }
        None
    }

    fn on_nick_in_use(&mut self, code: u16) -> Option<LoopSignal> {
        if self.state == SessionState::Active {
            debug!("ignoring nick-in-use ({code}) while active");
            return None;
        }
        error!("nick {} already in use ({code})", self.current_nick);

        match self.nick.next_candidate() {
            Some(candidate) => {
                info!("retrying with nick: {candidate}");
                self.current_nick = candidate;
                Some(LoopSignal::Reconnect(ReconnectReason::NickCollision))
            }
            None => Some(LoopSignal::Fatal),
        }
    }

    // ----- local input -----

    fn handle_input(&mut self, event: InputEvent) -> Option<LoopSignal> {
        match event {
            InputEvent::Line(line) => self.handle_line(&line),
            InputEvent::Interrupted => Some(LoopSignal::Shutdown),
            InputEvent::Eof => {
                if self.settings.keep_reading {
                    info!("stdin closed, switching to output-only mode");
                    self.mode = Mode::Output;
                    None
                } else {
                    info!("stdin closed, quitting");
                    Some(LoopSignal::Shutdown)
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> Option<LoopSignal> {
        match commands::parse(line) {
            ParsedLine::Empty => None,
            ParsedLine::Chat(text) => {
                self.send_chat(&text);
                None
            }
            ParsedLine::Unknown(token) => {
                println!("command {token} not found");
                None
            }
            ParsedLine::MissingArgument(name) => {
                eprintln!("{name}: argument required");
                None
            }
            ParsedLine::Command { kind, arg } => match kind {
                CommandKind::Help => {
                    print!("{}", commands::help_text());
                    None
                }
                CommandKind::Quit => Some(LoopSignal::Shutdown),
                CommandKind::List => {
                    self.cmd_list();
                    None
                }
                CommandKind::Join => {
                    self.cmd_join(&arg);
                    None
                }
                CommandKind::Channel => {
                    self.cmd_channel(&arg);
                    None
                }
                CommandKind::Leave => {
                    self.cmd_leave(&arg);
                    None
                }
            },
        }
    }

    fn cmd_list(&self) {
        for (index, channel) in self.registry.iter().enumerate() {
            let marker = if index == self.registry.active_index() {
                '*'
            } else {
                ' '
            };
            println!("{marker} {}", channel.name);
        }
    }

    fn cmd_join(&mut self, arg: &str) {
        let (channel, password) = match arg.split_once(' ') {
            Some((channel, password)) => (channel, password.trim()),
            None => (arg, ""),
        };

        // The entry is only committed once the adapter accepted the join.
        if let Err(e) = self.registry.ensure_can_add(channel) {
            warn!("{e}");
            return;
        }
        if let Err(e) = self.transport.send_join(channel, password) {
            warn!("unable to join {channel}: {e}");
            return;
        }
        match self.registry.add(channel, password) {
            Ok(index) => {
                self.registry.set_active_index(index);
                self.refresh_prompt();
                self.publish_channel_names();
            }
            Err(e) => warn!("{e}"),
        }
    }

    fn cmd_channel(&mut self, arg: &str) {
        match self.registry.set_active(arg) {
            Ok(_) => self.refresh_prompt(),
            Err(e) => warn!("{e}"),
        }
    }

    fn cmd_leave(&mut self, arg: &str) {
        let name = (!arg.is_empty()).then_some(arg);
        match self.registry.remove(name) {
            Ok(channel) => {
                info!("leaving channel: {}", channel.name);
                if let Err(e) = self.transport.send_part(&channel.name) {
                    warn!("{e}");
                }
                self.refresh_prompt();
                self.publish_channel_names();
            }
            Err(e) => error!("{e}"),
        }
    }

    /// Route an outgoing chat line. Messages while the session is not
    /// active are dropped with a log line, never a user error.
    fn send_chat(&mut self, text: &str) {
        if self.state != SessionState::Active {
            debug!("not connected to a channel yet; forgetting message");
            return;
        }

        let (explicit, body) = commands::split_channel_prefix(text);
        if body.is_empty() {
            return;
        }
        let index = match explicit {
            Some(token) => self.registry.resolve(token),
            None => self.registry.active_index(),
        };
        let target = match self.registry.get(index) {
            Some(channel) => channel.name.clone(),
            None => return,
        };

        if !self.flood.allow() {
            warn!("flood limit reached, dropping message to {target}");
            return;
        }
        if let Err(e) = self.transport.send_message(&target, body) {
            error!("{e}");
        }
    }

    // ----- bookkeeping -----

    fn accepts_input(&self) -> bool {
        self.mode.takes_input() && self.state == SessionState::Active
    }

    fn note_contact(&mut self) {
        self.last_contact = Instant::now();
    }

    fn watchdog_expired(&self) -> bool {
        self.last_contact.elapsed() > self.settings.timeout()
    }

    /// Pacing between attempts when connect fails outright: one watchdog
    /// tick, racing the shutdown signal so quit stays responsive.
    async fn pause_before_retry(&self) {
        tokio::select! {
            _ = self.shutdown.notified() => {}
            _ = tokio::time::sleep(self.settings.watchdog_interval()) => {}
        }
    }

    /// Terminal shutdown; performs the transition exactly once.
    fn fatal_shutdown(&mut self) -> bool {
        if self.state == SessionState::Disconnected && !self.running.load(Ordering::SeqCst) {
            return false;
        }
        error!("no free nickname found for {}, giving up", self.nick.base());
        self.state = SessionState::Disconnected;
        self.running.store(false, Ordering::SeqCst);
        true
    }

    fn connect_params(&self) -> ConnectParams {
        ConnectParams {
            server: self.settings.server.clone(),
            port: self.settings.port,
            use_tls: self.settings.use_tls,
            password: self.settings.server_password.clone(),
            nickname: self.current_nick.clone(),
            username: self.settings.username.clone(),
            realname: self.settings.realname.clone(),
        }
    }

    fn refresh_prompt(&self) {
        let prompt = match self.registry.get(self.registry.active_index()) {
            Some(channel) => format!("{}@{}: ", self.current_nick, channel.name),
            None => format!("{}: ", self.current_nick),
        };
        let _ = self.prompt.send(prompt);
    }

    fn publish_channel_names(&self) {
        if let Ok(mut names) = self.channel_names.write() {
            *names = self.registry.names();
        }
    }
}
