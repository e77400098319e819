// Core layer - configuration and error taxonomy
pub mod core;

// Protocol layer - connection adapter over the irc crate
pub mod transport;

// Session layer - state machine, channel registry, retry policies
pub mod channels;
pub mod session;

// Presentation layer - command parsing, line sources, output shaping
pub mod commands;
pub mod display;
pub mod input;

// Re-export the types the binary wires together
pub use channels::ChannelRegistry;
pub use core::{CliArgs, Config, Mode};
pub use display::Presenter;
pub use input::{ChannelNames, InputEvent};
pub use session::{Session, SessionState};
pub use transport::{IrcTransport, Transport, TransportEvent};
