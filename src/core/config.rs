//! # Configuration
//!
//! Settings for the client, assembled once at startup and treated as an
//! immutable snapshot afterwards. Sources, in order of precedence:
//!
//! 1. built-in defaults
//! 2. a YAML config file (`--config`, `~/.irccmd.yml`, or
//!    `/etc/irccmd/irccmd.yml`, first one that exists)
//! 3. environment (`IRCCMD_SERVER_PASSWORD`, usually via `.env`)
//! 4. command line flags
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.2.0: flood window and login command settings
//! - 1.1.0: YAML file support, `IRCCMD_SERVER_PASSWORD` env override
//! - 1.0.0: CLI flags and defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

/// Environment variable consulted for the server password.
pub const SERVER_PASSWORD_ENV: &str = "IRCCMD_SERVER_PASSWORD";

const SYSTEM_CONFIG_FILE: &str = "/etc/irccmd/irccmd.yml";
const USER_CONFIG_FILE: &str = ".irccmd.yml";

/// Operating mode of the client.
///
/// `Input` reads local lines and relays them to the server, `Output`
/// relays channel traffic to stdout, `Both` does both and `None` only
/// holds the connection open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    None,
    Input,
    Output,
    Both,
}

impl Mode {
    /// Whether local input lines should be read and relayed.
    pub fn takes_input(self) -> bool {
        matches!(self, Mode::Input | Mode::Both)
    }

    /// Whether incoming channel traffic should be printed.
    pub fn prints_output(self) -> bool {
        matches!(self, Mode::Output | Mode::Both)
    }
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    match s.to_ascii_lowercase().as_str() {
        "none" => Ok(Mode::None),
        "in" | "input" => Ok(Mode::Input),
        "out" | "output" => Ok(Mode::Output),
        "both" => Ok(Mode::Both),
        other => Err(format!("unknown mode '{other}', expected in/out/both/none")),
    }
}

/// A channel the client wants to be joined to, with an optional key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default)]
    pub password: String,
}

impl ChannelConfig {
    /// Parse a `name` or `name:password` channel argument.
    pub fn parse_arg(arg: &str) -> Self {
        match arg.split_once(':') {
            Some((name, password)) => ChannelConfig {
                name: name.to_string(),
                password: password.to_string(),
            },
            None => ChannelConfig {
                name: arg.to_string(),
                password: String::new(),
            },
        }
    }
}

/// A message sent to a services bot once the server connection is up,
/// before any channels are joined.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCommand {
    pub target: String,
    pub text: String,
}

/// The assembled settings snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub server_password: String,
    pub botname: String,
    pub username: String,
    pub realname: String,
    pub channels: Vec<ChannelConfig>,
    pub mode: Mode,
    pub interactive: bool,
    pub keep_reading: bool,
    pub show_channel: bool,
    pub show_nick: bool,
    pub show_joins: bool,
    /// Seconds of server silence before the watchdog forces a reconnect.
    pub connection_timeout_secs: u64,
    pub max_channels: usize,
    /// Quit after relaying this many messages. Off when zero.
    pub max_lines: u64,
    /// Outgoing messages allowed per flood window. Off when zero.
    pub flood_limit: usize,
    pub flood_window_secs: u64,
    pub login_command: Option<LoginCommand>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: "irc.libera.chat".to_string(),
            port: 6667,
            use_tls: false,
            server_password: String::new(),
            botname: "omega".to_string(),
            username: "irccmd".to_string(),
            realname: "irccmd".to_string(),
            channels: Vec::new(),
            mode: Mode::Both,
            interactive: true,
            keep_reading: false,
            show_channel: false,
            show_nick: false,
            show_joins: false,
            connection_timeout_secs: 200,
            max_channels: 20,
            max_lines: 0,
            flood_limit: 0,
            flood_window_secs: 10,
            login_command: None,
        }
    }
}

impl Config {
    /// Build the settings snapshot from all sources.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = match Self::config_file_path(args)? {
            Some(path) => Self::load_file(&path)?,
            None => Config::default(),
        };

        if let Ok(password) = std::env::var(SERVER_PASSWORD_ENV) {
            config.server_password = password;
        }

        config.apply_cli(args);
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a YAML file, with defaults for missing keys.
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Pick the config file to read: an explicit `--config` must exist,
    /// otherwise the first of the user and system files that does.
    fn config_file_path(args: &CliArgs) -> Result<Option<PathBuf>> {
        if let Some(path) = &args.config {
            if !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            return Ok(Some(path.clone()));
        }

        if let Some(home) = dirs::home_dir() {
            let user = home.join(USER_CONFIG_FILE);
            if user.exists() {
                return Ok(Some(user));
            }
        }

        let system = PathBuf::from(SYSTEM_CONFIG_FILE);
        if system.exists() {
            return Ok(Some(system));
        }

        Ok(None)
    }

    fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(server) = &args.server {
            self.server = server.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if args.tls {
            self.use_tls = true;
        }
        if let Some(name) = &args.name {
            self.botname = name.clone();
        }
        if let Some(password) = &args.server_password {
            self.server_password = password.clone();
        }
        if !args.channel.is_empty() {
            self.channels = args
                .channel
                .iter()
                .map(|arg| ChannelConfig::parse_arg(arg))
                .collect();
        }
        if let Some(mode) = args.mode {
            self.mode = mode;
        }
        if let Some(timeout) = args.timeout {
            self.connection_timeout_secs = timeout;
        }
        if let Some(lines) = args.lines {
            self.max_lines = lines;
        }
        if args.noninteractive {
            self.interactive = false;
        }
        if args.keepreading {
            self.keep_reading = true;
        }
        if args.showchannel {
            self.show_channel = true;
        }
        if args.shownick {
            self.show_nick = true;
        }
        if args.showjoins {
            self.show_joins = true;
        }
    }

    /// Reject settings the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.botname.is_empty() {
            anyhow::bail!("botname must not be empty");
        }
        if self.channels.is_empty() {
            anyhow::bail!("at least one channel must be configured");
        }
        if self.channels.len() > self.max_channels {
            anyhow::bail!(
                "{} channels configured but max_channels is {}",
                self.channels.len(),
                self.max_channels
            );
        }
        if self.connection_timeout_secs == 0 {
            anyhow::bail!("connection timeout must be positive");
        }
        Ok(())
    }

    /// Full liveness timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Watchdog polling interval: one tenth of the timeout, so the probe
    /// fires several times before silence is declared fatal.
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_secs * 1000 / 10)
    }
}

/// Command line flags. These override the config file.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "irccmd", version, about = "Interactive and scriptable IRC commandline client")]
pub struct CliArgs {
    /// Override the default config file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Verbose messaging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Enables debug messages, implies -v
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Only output irc traffic and errors
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Set the irc server
    #[arg(short = 'S', long)]
    pub server: Option<String>,

    /// Set the port of the irc server
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Connect over TLS
    #[arg(long)]
    pub tls: bool,

    /// Set the botname
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Set the password for the server
    #[arg(short = 'P', long = "serverpassword")]
    pub server_password: Option<String>,

    /// Set an irc channel, can be applied multiple times. An optional
    /// password can be supplied using a colon (:) as separator.
    #[arg(short = 'C', long = "channel")]
    pub channel: Vec<String>,

    /// Set the mode: input, output or both
    #[arg(short = 'm', long, value_parser = parse_mode)]
    pub mode: Option<Mode>,

    /// Set the maximum timeout of the irc connection in seconds
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Quit when the number of relayed messages has exceeded <LINES>.
    /// Off when set to zero.
    #[arg(short = 'l', long)]
    pub lines: Option<u64>,

    /// Force a non-interactive session
    #[arg(short = 'N', long)]
    pub noninteractive: bool,

    /// Stay in the channel after the writing end of stdin has closed
    #[arg(short = 'K', long)]
    pub keepreading: bool,

    /// Show channel when printing irc messages to stdout
    #[arg(long)]
    pub showchannel: bool,

    /// Show nick from sender when printing irc messages to stdout
    #[arg(long)]
    pub shownick: bool,

    /// Show joins from the connected channels
    #[arg(short = 'J', long)]
    pub showjoins: bool,
}

impl CliArgs {
    /// Default log filter derived from the verbosity flags; `RUST_LOG`
    /// still takes precedence at logger setup.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else if self.silent {
            "error"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_has_no_channels() {
        let config = Config::default();
        assert!(config.channels.is_empty());
        assert_eq!(config.mode, Mode::Both);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_parsing_accepts_short_forms() {
        assert_eq!(parse_mode("in").unwrap(), Mode::Input);
        assert_eq!(parse_mode("out").unwrap(), Mode::Output);
        assert_eq!(parse_mode("BOTH").unwrap(), Mode::Both);
        assert!(parse_mode("sideways").is_err());
    }

    #[test]
    fn test_channel_arg_with_password() {
        let channel = ChannelConfig::parse_arg("#secrets:hunter2");
        assert_eq!(channel.name, "#secrets");
        assert_eq!(channel.password, "hunter2");

        let open = ChannelConfig::parse_arg("#lobby");
        assert_eq!(open.name, "#lobby");
        assert!(open.password.is_empty());
    }

    #[test]
    fn test_config_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server: irc.example.org\nport: 6697\nuse_tls: true\nbotname: beeper\nchannels:\n  - name: \"#ops\"\n    password: sesame\nconnection_timeout_secs: 60"
        )
        .unwrap();

        let config = Config::load_file(file.path()).unwrap();
        assert_eq!(config.server, "irc.example.org");
        assert_eq!(config.port, 6697);
        assert!(config.use_tls);
        assert_eq!(config.botname, "beeper");
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].name, "#ops");
        assert_eq!(config.channels[0].password, "sesame");
        // Missing keys fall back to defaults.
        assert_eq!(config.max_channels, 20);
        assert_eq!(config.watchdog_interval(), Duration::from_secs(6));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = Config {
            channels: vec![ChannelConfig::parse_arg("#alpha")],
            ..Config::default()
        };
        let args = CliArgs {
            server: Some("irc.oftc.net".to_string()),
            name: Some("gamma".to_string()),
            channel: vec!["#beta:pw".to_string()],
            mode: Some(Mode::Output),
            noninteractive: true,
            ..CliArgs::default()
        };

        config.apply_cli(&args);
        assert_eq!(config.server, "irc.oftc.net");
        assert_eq!(config.botname, "gamma");
        assert_eq!(config.channels, vec![ChannelConfig::parse_arg("#beta:pw")]);
        assert_eq!(config.mode, Mode::Output);
        assert!(!config.interactive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_password_overrides_file_and_cli_overrides_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server_password: fromfile\nchannels:\n  - name: \"#ops\""
        )
        .unwrap();
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            ..CliArgs::default()
        };

        std::env::set_var(SERVER_PASSWORD_ENV, "fromenv");
        let config = Config::load(&args).unwrap();
        assert_eq!(config.server_password, "fromenv");

        let cli_args = CliArgs {
            server_password: Some("fromcli".to_string()),
            ..args.clone()
        };
        let config = Config::load(&cli_args).unwrap();
        assert_eq!(config.server_password, "fromcli");

        std::env::remove_var(SERVER_PASSWORD_ENV);
        let config = Config::load(&args).unwrap();
        assert_eq!(config.server_password, "fromfile");
    }

    #[test]
    fn test_log_level_from_flags() {
        assert_eq!(CliArgs::default().log_level(), "warn");
        let verbose = CliArgs {
            verbose: true,
            ..CliArgs::default()
        };
        assert_eq!(verbose.log_level(), "info");
        let debug = CliArgs {
            debug: true,
            verbose: true,
            ..CliArgs::default()
        };
        assert_eq!(debug.log_level(), "debug");
        let silent = CliArgs {
            silent: true,
            ..CliArgs::default()
        };
        assert_eq!(silent.log_level(), "error");
    }
}
