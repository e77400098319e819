//! # Presentation Filter
//!
//! Formats incoming channel events for the console, outside the core
//! loop. Display preferences select which of channel and nick are shown;
//! plugin text filters are pure string transforms applied to the message
//! body before formatting.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.6.0

use crate::core::Config;

/// Pure text-transform hook, applied synchronously to message bodies.
pub type TextFilter = Box<dyn Fn(&str) -> String + Send + Sync>;

/// What the formatted output should include.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayPrefs {
    pub show_channel: bool,
    pub show_nick: bool,
    pub show_joins: bool,
}

impl DisplayPrefs {
    pub fn from_config(config: &Config) -> Self {
        DisplayPrefs {
            show_channel: config.show_channel,
            show_nick: config.show_nick,
            show_joins: config.show_joins,
        }
    }
}

/// Formatter for incoming traffic.
pub struct Presenter {
    prefs: DisplayPrefs,
    filters: Vec<TextFilter>,
}

impl Presenter {
    pub fn new(prefs: DisplayPrefs) -> Self {
        Presenter {
            prefs,
            filters: Vec::new(),
        }
    }

    pub fn prefs(&self) -> DisplayPrefs {
        self.prefs
    }

    /// Install a plugin text filter. Filters run in installation order.
    pub fn add_filter(&mut self, filter: TextFilter) {
        self.filters.push(filter);
    }

    fn apply_filters(&self, text: &str) -> String {
        let mut out = text.to_string();
        for filter in &self.filters {
            out = filter(&out);
        }
        out
    }

    /// Format one incoming message for stdout.
    pub fn render_message(&self, channel: &str, nick: &str, text: &str) -> String {
        let text = self.apply_filters(text);
        match (self.prefs.show_channel, self.prefs.show_nick) {
            (true, true) => format!("{channel} - {nick}: {text}"),
            (true, false) => format!("{channel} - {text}"),
            (false, true) => format!("{nick}: {text}"),
            (false, false) => text,
        }
    }

    /// Format a join notice, when joins are shown at all.
    pub fn render_join(&self, channel: &str, nick: &str) -> Option<String> {
        self.prefs
            .show_joins
            .then(|| format!("{channel} - {nick} joined"))
    }
}
