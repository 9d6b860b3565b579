//! # Output Configuration
//!
//! This module controls how the CLI decorates its progress and result lines,
//! based on terminal capabilities and user preferences.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables decoration when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables decoration
//! - `CLICOLOR_FORCE=1` - Forces decoration even in non-TTY
//! - `TERM=dumb` - Disables decoration for dumb terminals
//!
//! ## Usage
//!
//! ```rust
//! use gomerge::output::{marker, OutputConfig};
//!
//! let out = OutputConfig::from_env_and_flag("never");
//! assert_eq!(marker(&out, "✅", "[OK]"), "[OK]");
//! ```

use std::env;

/// Output configuration for the CLI.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether symbols and styling should be used.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from the environment and the value of
    /// the `--color` flag (`always`, `never` or `auto`).
    ///
    /// In auto mode, decoration is disabled if:
    /// - `NO_COLOR` is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Style `text` as a path or name when decoration is enabled.
    pub fn highlight(&self, text: &str) -> String {
        if self.use_color {
            console::style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The symbol when decoration is enabled, otherwise the plain marker.
pub fn marker<'a>(config: &OutputConfig, symbol: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        symbol
    } else {
        plain
    }
}
