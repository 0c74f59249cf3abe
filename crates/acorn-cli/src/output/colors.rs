//! Terminal color support.
//!
//! Colors are on only when both stdout and stderr are terminals and
//! `NO_COLOR` is unset or empty.

use std::env;
use std::io::{self, IsTerminal};

const RED: &str = "31";
const GREEN: &str = "32";
const YELLOW: &str = "33";
const CYAN: &str = "36";
const BOLD: &str = "1";
const DIM: &str = "2";

/// Decides whether to emit ANSI escapes and applies them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Detect color support automatically
    pub fn detect() -> Self {
        let no_color = env::var_os("NO_COLOR").map_or(false, |value| !value.is_empty());
        let tty = io::stderr().is_terminal() && io::stdout().is_terminal();
        Self::from_flags(no_color, tty)
    }

    pub fn from_flags(no_color: bool, tty: bool) -> Self {
        Self {
            enabled: tty && !no_color,
        }
    }

    /// Plain text only
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    pub fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    /// Format text as dim/gray
    pub fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_need_tty_and_no_opt_out() {
        assert_eq!(ColorSupport::from_flags(false, true).green("ok"), "\x1b[32mok\x1b[0m");
        assert_eq!(ColorSupport::from_flags(true, true).green("ok"), "ok");
        assert_eq!(ColorSupport::from_flags(false, false).green("ok"), "ok");
    }

    #[test]
    fn test_paint() {
        let on = ColorSupport::from_flags(false, true);
        assert_eq!(on.red("x"), "\x1b[31mx\x1b[0m");
        assert_eq!(ColorSupport::disabled().red("x"), "x");
    }
}
