//! ANSI styling for console output: command results, views and sync states.

use std::io::IsTerminal;
use std::sync::OnceLock;

static NO_COLOR: OnceLock<bool> = OnceLock::new();

/// Decides once per process whether console output is styled.
pub fn init(no_color_flag: bool) {
    let env = std::env::var("NO_COLOR").ok();
    let _ = NO_COLOR.set(color_off(
        no_color_flag,
        env.as_deref(),
        std::io::stdout().is_terminal(),
    ));
}

/// `NO_COLOR` only counts when set to a non-empty value.
fn color_off(flag: bool, no_color_env: Option<&str>, stdout_is_tty: bool) -> bool {
    flag || no_color_env.is_some_and(|value| !value.is_empty()) || !stdout_is_tty
}

pub fn is_disabled() -> bool {
    NO_COLOR.get().copied().unwrap_or(false)
}

#[derive(Clone, Copy, Debug)]
enum Tone {
    Success,
    Error,
    Warning,
    Dim,
    Bold,
    Address,
}

impl Tone {
    fn sgr(self) -> &'static str {
        match self {
            Tone::Success => "\x1b[32m",
            Tone::Error => "\x1b[31m",
            Tone::Warning => "\x1b[33m",
            Tone::Dim => "\x1b[90m",
            Tone::Bold => "\x1b[1m",
            Tone::Address => "\x1b[1;36m",
        }
    }

    fn apply(self, text: &str, enabled: bool) -> String {
        if enabled {
            format!("{}{text}\x1b[0m", self.sgr())
        } else {
            text.to_string()
        }
    }
}

pub struct Colors;

impl Colors {
    pub fn success(text: &str) -> String {
        Tone::Success.apply(text, !is_disabled())
    }

    pub fn error(text: &str) -> String {
        Tone::Error.apply(text, !is_disabled())
    }

    pub fn warning(text: &str) -> String {
        Tone::Warning.apply(text, !is_disabled())
    }

    pub fn dim(text: &str) -> String {
        Tone::Dim.apply(text, !is_disabled())
    }

    pub fn bold(text: &str) -> String {
        Tone::Bold.apply(text, !is_disabled())
    }

    /// Container addresses stand out in view listings.
    pub fn address(text: &str) -> String {
        Tone::Address.apply(text, !is_disabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_off_rules() {
        assert!(color_off(true, None, true));
        assert!(color_off(false, Some("1"), true));
        assert!(!color_off(false, Some(""), true));
        assert!(color_off(false, None, false));
        assert!(!color_off(false, None, true));
    }

    #[test]
    fn test_tone_wraps_only_when_enabled() {
        assert_eq!(Tone::Address.apply("10.0.0.5", true), "\x1b[1;36m10.0.0.5\x1b[0m");
        assert_eq!(Tone::Success.apply("saved", false), "saved");
    }
}
