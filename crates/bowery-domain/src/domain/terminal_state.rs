use std::fmt;

/// Lifecycle of one container session.
///
/// `Saving` and `Exporting` are transient: they return to `Connected` (or move to
/// `Deleting`) when the channel reports `saved`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalState {
    #[default]
    Unbound,
    Creating,
    Launching,
    Connected,
    Saving,
    Exporting,
    Deleting,
    Closed,
}

impl TerminalState {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalState::Unbound => "unbound",
            TerminalState::Creating => "creating",
            TerminalState::Launching => "launching",
            TerminalState::Connected => "connected",
            TerminalState::Saving => "saving",
            TerminalState::Exporting => "exporting",
            TerminalState::Deleting => "deleting",
            TerminalState::Closed => "closed",
        }
    }

    /// States in which a container id has been assigned.
    pub fn has_container(self) -> bool {
        !matches!(
            self,
            TerminalState::Unbound | TerminalState::Creating | TerminalState::Closed
        )
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
