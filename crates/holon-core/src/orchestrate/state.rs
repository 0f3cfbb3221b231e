use serde::{Deserialize, Serialize};

/// Lifecycle of one intent within a run.
///
/// `Pending -> Created -> Planned -> Selected -> Executed`, or `Failed` from
/// any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Nothing has run yet.
    #[default]
    Pending,
    /// Creation stage succeeded.
    Created,
    /// Planning stage succeeded.
    Planned,
    /// A plan was chosen.
    Selected,
    /// Execution stage succeeded.
    Executed,
    /// A stage or the selection failed.
    Failed,
}

impl LifecycleState {
    /// Successor on success, `None` for terminal states.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Created),
            Self::Created => Some(Self::Planned),
            Self::Planned => Some(Self::Selected),
            Self::Selected => Some(Self::Executed),
            Self::Executed | Self::Failed => None,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Failed)
    }

    /// Lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Created => "created",
            Self::Planned => "planned",
            Self::Selected => "selected",
            Self::Executed => "executed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory state of the current run. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationState {
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Intent read from the descriptor, once known.
    pub intent_id: Option<String>,
    /// Plan chosen by the selector, once known.
    pub selected_plan: Option<String>,
    /// Terminal error message.
    pub last_error: Option<String>,
    /// Every state entered after `Pending`, in order.
    pub transitions: Vec<LifecycleState>,
}

impl OrchestrationState {
    /// Move to the successor state. Returns the new state, or `None` if the
    /// current state is terminal.
    pub fn advance(&mut self) -> Option<LifecycleState> {
        let next = self.state.next()?;
        self.state = next;
        self.transitions.push(next);
        Some(next)
    }

    /// Enter `Failed`, keeping the error message. No-op once terminal.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        if self.state.is_terminal() {
            return;
        }
        self.state = LifecycleState::Failed;
        self.transitions.push(LifecycleState::Failed);
        self.last_error = Some(error.to_string());
    }

    /// Whether the run reached `Executed`.
    pub fn succeeded(&self) -> bool {
        self.state == LifecycleState::Executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_through_fixed_order() {
        let mut state = OrchestrationState::default();
        while state.advance().is_some() {}

        assert!(state.succeeded());
        assert_eq!(
            state.transitions,
            vec![
                LifecycleState::Created,
                LifecycleState::Planned,
                LifecycleState::Selected,
                LifecycleState::Executed,
            ]
        );
        assert!(state.advance().is_none());
    }

    #[test]
    fn fail_is_terminal_and_keeps_message() {
        let mut state = OrchestrationState::default();
        state.advance();
        state.fail("planner exploded");

        assert_eq!(state.state, LifecycleState::Failed);
        assert_eq!(state.last_error.as_deref(), Some("planner exploded"));
        assert!(state.advance().is_none());

        state.fail("second failure");
        assert_eq!(state.last_error.as_deref(), Some("planner exploded"));
        assert_eq!(
            state.transitions,
            vec![LifecycleState::Created, LifecycleState::Failed]
        );
    }

    #[test]
    fn executed_cannot_fail() {
        let mut state = OrchestrationState::default();
        while state.advance().is_some() {}
        state.fail("late");
        assert!(state.succeeded());
        assert!(state.last_error.is_none());
    }
}
