/// Run state definitions for tracking pipeline progress
///
/// A run moves strictly forward through the stages below. `Aborted` can be
/// entered from any non-terminal stage when the input that stage needs is absent.
use std::fmt;

/// Represents the current stage of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    // ===== Active States =====
    /// Nothing has happened yet
    Start,

    /// The listing page content is available
    Fetched,

    /// The target matchweek is known
    PeriodResolved,

    /// The detail links for the matchweek are known
    LinksResolved,

    /// Every link has been handed to the scorer
    Dispatched,

    /// The weekly artifact has been written
    Merged,

    // ===== Terminal States =====
    /// The run completed
    Done,

    /// The run stopped early because there was nothing to do
    Aborted,
}

impl RunState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// The single forward successor of an active state
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::Fetched),
            Self::Fetched => Some(Self::PeriodResolved),
            Self::PeriodResolved => Some(Self::LinksResolved),
            Self::LinksResolved => Some(Self::Dispatched),
            Self::Dispatched => Some(Self::Merged),
            Self::Merged => Some(Self::Done),
            Self::Done | Self::Aborted => None,
        }
    }

    /// Whether `self -> to` is a legal transition
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Aborted || self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Fetched => "fetched",
            Self::PeriodResolved => "period_resolved",
            Self::LinksResolved => "links_resolved",
            Self::Dispatched => "dispatched",
            Self::Merged => "merged",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVE: [RunState; 6] = [
        RunState::Start,
        RunState::Fetched,
        RunState::PeriodResolved,
        RunState::LinksResolved,
        RunState::Dispatched,
        RunState::Merged,
    ];

    #[test]
    fn test_is_terminal() {
        for state in ACTIVE {
            assert!(!state.is_terminal());
        }
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Aborted.is_terminal());
    }

    #[test]
    fn test_forward_chain_reaches_done() {
        let mut state = RunState::Start;
        let mut steps = 0;
        while let Some(next) = state.next() {
            assert!(state.can_transition_to(next));
            state = next;
            steps += 1;
        }
        assert_eq!(state, RunState::Done);
        assert_eq!(steps, 6);
    }

    #[test]
    fn test_abort_from_any_active_state() {
        for state in ACTIVE {
            assert!(state.can_transition_to(RunState::Aborted));
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!RunState::Start.can_transition_to(RunState::PeriodResolved));
        assert!(!RunState::LinksResolved.can_transition_to(RunState::Fetched));
        assert!(!RunState::Fetched.can_transition_to(RunState::Done));
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(!RunState::Done.can_transition_to(RunState::Aborted));
        assert!(!RunState::Aborted.can_transition_to(RunState::Start));
        assert!(!RunState::Aborted.can_transition_to(RunState::Aborted));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunState::PeriodResolved.to_string(), "period_resolved");
        assert_eq!(RunState::Aborted.to_string(), "aborted");
    }
}
