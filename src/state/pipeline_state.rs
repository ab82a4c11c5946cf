/// Pipeline state definitions for tracking a capture
///
/// This module defines every stage a capture passes through and which stage
/// may follow which.
use std::fmt;

/// Represents the current stage of one capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    // ===== Active States =====
    /// Snapshot directory is being created
    Reserving,

    /// Site is being crawled
    Crawling,

    /// Resources are being rewritten and written to disk
    Saving,

    /// Landing page is being created
    Finalizing,

    // ===== Terminal States =====
    /// Capture is in the manifest
    Recorded,

    /// Capture stopped on an error; files written so far stay on disk
    Failed,
}

impl PipelineState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Recorded | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Stages advance strictly in order. Any active stage may fail.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Reserving, Self::Crawling)
            | (Self::Crawling, Self::Saving)
            | (Self::Saving, Self::Finalizing)
            | (Self::Finalizing, Self::Recorded) => true,
            (current, Self::Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Returns the stage that follows on success, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Reserving => Some(Self::Crawling),
            Self::Crawling => Some(Self::Saving),
            Self::Saving => Some(Self::Finalizing),
            Self::Finalizing => Some(Self::Recorded),
            Self::Recorded | Self::Failed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserving => "reserving",
            Self::Crawling => "crawling",
            Self::Saving => "saving",
            Self::Finalizing => "finalizing",
            Self::Recorded => "recorded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PipelineState; 6] = [
        PipelineState::Reserving,
        PipelineState::Crawling,
        PipelineState::Saving,
        PipelineState::Finalizing,
        PipelineState::Recorded,
        PipelineState::Failed,
    ];

    #[test]
    fn test_happy_path_transitions() {
        let mut state = PipelineState::Reserving;
        while let Some(next) = state.next() {
            assert!(state.can_transition_to(next));
            state = next;
        }
        assert_eq!(state, PipelineState::Recorded);
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!PipelineState::Reserving.can_transition_to(PipelineState::Saving));
        assert!(!PipelineState::Crawling.can_transition_to(PipelineState::Recorded));
        assert!(!PipelineState::Saving.can_transition_to(PipelineState::Crawling));
    }

    #[test]
    fn test_active_states_can_fail() {
        for state in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(state.can_transition_to(PipelineState::Failed));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(PipelineState::Finalizing.to_string(), "finalizing");
        assert_eq!(PipelineState::Failed.to_string(), "failed");
    }
}
