use super::state::{DoorPosition, DoorState};
use tracing::debug;

/// Outcome of feeding one classification into the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceVote {
    /// Observation matches the committed position; streak reset
    Agree,
    /// Observation disagrees; `streak` consecutive disagreements so far
    Disagree { streak: u32 },
    /// Threshold reached; the door should be committed to this position
    Commit(DoorPosition),
    /// Door is moving or stopped; observations are not debounced
    Suspended,
}

/// Consecutive-agreement filter between noisy per-frame labels and door state.
///
/// Only a stable `Open`/`Closed` current state is debounced. The streak is
/// reset on agreement, on any transitional or stopped state, and after a
/// commit.
#[derive(Debug, Clone)]
pub struct DebounceReconciler {
    threshold: u32,
    streak: u32,
}

impl DebounceReconciler {
    pub const DEFAULT_THRESHOLD: u32 = 2;

    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            streak: 0,
        }
    }

    pub fn observe(&mut self, current: DoorState, observed: DoorPosition) -> DebounceVote {
        let Some(committed) = current.stable_position() else {
            self.streak = 0;
            return DebounceVote::Suspended;
        };

        if committed == observed {
            self.streak = 0;
            return DebounceVote::Agree;
        }

        self.streak += 1;
        debug!(
            "Vision disagrees with committed {} ({}/{})",
            committed, self.streak, self.threshold
        );

        if self.streak >= self.threshold {
            self.streak = 0;
            DebounceVote::Commit(observed)
        } else {
            DebounceVote::Disagree {
                streak: self.streak,
            }
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.streak = 0;
    }
}

impl Default for DebounceReconciler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commits_only_on_second_disagreement() {
        let mut reconciler = DebounceReconciler::default();

        let first = reconciler.observe(DoorState::Closed, DoorPosition::Open);
        assert_eq!(first, DebounceVote::Disagree { streak: 1 });

        let second = reconciler.observe(DoorState::Closed, DoorPosition::Open);
        assert_eq!(second, DebounceVote::Commit(DoorPosition::Open));
        assert_eq!(reconciler.streak(), 0);
    }

    #[test]
    fn test_agreement_resets_streak() {
        let mut reconciler = DebounceReconciler::default();

        reconciler.observe(DoorState::Closed, DoorPosition::Open);
        assert_eq!(
            reconciler.observe(DoorState::Closed, DoorPosition::Closed),
            DebounceVote::Agree
        );
        assert_eq!(reconciler.streak(), 0);

        // Commitment is delayed by the intervening agreement
        assert_eq!(
            reconciler.observe(DoorState::Closed, DoorPosition::Open),
            DebounceVote::Disagree { streak: 1 }
        );
        assert_eq!(
            reconciler.observe(DoorState::Closed, DoorPosition::Open),
            DebounceVote::Commit(DoorPosition::Open)
        );
    }

    #[test]
    fn test_open_to_closed_path() {
        let mut reconciler = DebounceReconciler::new(3);

        assert_eq!(
            reconciler.observe(DoorState::Open, DoorPosition::Closed),
            DebounceVote::Disagree { streak: 1 }
        );
        assert_eq!(
            reconciler.observe(DoorState::Open, DoorPosition::Closed),
            DebounceVote::Disagree { streak: 2 }
        );
        assert_eq!(
            reconciler.observe(DoorState::Open, DoorPosition::Closed),
            DebounceVote::Commit(DoorPosition::Closed)
        );
    }

    #[test]
    fn test_transitional_and_stopped_states_suspend_debouncing() {
        let mut reconciler = DebounceReconciler::default();

        reconciler.observe(DoorState::Closed, DoorPosition::Open);
        assert_eq!(reconciler.streak(), 1);

        for state in [DoorState::Opening, DoorState::Closing, DoorState::Stopped] {
            assert_eq!(
                reconciler.observe(state, DoorPosition::Open),
                DebounceVote::Suspended
            );
            assert_eq!(reconciler.streak(), 0);
        }
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let mut reconciler = DebounceReconciler::new(0);
        assert_eq!(reconciler.threshold(), 1);
        assert_eq!(
            reconciler.observe(DoorState::Open, DoorPosition::Closed),
            DebounceVote::Commit(DoorPosition::Closed)
        );
    }
}
