/// Lock-on state machine states.
///
/// `Idle -> Locked <-> Predicting -> Searching`, `Searching -> Locked` on
/// re-acquisition, and any state back to `Idle` when the lock is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackingState {
    /// No target selected
    #[default]
    Idle,
    /// Target seen in the latest frame
    Locked,
    /// Target missing, still within the loss horizon
    Predicting,
    /// Target considered lost; scanning for it by appearance
    Searching,
}

impl TrackingState {
    /// True while a target is selected, whether or not it is currently visible.
    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(TrackingState::default(), TrackingState::Idle);
        assert!(!TrackingState::Idle.is_active());
        assert!(TrackingState::Searching.is_active());
    }
}
