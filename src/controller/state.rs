//! Controller state machine states, per-run statistics and cycle outcomes.

use crate::render::Artifact;

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

/// States of the press-to-record controller.
///
/// ```text
/// Idle ──initialize──▶ ArmedWaiting ──press──▶ Recording
///                           ▲                      │ release
///                           │                      ▼
///                           └──finalize/render── Draining
/// any state ──cancel──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControllerState {
    /// Hardware not checked yet, or released after shutdown.
    #[default]
    Idle,
    /// Waiting for the button to be pressed.
    ArmedWaiting,
    /// Stream armed; chunks flow into the session until release.
    Recording,
    /// Released; disarming, finalizing and rendering.
    Draining,
}

impl ControllerState {
    /// `true` while a capture session is live.
    ///
    /// ```
    /// use stethoscope::controller::ControllerState;
    ///
    /// assert!(!ControllerState::Idle.is_busy());
    /// assert!(!ControllerState::ArmedWaiting.is_busy());
    /// assert!(ControllerState::Recording.is_busy());
    /// assert!(ControllerState::Draining.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, ControllerState::Recording | ControllerState::Draining)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ControllerState::Idle => "Idle",
            ControllerState::ArmedWaiting => "Armed",
            ControllerState::Recording => "Recording",
            ControllerState::Draining => "Draining",
        }
    }
}

// ---------------------------------------------------------------------------
// ControllerStats
// ---------------------------------------------------------------------------

/// Counters for one controller run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Presses that started a cycle.
    pub cycles: usize,
    /// Cycles that produced an artifact.
    pub rendered: usize,
    /// Cycles where no audio arrived before release.
    pub empty: usize,
    /// Non-fatal faults recovered from.
    pub faults: usize,
}

// ---------------------------------------------------------------------------
// CycleOutcome
// ---------------------------------------------------------------------------

/// How one press/release cycle ended without a fault.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Rendered(Artifact),
    /// Released before any chunk arrived; nothing rendered.
    Empty,
    /// Cancelled while waiting or recording; the session was discarded.
    Cancelled,
}

impl CycleOutcome {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            CycleOutcome::Rendered(artifact) => Some(artifact),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- ControllerState ---

    #[test]
    fn idle_and_armed_are_not_busy() {
        assert!(!ControllerState::Idle.is_busy());
        assert!(!ControllerState::ArmedWaiting.is_busy());
    }

    #[test]
    fn recording_and_draining_are_busy() {
        assert!(ControllerState::Recording.is_busy());
        assert!(ControllerState::Draining.is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(ControllerState::Idle.label(), "Idle");
        assert_eq!(ControllerState::ArmedWaiting.label(), "Armed");
        assert_eq!(ControllerState::Recording.label(), "Recording");
        assert_eq!(ControllerState::Draining.label(), "Draining");
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(ControllerState::default(), ControllerState::Idle);
    }

    // ---- ControllerStats / CycleOutcome ---

    #[test]
    fn stats_start_at_zero() {
        let stats = ControllerStats::default();
        assert_eq!(stats.cycles + stats.rendered + stats.empty + stats.faults, 0);
    }

    #[test]
    fn only_rendered_outcome_has_artifact() {
        assert!(CycleOutcome::Empty.artifact().is_none());
        assert!(CycleOutcome::Cancelled.artifact().is_none());
    }
}
