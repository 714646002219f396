use thiserror::Error;

use crate::models::PlayerState;

/// A transition that is not an edge of the lifecycle graph
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Illegal state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: String,
    pub to: String,
}

/// Whether the lifecycle graph has an edge `from -> to`
pub fn is_valid_transition(from: &PlayerState, to: &PlayerState) -> bool {
    use PlayerState::*;

    match from {
        Idle => matches!(to, Loading | Failed(_)),
        Loading => matches!(to, Ready | Failed(_) | Idle),
        Ready => matches!(to, Playing(_) | Paused | Seeking | Failed(_) | Idle),
        // Playing -> Playing re-enters with a new rate
        Playing(_) => matches!(to, Playing(_) | Paused | Seeking | Completed | Failed(_) | Idle),
        Paused => matches!(to, Playing(_) | Seeking | Failed(_) | Idle),
        // Seeking -> Seeking supersedes the pending seek
        Seeking => matches!(to, Seeking | Playing(_) | Paused | Failed(_) | Idle),
        Completed => matches!(to, Idle),
        Failed(_) => matches!(to, Idle),
    }
}

/// Owner of the current [`PlayerState`]; the only place it is mutated
#[derive(Debug)]
pub struct StateMachine {
    state: PlayerState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Idle,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Move to `to`, returning the state that was left
    pub fn transition(&mut self, to: PlayerState) -> Result<PlayerState, TransitionError> {
        if !is_valid_transition(&self.state, &to) {
            return Err(TransitionError {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        Ok(std::mem::replace(&mut self.state, to))
    }

    /// Target of `toggle_playing` from the current state, `None` when it is a no-op
    pub fn toggle_target(&self, rate: f32) -> Option<PlayerState> {
        match self.state {
            PlayerState::Playing(_) => Some(PlayerState::Paused),
            PlayerState::Paused | PlayerState::Ready => Some(PlayerState::Playing(rate)),
            _ => None,
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
