//! Input arbitrator: turns pending limit and button transitions into the
//! single requested motor state.
//!
//! Each poll handles at most one transition. Pending limit transitions always
//! go first, a button transition waits for a poll with no limit pending.

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::handoff::Handoff;
use super::limit_guard::retreat_from;
use super::line::{Edge, InputChannels, Line};
use super::motor::MotorState;

/// What one poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    /// Nothing was pending.
    Idle,
    /// A transition on `line` produced a request.
    Requested(Line, MotorState),
    /// A button press was refused because its direction is blocked by a limit.
    Inhibited(Line),
}

#[derive(Debug, Default)]
pub struct Arbitrator {
    top_limit_reached: bool,
    bottom_limit_reached: bool,
}

impl Arbitrator {
    pub const fn new() -> Self {
        Self {
            top_limit_reached: false,
            bottom_limit_reached: false,
        }
    }

    pub fn top_limit_reached(&self) -> bool {
        self.top_limit_reached
    }

    pub fn bottom_limit_reached(&self) -> bool {
        self.bottom_limit_reached
    }

    /// One polling cycle.
    pub fn poll<M: RawMutex>(&mut self, channels: &InputChannels, handoff: &Handoff<M>) -> Decision {
        let decision = self.decide(channels);
        if let Decision::Requested(_, state) = decision {
            handoff.give(state);
        }
        decision
    }

    fn decide(&mut self, channels: &InputChannels) -> Decision {
        for limit in Line::LIMITS {
            if let Some(edge) = channels.get(limit).take() {
                return Decision::Requested(limit, self.limit_transition(limit, edge));
            }
        }

        for button in Line::BUTTONS {
            if let Some(edge) = channels.get(button).take() {
                return self.button_transition(button, edge);
            }
        }

        Decision::Idle
    }

    fn limit_transition(&mut self, limit: Line, edge: Edge) -> MotorState {
        let reached = edge == Edge::Rising;
        match limit {
            Line::TopLimit => self.top_limit_reached = reached,
            _ => self.bottom_limit_reached = reached,
        }

        if reached {
            info!("{} reached", limit);
            retreat_from(limit)
        } else {
            info!("{} clear", limit);
            MotorState::Off
        }
    }

    fn button_transition(&self, button: Line, edge: Edge) -> Decision {
        debug!(
            "{} {} (top {}, bottom {})",
            button, edge, self.top_limit_reached, self.bottom_limit_reached
        );

        if edge == Edge::Falling {
            return Decision::Requested(button, MotorState::Off);
        }

        let (state, blocked) = match button {
            Line::ButtonDown => (MotorState::Clockwise, self.bottom_limit_reached),
            _ => (MotorState::Anticlockwise, self.top_limit_reached),
        };

        if blocked {
            info!("{} inhibited by limit", button);
            Decision::Inhibited(button)
        } else {
            Decision::Requested(button, state)
        }
    }
}
