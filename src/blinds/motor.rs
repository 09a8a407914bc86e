//! Motor state machine: the single consumer of requested motor states and the
//! only writer of the motor outputs in normal operation.

use crate::hardware::traits::MotorOutputs;

/// Motor direction. Clockwise lowers the blind, anticlockwise raises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MotorState {
    #[default]
    Off = 0,
    Clockwise = 1,
    Anticlockwise = 2,
}

/// Output pin levels for one motor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputLevels {
    pub control_1: bool,
    pub control_2: bool,
    pub indicator: bool,
}

impl MotorState {
    /// Unknown encodings decode to `Off`.
    pub const fn from_u8(value: u8) -> MotorState {
        match value {
            1 => MotorState::Clockwise,
            2 => MotorState::Anticlockwise,
            _ => MotorState::Off,
        }
    }

    pub const fn levels(self) -> OutputLevels {
        match self {
            MotorState::Off => OutputLevels {
                control_1: false,
                control_2: false,
                indicator: false,
            },
            MotorState::Clockwise => OutputLevels {
                control_1: true,
                control_2: false,
                indicator: true,
            },
            MotorState::Anticlockwise => OutputLevels {
                control_1: false,
                control_2: true,
                indicator: true,
            },
        }
    }
}

pub struct MotorStateMachine<O> {
    outputs: O,
    current: MotorState,
}

impl<O: MotorOutputs> MotorStateMachine<O> {
    /// Takes ownership of the outputs and drives them to `Off`.
    pub fn new(mut outputs: O) -> Self {
        outputs.drive(MotorState::Off);
        Self {
            outputs,
            current: MotorState::Off,
        }
    }

    pub fn current(&self) -> MotorState {
        self.current
    }

    /// Drives the outputs for `state`. Re-applying the current state only
    /// re-asserts the same levels.
    pub fn apply(&mut self, state: MotorState) {
        self.outputs.drive(state);
        self.current = state;
    }

    /// Transitions to `requested` if it differs from the current state.
    /// Returns true when a transition happened.
    pub fn service(&mut self, requested: MotorState) -> bool {
        if requested == self.current {
            return false;
        }

        info!("motor {} -> {}", self.current, requested);
        self.apply(requested);
        true
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }
}
