//! Limit-switch guard.
//!
//! A confirmed limit press takes exclusive control: every input is masked and
//! the motor is commanded away from the switch straight from timer context,
//! without waiting for the arbitrator's next poll. After the per-limit
//! reaction time the switch is re-sampled; once it reads low the guard hands
//! control back with the motor off and all inputs re-armed on their rise.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::handoff::Handoff;
use super::line::{InterruptMask, Line};
use super::motor::MotorState;
use crate::hardware::traits::MotorOutputs;

/// Direction that drives the blind away from `limit`.
pub const fn retreat_from(limit: Line) -> MotorState {
    match limit {
        Line::TopLimit => MotorState::Clockwise,
        Line::BottomLimit => MotorState::Anticlockwise,
        Line::ButtonUp | Line::ButtonDown => MotorState::Off,
    }
}

const NOT_ENGAGED: u8 = u8::MAX;

pub struct LimitGuard {
    engaged: AtomicU8,
}

impl LimitGuard {
    pub const fn new() -> Self {
        Self {
            engaged: AtomicU8::new(NOT_ENGAGED),
        }
    }

    /// The limit currently holding exclusive control.
    pub fn engaged(&self) -> Option<Line> {
        Line::from_index(self.engaged.load(Ordering::Acquire))
    }

    /// Seizes control after a confirmed press of `limit`.
    pub fn engage<M: RawMutex>(&self, limit: Line, interrupts: &InterruptMask, handoff: &Handoff<M>) {
        interrupts.disable_all();
        self.engaged.store(limit as u8, Ordering::Release);
        handoff.give(retreat_from(limit));
        info!("{} reached, backing off", limit);
    }

    /// Switch still asserted after the reaction time: keep backing off.
    pub fn retreat<M: RawMutex>(&self, limit: Line, handoff: &Handoff<M>) {
        debug!("{} still engaged", limit);
        handoff.give(retreat_from(limit));
    }

    /// Switch released: stop the motor and give up control.
    pub fn clear<M: RawMutex>(&self, limit: Line, handoff: &Handoff<M>) {
        self.engaged.store(NOT_ENGAGED, Ordering::Release);
        handoff.give(MotorState::Off);
        info!("{} cleared", limit);
    }
}

impl Default for LimitGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Start-up recovery for a limit that is already engaged at boot.
///
/// Drives the outputs directly, away from the switch, for as long as it reads
/// asserted, then stops. Runs before any input is armed and before the motor
/// state machine owns the outputs.
pub fn recover<O: MotorOutputs>(limit: Line, outputs: &mut O, mut asserted: impl FnMut() -> bool) {
    let direction = retreat_from(limit);
    warn!("{} engaged at start-up, driving {}", limit, direction);

    while asserted() {
        outputs.drive(direction);
    }

    outputs.drive(MotorState::Off);
    info!("{} recovered", limit);
}
