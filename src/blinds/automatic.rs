//! Time-of-day automatic control.
//!
//! Closes the blinds in the evening and opens them in the morning. The
//! "blinds closed" flag lives with the clock so a power cycle does not repeat
//! a move that already happened. A close request runs the motor clockwise
//! until the bottom limit stops it, an open request anticlockwise until the
//! top limit does.

use chrono::Timelike;

use super::motor::MotorState;
use crate::hardware::traits::RtcClock;

/// Hours (0-23) at which the closed and open windows start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Schedule {
    pub close_hour: u32,
    pub open_hour: u32,
}

impl Schedule {
    pub const DEFAULT: Self = Self {
        close_hour: 19,
        open_hour: 7,
    };

    /// True if `hour` falls in the closed window. The window may wrap midnight.
    pub fn wants_closed(&self, hour: u32) -> bool {
        if self.close_hour > self.open_hour {
            hour >= self.close_hour || hour < self.open_hour
        } else {
            hour >= self.close_hour && hour < self.open_hour
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Default)]
pub struct AutomaticControl {
    schedule: Schedule,
}

impl AutomaticControl {
    pub const fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }

    /// Compares the clock with the persisted flag and returns the move to
    /// request, if any. The flag is updated together with the decision.
    pub fn evaluate<R: RtcClock>(&self, rtc: &mut R) -> Option<MotorState> {
        let now = rtc.now();
        let closed = rtc.blinds_closed();
        let hour = now.hour();
        debug!("automatic: {}:{} closed {}", hour, now.minute(), closed);

        match (self.schedule.wants_closed(hour), closed) {
            (true, false) => {
                info!("automatic: closing at {}:{}", hour, now.minute());
                rtc.set_blinds_closed(true);
                Some(MotorState::Clockwise)
            }
            (false, true) => {
                info!("automatic: opening at {}:{}", hour, now.minute());
                rtc.set_blinds_closed(false);
                Some(MotorState::Anticlockwise)
            }
            _ => None,
        }
    }
}
