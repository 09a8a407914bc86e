use chrono::NaiveDateTime;
use embassy_time::Duration;

use crate::blinds::line::Line;
use crate::blinds::motor::MotorState;
use crate::blinds::TimerId;

pub trait Led {
    fn on(&mut self);
    fn off(&mut self);
    fn toggle(&mut self);
}

/// Current level of the input lines, readable from timer context.
pub trait InputLevels {
    fn is_high(&self, line: Line) -> bool;
}

/// One-shot timer channels. Arming an armed timer replaces its delay.
pub trait OneShotTimers {
    fn arm(&self, timer: TimerId, delay: Duration);
}

/// The motor's two direction outputs plus the running indicator.
pub trait MotorOutputs {
    fn drive(&mut self, state: MotorState);
}

/// Wall clock and the persisted "blinds closed" flag.
pub trait RtcClock {
    fn now(&self) -> NaiveDateTime;
    fn blinds_closed(&self) -> bool;
    fn set_blinds_closed(&mut self, closed: bool);
}
