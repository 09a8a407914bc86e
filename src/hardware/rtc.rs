use chrono::NaiveDateTime;
use embassy_time::Duration;

use super::traits::RtcClock;

/// Software wall clock: a start time plus the uptime reported by the caller.
/// The "blinds closed" flag is kept in RAM.
pub struct SoftwareRtc {
    base: NaiveDateTime,
    uptime: Duration,
    closed: bool,
}

impl SoftwareRtc {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            base: start,
            uptime: Duration::from_ticks(0),
            closed: false,
        }
    }

    pub fn set_uptime(&mut self, uptime: Duration) {
        self.uptime = uptime;
    }

    fn elapsed(uptime: Duration) -> chrono::Duration {
        chrono::Duration::milliseconds(uptime.as_millis() as i64)
    }
}

impl RtcClock for SoftwareRtc {
    fn now(&self) -> NaiveDateTime {
        self.base
            .checked_add_signed(Self::elapsed(self.uptime))
            .unwrap_or(self.base)
    }

    fn blinds_closed(&self) -> bool {
        self.closed
    }

    fn set_blinds_closed(&mut self, closed: bool) {
        self.closed = closed;
    }
}
