use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use super::traits::OneShotTimers;
use crate::blinds::TimerId;

/// One-shot timers backed by signals: arming stores the delay, the timer's
/// task sleeps it off. Arming again before expiry restarts with the new delay.
pub struct TimerSignals<M: RawMutex> {
    signals: [Signal<M, Duration>; 3],
}

impl<M: RawMutex> TimerSignals<M> {
    pub const fn new() -> Self {
        Self {
            signals: [Signal::new(), Signal::new(), Signal::new()],
        }
    }

    pub fn signal(&self, timer: TimerId) -> &Signal<M, Duration> {
        &self.signals[timer.index()]
    }

    /// Resolves when `timer` has been armed and its newest delay has elapsed.
    pub async fn expired(&self, timer: TimerId) {
        let signal = self.signal(timer);
        let mut delay = signal.wait().await;
        while let Either::Second(rearmed) = select(Timer::after(delay), signal.wait()).await {
            delay = rearmed;
        }
    }
}

impl<M: RawMutex> Default for TimerSignals<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> OneShotTimers for TimerSignals<M> {
    fn arm(&self, timer: TimerId, delay: Duration) {
        self.signal(timer).signal(delay);
    }
}
