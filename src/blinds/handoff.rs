//! Single-slot handoff of the requested motor state.
//!
//! Producers store the newest request and raise a binary permit; the motor
//! task blocks on the permit and then reads whatever request is newest.
//! Raising a permit that is already raised does nothing, so any number of
//! requests between two takes coalesce into one.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

use super::motor::MotorState;

pub struct Handoff<M: RawMutex> {
    requested: AtomicU8,
    permit: Signal<M, ()>,
}

impl<M: RawMutex> Handoff<M> {
    pub const fn new() -> Self {
        Self {
            requested: AtomicU8::new(MotorState::Off as u8),
            permit: Signal::new(),
        }
    }

    /// Publishes `state` as the newest request. Never blocks, never fails.
    pub fn give(&self, state: MotorState) {
        self.requested.store(state as u8, Ordering::Release);
        self.permit.signal(());
    }

    /// The newest request, whether or not it was consumed yet.
    pub fn requested(&self) -> MotorState {
        MotorState::from_u8(self.requested.load(Ordering::Acquire))
    }

    /// Waits for a permit and returns the newest request.
    pub async fn take(&self) -> MotorState {
        self.permit.wait().await;
        self.requested()
    }

    pub fn try_take(&self) -> Option<MotorState> {
        self.permit.try_take().map(|()| self.requested())
    }

    pub fn is_pending(&self) -> bool {
        self.permit.signaled()
    }
}

impl<M: RawMutex> Default for Handoff<M> {
    fn default() -> Self {
        Self::new()
    }
}
