pub mod arbitrator;
pub mod automatic;
pub mod controller;
pub mod debouncer;
pub mod handoff;
pub mod limit_guard;
pub mod line;
pub mod motor;

pub use arbitrator::{Arbitrator, Decision};
pub use controller::BlindsController;
pub use handoff::Handoff;
pub use line::{Edge, EdgeMask, Line};
pub use motor::{MotorState, MotorStateMachine};

/// One-shot timer channels used by the input pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    /// Button debounce and held-press watching
    ButtonDebounce = 0,
    /// Limit-switch debounce
    LimitDebounce = 1,
    /// Limit-switch back-off, runs while the limit debounce slot is held
    LimitReaction = 2,
}

impl TimerId {
    pub const ALL: [TimerId; 3] = [
        TimerId::ButtonDebounce,
        TimerId::LimitDebounce,
        TimerId::LimitReaction,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}
