//! Board configuration and tunable timings for the STM32F103 "Blue Pill" blinds actuator.
//!
//! # Pin Mapping Summary
//!
//! ## Inputs (active-high, internal pull-down)
//! - **Button Up**: PB14 (EXTI14)
//! - **Button Down**: PB13 (EXTI13)
//! - **Top Limit Switch**: PB8 (EXTI8)
//! - **Bottom Limit Switch**: PB9 (EXTI9)
//!
//! ## Switch supply
//! - PB10, PB11, PB12, PB15 are driven high and feed the common side of the
//!   buttons and limit switches.
//!
//! ## Motor (H-bridge inputs)
//! - **Control 1**: PA0
//! - **Control 2**: PA1
//!
//! ## Indicators
//! - **Motor running LED**: PC13 (onboard LED, active-low)
//!
//! Every limit switch and button sits on its own EXTI line, so the edge
//! watchers never share an interrupt channel.

use chrono::{NaiveDate, NaiveDateTime};
use embassy_time::Duration;

use crate::blinds::line::Line;

/// Raw pin id of an STM32 pin: `port * 16 + pin` (PA0 = 0, PB0 = 16, PC0 = 32).
pub const fn pin_id(port: u8, pin: u8) -> u8 {
    port * 16 + pin
}

const PORT_B: u8 = 1;

/// PB14
pub const BUTTON_UP_PIN: u8 = pin_id(PORT_B, 14);

/// PB13
pub const BUTTON_DOWN_PIN: u8 = pin_id(PORT_B, 13);

/// PB8
pub const TOP_LIMIT_PIN: u8 = pin_id(PORT_B, 8);

/// PB9
pub const BOTTOM_LIMIT_PIN: u8 = pin_id(PORT_B, 9);

/// Pin id to logical line mapping used to build the edge dispatch table.
pub const LINE_PINS: [(u8, Line); 4] = [
    (BUTTON_UP_PIN, Line::ButtonUp),
    (BUTTON_DOWN_PIN, Line::ButtonDown),
    (TOP_LIMIT_PIN, Line::TopLimit),
    (BOTTOM_LIMIT_PIN, Line::BottomLimit),
];

/// Base limit-switch reaction time. The top limit gets ten times this, the
/// blind needs longer to travel back off the top stop.
const LIMIT_REACTION_MS: u64 = 100;

/// Timings of the input pipeline and the polling tasks.
///
/// The reaction durations were tuned on one mechanical assembly and usually
/// need re-tuning for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay between a raw button edge and the re-sample of its level
    pub button_debounce: Duration,
    /// Delay between a raw limit-switch edge and the re-sample of its level
    pub limit_debounce: Duration,
    /// How long the motor backs off the top limit before it is re-checked
    pub top_limit_reaction: Duration,
    /// How long the motor backs off the bottom limit before it is re-checked
    pub bottom_limit_reaction: Duration,
    /// Arbitrator polling period
    pub arbitrator_period: Duration,
    /// Motor task period
    pub motor_period: Duration,
    /// Automatic schedule evaluation period
    pub automatic_period: Duration,
    /// Power-up delay before the inputs are sampled
    pub startup_settle: Duration,
    /// Upper bound on how stale the mirrored input levels may get
    pub level_refresh: Duration,
}

impl Timing {
    pub const DEFAULT: Self = Self {
        button_debounce: Duration::from_millis(100),
        limit_debounce: Duration::from_millis(10),
        top_limit_reaction: Duration::from_millis(LIMIT_REACTION_MS * 10),
        bottom_limit_reaction: Duration::from_millis(LIMIT_REACTION_MS),
        arbitrator_period: Duration::from_millis(100),
        motor_period: Duration::from_millis(100),
        automatic_period: Duration::from_secs(50),
        startup_settle: Duration::from_secs(4),
        level_refresh: Duration::from_millis(2),
    };

    /// Reaction duration for the given limit switch. Buttons have none.
    pub const fn reaction(&self, line: Line) -> Duration {
        match line {
            Line::TopLimit => self.top_limit_reaction,
            _ => self.bottom_limit_reaction,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Start-up majority vote: a line is high if at least `threshold` of
/// `samples` reads are high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorityVote {
    pub samples: u8,
    pub threshold: u8,
}

impl MajorityVote {
    pub const DEFAULT: Self = Self {
        samples: 100,
        threshold: 70,
    };
}

impl Default for MajorityVote {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Wall-clock time the software RTC starts from after power-up.
pub fn rtc_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 7, 20)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .unwrap_or_default()
}
