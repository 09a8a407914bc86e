//! Interrupt- and timer-side half of the input pipeline.
//!
//! [`BlindsController`] is the shared state handle every context works on:
//! edge watchers call [`BlindsController::on_gpio_event`], timer tasks call
//! [`BlindsController::on_timer_expiry`], the arbitrator consumes the channel
//! records and the motor task consumes the handoff. Each field has exactly
//! one writer at a time, the handoff permit is the only synchronisation.

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::TimerId;
use super::debouncer::{Debouncer, Sample};
use super::handoff::Handoff;
use super::limit_guard::{self, LimitGuard};
use super::line::{
    DispatchTable, Edge, EdgeMask, ExpectedEdges, InputChannels, InterruptMask, Line, LineClass,
};
use crate::config::Timing;
use crate::hardware::traits::{InputLevels, MotorOutputs, OneShotTimers};

pub struct BlindsController<M: RawMutex> {
    pub channels: InputChannels,
    pub interrupts: InterruptMask,
    pub handoff: Handoff<M>,
    debouncer: Debouncer,
    guard: LimitGuard,
    timing: Timing,
}

impl<M: RawMutex> BlindsController<M> {
    pub const fn new(timing: Timing) -> Self {
        Self {
            channels: InputChannels::new(),
            interrupts: InterruptMask::new(),
            handoff: Handoff::new(),
            debouncer: Debouncer::new(),
            guard: LimitGuard::new(),
            timing,
        }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// The limit switch currently holding exclusive control.
    pub fn limit_engaged(&self) -> Option<Line> {
        self.guard.engaged()
    }

    /// Backs the blind off every limit switch that read engaged at start-up.
    /// Must run before [`Self::arm_inputs`].
    pub fn recover_limits<O: MotorOutputs>(
        &self,
        levels: [bool; 4],
        outputs: &mut O,
        mut is_high: impl FnMut(Line) -> bool,
    ) {
        for limit in Line::LIMITS {
            if levels[limit.index()] {
                limit_guard::recover(limit, outputs, || is_high(limit));
            }
        }
    }

    /// Enables the edge interrupts. Buttons wait for the edge opposite to
    /// their start-up level, limit switches (recovered by now) for their rise.
    pub fn arm_inputs(&self, levels: [bool; 4]) {
        let mut expected = ExpectedEdges::from_levels(levels);
        for limit in Line::LIMITS {
            expected.set(limit, EdgeMask::RISE);
        }
        self.interrupts.enable_all(&expected);
        info!("inputs armed");
    }

    /// Entry point of the single GPIO edge callback.
    pub fn on_gpio_event<T: OneShotTimers>(
        &self,
        table: &DispatchTable,
        pin: u8,
        edges: EdgeMask,
        timers: &T,
    ) {
        match table.lookup(pin) {
            Some(line) => self.on_raw_edge(line, edges, timers),
            None => warn!("edge on unknown pin {}", pin),
        }
    }

    pub fn on_raw_edge<T: OneShotTimers>(&self, line: Line, edges: EdgeMask, timers: &T) {
        if !self.interrupts.accepts(line, edges) {
            trace!("{}: masked edge {}", line, edges);
            return;
        }

        if self.debouncer.on_raw_edge(line, edges, &self.interrupts).is_some() {
            let (timer, delay) = match line.class() {
                LineClass::Button => (TimerId::ButtonDebounce, self.timing.button_debounce),
                LineClass::Limit => (TimerId::LimitDebounce, self.timing.limit_debounce),
            };
            timers.arm(timer, delay);
        }
    }

    pub fn on_timer_expiry<L: InputLevels, T: OneShotTimers>(
        &self,
        timer: TimerId,
        levels: &L,
        timers: &T,
    ) {
        match timer {
            TimerId::ButtonDebounce => self.button_debounce_expired(levels, timers),
            TimerId::LimitDebounce => self.limit_debounce_expired(levels, timers),
            TimerId::LimitReaction => self.limit_reaction_expired(levels, timers),
        }
    }

    fn button_debounce_expired<L: InputLevels, T: OneShotTimers>(&self, levels: &L, timers: &T) {
        match self.debouncer.on_expiry(LineClass::Button, |line| levels.is_high(line)) {
            Sample::Press(line) => {
                self.channels.get(line).confirm(Edge::Rising);
                timers.arm(TimerId::ButtonDebounce, self.timing.button_debounce);
            }
            Sample::Held(_) => {
                timers.arm(TimerId::ButtonDebounce, self.timing.button_debounce);
            }
            Sample::Release(line) => {
                self.channels.get(line).confirm(Edge::Falling);
                // An engaged limit re-arms every line itself once it clears.
                if self.guard.engaged().is_none() {
                    for button in Line::BUTTONS {
                        self.interrupts.enable(button, EdgeMask::RISE);
                    }
                }
            }
            Sample::Noise(_) | Sample::Idle => {}
        }
    }

    fn limit_debounce_expired<L: InputLevels, T: OneShotTimers>(&self, levels: &L, timers: &T) {
        match self.debouncer.on_expiry(LineClass::Limit, |line| levels.is_high(line)) {
            Sample::Press(limit) => {
                self.guard.engage(limit, &self.interrupts, &self.handoff);
                self.channels.get(limit).confirm(Edge::Rising);
                timers.arm(TimerId::LimitReaction, self.timing.reaction(limit));
            }
            Sample::Noise(_) => {
                for limit in Line::LIMITS {
                    self.interrupts.enable(limit, EdgeMask::RISE);
                }
            }
            // A confirmed limit stays with the guard until its reaction
            // timer clears it, this timer never sees it again.
            Sample::Held(_) | Sample::Release(_) | Sample::Idle => {}
        }
    }

    fn limit_reaction_expired<L: InputLevels, T: OneShotTimers>(&self, levels: &L, timers: &T) {
        let Some(limit) = self.guard.engaged() else {
            return;
        };

        if levels.is_high(limit) {
            self.guard.retreat(limit, &self.handoff);
            timers.arm(TimerId::LimitReaction, self.timing.reaction(limit));
            return;
        }

        self.debouncer.reset(LineClass::Limit);
        self.channels.get(limit).confirm(Edge::Falling);
        self.guard.clear(limit, &self.handoff);
        self.interrupts.enable_all(&ExpectedEdges::RISING);
    }
}
