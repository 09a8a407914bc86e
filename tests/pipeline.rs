//! End-to-end runs of the input pipeline against mock pins, timers and
//! motor outputs: raw edges in, motor output levels out.

use std::cell::{Cell, RefCell};

use blinds_controller::blinds::line::DispatchTable;
use blinds_controller::blinds::motor::OutputLevels;
use blinds_controller::blinds::{
    Arbitrator, BlindsController, Decision, Edge, EdgeMask, Line, MotorState, MotorStateMachine,
    TimerId,
};
use blinds_controller::config::{BOTTOM_LIMIT_PIN, LINE_PINS, Timing};
use blinds_controller::hardware::line_levels::LineLevels;
use blinds_controller::hardware::traits::{InputLevels, MotorOutputs, OneShotTimers};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;

#[derive(Default)]
struct Levels([Cell<bool>; 4]);

impl InputLevels for Levels {
    fn is_high(&self, line: Line) -> bool {
        self.0[line.index()].get()
    }
}

/// Armed timers; arming again replaces the pending delay.
#[derive(Default)]
struct Timers(RefCell<[Option<Duration>; 3]>);

impl OneShotTimers for Timers {
    fn arm(&self, timer: TimerId, delay: Duration) {
        self.0.borrow_mut()[timer.index()] = Some(delay);
    }
}

#[derive(Default)]
struct Outputs(Vec<OutputLevels>);

impl MotorOutputs for Outputs {
    fn drive(&mut self, state: MotorState) {
        self.0.push(state.levels());
    }
}

impl Outputs {
    fn last(&self) -> OutputLevels {
        *self.0.last().expect("outputs never driven")
    }
}

struct Rig {
    controller: BlindsController<CriticalSectionRawMutex>,
    table: DispatchTable,
    levels: Levels,
    timers: Timers,
    arbitrator: Arbitrator,
    motor: MotorStateMachine<Outputs>,
}

impl Rig {
    fn new() -> Self {
        let controller = BlindsController::new(Timing::DEFAULT);
        controller.arm_inputs([false; 4]);
        Self {
            controller,
            table: DispatchTable::new(LINE_PINS),
            levels: Levels::default(),
            timers: Timers::default(),
            arbitrator: Arbitrator::new(),
            motor: MotorStateMachine::new(Outputs::default()),
        }
    }

    /// Drives `line` to `high` and raises the edge interrupt for it.
    fn set(&self, line: Line, high: bool) {
        self.levels.0[line.index()].set(high);
        let pin = LINE_PINS
            .iter()
            .find(|(_, l)| *l == line)
            .map(|(pin, _)| *pin)
            .unwrap();
        let edges = if high { EdgeMask::RISE } else { EdgeMask::FALL };
        self.controller
            .on_gpio_event(&self.table, pin, edges, &self.timers);
    }

    fn armed(&self, timer: TimerId) -> Option<Duration> {
        self.timers.0.borrow()[timer.index()]
    }

    /// Lets `timer` expire. Returns false if it was not armed.
    fn fire(&self, timer: TimerId) -> bool {
        let armed = self.timers.0.borrow_mut()[timer.index()].take();
        if armed.is_some() {
            self.controller
                .on_timer_expiry(timer, &self.levels, &self.timers);
        }
        armed.is_some()
    }

    fn poll(&mut self) -> Decision {
        self.arbitrator
            .poll(&self.controller.channels, &self.controller.handoff)
    }

    /// One motor task iteration, if a permit is available.
    fn run_motor(&mut self) -> Option<MotorState> {
        let requested = self.controller.handoff.try_take()?;
        self.motor.service(requested);
        Some(requested)
    }

    fn outputs(&self) -> OutputLevels {
        self.motor.outputs().last()
    }
}

const RUNNING_CLOCKWISE: OutputLevels = MotorState::Clockwise.levels();
const RUNNING_ANTICLOCKWISE: OutputLevels = MotorState::Anticlockwise.levels();
const STOPPED: OutputLevels = MotorState::Off.levels();

#[test]
fn held_down_button_lowers_until_released() {
    let mut rig = Rig::new();
    assert_eq!(rig.outputs(), STOPPED);

    rig.set(Line::ButtonDown, true);
    assert_eq!(rig.armed(TimerId::ButtonDebounce), Some(Timing::DEFAULT.button_debounce));
    assert!(rig.fire(TimerId::ButtonDebounce));

    assert_eq!(
        rig.poll(),
        Decision::Requested(Line::ButtonDown, MotorState::Clockwise)
    );
    assert_eq!(rig.run_motor(), Some(MotorState::Clockwise));
    assert_eq!(rig.outputs(), RUNNING_CLOCKWISE);
    assert!(rig.outputs().indicator);

    // Held: the timer keeps re-arming, nothing new is reported
    for _ in 0..5 {
        assert!(rig.fire(TimerId::ButtonDebounce));
        assert_eq!(rig.poll(), Decision::Idle);
    }

    rig.set(Line::ButtonDown, false);
    assert!(rig.fire(TimerId::ButtonDebounce));
    assert_eq!(rig.poll(), Decision::Requested(Line::ButtonDown, MotorState::Off));
    rig.run_motor();
    assert_eq!(rig.outputs(), STOPPED);
    assert!(!rig.fire(TimerId::ButtonDebounce));
}

#[test]
fn bottom_limit_reverses_motor_before_arbitrator_runs() {
    let mut rig = Rig::new();
    rig.controller.handoff.give(MotorState::Clockwise);
    rig.run_motor();
    assert_eq!(rig.outputs(), RUNNING_CLOCKWISE);

    rig.set(Line::BottomLimit, true);
    assert!(rig.fire(TimerId::LimitDebounce));

    // The guard's request is there before any arbitrator poll
    assert_eq!(rig.run_motor(), Some(MotorState::Anticlockwise));
    assert_eq!(rig.outputs(), RUNNING_ANTICLOCKWISE);
    assert_eq!(
        rig.armed(TimerId::LimitReaction),
        Some(Timing::DEFAULT.bottom_limit_reaction)
    );

    // Inputs stay masked while the guard holds control
    rig.set(Line::ButtonDown, true);
    assert_eq!(rig.armed(TimerId::ButtonDebounce), None);
    rig.levels.0[Line::ButtonDown.index()].set(false);

    assert_eq!(
        rig.poll(),
        Decision::Requested(Line::BottomLimit, MotorState::Anticlockwise)
    );
    assert!(rig.arbitrator.bottom_limit_reached());

    // Still on the switch after the reaction time: keep backing off
    assert!(rig.fire(TimerId::LimitReaction));
    assert_eq!(rig.controller.limit_engaged(), Some(Line::BottomLimit));
    assert_eq!(rig.run_motor(), Some(MotorState::Anticlockwise));
    assert_eq!(rig.outputs(), RUNNING_ANTICLOCKWISE);

    rig.levels.0[Line::BottomLimit.index()].set(false);
    assert!(rig.fire(TimerId::LimitReaction));
    assert_eq!(rig.controller.limit_engaged(), None);
    rig.run_motor();
    assert_eq!(rig.outputs(), STOPPED);

    assert_eq!(rig.poll(), Decision::Requested(Line::BottomLimit, MotorState::Off));
    assert!(!rig.arbitrator.bottom_limit_reached());
    for line in Line::ALL {
        assert_eq!(rig.controller.interrupts.enabled(line), EdgeMask::RISE);
    }

    // Down works again once the limit has cleared
    rig.set(Line::ButtonDown, true);
    rig.fire(TimerId::ButtonDebounce);
    assert_eq!(
        rig.poll(),
        Decision::Requested(Line::ButtonDown, MotorState::Clockwise)
    );
}

#[test]
fn engaged_top_limit_is_recovered_at_start_up() {
    let controller = BlindsController::<CriticalSectionRawMutex>::new(Timing::DEFAULT);
    let mut outputs = Outputs::default();
    let mut reads = 0;

    controller.recover_limits([false, false, true, false], &mut outputs, |line| {
        assert_eq!(line, Line::TopLimit);
        reads += 1;
        reads <= 2
    });

    assert_eq!(outputs.0, [RUNNING_CLOCKWISE, RUNNING_CLOCKWISE, STOPPED]);

    controller.arm_inputs([false, false, true, false]);
    assert_eq!(controller.interrupts.enabled(Line::TopLimit), EdgeMask::RISE);
}

#[test]
fn fast_tap_is_reported_as_release_only() {
    let mut rig = Rig::new();

    rig.set(Line::ButtonUp, true);
    rig.set(Line::ButtonUp, false);
    assert!(rig.fire(TimerId::ButtonDebounce));

    assert_eq!(rig.poll(), Decision::Requested(Line::ButtonUp, MotorState::Off));
    assert_eq!(rig.run_motor(), Some(MotorState::Off));
    assert_eq!(rig.motor.outputs().0, [STOPPED]);
    assert_eq!(rig.controller.interrupts.enabled(Line::ButtonUp), EdgeMask::RISE);
}

#[test]
fn contact_bounce_yields_one_press() {
    let mut rig = Rig::new();

    for high in [true, false, true, false, true] {
        rig.set(Line::ButtonUp, high);
    }
    assert!(rig.fire(TimerId::ButtonDebounce));

    assert_eq!(
        rig.controller.channels.get(Line::ButtonUp).last_confirmed_edge(),
        Some(Edge::Rising)
    );
    assert_eq!(
        rig.poll(),
        Decision::Requested(Line::ButtonUp, MotorState::Anticlockwise)
    );
    assert_eq!(rig.poll(), Decision::Idle);
}

#[test]
fn limit_glitch_changes_nothing() {
    let mut rig = Rig::new();

    rig.set(Line::TopLimit, true);
    rig.set(Line::TopLimit, false);
    assert!(rig.fire(TimerId::LimitDebounce));

    assert_eq!(rig.controller.limit_engaged(), None);
    assert_eq!(rig.armed(TimerId::LimitReaction), None);
    assert_eq!(rig.poll(), Decision::Idle);
    assert_eq!(rig.run_motor(), None);
    assert_eq!(rig.controller.interrupts.enabled(Line::TopLimit), EdgeMask::RISE);
}

#[test]
fn requests_between_motor_runs_coalesce() {
    let mut rig = Rig::new();

    rig.set(Line::ButtonDown, true);
    rig.fire(TimerId::ButtonDebounce);
    rig.poll();

    rig.set(Line::BottomLimit, true);
    rig.fire(TimerId::LimitDebounce);

    assert_eq!(rig.run_motor(), Some(MotorState::Anticlockwise));
    assert_eq!(rig.run_motor(), None);
    assert_eq!(rig.motor.outputs().0, [STOPPED, RUNNING_ANTICLOCKWISE]);
}

#[test]
fn limit_edge_seen_only_by_level_refresh_still_reverses() {
    let controller = BlindsController::<CriticalSectionRawMutex>::new(Timing::DEFAULT);
    controller.arm_inputs([false; 4]);
    let table = DispatchTable::new(LINE_PINS);
    let levels = LineLevels::new();
    let timers = Timers::default();

    // No interrupt for this closure, the refresh tick finds the new level
    let edge = levels.update(Line::BottomLimit, true);
    assert_eq!(edge, Some(Edge::Rising));
    controller.on_gpio_event(&table, BOTTOM_LIMIT_PIN, edge.unwrap().into(), &timers);

    let armed = timers.0.borrow_mut()[TimerId::LimitDebounce.index()].take();
    assert_eq!(armed, Some(Timing::DEFAULT.limit_debounce));
    controller.on_timer_expiry(TimerId::LimitDebounce, &levels, &timers);

    assert_eq!(controller.limit_engaged(), Some(Line::BottomLimit));
    assert_eq!(controller.handoff.try_take(), Some(MotorState::Anticlockwise));

    // A steady level on the next refresh raises nothing
    assert_eq!(levels.update(Line::BottomLimit, true), None);
}
