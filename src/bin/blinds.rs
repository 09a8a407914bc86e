//! STM32F103 Blue Pill Motorized Blinds Actuator
//! =============================================================================================
//!
//! This firmware drives a blind motor through an H-bridge using:
//! - Two push buttons (up / down), active while held
//! - Two limit switches (top / bottom) that stop and back the blind off its end stops
//! - A time-of-day schedule that closes the blinds in the evening and opens them in the morning
//!
//! Hardware Connections:
//!   Buttons / Limit switches -> Blue Pill (internal pull-down, active-high)
//!      Button Up     -> PB14 (EXTI14)
//!      Button Down   -> PB13 (EXTI13)
//!      Top Limit     -> PB8  (EXTI8)
//!      Bottom Limit  -> PB9  (EXTI9)
//!      Switch supply -> PB10, PB11, PB12, PB15 (driven high)
//!
//!   H-bridge -> Blue Pill
//!      IN1  -> PA0
//!      IN2  -> PA1
//!
//!   Motor running LED -> PC13 (onboard)
//!
//! Tasks:
//! 1. One edge watcher per input, feeding the debounce pipeline
//! 2. One task per one-shot timer (button debounce, limit debounce, limit reaction)
//! 3. Arbitrator polling the confirmed transitions
//! 4. Motor state machine consuming the requested state
//! 5. Automatic schedule

#![no_std]
#![no_main]

use blinds_controller::{
    blinds::{
        Arbitrator, BlindsController, Decision, EdgeMask, Line, MotorStateMachine, TimerId,
        automatic::{AutomaticControl, Schedule},
        line::DispatchTable,
    },
    config::{self, MajorityVote, Timing},
    hardware::{
        gpio_input::settled_level,
        gpio_led::GpioLed,
        line_levels::LineLevels,
        motor_driver::HBridge,
        rtc::SoftwareRtc,
        timers::TimerSignals,
    },
};
use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_stm32::{
    exti::ExtiInput,
    gpio::{Level, Output, Pull, Speed},
    time::Hertz,
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant, Ticker, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _}; // Global logger and panic handler

type Motor = HBridge<Output<'static>, Output<'static>, GpioLed<Output<'static>>>;

// Shared pipeline state, touched by every task
static BLINDS: BlindsController<CriticalSectionRawMutex> = BlindsController::new(Timing::DEFAULT);

// One-shot timer requests
static TIMERS: TimerSignals<CriticalSectionRawMutex> = TimerSignals::new();

// Input levels mirrored by the edge watchers
static LEVELS: LineLevels = LineLevels::new();

static DISPATCH: StaticCell<DispatchTable> = StaticCell::new();

/// Main application entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 8 MHz HSE through the PLL to 72 MHz
    let mut stm32_config = embassy_stm32::Config::default();
    {
        use embassy_stm32::rcc::*;
        stm32_config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        stm32_config.rcc.pll = Some(Pll {
            src: PllSource::HSE,
            prediv: PllPreDiv::DIV1,
            mul: PllMul::MUL9,
        });
        stm32_config.rcc.sys = Sysclk::PLL1_P;
        stm32_config.rcc.ahb_pre = AHBPrescaler::DIV1;
        stm32_config.rcc.apb1_pre = APBPrescaler::DIV2;
        stm32_config.rcc.apb2_pre = APBPrescaler::DIV1;
    }
    let p = embassy_stm32::init(stm32_config);
    defmt::info!("blinds controller starting");

    let timing = *BLINDS.timing();

    // Common side of the buttons and limit switches. Must stay alive.
    let _switch_supply = [
        Output::new(p.PB10, Level::High, Speed::Low),
        Output::new(p.PB11, Level::High, Speed::Low),
        Output::new(p.PB12, Level::High, Speed::Low),
        Output::new(p.PB15, Level::High, Speed::Low),
    ];

    // Motor off before anything else happens
    let mut motor: Motor = HBridge::new(
        Output::new(p.PA0, Level::Low, Speed::Low),
        Output::new(p.PA1, Level::Low, Speed::Low),
        GpioLed::new(Output::new(p.PC13, Level::High, Speed::Low)),
    );

    // Indexed like `Line::ALL`
    let mut inputs = [
        ExtiInput::new(p.PB14, p.EXTI14, Pull::Down),
        ExtiInput::new(p.PB13, p.EXTI13, Pull::Down),
        ExtiInput::new(p.PB8, p.EXTI8, Pull::Down),
        ExtiInput::new(p.PB9, p.EXTI9, Pull::Down),
    ];

    // Let the switch supply and the mechanics settle
    Timer::after(timing.startup_settle).await;

    let levels =
        Line::ALL.map(|line| settled_level(&mut inputs[line.index()], MajorityVote::DEFAULT));
    defmt::info!("start-up levels {}", levels);

    BLINDS.recover_limits(levels, &mut motor, |line| inputs[line.index()].is_high());

    for line in Line::ALL {
        LEVELS.store(line, inputs[line.index()].is_high());
    }
    BLINDS.arm_inputs(levels);

    let table: &'static DispatchTable = DISPATCH.init(DispatchTable::new(config::LINE_PINS));
    let [button_up, button_down, top_limit, bottom_limit] = inputs;

    let watchers = [
        (button_up, config::BUTTON_UP_PIN, Line::ButtonUp),
        (button_down, config::BUTTON_DOWN_PIN, Line::ButtonDown),
        (top_limit, config::TOP_LIMIT_PIN, Line::TopLimit),
        (bottom_limit, config::BOTTOM_LIMIT_PIN, Line::BottomLimit),
    ];
    for (input, pin, line) in watchers {
        spawner
            .spawn(edge_watch(input, pin, line, table, timing.level_refresh))
            .unwrap();
    }

    for timer in TimerId::ALL {
        spawner.spawn(one_shot(timer)).unwrap();
    }

    spawner.spawn(arbitrate(timing.arbitrator_period)).unwrap();
    spawner.spawn(motor_control(motor, timing.motor_period)).unwrap();
    spawner
        .spawn(automatic(Schedule::DEFAULT, timing.automatic_period))
        .unwrap();

    // Status heartbeat
    let mut ticker = Ticker::every(Duration::from_secs(10));
    loop {
        ticker.next().await;
        defmt::info!(
            "requested {} limit {} levels {}",
            BLINDS.handoff.requested(),
            BLINDS.limit_engaged(),
            LEVELS.snapshot()
        );
    }
}

/// Edge Watcher Task
///
/// Responsibilities:
/// 1. Wait for any edge on one input line
/// 2. Mirror the line level for the timer handlers
/// 3. Forward the edge to the pipeline's GPIO callback
/// 4. Forward level changes found on refresh that no interrupt reported
#[embassy_executor::task(pool_size = 4)]
async fn edge_watch(
    mut input: ExtiInput<'static>,
    pin: u8,
    line: Line,
    table: &'static DispatchTable,
    refresh: Duration,
) {
    loop {
        match select(input.wait_for_any_edge(), Timer::after(refresh)).await {
            Either::First(()) => {
                let high = input.is_high();
                LEVELS.store(line, high);
                let edges = if high { EdgeMask::RISE } else { EdgeMask::FALL };
                BLINDS.on_gpio_event(table, pin, edges, &TIMERS);
            }
            Either::Second(()) => {
                // The EXTI line is masked between two waits; an edge in that
                // gap only shows up as a changed level.
                if let Some(edge) = LEVELS.update(line, input.is_high()) {
                    defmt::debug!("{}: {} edge found on refresh", line, edge);
                    BLINDS.on_gpio_event(table, pin, edge.into(), &TIMERS);
                }
            }
        }
    }
}

/// One-Shot Timer Task
///
/// Sleeps off the newest delay armed on `timer`, then runs its expiry
/// handler. Handlers may re-arm their own timer.
#[embassy_executor::task(pool_size = 3)]
async fn one_shot(timer: TimerId) {
    loop {
        TIMERS.expired(timer).await;
        BLINDS.on_timer_expiry(timer, &LEVELS, &TIMERS);
    }
}

/// Arbitrator Task
///
/// Responsibilities:
/// 1. Poll the confirmed input transitions, limits first
/// 2. Track which limits are reached and inhibit blocked directions
/// 3. Publish the resulting motor request
#[embassy_executor::task]
async fn arbitrate(period: Duration) {
    let mut arbitrator = Arbitrator::new();
    let mut ticker = Ticker::every(period);

    loop {
        match arbitrator.poll(&BLINDS.channels, &BLINDS.handoff) {
            Decision::Idle => {}
            decision => defmt::debug!("arbitrator: {}", decision),
        }
        ticker.next().await;
    }
}

/// Motor Control Task
///
/// Waits for a request, drives the H-bridge if the state changes, then
/// pauses for one period so requests arriving meanwhile coalesce.
#[embassy_executor::task]
async fn motor_control(outputs: Motor, period: Duration) {
    let mut machine = MotorStateMachine::new(outputs);
    let mut ticker = Ticker::every(period);

    loop {
        let requested = BLINDS.handoff.take().await;
        machine.service(requested);
        ticker.next().await;
    }
}

/// Automatic Control Task
///
/// Responsibilities:
/// 1. Keep the software clock running from uptime
/// 2. Close the blinds in the evening and open them in the morning
/// 3. Stay out of the way while a limit switch holds control
#[embassy_executor::task]
async fn automatic(schedule: Schedule, period: Duration) {
    let control = AutomaticControl::new(schedule);
    let mut rtc = SoftwareRtc::new(config::rtc_start());
    let mut ticker = Ticker::every(period);

    loop {
        rtc.set_uptime(Duration::from_ticks(Instant::now().as_ticks()));

        if let Some(limit) = BLINDS.limit_engaged() {
            defmt::debug!("automatic: {} engaged, skipping", limit);
        } else if let Some(state) = control.evaluate(&mut rtc) {
            BLINDS.handoff.give(state);
        }

        ticker.next().await;
    }
}
