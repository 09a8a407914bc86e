pub mod gpio_input;
pub mod gpio_led;
pub mod line_levels;
pub mod motor_driver;
pub mod rtc;
pub mod timers;
pub mod traits;
