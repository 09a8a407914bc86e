//! H-bridge driver for the blind motor: two direction inputs and a running
//! indicator.

use embedded_hal::digital::OutputPin;

use super::traits::{Led, MotorOutputs};
use crate::blinds::motor::{MotorState, OutputLevels};

/// Which control output failed to switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlPin {
    Control1,
    Control2,
}

pub struct HBridge<C1, C2, L> {
    control_1: C1,
    control_2: C2,
    indicator: L,
}

impl<C1, C2, L> HBridge<C1, C2, L>
where
    C1: OutputPin,
    C2: OutputPin,
    L: Led,
{
    pub fn new(control_1: C1, control_2: C2, indicator: L) -> Self {
        Self {
            control_1,
            control_2,
            indicator,
        }
    }

    /// Lowers the outputs that go low before raising the ones that go high,
    /// so the two controls are never high at the same time.
    fn set_controls(&mut self, levels: OutputLevels) -> Result<(), ControlPin> {
        if !levels.control_1 {
            self.control_1.set_low().map_err(|_| ControlPin::Control1)?;
        }
        if !levels.control_2 {
            self.control_2.set_low().map_err(|_| ControlPin::Control2)?;
        }
        if levels.control_1 {
            self.control_1.set_high().map_err(|_| ControlPin::Control1)?;
        }
        if levels.control_2 {
            self.control_2.set_high().map_err(|_| ControlPin::Control2)?;
        }
        Ok(())
    }
}

impl<C1, C2, L> MotorOutputs for HBridge<C1, C2, L>
where
    C1: OutputPin,
    C2: OutputPin,
    L: Led,
{
    fn drive(&mut self, state: MotorState) {
        let levels = state.levels();

        if let Err(pin) = self.set_controls(levels) {
            error!("{} failed to switch, stopping motor", pin);
            self.control_1.set_low().ok();
            self.control_2.set_low().ok();
            self.indicator.off();
            return;
        }

        if levels.indicator {
            self.indicator.on();
        } else {
            self.indicator.off();
        }
    }
}
