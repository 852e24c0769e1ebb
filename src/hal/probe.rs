//! Probe interfaces and the pin-backed calibration probe.

use embedded_hal::digital::InputPin;

use crate::error::{ProbeError, Result};

/// Binary contact signal used for calibration-object touches.
pub trait ProbeSignal {
    /// `true` while the nozzle (or probe) is in contact.
    fn is_triggered(&mut self) -> Result<bool>;
}

/// A bed probe able to measure the bed height at a point.
///
/// Failures are mechanical faults and must be propagated.
pub trait BedProbe {
    /// Deploy the probe.
    fn deploy(&mut self) -> Result<()>;

    /// Stow the probe.
    fn stow(&mut self) -> Result<()>;

    /// Descend at probe position (x, y) until trigger and return the raw
    /// trigger height. The probe offset is not applied.
    fn probe_at_point(&mut self, x: f32, y: f32) -> Result<f32>;
}

/// Calibration probe read from a digital input.
///
/// The input is high on contact unless `inverting` is set.
pub struct PinProbe<P> {
    pin: P,
    inverting: bool,
}

impl<P: InputPin> PinProbe<P> {
    /// Wrap an input pin.
    pub fn new(pin: P, inverting: bool) -> Self {
        Self { pin, inverting }
    }

    /// Release the underlying pin.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin> ProbeSignal for PinProbe<P> {
    fn is_triggered(&mut self) -> Result<bool> {
        let high = self.pin.is_high().map_err(|_| ProbeError::PinError)?;
        Ok(high != self.inverting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn test_pin_probe_active_high() {
        let expectations = [
            Transaction::get(State::Low),
            Transaction::get(State::High),
        ];
        let mut probe = PinProbe::new(PinMock::new(&expectations), false);

        assert!(!probe.is_triggered().unwrap());
        assert!(probe.is_triggered().unwrap());

        probe.release().done();
    }

    #[test]
    fn test_pin_probe_inverting() {
        let expectations = [Transaction::get(State::Low)];
        let mut probe = PinProbe::new(PinMock::new(&expectations), true);

        assert!(probe.is_triggered().unwrap());

        probe.release().done();
    }
}
