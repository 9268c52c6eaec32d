//! # GPIO capability consumed by the driver
//!
//! The TM1638/TM1668 bus is bit-banged over plain MCU pins addressed by
//! number, and the shared DIO line has to be reconfigured between push-pull
//! output and open-drain input at runtime. The fixed-function pin types of
//! `embedded-hal` cannot express that, so the driver consumes a small port
//! capability instead: configure a pin, drive it, read it.
//!
//! Implement [`Gpio`] once for your platform's pin controller and hand it to
//! [`Bus::new`](crate::Bus::new). The [`mock`](crate::mock) module contains a
//! trace-recording implementation used by the test suite.

/// Electrical configuration of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Push-pull output (CLK and STB lines).
    Output,
    /// Open-drain output that can also be read back (the shared DIO line,
    /// which the chip drives during key-scan reads).
    InputOutputOpenDrain,
}

/// Internal pull resistor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Enable the internal pull-up (open-drain lines without an external
    /// resistor need this).
    Up,
    /// No pull resistor.
    None,
}

/// Digital pin controller addressed by pin number.
///
/// All driver traffic goes through this trait; errors are propagated
/// verbatim as [`Error::Gpio`](crate::Error::Gpio).
pub trait Gpio {
    /// Platform error for pin operations.
    type Error;

    /// Whether `pin` names a pin this controller can drive.
    ///
    /// The driver checks this before touching any hardware and fails with
    /// `InvalidArgument` on unknown pins.
    fn is_valid_pin(&self, pin: u8) -> bool {
        let _ = pin;
        true
    }

    /// Configure direction and pull of `pin`.
    fn configure(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<(), Self::Error>;

    /// Drive `pin` high or low.
    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), Self::Error>;

    /// Sample the current level of `pin`.
    fn level(&mut self, pin: u8) -> Result<bool, Self::Error>;
}
