//! # Driver for TM1638/TM1668 LED display and keypad controllers
//!
//! The TM1638 and TM1668 drive LED segment displays and scan key matrices,
//! spoken to over a proprietary three-line serial protocol: a clock line
//! (CLK) and an open-drain data line (DIO) that are shared by every chip,
//! plus one select line (STB) per chip.
//!
//! The driver is split accordingly:
//!
//! - [`Bus`] owns the two shared lines, the byte transport and the registry
//!   of attached devices (module [`bus`]).
//! - [`Device`] is one chip on a bus: its select pin, addressing-mode state
//!   and display-control state (module [`device`]). [`SoloDevice`] bundles a
//!   private bus and a single device for the common one-chip wiring.
//! - [`command`] encodes the chips' command bytes.
//! - Pins are driven through the [`Gpio`] capability (module [`gpio`]),
//!   delays through [`embedded_hal::delay::DelayNs`]; implement/provide both
//!   for your platform.
//! - Transactions on one bus are serialized by a [`BusMutex`] (module
//!   [`mutex`]); pick the implementation matching your execution model.
//!
//! Typically you want to start with [`Bus::new`] and [`Bus::add_device`]
//! (or [`SoloDevice::new`]), then [`Device::set_display_enabled`],
//! [`Device::display_write`] and [`Device::read_keys`].
//!
//! The driver never caches display data — every write goes to the chip —
//! and performs no logging; all failures surface synchronously as
//! [`Error`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

pub mod bus;
pub mod command;
pub mod device;
mod error;
pub mod gpio;
#[cfg(any(test, feature = "std"))]
pub mod mock;
pub mod mutex;

#[cfg(feature = "critical-section")]
pub use bus::BusCriticalSection;
#[cfg(feature = "std")]
pub use bus::BusStd;
pub use bus::{Bus, BusConfig, BusSimple, BusState, MAX_DEVICES};
pub use command::{Command, MultiplexMode, PulseWidth};
pub use device::{Chip, Device, DeviceConfig, KeyScan, SoloConfig, SoloDevice};
pub use error::Error;
pub use gpio::{Direction, Gpio, Pull};
pub use mutex::{BusMutex, NullMutex};
