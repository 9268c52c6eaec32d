//! # Per-chip driver
//!
//! A [`Device`] is one TM1638/TM1668 attached to a [`Bus`] through its own
//! STB select pin. The device tracks the chip's addressing mode (increment
//! or fixed) and the two display-control fields, and re-asserts commands
//! only when the chip's state actually has to change.
//!
//! The two chip variants share one implementation; [`Chip`] describes what
//! differs (display register count, key-scan length, mode register).

use embedded_hal::delay::DelayNs;

use crate::bus::{Bus, BusConfig, BusState};
use crate::command::{Command, MultiplexMode, PulseWidth};
use crate::error::Error;
use crate::gpio::{Gpio, Pull};
use crate::mutex::BusMutex;

/// Chip variant descriptor.
///
/// Selected per device at attach time; devices of different variants can
/// share one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Chip {
    /// 8×10 matrix, 16 display registers, 4 key-scan bytes, no mode
    /// register.
    Tm1638,
    /// Configurable 4×13…7×10 matrix, 14 display registers, 5 key-scan
    /// bytes.
    Tm1668,
}

impl Chip {
    /// Number of addressable display registers (one nibble pair per grid).
    pub const fn display_registers(self) -> u8 {
        match self {
            Chip::Tm1638 => 16,
            Chip::Tm1668 => 14,
        }
    }

    /// Number of bytes one key-scan read returns.
    pub const fn key_scan_bytes(self) -> usize {
        match self {
            Chip::Tm1638 => 4,
            Chip::Tm1668 => 5,
        }
    }

    /// Whether the chip has a grid/segment multiplex mode register.
    pub const fn has_multiplex_mode(self) -> bool {
        matches!(self, Chip::Tm1668)
    }
}

/// Configuration for [`Bus::add_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Select line of this chip, unique per bus.
    pub stb: u8,
    /// Enable the internal pull-up on the select line.
    pub pullup: bool,
    /// Which chip variant sits behind the select line.
    pub chip: Chip,
}

/// Raw key-scan matrix bytes as read from the chip.
///
/// 4 bytes for the TM1638 map, 5 for the TM1668 map. Decoding key indices
/// out of the scan bits is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyScan {
    len: u8,
    bytes: [u8; MAX_KEY_SCAN_BYTES],
}

/// Largest key-scan response in the chip family.
const MAX_KEY_SCAN_BYTES: usize = 5;

impl KeyScan {
    /// Largest key-scan response in the chip family.
    pub const MAX_BYTES: usize = MAX_KEY_SCAN_BYTES;

    /// The scan bytes, in the order they were clocked in.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of bytes read (4 or 5, depending on the chip).
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Never true for a scan read from a chip.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Mutable per-device state, shared between [`Device`] and [`SoloDevice`].
#[derive(Debug, Clone, Copy)]
struct DeviceState {
    stb: u8,
    chip: Chip,
    address_fixed: bool,
    display_on: bool,
    pulse_width: PulseWidth,
}

impl DeviceState {
    fn new(stb: u8, chip: Chip) -> Self {
        DeviceState {
            stb,
            chip,
            address_fixed: false,
            display_on: false,
            pulse_width: PulseWidth::default(),
        }
    }
}

/// The device operations themselves, implemented once against the bus and a
/// device's state. [`Device`] and [`SoloDevice`] are thin shells over these.
impl<G, D, M> Bus<G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    /// Attach a device to this bus.
    ///
    /// Fails with [`Error::InvalidArgument`] when the select pin is not
    /// addressable or already claimed by another device on this bus, and
    /// with [`Error::OutOfMemory`] when the registry is full. A GPIO
    /// configuration failure unregisters the device again and propagates.
    pub fn add_device(&self, config: DeviceConfig) -> Result<Device<'_, G, D, M>, Error<G::Error>> {
        let pull = if config.pullup { Pull::Up } else { Pull::None };
        self.lock(|bus| bus.register(config.stb, pull))?;
        Ok(Device {
            bus: self,
            state: DeviceState::new(config.stb, config.chip),
        })
    }

    /// One single-byte command in its own select frame.
    fn op_command(&self, state: &DeviceState, command: Command) -> Result<(), Error<G::Error>> {
        self.lock(|bus| bus.transaction(state.stb, |bus| bus.send_byte(command.byte())))?;
        Ok(())
    }

    fn op_reset(&self, state: &mut DeviceState) -> Result<(), Error<G::Error>> {
        // sent unconditionally, the chip may be out of sync with our state
        self.op_command(state, Command::AddressIncrement)?;
        state.address_fixed = false;
        Ok(())
    }

    fn op_display_write(
        &self,
        state: &mut DeviceState,
        address: u8,
        data: &[u8],
    ) -> Result<(), Error<G::Error>> {
        let registers = state.chip.display_registers();
        if address >= registers || data.len() > (registers - address) as usize {
            return Err(Error::InvalidArgument);
        }
        if state.address_fixed {
            self.op_command(state, Command::AddressIncrement)?;
            state.address_fixed = false;
        }
        self.lock(|bus| {
            bus.transaction(state.stb, |bus| {
                bus.send_byte(Command::Address(address).byte())?;
                for &byte in data {
                    bus.send_byte(byte)?;
                }
                Ok(())
            })
        })?;
        Ok(())
    }

    fn op_display_write_fixed(
        &self,
        state: &mut DeviceState,
        address: u8,
        data: u8,
    ) -> Result<(), Error<G::Error>> {
        if address >= state.chip.display_registers() {
            return Err(Error::InvalidArgument);
        }
        if !state.address_fixed {
            self.op_command(state, Command::AddressFixed)?;
            state.address_fixed = true;
        }
        self.lock(|bus| {
            bus.transaction(state.stb, |bus| {
                bus.send_byte(Command::Address(address).byte())?;
                bus.send_byte(data)
            })
        })?;
        Ok(())
    }

    fn op_read_keys(&self, state: &DeviceState) -> Result<KeyScan, Error<G::Error>> {
        let len = state.chip.key_scan_bytes();
        let mut scan = KeyScan {
            len: len as u8,
            bytes: [0; MAX_KEY_SCAN_BYTES],
        };
        self.lock(|bus| {
            bus.transaction(state.stb, |bus| {
                bus.send_byte(Command::ReadKeys.byte())?;
                bus.release_dio()?;
                for slot in scan.bytes[..len].iter_mut() {
                    *slot = bus.read_byte()?;
                }
                Ok(())
            })
        })?;
        Ok(scan)
    }

    /// Display on/off and pulse width always travel in one command byte, so
    /// both fields are re-asserted whenever either of them changes.
    fn op_display_control(&self, state: &DeviceState) -> Result<(), Error<G::Error>> {
        self.op_command(
            state,
            Command::DisplayControl {
                on: state.display_on,
                pulse_width: state.pulse_width,
            },
        )
    }

    fn op_set_pulse_width(
        &self,
        state: &mut DeviceState,
        width: PulseWidth,
    ) -> Result<(), Error<G::Error>> {
        state.pulse_width = width;
        self.op_display_control(state)
    }

    fn op_set_display_enabled(
        &self,
        state: &mut DeviceState,
        on: bool,
    ) -> Result<(), Error<G::Error>> {
        state.display_on = on;
        self.op_display_control(state)
    }

    /// Write-only: the chip has no readable mode register, so nothing is
    /// memoized.
    fn op_set_multiplex_mode(
        &self,
        state: &DeviceState,
        mode: MultiplexMode,
    ) -> Result<(), Error<G::Error>> {
        if !state.chip.has_multiplex_mode() {
            return Err(Error::InvalidArgument);
        }
        self.op_command(state, Command::MultiplexMode(mode))
    }

    fn detach(&self, state: &DeviceState) {
        self.lock(|bus| bus.unregister(state.stb));
    }
}

/// One chip attached to a shared [`Bus`].
///
/// Holds a non-owning reference to its bus; the borrow checker guarantees
/// the bus outlives every device and cannot be released while devices are
/// attached. Dropping the device detaches it.
pub struct Device<'bus, G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    bus: &'bus Bus<G, D, M>,
    state: DeviceState,
}

impl<'bus, G, D, M> Device<'bus, G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    /// The bus this device is attached to.
    pub fn bus(&self) -> &'bus Bus<G, D, M> {
        self.bus
    }

    /// The chip variant given at attach time.
    pub fn chip(&self) -> Chip {
        self.state.chip
    }

    /// The select pin this device was attached with.
    pub fn select_pin(&self) -> u8 {
        self.state.stb
    }

    /// Force the chip back to auto-increment addressing.
    pub fn reset(&mut self) -> Result<(), Error<G::Error>> {
        self.bus.op_reset(&mut self.state)
    }

    /// Write `data` to consecutive display registers starting at `address`,
    /// using the chip's auto-increment mode.
    ///
    /// Fails with [`Error::InvalidArgument`] when the range does not fit the
    /// chip's register file, before any bus traffic.
    pub fn display_write(&mut self, address: u8, data: &[u8]) -> Result<(), Error<G::Error>> {
        self.bus.op_display_write(&mut self.state, address, data)
    }

    /// Write one display register in fixed addressing mode.
    pub fn display_write_fixed(&mut self, address: u8, data: u8) -> Result<(), Error<G::Error>> {
        self.bus.op_display_write_fixed(&mut self.state, address, data)
    }

    /// Read the raw key-scan matrix.
    pub fn read_keys(&mut self) -> Result<KeyScan, Error<G::Error>> {
        self.bus.op_read_keys(&self.state)
    }

    /// Set the segment duty cycle; the display on/off flag is re-sent along
    /// with it.
    pub fn set_pulse_width(&mut self, width: PulseWidth) -> Result<(), Error<G::Error>> {
        self.bus.op_set_pulse_width(&mut self.state, width)
    }

    /// Switch the display on or off; the pulse width is re-sent along with
    /// it.
    pub fn set_display_enabled(&mut self, on: bool) -> Result<(), Error<G::Error>> {
        self.bus.op_set_display_enabled(&mut self.state, on)
    }

    /// Select the grid/segment multiplex ratio (TM1668 only).
    ///
    /// Fails with [`Error::InvalidArgument`] on chips without a mode
    /// register.
    pub fn set_multiplex_mode(&mut self, mode: MultiplexMode) -> Result<(), Error<G::Error>> {
        self.bus.op_set_multiplex_mode(&self.state, mode)
    }

    /// Detach from the bus, freeing the select pin for reuse.
    ///
    /// Dropping the device does the same; this form just makes the point
    /// explicit at the call site.
    pub fn detach(self) {}
}

impl<'bus, G, D, M> Drop for Device<'bus, G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    fn drop(&mut self) {
        self.bus.detach(&self.state);
    }
}

/// Configuration for [`SoloDevice::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoloConfig {
    /// Clock line.
    pub clk: u8,
    /// Data line.
    pub dio: u8,
    /// Select line.
    pub stb: u8,
    /// Enable internal pull-ups on all three lines.
    pub pullup: bool,
    /// Which chip variant is wired up.
    pub chip: Chip,
}

/// A single chip owning its bus outright.
///
/// Convenience composition for the common one-chip wiring: constructs a
/// private bus and attaches the one device in one step, rolling the bus back
/// if the attach fails. Offers the same operations as [`Device`].
pub struct SoloDevice<G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    bus: Bus<G, D, M>,
    state: DeviceState,
}

impl<G, D, M> SoloDevice<G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    /// Bring up a private bus on `clk`/`dio` and attach the chip on `stb`.
    pub fn new(gpio: G, delay: D, config: SoloConfig) -> Result<Self, Error<G::Error>> {
        let bus = Bus::new(
            gpio,
            delay,
            BusConfig {
                clk: config.clk,
                dio: config.dio,
                pullup: config.pullup,
            },
        )?;
        let pull = if config.pullup { Pull::Up } else { Pull::None };
        // the private bus is dropped again when the attach fails
        bus.lock(|state| state.register(config.stb, pull))?;
        Ok(SoloDevice {
            bus,
            state: DeviceState::new(config.stb, config.chip),
        })
    }

    /// The private bus, e.g. for diagnostics.
    pub fn bus(&self) -> &Bus<G, D, M> {
        &self.bus
    }

    /// The chip variant given at construction time.
    pub fn chip(&self) -> Chip {
        self.state.chip
    }

    /// Detach the device, tear the private bus down and hand the pin
    /// controller and delay provider back.
    pub fn release(self) -> (G, D) {
        self.bus.detach(&self.state);
        self.bus.release()
    }

    /// See [`Device::reset`].
    pub fn reset(&mut self) -> Result<(), Error<G::Error>> {
        self.bus.op_reset(&mut self.state)
    }

    /// See [`Device::display_write`].
    pub fn display_write(&mut self, address: u8, data: &[u8]) -> Result<(), Error<G::Error>> {
        self.bus.op_display_write(&mut self.state, address, data)
    }

    /// See [`Device::display_write_fixed`].
    pub fn display_write_fixed(&mut self, address: u8, data: u8) -> Result<(), Error<G::Error>> {
        self.bus.op_display_write_fixed(&mut self.state, address, data)
    }

    /// See [`Device::read_keys`].
    pub fn read_keys(&mut self) -> Result<KeyScan, Error<G::Error>> {
        self.bus.op_read_keys(&self.state)
    }

    /// See [`Device::set_pulse_width`].
    pub fn set_pulse_width(&mut self, width: PulseWidth) -> Result<(), Error<G::Error>> {
        self.bus.op_set_pulse_width(&mut self.state, width)
    }

    /// See [`Device::set_display_enabled`].
    pub fn set_display_enabled(&mut self, on: bool) -> Result<(), Error<G::Error>> {
        self.bus.op_set_display_enabled(&mut self.state, on)
    }

    /// See [`Device::set_multiplex_mode`].
    pub fn set_multiplex_mode(&mut self, mode: MultiplexMode) -> Result<(), Error<G::Error>> {
        self.bus.op_set_multiplex_mode(&self.state, mode)
    }
}
