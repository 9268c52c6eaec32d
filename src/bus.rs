//! # Shared two-wire bus
//!
//! One [`Bus`] owns a CLK/DIO pin pair. Any number of chips hang off those
//! two lines, each selected by its own STB pin; the bus keeps the registry
//! of select pins so no two devices can claim the same one.
//!
//! The byte transport lives here as well: bytes are clocked out least
//! significant bit first, the chip samples DIO on the rising edge of CLK,
//! and every level is held for the chip's minimum settle time. A whole
//! transaction (STB low, command and data bytes, STB high) runs under the
//! bus mutex so transactions on the same wire can never interleave.

use core::marker::PhantomData;

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::error::Error;
use crate::gpio::{Direction, Gpio, Pull};
use crate::mutex::{BusMutex, NullMutex};

/// Capacity of the per-bus device registry.
pub const MAX_DEVICES: usize = 8;

/// Minimum level hold time of the serial protocol, data sheet Twait.
const SETTLE_US: u32 = 1;
/// Wait before the chip drives DIO after a key-scan read command.
const KEY_GUARD_US: u32 = 2;

/// Configuration for [`Bus::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Clock line, shared by all devices on the bus.
    pub clk: u8,
    /// Data line, shared and open-drain (the chip drives it during key-scan
    /// reads).
    pub dio: u8,
    /// Enable the internal pull-ups on both lines.
    pub pullup: bool,
}

/// Everything that lives under the bus lock: the pin controller, the delay
/// provider and the registry of select pins in use.
pub struct BusState<G, D> {
    gpio: G,
    delay: D,
    clk: u8,
    dio: u8,
    devices: Vec<u8, MAX_DEVICES>,
}

impl<G, D> BusState<G, D>
where
    G: Gpio,
    D: DelayNs,
{
    fn settle(&mut self) {
        self.delay.delay_us(SETTLE_US);
    }

    fn clock_pulse(&mut self) -> Result<(), G::Error> {
        self.gpio.set_level(self.clk, true)?;
        self.settle();
        self.gpio.set_level(self.clk, false)?;
        self.settle();
        Ok(())
    }

    /// Clock one byte onto the wire, LSB first.
    pub(crate) fn send_byte(&mut self, value: u8) -> Result<(), G::Error> {
        for bit in 0..8 {
            self.gpio.set_level(self.dio, (value >> bit) & 1 != 0)?;
            self.clock_pulse()?;
        }
        Ok(())
    }

    /// Clock one byte in, LSB first. DIO must already be released to the
    /// chip (see [`release_dio`](Self::release_dio)).
    pub(crate) fn read_byte(&mut self) -> Result<u8, G::Error> {
        let mut value = 0;
        for bit in 0..8 {
            if self.gpio.level(self.dio)? {
                value |= 1 << bit;
            }
            self.clock_pulse()?;
        }
        Ok(value)
    }

    /// Stop driving DIO low and give the chip time to take over the line.
    ///
    /// DIO is open-drain, so driving it high releases it; the chip needs a
    /// guard delay after the read-key command before its output is valid.
    pub(crate) fn release_dio(&mut self) -> Result<(), G::Error> {
        self.gpio.set_level(self.dio, true)?;
        self.delay.delay_us(KEY_GUARD_US);
        Ok(())
    }

    /// Frame `f` with the select line: STB low before, STB high after.
    ///
    /// The select line is raised again even when the body fails, so a
    /// failed transaction never leaves a chip selected.
    pub(crate) fn transaction<R>(
        &mut self,
        stb: u8,
        f: impl FnOnce(&mut Self) -> Result<R, G::Error>,
    ) -> Result<R, G::Error> {
        self.gpio.set_level(stb, false)?;
        let result = f(self);
        let released = self.gpio.set_level(stb, true);
        let value = result?;
        released?;
        Ok(value)
    }

    /// Claim `stb` for a new device and configure it as an idle-high output.
    pub(crate) fn register(&mut self, stb: u8, pull: Pull) -> Result<(), Error<G::Error>> {
        if !self.gpio.is_valid_pin(stb) {
            return Err(Error::InvalidArgument);
        }
        if self.devices.contains(&stb) {
            // select pin already in use
            return Err(Error::InvalidArgument);
        }
        self.devices.push(stb).map_err(|_| Error::OutOfMemory)?;
        if let Err(err) = self.configure_select(stb, pull) {
            self.unregister(stb);
            return Err(Error::Gpio(err));
        }
        Ok(())
    }

    fn configure_select(&mut self, stb: u8, pull: Pull) -> Result<(), G::Error> {
        // level first, so the pin idles high the moment it starts driving
        self.gpio.set_level(stb, true)?;
        self.gpio.configure(stb, Direction::Output, pull)
    }

    /// Give a select pin back to the registry. Unknown pins are a no-op so
    /// a double remove stays harmless.
    pub(crate) fn unregister(&mut self, stb: u8) {
        if let Some(index) = self.devices.iter().position(|&pin| pin == stb) {
            self.devices.swap_remove(index);
        }
    }

    pub(crate) fn device_count(&self) -> usize {
        self.devices.len()
    }
}

/// A CLK/DIO pin pair plus the registry of devices attached to it.
///
/// The mutex parameter `M` selects the locking strategy, see the
/// [`mutex`](crate::mutex) module; [`BusSimple`] is the single-context
/// default.
pub struct Bus<G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    mutex: M,
    _io: PhantomData<(G, D)>,
}

/// Bus for use from a single execution context.
pub type BusSimple<G, D> = Bus<G, D, NullMutex<BusState<G, D>>>;

/// Bus shared between threads on hosted targets.
#[cfg(feature = "std")]
pub type BusStd<G, D> = Bus<G, D, std::sync::Mutex<BusState<G, D>>>;

/// Bus shared between interrupt/task contexts on bare-metal targets.
#[cfg(feature = "critical-section")]
pub type BusCriticalSection<G, D> =
    Bus<G, D, crate::mutex::CriticalSectionMutex<BusState<G, D>>>;

impl<G, D, M> Bus<G, D, M>
where
    G: Gpio,
    D: DelayNs,
    M: BusMutex<Bus = BusState<G, D>>,
{
    /// Take ownership of the pin controller and delay provider and bring
    /// both bus lines up (idle high, CLK push-pull, DIO open-drain).
    ///
    /// Fails with [`Error::InvalidArgument`] when either pin is not
    /// addressable; GPIO configuration errors are propagated and the
    /// partially built bus is dropped.
    pub fn new(mut gpio: G, delay: D, config: BusConfig) -> Result<Self, Error<G::Error>> {
        if !gpio.is_valid_pin(config.clk) || !gpio.is_valid_pin(config.dio) {
            return Err(Error::InvalidArgument);
        }
        let pull = if config.pullup { Pull::Up } else { Pull::None };
        gpio.set_level(config.clk, true)?;
        gpio.configure(config.clk, Direction::Output, pull)?;
        gpio.set_level(config.dio, true)?;
        gpio.configure(config.dio, Direction::InputOutputOpenDrain, pull)?;
        Ok(Bus {
            mutex: M::create(BusState {
                gpio,
                delay,
                clk: config.clk,
                dio: config.dio,
                devices: Vec::new(),
            }),
            _io: PhantomData,
        })
    }

    pub(crate) fn lock<R>(&self, f: impl FnOnce(&mut BusState<G, D>) -> R) -> R {
        self.mutex.lock(f)
    }

    /// Number of devices currently attached.
    pub fn device_count(&self) -> usize {
        self.lock(|bus| bus.device_count())
    }

    /// Tear the bus down and hand the pin controller and delay provider
    /// back.
    ///
    /// Devices borrow the bus, so this cannot be called while any device is
    /// still attached — the registry is provably empty here.
    pub fn release(self) -> (G, D) {
        let state = self.mutex.into_inner();
        (state.gpio, state.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{decode_frames, MockGpio, Op};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    const CLK: u8 = 18;
    const DIO: u8 = 19;

    fn new_bus(gpio: MockGpio) -> BusSimple<MockGpio, NoopDelay> {
        BusSimple::new(
            gpio,
            NoopDelay::new(),
            BusConfig {
                clk: CLK,
                dio: DIO,
                pullup: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn new_configures_both_lines_idle_high() {
        let bus = new_bus(MockGpio::new());
        let (gpio, _) = bus.release();
        assert_eq!(
            gpio.ops,
            vec![
                Op::Set { pin: CLK, high: true },
                Op::Configure {
                    pin: CLK,
                    direction: Direction::Output,
                    pull: Pull::Up,
                },
                Op::Set { pin: DIO, high: true },
                Op::Configure {
                    pin: DIO,
                    direction: Direction::InputOutputOpenDrain,
                    pull: Pull::Up,
                },
            ]
        );
    }

    #[test]
    fn new_rejects_unaddressable_pins() {
        let gpio = MockGpio::new().with_invalid_pins(&[DIO]);
        let result = BusSimple::new(
            gpio,
            NoopDelay::new(),
            BusConfig {
                clk: CLK,
                dio: DIO,
                pullup: false,
            },
        );
        assert!(matches!(result, Err(Error::InvalidArgument)));
    }

    #[test]
    fn new_propagates_configure_failure() {
        let gpio = MockGpio::new().with_failing_configure(CLK);
        let result = BusSimple::new(
            gpio,
            NoopDelay::new(),
            BusConfig {
                clk: CLK,
                dio: DIO,
                pullup: false,
            },
        );
        assert!(matches!(result, Err(Error::Gpio(_))));
    }

    #[test]
    fn create_then_release_returns_the_capabilities() {
        let bus = new_bus(MockGpio::new());
        assert_eq!(bus.device_count(), 0);
        let (gpio, _delay) = bus.release();
        // four ops from construction, nothing else happened
        assert_eq!(gpio.ops.len(), 4);
    }

    #[test]
    fn send_byte_is_lsb_first_and_framed_by_stb() {
        let bus = new_bus(MockGpio::new());
        bus.lock(|state| state.transaction(23, |state| state.send_byte(0xC5)))
            .unwrap();
        let (gpio, _) = bus.release();
        let frames = decode_frames(&gpio.ops, CLK, DIO, 23);
        assert_eq!(frames, vec![vec![0xC5]]);
    }

    #[test]
    fn read_byte_assembles_lsb_first() {
        let mut gpio = MockGpio::new();
        gpio.push_read_byte(0xA5);
        let bus = new_bus(gpio);
        let value = bus
            .lock(|state| state.transaction(23, |state| state.read_byte()))
            .unwrap();
        assert_eq!(value, 0xA5);
    }

    #[test]
    fn transaction_releases_select_on_failure() {
        let gpio = MockGpio::new();
        let bus = new_bus(gpio);
        bus.lock(|state| {
            let result = state.transaction(23, |state| {
                state.gpio.fail_next_set = true;
                state.send_byte(0xFF)
            });
            assert!(result.is_err());
        });
        let (gpio, _) = bus.release();
        assert_eq!(
            gpio.ops.last(),
            Some(&Op::Set { pin: 23, high: true })
        );
    }

    #[test]
    fn unregister_of_unknown_pin_is_a_no_op() {
        let bus = new_bus(MockGpio::new());
        bus.lock(|state| {
            state.register(23, Pull::None).unwrap();
            state.unregister(42);
            assert_eq!(state.device_count(), 1);
            state.unregister(23);
            state.unregister(23);
            assert_eq!(state.device_count(), 0);
        });
    }

    #[test]
    fn register_rejects_duplicate_select_pin() {
        let bus = new_bus(MockGpio::new());
        bus.lock(|state| {
            state.register(23, Pull::None).unwrap();
            assert_eq!(state.register(23, Pull::None), Err(Error::InvalidArgument));
            assert_eq!(state.device_count(), 1);
        });
    }

    #[test]
    fn register_fills_up_to_capacity() {
        let bus = new_bus(MockGpio::new());
        bus.lock(|state| {
            for pin in 0..MAX_DEVICES as u8 {
                state.register(pin, Pull::None).unwrap();
            }
            assert_eq!(
                state.register(MAX_DEVICES as u8, Pull::None),
                Err(Error::OutOfMemory)
            );
        });
    }

    #[test]
    fn register_rolls_back_when_select_configuration_fails() {
        let gpio = MockGpio::new().with_failing_configure(23);
        let bus = new_bus(gpio);
        bus.lock(|state| {
            assert!(matches!(state.register(23, Pull::None), Err(Error::Gpio(_))));
            assert_eq!(state.device_count(), 0);
        });
    }
}
