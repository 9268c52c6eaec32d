//! # Trace-recording fake pin controller
//!
//! Host-side [`Gpio`] implementation used by the test suite and the demo
//! programs. Every pin operation is appended to [`MockGpio::ops`], read
//! levels come from a script, and failures can be injected to exercise the
//! driver's unwinding paths.
//!
//! [`decode_frames`] turns a recorded trace back into the bytes that were
//! clocked onto the wire, so tests can assert whole transactions instead of
//! individual pin wiggles.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::gpio::{Direction, Gpio, Pull};

/// Error returned by injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// One recorded pin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// A `configure` call.
    Configure {
        pin: u8,
        direction: Direction,
        pull: Pull,
    },
    /// A `set_level` call.
    Set { pin: u8, high: bool },
    /// A `level` call.
    Get { pin: u8 },
}

/// Recording [`Gpio`] implementation.
#[derive(Debug, Default)]
pub struct MockGpio {
    /// Every successful operation, in order.
    pub ops: Vec<Op>,
    /// When set, the next `set_level` call fails once.
    pub fail_next_set: bool,
    reads: VecDeque<bool>,
    invalid_pins: Vec<u8>,
    failing_configure: Option<u8>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `pins` as not addressable.
    pub fn with_invalid_pins(mut self, pins: &[u8]) -> Self {
        self.invalid_pins.extend_from_slice(pins);
        self
    }

    /// Make every `configure` of `pin` fail.
    pub fn with_failing_configure(mut self, pin: u8) -> Self {
        self.failing_configure = Some(pin);
        self
    }

    /// Script one byte to be sampled off the data line, LSB first.
    pub fn push_read_byte(&mut self, byte: u8) {
        for bit in 0..8 {
            self.reads.push_back((byte >> bit) & 1 != 0);
        }
    }
}

impl Gpio for MockGpio {
    type Error = MockError;

    fn is_valid_pin(&self, pin: u8) -> bool {
        !self.invalid_pins.contains(&pin)
    }

    fn configure(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<(), MockError> {
        if self.failing_configure == Some(pin) {
            return Err(MockError);
        }
        self.ops.push(Op::Configure {
            pin,
            direction,
            pull,
        });
        Ok(())
    }

    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), MockError> {
        if self.fail_next_set {
            self.fail_next_set = false;
            return Err(MockError);
        }
        self.ops.push(Op::Set { pin, high });
        Ok(())
    }

    fn level(&mut self, pin: u8) -> Result<bool, MockError> {
        self.ops.push(Op::Get { pin });
        // unscripted reads see a released (low, nothing pressed) line
        Ok(self.reads.pop_front().unwrap_or(false))
    }
}

/// Reconstruct the bytes clocked out between the STB edges of each
/// transaction in a recorded trace.
///
/// A bit is what the data line was last driven to when the clock line rises;
/// eight bits form one byte, LSB first. During key-scan reads the data line
/// stays released (high), so read clocks show up as `0xFF` padding after the
/// read command byte.
pub fn decode_frames(ops: &[Op], clk: u8, dio: u8, stb: u8) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut bits: Vec<bool> = Vec::new();
    let mut selected = false;
    let mut dio_level = true;
    for op in ops {
        match *op {
            Op::Set { pin, high } if pin == stb => {
                if !high && !selected {
                    selected = true;
                    bits.clear();
                } else if high && selected {
                    selected = false;
                    let mut bytes = Vec::new();
                    for chunk in bits.chunks(8) {
                        let mut byte = 0u8;
                        for (position, &bit) in chunk.iter().enumerate() {
                            if bit {
                                byte |= 1 << position;
                            }
                        }
                        bytes.push(byte);
                    }
                    frames.push(bytes);
                }
            }
            Op::Set { pin, high } if pin == dio => dio_level = high,
            Op::Set { pin, high } if pin == clk => {
                if high && selected {
                    bits.push(dio_level);
                }
            }
            _ => {}
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_groups_bits_per_select_frame() {
        let mut ops = Vec::new();
        ops.push(Op::Set { pin: 2, high: false });
        for bit in 0..8 {
            ops.push(Op::Set {
                pin: 1,
                high: (0x5Au8 >> bit) & 1 != 0,
            });
            ops.push(Op::Set { pin: 0, high: true });
            ops.push(Op::Set { pin: 0, high: false });
        }
        ops.push(Op::Set { pin: 2, high: true });
        assert_eq!(decode_frames(&ops, 0, 1, 2), vec![vec![0x5A]]);
    }

    #[test]
    fn scripted_reads_come_back_lsb_first() {
        let mut gpio = MockGpio::new();
        gpio.push_read_byte(0x81);
        assert_eq!(gpio.level(7), Ok(true));
        for _ in 0..6 {
            assert_eq!(gpio.level(7), Ok(false));
        }
        assert_eq!(gpio.level(7), Ok(true));
        // script exhausted, line reads released
        assert_eq!(gpio.level(7), Ok(false));
    }
}
