//! # Command byte encoding for the TM1638/TM1668
//!
//! The chips understand four command classes, selected by the top two bits
//! of the command byte. The source code is written to resemble the data
//! sheet tables as close as possible.
//!
//! ```text
//! 0 1 _ _ _ _ _ _   data instruction     (address mode, key-scan read)
//! 1 1 _ _ a a a a   address instruction  (display register select, 0x0..0xF)
//! 1 0 _ _ d p p p   display control      (d = display on, ppp = pulse width)
//! 0 0 _ _ _ _ m m   display mode         (TM1668 only, grid/segment ratio)
//! ```
//!
//! Every write transaction starts with one command byte; the address
//! instruction may be followed by display data bytes. All bytes go onto the
//! wire least-significant bit first.

/// Duty cycle of the segment driver outputs ("pulse width" in the data
/// sheet). Together with the display-on flag it forms the display-control
/// command; the chip has no way to set one without re-asserting the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PulseWidth {
    /// 1/16 duty
    Duty1_16 = 0b000,
    /// 2/16 duty
    Duty2_16 = 0b001,
    /// 4/16 duty (power-on default of the driver, dim but always visible)
    #[default]
    Duty4_16 = 0b010,
    /// 10/16 duty
    Duty10_16 = 0b011,
    /// 11/16 duty
    Duty11_16 = 0b100,
    /// 12/16 duty
    Duty12_16 = 0b101,
    /// 13/16 duty
    Duty13_16 = 0b110,
    /// 14/16 duty (maximum brightness)
    Duty14_16 = 0b111,
}

/// Grid/segment multiplexing ratio of the TM1668.
///
/// The TM1638 has a fixed 8×10 matrix and no mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MultiplexMode {
    /// 4 grids × 13 segments (chip power-on default)
    #[default]
    Grid4Seg13 = 0b00,
    /// 5 grids × 12 segments
    Grid5Seg12 = 0b01,
    /// 6 grids × 11 segments
    Grid6Seg11 = 0b10,
    /// 7 grids × 10 segments
    Grid7Seg10 = 0b11,
}

/// One command byte, see the module documentation for the bit layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Data instruction: auto-increment the display address after each data
    /// byte.
    AddressIncrement,
    /// Data instruction: keep the display address fixed.
    AddressFixed,
    /// Data instruction: switch the chip to key-scan read mode.
    ReadKeys,
    /// Address instruction: select a display register (low nibble).
    Address(u8),
    /// Display control: display on/off and pulse width, always combined.
    DisplayControl { on: bool, pulse_width: PulseWidth },
    /// Display mode select (TM1668 only).
    MultiplexMode(MultiplexMode),
}

impl Command {
    /// The command as a byte ready to be clocked onto the wire.
    pub fn byte(self) -> u8 {
        match self {
            Command::AddressIncrement => 0b0100_0000,
            Command::AddressFixed => 0b0100_0100,
            Command::ReadKeys => 0b0100_0010,
            Command::Address(address) => 0b1100_0000 | (address & 0x0F),
            Command::DisplayControl { on, pulse_width } => {
                0b1000_0000 | ((on as u8) << 3) | pulse_width as u8
            }
            Command::MultiplexMode(mode) => mode as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_instructions() {
        assert_eq!(Command::AddressIncrement.byte(), 0x40);
        assert_eq!(Command::AddressFixed.byte(), 0x44);
        assert_eq!(Command::ReadKeys.byte(), 0x42);
    }

    #[test]
    fn address_masks_to_low_nibble() {
        assert_eq!(Command::Address(0x0).byte(), 0xC0);
        assert_eq!(Command::Address(0xD).byte(), 0xCD);
        assert_eq!(Command::Address(0x1F).byte(), 0xCF);
    }

    #[test]
    fn display_control_combines_both_fields() {
        assert_eq!(
            Command::DisplayControl {
                on: false,
                pulse_width: PulseWidth::Duty1_16,
            }
            .byte(),
            0x80
        );
        assert_eq!(
            Command::DisplayControl {
                on: true,
                pulse_width: PulseWidth::Duty14_16,
            }
            .byte(),
            0x8F
        );
        assert_eq!(
            Command::DisplayControl {
                on: true,
                pulse_width: PulseWidth::default(),
            }
            .byte(),
            0x8A
        );
    }

    #[test]
    fn multiplex_modes() {
        assert_eq!(Command::MultiplexMode(MultiplexMode::Grid4Seg13).byte(), 0x00);
        assert_eq!(Command::MultiplexMode(MultiplexMode::Grid7Seg10).byte(), 0x03);
    }
}
