//! A TM1668 and a TM1638 sharing one CLK/DIO pair, each behind its own
//! select pin.
//!
//! Runs on the host against the trace-recording mock; run with
//! `cargo run --example multiple --features std`.

use embedded_hal_mock::eh1::delay::NoopDelay;
use tm1668::mock::{decode_frames, MockGpio};
use tm1668::{BusConfig, BusSimple, Chip, DeviceConfig, MultiplexMode, PulseWidth};

const CLK: u8 = 18;
const DIO: u8 = 19;
const TM1668_STB: u8 = 5;
const TM1638_STB: u8 = 23;

const NUM7SEG: [u8; 10] = [
    0b0011_1111,
    0b0000_0110,
    0b0101_1011,
    0b0100_1111,
    0b0110_0110,
    0b0110_1101,
    0b0111_1101,
    0b0000_0111,
    0b0111_1111,
    0b0110_1111,
];

fn main() {
    let bus = BusSimple::new(
        MockGpio::new(),
        NoopDelay::new(),
        BusConfig {
            clk: CLK,
            dio: DIO,
            pullup: true,
        },
    )
    .unwrap();

    let mut tm1668 = bus
        .add_device(DeviceConfig {
            stb: TM1668_STB,
            pullup: true,
            chip: Chip::Tm1668,
        })
        .unwrap();
    let mut tm1638 = bus
        .add_device(DeviceConfig {
            stb: TM1638_STB,
            pullup: true,
            chip: Chip::Tm1638,
        })
        .unwrap();

    tm1668.reset().unwrap();
    tm1668.set_multiplex_mode(MultiplexMode::Grid7Seg10).unwrap();
    tm1638.reset().unwrap();

    let mut frame = [0u8; 14];
    for (grid, digit) in (1..=3).enumerate() {
        frame[grid * 2] = NUM7SEG[digit];
    }
    tm1668.display_write(0, &frame).unwrap();
    tm1668.set_pulse_width(PulseWidth::default()).unwrap();

    let mut frame = [0u8; 16];
    for (grid, digit) in (1..=8).enumerate() {
        frame[grid * 2] = NUM7SEG[digit];
    }
    tm1638.display_write(0, &frame).unwrap();
    tm1638.set_pulse_width(PulseWidth::default()).unwrap();

    tm1668.set_display_enabled(true).unwrap();
    tm1638.set_display_enabled(true).unwrap();

    // K1 column of the TM1668 map, one bit per scan byte
    let scan = tm1668.read_keys().unwrap();
    let mut pressed = 0u8;
    for (index, byte) in scan.as_bytes().iter().enumerate() {
        pressed |= (byte & 1) << index;
    }
    tm1668.display_write_fixed(6, pressed).unwrap();

    let scan = tm1638.read_keys().unwrap();
    println!("tm1638 key scan: {:02X?}", scan.as_bytes());

    tm1668.detach();
    tm1638.detach();
    let (gpio, _delay) = bus.release();
    for stb in [TM1668_STB, TM1638_STB] {
        for bytes in decode_frames(&gpio.ops, CLK, DIO, stb) {
            println!("stb {stb}: sent {:02X?}", bytes);
        }
    }
}
