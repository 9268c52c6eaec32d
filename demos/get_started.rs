//! Single TM1638 on its own private bus: bring the display up, show the
//! digits 1 through 8, poll the keys once.
//!
//! Runs on the host against the trace-recording mock so the wire traffic
//! can be inspected; swap in your platform's `Gpio` and delay to drive real
//! hardware. Run with `cargo run --example get_started --features std`.

use embedded_hal_mock::eh1::delay::NoopDelay;
use tm1668::mock::{decode_frames, MockGpio};
use tm1668::{Chip, NullMutex, PulseWidth, SoloConfig, SoloDevice};

const CLK: u8 = 18;
const DIO: u8 = 19;
const STB: u8 = 23;

/// 7-segment patterns for the digits 0-9.
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
    let mut dev: SoloDevice<_, _, NullMutex<_>> = SoloDevice::new(
        MockGpio::new(),
        NoopDelay::new(),
        SoloConfig {
            clk: CLK,
            dio: DIO,
            stb: STB,
            pullup: true,
            chip: Chip::Tm1638,
        },
    )
    .unwrap();

    dev.reset().unwrap();

    // one digit per grid, the odd addresses hold the upper segment bits
    let mut frame = [0u8; 16];
    for (grid, digit) in (1..=8).enumerate() {
        frame[grid * 2] = NUM7SEG[digit];
    }
    dev.display_write(0, &frame).unwrap();
    dev.set_pulse_width(PulseWidth::default()).unwrap();
    dev.set_display_enabled(true).unwrap();

    let keys = dev.read_keys().unwrap();
    println!("key scan: {:02X?}", keys.as_bytes());

    let (gpio, _delay) = dev.release();
    for bytes in decode_frames(&gpio.ops, CLK, DIO, STB) {
        println!("sent: {:02X?}", bytes);
    }
}
