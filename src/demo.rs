use std::io::Write;

use crate::bulk::{
	ERASE_FILL,
	erase_range,
	read_range,
	write_range,
};
use crate::bus::{
	ADDRESS_LIMIT,
	BusController,
};
use crate::gpio::{
	Delay,
	Hardware,
	Pin,
	PinMode,
};

pub const DEMO_FILL: u8 = 0x55;
pub const DEMO_LENGTH: usize = 255;
pub const DEMO_BLINKS: usize = 3;

/// flash the feedback LED; leaves it off
pub fn blink<H: Hardware + ?Sized>(hardware: &mut H, times: usize) {
	hardware.write(Pin::Led, false);
	hardware.configure(Pin::Led, PinMode::Output);
	for _ in 0..times * 2 {
		hardware.toggle(Pin::Led);
		hardware.delay(Delay::LedBlink);
	}
}

/// Fixed demonstration run: blink, dump everything, program a block of
/// `DEMO_FILL`, erase everything.
pub fn run<H, W>(bus: &mut BusController<H>, out: &mut W) -> crate::AResult<()>
where
	H: Hardware,
	W: Write,
{
	blink(bus.hardware_mut(), DEMO_BLINKS);

	read_range(bus, 0, ADDRESS_LIMIT, out)?;

	let buffer = [DEMO_FILL; DEMO_LENGTH];
	write_range(bus, &buffer, buffer.len(), 0, out)?;

	erase_range(bus, 0, ADDRESS_LIMIT, ERASE_FILL, out)?;

	Ok(())
}
