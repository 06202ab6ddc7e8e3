/// Serial input of the cascaded 74HC595 shift registers
///
/// Three lines: SHIFT DATA is sampled on the rising edge of SHIFT CLOCK, the
/// rising edge of SHIFT LATCH copies the whole chain to the outputs at once.
/// Shifting never changes the outputs, so the address bus only ever shows
/// complete, latched words.

use crate::gpio::{
	Delay,
	Hardware,
	Pin,
};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BitOrder {
	MsbFirst,
	LsbFirst,
}

impl BitOrder {
	/// bit position sent in `step` (0..8)
	pub fn bit(self, step: u8) -> u8 {
		assert!(step < 8);
		match self {
			BitOrder::MsbFirst => 7 - step,
			BitOrder::LsbFirst => step,
		}
	}
}

pub trait ShiftRegister: Hardware {
	// SHIFT LATCH is pulled low first; the clock is low between bits and
	// after returning.
	fn shift_byte(&mut self, value: u8, order: BitOrder) {
		self.write(Pin::ShiftLatch, false);
		for step in 0..8 {
			let bit = order.bit(step);
			self.write(Pin::ShiftData, 0 != value & (1 << bit));
			self.delay(Delay::ClockEdge); // wait for data to be stable

			self.write(Pin::ShiftClock, true);
			self.delay(Delay::ClockEdge); // minimum clock pulse width
			self.write(Pin::ShiftClock, false);
		}
	}

	// present the shifted bits on the outputs
	fn pulse_latch(&mut self) {
		self.delay(Delay::ClockEdge);
		self.write(Pin::ShiftLatch, true);
		self.delay(Delay::ClockEdge);
		self.write(Pin::ShiftLatch, false);
	}
}

impl<H: Hardware + ?Sized> ShiftRegister for H {
}
