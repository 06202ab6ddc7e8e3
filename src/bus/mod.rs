/// Address latching and byte transfers on the AT28C16 data bus
///
/// The address (A0-A10) and the EEPROM's OUTPUT ENABLE come out of the
/// shift registers; WRITE ENABLE and D0-D7 are GPIO lines.
///
/// Ordering rules:
/// - OUTPUT ENABLE is only active while this side doesn't drive the bus;
///   it is dropped (latched inactive) before the data lines become outputs.
/// - WRITE ENABLE only goes low with a stable, latched address and output
///   disabled, and the write cycle time passes before the next access.

mod address;

pub use self::address::{
	ADDRESS_LIMIT,
	Address,
};

use crate::gpio::{
	Delay,
	Hardware,
	Pin,
	PinMode,
};
use crate::shift::{
	BitOrder,
	ShiftRegister,
};

// bit 7 of the high address byte; active low at the EEPROM
const OUTPUT_DISABLE: u8 = 0x80;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BusDirection {
	/// the EEPROM drives the bus (reading)
	Input,
	/// the controller drives the bus (writing)
	Output,
}

/// Owner of the programmer hardware.
///
/// Every operation takes `&mut self`: whoever holds the controller mutably
/// is the only one driving the bus.
pub struct BusController<H: Hardware> {
	hardware: H,
	direction: BusDirection,
	// last latched address and output enable state
	latched: (Address, bool),
}

impl<H: Hardware> BusController<H> {
	/// take over the pins; the bus starts out as input with the EEPROM
	/// output disabled at address 0
	pub fn new(mut hardware: H) -> Self {
		// WRITE ENABLE is active low: set it high before configuring it
		hardware.write(Pin::WriteEnable, true);
		hardware.configure(Pin::WriteEnable, PinMode::Output);
		for &pin in [Pin::ShiftData, Pin::ShiftClock, Pin::ShiftLatch].iter() {
			hardware.write(pin, false);
			hardware.configure(pin, PinMode::Output);
		}
		for &pin in Pin::DATA_MSB_FIRST.iter() {
			hardware.configure(pin, PinMode::InputPullUp);
		}

		let mut controller = BusController {
			hardware,
			direction: BusDirection::Input,
			latched: (Address::ZERO, false),
		};
		controller.latch(Address::ZERO, false);
		controller
	}

	pub fn hardware(&self) -> &H {
		&self.hardware
	}

	pub fn hardware_mut(&mut self) -> &mut H {
		&mut self.hardware
	}

	pub fn into_inner(self) -> H {
		self.hardware
	}

	pub fn direction(&self) -> BusDirection {
		self.direction
	}

	pub fn set_direction(&mut self, direction: BusDirection) {
		if direction == self.direction {
			return;
		}
		debug!("bus direction: {:?}", direction);
		match direction {
			BusDirection::Input => {
				for &pin in Pin::DATA_MSB_FIRST.iter() {
					self.hardware.configure(pin, PinMode::InputPullUp);
				}
			},
			BusDirection::Output => {
				// EEPROM must let go of the bus first
				let (address, output_enable) = self.latched;
				if output_enable {
					self.latch(address, false);
				}
				for &pin in Pin::DATA_MSB_FIRST.iter() {
					self.hardware.configure(pin, PinMode::Output);
				}
			},
		}
		self.direction = direction;
	}

	/// latch `address` and OUTPUT ENABLE together
	///
	/// OUTPUT ENABLE can only be requested while the bus is an input.
	pub fn set_address(&mut self, address: Address, output_enable: bool) -> crate::AResult<()> {
		ensure!(!output_enable || self.direction == BusDirection::Input,
			"can't enable EEPROM output at {} while driving the data bus", address
		);
		self.latch(address, output_enable);
		Ok(())
	}

	fn latch(&mut self, address: Address, output_enable: bool) {
		let high = address.high() | if output_enable { 0x00 } else { OUTPUT_DISABLE };
		// the first byte ends up in the far register
		self.hardware.shift_byte(high, BitOrder::LsbFirst);
		self.hardware.shift_byte(address.low(), BitOrder::LsbFirst);
		self.hardware.pulse_latch();
		self.latched = (address, output_enable);
	}

	pub fn read_byte(&mut self, address: Address) -> crate::AResult<u8> {
		ensure!(self.direction == BusDirection::Input,
			"can't read {} while driving the data bus", address
		);
		self.latch(address, true);
		self.hardware.delay(Delay::OutputValid);

		let mut data = 0u8;
		for &pin in Pin::DATA_MSB_FIRST.iter() {
			// input stage inverts
			let bit = !self.hardware.read(pin);
			data = (data << 1) | bit as u8;
		}
		Ok(data)
	}

	/// program one byte; blocks for the full write cycle
	///
	/// There is no busy/ready polling: `Delay::WriteCycle` is the worst case
	/// write cycle time, and skipping it corrupts the following accesses.
	pub fn write_byte(&mut self, address: Address, data: u8) -> crate::AResult<()> {
		ensure!(self.direction == BusDirection::Output,
			"can't write {} while the data bus is an input", address
		);
		self.latch(address, false);

		for (step, &pin) in Pin::DATA_MSB_FIRST.iter().enumerate() {
			self.hardware.write(pin, 0 != data & (0x80 >> step));
		}

		self.hardware.write(Pin::WriteEnable, false);
		self.hardware.delay(Delay::WritePulse);
		self.hardware.write(Pin::WriteEnable, true);
		self.hardware.delay(Delay::WriteCycle);
		Ok(())
	}
}
