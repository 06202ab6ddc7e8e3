/// Pin level simulation of the programmer board
///
/// Models:
/// - two cascaded 74HC595: a bit enters on the rising edge of SHIFT CLOCK,
///   the chain is copied to the outputs on the rising edge of SHIFT LATCH.
///   After 16 clocks the first byte shifted (bit 0 first) drives A8-A10 and
///   OUTPUT ENABLE (bit 7, active low), the second byte drives A0-A7.
/// - an AT28C16: drives the data bus while its output is enabled and WRITE
///   ENABLE is high, commits the bus on the rising edge of WRITE ENABLE and
///   stays busy until the write cycle time passed.
/// - the data bus: inverting input stage, optional pull-ups.
///
/// Timing isn't simulated; instead `Hardware::delay` calls are counted and
/// checked against the protocol. Everything the real chips would silently
/// get wrong is recorded in `violations()`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::gpio::{
	Delay,
	Hardware,
	Pin,
	PinMode,
};

pub const EEPROM_SIZE: usize = 2048;

const OE_DISABLED: u8 = 0x80;
const ADDRESS_HIGH_MASK: u8 = 0x07;

/// decoded shift register outputs
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Latch {
	/// first byte shifted
	pub high: u8,
	/// second byte shifted
	pub low: u8,
}

impl Latch {
	pub fn address(&self) -> u16 {
		u16::from(self.high & ADDRESS_HIGH_MASK) << 8 | u16::from(self.low)
	}

	pub fn output_enabled(&self) -> bool {
		0 == self.high & OE_DISABLED
	}

	/// outputs not connected to anything; should stay low
	pub fn reserved(&self) -> u8 {
		self.high & !(OE_DISABLED | ADDRESS_HIGH_MASK)
	}
}

pub struct SimulatedBoard {
	modes: [PinMode; Pin::COUNT],
	levels: [bool; Pin::COUNT],
	chain: u16,
	outputs: Latch,
	memory: Vec<u8>,
	// write cycle running (no access allowed)
	busy: bool,
	// WRITE ENABLE low for at least `Delay::WritePulse`
	pulse_done: bool,
	// output enabled for at least `Delay::OutputValid`
	output_valid: bool,
	shifted_bits: Vec<bool>,
	latches: Vec<Latch>,
	writes: Vec<(u16, u8)>,
	delays: BTreeMap<Delay, usize>,
	led_flashes: usize,
	contentions: usize,
	violations: Vec<String>,
}

impl Default for SimulatedBoard {
	fn default() -> Self {
		SimulatedBoard::with_contents(vec![0xff; EEPROM_SIZE])
	}
}

impl SimulatedBoard {
	/// power-on state: all pins inputs, registers cleared
	pub fn with_contents(memory: Vec<u8>) -> Self {
		assert_eq!(memory.len(), EEPROM_SIZE);
		SimulatedBoard {
			modes: [PinMode::Input; Pin::COUNT],
			levels: [false; Pin::COUNT],
			chain: 0,
			outputs: Latch { high: 0, low: 0 },
			memory,
			busy: false,
			pulse_done: false,
			output_valid: false,
			shifted_bits: Vec::new(),
			latches: Vec::new(),
			writes: Vec::new(),
			delays: BTreeMap::new(),
			led_flashes: 0,
			contentions: 0,
			violations: Vec::new(),
		}
	}

	/// load an EEPROM image; shorter images are padded with 0xff
	pub fn load_image<P: AsRef<Path>>(path: P) -> crate::AResult<Self> {
		let path = path.as_ref();
		let mut memory = with_context!(("couldn't read image {:?}", path), {
			Ok(fs::read(path)?)
		})?;
		ensure!(memory.len() <= EEPROM_SIZE,
			"image {:?} too big: {} bytes (EEPROM has {})", path, memory.len(), EEPROM_SIZE
		);
		memory.resize(EEPROM_SIZE, 0xff);
		Ok(SimulatedBoard::with_contents(memory))
	}

	pub fn save_image<P: AsRef<Path>>(&self, path: P) -> crate::AResult<()> {
		let path = path.as_ref();
		with_context!(("couldn't write image {:?}", path), {
			fs::write(path, &self.memory)?;
			Ok(())
		})
	}

	pub fn contents(&self) -> &[u8] {
		&self.memory
	}

	/// current shift register outputs
	pub fn outputs(&self) -> Latch {
		self.outputs
	}

	/// SHIFT DATA level at every rising SHIFT CLOCK edge
	pub fn shifted_bits(&self) -> &[bool] {
		&self.shifted_bits
	}

	/// outputs after every latch pulse
	pub fn latches(&self) -> &[Latch] {
		&self.latches
	}

	/// (address, data) of every committed write
	pub fn writes(&self) -> &[(u16, u8)] {
		&self.writes
	}

	pub fn delay_count(&self, delay: Delay) -> usize {
		self.delays.get(&delay).cloned().unwrap_or(0)
	}

	pub fn led_flashes(&self) -> usize {
		self.led_flashes
	}

	/// number of times both the EEPROM and the controller drove the data bus
	pub fn contentions(&self) -> usize {
		self.contentions
	}

	pub fn violations(&self) -> &[String] {
		&self.violations
	}

	pub fn clear_history(&mut self) {
		self.shifted_bits.clear();
		self.latches.clear();
		self.writes.clear();
		self.delays.clear();
	}

	fn is_output(&self, pin: Pin) -> bool {
		self.modes[pin.index()] == PinMode::Output
	}

	fn level(&self, pin: Pin) -> bool {
		self.levels[pin.index()]
	}

	fn violation(&mut self, msg: String) {
		warn!("simulation: {}", msg);
		self.violations.push(msg);
	}

	fn controller_drives_bus(&self) -> bool {
		Pin::DATA_MSB_FIRST.iter().any(|&pin| self.is_output(pin))
	}

	fn eeprom_drives_bus(&self) -> bool {
		self.outputs.output_enabled() && !self.write_enable_active() && !self.busy
	}

	fn write_enable_active(&self) -> bool {
		self.is_output(Pin::WriteEnable) && !self.level(Pin::WriteEnable)
	}

	fn check_contention(&mut self) {
		if self.eeprom_drives_bus() && self.controller_drives_bus() {
			self.contentions += 1;
			let msg = format!("bus contention at address {:03x}", self.outputs.address());
			self.violation(msg);
		}
	}

	fn clock_edge(&mut self) {
		let bit = self.is_output(Pin::ShiftData) && self.level(Pin::ShiftData);
		self.shifted_bits.push(bit);
		self.chain = (self.chain >> 1) | (u16::from(bit) << 15);
	}

	fn latch_edge(&mut self) {
		if self.busy {
			let msg = format!("address changed during write cycle (at {:03x})", self.outputs.address());
			self.violation(msg);
		}
		let latch = Latch {
			high: self.chain as u8,
			low: (self.chain >> 8) as u8,
		};
		if latch.reserved() != 0 {
			let msg = format!("reserved shift register outputs set: {:02x}", latch.high);
			self.violation(msg);
		}
		if latch.output_enabled() && self.write_enable_active() {
			self.violation("output enabled while WRITE ENABLE is low".to_string());
		}
		self.outputs = latch;
		self.output_valid = false;
		self.latches.push(latch);
		self.check_contention();
	}

	fn write_enable_falling(&mut self) {
		if self.busy {
			self.violation("write started during write cycle".to_string());
		}
		if self.outputs.output_enabled() {
			self.violation(format!("WRITE ENABLE low while output enabled (at {:03x})", self.outputs.address()));
		}
		self.pulse_done = false;
	}

	fn write_enable_rising(&mut self) {
		if !self.pulse_done {
			self.violation("write pulse too short".to_string());
		}
		let mut data = 0u8;
		for &pin in Pin::DATA_MSB_FIRST.iter() {
			if !self.is_output(pin) {
				self.violation(format!("data line {} floating during write", pin));
			}
			data = data << 1 | self.level(pin) as u8;
		}
		let address = self.outputs.address();
		trace!("simulation: write {:02x} at {:03x}", data, address);
		self.memory[address as usize] = data;
		self.writes.push((address, data));
		self.busy = true;
	}

	/// level on a data line as seen by the EEPROM/bus
	fn bus_line(&self, bit: u8) -> bool {
		if self.eeprom_drives_bus() {
			let cell = self.memory[self.outputs.address() as usize];
			0 != cell & (1 << bit)
		} else {
			// undriven: pull-up or (arbitrarily) low
			self.modes[Pin::Data(bit).index()] == PinMode::InputPullUp
		}
	}
}

impl Hardware for SimulatedBoard {
	fn configure(&mut self, pin: Pin, mode: PinMode) {
		if pin == Pin::WriteEnable && mode == PinMode::Output && !self.level(pin) {
			self.violation("WRITE ENABLE configured as output while low".to_string());
		}
		self.modes[pin.index()] = mode;
		if let Pin::Data(_) = pin {
			if mode == PinMode::Output {
				self.check_contention();
			}
		}
	}

	fn write(&mut self, pin: Pin, level: bool) {
		let old = self.level(pin);
		self.levels[pin.index()] = level;
		if !self.is_output(pin) || old == level {
			return;
		}
		match (pin, level) {
			(Pin::ShiftClock, true) => self.clock_edge(),
			(Pin::ShiftLatch, true) => self.latch_edge(),
			(Pin::WriteEnable, false) => self.write_enable_falling(),
			(Pin::WriteEnable, true) => self.write_enable_rising(),
			(Pin::Led, true) => self.led_flashes += 1,
			_ => (),
		}
	}

	fn read(&mut self, pin: Pin) -> bool {
		if self.is_output(pin) {
			return self.level(pin);
		}
		match pin {
			Pin::Data(bit) => {
				if self.eeprom_drives_bus() && !self.output_valid {
					self.violation("data bus sampled before output valid".to_string());
				}
				// inverting input stage
				!self.bus_line(bit)
			},
			_ => false,
		}
	}

	fn delay(&mut self, delay: Delay) {
		*self.delays.entry(delay).or_insert(0) += 1;
		match delay {
			Delay::WritePulse => {
				if self.write_enable_active() {
					self.pulse_done = true;
				}
			},
			Delay::WriteCycle => self.busy = false,
			Delay::OutputValid => {
				if self.eeprom_drives_bus() {
					self.output_valid = true;
				}
			},
			Delay::ClockEdge | Delay::LedBlink => (),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_log::test;

	fn outputs_low(board: &mut SimulatedBoard, pins: &[Pin]) {
		for &pin in pins {
			board.write(pin, false);
			board.configure(pin, PinMode::Output);
		}
	}

	fn clock_in(board: &mut SimulatedBoard, bits: &[bool]) {
		for &bit in bits {
			board.write(Pin::ShiftData, bit);
			board.write(Pin::ShiftClock, true);
			board.write(Pin::ShiftClock, false);
		}
	}

	#[test]
	fn chain_decodes_first_byte_as_high() {
		let mut board = SimulatedBoard::default();
		outputs_low(&mut board, &[Pin::ShiftData, Pin::ShiftClock, Pin::ShiftLatch]);

		// high byte 0x85 (OE disabled, A8 + A10), then low byte 0x3c; bit 0 first
		let mut bits = Vec::new();
		for &byte in [0x85u8, 0x3c].iter() {
			for bit in 0..8 {
				bits.push(0 != byte & (1 << bit));
			}
		}
		clock_in(&mut board, &bits);
		// nothing visible before the latch
		assert_eq!(board.outputs(), Latch { high: 0, low: 0 });

		board.write(Pin::ShiftLatch, true);
		board.write(Pin::ShiftLatch, false);
		let latch = board.outputs();
		assert_eq!(latch, Latch { high: 0x85, low: 0x3c });
		assert_eq!(latch.address(), 0x53c);
		assert!(!latch.output_enabled());
		assert_eq!(board.shifted_bits(), &bits[..]);
		assert!(board.violations().is_empty(), "{:?}", board.violations());
	}

	#[test]
	fn edges_on_inputs_are_ignored() {
		let mut board = SimulatedBoard::default();
		board.write(Pin::ShiftClock, true);
		board.write(Pin::ShiftClock, false);
		board.write(Pin::Led, true);
		assert!(board.shifted_bits().is_empty());
		assert_eq!(board.led_flashes(), 0);
	}

	#[test]
	fn write_enable_configured_low_is_flagged() {
		let mut board = SimulatedBoard::default();
		board.configure(Pin::WriteEnable, PinMode::Output);
		assert_eq!(board.violations().len(), 1);
	}

	#[test]
	fn undriven_bus_reads_pull_ups_inverted() {
		let mut board = SimulatedBoard::default();
		board.configure(Pin::Data(0), PinMode::InputPullUp);
		outputs_low(&mut board, &[Pin::ShiftData, Pin::ShiftClock, Pin::ShiftLatch]);
		clock_in(&mut board, &[true, false, false, false, false, false, false, true]);
		clock_in(&mut board, &[false; 8]);
		board.write(Pin::ShiftLatch, true);
		assert!(!board.outputs().output_enabled());
		// pulled up line reads as 0 through the inverting stage
		assert!(!board.read(Pin::Data(0)));
		assert!(board.violations().is_empty(), "{:?}", board.violations());
	}

	#[test]
	fn image_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("rom.bin");
		fs::write(&path, &[0x12u8, 0x34]).unwrap();

		let board = SimulatedBoard::load_image(&path).unwrap();
		assert_eq!(&board.contents()[..3], &[0x12, 0x34, 0xff]);
		board.save_image(&path).unwrap();
		assert_eq!(fs::read(&path).unwrap().len(), EEPROM_SIZE);

		fs::write(&path, vec![0u8; EEPROM_SIZE + 1]).unwrap();
		assert!(SimulatedBoard::load_image(&path).is_err());
	}
}
