use super::*;
use std::io;
use crate::sim::{
	EEPROM_SIZE,
	SimulatedBoard,
};
use test_log::test;

fn controller() -> BusController<SimulatedBoard> {
	BusController::new(SimulatedBoard::default())
}

fn console(out: Vec<u8>) -> String {
	String::from_utf8(out).unwrap()
}

fn assert_clean(bus: &BusController<SimulatedBoard>) {
	let board = bus.hardware();
	assert!(board.violations().is_empty(), "{:?}", board.violations());
	assert_eq!(board.contentions(), 0);
}

#[test]
fn line_format() {
	let bytes: Vec<u8> = (0..16).collect();
	assert_eq!(
		format_line(0x7f0, &bytes),
		"7f0:   00 01 02 03 04 05 06 07   08 09 0a 0b 0c 0d 0e 0f",
	);
	assert_eq!(format_line(0x20, &[0xab, 0xcd]), "020:   ab cd");
	assert_eq!(format_line(0, &[]), "000:  ");
}

#[test]
fn program_then_dump_first_line() {
	let mut bus = controller();
	let mut out: Vec<u8> = Vec::new();
	write_range(&mut bus, &[0x55; 255], 255, 0, &mut out).unwrap();
	assert_eq!(console(out), "Programming EEPROM\n.......\nDone\n");

	let mut out: Vec<u8> = Vec::new();
	let data = read_range(&mut bus, 0, 16, &mut out).unwrap();
	assert_eq!(data, vec![0x55; 16]);
	assert_eq!(
		console(out),
		"Reading EEPROM\n000:   55 55 55 55 55 55 55 55   55 55 55 55 55 55 55 55\nDone\n",
	);
	assert_clean(&bus);
}

#[test]
fn full_dump_has_one_line_per_16_bytes() {
	let memory: Vec<u8> = (0..EEPROM_SIZE).map(|i| (i * 7) as u8).collect();
	let mut bus = BusController::new(SimulatedBoard::with_contents(memory.clone()));
	let mut out: Vec<u8> = Vec::new();
	let data = read_range(&mut bus, 0, EEPROM_SIZE, &mut out).unwrap();
	assert_eq!(data, memory);

	let text = console(out);
	let lines: Vec<&str> = text.lines().collect();
	assert_eq!(lines.len(), 2 + EEPROM_SIZE / LINE_LENGTH);
	assert_eq!(lines[0], "Reading EEPROM");
	assert_eq!(lines[1], format_line(0, &memory[..16]));
	assert!(lines[128].starts_with("7f0:   "), "{}", lines[128]);
	assert_eq!(lines[129], "Done");
	assert_clean(&bus);
}

#[test]
fn partial_last_line() {
	let mut bus = controller();
	let mut out: Vec<u8> = Vec::new();
	read_range(&mut bus, 0x10, 20, &mut out).unwrap();
	assert_eq!(
		console(out),
		"Reading EEPROM\n\
		010:   ff ff ff ff ff ff ff ff   ff ff ff ff ff ff ff ff\n\
		020:   ff ff ff ff\n\
		Done\n",
	);
}

#[test]
fn read_visits_range_once_ascending() {
	let mut bus = controller();
	bus.hardware_mut().clear_history();
	read_range(&mut bus, 100, 300, &mut io::sink()).unwrap();

	let visited: Vec<usize> = bus.hardware().latches().iter()
		.filter(|latch| latch.output_enabled())
		.map(|latch| latch.address() as usize)
		.collect();
	assert_eq!(visited, (100..400).collect::<Vec<_>>());
	assert_clean(&bus);
}

#[test]
fn write_visits_range_once_ascending() {
	let mut bus = controller();
	let data: Vec<u8> = (0..300).map(|i| i as u8).collect();
	write_range(&mut bus, &data, 300, 100, &mut io::sink()).unwrap();

	let expected: Vec<(u16, u8)> = (0..300).map(|i| (100 + i as u16, i as u8)).collect();
	assert_eq!(bus.hardware().writes(), &expected[..]);
	assert_eq!(&bus.hardware().contents()[100..400], &data[..]);
	// neighbours untouched
	assert_eq!(bus.hardware().contents()[99], 0xff);
	assert_eq!(bus.hardware().contents()[400], 0xff);
	assert_clean(&bus);
}

#[test]
fn write_uses_buffer_prefix() {
	let mut bus = controller();
	write_range(&mut bus, &[1, 2, 3, 4, 5], 3, 0x7fd, &mut io::sink()).unwrap();
	assert_eq!(&bus.hardware().contents()[0x7fd..], &[1, 2, 3]);
}

#[test]
fn progress_dots() {
	for &length in [0usize, 1, 31, 32, 33, 63, 64, 255, 2048].iter() {
		let mut bus = controller();
		let mut out: Vec<u8> = Vec::new();
		erase_range(&mut bus, 0, length, ERASE_FILL, &mut out).unwrap();
		let text = console(out);

		assert_eq!(text.matches('.').count(), length / PROGRESS_STRIDE, "length {}", length);
		assert_eq!(text.matches("Done").count(), 1, "length {}", length);
		assert!(text.starts_with("Erasing EEPROM\n"));
		assert!(text.ends_with("Done\n"));
		if length < PROGRESS_STRIDE {
			assert_eq!(text, "Erasing EEPROM\nDone\n");
		}
	}
}

#[test]
fn erase_fills() {
	let mut bus = BusController::new(SimulatedBoard::with_contents(vec![0x00; EEPROM_SIZE]));
	erase_range(&mut bus, 0x100, 0x40, ERASE_FILL, &mut io::sink()).unwrap();
	erase_range(&mut bus, 0x200, 2, 0xa5, &mut io::sink()).unwrap();

	let contents = bus.hardware().contents();
	assert!(contents[0x100..0x140].iter().all(|&b| b == 0xff));
	assert_eq!(contents[0xff], 0x00);
	assert_eq!(contents[0x140], 0x00);
	assert_eq!(&contents[0x200..0x203], &[0xa5, 0xa5, 0x00]);
	assert_clean(&bus);
}

#[test]
fn ranges_checked_before_touching_pins() {
	let mut bus = controller();
	bus.hardware_mut().clear_history();
	let mut out: Vec<u8> = Vec::new();

	assert!(read_range(&mut bus, 2000, 49, &mut out).is_err());
	assert!(read_range(&mut bus, 2049, 0, &mut out).is_err());
	assert!(write_range(&mut bus, &[0; 16], 16, 2040, &mut out).is_err());
	assert!(write_range(&mut bus, &[0; 4], 5, 0, &mut out).is_err());
	assert!(erase_range(&mut bus, 0, 2049, ERASE_FILL, &mut out).is_err());
	assert!(verify_range(&mut bus, &[0; 2], 2047, &mut out).is_err());

	assert!(out.is_empty());
	assert!(bus.hardware().latches().is_empty());
	assert!(bus.hardware().writes().is_empty());

	// the very end is fine
	read_range(&mut bus, 2047, 1, &mut out).unwrap();
	read_range(&mut bus, 2048, 0, &mut out).unwrap();
}

#[test]
fn verify_reports_mismatches() {
	let mut memory = vec![0xff; EEPROM_SIZE];
	memory[0x12] = 0x00;
	let mut bus = BusController::new(SimulatedBoard::with_contents(memory));
	let mut out: Vec<u8> = Vec::new();

	let mismatches = verify_range(&mut bus, &[0xff; 4], 0x10, &mut out).unwrap();
	assert_eq!(mismatches, vec![Mismatch {
		address: Address::new(0x12).unwrap(),
		expected: 0xff,
		found: 0x00,
	}]);
	assert_eq!(console(out), "Verifying EEPROM\n012: expected ff, found 00\nDone\n");
}

#[test]
fn read_write_erase_sequence_without_contention() {
	let mut bus = controller();
	let mut out: Vec<u8> = Vec::new();
	read_range(&mut bus, 0, 64, &mut out).unwrap();
	write_range(&mut bus, &[0x55; 64], 64, 0, &mut out).unwrap();
	assert_eq!(read_range(&mut bus, 0, 64, &mut out).unwrap(), vec![0x55; 64]);
	erase_range(&mut bus, 0, 64, ERASE_FILL, &mut out).unwrap();
	assert_eq!(read_range(&mut bus, 0, 64, &mut out).unwrap(), vec![0xff; 64]);
	assert_clean(&bus);
}
