/// Range operations with console progress
///
/// Console format (also what the tests compare against):
/// - a banner line ("Reading EEPROM", "Programming EEPROM", ...)
/// - reading: one line per 16 bytes, `%03x:  ` + 8 × ` %02x` + `  ` + 8 × ` %02x`
/// - writing/erasing: a `.` after every 32 bytes, on one line
/// - "Done" on its own line

use std::fmt::Write as _;
use std::io::Write;

use crate::bus::{
	ADDRESS_LIMIT,
	Address,
	BusController,
	BusDirection,
};
use crate::gpio::Hardware;

pub const LINE_LENGTH: usize = 16;
pub const PROGRESS_STRIDE: usize = 32;
pub const ERASE_FILL: u8 = 0xff;

fn check_range(offset: usize, count: usize) -> crate::AResult<()> {
	ensure!(offset <= ADDRESS_LIMIT && count <= ADDRESS_LIMIT - offset,
		"range 0x{:x}+0x{:x} exceeds EEPROM size 0x{:x}", offset, count, ADDRESS_LIMIT
	);
	Ok(())
}

/// one dump line; `bytes` holds at most 16 values
pub fn format_line(base: usize, bytes: &[u8]) -> String {
	debug_assert!(bytes.len() <= LINE_LENGTH);
	let mut line = format!("{:03x}:  ", base);
	for (i, byte) in bytes.iter().enumerate() {
		if i == LINE_LENGTH / 2 {
			line.push_str("  ");
		}
		let _ = write!(line, " {:02x}", byte);
	}
	line
}

/// dump `[offset, offset + count)`; returns the bytes read
pub fn read_range<H, W>(bus: &mut BusController<H>, offset: usize, count: usize, out: &mut W) -> crate::AResult<Vec<u8>>
where
	H: Hardware,
	W: Write,
{
	check_range(offset, count)?;
	info!("Reading 0x{:x} bytes at 0x{:03x}", count, offset);
	writeln!(out, "Reading EEPROM")?;

	bus.set_direction(BusDirection::Input);
	let end = offset + count;
	let mut data = Vec::with_capacity(count);
	let mut base = offset;
	while base < end {
		let line_end = end.min(base + LINE_LENGTH);
		for address in base..line_end {
			data.push(bus.read_byte(Address::new(address)?)?);
		}
		writeln!(out, "{}", format_line(base, &data[base - offset..]))?;
		base = line_end;
	}

	writeln!(out, "Done")?;
	Ok(data)
}

fn program<H, W, F>(bus: &mut BusController<H>, offset: usize, length: usize, out: &mut W, byte_at: F) -> crate::AResult<()>
where
	H: Hardware,
	W: Write,
	F: Fn(usize) -> u8,
{
	bus.set_direction(BusDirection::Output);
	// address runs from `offset`, the source index from 0
	for address in offset..offset + length {
		let index = address - offset;
		bus.write_byte(Address::new(address)?, byte_at(index))?;
		if (index + 1) % PROGRESS_STRIDE == 0 {
			write!(out, ".")?;
			out.flush()?;
		}
	}
	if length >= PROGRESS_STRIDE {
		writeln!(out)?;
	}
	writeln!(out, "Done")?;
	Ok(())
}

/// program `data[..length]` at `[offset, offset + length)`
pub fn write_range<H, W>(bus: &mut BusController<H>, data: &[u8], length: usize, offset: usize, out: &mut W) -> crate::AResult<()>
where
	H: Hardware,
	W: Write,
{
	check_range(offset, length)?;
	ensure!(data.len() >= length, "need {} bytes to program, got only {}", length, data.len());
	info!("Programming 0x{:x} bytes at 0x{:03x}", length, offset);
	writeln!(out, "Programming EEPROM")?;

	program(bus, offset, length, out, |index| data[index])
}

/// set `[offset, offset + length)` to `fill` (usually `ERASE_FILL`)
pub fn erase_range<H, W>(bus: &mut BusController<H>, offset: usize, length: usize, fill: u8, out: &mut W) -> crate::AResult<()>
where
	H: Hardware,
	W: Write,
{
	check_range(offset, length)?;
	info!("Erasing 0x{:x} bytes at 0x{:03x} to 0x{:02x}", length, offset, fill);
	writeln!(out, "Erasing EEPROM")?;

	program(bus, offset, length, out, |_| fill)
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Mismatch {
	pub address: Address,
	pub expected: u8,
	pub found: u8,
}

/// compare `[offset, offset + data.len())` with `data`; prints and returns
/// all differences
pub fn verify_range<H, W>(bus: &mut BusController<H>, data: &[u8], offset: usize, out: &mut W) -> crate::AResult<Vec<Mismatch>>
where
	H: Hardware,
	W: Write,
{
	check_range(offset, data.len())?;
	info!("Verifying 0x{:x} bytes at 0x{:03x}", data.len(), offset);
	writeln!(out, "Verifying EEPROM")?;

	bus.set_direction(BusDirection::Input);
	let mut mismatches = Vec::new();
	for (index, &expected) in data.iter().enumerate() {
		let address = Address::new(offset + index)?;
		let found = bus.read_byte(address)?;
		if found != expected {
			writeln!(out, "{}: expected {:02x}, found {:02x}", address, expected, found)?;
			mismatches.push(Mismatch { address, expected, found });
		}
	}

	writeln!(out, "Done")?;
	Ok(mismatches)
}

#[cfg(test)]
mod tests;
