use std::convert::TryFrom;
use std::fmt;

pub const ADDRESS_WIDTH: usize = 11;
pub const ADDRESS_LIMIT: usize = 1usize << ADDRESS_WIDTH;

/// A0-A10; only constructible in range
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Address(u16);

impl Address {
	pub const ZERO: Address = Address(0);
	pub const MAX: Address = Address((ADDRESS_LIMIT - 1) as u16);

	pub fn new(address: usize) -> crate::AResult<Self> {
		ensure!(address < ADDRESS_LIMIT,
			"address 0x{:x} out of range (EEPROM has 0x{:x} bytes)", address, ADDRESS_LIMIT
		);
		Ok(Address(address as u16))
	}

	pub fn value(self) -> u16 {
		self.0
	}

	/// A8-A10
	pub fn high(self) -> u8 {
		(self.0 >> 8) as u8
	}

	/// A0-A7
	pub fn low(self) -> u8 {
		self.0 as u8
	}
}

impl TryFrom<u16> for Address {
	type Error = failure::Error;

	fn try_from(address: u16) -> Result<Self, Self::Error> {
		Address::new(address as usize)
	}
}

impl From<Address> for usize {
	fn from(address: Address) -> usize {
		address.0 as usize
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:03x}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_log::test;

	#[test]
	fn range_checked() {
		assert_eq!(Address::new(0).unwrap(), Address::ZERO);
		assert_eq!(Address::new(2047).unwrap(), Address::MAX);
		assert!(Address::new(2048).is_err());
		assert!(Address::try_from(0xffffu16).is_err());
	}

	#[test]
	fn split_into_bytes() {
		let address = Address::new(0x5a3).unwrap();
		assert_eq!(address.high(), 0x05);
		assert_eq!(address.low(), 0xa3);
		assert_eq!(Address::MAX.high(), 0x07);
		assert_eq!(address.to_string(), "5a3");
		assert_eq!(usize::from(address), 0x5a3);
	}
}
