use std::fmt;
use std::str;

use super::Pin;

/// Physical GPIO line for every logical signal
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PinMap {
	gpio: [u32; Pin::COUNT],
}

impl Default for PinMap {
	// the wiring of the programmer board; don't change without rewiring
	fn default() -> Self {
		let mut gpio = [0u32; Pin::COUNT];
		gpio[Pin::ShiftData.index()] = 2;
		gpio[Pin::ShiftClock.index()] = 3;
		gpio[Pin::ShiftLatch.index()] = 4;
		for bit in 0..8u8 {
			gpio[Pin::Data(bit).index()] = 5 + u32::from(bit);
		}
		gpio[Pin::WriteEnable.index()] = 13;
		gpio[Pin::Led.index()] = 26;
		PinMap { gpio }
	}
}

impl PinMap {
	pub fn gpio(&self, pin: Pin) -> u32 {
		self.gpio[pin.index()]
	}

	pub fn assign(&mut self, assignment: PinAssignment) -> &mut Self {
		self.gpio[assignment.pin.index()] = assignment.gpio;
		self
	}

	pub fn iter<'a>(&'a self) -> impl Iterator<Item = (Pin, u32)> + 'a {
		Pin::ALL.iter().map(move |&pin| (pin, self.gpio(pin)))
	}

	/// every signal needs its own line
	pub fn validate(&self) -> crate::AResult<()> {
		for (index, &pin) in Pin::ALL.iter().enumerate() {
			for &other in &Pin::ALL[index + 1..] {
				ensure!(self.gpio(pin) != self.gpio(other),
					"signals {} and {} are both mapped to GPIO {}", pin, other, self.gpio(pin)
				);
			}
		}
		Ok(())
	}
}

impl fmt::Display for PinMap {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (pin, gpio) in self.iter() {
			writeln!(f, "{:<13} GPIO {}", pin, gpio)?;
		}
		Ok(())
	}
}

/// `SIGNAL=NUMBER`, e.g. `write-enable=17`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PinAssignment {
	pub pin: Pin,
	pub gpio: u32,
}

impl str::FromStr for PinAssignment {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let eq = match s.find('=') {
			Some(eq) => eq,
			None => bail!("Couldn't find '=' in pin assignment: {:?}", s),
		};
		let (pin_s, gpio_s) = (&s[..eq], &s[eq + 1..]);

		let pin = pin_s.parse::<Pin>()?;
		let gpio = with_context!(("invalid GPIO number: {}", gpio_s),
			Ok(gpio_s.trim().parse::<u32>()?)
		)?;

		Ok(PinAssignment { pin, gpio })
	}
}
