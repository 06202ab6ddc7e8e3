use std::fmt;
use std::str;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

// anything shorter is spun instead of handed to the scheduler
const SLEEP_THRESHOLD: Duration = Duration::from_millis(1);

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

fn busy_wait(duration: Duration) {
	let start = Instant::now();
	while start.elapsed() < duration {
		std::hint::spin_loop();
	}
}

/// wait for (at least) `duration`
pub fn wait(duration: Duration) {
	if duration < SLEEP_THRESHOLD {
		busy_wait(duration);
	} else {
		reliable_sleep(duration);
	}
}

/// Fixed hardware timings.
///
/// None of these are tunables: they are derived from the 74HC595 and AT28C16
/// datasheets and are the only "error handling" the write path has.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Delay {
	/// Between edges on the shift register lines. 74HC595 needs 20 ns
	/// minimum clock/latch pulse width at 4.5 V (100 ns at 2 V); no maximum.
	ClockEdge,
	/// After enabling the EEPROM output before sampling the data bus.
	/// tACC is 200 ns for the slowest speed grade; no maximum.
	OutputValid,
	/// WRITE ENABLE low time. tWP is 100 ns minimum, 1000 ns maximum.
	WritePulse,
	/// Settle time after a write pulse. tWC is 1 ms typical, 10 ms maximum;
	/// there is no busy/ready polling so this is always the worst case.
	WriteCycle,
	/// Half period of the feedback blink.
	LedBlink,
}

impl Delay {
	pub fn duration(self) -> Duration {
		match self {
			Delay::ClockEdge => Duration::from_nanos(250),
			Delay::OutputValid => Duration::from_micros(1),
			Delay::WritePulse => Duration::from_nanos(500),
			Delay::WriteCycle => Duration::from_millis(10),
			Delay::LedBlink => Duration::from_millis(100),
		}
	}

	pub fn min(self) -> Duration {
		match self {
			Delay::ClockEdge => Duration::from_nanos(100),
			Delay::OutputValid => Duration::from_nanos(200),
			Delay::WritePulse => Duration::from_nanos(100),
			Delay::WriteCycle => Duration::from_millis(10),
			Delay::LedBlink => Duration::from_millis(0),
		}
	}

	/// `None` if longer is always fine
	pub fn max(self) -> Option<Duration> {
		match self {
			Delay::WritePulse => Some(Duration::from_nanos(1000)),
			_ => None,
		}
	}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Pin {
	ShiftData,
	ShiftClock,
	ShiftLatch,
	WriteEnable,
	/// data line 0..=7; `Pin::data` checks the range, other values panic
	/// wherever the pin is used
	Data(u8),
	Led,
}

impl Pin {
	pub const COUNT: usize = 13;

	pub const ALL: [Pin; 13] = [
		Pin::ShiftData,
		Pin::ShiftClock,
		Pin::ShiftLatch,
		Pin::WriteEnable,
		Pin::Data(0),
		Pin::Data(1),
		Pin::Data(2),
		Pin::Data(3),
		Pin::Data(4),
		Pin::Data(5),
		Pin::Data(6),
		Pin::Data(7),
		Pin::Led,
	];

	/// data lines, highest bit first
	pub const DATA_MSB_FIRST: [Pin; 8] = [
		Pin::Data(7),
		Pin::Data(6),
		Pin::Data(5),
		Pin::Data(4),
		Pin::Data(3),
		Pin::Data(2),
		Pin::Data(1),
		Pin::Data(0),
	];

	pub fn data(bit: u8) -> crate::AResult<Pin> {
		ensure!(bit < 8, "data line {} doesn't exist (d0-d7)", bit);
		Ok(Pin::Data(bit))
	}

	/// position in `Pin::ALL`
	pub fn index(self) -> usize {
		match self {
			Pin::ShiftData => 0,
			Pin::ShiftClock => 1,
			Pin::ShiftLatch => 2,
			Pin::WriteEnable => 3,
			Pin::Data(bit) => {
				assert!(bit < 8, "data line {} doesn't exist", bit);
				4 + bit as usize
			},
			Pin::Led => 12,
		}
	}

	pub fn name(self) -> &'static str {
		const DATA_NAMES: [&str; 8] = ["d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7"];
		match self {
			Pin::ShiftData => "shift-data",
			Pin::ShiftClock => "shift-clock",
			Pin::ShiftLatch => "shift-latch",
			Pin::WriteEnable => "write-enable",
			Pin::Data(bit) => {
				assert!(bit < 8, "data line {} doesn't exist", bit);
				DATA_NAMES[bit as usize]
			},
			Pin::Led => "led",
		}
	}
}

impl fmt::Display for Pin {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.pad(self.name())
	}
}

impl str::FromStr for Pin {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lower = s.trim().to_ascii_lowercase();
		for &pin in Pin::ALL.iter() {
			if pin.name() == lower {
				return Ok(pin);
			}
		}
		bail!("unknown signal {:?} (expected shift-data, shift-clock, shift-latch, write-enable, d0-d7 or led)", s);
	}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PinMode {
	Output,
	Input,
	InputPullUp,
}

/// Direct pin access; every call takes effect on the pin immediately.
///
/// There is no error channel: a backend that can fail after it was opened
/// has to panic, misconfiguration (e.g. writing an input) is a caller bug.
pub trait Hardware {
	fn configure(&mut self, pin: Pin, mode: PinMode);

	/// for inputs the level is remembered and applied when switching to output
	fn write(&mut self, pin: Pin, level: bool);

	/// outputs read back their driven level
	fn read(&mut self, pin: Pin) -> bool;

	fn toggle(&mut self, pin: Pin) {
		let level = self.read(pin);
		self.write(pin, !level);
	}

	// delay for (at least) the given hardware timing
	fn delay(&mut self, delay: Delay) {
		wait(delay.duration());
	}
}

impl<'a, H: ?Sized + Hardware> Hardware for &'a mut H {
	fn configure(&mut self, pin: Pin, mode: PinMode) {
		H::configure(*self, pin, mode)
	}
	fn write(&mut self, pin: Pin, level: bool) {
		H::write(*self, pin, level)
	}
	fn read(&mut self, pin: Pin) -> bool {
		H::read(*self, pin)
	}
	fn toggle(&mut self, pin: Pin) {
		H::toggle(*self, pin)
	}
	fn delay(&mut self, delay: Delay) {
		H::delay(*self, delay)
	}
}
