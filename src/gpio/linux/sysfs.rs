use std::fs;
use std::io::{
	self,
	Write,
};
use std::os::unix::fs::FileExt;
use std::path::{
	Path,
	PathBuf,
};
use std::time::Duration;

use crate::gpio::{
	Hardware,
	Pin,
	PinMap,
	PinMode,
	reliable_sleep,
};

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

// udev might need a moment to create (and chmod) the line directory
const EXPORT_ATTEMPTS: usize = 20;
const EXPORT_POLL: Duration = Duration::from_millis(10);

struct Line {
	gpio: u32,
	value: fs::File,
	exported: bool,
	output: bool,
	level: bool,
}

impl Line {
	fn read_value(&self) -> io::Result<bool> {
		let mut buf = [0u8; 1];
		// reading should get all data in one step (in this case)
		let l = self.value.read_at(&mut buf, 0)?;
		if l != buf.len() {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty GPIO value"));
		}
		Ok(buf[0] == b'1')
	}

	fn write_value(&self, level: bool) -> io::Result<()> {
		let buf: &[u8] = if level { b"1" } else { b"0" };
		// writing should push all data in one step (in this case)
		let l = self.value.write_at(buf, 0)?;
		if l != buf.len() {
			Err(io::Error::new(io::ErrorKind::Other, "failed to write GPIO value"))
		} else {
			Ok(())
		}
	}
}

/// GPIO lines through the (legacy) sysfs interface
///
/// The `value` files stay open; every pin access is a single positioned
/// read or write.
pub struct SysfsPins {
	root: PathBuf,
	lines: Vec<Line>,
	warned_pull_up: bool,
}

fn write_attribute(path: &Path, value: &str) -> io::Result<()> {
	// need to write in one syscall for export/unexport/direction
	fs::OpenOptions::new().write(true).truncate(true).open(path)?.write_all(value.as_bytes())
}

impl SysfsPins {
	fn line_dir(&self, gpio: u32) -> PathBuf {
		self.root.join(format!("gpio{}", gpio))
	}

	fn export(&self, gpio: u32) -> crate::AResult<bool> {
		let dir = self.line_dir(gpio);
		if dir.join("value").exists() {
			return Ok(false);
		}

		with_context!(("export GPIO {}", gpio), {
			write_attribute(&self.root.join("export"), &gpio.to_string())?;
			Ok(())
		})?;

		for _ in 0..EXPORT_ATTEMPTS {
			if dir.join("value").exists() {
				debug!("exported GPIO {}", gpio);
				return Ok(true);
			}
			reliable_sleep(EXPORT_POLL);
		}
		bail!("GPIO {} didn't show up in {:?} after export", gpio, self.root);
	}

	fn open_line(&mut self, pin: Pin, gpio: u32) -> crate::AResult<()> {
		let exported = self.export(gpio)?;
		let path = self.line_dir(gpio).join("value");
		let value = with_context!(("open value of GPIO {} ({})", gpio, pin), {
			Ok(fs::OpenOptions::new().read(true).write(true).open(&path)?)
		});
		let value = match value {
			Ok(value) => value,
			Err(e) => {
				if exported {
					self.unexport(gpio);
				}
				return Err(e);
			},
		};
		self.lines.push(Line {
			gpio,
			value,
			exported,
			output: false,
			level: false,
		});
		Ok(())
	}

	fn unexport(&self, gpio: u32) {
		if let Err(e) = write_attribute(&self.root.join("unexport"), &gpio.to_string()) {
			warn!("Failed to unexport GPIO {}: {}", gpio, e);
		}
	}

	fn set_direction(&self, gpio: u32, direction: &str) {
		let path = self.line_dir(gpio).join("direction");
		if let Err(e) = write_attribute(&path, direction) {
			panic!("setting direction of GPIO {} to {:?} failed: {}", gpio, direction, e);
		}
	}
}

impl Hardware for SysfsPins {
	fn configure(&mut self, pin: Pin, mode: PinMode) {
		if mode == PinMode::InputPullUp && !self.warned_pull_up {
			warn!("sysfs GPIO can't enable pull-ups; external pull-ups needed on the data bus");
			self.warned_pull_up = true;
		}
		let (gpio, level) = {
			let line = &self.lines[pin.index()];
			(line.gpio, line.level)
		};
		let direction = match mode {
			// "high"/"low" switch to output with the level already applied
			PinMode::Output => if level { "high" } else { "low" },
			PinMode::Input | PinMode::InputPullUp => "in",
		};
		trace!("GPIO {} ({}): direction {}", gpio, pin, direction);
		self.set_direction(gpio, direction);
		self.lines[pin.index()].output = mode == PinMode::Output;
	}

	fn write(&mut self, pin: Pin, level: bool) {
		let line = &mut self.lines[pin.index()];
		line.level = level;
		if line.output {
			trace!("GPIO {} ({}): {}", line.gpio, pin, level as u8);
			line.write_value(level).expect("writing an output GPIO must not fail");
		}
	}

	fn read(&mut self, pin: Pin) -> bool {
		let line = &self.lines[pin.index()];
		if line.output {
			return line.level;
		}
		line.read_value().expect("reading a GPIO must not fail")
	}
}

impl Drop for SysfsPins {
	fn drop(&mut self) {
		// stop driving the data bus; WRITE ENABLE keeps its (inactive) level
		for &pin in Pin::DATA_MSB_FIRST.iter() {
			if let Some(line) = self.lines.get(pin.index()) {
				if line.output {
					let path = self.line_dir(line.gpio).join("direction");
					if let Err(e) = write_attribute(&path, "in") {
						warn!("Failed to release GPIO {}: {}", line.gpio, e);
					}
				}
			}
		}
		for line in &self.lines {
			if line.exported {
				self.unexport(line.gpio);
			}
		}
	}
}

/// export and open all lines of `map` below `root` (usually `DEFAULT_SYSFS_ROOT`)
pub fn open_sysfs<P: AsRef<Path>>(root: P, map: &PinMap) -> crate::AResult<SysfsPins> {
	map.validate()?;

	let mut pins = SysfsPins {
		root: root.as_ref().to_path_buf(),
		lines: Vec::with_capacity(Pin::COUNT),
		warned_pull_up: false,
	};
	// lines are pushed in `Pin::ALL` order, matching `Pin::index`
	for (pin, gpio) in map.iter() {
		pins.open_line(pin, gpio)?;
	}
	info!("Opened {} GPIO lines below {:?}", pins.lines.len(), pins.root);

	Ok(pins)
}
