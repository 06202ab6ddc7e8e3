#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate at28c16_shift_flash;
use at28c16_shift_flash::*;

use std::fs;
use std::io::{
	self,
	Write,
};
use std::path::Path;
use std::process::exit;

use at28c16_shift_flash::bus::{
	ADDRESS_LIMIT,
	BusController,
};
use at28c16_shift_flash::gpio::{
	Hardware,
	PinAssignment,
	PinMap,
};
use at28c16_shift_flash::sim::SimulatedBoard;

const REALTIME_PRIORITY: i32 = 50;

type Bus<'a> = BusController<&'a mut dyn Hardware>;

fn get_number(matches: &clap::ArgMatches, name: &str, default: usize) -> AResult<usize> {
	match matches.value_of(name) {
		None => Ok(default),
		Some(param) => parse_number(param).map_err(|e| {
			let msg = format!("invalid paramater {}: {}", name, e);
			e.context(msg).into()
		}),
	}
}

fn read_file(path: &str) -> AResult<Vec<u8>> {
	fs::read(path).map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("couldn't read {:?}: {}", path, e);
		e.context(msg).into()
	})
}

fn write_file(path: &str, data: &[u8]) -> AResult<()> {
	fs::write(path, data).map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("couldn't write {:?}: {}", path, e);
		e.context(msg).into()
	})
}

fn pin_map(matches: &clap::ArgMatches) -> AResult<PinMap> {
	let mut map = PinMap::default();
	if let Some(values) = matches.values_of("pin") {
		for value in values {
			let assignment: PinAssignment = value.parse()?;
			map.assign(assignment);
		}
	}
	map.validate()?;
	Ok(map)
}

fn with_bus<F>(matches: &clap::ArgMatches, f: F) -> AResult<()>
where
	F: FnOnce(&mut Bus<'_>) -> AResult<()>,
{
	if matches.is_present("realtime") {
		if let Err(e) = gpio::enable_realtime(REALTIME_PRIORITY) {
			warn!("Couldn't switch to realtime scheduling: {}", e);
		}
	}

	if matches.is_present("simulate") {
		let image = matches.value_of("image");
		let mut board = match image {
			Some(path) if Path::new(path).exists() => SimulatedBoard::load_image(path)?,
			_ => SimulatedBoard::default(),
		};

		let res = {
			let mut bus: Bus<'_> = BusController::new(&mut board as &mut dyn Hardware);
			f(&mut bus)
		};

		for violation in board.violations() {
			warn!("Simulation: {}", violation);
		}
		if let Some(path) = image {
			board.save_image(path)?;
		}
		res
	} else {
		let map = pin_map(matches)?;
		let root = matches.value_of("sysfs").unwrap_or(gpio::DEFAULT_SYSFS_ROOT);
		let mut pins = gpio::open_sysfs(root, &map)?;
		let mut bus: Bus<'_> = BusController::new(&mut pins as &mut dyn Hardware);
		f(&mut bus)
	}
}

fn read(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let offset = get_number(sub_m, "offset", 0)?;
	let count = get_number(sub_m, "count", ADDRESS_LIMIT.saturating_sub(offset))?;

	with_bus(matches, |bus| {
		let stdout = io::stdout();
		let data = bulk::read_range(bus, offset, count, &mut stdout.lock())?;

		if let Some(path) = sub_m.value_of("output") {
			write_file(path, &data)?;
			info!("Wrote {} bytes to {:?}", data.len(), path);
		}
		Ok(())
	})
}

fn write(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let offset = get_number(sub_m, "offset", 0)?;
	let data = read_file(sub_m.value_of("FILE").unwrap_or_default())?;

	with_bus(matches, |bus| {
		let stdout = io::stdout();
		bulk::write_range(bus, &data, data.len(), offset, &mut stdout.lock())
	})
}

fn erase(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let offset = get_number(sub_m, "offset", 0)?;
	let count = get_number(sub_m, "count", ADDRESS_LIMIT.saturating_sub(offset))?;
	let fill = get_number(sub_m, "fill", bulk::ERASE_FILL as usize)?;
	ensure!(fill <= 0xff, "fill value 0x{:x} doesn't fit in a byte", fill);

	with_bus(matches, |bus| {
		let stdout = io::stdout();
		bulk::erase_range(bus, offset, count, fill as u8, &mut stdout.lock())
	})
}

fn verify(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let offset = get_number(sub_m, "offset", 0)?;
	let data = read_file(sub_m.value_of("FILE").unwrap_or_default())?;

	with_bus(matches, |bus| {
		let stdout = io::stdout();
		let mismatches = bulk::verify_range(bus, &data, offset, &mut stdout.lock())?;
		ensure!(mismatches.is_empty(), "{} of {} bytes differ", mismatches.len(), data.len());
		println!("Image verified successfully");
		Ok(())
	})
}

fn demo(matches: &clap::ArgMatches) -> AResult<()> {
	with_bus(matches, |bus| {
		let stdout = io::stdout();
		demo::run(bus, &mut stdout.lock())
	})
}

fn pins(matches: &clap::ArgMatches) -> AResult<()> {
	let map = pin_map(matches)?;
	let stdout = io::stdout();
	write!(stdout.lock(), "{}", map)?;
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg simulate: -s --simulate "use a simulated board instead of GPIO")
		(@arg image: --image +takes_value requires[simulate] "EEPROM image backing the simulated board (loaded and saved)")
		(@arg sysfs: --sysfs +takes_value "sysfs GPIO directory (default /sys/class/gpio)")
		(@arg pin: -p --pin +takes_value +multiple number_of_values(1) "override pin mapping: SIGNAL=GPIO (e.g. write-enable=17)")
		(@arg realtime: --realtime "lock memory and use realtime scheduling")
		(@subcommand demo =>
			(about: "blink, dump, program 255 bytes of 0x55, erase everything")
		)
		(@subcommand read =>
			(about: "dump EEPROM contents")
			(@arg offset: -o --offset +takes_value "first address (default 0)")
			(@arg count: -c --count +takes_value "number of bytes (default: up to the end)")
			(@arg output: -w --output +takes_value "also store the raw bytes in this file")
		)
		(@subcommand write =>
			(about: "program image file")
			(@arg offset: -o --offset +takes_value "first address (default 0)")
			(@arg FILE: +required "image to program")
		)
		(@subcommand erase =>
			(about: "fill EEPROM with a constant")
			(@arg offset: -o --offset +takes_value "first address (default 0)")
			(@arg count: -c --count +takes_value "number of bytes (default: up to the end)")
			(@arg fill: -f --fill +takes_value "fill byte (default 0xff)")
		)
		(@subcommand verify =>
			(about: "compare EEPROM contents with image file")
			(@arg offset: -o --offset +takes_value "first address (default 0)")
			(@arg FILE: +required "expected image")
		)
		(@subcommand pins =>
			(about: "show pin mapping")
		)
	).get_matches();

	match matches.subcommand() {
		("demo", _) => {
			demo(&matches)
		},
		("read", Some(sub_m)) => {
			read(&matches, sub_m)
		},
		("write", Some(sub_m)) => {
			write(&matches, sub_m)
		},
		("erase", Some(sub_m)) => {
			erase(&matches, sub_m)
		},
		("verify", Some(sub_m)) => {
			verify(&matches, sub_m)
		},
		("pins", _) => {
			pins(&matches)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
