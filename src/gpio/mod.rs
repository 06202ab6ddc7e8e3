/// Pin level access for the programmer board
///
/// Logical signals:
/// - SHIFT DATA / SHIFT CLOCK / SHIFT LATCH: serial input of two cascaded
///   74HC595 shift registers; their 16 outputs carry A0-A10 (bits 0-10) and
///   the inverted OUTPUT ENABLE of the EEPROM (bit 15).
/// - WRITE ENABLE: active low, wired directly to the EEPROM.
/// - D0-D7: data bus; sensed through an inverting input stage.
/// - LED: feedback only.
///
/// Everything above this module only talks to the `Hardware` trait; the
/// sysfs backend and the simulation in `crate::sim` implement it.

mod hardware;
mod linux;
mod map;

pub use self::hardware::{
	Delay,
	Hardware,
	Pin,
	PinMode,
	reliable_sleep,
	wait,
};

pub use self::map::{
	PinAssignment,
	PinMap,
};

// OS-specific. for now linux only.
pub use self::linux::{
	DEFAULT_SYSFS_ROOT,
	SysfsPins,
	enable_realtime,
	open_sysfs,
};
