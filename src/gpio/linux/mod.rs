mod realtime;
mod sysfs;

pub use self::realtime::enable_realtime;

pub use self::sysfs::{
	DEFAULT_SYSFS_ROOT,
	SysfsPins,
	open_sysfs,
};
