use std::io;

use libc::{
	MCL_CURRENT,
	MCL_FUTURE,
	SCHED_FIFO,
	mlockall,
	sched_param,
	sched_setscheduler,
};

/// Lock all pages and switch the process to FIFO scheduling.
///
/// Bit-banging through sysfs is slow but mostly needs to be *steady*: a page
/// fault or preemption in the middle of a write pulse stretches WRITE ENABLE
/// past its maximum width. Needs CAP_IPC_LOCK and CAP_SYS_NICE.
pub fn enable_realtime(priority: i32) -> io::Result<()> {
	let res = unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) };
	if 0 != res {
		return Err(io::Error::last_os_error());
	}

	let param = sched_param {
		sched_priority: priority,
	};
	let res = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
	if 0 != res {
		return Err(io::Error::last_os_error());
	}

	info!("Running with SCHED_FIFO priority {}", priority);
	Ok(())
}
