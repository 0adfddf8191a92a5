use std::io::{self, Write};

use nix::errno::Errno;
use nix::sys::wait::{self, WaitStatus};
use tracing::debug;

trait WaitStatusExt {
	fn is_failure(&self) -> bool;
}

impl WaitStatusExt for WaitStatus {
	fn is_failure(&self) -> bool {
		match *self {
			WaitStatus::Exited(_, code) => code != 0,
			_ => true,
		}
	}
}

/// Reaps `count` children by waiting for "any child" that many times and
/// returns how many of them failed (abnormal termination or non-zero exit).
/// Reaping is unordered, so the count carries no per-stage attribution.
/// EINTR is not an error: the wait is retried without consuming a slot.
pub fn collect(count: usize) -> u32 {
	let mut failures: u32 = 0;
	let mut reaped = 0;
	while reaped < count {
		match wait::wait() {
			Err(Errno::EINTR) => {},
			Err(e) => {
				let _ = writeln!(io::stderr(), "wait: {}", e);
				break;
			},
			Ok(status) => {
				debug!(?status, "reaped child");
				if status.is_failure() {
					failures += 1;
				}
				reaped += 1;
			},
		}
	}
	failures
}
