use std::os::fd::{IntoRawFd, RawFd};

use nix::errno::Errno;
use nix::unistd;

/// One inter-stage descriptor pair: `read` feeds stage i+1, `write` takes
/// stage i's output.
#[derive(Debug)]
struct PipeEndpoint {
	read: RawFd,
	write: RawFd,
}

/// The N-1 pipes of an N-stage pipeline, allocated up front before any fork.
/// Every process that holds a copy must close every descriptor exactly once:
/// children call `close_all` after binding their ends, the parent calls it
/// after the fork loop. A leaked write end would keep the downstream reader
/// from ever seeing end-of-stream. Drop closes whatever is left so early
/// returns cannot leak.
#[derive(Debug)]
pub struct PipeChain {
	ends: Vec<PipeEndpoint>,
}

impl PipeChain {
	pub fn new(stages: usize) -> Result<PipeChain, Errno> {
		let mut ends = Vec::with_capacity(stages.saturating_sub(1));
		for _ in 1 .. stages {
			let (read, write) = unistd::pipe()?;
			ends.push(PipeEndpoint { read: read.into_raw_fd(), write: write.into_raw_fd() });
		}
		Ok(PipeChain { ends })
	}

	/// Number of pipes, i.e. stage count minus one.
	pub fn len(&self) -> usize {
		self.ends.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ends.is_empty()
	}

	pub fn read_end(&self, i: usize) -> RawFd {
		self.ends[i].read
	}

	pub fn write_end(&self, i: usize) -> RawFd {
		self.ends[i].write
	}

	pub fn close_all(&mut self) {
		for end in self.ends.drain(..) {
			let _ = unistd::close(end.read);
			let _ = unistd::close(end.write);
		}
	}
}

impl Drop for PipeChain {
	fn drop(&mut self) {
		self.close_all();
	}
}
