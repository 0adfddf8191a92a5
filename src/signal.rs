use nix::errno::Errno;
use nix::sys::signal::{sigaction, sigprocmask, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};

// Runs in signal context; only async-signal-safe calls are legal here.
extern "C" fn on_interrupt(_: libc::c_int) {
	let msg = b"\n";
	unsafe { libc::write(libc::STDOUT_FILENO, msg.as_ptr().cast(), msg.len()) };
}

/// Installs the SIGINT handler for the whole process. No SA_RESTART: a
/// blocked read or wait returns EINTR, which is how an interrupt aborts the
/// current input line without ending the shell.
pub fn install_interrupt_handler() -> Result<(), Errno> {
	let action = SigAction::new(SigHandler::Handler(on_interrupt), SaFlags::empty(), SigSet::empty());
	unsafe { sigaction(Signal::SIGINT, &action) }?;
	Ok(())
}

/// SIGINT held blocked across the pipeline setup window. Acquired before
/// dispatch; released at exactly two points, in each forked child right
/// before exec and in the parent right before it reaps. There is
/// deliberately no Drop impl: signal state never changes implicitly.
pub struct SignalGuard {
	mask: SigSet,
}

impl SignalGuard {
	pub fn block() -> Result<SignalGuard, Errno> {
		let mut mask = SigSet::empty();
		mask.add(Signal::SIGINT);
		sigprocmask(SigmaskHow::SIG_BLOCK, Some(&mask), None)?;
		Ok(SignalGuard { mask })
	}

	pub fn release(&self) -> Result<(), Errno> {
		sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.mask), None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn current_mask() -> SigSet {
		let mut mask = SigSet::empty();
		sigprocmask(SigmaskHow::SIG_BLOCK, None, Some(&mut mask)).unwrap();
		mask
	}

	#[test]
	fn block_and_release_toggle_the_mask() {
		let guard = SignalGuard::block().unwrap();
		assert!(current_mask().contains(Signal::SIGINT));
		guard.release().unwrap();
		assert!(!current_mask().contains(Signal::SIGINT));
	}

	#[test]
	fn blocking_twice_is_idempotent() {
		let first = SignalGuard::block().unwrap();
		let second = SignalGuard::block().unwrap();
		assert!(current_mask().contains(Signal::SIGINT));
		second.release().unwrap();
		assert!(!current_mask().contains(Signal::SIGINT));
		let _ = first;
	}
}
