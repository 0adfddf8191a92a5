use std::convert::Infallible;
use std::ffi::{CString, OsStr};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{IntoRawFd, RawFd};

use nix::errno::Errno;
use nix::unistd::{self, ForkResult};
use thiserror::Error;
use tracing::trace;

use crate::builtin;
use crate::error::FatalError;
use crate::pipes::PipeChain;
use crate::reap;
use crate::signal::SignalGuard;
use crate::types::{PipelineSpec, Stage};

/// Exit status for a child whose redirection target cannot be opened. Kept at
/// EXIT_FAILURE, the same status the fatal setup path uses; change to 126 to
/// demote the condition to an ordinary stage failure.
const REDIR_OPEN_STATUS: i32 = libc::EXIT_FAILURE;

/// Failures on the child side of a fork. Each maps to the exit status the
/// child terminates with; the parent only ever sees that status through the
/// reaper.
#[derive(Debug, Error)]
enum StageError {
	#[error("{path}: {err}")]
	Redirect {
		path: String,
		err: io::Error,
	},
	#[error("dup2: {0}")]
	Dup(Errno),
	#[error("sigprocmask: {0}")]
	Unblock(Errno),
	#[error("embedded NUL in command line")]
	Nul(#[from] std::ffi::NulError),
	#[error("command not found: {name}")]
	NotFound { name: String },
	#[error("{name}: {err}")]
	Exec { name: String, err: Errno },
}

impl StageError {
	fn status(&self) -> i32 {
		match self {
			StageError::Redirect { .. } => REDIR_OPEN_STATUS,
			StageError::Dup(_) | StageError::Unblock(_) => libc::EXIT_FAILURE,
			StageError::NotFound { .. } => 127,
			StageError::Nul(_) | StageError::Exec { .. } => 126,
		}
	}
}

/// Runs one pipeline to completion and returns the number of failing stages.
/// Expects SIGINT already blocked through `guard`; on return the block has
/// been released (the parent unblocks right before reaping).
pub fn eval(spec: &PipelineSpec, guard: &SignalGuard) -> Result<u32, FatalError> {
	if let Some(func) = builtin::match_builtin(spec.first().name()) {
		trace!("dispatching builtin");
		let status = func(&spec.first().argv);
		return Ok(u32::from(status != 0));
	}
	trace!(stages = spec.len(), "dispatching pipeline");
	if spec.len() == 1 {
		one_stage(spec.first(), guard)
	} else {
		mult_stage(spec, guard)
	}
}

/// Single stage: no pipes at all, redirections apply directly against the
/// inherited standard streams.
fn one_stage(stage: &Stage, guard: &SignalGuard) -> Result<u32, FatalError> {
	match unsafe { unistd::fork() }.map_err(FatalError::Fork)? {
		ForkResult::Child => child_exec(stage, None, guard),
		ForkResult::Parent { .. } => {
			guard.release().map_err(FatalError::SigMask)?;
			Ok(reap::collect(1))
		},
	}
}

fn mult_stage(spec: &PipelineSpec, guard: &SignalGuard) -> Result<u32, FatalError> {
	let mut chain = PipeChain::new(spec.len()).map_err(FatalError::Pipe)?;
	for (i, stage) in spec.stages.iter().enumerate() {
		match unsafe { unistd::fork() }.map_err(FatalError::Fork)? {
			ForkResult::Child => child_exec(stage, Some((i, &mut chain)), guard),
			ForkResult::Parent { .. } => {},
		}
	}
	chain.close_all();
	guard.release().map_err(FatalError::SigMask)?;
	Ok(reap::collect(spec.len()))
}

fn child_exec(stage: &Stage, pipes: Option<(usize, &mut PipeChain)>, guard: &SignalGuard) -> ! {
	let err = match do_child_exec(stage, pipes, guard) {
		Ok(never) => match never {},
		Err(e) => e,
	};
	let _ = writeln!(io::stderr(), "{}", err);
	unsafe { libc::_exit(err.status()) }
}

// Post-fork: runs in the child, never returns to the dispatch loop.
fn do_child_exec(stage: &Stage, pipes: Option<(usize, &mut PipeChain)>, guard: &SignalGuard) -> Result<Infallible, StageError> {
	let (is_first, is_last) = match &pipes {
		None => (true, true),
		Some((i, chain)) => (*i == 0, *i == chain.len()),
	};

	if is_first {
		if let Some(path) = stage.input {
			redirect_input(path)?;
		}
	}
	if let Some((i, chain)) = pipes {
		if i > 0 {
			dup2(chain.read_end(i - 1), libc::STDIN_FILENO)?;
		}
		if i < chain.len() {
			dup2(chain.write_end(i), libc::STDOUT_FILENO)?;
		}
		// after this the child holds nothing but fds 0/1/2
		chain.close_all();
	}
	if is_last {
		if let Some(path) = stage.output {
			redirect_output(path)?;
		}
	}

	guard.release().map_err(StageError::Unblock)?;

	let argv: Vec<CString> = stage.argv.iter().map(|&arg| CString::new(arg)).collect::<Result<_, _>>()?;
	unistd::execvp(&argv[0], &argv).map_err(|e| {
		let name = String::from_utf8_lossy(stage.name()).into_owned();
		match e {
			Errno::ENOENT => StageError::NotFound { name },
			err => StageError::Exec { name, err },
		}
	})?;
	unreachable!()
}

fn dup2(oldfd: RawFd, newfd: RawFd) -> Result<(), StageError> {
	unistd::dup2(oldfd, newfd).map_err(StageError::Dup)?;
	Ok(())
}

fn redirect_input(path: &[u8]) -> Result<(), StageError> {
	use std::os::unix::ffi::OsStrExt;

	let file = File::open(OsStr::from_bytes(path))
		.map_err(|err| StageError::Redirect { path: String::from_utf8_lossy(path).into_owned(), err })?;
	bind(file.into_raw_fd(), libc::STDIN_FILENO)
}

// rw for owner, group and other, before the umask is applied
fn redirect_output(path: &[u8]) -> Result<(), StageError> {
	use std::os::unix::ffi::OsStrExt;
	use std::os::unix::fs::OpenOptionsExt;

	let file = OpenOptions::new()
		.write(true)
		.create(true)
		.truncate(true)
		.mode(0o666)
		.open(OsStr::from_bytes(path))
		.map_err(|err| StageError::Redirect { path: String::from_utf8_lossy(path).into_owned(), err })?;
	bind(file.into_raw_fd(), libc::STDOUT_FILENO)
}

fn bind(fd: RawFd, slot: RawFd) -> Result<(), StageError> {
	dup2(fd, slot)?;
	let _ = unistd::close(fd);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser;

	fn run(line: &[u8]) -> u32 {
		let spec = parser::parse(line).unwrap();
		let guard = SignalGuard::block().unwrap();
		eval(&spec, &guard).unwrap()
	}

	// one test fn: reaping waits for "any child", so pipelines must not
	// overlap across concurrently running tests
	#[test]
	fn counts_failing_stages() {
		assert_eq!(run(b"true"), 0);
		assert_eq!(run(b"false"), 1);
		assert_eq!(run(b"true | true"), 0);
		assert_eq!(run(b"false | true | true"), 1);
		assert_eq!(run(b"false | true | false"), 2);
		assert_eq!(run(b"pish-no-such-command-7q3x"), 1);
	}
}
