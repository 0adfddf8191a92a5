use std::io;

use nix::errno::Errno;
use thiserror::Error;

/// Unrecoverable infrastructure failures. Call sites hand these back by value
/// instead of exiting inline; `main` reports the message and terminates the
/// shell with a failure status.
#[derive(Debug, Error)]
pub enum FatalError {
	#[error("usage: pish [script]")]
	Usage,
	#[error("{path}: {err}")]
	BatchOpen {
		path: String,
		#[source]
		err: io::Error,
	},
	#[error("sigaction: {0}")]
	SigAction(Errno),
	#[error("sigprocmask: {0}")]
	SigMask(Errno),
	#[error("fork: {0}")]
	Fork(Errno),
	#[error("pipe: {0}")]
	Pipe(Errno),
}
