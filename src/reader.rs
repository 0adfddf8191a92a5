use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::unistd;
use tracing::warn;

/// Outcome of one line read.
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent {
	/// One line of input, trailing newline included when present.
	Line(Vec<u8>),
	/// The read was cut short by a signal; the partial line is discarded.
	Interrupted,
	Eof,
}

enum Source {
	Stdin,
	Batch(OwnedFd),
}

/// Reads lines as raw bytes straight from the descriptor. std's buffered
/// readers retry EINTR internally, which would swallow the
/// interrupt-at-the-prompt behavior, so this goes through `unistd::read`.
pub struct LineReader {
	source: Source,
	pending: Vec<u8>,
}

impl LineReader {
	pub fn stdin() -> LineReader {
		LineReader { source: Source::Stdin, pending: vec![] }
	}

	pub fn open(path: &OsStr) -> io::Result<LineReader> {
		let file = File::open(path)?;
		Ok(LineReader { source: Source::Batch(file.into()), pending: vec![] })
	}

	fn fd(&self) -> RawFd {
		match &self.source {
			Source::Stdin => libc::STDIN_FILENO,
			Source::Batch(fd) => fd.as_raw_fd(),
		}
	}

	pub fn next_line(&mut self) -> LineEvent {
		loop {
			if let Some(pos) = self.pending.iter().position(|&c| c == b'\n') {
				let rest = self.pending.split_off(pos + 1);
				let line = std::mem::replace(&mut self.pending, rest);
				return LineEvent::Line(line);
			}
			let mut chunk = [0u8; 4096];
			match unistd::read(self.fd(), &mut chunk) {
				Ok(0) => {
					if self.pending.is_empty() {
						return LineEvent::Eof;
					}
					// unterminated final line: hand it out, report Eof next call
					return LineEvent::Line(std::mem::take(&mut self.pending));
				},
				Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
				Err(Errno::EINTR) => {
					self.pending.clear();
					return LineEvent::Interrupted;
				},
				Err(e) => {
					warn!("read: {e}");
					return LineEvent::Eof;
				},
			}
		}
	}
}
