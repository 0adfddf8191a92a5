mod builtin;
mod error;
mod eval;
mod parser;
mod pipes;
mod reader;
mod reap;
mod signal;
mod types;

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use nix::unistd::isatty;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::FatalError;
use crate::reader::{LineEvent, LineReader};
use crate::signal::SignalGuard;

const PROMPT: &[u8] = b"pish> ";

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(io::stderr)
		.init();

	match run() {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{}", e);
			ExitCode::FAILURE
		},
	}
}

fn run() -> Result<(), FatalError> {
	let args: Vec<OsString> = env::args_os().skip(1).collect();
	let mut reader = match args.len() {
		0 => LineReader::stdin(),
		1 => LineReader::open(&args[0]).map_err(|err| FatalError::BatchOpen {
			path: args[0].to_string_lossy().into_owned(),
			err,
		})?,
		_ => return Err(FatalError::Usage),
	};
	let mut interactive = args.is_empty();

	signal::install_interrupt_handler().map_err(FatalError::SigAction)?;

	loop {
		if interactive {
			// piped stdin means batch after all; the downgrade is permanent
			if !isatty(libc::STDIN_FILENO).unwrap_or(false) {
				interactive = false;
			}
			if isatty(libc::STDOUT_FILENO).unwrap_or(false) {
				let mut stdout = io::stdout();
				let _ = stdout.write_all(PROMPT);
				let _ = stdout.flush();
			}
		}

		match reader.next_line() {
			LineEvent::Interrupted => {},
			LineEvent::Eof => {
				if interactive {
					println!();
				}
				break;
			},
			LineEvent::Line(line) => {
				if line.iter().all(|&c| matches!(c, b' ' | b'\t' | b'\n')) {
					continue;
				}
				let guard = SignalGuard::block().map_err(FatalError::SigMask)?;
				let spec = match parser::parse(&line) {
					Ok(spec) => spec,
					Err(e) => {
						eprintln!("{}", e);
						continue;
					},
				};
				let failures = eval::eval(&spec, &guard)?;
				if failures > 0 {
					debug!(failures, "pipeline finished with failing stages");
				}
			},
		}
	}
	Ok(())
}
