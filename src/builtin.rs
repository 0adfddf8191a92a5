use std::env;
use std::ffi::{OsStr, OsString};
use std::path::Path;

use nix::unistd::{self, User};

pub type Builtin = fn(&[&[u8]]) -> u8;

pub fn match_builtin(name: &[u8]) -> Option<Builtin> {
	match name {
		b"cd" => Some(builtin_cd),
		_ => None,
	}
}

fn home_dir() -> Option<OsString> {
	if let Some(home) = env::var_os("HOME") {
		return Some(home);
	}
	match User::from_uid(unistd::geteuid()) {
		Ok(Some(user)) => Some(user.dir.into_os_string()),
		_ => None,
	}
}

fn builtin_cd(argv: &[&[u8]]) -> u8 {
	use std::os::unix::ffi::OsStrExt;

	let target = match argv.len() {
		1 => match home_dir() {
			Some(dir) => dir,
			None => {
				eprintln!("cd: unable to determine home directory");
				return 1;
			},
		},
		2 => OsStr::from_bytes(argv[1]).to_os_string(),
		_ => {
			eprintln!("cd: too many arguments");
			return 1;
		},
	};

	match unistd::chdir(Path::new(&target)) {
		Ok(()) => 0,
		Err(e) => {
			eprintln!("cd: {}: {}", target.to_string_lossy(), e);
			1
		},
	}
}
