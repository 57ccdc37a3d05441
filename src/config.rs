use std::env;
use std::fs;
use std::io::{Error, ErrorKind, Write};
use std::path::{Path, PathBuf};

const RECENT_BOARDS_FILE: &str = "recent_boards.txt";
const MAX_RECENT_BOARDS: usize = 50;
const DEFAULT_USER: &str = "default";

pub fn resolve_board_path(cli_path: Option<PathBuf>) -> Result<PathBuf, Error> {
	if let Some(path) = cli_path {
		return Ok(absolutize(path));
	}

	if let Some(path) = env::var_os("TEMPO_BOARD") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return Ok(absolutize(path));
		}
	}

	if let Ok(mut recent) = recent_boards(MAX_RECENT_BOARDS) {
		if let Some(path) = recent.drain(..).next() {
			return Ok(path);
		}
	}

	Err(Error::new(
		ErrorKind::NotFound,
		"no board selected: pass --board <path>, set TEMPO_BOARD, or pick one from `boards`",
	))
}

pub fn resolve_user(cli_user: Option<String>) -> String {
	if let Some(user) = cli_user {
		let user = user.trim().to_string();
		if !user.is_empty() {
			return user;
		}
	}

	if let Some(user) = env::var_os("TEMPO_USER") {
		let user = user.to_string_lossy().trim().to_string();
		if !user.is_empty() {
			return user;
		}
	}

	DEFAULT_USER.to_string()
}

pub fn remember_board(path: &Path) -> Result<(), std::io::Error> {
	let path = absolutize(path.to_path_buf());
	let mut entries = recent_boards(MAX_RECENT_BOARDS)?;
	entries.retain(|entry| entry != &path);
	entries.insert(0, path);
	entries.truncate(MAX_RECENT_BOARDS);
	save_recent_boards(&entries)
}

pub fn recent_boards(limit: usize) -> Result<Vec<PathBuf>, std::io::Error> {
	let path = recent_boards_path();
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
		Err(err) => return Err(err),
	};

	let mut rows = Vec::new();
	for line in raw.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}
		rows.push(PathBuf::from(trimmed));
		if rows.len() >= limit {
			break;
		}
	}

	Ok(rows)
}

fn save_recent_boards(entries: &[PathBuf]) -> Result<(), std::io::Error> {
	let state_dir = state_dir();
	fs::create_dir_all(&state_dir)?;

	let mut file = fs::File::create(recent_boards_path())?;
	for path in entries {
		writeln!(file, "{}", path.display())?;
	}

	Ok(())
}

fn recent_boards_path() -> PathBuf {
	state_dir().join(RECENT_BOARDS_FILE)
}

fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("TEMPO_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join("tempo_taskboard");
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join("tempo_taskboard");
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join("tempo_taskboard");
	}

	PathBuf::from(".tempo_taskboard")
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}
