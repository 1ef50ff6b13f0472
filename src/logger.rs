//! Session logger.  `log_info!` / `log_warn!` / `log_err!` append a
//! timestamped line to `PixelGrid/pixelgrid.log` in the user data folder,
//! which is truncated on every launch.  Until [`init`] runs they do nothing,
//! so library users and tests never touch the disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

struct SessionLog {
    file: Mutex<File>,
    path: PathBuf,
}

static SESSION: OnceLock<SessionLog> = OnceLock::new();

/// Where this session logs, once [`init`] has succeeded.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|log| log.path.as_path())
}

/// Append a raw line.  Write failures are dropped.
pub fn write_line(line: &str) {
    if let Some(log) = SESSION.get()
        && let Ok(mut file) = log.file.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Append `[time] [LEVEL] msg`.
pub fn write(level: &str, msg: &str) {
    if SESSION.get().is_some() {
        write_line(&format!("[{}] [{}] {}", timestamp(), level, msg));
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*))
    };
}

/// Open the default log file.  Call once, early in `main`; without a log
/// file the program still runs.
pub fn init() {
    let path = log_file_path();
    if let Err(e) = init_at(path.clone()) {
        eprintln!("[logger] cannot open {}: {}", path.display(), e);
    }
}

/// Start logging to `path`, truncating it, and route panics into the log.
/// Later calls keep the first file.
pub fn init_at(path: PathBuf) -> io::Result<&'static Path> {
    if let Some(existing) = log_path() {
        return Ok(existing);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).write(true).truncate(true).open(&path)?;
    if SESSION.set(SessionLog { file: Mutex::new(file), path }).is_err() {
        // Another thread got there first.
        return Ok(log_path().unwrap_or(Path::new("")));
    }

    write_line(&format!("=== PixelGrid session (unix {}) ===", unix_seconds()));

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        previous(info);
    }));
    Ok(log_path().unwrap_or(Path::new("")))
}

fn log_file_path() -> PathBuf {
    data_base().unwrap_or_else(|| PathBuf::from(".")).join("PixelGrid").join("pixelgrid.log")
}

/// Per-OS base for application data folders.
fn data_base() -> Option<PathBuf> {
    let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);
    if cfg!(target_os = "windows") {
        var("APPDATA")
    } else if cfg!(target_os = "macos") {
        var("HOME").map(|home| home.join("Library").join("Application Support"))
    } else {
        var("XDG_DATA_HOME").or_else(|| var("HOME").map(|home| home.join(".local").join("share")))
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// `HH:MM:SS` UTC.
fn timestamp() -> String {
    let secs = unix_seconds();
    format!("{:02}:{:02}:{:02}", (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60)
}
