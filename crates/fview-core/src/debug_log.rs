#![forbid(unsafe_code)]

//! Append-only diagnostic log.
//!
//! A TUI owns the terminal, so `println!` debugging corrupts the screen. The
//! debug log is a low-ceremony side channel: text is appended to a fixed file
//! that can be followed from another terminal.
//!
//! # Enabling
//!
//! The log file is **never created** by this module. Logging is enabled by
//! creating the file yourself:
//!
//! ```text
//! touch /tmp/fview_log
//! tail -f /tmp/fview_log
//! ```
//!
//! When the file does not exist (or cannot be opened for appending) every
//! write is silently dropped. Nothing in this module returns an error or
//! panics on I/O failure.
//!
//! # Lifecycle
//!
//! The process-wide instance is created on first use by [`DebugLog::global`]
//! and is never torn down. Its path comes from, in order:
//!
//! 1. an explicit [`DebugLog::init`] call made before first use,
//! 2. the `FVIEW_DEBUG_LOG` environment variable,
//! 3. [`DEFAULT_LOG_PATH`].
//!
//! # Thread Safety
//!
//! Appends are serialised by a `Mutex` so concurrent lines never interleave.
//! Each append opens, writes, and closes the file; there is no buffering to
//! flush and no handle to leak.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Path used when neither [`DebugLog::init`] nor `FVIEW_DEBUG_LOG` provide one.
pub const DEFAULT_LOG_PATH: &str = "/tmp/fview_log";

/// Environment variable that overrides [`DEFAULT_LOG_PATH`].
pub const LOG_PATH_ENV: &str = "FVIEW_DEBUG_LOG";

static GLOBAL_LOG: OnceLock<DebugLog> = OnceLock::new();

/// An append-only UTF-8 text sink bound to one file path.
#[derive(Debug)]
pub struct DebugLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DebugLog {
    /// Create a log bound to `path`. The file is not touched until a write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Initialise the process-wide log with an explicit path.
    ///
    /// Returns `Err` with the already-installed instance if the global log
    /// was initialised earlier (explicitly or by a first write).
    pub fn init(path: impl Into<PathBuf>) -> Result<&'static Self, &'static Self> {
        let mut fresh = Some(Self::new(path));
        let installed = GLOBAL_LOG.get_or_init(|| fresh.take().unwrap_or_else(Self::from_env));
        if fresh.is_none() {
            Ok(installed)
        } else {
            Err(installed)
        }
    }

    /// The process-wide log, created on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL_LOG.get_or_init(Self::from_env)
    }

    fn from_env() -> Self {
        let var = std::env::var_os(LOG_PATH_ENV);
        Self::new(resolve_path(var.as_deref().and_then(|v| v.to_str())))
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the destination currently exists.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.path.is_file()
    }

    /// Append raw text. Returns whether the bytes reached the file.
    pub fn write_str(&self, text: &str) -> bool {
        self.write_bytes(text.as_bytes())
    }

    /// Append `item` followed by a newline.
    pub fn log(&self, item: impl fmt::Display) -> bool {
        self.write_str(&format!("{item}\n"))
    }

    /// A `std::io::Write` adapter over this log.
    #[must_use]
    pub fn writer(&'static self) -> DebugLogWriter {
        DebugLogWriter { log: self }
    }

    fn write_bytes(&self, bytes: &[u8]) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // `append` without `create`: a missing file means logging is off.
        let Ok(mut file) = OpenOptions::new().append(true).open(&self.path) else {
            return false;
        };
        file.write_all(bytes).is_ok()
    }
}

/// Append `item` and a newline to the process-wide log.
pub fn log(item: impl fmt::Display) {
    DebugLog::global().log(item);
}

/// Format arguments like `println!` and append them to the process-wide log.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::debug_log::DebugLog::global().log(format_args!($($arg)*))
    };
}

fn resolve_path(var: Option<&str>) -> PathBuf {
    match var.map(str::trim) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_LOG_PATH),
    }
}

/// `std::io::Write` adapter that appends every write to a [`DebugLog`].
///
/// Write failures are swallowed: `write` always reports the full buffer as
/// consumed.
#[derive(Debug, Clone, Copy)]
pub struct DebugLogWriter {
    log: &'static DebugLog,
}

impl Write for DebugLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Makes [`DebugLogWriter`]s for a `tracing_subscriber::fmt` layer.
///
/// ```ignore
/// tracing_subscriber::fmt()
///     .with_writer(fview_core::debug_log::MakeDebugLogWriter::global())
///     .with_ansi(false)
///     .init();
/// ```
#[cfg(feature = "tracing-log-file")]
#[derive(Debug, Clone, Copy)]
pub struct MakeDebugLogWriter {
    log: &'static DebugLog,
}

#[cfg(feature = "tracing-log-file")]
impl MakeDebugLogWriter {
    #[must_use]
    pub fn global() -> Self {
        Self {
            log: DebugLog::global(),
        }
    }
}

#[cfg(feature = "tracing-log-file")]
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for MakeDebugLogWriter {
    type Writer = DebugLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.log.writer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn appends_to_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let log = DebugLog::new(file.path());
        assert!(log.is_enabled());

        assert!(log.log("first"));
        assert!(log.write_str("second"));
        assert!(log.log(42));

        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "first\nsecond42\n");
    }

    #[test]
    fn missing_destination_is_silently_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent_log");
        let log = DebugLog::new(&path);

        assert!(!log.is_enabled());
        assert!(!log.log("dropped"));
        assert!(!path.exists(), "the log file must never be created");
    }

    #[test]
    fn directory_destination_is_silently_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let log = DebugLog::new(dir.path());
        assert!(!log.is_enabled());
        assert!(!log.log("dropped"));
    }

    #[test]
    fn utf8_is_written_verbatim() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let log = DebugLog::new(file.path());
        log.log("→ VStack<Text> ✓");
        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "→ VStack<Text> ✓\n");
    }

    #[test]
    fn resolve_path_prefers_non_empty_override() {
        assert_eq!(resolve_path(Some("/var/tmp/x")), PathBuf::from("/var/tmp/x"));
        assert_eq!(resolve_path(Some("   ")), PathBuf::from(DEFAULT_LOG_PATH));
        assert_eq!(resolve_path(None), PathBuf::from(DEFAULT_LOG_PATH));
    }

    #[test]
    fn concurrent_lines_do_not_interleave() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let log = std::sync::Arc::new(DebugLog::new(file.path()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = std::sync::Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.log(format!("thread-{t}-line-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|l| l.starts_with("thread-") && l.contains("-line-")));
    }

    #[cfg(feature = "tracing-log-file")]
    #[test]
    fn make_writer_appends_to_its_log() {
        use tracing_subscriber::fmt::MakeWriter;

        let file = tempfile::NamedTempFile::new().unwrap();
        let log: &'static DebugLog = Box::leak(Box::new(DebugLog::new(file.path())));
        let make = MakeDebugLogWriter { log };
        make.make_writer().write_all(b"event\n").unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "event\n");
    }
}
