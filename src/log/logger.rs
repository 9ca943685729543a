use crate::{
    config::Config,
    log::{log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

// -----------------------------------------------------------------------------
// COMPILE-TIME CONFIGURATION
// -----------------------------------------------------------------------------

/// Flush every 100 lines when debugging, so a crash leaves recent lines on disk.
#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 100;

/// Flush every 1000 lines otherwise.
#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 1_000;

const DEFAULT_APP_NAME: &str = "signaling_server";

// -----------------------------------------------------------------------------

/// Bounded, non-blocking logger that writes to a per-process log file.
///
/// Producers (the server loop and every connection task) enqueue through a
/// [`LoggerHandle`]; one background thread owns the file and flushes in
/// batches. Dropping the last handle ends the worker after a final flush.
pub struct Logger {
    handle: LoggerHandle,
    _thread: Option<thread::JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Starts the logger from the `[Logging]` section.
    ///
    /// Uses `server_log_path` as the directory (with `~` expansion) and
    /// `server_log_filename` as the file prefix. Without a directory the file
    /// goes to `logs/` next to the executable.
    #[must_use]
    pub fn start_server(cap: usize, config: &Config) -> Self {
        let app_name = config
            .get_non_empty("Logging", "server_log_filename")
            .unwrap_or(DEFAULT_APP_NAME);

        match config.get_non_empty("Logging", "server_log_path") {
            Some(dir) => Self::start_in_dir(expand_path(dir), app_name, cap),
            None => Self::start_default(app_name, cap),
        }
    }

    /// `logs/` next to the executable, or the working directory as fallback.
    #[must_use]
    pub fn start_default(app_name: &str, cap: usize) -> Self {
        Self::start_in_dir(exe_dir_fallback_cwd().join("logs"), app_name, cap)
    }

    /// Creates `dir` if needed and spawns the worker writing to
    /// `<app_name>-YYYYMMDD_HHMMSS-pid<N>.log`.
    pub fn start_in_dir<D: AsRef<Path>>(dir: D, app_name: &str, cap: usize) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let fname = format!("{}-{}-pid{}.log", app_name, ts, std::process::id());
        let file_path = dir.join(fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap.max(1));
        let worker_path = file_path.clone();

        let _thread = thread::Builder::new()
            .name("logger-worker".into())
            .spawn(move || write_loop(&worker_path, &rx))
            .ok();

        Self {
            handle: LoggerHandle { tx },
            _thread,
            file_path,
        }
    }

    /// Cloneable sink to hand to the server and its connection tasks.
    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn write_loop(path: &Path, rx: &mpsc::Receiver<LogMsg>) {
    // Target file -> temp file -> sink; the worker never panics.
    let writer: Box<dyn Write + Send> =
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Box::new(f),
            Err(_) => {
                let fallback = std::env::temp_dir().join("callrelay-fallback.log");
                match OpenOptions::new().create(true).append(true).open(&fallback) {
                    Ok(f) => Box::new(f),
                    Err(_) => Box::new(io::sink()),
                }
            }
        };

    let mut out = BufWriter::new(writer);
    let mut lines_written: u32 = 0;

    while let Ok(m) = rx.recv() {
        let _ = writeln!(&mut out, "{}", m.render());
        lines_written = lines_written.wrapping_add(1);
        if lines_written.is_multiple_of(FLUSH_BATCH_SIZE) {
            let _ = out.flush();
        }
    }

    let _ = out.flush();
}

fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Expands a leading `~` to the user's home directory.
fn expand_path(path_str: &str) -> PathBuf {
    let home = || {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from)
    };

    if path_str == "~" {
        if let Some(h) = home() {
            return h;
        }
    }
    if let Some(rest) = path_str
        .strip_prefix("~/")
        .or_else(|| path_str.strip_prefix("~\\"))
    {
        if let Some(mut h) = home() {
            h.push(rest);
            return h;
        }
    }
    PathBuf::from(path_str)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::{LogLevel, LogSink};
    use std::time::{Duration, Instant};

    #[test]
    fn lines_reach_the_file_after_handles_drop() {
        let dir = std::env::temp_dir().join(format!("callrelay-logger-{}", std::process::id()));
        let logger = Logger::start_in_dir(&dir, "unit", 16);
        let path = logger.file_path().to_path_buf();
        assert!(path.starts_with(&dir));

        logger
            .handle()
            .log(LogLevel::Info, "client bob registered", "callrelay::test");
        drop(logger);

        let deadline = Instant::now() + Duration::from_secs(2);
        let contents = loop {
            let contents = fs::read_to_string(&path).unwrap_or_default();
            if contents.contains("client bob registered") || Instant::now() > deadline {
                break contents;
            }
            thread::sleep(Duration::from_millis(10));
        };

        assert!(contents.contains("[INFO ] callrelay::test | client bob registered"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn expand_path_leaves_plain_paths_alone() {
        assert_eq!(expand_path("/var/log/relay"), PathBuf::from("/var/log/relay"));
        assert_eq!(expand_path("logs"), PathBuf::from("logs"));
    }
}
