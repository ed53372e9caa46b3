use log::{error, info, LevelFilter};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, Once, PoisonError};

static CRASH_LOG_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);
static CRASH_HOOK: Once = Once::new();
static LOGGING: Once = Once::new();

const LOG_DIR_NAME: &str = "d4lf";
const CRASH_LOG_NAME: &str = "saapi_crash.log";

/// Set up the logger and the crash log once per process.
///
/// Must not be called from `DllMain`: resolving the data directory goes
/// through the shell, which is not safe under the loader lock.
pub fn init_once() {
    LOGGING.call_once(|| {
        init_logger();
        init_crash_logger();
    });
}

/// Initialize env_logger. Defaults to `Warn` when `RUST_LOG` is unset.
pub fn init_logger() {
    let mut builder = env_logger::Builder::from_default_env();

    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(LevelFilter::Warn);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    let _ = builder.try_init();
}

#[cfg(not(test))]
fn crash_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|local_data| local_data.join(LOG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
fn crash_log_dir() -> PathBuf {
    std::env::temp_dir().join(format!("{}-test-{}", LOG_DIR_NAME, std::process::id()))
}

/// Initialize crash logging and install the panic hook (once per process).
pub fn init_crash_logger() {
    CRASH_HOOK.call_once(|| {
        let log_dir = crash_log_dir();
        let _ = fs::create_dir_all(&log_dir);

        let log_path = log_dir.join(CRASH_LOG_NAME);
        set_crash_log_path(Some(log_path.clone()));

        std::panic::set_hook(Box::new(|panic_info| {
            let crash_msg = format_panic_message(panic_info);

            if let Err(e) = write_crash_log(&crash_msg) {
                error!("[CRASH LOGGER] Failed to write crash log: {}", e);
            }

            error!("{}", crash_msg);
        }));

        info!("[CRASH LOGGER] Initialized - Log: {:?}", log_path);
    });
}

fn set_crash_log_path(path: Option<PathBuf>) {
    let mut path_guard = CRASH_LOG_PATH
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    *path_guard = path;
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn thread_name() -> String {
    std::thread::current().name().unwrap_or("unnamed").to_string()
}

fn format_panic_message(panic_info: &std::panic::PanicHookInfo) -> String {
    let payload = panic_info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string payload".to_string());

    let location = panic_info
        .location()
        .map(|l| format!("{}:{}", l.file(), l.line()))
        .unwrap_or_else(|| "?".to_string());

    format!(
        "{} PANIC [{}] at {}: {}",
        timestamp(),
        thread_name(),
        location,
        payload
    )
}

/// Append one line to the crash log, if a path is set.
fn write_crash_log(message: &str) -> std::io::Result<()> {
    let path_guard = CRASH_LOG_PATH
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(ref log_path) = *path_guard {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        writeln!(file, "{}", message)?;
    }
    Ok(())
}

/// Record a fatal condition in the crash log and the error log.
pub fn log_critical_error(context: &str, error: &str) {
    let message = format!("{} ERROR [{}] {}: {}", timestamp(), thread_name(), context, error);

    if let Err(e) = write_crash_log(&message) {
        error!("[CRASH LOGGER] Failed to write critical error: {}", e);
    }

    error!("{}", message);
}

pub fn get_crash_log_path() -> Option<String> {
    let path_guard = CRASH_LOG_PATH
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    path_guard.as_ref().map(|p| p.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_log_stays_out_of_user_data() {
        let dir = crash_log_dir();
        assert!(dir.starts_with(std::env::temp_dir()), "{:?}", dir);
        if let Some(local_data) = dirs::data_local_dir() {
            assert!(!dir.starts_with(local_data.join(LOG_DIR_NAME)));
        }
    }

    #[test]
    fn critical_errors_append_one_line_each() {
        // Settle the one-time hook first so it cannot overwrite the test path.
        init_once();

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CRASH_LOG_NAME);
        set_crash_log_path(Some(path.clone()));

        log_critical_error("pipe", "listener vanished");
        log_critical_error("pipe", "listener vanished again");

        let contents = fs::read_to_string(&path).expect("crash log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ERROR"));
        assert!(lines[1].ends_with("pipe: listener vanished again"));
        assert_eq!(
            get_crash_log_path().as_deref(),
            Some(path.to_string_lossy().as_ref())
        );

        set_crash_log_path(None);
    }
}
