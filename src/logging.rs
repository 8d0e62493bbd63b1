use crate::offload::UNIT_THREAD_PREFIX;
use std::fs::{self, OpenOptions};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, Once};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_NAME: &str = "offload-demo.log";

static PANIC_HOOK: Once = Once::new();
static UNIT_PANICS: AtomicU64 = AtomicU64::new(0);

/// Default log location under the user's cache directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("offload-demo").join(LOG_FILE_NAME))
}

/// Install the global subscriber. Logs go to a file so they never corrupt the TUI; `RUST_LOG`
/// overrides the default `info` filter.
pub fn init_tracing(log_path: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let default_path = default_log_path();
    let path = log_path.or(default_path.as_deref());

    match path.map(|p| (p, open_log_file(p))) {
        Some((path, Ok(file))) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::info!(path = %path.display(), "logging initialized");
        }
        // Without a writable file, prefer no logs over writing into the terminal.
        _ => tracing_subscriber::registry().with(env_filter).init(),
    }

    install_panic_hook();
}

/// Route panics on execution-unit threads to the log instead of stderr. The unit already turns
/// them into failed results; other threads keep the previous hook.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            match thread.name() {
                Some(name) if name.starts_with(UNIT_THREAD_PREFIX) => {
                    let total = UNIT_PANICS.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::error!(thread = name, total, "computation panicked: {info}");
                }
                _ => previous(info),
            }
        }));
    });
}

/// Unit panics seen by the hook since startup.
#[cfg(test)]
fn unit_panics_logged() -> u64 {
    UNIT_PANICS.load(Ordering::Relaxed)
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
