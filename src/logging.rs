//! Tracing setup for both targets.
//!
//! The filter comes from `GARDEN_LOG`, then `RUST_LOG`, then
//! [`DEFAULT_DIRECTIVES`]. wgpu and naga log every resource they create at
//! `info`, so they are held back to `warn` unless asked for explicitly.
use cfg_if::cfg_if;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

pub const FILTER_ENV: &str = "GARDEN_LOG";
pub const DEFAULT_DIRECTIVES: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// First non-blank of `GARDEN_LOG` and `RUST_LOG`, else the defaults.
fn filter_directives(garden_log: Option<String>, rust_log: Option<String>) -> String {
    let set = |d: &String| !d.trim().is_empty();
    garden_log
        .filter(set)
        .or_else(|| rust_log.filter(set))
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}

fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        /// Route spans and events to the browser console.
        pub fn init() {
            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();

            // no process environment in the browser
            let filter = env_filter(&filter_directives(None, None));
            let wasm_layer = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());

            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(wasm_layer)
                .try_init();
        }
    } else {
        use std::env;
        use std::io;
        use std::path::{Path, PathBuf};

        use once_cell::sync::OnceCell;
        use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
        use tracing_subscriber::fmt;

        pub const FILE_ENV: &str = "GARDEN_LOG_FILE";
        pub const DEFAULT_LOG_FILE: &str = "logs/garden.log";

        // Dropping the guard stops the writer thread and loses buffered lines.
        static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        /// stderr plus a daily-rotated file under `logs/`.
        pub fn init() {
            let filter = env_filter(&filter_directives(
                env::var(FILTER_ENV).ok(),
                env::var("RUST_LOG").ok(),
            ));

            let console_layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            let file_layer = fmt::layer()
                .with_writer(file_writer(&log_file_path()))
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true)
                .compact();

            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .try_init();

            install_panic_hook();
        }

        fn log_file_path() -> PathBuf {
            env::var_os(FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
        }

        fn file_writer(path: &Path) -> NonBlocking {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(std::ffi::OsStr::new("garden.log"));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            let _ = FILE_GUARD.set(guard);
            writer
        }

        /// Panics go to the log file too, with a backtrace, before the
        /// default hook prints them.
        fn install_panic_hook() {
            let default_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let payload = info
                    .payload()
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("<non-string panic>");
                let location = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                    .unwrap_or_default();
                let thread = std::thread::current().name().unwrap_or("<unnamed>").to_string();
                let backtrace = std::backtrace::Backtrace::force_capture();
                tracing::error!(%location, %thread, "panic: {payload}\n{backtrace}");
                default_hook(info);
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_variable_wins_over_rust_log() {
        let d = filter_directives(Some("garden=trace".into()), Some("debug".into()));
        assert_eq!(d, "garden=trace");
        assert_eq!(filter_directives(None, Some("debug".into())), "debug");
    }

    #[test]
    fn blank_or_missing_falls_back_to_defaults() {
        assert_eq!(filter_directives(None, None), DEFAULT_DIRECTIVES);
        assert_eq!(filter_directives(Some("  ".into()), None), DEFAULT_DIRECTIVES);
        assert_eq!(filter_directives(Some("  ".into()), Some("".into())), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn blank_game_variable_defers_to_rust_log() {
        assert_eq!(filter_directives(Some("  ".into()), Some("debug".into())), "debug");
        assert_eq!(filter_directives(Some(String::new()), Some("warn".into())), "warn");
    }

    #[test]
    fn default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
        // a bad directive still yields a usable filter
        let _ = env_filter("[[[not a filter");
    }
}
