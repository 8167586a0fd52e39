// Logging for reclaim
//
// Thin layer over the `tracing` ecosystem. The pool and its workers only emit
// events; installing a subscriber is left to the application, with a few
// presets here.
//
// Worker threads are long-lived and launched lazily, often long after the
// pool was created. Each pool captures the dispatcher that is current when it
// is built and its worker threads install that dispatcher, so task logs land
// wherever the pool owner's logs go (including a scoped test subscriber).
//
// ```rust
// use reclaim::logging;
//
// logging::init_development();
// logging::info!("pool starting");
// ```

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, Once};

use tracing::{Dispatch, Level, Subscriber};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*, registry::LookupSpan};

/// Configuration for the global subscriber.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to display
    pub level: Level,
    /// Emit JSON lines instead of human-readable output
    pub json_format: bool,
    /// Include file and line of each event
    pub show_file_line: bool,
    /// Include thread name and id; worker threads are named after their pool
    pub show_thread_info: bool,
    /// Extra directives, e.g. `"reclaim::reusable=trace"`
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());
    config
        .target_filters
        .iter()
        .flat_map(|filters| filters.split(','))
        .filter_map(|directive| directive.trim().parse().ok())
        .fold(filter, EnvFilter::add_directive)
}

fn console_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + 'static,
    S: for<'span> LookupSpan<'span>,
{
    if config.json_format {
        fmt::layer().json().flatten_event(true).boxed()
    } else {
        fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info)
            .boxed()
    }
}

/// Install the global subscriber. Only the first call (of any `init*`) wins.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer(&config));
        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Open `path` for appending, creating it if needed.
pub fn open_log_file(path: impl AsRef<Path>) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install a global subscriber writing to the console and to `log_file`.
///
/// The file is opened once, up front. If that fails nothing is installed.
pub fn init_with_file(config: LogConfig, log_file: impl AsRef<Path>) -> io::Result<()> {
    let file = open_log_file(log_file)?;

    INIT.call_once(|| {
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_thread_names(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer(&config))
            .with(file_layer);
        set_global_subscriber(subscriber);
    });

    Ok(())
}

/// INFO level, human-readable console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// DEBUG level, with TRACE for worker and pool bookkeeping.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some("reclaim::reusable=trace".to_string()),
        ..LogConfig::default()
    });
}

/// Dispatcher currently in effect on this thread, if any subscriber is set.
///
/// Pools call this at construction and hand the result to their worker
/// threads.
pub fn current_subscriber() -> Option<Dispatch> {
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    if dispatch.is::<tracing::subscriber::NoSubscriber>() {
        None
    } else {
        Some(dispatch)
    }
}

/// Span covering one task run on a worker.
///
/// ```rust
/// use reclaim::worker_span;
///
/// let span = worker_span!("worker-1", "reusable-worker", "flush");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! worker_span {
    ($worker:expr, $name:expr, $task:expr) => {
        tracing::debug_span!("worker", id = %$worker, name = $name, task = $task)
    };
}

/// Pool bookkeeping event (acquire, reclaim, discard, retire).
///
/// ```rust
/// use reclaim::log_pool;
///
/// log_pool!("reusable", "acquire", idle = 3);
/// ```
#[macro_export]
macro_rules! log_pool {
    ($pool:expr, $event:expr) => {
        tracing::trace!(pool = $pool, event = $event)
    };
    ($pool:expr, $event:expr, $($fields:tt)*) => {
        tracing::trace!(pool = $pool, event = $event, $($fields)*)
    };
}

pub use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn current_subscriber_sees_scoped_dispatcher() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            assert!(current_subscriber().is_some());
        });
    }

    #[test]
    fn log_file_is_appended() {
        let path = std::env::temp_dir().join(format!("reclaim-log-{}.log", std::process::id()));
        open_log_file(&path).unwrap().write_all(b"first\n").unwrap();
        open_log_file(&path).unwrap().write_all(b"second\n").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn target_filters_become_directives() {
        let config = LogConfig {
            target_filters: Some("reclaim::reusable=trace, flume=off".to_string()),
            ..LogConfig::default()
        };
        let rendered = env_filter(&config).to_string();
        assert!(rendered.contains("reclaim::reusable=trace"));
        assert!(rendered.contains("flume=off"));
    }
}
