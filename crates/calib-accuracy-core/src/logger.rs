//! Stderr logging for binaries and tests.
//!
//! Library code only talks to the `log` facade. Binaries pick one backend at
//! startup: [`init_with_level`] for plain `[elapsed LEVEL target] message`
//! lines, or `init_tracing` (feature `tracing`) for a span-aware subscriber.

use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    start: Instant,
}

impl StderrLogger {
    fn format(&self, record: &Record) -> String {
        let mut line = String::with_capacity(64);
        let _ = write!(
            line,
            "[{:8.3}s {:<5} {}] {}",
            self.start.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        );
        line
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = self.format(record);
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static STDERR_LOGGER: OnceLock<StderrLogger> = OnceLock::new();
static INSTALLED: Mutex<bool> = Mutex::new(false);

/// Route `log` records to stderr at `level` and above.
///
/// The first successful call installs the logger; later calls only adjust
/// the level. Fails, without touching the level, for as long as another
/// logger owns the `log` facade.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut installed = INSTALLED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if !*installed {
        let logger = STDERR_LOGGER.get_or_init(|| StderrLogger {
            start: Instant::now(),
        });
        log::set_logger(logger)?;
        *installed = true;
    }
    log::set_max_level(level);
    Ok(())
}

/// Map a `-v` count to a level: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install a global `tracing` subscriber; `RUST_LOG` overrides `level`.
///
/// Pipeline spans are reported when they close. The subscriber also picks up
/// `log` records. Does nothing if a subscriber is already installed.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, level: LevelFilter) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let installed = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.compact().finish().try_init()
    };
    if installed.is_err() {
        log::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_from_verbosity(1), LevelFilter::Info);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn reinit_adjusts_level() {
        assert!(init_with_level(LevelFilter::Error).is_ok());
        assert!(init_with_level(LevelFilter::Debug).is_ok());
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
