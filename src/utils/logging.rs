//! Console logging setup

use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::io::Write;

/// Timestamp prefix printed before every log line
pub const LOG_TIME_FORMAT: &str = "[%Y-%m-%d %H:%M:%S]";

/// Pick the level for the given flags. Silent wins over verbose.
pub fn level_for(silent: bool, verbose: bool) -> LevelFilter {
    if silent {
        LevelFilter::Off
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the global logger
///
/// `RUST_LOG` can still raise or lower the level unless `silent` is set.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging(silent: bool, verbose: bool) {
    let level = level_for(silent, verbose);

    let mut builder = if silent {
        Builder::new()
    } else {
        Builder::from_env(Env::default().default_filter_or(level.as_str()))
    };

    if silent {
        builder.filter_level(LevelFilter::Off);
    }

    let _ = builder
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                Local::now().format(LOG_TIME_FORMAT),
                record.level(),
                record.args()
            )
        })
        .try_init();
}
