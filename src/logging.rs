//! Log setup for the `ocd` binary.
//!
//! Records go through the `log` facade to an `env_logger` backend on stderr.
//! The level is chosen, in priority order, by:
//!
//! 1. the `RUST_LOG` environment variable, if set
//! 2. `--quiet` (errors only) or `--verbose` (debug, `-vv` for trace)
//! 3. info otherwise
//!
//! At info level every processed item gets one line, e.g.
//! `[photos @ MV] /in/a.jpg -> /out/picture/a.jpg | ok`.

use std::env;
use std::io::Write;

use env_logger::{Builder, WriteStyle};
use log::{LevelFilter, SetLoggerError};

/// Installs the global logger.
///
/// # Errors
///
/// Fails if a logger was already installed in this process.
///
/// # Example
///
/// ```rust,no_run
/// use ocd::logging::init_logging;
///
/// init_logging(1, false, false).ok();
/// log::debug!("visible with -v");
/// ```
pub fn init_logging(verbose: u8, quiet: bool, no_color: bool) -> Result<(), SetLoggerError> {
    let from_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }
    if no_color {
        builder.write_style(WriteStyle::Never);
    }

    builder.format(move |buf, record| {
        let level_style = buf.default_level_style(record.level());
        if verbose >= 2 {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} [{}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        }
    });

    builder.try_init()?;

    if from_env {
        log::debug!("Logging configured from RUST_LOG={:?}", env::var("RUST_LOG").ok());
    } else {
        log::debug!("Logging initialized at level {:?}", level);
    }
    Ok(())
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_level() {
        assert_eq!(determine_level(0, false), LevelFilter::Info);
        assert_eq!(determine_level(1, false), LevelFilter::Debug);
        assert_eq!(determine_level(2, false), LevelFilter::Trace);
        assert_eq!(determine_level(5, false), LevelFilter::Trace);
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(determine_level(0, true), LevelFilter::Error);
        assert_eq!(determine_level(2, true), LevelFilter::Error);
    }
}
