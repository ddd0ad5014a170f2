// In: src/logging.rs

//! Process-wide logger setup.
//!
//! The library itself only talks to the `log` facade. Binaries and tests that
//! want to see the routing decisions call [`enable_verbose_logging`] once.

use log::LevelFilter;
use std::fs::OpenOptions;
use std::sync::Once;

use crate::error::tambakError;

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` at `Info` level that prints `[LEVEL] message`.
///
/// When `log_file` is given, output is appended to that file instead of stderr.
/// Only the first call has any effect; later calls return `Ok(())`.
pub fn enable_verbose_logging(log_file: Option<String>) -> Result<(), tambakError> {
    // A bad path is an Io error even when the logger is already installed.
    let file = match log_file {
        Some(filename) => Some(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(filename)?,
        ),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Info);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });

    Ok(())
}
