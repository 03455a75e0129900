use ansi_term::Colour;
use chrono_tz::Tz;
use env_logger::{Builder, Env};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Installs the global logger: colored lines on stderr, plus an uncolored
/// copy appended to `log_file` when one is given. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init(log_file: Option<&Path>, timezone: Tz) -> io::Result<()> {
    let log_file: Option<File> = match log_file {
        Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };

    let file_failed = AtomicBool::new(false);

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            let timestamp = chrono::Utc::now()
                .with_timezone(&timezone)
                .format("%Y-%m-%dT%H:%M:%S%:z");

            let level = match record.level() {
                log::Level::Error => Colour::Red.paint(record.level().to_string()),
                log::Level::Warn => Colour::Yellow.paint(record.level().to_string()),
                log::Level::Info => Colour::Green.paint(record.level().to_string()),
                log::Level::Debug => Colour::Blue.paint(record.level().to_string()),
                log::Level::Trace => Colour::Purple.paint(record.level().to_string()),
            };

            if let Some(file) = &log_file {
                let line = format!(
                    "[{} {} {}] {}",
                    timestamp,
                    record.level(),
                    record.module_path().unwrap_or_default(),
                    record.args()
                );
                append_line(file, &line, &file_failed);
            }

            writeln!(
                buf,
                "[{} {} {}] {}",
                timestamp,
                level,
                record.module_path().unwrap_or_default(),
                record.args()
            )
        })
        .try_init()
        .map_err(io::Error::other)
}

/// Appends `line` to the log file. Console logging carries on when this
/// fails; only the first failure is reported. Returns `true` for that one.
fn append_line(mut file: &File, line: &str, failed: &AtomicBool) -> bool {
    match writeln!(file, "{}", line) {
        Ok(()) => false,
        Err(e) => {
            let first = !failed.swap(true, Ordering::Relaxed);
            if first {
                eprintln!("Failed to write to log file: {}", e);
            }
            first
        }
    }
}
