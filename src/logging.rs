use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;
use std::time::SystemTime;

/// Installs the global logger: info by default, overridable through
/// `RUST_LOG`, colored only when stderr is a terminal.
pub fn setup_logging() {
    let color = atty::is(atty::Stream::Stderr);

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .format(move |buf, record| {
            let timestamp = humantime::format_rfc3339_millis(SystemTime::now());
            let level = record.level();

            // Source location is only interesting when debugging
            let location = if level <= Level::Debug {
                format!(
                    " - {}:{}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )
            } else {
                String::new()
            };

            if color {
                let level_color = match level {
                    Level::Error => "\x1B[31m",
                    Level::Warn => "\x1B[33m",
                    Level::Info => "\x1B[32m",
                    Level::Debug => "\x1B[36m",
                    Level::Trace => "\x1B[35m",
                };
                writeln!(
                    buf,
                    "{}{:>5}\x1B[0m [{}] {}{}",
                    level_color,
                    level,
                    timestamp,
                    record.args(),
                    location
                )
            } else {
                writeln!(
                    buf,
                    "{:>5} [{}] {}{}",
                    level,
                    timestamp,
                    record.args(),
                    location
                )
            }
        })
        .init();
}
