// src/logging.rs
//
// Timestamped stderr diagnostics. Byte streams stay on the wire and
// results in return values; stderr is the only logging channel.

/// Timestamped logging macro.
/// Prepends `HH:MM:SS.mmm` local time to every message written to stderr.
macro_rules! tlog {
    ($($arg:tt)*) => {{
        eprintln!(
            "{} {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            format_args!($($arg)*)
        );
    }};
}
