use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};

/// Logs to stderr at `info` unless `RUST_LOG` says otherwise, stamping
/// each line with local time.
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                Local::now().format("%d %b %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
