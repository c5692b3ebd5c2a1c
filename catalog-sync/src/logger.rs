//! Logging Infrastructure
//!
//! `RUST_LOG` wins when set; otherwise `log_level` applies to this service's
//! crates and the HTTP trace layer. With a log directory, output goes to a
//! daily rolling file instead of stdout.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Default filter directives for a level
pub fn default_filter(log_level: &str) -> String {
    format!("catalog_sync={log_level},inventory_client={log_level},tower_http={log_level}")
}

/// Initialize the global subscriber
pub fn init_logger(log_level: &str, json: bool, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, "catalog-sync");
            let builder = builder.with_writer(file_appender).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            return;
        }
        eprintln!("Log directory {dir} does not exist, logging to stdout");
    }

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
