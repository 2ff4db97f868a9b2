//! Logging setup

use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const DEFAULT_FILTER: &str = "mela_server=info,tower_http=info";

/// Initialize the global subscriber. `RUST_LOG` overrides the default
/// filter; when `log_dir` exists, output goes to a daily-rolling file.
/// `json` switches to one JSON object per line.
pub fn init_logger(json: bool, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let (writer, ansi) = match log_dir {
        Some(dir) if Path::new(dir).is_dir() => (
            BoxMakeWriter::new(tracing_appender::rolling::daily(dir, "mela-server")),
            false,
        ),
        Some(dir) => {
            eprintln!("Log directory {dir} not found, logging to stdout");
            (BoxMakeWriter::new(std::io::stdout), !json)
        }
        None => (BoxMakeWriter::new(std::io::stdout), !json),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
