//! Structured logging for matcher runs.
//!
//! Console output plus a daily-rotated file under `LOG_DIR`, both tagged with
//! the run's `run_id` through the root span opened in `main`.
//!
//! Environment variables:
//! - LOG_FORMAT=pretty|json (default: pretty)
//! - LOG_DIR=/path/to/logs (default: ./logs)
//! - RUN_ID=<uuid> (default: auto-generated)
//! - RUST_LOG=directives (default: info, HTTP internals at warn)

use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

const LOG_FILE_PREFIX: &str = "market_matcher.log";
const DEFAULT_FILTER: &str = "info,prediction_market_matcher=info,hyper=warn,reqwest=warn";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Logging settings for one process
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub log_dir: String,
    pub run_id: Uuid,
    pub filter: String,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            format: LogFormat::parse(lookup("LOG_FORMAT").as_deref()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "./logs".to_string()),
            run_id: parse_run_id(lookup("RUN_ID")),
            filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        }
    }
}

fn parse_run_id(raw: Option<String>) -> Uuid {
    raw.and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

/// Install the global subscriber and return the run id it was set up for.
///
/// The returned guard flushes the file writer on drop; hold it until exit.
///
/// ```no_run
/// use prediction_market_matcher::logging;
///
/// let (_guard, run_id) = logging::init_logging();
/// tracing::info!(%run_id, "started");
/// ```
pub fn init_logging() -> (WorkerGuard, Uuid) {
    let config = LogConfig::from_env();

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory {}: {}", config.log_dir, e);
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.format {
        LogFormat::Pretty => {
            let console_layer = fmt::layer()
                .with_writer(io::stdout)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .with_filter(env_filter.clone());

            let file_layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false)
                .compact()
                .with_filter(env_filter);

            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();
        }
        LogFormat::Json => {
            let console_layer = fmt::layer()
                .with_writer(io::stdout)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_filter(env_filter.clone());

            let file_layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_filter(env_filter);

            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();
        }
    }

    tracing::info!(
        run_id = %config.run_id,
        log_format = ?config.format,
        log_dir = %config.log_dir,
        filter = %config.filter,
        "Logging initialized"
    );

    (guard, config.run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some("xml")), LogFormat::Pretty);
    }

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.log_dir, "./logs");
        assert_eq!(config.filter, DEFAULT_FILTER);
    }

    #[test]
    fn test_log_config_overrides() {
        let run_id = Uuid::new_v4();
        let run_id_str = run_id.to_string();
        let config = LogConfig::from_lookup(lookup(&[
            ("LOG_FORMAT", "json"),
            ("LOG_DIR", "/tmp/matcher_logs"),
            ("RUN_ID", run_id_str.as_str()),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, "/tmp/matcher_logs");
        assert_eq!(config.run_id, run_id);
        assert_eq!(config.filter, "debug");
    }

    #[test]
    fn test_invalid_run_id_generates_fresh_one() {
        let a = parse_run_id(Some("not-a-uuid".to_string()));
        let b = parse_run_id(None);
        assert_ne!(a, b);
        assert_ne!(a, Uuid::nil());
    }
}
