//! Tracing setup shared by all Harvest binaries
//!
//! One [`LogConfig`] describes where log lines go (console, a daily-rotated
//! file, or both), how they are rendered (text or JSON), and which targets
//! are filtered to which levels. Binaries build a config with the builder,
//! let `LOG_*` environment variables override it, and hand it to
//! [`init_logging`] once at startup.
//!
//! Harvest code never prints directly; it logs through the `tracing` macros
//! with structured fields:
//!
//! ```rust
//! use tracing::info;
//!
//! # let uuid = uuid::Uuid::new_v4();
//! info!(document_uuid = %uuid, "Document queued for ingestion");
//! ```

use crate::error::{HarvestError, Result};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl LogOutput {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            other => Err(HarvestError::Config(format!(
                "unrecognized log output '{other}' (expected console, file or both)"
            ))),
        }
    }

    fn writes_console(self) -> bool {
        self != LogOutput::File
    }

    fn writes_file(self) -> bool {
        self != LogOutput::Console
    }
}

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(HarvestError::Config(format!(
                "unrecognized log format '{other}' (expected text or json)"
            ))),
        }
    }
}

/// Logging configuration for one binary
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level for everything not covered by `directives`
    pub level: Level,
    pub output: LogOutput,
    pub format: LogFormat,
    /// Where rotated log files land; only used when `output` includes file
    pub directory: PathBuf,
    /// File name prefix, e.g. "harvest-server" -> harvest-server.2026-08-05
    pub file_prefix: String,
    /// Extra per-target directives, e.g. "sqlx=warn,harvest_server=debug"
    pub directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::default(),
            format: LogFormat::default(),
            directory: PathBuf::from("./logs"),
            file_prefix: "harvest".to_string(),
            directives: None,
        }
    }
}

impl LogConfig {
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Environment-only configuration, starting from the defaults.
    pub fn from_env() -> Result<Self> {
        Self::default().load_env()
    }

    /// Apply `LOG_*` environment overrides to this configuration.
    ///
    /// Recognized variables: `LOG_LEVEL`, `LOG_OUTPUT` (console/file/both),
    /// `LOG_FORMAT` (text/json), `LOG_DIR`, `LOG_FILE_PREFIX` and
    /// `LOG_FILTER` (extra directives).
    pub fn load_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.level = level
                .parse()
                .map_err(|_| HarvestError::Config(format!("unrecognized log level '{level}'")))?;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.output = LogOutput::parse(&output)?;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.format = LogFormat::parse(&format)?;
        }
        if let Ok(directory) = std::env::var("LOG_DIR") {
            self.directory = PathBuf::from(directory);
        }
        if let Ok(prefix) = std::env::var("LOG_FILE_PREFIX") {
            self.file_prefix = prefix;
        }
        if let Ok(directives) = std::env::var("LOG_FILTER") {
            self.directives = Some(directives);
        }

        Ok(self)
    }
}

/// Fluent construction of a [`LogConfig`]
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.directory = directory.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        self.config.directives = Some(directives.into());
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let mut filter = EnvFilter::from_default_env().add_directive(config.level.into());
    if let Some(directives) = config.directives.as_deref() {
        for directive in directives.split(',') {
            let directive = directive.trim().parse().map_err(|e| {
                HarvestError::Config(format!("bad log directive '{directive}': {e}"))
            })?;
            filter = filter.add_directive(directive);
        }
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync + 'static>> = vec![filter.boxed()];

    if config.output.writes_console() {
        let console = fmt::layer().with_writer(std::io::stdout);
        layers.push(match config.format {
            LogFormat::Text => console.boxed(),
            LogFormat::Json => console.json().boxed(),
        });
    }

    if config.output.writes_file() {
        std::fs::create_dir_all(&config.directory)?;

        let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        // The guard flushes buffered lines when dropped; it must live as
        // long as the process does.
        std::mem::forget(guard);

        let file = fmt::layer().with_writer(writer).with_ansi(false);
        layers.push(match config.format {
            LogFormat::Text => file.boxed(),
            LogFormat::Json => file.json().boxed(),
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| HarvestError::Config(format!("tracing subscriber already installed: {e}")))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_output_parse() {
        assert_eq!(LogOutput::parse("console").unwrap(), LogOutput::Console);
        assert_eq!(LogOutput::parse("stdout").unwrap(), LogOutput::Console);
        assert_eq!(LogOutput::parse("FILE").unwrap(), LogOutput::File);
        assert_eq!(LogOutput::parse("Both").unwrap(), LogOutput::Both);
        assert!(LogOutput::parse("syslog").is_err());
    }

    #[test]
    fn test_log_output_targets() {
        assert!(LogOutput::Console.writes_console());
        assert!(!LogOutput::Console.writes_file());
        assert!(!LogOutput::File.writes_console());
        assert!(LogOutput::File.writes_file());
        assert!(LogOutput::Both.writes_console() && LogOutput::Both.writes_file());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("text").unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::parse("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let config = LogConfig::builder()
            .level(Level::DEBUG)
            .output(LogOutput::File)
            .format(LogFormat::Json)
            .directory("/var/log/harvest")
            .file_prefix("consumer")
            .directives("sqlx=warn")
            .build();

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directory, PathBuf::from("/var/log/harvest"));
        assert_eq!(config.file_prefix, "consumer");
        assert_eq!(config.directives.as_deref(), Some("sqlx=warn"));
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.output, LogOutput::Console);
        assert_eq!(config.format, LogFormat::Text);
    }
}
