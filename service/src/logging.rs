use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Modules to filter out from logging when not in Trace mode.
/// These are typically verbose dependencies that clutter normal log output.
const FILTERED_MODULES: &[&str] = &[
    "sqlx", "sea_orm", "tower", "tracing", "hyper", "h2", "axum", "reqwest", "rustls",
];

/// HTTP stacks that log request headers, bearer tokens included, at Trace level.
/// They stay silenced in production whatever the level.
const HEADER_LOGGING_MODULES: &[&str] = &["hyper", "h2", "reqwest"];

pub struct Logger {}

impl Logger {
    /// Initializes the global logger from the level and runtime environment in `config`.
    ///
    /// Fails only when a global logger is already installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let ignored = Self::ignored_modules(config.log_level_filter, config.is_production());

        TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(ignored),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    }

    /// Dependency modules whose records are dropped.
    ///
    /// Trace shows everything outside production; in production it still drops the
    /// HTTP stacks that would print credentials.
    fn ignored_modules(level: LevelFilter, production: bool) -> &'static [&'static str] {
        match (level, production) {
            (LevelFilter::Trace, false) => &[],
            (LevelFilter::Trace, true) => HEADER_LOGGING_MODULES,
            _ => FILTERED_MODULES,
        }
    }

    fn build_log_config(ignored: &[&'static str]) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for module in ignored {
            builder.add_filter_ignore_str(module);
        }

        builder.build()
    }
}
