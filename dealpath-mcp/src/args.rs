use std::{borrow::Cow, fmt, io::IsTerminal, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Parser, ValueEnum};
use config::Config;
use logforth::filter::EnvFilter;
use secrecy::SecretString;

#[derive(Debug, Parser)]
#[command(name = "Dealpath MCP", version, long_about = concat!("Dealpath MCP gateway v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// IP address on which the server will listen for incoming connections.
    /// Default: 127.0.0.1:8000
    #[arg(short, long, env = "DEALPATH_MCP_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "DEALPATH_MCP_CONFIG_PATH", default_value = "./dealpath-mcp.toml")]
    pub config: PathBuf,
    /// Set the logging level
    #[arg(long = "log", env = "DEALPATH_MCP_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "DEALPATH_MCP_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
    /// Default Dealpath API key, used when a caller brings none
    #[arg(long, env = "DEALPATH_API_KEY", hide_env_values = true)]
    pub dealpath_api_key: Option<String>,
    /// Bearer token required on the MCP endpoints
    #[arg(long, env = "MCP_TOKEN", hide_env_values = true)]
    pub mcp_token: Option<String>,
    /// Comma-separated origins allowed to call the MCP endpoints
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,
    /// Directory where downloaded files are stored
    #[arg(long, env = "FILE_STORAGE_DIR")]
    pub file_storage_dir: Option<PathBuf>,
    /// Time-to-live of cached deals, e.g. `5m`
    #[arg(long, env = "DEALPATH_MCP_CACHE_TTL", value_parser = parse_duration)]
    pub cache_ttl: Option<Duration>,
    /// Tool calls allowed per caller and rate limit interval
    #[arg(long, env = "DEALPATH_MCP_RATE_LIMIT")]
    pub rate_limit: Option<u32>,
}

impl Args {
    /// Loads the configuration file, if present, and applies the command line overrides.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = if self.config.exists() {
            Config::load(&self.config)?
        } else {
            Config::default()
        };

        if let Some(key) = self.dealpath_api_key.as_deref().filter(|key| !key.is_empty()) {
            config.dealpath.api_key = Some(SecretString::from(key));
        }

        if let Some(token) = self.mcp_token.as_deref().filter(|token| !token.is_empty()) {
            config.server.auth.token = Some(SecretString::from(token));
        }

        if let Some(origins) = &self.allowed_origins {
            config.server.auth.allowed_origins = origins
                .iter()
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        if let Some(dir) = &self.file_storage_dir {
            config.storage.root = dir.clone();
        }

        if let Some(ttl) = self.cache_ttl {
            config.mcp.cache.ttl = ttl;
        }

        if let Some(limit) = self.rate_limit {
            config.mcp.rate_limit.tool_calls.limit = limit;
        }

        config.validate()?;

        Ok(config)
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    duration_str::parse(value).map_err(|error| error.to_string())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        };

        f.write_str(style)
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log errors, warnings, info, debug, and trace messages
    Trace,
}

impl LogLevel {
    /// Dependencies log at `warn`; the workspace crates at the selected level.
    pub fn env_filter(self) -> EnvFilter {
        let filter = match self {
            LogLevel::Off => Cow::Borrowed("off"),
            level => Cow::Owned(format!(
                "warn,dealpath_mcp={level},server={level},mcp={level},dealpath={level},config={level},rate_limit={level},telemetry={level}"
            )),
        };

        EnvFilter::from_str(&filter).expect("These all are valid env filters.")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        f.write_str(level)
    }
}
