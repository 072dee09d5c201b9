//! Server configuration.
//!
//! Values are resolved in layers: built-in defaults, then a TOML file named by
//! `FLIPCARD_CONFIG`, then `FLIPCARD_*` environment variables, then
//! command-line flags. The source of every value is kept for diagnostics.

use crate::logging::LogFormat;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_ENV: &str = "FLIPCARD_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Board definition file served to players
    pub board: Option<PathBuf>,
    /// Longest a first flip may wait for a card held by someone else
    pub flip_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            board: None,
            flip_timeout_secs: 300,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn flip_timeout(&self) -> Duration {
        Duration::from_secs(self.flip_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
    Cli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigSources {
    pub host: ValueSource,
    pub port: ValueSource,
    pub board: ValueSource,
    pub flip_timeout_secs: ValueSource,
    pub log_format: ValueSource,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            host: ValueSource::Default,
            port: ValueSource::Default,
            board: ValueSource::Default,
            flip_timeout_secs: ValueSource::Default,
            log_format: ValueSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigResolved {
    pub config: Config,
    pub sources: ConfigSources,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Command-line flags of `flipcard-server`. Every flag overrides the file and
/// environment layers.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "flipcard-server", about = "Serve a shared Memory board over HTTP")]
pub struct ServerArgs {
    /// Board definition file
    pub board: Option<PathBuf>,
    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,
    /// Port to bind to (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Seconds a first flip may wait for a contested card
    #[arg(long)]
    pub flip_timeout_secs: Option<u64>,
    /// Log output: pretty or json
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    board: Option<PathBuf>,
    #[serde(default)]
    flip_timeout_secs: Option<u64>,
    #[serde(default)]
    log_format: Option<LogFormat>,
}

/// Resolves defaults, file and process environment, then applies `args`.
pub fn load(args: &ServerArgs) -> Result<ConfigResolved, ConfigError> {
    resolve(|key| std::env::var(key).ok(), args)
}

/// Like [`load`], reading variables through `env`.
pub fn resolve<E>(env: E, args: &ServerArgs) -> Result<ConfigResolved, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let env = |key: &str| env(key).filter(|value| !value.is_empty());
    let mut cfg = Config::default();
    let mut sources = ConfigSources::default();

    if let Some(path) = env(CONFIG_ENV) {
        let file: FileConfig = toml::from_str(&fs::read_to_string(path)?)?;
        if let Some(v) = file.host {
            cfg.host = v;
            sources.host = ValueSource::File;
        }
        if let Some(v) = file.port {
            cfg.port = v;
            sources.port = ValueSource::File;
        }
        if let Some(v) = file.board {
            cfg.board = Some(v);
            sources.board = ValueSource::File;
        }
        if let Some(v) = file.flip_timeout_secs {
            cfg.flip_timeout_secs = v;
            sources.flip_timeout_secs = ValueSource::File;
        }
        if let Some(v) = file.log_format {
            cfg.log_format = v;
            sources.log_format = ValueSource::File;
        }
    }

    if let Some(host) = env("FLIPCARD_HOST") {
        cfg.host = host;
        sources.host = ValueSource::Env;
    }
    if let Some(port) = env("FLIPCARD_PORT") {
        cfg.port = port
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid FLIPCARD_PORT `{port}`")))?;
        sources.port = ValueSource::Env;
    }
    if let Some(board) = env("FLIPCARD_BOARD") {
        cfg.board = Some(PathBuf::from(board));
        sources.board = ValueSource::Env;
    }
    if let Some(secs) = env("FLIPCARD_FLIP_TIMEOUT_SECS") {
        cfg.flip_timeout_secs = secs.parse().map_err(|_| {
            ConfigError::Invalid(format!("invalid FLIPCARD_FLIP_TIMEOUT_SECS `{secs}`"))
        })?;
        sources.flip_timeout_secs = ValueSource::Env;
    }
    if let Some(format) = env("FLIPCARD_LOG_FORMAT") {
        cfg.log_format = format.parse().map_err(ConfigError::Invalid)?;
        sources.log_format = ValueSource::Env;
    }

    if let Some(host) = &args.host {
        cfg.host = host.clone();
        sources.host = ValueSource::Cli;
    }
    if let Some(port) = args.port {
        cfg.port = port;
        sources.port = ValueSource::Cli;
    }
    if let Some(board) = &args.board {
        cfg.board = Some(board.clone());
        sources.board = ValueSource::Cli;
    }
    if let Some(secs) = args.flip_timeout_secs {
        cfg.flip_timeout_secs = secs;
        sources.flip_timeout_secs = ValueSource::Cli;
    }
    if let Some(format) = args.log_format {
        cfg.log_format = format;
        sources.log_format = ValueSource::Cli;
    }

    validate(&cfg)?;
    Ok(ConfigResolved {
        config: cfg,
        sources,
    })
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.board.is_none() {
        return Err(ConfigError::Invalid(
            "no board file given (argument, FLIPCARD_BOARD or `board` in the config file)".into(),
        ));
    }
    if cfg.flip_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "flip_timeout_secs must be greater than 0".into(),
        ));
    }
    if cfg.host.trim().is_empty() {
        return Err(ConfigError::Invalid("host must not be empty".into()));
    }
    Ok(())
}
