// Configuration management for the peer finder
// Supports CLI arguments, config file (TOML), and environment variables

use clap::Parser;
use serde::{Deserialize, Serialize};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Estimate potential peers of an ASN from bgp.tools data
#[derive(Parser, Debug, Clone)]
#[command(name = "peerfinder")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:\n  peerfinder -a 6939 -u \"My Tool - contact@example.com\"\n  peerfinder --asn AS6939 --useragent \"BGP Analysis - admin@mycompany.com\"\n  peerfinder  (interactive mode)")]
pub struct CliArgs {
    /// Target ASN to analyze (e.g., 6939 or AS6939)
    #[arg(short, long, env = "PEERFINDER_ASN")]
    pub asn: Option<String>,

    /// User-Agent string for bgp.tools requests (format: "description - email")
    #[arg(short, long = "useragent", env = "PEERFINDER_USER_AGENT")]
    pub useragent: Option<String>,

    /// Debug level (0=minimal, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=3), env = "PEERFINDER_DEBUG")]
    pub debug: Option<u8>,

    /// Path to configuration file
    #[arg(short, long, env = "PEERFINDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the report files are written to
    #[arg(short, long, env = "PEERFINDER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Configuration file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// bgp.tools endpoints
    #[serde(default)]
    pub service: ServiceConfig,

    /// Request identity
    #[serde(default)]
    pub request: RequestConfig,

    /// Report output
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Whois host
    #[serde(default = "default_whois_host")]
    pub whois_host: String,

    /// Whois port
    #[serde(default = "default_whois_port")]
    pub whois_port: u16,

    /// Base URL for table.jsonl and asns.csv
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestConfig {
    /// User-Agent sent with every HTTP request
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Debug level (0-3)
    #[serde(default = "default_debug")]
    pub debug: u8,
}

// Default value functions
fn default_whois_host() -> String {
    "bgp.tools".to_string()
}
fn default_whois_port() -> u16 {
    43
}
fn default_base_url() -> String {
    "https://bgp.tools".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_debug() -> u8 {
    2
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            whois_host: default_whois_host(),
            whois_port: default_whois_port(),
            base_url: default_base_url(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_output_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            debug: default_debug(),
        }
    }
}

/// Debug level 0-3, carried explicitly by whoever needs it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Verbosity {
    pub const MINIMAL: Verbosity = Verbosity(0);
    pub const NORMAL: Verbosity = Verbosity(1);
    pub const VERBOSE: Verbosity = Verbosity(2);
    pub const DEBUG: Verbosity = Verbosity(3);

    pub fn new(level: u8) -> Self {
        Verbosity(level.min(Self::DEBUG.0))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Most detailed tracing level that should be emitted
    pub fn tracing_level(self) -> Level {
        match self {
            Verbosity::MINIMAL => Level::ERROR,
            Verbosity::NORMAL => Level::INFO,
            Verbosity::VERBOSE => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Whether an event at `level` passes this verbosity
    pub fn allows(self, level: Level) -> bool {
        level <= self.tracing_level()
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::VERBOSE
    }
}

/// Merged configuration from all sources
///
/// `asn` and `user_agent` are raw and unvalidated here; `None` means the
/// value has to be asked for interactively.
#[derive(Debug, Clone)]
pub struct Config {
    pub asn: Option<String>,
    pub user_agent: Option<String>,
    pub verbosity: Verbosity,
    pub whois_host: String,
    pub whois_port: u16,
    pub base_url: String,
    pub output_dir: PathBuf,
    /// File the settings were read from, if any. Logged once tracing is up.
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources (CLI args, config file, defaults)
    /// Priority: CLI args / environment > Config file > Defaults
    pub fn load() -> anyhow::Result<Self> {
        let cli_args = CliArgs::parse();

        let source = cli_args.config.clone().or_else(|| {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            default_path.exists().then_some(default_path)
        });
        let config_file = match &source {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };

        let mut config = Self::merge(cli_args, config_file);
        config.source = source;
        Ok(config)
    }

    fn merge(cli_args: CliArgs, config_file: ConfigFile) -> Self {
        let debug = cli_args.debug.unwrap_or(config_file.logging.debug);

        Config {
            asn: cli_args.asn,
            user_agent: cli_args.useragent.or(config_file.request.user_agent),
            verbosity: Verbosity::new(debug),
            whois_host: config_file.service.whois_host,
            whois_port: config_file.service.whois_port,
            base_url: config_file.service.base_url.trim_end_matches('/').to_string(),
            output_dir: cli_args.output_dir.unwrap_or(config_file.output.directory),
            source: None,
        }
    }

    /// Interactive mode is entered when either required value is missing
    pub fn needs_prompt(&self) -> bool {
        self.asn.is_none() || self.user_agent.is_none()
    }
}

const DEFAULT_CONFIG_PATH: &str = "peerfinder.toml";

fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let file = toml::from_str::<ConfigFile>(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(file)
}
