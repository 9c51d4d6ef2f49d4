use clap::{Parser, Subcommand, ValueEnum};
use snip_generator::{Alphabet, DEFAULT_ALIAS_LENGTH};
use snip_telemetry::LogFormat;
use std::fmt::{Display, Formatter};

pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SNIP_MYSQL_DSN";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const ALIAS_LENGTH_ENV: &str = "SNIP_ALIAS_LENGTH";
pub const ALIAS_ALPHABET_ENV: &str = "SNIP_ALIAS_ALPHABET";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlphabetArg {
    Letters,
    Alphanumeric,
}

impl From<AlphabetArg> for Alphabet {
    fn from(value: AlphabetArg) -> Self {
        match value {
            AlphabetArg::Letters => Alphabet::Letters,
            AlphabetArg::Alphanumeric => Alphabet::Alphanumeric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip", about = "Shorten URLs, follow short codes and read click metrics")]
pub struct Cli {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Public prefix that short codes are appended to.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = ALIAS_LENGTH_ENV, default_value_t = DEFAULT_ALIAS_LENGTH)]
    pub alias_length: usize,

    #[arg(
        long,
        env = ALIAS_ALPHABET_ENV,
        value_enum,
        default_value_t = AlphabetArg::Letters
    )]
    pub alphabet: AlphabetArg,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Store a long URL and print its short code and short URL.
    Create {
        long_url: String,
        /// Use this alias instead of a random code.
        #[arg(long)]
        alias: Option<String>,
    },
    /// Print the long URL behind a short code, counting it as a click.
    Resolve { code: String },
    /// Print the usage metrics of a short code.
    Metrics { code: String },
    /// Create the storage schema.
    Migrate,
}
