use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use secrecy::SecretString;
use thiserror::Error;

/// Environment variable holding the API credential.
pub const TOKEN_ENV: &str = "SNAPMETER_API_TOKEN";

#[derive(Parser, Debug)]
#[command(
    name = "energydash",
    about = "Electricity bill and meter reading dashboard"
)]
pub struct Config {
    /// Base URL of the public metering API
    #[arg(long, default_value = "https://snapmeter.com/api/public")]
    pub base_url: String,

    /// Meter whose interval readings are fetched
    #[arg(long, default_value = "2080448990211")]
    pub meter_id: String,

    /// Service whose bills are fetched
    #[arg(long, default_value = "2080448990210")]
    pub service_id: String,

    /// First day of the requested range (YYYY-MM-DD)
    #[arg(long, default_value = "2023-09-01")]
    pub start: NaiveDate,

    /// Last day of the requested range (YYYY-MM-DD)
    #[arg(long, default_value = "2025-09-01")]
    pub end: NaiveDate,

    /// Which meter of the readings response to chart
    #[arg(long, default_value_t = 0)]
    pub meter_index: usize,

    /// IANA time zone for hour-of-day grouping (defaults to the host's local zone)
    #[arg(long, value_parser = parse_timezone)]
    pub timezone: Option<Tz>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Number of highest-draw intervals to list
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Calendar year for the per-year cost view (defaults to the latest)
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(ValueEnum, Copy, Clone, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Start date {start} is after end date {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Inclusive day range sent to both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("start", self.start.format("%Y-%m-%d").to_string()),
            ("end", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}

impl Config {
    pub fn range(&self) -> Result<DateRange, ConfigError> {
        DateRange::new(self.start, self.end)
    }
}

/// Read the API token from [`TOKEN_ENV`]. The value is only ever held as a
/// [`SecretString`].
pub fn load_api_token() -> Result<SecretString, ConfigError> {
    token_from(std::env::var(TOKEN_ENV).ok())
}

fn token_from(raw: Option<String>) -> Result<SecretString, ConfigError> {
    match raw {
        Some(token) if !token.trim().is_empty() => Ok(SecretString::new(token.into())),
        _ => Err(ConfigError::MissingEnvVar(TOKEN_ENV.to_string())),
    }
}

fn parse_timezone(raw: &str) -> Result<Tz, String> {
    raw.parse::<Tz>()
        .map_err(|_| format!("unknown time zone: {}", raw))
}
