//! Command-line interface parsing for trialfinder
//!
//! Global flags configure the service and logging; the subcommand selects
//! the operation. List-valued search flags take comma-separated values.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::data::client::CLINICAL_TRIALS_BASE_URL;
use crate::data::{RecruitmentStatus, SearchRequest};
use crate::logging::LogFormat;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified status is not a registry status token
    #[error("Invalid status: '{0}'. Valid statuses include RECRUITING, NOT_YET_RECRUITING, ACTIVE_NOT_RECRUITING, COMPLETED")]
    InvalidStatus(String),
}

/// trialfinder - Search the ClinicalTrials.gov registry
#[derive(Parser, Debug)]
#[command(name = "trialfinder")]
#[command(about = "Cached, rate-limited search of the ClinicalTrials.gov registry")]
#[command(version)]
pub struct Cli {
    /// Studies endpoint of the registry
    #[arg(long, env = "TRIALFINDER_BASE_URL", default_value = CLINICAL_TRIALS_BASE_URL, global = true)]
    pub base_url: String,

    /// Disable the result cache
    #[arg(
        long,
        env = "TRIALFINDER_NO_CACHE",
        value_parser = clap::builder::BoolishValueParser::new(),
        global = true
    )]
    pub no_cache: bool,

    /// Lifetime of cached results in seconds (0 selects the 6 hour default)
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 6 * 60 * 60, global = true)]
    pub cache_ttl_secs: u64,

    /// Minimum spacing between registry calls in milliseconds
    #[arg(long, default_value_t = 2000, global = true)]
    pub min_interval_ms: u64,

    /// Timeout for one registry call in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format: json, console or text
    #[arg(long, env = "LOG_FORMAT", default_value = "json", value_parser = parse_log_format, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for trials and print one result page as JSON
    Search(SearchArgs),

    /// Fetch a single trial by NCT identifier
    Trial {
        /// NCT identifier, e.g. NCT01234567
        nct_id: String,
    },

    /// Read JSON search requests from stdin, one per line, and print one
    /// JSON result per line
    Batch,
}

/// Search filters
#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Free-text condition query, used when no conditions are given
    #[arg(long, default_value = "")]
    pub query: String,

    /// Conditions to search for, e.g. "paraplegia,tetraplegia"
    #[arg(long, value_delimiter = ',')]
    pub conditions: Vec<String>,

    /// Recruitment statuses (default: RECRUITING,NOT_YET_RECRUITING)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<String>,

    /// Phases to keep, e.g. "PHASE2,PHASE3"; NA selects trials without a phase
    #[arg(long, value_delimiter = ',')]
    pub phase: Vec<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Search radius in miles (default 50)
    #[arg(long)]
    pub distance: Option<u32>,

    /// Minimum participant age, e.g. "18" or "18 Years"
    #[arg(long)]
    pub minimum_age: Option<String>,

    /// Maximum participant age
    #[arg(long)]
    pub maximum_age: Option<String>,

    /// Results per page (0 selects the default of 100)
    #[arg(long, default_value_t = 0)]
    pub page_size: u32,

    /// Token from a previous page's next_page_token
    #[arg(long)]
    pub page_token: Option<String>,
}

/// Parses a recruitment status argument into a [`RecruitmentStatus`].
///
/// # Returns
/// * `Ok(RecruitmentStatus)` if the string is a known registry token
/// * `Err(CliError::InvalidStatus)` otherwise
pub fn parse_status_arg(s: &str) -> Result<RecruitmentStatus, CliError> {
    RecruitmentStatus::parse(s)
        .filter(|status| *status != RecruitmentStatus::Unknown)
        .ok_or_else(|| CliError::InvalidStatus(s.trim().to_string()))
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s).ok_or_else(|| format!("unknown log format '{}'", s))
}

fn trimmed_values(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl SearchArgs {
    /// Converts the parsed flags into a [`SearchRequest`].
    ///
    /// # Returns
    /// * `Err(CliError)` if an unknown status was specified
    pub fn to_request(&self) -> Result<SearchRequest, CliError> {
        let status = trimmed_values(&self.status)
            .iter()
            .map(|s| parse_status_arg(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchRequest {
            query: self.query.trim().to_string(),
            conditions: trimmed_values(&self.conditions),
            status,
            phase: trimmed_values(&self.phase),
            latitude: self.latitude,
            longitude: self.longitude,
            distance: self.distance,
            minimum_age: self.minimum_age.clone(),
            maximum_age: self.maximum_age.clone(),
            page_size: self.page_size,
            page_token: self.page_token.clone(),
        })
    }
}

impl ServiceConfig {
    /// Creates a ServiceConfig from parsed CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            base_url: cli.base_url.clone(),
            cache_enabled: !cli.no_cache,
            cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
            min_request_interval: Duration::from_millis(cli.min_interval_ms),
            request_timeout: Duration::from_secs(cli.timeout_secs),
        }
    }
}
