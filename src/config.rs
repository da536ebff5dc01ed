use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cli::Args;

/// The API refuses anything larger
pub const MAX_PAGE_SIZE: u16 = 250;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid base url `{url}`: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base url `{0}` can't have paths appended to it")]
    OpaqueBaseUrl(String),
    #[error("page size must be between 1 and 250, got {0}")]
    PageSize(u16),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Everything a run needs, resolved and validated once up front
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: Url,
    pub page_size: u16,
    pub max_records: Option<usize>,
    pub request_timeout: Duration,
    pub inter_page_delay: Duration,
    pub json_output_path: PathBuf,
    pub csv_output_path: PathBuf,
    pub keep_partial: bool,
    pub sample_size: usize,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Config, ConfigError> {
        let base_url = Url::parse(&args.base_url).map_err(|source| ConfigError::BaseUrl {
            url: args.base_url.clone(),
            source,
        })?;

        if base_url.cannot_be_a_base() {
            return Err(ConfigError::OpaqueBaseUrl(args.base_url.clone()));
        }

        if args.page_size == 0 || args.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSize(args.page_size));
        }

        if args.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Config {
            base_url,
            page_size: args.page_size,
            max_records: args.max_records,
            request_timeout: Duration::from_secs(args.timeout_secs),
            inter_page_delay: Duration::from_millis(args.delay_ms),
            json_output_path: args.json_out.clone(),
            csv_output_path: args.csv_out.clone(),
            keep_partial: args.keep_partial,
            sample_size: args.sample,
        })
    }
}
