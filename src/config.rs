use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const API_URL_VAR: &str = "PERSONA_HUB_API_URL";
pub const DATA_DIR_VAR: &str = "PERSONA_HUB_DATA_DIR";
pub const REFRESH_SECS_VAR: &str = "PERSONA_HUB_REFRESH_SECS";
pub const PAGE_SIZE_VAR: &str = "PERSONA_HUB_PAGE_SIZE";

const DEFAULT_REFRESH_SECS: u64 = 600;
const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PERSONA_HUB_API_URL is not set; the backend base URL is required")]
    MissingBaseUrl,
    #[error("PERSONA_HUB_API_URL is not a valid URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("No data directory available; set PERSONA_HUB_DATA_DIR")]
    NoDataDir,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: Url,
    pub data_dir: PathBuf,
    pub refresh_interval: Duration,
    pub items_per_page: usize,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(API_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;
        let api_base_url = Url::parse(&raw_url)?;

        let data_dir = match lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("persona-hub"),
        };

        let refresh_secs = parse_number(&lookup, REFRESH_SECS_VAR, DEFAULT_REFRESH_SECS)?;
        let items_per_page = parse_number(&lookup, PAGE_SIZE_VAR, DEFAULT_PAGE_SIZE)?;

        Ok(Self {
            api_base_url,
            data_dir,
            refresh_interval: Duration::from_secs(refresh_secs),
            items_per_page,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(n) if n > T::from(0) => Ok(n),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
    }
}
