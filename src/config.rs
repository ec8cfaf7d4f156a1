//! Report configuration and required environment settings.
//!
//! [`ReportConfig`] holds everything the engine needs besides the records
//! themselves: the city table, salary keywords, the civil timezone and the
//! ranking thresholds. It is built once and passed down explicitly.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal configuration problems. Any of these aborts the run before the
/// first city is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("utc offset of {0} seconds is out of range")]
    InvalidOffset(i32),
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no cities configured")]
    NoCities,
}

/// One logical partition and where its digest is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub slug: String,
    pub name: String,
    pub channel: String,
}

impl City {
    pub fn new(slug: &str, name: &str, channel: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            channel: channel.to_string(),
        }
    }
}

/// Engine and orchestration settings.
///
/// Loaded from a JSON file where every field is optional:
/// ```json
/// {
///   "utc_offset_seconds": 10800,
///   "monthly_keywords": ["месяц", "month", "мес"],
///   "cities": [{ "slug": "msk", "name": "Москва", "channel": "@courier_jobs_msk" }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub cities: Vec<City>,
    pub monthly_keywords: Vec<String>,
    /// Offset of the reporting civil timezone from UTC.
    pub utc_offset_seconds: i32,
    pub unspecified_employer: String,
    pub top_schedules: usize,
    pub top_employers: usize,
    pub daily_top_employers: usize,
    pub min_employer_salary_records: usize,
    pub min_trend_days: usize,
    pub ema_span: usize,
    pub page_size: usize,
    pub table: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cities: vec![
                City::new("msk", "Москва", "@courier_jobs_msk"),
                City::new("spb", "Санкт-Петербург", "@courier_jobs_spb"),
                City::new("nsk", "Новосибирск", "@courier_jobs_nsk"),
                City::new("ekb", "Екатеринбург", "@courier_jobs_ekb"),
                City::new("kzn", "Казань", "@courier_jobs_kzn"),
                City::new("nng", "Нижний Новгород", "@courier_jobs_nng"),
                City::new("che", "Челябинск", "@courier_jobs_che"),
                City::new("krk", "Красноярск", "@courier_jobs_krk"),
            ],
            monthly_keywords: vec!["месяц".into(), "month".into(), "мес".into()],
            utc_offset_seconds: 3 * 3600,
            unspecified_employer: "Не указан".to_string(),
            top_schedules: 3,
            top_employers: 5,
            daily_top_employers: 3,
            min_employer_salary_records: 3,
            min_trend_days: 7,
            ema_span: 7,
            page_size: 1000,
            table: "vacancies".to_string(),
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`, filling gaps with defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        if self.cities.is_empty() {
            return Err(ConfigError::NoCities);
        }
        Ok(())
    }

    /// The fixed civil timezone all calendar math is anchored to.
    pub fn timezone(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_seconds)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_seconds))
    }

    pub fn city(&self, slug: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.slug == slug)
    }
}

/// Credentials for the record store and the delivery platform.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub supabase_url: String,
    pub supabase_key: String,
    pub bot_token: Option<String>,
}

impl Credentials {
    /// Reads credentials from the process environment.
    ///
    /// - `SUPABASE_URL`, `SUPABASE_KEY` (always required)
    /// - `TG_BOT_TOKEN` (required unless `require_bot` is false)
    pub fn from_env(require_bot: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), require_bot)
    }

    pub fn from_lookup<F>(lookup: F, require_bot: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        let supabase_url = get("SUPABASE_URL")?;
        let supabase_key = get("SUPABASE_KEY")?;
        let bot_token = match get("TG_BOT_TOKEN") {
            Ok(token) => Some(token),
            Err(e) if require_bot => return Err(e),
            Err(_) => None,
        };

        Ok(Self {
            supabase_url,
            supabase_key,
            bot_token,
        })
    }
}
