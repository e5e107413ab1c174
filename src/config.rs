use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::bulk::BulkSettings;

pub const DEFAULT_LOG_FILTER: &str = "quiz_overrides=info,axum=info";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub port: u16,
    pub log_filter: String,
    pub bulk: BulkSettings,
}

impl Settings {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let port: u16 = parsed("PORT").unwrap_or(8081);
        let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

        let defaults = BulkSettings::default();
        let concurrency = parsed::<usize>("BULK_OVERRIDE_CONCURRENCY")
            .unwrap_or(defaults.concurrency)
            .max(1);
        let call_timeout = parsed::<u64>("BULK_OVERRIDE_TIMEOUT_SECS")
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or(defaults.call_timeout);

        Ok(Settings {
            database_url,
            port,
            log_filter,
            bulk: BulkSettings {
                concurrency,
                call_timeout,
            },
        })
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
