use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;

/// The webhook every submission is posted to unless overridden.
pub const WEBHOOK_URL: &str =
    "https://primary-production-da3f.up.railway.app/webhook-test/7eab2e1f-99b9-42ee-ab90-480548527e58";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const STORE_DIR: &str = "resume-submitter";
const STORE_FILE: &str = "identity.json";

/// Application configuration loaded from environment variables.
/// Every variable is optional; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_url: Url,
    pub store_path: PathBuf,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let webhook_url = optional_env("SUBMITTER_WEBHOOK_URL")
            .unwrap_or_else(|| WEBHOOK_URL.to_string());

        Ok(Config {
            webhook_url: parse_webhook_url(&webhook_url)?,
            store_path: optional_env("SUBMITTER_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_store_path),
            request_timeout: parse_timeout(optional_env("SUBMITTER_TIMEOUT_SECS").as_deref())?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_webhook_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .with_context(|| format!("SUBMITTER_WEBHOOK_URL '{raw}' is not a valid URL"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("SUBMITTER_WEBHOOK_URL must use http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

fn parse_timeout(raw: Option<&str>) -> Result<Duration> {
    let secs = match raw {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .context("SUBMITTER_TIMEOUT_SECS must be a whole number of seconds")?,
        None => DEFAULT_TIMEOUT_SECS,
    };
    if secs == 0 {
        bail!("SUBMITTER_TIMEOUT_SECS must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

/// `<data dir>/resume-submitter/identity.json`, or a dot-directory in the
/// working directory on platforms without a data dir.
fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(STORE_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{STORE_DIR}")))
        .join(STORE_FILE)
}
