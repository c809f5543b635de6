//! Environment configuration for the query service and the object store.

use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub qlever_api_url: String,
    pub qlever_timeout: Duration,
    pub s3: S3Settings,
    /// Cap on outstanding object-store calls for one fan-out.
    pub fanout_concurrency: usize,
    pub archive_fetch_timeout: Duration,
    pub presign_ttl_secs: u32,
    /// Number of separators in a campaign folder prefix (`batch/YYYY/MM/DD/NR/` is 5).
    pub campaign_depth: usize,
    pub bind_address: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads every setting through `lookup`; all missing required settings are reported together.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut missing = Vec::new();
        let mut required = |name: &'static str| {
            get(name).unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };
        let qlever_api_url = required("QLEVER_API_URL");
        let endpoint = required("S3_ENDPOINT");
        let bucket = required("S3_BUCKET_NAME");
        let access_key_id = required("AWS_ACCESS_KEY_ID");
        let secret_access_key = required("AWS_SECRET_ACCESS_KEY");
        if !missing.is_empty() {
            anyhow::bail!("Missing required environment variables: {}", missing.join(", "));
        }

        let config = AppConfig {
            qlever_api_url,
            qlever_timeout: Duration::from_secs(parse_or(&get, "QLEVER_TIMEOUT_SECS", 60)?),
            s3: S3Settings { endpoint, bucket, access_key_id, secret_access_key, region: get("AWS_REGION") },
            fanout_concurrency: parse_or(&get, "FANOUT_CONCURRENCY", 16)?,
            archive_fetch_timeout: Duration::from_secs(parse_or(&get, "ARCHIVE_FETCH_TIMEOUT_SECS", 30)?),
            presign_ttl_secs: parse_or(&get, "PRESIGN_TTL_SECS", 300)?,
            campaign_depth: parse_or(&get, "CAMPAIGN_DEPTH", 5)?,
            bind_address: get("BIND_ADDRESS").unwrap_or("0.0.0.0:8080".to_string()),
        };
        if config.fanout_concurrency == 0 {
            anyhow::bail!("FANOUT_CONCURRENCY must be at least 1");
        }
        Ok(config)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(raw) => raw.parse::<T>().with_context(|| format!("{name} has an invalid value {raw:?}")),
        None => Ok(default),
    }
}
