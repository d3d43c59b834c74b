use std::{env, path::Path, time::Duration};

use research_relay::{DriverConfig, RetryPolicy};
use research_upstream::UpstreamConfig;

/// Initialize the environment variables
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Get the environment variable
pub fn get_env<T: std::str::FromStr + Default>(key: &str) -> T {
    let result = env::var(key);
    match result {
        Ok(s) => match s.parse() {
            Ok(val) => val,
            Err(_) => {
                tracing::error!("Error parsing {}", key);
                String::from("").parse().unwrap_or_default()
            }
        },
        Err(_) => String::from("").parse().unwrap_or_default(),
    }
}

/// Get the environment variable or a fallback value
pub fn get_env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    match env::var(key) {
        Ok(s) => s.parse().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

/// Resolved service settings.
#[derive(Clone, Debug)]
pub struct Settings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub engine: String,
    pub arxiv_service_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub poll_max_wait_secs: u64,
}

impl Settings {
    pub fn load() -> Self {
        let base_url: String = get_env("SUBCONSCIOUS_BASE_URL");
        let arxiv: String = get_env("ARXIV_SERVICE_URL");
        Self {
            api_key: get_env("SUBCONSCIOUS_API_KEY"),
            base_url: (!base_url.trim().is_empty()).then_some(base_url),
            engine: get_env_or("SUBCONSCIOUS_ENGINE", "tim-gpt".to_string()),
            arxiv_service_url: (!arxiv.trim().is_empty()).then_some(arxiv),
            host: get_env_or("HOST", "0.0.0.0".to_string()),
            port: get_env_or("PORT", 8000),
            max_retries: get_env_or("MAX_RETRIES", 5),
            retry_delay_secs: get_env_or("RETRY_DELAY_SECS", 2),
            poll_interval_secs: get_env_or("POLL_INTERVAL_SECS", 2),
            poll_max_wait_secs: get_env_or("POLL_MAX_WAIT_SECS", 60),
        }
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        let mut config = UpstreamConfig::new(self.api_key.clone());
        if let Some(base_url) = &self.base_url {
            config = config.base_url(base_url.clone());
        }
        config
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            default_engine: self.engine.clone(),
            retry: RetryPolicy::new(
                self.max_retries.max(1),
                Duration::from_secs(self.retry_delay_secs.max(1)),
            ),
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            poll_max_wait: Duration::from_secs(self.poll_max_wait_secs.max(1)),
            arxiv_service_url: self.arxiv_service_url.clone(),
            ..DriverConfig::default()
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
