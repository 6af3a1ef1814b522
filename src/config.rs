use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::gateway::PollingPolicy;
use crate::pricing::TaxRate;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gateway: GatewayConfig,
    pub tax_rate: TaxRate,
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub public_key: String,
    pub integrity_key: String,
    pub timeout: Duration,
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
    pub polling: PollingPolicy,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("public_key", &self.public_key)
            .field("integrity_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("failure_threshold", &self.failure_threshold)
            .field("reset_timeout_secs", &self.reset_timeout_secs)
            .field("polling", &self.polling)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let config = Config {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            gateway: GatewayConfig {
                base_url: env::var("GATEWAY_BASE_URL").context("GATEWAY_BASE_URL is required")?,
                public_key: env::var("GATEWAY_PUBLIC_KEY")
                    .context("GATEWAY_PUBLIC_KEY is required")?,
                integrity_key: env::var("GATEWAY_INTEGRITY_KEY")
                    .context("GATEWAY_INTEGRITY_KEY is required")?,
                timeout: Duration::from_secs(parse_var("GATEWAY_TIMEOUT_SECS", 30)?),
                failure_threshold: parse_var("GATEWAY_FAILURE_THRESHOLD", 5)?,
                reset_timeout_secs: parse_var("GATEWAY_RESET_TIMEOUT_SECS", 60)?,
                polling: PollingPolicy {
                    interval: Duration::from_millis(parse_var("GATEWAY_POLL_INTERVAL_MS", 3000)?),
                    max_attempts: parse_var("GATEWAY_POLL_MAX_ATTEMPTS", 20)?,
                },
            },
            tax_rate: parse_var("IVA_RATE", TaxRate::default())?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.gateway.public_key.is_empty() {
            anyhow::bail!("GATEWAY_PUBLIC_KEY is empty");
        }
        if self.gateway.integrity_key.is_empty() {
            anyhow::bail!("GATEWAY_INTEGRITY_KEY is empty");
        }
        if self.gateway.polling.max_attempts == 0 {
            anyhow::bail!("GATEWAY_POLL_MAX_ATTEMPTS must be greater than 0");
        }

        url::Url::parse(&self.gateway.base_url)
            .context("GATEWAY_BASE_URL is not a valid URL")?;

        Ok(())
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    parse_value(name, env::var(name).ok(), default)
}

fn parse_value<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e)),
    }
}
