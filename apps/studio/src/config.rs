use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// What `submit` does while a generation is already streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResubmitPolicy {
    /// Refuse the new submission; the running generation continues.
    Reject,
    /// Cancel the running generation and start the new one.
    Restart,
}

impl FromStr for ResubmitPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ResubmitPolicy::Reject),
            "restart" => Ok(ResubmitPolicy::Restart),
            other => Err(anyhow!(
                "RESUBMIT_POLICY must be 'reject' or 'restart', got '{other}'"
            )),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub wallet_address: String,
    pub port: u16,
    pub rust_log: String,
    pub resubmit_policy: ResubmitPolicy,
    pub save_dialog_dismiss: Duration,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_base_url: require_env("API_BASE_URL")?,
            wallet_address: require_env("WALLET_ADDRESS")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
            resubmit_policy: optional_env("RESUBMIT_POLICY", "reject").parse()?,
            save_dialog_dismiss: Duration::from_millis(
                optional_env("SAVE_DIALOG_DISMISS_MS", "2000")
                    .parse::<u64>()
                    .context("SAVE_DIALOG_DISMISS_MS must be a number of milliseconds")?,
            ),
            http_timeout: Duration::from_secs(
                optional_env("HTTP_TIMEOUT_SECS", "120")
                    .parse::<u64>()
                    .context("HTTP_TIMEOUT_SECS must be a number of seconds")?,
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resubmit_policy_parses_case_insensitively() {
        assert_eq!(
            "Reject".parse::<ResubmitPolicy>().unwrap(),
            ResubmitPolicy::Reject
        );
        assert_eq!(
            " restart ".parse::<ResubmitPolicy>().unwrap(),
            ResubmitPolicy::Restart
        );
    }

    #[test]
    fn test_resubmit_policy_rejects_unknown_value() {
        let err = "queue".parse::<ResubmitPolicy>().unwrap_err();
        assert!(err.to_string().contains("queue"));
    }
}
