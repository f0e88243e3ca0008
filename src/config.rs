use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::queue::sweep::DEFAULT_RETENTION_DAYS;

#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub scheduler: SchedulerConfig,
    /// `(source, url)` pairs registered as forward handlers.
    pub forward_targets: Vec<(String, String)>,
    pub alert_webhook_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub log_level: String,
}

/// Timing and budget knobs for the retry scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub startup_delay: Duration,
    pub max_retries: u32,
    pub dispatch_timeout: Duration,
    pub retention: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            startup_delay: Duration::from_secs(10),
            max_retries: 5,
            dispatch_timeout: Duration::from_secs(30),
            retention: chrono::Duration::days(DEFAULT_RETENTION_DAYS),
        }
    }
}

impl SchedulerConfig {
    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("scheduler interval must be greater than zero".to_string());
        }
        if self.dispatch_timeout.is_zero() {
            return Err("dispatch timeout must be greater than zero".to_string());
        }
        if self.max_retries == 0 {
            return Err("max retries must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub to: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let store_path = PathBuf::from(env_or("WEBHOOK_QUEUE_STORE_PATH", "data/webhook-queue.json"));

        let host: IpAddr = env_or("WEBHOOK_QUEUE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid WEBHOOK_QUEUE_HOST: {e}"))?;

        let port: u16 = env_or("WEBHOOK_QUEUE_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid WEBHOOK_QUEUE_PORT: {e}"))?;

        let interval = env_secs("WEBHOOK_QUEUE_INTERVAL_SECS", 300)?;
        let startup_delay = env_secs("WEBHOOK_QUEUE_STARTUP_DELAY_SECS", 10)?;
        let dispatch_timeout = env_secs("WEBHOOK_QUEUE_DISPATCH_TIMEOUT_SECS", 30)?;

        let max_retries: u32 = env_or("WEBHOOK_QUEUE_MAX_RETRIES", "5")
            .parse()
            .map_err(|e| format!("Invalid WEBHOOK_QUEUE_MAX_RETRIES: {e}"))?;
        if max_retries == 0 {
            return Err("WEBHOOK_QUEUE_MAX_RETRIES must be at least 1".to_string());
        }

        let retention_days: i64 = env_or(
            "WEBHOOK_QUEUE_RETENTION_DAYS",
            &DEFAULT_RETENTION_DAYS.to_string(),
        )
        .parse()
        .map_err(|e| format!("Invalid WEBHOOK_QUEUE_RETENTION_DAYS: {e}"))?;

        let forward_targets = parse_forward_targets(&env_or("WEBHOOK_QUEUE_FORWARD", ""))?;

        let alert_webhook_url = std::env::var("WEBHOOK_QUEUE_ALERT_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let log_level = env_or("WEBHOOK_QUEUE_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("WEBHOOK_QUEUE_SMTP_HOST").ok(),
            std::env::var("WEBHOOK_QUEUE_SMTP_PORT").ok(),
            std::env::var("WEBHOOK_QUEUE_SMTP_USER").ok(),
            std::env::var("WEBHOOK_QUEUE_SMTP_PASS").ok(),
            std::env::var("WEBHOOK_QUEUE_SMTP_FROM").ok(),
            std::env::var("WEBHOOK_QUEUE_SMTP_TO").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from), Some(to)) => {
                Some(SmtpConfig {
                    host,
                    port: port
                        .parse()
                        .map_err(|e| format!("Invalid WEBHOOK_QUEUE_SMTP_PORT: {e}"))?,
                    user,
                    pass,
                    from,
                    to,
                })
            }
            _ => None,
        };

        let scheduler = SchedulerConfig {
            interval,
            startup_delay,
            max_retries,
            dispatch_timeout,
            retention: chrono::Duration::days(retention_days),
        };
        if scheduler.interval.is_zero() {
            return Err("WEBHOOK_QUEUE_INTERVAL_SECS must be at least 1".to_string());
        }
        if scheduler.dispatch_timeout.is_zero() {
            return Err("WEBHOOK_QUEUE_DISPATCH_TIMEOUT_SECS must be at least 1".to_string());
        }
        scheduler.validate()?;

        Ok(Config {
            store_path,
            host,
            port,
            scheduler,
            forward_targets,
            alert_webhook_url,
            smtp,
            log_level,
        })
    }
}

/// Parse `source=url,source=url`.
pub fn parse_forward_targets(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let (source, url) = entry
                .split_once('=')
                .ok_or_else(|| format!("Invalid WEBHOOK_QUEUE_FORWARD entry '{entry}'"))?;
            let (source, url) = (source.trim(), url.trim());
            if source.is_empty() || url.is_empty() {
                return Err(format!("Invalid WEBHOOK_QUEUE_FORWARD entry '{entry}'"));
            }
            Ok((source.to_string(), url.to_string()))
        })
        .collect()
}

fn env_secs(key: &str, default: u64) -> Result<Duration, String> {
    env_or(key, &default.to_string())
        .parse()
        .map(Duration::from_secs)
        .map_err(|e| format!("Invalid {key}: {e}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
