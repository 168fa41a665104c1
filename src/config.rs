//! Application configuration.
//!
//! Environment variable loading with per-section `from_env()` and
//! `validate()`. A `.env` file is honored when present.

use std::env;
use std::time::Duration;

use crate::pricing::PricingConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pricing: PricingConfig,
    pub webhook: WebhookConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Webhook ingress settings. The secret signs every provider event.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub secret: String,
}

/// Background worker cadence and the seat-lock bounds.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub reminder_interval: Duration,
    pub reminder_lookahead: Duration,
    pub hold_sweep_interval: Duration,
    pub hold_ttl: Duration,
    pub seat_lock_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub queue_depth: usize,
    pub max_retries: u32,
}

impl AppConfig {
    /// Load configuration from environment variables (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            pricing: pricing_from_env()?,
            webhook: WebhookConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
            notifications: NotificationConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.webhook.validate()?;
        self.scheduler.validate()?;
        validate_pricing(&self.pricing)?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl WebhookConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(WebhookConfig {
            secret: env::var("WEBHOOK_SECRET")
                .map_err(|_| ConfigError::MissingVariable("WEBHOOK_SECRET".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < 16 {
            return Err(ConfigError::InvalidValue(
                "WEBHOOK_SECRET must be at least 16 characters".to_string(),
            ));
        }
        Ok(())
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(SchedulerConfig {
            reminder_interval: duration_var("REMINDER_INTERVAL_SECS", 900)?,
            reminder_lookahead: duration_var("REMINDER_LOOKAHEAD_SECS", 3600)?,
            hold_sweep_interval: duration_var("HOLD_SWEEP_INTERVAL_SECS", 60)?,
            hold_ttl: duration_var("HOLD_TTL_SECS", 300)?,
            seat_lock_timeout: duration_var_millis("SEAT_LOCK_TIMEOUT_MS", 500)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reminder_interval.is_zero() || self.hold_sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "worker intervals must be non-zero".to_string(),
            ));
        }
        if self.hold_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "HOLD_TTL_SECS must be non-zero".to_string(),
            ));
        }
        if self.seat_lock_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SEAT_LOCK_TIMEOUT_MS must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl NotificationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(NotificationConfig {
            queue_depth: env::var("NOTIFICATION_QUEUE_DEPTH")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("NOTIFICATION_QUEUE_DEPTH".to_string()))?,
            max_retries: env::var("NOTIFICATION_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("NOTIFICATION_MAX_RETRIES".to_string()))?,
        })
    }
}

fn pricing_from_env() -> Result<PricingConfig, ConfigError> {
    Ok(PricingConfig {
        tax_rate: env::var("PRICING_TAX_RATE")
            .unwrap_or_else(|_| "0.18".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PRICING_TAX_RATE".to_string()))?,
        fee_per_seat: env::var("PRICING_FEE_PER_SEAT")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PRICING_FEE_PER_SEAT".to_string()))?,
    })
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if !(0.0..1.0).contains(&pricing.tax_rate) {
        return Err(ConfigError::InvalidValue(
            "PRICING_TAX_RATE must be in [0, 1)".to_string(),
        ));
    }
    if pricing.fee_per_seat < 0 {
        return Err(ConfigError::InvalidValue(
            "PRICING_FEE_PER_SEAT must be non-negative".to_string(),
        ));
    }
    Ok(())
}

fn duration_var(name: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = env::var(name)
        .unwrap_or_else(|_| default_secs.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))?;
    Ok(Duration::from_secs(secs))
}

fn duration_var_millis(name: &str, default_millis: u64) -> Result<Duration, ConfigError> {
    let millis: u64 = env::var(name)
        .unwrap_or_else(|_| default_millis.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))?;
    Ok(Duration::from_millis(millis))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
