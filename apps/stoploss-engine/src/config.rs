//! Engine configuration parsed from the environment.
//!
//! Credentials are required; everything else has a conservative default.
//! Parsing goes through a lookup closure so tests never touch process-global
//! environment variables.

use std::time::Duration;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::engine::driver::PollLoopConfig;
use crate::engine::state_machine::StopLossStateMachine;
use crate::infrastructure::broker::dhan::DhanConfig;
use crate::infrastructure::quotes::YahooConfig;

/// Configuration error. Fatal at startup; the engine never runs half
/// configured.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required credential variable is missing or empty.
    #[error("missing required credential: {name}")]
    MissingCredential {
        /// Variable name.
        name: String,
    },

    /// A variable was set to something unparseable or out of range.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// The offending value.
        value: String,
    },
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Dhan client ID.
    pub client_id: String,
    /// Dhan access token.
    pub access_token: String,
    /// Negative percentage threshold (e.g. `-6.5`).
    pub stop_loss_limit: Decimal,
    /// Whether a breach liquidates automatically or only alerts.
    pub auto_sell: bool,
    /// In alert-only mode, alert once per breach episode instead of every
    /// cycle.
    pub alert_once: bool,
    /// Delay between cycle starts.
    pub interval: Duration,
    /// Wall-clock ceiling for the run.
    pub run_duration: Duration,
    /// Local time of day after which no new cycle starts.
    pub session_cutoff: Option<NaiveTime>,
    /// Consecutive fetch failures that open the circuit.
    pub failure_ceiling: u32,
    /// Delay between order submissions during liquidation.
    pub order_pacing: Duration,
    /// Suffix appended to symbols for the primary quote provider.
    pub quote_suffix: String,
    /// Dhan API base URL.
    pub dhan_base_url: String,
}

impl EngineConfig {
    /// Parse configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse configuration through a lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_id = required(&lookup, "DHAN_CLIENT_ID")?;
        let access_token = required(&lookup, "DHAN_ACCESS_TOKEN")?;

        // -6.5%
        let stop_loss_limit = parse_or(&lookup, "STOP_LOSS_LIMIT", Decimal::new(-65, 1))?;
        if stop_loss_limit >= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                name: "STOP_LOSS_LIMIT".to_string(),
                value: stop_loss_limit.to_string(),
            });
        }

        let interval_secs: u64 = parse_or(&lookup, "UPDATE_INTERVAL_SECS", 30)?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "UPDATE_INTERVAL_SECS".to_string(),
                value: "0".to_string(),
            });
        }

        let duration_minutes: u64 = parse_or(&lookup, "RUN_DURATION_MINUTES", 360)?;

        let failure_ceiling: u32 = parse_or(&lookup, "MAX_CONSECUTIVE_FAILURES", 10)?;
        if failure_ceiling == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_CONSECUTIVE_FAILURES".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            client_id,
            access_token,
            stop_loss_limit,
            auto_sell: parse_bool_or(&lookup, "AUTO_SELL_ENABLED", false)?,
            alert_once: parse_bool_or(&lookup, "ALERT_ONCE", false)?,
            interval: Duration::from_secs(interval_secs),
            run_duration: Duration::from_secs(duration_minutes * 60),
            session_cutoff: parse_cutoff(&lookup)?,
            failure_ceiling,
            order_pacing: Duration::from_millis(parse_or(&lookup, "ORDER_PACING_MS", 500)?),
            quote_suffix: lookup("QUOTE_SUFFIX").unwrap_or_else(|| ".NS".to_string()),
            dhan_base_url: lookup("DHAN_BASE_URL")
                .unwrap_or_else(|| DhanConfig::DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Iteration ceiling derived from the run duration and interval.
    #[must_use]
    pub fn max_iterations(&self) -> u64 {
        (self.run_duration.as_secs() / self.interval.as_secs()).max(1)
    }

    /// Poll loop bounds.
    #[must_use]
    pub fn poll_loop(&self) -> PollLoopConfig {
        PollLoopConfig {
            interval: self.interval,
            max_iterations: self.max_iterations(),
            max_duration: self.run_duration,
            session_cutoff: self.session_cutoff,
            order_pacing: self.order_pacing,
        }
    }

    /// Stop-loss decision rules.
    #[must_use]
    pub fn state_machine(&self) -> StopLossStateMachine {
        StopLossStateMachine::new(
            self.stop_loss_limit,
            self.auto_sell,
            self.alert_once,
            self.failure_ceiling,
        )
    }

    /// Dhan adapter config.
    #[must_use]
    pub fn dhan(&self) -> DhanConfig {
        DhanConfig::new(self.client_id.clone(), self.access_token.clone())
            .with_base_url(self.dhan_base_url.clone())
    }

    /// Yahoo provider config.
    #[must_use]
    pub fn yahoo(&self) -> YahooConfig {
        YahooConfig {
            symbol_suffix: self.quote_suffix.clone(),
            ..YahooConfig::default()
        }
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, ConfigError> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingCredential {
            name: name.to_string(),
        })
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
            }),
        },
    }
}

fn parse_cutoff(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<NaiveTime>, ConfigError> {
    // NSE equities close at 15:30 IST.
    let raw = lookup("SESSION_CUTOFF").unwrap_or_else(|| "15:30".to_string());
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            name: "SESSION_CUTOFF".to_string(),
            value: raw,
        })
}
