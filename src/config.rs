//! Engine and server configuration
//!
//! `RetroplanConfig` is built once per run: defaults, then the user's
//! profile, then explicit caller overrides. It is never mutated afterwards.

use crate::error::RetroplanError;
use crate::models::UserProfile;
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;

// Weekly time budget
pub const HOURS_PER_WEEK: f64 = 168.0;
pub const SLEEP_HOURS_PER_WEEK: f64 = 56.0;
pub const PERSONAL_BUFFER_HOURS_PER_WEEK: f64 = 21.0;

// Target bands as a share of a week's earning potential
pub const RECOMMENDED_TARGET_RATIO: f64 = 0.7;
pub const MINIMUM_TARGET_RATIO: f64 = 0.3;

/// Exam weeks without a critical event may carry up to this multiple of their minimum
pub const EXAM_ONLY_CAP_RATIO: f64 = 1.5;

/// Largest single front-loading transfer, in currency units
pub const MAX_TRANSFER_PER_WEEK: f64 = 50.0;

// Energy prediction
pub const MIN_ENERGY_ENTRIES: usize = 4;
pub const ENERGY_WINDOW: usize = 8;
pub const NEUTRAL_ENERGY_SCORE: f64 = 3.0;
pub const EXAM_ENERGY_FACTOR: f64 = 0.8;
pub const MIN_ENERGY_MULTIPLIER: f64 = 0.5;
pub const MAX_ENERGY_MULTIPLIER: f64 = 1.5;

const DEFAULT_HOURLY_RATE: f64 = 15.0;
const DEFAULT_MAX_HOURS_PER_WEEK: f64 = 20.0;
const DEFAULT_MIN_HOURS_PER_WEEK: f64 = 5.0;
const DEFAULT_BUFFER_WEEKS: u32 = 1;
const DEFAULT_BUFFER_PERCENTAGE: f64 = 0.10;
const DEFAULT_EXAM_CAPACITY_MULTIPLIER: f64 = 0.2;
const DEFAULT_PRE_EXAM_PROTECTED_WEEKS: u32 = 1;
const DEFAULT_CATCH_UP_MULTIPLIER: f64 = 1.5;
const DEFAULT_CATCH_UP_SPREAD_WEEKS: u32 = 3;

/// Snapshot of every knob used by one retroplan run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetroplanConfig {
    pub goal_amount: f64,
    pub deadline: NaiveDate,
    pub default_hourly_rate: f64,
    pub max_hours_per_week: f64,
    pub min_hours_per_week: f64,
    /// Trailing weeks treated as slack when reporting buffer utilization
    pub buffer_weeks: u32,
    /// Safety margin added to the goal before distribution
    pub buffer_percentage: f64,
    /// Academic multiplier applied for exam periods
    pub exam_capacity_multiplier: f64,
    /// Weeks before an exam that never receive front-loaded money
    pub pre_exam_protected_weeks: u32,
    pub catch_up_multiplier: f64,
    pub catch_up_spread_weeks: u32,
}

/// Caller-supplied partial config; `None` keeps the default
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub default_hourly_rate: Option<f64>,
    #[serde(default)]
    pub max_hours_per_week: Option<f64>,
    #[serde(default)]
    pub min_hours_per_week: Option<f64>,
    #[serde(default)]
    pub buffer_weeks: Option<u32>,
    #[serde(default)]
    pub buffer_percentage: Option<f64>,
    #[serde(default)]
    pub exam_capacity_multiplier: Option<f64>,
    #[serde(default)]
    pub pre_exam_protected_weeks: Option<u32>,
    #[serde(default)]
    pub catch_up_multiplier: Option<f64>,
    #[serde(default)]
    pub catch_up_spread_weeks: Option<u32>,
}

impl RetroplanConfig {
    pub fn new(goal_amount: f64, deadline: NaiveDate) -> Self {
        Self {
            goal_amount,
            deadline,
            default_hourly_rate: DEFAULT_HOURLY_RATE,
            max_hours_per_week: DEFAULT_MAX_HOURS_PER_WEEK,
            min_hours_per_week: DEFAULT_MIN_HOURS_PER_WEEK,
            buffer_weeks: DEFAULT_BUFFER_WEEKS,
            buffer_percentage: DEFAULT_BUFFER_PERCENTAGE,
            exam_capacity_multiplier: DEFAULT_EXAM_CAPACITY_MULTIPLIER,
            pre_exam_protected_weeks: DEFAULT_PRE_EXAM_PROTECTED_WEEKS,
            catch_up_multiplier: DEFAULT_CATCH_UP_MULTIPLIER,
            catch_up_spread_weeks: DEFAULT_CATCH_UP_SPREAD_WEEKS,
        }
    }

    /// Profile values sit between the defaults and explicit overrides
    pub fn with_profile(mut self, profile: &UserProfile) -> Self {
        if let Some(rate) = profile.default_hourly_rate {
            self.default_hourly_rate = rate;
        }
        if let Some(hours) = profile.available_hours {
            self.max_hours_per_week = hours;
        }
        self
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(v) = overrides.default_hourly_rate {
            self.default_hourly_rate = v;
        }
        if let Some(v) = overrides.max_hours_per_week {
            self.max_hours_per_week = v;
        }
        if let Some(v) = overrides.min_hours_per_week {
            self.min_hours_per_week = v;
        }
        if let Some(v) = overrides.buffer_weeks {
            self.buffer_weeks = v;
        }
        if let Some(v) = overrides.buffer_percentage {
            self.buffer_percentage = v;
        }
        if let Some(v) = overrides.exam_capacity_multiplier {
            self.exam_capacity_multiplier = v;
        }
        if let Some(v) = overrides.pre_exam_protected_weeks {
            self.pre_exam_protected_weeks = v;
        }
        if let Some(v) = overrides.catch_up_multiplier {
            self.catch_up_multiplier = v;
        }
        if let Some(v) = overrides.catch_up_spread_weeks {
            self.catch_up_spread_weeks = v;
        }
        self
    }

    /// Reject values that would make the arithmetic meaningless
    pub fn validate(&self) -> Result<()> {
        if !self.goal_amount.is_finite() || self.goal_amount <= 0.0 {
            return Err(RetroplanError::InvalidInput(format!(
                "goal amount must be positive, got {}",
                self.goal_amount
            )));
        }
        if !self.default_hourly_rate.is_finite() || self.default_hourly_rate <= 0.0 {
            return Err(RetroplanError::InvalidInput(format!(
                "hourly rate must be positive, got {}",
                self.default_hourly_rate
            )));
        }
        let knobs = [
            ("min_hours_per_week", self.min_hours_per_week),
            ("max_hours_per_week", self.max_hours_per_week),
            ("buffer_percentage", self.buffer_percentage),
            ("exam_capacity_multiplier", self.exam_capacity_multiplier),
            ("catch_up_multiplier", self.catch_up_multiplier),
        ];
        if let Some((name, value)) = knobs.iter().find(|(_, value)| !value.is_finite()) {
            return Err(RetroplanError::InvalidInput(format!(
                "{} must be a finite number, got {}",
                name, value
            )));
        }
        if self.min_hours_per_week < 0.0 || self.max_hours_per_week <= 0.0 {
            return Err(RetroplanError::InvalidInput(
                "weekly hour limits must be positive".to_string(),
            ));
        }
        if self.min_hours_per_week > self.max_hours_per_week {
            return Err(RetroplanError::InvalidInput(format!(
                "min_hours_per_week ({}) exceeds max_hours_per_week ({})",
                self.min_hours_per_week, self.max_hours_per_week
            )));
        }
        if self.buffer_percentage < 0.0 || self.catch_up_multiplier < 1.0 {
            return Err(RetroplanError::InvalidInput(
                "buffer_percentage must be >= 0 and catch_up_multiplier >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .or_else(|_| env::var("API_PORT"))
            .unwrap_or_else(|_| "8080".to_string());

        let port = port.parse::<u16>().map_err(|e| {
            RetroplanError::InvalidInput(format!("invalid port '{}': {}", port, e))
        })?;

        let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Self { bind_address, port })
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deadline() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn test_overrides_layer_on_profile() {
        let profile = UserProfile {
            default_hourly_rate: Some(18.0),
            available_hours: Some(12.0),
        };
        let overrides = ConfigOverrides {
            default_hourly_rate: Some(22.0),
            catch_up_spread_weeks: Some(5),
            ..Default::default()
        };

        let config = RetroplanConfig::new(800.0, deadline())
            .with_profile(&profile)
            .with_overrides(&overrides);

        assert_eq!(config.default_hourly_rate, 22.0);
        assert_eq!(config.max_hours_per_week, 12.0);
        assert_eq!(config.catch_up_spread_weeks, 5);
        assert_eq!(config.catch_up_multiplier, DEFAULT_CATCH_UP_MULTIPLIER);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = RetroplanConfig::new(800.0, deadline());
        assert!(base.validate().is_ok());

        let mut bad = base.clone();
        bad.goal_amount = -1.0;
        assert!(bad.validate().is_err());

        let mut bad = base.clone();
        bad.min_hours_per_week = 30.0;
        assert!(bad.validate().is_err());

        let mut bad = base.clone();
        bad.default_hourly_rate = f64::NAN;
        assert!(bad.validate().is_err());

        for field in 0..5 {
            let mut bad = base.clone();
            match field {
                0 => bad.max_hours_per_week = f64::NAN,
                1 => bad.min_hours_per_week = f64::NAN,
                2 => bad.buffer_percentage = f64::INFINITY,
                3 => bad.exam_capacity_multiplier = f64::NAN,
                _ => bad.catch_up_multiplier = f64::NAN,
            }
            assert!(
                matches!(bad.validate(), Err(RetroplanError::InvalidInput(_))),
                "field {} accepted a non-finite value",
                field
            );
        }
    }

    #[test]
    fn test_nan_available_hours_is_rejected() {
        let profile = UserProfile {
            default_hourly_rate: None,
            available_hours: Some(f64::NAN),
        };
        let config = RetroplanConfig::new(800.0, deadline()).with_profile(&profile);
        assert!(matches!(config.validate(), Err(RetroplanError::InvalidInput(_))));
    }

    #[test]
    fn test_socket_address() {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 9000,
        };
        assert_eq!(config.socket_address(), "127.0.0.1:9000");
    }
}
