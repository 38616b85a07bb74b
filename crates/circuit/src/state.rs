//! Persisted circuit breaker state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ssusd_core::{Address, Amount};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CircuitStatus {
    #[default]
    Closed,
    Open,
}

/// Who opened a module circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TripSource {
    /// Operator trip; stays open until reset
    Manual,
    /// Failure threshold reached; closes at `recovery_time`
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCircuitState {
    pub module_name: String,
    #[serde(default)]
    pub status: CircuitStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub tripped_by: Option<TripSource>,
    #[serde(default)]
    pub tripped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_count: u64,
    pub failure_threshold: u64,
    #[serde(default)]
    pub recovery_time: Option<DateTime<Utc>>,
    /// Empty while open means every message of the module is blocked
    #[serde(default)]
    pub disabled_messages: Vec<String>,
}

impl ModuleCircuitState {
    pub fn new(module_name: &str, failure_threshold: u64) -> Self {
        Self {
            module_name: module_name.to_string(),
            status: CircuitStatus::Closed,
            reason: String::new(),
            tripped_by: None,
            tripped_at: None,
            failure_count: 0,
            failure_threshold,
            recovery_time: None,
            disabled_messages: Vec::new(),
        }
    }

    /// An automatic trip whose recovery time has passed
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CircuitStatus::Open
            && self.tripped_by == Some(TripSource::Automatic)
            && self.recovery_time.is_some_and(|t| now >= t)
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CircuitStatus::Open && !self.is_expired_at(now)
    }

    /// Whether an open circuit blocks `msg_type`
    pub fn blocks(&self, msg_type: &str) -> bool {
        self.disabled_messages.is_empty() || self.disabled_messages.iter().any(|m| m == msg_type)
    }

    pub(crate) fn open(
        &mut self,
        source: TripSource,
        reason: &str,
        now: DateTime<Utc>,
        recovery_time: Option<DateTime<Utc>>,
        disabled_messages: Vec<String>,
    ) {
        self.status = CircuitStatus::Open;
        self.reason = reason.to_string();
        self.tripped_by = Some(source);
        self.tripped_at = Some(now);
        self.recovery_time = recovery_time;
        self.disabled_messages = disabled_messages;
    }

    pub(crate) fn close(&mut self) {
        self.status = CircuitStatus::Closed;
        self.reason.clear();
        self.tripped_by = None;
        self.tripped_at = None;
        self.recovery_time = None;
        self.failure_count = 0;
        self.disabled_messages.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPauseState {
    pub paused: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub paused_by: Option<Address>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    /// `None` pauses until an explicit resume
    #[serde(default)]
    pub auto_resume_at: Option<DateTime<Utc>>,
}

impl GlobalPauseState {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.paused && self.auto_resume_at.is_some_and(|t| now >= t)
    }

    pub fn is_paused_at(&self, now: DateTime<Utc>) -> bool {
        self.paused && !self.is_expired_at(now)
    }
}

/// Fixed-window counter of one rate limit bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    /// `name` or `name:address`
    pub key: String,
    pub count: u64,
    pub window_start: DateTime<Utc>,
}

impl RateLimitState {
    pub fn new(key: String, now: DateTime<Utc>) -> Self {
        Self {
            key,
            count: 0,
            window_start: now,
        }
    }

    /// Counter as seen at `now`, restarted if the window has elapsed
    pub fn at(mut self, now: DateTime<Utc>, window_seconds: u64) -> Self {
        let elapsed = now.signed_duration_since(self.window_start).num_seconds();
        if elapsed < 0 || elapsed as u64 >= window_seconds {
            self.count = 0;
            self.window_start = now;
        }
        self
    }
}

/// Per-block liquidation throttle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationSurgeProtection {
    #[serde(default = "default_max_per_block")]
    pub max_per_block: u64,
    #[serde(default = "default_max_value")]
    pub max_value: Amount,
    #[serde(default)]
    pub cooldown_blocks: u64,
    #[serde(default)]
    pub current_count: u64,
    #[serde(default)]
    pub current_value: Amount,
    #[serde(default)]
    pub last_reset_height: u64,
    #[serde(default)]
    pub cooldown_until_height: u64,
}

fn default_max_per_block() -> u64 {
    10
}

fn default_max_value() -> Amount {
    Amount::from(1_000_000_000_000u64)
}

impl Default for LiquidationSurgeProtection {
    fn default() -> Self {
        Self {
            max_per_block: default_max_per_block(),
            max_value: default_max_value(),
            cooldown_blocks: 0,
            current_count: 0,
            current_value: Amount::ZERO,
            last_reset_height: 0,
            cooldown_until_height: 0,
        }
    }
}

impl LiquidationSurgeProtection {
    /// Counters as seen at `height`
    pub fn at_height(mut self, height: u64) -> Self {
        if self.last_reset_height != height {
            self.current_count = 0;
            self.current_value = Amount::ZERO;
            self.last_reset_height = height;
        }
        self
    }

    pub fn in_cooldown(&self, height: u64) -> bool {
        height < self.cooldown_until_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_automatic_trip_expires() {
        let mut state = ModuleCircuitState::new("stablecoin", 5);
        state.open(
            TripSource::Automatic,
            "failures",
            t0(),
            Some(t0() + Duration::seconds(300)),
            vec![],
        );
        assert!(state.is_open_at(t0() + Duration::seconds(299)));
        assert!(!state.is_open_at(t0() + Duration::seconds(300)));

        state.open(TripSource::Manual, "ops", t0(), None, vec![]);
        assert!(state.is_open_at(t0() + Duration::days(365)));
    }

    #[test]
    fn test_disabled_messages() {
        let mut state = ModuleCircuitState::new("stablecoin", 5);
        assert!(state.blocks("/ssusd.stablecoin.v1.MsgMintStablecoin"));
        state.disabled_messages = vec!["/ssusd.stablecoin.v1.MsgMintStablecoin".to_string()];
        assert!(state.blocks("/ssusd.stablecoin.v1.MsgMintStablecoin"));
        assert!(!state.blocks("/ssusd.stablecoin.v1.MsgRepayStablecoin"));
    }

    #[test]
    fn test_rate_window_restart() {
        let mut state = RateLimitState::new("global_tx".to_string(), t0());
        state.count = 7;
        let same = state.clone().at(t0() + Duration::seconds(59), 60);
        assert_eq!(same.count, 7);
        let next = state.at(t0() + Duration::seconds(60), 60);
        assert_eq!(next.count, 0);
        assert_eq!(next.window_start, t0() + Duration::seconds(60));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TripSource::Automatic.to_string(), "automatic");
        assert_eq!("open".parse::<CircuitStatus>().unwrap(), CircuitStatus::Open);
    }
}
