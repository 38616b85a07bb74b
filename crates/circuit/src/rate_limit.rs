//! Fixed-window rate limits
//!
//! Each config counts requests in buckets keyed by `name`, or by
//! `name:address` for per-address limits. A window restarts once
//! `window_seconds` have elapsed since it opened.

use chrono::{DateTime, Utc};
use ssusd_core::Address;
use ssusd_store::Context;
use tracing::{trace, warn};

use crate::error::{CircuitError, CircuitResult};
use crate::keeper::CircuitBreaker;
use crate::keys::{RATE_LIMIT_STATE, STORE_KEY};
use crate::params::RateLimitConfig;
use crate::state::RateLimitState;

/// Bucket key of `config` for `sender`
pub fn bucket_key(config: &RateLimitConfig, sender: &Address) -> String {
    if config.per_address {
        format!("{}:{}", config.name, sender)
    } else {
        config.name.clone()
    }
}

impl CircuitBreaker {
    pub fn rate_limit_state(&self, ctx: &Context, key: &str) -> CircuitResult<Option<RateLimitState>> {
        Ok(ctx.get(&STORE_KEY.str_key(RATE_LIMIT_STATE, key))?)
    }

    pub fn rate_limit_states(&self, ctx: &Context) -> CircuitResult<Vec<RateLimitState>> {
        Ok(ctx.scan_values(&STORE_KEY.key(RATE_LIMIT_STATE))?)
    }

    pub(crate) fn save_rate_limit_state(&self, ctx: &mut Context, state: &RateLimitState) -> CircuitResult<()> {
        ctx.set(&STORE_KEY.str_key(RATE_LIMIT_STATE, &state.key), state)?;
        Ok(())
    }

    /// Count one `msg_type` request from `sender` against `config`
    pub fn check_rate_limit(
        &self,
        ctx: &mut Context,
        config: &RateLimitConfig,
        sender: &Address,
        msg_type: &str,
    ) -> CircuitResult<()> {
        if !config.applies_to(msg_type) {
            return Ok(());
        }
        let now = ctx.block_time();
        let charged = self.charge(ctx, config, sender, now)?;
        self.save_rate_limit_state(ctx, &charged)
    }

    /// Count one request against every applicable limit. Nothing is
    /// counted unless all of them have room.
    pub fn check_all_rate_limits(&self, ctx: &mut Context, msg_type: &str, sender: &Address) -> CircuitResult<()> {
        let now = ctx.block_time();
        let params = self.params(ctx)?;

        let mut charged = Vec::new();
        for config in params.rate_limits.iter().filter(|c| c.applies_to(msg_type)) {
            charged.push(self.charge(ctx, config, sender, now)?);
        }
        for state in &charged {
            self.save_rate_limit_state(ctx, state)?;
        }
        Ok(())
    }

    /// Bucket state after one more request, or `RateLimitExceeded`
    fn charge(
        &self,
        ctx: &Context,
        config: &RateLimitConfig,
        sender: &Address,
        now: DateTime<Utc>,
    ) -> CircuitResult<RateLimitState> {
        let key = bucket_key(config, sender);
        let mut state = self
            .rate_limit_state(ctx, &key)?
            .unwrap_or_else(|| RateLimitState::new(key, now))
            .at(now, config.window_seconds);

        if state.count >= config.max_requests {
            warn!(
                limit = %config.name,
                sender = %sender,
                count = state.count,
                "rejected: rate limit exceeded"
            );
            return Err(CircuitError::RateLimitExceeded {
                name: config.name.clone(),
                max_requests: config.max_requests,
                window_seconds: config.window_seconds,
            });
        }
        state.count += 1;
        trace!(bucket = %state.key, count = state.count, "rate limit charged");
        Ok(state)
    }
}
