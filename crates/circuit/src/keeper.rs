//! Circuit Breaker - global pause and per-module circuits
//!
//! Expiry is evaluated lazily on every read, so a lapsed pause or an
//! automatic trip past its recovery time never blocks anything.
//! `sweep_expired` runs once per block to persist those transitions and
//! emit the matching events.

use chrono::{DateTime, Duration, Utc};
use ssusd_core::{Address, Authority, AuthorityGuard, CircuitOperator, Event, Governance};
use ssusd_store::Context;
use tracing::{debug, info, warn};

use crate::error::{CircuitError, CircuitResult};
use crate::keys::{GLOBAL_STATE, MODULE_CIRCUIT, PARAMS, STORE_KEY};
use crate::params::CircuitParams;
use crate::state::{GlobalPauseState, ModuleCircuitState, TripSource};

pub struct CircuitBreaker {
    governance: Address,
}

impl CircuitBreaker {
    pub fn new(governance: Address) -> Self {
        Self { governance }
    }

    pub fn governance(&self) -> &Address {
        &self.governance
    }

    // === Authority ===

    /// Governance or any address listed in `params.authorities`
    pub fn authorize(&self, ctx: &Context, caller: &Address) -> CircuitResult<Authority<CircuitOperator>> {
        let params = self.params(ctx)?;
        let guard = AuthorityGuard::new(self.governance.clone()).with_operators(params.authorities);
        Ok(guard.authorize_operator(caller)?)
    }

    pub fn authorize_governance(&self, caller: &Address) -> CircuitResult<Authority<Governance>> {
        Ok(AuthorityGuard::new(self.governance.clone()).authorize_governance(caller)?)
    }

    // === Params ===

    pub fn params(&self, ctx: &Context) -> CircuitResult<CircuitParams> {
        Ok(ctx.get(&STORE_KEY.key(PARAMS))?.unwrap_or_default())
    }

    pub fn set_params(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        params: CircuitParams,
    ) -> CircuitResult<()> {
        params.validate()?;
        self.store_params(ctx, &params)?;
        info!(
            authority = %authority.address(),
            failure_threshold = params.default_failure_threshold,
            rate_limits = params.rate_limits.len(),
            "circuit params updated"
        );
        Ok(())
    }

    pub(crate) fn store_params(&self, ctx: &mut Context, params: &CircuitParams) -> CircuitResult<()> {
        ctx.set(&STORE_KEY.key(PARAMS), params)?;
        Ok(())
    }

    // === Global pause ===

    /// Stored pause record, which may have lapsed
    pub fn global_state(&self, ctx: &Context) -> CircuitResult<GlobalPauseState> {
        Ok(ctx.get(&STORE_KEY.key(GLOBAL_STATE))?.unwrap_or_default())
    }

    pub(crate) fn save_global_state(&self, ctx: &mut Context, state: &GlobalPauseState) -> CircuitResult<()> {
        ctx.set(&STORE_KEY.key(GLOBAL_STATE), state)?;
        Ok(())
    }

    pub fn is_globally_paused(&self, ctx: &Context) -> CircuitResult<bool> {
        Ok(self.global_state(ctx)?.is_paused_at(ctx.block_time()))
    }

    /// Pause every gated message. A zero `duration_secs` pauses until resumed.
    pub fn pause_system(
        &self,
        ctx: &mut Context,
        authority: &Authority<CircuitOperator>,
        reason: &str,
        duration_secs: u64,
    ) -> CircuitResult<()> {
        let now = ctx.block_time();
        if self.global_state(ctx)?.is_paused_at(now) {
            return Err(CircuitError::AlreadyPaused);
        }
        let max = self.params(ctx)?.max_pause_duration_secs;
        if duration_secs > max {
            return Err(CircuitError::InvalidDuration {
                requested: duration_secs,
                max,
            });
        }
        let auto_resume_at = match duration_secs {
            0 => None,
            secs => Some(after(now, secs)?),
        };

        let state = GlobalPauseState {
            paused: true,
            reason: reason.to_string(),
            paused_by: Some(authority.address().clone()),
            paused_at: Some(now),
            auto_resume_at,
        };
        self.save_global_state(ctx, &state)?;

        warn!(
            paused_by = %authority.address(),
            reason,
            duration_secs,
            "system paused"
        );
        ctx.emit(Event::SystemPaused {
            paused_by: authority.address().clone(),
            reason: reason.to_string(),
            auto_resume_at,
        });
        Ok(())
    }

    pub fn resume_system(&self, ctx: &mut Context, authority: &Authority<CircuitOperator>) -> CircuitResult<()> {
        if !self.global_state(ctx)?.is_paused_at(ctx.block_time()) {
            return Err(CircuitError::NotPaused);
        }
        self.save_global_state(ctx, &GlobalPauseState::default())?;

        info!(resumed_by = %authority.address(), "system resumed");
        ctx.emit(Event::SystemResumed {
            resumed_by: Some(authority.address().clone()),
        });
        Ok(())
    }

    // === Module circuits ===

    pub fn module_circuit(&self, ctx: &Context, module: &str) -> CircuitResult<Option<ModuleCircuitState>> {
        Ok(ctx.get(&STORE_KEY.str_key(MODULE_CIRCUIT, module))?)
    }

    pub fn module_circuits(&self, ctx: &Context) -> CircuitResult<Vec<ModuleCircuitState>> {
        Ok(ctx.scan_values(&STORE_KEY.key(MODULE_CIRCUIT))?)
    }

    pub(crate) fn save_module_circuit(&self, ctx: &mut Context, state: &ModuleCircuitState) -> CircuitResult<()> {
        ctx.set(&STORE_KEY.str_key(MODULE_CIRCUIT, &state.module_name), state)?;
        Ok(())
    }

    pub fn is_module_circuit_open(&self, ctx: &Context, module: &str) -> CircuitResult<bool> {
        let now = ctx.block_time();
        Ok(self
            .module_circuit(ctx, module)?
            .is_some_and(|state| state.is_open_at(now)))
    }

    /// Whether an open circuit of `module` blocks `msg_type`
    pub fn is_message_disabled(&self, ctx: &Context, module: &str, msg_type: &str) -> CircuitResult<bool> {
        let now = ctx.block_time();
        Ok(self
            .module_circuit(ctx, module)?
            .is_some_and(|state| state.is_open_at(now) && state.blocks(msg_type)))
    }

    /// Open `module`'s circuit until reset. An empty `disabled_messages`
    /// blocks every message of the module.
    pub fn trip_circuit(
        &self,
        ctx: &mut Context,
        authority: &Authority<CircuitOperator>,
        module: &str,
        reason: &str,
        disabled_messages: Vec<String>,
    ) -> CircuitResult<()> {
        let now = ctx.block_time();
        let mut state = self.load_or_new(ctx, module)?;
        state.open(TripSource::Manual, reason, now, None, disabled_messages.clone());
        self.save_module_circuit(ctx, &state)?;

        warn!(
            module,
            reason,
            tripped_by = %authority.address(),
            disabled = disabled_messages.len(),
            "circuit tripped"
        );
        ctx.emit(Event::CircuitTripped {
            module: module.to_string(),
            reason: reason.to_string(),
            tripped_by: TripSource::Manual.to_string(),
            disabled_messages,
        });
        Ok(())
    }

    pub fn reset_circuit(
        &self,
        ctx: &mut Context,
        authority: &Authority<CircuitOperator>,
        module: &str,
    ) -> CircuitResult<()> {
        let mut state = self
            .module_circuit(ctx, module)?
            .ok_or_else(|| CircuitError::ModuleNotFound(module.to_string()))?;
        state.close();
        self.save_module_circuit(ctx, &state)?;

        info!(module, reset_by = %authority.address(), "circuit reset");
        ctx.emit(Event::CircuitReset {
            module: module.to_string(),
            reset_by: Some(authority.address().clone()),
        });
        Ok(())
    }

    /// Count a collaborator failure in `module`; returns true when this
    /// failure tripped the circuit. A closed circuit takes the current
    /// `default_failure_threshold` before counting.
    pub fn record_failure(&self, ctx: &mut Context, module: &str) -> CircuitResult<bool> {
        let now = ctx.block_time();
        let params = self.params(ctx)?;
        let mut state = self.load_or_new(ctx, module)?;
        if state.is_expired_at(now) {
            state.close();
        }
        if !state.is_open_at(now) {
            state.failure_threshold = params.default_failure_threshold;
        }

        state.failure_count = state.failure_count.saturating_add(1);
        let trips = !state.is_open_at(now) && state.failure_count >= state.failure_threshold;
        if trips {
            let recovery_time = after(now, params.default_recovery_period_secs)?;
            state.open(
                TripSource::Automatic,
                "failure threshold exceeded",
                now,
                Some(recovery_time),
                Vec::new(),
            );
        }
        self.save_module_circuit(ctx, &state)?;

        if trips {
            warn!(
                module,
                failures = state.failure_count,
                recovery_time = %state.recovery_time.unwrap_or(now),
                "circuit tripped automatically"
            );
            ctx.emit(Event::CircuitTripped {
                module: module.to_string(),
                reason: state.reason.clone(),
                tripped_by: TripSource::Automatic.to_string(),
                disabled_messages: Vec::new(),
            });
        } else {
            debug!(module, failures = state.failure_count, "failure recorded");
        }
        Ok(trips)
    }

    /// Clear the failure count of a closed circuit
    pub fn record_success(&self, ctx: &mut Context, module: &str) -> CircuitResult<()> {
        let now = ctx.block_time();
        if let Some(mut state) = self.module_circuit(ctx, module)? {
            if state.failure_count > 0 && !state.is_open_at(now) {
                state.failure_count = 0;
                self.save_module_circuit(ctx, &state)?;
            }
        }
        Ok(())
    }

    fn load_or_new(&self, ctx: &Context, module: &str) -> CircuitResult<ModuleCircuitState> {
        match self.module_circuit(ctx, module)? {
            Some(state) => Ok(state),
            None => Ok(ModuleCircuitState::new(
                module,
                self.params(ctx)?.default_failure_threshold,
            )),
        }
    }

    /// Persist lapsed pauses and recovered automatic trips
    pub fn sweep_expired(&self, ctx: &mut Context) -> CircuitResult<()> {
        let now = ctx.block_time();

        if self.global_state(ctx)?.is_expired_at(now) {
            self.save_global_state(ctx, &GlobalPauseState::default())?;
            info!("global pause expired, system resumed");
            ctx.emit(Event::SystemResumed { resumed_by: None });
        }

        for mut state in self.module_circuits(ctx)? {
            if !state.is_expired_at(now) {
                continue;
            }
            state.close();
            self.save_module_circuit(ctx, &state)?;
            info!(module = %state.module_name, "circuit recovered");
            ctx.emit(Event::CircuitReset {
                module: state.module_name.clone(),
                reset_by: None,
            });
        }
        Ok(())
    }

    // === Gate ===

    /// Global pause, then the module circuit, then every rate limit
    /// covering `msg_type`. Charges the rate limits only when all pass.
    pub fn check_circuit_breakers(
        &self,
        ctx: &mut Context,
        module: &str,
        msg_type: &str,
        sender: &Address,
    ) -> CircuitResult<()> {
        let now = ctx.block_time();

        let global = self.global_state(ctx)?;
        if global.is_paused_at(now) {
            warn!(module, msg_type, sender = %sender, reason = %global.reason, "rejected: system paused");
            return Err(CircuitError::GlobalPause {
                reason: global.reason,
                auto_resume_at: global.auto_resume_at,
            });
        }

        if self.is_message_disabled(ctx, module, msg_type)? {
            warn!(module, msg_type, sender = %sender, "rejected: circuit open");
            return Err(CircuitError::CircuitOpen {
                module: module.to_string(),
                msg_type: msg_type.to_string(),
            });
        }

        self.check_all_rate_limits(ctx, msg_type, sender)
    }
}

/// `now + secs`, failing on out-of-range durations
pub(crate) fn after(now: DateTime<Utc>, secs: u64) -> CircuitResult<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| CircuitError::InvalidParams(format!("duration {secs}s out of range")))
}
