//! Redemption queue of the reserve engine
//!
//! ssUSD is burned when a redemption is requested and the reserve asset it
//! buys is locked until the request executes or governance cancels it.
//! Locked assets drop out of the reserve value at the same moment the burned
//! ssUSD drops out of the minted total, so a pending request leaves the
//! reserve ratio as if it had already executed.
//! Executed payouts are charged against reserve deposits oldest first.

use chrono::Duration;
use ssusd_core::{Address, Amount, Authority, Coin, Coins, Denom, Event, Governance};
use ssusd_store::Context;
use tracing::info;

use crate::error::{StablecoinError, StablecoinResult};
use crate::keys::{NEXT_REDEMPTION_ID, REDEMPTION_REQUEST, STORE_KEY};
use crate::reserve::{check_daily_limit, ReserveEngine};
use crate::types::{DepositStatus, RedemptionRequest, RedemptionStatus, ReserveDeposit};
use crate::MODULE_NAME;

impl ReserveEngine {
    pub fn redemption(&self, ctx: &Context, id: u64) -> StablecoinResult<RedemptionRequest> {
        ctx.get(&STORE_KEY.id_key(REDEMPTION_REQUEST, id))?
            .ok_or(StablecoinError::RedemptionNotFound(id))
    }

    pub fn redemptions(&self, ctx: &Context) -> StablecoinResult<Vec<RedemptionRequest>> {
        Ok(ctx.scan_values(&STORE_KEY.key(REDEMPTION_REQUEST))?)
    }

    pub fn pending_redemptions(&self, ctx: &Context) -> StablecoinResult<Vec<RedemptionRequest>> {
        Ok(self
            .redemptions(ctx)?
            .into_iter()
            .filter(RedemptionRequest::is_pending)
            .collect())
    }

    pub fn next_redemption_id(&self, ctx: &Context) -> StablecoinResult<u64> {
        Ok(ctx.get(&STORE_KEY.key(NEXT_REDEMPTION_ID))?.unwrap_or(1))
    }

    pub(crate) fn save_redemption(&self, ctx: &mut Context, request: &RedemptionRequest) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.id_key(REDEMPTION_REQUEST, request.id), request)?;
        Ok(())
    }

    /// Burn `ssusd_amount` and queue a payout in `output_denom`.
    /// Executes in the same call when the redemption delay is zero.
    pub fn request_redemption(
        &self,
        ctx: &mut Context,
        requester: &Address,
        ssusd_amount: Amount,
        output_denom: &Denom,
    ) -> StablecoinResult<u64> {
        let now = ctx.block_time();
        let params = self.reserve_params(ctx)?;
        if params.redeem_paused {
            return Err(StablecoinError::RedeemPaused);
        }
        let config = params.active_treasury(output_denom)?;
        if params.require_kyc {
            self.collab.compliance.assert_compliant(requester, now)?;
        }
        if ssusd_amount < params.min_redeem_amount {
            return Err(StablecoinError::BelowMinimum {
                what: "redeem amount",
                amount: ssusd_amount,
                minimum: params.min_redeem_amount,
            });
        }

        let today = ctx.header().date_key();
        let mut stats = self.daily_stats(ctx, &today)?;
        check_daily_limit(stats.total_redeemed, ssusd_amount, params.max_daily_redeem)?;

        let after_fee = ssusd_amount
            .less_bps(params.redeem_fee_bps)
            .ok_or(StablecoinError::Overflow("redeem fee"))?;
        let fee = ssusd_amount.saturating_sub(&after_fee);
        let price = self.asset_price(config, now)?;
        let quoted = after_fee
            .value()
            .checked_div(price)
            .ok_or(StablecoinError::Overflow("redemption output"))?;
        let output_amount = Amount::truncate(quoted)?;
        if output_amount.is_zero() {
            return Err(StablecoinError::InvalidAmount(format!(
                "redemption of {ssusd_amount} yields no {output_denom}"
            )));
        }

        let available = self.available_reserves(ctx, output_denom)?;
        if output_amount > available {
            return Err(StablecoinError::InsufficientReserves {
                denom: output_denom.clone(),
                available,
                required: output_amount,
            });
        }

        let mut reserve = self.reserve(ctx)?;
        reserve.total_minted = reserve.total_minted.checked_sub(&ssusd_amount).ok_or_else(|| {
            StablecoinError::InsufficientReserves {
                denom: Denom::stablecoin(),
                available: reserve.total_minted,
                required: ssusd_amount,
            }
        })?;

        let delay = i64::try_from(params.redemption_delay_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| StablecoinError::InvalidParams("redemption delay out of range".to_string()))?;

        let mut locked = self.locked_reserves(ctx)?;
        let output = Coin::new(output_denom.clone(), output_amount);
        locked.add(&output)?;

        self.collab
            .ensure_balance(requester, &Coin::stablecoin(ssusd_amount))?;
        self.collab.burn_from(requester, ssusd_amount)?;

        self.save_reserve(ctx, reserve)?;
        self.set_locked_reserves(ctx, &locked)?;
        self.update_reserve_value(ctx)?;

        let id = self.next_redemption_id(ctx)?;
        let request = RedemptionRequest {
            id,
            requester: requester.clone(),
            ssusd_amount,
            output: output.clone(),
            fee,
            requested_at: now,
            executable_after: delay,
            executed_at: None,
            status: RedemptionStatus::Pending,
        };
        self.save_redemption(ctx, &request)?;
        ctx.set(&STORE_KEY.key(NEXT_REDEMPTION_ID), &(id + 1))?;

        stats.total_redeemed = stats
            .total_redeemed
            .checked_add(&ssusd_amount)
            .ok_or(StablecoinError::Overflow("daily redeemed"))?;
        self.save_daily_stats(ctx, &stats)?;

        info!(
            redemption_id = id,
            requester = %requester,
            ssusd_amount = %ssusd_amount,
            output = %output,
            executable_after = %request.executable_after,
            "redemption requested"
        );
        ctx.emit(Event::RedemptionRequested {
            redemption_id: id,
            requester: requester.clone(),
            ssusd_amount,
            output,
            executable_after: request.executable_after,
        });

        if params.redemption_delay_secs == 0 {
            self.release(ctx, request)?;
        }
        Ok(id)
    }

    /// Pay out a pending redemption once its delay has passed
    pub fn execute_redemption(
        &self,
        ctx: &mut Context,
        executor: &Address,
        id: u64,
    ) -> StablecoinResult<Coin> {
        let request = self.pending(ctx, id)?;
        if ctx.block_time() < request.executable_after {
            return Err(StablecoinError::RedemptionNotReady {
                id,
                executable_after: request.executable_after,
            });
        }

        let params = self.reserve_params(ctx)?;
        params.active_treasury(&request.output.denom)?;
        if params.require_kyc {
            self.collab
                .compliance
                .assert_compliant(&request.requester, ctx.block_time())?;
        }

        info!(redemption_id = id, executor = %executor, "executing redemption");
        self.release(ctx, request)
    }

    /// Cancel a pending redemption, unlocking its output and refunding the
    /// burned ssUSD. Returns the refunded amount.
    pub fn cancel_redemption(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        id: u64,
    ) -> StablecoinResult<Amount> {
        let mut request = self.pending(ctx, id)?;

        let mut locked = self.locked_reserves(ctx)?;
        unlock(&mut locked, &request.output)?;
        let mut reserve = self.reserve(ctx)?;
        reserve.total_minted = reserve
            .total_minted
            .checked_add(&request.ssusd_amount)
            .ok_or(StablecoinError::Overflow("reserve minted"))?;

        self.collab.mint_to(&request.requester, request.ssusd_amount)?;

        self.set_locked_reserves(ctx, &locked)?;
        self.save_reserve(ctx, reserve)?;
        self.update_reserve_value(ctx)?;
        request.status = RedemptionStatus::Cancelled;
        self.save_redemption(ctx, &request)?;

        info!(
            redemption_id = id,
            authority = %authority.address(),
            refunded = %request.ssusd_amount,
            "redemption cancelled"
        );
        ctx.emit(Event::RedemptionCancelled {
            redemption_id: id,
            requester: request.requester.clone(),
            refunded: request.ssusd_amount,
        });
        Ok(request.ssusd_amount)
    }

    fn pending(&self, ctx: &Context, id: u64) -> StablecoinResult<RedemptionRequest> {
        let request = self.redemption(ctx, id)?;
        if !request.is_pending() {
            return Err(StablecoinError::RedemptionNotPending {
                id,
                status: request.status.to_string(),
            });
        }
        Ok(request)
    }

    /// Send the locked output to the requester and settle the books
    fn release(&self, ctx: &mut Context, mut request: RedemptionRequest) -> StablecoinResult<Coin> {
        let output = request.output.clone();

        let mut locked = self.locked_reserves(ctx)?;
        unlock(&mut locked, &output)?;
        let mut reserve = self.reserve(ctx)?;
        reserve.total_deposited.sub(&output)?;
        let charged = self.charge_deposits(ctx, &output)?;

        let held = self.collab.module_balance(&output.denom);
        if held < output.amount {
            return Err(StablecoinError::InsufficientReserves {
                denom: output.denom.clone(),
                available: held,
                required: output.amount,
            });
        }
        self.collab.ledger.send_coins_from_module_to_account(
            MODULE_NAME,
            &request.requester,
            std::slice::from_ref(&output),
        )?;

        self.set_locked_reserves(ctx, &locked)?;
        self.save_reserve(ctx, reserve)?;
        for deposit in &charged {
            self.save_deposit(ctx, deposit)?;
        }
        self.update_reserve_value(ctx)?;

        request.status = RedemptionStatus::Executed;
        request.executed_at = Some(ctx.block_time());
        self.save_redemption(ctx, &request)?;

        info!(
            redemption_id = request.id,
            requester = %request.requester,
            output = %output,
            "redemption executed"
        );
        ctx.emit(Event::RedemptionExecuted {
            redemption_id: request.id,
            requester: request.requester.clone(),
            output: output.clone(),
        });
        Ok(output)
    }

    /// Deposits of `output.denom` updated to cover the payout, oldest first
    fn charge_deposits(&self, ctx: &Context, output: &Coin) -> StablecoinResult<Vec<ReserveDeposit>> {
        let mut remaining = output.amount;
        let mut charged = Vec::new();
        for mut deposit in self.deposits(ctx)? {
            if remaining.is_zero() {
                break;
            }
            if deposit.amount.denom != output.denom || deposit.outstanding().is_zero() {
                continue;
            }
            let take = deposit.outstanding().min(remaining);
            deposit.redeemed = deposit
                .redeemed
                .checked_add(&take)
                .ok_or(StablecoinError::Overflow("deposit redeemed"))?;
            deposit.status = if deposit.outstanding().is_zero() {
                DepositStatus::Redeemed
            } else {
                DepositStatus::Redeeming
            };
            remaining = remaining.saturating_sub(&take);
            charged.push(deposit);
        }

        if remaining.is_positive() {
            return Err(StablecoinError::InvariantBroken {
                name: "deposit_consistency",
                detail: format!("{remaining}{} paid out without a backing deposit", output.denom),
            });
        }
        Ok(charged)
    }
}

fn unlock(locked: &mut Coins, coin: &Coin) -> StablecoinResult<()> {
    locked
        .sub(coin)
        .map_err(|err| StablecoinError::InvariantBroken {
            name: "locked_reserves",
            detail: err.to_string(),
        })
}
