//! Reserve Engine - ssUSD issued against tokenized treasuries
//!
//! Deposits convert a reserve asset to USD at the oracle price, apply the
//! asset haircut and the mint fee, and mint the rest as ssUSD. Redemptions
//! (see `redemption.rs`) and attestations (see `attestation.rs`) extend the
//! same engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use ssusd_core::{
    Address, Amount, Authority, Coin, Coins, Denom, Event, Governance, BPS_DENOMINATOR,
};
use ssusd_store::Context;
use tracing::{debug, info, warn};

use crate::collab::Collaborators;
use crate::error::{StablecoinError, StablecoinResult};
use crate::keys::{
    DAILY_STATS, LOCKED_RESERVES, NEXT_DEPOSIT_ID, RESERVE, RESERVE_DEPOSIT, RESERVE_PARAMS,
    STORE_KEY,
};
use crate::params::{ReserveParams, TokenizedTreasuryConfig};
use crate::types::{
    reserve_ratio_bps, DailyStats, DepositStatus, Reserve, ReserveDeposit, TotalReserves,
};
use crate::MODULE_NAME;

pub struct ReserveEngine {
    pub(crate) collab: Collaborators,
}

impl ReserveEngine {
    pub fn new(collab: Collaborators) -> Self {
        Self { collab }
    }

    // === Params ===

    pub fn reserve_params(&self, ctx: &Context) -> StablecoinResult<ReserveParams> {
        Ok(ctx
            .get(&STORE_KEY.key(RESERVE_PARAMS))?
            .unwrap_or_default())
    }

    pub fn set_reserve_params(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        params: ReserveParams,
    ) -> StablecoinResult<()> {
        params.validate()?;
        self.store_params(ctx, &params)?;
        info!(
            authority = %authority.address(),
            mint_paused = params.mint_paused,
            redeem_paused = params.redeem_paused,
            "reserve params updated"
        );
        ctx.emit(Event::ReserveParamsUpdated {
            authority: authority.address().clone(),
        });
        Ok(())
    }

    pub(crate) fn store_params(&self, ctx: &mut Context, params: &ReserveParams) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.key(RESERVE_PARAMS), params)?;
        Ok(())
    }

    // === Reserve state ===

    pub fn reserve(&self, ctx: &Context) -> StablecoinResult<Reserve> {
        Ok(ctx.get(&STORE_KEY.key(RESERVE))?.unwrap_or_default())
    }

    /// Persist `reserve`, stamping it with the current block
    pub(crate) fn save_reserve(&self, ctx: &mut Context, mut reserve: Reserve) -> StablecoinResult<Reserve> {
        reserve.last_updated_height = ctx.block_height();
        reserve.last_updated_time = Some(ctx.block_time());
        ctx.set(&STORE_KEY.key(RESERVE), &reserve)?;
        Ok(reserve)
    }

    pub fn reserve_ratio(&self, ctx: &Context) -> StablecoinResult<u32> {
        Ok(self.reserve(ctx)?.reserve_ratio_bps())
    }

    pub fn is_healthy(&self, ctx: &Context, min_ratio_bps: u32) -> StablecoinResult<bool> {
        Ok(self.reserve(ctx)?.is_healthy(min_ratio_bps))
    }

    /// Reserve assets set aside for pending redemptions
    pub fn locked_reserves(&self, ctx: &Context) -> StablecoinResult<Coins> {
        Ok(ctx
            .get(&STORE_KEY.key(LOCKED_RESERVES))?
            .unwrap_or_default())
    }

    pub(crate) fn set_locked_reserves(&self, ctx: &mut Context, locked: &Coins) -> StablecoinResult<()> {
        let key = STORE_KEY.key(LOCKED_RESERVES);
        if locked.is_empty() {
            ctx.delete(&key);
        } else {
            ctx.set(&key, locked)?;
        }
        Ok(())
    }

    /// Reserve of `denom` neither paid out nor locked
    pub fn available_reserves(&self, ctx: &Context, denom: &Denom) -> StablecoinResult<Amount> {
        let total = self.reserve(ctx)?.total_deposited.amount_of(denom);
        let locked = self.locked_reserves(ctx)?.amount_of(denom);
        total.checked_sub(&locked).ok_or_else(|| StablecoinError::InvariantBroken {
            name: "locked_reserves",
            detail: format!("locked {locked} exceeds total {total} for {denom}"),
        })
    }

    /// Recompute `total_value` from live prices; unpriced assets count as zero.
    /// Assets locked for pending redemptions back ssUSD already burned, so
    /// they are left out.
    pub fn update_reserve_value(&self, ctx: &mut Context) -> StablecoinResult<Amount> {
        let now = ctx.block_time();
        let params = self.reserve_params(ctx)?;
        let mut reserve = self.reserve(ctx)?;
        let locked = self.locked_reserves(ctx)?;

        let mut total = Amount::ZERO;
        for coin in reserve.total_deposited.iter() {
            let free = coin.amount.saturating_sub(&locked.amount_of(&coin.denom));
            if free.is_zero() {
                continue;
            }
            let Some(config) = params.tokenized_treasury(&coin.denom).filter(|c| c.active) else {
                continue;
            };
            let price = match self.collab.reserve_price(config, now) {
                Ok(price) => price,
                Err(err) => {
                    warn!(denom = %coin.denom, error = %err, "reserve asset unpriced, valued at zero");
                    continue;
                }
            };
            let value = usd_value(price, &Coin::new(coin.denom, free), config.haircut_bps)?;
            total = total
                .checked_add(&value)
                .ok_or(StablecoinError::Overflow("reserve value"))?;
        }

        debug!(previous = %reserve.total_value, updated = %total, "reserve value recomputed");
        reserve.total_value = total;
        self.save_reserve(ctx, reserve)?;
        Ok(total)
    }

    /// On-chain value plus the latest off-chain attestation
    pub fn total_reserves(&self, ctx: &Context) -> StablecoinResult<TotalReserves> {
        let reserve = self.reserve(ctx)?;
        let latest = self.latest_attestation(ctx)?;
        let off_chain_value = latest.as_ref().map_or(Amount::ZERO, |a| a.total_value);
        let total_value = reserve
            .total_value
            .checked_add(&off_chain_value)
            .ok_or(StablecoinError::Overflow("total reserves"))?;

        Ok(TotalReserves {
            on_chain_value: reserve.total_value,
            off_chain_value,
            total_value,
            total_supply: reserve.total_minted,
            reserve_ratio_bps: reserve_ratio_bps(total_value, reserve.total_minted),
            last_on_chain_update: reserve.last_updated_time,
            last_off_chain_update: latest.map(|a| a.timestamp),
        })
    }

    // === Deposits ===

    pub fn deposit(&self, ctx: &Context, id: u64) -> StablecoinResult<ReserveDeposit> {
        ctx.get(&STORE_KEY.id_key(RESERVE_DEPOSIT, id))?
            .ok_or(StablecoinError::DepositNotFound(id))
    }

    /// All deposits in id order
    pub fn deposits(&self, ctx: &Context) -> StablecoinResult<Vec<ReserveDeposit>> {
        Ok(ctx.scan_values(&STORE_KEY.key(RESERVE_DEPOSIT))?)
    }

    pub(crate) fn save_deposit(&self, ctx: &mut Context, deposit: &ReserveDeposit) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.id_key(RESERVE_DEPOSIT, deposit.id), deposit)?;
        Ok(())
    }

    pub fn next_deposit_id(&self, ctx: &Context) -> StablecoinResult<u64> {
        Ok(ctx.get(&STORE_KEY.key(NEXT_DEPOSIT_ID))?.unwrap_or(1))
    }

    /// Deposit a reserve asset and mint ssUSD to the depositor.
    /// Returns the deposit id and the amount minted.
    pub fn deposit_reserve(
        &self,
        ctx: &mut Context,
        depositor: &Address,
        amount: Coin,
    ) -> StablecoinResult<(u64, Amount)> {
        let now = ctx.block_time();
        let params = self.reserve_params(ctx)?;
        if params.mint_paused {
            return Err(StablecoinError::MintPaused);
        }
        if amount.is_zero() {
            return Err(StablecoinError::InvalidAmount(
                "deposit must be positive".to_string(),
            ));
        }
        let config = params.active_treasury(&amount.denom)?;
        if params.require_kyc {
            self.collab.compliance.assert_compliant(depositor, now)?;
        }

        let price = self.collab.reserve_price(config, now)?;
        let usd = usd_value(price, &amount, config.haircut_bps)?;
        let minted = usd
            .less_bps(params.mint_fee_bps)
            .ok_or(StablecoinError::Overflow("mint fee"))?;
        let fee = usd.saturating_sub(&minted);
        if minted < params.min_mint_amount {
            return Err(StablecoinError::BelowMinimum {
                what: "mint amount",
                amount: minted,
                minimum: params.min_mint_amount,
            });
        }

        let today = ctx.header().date_key();
        let mut stats = self.daily_stats(ctx, &today)?;
        check_daily_limit(stats.total_minted, minted, params.max_daily_mint)?;

        let mut reserve = self.reserve(ctx)?;
        check_allocation(&reserve, config, price, &amount, usd)?;
        self.collab.ensure_balance(depositor, &amount)?;

        self.collab.ledger.send_coins_from_account_to_module(
            depositor,
            MODULE_NAME,
            std::slice::from_ref(&amount),
        )?;
        self.collab.mint_to(depositor, minted)?;

        reserve.total_deposited.add(&amount)?;
        reserve.total_value = reserve
            .total_value
            .checked_add(&usd)
            .ok_or(StablecoinError::Overflow("reserve value"))?;
        reserve.total_minted = reserve
            .total_minted
            .checked_add(&minted)
            .ok_or(StablecoinError::Overflow("reserve minted"))?;
        let reserve = self.save_reserve(ctx, reserve)?;

        let id = self.next_deposit_id(ctx)?;
        let deposit = ReserveDeposit {
            id,
            depositor: depositor.clone(),
            amount: amount.clone(),
            usd_value: usd,
            minted,
            fee,
            redeemed: Amount::ZERO,
            status: DepositStatus::Active,
            deposited_at: now,
            deposited_height: ctx.block_height(),
        };
        self.save_deposit(ctx, &deposit)?;
        ctx.set(&STORE_KEY.key(NEXT_DEPOSIT_ID), &(id + 1))?;

        stats.total_minted = stats
            .total_minted
            .checked_add(&minted)
            .ok_or(StablecoinError::Overflow("daily minted"))?;
        self.save_daily_stats(ctx, &stats)?;

        let ratio = reserve.reserve_ratio_bps();
        info!(
            deposit_id = id,
            depositor = %depositor,
            asset = %amount,
            price = %price,
            usd_value = %usd,
            minted = %minted,
            reserve_ratio_bps = ratio,
            "reserve deposited"
        );
        ctx.emit(Event::ReserveDeposit {
            deposit_id: id,
            depositor: depositor.clone(),
            reserve_asset: amount,
            price,
            usd_value: usd,
            ssusd_amount: minted,
            fee_amount: fee,
            reserve_ratio_bps: ratio,
        });
        Ok((id, minted))
    }

    // === Daily stats ===

    /// Stats for `date` (`YYYY-MM-DD`); empty when nothing happened that day
    pub fn daily_stats(&self, ctx: &Context, date: &str) -> StablecoinResult<DailyStats> {
        Ok(ctx
            .get(&STORE_KEY.str_key(DAILY_STATS, date))?
            .unwrap_or_else(|| DailyStats::empty(date.to_string())))
    }

    pub fn all_daily_stats(&self, ctx: &Context) -> StablecoinResult<Vec<DailyStats>> {
        Ok(ctx.scan_values(&STORE_KEY.key(DAILY_STATS))?)
    }

    pub(crate) fn save_daily_stats(&self, ctx: &mut Context, stats: &DailyStats) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.str_key(DAILY_STATS, &stats.date), stats)?;
        Ok(())
    }

    /// Price of a reserve asset at `now`, exposed for redemption quoting
    pub(crate) fn asset_price(
        &self,
        config: &TokenizedTreasuryConfig,
        now: DateTime<Utc>,
    ) -> StablecoinResult<Decimal> {
        self.collab.reserve_price(config, now)
    }
}

/// `trunc(trunc(price x amount) x (10000 - haircut) / 10000)`
pub(crate) fn usd_value(price: Decimal, coin: &Coin, haircut_bps: u32) -> StablecoinResult<Amount> {
    let raw = price
        .checked_mul(coin.amount.value())
        .ok_or(StablecoinError::Overflow("usd value"))?;
    Amount::truncate(raw)?
        .less_bps(haircut_bps)
        .ok_or(StablecoinError::Overflow("haircut"))
}

/// 0 = unlimited
pub(crate) fn check_daily_limit(used: Amount, amount: Amount, limit: Amount) -> StablecoinResult<()> {
    if limit.is_zero() {
        return Ok(());
    }
    let exceeds = used.checked_add(&amount).map_or(true, |total| total > limit);
    if exceeds {
        return Err(StablecoinError::DailyLimitExceeded(format!(
            "daily limit exceeded: used {used} + {amount} > limit {limit}"
        )));
    }
    Ok(())
}

/// Share of the reserve held in `amount.denom` after the deposit must stay
/// within the asset's max allocation. Skipped while the reserve is empty.
fn check_allocation(
    reserve: &Reserve,
    config: &TokenizedTreasuryConfig,
    price: Decimal,
    amount: &Coin,
    deposit_value: Amount,
) -> StablecoinResult<()> {
    if reserve.total_value.is_zero() {
        return Ok(());
    }
    let held = reserve
        .total_deposited
        .amount_of(&amount.denom)
        .checked_add(&amount.amount)
        .ok_or(StablecoinError::Overflow("allocation"))?;
    let held_value = usd_value(price, &Coin::new(amount.denom.clone(), held), config.haircut_bps)?;
    let new_total = reserve
        .total_value
        .checked_add(&deposit_value)
        .ok_or(StablecoinError::Overflow("allocation"))?;

    let allocation_bps = held_value
        .value()
        .checked_mul(Decimal::from(BPS_DENOMINATOR))
        .and_then(|scaled| scaled.checked_div(new_total.value()))
        .ok_or(StablecoinError::Overflow("allocation"))?
        .floor();
    if allocation_bps > Decimal::from(config.max_allocation_bps) {
        return Err(StablecoinError::AllocationExceeded {
            denom: amount.denom.clone(),
            allocation_bps,
            max_bps: config.max_allocation_bps,
        });
    }
    Ok(())
}
