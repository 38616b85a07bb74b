//! Cross-entity invariants of the stablecoin module
//!
//! Each check returns `InvariantBroken` naming itself. `all_invariants`
//! runs them in order and stops at the first break.

use std::collections::BTreeMap;

use ssusd_core::{Amount, Coin, Coins, Denom};
use ssusd_store::Context;
use tracing::error;

use crate::error::{StablecoinError, StablecoinResult};
use crate::reserve::ReserveEngine;
use crate::vault::VaultEngine;

pub type InvariantResult = StablecoinResult<()>;

pub fn all_invariants(ctx: &Context, vaults: &VaultEngine, reserve: &ReserveEngine) -> InvariantResult {
    reserve_backing(ctx, reserve)
        .and_then(|_| total_supply(ctx, vaults, reserve))
        .and_then(|_| vault_collateralization(ctx, vaults))
        .and_then(|_| deposit_consistency(ctx, reserve))
        .and_then(|_| locked_reserves(ctx, reserve))
        .map_err(|err| {
            error!(error = %err, "invariant broken");
            err
        })
}

fn broken(name: &'static str, detail: String) -> StablecoinError {
    StablecoinError::InvariantBroken { name, detail }
}

/// Reserve ratio at or above the configured minimum while anything is minted
pub fn reserve_backing(ctx: &Context, reserve: &ReserveEngine) -> InvariantResult {
    let state = reserve.reserve(ctx)?;
    if state.total_minted.is_zero() {
        return Ok(());
    }
    let min = reserve.reserve_params(ctx)?.min_reserve_ratio_bps;
    let ratio = state.reserve_ratio_bps();
    if ratio < min {
        return Err(broken(
            "reserve_backing",
            format!("reserve ratio {ratio} bps below minimum {min} bps"),
        ));
    }
    Ok(())
}

/// Reserve-path supply plus vault debt plus auction debt not yet burned
/// equals the ledger supply of ssUSD. Debt an expired auction never raised
/// stays counted.
pub fn total_supply(ctx: &Context, vaults: &VaultEngine, reserve: &ReserveEngine) -> InvariantResult {
    let mut expected = reserve.reserve(ctx)?.total_minted;
    let vault_debt = vaults.vaults(ctx)?.into_iter().map(|vault| vault.debt);
    let auction_debt = vaults
        .auctions(ctx)?
        .into_iter()
        .map(|auction| auction.unretired_debt());
    for debt in vault_debt.chain(auction_debt) {
        expected = expected
            .checked_add(&debt)
            .ok_or(StablecoinError::Overflow("total supply"))?;
    }
    let supply = reserve.collab.ledger.get_supply(&Denom::stablecoin());
    if supply != expected {
        return Err(broken(
            "total_supply",
            format!("ledger supply {supply} != reserve minted + vault and auction debt {expected}"),
        ));
    }
    Ok(())
}

/// Every indebted vault passes the collateralization check at current prices.
/// Price-feed errors propagate as-is rather than counting as a break.
pub fn vault_collateralization(ctx: &Context, vaults: &VaultEngine) -> InvariantResult {
    let params = vaults.params(ctx)?;
    let now = ctx.block_time();
    for vault in vaults.vaults(ctx)? {
        if vault.debt.is_zero() {
            continue;
        }
        let param = params
            .collateral_param(&vault.collateral.denom)
            .ok_or_else(|| {
                broken(
                    "vault_collateralization",
                    format!("vault {} holds unsupported collateral {}", vault.id, vault.collateral.denom),
                )
            })?;
        match vaults.check_collateralization(vault.id, &vault.collateral, vault.debt, param, now) {
            Err(err @ StablecoinError::UnderCollateralized { .. }) => {
                return Err(broken("vault_collateralization", err.to_string()));
            }
            other => other?,
        }
    }
    Ok(())
}

/// Per denom, deposited reserves equal the deposits' unredeemed amounts,
/// and no deposit minted more than its USD value
pub fn deposit_consistency(ctx: &Context, reserve: &ReserveEngine) -> InvariantResult {
    let mut outstanding = Coins::new();
    for deposit in reserve.deposits(ctx)? {
        if deposit.minted > deposit.usd_value {
            return Err(broken(
                "deposit_consistency",
                format!(
                    "deposit {} minted {} above its usd value {}",
                    deposit.id, deposit.minted, deposit.usd_value
                ),
            ));
        }
        if deposit.redeemed > deposit.amount.amount {
            return Err(broken(
                "deposit_consistency",
                format!("deposit {} redeemed more than deposited", deposit.id),
            ));
        }
        outstanding.add(&Coin::new(deposit.amount.denom.clone(), deposit.outstanding()))?;
    }

    let deposited = reserve.reserve(ctx)?.total_deposited;
    if deposited != outstanding {
        return Err(broken(
            "deposit_consistency",
            format!("reserve holds {deposited:?}, deposits account for {outstanding:?}"),
        ));
    }
    Ok(())
}

/// Locked reserves equal the outputs of pending redemptions and never
/// exceed what is deposited
pub fn locked_reserves(ctx: &Context, reserve: &ReserveEngine) -> InvariantResult {
    let mut pending: BTreeMap<Denom, Amount> = BTreeMap::new();
    for request in reserve.pending_redemptions(ctx)? {
        let entry = pending.entry(request.output.denom.clone()).or_default();
        *entry = entry
            .checked_add(&request.output.amount)
            .ok_or(StablecoinError::Overflow("locked reserves"))?;
    }

    let locked = reserve.locked_reserves(ctx)?;
    let deposited = reserve.reserve(ctx)?.total_deposited;
    for coin in locked.iter() {
        let expected = pending.remove(&coin.denom).unwrap_or_default();
        if coin.amount != expected {
            return Err(broken(
                "locked_reserves",
                format!("locked {coin} but pending redemptions need {expected}"),
            ));
        }
        let held = deposited.amount_of(&coin.denom);
        if coin.amount > held {
            return Err(broken(
                "locked_reserves",
                format!("locked {coin} exceeds deposited {held}"),
            ));
        }
    }
    if let Some((denom, amount)) = pending.into_iter().find(|(_, a)| a.is_positive()) {
        return Err(broken(
            "locked_reserves",
            format!("pending redemptions need {amount}{denom} but nothing is locked"),
        ));
    }
    Ok(())
}
