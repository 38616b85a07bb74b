//! Dutch auction liquidation
//!
//! An under-collateralized vault can be handed to an auction instead of a
//! single liquidator. The vault closes and its collateral stays in the
//! module account, offered at a price falling from a premium to a discount
//! on the oracle price. Raised ssUSD burns the vault debt first; the penalty
//! share is kept by the module. Debt left unburned when the auction ends
//! stays outstanding.

use rust_decimal::Decimal;
use ssusd_core::{Address, Amount, Authority, Coin, Event, Governance, BPS_DENOMINATOR};
use ssusd_store::Context;
use tracing::{info, warn};

use crate::error::{StablecoinError, StablecoinResult};
use crate::keys::{AUCTION, AUCTION_PARAMS, NEXT_AUCTION_ID, STORE_KEY, VAULT};
use crate::params::AuctionParams;
use crate::types::{AuctionStatus, BidFill, DutchAuction};
use crate::vault::VaultEngine;
use crate::MODULE_NAME;

impl VaultEngine {
    pub fn auction_params(&self, ctx: &Context) -> StablecoinResult<AuctionParams> {
        Ok(ctx
            .get(&STORE_KEY.key(AUCTION_PARAMS))?
            .unwrap_or_default())
    }

    pub fn set_auction_params(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        params: AuctionParams,
    ) -> StablecoinResult<()> {
        params.validate()?;
        ctx.set(&STORE_KEY.key(AUCTION_PARAMS), &params)?;
        info!(
            authority = %authority.address(),
            enabled = params.enabled,
            duration_secs = params.duration_secs,
            "auction params updated"
        );
        Ok(())
    }

    pub fn auction(&self, ctx: &Context, id: u64) -> StablecoinResult<DutchAuction> {
        ctx.get(&STORE_KEY.id_key(AUCTION, id))?
            .ok_or(StablecoinError::AuctionNotFound(id))
    }

    /// Every auction ever started, in id order
    pub fn auctions(&self, ctx: &Context) -> StablecoinResult<Vec<DutchAuction>> {
        Ok(ctx.scan_values(&STORE_KEY.key(AUCTION))?)
    }

    pub fn active_auctions(&self, ctx: &Context) -> StablecoinResult<Vec<DutchAuction>> {
        Ok(self
            .auctions(ctx)?
            .into_iter()
            .filter(DutchAuction::is_active)
            .collect())
    }

    pub fn next_auction_id(&self, ctx: &Context) -> StablecoinResult<u64> {
        Ok(ctx.get(&STORE_KEY.key(NEXT_AUCTION_ID))?.unwrap_or(1))
    }

    pub(crate) fn save_auction(&self, ctx: &mut Context, auction: &DutchAuction) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.id_key(AUCTION, auction.id), auction)?;
        Ok(())
    }

    /// Close an under-collateralized vault into a new auction; returns its id
    pub fn liquidate_vault_with_auction(
        &self,
        ctx: &mut Context,
        liquidator: &Address,
        vault_id: u64,
    ) -> StablecoinResult<u64> {
        let vault = self.liquidatable_vault(ctx, vault_id)?;
        let params = self.auction_params(ctx)?;
        if !params.enabled {
            return Err(StablecoinError::AuctionsDisabled);
        }

        let now = ctx.block_time();
        let price = self.collab.price(&vault.collateral.denom, now)?;
        let start_price = scale_bps(price, params.start_price_multiplier_bps)?;
        let end_price = scale_bps(price, params.end_price_multiplier_bps)?;
        let penalty = scale_bps(vault.debt.value(), params.liquidation_penalty_bps)?;
        let debt_to_cover = vault
            .debt
            .checked_add(&Amount::truncate(penalty)?)
            .ok_or(StablecoinError::Overflow("auction debt"))?;

        let id = self.next_auction_id(ctx)?;
        let auction = DutchAuction {
            id,
            vault_id,
            owner: vault.owner.clone(),
            collateral: vault.collateral.clone(),
            debt: vault.debt,
            debt_to_cover,
            start_price,
            end_price,
            started_at: now,
            duration_secs: params.duration_secs,
            status: AuctionStatus::Active,
            collateral_sold: Amount::ZERO,
            debt_raised: Amount::ZERO,
        };
        ctx.delete(&STORE_KEY.id_key(VAULT, vault_id));
        self.save_auction(ctx, &auction)?;
        ctx.set(&STORE_KEY.key(NEXT_AUCTION_ID), &(id + 1))?;

        warn!(
            auction_id = id,
            vault_id,
            liquidator = %liquidator,
            collateral = %auction.collateral,
            debt_to_cover = %debt_to_cover,
            start_price = %start_price,
            "vault sent to auction"
        );
        ctx.emit(Event::AuctionStarted {
            auction_id: id,
            vault_id,
            owner: vault.owner,
            liquidator: liquidator.clone(),
            collateral: auction.collateral,
            debt_to_cover,
            start_price,
            end_price,
        });
        Ok(id)
    }

    /// Buy up to `max_collateral` at the current price, paying at most
    /// `max_ssusd`. The purchase shrinks to the remaining debt on the last bid.
    pub fn bid_auction(
        &self,
        ctx: &mut Context,
        bidder: &Address,
        id: u64,
        max_collateral: Amount,
        max_ssusd: Amount,
    ) -> StablecoinResult<BidFill> {
        let now = ctx.block_time();
        let mut auction = self.auction(ctx, id)?;
        if !auction.is_active() {
            return Err(StablecoinError::AuctionNotActive {
                id,
                status: auction.status.to_string(),
            });
        }
        if auction.has_ended_at(now) {
            return Err(StablecoinError::AuctionNotActive {
                id,
                status: AuctionStatus::Expired.to_string(),
            });
        }

        let price = auction.price_at(now);
        let (quantity, cost) = fill(&auction, price, max_collateral, max_ssusd)?;
        if quantity.is_zero() || cost.is_zero() {
            return Err(StablecoinError::InvalidAmount(format!(
                "bid on auction {id} buys nothing at price {price}"
            )));
        }

        let burned = cost.min(auction.unretired_debt());
        let kept = cost.saturating_sub(&burned);
        let bought = Coin::new(auction.collateral.denom.clone(), quantity);
        self.collab.ensure_balance(bidder, &Coin::stablecoin(cost))?;

        if burned.is_positive() {
            self.collab.burn_from(bidder, burned)?;
        }
        if kept.is_positive() {
            self.collab.ledger.send_coins_from_account_to_module(
                bidder,
                MODULE_NAME,
                &[Coin::stablecoin(kept)],
            )?;
        }
        self.collab.ledger.send_coins_from_module_to_account(
            MODULE_NAME,
            bidder,
            std::slice::from_ref(&bought),
        )?;

        auction.collateral_sold = auction
            .collateral_sold
            .checked_add(&quantity)
            .ok_or(StablecoinError::Overflow("auction collateral sold"))?;
        auction.debt_raised = auction
            .debt_raised
            .checked_add(&cost)
            .ok_or(StablecoinError::Overflow("auction debt raised"))?;

        let settled = auction.remaining_collateral().is_zero() || auction.remaining_debt().is_zero();
        let returned = if settled {
            auction.status = AuctionStatus::Completed;
            Some(self.return_collateral(&auction)?)
        } else {
            None
        };
        self.save_auction(ctx, &auction)?;

        info!(
            auction_id = id,
            bidder = %bidder,
            bought = %bought,
            cost = %cost,
            price = %price,
            "auction bid filled"
        );
        ctx.emit(Event::AuctionBid {
            auction_id: id,
            bidder: bidder.clone(),
            collateral: bought.clone(),
            cost,
            price,
        });
        if let Some(returned) = returned {
            info!(auction_id = id, debt_raised = %auction.debt_raised, "auction completed");
            ctx.emit(Event::AuctionCompleted {
                auction_id: id,
                collateral_sold: auction.collateral_sold,
                debt_raised: auction.debt_raised,
                returned,
            });
        }
        Ok(BidFill {
            collateral: bought,
            cost,
            price,
        })
    }

    /// Expire auctions past their end and hand unsold collateral back to
    /// the vault owner. An auction whose refund fails stays active and is
    /// retried next block. Returns the number expired.
    pub fn process_expired_auctions(&self, ctx: &mut Context) -> StablecoinResult<usize> {
        let now = ctx.block_time();
        let mut expired = 0;
        for mut auction in self.active_auctions(ctx)? {
            if !auction.has_ended_at(now) {
                continue;
            }
            let returned = match self.return_collateral(&auction) {
                Ok(returned) => returned,
                Err(err) => {
                    warn!(auction_id = auction.id, error = %err, "auction refund failed, retrying next block");
                    continue;
                }
            };
            auction.status = AuctionStatus::Expired;
            self.save_auction(ctx, &auction)?;
            expired += 1;

            warn!(
                auction_id = auction.id,
                unretired_debt = %auction.unretired_debt(),
                returned = %returned,
                "auction expired"
            );
            ctx.emit(Event::AuctionExpired {
                auction_id: auction.id,
                collateral_sold: auction.collateral_sold,
                debt_raised: auction.debt_raised,
                returned,
            });
        }
        Ok(expired)
    }

    /// Send the unsold collateral to the vault owner
    fn return_collateral(&self, auction: &DutchAuction) -> StablecoinResult<Coin> {
        let returned = Coin::new(auction.collateral.denom.clone(), auction.remaining_collateral());
        if returned.amount.is_positive() {
            self.collab.ledger.send_coins_from_module_to_account(
                MODULE_NAME,
                &auction.owner,
                std::slice::from_ref(&returned),
            )?;
        }
        Ok(returned)
    }

    /// Restore auction params, auctions and the id counter (genesis)
    pub(crate) fn import_auctions(
        &self,
        ctx: &mut Context,
        params: &AuctionParams,
        auctions: &[DutchAuction],
        next_id: u64,
    ) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.key(AUCTION_PARAMS), params)?;
        for auction in auctions {
            self.save_auction(ctx, auction)?;
        }
        ctx.set(&STORE_KEY.key(NEXT_AUCTION_ID), &next_id)?;
        Ok(())
    }
}

/// `value * bps / 10000`
fn scale_bps(value: Decimal, bps: u32) -> StablecoinResult<Decimal> {
    value
        .checked_div(Decimal::from(BPS_DENOMINATOR))
        .and_then(|v| v.checked_mul(Decimal::from(bps)))
        .ok_or(StablecoinError::Overflow("bps scaling"))
}

/// Collateral bought and ssUSD paid for a bid at `price`
fn fill(
    auction: &DutchAuction,
    price: Decimal,
    max_collateral: Amount,
    max_ssusd: Amount,
) -> StablecoinResult<(Amount, Amount)> {
    let cost_of = |quantity: Amount| -> StablecoinResult<Amount> {
        let cost = price
            .checked_mul(quantity.value())
            .ok_or(StablecoinError::Overflow("auction cost"))?;
        Ok(Amount::truncate(cost)?)
    };
    let quantity_for = |ssusd: Amount| -> StablecoinResult<Amount> {
        let quantity = ssusd
            .value()
            .checked_div(price)
            .ok_or(StablecoinError::Overflow("auction quantity"))?;
        Ok(Amount::truncate(quantity)?)
    };

    let mut quantity = max_collateral.min(auction.remaining_collateral());
    let mut cost = cost_of(quantity)?;
    if cost > max_ssusd {
        quantity = quantity_for(max_ssusd)?;
        cost = cost_of(quantity)?;
    }

    let remaining_debt = auction.remaining_debt();
    if cost > remaining_debt {
        cost = remaining_debt;
        quantity = quantity_for(cost)?;
    }
    Ok((quantity, cost))
}
