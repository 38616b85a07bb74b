//! Stored entities of the stablecoin module

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ssusd_core::{Address, Amount, Coin, Coins, BPS_DENOMINATOR};
use strum_macros::{Display, EnumString};

use crate::{FULLY_BACKED_BPS, MAX_RESERVE_RATIO_BPS};

/// Collateralized debt position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: u64,
    pub owner: Address,
    pub collateral: Coin,
    /// Outstanding ssUSD debt
    pub debt: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_height: u64,
}

/// On-chain reserve backing the reserve issuance path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Reserve {
    pub total_deposited: Coins,
    /// USD value of `total_deposited` after haircuts
    pub total_value: Amount,
    /// Outstanding ssUSD issued against the reserve
    pub total_minted: Amount,
    pub last_updated_height: u64,
    pub last_updated_time: Option<DateTime<Utc>>,
}

impl Reserve {
    /// `floor(total_value * 10000 / total_minted)` in bps, capped at 100000
    pub fn reserve_ratio_bps(&self) -> u32 {
        reserve_ratio_bps(self.total_value, self.total_minted)
    }

    pub fn is_healthy(&self, min_ratio_bps: u32) -> bool {
        self.reserve_ratio_bps() >= min_ratio_bps
    }
}

pub(crate) fn reserve_ratio_bps(value: Amount, minted: Amount) -> u32 {
    if minted.is_zero() {
        return FULLY_BACKED_BPS;
    }
    let bps = Decimal::from(BPS_DENOMINATOR);
    // Divide first only when the scaled value no longer fits
    let ratio = match value.value().checked_mul(bps) {
        Some(scaled) => scaled.checked_div(minted.value()),
        None => value
            .value()
            .checked_div(minted.value())
            .and_then(|ratio| ratio.checked_mul(bps)),
    };
    ratio
        .and_then(|ratio| ratio.floor().to_u32())
        .map_or(MAX_RESERVE_RATIO_BPS, |ratio| ratio.min(MAX_RESERVE_RATIO_BPS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DepositStatus {
    Active,
    /// Partially paid out by redemptions
    Redeeming,
    Redeemed,
}

/// A reserve asset deposit and the ssUSD minted against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveDeposit {
    pub id: u64,
    pub depositor: Address,
    pub amount: Coin,
    pub usd_value: Amount,
    pub minted: Amount,
    pub fee: Amount,
    /// Units of `amount` paid out by executed redemptions
    #[serde(default)]
    pub redeemed: Amount,
    pub status: DepositStatus,
    pub deposited_at: DateTime<Utc>,
    pub deposited_height: u64,
}

impl ReserveDeposit {
    /// Units still held in the reserve
    pub fn outstanding(&self) -> Amount {
        self.amount.amount.saturating_sub(&self.redeemed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RedemptionStatus {
    Pending,
    Executed,
    Cancelled,
}

/// ssUSD burned in exchange for a reserve asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRequest {
    pub id: u64,
    pub requester: Address,
    /// Escrowed and burned at request time
    pub ssusd_amount: Amount,
    /// Reserve asset owed to the requester, locked while pending
    pub output: Coin,
    pub fee: Amount,
    pub requested_at: DateTime<Utc>,
    pub executable_after: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub status: RedemptionStatus,
}

impl RedemptionRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RedemptionStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuctionStatus {
    Active,
    /// Collateral sold out or debt fully raised
    Completed,
    Expired,
}

/// Collateral of a liquidated vault offered at a linearly falling price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutchAuction {
    pub id: u64,
    pub vault_id: u64,
    /// Receives unsold collateral
    pub owner: Address,
    pub collateral: Coin,
    /// Vault debt at liquidation
    pub debt: Amount,
    /// `debt` plus the liquidation penalty
    pub debt_to_cover: Amount,
    /// ssUSD per collateral unit
    pub start_price: Decimal,
    pub end_price: Decimal,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub status: AuctionStatus,
    pub collateral_sold: Amount,
    pub debt_raised: Amount,
}

impl DutchAuction {
    pub fn is_active(&self) -> bool {
        self.status == AuctionStatus::Active
    }

    /// Bids are accepted up to and including this instant
    pub fn ends_at(&self) -> DateTime<Utc> {
        i64::try_from(self.duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| self.started_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
        now > self.ends_at()
    }

    /// `start - (start - end) * elapsed / duration`, floored at `end_price`
    pub fn price_at(&self, now: DateTime<Utc>) -> Decimal {
        let elapsed = now.signed_duration_since(self.started_at).num_seconds().max(0);
        let elapsed = u64::try_from(elapsed).unwrap_or(u64::MAX);
        if elapsed >= self.duration_secs {
            return self.end_price;
        }
        let progress = Decimal::from(elapsed) / Decimal::from(self.duration_secs);
        self.start_price - (self.start_price - self.end_price) * progress
    }

    pub fn remaining_collateral(&self) -> Amount {
        self.collateral.amount.saturating_sub(&self.collateral_sold)
    }

    /// ssUSD still wanted, penalty included
    pub fn remaining_debt(&self) -> Amount {
        self.debt_to_cover.saturating_sub(&self.debt_raised)
    }

    /// Vault debt not yet burned by bids. Raised ssUSD retires debt first;
    /// the penalty share is kept by the module.
    pub fn unretired_debt(&self) -> Amount {
        self.debt.saturating_sub(&self.debt_raised)
    }
}

/// Result of one auction bid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidFill {
    pub collateral: Coin,
    pub cost: Amount,
    pub price: Decimal,
}

/// Mint/redeem volume of one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    /// `YYYY-MM-DD`
    pub date: String,
    pub total_minted: Amount,
    pub total_redeemed: Amount,
}

impl DailyStats {
    pub fn empty(date: String) -> Self {
        Self {
            date,
            total_minted: Amount::ZERO,
            total_redeemed: Amount::ZERO,
        }
    }
}

/// Recorded proof-of-reserve report for off-chain holdings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainAttestation {
    pub id: u64,
    pub attester: Address,
    pub total_cash: Amount,
    pub total_tbills: Amount,
    pub total_tnotes: Amount,
    pub total_tbonds: Amount,
    pub total_repos: Amount,
    pub total_mmf: Amount,
    pub total_value: Amount,
    pub custodian_name: String,
    pub audit_firm: String,
    pub report_date: DateTime<Utc>,
    /// Hex SHA-256 of the signed report document
    pub attestation_hash: String,
    pub timestamp: DateTime<Utc>,
    pub block_height: u64,
    pub prev_digest: String,
    pub digest: String,
}

/// On-chain plus latest off-chain reserves against outstanding reserve-path supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalReserves {
    pub on_chain_value: Amount,
    pub off_chain_value: Amount,
    pub total_value: Amount,
    pub total_supply: Amount,
    pub reserve_ratio_bps: u32,
    pub last_on_chain_update: Option<DateTime<Utc>>,
    pub last_off_chain_update: Option<DateTime<Utc>>,
}
