//! Governance-set parameters of the vault and reserve engines
//!
//! Missing JSON fields fall back to the defaults below, so a partial params
//! blob (or genesis file) stays loadable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ssusd_core::{Amount, Denom, BPS_DENOMINATOR};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumString};

use crate::error::{StablecoinError, StablecoinResult};

/// Maximum haircut on a reserve asset (50%)
pub const MAX_HAIRCUT_BPS: u32 = 5_000;

/// Maximum mint or redeem fee (10%)
pub const MAX_FEE_BPS: u32 = 1_000;

// === Vaults ===

/// Risk parameters of one collateral type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralParam {
    pub denom: Denom,
    /// Minimum collateral value per unit of debt, e.g. `1.5`
    pub liquidation_ratio: Decimal,
    /// Annual fee rate, stored but not accrued
    #[serde(default)]
    pub stability_fee: Decimal,
    /// Maximum debt of a single vault of this type
    pub debt_limit: Amount,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl CollateralParam {
    pub fn validate(&self) -> StablecoinResult<()> {
        if self.liquidation_ratio < Decimal::ONE {
            return Err(StablecoinError::InvalidParams(format!(
                "liquidation ratio for {} must be at least 1.0, got {}",
                self.denom, self.liquidation_ratio
            )));
        }
        if self.stability_fee.is_sign_negative() {
            return Err(StablecoinError::InvalidParams(format!(
                "stability fee for {} cannot be negative",
                self.denom
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParams {
    #[serde(default = "default_collateral_params")]
    pub collateral_params: Vec<CollateralParam>,
    #[serde(default = "default_true")]
    pub vault_minting_enabled: bool,
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            collateral_params: default_collateral_params(),
            vault_minting_enabled: true,
        }
    }
}

impl VaultParams {
    pub fn validate(&self) -> StablecoinResult<()> {
        let mut seen = BTreeSet::new();
        for param in &self.collateral_params {
            param.validate()?;
            if !seen.insert(&param.denom) {
                return Err(StablecoinError::InvalidParams(format!(
                    "duplicate collateral param for {}",
                    param.denom
                )));
            }
        }
        Ok(())
    }

    pub fn collateral_param(&self, denom: &Denom) -> Option<&CollateralParam> {
        self.collateral_params.iter().find(|p| &p.denom == denom)
    }
}

fn default_collateral_params() -> Vec<CollateralParam> {
    vec![CollateralParam {
        denom: Denom::from_static("uatom"),
        liquidation_ratio: Decimal::new(15, 1),
        stability_fee: Decimal::new(1, 2),
        debt_limit: Amount::from(100_000_000_000_000u64),
        active: true,
    }]
}

// === Auctions ===

/// Maximum liquidation penalty (50%)
pub const MAX_LIQUIDATION_PENALTY_BPS: u32 = 5_000;

/// Dutch auction terms for liquidated collateral. Prices are multiples of
/// the oracle price when the auction starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParams {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_auction_duration")]
    pub duration_secs: u64,
    #[serde(default = "default_start_multiplier")]
    pub start_price_multiplier_bps: u32,
    #[serde(default = "default_end_multiplier")]
    pub end_price_multiplier_bps: u32,
    /// Added to the vault debt the auction tries to raise
    #[serde(default = "default_liquidation_penalty")]
    pub liquidation_penalty_bps: u32,
}

impl Default for AuctionParams {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_secs: default_auction_duration(),
            start_price_multiplier_bps: default_start_multiplier(),
            end_price_multiplier_bps: default_end_multiplier(),
            liquidation_penalty_bps: default_liquidation_penalty(),
        }
    }
}

impl AuctionParams {
    pub fn validate(&self) -> StablecoinResult<()> {
        if self.duration_secs == 0 {
            return Err(StablecoinError::InvalidParams(
                "auction duration must be positive".to_string(),
            ));
        }
        if self.start_price_multiplier_bps < BPS_DENOMINATOR {
            return Err(StablecoinError::InvalidParams(format!(
                "auction start price must be at least {BPS_DENOMINATOR} bps, got {}",
                self.start_price_multiplier_bps
            )));
        }
        if self.end_price_multiplier_bps == 0
            || self.end_price_multiplier_bps > self.start_price_multiplier_bps
        {
            return Err(StablecoinError::InvalidParams(format!(
                "auction end price must be positive and at most the start price, got {} bps",
                self.end_price_multiplier_bps
            )));
        }
        if self.liquidation_penalty_bps > MAX_LIQUIDATION_PENALTY_BPS {
            return Err(StablecoinError::InvalidParams(format!(
                "liquidation penalty cannot exceed {MAX_LIQUIDATION_PENALTY_BPS} bps, got {}",
                self.liquidation_penalty_bps
            )));
        }
        Ok(())
    }
}

fn default_auction_duration() -> u64 {
    6 * 3_600
}

fn default_start_multiplier() -> u32 {
    13_000
}

fn default_end_multiplier() -> u32 {
    8_000
}

fn default_liquidation_penalty() -> u32 {
    1_300
}

// === Reserve ===

/// Underlying instrument of a reserve asset
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReserveAssetType {
    Cash,
    #[serde(rename = "t_bill")]
    #[strum(serialize = "t_bill")]
    TBill,
    #[serde(rename = "t_note")]
    #[strum(serialize = "t_note")]
    TNote,
    #[serde(rename = "t_bond")]
    #[strum(serialize = "t_bond")]
    TBond,
    TokenizedTreasury,
    Repo,
    Mmf,
}

/// An approved tokenized treasury accepted as reserve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedTreasuryConfig {
    pub denom: Denom,
    pub issuer: String,
    pub underlying_type: ReserveAssetType,
    #[serde(default)]
    pub haircut_bps: u32,
    #[serde(default = "default_max_allocation_bps")]
    pub max_allocation_bps: u32,
    /// Price feed denom, usually the denom itself
    pub oracle_denom: Denom,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl TokenizedTreasuryConfig {
    pub fn validate(&self) -> StablecoinResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(StablecoinError::InvalidParams(format!(
                "issuer for {} cannot be empty",
                self.denom
            )));
        }
        if self.haircut_bps > MAX_HAIRCUT_BPS {
            return Err(StablecoinError::InvalidParams(format!(
                "haircut for {} cannot exceed {} bps, got {}",
                self.denom, MAX_HAIRCUT_BPS, self.haircut_bps
            )));
        }
        if self.max_allocation_bps > BPS_DENOMINATOR {
            return Err(StablecoinError::InvalidParams(format!(
                "max allocation for {} cannot exceed {} bps, got {}",
                self.denom, BPS_DENOMINATOR, self.max_allocation_bps
            )));
        }
        Ok(())
    }

    pub fn is_cash(&self) -> bool {
        self.underlying_type == ReserveAssetType::Cash
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveParams {
    #[serde(default = "default_min_reserve_ratio_bps")]
    pub min_reserve_ratio_bps: u32,
    #[serde(default = "default_target_reserve_ratio_bps")]
    pub target_reserve_ratio_bps: u32,
    #[serde(default = "default_fee_bps")]
    pub mint_fee_bps: u32,
    #[serde(default = "default_fee_bps")]
    pub redeem_fee_bps: u32,
    #[serde(default = "default_min_amount")]
    pub min_mint_amount: Amount,
    #[serde(default = "default_min_amount")]
    pub min_redeem_amount: Amount,
    /// Seconds between a redemption request and its execution; 0 executes immediately
    #[serde(default)]
    pub redemption_delay_secs: u64,
    /// Per UTC day; 0 = unlimited
    #[serde(default = "default_max_daily")]
    pub max_daily_mint: Amount,
    /// Per UTC day; 0 = unlimited
    #[serde(default = "default_max_daily")]
    pub max_daily_redeem: Amount,
    #[serde(default = "default_tokenized_treasuries")]
    pub tokenized_treasuries: Vec<TokenizedTreasuryConfig>,
    #[serde(default = "default_true")]
    pub require_kyc: bool,
    #[serde(default)]
    pub mint_paused: bool,
    #[serde(default)]
    pub redeem_paused: bool,
}

impl Default for ReserveParams {
    fn default() -> Self {
        Self {
            min_reserve_ratio_bps: default_min_reserve_ratio_bps(),
            target_reserve_ratio_bps: default_target_reserve_ratio_bps(),
            mint_fee_bps: default_fee_bps(),
            redeem_fee_bps: default_fee_bps(),
            min_mint_amount: default_min_amount(),
            min_redeem_amount: default_min_amount(),
            redemption_delay_secs: 0,
            max_daily_mint: default_max_daily(),
            max_daily_redeem: default_max_daily(),
            tokenized_treasuries: default_tokenized_treasuries(),
            require_kyc: true,
            mint_paused: false,
            redeem_paused: false,
        }
    }
}

impl ReserveParams {
    pub fn validate(&self) -> StablecoinResult<()> {
        if self.min_reserve_ratio_bps < BPS_DENOMINATOR {
            return Err(StablecoinError::InvalidParams(format!(
                "minimum reserve ratio must be at least {} bps, got {}",
                BPS_DENOMINATOR, self.min_reserve_ratio_bps
            )));
        }
        if self.target_reserve_ratio_bps < self.min_reserve_ratio_bps {
            return Err(StablecoinError::InvalidParams(format!(
                "target reserve ratio {} must be >= minimum {}",
                self.target_reserve_ratio_bps, self.min_reserve_ratio_bps
            )));
        }
        for (name, fee) in [("mint", self.mint_fee_bps), ("redeem", self.redeem_fee_bps)] {
            if fee > MAX_FEE_BPS {
                return Err(StablecoinError::InvalidParams(format!(
                    "{name} fee cannot exceed {MAX_FEE_BPS} bps, got {fee}"
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for config in &self.tokenized_treasuries {
            config.validate()?;
            if !seen.insert(&config.denom) {
                return Err(StablecoinError::InvalidParams(format!(
                    "duplicate tokenized treasury {}",
                    config.denom
                )));
            }
        }
        Ok(())
    }

    pub fn tokenized_treasury(&self, denom: &Denom) -> Option<&TokenizedTreasuryConfig> {
        self.tokenized_treasuries.iter().find(|c| &c.denom == denom)
    }

    /// Config for `denom` if it is approved and currently accepted
    pub fn active_treasury(&self, denom: &Denom) -> StablecoinResult<&TokenizedTreasuryConfig> {
        self.tokenized_treasury(denom)
            .filter(|c| c.active)
            .ok_or_else(|| StablecoinError::AssetNotApproved(denom.clone()))
    }

    /// Both reserve paths are halted
    pub fn fully_paused(&self) -> bool {
        self.mint_paused && self.redeem_paused
    }
}

fn default_true() -> bool {
    true
}

fn default_min_reserve_ratio_bps() -> u32 {
    10_000
}

fn default_target_reserve_ratio_bps() -> u32 {
    10_200
}

fn default_fee_bps() -> u32 {
    10
}

fn default_max_allocation_bps() -> u32 {
    BPS_DENOMINATOR
}

fn default_min_amount() -> Amount {
    Amount::from(100_000_000u64)
}

fn default_max_daily() -> Amount {
    Amount::from(100_000_000_000_000u64)
}

fn default_tokenized_treasuries() -> Vec<TokenizedTreasuryConfig> {
    [
        ("usdy", "ondo", ReserveAssetType::TBill, 50, 5_000),
        ("stbt", "matrixdock", ReserveAssetType::TBill, 50, 3_000),
        ("ousg", "ondo", ReserveAssetType::TBond, 100, 3_000),
        ("tbill", "openeden", ReserveAssetType::TBill, 50, 4_000),
        ("usdc", "circle", ReserveAssetType::Cash, 0, 2_000),
    ]
    .into_iter()
    .map(|(denom, issuer, underlying_type, haircut_bps, max_allocation_bps)| {
        TokenizedTreasuryConfig {
            denom: Denom::from_static(denom),
            issuer: issuer.to_string(),
            underlying_type,
            haircut_bps,
            max_allocation_bps,
            oracle_denom: Denom::from_static(denom),
            active: true,
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_validate() {
        VaultParams::default().validate().unwrap();
        ReserveParams::default().validate().unwrap();

        let params = ReserveParams::default();
        assert_eq!(params.tokenized_treasuries.len(), 5);
        let usdc = params.tokenized_treasury(&Denom::new("usdc").unwrap()).unwrap();
        assert!(usdc.is_cash());
        assert_eq!(usdc.max_allocation_bps, 2_000);
    }

    #[test]
    fn test_reserve_params_bounds() {
        let mut params = ReserveParams {
            min_reserve_ratio_bps: 9_999,
            ..ReserveParams::default()
        };
        assert!(params.validate().is_err());

        params.min_reserve_ratio_bps = 10_500;
        params.target_reserve_ratio_bps = 10_400;
        assert!(params.validate().is_err());

        params.target_reserve_ratio_bps = 10_500;
        params.redeem_fee_bps = 1_001;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_duplicate_treasury_rejected() {
        let mut params = ReserveParams::default();
        let dup = params.tokenized_treasuries[0].clone();
        params.tokenized_treasuries.push(dup);
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate tokenized treasury usdy"));
    }

    #[test]
    fn test_haircut_cap() {
        let mut params = ReserveParams::default();
        params.tokenized_treasuries[0].haircut_bps = 5_001;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_collateral_ratio_floor() {
        let mut params = VaultParams::default();
        params.collateral_params[0].liquidation_ratio = dec!(0.99);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_auction_params_bounds() {
        AuctionParams::default().validate().unwrap();
        for params in [
            AuctionParams { duration_secs: 0, ..AuctionParams::default() },
            AuctionParams { start_price_multiplier_bps: 9_999, ..AuctionParams::default() },
            AuctionParams { end_price_multiplier_bps: 13_001, ..AuctionParams::default() },
            AuctionParams { end_price_multiplier_bps: 0, ..AuctionParams::default() },
            AuctionParams { liquidation_penalty_bps: 5_001, ..AuctionParams::default() },
        ] {
            assert!(matches!(params.validate(), Err(StablecoinError::InvalidParams(_))));
        }
        let params: AuctionParams = serde_json::from_str(r#"{ "enabled": false }"#).unwrap();
        assert_eq!(params.duration_secs, 21_600);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: ReserveParams = serde_json::from_str(r#"{ "mint_fee_bps": 0 }"#).unwrap();
        assert_eq!(params.mint_fee_bps, 0);
        assert_eq!(params.redeem_fee_bps, 10);
        assert!(params.require_kyc);

        let asset: ReserveAssetType = serde_json::from_str(r#""t_bill""#).unwrap();
        assert_eq!(asset, ReserveAssetType::TBill);
        assert_eq!(asset.to_string(), "t_bill");
    }

    #[test]
    fn test_inactive_treasury_not_approved() {
        let mut params = ReserveParams::default();
        params.tokenized_treasuries[1].active = false;
        let stbt = Denom::new("stbt").unwrap();
        assert!(matches!(
            params.active_treasury(&stbt),
            Err(StablecoinError::AssetNotApproved(_))
        ));
    }
}
