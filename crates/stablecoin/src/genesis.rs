//! Genesis import/export for the stablecoin module

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ssusd_core::{Address, Coins};
use ssusd_store::Context;
use tracing::info;

use crate::attestation::verify_chain;
use crate::error::{StablecoinError, StablecoinResult};
use crate::keys::{
    ATTESTATION, DAILY_STATS, NEXT_ATTESTATION_ID, NEXT_DEPOSIT_ID, NEXT_REDEMPTION_ID, RESERVE,
    STORE_KEY,
};
use crate::params::{AuctionParams, ReserveParams, VaultParams};
use crate::reserve::ReserveEngine;
use crate::types::{
    DailyStats, DutchAuction, OffChainAttestation, RedemptionRequest, Reserve, ReserveDeposit,
    Vault,
};
use crate::vault::VaultEngine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub vault_params: VaultParams,
    #[serde(default)]
    pub reserve_params: ReserveParams,
    #[serde(default)]
    pub reserve: Reserve,
    #[serde(default = "first_id")]
    pub next_vault_id: u64,
    #[serde(default)]
    pub vaults: Vec<Vault>,
    #[serde(default)]
    pub auction_params: AuctionParams,
    #[serde(default = "first_id")]
    pub next_auction_id: u64,
    #[serde(default)]
    pub auctions: Vec<DutchAuction>,
    #[serde(default = "first_id")]
    pub next_deposit_id: u64,
    #[serde(default = "first_id")]
    pub next_redemption_id: u64,
    #[serde(default = "first_id")]
    pub next_attestation_id: u64,
    #[serde(default)]
    pub reserve_deposits: Vec<ReserveDeposit>,
    #[serde(default)]
    pub redemption_requests: Vec<RedemptionRequest>,
    #[serde(default)]
    pub daily_stats: Vec<DailyStats>,
    #[serde(default)]
    pub attestations: Vec<OffChainAttestation>,
    #[serde(default)]
    pub approved_attesters: Vec<Address>,
}

fn first_id() -> u64 {
    1
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            vault_params: VaultParams::default(),
            reserve_params: ReserveParams::default(),
            reserve: Reserve::default(),
            next_vault_id: 1,
            vaults: Vec::new(),
            auction_params: AuctionParams::default(),
            next_auction_id: 1,
            auctions: Vec::new(),
            next_deposit_id: 1,
            next_redemption_id: 1,
            next_attestation_id: 1,
            reserve_deposits: Vec::new(),
            redemption_requests: Vec::new(),
            daily_stats: Vec::new(),
            attestations: Vec::new(),
            approved_attesters: Vec::new(),
        }
    }
}

impl GenesisState {
    pub fn validate(&self) -> StablecoinResult<()> {
        self.vault_params.validate()?;
        self.reserve_params.validate()?;
        self.auction_params.validate()?;

        check_ids("vault", self.vaults.iter().map(|v| v.id), self.next_vault_id)?;
        check_ids("auction", self.auctions.iter().map(|a| a.id), self.next_auction_id)?;
        check_ids(
            "reserve deposit",
            self.reserve_deposits.iter().map(|d| d.id),
            self.next_deposit_id,
        )?;
        check_ids(
            "redemption request",
            self.redemption_requests.iter().map(|r| r.id),
            self.next_redemption_id,
        )?;
        check_ids(
            "attestation",
            self.attestations.iter().map(|a| a.id),
            self.next_attestation_id,
        )?;

        for vault in &self.vaults {
            if self.vault_params.collateral_param(&vault.collateral.denom).is_none() {
                return Err(invalid(format!(
                    "vault {} holds unsupported collateral {}",
                    vault.id, vault.collateral.denom
                )));
            }
        }
        for auction in &self.auctions {
            self.validate_auction(auction)?;
        }
        if let Some(stats) = self.daily_stats.iter().find(|s| s.date.is_empty()) {
            return Err(invalid(format!("daily stats with empty date: {stats:?}")));
        }
        let mut dates = HashSet::new();
        if let Some(stats) = self.daily_stats.iter().find(|s| !dates.insert(&s.date)) {
            return Err(invalid(format!("duplicate daily stats for {}", stats.date)));
        }
        for attestation in &self.attestations {
            if attestation.custodian_name.trim().is_empty() {
                return Err(invalid(format!(
                    "attestation {} has no custodian",
                    attestation.id
                )));
            }
        }
        verify_chain(&self.attestations).map_err(|err| invalid(err.to_string()))?;
        Ok(())
    }

    fn validate_auction(&self, auction: &DutchAuction) -> StablecoinResult<()> {
        let id = auction.id;
        if self.vault_params.collateral_param(&auction.collateral.denom).is_none() {
            return Err(invalid(format!(
                "auction {id} sells unsupported collateral {}",
                auction.collateral.denom
            )));
        }
        if auction.duration_secs == 0 {
            return Err(invalid(format!("auction {id} has zero duration")));
        }
        if auction.end_price > auction.start_price {
            return Err(invalid(format!("auction {id} price rises over time")));
        }
        if auction.collateral_sold > auction.collateral.amount {
            return Err(invalid(format!("auction {id} sold more collateral than it holds")));
        }
        if auction.debt > auction.debt_to_cover || auction.debt_raised > auction.debt_to_cover {
            return Err(invalid(format!("auction {id} debt exceeds debt to cover")));
        }
        Ok(())
    }

    /// Reserve assets locked by the pending requests
    pub fn locked_reserves(&self) -> StablecoinResult<Coins> {
        let mut locked = Coins::new();
        for request in self.redemption_requests.iter().filter(|r| r.is_pending()) {
            locked.add(&request.output)?;
        }
        Ok(locked)
    }

    pub fn export(ctx: &Context, vaults: &VaultEngine, reserve: &ReserveEngine) -> StablecoinResult<Self> {
        Ok(Self {
            vault_params: vaults.params(ctx)?,
            reserve_params: reserve.reserve_params(ctx)?,
            reserve: reserve.reserve(ctx)?,
            next_vault_id: vaults.next_vault_id(ctx)?,
            vaults: vaults.vaults(ctx)?,
            auction_params: vaults.auction_params(ctx)?,
            next_auction_id: vaults.next_auction_id(ctx)?,
            auctions: vaults.auctions(ctx)?,
            next_deposit_id: reserve.next_deposit_id(ctx)?,
            next_redemption_id: reserve.next_redemption_id(ctx)?,
            next_attestation_id: reserve.next_attestation_id(ctx)?,
            reserve_deposits: reserve.deposits(ctx)?,
            redemption_requests: reserve.redemptions(ctx)?,
            daily_stats: reserve.all_daily_stats(ctx)?,
            attestations: reserve.attestations(ctx)?,
            approved_attesters: reserve.approved_attesters(ctx)?,
        })
    }

    pub fn init(&self, ctx: &mut Context, vaults: &VaultEngine, reserve: &ReserveEngine) -> StablecoinResult<()> {
        self.validate()?;

        vaults.import(ctx, &self.vault_params, &self.vaults, self.next_vault_id)?;
        vaults.import_auctions(ctx, &self.auction_params, &self.auctions, self.next_auction_id)?;

        reserve.store_params(ctx, &self.reserve_params)?;
        ctx.set(&STORE_KEY.key(RESERVE), &self.reserve)?;
        for deposit in &self.reserve_deposits {
            reserve.save_deposit(ctx, deposit)?;
        }
        for request in &self.redemption_requests {
            reserve.save_redemption(ctx, request)?;
        }
        reserve.set_locked_reserves(ctx, &self.locked_reserves()?)?;
        for stats in &self.daily_stats {
            ctx.set(&STORE_KEY.str_key(DAILY_STATS, &stats.date), stats)?;
        }
        for attestation in &self.attestations {
            ctx.set(&STORE_KEY.id_key(ATTESTATION, attestation.id), attestation)?;
        }
        for attester in &self.approved_attesters {
            reserve.store_attester(ctx, attester, true)?;
        }

        ctx.set(&STORE_KEY.key(NEXT_DEPOSIT_ID), &self.next_deposit_id)?;
        ctx.set(&STORE_KEY.key(NEXT_REDEMPTION_ID), &self.next_redemption_id)?;
        ctx.set(&STORE_KEY.key(NEXT_ATTESTATION_ID), &self.next_attestation_id)?;

        info!(
            vaults = self.vaults.len(),
            auctions = self.auctions.len(),
            deposits = self.reserve_deposits.len(),
            redemptions = self.redemption_requests.len(),
            attestations = self.attestations.len(),
            "stablecoin genesis initialized"
        );
        Ok(())
    }
}

fn invalid(detail: String) -> StablecoinError {
    StablecoinError::InvalidGenesis(detail)
}

/// Ids are unique and below the next id, which is at least 1
fn check_ids(what: &str, ids: impl Iterator<Item = u64>, next_id: u64) -> StablecoinResult<()> {
    if next_id == 0 {
        return Err(invalid(format!("next {what} id must be at least 1")));
    }
    let mut seen = HashSet::new();
    for id in ids {
        if id == 0 || id >= next_id {
            return Err(invalid(format!(
                "{what} id {id} outside 1..{next_id}"
            )));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {what} id {id}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::AttestationReport;
    use crate::params::ReserveParams;
    use crate::reserve::tests::{open_params, setup};
    use crate::testing::{addr, atom, coin, governance, ssusd, t0};
    use rust_decimal_macros::dec;
    use ssusd_core::Amount;
    use ssusd_store::{BlockHeader, MemStore};

    fn populated() -> (crate::testing::Harness, VaultEngine, ReserveEngine) {
        let (mut h, reserve) = setup(ReserveParams {
            redemption_delay_secs: 600,
            ..open_params()
        });
        let vaults = VaultEngine::new(h.collab());
        h.set_price("uatom", dec!(10));
        h.fund("bob", "uatom", 5_000);

        let mut ctx = h.ctx();
        vaults
            .create_vault(&mut ctx, &addr("bob"), atom(1_000), ssusd(2_000))
            .unwrap();
        vaults
            .create_vault(&mut ctx, &addr("bob"), atom(500), ssusd(0))
            .unwrap();
        reserve
            .deposit_reserve(&mut ctx, &addr("alice"), coin("usdy", 3_000))
            .unwrap();
        reserve
            .request_redemption(&mut ctx, &addr("alice"), Amount::from(700), &coin("usdy", 0).denom)
            .unwrap();
        reserve
            .set_approved_attester(&mut ctx, &governance(), &addr("auditor"), true)
            .unwrap();
        reserve
            .record_attestation(
                &mut ctx,
                &addr("auditor"),
                AttestationReport {
                    total_cash: Amount::from(100),
                    total_tbills: Amount::ZERO,
                    total_tnotes: Amount::ZERO,
                    total_tbonds: Amount::ZERO,
                    total_repos: Amount::ZERO,
                    total_mmf: Amount::ZERO,
                    total_value: Amount::from(100),
                    custodian_name: "State Street".to_string(),
                    audit_firm: String::new(),
                    report_date: t0(),
                    attestation_hash: "0f".repeat(32),
                },
            )
            .unwrap();
        drop(ctx);
        (h, vaults, reserve)
    }

    #[test]
    fn test_export_init_round_trip() {
        let (mut h, vaults, reserve) = populated();
        let exported = GenesisState::export(&h.ctx(), &vaults, &reserve).unwrap();
        assert_eq!(exported.vaults.len(), 2);
        assert_eq!(exported.next_vault_id, 3);
        assert_eq!(exported.redemption_requests.len(), 1);
        exported.validate().unwrap();

        let json = serde_json::to_string(&exported).unwrap();
        let parsed: GenesisState = serde_json::from_str(&json).unwrap();

        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, BlockHeader::new(1, t0()));
        parsed.init(&mut ctx, &vaults, &reserve).unwrap();
        assert_eq!(GenesisState::export(&ctx, &vaults, &reserve).unwrap(), exported);
        assert_eq!(
            reserve.locked_reserves(&ctx).unwrap().amount_of(&coin("usdy", 0).denom),
            Amount::from(700)
        );
        reserve.verify_attestation_chain(&ctx).unwrap();
    }

    #[test]
    fn test_default_is_valid() {
        GenesisState::default().validate().unwrap();
        let parsed: GenesisState = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, GenesisState::default());
    }

    #[test]
    fn test_validate_rejects_bad_ids() {
        let (mut h, vaults, reserve) = populated();
        let exported = GenesisState::export(&h.ctx(), &vaults, &reserve).unwrap();

        let mut state = exported.clone();
        state.next_vault_id = 2;
        assert!(matches!(state.validate(), Err(StablecoinError::InvalidGenesis(_))));

        let mut state = exported.clone();
        state.next_deposit_id = 0;
        assert!(state.validate().is_err());

        let mut state = exported.clone();
        state.vaults[1].id = 1;
        assert!(state.validate().is_err());

        let mut state = exported;
        state.attestations[0].total_value = Amount::from(1);
        let err = state.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid digest"));
    }

    #[test]
    fn test_auctions_round_trip() {
        let (mut h, vaults, reserve) = populated();
        h.set_price("uatom", dec!(2));
        vaults
            .liquidate_vault_with_auction(&mut h.ctx(), &addr("keeper"), 1)
            .unwrap();
        let exported = GenesisState::export(&h.ctx(), &vaults, &reserve).unwrap();
        assert_eq!(exported.vaults.len(), 1);
        assert_eq!(exported.auctions.len(), 1);
        assert_eq!(exported.next_auction_id, 2);
        assert_eq!(exported.auctions[0].debt_to_cover, Amount::from(2_260));
        exported.validate().unwrap();

        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, BlockHeader::new(1, t0()));
        exported.init(&mut ctx, &vaults, &reserve).unwrap();
        assert_eq!(GenesisState::export(&ctx, &vaults, &reserve).unwrap(), exported);
        assert_eq!(vaults.active_auctions(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_auctions() {
        let (mut h, vaults, reserve) = populated();
        h.set_price("uatom", dec!(2));
        vaults
            .liquidate_vault_with_auction(&mut h.ctx(), &addr("keeper"), 1)
            .unwrap();
        let exported = GenesisState::export(&h.ctx(), &vaults, &reserve).unwrap();

        let mut state = exported.clone();
        state.next_auction_id = 1;
        assert!(matches!(state.validate(), Err(StablecoinError::InvalidGenesis(_))));

        let mut state = exported.clone();
        state.auctions[0].collateral_sold = Amount::from(1_001);
        assert!(state.validate().is_err());

        let mut state = exported.clone();
        state.auctions[0].end_price = dec!(100);
        assert!(state.validate().is_err());

        let mut state = exported;
        state.auction_params.end_price_multiplier_bps = 0;
        assert!(state.validate().is_err());
    }
}
