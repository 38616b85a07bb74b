//! Vault Engine - collateralized debt positions
//!
//! Each operation validates fully (ownership, params, compliance, oracle
//! price, balances) before the first ledger call, then moves funds, then
//! writes state and emits its event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use ssusd_core::{Address, Amount, Authority, Coin, Event, Governance};
use ssusd_store::Context;
use tracing::{info, warn};

use crate::collab::Collaborators;
use crate::error::{StablecoinError, StablecoinResult};
use crate::keys::{STORE_KEY, VAULT, VAULT_COUNT, VAULT_PARAMS};
use crate::params::{CollateralParam, VaultParams};
use crate::types::Vault;
use crate::MODULE_NAME;

pub struct VaultEngine {
    pub(crate) collab: Collaborators,
}

impl VaultEngine {
    pub fn new(collab: Collaborators) -> Self {
        Self { collab }
    }

    // === Params ===

    pub fn params(&self, ctx: &Context) -> StablecoinResult<VaultParams> {
        Ok(ctx
            .get(&STORE_KEY.key(VAULT_PARAMS))?
            .unwrap_or_default())
    }

    pub fn set_params(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        params: VaultParams,
    ) -> StablecoinResult<()> {
        params.validate()?;
        ctx.set(&STORE_KEY.key(VAULT_PARAMS), &params)?;
        info!(authority = %authority.address(), "vault params updated");
        ctx.emit(Event::VaultParamsUpdated {
            authority: authority.address().clone(),
        });
        Ok(())
    }

    // === Queries ===

    pub fn vault(&self, ctx: &Context, id: u64) -> StablecoinResult<Vault> {
        ctx.get(&STORE_KEY.id_key(VAULT, id))?
            .ok_or(StablecoinError::VaultNotFound(id))
    }

    /// All vaults in id order
    pub fn vaults(&self, ctx: &Context) -> StablecoinResult<Vec<Vault>> {
        Ok(ctx.scan_values(&STORE_KEY.key(VAULT))?)
    }

    pub fn vaults_by_owner(&self, ctx: &Context, owner: &Address) -> StablecoinResult<Vec<Vault>> {
        Ok(self
            .vaults(ctx)?
            .into_iter()
            .filter(|v| &v.owner == owner)
            .collect())
    }

    /// Id the next vault will get
    pub fn next_vault_id(&self, ctx: &Context) -> StablecoinResult<u64> {
        Ok(ctx.get(&STORE_KEY.key(VAULT_COUNT))?.unwrap_or(1))
    }

    // === Operations ===

    /// Open a vault, optionally minting `initial_debt` against it
    pub fn create_vault(
        &self,
        ctx: &mut Context,
        owner: &Address,
        collateral: Coin,
        initial_debt: Coin,
    ) -> StablecoinResult<u64> {
        let now = ctx.block_time();
        let params = self.params(ctx)?;
        let param = active_param(&params, &collateral)?;

        if collateral.is_zero() {
            return Err(StablecoinError::InvalidAmount(
                "collateral must be positive".to_string(),
            ));
        }
        self.collab.compliance.assert_compliant(owner, now)?;

        let id = self.next_vault_id(ctx)?;
        if initial_debt.amount.is_positive() {
            self.validate_mint(&params, param, id, owner, &collateral, Amount::ZERO, &initial_debt, now)?;
        }
        self.collab.ensure_balance(owner, &collateral)?;

        self.collab
            .ledger
            .send_coins_from_account_to_module(owner, MODULE_NAME, std::slice::from_ref(&collateral))?;
        if initial_debt.amount.is_positive() {
            self.collab.mint_to(owner, initial_debt.amount)?;
        }

        let vault = Vault {
            id,
            owner: owner.clone(),
            collateral,
            debt: initial_debt.amount,
            created_at: now,
            updated_height: ctx.block_height(),
        };
        self.save(ctx, &vault)?;
        ctx.set(&STORE_KEY.key(VAULT_COUNT), &(id + 1))?;

        info!(
            vault_id = id,
            owner = %owner,
            collateral = %vault.collateral,
            debt = %vault.debt,
            "vault created"
        );
        ctx.emit(Event::VaultCreated {
            vault_id: id,
            owner: owner.clone(),
            collateral: vault.collateral.clone(),
            debt: vault.debt,
        });
        Ok(id)
    }

    pub fn deposit_collateral(
        &self,
        ctx: &mut Context,
        owner: &Address,
        id: u64,
        amount: Coin,
    ) -> StablecoinResult<()> {
        let mut vault = self.owned_vault(ctx, owner, id)?;
        ensure_denom(&vault.collateral, &amount)?;
        if amount.is_zero() {
            return Err(StablecoinError::InvalidAmount(
                "deposit must be positive".to_string(),
            ));
        }
        let new_amount = vault
            .collateral
            .amount
            .checked_add(&amount.amount)
            .ok_or(StablecoinError::Overflow("vault collateral"))?;
        self.collab.ensure_balance(owner, &amount)?;

        self.collab
            .ledger
            .send_coins_from_account_to_module(owner, MODULE_NAME, std::slice::from_ref(&amount))?;

        vault.collateral.amount = new_amount;
        vault.updated_height = ctx.block_height();
        self.save(ctx, &vault)?;

        info!(vault_id = id, amount = %amount, "collateral deposited");
        ctx.emit(Event::CollateralDeposited {
            vault_id: id,
            owner: owner.clone(),
            amount,
        });
        Ok(())
    }

    pub fn withdraw_collateral(
        &self,
        ctx: &mut Context,
        owner: &Address,
        id: u64,
        amount: Coin,
    ) -> StablecoinResult<()> {
        let mut vault = self.owned_vault(ctx, owner, id)?;
        ensure_denom(&vault.collateral, &amount)?;
        if amount.is_zero() {
            return Err(StablecoinError::InvalidAmount(
                "withdrawal must be positive".to_string(),
            ));
        }
        let remaining = vault.collateral.amount.checked_sub(&amount.amount).ok_or_else(|| {
            StablecoinError::InvalidAmount(format!(
                "insufficient collateral: vault {} holds {}, requested {}",
                id, vault.collateral, amount
            ))
        })?;

        let params = self.params(ctx)?;
        let param = params
            .collateral_param(&vault.collateral.denom)
            .ok_or_else(|| StablecoinError::UnsupportedCollateral(vault.collateral.denom.clone()))?;
        let remaining_coin = Coin::new(vault.collateral.denom.clone(), remaining);
        self.check_collateralization(id, &remaining_coin, vault.debt, param, ctx.block_time())?;

        self.collab
            .ledger
            .send_coins_from_module_to_account(MODULE_NAME, owner, std::slice::from_ref(&amount))?;

        vault.collateral = remaining_coin;
        vault.updated_height = ctx.block_height();
        self.save(ctx, &vault)?;

        info!(vault_id = id, amount = %amount, "collateral withdrawn");
        ctx.emit(Event::CollateralWithdrawn {
            vault_id: id,
            owner: owner.clone(),
            amount,
        });
        Ok(())
    }

    pub fn mint_stablecoin(
        &self,
        ctx: &mut Context,
        owner: &Address,
        id: u64,
        amount: Coin,
    ) -> StablecoinResult<()> {
        let now = ctx.block_time();
        let mut vault = self.owned_vault(ctx, owner, id)?;
        if amount.is_zero() {
            return Err(StablecoinError::InvalidAmount(
                "mint amount must be positive".to_string(),
            ));
        }
        let params = self.params(ctx)?;
        let param = params
            .collateral_param(&vault.collateral.denom)
            .ok_or_else(|| StablecoinError::UnsupportedCollateral(vault.collateral.denom.clone()))?;
        let new_debt =
            self.validate_mint(&params, param, id, owner, &vault.collateral, vault.debt, &amount, now)?;

        self.collab.mint_to(owner, amount.amount)?;

        vault.debt = new_debt;
        vault.updated_height = ctx.block_height();
        self.save(ctx, &vault)?;

        info!(vault_id = id, amount = %amount.amount, debt = %new_debt, "stablecoin minted");
        ctx.emit(Event::StablecoinMinted {
            vault_id: id,
            owner: owner.clone(),
            amount: amount.amount,
        });
        Ok(())
    }

    /// Repay up to the outstanding debt; returns the amount actually repaid
    pub fn repay_stablecoin(
        &self,
        ctx: &mut Context,
        owner: &Address,
        id: u64,
        amount: Coin,
    ) -> StablecoinResult<Amount> {
        let mut vault = self.owned_vault(ctx, owner, id)?;
        ensure_stablecoin(&amount)?;
        if amount.is_zero() {
            return Err(StablecoinError::InvalidAmount(
                "repay amount must be positive".to_string(),
            ));
        }
        if vault.debt.is_zero() {
            return Err(StablecoinError::InvalidAmount(format!(
                "vault {id} has no outstanding debt"
            )));
        }

        let repaid = amount.amount.min(vault.debt);
        self.collab
            .ensure_balance(owner, &Coin::stablecoin(repaid))?;
        self.collab.burn_from(owner, repaid)?;

        vault.debt = vault.debt.saturating_sub(&repaid);
        vault.updated_height = ctx.block_height();
        self.save(ctx, &vault)?;

        info!(vault_id = id, repaid = %repaid, debt = %vault.debt, "stablecoin repaid");
        ctx.emit(Event::StablecoinRepaid {
            vault_id: id,
            owner: owner.clone(),
            amount: repaid,
        });
        Ok(repaid)
    }

    /// Close an under-collateralized vault. The liquidator burns the full
    /// debt and receives the full collateral.
    pub fn liquidate_vault(
        &self,
        ctx: &mut Context,
        liquidator: &Address,
        id: u64,
    ) -> StablecoinResult<Coin> {
        let vault = self.liquidatable_vault(ctx, id)?;

        self.collab
            .ensure_balance(liquidator, &Coin::stablecoin(vault.debt))?;
        self.collab.burn_from(liquidator, vault.debt)?;
        self.collab.ledger.send_coins_from_module_to_account(
            MODULE_NAME,
            liquidator,
            std::slice::from_ref(&vault.collateral),
        )?;

        ctx.delete(&STORE_KEY.id_key(VAULT, id));

        warn!(
            vault_id = id,
            owner = %vault.owner,
            liquidator = %liquidator,
            debt = %vault.debt,
            collateral = %vault.collateral,
            "vault liquidated"
        );
        ctx.emit(Event::VaultLiquidated {
            vault_id: id,
            owner: vault.owner.clone(),
            liquidator: liquidator.clone(),
            collateral: vault.collateral.clone(),
            debt: vault.debt,
        });
        Ok(vault.collateral)
    }

    /// Passes iff `collateral x price >= debt x liquidation_ratio`; zero debt
    /// always passes. Fails closed when the price is missing or stale.
    pub fn check_collateralization(
        &self,
        vault_id: u64,
        collateral: &Coin,
        debt: Amount,
        param: &CollateralParam,
        now: DateTime<Utc>,
    ) -> StablecoinResult<()> {
        if debt.is_zero() {
            return Ok(());
        }
        let price = self.collab.price(&collateral.denom, now)?;
        let collateral_value = collateral
            .amount
            .value()
            .checked_mul(price)
            .ok_or(StablecoinError::Overflow("collateral value"))?;
        let required = debt
            .value()
            .checked_mul(param.liquidation_ratio)
            .ok_or(StablecoinError::Overflow("required collateral"))?;

        if collateral_value < required {
            return Err(StablecoinError::UnderCollateralized {
                vault_id,
                collateral_value,
                required,
            });
        }
        Ok(())
    }

    /// Collateral value of a vault at the current price
    pub fn collateral_value(&self, vault: &Vault, now: DateTime<Utc>) -> StablecoinResult<Decimal> {
        let price = self.collab.price(&vault.collateral.denom, now)?;
        vault
            .collateral
            .amount
            .value()
            .checked_mul(price)
            .ok_or(StablecoinError::Overflow("collateral value"))
    }

    // === Internal ===

    /// The vault, provided it fails the collateralization check
    pub(crate) fn liquidatable_vault(&self, ctx: &Context, id: u64) -> StablecoinResult<Vault> {
        let vault = self.vault(ctx, id)?;
        let params = self.params(ctx)?;
        let param = params
            .collateral_param(&vault.collateral.denom)
            .ok_or_else(|| StablecoinError::UnsupportedCollateral(vault.collateral.denom.clone()))?;

        match self.check_collateralization(id, &vault.collateral, vault.debt, param, ctx.block_time()) {
            Ok(()) => Err(StablecoinError::VaultHealthy(id)),
            Err(StablecoinError::UnderCollateralized { .. }) => Ok(vault),
            Err(err) => Err(err),
        }
    }

    /// Checks shared by `create_vault` and `mint_stablecoin`; returns the new debt
    #[allow(clippy::too_many_arguments)]
    fn validate_mint(
        &self,
        params: &VaultParams,
        param: &CollateralParam,
        vault_id: u64,
        owner: &Address,
        collateral: &Coin,
        current_debt: Amount,
        amount: &Coin,
        now: DateTime<Utc>,
    ) -> StablecoinResult<Amount> {
        ensure_stablecoin(amount)?;
        if !params.vault_minting_enabled {
            return Err(StablecoinError::MintingDisabled);
        }
        if !param.active {
            return Err(StablecoinError::CollateralInactive(param.denom.clone()));
        }
        self.collab
            .compliance
            .assert_compliant_for_amount(owner, amount, now)?;

        let new_debt = current_debt
            .checked_add(&amount.amount)
            .ok_or(StablecoinError::Overflow("vault debt"))?;
        if new_debt > param.debt_limit {
            return Err(StablecoinError::DebtLimitExceeded {
                denom: param.denom.clone(),
                requested: new_debt,
                limit: param.debt_limit,
            });
        }
        self.check_collateralization(vault_id, collateral, new_debt, param, now)?;
        Ok(new_debt)
    }

    fn owned_vault(&self, ctx: &Context, owner: &Address, id: u64) -> StablecoinResult<Vault> {
        let vault = self.vault(ctx, id)?;
        if &vault.owner != owner {
            return Err(StablecoinError::Unauthorized(format!(
                "{owner} does not own vault {id}"
            )));
        }
        Ok(vault)
    }

    fn save(&self, ctx: &mut Context, vault: &Vault) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.id_key(VAULT, vault.id), vault)?;
        Ok(())
    }

    /// Restore params, vaults and the id counter (genesis)
    pub(crate) fn import(
        &self,
        ctx: &mut Context,
        params: &VaultParams,
        vaults: &[Vault],
        next_id: u64,
    ) -> StablecoinResult<()> {
        ctx.set(&STORE_KEY.key(VAULT_PARAMS), params)?;
        for vault in vaults {
            self.save(ctx, vault)?;
        }
        ctx.set(&STORE_KEY.key(VAULT_COUNT), &next_id)?;
        Ok(())
    }
}

fn active_param<'p>(params: &'p VaultParams, collateral: &Coin) -> StablecoinResult<&'p CollateralParam> {
    let param = params
        .collateral_param(&collateral.denom)
        .ok_or_else(|| StablecoinError::UnsupportedCollateral(collateral.denom.clone()))?;
    if !param.active {
        return Err(StablecoinError::CollateralInactive(collateral.denom.clone()));
    }
    Ok(param)
}

fn ensure_denom(expected: &Coin, actual: &Coin) -> StablecoinResult<()> {
    if expected.denom != actual.denom {
        return Err(StablecoinError::DenomMismatch {
            expected: expected.denom.clone(),
            actual: actual.denom.clone(),
        });
    }
    Ok(())
}

fn ensure_stablecoin(coin: &Coin) -> StablecoinResult<()> {
    if !coin.denom.is_stablecoin() {
        return Err(StablecoinError::DenomMismatch {
            expected: ssusd_core::Denom::stablecoin(),
            actual: coin.denom.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, atom, coin, ssusd, Harness};
    use rust_decimal_macros::dec;
    use ssusd_compliance::{ComplianceError, ComplianceProfile, ProfileRegistry};
    use ssusd_core::ErrorKind;
    use ssusd_oracle::OracleError;
    use std::sync::Arc;

    fn setup() -> (Harness, VaultEngine) {
        let h = Harness::new();
        h.set_price("uatom", dec!(10));
        h.fund("alice", "uatom", 10_000);
        let engine = VaultEngine::new(h.collab());
        (h, engine)
    }

    #[test]
    fn test_create_vault_with_debt() {
        let (mut h, engine) = setup();
        let mut ctx = h.ctx();

        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(5_000))
            .unwrap();
        assert_eq!(id, 1);

        let vault = engine.vault(&ctx, id).unwrap();
        assert_eq!(vault.collateral, atom(1_000));
        assert_eq!(vault.debt, Amount::from(5_000));
        assert_eq!(ctx.events()[0].kind(), "vault_created");
        drop(ctx);

        assert_eq!(h.balance("alice", "uatom"), Amount::from(9_000));
        assert_eq!(h.balance("alice", "ussusd"), Amount::from(5_000));
        assert_eq!(h.module_balance("uatom"), Amount::from(1_000));
    }

    #[test]
    fn test_vault_ids_are_monotonic() {
        let (mut h, engine) = setup();
        let mut ctx = h.ctx();
        let a = engine
            .create_vault(&mut ctx, &addr("alice"), atom(100), ssusd(0))
            .unwrap();
        let b = engine
            .create_vault(&mut ctx, &addr("alice"), atom(100), ssusd(0))
            .unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(engine.vaults_by_owner(&ctx, &addr("alice")).unwrap().len(), 2);
    }

    #[test]
    fn test_create_rejects_unsupported_and_undercollateralized() {
        let (mut h, engine) = setup();
        h.fund("alice", "uosmo", 1_000);
        let mut ctx = h.ctx();

        let err = engine
            .create_vault(&mut ctx, &addr("alice"), coin("uosmo", 100), ssusd(0))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::UnsupportedCollateral(_)));

        // 1000 * $10 = 10000 < 7000 * 1.5
        let err = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(7_000))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::UnderCollateralized { .. }));
        drop(ctx);

        // nothing moved
        assert_eq!(h.balance("alice", "uatom"), Amount::from(10_000));
    }

    #[test]
    fn test_create_requires_compliance() {
        let mut h = Harness::with_compliance(Arc::new(ProfileRegistry::default()));
        h.set_price("uatom", dec!(10));
        h.fund("alice", "uatom", 1_000);
        let engine = VaultEngine::new(h.collab());
        let mut ctx = h.ctx();

        let err = engine
            .create_vault(&mut ctx, &addr("alice"), atom(100), ssusd(0))
            .unwrap_err();
        assert!(matches!(
            err,
            StablecoinError::Compliance(ComplianceError::ProfileNotFound(_))
        ));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let (mut h, engine) = setup();
        let mut ctx = h.ctx();
        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(5_000))
            .unwrap();

        engine
            .deposit_collateral(&mut ctx, &addr("alice"), id, atom(500))
            .unwrap();
        assert_eq!(engine.vault(&ctx, id).unwrap().collateral, atom(1_500));

        // 750 * 10 = 7500 == 5000 * 1.5, exactly at the boundary
        engine
            .withdraw_collateral(&mut ctx, &addr("alice"), id, atom(750))
            .unwrap();
        let err = engine
            .withdraw_collateral(&mut ctx, &addr("alice"), id, atom(1))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::UnderCollateralized { .. }));
        assert_eq!(engine.vault(&ctx, id).unwrap().collateral, atom(750));
    }

    #[test]
    fn test_deposit_wrong_owner_or_denom() {
        let (mut h, engine) = setup();
        h.fund("bob", "uatom", 100);
        let mut ctx = h.ctx();
        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(100), ssusd(0))
            .unwrap();

        let err = engine
            .deposit_collateral(&mut ctx, &addr("bob"), id, atom(10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = engine
            .deposit_collateral(&mut ctx, &addr("alice"), id, ssusd(10))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::DenomMismatch { .. }));
    }

    #[test]
    fn test_withdraw_uses_current_price() {
        let (mut h, engine) = setup();
        let id = {
            let mut ctx = h.ctx();
            engine
                .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(1_000))
                .unwrap()
        };
        h.set_price("uatom", dec!(2));
        let mut ctx = h.ctx();
        // 600 * 2 = 1200 < 1500
        let err = engine
            .withdraw_collateral(&mut ctx, &addr("alice"), id, atom(400))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::UnderCollateralized { .. }));
    }

    #[test]
    fn test_mint_checks() {
        let (mut h, engine) = setup();
        let mut ctx = h.ctx();
        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(0))
            .unwrap();

        engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, ssusd(6_000))
            .unwrap();
        let err = engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, ssusd(1_000))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::UnderCollateralized { .. }));

        let err = engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, atom(10))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::DenomMismatch { .. }));
    }

    #[test]
    fn test_mint_respects_debt_limit_and_switch() {
        let (mut h, engine) = setup();
        let mut ctx = h.ctx();
        let gov = crate::testing::governance();

        let mut params = VaultParams::default();
        params.collateral_params[0].debt_limit = Amount::from(1_000);
        engine.set_params(&mut ctx, &gov, params.clone()).unwrap();

        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(0))
            .unwrap();
        let err = engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, ssusd(1_001))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::DebtLimitExceeded { .. }));

        params.vault_minting_enabled = false;
        engine.set_params(&mut ctx, &gov, params).unwrap();
        let err = engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, ssusd(10))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::MintingDisabled));
    }

    #[test]
    fn test_mint_fails_closed_without_price() {
        let (mut h, engine) = setup();
        let id = {
            let mut ctx = h.ctx();
            engine
                .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(0))
                .unwrap()
        };
        h.oracle.remove_price(&atom(0).denom);
        let mut ctx = h.ctx();
        let err = engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, ssusd(10))
            .unwrap_err();
        assert!(matches!(
            err,
            StablecoinError::Oracle(OracleError::PriceNotFound { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Collaborator);
    }

    #[test]
    fn test_mint_fails_closed_on_stale_price() {
        let (mut h, engine) = setup();
        let id = {
            let mut ctx = h.ctx();
            engine
                .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(0))
                .unwrap()
        };
        h.advance(7_200);
        let mut ctx = h.ctx();
        let err = engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, ssusd(10))
            .unwrap_err();
        assert!(matches!(
            err,
            StablecoinError::Oracle(OracleError::StalePrice { .. })
        ));
    }

    #[test]
    fn test_repay_is_clamped() {
        let (mut h, engine) = setup();
        h.fund("alice", "ussusd", 1_000);
        let mut ctx = h.ctx();
        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(2_000))
            .unwrap();

        let repaid = engine
            .repay_stablecoin(&mut ctx, &addr("alice"), id, ssusd(2_500))
            .unwrap();
        assert_eq!(repaid, Amount::from(2_000));
        assert_eq!(engine.vault(&ctx, id).unwrap().debt, Amount::ZERO);
        drop(ctx);
        assert_eq!(h.balance("alice", "ussusd"), Amount::from(1_000));
    }

    #[test]
    fn test_repay_requires_debt_and_owner() {
        let (mut h, engine) = setup();
        h.fund("bob", "uatom", 1_000);
        let mut ctx = h.ctx();
        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(2_000))
            .unwrap();
        let other = engine
            .create_vault(&mut ctx, &addr("bob"), atom(1_000), ssusd(0))
            .unwrap();

        let err = engine
            .repay_stablecoin(&mut ctx, &addr("bob"), other, ssusd(100))
            .unwrap_err();
        assert!(matches!(err, StablecoinError::InvalidAmount(_)));
        let err = engine
            .repay_stablecoin(&mut ctx, &addr("bob"), id, ssusd(100))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_liquidation() {
        let (mut h, engine) = setup();
        let id = {
            let mut ctx = h.ctx();
            engine
                .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(5_000))
                .unwrap()
        };
        h.fund("keeper", "ussusd", 5_000);

        {
            let mut ctx = h.ctx();
            let err = engine
                .liquidate_vault(&mut ctx, &addr("keeper"), id)
                .unwrap_err();
            assert!(matches!(err, StablecoinError::VaultHealthy(1)));
        }

        h.set_price("uatom", dec!(6));
        let mut ctx = h.ctx();
        let seized = engine
            .liquidate_vault(&mut ctx, &addr("keeper"), id)
            .unwrap();
        assert_eq!(seized, atom(1_000));
        assert!(matches!(
            engine.vault(&ctx, id),
            Err(StablecoinError::VaultNotFound(1))
        ));
        let err = engine
            .liquidate_vault(&mut ctx, &addr("keeper"), id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        drop(ctx);

        assert_eq!(h.balance("keeper", "ussusd"), Amount::ZERO);
        assert_eq!(h.balance("keeper", "uatom"), Amount::from(1_000));
    }

    #[test]
    fn test_zero_debt_vault_is_never_liquidatable() {
        let (mut h, engine) = setup();
        let mut ctx = h.ctx();
        let id = engine
            .create_vault(&mut ctx, &addr("alice"), atom(1), ssusd(0))
            .unwrap();
        let err = engine
            .liquidate_vault(&mut ctx, &addr("keeper"), id)
            .unwrap_err();
        assert!(matches!(err, StablecoinError::VaultHealthy(_)));
    }

    #[test]
    fn test_liquidation_without_price_propagates() {
        let (mut h, engine) = setup();
        let id = {
            let mut ctx = h.ctx();
            engine
                .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(5_000))
                .unwrap()
        };
        h.oracle.remove_price(&atom(0).denom);
        let mut ctx = h.ctx();
        let err = engine
            .liquidate_vault(&mut ctx, &addr("keeper"), id)
            .unwrap_err();
        assert!(matches!(err, StablecoinError::Oracle(_)));
        assert!(engine.vault(&ctx, id).is_ok());
    }

    #[test]
    fn test_sanctioned_owner_cannot_mint() {
        let registry = Arc::new(ProfileRegistry::default());
        let mut h = Harness::with_compliance(registry.clone());
        registry.upsert(ComplianceProfile::verified(addr("alice"), "US", h.header.time));
        h.set_price("uatom", dec!(10));
        h.fund("alice", "uatom", 1_000);
        let engine = VaultEngine::new(h.collab());

        let id = {
            let mut ctx = h.ctx();
            engine
                .create_vault(&mut ctx, &addr("alice"), atom(1_000), ssusd(0))
                .unwrap()
        };
        registry.set_sanctioned(&addr("alice"), true).unwrap();
        let mut ctx = h.ctx();
        let err = engine
            .mint_stablecoin(&mut ctx, &addr("alice"), id, ssusd(100))
            .unwrap_err();
        assert!(matches!(
            err,
            StablecoinError::Compliance(ComplianceError::Sanctioned(_))
        ));
    }
}
