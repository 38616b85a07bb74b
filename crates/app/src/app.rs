//! App - wires the keepers together
//!
//! Flow of a stablecoin message: Circuit gate → Branch → Dispatch → Commit.
//! The gate (pause, circuit, rate limits) commits on its own so rate-limit
//! counters stick even when the message itself fails. Circuit messages skip
//! the gate so operators can always resume.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ssusd_circuit::{CircuitBreaker, CircuitGenesis};
use ssusd_compliance::ProfileRegistry;
use ssusd_core::{AuthorityGuard, Event};
use ssusd_ledger::{MemLedger, ModulePermission};
use ssusd_oracle::{MockOracle, StalenessControl};
use ssusd_stablecoin::invariants::all_invariants;
use ssusd_stablecoin::{
    Collaborators, GenesisState, ReserveEngine, SolvencyCheck, SolvencyMonitor, VaultEngine,
};
use ssusd_store::{BlockHeader, CacheStore, Context, MemStore};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::genesis::AppGenesis;
use crate::msgs::{Msg, MsgResponse};

/// In-memory collaborators built from the app config
pub struct InMemoryServices {
    pub oracle: Arc<MockOracle>,
    pub compliance: Arc<ProfileRegistry>,
    pub ledger: Arc<MemLedger>,
}

impl InMemoryServices {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            oracle: Arc::new(MockOracle::new().with_default_threshold(config.oracle_staleness_secs)),
            compliance: Arc::new(ProfileRegistry::new(config.compliance.clone())),
            ledger: Arc::new(MemLedger::new().with_module(
                ssusd_stablecoin::MODULE_NAME,
                &[ModulePermission::Minter, ModulePermission::Burner],
            )),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.oracle.clone(),
            self.compliance.clone(),
            self.ledger.clone(),
        )
    }
}

/// The module keepers and the governance guard
pub struct Keepers {
    pub vaults: VaultEngine,
    pub reserve: ReserveEngine,
    pub circuit: CircuitBreaker,
    guard: AuthorityGuard,
}

impl Keepers {
    pub fn guard(&self) -> &AuthorityGuard {
        &self.guard
    }

    fn dispatch(&self, ctx: &mut Context, msg: Msg) -> AppResult<MsgResponse> {
        let response = match msg {
            // === Vaults ===
            Msg::CreateVault {
                owner,
                collateral,
                initial_debt,
            } => {
                let vault_id = self
                    .vaults
                    .create_vault(ctx, &owner, collateral, initial_debt)?;
                MsgResponse::VaultCreated { vault_id }
            }
            Msg::DepositCollateral {
                owner,
                vault_id,
                amount,
            } => {
                self.vaults.deposit_collateral(ctx, &owner, vault_id, amount)?;
                MsgResponse::Empty
            }
            Msg::WithdrawCollateral {
                owner,
                vault_id,
                amount,
            } => {
                self.vaults.withdraw_collateral(ctx, &owner, vault_id, amount)?;
                MsgResponse::Empty
            }
            Msg::MintStablecoin {
                owner,
                vault_id,
                amount,
            } => {
                self.vaults.mint_stablecoin(ctx, &owner, vault_id, amount)?;
                MsgResponse::Empty
            }
            Msg::RepayStablecoin {
                owner,
                vault_id,
                amount,
            } => {
                let amount = self.vaults.repay_stablecoin(ctx, &owner, vault_id, amount)?;
                MsgResponse::Repaid { amount }
            }
            Msg::LiquidateVault {
                liquidator,
                vault_id,
            } => {
                let debt = self.vaults.vault(ctx, vault_id)?.debt;
                self.circuit.try_record_liquidation(ctx, debt)?;
                let seized = self.vaults.liquidate_vault(ctx, &liquidator, vault_id)?;
                MsgResponse::Liquidated { seized }
            }
            Msg::LiquidateVaultWithAuction {
                liquidator,
                vault_id,
            } => {
                let debt = self.vaults.vault(ctx, vault_id)?.debt;
                self.circuit.try_record_liquidation(ctx, debt)?;
                let auction_id = self
                    .vaults
                    .liquidate_vault_with_auction(ctx, &liquidator, vault_id)?;
                MsgResponse::AuctionStarted { auction_id }
            }
            Msg::BidAuction {
                bidder,
                auction_id,
                max_collateral,
                max_ssusd,
            } => {
                let fill = self
                    .vaults
                    .bid_auction(ctx, &bidder, auction_id, max_collateral, max_ssusd)?;
                MsgResponse::AuctionBid { fill }
            }
            Msg::UpdateAuctionParams { authority, params } => {
                let gov = self.guard.authorize_governance(&authority)?;
                self.vaults.set_auction_params(ctx, &gov, params)?;
                MsgResponse::Empty
            }
            Msg::UpdateVaultParams { authority, params } => {
                let gov = self.guard.authorize_governance(&authority)?;
                self.vaults.set_params(ctx, &gov, params)?;
                MsgResponse::Empty
            }

            // === Reserve ===
            Msg::DepositReserve { depositor, amount } => {
                let (deposit_id, minted) = self.reserve.deposit_reserve(ctx, &depositor, amount)?;
                MsgResponse::ReserveDeposited { deposit_id, minted }
            }
            Msg::RequestRedemption {
                requester,
                ssusd_amount,
                output_denom,
            } => {
                let redemption_id =
                    self.reserve
                        .request_redemption(ctx, &requester, ssusd_amount, &output_denom)?;
                MsgResponse::RedemptionRequested { redemption_id }
            }
            Msg::ExecuteRedemption {
                executor,
                redemption_id,
            } => {
                let output = self.reserve.execute_redemption(ctx, &executor, redemption_id)?;
                MsgResponse::RedemptionExecuted { output }
            }
            Msg::CancelRedemption {
                authority,
                redemption_id,
            } => {
                let gov = self.guard.authorize_governance(&authority)?;
                let refunded = self.reserve.cancel_redemption(ctx, &gov, redemption_id)?;
                MsgResponse::RedemptionCancelled { refunded }
            }
            Msg::SubmitAttestation { attester, report } => {
                let attestation_id = self.reserve.record_attestation(ctx, &attester, report)?;
                MsgResponse::AttestationRecorded { attestation_id }
            }
            Msg::SetApprovedAttester {
                authority,
                attester,
                approved,
            } => {
                let gov = self.guard.authorize_governance(&authority)?;
                self.reserve.set_approved_attester(ctx, &gov, &attester, approved)?;
                MsgResponse::Empty
            }
            Msg::UpdateReserveParams { authority, params } => {
                let gov = self.guard.authorize_governance(&authority)?;
                self.reserve.set_reserve_params(ctx, &gov, params)?;
                MsgResponse::Empty
            }

            // === Circuit ===
            Msg::PauseSystem {
                authority,
                reason,
                duration_secs,
            } => {
                let operator = self.circuit.authorize(ctx, &authority)?;
                self.circuit.pause_system(ctx, &operator, &reason, duration_secs)?;
                MsgResponse::Empty
            }
            Msg::ResumeSystem { authority } => {
                let operator = self.circuit.authorize(ctx, &authority)?;
                self.circuit.resume_system(ctx, &operator)?;
                MsgResponse::Empty
            }
            Msg::TripCircuit {
                authority,
                module,
                reason,
                disabled_messages,
            } => {
                let operator = self.circuit.authorize(ctx, &authority)?;
                self.circuit
                    .trip_circuit(ctx, &operator, &module, &reason, disabled_messages)?;
                MsgResponse::Empty
            }
            Msg::ResetCircuit { authority, module } => {
                let operator = self.circuit.authorize(ctx, &authority)?;
                self.circuit.reset_circuit(ctx, &operator, &module)?;
                MsgResponse::Empty
            }
            Msg::UpdateCircuitParams { authority, params } => {
                let gov = self.guard.authorize_governance(&authority)?;
                self.circuit.set_params(ctx, &gov, params)?;
                MsgResponse::Empty
            }
            Msg::UpdateLiquidationLimits {
                authority,
                max_per_block,
                max_value,
                cooldown_blocks,
            } => {
                let gov = self.guard.authorize_governance(&authority)?;
                self.circuit
                    .set_liquidation_limits(ctx, &gov, max_per_block, max_value, cooldown_blocks)?;
                MsgResponse::Empty
            }
            Msg::UpdateOracleDeviationConfig { authority, config } => {
                let gov = self.guard.authorize_governance(&authority)?;
                self.circuit.set_oracle_deviation_config(ctx, &gov, config)?;
                MsgResponse::Empty
            }
        };
        Ok(response)
    }
}

/// Outcome of a delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    pub response: MsgResponse,
    pub events: Vec<Event>,
}

/// Outcome of the per-block hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResult {
    pub solvency: SolvencyCheck,
    pub expired_auctions: usize,
    pub events: Vec<Event>,
}

pub struct App {
    keepers: Keepers,
    store: MemStore,
    header: BlockHeader,
    /// Events written outside a delivered message, surfaced by the next block
    pending_events: Vec<Event>,
    /// Receives the stored staleness windows
    oracle_control: Option<Arc<dyn StalenessControl>>,
}

impl App {
    /// App over an empty store at `header`
    pub fn new(config: &AppConfig, collab: Collaborators, header: BlockHeader) -> AppResult<Self> {
        config.validate()?;
        let keepers = Keepers {
            vaults: VaultEngine::new(collab.clone()),
            reserve: ReserveEngine::new(collab),
            circuit: CircuitBreaker::new(config.governance.clone()),
            guard: AuthorityGuard::new(config.governance.clone()),
        };
        Ok(Self {
            keepers,
            store: MemStore::new(),
            header,
            pending_events: Vec::new(),
            oracle_control: None,
        })
    }

    /// Push governance staleness windows into `control` on `sync_oracle`
    pub fn with_oracle_control(mut self, control: Arc<dyn StalenessControl>) -> Self {
        self.oracle_control = Some(control);
        self
    }

    /// Resume from a previously written store
    pub fn with_store(mut self, store: MemStore) -> Self {
        self.store = store;
        self
    }

    pub fn keepers(&self) -> &Keepers {
        &self.keepers
    }

    pub fn header(&self) -> BlockHeader {
        self.header
    }

    pub fn store(&self) -> &MemStore {
        &self.store
    }

    /// Events from rejected messages not yet returned by `begin_block`
    pub fn pending_events(&self) -> &[Event] {
        &self.pending_events
    }

    pub fn write_snapshot(&self, path: &Path) -> AppResult<()> {
        self.store.write_snapshot(path)?;
        Ok(())
    }

    /// Read-only access at the current block; writes made by `f` are discarded
    pub fn query<R>(&mut self, f: impl FnOnce(&Keepers, &Context) -> R) -> R {
        let mut branch = CacheStore::new(&mut self.store);
        let ctx = Context::new(&mut branch, self.header);
        f(&self.keepers, &ctx)
    }

    /// Apply every stored oracle config's staleness window to the oracle.
    /// Runs after genesis and after each config update; call it after
    /// resuming from a snapshot.
    pub fn sync_oracle(&mut self) -> AppResult<()> {
        let Some(control) = self.oracle_control.clone() else {
            return Ok(());
        };
        let configs = self.query(|k, ctx| k.circuit.oracle_deviation_configs(ctx))?;
        for config in &configs {
            control.set_staleness_threshold(config.denom.clone(), config.staleness_threshold_secs);
        }
        debug!(configs = configs.len(), "oracle staleness windows applied");
        Ok(())
    }

    pub fn check_invariants(&mut self) -> AppResult<()> {
        self.query(|k, ctx| all_invariants(ctx, &k.vaults, &k.reserve))?;
        Ok(())
    }

    // === Genesis ===

    pub fn init_genesis(&mut self, genesis: &AppGenesis) -> AppResult<()> {
        genesis.validate()?;
        let mut branch = CacheStore::new(&mut self.store);
        let mut ctx = Context::new(&mut branch, self.header);
        genesis
            .stablecoin
            .init(&mut ctx, &self.keepers.vaults, &self.keepers.reserve)?;
        genesis.circuit.init(&mut ctx, &self.keepers.circuit)?;
        drop(ctx);
        branch.commit();
        self.sync_oracle()?;
        info!(height = self.header.height, "genesis initialized");
        Ok(())
    }

    pub fn export_genesis(&mut self) -> AppResult<AppGenesis> {
        let (stablecoin, circuit) = self.query(|k, ctx| {
            (
                GenesisState::export(ctx, &k.vaults, &k.reserve),
                CircuitGenesis::export(ctx, &k.circuit),
            )
        });
        Ok(AppGenesis {
            stablecoin: stablecoin?,
            circuit: circuit?,
        })
    }

    // === Blocks ===

    /// Advance to block `height`: persist circuit expiries, settle expired
    /// auctions, then run the solvency monitor. Returned events start with those recorded since the
    /// previous block outside any delivered message.
    pub fn begin_block(&mut self, height: u64, time: DateTime<Utc>) -> AppResult<BlockResult> {
        if height <= self.header.height || time < self.header.time {
            return Err(AppError::InvalidBlock {
                height,
                current: self.header.height,
            });
        }
        let header = BlockHeader::new(height, time);

        let mut branch = CacheStore::new(&mut self.store);
        let mut ctx = Context::new(&mut branch, header);
        self.keepers.circuit.sweep_expired(&mut ctx)?;
        let expired_auctions = self.keepers.vaults.process_expired_auctions(&mut ctx)?;
        let solvency = SolvencyMonitor::new(&self.keepers.reserve).run(&mut ctx)?;
        let block_events = ctx.into_events();
        branch.commit();

        let mut events = std::mem::take(&mut self.pending_events);
        events.extend(block_events);
        self.header = header;
        debug!(height, ?solvency, expired_auctions, events = events.len(), "block begun");
        Ok(BlockResult {
            solvency,
            expired_auctions,
            events,
        })
    }

    // === Messages ===

    pub fn deliver(&mut self, msg: Msg) -> AppResult<TxResult> {
        let module = msg.module();
        let type_url = msg.type_url();
        let gated = module == ssusd_stablecoin::MODULE_NAME;
        let updates_oracle = matches!(msg, Msg::UpdateOracleDeviationConfig { .. });

        if gated {
            let mut branch = CacheStore::new(&mut self.store);
            let mut ctx = Context::new(&mut branch, self.header);
            self.keepers
                .circuit
                .check_circuit_breakers(&mut ctx, module, &type_url, msg.signer())?;
            drop(ctx);
            branch.commit();
        }

        let mut branch = CacheStore::new(&mut self.store);
        let mut ctx = Context::new(&mut branch, self.header);
        match self.keepers.dispatch(&mut ctx, msg) {
            Ok(response) => {
                if gated {
                    self.keepers.circuit.record_success(&mut ctx, module)?;
                }
                let events = ctx.into_events();
                branch.commit();
                if updates_oracle {
                    self.sync_oracle()?;
                }
                info!(msg = %type_url, events = events.len(), "message delivered");
                Ok(TxResult { response, events })
            }
            Err(err) => {
                drop(ctx);
                drop(branch);
                warn!(msg = %type_url, error = %err, kind = ?err.kind(), "message rejected");
                if gated && err.is_systemic() {
                    self.record_failure(module);
                }
                Err(err)
            }
        }
    }

    /// Count a collaborator failure against `module`, outside any branch.
    /// A resulting trip event waits in `pending_events`.
    fn record_failure(&mut self, module: &str) {
        let mut ctx = Context::new(&mut self.store, self.header);
        match self.keepers.circuit.record_failure(&mut ctx, module) {
            Ok(_) => self.pending_events.extend(ctx.into_events()),
            Err(err) => error!(module, error = %err, "failed to record module failure"),
        }
    }
}
