//! End-to-end message flows through the circuit gate

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ssusd_app::{App, AppConfig, AppError, InMemoryServices, Msg, MsgResponse};
use ssusd_circuit::{CircuitError, OracleDeviationConfig};
use ssusd_compliance::FailPolicy;
use ssusd_core::{Address, Amount, Coin, Denom, ErrorKind, Event};
use ssusd_ledger::{AccountId, LedgerService};
use ssusd_stablecoin::{SolvencyCheck, StablecoinError};
use ssusd_store::{BlockHeader, MemStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
}

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn denom(s: &str) -> Denom {
    Denom::new(s).unwrap()
}

fn coin(d: &str, amount: u64) -> Coin {
    Coin::new(denom(d), Amount::from(amount))
}

fn ssusd(amount: u64) -> Coin {
    Coin::stablecoin(Amount::from(amount))
}

struct TestNet {
    services: InMemoryServices,
    config: AppConfig,
    app: App,
}

impl TestNet {
    fn new() -> Self {
        let mut config = AppConfig::new(addr("gov"));
        config.compliance.unknown_address_policy = FailPolicy::FailOpen;
        Self::with_config(config)
    }

    fn with_config(config: AppConfig) -> Self {
        init_tracing();
        let services = InMemoryServices::from_config(&config);
        let mut app = App::new(&config, services.collaborators(), BlockHeader::new(1, t0()))
            .unwrap()
            .with_oracle_control(services.oracle.clone());
        app.init_genesis(&config.genesis()).unwrap();
        Self { services, config, app }
    }

    fn now(&self) -> DateTime<Utc> {
        self.app.header().time
    }

    fn price(&self, d: &str, price: Decimal) {
        self.services.oracle.set_price(denom(d), price, self.now());
    }

    fn fund(&self, who: &str, c: Coin) {
        self.services.ledger.fund(&addr(who), c).unwrap();
    }

    fn balance(&self, who: &str, d: &str) -> Amount {
        self.services.ledger.balance(&AccountId::from(&addr(who)), &denom(d))
    }

    /// Next block `secs` later; returns the block hook events
    fn advance(&mut self, secs: i64) -> (SolvencyCheck, Vec<Event>) {
        let header = self.app.header();
        let result = self
            .app
            .begin_block(header.height + 1, header.time + Duration::seconds(secs))
            .unwrap();
        (result.solvency, result.events)
    }

    fn create_vault(&mut self, owner: &str, collateral: u64, debt: u64) -> u64 {
        let result = self
            .app
            .deliver(Msg::CreateVault {
                owner: addr(owner),
                collateral: coin("uatom", collateral),
                initial_debt: ssusd(debt),
            })
            .unwrap();
        match result.response {
            MsgResponse::VaultCreated { vault_id } => vault_id,
            other => panic!("unexpected response {other:?}"),
        }
    }

    fn mint(&mut self, owner: &str, vault_id: u64, amount: u64) -> Result<(), AppError> {
        self.app
            .deliver(Msg::MintStablecoin {
                owner: addr(owner),
                vault_id,
                amount: ssusd(amount),
            })
            .map(|_| ())
    }
}

#[test]
fn test_global_pause_gates_stablecoin_messages() {
    let mut net = TestNet::new();
    net.price("uatom", dec!(10));
    net.fund("alice", coin("uatom", 2_000));

    net.app
        .deliver(Msg::PauseSystem {
            authority: addr("gov"),
            reason: "oracle incident".to_string(),
            duration_secs: 0,
        })
        .unwrap();

    let err = net
        .app
        .deliver(Msg::CreateVault {
            owner: addr("alice"),
            collateral: coin("uatom", 1_000),
            initial_debt: ssusd(0),
        })
        .unwrap_err();
    assert!(matches!(err, AppError::Circuit(CircuitError::GlobalPause { .. })));
    assert_eq!(err.kind(), ErrorKind::SystemHalt);
    assert_eq!(net.balance("alice", "uatom"), Amount::from(2_000));

    // Circuit messages bypass the gate
    let result = net
        .app
        .deliver(Msg::ResumeSystem { authority: addr("gov") })
        .unwrap();
    assert_eq!(
        result.events,
        vec![Event::SystemResumed {
            resumed_by: Some(addr("gov"))
        }]
    );

    let id = net.create_vault("alice", 1_000, 0);
    assert_eq!(id, 1);
    assert_eq!(net.balance("alice", "uatom"), Amount::from(1_000));
}

#[test]
fn test_pause_requires_operator() {
    let mut net = TestNet::new();
    let err = net
        .app
        .deliver(Msg::PauseSystem {
            authority: addr("mallory"),
            reason: "grief".to_string(),
            duration_secs: 60,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let paused = net
        .app
        .query(|k, ctx| k.circuit.is_globally_paused(ctx))
        .unwrap();
    assert!(!paused);
}

#[test]
fn test_oracle_failures_trip_and_recover() {
    let mut net = TestNet::new();
    net.price("uatom", dec!(10));
    net.fund("alice", coin("uatom", 1_000));
    let id = net.create_vault("alice", 1_000, 0);
    net.mint("alice", id, 1_000).unwrap();

    net.services.oracle.remove_price(&denom("uatom"));
    for _ in 0..4 {
        let err = net.mint("alice", id, 100).unwrap_err();
        assert!(matches!(err, AppError::Stablecoin(StablecoinError::Oracle(_))));
        assert!(err.is_systemic());
    }
    let open = net
        .app
        .query(|k, ctx| k.circuit.is_module_circuit_open(ctx, "stablecoin"))
        .unwrap();
    assert!(!open);

    // Fifth failure reaches the default threshold
    net.mint("alice", id, 100).unwrap_err();
    let circuit = net
        .app
        .query(|k, ctx| k.circuit.module_circuit(ctx, "stablecoin"))
        .unwrap()
        .unwrap();
    assert_eq!(circuit.failure_count, 5);
    assert_eq!(
        circuit.recovery_time,
        Some(net.now() + Duration::seconds(300))
    );

    net.price("uatom", dec!(10));
    let err = net.mint("alice", id, 100).unwrap_err();
    assert!(matches!(err, AppError::Circuit(CircuitError::CircuitOpen { .. })));

    let tripped = Event::CircuitTripped {
        module: "stablecoin".to_string(),
        reason: "failure threshold exceeded".to_string(),
        tripped_by: "automatic".to_string(),
        disabled_messages: vec![],
    };
    assert_eq!(net.app.pending_events(), std::slice::from_ref(&tripped));

    let (_, events) = net.advance(301);
    assert_eq!(
        events,
        vec![
            tripped,
            Event::CircuitReset {
                module: "stablecoin".to_string(),
                reset_by: None,
            },
        ]
    );
    assert!(net.app.pending_events().is_empty());

    net.price("uatom", dec!(10));
    net.mint("alice", id, 100).unwrap();
    let debt = net
        .app
        .query(|k, ctx| k.vaults.vault(ctx, id))
        .unwrap()
        .debt;
    assert_eq!(debt, Amount::from(1_100));
}

#[test]
fn test_oracle_staleness_follows_governance_config() {
    let mut net = TestNet::new();
    net.price("uatom", dec!(10));
    net.fund("alice", coin("uatom", 1_000));
    let id = net.create_vault("alice", 1_000, 0);

    // Genesis defaults allow an hour
    net.advance(120);
    net.mint("alice", id, 100).unwrap();

    let err = net
        .app
        .deliver(Msg::UpdateOracleDeviationConfig {
            authority: addr("alice"),
            config: OracleDeviationConfig::new(denom("uatom"), 500, 2_000, 60, 30),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    net.app
        .deliver(Msg::UpdateOracleDeviationConfig {
            authority: addr("gov"),
            config: OracleDeviationConfig::new(denom("uatom"), 500, 2_000, 60, 30),
        })
        .unwrap();
    let err = net.mint("alice", id, 100).unwrap_err();
    assert!(matches!(
        err,
        AppError::Stablecoin(StablecoinError::Oracle(ssusd_oracle::OracleError::StalePrice {
            threshold_secs: 60,
            ..
        }))
    ));

    net.price("uatom", dec!(10));
    net.mint("alice", id, 100).unwrap();
    let exported = net.app.export_genesis().unwrap();
    let atom = exported
        .circuit
        .oracle_deviation_configs
        .iter()
        .find(|c| c.denom == denom("uatom"))
        .unwrap();
    assert_eq!(atom.staleness_threshold_secs, 60);
}

#[test]
fn test_domain_rejections_do_not_count_as_failures() {
    let mut net = TestNet::new();
    net.price("uatom", dec!(10));
    net.fund("alice", coin("uatom", 1_000));
    let id = net.create_vault("alice", 1_000, 0);

    // 1000 x $10 supports at most 6666 at 150%
    for _ in 0..6 {
        let err = net.mint("alice", id, 7_000).unwrap_err();
        assert!(matches!(
            err,
            AppError::Stablecoin(StablecoinError::UnderCollateralized { .. })
        ));
        assert!(!err.is_systemic());
    }
    let circuit = net
        .app
        .query(|k, ctx| k.circuit.module_circuit(ctx, "stablecoin"))
        .unwrap();
    assert!(circuit.map_or(true, |c| c.failure_count == 0));
}

#[test]
fn test_liquidation_surge_limit() {
    let mut net = TestNet::new();
    net.price("uatom", dec!(10));
    net.fund("owner", coin("uatom", 2_000));
    let first = net.create_vault("owner", 1_000, 5_000);
    let second = net.create_vault("owner", 1_000, 5_000);
    net.services
        .ledger
        .send_coins(&addr("owner"), &addr("keeper"), &[ssusd(10_000)])
        .unwrap();

    net.app
        .deliver(Msg::UpdateLiquidationLimits {
            authority: addr("gov"),
            max_per_block: 1,
            max_value: Amount::from(1_000_000u64),
            cooldown_blocks: 0,
        })
        .unwrap();

    net.advance(6);
    // 1000 x $6 = 6000 < 5000 x 1.5
    net.price("uatom", dec!(6));

    let result = net
        .app
        .deliver(Msg::LiquidateVault {
            liquidator: addr("keeper"),
            vault_id: first,
        })
        .unwrap();
    assert_eq!(
        result.response,
        MsgResponse::Liquidated {
            seized: coin("uatom", 1_000)
        }
    );

    let err = net
        .app
        .deliver(Msg::LiquidateVault {
            liquidator: addr("keeper"),
            vault_id: second,
        })
        .unwrap_err();
    assert!(matches!(err, AppError::Circuit(CircuitError::LiquidationSurge(_))));
    assert!(net.app.query(|k, ctx| k.vaults.vault(ctx, second)).is_ok());

    net.advance(6);
    net.price("uatom", dec!(6));
    net.app
        .deliver(Msg::LiquidateVault {
            liquidator: addr("keeper"),
            vault_id: second,
        })
        .unwrap();

    assert_eq!(net.balance("keeper", "uatom"), Amount::from(2_000));
    assert_eq!(net.balance("keeper", "ussusd"), Amount::ZERO);
    net.app.check_invariants().unwrap();
}

#[test]
fn test_auction_liquidation_settles_or_returns_collateral() {
    let mut net = TestNet::new();
    net.price("uatom", dec!(10));
    net.fund("owner", coin("uatom", 1_000));
    net.fund("bob", coin("uatom", 1_000));
    net.fund("whale", coin("uatom", 10_000));
    let sold = net.create_vault("owner", 1_000, 5_000);
    let unsold = net.create_vault("bob", 1_000, 5_000);
    net.create_vault("whale", 10_000, 20_000);
    net.services
        .ledger
        .send_coins(&addr("whale"), &addr("keeper"), &[ssusd(10_000)])
        .unwrap();

    net.price("uatom", dec!(6));
    let mut auction_ids = Vec::new();
    for vault_id in [sold, unsold] {
        let result = net
            .app
            .deliver(Msg::LiquidateVaultWithAuction {
                liquidator: addr("keeper"),
                vault_id,
            })
            .unwrap();
        match result.response {
            MsgResponse::AuctionStarted { auction_id } => auction_ids.push(auction_id),
            other => panic!("unexpected response {other:?}"),
        }
    }
    assert_eq!(auction_ids, vec![1, 2]);

    // 5650 owed at 7.8 buys trunc(724.3) units; the rest goes back to the owner
    let result = net
        .app
        .deliver(Msg::BidAuction {
            bidder: addr("keeper"),
            auction_id: 1,
            max_collateral: Amount::from(1_000),
            max_ssusd: Amount::from(10_000),
        })
        .unwrap();
    let MsgResponse::AuctionBid { fill } = result.response else {
        panic!("unexpected response {:?}", result.response);
    };
    assert_eq!(fill.cost, Amount::from(5_650));
    assert_eq!(fill.collateral, coin("uatom", 724));
    assert!(result.events.iter().any(|e| e.kind() == "auction_completed"));
    assert_eq!(net.balance("owner", "uatom"), Amount::from(276));
    assert_eq!(net.balance("keeper", "ussusd"), Amount::from(4_350));
    net.app.check_invariants().unwrap();

    let (_, events) = net.advance(21_601);
    assert!(events.iter().any(|e| e.kind() == "auction_expired"));
    assert_eq!(net.balance("bob", "uatom"), Amount::from(1_000));

    let err = net
        .app
        .deliver(Msg::BidAuction {
            bidder: addr("keeper"),
            auction_id: 2,
            max_collateral: Amount::from(1),
            max_ssusd: Amount::from(10),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Stablecoin(StablecoinError::AuctionNotActive { id: 2, .. })
    ));

    // bob keeps the 5000 ssUSD the auction never raised
    net.price("uatom", dec!(6));
    net.app.check_invariants().unwrap();
}

#[test]
fn test_solvency_emergency_pauses_reserve_minting() {
    let mut net = TestNet::new();
    net.price("usdy", dec!(1));
    net.fund("alice", coin("usdy", 2_000_000_000));

    let result = net
        .app
        .deliver(Msg::DepositReserve {
            depositor: addr("alice"),
            amount: coin("usdy", 1_000_000_000),
        })
        .unwrap();
    // 1e9 less 50 bps haircut, less 10 bps fee
    assert_eq!(
        result.response,
        MsgResponse::ReserveDeposited {
            deposit_id: 1,
            minted: Amount::from(994_005_000u64),
        }
    );

    let (solvency, _) = net.advance(6);
    assert!(matches!(solvency, SolvencyCheck::Healthy { .. }));

    net.price("usdy", dec!(0.5));
    let (solvency, events) = net.advance(6);
    let SolvencyCheck::Emergency { ratio_bps } = solvency else {
        panic!("expected emergency, got {solvency:?}");
    };
    assert!(ratio_bps < 9_000);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SolvencyEmergency { threshold_bps: 9_000, .. })));

    let err = net
        .app
        .deliver(Msg::DepositReserve {
            depositor: addr("alice"),
            amount: coin("usdy", 500_000_000),
        })
        .unwrap_err();
    assert!(matches!(err, AppError::Stablecoin(StablecoinError::MintPaused)));

    let (solvency, events) = net.advance(6);
    assert!(matches!(solvency, SolvencyCheck::Latched { .. }));
    assert!(events.is_empty());
}

#[test]
fn test_rate_limit_counts_rejected_messages() {
    let mut net = TestNet::new();
    net.price("usdy", dec!(1));
    net.fund("alice", coin("usdy", 1_000_000));

    // Below the minimum mint; each rejection still consumes a slot
    for _ in 0..10 {
        let err = net
            .app
            .deliver(Msg::DepositReserve {
                depositor: addr("alice"),
                amount: coin("usdy", 1_000),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Stablecoin(StablecoinError::BelowMinimum { .. })
        ));
    }

    let err = net
        .app
        .deliver(Msg::DepositReserve {
            depositor: addr("alice"),
            amount: coin("usdy", 1_000),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SystemHalt);
    match err {
        AppError::Circuit(CircuitError::RateLimitExceeded { name, max_requests, .. }) => {
            assert_eq!(name, "stablecoin_mint");
            assert_eq!(max_requests, 10);
        }
        other => panic!("expected rate limit, got {other:?}"),
    }

    net.advance(61);
    let err = net
        .app
        .deliver(Msg::DepositReserve {
            depositor: addr("alice"),
            amount: coin("usdy", 1_000),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Stablecoin(StablecoinError::BelowMinimum { .. })
    ));
}

#[test]
fn test_kyc_fail_closed_blocks_unknown_depositor() {
    let mut net = TestNet::with_config(AppConfig::new(addr("gov")));
    net.price("usdy", dec!(1));
    net.fund("alice", coin("usdy", 1_000_000_000));

    let err = net
        .app
        .deliver(Msg::DepositReserve {
            depositor: addr("alice"),
            amount: coin("usdy", 1_000_000_000),
        })
        .unwrap_err();
    assert!(matches!(err, AppError::Stablecoin(StablecoinError::Compliance(_))));
    assert_eq!(net.balance("alice", "usdy"), Amount::from(1_000_000_000u64));
}

#[test]
fn test_genesis_and_snapshot_restart() -> anyhow::Result<()> {
    let mut net = TestNet::new();
    net.price("uatom", dec!(10));
    net.price("usdy", dec!(1));
    net.fund("alice", coin("uatom", 1_000));
    net.fund("bob", coin("usdy", 1_000_000_000));

    let id = net.create_vault("alice", 1_000, 2_000);
    net.app.deliver(Msg::DepositReserve {
        depositor: addr("bob"),
        amount: coin("usdy", 1_000_000_000),
    })?;
    net.app.deliver(Msg::TripCircuit {
        authority: addr("gov"),
        module: "settlement".to_string(),
        reason: "upgrade".to_string(),
        disabled_messages: vec!["/ssusd.settlement.v1.MsgInstantTransfer".to_string()],
    })?;
    net.app.check_invariants()?;

    let exported = net.app.export_genesis()?;
    assert_eq!(exported.stablecoin.vaults.len(), 1);
    assert_eq!(exported.circuit.module_circuits.len(), 1);

    let dir = tempfile::tempdir()?;
    let genesis_path = dir.path().join("genesis.json");
    exported.write_file(&genesis_path)?;
    let loaded = ssusd_app::AppGenesis::from_file(&genesis_path)?;
    assert_eq!(loaded, exported);

    let mut fresh = App::new(&net.config, net.services.collaborators(), net.app.header())?;
    fresh.init_genesis(&loaded)?;
    assert_eq!(fresh.export_genesis()?, exported);
    fresh.check_invariants()?;

    let snapshot = dir.path().join("state.json");
    net.app.write_snapshot(&snapshot)?;
    let mut restored = App::new(&net.config, net.services.collaborators(), net.app.header())?
        .with_store(MemStore::read_snapshot(&snapshot)?);
    let vault = restored.query(|k, ctx| k.vaults.vault(ctx, id))?;
    assert_eq!(vault.debt, Amount::from(2_000));
    assert_eq!(restored.export_genesis()?, exported);
    Ok(())
}
