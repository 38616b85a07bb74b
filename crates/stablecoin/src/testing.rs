//! Shared fixtures for unit tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use ssusd_compliance::{ComplianceGate, ProfileRegistry};
use ssusd_core::{Address, Amount, Authority, AuthorityGuard, Coin, Denom, Governance};
use ssusd_ledger::{AccountId, LedgerService, MemLedger, ModulePermission};
use ssusd_oracle::MockOracle;
use ssusd_store::{BlockHeader, Context, MemStore};
use std::sync::Arc;

use crate::collab::Collaborators;
use crate::MODULE_NAME;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

pub fn coin(denom: &str, amount: u64) -> Coin {
    Coin::new(Denom::new(denom).unwrap(), Amount::from(amount))
}

pub fn atom(amount: u64) -> Coin {
    coin("uatom", amount)
}

pub fn ssusd(amount: u64) -> Coin {
    Coin::stablecoin(Amount::from(amount))
}

pub fn governance() -> Authority<Governance> {
    AuthorityGuard::new(addr("gov"))
        .authorize_governance(&addr("gov"))
        .unwrap()
}

pub struct Harness {
    pub oracle: Arc<MockOracle>,
    pub compliance: Arc<dyn ComplianceGate>,
    pub ledger: Arc<MemLedger>,
    pub store: MemStore,
    pub header: BlockHeader,
}

impl Harness {
    /// Fail-open compliance, empty ledger, block 1 at `t0`
    pub fn new() -> Self {
        Self::with_compliance(Arc::new(ProfileRegistry::permissive()))
    }

    pub fn with_compliance(compliance: Arc<dyn ComplianceGate>) -> Self {
        let ledger = MemLedger::new().with_module(
            MODULE_NAME,
            &[ModulePermission::Minter, ModulePermission::Burner],
        );
        Self {
            oracle: Arc::new(MockOracle::new()),
            compliance,
            ledger: Arc::new(ledger),
            store: MemStore::new(),
            header: BlockHeader::new(1, t0()),
        }
    }

    pub fn collab(&self) -> Collaborators {
        Collaborators::new(self.oracle.clone(), self.compliance.clone(), self.ledger.clone())
    }

    pub fn ctx(&mut self) -> Context<'_> {
        Context::new(&mut self.store, self.header)
    }

    /// Post a price at the current block time
    pub fn set_price(&self, denom: &str, price: Decimal) {
        self.oracle
            .set_price(Denom::new(denom).unwrap(), price, self.header.time);
    }

    pub fn fund(&self, who: &str, denom: &str, amount: u64) {
        self.ledger.fund(&addr(who), coin(denom, amount)).unwrap();
    }

    pub fn balance(&self, who: &str, denom: &str) -> Amount {
        self.ledger
            .balance(&AccountId::from(&addr(who)), &Denom::new(denom).unwrap())
    }

    pub fn module_balance(&self, denom: &str) -> Amount {
        self.ledger
            .balance(&AccountId::module(MODULE_NAME), &Denom::new(denom).unwrap())
    }

    pub fn supply(&self) -> Amount {
        self.ledger.get_supply(&Denom::stablecoin())
    }

    /// Move to the next block, `secs` later
    pub fn advance(&mut self, secs: i64) {
        self.header = BlockHeader::new(
            self.header.height + 1,
            self.header.time + Duration::seconds(secs),
        );
    }
}
