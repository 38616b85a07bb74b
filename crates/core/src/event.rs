//! Events emitted by state transitions, for off-chain indexing

use crate::address::Address;
use crate::amount::Amount;
use crate::coin::Coin;
use crate::denom::Denom;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    VaultCreated {
        vault_id: u64,
        owner: Address,
        collateral: Coin,
        debt: Amount,
    },
    CollateralDeposited {
        vault_id: u64,
        owner: Address,
        amount: Coin,
    },
    CollateralWithdrawn {
        vault_id: u64,
        owner: Address,
        amount: Coin,
    },
    StablecoinMinted {
        vault_id: u64,
        owner: Address,
        amount: Amount,
    },
    StablecoinRepaid {
        vault_id: u64,
        owner: Address,
        amount: Amount,
    },
    VaultLiquidated {
        vault_id: u64,
        owner: Address,
        liquidator: Address,
        collateral: Coin,
        debt: Amount,
    },
    VaultParamsUpdated {
        authority: Address,
    },
    /// A vault's collateral went to a Dutch auction instead of one liquidator
    AuctionStarted {
        auction_id: u64,
        vault_id: u64,
        owner: Address,
        liquidator: Address,
        collateral: Coin,
        debt_to_cover: Amount,
        start_price: Decimal,
        end_price: Decimal,
    },
    AuctionBid {
        auction_id: u64,
        bidder: Address,
        collateral: Coin,
        cost: Amount,
        price: Decimal,
    },
    AuctionCompleted {
        auction_id: u64,
        collateral_sold: Amount,
        debt_raised: Amount,
        /// Unsold collateral sent back to the vault owner
        returned: Coin,
    },
    AuctionExpired {
        auction_id: u64,
        collateral_sold: Amount,
        debt_raised: Amount,
        returned: Coin,
    },

    /// A reserve asset was deposited and ssUSD minted against it
    ReserveDeposit {
        deposit_id: u64,
        depositor: Address,
        reserve_asset: Coin,
        /// Oracle price used for the conversion
        price: Decimal,
        usd_value: Amount,
        ssusd_amount: Amount,
        fee_amount: Amount,
        reserve_ratio_bps: u32,
    },
    RedemptionRequested {
        redemption_id: u64,
        requester: Address,
        ssusd_amount: Amount,
        output: Coin,
        executable_after: DateTime<Utc>,
    },
    RedemptionExecuted {
        redemption_id: u64,
        requester: Address,
        output: Coin,
    },
    RedemptionCancelled {
        redemption_id: u64,
        requester: Address,
        refunded: Amount,
    },
    ReserveAttestation {
        attestation_id: u64,
        attester: Address,
        total_value: Amount,
        custodian_name: String,
        digest: String,
    },
    AttesterUpdated {
        attester: Address,
        approved: bool,
    },
    ReserveParamsUpdated {
        authority: Address,
    },
    SolvencyEmergency {
        reserve_ratio_bps: u32,
        threshold_bps: u32,
    },

    SystemPaused {
        paused_by: Address,
        reason: String,
        auto_resume_at: Option<DateTime<Utc>>,
    },
    SystemResumed {
        /// `None` when the pause expired on its own
        resumed_by: Option<Address>,
    },
    CircuitTripped {
        module: String,
        reason: String,
        /// `manual` or `automatic`
        tripped_by: String,
        disabled_messages: Vec<String>,
    },
    CircuitReset {
        module: String,
        /// `None` when an automatic trip recovered on its own
        reset_by: Option<Address>,
    },
}

impl Event {
    /// Event type name, e.g. `vault_liquidated`
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_kind_matches_serde_tag() {
        let event = Event::ReserveDeposit {
            deposit_id: 1,
            depositor: Address::new("alice").unwrap(),
            reserve_asset: Coin::new(Denom::new("usdy").unwrap(), Amount::from(1000)),
            price: dec!(1.00),
            usd_value: Amount::from(1000),
            ssusd_amount: Amount::from(999),
            fee_amount: Amount::from(1),
            reserve_ratio_bps: 10_000,
        };
        assert_eq!(event.kind(), "reserve_deposit");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reserve_deposit");
        assert_eq!(json["price"], "1.00");
    }

    #[test]
    fn test_circuit_event_kind() {
        let event = Event::CircuitTripped {
            module: "stablecoin".to_string(),
            reason: "failure threshold exceeded".to_string(),
            tripped_by: "automatic".to_string(),
            disabled_messages: vec![],
        };
        assert_eq!(event.kind(), "circuit_tripped");
    }
}
