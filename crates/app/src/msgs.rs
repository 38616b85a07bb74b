//! Messages routed by the app

use serde::{Deserialize, Serialize};
use ssusd_circuit::{CircuitParams, OracleDeviationConfig};
use ssusd_core::{Address, Amount, Coin, Denom};
use ssusd_stablecoin::{AttestationReport, AuctionParams, BidFill, ReserveParams, VaultParams};
use strum_macros::IntoStaticStr;

/// Every user and governance operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    // === Vaults ===
    CreateVault {
        owner: Address,
        collateral: Coin,
        initial_debt: Coin,
    },
    DepositCollateral {
        owner: Address,
        vault_id: u64,
        amount: Coin,
    },
    WithdrawCollateral {
        owner: Address,
        vault_id: u64,
        amount: Coin,
    },
    MintStablecoin {
        owner: Address,
        vault_id: u64,
        amount: Coin,
    },
    RepayStablecoin {
        owner: Address,
        vault_id: u64,
        amount: Coin,
    },
    LiquidateVault {
        liquidator: Address,
        vault_id: u64,
    },
    UpdateVaultParams {
        authority: Address,
        params: VaultParams,
    },
    LiquidateVaultWithAuction {
        liquidator: Address,
        vault_id: u64,
    },
    BidAuction {
        bidder: Address,
        auction_id: u64,
        max_collateral: Amount,
        max_ssusd: Amount,
    },
    UpdateAuctionParams {
        authority: Address,
        params: AuctionParams,
    },

    // === Reserve ===
    DepositReserve {
        depositor: Address,
        amount: Coin,
    },
    RequestRedemption {
        requester: Address,
        ssusd_amount: Amount,
        output_denom: Denom,
    },
    ExecuteRedemption {
        executor: Address,
        redemption_id: u64,
    },
    CancelRedemption {
        authority: Address,
        redemption_id: u64,
    },
    SubmitAttestation {
        attester: Address,
        report: AttestationReport,
    },
    SetApprovedAttester {
        authority: Address,
        attester: Address,
        approved: bool,
    },
    UpdateReserveParams {
        authority: Address,
        params: ReserveParams,
    },

    // === Circuit ===
    PauseSystem {
        authority: Address,
        reason: String,
        /// Zero pauses until resumed
        #[serde(default)]
        duration_secs: u64,
    },
    ResumeSystem {
        authority: Address,
    },
    TripCircuit {
        authority: Address,
        module: String,
        reason: String,
        #[serde(default)]
        disabled_messages: Vec<String>,
    },
    ResetCircuit {
        authority: Address,
        module: String,
    },
    UpdateCircuitParams {
        authority: Address,
        params: CircuitParams,
    },
    UpdateLiquidationLimits {
        authority: Address,
        max_per_block: u64,
        max_value: Amount,
        #[serde(default)]
        cooldown_blocks: u64,
    },
    UpdateOracleDeviationConfig {
        authority: Address,
        config: OracleDeviationConfig,
    },
}

impl Msg {
    /// Variant name, e.g. `MintStablecoin`
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Module owning the message
    pub fn module(&self) -> &'static str {
        use Msg::*;
        match self {
            PauseSystem { .. }
            | ResumeSystem { .. }
            | TripCircuit { .. }
            | ResetCircuit { .. }
            | UpdateCircuitParams { .. }
            | UpdateLiquidationLimits { .. }
            | UpdateOracleDeviationConfig { .. } => ssusd_circuit::MODULE_NAME,
            _ => ssusd_stablecoin::MODULE_NAME,
        }
    }

    /// `/ssusd.<module>.v1.Msg<Name>`
    pub fn type_url(&self) -> String {
        format!("/ssusd.{}.v1.Msg{}", self.module(), self.name())
    }

    /// Address that signed the message
    pub fn signer(&self) -> &Address {
        use Msg::*;
        match self {
            CreateVault { owner, .. }
            | DepositCollateral { owner, .. }
            | WithdrawCollateral { owner, .. }
            | MintStablecoin { owner, .. }
            | RepayStablecoin { owner, .. } => owner,
            LiquidateVault { liquidator, .. } | LiquidateVaultWithAuction { liquidator, .. } => {
                liquidator
            }
            BidAuction { bidder, .. } => bidder,
            DepositReserve { depositor, .. } => depositor,
            RequestRedemption { requester, .. } => requester,
            ExecuteRedemption { executor, .. } => executor,
            SubmitAttestation { attester, .. } => attester,
            UpdateVaultParams { authority, .. }
            | UpdateAuctionParams { authority, .. }
            | CancelRedemption { authority, .. }
            | SetApprovedAttester { authority, .. }
            | UpdateReserveParams { authority, .. }
            | PauseSystem { authority, .. }
            | ResumeSystem { authority }
            | TripCircuit { authority, .. }
            | ResetCircuit { authority, .. }
            | UpdateCircuitParams { authority, .. }
            | UpdateLiquidationLimits { authority, .. }
            | UpdateOracleDeviationConfig { authority, .. } => authority,
        }
    }
}

/// Result payload of a delivered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MsgResponse {
    Empty,
    VaultCreated { vault_id: u64 },
    Repaid { amount: Amount },
    Liquidated { seized: Coin },
    AuctionStarted { auction_id: u64 },
    AuctionBid { fill: BidFill },
    ReserveDeposited { deposit_id: u64, minted: Amount },
    RedemptionRequested { redemption_id: u64 },
    RedemptionExecuted { output: Coin },
    RedemptionCancelled { refunded: Amount },
    AttestationRecorded { attestation_id: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssusd_circuit::params::{MSG_DEPOSIT_RESERVE, MSG_MINT_STABLECOIN};

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_type_urls_match_rate_limit_targets() {
        let mint = Msg::MintStablecoin {
            owner: addr("alice"),
            vault_id: 1,
            amount: Coin::stablecoin(Amount::from(10)),
        };
        assert_eq!(mint.type_url(), MSG_MINT_STABLECOIN);
        assert_eq!(mint.signer(), &addr("alice"));

        let deposit = Msg::DepositReserve {
            depositor: addr("bob"),
            amount: Coin::new(Denom::new("usdy").unwrap(), Amount::from(10)),
        };
        assert_eq!(deposit.type_url(), MSG_DEPOSIT_RESERVE);

        let resume = Msg::ResumeSystem { authority: addr("gov") };
        assert_eq!(resume.module(), "circuit");
        assert_eq!(resume.type_url(), "/ssusd.circuit.v1.MsgResumeSystem");

        let bid = Msg::BidAuction {
            bidder: addr("carol"),
            auction_id: 1,
            max_collateral: Amount::from(10),
            max_ssusd: Amount::from(100),
        };
        assert_eq!(bid.module(), "stablecoin");
        assert_eq!(bid.signer(), &addr("carol"));
        assert_eq!(bid.type_url(), "/ssusd.stablecoin.v1.MsgBidAuction");
    }

    #[test]
    fn test_json_shape() {
        let msg: Msg = serde_json::from_str(
            r#"{"type": "pause_system", "authority": "gov", "reason": "incident"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            Msg::PauseSystem {
                authority: addr("gov"),
                reason: "incident".to_string(),
                duration_secs: 0,
            }
        );
    }
}
