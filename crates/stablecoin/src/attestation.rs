//! Proof-of-reserve attestations for off-chain holdings
//!
//! Attestations are append-only. Each record carries a SHA-256 digest over
//! its content and the previous record's digest, so any rewrite of history
//! breaks the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ssusd_core::{Address, Amount, Authority, Event, Governance};
use ssusd_store::Context;
use thiserror::Error;
use tracing::info;

use crate::error::{StablecoinError, StablecoinResult};
use crate::keys::{APPROVED_ATTESTER, ATTESTATION, NEXT_ATTESTATION_ID, STORE_KEY};
use crate::reserve::ReserveEngine;
use crate::types::OffChainAttestation;

/// `prev_digest` of the first attestation
pub const GENESIS_DIGEST: &str = "GENESIS";

/// Report submitted by an approved attester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationReport {
    #[serde(default)]
    pub total_cash: Amount,
    #[serde(default)]
    pub total_tbills: Amount,
    #[serde(default)]
    pub total_tnotes: Amount,
    #[serde(default)]
    pub total_tbonds: Amount,
    #[serde(default)]
    pub total_repos: Amount,
    #[serde(default)]
    pub total_mmf: Amount,
    pub total_value: Amount,
    pub custodian_name: String,
    #[serde(default)]
    pub audit_firm: String,
    pub report_date: DateTime<Utc>,
    /// Hex SHA-256 of the signed report document
    pub attestation_hash: String,
}

impl AttestationReport {
    pub fn validate(&self) -> StablecoinResult<()> {
        if self.custodian_name.trim().is_empty() {
            return Err(StablecoinError::InvalidAttestation(
                "custodian name required".to_string(),
            ));
        }
        let decoded = hex::decode(&self.attestation_hash).map_err(|err| {
            StablecoinError::InvalidAttestation(format!("attestation hash is not hex: {err}"))
        })?;
        if decoded.len() != 32 {
            return Err(StablecoinError::InvalidAttestation(format!(
                "attestation hash must be 32 bytes, got {}",
                decoded.len()
            )));
        }
        Ok(())
    }
}

/// Break found while walking the attestation chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Broken link at attestation {id}: expected prev_digest '{expected}', got '{actual}'")]
    BrokenLink {
        id: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid digest at attestation {id}: expected '{expected}', got '{actual}'")]
    InvalidDigest {
        id: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid sequence: expected id {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}

/// SHA-256 over every field except `digest`
pub fn attestation_digest(a: &OffChainAttestation) -> String {
    let mut hasher = Sha256::new();
    hasher.update(a.id.to_be_bytes());
    hasher.update(a.prev_digest.as_bytes());
    hasher.update(a.attester.as_str().as_bytes());
    for total in [
        a.total_cash,
        a.total_tbills,
        a.total_tnotes,
        a.total_tbonds,
        a.total_repos,
        a.total_mmf,
        a.total_value,
    ] {
        hasher.update(total.to_string().as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(a.custodian_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(a.audit_firm.as_bytes());
    hasher.update([0u8]);
    hasher.update(a.report_date.to_rfc3339().as_bytes());
    hasher.update(a.attestation_hash.as_bytes());
    hasher.update(a.timestamp.to_rfc3339().as_bytes());
    hasher.update(a.block_height.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Verify links, digests and id order of attestations sorted by id
pub fn verify_chain(attestations: &[OffChainAttestation]) -> Result<(), ChainError> {
    let mut prev_digest = GENESIS_DIGEST.to_string();
    let mut prev_id: Option<u64> = None;

    for a in attestations {
        if let Some(prev) = prev_id {
            if a.id != prev + 1 {
                return Err(ChainError::InvalidSequence {
                    expected: prev + 1,
                    actual: a.id,
                });
            }
        }
        if a.prev_digest != prev_digest {
            return Err(ChainError::BrokenLink {
                id: a.id,
                expected: prev_digest,
                actual: a.prev_digest.clone(),
            });
        }
        let calculated = attestation_digest(a);
        if a.digest != calculated {
            return Err(ChainError::InvalidDigest {
                id: a.id,
                expected: calculated,
                actual: a.digest.clone(),
            });
        }
        prev_digest = a.digest.clone();
        prev_id = Some(a.id);
    }
    Ok(())
}

impl ReserveEngine {
    pub fn is_approved_attester(&self, ctx: &Context, attester: &Address) -> bool {
        ctx.has(&STORE_KEY.str_key(APPROVED_ATTESTER, attester.as_str()))
    }

    pub fn approved_attesters(&self, ctx: &Context) -> StablecoinResult<Vec<Address>> {
        Ok(ctx.scan_values(&STORE_KEY.key(APPROVED_ATTESTER))?)
    }

    pub fn set_approved_attester(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        attester: &Address,
        approved: bool,
    ) -> StablecoinResult<()> {
        self.store_attester(ctx, attester, approved)?;
        info!(
            authority = %authority.address(),
            attester = %attester,
            approved,
            "attester updated"
        );
        ctx.emit(Event::AttesterUpdated {
            attester: attester.clone(),
            approved,
        });
        Ok(())
    }

    pub(crate) fn store_attester(&self, ctx: &mut Context, attester: &Address, approved: bool) -> StablecoinResult<()> {
        let key = STORE_KEY.str_key(APPROVED_ATTESTER, attester.as_str());
        if approved {
            ctx.set(&key, attester)?;
        } else {
            ctx.delete(&key);
        }
        Ok(())
    }

    pub fn next_attestation_id(&self, ctx: &Context) -> StablecoinResult<u64> {
        Ok(ctx.get(&STORE_KEY.key(NEXT_ATTESTATION_ID))?.unwrap_or(1))
    }

    pub fn attestation(&self, ctx: &Context, id: u64) -> StablecoinResult<OffChainAttestation> {
        ctx.get(&STORE_KEY.id_key(ATTESTATION, id))?
            .ok_or(StablecoinError::AttestationNotFound(id))
    }

    /// All attestations in id order
    pub fn attestations(&self, ctx: &Context) -> StablecoinResult<Vec<OffChainAttestation>> {
        Ok(ctx.scan_values(&STORE_KEY.key(ATTESTATION))?)
    }

    pub fn latest_attestation(&self, ctx: &Context) -> StablecoinResult<Option<OffChainAttestation>> {
        let next = self.next_attestation_id(ctx)?;
        if next <= 1 {
            return Ok(None);
        }
        Ok(ctx.get(&STORE_KEY.id_key(ATTESTATION, next - 1))?)
    }

    /// Record a report from an approved attester, chained to the latest one
    pub fn record_attestation(
        &self,
        ctx: &mut Context,
        attester: &Address,
        report: AttestationReport,
    ) -> StablecoinResult<u64> {
        report.validate()?;
        if !self.is_approved_attester(ctx, attester) {
            return Err(StablecoinError::AttesterNotApproved(attester.clone()));
        }

        let id = self.next_attestation_id(ctx)?;
        let prev_digest = self
            .latest_attestation(ctx)?
            .map_or_else(|| GENESIS_DIGEST.to_string(), |a| a.digest);

        let mut attestation = OffChainAttestation {
            id,
            attester: attester.clone(),
            total_cash: report.total_cash,
            total_tbills: report.total_tbills,
            total_tnotes: report.total_tnotes,
            total_tbonds: report.total_tbonds,
            total_repos: report.total_repos,
            total_mmf: report.total_mmf,
            total_value: report.total_value,
            custodian_name: report.custodian_name,
            audit_firm: report.audit_firm,
            report_date: report.report_date,
            attestation_hash: report.attestation_hash,
            timestamp: ctx.block_time(),
            block_height: ctx.block_height(),
            prev_digest,
            digest: String::new(),
        };
        attestation.digest = attestation_digest(&attestation);

        ctx.set(&STORE_KEY.id_key(ATTESTATION, id), &attestation)?;
        ctx.set(&STORE_KEY.key(NEXT_ATTESTATION_ID), &(id + 1))?;

        info!(
            attestation_id = id,
            attester = %attester,
            total_value = %attestation.total_value,
            custodian = %attestation.custodian_name,
            "reserve attestation recorded"
        );
        ctx.emit(Event::ReserveAttestation {
            attestation_id: id,
            attester: attester.clone(),
            total_value: attestation.total_value,
            custodian_name: attestation.custodian_name.clone(),
            digest: attestation.digest.clone(),
        });
        Ok(id)
    }

    pub fn verify_attestation_chain(&self, ctx: &Context) -> StablecoinResult<()> {
        verify_chain(&self.attestations(ctx)?).map_err(|err| StablecoinError::InvariantBroken {
            name: "attestation_chain",
            detail: err.to_string(),
        })
    }
}
