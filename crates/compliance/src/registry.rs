//! In-memory profile registry implementing `ComplianceGate`

use chrono::{DateTime, Utc};
use ssusd_core::{Address, Amount, Coin};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

use crate::config::{ComplianceConfig, FailPolicy};
use crate::error::{ComplianceError, ComplianceResult};
use crate::profile::{ComplianceProfile, KycLevel, ProfileStatus, RiskLevel};
use crate::ComplianceGate;

/// Profiles keyed by address
pub struct ProfileRegistry {
    config: ComplianceConfig,
    profiles: RwLock<HashMap<Address, ComplianceProfile>>,
}

impl ProfileRegistry {
    pub fn new(config: ComplianceConfig) -> Self {
        Self {
            config,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Registry that lets unknown addresses through
    pub fn permissive() -> Self {
        Self::new(ComplianceConfig {
            unknown_address_policy: FailPolicy::FailOpen,
            ..ComplianceConfig::default()
        })
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    pub fn upsert(&self, profile: ComplianceProfile) {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        debug!(address = %profile.address, status = %profile.status, "compliance profile stored");
        profiles.insert(profile.address.clone(), profile);
    }

    pub fn profile(&self, addr: &Address) -> Option<ComplianceProfile> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        profiles.get(addr).cloned()
    }

    pub fn set_sanctioned(&self, addr: &Address, sanctioned: bool) -> ComplianceResult<()> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let profile = profiles
            .get_mut(addr)
            .ok_or_else(|| ComplianceError::ProfileNotFound(addr.clone()))?;
        profile.sanctioned = sanctioned;
        Ok(())
    }

    /// Count `coin` against the address's daily limit once the operation succeeded
    pub fn record_transaction(
        &self,
        addr: &Address,
        coin: &Coin,
        now: DateTime<Utc>,
    ) -> ComplianceResult<()> {
        let day = now.format("%Y-%m-%d").to_string();
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let profile = profiles
            .get_mut(addr)
            .ok_or_else(|| ComplianceError::ProfileNotFound(addr.clone()))?;

        if let Some(limit) = profile.daily_limit.as_mut() {
            if limit.denom == coin.denom {
                let used = if limit.day == day { limit.used } else { Amount::ZERO };
                limit.used = used.checked_add(&coin.amount).unwrap_or(used);
                limit.day = day;
            }
        }
        Ok(())
    }

    /// Profile for `addr`, or `None` when unknown and the policy is fail-open
    fn lookup(&self, addr: &Address) -> ComplianceResult<Option<ComplianceProfile>> {
        match self.profile(addr) {
            Some(profile) => Ok(Some(profile)),
            None if self.config.unknown_address_policy == FailPolicy::FailOpen => {
                warn!(address = %addr, "no compliance profile, allowed by fail-open policy");
                Ok(None)
            }
            None => Err(ComplianceError::ProfileNotFound(addr.clone())),
        }
    }

    fn check_profile(&self, profile: &ComplianceProfile, now: DateTime<Utc>) -> ComplianceResult<()> {
        let address = &profile.address;
        if profile.sanctioned {
            return Err(ComplianceError::Sanctioned(address.clone()));
        }
        if profile.status != ProfileStatus::Active {
            return Err(ComplianceError::Blocked {
                address: address.clone(),
                reason: format!("profile status is {}", profile.status),
            });
        }
        if self.config.is_blocked_jurisdiction(&profile.jurisdiction) {
            return Err(ComplianceError::Blocked {
                address: address.clone(),
                reason: format!("jurisdiction {} is blocked", profile.jurisdiction),
            });
        }
        if let Some(expired_at) = profile.expires_at.filter(|_| profile.is_expired(now)) {
            return Err(ComplianceError::ProfileExpired {
                address: address.clone(),
                expired_at,
            });
        }
        Ok(())
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(ComplianceConfig::default())
    }
}

impl ComplianceGate for ProfileRegistry {
    fn assert_compliant(&self, addr: &Address, now: DateTime<Utc>) -> ComplianceResult<()> {
        match self.lookup(addr)? {
            Some(profile) => self.check_profile(&profile, now),
            None => Ok(()),
        }
    }

    fn assert_compliant_for_amount(
        &self,
        addr: &Address,
        coin: &Coin,
        now: DateTime<Utc>,
    ) -> ComplianceResult<()> {
        let Some(profile) = self.lookup(addr)? else {
            return Ok(());
        };
        self.check_profile(&profile, now)?;

        if let Some(limit) = profile.daily_limit.as_ref().filter(|l| l.denom == coin.denom) {
            let day = now.format("%Y-%m-%d").to_string();
            let used = profile.used_on(&day);
            let exceeds = used
                .checked_add(&coin.amount)
                .map_or(true, |total| total > limit.limit);
            if exceeds {
                return Err(ComplianceError::LimitExceeded(format!(
                    "daily limit exceeded: used {} + {} > limit {}",
                    used, coin.amount, limit.limit
                )));
            }
        }

        let high_risk = profile.risk == RiskLevel::High
            || self.config.is_high_risk_jurisdiction(&profile.jurisdiction);
        if high_risk && profile.kyc_level != KycLevel::Enhanced {
            return Err(ComplianceError::EnhancedDueDiligenceRequired(addr.clone()));
        }

        Ok(())
    }
}
