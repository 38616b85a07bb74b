//! Liquidation surge protection

use ssusd_core::{Amount, Authority, Governance};
use ssusd_store::Context;
use tracing::{info, warn};

use crate::error::{CircuitError, CircuitResult};
use crate::keeper::CircuitBreaker;
use crate::keys::{LIQUIDATION_PROTECTION, STORE_KEY};
use crate::state::LiquidationSurgeProtection;

impl CircuitBreaker {
    /// Stored record, counters as last written
    pub fn liquidation_protection(&self, ctx: &Context) -> CircuitResult<LiquidationSurgeProtection> {
        Ok(ctx
            .get(&STORE_KEY.key(LIQUIDATION_PROTECTION))?
            .unwrap_or_default())
    }

    pub(crate) fn save_liquidation_protection(
        &self,
        ctx: &mut Context,
        protection: &LiquidationSurgeProtection,
    ) -> CircuitResult<()> {
        ctx.set(&STORE_KEY.key(LIQUIDATION_PROTECTION), protection)?;
        Ok(())
    }

    pub fn set_liquidation_limits(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        max_per_block: u64,
        max_value: Amount,
        cooldown_blocks: u64,
    ) -> CircuitResult<()> {
        if max_per_block == 0 {
            return Err(CircuitError::InvalidParams(
                "max liquidations per block must be positive".to_string(),
            ));
        }
        let mut protection = self.liquidation_protection(ctx)?;
        protection.max_per_block = max_per_block;
        protection.max_value = max_value;
        protection.cooldown_blocks = cooldown_blocks;
        self.save_liquidation_protection(ctx, &protection)?;

        info!(
            authority = %authority.address(),
            max_per_block,
            max_value = %max_value,
            cooldown_blocks,
            "liquidation limits updated"
        );
        Ok(())
    }

    /// Whether a liquidation of `value` would be admitted in this block.
    /// Records nothing.
    pub fn check_liquidation_allowed(&self, ctx: &Context, value: Amount) -> CircuitResult<()> {
        let height = ctx.block_height();
        let protection = self.liquidation_protection(ctx)?.at_height(height);
        admit(&protection, height, value).map(|_| ())
    }

    /// Check and record a liquidation of `value` in one step
    pub fn try_record_liquidation(&self, ctx: &mut Context, value: Amount) -> CircuitResult<()> {
        let height = ctx.block_height();
        let protection = self.liquidation_protection(ctx)?.at_height(height);
        let new_value = admit(&protection, height, value)?;
        self.record_liquidation(ctx, protection, new_value)
    }

    fn record_liquidation(
        &self,
        ctx: &mut Context,
        mut protection: LiquidationSurgeProtection,
        new_value: Amount,
    ) -> CircuitResult<()> {
        let height = ctx.block_height();
        protection.current_count += 1;
        protection.current_value = new_value;
        if protection.current_count >= protection.max_per_block && protection.cooldown_blocks > 0 {
            protection.cooldown_until_height = height
                .saturating_add(protection.cooldown_blocks)
                .saturating_add(1);
            warn!(
                height,
                cooldown_until = protection.cooldown_until_height,
                "liquidation cap reached, cooldown started"
            );
        }
        self.save_liquidation_protection(ctx, &protection)
    }
}

/// Block value after admitting `value`, or `LiquidationSurge`
fn admit(protection: &LiquidationSurgeProtection, height: u64, value: Amount) -> CircuitResult<Amount> {
    let reject = |detail: String| {
        warn!(height, value = %value, detail = %detail, "rejected: liquidation surge");
        CircuitError::LiquidationSurge(detail)
    };

    if protection.in_cooldown(height) {
        return Err(reject(format!(
            "cooling down until block {}",
            protection.cooldown_until_height
        )));
    }
    if protection.current_count >= protection.max_per_block {
        return Err(reject(format!(
            "{} liquidations already in block {height}",
            protection.current_count
        )));
    }
    let new_value = protection
        .current_value
        .checked_add(&value)
        .ok_or(CircuitError::InvalidValue(value))?;
    if new_value > protection.max_value {
        return Err(reject(format!(
            "block value {new_value} would exceed {}",
            protection.max_value
        )));
    }
    Ok(new_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::tests::{addr, breaker, t0};
    use chrono::Duration;
    use ssusd_store::{BlockHeader, MemStore};

    fn block(height: u64) -> BlockHeader {
        BlockHeader::new(height, t0() + Duration::seconds(6 * height as i64))
    }

    #[test]
    fn test_per_block_count() {
        let cb = breaker();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, block(1));
        for _ in 0..10 {
            cb.try_record_liquidation(&mut ctx, Amount::from(100)).unwrap();
        }
        assert!(matches!(
            cb.check_liquidation_allowed(&ctx, Amount::from(1)),
            Err(CircuitError::LiquidationSurge(_))
        ));
        assert!(cb.try_record_liquidation(&mut ctx, Amount::from(1)).is_err());
        assert_eq!(cb.liquidation_protection(&ctx).unwrap().current_count, 10);
        drop(ctx);

        // counters reset in the next block
        let mut ctx = Context::new(&mut store, block(2));
        cb.check_liquidation_allowed(&ctx, Amount::from(1)).unwrap();
        cb.try_record_liquidation(&mut ctx, Amount::from(1)).unwrap();
        assert_eq!(cb.liquidation_protection(&ctx).unwrap().current_count, 1);
    }

    #[test]
    fn test_value_cap() {
        let cb = breaker();
        let gov = cb.authorize_governance(&addr("gov")).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, block(1));
        cb.set_liquidation_limits(&mut ctx, &gov, 10, Amount::from(1_000), 0)
            .unwrap();

        cb.try_record_liquidation(&mut ctx, Amount::from(600)).unwrap();
        let err = cb.try_record_liquidation(&mut ctx, Amount::from(401)).unwrap_err();
        assert!(err.is_retryable());
        cb.try_record_liquidation(&mut ctx, Amount::from(400)).unwrap();
        assert_eq!(
            cb.liquidation_protection(&ctx).unwrap().current_value,
            Amount::from(1_000)
        );
    }

    #[test]
    fn test_cap_starts_cooldown() {
        let cb = breaker();
        let gov = cb.authorize_governance(&addr("gov")).unwrap();
        let mut store = MemStore::new();
        {
            let mut ctx = Context::new(&mut store, block(1));
            cb.set_liquidation_limits(&mut ctx, &gov, 2, Amount::from(1_000_000), 2)
                .unwrap();
            cb.try_record_liquidation(&mut ctx, Amount::from(1)).unwrap();
            cb.try_record_liquidation(&mut ctx, Amount::from(1)).unwrap();
        }
        for height in [2, 3] {
            let ctx = Context::new(&mut store, block(height));
            assert!(cb.check_liquidation_allowed(&ctx, Amount::from(1)).is_err());
        }
        let mut ctx = Context::new(&mut store, block(4));
        cb.try_record_liquidation(&mut ctx, Amount::from(1)).unwrap();
    }
}
