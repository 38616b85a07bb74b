//! Per-block solvency check of the reserve path

use ssusd_core::Event;
use ssusd_store::Context;
use tracing::{debug, error};

use crate::error::StablecoinResult;
use crate::reserve::ReserveEngine;

/// Reserve ratio below which minting and redemption are both paused
pub const CRITICAL_RESERVE_RATIO_BPS: u32 = 9_000;

/// Result of one solvency pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvencyCheck {
    /// Nothing minted through the reserve path
    Skipped,
    Healthy { ratio_bps: u32 },
    /// Below the critical ratio, already fully paused
    Latched { ratio_bps: u32 },
    /// Below the critical ratio; minting and redemption were just paused
    Emergency { ratio_bps: u32 },
}

/// Revalues the reserve and pauses it when backing drops below
/// `CRITICAL_RESERVE_RATIO_BPS`. Pausing is one-way; only governance
/// lifts it through new reserve params.
pub struct SolvencyMonitor<'a> {
    reserve: &'a ReserveEngine,
}

impl<'a> SolvencyMonitor<'a> {
    pub fn new(reserve: &'a ReserveEngine) -> Self {
        Self { reserve }
    }

    pub fn run(&self, ctx: &mut Context) -> StablecoinResult<SolvencyCheck> {
        if self.reserve.reserve(ctx)?.total_minted.is_zero() {
            return Ok(SolvencyCheck::Skipped);
        }

        self.reserve.update_reserve_value(ctx)?;
        let ratio_bps = self.reserve.reserve_ratio(ctx)?;
        if ratio_bps >= CRITICAL_RESERVE_RATIO_BPS {
            debug!(ratio_bps, "reserve solvent");
            return Ok(SolvencyCheck::Healthy { ratio_bps });
        }

        let mut params = self.reserve.reserve_params(ctx)?;
        if params.fully_paused() {
            return Ok(SolvencyCheck::Latched { ratio_bps });
        }

        params.mint_paused = true;
        params.redeem_paused = true;
        self.reserve.store_params(ctx, &params)?;

        error!(
            ratio_bps,
            threshold_bps = CRITICAL_RESERVE_RATIO_BPS,
            "reserve ratio critical, minting and redemption paused"
        );
        ctx.emit(Event::SolvencyEmergency {
            reserve_ratio_bps: ratio_bps,
            threshold_bps: CRITICAL_RESERVE_RATIO_BPS,
        });
        Ok(SolvencyCheck::Emergency { ratio_bps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserve::tests::{open_params, setup};
    use crate::testing::{addr, coin};
    use rust_decimal_macros::dec;

    #[test]
    fn test_skipped_without_supply() {
        let (mut h, engine) = setup(open_params());
        let mut ctx = h.ctx();
        assert_eq!(SolvencyMonitor::new(&engine).run(&mut ctx).unwrap(), SolvencyCheck::Skipped);
    }

    #[test]
    fn test_price_drop_latches_pause() {
        let (mut h, engine) = setup(open_params());
        engine
            .deposit_reserve(&mut h.ctx(), &addr("alice"), coin("usdy", 1_000))
            .unwrap();

        h.advance(6);
        h.set_price("usdy", dec!(0.95));
        let mut ctx = h.ctx();
        let monitor = SolvencyMonitor::new(&engine);
        assert_eq!(monitor.run(&mut ctx).unwrap(), SolvencyCheck::Healthy { ratio_bps: 9_500 });
        drop(ctx);

        h.advance(6);
        h.set_price("usdy", dec!(0.85));
        let mut ctx = h.ctx();
        assert_eq!(monitor.run(&mut ctx).unwrap(), SolvencyCheck::Emergency { ratio_bps: 8_500 });
        assert!(engine.reserve_params(&ctx).unwrap().fully_paused());
        assert!(matches!(
            ctx.events().last(),
            Some(Event::SolvencyEmergency { reserve_ratio_bps: 8_500, threshold_bps: 9_000 })
        ));

        // a second pass neither re-emits nor unpauses
        assert_eq!(monitor.run(&mut ctx).unwrap(), SolvencyCheck::Latched { ratio_bps: 8_500 });
        assert_eq!(ctx.events().len(), 1);
        drop(ctx);

        h.advance(6);
        h.set_price("usdy", dec!(1));
        let mut ctx = h.ctx();
        assert_eq!(monitor.run(&mut ctx).unwrap(), SolvencyCheck::Healthy { ratio_bps: 10_000 });
        assert!(engine.reserve_params(&ctx).unwrap().fully_paused());
    }
}
