//! Integration tests for the circuit breaker state machines

use chrono::{DateTime, Duration, TimeZone, Utc};

use ssusd_circuit::{
    CircuitBreaker, CircuitError, CircuitParams, CircuitStatus, RateLimitConfig, TripSource,
};
use ssusd_core::{Address, ErrorKind, Event};
use ssusd_store::{BlockHeader, Context, MemStore};

const MINT: &str = "/ssusd.stablecoin.v1.MsgMintStablecoin";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn at(secs: i64) -> BlockHeader {
    BlockHeader::new(1 + secs as u64 / 6, t0() + Duration::seconds(secs))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn with_params(store: &mut MemStore, cb: &CircuitBreaker, params: CircuitParams) -> anyhow::Result<()> {
    let gov = cb.authorize_governance(&addr("gov"))?;
    let mut ctx = Context::new(store, at(0));
    cb.set_params(&mut ctx, &gov, params)?;
    Ok(())
}

#[test]
fn test_failure_threshold_trips_on_nth() -> anyhow::Result<()> {
    init_tracing();
    let cb = CircuitBreaker::new(addr("gov"));
    let mut store = MemStore::new();
    with_params(
        &mut store,
        &cb,
        CircuitParams {
            default_failure_threshold: 3,
            default_recovery_period_secs: 120,
            ..CircuitParams::default()
        },
    )?;

    let mut ctx = Context::new(&mut store, at(10));
    assert!(!cb.record_failure(&mut ctx, "stablecoin")?);
    assert!(!cb.record_failure(&mut ctx, "stablecoin")?);
    assert!(!cb.is_module_circuit_open(&ctx, "stablecoin")?);
    assert!(cb.record_failure(&mut ctx, "stablecoin")?);
    assert!(cb.is_module_circuit_open(&ctx, "stablecoin")?);

    let state = cb.module_circuit(&ctx, "stablecoin")?.expect("circuit exists");
    assert_eq!(state.tripped_by, Some(TripSource::Automatic));
    assert_eq!(state.recovery_time, Some(t0() + Duration::seconds(130)));
    assert!(matches!(
        ctx.events().last(),
        Some(Event::CircuitTripped { tripped_by, .. }) if tripped_by == "automatic"
    ));

    let err = cb
        .check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SystemHalt);
    drop(ctx);

    // still open before recovery; further failures do not re-trip
    let mut ctx = Context::new(&mut store, at(100));
    assert!(!cb.record_failure(&mut ctx, "stablecoin")?);
    assert!(ctx.events().is_empty());
    drop(ctx);

    // recovery closes the circuit lazily, the sweep persists it
    let mut ctx = Context::new(&mut store, at(130));
    assert!(!cb.is_module_circuit_open(&ctx, "stablecoin")?);
    cb.check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))?;
    cb.sweep_expired(&mut ctx)?;
    let state = cb.module_circuit(&ctx, "stablecoin")?.expect("circuit exists");
    assert_eq!(state.status, CircuitStatus::Closed);
    assert_eq!(state.failure_count, 0);
    assert!(matches!(
        ctx.events().last(),
        Some(Event::CircuitReset { reset_by: None, .. })
    ));
    Ok(())
}

#[test]
fn test_rate_limit_window() -> anyhow::Result<()> {
    init_tracing();
    let cb = CircuitBreaker::new(addr("gov"));
    let mut store = MemStore::new();
    with_params(
        &mut store,
        &cb,
        CircuitParams {
            rate_limits: vec![RateLimitConfig::new("burst", 3, 30, true)],
            ..CircuitParams::default()
        },
    )?;

    let mut ctx = Context::new(&mut store, at(0));
    for _ in 0..3 {
        cb.check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))?;
    }
    let err = cb
        .check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))
        .unwrap_err();
    assert!(matches!(
        err,
        CircuitError::RateLimitExceeded { ref name, max_requests: 3, window_seconds: 30 } if name == "burst"
    ));
    assert!(err.is_retryable());
    drop(ctx);

    let mut ctx = Context::new(&mut store, at(29));
    assert!(cb
        .check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))
        .is_err());
    drop(ctx);

    let mut ctx = Context::new(&mut store, at(31));
    cb.check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))?;
    let state = cb.rate_limit_state(&ctx, "burst:alice")?.expect("bucket exists");
    assert_eq!(state.count, 1);
    assert_eq!(state.window_start, t0() + Duration::seconds(31));
    Ok(())
}

#[test]
fn test_timed_pause_expires() -> anyhow::Result<()> {
    init_tracing();
    let cb = CircuitBreaker::new(addr("gov"));
    let mut store = MemStore::new();
    with_params(
        &mut store,
        &cb,
        CircuitParams {
            authorities: vec![addr("ops")],
            ..CircuitParams::default()
        },
    )?;

    let mut ctx = Context::new(&mut store, at(0));
    let ops = cb.authorize(&ctx, &addr("ops"))?;
    cb.pause_system(&mut ctx, &ops, "oracle outage", 3_600)?;
    drop(ctx);

    let mut ctx = Context::new(&mut store, at(1_800));
    assert!(cb.is_globally_paused(&ctx)?);
    let err = cb
        .check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))
        .unwrap_err();
    assert!(matches!(
        err,
        CircuitError::GlobalPause { auto_resume_at: Some(t), .. } if t == t0() + Duration::seconds(3_600)
    ));
    drop(ctx);

    let mut ctx = Context::new(&mut store, at(5_400));
    assert!(!cb.is_globally_paused(&ctx)?);
    cb.check_circuit_breakers(&mut ctx, "stablecoin", MINT, &addr("alice"))?;
    assert!(matches!(cb.resume_system(&mut ctx, &ops), Err(CircuitError::NotPaused)));

    cb.sweep_expired(&mut ctx)?;
    assert!(!cb.global_state(&ctx)?.paused);
    assert_eq!(ctx.events(), &[Event::SystemResumed { resumed_by: None }]);

    // a lapsed pause does not block a new one
    cb.pause_system(&mut ctx, &ops, "again", 0)?;
    assert!(cb.is_globally_paused(&ctx)?);
    Ok(())
}

#[test]
fn test_unauthorized_operator() {
    let cb = CircuitBreaker::new(addr("gov"));
    let mut store = MemStore::new();
    let ctx = Context::new(&mut store, at(0));
    let err = cb.authorize(&ctx, &addr("mallory")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}
