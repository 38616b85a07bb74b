//! Store layout of the circuit module

use ssusd_store::StoreKey;

pub const STORE_KEY: StoreKey = StoreKey::new("circuit");

pub const PARAMS: u8 = 0x01;
pub const GLOBAL_STATE: u8 = 0x02;
/// + module name
pub const MODULE_CIRCUIT: u8 = 0x03;
/// + `name` or `name:address`
pub const RATE_LIMIT_STATE: u8 = 0x04;
pub const LIQUIDATION_PROTECTION: u8 = 0x05;
/// + denom
pub const ORACLE_DEVIATION: u8 = 0x06;
