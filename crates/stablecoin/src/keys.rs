//! Store layout of the stablecoin module

use ssusd_store::StoreKey;

pub const STORE_KEY: StoreKey = StoreKey::new("stablecoin");

pub const RESERVE_PARAMS: u8 = 0x01;
pub const RESERVE: u8 = 0x02;
pub const NEXT_DEPOSIT_ID: u8 = 0x03;
pub const RESERVE_DEPOSIT: u8 = 0x04;
pub const NEXT_REDEMPTION_ID: u8 = 0x05;
pub const REDEMPTION_REQUEST: u8 = 0x06;
pub const DAILY_STATS: u8 = 0x07;
pub const NEXT_ATTESTATION_ID: u8 = 0x08;
pub const ATTESTATION: u8 = 0x09;
pub const APPROVED_ATTESTER: u8 = 0x0A;
pub const LOCKED_RESERVES: u8 = 0x0B;
pub const VAULT_PARAMS: u8 = 0x0C;
pub const AUCTION_PARAMS: u8 = 0x0D;
pub const VAULT: u8 = 0x10;
pub const VAULT_COUNT: u8 = 0x11;
pub const AUCTION: u8 = 0x12;
pub const NEXT_AUCTION_ID: u8 = 0x13;
