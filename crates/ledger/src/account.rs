//! Ledger accounts

use serde::{Deserialize, Serialize};
use ssusd_core::Address;
use std::fmt;
use strum_macros::{Display, EnumString};

/// A user account or a named module account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountId {
    User(Address),
    Module(String),
}

impl AccountId {
    pub fn module(name: impl Into<String>) -> Self {
        AccountId::Module(name.into())
    }
}

impl From<&Address> for AccountId {
    fn from(address: &Address) -> Self {
        AccountId::User(address.clone())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountId::User(address) => write!(f, "{address}"),
            AccountId::Module(name) => write!(f, "module:{name}"),
        }
    }
}

/// Supply-changing rights of a module account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModulePermission {
    Minter,
    Burner,
}
