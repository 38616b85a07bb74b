//! Combined genesis of the stablecoin and circuit modules

use std::path::Path;

use serde::{Deserialize, Serialize};
use ssusd_circuit::CircuitGenesis;
use ssusd_stablecoin::GenesisState;

use crate::error::AppResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppGenesis {
    #[serde(default)]
    pub stablecoin: GenesisState,
    #[serde(default)]
    pub circuit: CircuitGenesis,
}

impl AppGenesis {
    pub fn validate(&self) -> AppResult<()> {
        self.stablecoin.validate()?;
        self.circuit.validate()?;
        Ok(())
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let genesis: Self = serde_json::from_str(&content)?;
        genesis.validate()?;
        Ok(genesis)
    }

    pub fn write_file(&self, path: &Path) -> AppResult<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}
