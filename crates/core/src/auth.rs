//! Authority - typed capability for privileged operations
//!
//! Privileged operations take an `&Authority<S>` instead of comparing caller
//! strings. An `Authority` can only be obtained from an `AuthorityGuard`, so
//! holding one proves the caller was checked against the configured
//! principals for scope `S`.

use crate::address::Address;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

mod sealed {
    pub trait Sealed {}
}

/// Scope of an authority capability
pub trait Scope: sealed::Sealed + fmt::Debug {
    const NAME: &'static str;
}

/// Governance: may change parameters, manage attesters, cancel redemptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Governance {}

/// Circuit operator: may pause/resume the system and trip/reset circuits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitOperator {}

impl sealed::Sealed for Governance {}
impl sealed::Sealed for CircuitOperator {}

impl Scope for Governance {
    const NAME: &'static str = "governance";
}

impl Scope for CircuitOperator {
    const NAME: &'static str = "circuit_operator";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized: {caller} is not a {scope} authority")]
    Unauthorized { caller: Address, scope: &'static str },
}

/// Proof that `address` holds scope `S`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority<S: Scope> {
    address: Address,
    _scope: PhantomData<S>,
}

impl<S: Scope> Authority<S> {
    fn grant(address: Address) -> Self {
        Self {
            address,
            _scope: PhantomData,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}

impl Authority<Governance> {
    /// Governance may always act as a circuit operator
    pub fn as_operator(&self) -> Authority<CircuitOperator> {
        Authority::grant(self.address.clone())
    }
}

/// Issues authority capabilities
#[derive(Debug, Clone)]
pub struct AuthorityGuard {
    governance: Address,
    operators: BTreeSet<Address>,
}

impl AuthorityGuard {
    pub fn new(governance: Address) -> Self {
        Self {
            governance,
            operators: BTreeSet::new(),
        }
    }

    /// Additional addresses allowed to act as circuit operators
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Address>) -> Self {
        self.operators.extend(operators);
        self
    }

    pub fn governance_address(&self) -> &Address {
        &self.governance
    }

    pub fn authorize_governance(&self, caller: &Address) -> Result<Authority<Governance>, AuthError> {
        if *caller == self.governance {
            Ok(Authority::grant(caller.clone()))
        } else {
            Err(AuthError::Unauthorized {
                caller: caller.clone(),
                scope: Governance::NAME,
            })
        }
    }

    pub fn authorize_operator(
        &self,
        caller: &Address,
    ) -> Result<Authority<CircuitOperator>, AuthError> {
        if *caller == self.governance || self.operators.contains(caller) {
            Ok(Authority::grant(caller.clone()))
        } else {
            Err(AuthError::Unauthorized {
                caller: caller.clone(),
                scope: CircuitOperator::NAME,
            })
        }
    }
}
