//! Caller-identity seam.
//!
//! The authentication handshake lives outside this crate; what arrives here
//! is a stable caller identifier used to namespace both the entry collection
//! and the binary object store. Every operation treats a missing identity as
//! a hard precondition failure.

use crate::error::LedgerError;

pub trait IdentityProvider: Send + Sync {
    /// Stable identifier of the signed-in caller, or `None` when signed out.
    fn caller_id(&self) -> Option<String>;
}

/// Identity of an established session.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub String);

impl StaticIdentity {
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self(caller_id.into())
    }
}

impl IdentityProvider for StaticIdentity {
    fn caller_id(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Signed-out state; every caller-scoped operation fails fast against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn caller_id(&self) -> Option<String> {
        None
    }
}

/// Resolve the caller or fail with `Unauthenticated` before any I/O happens.
pub fn require_caller(identity: &dyn IdentityProvider) -> Result<String, LedgerError> {
    identity
        .caller_id()
        .ok_or_else(|| LedgerError::Unauthenticated(anyhow::anyhow!("no caller identity available")))
}
