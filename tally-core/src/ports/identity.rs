//! Identity port - company scoping lookups

use std::collections::BTreeSet;

use crate::domain::result::Result;
use crate::domain::CompanyId;

/// Answers which companies an identity may act for
pub trait IdentityDirectory: Send + Sync {
    /// Companies the identity can upload for (empty if unknown)
    fn resolve_companies_for(&self, identity: &str) -> Result<BTreeSet<CompanyId>>;
}
