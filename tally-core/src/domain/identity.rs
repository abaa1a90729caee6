//! Uploader identity and company scoping

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a seller company (tenant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub i64);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access role of an uploading identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Scoped to the company it belongs to
    #[serde(alias = "cliente")]
    Client,
    /// Read access across all companies
    #[serde(alias = "analista")]
    Analyst,
    /// Manages every company
    #[serde(alias = "gestor")]
    Manager,
}

impl Role {
    /// Whether this role can act on behalf of more than one company
    pub fn acts_across_companies(&self) -> bool {
        matches!(self, Role::Analyst | Role::Manager)
    }
}

/// The identity performing an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uploader {
    pub id: String,
    pub role: Role,
}

impl Uploader {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_portuguese_labels() {
        let role: Role = serde_json::from_str("\"gestor\"").unwrap();
        assert_eq!(role, Role::Manager);
        let role: Role = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(role, Role::Client);
    }

    #[test]
    fn test_cross_company_roles() {
        assert!(Role::Manager.acts_across_companies());
        assert!(Role::Analyst.acts_across_companies());
        assert!(!Role::Client.acts_across_companies());
    }
}
