//! Identity directory backed by configuration

use std::collections::{BTreeMap, BTreeSet};

use crate::config::IdentityEntry;
use crate::domain::result::Result;
use crate::domain::{CompanyId, Role, Uploader};
use crate::ports::IdentityDirectory;

/// Fixed identity table, usually the `identities` section of settings.json
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    identities: BTreeMap<String, IdentityEntry>,
}

impl StaticDirectory {
    pub fn new(identities: BTreeMap<String, IdentityEntry>) -> Self {
        Self { identities }
    }

    pub fn role_of(&self, identity: &str) -> Option<Role> {
        self.identities.get(identity).map(|entry| entry.role)
    }

    /// Uploader for a configured identity
    pub fn uploader(&self, identity: &str) -> Option<Uploader> {
        self.role_of(identity).map(|role| Uploader::new(identity, role))
    }
}

impl IdentityDirectory for StaticDirectory {
    fn resolve_companies_for(&self, identity: &str) -> Result<BTreeSet<CompanyId>> {
        Ok(self
            .identities
            .get(identity)
            .map(|entry| entry.companies.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        let mut identities = BTreeMap::new();
        identities.insert(
            "gil".to_string(),
            IdentityEntry {
                role: Role::Manager,
                companies: [CompanyId(3), CompanyId(4)].into_iter().collect(),
            },
        );
        StaticDirectory::new(identities)
    }

    #[test]
    fn test_known_identity() {
        let directory = directory();
        assert_eq!(directory.role_of("gil"), Some(Role::Manager));
        assert_eq!(directory.resolve_companies_for("gil").unwrap().len(), 2);
        assert_eq!(directory.uploader("gil").unwrap().id, "gil");
    }

    #[test]
    fn test_unknown_identity_has_no_companies() {
        let directory = directory();
        assert_eq!(directory.role_of("zoe"), None);
        assert!(directory.resolve_companies_for("zoe").unwrap().is_empty());
    }
}
