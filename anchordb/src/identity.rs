//! Authority set tracking from admin records.
//!
//! Only membership is interpreted: which identity chains are federated or
//! audit servers. Everything else an admin block says is carried as
//! [`AdminRecord::Other`] and ignored.

use std::collections::BTreeMap;

use anchordb_accumulator::{HASH_LENGTH, Hash};

use crate::{Error, Result};

/// An admin record relevant to authority membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRecord {
    /// Promote an identity to federated server.
    AddFederatedServer {
        /// Identity chain id.
        identity: Hash,
    },
    /// Drop an identity from the authority set.
    RemoveFederatedServer {
        /// Identity chain id.
        identity: Hash,
    },
    /// Promote an identity to audit server.
    AddAuditServer {
        /// Identity chain id.
        identity: Hash,
    },
    /// Any other admin record kind.
    Other {
        /// Raw record kind.
        kind: u8,
    },
}

/// Role held by an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Federated server.
    Federated,
    /// Audit server.
    Audit,
}

impl Role {
    fn to_byte(self) -> u8 {
        match self {
            Role::Federated => 0,
            Role::Audit => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Role::Federated),
            1 => Ok(Role::Audit),
            other => Err(Error::Codec(format!("unknown authority role {}", other))),
        }
    }
}

/// Current authorities, sorted by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthoritySet {
    members: BTreeMap<Hash, Role>,
}

impl AuthoritySet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of authorities.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no authorities.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Role of `identity`, if it is an authority.
    pub fn role(&self, identity: &Hash) -> Option<Role> {
        self.members.get(identity).copied()
    }

    /// Authorities in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hash, &Role)> {
        self.members.iter()
    }

    /// Apply one block's admin records and report whether the set changed.
    ///
    /// Additions are applied in record order; removals are applied after
    /// all additions of the same block.
    pub fn apply(&mut self, records: &[AdminRecord]) -> bool {
        let before = self.members.clone();
        let mut removals = Vec::new();
        for record in records {
            match *record {
                AdminRecord::AddFederatedServer { identity } => {
                    self.members.insert(identity, Role::Federated);
                }
                AdminRecord::AddAuditServer { identity } => {
                    self.members.insert(identity, Role::Audit);
                }
                AdminRecord::RemoveFederatedServer { identity } => removals.push(identity),
                AdminRecord::Other { .. } => {}
            }
        }
        for identity in removals {
            self.members.remove(&identity);
        }
        self.members != before
    }

    /// `role || identity` per member, in identity order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.members.len() * (1 + HASH_LENGTH));
        for (identity, role) in &self.members {
            buf.push(role.to_byte());
            buf.extend_from_slice(identity.as_bytes());
        }
        buf
    }

    /// Decode bytes produced by [`AuthoritySet::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % (1 + HASH_LENGTH) != 0 {
            return Err(Error::Codec(format!(
                "authority set length {} is not a multiple of {}",
                bytes.len(),
                1 + HASH_LENGTH
            )));
        }
        let mut members = BTreeMap::new();
        for chunk in bytes.chunks_exact(1 + HASH_LENGTH) {
            let role = Role::from_byte(chunk[0])?;
            let identity = Hash::from_slice(&chunk[1..]).map_err(|e| Error::Codec(e.to_string()))?;
            members.insert(identity, role);
        }
        Ok(AuthoritySet { members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> Hash {
        Hash::new([n; 32])
    }

    #[test]
    fn additions_change_the_set() {
        let mut set = AuthoritySet::new();
        assert!(set.apply(&[AdminRecord::AddFederatedServer { identity: id(1) }]));
        assert!(!set.apply(&[AdminRecord::AddFederatedServer { identity: id(1) }]));
        assert!(set.apply(&[AdminRecord::AddAuditServer { identity: id(1) }]));
        assert_eq!(set.role(&id(1)), Some(Role::Audit));
    }

    #[test]
    fn removals_apply_after_additions() {
        let mut set = AuthoritySet::new();
        set.apply(&[AdminRecord::AddFederatedServer { identity: id(1) }]);
        let changed = set.apply(&[
            AdminRecord::RemoveFederatedServer { identity: id(2) },
            AdminRecord::AddFederatedServer { identity: id(2) },
        ]);
        assert!(!changed);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn other_records_are_ignored() {
        let mut set = AuthoritySet::new();
        assert!(!set.apply(&[AdminRecord::Other { kind: 7 }]));
        assert!(set.is_empty());
    }

    #[test]
    fn bytes_round_trip_in_identity_order() {
        let mut set = AuthoritySet::new();
        set.apply(&[
            AdminRecord::AddAuditServer { identity: id(9) },
            AdminRecord::AddFederatedServer { identity: id(3) },
        ]);
        let bytes = set.to_bytes();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 3);
        assert_eq!(AuthoritySet::from_bytes(&bytes).expect("decode"), set);
        assert!(AuthoritySet::from_bytes(&bytes[1..]).is_err());
    }
}
