use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A stable identifier for a consensus node's operating account, of the form
/// `shard.realm.number`. Used as the key that survives address-book churn:
/// two snapshots referring to the same `NodeId` reuse the same connection
/// and health cell whenever the node's endpoint set is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub shard: u64,
    pub realm: u64,
    pub number: u64,
}

impl NodeId {
    pub const fn new(shard: u64, realm: u64, number: u64) -> Self {
        Self { shard, realm, number }
    }

    /// Constructs a node id on shard 0, realm 0, as the well-known node tables do.
    pub const fn from_number(number: u64) -> Self {
        Self::new(0, 0, number)
    }
}

/// Accounts and nodes share the same `shard.realm.number` shape; an
/// operator or transaction owner is identified the same way a node is.
pub type AccountId = NodeId;

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.number)
    }
}

impl FromStr for NodeId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        let (Some(shard), Some(realm), Some(number)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(crate::Error::BadConfig(format!("invalid node id `{s}`, expected shard.realm.number")));
        };
        let parse = |field: &str| {
            field.parse::<u64>().map_err(|_| crate::Error::BadConfig(format!("invalid node id `{s}`")))
        };
        Ok(Self { shard: parse(shard)?, realm: parse(realm)?, number: parse(number)? })
    }
}
