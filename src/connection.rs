use std::collections::BTreeSet;
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::channel::ChannelBalancer;
use crate::endpoint::HostAndPort;
use crate::Error;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The set of endpoints for one logical node plus a lazily-built channel
/// pool over those endpoints. A fresh `NodeConnection` is built whenever a
/// node's endpoint set changes across an address-book refresh; it is
/// reused, by identity, when unchanged, so existing sockets survive
/// unrelated churn elsewhere in the network.
pub struct NodeConnection {
    addresses: BTreeSet<HostAndPort>,
    channel: OnceCell<ChannelBalancer>,
}

impl NodeConnection {
    pub fn new(addresses: BTreeSet<HostAndPort>) -> Self {
        Self { addresses, channel: OnceCell::new() }
    }

    pub fn addresses(&self) -> &BTreeSet<HostAndPort> {
        &self.addresses
    }

    /// Two connections are equivalent -- and so may share a channel pool --
    /// iff their endpoint sets are identical.
    pub fn is_equivalent(&self, addresses: &BTreeSet<HostAndPort>) -> bool {
        self.addresses.symmetric_difference(addresses).next().is_none()
    }

    pub fn channel_balancer(&self) -> Result<&ChannelBalancer, Error> {
        self.channel.get_or_try_init(|| {
            let endpoints: Vec<_> = self.addresses.iter().cloned().collect();
            ChannelBalancer::new(&endpoints, DEFAULT_CONNECT_TIMEOUT)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(addrs: &[&str]) -> BTreeSet<HostAndPort> {
        addrs.iter().map(|a| a.parse().unwrap()).collect()
    }

    #[test]
    fn equivalence_is_symmetric_difference() {
        let conn = NodeConnection::new(set(&["a.example.com:50211", "b.example.com:50211"]));
        assert!(conn.is_equivalent(&set(&["b.example.com:50211", "a.example.com:50211"])));
        assert!(!conn.is_equivalent(&set(&["a.example.com:50211"])));
        assert!(!conn.is_equivalent(&set(&["a.example.com:50211", "c.example.com:50211"])));
    }
}
