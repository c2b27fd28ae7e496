use std::collections::BTreeSet;
use std::sync::Arc;

use crate::channel::ChannelBalancer;
use crate::endpoint::HostAndPort;
use crate::snapshot::AtomicSnapshot;
use crate::Error;

/// A snapshot of mirror-node endpoints. Simpler than `ConsensusNetworkData`:
/// mirror queries are idempotent and cheap to fail-fast, so there is no
/// per-node health tracking, just one shared channel pool.
pub struct MirrorNetworkData {
    addresses: BTreeSet<HostAndPort>,
    balancer: ChannelBalancer,
}

impl MirrorNetworkData {
    pub fn new(addresses: BTreeSet<HostAndPort>) -> Result<Self, Error> {
        let endpoints: Vec<_> = addresses.iter().cloned().collect();
        let balancer = ChannelBalancer::new(&endpoints, std::time::Duration::from_secs(10))?;
        Ok(Self { addresses, balancer })
    }

    pub fn addresses(&self) -> &BTreeSet<HostAndPort> {
        &self.addresses
    }

    pub fn channel_balancer(&self) -> &ChannelBalancer {
        &self.balancer
    }
}

/// The atomically-swappable cell holding the current mirror network view.
pub struct MirrorNetwork {
    snapshot: AtomicSnapshot<MirrorNetworkData>,
}

impl MirrorNetwork {
    pub fn new(addresses: BTreeSet<HostAndPort>) -> Result<Self, Error> {
        Ok(Self { snapshot: AtomicSnapshot::new(MirrorNetworkData::new(addresses)?) })
    }

    pub fn load(&self) -> Arc<MirrorNetworkData> {
        self.snapshot.load()
    }

    pub fn update_addresses(&self, addresses: BTreeSet<HostAndPort>) -> Result<(), Error> {
        self.snapshot.try_update(|_| MirrorNetworkData::new(addresses.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_address_set() {
        assert!(MirrorNetworkData::new(BTreeSet::new()).is_err());
    }

    #[tokio::test]
    async fn accepts_single_endpoint() {
        let mut addrs = BTreeSet::new();
        addrs.insert(HostAndPort::new("mainnet-public.mirrornode.hedera.com", 443));
        assert!(MirrorNetworkData::new(addrs).is_ok());
    }
}
