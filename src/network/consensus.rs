use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::address_book::NodeAddressBook;
use crate::channel::ChannelBalancer;
use crate::connection::NodeConnection;
use crate::endpoint::HostAndPort;
use crate::health::NodeHealth;
use crate::id::NodeId;
use crate::snapshot::AtomicSnapshot;
use crate::Error;

/// An immutable view of the consensus node membership: which nodes exist,
/// what they're reachable at, and their current health. Builders below
/// produce a successor view from a predecessor one, reusing connections and
/// health cells by identity wherever a node's endpoint set is unchanged, so
/// concurrent readers of the predecessor keep observing live health updates
/// for nodes that survive into the successor.
#[derive(Default)]
pub struct ConsensusNetworkData {
    nodes: Vec<NodeId>,
    index_of: HashMap<NodeId, usize>,
    health: Vec<Arc<Mutex<NodeHealth>>>,
    connections: Vec<Arc<NodeConnection>>,
}

impl ConsensusNetworkData {
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    pub fn indices_for(&self, ids: &[NodeId]) -> Result<Vec<usize>, Error> {
        ids.iter().map(|id| self.node_index(*id).ok_or(Error::UnknownNode(*id))).collect()
    }

    /// Inverted map of every known endpoint string to the node that owns it.
    pub fn addresses(&self) -> HashMap<String, NodeId> {
        self.nodes
            .iter()
            .zip(self.connections.iter())
            .flat_map(|(&id, conn)| conn.addresses().iter().map(move |a| (a.to_string(), id)))
            .collect()
    }

    pub fn channel_balancer(&self, index: usize) -> Result<&ChannelBalancer, Error> {
        self.connections[index].channel_balancer()
    }

    pub fn mark_healthy(&self, index: usize, now: Instant) {
        self.health[index].lock().mark_healthy(now);
    }

    pub fn mark_unhealthy(&self, index: usize, now: Instant) {
        self.health[index].lock().mark_unhealthy(now);
    }

    pub fn is_healthy(&self, index: usize, now: Instant) -> bool {
        self.health[index].lock().is_healthy(now)
    }

    pub fn recently_pinged(&self, index: usize, now: Instant) -> bool {
        self.health[index].lock().recently_pinged(now)
    }

    pub fn healthy_indices(&self, now: Instant) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| self.is_healthy(i, now)).collect()
    }

    /// Builds a successor from an explicit `endpoint -> node id` map, as
    /// used by `from_addresses`-style configuration. Endpoints for the same
    /// node are grouped into one connection.
    pub fn from_address_map(prev: &Self, addresses: &HashMap<HostAndPort, NodeId>) -> Self {
        let mut grouped: HashMap<NodeId, BTreeSet<HostAndPort>> = HashMap::new();
        for (endpoint, node) in addresses {
            grouped.entry(*node).or_default().insert(endpoint.clone());
        }

        let mut nodes = grouped.keys().copied().collect::<Vec<_>>();
        nodes.sort();

        let mut index_of = HashMap::with_capacity(nodes.len());
        let mut health = Vec::with_capacity(nodes.len());
        let mut connections = Vec::with_capacity(nodes.len());

        for (i, node) in nodes.iter().copied().enumerate() {
            let endpoint_set = grouped.remove(&node).unwrap_or_default();
            let (reused_health, reused_connection) = prev.reusable_slot(node, &endpoint_set);
            index_of.insert(node, i);
            health.push(reused_health);
            connections.push(reused_connection);
        }

        Self { nodes, index_of, health, connections }
    }

    /// Builds a successor from an address-book query result. Node order
    /// follows the book's iteration order -- this is an externally visible,
    /// deterministic tie-break, not an implementation accident.
    pub fn from_address_book(prev: &Self, book: &NodeAddressBook) -> Self {
        let mut nodes = Vec::with_capacity(book.entries.len());
        let mut index_of = HashMap::with_capacity(book.entries.len());
        let mut health = Vec::with_capacity(book.entries.len());
        let mut connections = Vec::with_capacity(book.entries.len());

        for (i, entry) in book.entries.iter().enumerate() {
            let endpoint_set: BTreeSet<HostAndPort> =
                entry.preferred_endpoint().into_iter().cloned().collect();

            let (reused_health, reused_connection) = prev.reusable_slot(entry.node_id, &endpoint_set);
            nodes.push(entry.node_id);
            index_of.insert(entry.node_id, i);
            health.push(reused_health);
            connections.push(reused_connection);
        }

        Self { nodes, index_of, health, connections }
    }

    /// If `node` existed in `self` with the same endpoint set, reuse its
    /// connection (preserving any already-built channel pool) and health
    /// cell unchanged. If it existed with a different endpoint set, a fresh
    /// connection is built but the health cell is still carried over -- a
    /// node's failure history survives an address change. If the node is
    /// new, both are created fresh.
    fn reusable_slot(
        &self,
        node: NodeId,
        endpoint_set: &BTreeSet<HostAndPort>,
    ) -> (Arc<Mutex<NodeHealth>>, Arc<NodeConnection>) {
        match self.node_index(node) {
            Some(i) if self.connections[i].is_equivalent(endpoint_set) => {
                (self.health[i].clone(), self.connections[i].clone())
            }
            Some(i) => (self.health[i].clone(), Arc::new(NodeConnection::new(endpoint_set.clone()))),
            None => (Arc::new(Mutex::new(NodeHealth::Unused)), Arc::new(NodeConnection::new(endpoint_set.clone()))),
        }
    }
}

/// The atomically-swappable cell holding the current consensus network view.
#[derive(Default)]
pub struct ConsensusNetwork {
    snapshot: AtomicSnapshot<ConsensusNetworkData>,
}

impl ConsensusNetwork {
    pub fn from_addresses(addresses: &HashMap<HostAndPort, NodeId>) -> Self {
        let data = ConsensusNetworkData::from_address_map(&ConsensusNetworkData::default(), addresses);
        Self { snapshot: AtomicSnapshot::new(data) }
    }

    pub fn load(&self) -> Arc<ConsensusNetworkData> {
        self.snapshot.load()
    }

    pub fn update_from_addresses(&self, addresses: &HashMap<HostAndPort, NodeId>) {
        self.snapshot.update(|old| ConsensusNetworkData::from_address_map(old, addresses));
    }

    pub fn update_from_address_book(&self, book: &NodeAddressBook) {
        self.snapshot.update(|old| ConsensusNetworkData::from_address_book(old, book));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_book::AddressBookEntry;

    fn entry(number: u64, endpoints: &[(&str, u16)]) -> AddressBookEntry {
        AddressBookEntry {
            node_id: NodeId::from_number(number),
            service_endpoints: endpoints.iter().map(|(h, p)| HostAndPort::new(*h, *p)).collect(),
        }
    }

    #[test]
    fn address_book_builder_covers_every_entry() {
        let book = NodeAddressBook {
            entries: vec![entry(3, &[("a", 50211)]), entry(4, &[("b", 50211)])],
        };
        let data = ConsensusNetworkData::from_address_book(&ConsensusNetworkData::default(), &book);
        assert_eq!(data.nodes().len(), 2);
        assert_eq!(data.node_index(NodeId::from_number(3)), Some(0));
        assert_eq!(data.node_index(NodeId::from_number(4)), Some(1));
    }

    #[test]
    fn reuses_connection_and_health_for_unchanged_node() {
        let book1 = NodeAddressBook { entries: vec![entry(3, &[("a", 50211)]), entry(4, &[("b", 50211)])] };
        let data1 = ConsensusNetworkData::from_address_book(&ConsensusNetworkData::default(), &book1);

        let now = Instant::now();
        data1.mark_unhealthy(1, now);

        let book2 = NodeAddressBook {
            entries: vec![entry(3, &[("a", 50211)]), entry(4, &[("c", 50211)]), entry(5, &[("d", 50211)])],
        };
        let data2 = ConsensusNetworkData::from_address_book(&data1, &book2);

        // node 3 unchanged: connection reused by identity.
        assert!(Arc::ptr_eq(
            &data1.connections[data1.node_index(NodeId::from_number(3)).unwrap()],
            &data2.connections[data2.node_index(NodeId::from_number(3)).unwrap()],
        ));

        // node 4 changed endpoints: new connection, but health carried over.
        let old_idx = data1.node_index(NodeId::from_number(4)).unwrap();
        let new_idx = data2.node_index(NodeId::from_number(4)).unwrap();
        assert!(!Arc::ptr_eq(&data1.connections[old_idx], &data2.connections[new_idx]));
        assert!(Arc::ptr_eq(&data1.health[old_idx], &data2.health[new_idx]));
        assert!(!data2.is_healthy(new_idx, now));

        // node 5 is new.
        assert!(data2.node_index(NodeId::from_number(5)).is_some());
    }

    #[test]
    fn node_with_no_usable_endpoint_is_kept_unreachable() {
        let book = NodeAddressBook { entries: vec![entry(3, &[("", 50211)])] };
        let data = ConsensusNetworkData::from_address_book(&ConsensusNetworkData::default(), &book);
        assert_eq!(data.nodes().len(), 1);
        assert!(data.channel_balancer(0).is_err());
    }

    #[test]
    fn indices_for_unknown_node_errors() {
        let data = ConsensusNetworkData::default();
        assert!(matches!(data.indices_for(&[NodeId::from_number(1)]), Err(Error::UnknownNode(_))));
    }
}
