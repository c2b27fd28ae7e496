use crate::endpoint::HostAndPort;
use crate::id::NodeId;

/// One announced node's record from the address book. Port priority when
/// picking the single endpoint `ConsensusNetwork::from_address_book` keeps
/// for a node is: TLS port first, then plaintext, then anything else.
#[derive(Debug, Clone)]
pub struct AddressBookEntry {
    pub node_id: NodeId,
    pub service_endpoints: Vec<HostAndPort>,
}

/// The parsed result of an address-book query against the mirror network.
/// Decoding the raw RPC response into this shape is the surrounding SDK's
/// concern (transaction/query wire formats are out of scope here); the core
/// only consumes the parsed entries.
#[derive(Debug, Clone, Default)]
pub struct NodeAddressBook {
    pub entries: Vec<AddressBookEntry>,
}

impl AddressBookEntry {
    /// The single endpoint this node should be reached at, per the port
    /// priority above, or `None` if it announced no usable endpoint.
    pub fn preferred_endpoint(&self) -> Option<&HostAndPort> {
        self.service_endpoints
            .iter()
            .filter(|e| !e.host.is_empty())
            .min_by_key(|e| endpoint_priority(e.port))
    }
}

fn endpoint_priority(port: u16) -> u8 {
    use crate::endpoint::{CONSENSUS_PLAINTEXT_PORT, CONSENSUS_TLS_PORT};
    match port {
        CONSENSUS_TLS_PORT => 0,
        CONSENSUS_PLAINTEXT_PORT => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_tls_endpoint_over_plaintext() {
        let entry = AddressBookEntry {
            node_id: NodeId::from_number(3),
            service_endpoints: vec![
                HostAndPort::new("1.2.3.4", 50211),
                HostAndPort::new("1.2.3.4", 50212),
            ],
        };
        assert_eq!(entry.preferred_endpoint().unwrap().port, 50212);
    }

    #[test]
    fn no_usable_endpoint_when_all_hosts_empty() {
        let entry = AddressBookEntry {
            node_id: NodeId::from_number(3),
            service_endpoints: vec![HostAndPort::new("", 50211)],
        };
        assert!(entry.preferred_endpoint().is_none());
    }
}
