//! Well-known network presets, usable without any external configuration.

use std::collections::{BTreeSet, HashMap};

use crate::endpoint::{HostAndPort, CONSENSUS_PLAINTEXT_PORT, MIRROR_PLAINTEXT_PORT, MIRROR_TLS_PORT};
use crate::id::NodeId;

/// `(node number, consensus hostnames/IPs)` pairs for mainnet.
pub const MAINNET: &[(u64, &[&str])] = &[
    (3, &["13.124.142.126", "15.164.44.66", "15.165.118.251", "34.239.82.6", "35.237.200.180"]),
    (4, &["3.130.52.236", "35.186.191.247"]),
    (5, &["3.18.18.254", "23.111.186.250", "35.192.2.25", "74.50.117.35", "107.155.64.98"]),
    (6, &["13.52.108.243", "13.71.90.154", "35.199.161.108", "104.211.205.124"]),
    (7, &["3.114.54.4", "35.203.82.240"]),
    (8, &["35.183.66.150", "35.236.5.219"]),
    (9, &["35.181.158.250", "35.197.192.225"]),
    (10, &["3.248.27.48", "35.242.233.154", "177.154.62.234"]),
    (11, &["13.53.119.185", "35.240.118.96"]),
    (12, &["35.177.162.180", "35.204.86.32", "170.187.184.238"]),
];

/// `(node number, consensus hostnames/IPs)` pairs for testnet.
pub const TESTNET: &[(u64, &[&str])] = &[
    (3, &["0.testnet.hedera.com", "34.94.106.61", "50.18.132.211"]),
    (4, &["1.testnet.hedera.com", "35.237.119.55", "3.212.6.13"]),
    (5, &["2.testnet.hedera.com", "35.245.27.193", "52.20.18.86"]),
    (6, &["3.testnet.hedera.com", "34.83.112.116", "54.70.192.33"]),
    (7, &["4.testnet.hedera.com", "34.94.160.4", "54.176.199.109"]),
];

/// `(node number, consensus hostnames/IPs)` pairs for previewnet.
pub const PREVIEWNET: &[(u64, &[&str])] = &[
    (3, &["0.previewnet.hedera.com", "35.231.208.148", "3.211.248.172", "40.121.64.48"]),
    (4, &["1.previewnet.hedera.com", "35.199.15.177", "3.133.213.146", "40.70.11.202"]),
    (5, &["2.previewnet.hedera.com", "35.225.201.195", "52.15.105.130", "104.43.248.63"]),
];

pub const MAINNET_MIRROR: &str = "mainnet-public.mirrornode.hedera.com";
pub const TESTNET_MIRROR: &str = "testnet.mirrornode.hedera.com";
pub const PREVIEWNET_MIRROR: &str = "previewnet.mirrornode.hedera.com";

/// Expands a static node table into an `endpoint -> node id` map on the
/// consensus plaintext port, the shape `ConsensusNetworkData::from_address_map`
/// expects.
pub fn consensus_address_map(table: &'static [(u64, &'static [&'static str])]) -> HashMap<HostAndPort, NodeId> {
    let mut map = HashMap::new();
    for &(number, hosts) in table {
        let node = NodeId::from_number(number);
        for &host in hosts {
            map.insert(HostAndPort::new(host, CONSENSUS_PLAINTEXT_PORT), node);
        }
    }
    map
}

pub fn mirror_addresses(host: &str) -> BTreeSet<HostAndPort> {
    BTreeSet::from([HostAndPort::new(host, MIRROR_TLS_PORT)])
}

/// `localhost`: a single consensus node bound to account `0.0.3`, mirror
/// plaintext on `5600`.
pub fn localhost_consensus() -> HashMap<HostAndPort, NodeId> {
    HashMap::from([(HostAndPort::new("127.0.0.1", CONSENSUS_PLAINTEXT_PORT), NodeId::from_number(3))])
}

pub fn localhost_mirror() -> BTreeSet<HostAndPort> {
    mirror_addresses_for_hosts(&["127.0.0.1"])
}

/// Whether `host` names a loopback address: `localhost`, a literal `127.x.x.x`,
/// or `::1`. Hostnames that merely resolve to loopback at DNS time don't count.
fn is_local_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") || host == "::1" {
        return true;
    }
    host.parse::<std::net::Ipv4Addr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

/// Builds a mirror address set from plain hostnames, forcing the plaintext
/// mirror port when every host is local and the TLS port otherwise.
pub fn mirror_addresses_for_hosts(hosts: &[&str]) -> BTreeSet<HostAndPort> {
    let port = if hosts.iter().all(|&h| is_local_host(h)) { MIRROR_PLAINTEXT_PORT } else { MIRROR_TLS_PORT };
    hosts.iter().map(|&h| HostAndPort::new(h, port)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_table_expands_to_plaintext_consensus_endpoints() {
        let map = consensus_address_map(MAINNET);
        assert!(map.values().any(|&id| id == NodeId::from_number(3)));
        assert!(map.keys().all(|e| e.port == CONSENSUS_PLAINTEXT_PORT));
    }

    #[test]
    fn all_local_hosts_force_plaintext_mirror_port() {
        let addresses = mirror_addresses_for_hosts(&["127.0.0.1", "localhost"]);
        assert!(addresses.iter().all(|e| e.port == MIRROR_PLAINTEXT_PORT));
    }

    #[test]
    fn any_remote_host_forces_tls_mirror_port() {
        let addresses = mirror_addresses_for_hosts(&["127.0.0.1", "mirror.example.com"]);
        assert!(addresses.iter().all(|e| e.port == MIRROR_TLS_PORT));
    }
}
