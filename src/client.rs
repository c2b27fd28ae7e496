use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::endpoint::HostAndPort;
use crate::execute::{self, Execute};
use crate::id::{AccountId, NodeId};
use crate::network::presets;
use crate::network::{ConsensusNetwork, MirrorNetwork};
use crate::ping::Ping;
use crate::refresher::RefresherHandle;
use crate::Error;

const DEFAULT_MAX_ATTEMPTS: usize = 10;
const PING_TIMEOUT: Duration = Duration::from_secs(10);
/// Default max transaction fee: 1 hbar, in tinybars. Matches the real SDK's
/// client-wide default before a request overrides it.
const DEFAULT_MAX_FEE_TINYBARS: u64 = 100_000_000;

/// Identifies which network a client is bound to. Opaque beyond equality --
/// entity-id checksum computation against it is a cryptography-adjacent
/// concern the surrounding SDK owns, out of scope here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerId {
    Mainnet,
    Testnet,
    Previewnet,
    Other(Vec<u8>),
}

/// Overall request retry pacing, distinct from a node's own health backoff
/// in [`crate::health`]: this governs how long `execute()` waits between
/// rounds once a round exhausts its candidates without success.
#[derive(Clone, Copy)]
pub(crate) struct RequestBackoffConfig {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RequestBackoffConfig {
    fn default() -> Self {
        Self { initial: crate::backoff::DEFAULT_INITIAL_INTERVAL, max: crate::backoff::DEFAULT_MAX_INTERVAL }
    }
}

/// The operator account backing auto-generated transaction ids and
/// default-signed requests. The signer itself is an opaque handle the
/// surrounding SDK installs; this crate never inspects or calls it --
/// signing is out of scope here.
#[derive(Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub signer: Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>,
}

/// Ties the network membership model, health tracking, and execution loop
/// together behind the handful of knobs a caller configures once: the
/// operator, retry budget, and request timeout.
pub struct Client {
    consensus: ConsensusNetwork,
    mirror: Option<MirrorNetwork>,
    ledger_id: Mutex<Option<LedgerId>>,
    operator: Mutex<Option<Operator>>,
    max_attempts: AtomicUsize,
    request_timeout: Mutex<Option<Duration>>,
    request_backoff: Mutex<RequestBackoffConfig>,
    auto_validate: AtomicBool,
    default_regenerate: AtomicBool,
    max_fee_tinybars: AtomicU64,
    shard: AtomicU64,
    realm: AtomicU64,
    plaintext_only_refresh: AtomicBool,
    refresher: Mutex<Option<RefresherHandle>>,
}

impl Client {
    fn new(consensus: ConsensusNetwork, mirror: Option<MirrorNetwork>) -> Self {
        Self {
            consensus,
            mirror,
            ledger_id: Mutex::new(None),
            operator: Mutex::new(None),
            max_attempts: AtomicUsize::new(DEFAULT_MAX_ATTEMPTS),
            request_timeout: Mutex::new(None),
            request_backoff: Mutex::new(RequestBackoffConfig::default()),
            auto_validate: AtomicBool::new(true),
            default_regenerate: AtomicBool::new(true),
            max_fee_tinybars: AtomicU64::new(DEFAULT_MAX_FEE_TINYBARS),
            shard: AtomicU64::new(0),
            realm: AtomicU64::new(0),
            plaintext_only_refresh: AtomicBool::new(false),
            refresher: Mutex::new(None),
        }
    }

    pub fn for_mainnet() -> Result<Self, Error> {
        let consensus = ConsensusNetwork::from_addresses(&presets::consensus_address_map(presets::MAINNET));
        let mirror = MirrorNetwork::new(presets::mirror_addresses(presets::MAINNET_MIRROR))?;
        let client = Self::new(consensus, Some(mirror));
        *client.ledger_id.lock() = Some(LedgerId::Mainnet);
        Ok(client)
    }

    pub fn for_testnet() -> Result<Self, Error> {
        let consensus = ConsensusNetwork::from_addresses(&presets::consensus_address_map(presets::TESTNET));
        let mirror = MirrorNetwork::new(presets::mirror_addresses(presets::TESTNET_MIRROR))?;
        let client = Self::new(consensus, Some(mirror));
        *client.ledger_id.lock() = Some(LedgerId::Testnet);
        Ok(client)
    }

    pub fn for_previewnet() -> Result<Self, Error> {
        let consensus = ConsensusNetwork::from_addresses(&presets::consensus_address_map(presets::PREVIEWNET));
        let mirror = MirrorNetwork::new(presets::mirror_addresses(presets::PREVIEWNET_MIRROR))?;
        let client = Self::new(consensus, Some(mirror));
        *client.ledger_id.lock() = Some(LedgerId::Previewnet);
        Ok(client)
    }

    pub fn for_localhost() -> Result<Self, Error> {
        let consensus = ConsensusNetwork::from_addresses(&presets::localhost_consensus());
        let mirror = MirrorNetwork::new(presets::localhost_mirror())?;
        Ok(Self::new(consensus, Some(mirror)))
    }

    pub fn for_addresses(addresses: &HashMap<HostAndPort, NodeId>, mirror: Option<BTreeSet<HostAndPort>>) -> Result<Self, Error> {
        let consensus = ConsensusNetwork::from_addresses(addresses);
        let mirror = mirror.map(MirrorNetwork::new).transpose()?;
        Ok(Self::new(consensus, mirror))
    }

    /// Bootstraps a client from the mirror network alone: starts with an
    /// empty consensus view and runs one address-book query against the
    /// mirror before returning, installing whatever nodes it announces.
    pub async fn for_mirror(mirror_addresses: BTreeSet<HostAndPort>) -> Result<Self, Error> {
        let mirror = MirrorNetwork::new(mirror_addresses)?;
        let client = Self::new(ConsensusNetwork::default(), Some(mirror));
        crate::refresher::refresh_once(&client).await?;
        Ok(client)
    }

    pub fn consensus(&self) -> &ConsensusNetwork {
        &self.consensus
    }

    pub fn mirror(&self) -> Option<&MirrorNetwork> {
        self.mirror.as_ref()
    }

    pub fn operator_account_id(&self) -> Option<AccountId> {
        self.operator.lock().as_ref().map(|op| op.account_id)
    }

    pub fn set_operator(&self, operator: Operator) {
        *self.operator.lock() = Some(operator);
    }

    pub fn ledger_id(&self) -> Option<LedgerId> {
        self.ledger_id.lock().clone()
    }

    pub fn set_ledger_id(&self, ledger_id: Option<LedgerId>) {
        *self.ledger_id.lock() = ledger_id;
    }

    pub fn auto_validate(&self) -> bool {
        self.auto_validate.load(Ordering::Relaxed)
    }

    pub fn set_auto_validate(&self, auto_validate: bool) {
        self.auto_validate.store(auto_validate, Ordering::Release);
    }

    /// Whether `execute` regenerates a request's transaction id by default
    /// when a node reports it expired, absent a per-request override.
    pub fn default_regenerate(&self) -> bool {
        self.default_regenerate.load(Ordering::Relaxed)
    }

    pub fn set_default_regenerate(&self, regenerate: bool) {
        self.default_regenerate.store(regenerate, Ordering::Release);
    }

    pub fn max_fee_tinybars(&self) -> u64 {
        self.max_fee_tinybars.load(Ordering::Relaxed)
    }

    pub fn set_max_fee_tinybars(&self, max_fee_tinybars: u64) {
        self.max_fee_tinybars.store(max_fee_tinybars, Ordering::Release);
    }

    pub fn shard(&self) -> u64 {
        self.shard.load(Ordering::Relaxed)
    }

    pub fn set_shard(&self, shard: u64) {
        self.shard.store(shard, Ordering::Release);
    }

    pub fn realm(&self) -> u64 {
        self.realm.load(Ordering::Relaxed)
    }

    pub fn set_realm(&self, realm: u64) {
        self.realm.store(realm, Ordering::Release);
    }

    /// Whether the address-book refresher restricts announced endpoints to
    /// the plaintext consensus port before installing a refreshed network.
    pub(crate) fn plaintext_only_refresh(&self) -> bool {
        self.plaintext_only_refresh.load(Ordering::Relaxed)
    }

    pub fn set_plaintext_only_refresh(&self, plaintext_only: bool) {
        self.plaintext_only_refresh.store(plaintext_only, Ordering::Release);
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts.load(Ordering::Relaxed)
    }

    pub fn set_max_attempts(&self, max_attempts: usize) {
        self.max_attempts.store(max_attempts, Ordering::Relaxed);
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        *self.request_timeout.lock()
    }

    pub fn set_request_timeout(&self, timeout: Option<Duration>) {
        *self.request_timeout.lock() = timeout;
    }

    pub(crate) fn request_backoff(&self) -> RequestBackoffConfig {
        *self.request_backoff.lock()
    }

    /// Sets the initial and maximum interval the execution loop waits
    /// between attempt rounds. Unrelated to a node's own health backoff,
    /// which always uses its own fixed range.
    pub fn set_request_backoff(&self, initial: Duration, max: Duration) {
        *self.request_backoff.lock() = RequestBackoffConfig { initial, max };
    }

    /// Drives `executable` through the execution loop against this client's
    /// current network.
    pub async fn execute<E>(&self, executable: &E, timeout: Option<Duration>) -> Result<E::Response, Error>
    where
        E: Execute + Sync,
    {
        execute::execute(self, executable, timeout).await
    }

    /// Synthesizes and runs the internal liveness probe `NodeIterator` uses
    /// before trusting an unpinged node.
    pub(crate) async fn ping(&self, node_index: usize) -> bool {
        let node_account_id = self.consensus.load().nodes()[node_index];
        self.execute(&Ping { node_account_id }, Some(PING_TIMEOUT)).await.is_ok()
    }

    pub(crate) fn set_refresher(&self, handle: Option<RefresherHandle>) {
        *self.refresher.lock() = handle;
    }

    /// Starts (or, on a later call, cancels and restarts) the background
    /// address-book refresh loop. Passing `None` stops refreshing. Requires
    /// `self` behind an `Arc` since the spawned task outlives this call.
    pub fn set_address_book_refresh_period(self: &Arc<Self>, period: Option<Duration>) {
        crate::refresher::start(self, period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mainnet_preset_builds_without_mirror_query() {
        let client = Client::for_mainnet().unwrap();
        assert!(!client.consensus().load().is_empty());
        assert!(client.mirror().is_some());
    }

    #[tokio::test]
    async fn max_attempts_round_trips() {
        let client = Client::for_localhost().unwrap();
        client.set_max_attempts(3);
        assert_eq!(client.max_attempts(), 3);
    }
}
