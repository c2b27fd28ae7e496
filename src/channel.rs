use std::time::Duration;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::thread_rng;
use tonic::transport::{Channel, Endpoint};

use crate::endpoint::{HostAndPort, TransportSecurity};
use crate::Error;

const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(10);
const TCP_KEEPALIVE: Duration = Duration::from_secs(10);

/// A pool of live RPC channels to one logical target. Channels are created
/// once at construction time and never added afterwards; `pick` selects one
/// uniformly at random on every call. `close` empties the pool; calling
/// `pick`/`len`/`is_empty` again afterwards is undefined.
///
/// Random selection rather than round-robin or least-connections is
/// deliberate: the transport layer doesn't expose a reliable per-channel
/// in-flight count, and random picks avoid synchronized retry storms across
/// client instances without needing to track one.
pub struct ChannelBalancer {
    channels: Mutex<Vec<Channel>>,
}

impl ChannelBalancer {
    /// Builds one channel per endpoint, eagerly (lazy connection is handled
    /// by `tonic` itself; `connect_lazy` avoids blocking here).
    pub fn new(endpoints: &[HostAndPort], connect_timeout: Duration) -> Result<Self, Error> {
        if endpoints.is_empty() {
            return Err(Error::BadConfig("channel balancer requires at least one endpoint".into()));
        }

        tracing::debug!(count = endpoints.len(), "building channel pool");

        let channels = endpoints
            .iter()
            .map(|endpoint| {
                let uri = match endpoint.transport_security() {
                    TransportSecurity::Tls => format!("https://{endpoint}"),
                    TransportSecurity::Plaintext => format!("http://{endpoint}"),
                };
                Endpoint::from_shared(uri)
                    .map_err(Error::Transport)
                    .map(|e| {
                        e.keep_alive_timeout(KEEP_ALIVE_TIMEOUT)
                            .keep_alive_while_idle(true)
                            .tcp_keepalive(Some(TCP_KEEPALIVE))
                            .connect_timeout(connect_timeout)
                            .connect_lazy()
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { channels: Mutex::new(channels) })
    }

    /// Picks one of the pooled channels uniformly at random.
    pub fn pick(&self) -> Channel {
        self.channels.lock().choose(&mut thread_rng()).expect("channel balancer is never empty").clone()
    }

    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }

    /// Closes the pool by dropping every channel it holds. Intended for
    /// shutdown; nothing in this crate calls `pick` on a closed balancer.
    pub fn close(&self) {
        self.channels.lock().clear();
    }
}
