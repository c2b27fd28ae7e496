use crate::NodeId;

use thiserror::Error;

/// Errors surfaced by the network membership model and the execution loop.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bad configuration: {0}")]
    BadConfig(String),

    #[error("node {0} is not present in the current network snapshot")]
    UnknownNode(NodeId),

    #[error("rpc call failed with code {code:?}: {message}")]
    Rpc { code: tonic::Code, message: String },

    #[error("node {node} returned pre-check status {status}")]
    PrecheckFailed { node: NodeId, status: i32, transaction_id: Option<String> },

    #[error("server returned an unrecognized response status code {0}")]
    ResponseStatusUnrecognized(i32),

    #[error("request timed out after exhausting the retry budget: {0}")]
    TimedOut(Box<Error>),

    #[error("no healthy nodes are available in the current network snapshot")]
    NoHealthyNodes,

    #[error("failed to build rpc channel: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("failed to parse configuration document: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::Rpc { code: status.code(), message: status.message().to_owned() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
