//! The internal liveness probe `NodeIterator` uses to decide whether an
//! unpinged node is worth including in an execution round. Exists purely to
//! drive that inline ping; never constructed by the surrounding SDK.

use futures::future::BoxFuture;
use tonic::transport::Channel;

use crate::execute::Execute;
use crate::id::AccountId;
use crate::status::PrecheckStatus;
use crate::tx_id::TransactionId;
use crate::Error;

pub mod pb {
    tonic::include_proto!("ledger_client_core");
}

pub(crate) struct Ping {
    pub node_account_id: AccountId,
}

impl Execute for Ping {
    type GrpcRequest = pb::PingRequest;
    type GrpcResponse = pb::PingResponse;
    type Context = ();
    type Response = ();

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        Some(std::slice::from_ref(&self.node_account_id))
    }

    fn requires_transaction_id(&self) -> bool {
        false
    }

    fn build_wire_message(
        &self,
        _transaction_id: Option<TransactionId>,
        _node_account_id: AccountId,
    ) -> Result<(Self::GrpcRequest, Self::Context), Error> {
        Ok((pb::PingRequest {}, ()))
    }

    fn invoke<'a>(&'a self, channel: Channel, request: Self::GrpcRequest) -> BoxFuture<'a, Result<Self::GrpcResponse, tonic::Status>> {
        Box::pin(async move {
            let mut client = pb::ping_service_client::PingServiceClient::new(channel);
            client.ping(request).await.map(|r| r.into_inner())
        })
    }

    fn precheck_status(response: &Self::GrpcResponse) -> Result<i32, Error> {
        Ok(response.precheck_status)
    }

    fn build_result(
        &self,
        _response: Self::GrpcResponse,
        _context: Self::Context,
        _node_account_id: AccountId,
        _transaction_id: Option<TransactionId>,
    ) -> Result<Self::Response, Error> {
        Ok(())
    }

    fn build_precheck_error(&self, status: PrecheckStatus, transaction_id: Option<TransactionId>) -> Error {
        Error::PrecheckFailed {
            node: self.node_account_id,
            status: status.code(),
            transaction_id: transaction_id.map(|t| t.to_string()),
        }
    }
}
