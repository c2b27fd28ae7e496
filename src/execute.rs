use std::ops::ControlFlow;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::StreamExt;
use tonic::transport::Channel;

use crate::backoff::ExponentialBackoff;
use crate::client::Client;
use crate::id::AccountId;
use crate::node_iterator;
use crate::status::PrecheckStatus;
use crate::tx_id::TransactionId;
use crate::Error;

/// The operations the execution loop needs from a request, independent of
/// the concrete transaction or query family it represents. Implementors
/// live in the surrounding SDK; this crate only drives the state machine.
pub trait Execute {
    type GrpcRequest: prost::Message + Clone + 'static;
    type GrpcResponse: prost::Message + Default + 'static;
    /// Extra bookkeeping threaded from `build_wire_message` to `build_result`.
    type Context: Send;
    type Response;

    /// The explicit nodes this request must be submitted to, if any.
    fn node_account_ids(&self) -> Option<&[AccountId]> {
        None
    }

    /// The explicit transaction id this request must use, if any.
    fn transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// The first chunk's transaction id, for a multi-chunk submission whose
    /// later chunks derive their id from it rather than generating fresh.
    fn first_transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// This request's position within a multi-chunk submission, used with
    /// `first_transaction_id` to derive this chunk's transaction id.
    fn chunk_index(&self) -> Option<u64> {
        None
    }

    fn requires_transaction_id(&self) -> bool {
        true
    }

    /// The account to draw a regenerated transaction id from, absent an
    /// explicit one on the request itself.
    fn operator_account_id(&self) -> Option<AccountId> {
        None
    }

    /// Whether an expired transaction id should be regenerated and retried.
    /// `None` defers to the client's own default.
    fn regenerate_on_expiry(&self) -> Option<bool> {
        None
    }

    fn should_retry_pre_check(&self, _status: i32) -> bool {
        false
    }

    #[allow(unused_variables)]
    fn should_retry_response(&self, response: &Self::GrpcResponse) -> bool {
        false
    }

    fn build_wire_message(
        &self,
        transaction_id: Option<TransactionId>,
        node_account_id: AccountId,
    ) -> Result<(Self::GrpcRequest, Self::Context), Error>;

    fn invoke<'a>(
        &'a self,
        channel: Channel,
        request: Self::GrpcRequest,
    ) -> BoxFuture<'a, Result<Self::GrpcResponse, tonic::Status>>;

    fn precheck_status(response: &Self::GrpcResponse) -> Result<i32, Error>;

    fn build_result(
        &self,
        response: Self::GrpcResponse,
        context: Self::Context,
        node_account_id: AccountId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Self::Response, Error>;

    fn build_precheck_error(&self, status: PrecheckStatus, transaction_id: Option<TransactionId>) -> Error;
}

/// Classification of a non-terminal per-node outcome: whether the execution
/// loop should try the next candidate right away, or fall back to a backoff
/// sleep before starting a fresh round.
enum Retry {
    Immediate(Error),
    Backoff(Error),
}

/// Drives `executable` to completion against `client`'s current network,
/// retrying across nodes and, when a round exhausts its candidates,
/// sleeping per an exponential backoff until `timeout` (or the request's
/// configured default) elapses.
pub async fn execute<E>(client: &Client, executable: &E, timeout: Option<std::time::Duration>) -> Result<E::Response, Error>
where
    E: Execute + Sync,
{
    let overall_timeout = timeout.or_else(|| client.request_timeout());
    let backoff_config = client.request_backoff();
    let mut backoff = ExponentialBackoff::new(
        backoff_config.initial,
        backoff_config.max,
        Some(overall_timeout.unwrap_or(crate::backoff::DEFAULT_MAX_ELAPSED)),
    );

    let explicit_transaction_id = executable.transaction_id();
    let regenerate = executable.regenerate_on_expiry().unwrap_or_else(|| client.default_regenerate());

    // The account a TransactionExpired regeneration draws from, chosen once
    // up front. An explicit transaction id or a false regenerate toggle both
    // rule out regeneration entirely, independent of whether an operator is
    // configured at all.
    let regeneration_operator = if explicit_transaction_id.is_some() || !regenerate {
        None
    } else {
        executable
            .first_transaction_id()
            .map(|id| id.account_id)
            .or_else(|| executable.operator_account_id())
            .or_else(|| client.operator_account_id())
    };

    let mut transaction_id = if executable.requires_transaction_id() {
        explicit_transaction_id
            .or_else(|| executable.first_transaction_id().map(|first| TransactionId::derive_chunk(first, executable.chunk_index().unwrap_or(0))))
            .or_else(|| executable.operator_account_id().map(TransactionId::generate))
            .or_else(|| client.operator_account_id().map(TransactionId::generate))
    } else {
        None
    };

    let explicit_node_indices = executable
        .node_account_ids()
        .map(|ids| client.consensus().load().indices_for(ids))
        .transpose()?;

    let max_attempts = client.max_attempts();
    let mut attempts = 0usize;
    let mut last_error: Option<Error> = None;

    loop {
        let now = Instant::now();
        let consensus = client.consensus().load();
        let (round_indices, passthrough) = node_iterator::candidate_round(&consensus, explicit_node_indices.as_deref(), now);
        drop(consensus);

        if round_indices.is_empty() && last_error.is_none() {
            return Err(Error::NoHealthyNodes);
        }

        let mut candidates = Box::pin(node_iterator::filtered_candidates(client, round_indices, passthrough));

        while let Some(node_index) = candidates.next().await {
            if attempts >= max_attempts {
                return Err(Error::TimedOut(Box::new(last_error.unwrap_or(Error::NoHealthyNodes))));
            }
            attempts += 1;

            match execute_single(client, executable, node_index, regeneration_operator, &mut transaction_id).await? {
                ControlFlow::Break(response) => return Ok(response),
                ControlFlow::Continue(Retry::Immediate(err)) => last_error = Some(err),
                ControlFlow::Continue(Retry::Backoff(err)) => {
                    last_error = Some(err);
                    break;
                }
            }
        }

        match backoff.next() {
            Some(duration) => {
                tracing::debug!(?duration, attempts, "round exhausted without success, backing off");
                tokio::time::sleep(duration).await;
            }
            None => return Err(Error::TimedOut(Box::new(last_error.unwrap_or(Error::NoHealthyNodes)))),
        }
    }
}

async fn execute_single<E>(
    client: &Client,
    executable: &E,
    node_index: usize,
    regeneration_operator: Option<AccountId>,
    transaction_id: &mut Option<TransactionId>,
) -> Result<ControlFlow<E::Response, Retry>, Error>
where
    E: Execute + Sync,
{
    let consensus = client.consensus().load();
    let node_account_id = consensus.nodes()[node_index];
    let channel = consensus.channel_balancer(node_index)?.pick();

    let (request, context) = executable.build_wire_message(*transaction_id, node_account_id)?;

    let response = match executable.invoke(channel, request).await {
        Ok(response) => response,
        Err(status) => {
            return match status.code() {
                tonic::Code::Unavailable | tonic::Code::ResourceExhausted => {
                    tracing::debug!(node = %node_account_id, code = ?status.code(), "node unavailable, marking unhealthy");
                    consensus.mark_unhealthy(node_index, Instant::now());
                    Ok(ControlFlow::Continue(Retry::Immediate(status.into())))
                }
                _ => Err(status.into()),
            };
        }
    };

    consensus.mark_healthy(node_index, Instant::now());

    let raw_status = E::precheck_status(&response)?;
    let status = PrecheckStatus::from_code(raw_status).ok_or(Error::ResponseStatusUnrecognized(raw_status))?;

    match status {
        PrecheckStatus::Ok if executable.should_retry_response(&response) => Ok(ControlFlow::Continue(Retry::Backoff(
            executable.build_precheck_error(status, *transaction_id),
        ))),

        PrecheckStatus::Ok => executable
            .build_result(response, context, node_account_id, *transaction_id)
            .map(ControlFlow::Break),

        PrecheckStatus::Busy | PrecheckStatus::PlatformNotActive => Ok(ControlFlow::Continue(Retry::Immediate(
            executable.build_precheck_error(status, *transaction_id),
        ))),

        PrecheckStatus::TransactionExpired => match regeneration_operator {
            Some(operator) => {
                *transaction_id = Some(TransactionId::generate(operator));
                Ok(ControlFlow::Continue(Retry::Immediate(executable.build_precheck_error(status, *transaction_id))))
            }
            None if executable.should_retry_pre_check(status.code()) => Ok(ControlFlow::Continue(Retry::Backoff(
                executable.build_precheck_error(status, *transaction_id),
            ))),
            None => Err(executable.build_precheck_error(status, *transaction_id)),
        },

        _ if executable.should_retry_pre_check(status.code()) => Ok(ControlFlow::Continue(Retry::Backoff(
            executable.build_precheck_error(status, *transaction_id),
        ))),

        _ => Err(executable.build_precheck_error(status, *transaction_id)),
    }
}
