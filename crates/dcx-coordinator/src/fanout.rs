//! Concurrent request fan-out to display workers

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use dcx_core::error::{ContextError, TransportError};
use dcx_core::traits::MessageBroker;
use dcx_core::types::DisplayName;
use dcx_core::DcxError;
use dcx_protocol::{Command, ProtocolError, WorkerReply, WorkerRequest};

use crate::directory::WorkerDirectory;

/// A validated reply and the worker that sent it
#[derive(Debug, Clone)]
pub struct EndpointReply {
    pub display_name: DisplayName,
    pub reply: WorkerReply,
}

/// Sends requests to one or all live display workers.
///
/// Every call is bounded by the configured RPC timeout and every reply is
/// validated before it is handed back.
pub struct FanOut {
    broker: Arc<dyn MessageBroker>,
    directory: WorkerDirectory,
    timeout: Duration,
}

impl FanOut {
    /// Create a fan-out executor
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        directory: WorkerDirectory,
        timeout: Duration,
    ) -> Self {
        Self {
            broker,
            directory,
            timeout,
        }
    }

    /// Worker directory used for discovery
    pub fn directory(&self) -> &WorkerDirectory {
        &self.directory
    }

    /// Send `request` to every live worker.
    ///
    /// All calls are in flight before any reply is awaited and every call is
    /// allowed to settle. If any of them failed the whole broadcast fails with
    /// the first failure in display-name order. With no live worker at all the
    /// broadcast fails with [`ContextError::NoWorkers`] instead of succeeding
    /// empty.
    pub async fn broadcast(&self, request: WorkerRequest) -> Result<Vec<EndpointReply>, DcxError> {
        let endpoints = self.directory.discover().await?;
        if endpoints.is_empty() {
            return Err(ContextError::NoWorkers.into());
        }

        let body = request.to_value()?;
        tracing::debug!(
            "Broadcasting {} to {} workers",
            request.command,
            endpoints.len()
        );

        let calls = endpoints.iter().map(|endpoint| {
            self.call_channel(
                &endpoint.display_name,
                &endpoint.channel,
                request.command,
                body.clone(),
            )
        });

        join_all(calls).await.into_iter().collect()
    }

    /// Send `request` to one worker
    pub async fn call(
        &self,
        display_name: &DisplayName,
        request: WorkerRequest,
    ) -> Result<WorkerReply, DcxError> {
        let channel = self.directory.channel_for(display_name);
        let body = request.to_value()?;
        let reply = self
            .call_channel(display_name, &channel, request.command, body)
            .await?;
        Ok(reply.reply)
    }

    async fn call_channel(
        &self,
        display_name: &DisplayName,
        channel: &str,
        command: Command,
        body: serde_json::Value,
    ) -> Result<EndpointReply, DcxError> {
        let raw = tokio::time::timeout(self.timeout, self.broker.call(channel, body))
            .await
            .map_err(|_| TransportError::Timeout {
                channel: channel.to_string(),
                after: self.timeout,
            })??;

        let reply = WorkerReply::parse(command, raw).map_err(|e| match e {
            ProtocolError::WorkerReported { command, message } => {
                tracing::debug!("{} rejected {}: {}", display_name, command, message);
                DcxError::from(ContextError::WorkerReported {
                    display: display_name.to_string(),
                    command,
                    message,
                })
            }
            other => DcxError::from(other),
        })?;

        Ok(EndpointReply {
            display_name: display_name.clone(),
            reply,
        })
    }
}
