// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrying client for the remote query service.
//!
//! [`QueryClient::call`] performs one logical request: it classifies each
//! attempt's status, retries transient failures under a [`RetryPolicy`], and
//! posts throttled progress notes while it waits. [`QueryClient::run_chain`]
//! and [`QueryClient::run_direct`] compose calls into the two query modes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::QueryError;
use crate::metrics::{record_outcome, record_retry};
use crate::policy::{ProgressSink, RetryPolicy, Sleeper, TokioSleeper};
use crate::settings::QuerySettings;
use crate::transport::QueryTransport;
use crate::types::{ChainOutcome, Endpoint, Question, QueryStatus, RemoteQueryRequest, RemoteQueryResponse};

/// How an HTTP status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    Unauthorized,
    Client,
    Transient,
}

fn classify(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 | 403 => StatusClass::Unauthorized,
        500..=599 => StatusClass::Transient,
        _ => StatusClass::Client,
    }
}

/// Executes requests against a [`QueryTransport`]. Holds no per-request state.
#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn QueryTransport>,
    sleeper: Arc<dyn Sleeper>,
}

impl QueryClient {
    pub fn new(transport: Arc<dyn QueryTransport>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper (tests record delays instead of waiting).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Performs one request with retries, returning the decoded response.
    pub async fn call(
        &self,
        request: &RemoteQueryRequest,
        policy: &RetryPolicy,
    ) -> Result<RemoteQueryResponse, QueryError> {
        let value = self.call_value(request, policy).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Performs one request with retries, returning the raw JSON body.
    pub async fn call_value(
        &self,
        request: &RemoteQueryRequest,
        policy: &RetryPolicy,
    ) -> Result<serde_json::Value, QueryError> {
        let endpoint = request.endpoint;
        let mut retries: u32 = 0;

        loop {
            let attempt = retries + 1;
            let last_failure = match self.transport.send(request).await {
                Ok(response) => match classify(response.status) {
                    StatusClass::Success => {
                        debug!(%endpoint, attempt, "query call succeeded");
                        record_outcome(endpoint, "success", attempt);
                        return Ok(serde_json::from_str(&response.body)?);
                    }
                    StatusClass::Unauthorized => {
                        record_outcome(endpoint, "unauthorized", attempt);
                        return Err(QueryError::Unauthorized {
                            status: response.status,
                        });
                    }
                    StatusClass::Client => {
                        record_outcome(endpoint, "client_error", attempt);
                        return Err(QueryError::ClientError {
                            status: response.status,
                            body: response.body,
                        });
                    }
                    StatusClass::Transient => format!("HTTP {}", response.status),
                },
                Err(QueryError::Transport { message, .. }) => message,
                Err(other) => {
                    record_outcome(endpoint, other.kind(), attempt);
                    return Err(other);
                }
            };

            retries += 1;
            if retries >= policy.max_retries {
                warn!(%endpoint, attempts = retries, last_failure = %last_failure, "retries exhausted");
                record_outcome(endpoint, "retries_exhausted", retries);
                return Err(QueryError::RetriesExhausted {
                    attempts: retries,
                    last_failure,
                });
            }

            warn!(
                %endpoint,
                retry = retries,
                delay_secs = policy.backoff.delay(retries).as_secs(),
                failure = %last_failure,
                "transient failure, will retry"
            );
            record_retry(endpoint);
            self.pause(endpoint, policy, retries).await;
        }
    }

    /// Posts the progress note due after `retry` waits, then sleeps the backoff.
    async fn pause(&self, endpoint: Endpoint, policy: &RetryPolicy, retry: u32) {
        if let (Some(sink), Some(note)) = (&policy.progress, policy.progress_note(retry))
            && let Err(e) = sink.notify(note).await
        {
            warn!(%endpoint, error = %e, "failed to post progress note");
        }
        self.sleeper.sleep(policy.backoff.delay(retry)).await;
    }

    /// Polls until the service leaves `processing`.
    ///
    /// Each `processing` answer counts against `policy.max_retries` and waits
    /// like a retry. An `error` status aborts with [`QueryError::UnexpectedState`].
    async fn await_compilation(
        &self,
        poll: &RemoteQueryRequest,
        policy: &RetryPolicy,
        chat_history_id: &str,
    ) -> Result<RemoteQueryResponse, QueryError> {
        let endpoint = poll.endpoint;
        let mut waits: u32 = 0;

        loop {
            let response = self.call(poll, policy).await?;
            match response.status() {
                QueryStatus::Done => return Ok(response),
                QueryStatus::Error => {
                    record_outcome(endpoint, "service_error", waits + 1);
                    return Err(QueryError::UnexpectedState(format!(
                        "request {chat_history_id} failed to compile: {}",
                        response.error.as_deref().unwrap_or("no detail given")
                    )));
                }
                QueryStatus::Processing => {}
            }

            waits += 1;
            if waits >= policy.max_retries {
                warn!(%endpoint, %chat_history_id, waits, "gave up waiting for compilation");
                record_outcome(endpoint, "retries_exhausted", waits);
                return Err(QueryError::RetriesExhausted {
                    attempts: waits,
                    last_failure: format!("request {chat_history_id} still processing"),
                });
            }
            debug!(%endpoint, %chat_history_id, wait = waits, "still processing");
            self.pause(endpoint, policy, waits).await;
        }
    }

    /// Submit, confirm processing, wait for SQL, then fetch the executed result.
    ///
    /// The first poll must report `processing`; any other status aborts with
    /// [`QueryError::UnexpectedState`]. Later polls repeat under the long
    /// policy until the status is done.
    pub async fn run_chain(
        &self,
        settings: &QuerySettings,
        question: &Question,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<ChainOutcome, QueryError> {
        let submitted = self
            .call(&settings.compile_request(question, false), &settings.short_policy())
            .await?;
        let chat_history_id = submitted.chat_history_id.ok_or_else(|| {
            QueryError::UnexpectedState("submission returned no chat_history_id".to_string())
        })?;
        info!(%chat_history_id, "query submitted");

        if let Some(sink) = &progress
            && let Err(e) = sink
                .notify(&format!("Processing your request, id={chat_history_id}"))
                .await
        {
            warn!(error = %e, "failed to post submission note");
        }

        let poll = settings.poll_request(&chat_history_id);
        let first = self.call(&poll, &settings.short_policy()).await?;
        if first.status() != QueryStatus::Processing {
            return Err(QueryError::UnexpectedState(format!(
                "expected request {chat_history_id} to be processing, service reported {}",
                first.status()
            )));
        }

        let long = settings.long_policy().with_progress(progress);
        let compiled = self.await_compilation(&poll, &long, &chat_history_id).await?;
        debug!(%chat_history_id, status = %compiled.status(), "compilation finished");

        let answer = self
            .call(&settings.fetch_request(&chat_history_id, question), &long)
            .await?;

        Ok(ChainOutcome {
            chat_history_id,
            compiled,
            answer,
        })
    }

    /// One call that compiles and executes.
    pub async fn run_direct(
        &self,
        settings: &QuerySettings,
        question: &Question,
    ) -> Result<RemoteQueryResponse, QueryError> {
        self.call(&settings.compile_request(question, true), &settings.short_policy())
            .await
    }

    /// Whether the service accepts the configured API key.
    pub async fn is_authorized(&self, policy: &RetryPolicy) -> Result<bool, QueryError> {
        match self
            .call_value(&RemoteQueryRequest::new(Endpoint::IsAuth), policy)
            .await
        {
            Ok(_) => Ok(true),
            Err(QueryError::Unauthorized { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Database connections registered for the API key, as returned by the service.
    pub async fn list_connections(
        &self,
        policy: &RetryPolicy,
    ) -> Result<serde_json::Value, QueryError> {
        self.call_value(&RemoteQueryRequest::new(Endpoint::ListConnections), policy)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(classify(200), StatusClass::Success);
        assert_eq!(classify(204), StatusClass::Success);
        assert_eq!(classify(401), StatusClass::Unauthorized);
        assert_eq!(classify(403), StatusClass::Unauthorized);
        assert_eq!(classify(404), StatusClass::Client);
        assert_eq!(classify(429), StatusClass::Client);
        assert_eq!(classify(302), StatusClass::Client);
        assert_eq!(classify(500), StatusClass::Transient);
        assert_eq!(classify(503), StatusClass::Transient);
    }
}
