//! Request/response bridge with retry, reconnect, and degrade-to-default.
//!
//! The bridge turns three domain calls (query state, apply action, reset
//! episode) into wire exchanges and absorbs every transient transport
//! failure. Callers never observe a transport error: once the retry budget is
//! spent, each operation returns its documented fallback value instead.

use std::error::Error;
use std::fmt;
use std::io;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::BridgeConfig;
use crate::protocol::{Action, RemoteState, Request, Response, Status};
use crate::recorder::TranscriptRecorder;
use crate::transport::{Connector, Transport};

/// Failure modes absorbed by the bridge's retry policy.
///
/// None of these escape a bridge operation; they exist so the policy can
/// distinguish what went wrong and so tests can assert on it.
#[derive(Debug)]
pub enum BridgeError {
    /// No reply arrived within the configured duration.
    Timeout,
    /// Connection-level fault while connecting, sending, or receiving.
    Transport(io::Error),
    /// A reply arrived but was unusable: error status or malformed payload.
    Protocol(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BridgeError::Timeout => write!(formatter, "timed out waiting for reply"),
            BridgeError::Transport(err) => write!(formatter, "transport fault: {}", err),
            BridgeError::Protocol(message) => write!(formatter, "protocol fault: {}", message),
        }
    }
}

impl Error for BridgeError {}

impl From<io::Error> for BridgeError {
    fn from(err: io::Error) -> Self {
        BridgeError::Transport(err)
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Protocol(err.to_string())
    }
}

/// Outcome of one "apply action" exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub reward: f32,
    pub next_state: RemoteState,
    pub terminal: bool,
}

/// Request/response abstraction over one exclusively-owned channel.
///
/// The channel is rebuilt from the connector after every failed attempt: a
/// timed-out request may still get a late reply, and a rebuilt connection is
/// the only way to guarantee that reply is never read.
pub struct Bridge<C: Connector> {
    actor_id: u32,
    connector: C,
    channel: Option<C::Channel>,
    retry_budget: usize,
    backoff: Duration,
    recorder: Option<TranscriptRecorder>,
}

impl<C: Connector> Bridge<C> {
    pub fn new(actor_id: u32, connector: C, config: &BridgeConfig) -> Self {
        Self {
            actor_id,
            connector,
            channel: None,
            retry_budget: config.retry_budget.max(1),
            backoff: config.backoff,
            recorder: None,
        }
    }

    /// Attach a wire transcript recorder.
    pub fn with_recorder(mut self, recorder: TranscriptRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn actor_id(&self) -> u32 {
        self.actor_id
    }

    /// Ask the remote actor for its current state.
    ///
    /// Degrades to [`RemoteState::default`] once the retry budget is spent; a
    /// state query never fails from the caller's point of view.
    pub async fn query_state(&mut self) -> RemoteState {
        match self.request(&Request::GetState, decode_state).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    actor = self.actor_id,
                    error = %err,
                    "state query failed, using safe default state"
                );
                RemoteState::default()
            }
        }
    }

    /// Execute one action on the remote actor.
    ///
    /// A failed exchange forces episode termination: the fallback carries
    /// reward -1.0, `terminal = true`, and a best-effort current state, so a
    /// control loop can never spin forever against a dead channel.
    pub async fn apply_action(&mut self, action: Action) -> StepResult {
        let request = Request::TakeAction {
            action: action.index() as u32,
        };
        match self.request(&request, decode_step).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    actor = self.actor_id,
                    action = ?action,
                    error = %err,
                    "action exchange failed, forcing terminal step"
                );
                StepResult {
                    reward: -1.0,
                    next_state: self.query_state().await,
                    terminal: true,
                }
            }
        }
    }

    /// Start a fresh episode on the remote actor.
    ///
    /// When the reset exchange fails, the bridge falls back to a state query,
    /// which itself degrades to the safe default state.
    pub async fn reset_episode(&mut self) -> RemoteState {
        match self.request(&Request::Reset, decode_state).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    actor = self.actor_id,
                    error = %err,
                    "reset failed, falling back to a state query"
                );
                self.query_state().await
            }
        }
    }

    /// Notify the remote side and tear the channel down.
    ///
    /// The close notify is fire-and-forget: the acknowledgment is never
    /// awaited, and every failure on the way out is swallowed. Idempotent;
    /// with no live channel there is nothing to notify.
    pub async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.send(&Request::Close).await.ok();
            channel.close().await;
            tracing::debug!(actor = self.actor_id, "bridge closed");
        }
    }

    /// Run one exchange under the retry/reconnect policy.
    ///
    /// Up to `retry_budget` attempts. Any failure discards the channel; before
    /// the next attempt the bridge sleeps the fixed backoff and reconnects.
    async fn request<T>(
        &mut self,
        request: &Request,
        decode: fn(Response) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let mut last_error = BridgeError::Timeout;

        for attempt in 1..=self.retry_budget {
            match self.attempt(request).await {
                Ok(response) => match checked(response).and_then(decode) {
                    Ok(value) => return Ok(value),
                    Err(err) => last_error = err,
                },
                Err(err) => last_error = err,
            }

            tracing::warn!(
                actor = self.actor_id,
                attempt,
                budget = self.retry_budget,
                error = %last_error,
                "exchange attempt failed"
            );

            // Never reuse a channel that saw a failed exchange; a late reply
            // for this request must not surface as the reply to the next one.
            self.teardown_channel().await;

            if attempt < self.retry_budget {
                sleep(self.backoff).await;
            }
        }

        Err(last_error)
    }

    /// One exchange on the current channel, connecting first if needed.
    async fn attempt(&mut self, request: &Request) -> Result<Response, BridgeError> {
        let channel = match self.channel.take() {
            Some(channel) => channel,
            None => {
                let channel = self.connector.connect().await?;
                tracing::debug!(actor = self.actor_id, "channel connected");
                channel
            }
        };
        let channel = self.channel.insert(channel);

        let response = channel.send_receive(request).await?;

        if let Some(recorder) = self.recorder.as_mut()
            && let Err(err) = recorder.record(request, &response)
        {
            tracing::debug!(actor = self.actor_id, error = %err, "transcript write failed");
        }

        Ok(response)
    }

    async fn teardown_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }
}

/// Reject error-status replies before payload decoding.
fn checked(response: Response) -> Result<Response, BridgeError> {
    match response.status {
        Status::Ok => Ok(response),
        Status::Error => Err(BridgeError::Protocol(
            response
                .message
                .unwrap_or_else(|| "remote actor reported an unspecified error".to_string()),
        )),
    }
}

fn decode_state(response: Response) -> Result<RemoteState, BridgeError> {
    response
        .state
        .ok_or_else(|| BridgeError::Protocol("reply is missing the state payload".to_string()))
}

fn decode_step(response: Response) -> Result<StepResult, BridgeError> {
    match (response.reward, response.next_state, response.done) {
        (Some(reward), Some(next_state), Some(done)) => Ok(StepResult {
            reward,
            next_state,
            terminal: done,
        }),
        _ => Err(BridgeError::Protocol(
            "step reply is missing reward, next_state, or done".to_string(),
        )),
    }
}
