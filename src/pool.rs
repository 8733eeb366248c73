//! Pool of independent actor sessions with batched fan-out operations.
//!
//! Each session owns its own channel to its own endpoint, so sessions never
//! share state and a failure in one cannot leak into a sibling. The batched
//! operations fan out onto separate tasks and join all of them before
//! returning: a batched step is only complete when every session has finished
//! its own step, reconnect retries included.

use tokio::task::JoinSet;

use crate::bridge::Bridge;
use crate::config::PoolConfig;
use crate::encoder::Observation;
use crate::observer::{LoggingObserver, SessionObserver};
use crate::recorder::TranscriptRecorder;
use crate::session::{ActorSession, EpisodeInfo, SessionError, StepOutcome};
use crate::transport::{Connector, TcpConnector};

pub struct SessionPool<C: Connector> {
    sessions: Vec<ActorSession<C>>,
}

impl SessionPool<TcpConnector> {
    /// Build one session per actor, each with its own channel to
    /// `host:(base_port + actor index)` and a default logging observer.
    pub fn connect(config: &PoolConfig) -> Self {
        Self::connect_with(config, |_| Box::new(LoggingObserver))
    }

    /// Like [`connect`](Self::connect), with an observer per actor.
    pub fn connect_with(
        config: &PoolConfig,
        mut make_observer: impl FnMut(u32) -> Box<dyn SessionObserver>,
    ) -> Self {
        let mut sessions = Vec::with_capacity(config.num_actors);

        for index in 0..config.num_actors {
            let actor_id = index as u32;
            let connector = TcpConnector::new(
                &config.host,
                config.base_port + index as u16,
                config.bridge.request_timeout,
            );
            tracing::info!(actor = actor_id, address = connector.address(), "session configured");

            let mut bridge = Bridge::new(actor_id, connector, &config.bridge);
            if let Some(dir) = &config.transcript_dir {
                match TranscriptRecorder::create(dir, actor_id) {
                    Ok(recorder) => bridge = bridge.with_recorder(recorder),
                    Err(err) => {
                        tracing::warn!(
                            actor = actor_id,
                            error = %err,
                            "transcript recording disabled"
                        );
                    }
                }
            }

            sessions.push(ActorSession::new(
                bridge,
                config.max_steps,
                make_observer(actor_id),
            ));
        }

        Self { sessions }
    }
}

impl<C> SessionPool<C>
where
    C: Connector + 'static,
    C::Channel: 'static,
{
    /// Wrap already-built sessions, keeping their order as actor order.
    pub fn from_sessions(sessions: Vec<ActorSession<C>>) -> Self {
        Self { sessions }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[ActorSession<C>] {
        &self.sessions
    }

    /// Reset every session concurrently; waits for all of them.
    pub async fn reset_all(&mut self) -> Result<Vec<(Observation, EpisodeInfo)>, SessionError> {
        let mut tasks = JoinSet::new();
        for (index, mut session) in self.sessions.drain(..).enumerate() {
            tasks.spawn(async move {
                let result = session.reset().await;
                (index, session, result)
            });
        }
        self.join_batch(tasks).await
    }

    /// Step every session with its own action, concurrently; waits for all.
    ///
    /// `actions[i]` goes to the session at index `i`.
    pub async fn step_all(&mut self, actions: &[usize]) -> Result<Vec<StepOutcome>, SessionError> {
        if actions.len() != self.sessions.len() {
            return Err(SessionError::BatchMismatch {
                expected: self.sessions.len(),
                actual: actions.len(),
            });
        }

        let mut tasks = JoinSet::new();
        for (index, mut session) in self.sessions.drain(..).enumerate() {
            let action = actions[index];
            tasks.spawn(async move {
                let result = session.step(action).await;
                (index, session, result)
            });
        }
        self.join_batch(tasks).await
    }

    /// Close every session. Individual failures are swallowed inside each
    /// bridge, so closing the pool is unconditional.
    pub async fn close_all(&mut self) {
        let mut tasks = JoinSet::new();
        for (index, mut session) in self.sessions.drain(..).enumerate() {
            tasks.spawn(async move {
                session.close().await;
                (index, session)
            });
        }

        let mut slots: Vec<Option<ActorSession<C>>> =
            std::iter::repeat_with(|| None).take(tasks.len()).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, session) = joined.expect("actor session task panicked");
            slots[index] = Some(session);
        }
        self.sessions = slots.into_iter().flatten().collect();
    }

    /// Collect a batch back in session order, restoring session ownership.
    async fn join_batch<T>(
        &mut self,
        mut tasks: JoinSet<(usize, ActorSession<C>, Result<T, SessionError>)>,
    ) -> Result<Vec<T>, SessionError>
    where
        T: Send + 'static,
    {
        let count = tasks.len();
        let mut slots: Vec<Option<ActorSession<C>>> =
            std::iter::repeat_with(|| None).take(count).collect();
        let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
        let mut first_error = None;

        while let Some(joined) = tasks.join_next().await {
            let (index, session, result) = joined.expect("actor session task panicked");
            slots[index] = Some(session);
            match result {
                Ok(value) => results[index] = Some(value),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        self.sessions = slots.into_iter().flatten().collect();

        match first_error {
            None => Ok(results.into_iter().flatten().collect()),
            Some(err) => Err(err),
        }
    }
}
