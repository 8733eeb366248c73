//! Per-actor episode state machine and observation pipeline.
//!
//! An [`ActorSession`] binds one bridge to one stable actor id and drives the
//! episode protocol on top of it: reset, repeated steps, terminal. All bridge
//! failures have already been degraded to fallback values by the time they
//! reach a session, so the only errors surfaced here are caller contract
//! violations.

use std::error::Error;
use std::fmt;

use crate::bridge::Bridge;
use crate::encoder::{self, Observation};
use crate::observer::{ProgressRecord, SessionObserver};
use crate::protocol::{ACTION_COUNT, Action, RemoteState};
use crate::transport::Connector;

/// Episode lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Terminated,
    Closed,
}

/// Caller contract violations. Never retried or absorbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Action index outside `0..ACTION_COUNT`.
    InvalidAction(usize),
    /// `step` called while no episode is running; call `reset` first.
    NotRunning(SessionState),
    /// The session was closed; no further calls are valid.
    Closed,
    /// Batched call with the wrong number of actions for the pool.
    BatchMismatch { expected: usize, actual: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionError::InvalidAction(index) => {
                write!(
                    formatter,
                    "action index {} out of range (valid: 0..{})",
                    index, ACTION_COUNT
                )
            }
            SessionError::NotRunning(state) => {
                write!(formatter, "step called in state {:?}, reset first", state)
            }
            SessionError::Closed => write!(formatter, "session is closed"),
            SessionError::BatchMismatch { expected, actual } => {
                write!(
                    formatter,
                    "batch of {} actions for {} sessions",
                    actual, expected
                )
            }
        }
    }
}

impl Error for SessionError {}

/// Per-episode mutable counters, zeroed on every reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeState {
    /// Steps taken in the current episode.
    pub steps: u32,
    /// Cumulative reward over the current episode.
    pub episode_reward: f32,
    /// Largest inventory count observed this episode.
    pub best_inventory: u32,
}

/// Metadata side-channel handed to the training loop on every step/reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeInfo {
    pub actor_id: u32,
    pub steps: u32,
    /// Inventory count in the state this info was derived from.
    pub inventory: u32,
    pub episode_reward: f32,
    pub best_inventory: u32,
}

/// Result of one environment step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f32,
    /// The actor or environment itself signaled completion.
    pub terminated: bool,
    /// The episode hit the configured step cap.
    pub truncated: bool,
    pub info: EpisodeInfo,
}

/// One bridge bound to one actor id, plus the episode state machine.
pub struct ActorSession<C: Connector> {
    bridge: Bridge<C>,
    actor_id: u32,
    max_steps: u32,
    state: SessionState,
    episode: EpisodeState,
    last_inventory: u32,
    observer: Box<dyn SessionObserver>,
}

impl<C: Connector> ActorSession<C> {
    pub fn new(bridge: Bridge<C>, max_steps: u32, observer: Box<dyn SessionObserver>) -> Self {
        let actor_id = bridge.actor_id();
        Self {
            bridge,
            actor_id,
            max_steps,
            state: SessionState::Idle,
            episode: EpisodeState::default(),
            last_inventory: 0,
            observer,
        }
    }

    pub fn actor_id(&self) -> u32 {
        self.actor_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn episode(&self) -> EpisodeState {
        self.episode
    }

    /// Start a fresh episode. Valid from any state except `Closed`; resetting
    /// a running session abandons its episode.
    pub async fn reset(&mut self) -> Result<(Observation, EpisodeInfo), SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed);
        }

        let state = self.bridge.reset_episode().await;

        self.episode = EpisodeState {
            steps: 0,
            episode_reward: 0.0,
            best_inventory: state.inventory,
        };
        self.last_inventory = state.inventory;
        self.state = SessionState::Running;

        let observation = encoder::encode_state(&state);
        let info = self.info(&state);
        self.observer.on_episode_start(self.actor_id, &info);

        Ok((observation, info))
    }

    /// Apply one action and advance the episode.
    ///
    /// The action index must be in `0..ACTION_COUNT`; anything else is a
    /// contract violation surfaced immediately, with no bridge traffic.
    pub async fn step(&mut self, action_index: usize) -> Result<StepOutcome, SessionError> {
        match self.state {
            SessionState::Running => {}
            SessionState::Closed => return Err(SessionError::Closed),
            other => return Err(SessionError::NotRunning(other)),
        }

        let action =
            Action::from_index(action_index).ok_or(SessionError::InvalidAction(action_index))?;

        let result = self.bridge.apply_action(action).await;

        self.episode.steps += 1;
        self.episode.episode_reward += result.reward;

        let inventory = result.next_state.inventory;
        let inventory_delta = inventory as i32 - self.last_inventory as i32;
        self.last_inventory = inventory;
        if inventory > self.episode.best_inventory {
            self.episode.best_inventory = inventory;
        }

        let terminated = result.terminal;
        let truncated = self.episode.steps >= self.max_steps;
        if terminated || truncated {
            self.state = SessionState::Terminated;
        }

        let observation = encoder::encode_state(&result.next_state);
        let info = self.info(&result.next_state);

        self.observer.on_step(&ProgressRecord {
            actor_id: self.actor_id,
            step: self.episode.steps,
            reward: result.reward,
            inventory_delta,
        });
        if terminated || truncated {
            self.observer.on_episode_end(self.actor_id, &info, terminated);
        }

        Ok(StepOutcome {
            observation,
            reward: result.reward,
            terminated,
            truncated,
            info,
        })
    }

    /// Close the session. Valid from any state, idempotent, never fails.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.bridge.close().await;
        self.state = SessionState::Closed;
        self.observer.on_close(self.actor_id);
    }

    fn info(&self, state: &RemoteState) -> EpisodeInfo {
        EpisodeInfo {
            actor_id: self.actor_id,
            steps: self.episode.steps,
            inventory: state.inventory,
            episode_reward: self.episode.episode_reward,
            best_inventory: self.episode.best_inventory,
        }
    }
}
