//! Injected collaborators that consume per-session progress records.
//!
//! Sessions never log through a module-global; everything an external
//! collaborator might want (training dashboards, metrics, plain logs) flows
//! through a [`SessionObserver`] handed to the session at construction.

use std::sync::{Arc, Mutex};

use crate::metrics::EpisodeMetrics;
use crate::session::EpisodeInfo;

/// One step's pass-through progress record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    pub actor_id: u32,
    /// Step index within the current episode, starting at 1.
    pub step: u32,
    pub reward: f32,
    /// Inventory change relative to the previous observation.
    pub inventory_delta: i32,
}

/// Trait for observing session events during an episode.
pub trait SessionObserver: Send {
    /// Called after a successful reset, before the first step.
    fn on_episode_start(&mut self, actor_id: u32, info: &EpisodeInfo);

    /// Called on every step.
    fn on_step(&mut self, record: &ProgressRecord);

    /// Called when an episode ends, naturally or by truncation.
    fn on_episode_end(&mut self, actor_id: u32, info: &EpisodeInfo, terminated: bool);

    /// Called once when the session closes.
    fn on_close(&mut self, actor_id: u32);
}

/// Default observer: structured log records tagged with the actor id.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn on_episode_start(&mut self, actor_id: u32, info: &EpisodeInfo) {
        tracing::info!(actor = actor_id, inventory = info.inventory, "episode started");
    }

    fn on_step(&mut self, record: &ProgressRecord) {
        tracing::debug!(
            actor = record.actor_id,
            step = record.step,
            reward = record.reward,
            inventory_delta = record.inventory_delta,
            "step"
        );
    }

    fn on_episode_end(&mut self, actor_id: u32, info: &EpisodeInfo, terminated: bool) {
        tracing::info!(
            actor = actor_id,
            steps = info.steps,
            reward = info.episode_reward,
            best_inventory = info.best_inventory,
            terminated,
            "episode finished"
        );
    }

    fn on_close(&mut self, actor_id: u32) {
        tracing::info!(actor = actor_id, "session closed");
    }
}

/// Feeds episode results into a metrics aggregate shared across sessions.
pub struct MetricsObserver {
    metrics: Arc<Mutex<EpisodeMetrics>>,
}

impl MetricsObserver {
    pub fn new(metrics: Arc<Mutex<EpisodeMetrics>>) -> Self {
        Self { metrics }
    }
}

impl SessionObserver for MetricsObserver {
    fn on_episode_start(&mut self, _actor_id: u32, _info: &EpisodeInfo) {}

    fn on_step(&mut self, _record: &ProgressRecord) {}

    fn on_episode_end(&mut self, actor_id: u32, info: &EpisodeInfo, terminated: bool) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record_episode(
                actor_id,
                info.episode_reward,
                info.steps,
                info.best_inventory,
                terminated,
            );
        }
    }

    fn on_close(&mut self, _actor_id: u32) {}
}

/// Fans events out to several observers.
pub struct CompositeObserver {
    observers: Vec<Box<dyn SessionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn SessionObserver>>) -> Self {
        Self { observers }
    }

    pub fn push(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }
}

impl SessionObserver for CompositeObserver {
    fn on_episode_start(&mut self, actor_id: u32, info: &EpisodeInfo) {
        for observer in &mut self.observers {
            observer.on_episode_start(actor_id, info);
        }
    }

    fn on_step(&mut self, record: &ProgressRecord) {
        for observer in &mut self.observers {
            observer.on_step(record);
        }
    }

    fn on_episode_end(&mut self, actor_id: u32, info: &EpisodeInfo, terminated: bool) {
        for observer in &mut self.observers {
            observer.on_episode_end(actor_id, info, terminated);
        }
    }

    fn on_close(&mut self, actor_id: u32) {
        for observer in &mut self.observers {
            observer.on_close(actor_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_observer_records_episode_end() {
        let metrics = Arc::new(Mutex::new(EpisodeMetrics::default()));
        let mut observer = MetricsObserver::new(Arc::clone(&metrics));

        let info = EpisodeInfo {
            actor_id: 1,
            steps: 42,
            inventory: 5,
            episode_reward: 3.5,
            best_inventory: 6,
        };
        observer.on_episode_end(1, &info, true);

        let metrics = metrics.lock().unwrap();
        assert_eq!(metrics.episodes(), 1);
        assert!((metrics.avg_reward() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_composite_forwards_to_all() {
        let first = Arc::new(Mutex::new(EpisodeMetrics::default()));
        let second = Arc::new(Mutex::new(EpisodeMetrics::default()));
        let mut composite = CompositeObserver::new(vec![
            Box::new(MetricsObserver::new(Arc::clone(&first))),
            Box::new(MetricsObserver::new(Arc::clone(&second))),
        ]);

        let info = EpisodeInfo {
            actor_id: 0,
            steps: 10,
            inventory: 2,
            episode_reward: 1.0,
            best_inventory: 2,
        };
        composite.on_episode_end(0, &info, false);

        assert_eq!(first.lock().unwrap().episodes(), 1);
        assert_eq!(second.lock().unwrap().episodes(), 1);
    }
}
