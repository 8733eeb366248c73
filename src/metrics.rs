//! Episode statistics aggregated across parallel sessions.

use std::collections::{HashMap, VecDeque};

/// Moving average over a fixed window.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f32>,
    window: usize,
    sum: f32,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(window),
            window,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.window
            && let Some(oldest) = self.values.pop_front()
        {
            self.sum -= oldest;
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lifetime statistics for one actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorStats {
    pub episodes: usize,
    pub total_reward: f32,
    pub total_steps: u64,
    pub best_inventory: u32,
}

/// Aggregate episode statistics for a pool of actors.
#[derive(Debug)]
pub struct EpisodeMetrics {
    reward_window: MovingAverage,
    length_window: MovingAverage,
    episodes: usize,
    total_reward: f32,
    natural_terminals: usize,
    per_actor: HashMap<u32, ActorStats>,
}

impl EpisodeMetrics {
    pub fn new(window: usize) -> Self {
        Self {
            reward_window: MovingAverage::new(window),
            length_window: MovingAverage::new(window),
            episodes: 0,
            total_reward: 0.0,
            natural_terminals: 0,
            per_actor: HashMap::new(),
        }
    }

    /// Record one finished episode. `terminated` distinguishes a natural
    /// terminal from a step-cap truncation.
    pub fn record_episode(
        &mut self,
        actor_id: u32,
        reward: f32,
        steps: u32,
        best_inventory: u32,
        terminated: bool,
    ) {
        self.episodes += 1;
        self.total_reward += reward;
        self.reward_window.push(reward);
        self.length_window.push(steps as f32);
        if terminated {
            self.natural_terminals += 1;
        }

        let stats = self.per_actor.entry(actor_id).or_default();
        stats.episodes += 1;
        stats.total_reward += reward;
        stats.total_steps += u64::from(steps);
        if best_inventory > stats.best_inventory {
            stats.best_inventory = best_inventory;
        }
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Windowed average episode reward.
    pub fn avg_reward(&self) -> f32 {
        self.reward_window.average()
    }

    /// Windowed average episode length in steps.
    pub fn avg_steps(&self) -> f32 {
        self.length_window.average()
    }

    /// Fraction of episodes that ended on a natural terminal rather than the
    /// step cap.
    pub fn termination_rate(&self) -> f32 {
        if self.episodes > 0 {
            self.natural_terminals as f32 / self.episodes as f32
        } else {
            0.0
        }
    }

    pub fn actor_stats(&self, actor_id: u32) -> Option<&ActorStats> {
        self.per_actor.get(&actor_id)
    }

    /// Print a summary of everything recorded so far.
    pub fn print_summary(&self) {
        tracing::info!("=== Episode Summary ===");
        tracing::info!("Episodes: {}", self.episodes);
        tracing::info!("Total Reward: {:.2}", self.total_reward);
        tracing::info!("Avg Reward: {:.2}", self.avg_reward());
        tracing::info!("Avg Steps: {:.1}", self.avg_steps());
        tracing::info!("Natural Terminals: {:.1}%", self.termination_rate() * 100.0);

        let mut actors: Vec<_> = self.per_actor.keys().copied().collect();
        actors.sort_unstable();
        for actor_id in actors {
            let stats = &self.per_actor[&actor_id];
            let avg_reward = if stats.episodes > 0 {
                stats.total_reward / stats.episodes as f32
            } else {
                0.0
            };
            tracing::info!(
                "  Actor {}: {} episodes, avg_reward={:.2}, best_inventory={}",
                actor_id,
                stats.episodes,
                avg_reward,
                stats.best_inventory
            );
        }
    }
}

impl Default for EpisodeMetrics {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_window() {
        let mut average = MovingAverage::new(3);

        average.push(1.0);
        assert!((average.average() - 1.0).abs() < 1e-6);

        average.push(2.0);
        average.push(3.0);
        assert!((average.average() - 2.0).abs() < 1e-6);

        // Window slides: the 1.0 drops out.
        average.push(4.0);
        assert!((average.average() - 3.0).abs() < 1e-6);
        assert_eq!(average.len(), 3);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let metrics = EpisodeMetrics::default();
        assert_eq!(metrics.episodes(), 0);
        assert_eq!(metrics.avg_reward(), 0.0);
        assert_eq!(metrics.termination_rate(), 0.0);
    }

    #[test]
    fn test_record_episode_aggregates() {
        let mut metrics = EpisodeMetrics::new(10);

        metrics.record_episode(0, 10.0, 50, 8, true);
        metrics.record_episode(1, 5.0, 100, 3, false);

        assert_eq!(metrics.episodes(), 2);
        assert!((metrics.avg_reward() - 7.5).abs() < 1e-6);
        assert!((metrics.avg_steps() - 75.0).abs() < 1e-6);
        assert!((metrics.termination_rate() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_per_actor_stats_track_best_inventory() {
        let mut metrics = EpisodeMetrics::new(10);

        metrics.record_episode(2, 1.0, 10, 4, false);
        metrics.record_episode(2, 2.0, 20, 9, true);
        metrics.record_episode(2, 3.0, 30, 6, true);

        let stats = metrics.actor_stats(2).unwrap();
        assert_eq!(stats.episodes, 3);
        assert_eq!(stats.total_steps, 60);
        assert_eq!(stats.best_inventory, 9);
        assert!(metrics.actor_stats(7).is_none());
    }
}
