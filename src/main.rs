use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dotenv::dotenv;
use rand::Rng;
use timberbot::protocol::ACTION_COUNT;
use timberbot::{
    CompositeObserver, EpisodeMetrics, LoggingObserver, MetricsObserver, PoolConfig, SessionPool,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn get_env_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("timberbot=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn config_from_env() -> PoolConfig {
    let mut config = PoolConfig::default();

    if let Ok(host) = env::var("TIMBERBOT_HOST") {
        config.host = host;
    }
    if let Some(base_port) = get_env_var("TIMBERBOT_BASE_PORT") {
        config.base_port = base_port;
    }
    if let Some(num_actors) = get_env_var("TIMBERBOT_ACTORS") {
        config.num_actors = num_actors;
    }
    if let Some(max_steps) = get_env_var("TIMBERBOT_MAX_STEPS") {
        config.max_steps = max_steps;
    }
    if let Some(timeout_ms) = get_env_var::<u64>("TIMBERBOT_TIMEOUT_MS") {
        config.bridge.request_timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(retry_budget) = get_env_var("TIMBERBOT_RETRIES") {
        config.bridge.retry_budget = retry_budget;
    }
    if let Ok(dir) = env::var("TIMBERBOT_TRANSCRIPTS") {
        config.transcript_dir = Some(PathBuf::from(dir));
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let config = config_from_env();
    let episodes: usize = get_env_var("TIMBERBOT_EPISODES").unwrap_or(10);

    tracing::info!(
        actors = config.num_actors,
        host = %config.host,
        base_port = config.base_port,
        max_steps = config.max_steps,
        episodes,
        "starting control loop"
    );

    let metrics = Arc::new(Mutex::new(EpisodeMetrics::default()));
    let shared = Arc::clone(&metrics);
    let mut pool = SessionPool::connect_with(&config, move |_| {
        Box::new(CompositeObserver::new(vec![
            Box::new(LoggingObserver),
            Box::new(MetricsObserver::new(Arc::clone(&shared))),
        ]))
    });

    // Random-policy driver: the real training loop plugs in through the same
    // reset/step/close surface.
    let mut rng = rand::rng();
    for episode in 0..episodes {
        tracing::info!(episode, "resetting all actors");
        pool.reset_all().await?;

        loop {
            let actions: Vec<usize> = (0..pool.len())
                .map(|_| rng.random_range(0..ACTION_COUNT))
                .collect();
            let outcomes = pool.step_all(&actions).await?;

            if outcomes
                .iter()
                .any(|outcome| outcome.terminated || outcome.truncated)
            {
                break;
            }
        }
    }

    pool.close_all().await;

    if let Ok(metrics) = metrics.lock() {
        metrics.print_summary();
    }

    Ok(())
}
