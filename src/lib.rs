pub mod bridge;
pub mod config;
pub mod encoder;
pub mod metrics;
pub mod observer;
pub mod pool;
pub mod protocol;
pub mod recorder;
pub mod session;
pub mod transport;

// Re-export commonly used types for convenience
pub use bridge::{Bridge, BridgeError, StepResult};
pub use config::{BridgeConfig, PoolConfig};
pub use encoder::{OBSERVATION_DIM, Observation, encode_state};
pub use metrics::{EpisodeMetrics, MovingAverage};
pub use observer::{
    CompositeObserver, LoggingObserver, MetricsObserver, ProgressRecord, SessionObserver,
};
pub use pool::SessionPool;
pub use protocol::{ACTION_COUNT, Action, RemoteState, Request, Response};
pub use recorder::TranscriptRecorder;
pub use session::{ActorSession, EpisodeInfo, SessionError, SessionState, StepOutcome};
pub use transport::{Connector, TcpChannel, TcpConnector, Transport};
