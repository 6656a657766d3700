//! Adapters for the daemon's HTTP and WebSocket surfaces, the pub/sub service and
//! the local process.

pub mod config;
pub mod daemon;
pub mod pusher;
pub mod remote;
pub mod sleeper;
pub mod sync_stream;
pub mod system_clock;
mod ws;

pub use config::ClientConfig;
pub use daemon::DaemonHandle;
pub use daemon::DaemonStatus;
pub use daemon::MarkerFiles;
pub use daemon::OsProcessController;
pub use daemon::ProcessController;
pub use daemon::SignalHandler;
pub use daemon::StopOutcome;
pub use daemon::Supervisor;
pub use daemon::SupervisorError;
pub use pusher::ChannelSink;
pub use pusher::PusherChannel;
pub use remote::HttpRemoteClient;
pub use sleeper::RealSleeper;
pub use sync_stream::SyncSink;
pub use sync_stream::SyncStream;
pub use system_clock::SystemClock;
