//! Local daemon supervision: spawning, crash-recovery markers and signals.

pub mod markers;
pub mod process;
pub mod signal_handler;
pub mod supervisor;

pub use markers::MarkerFiles;
pub use process::OsProcessController;
pub use process::ProcessController;
pub use process::ProcessStatus;
pub use process::Signal;
pub use signal_handler::SignalHandler;
pub use supervisor::DaemonHandle;
pub use supervisor::DaemonStatus;
pub use supervisor::StopOutcome;
pub use supervisor::Supervisor;
pub use supervisor::SupervisorError;
