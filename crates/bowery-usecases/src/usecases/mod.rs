//! Session lifecycle, daemon readiness and sync status use cases.

pub mod health;
pub mod manager;
pub mod ports;
pub mod sync_status;
pub mod terminal;

pub use health::HealthOutcome;
pub use health::HealthPolicy;
pub use health::await_healthy;
pub use manager::TerminalManager;
pub use manager::WindowEvent;
pub use sync_status::SyncIcon;
pub use sync_status::SyncStatusPresenter;
pub use terminal::Lifecycle;
pub use terminal::SessionContext;
pub use terminal::Terminal;
