//! Port interfaces owned by use cases.

pub mod clipboard;
pub mod clock;
pub mod errors;
pub mod event_channel;
pub mod health_probe;
pub mod prompter;
pub mod remote_api;
pub mod sleeper;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod window;

pub use clipboard::Clipboard;
pub use clock::Clock;
pub use errors::ChannelError;
pub use errors::RemoteError;
pub use errors::TerminalError;
pub use event_channel::EventChannel;
pub use event_channel::Subscription;
pub use health_probe::HealthProbe;
pub use prompter::CloseChoice;
pub use prompter::Notice;
pub use prompter::Prompter;
pub use remote_api::RemoteApi;
pub use sleeper::Sleeper;
pub use window::WindowHost;
pub use window::WindowId;
pub use window::WindowKind;
