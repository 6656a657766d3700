//! Test-only mocks for use case ports.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod mock_channel;
mod mock_misc;
mod mock_prompter;
mod mock_remote;
mod mock_window;

pub use mock_channel::MockEventChannel;
pub use mock_channel::MockSubscription;
pub use mock_misc::MockClipboard;
pub use mock_misc::MockClock;
pub use mock_misc::MockHealthProbe;
pub use mock_misc::MockSleeper;
pub use mock_prompter::MockPrompter;
pub use mock_remote::MockRemoteApi;
pub use mock_remote::RemoteCall;
pub use mock_window::MockWindowHost;
pub use mock_window::WindowCall;
