//! Containers, views, menus and the push messages that drive them.

pub mod channel;
pub mod container;
pub mod menu;
pub mod sync;
pub mod terminal_state;
pub mod view;

pub use channel::ChannelEvent;
pub use channel::ChannelMessage;
pub use channel::channel_name;
pub use channel::container_id_from_channel;
pub use container::ConnectionInfo;
pub use container::Container;
pub use container::ContainerId;
pub use container::ContainerIdError;
pub use container::EnvExport;
pub use container::ExportFormat;
pub use menu::Menu;
pub use menu::MenuCommand;
pub use menu::MenuItem;
pub use menu::MenuItemId;
pub use menu::MenuProperty;
pub use menu::FILE_MENU;
pub use menu::SESSION_COMMANDS;
pub use sync::SyncApplication;
pub use sync::SyncFrame;
pub use sync::SyncStatus;
pub use terminal_state::TerminalState;
pub use view::ProgressKind;
pub use view::View;
