#![deny(clippy::all)]

mod color;
mod env;
mod sync;
pub mod telemetry;

pub use color::Colors;
pub use color::init as color_init;
pub use color::is_disabled as color_is_disabled;
pub use env::parse_env_bool;
pub use env::parse_env_u32;
pub use env::parse_env_u64;
pub use env::parse_env_u16;
pub use sync::mutex_lock_or_recover;
pub use sync::poison_recovery_count;
