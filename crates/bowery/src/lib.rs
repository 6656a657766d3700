#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Application composition and command handling crate.

pub mod app;
pub use app::*;

pub mod common {
    pub use bowery_common::common::*;
}

pub mod domain {
    pub use bowery_domain::domain::*;
}

pub mod usecases {
    pub use bowery_usecases::usecases::*;
}

pub mod infra {
    pub use bowery_infra::infra::*;
}
