//! HTTP client for the daemon's REST API.

mod envelope;
mod http_client;

pub use envelope::parse_envelope;
pub use http_client::HttpRemoteClient;
