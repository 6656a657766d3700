use super::errors::RemoteError;

/// One readiness check against the daemon. `Ok` only for HTTP 200.
pub trait HealthProbe: Send + Sync {
    fn probe(&self) -> Result<(), RemoteError>;
}
