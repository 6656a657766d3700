use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::warn;
use url::Url;

use super::envelope::parse_envelope;
use super::envelope::rejection;
use crate::domain::Container;
use crate::domain::ContainerId;
use crate::domain::EnvExport;
use crate::usecases::ports::HealthProbe;
use crate::usecases::ports::RemoteApi;
use crate::usecases::ports::RemoteError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Talks to the daemon's REST API. Calls are issued once, without retries.
#[derive(Clone)]
pub struct HttpRemoteClient {
    base: Url,
    agent: ureq::Agent,
    health_agent: ureq::Agent,
}

impl std::fmt::Debug for HttpRemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemoteClient")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl HttpRemoteClient {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url)
            .map_err(|err| RemoteError::Malformed(format!("invalid daemon URL {base_url}: {err}")))?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        let health_agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(HEALTH_TIMEOUT)
            .build();
        Ok(Self {
            base,
            agent,
            health_agent,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, segments: &[&str], query: Option<(&str, &str)>) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::Malformed(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    /// Issues one call and parses the JSON envelope.
    pub fn request(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let path = url.path().to_string();
        debug!(method = method.as_str(), path = %path, "Daemon request");

        let request = self
            .agent
            .request_url(method.as_str(), url)
            .set("Accept", "application/json");
        let result = match body {
            Some(body) => {
                let payload = serde_json::to_string(body)
                    .map_err(|err| RemoteError::Malformed(err.to_string()))?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
            None => request.call(),
        };

        match result {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|err| RemoteError::Malformed(err.to_string()))?;
                parse_envelope(&text)
            }
            Err(ureq::Error::Status(status, response)) => {
                let text = response.into_string().unwrap_or_default();
                if let Some(message) = serde_json::from_str::<Value>(&text)
                    .ok()
                    .as_ref()
                    .and_then(rejection)
                {
                    return Err(RemoteError::Rejected { message });
                }
                warn!(method = method.as_str(), path = %path, status, "Daemon returned error status");
                Err(RemoteError::Status {
                    method: method.as_str(),
                    path,
                    status,
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(RemoteError::Transport {
                url: url.to_string(),
                reason: transport.to_string(),
            }),
        }
    }

    fn call(&self, method: Method, segments: &[&str]) -> Result<Value, RemoteError> {
        let url = self.url(segments, None)?;
        self.request(method, &url, None)
    }
}

impl RemoteApi for HttpRemoteClient {
    fn create_container(
        &self,
        local_path: &Path,
        use_dockerfile: bool,
    ) -> Result<Container, RemoteError> {
        let query = use_dockerfile.then_some(("dockerfile", "true"));
        let url = self.url(&["containers"], query)?;
        let body = json!({ "localPath": local_path.to_string_lossy() });
        let reply = self.request(Method::Post, &url, Some(&body))?;
        let container = reply.get("container").cloned().unwrap_or(reply);
        serde_json::from_value(container)
            .map_err(|err| RemoteError::Malformed(format!("container: {err}")))
    }

    fn save_container(&self, id: &ContainerId) -> Result<(), RemoteError> {
        self.call(Method::Put, &["containers", id.as_str()])
            .map(|_| ())
    }

    fn delete_container(&self, id: &ContainerId) -> Result<(), RemoteError> {
        self.call(Method::Delete, &["containers", id.as_str()])
            .map(|_| ())
    }

    fn export_env(&self, address: &str) -> Result<EnvExport, RemoteError> {
        let reply = self.call(Method::Get, &["env", address])?;
        serde_json::from_value(reply).map_err(|err| RemoteError::Malformed(format!("env: {err}")))
    }

    fn pause_sync(&self) -> Result<(), RemoteError> {
        self.call(Method::Get, &["pause"]).map(|_| ())
    }

    fn resume_sync(&self) -> Result<(), RemoteError> {
        self.call(Method::Get, &["resume"]).map(|_| ())
    }
}

impl HealthProbe for HttpRemoteClient {
    fn probe(&self) -> Result<(), RemoteError> {
        let url = self.url(&["healthz"], None)?;
        match self.health_agent.request_url("GET", &url).call() {
            Ok(response) if response.status() == 200 => Ok(()),
            Ok(response) => Err(RemoteError::Status {
                method: "GET",
                path: url.path().to_string(),
                status: response.status(),
            }),
            Err(ureq::Error::Status(status, _)) => Err(RemoteError::Status {
                method: "GET",
                path: url.path().to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => Err(RemoteError::Transport {
                url: url.to_string(),
                reason: transport.to_string(),
            }),
        }
    }
}
