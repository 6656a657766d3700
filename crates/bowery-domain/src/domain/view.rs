//! Pages a session window can show.

use std::fmt;

use url::form_urlencoded;

use crate::domain::container::ConnectionInfo;
use crate::domain::container::ContainerId;

/// What a progress page is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Launching,
    Saving,
    Exporting,
}

impl ProgressKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressKind::Launching => "launching",
            ProgressKind::Saving => "saving",
            ProgressKind::Exporting => "exporting",
        }
    }
}

pub const INFO_SSH_PORT: u16 = 23;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Progress {
        kind: ProgressKind,
        container_id: ContainerId,
    },
    Terminal(ConnectionInfo),
    Info {
        project_id: String,
        connection: ConnectionInfo,
    },
}

impl View {
    pub fn page(&self) -> &'static str {
        match self {
            View::Progress { .. } => "progress.html",
            View::Terminal(_) => "term.html",
            View::Info { .. } => "info.html",
        }
    }

    /// Query string passed to the page, in the order the pages read it.
    pub fn query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        match self {
            View::Progress { kind, container_id } => {
                query.append_pair("type", kind.as_str());
                query.append_pair("container_id", container_id.as_str());
            }
            View::Terminal(info) => {
                query.append_pair("ip", &info.address);
                query.append_pair("user", &info.user);
                query.append_pair("password", &info.password);
            }
            View::Info {
                project_id,
                connection,
            } => {
                query.append_pair("project_id", project_id);
                query.append_pair("address", &connection.address);
                query.append_pair("ssh_port", &INFO_SSH_PORT.to_string());
                query.append_pair("username", &connection.user);
                query.append_pair("password", &connection.password);
            }
        }
        query.finish()
    }

    pub fn location(&self) -> String {
        format!("{}?{}", self.page(), self.query())
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, View::Progress { .. })
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}
