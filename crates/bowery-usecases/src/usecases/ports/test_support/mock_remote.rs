//! Scripted daemon API for use case tests.

use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::Container;
use crate::domain::ContainerId;
use crate::domain::EnvExport;
use crate::usecases::ports::RemoteApi;
use crate::usecases::ports::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create {
        local_path: PathBuf,
        use_dockerfile: bool,
    },
    Save(String),
    Delete(String),
    Export(String),
    Pause,
    Resume,
}

#[derive(Default)]
pub struct MockRemoteApi {
    create_results: Mutex<VecDeque<Result<Container, RemoteError>>>,
    save_error: Mutex<Option<RemoteError>>,
    delete_error: Mutex<Option<RemoteError>>,
    export_result: Mutex<Option<Result<EnvExport, RemoteError>>>,
    sync_error: Mutex<Option<RemoteError>>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl MockRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MockRemoteApiBuilder {
        MockRemoteApiBuilder::default()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::Delete(_)))
            .count()
    }

    pub fn set_save_error(&self, error: Option<RemoteError>) {
        *self.save_error.lock().unwrap() = error;
    }

    pub fn set_delete_error(&self, error: Option<RemoteError>) {
        *self.delete_error.lock().unwrap() = error;
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteApi for MockRemoteApi {
    fn create_container(
        &self,
        local_path: &Path,
        use_dockerfile: bool,
    ) -> Result<Container, RemoteError> {
        self.record(RemoteCall::Create {
            local_path: local_path.to_path_buf(),
            use_dockerfile,
        });
        let mut script = self.create_results.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.unwrap_or_else(|| Err(RemoteError::Malformed("no create result scripted".into())))
    }

    fn save_container(&self, id: &ContainerId) -> Result<(), RemoteError> {
        self.record(RemoteCall::Save(id.to_string()));
        match self.save_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn delete_container(&self, id: &ContainerId) -> Result<(), RemoteError> {
        self.record(RemoteCall::Delete(id.to_string()));
        match self.delete_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn export_env(&self, address: &str) -> Result<EnvExport, RemoteError> {
        self.record(RemoteCall::Export(address.to_string()));
        self.export_result.lock().unwrap().clone().unwrap_or_else(|| {
            Ok(EnvExport {
                status: "failed".into(),
                ..EnvExport::default()
            })
        })
    }

    fn pause_sync(&self) -> Result<(), RemoteError> {
        self.record(RemoteCall::Pause);
        match self.sync_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn resume_sync(&self) -> Result<(), RemoteError> {
        self.record(RemoteCall::Resume);
        match self.sync_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MockRemoteApiBuilder {
    api: MockRemoteApi,
}

impl MockRemoteApiBuilder {
    /// `POST /containers` answers with a container carrying only `id`.
    pub fn with_created_id(self, id: &str) -> Self {
        self.with_created(Container {
            id: Some(ContainerId::try_new(id).unwrap()),
            ..Container::default()
        })
    }

    /// Queues a create reply. The last queued reply repeats.
    pub fn with_created(self, container: Container) -> Self {
        self.api.create_results.lock().unwrap().push_back(Ok(container));
        self
    }

    pub fn with_create_error(self, error: RemoteError) -> Self {
        self.api.create_results.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_save_error(self, error: RemoteError) -> Self {
        self.api.set_save_error(Some(error));
        self
    }

    pub fn with_delete_error(self, error: RemoteError) -> Self {
        self.api.set_delete_error(Some(error));
        self
    }

    pub fn with_export(self, export: EnvExport) -> Self {
        *self.api.export_result.lock().unwrap() = Some(Ok(export));
        self
    }

    pub fn with_export_error(self, error: RemoteError) -> Self {
        *self.api.export_result.lock().unwrap() = Some(Err(error));
        self
    }

    pub fn with_sync_error(self, error: RemoteError) -> Self {
        *self.api.sync_error.lock().unwrap() = Some(error);
        self
    }

    pub fn build(self) -> MockRemoteApi {
        self.api
    }
}
