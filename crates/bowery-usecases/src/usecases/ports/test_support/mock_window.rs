//! Window host that records every call.

use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::domain::View;
use crate::usecases::ports::WindowHost;
use crate::usecases::ports::WindowId;
use crate::usecases::ports::WindowKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Open(WindowId, WindowKind),
    Navigate(WindowId, String),
    SetTitle(WindowId, String),
    PinTitle(WindowId),
    Canceled(WindowId),
    Destroy(WindowId),
    OpenExternal(String),
}

#[derive(Default)]
pub struct MockWindowHost {
    next_id: AtomicU64,
    calls: Mutex<Vec<WindowCall>>,
}

impl MockWindowHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<WindowId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                WindowCall::Open(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<WindowId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                WindowCall::Destroy(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Location of the last page loaded into `window`.
    pub fn location(&self, window: WindowId) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            WindowCall::Navigate(id, location) if id == window => Some(location),
            _ => None,
        })
    }

    pub fn title(&self, window: WindowId) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            WindowCall::SetTitle(id, title) if id == window => Some(title),
            _ => None,
        })
    }

    fn record(&self, call: WindowCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl WindowHost for MockWindowHost {
    fn open_window(&self, kind: WindowKind) -> WindowId {
        let id = WindowId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(WindowCall::Open(id, kind));
        id
    }

    fn navigate(&self, window: WindowId, view: &View) {
        self.record(WindowCall::Navigate(window, view.location()));
    }

    fn set_title(&self, window: WindowId, title: &str) {
        self.record(WindowCall::SetTitle(window, title.to_string()));
    }

    fn pin_title(&self, window: WindowId) {
        self.record(WindowCall::PinTitle(window));
    }

    fn notify_canceled(&self, window: WindowId) {
        self.record(WindowCall::Canceled(window));
    }

    fn destroy(&self, window: WindowId) {
        self.record(WindowCall::Destroy(window));
    }

    fn open_external(&self, url: &str) {
        self.record(WindowCall::OpenExternal(url.to_string()));
    }
}
