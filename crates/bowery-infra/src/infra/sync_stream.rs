//! Reader for the daemon's `/_/ws` sync status stream.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;
use tungstenite::Message;
use tungstenite::WebSocket;
use url::Url;

use crate::domain::SyncFrame;
use crate::infra::ws::connect_ws;
use crate::infra::ws::is_timeout;
use crate::usecases::ports::ChannelError;

const READ_POLL: Duration = Duration::from_millis(250);

pub type SyncSink = Arc<dyn Fn(SyncFrame) + Send + Sync>;

/// Decodes one text frame. Frames that are not sync updates yield `None`.
pub fn decode_sync_frame(text: &str) -> Option<SyncFrame> {
    match serde_json::from_str::<SyncFrame>(text) {
        Ok(frame) => Some(frame),
        Err(err) => {
            debug!(error = %err, "Skipping non-sync frame");
            None
        }
    }
}

/// Owns the reader thread. The stream ends when the daemon closes it; there is
/// no reconnect.
pub struct SyncStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SyncStream {
    pub fn connect(url: &Url, sink: SyncSink) -> Result<Self, ChannelError> {
        let socket = connect_ws(url, READ_POLL)?;
        info!(url = %url, "Connected to sync stream");
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("sync-reader".to_string())
            .spawn(move || read_frames(socket, &thread_stop, &sink))
            .map_err(|err| ChannelError::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(Err(_)) = self.handle.take().map(thread::JoinHandle::join) {
            warn!("Sync reader panicked");
        }
    }
}

impl Drop for SyncStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_frames(mut socket: WebSocket<TcpStream>, stop: &AtomicBool, sink: &SyncSink) {
    while !stop.load(Ordering::SeqCst) {
        match socket.read() {
            Ok(Message::Text(text)) => {
                if let Some(frame) = decode_sync_frame(&text) {
                    sink(frame);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Sync stream closed by daemon");
                return;
            }
            Ok(_) => {}
            Err(err) if is_timeout(&err) => {}
            Err(err) => {
                warn!(error = %err, "Sync stream read failed");
                return;
            }
        }
    }
    let _ = socket.close(None);
    let _ = socket.flush();
}
