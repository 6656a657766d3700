//! Pusher (protocol 7) client backing the per-container event channels.
//!
//! One worker thread owns the socket. `subscribe` connects on first use so that
//! an unreachable service surfaces as an error to the caller; later drops are
//! retried by the worker, which re-subscribes every live channel.

use std::collections::BTreeSet;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;
use tungstenite::Message;
use tungstenite::WebSocket;
use url::Url;

use crate::common::mutex_lock_or_recover;
use crate::domain::ChannelEvent;
use crate::domain::ChannelMessage;
use crate::domain::ContainerId;
use crate::domain::channel_name;
use crate::domain::container_id_from_channel;
use crate::infra::ws::connect_ws;
use crate::infra::ws::is_timeout;
use crate::usecases::ports::ChannelError;
use crate::usecases::ports::EventChannel;
use crate::usecases::ports::Subscription;

const READ_POLL: Duration = Duration::from_millis(200);
const RECONNECT_BASE: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Receives every decoded channel event. Runs on the worker thread.
pub type ChannelSink = Arc<dyn Fn(ChannelMessage) + Send + Sync>;

#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: Value,
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PusherFrame {
    ConnectionEstablished { socket_id: Option<String> },
    Ping,
    Error { code: Option<i64>, message: String },
    SubscriptionSucceeded(String),
    Event(ChannelMessage),
    Ignored(String),
}

/// `data` may arrive JSON-encoded as a string.
fn decode_data(data: Value) -> Value {
    match data {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}

pub fn decode_frame(text: &str) -> Result<PusherFrame, ChannelError> {
    let raw: RawFrame = serde_json::from_str(text)
        .map_err(|err| ChannelError::Protocol(format!("invalid frame: {err}")))?;
    let frame = match raw.event.as_str() {
        "pusher:connection_established" => {
            let data = decode_data(raw.data);
            PusherFrame::ConnectionEstablished {
                socket_id: data
                    .get("socket_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        }
        "pusher:ping" => PusherFrame::Ping,
        "pusher:error" => {
            let data = decode_data(raw.data);
            PusherFrame::Error {
                code: data.get("code").and_then(Value::as_i64),
                message: data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        }
        "pusher_internal:subscription_succeeded" => {
            PusherFrame::SubscriptionSucceeded(raw.channel.unwrap_or_default())
        }
        name => {
            let Some(container_id) = raw.channel.as_deref().and_then(container_id_from_channel)
            else {
                return Ok(PusherFrame::Ignored(name.to_string()));
            };
            match ChannelEvent::from_wire(name, raw.data)
                .map_err(|err| ChannelError::Protocol(format!("{name}: {err}")))?
            {
                Some(event) => PusherFrame::Event(ChannelMessage {
                    container_id,
                    event,
                }),
                None => PusherFrame::Ignored(name.to_string()),
            }
        }
    };
    Ok(frame)
}

fn control_frame(event: &str, data: Value) -> Message {
    Message::Text(json!({ "event": event, "data": data }).to_string())
}

fn subscribe_frame(channel: &str) -> Message {
    control_frame("pusher:subscribe", json!({ "channel": channel }))
}

fn unsubscribe_frame(channel: &str) -> Message {
    control_frame("pusher:unsubscribe", json!({ "channel": channel }))
}

#[derive(Debug)]
enum Command {
    Subscribe(String),
    Unsubscribe(String),
}

struct Shared {
    url: Url,
    sink: ChannelSink,
    channels: Mutex<BTreeSet<String>>,
    commands: Sender<Command>,
    stop: AtomicBool,
}

impl Shared {
    fn unsubscribe(&self, channel: &str) {
        if mutex_lock_or_recover(&self.channels).remove(channel) {
            let _ = self.commands.send(Command::Unsubscribe(channel.to_string()));
        }
    }
}

pub struct PusherChannel {
    shared: Arc<Shared>,
    receiver: Receiver<Command>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl std::fmt::Debug for PusherChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PusherChannel")
            .field("url", &self.shared.url.as_str())
            .finish()
    }
}

impl PusherChannel {
    pub fn new(url: Url, sink: ChannelSink) -> Self {
        let (commands, receiver) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared {
                url,
                sink,
                channels: Mutex::new(BTreeSet::new()),
                commands,
                stop: AtomicBool::new(false),
            }),
            receiver,
            worker: Mutex::new(None),
        }
    }

    fn ensure_worker(&self) -> Result<(), ChannelError> {
        let mut worker = mutex_lock_or_recover(&self.worker);
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }
        let socket = connect_ws(&self.shared.url, READ_POLL)?;
        info!(url = %self.shared.url, "Connected to event channel");
        let shared = Arc::clone(&self.shared);
        let receiver = self.receiver.clone();
        let handle = thread::Builder::new()
            .name("pusher-reader".to_string())
            .spawn(move || run_worker(socket, &shared, &receiver))
            .map_err(|err| ChannelError::Connect {
                url: self.shared.url.to_string(),
                reason: err.to_string(),
            })?;
        *worker = Some(handle);
        Ok(())
    }

    pub fn channels(&self) -> Vec<String> {
        mutex_lock_or_recover(&self.shared.channels)
            .iter()
            .cloned()
            .collect()
    }

    /// Stops the worker and waits for it.
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        let handle = mutex_lock_or_recover(&self.worker).take();
        if let Some(Err(_)) = handle.map(thread::JoinHandle::join) {
            warn!("Event channel worker panicked");
        }
    }
}

impl Drop for PusherChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EventChannel for PusherChannel {
    fn subscribe(
        &self,
        container_id: &ContainerId,
    ) -> Result<Box<dyn Subscription>, ChannelError> {
        self.ensure_worker()?;
        let channel = channel_name(container_id);
        mutex_lock_or_recover(&self.shared.channels).insert(channel.clone());
        self.shared
            .commands
            .send(Command::Subscribe(channel.clone()))
            .map_err(|_| ChannelError::Closed)?;
        debug!(channel = %channel, "Subscribed");
        Ok(Box::new(PusherSubscription {
            channel,
            shared: Arc::clone(&self.shared),
            active: true,
        }))
    }
}

pub struct PusherSubscription {
    channel: String,
    shared: Arc<Shared>,
    active: bool,
}

impl Subscription for PusherSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.shared.unsubscribe(&self.channel);
        debug!(channel = %self.channel, "Unsubscribed");
    }
}

impl Drop for PusherSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

enum ReadOutcome {
    Continue,
    Reconnect,
}

fn run_worker(mut socket: WebSocket<TcpStream>, shared: &Shared, commands: &Receiver<Command>) {
    let mut backoff = RECONNECT_BASE;
    loop {
        if shared.stop.load(Ordering::SeqCst) {
            let _ = socket.close(None);
            let _ = socket.flush();
            debug!("Event channel worker stopped");
            return;
        }

        let mut outcome = ReadOutcome::Continue;
        while let Ok(command) = commands.try_recv() {
            let frame = match &command {
                Command::Subscribe(channel) => subscribe_frame(channel),
                Command::Unsubscribe(channel) => unsubscribe_frame(channel),
            };
            if let Err(err) = socket.send(frame) {
                warn!(error = %err, ?command, "Failed to send channel command");
                outcome = ReadOutcome::Reconnect;
                break;
            }
        }

        if matches!(outcome, ReadOutcome::Continue) {
            outcome = match socket.read() {
                Ok(Message::Text(text)) => handle_text(&mut socket, shared, &text),
                Ok(Message::Close(frame)) => {
                    info!(?frame, "Event channel closed by server");
                    ReadOutcome::Reconnect
                }
                Ok(_) => ReadOutcome::Continue,
                Err(err) if is_timeout(&err) => ReadOutcome::Continue,
                Err(err) => {
                    warn!(error = %err, "Event channel read failed");
                    ReadOutcome::Reconnect
                }
            };
        }

        if matches!(outcome, ReadOutcome::Reconnect) {
            match reconnect(shared, &mut backoff) {
                Some(fresh) => socket = fresh,
                None => return,
            }
        }
    }
}

fn handle_text(socket: &mut WebSocket<TcpStream>, shared: &Shared, text: &str) -> ReadOutcome {
    match decode_frame(text) {
        Ok(PusherFrame::Event(message)) => {
            debug!(
                container_id = %message.container_id,
                event = message.event.name(),
                "Channel event"
            );
            (shared.sink)(message);
        }
        Ok(PusherFrame::Ping) => {
            if let Err(err) = socket.send(control_frame("pusher:pong", json!({}))) {
                warn!(error = %err, "Failed to answer ping");
                return ReadOutcome::Reconnect;
            }
        }
        Ok(PusherFrame::ConnectionEstablished { socket_id }) => {
            debug!(?socket_id, "Event channel ready");
        }
        Ok(PusherFrame::SubscriptionSucceeded(channel)) => {
            debug!(channel = %channel, "Subscription confirmed");
        }
        Ok(PusherFrame::Error { code, message }) => {
            warn!(?code, message = %message, "Event channel error");
        }
        Ok(PusherFrame::Ignored(event)) => debug!(event = %event, "Ignored channel frame"),
        Err(err) => warn!(error = %err, "Undecodable channel frame"),
    }
    ReadOutcome::Continue
}

/// Reconnects with exponential backoff until it succeeds or the channel stops.
fn reconnect(shared: &Shared, backoff: &mut Duration) -> Option<WebSocket<TcpStream>> {
    loop {
        if !sleep_unless_stopped(shared, *backoff) {
            return None;
        }
        match connect_ws(&shared.url, READ_POLL) {
            Ok(mut socket) => {
                *backoff = RECONNECT_BASE;
                let channels: Vec<String> =
                    mutex_lock_or_recover(&shared.channels).iter().cloned().collect();
                for channel in &channels {
                    if let Err(err) = socket.send(subscribe_frame(channel)) {
                        warn!(error = %err, channel = %channel, "Re-subscribe failed");
                    }
                }
                info!(channels = channels.len(), "Event channel reconnected");
                return Some(socket);
            }
            Err(err) => {
                warn!(error = %err, retry_in_ms = backoff.as_millis() as u64, "Event channel reconnect failed");
                *backoff = (*backoff * 2).min(RECONNECT_MAX);
            }
        }
    }
}

fn sleep_unless_stopped(shared: &Shared, total: Duration) -> bool {
    let step = Duration::from_millis(50);
    let mut waited = Duration::ZERO;
    while waited < total {
        if shared.stop.load(Ordering::SeqCst) {
            return false;
        }
        thread::sleep(step);
        waited += step;
    }
    !shared.stop.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_decode_created_event_with_encoded_data() {
        let text = r#"{"event":"created","channel":"container-c1","data":"{\"_id\":\"c1\",\"address\":\"10.0.0.5\"}"}"#;

        let frame = decode_frame(text).unwrap();

        match frame {
            PusherFrame::Event(message) => {
                assert_eq!(message.container_id.as_str(), "c1");
                assert!(matches!(message.event, ChannelEvent::Created(ref c) if c.address() == Some("10.0.0.5")));
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_decode_housekeeping_frames() {
        assert_eq!(
            decode_frame(r#"{"event":"pusher:ping","data":{}}"#).unwrap(),
            PusherFrame::Ping
        );
        assert_eq!(
            decode_frame(
                r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"1.2\",\"activity_timeout\":120}"}"#
            )
            .unwrap(),
            PusherFrame::ConnectionEstablished {
                socket_id: Some("1.2".into())
            }
        );
        assert_eq!(
            decode_frame(r#"{"event":"pusher:error","data":{"code":4001,"message":"App key not in this cluster"}}"#)
                .unwrap(),
            PusherFrame::Error {
                code: Some(4001),
                message: "App key not in this cluster".into()
            }
        );
    }

    #[test]
    fn test_events_on_foreign_channels_are_ignored() {
        let frame = decode_frame(r#"{"event":"created","channel":"presence-x","data":"{}"}"#).unwrap();

        assert_eq!(frame, PusherFrame::Ignored("created".into()));
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        assert!(matches!(
            decode_frame("not json"),
            Err(ChannelError::Protocol(_))
        ));
    }

    #[test]
    fn test_subscribe_fails_when_service_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("ws://{}/app/key", listener.local_addr().unwrap())).unwrap();
        drop(listener);
        let channel = PusherChannel::new(url, Arc::new(|_| {}));

        let result = channel.subscribe(&ContainerId::try_new("c1").unwrap());

        assert!(matches!(result, Err(ChannelError::Connect { .. })));
    }

    #[test]
    fn test_subscribe_and_deliver_event() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("ws://{}/app/key", listener.local_addr().unwrap())).unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Text(
                r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"1.1\"}"}"#
                    .to_string(),
            ))
            .unwrap();
            let subscribe = loop {
                if let Message::Text(text) = ws.read().unwrap() {
                    break text;
                }
            };
            ws.send(Message::Text(
                r#"{"event":"saved","channel":"container-c1","data":"{}"}"#.to_string(),
            ))
            .unwrap();
            let unsubscribe = loop {
                if let Message::Text(text) = ws.read().unwrap() {
                    break text;
                }
            };
            (subscribe, unsubscribe)
        });

        let (tx, rx) = crossbeam_channel::unbounded();
        let channel = PusherChannel::new(url, Arc::new(move |message| {
            let _ = tx.send(message);
        }));
        let mut subscription = channel
            .subscribe(&ContainerId::try_new("c1").unwrap())
            .unwrap();
        assert_eq!(subscription.channel(), "container-c1");

        let message = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(message.container_id.as_str(), "c1");
        assert_eq!(message.event.name(), "saved");

        subscription.unsubscribe();
        subscription.unsubscribe();
        let (subscribe, unsubscribe) = server.join().unwrap();
        let subscribe: Value = serde_json::from_str(&subscribe).unwrap();
        let unsubscribe: Value = serde_json::from_str(&unsubscribe).unwrap();
        assert_eq!(subscribe["event"], "pusher:subscribe");
        assert_eq!(subscribe["data"]["channel"], "container-c1");
        assert_eq!(unsubscribe["event"], "pusher:unsubscribe");
        assert!(channel.channels().is_empty());
    }
}
