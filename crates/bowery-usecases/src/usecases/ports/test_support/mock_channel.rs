//! In-memory event channel recording subscriptions.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::domain::ContainerId;
use crate::domain::channel_name;
use crate::usecases::ports::ChannelError;
use crate::usecases::ports::EventChannel;
use crate::usecases::ports::Subscription;

pub struct MockSubscription {
    channel: String,
    unsubscribed: Arc<AtomicBool>,
}

impl Subscription for MockSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn unsubscribe(&mut self) {
        self.unsubscribed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockEventChannel {
    error: Mutex<Option<ChannelError>>,
    subscriptions: Mutex<Vec<(String, Arc<AtomicBool>)>>,
}

impl MockEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: ChannelError) -> Self {
        Self {
            error: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    pub fn channels(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    pub fn is_unsubscribed(&self, channel: &str) -> bool {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .any(|(name, flag)| name == channel && flag.load(Ordering::SeqCst))
    }
}

impl EventChannel for MockEventChannel {
    fn subscribe(
        &self,
        container_id: &ContainerId,
    ) -> Result<Box<dyn Subscription>, ChannelError> {
        if let Some(err) = self.error.lock().unwrap().clone() {
            return Err(err);
        }
        let channel = channel_name(container_id);
        let unsubscribed = Arc::new(AtomicBool::new(false));
        self.subscriptions
            .lock()
            .unwrap()
            .push((channel.clone(), Arc::clone(&unsubscribed)));
        Ok(Box::new(MockSubscription {
            channel,
            unsubscribed,
        }))
    }
}
