//! Live run events for the selected project.
//!
//! The listener only knows the [`Subscriber`] seam. [`broker::StompBroker`]
//! is the production implementation; tests plug in their own.

pub mod broker;
pub mod notification;
pub mod stomp;

use crate::api::types::{ProjectId, TestRunEvent};
use crate::error::Result;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub use broker::{BrokerSettings, StompBroker};
pub use notification::{Level, Notification, NotificationCenter};

/// What a subscription reports back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerSignal {
    /// The subscription is established on the broker.
    Subscribed,
    /// The connection dropped; the broker will retry on its own.
    Disconnected,
    /// A raw message body.
    Message(String),
}

pub type SignalHandler = Arc<dyn Fn(BrokerSignal) + Send + Sync>;

/// Handle to one live subscription. Unsubscribes when dropped.
pub struct Subscription {
    topic: String,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            topic: topic.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish()
    }
}

pub trait Subscriber: Send + Sync {
    fn subscribe(&self, topic: &str, handler: SignalHandler) -> Result<Subscription>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Subscribed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "offline",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Subscribed => "live",
        }
    }
}

pub fn topic_for(project: ProjectId) -> String {
    format!("/topic/project/{}/runs", project)
}

/// Keeps exactly one subscription alive: the one for the current project.
pub struct RealtimeListener<S: Subscriber> {
    subscriber: S,
    events: mpsc::UnboundedSender<TestRunEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    generation: Arc<AtomicU64>,
    active: Option<(ProjectId, Subscription)>,
}

impl<S: Subscriber> RealtimeListener<S> {
    pub fn new(subscriber: S, events: mpsc::UnboundedSender<TestRunEvent>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            subscriber,
            events,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn current_project(&self) -> Option<ProjectId> {
        self.active.as_ref().map(|(id, _)| *id)
    }

    /// Follow a project change. Same project is a no-op; the old
    /// subscription is always torn down before the new one is made.
    pub fn set_project(&mut self, project: Option<ProjectId>) -> Result<()> {
        if self.current_project() == project {
            return Ok(());
        }

        self.teardown();

        let Some(project) = project else {
            return Ok(());
        };

        let generation = self.generation.load(Ordering::SeqCst);
        let topic = topic_for(project);
        self.state.send_replace(ConnectionState::Connecting);
        info!(topic = %topic, "subscribing to run events");

        let handler = self.handler(generation);
        match self.subscriber.subscribe(&topic, handler) {
            Ok(subscription) => {
                self.active = Some((project, subscription));
                Ok(())
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "subscribe failed");
                self.state.send_replace(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    fn teardown(&mut self) {
        // Late signals from the old subscription no longer match.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some((project, subscription)) = self.active.take() {
            debug!(project, "unsubscribing from run events");
            subscription.unsubscribe();
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }

    fn handler(&self, generation: u64) -> SignalHandler {
        let events = self.events.clone();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        Arc::new(move |signal| {
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            match signal {
                BrokerSignal::Subscribed => {
                    state.send_replace(ConnectionState::Subscribed);
                }
                BrokerSignal::Disconnected => {
                    state.send_replace(ConnectionState::Connecting);
                }
                BrokerSignal::Message(body) => match parse_event(&body) {
                    Ok(event) => {
                        let _ = events.send(event);
                    }
                    Err(e) => warn!(error = %e, body = %body, "discarding malformed run event"),
                },
            }
        })
    }
}

impl<S: Subscriber> Drop for RealtimeListener<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub fn parse_event(body: &str) -> Result<TestRunEvent> {
    Ok(serde_json::from_str(body)?)
}
