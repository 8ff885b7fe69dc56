use crate::api::types::{RunEventType, RunId, TestRunEvent};
use crate::route::Route;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message shown over the current screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub title: String,
    pub message: String,
    /// Set for run events; `open` deep-links to this run.
    pub run_id: Option<RunId>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub fn event_title(event: &TestRunEvent) -> &'static str {
    match event.event_type {
        RunEventType::NewRun => "New Test Run",
        RunEventType::Update => "Run Updated",
    }
}

pub fn event_message(event: &TestRunEvent) -> String {
    format!(
        "{} · Run #{} · {} Failures · {}",
        event.project_name, event.run_id, event.fail_count, event.status
    )
}

/// Holds live notifications, newest last.
#[derive(Debug)]
pub struct NotificationCenter {
    items: Vec<Notification>,
    ttl: Duration,
    next_id: u64,
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            ttl,
            next_id: 1,
        }
    }

    fn insert(
        &mut self,
        level: Level,
        title: String,
        message: String,
        run_id: Option<RunId>,
        now: DateTime<Utc>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Notification {
            id,
            level,
            title,
            message,
            run_id,
            expires_at: now + self.ttl,
        });
        id
    }

    pub fn push(
        &mut self,
        level: Level,
        title: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u64 {
        self.insert(level, title.into(), message.into(), None, now)
    }

    pub fn push_event(&mut self, event: &TestRunEvent, now: DateTime<Utc>) -> u64 {
        let level = if event.status.is_healthy() {
            Level::Success
        } else {
            Level::Warning
        };
        self.insert(
            level,
            event_title(event).to_string(),
            event_message(event),
            Some(event.run_id),
            now,
        )
    }

    /// Drop expired notifications. Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|n| !n.is_expired(now));
        before - self.items.len()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        before != self.items.len()
    }

    /// "View Details": route to the run and dismiss the notification.
    pub fn open(&mut self, id: u64) -> Option<Route> {
        let run_id = self.items.iter().find(|n| n.id == id)?.run_id?;
        self.dismiss(id);
        Some(Route::RunDetails(run_id))
    }

    /// Newest notification carrying a run link.
    pub fn latest_run(&self) -> Option<&Notification> {
        self.items.iter().rev().find(|n| n.run_id.is_some())
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.last()
    }

    pub fn active(&self) -> &[Notification] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
