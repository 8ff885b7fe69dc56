//! Guards against late responses overwriting newer state.
//!
//! Every request gets a [`FetchTicket`]. When the response arrives it is
//! applied only if its ticket is still the newest one for that kind of
//! data; anything older belongs to a project, range or route the user has
//! already left.

use crate::api::types::{ProjectId, RunId};
use std::collections::HashMap;

/// The independent data sources a screen can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Projects,
    Dashboard,
    Runs,
    RunDetails,
    Analysis,
    FlakyTests,
    Trends,
    ApiKeys,
}

/// Dependency snapshot a request was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scope {
    pub project: Option<ProjectId>,
    pub days: u32,
    pub run: Option<RunId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub kind: FetchKind,
    pub generation: u64,
    pub scope: Scope,
}

#[derive(Debug, Default)]
pub struct FetchTracker {
    next_generation: u64,
    latest: HashMap<FetchKind, FetchTicket>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding any outstanding one of the same kind.
    pub fn issue(&mut self, kind: FetchKind, scope: Scope) -> FetchTicket {
        self.next_generation += 1;
        let ticket = FetchTicket {
            kind,
            generation: self.next_generation,
            scope,
        };
        self.latest.insert(kind, ticket);
        ticket
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.latest.get(&ticket.kind) == Some(ticket)
    }

    /// Consume the ticket if current. A second completion with the same
    /// ticket is rejected.
    pub fn complete(&mut self, ticket: &FetchTicket) -> bool {
        if self.is_current(ticket) {
            self.latest.remove(&ticket.kind);
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self, kind: FetchKind) -> bool {
        self.latest.contains_key(&kind)
    }

    /// Drop all outstanding tickets; every in-flight response becomes stale.
    pub fn invalidate_all(&mut self) {
        self.latest.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(project: i64, days: u32) -> Scope {
        Scope {
            project: Some(project),
            days,
            run: None,
        }
    }

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut tracker = FetchTracker::new();
        let old = tracker.issue(FetchKind::Runs, scope(1, 30));
        let new = tracker.issue(FetchKind::Runs, scope(1, 7));

        assert!(!tracker.complete(&old));
        assert!(tracker.complete(&new));
        assert!(!tracker.is_pending(FetchKind::Runs));
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut tracker = FetchTracker::new();
        let runs = tracker.issue(FetchKind::Runs, scope(1, 30));
        let flaky = tracker.issue(FetchKind::FlakyTests, scope(1, 30));
        assert!(tracker.complete(&flaky));
        assert!(tracker.complete(&runs));
    }

    #[test]
    fn test_complete_is_one_shot() {
        let mut tracker = FetchTracker::new();
        let t = tracker.issue(FetchKind::Trends, scope(2, 90));
        assert!(tracker.complete(&t));
        assert!(!tracker.complete(&t));
    }

    #[test]
    fn test_invalidate_all_discards_in_flight() {
        let mut tracker = FetchTracker::new();
        let t = tracker.issue(FetchKind::Dashboard, scope(1, 30));
        tracker.invalidate_all();
        assert!(!tracker.is_current(&t));
    }
}
