//! Flaky test tracking with optimistic acknowledgement and status updates.
//!
//! An update is applied locally first ([`FlakyBoard::begin_toggle_ack`],
//! [`FlakyBoard::begin_set_status`]), sent to the backend, then settled with
//! the outcome. A failed update restores exactly the field it changed.

use super::{matches_query, or_sample, Loaded, PageContext};
use crate::api::types::*;
use crate::api::ApiClient;
use crate::error::{QaHubError, Result};
use crate::realtime::Level;
use crate::sample::{self, DataSource};
use std::fmt;
use std::str::FromStr;

pub const EMPTY_MESSAGE: &str = "No flaky tests found matching your criteria";

/// Default score cut-off: every test with any disagreement is listed.
pub const DEFAULT_THRESHOLD: f64 = 0.0;

pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(QaHubError::Validation(format!(
            "Flaky threshold must be between 0.0 and 1.0, got {}",
            threshold
        )))
    }
}

pub async fn load(ctx: &PageContext, threshold: f64) -> Result<Loaded<Vec<FlakyTest>>> {
    let threshold = validate_threshold(threshold)?;
    let result = match ctx.require_project() {
        Ok(project) => ctx
            .api
            .flaky_tests(ctx.days, threshold, project)
            .await
            .map(|r| r.tests),
        Err(e) => Err(e),
    };
    or_sample(result, ctx.sample_fallback, "flaky tests", sample::flaky_tests)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn from_score(score: f64) -> Severity {
        if score >= 0.4 {
            Severity::High
        } else if score >= 0.2 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A flaky test with every optional field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedFlakyTest {
    pub id: String,
    pub test_name: String,
    pub class_name: String,
    pub flakiness_score: f64,
    pub pass_count: u32,
    pub fail_count: u32,
    pub acknowledged: bool,
    pub resolution_status: ResolutionStatus,
    pub assignee: Option<String>,
}

impl ManagedFlakyTest {
    fn from_wire(index: usize, test: FlakyTest) -> Self {
        Self {
            id: test.id.unwrap_or_else(|| format!("flaky-{}", index)),
            test_name: test.test_name,
            class_name: test.class_name,
            flakiness_score: test.flakiness_score,
            pass_count: test.pass_count,
            fail_count: test.fail_count,
            acknowledged: test.acknowledged.unwrap_or(false),
            resolution_status: test.resolution_status.unwrap_or_default(),
            assignee: test.assignee,
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::from_score(self.flakiness_score)
    }

    /// Score as a whole percentage, e.g. "45%".
    pub fn score_label(&self) -> String {
        format!("{:.0}%", self.flakiness_score * 100.0)
    }

    fn update_request(&self) -> FlakyStatusUpdate {
        FlakyStatusUpdate {
            class_name: self.class_name.clone(),
            test_name: self.test_name.clone(),
            acknowledged: self.acknowledged,
            resolution_status: self.resolution_status,
            assignee: self.assignee.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckFilter {
    #[default]
    All,
    Acknowledged,
    Unacknowledged,
}

impl AckFilter {
    pub fn accepts(self, acknowledged: bool) -> bool {
        match self {
            AckFilter::All => true,
            AckFilter::Acknowledged => acknowledged,
            AckFilter::Unacknowledged => !acknowledged,
        }
    }

    pub fn next(self) -> AckFilter {
        match self {
            AckFilter::All => AckFilter::Acknowledged,
            AckFilter::Acknowledged => AckFilter::Unacknowledged,
            AckFilter::Unacknowledged => AckFilter::All,
        }
    }
}

impl fmt::Display for AckFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AckFilter::All => "all",
            AckFilter::Acknowledged => "acknowledged",
            AckFilter::Unacknowledged => "unacknowledged",
        })
    }
}

impl FromStr for AckFilter {
    type Err = QaHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(AckFilter::All),
            "acknowledged" | "ack" | "yes" => Ok(AckFilter::Acknowledged),
            "unacknowledged" | "unack" | "no" => Ok(AckFilter::Unacknowledged),
            _ => Err(QaHubError::Validation(format!(
                "Invalid acknowledged filter '{}'. Choose one of: all, acknowledged, unacknowledged",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlakyFilters {
    pub query: String,
    /// `None` means every status.
    pub status: Option<ResolutionStatus>,
    pub acknowledged: AckFilter,
}

impl FlakyFilters {
    pub fn accepts(&self, test: &ManagedFlakyTest) -> bool {
        matches_query(&self.query, &[&test.test_name, &test.class_name])
            && self.status.is_none_or(|s| s == test.resolution_status)
            && self.acknowledged.accepts(test.acknowledged)
    }

    /// Cycle the status filter: all → unresolved → … → resolved → all.
    pub fn cycle_status(&mut self) {
        self.status = match self.status {
            None => Some(ResolutionStatus::Unresolved),
            Some(ResolutionStatus::Resolved) => None,
            Some(s) => Some(s.next()),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlakyStats {
    pub total: usize,
    pub acknowledged: usize,
    pub resolved: usize,
    /// In progress plus investigating.
    pub in_progress: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Acknowledgement,
    Resolution,
}

/// An update already applied locally, awaiting the backend's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub id: String,
    /// Project of the board the update was made on.
    pub project: Option<ProjectId>,
    pub kind: UpdateKind,
    pub request: FlakyStatusUpdate,
    previous_ack: bool,
    previous_status: ResolutionStatus,
}

/// A toast to show after settling an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: Level,
    pub message: String,
}

impl Toast {
    pub fn settled(pending: &PendingUpdate, outcome: &Result<()>) -> Toast {
        if outcome.is_ok() {
            let message = match pending.kind {
                UpdateKind::Acknowledgement if pending.request.acknowledged => {
                    "Test acknowledged".to_string()
                }
                UpdateKind::Acknowledgement => "Test unacknowledged".to_string(),
                UpdateKind::Resolution => format!(
                    "Status updated to {}",
                    pending.request.resolution_status.label()
                ),
            };
            return Toast {
                level: Level::Success,
                message,
            };
        }
        let message = match pending.kind {
            UpdateKind::Acknowledgement => "Failed to update acknowledgement status",
            UpdateKind::Resolution => "Failed to update resolution status",
        };
        Toast {
            level: Level::Error,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlakyBoard {
    tests: Vec<ManagedFlakyTest>,
    source: DataSource,
    project: Option<ProjectId>,
}

impl FlakyBoard {
    pub fn new(loaded: Loaded<Vec<FlakyTest>>) -> Self {
        Self {
            tests: loaded
                .data
                .into_iter()
                .enumerate()
                .map(|(i, t)| ManagedFlakyTest::from_wire(i, t))
                .collect(),
            source: loaded.source,
            project: None,
        }
    }

    /// Tag the board with the project its tests were loaded for.
    pub fn for_project(mut self, project: Option<ProjectId>) -> Self {
        self.project = project;
        self
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn project(&self) -> Option<ProjectId> {
        self.project
    }

    pub fn tests(&self) -> &[ManagedFlakyTest] {
        &self.tests
    }

    pub fn get(&self, id: &str) -> Option<&ManagedFlakyTest> {
        self.tests.iter().find(|t| t.id == id)
    }

    /// Look a test up by id, `Class.test`, or bare test name.
    pub fn find(&self, key: &str) -> Option<&ManagedFlakyTest> {
        let key = key.trim();
        self.get(key).or_else(|| {
            self.tests.iter().find(|t| {
                t.test_name == key || format!("{}.{}", t.class_name, t.test_name) == key
            })
        })
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ManagedFlakyTest> {
        self.tests.iter_mut().find(|t| t.id == id)
    }

    /// The test a pending update was made on, if this board still holds it.
    fn target_mut(&mut self, pending: &PendingUpdate) -> Option<&mut ManagedFlakyTest> {
        if pending.project != self.project {
            return None;
        }
        let request = &pending.request;
        self.tests
            .iter_mut()
            .find(|t| t.class_name == request.class_name && t.test_name == request.test_name)
    }

    pub fn filtered(&self, filters: &FlakyFilters) -> Vec<&ManagedFlakyTest> {
        self.tests.iter().filter(|t| filters.accepts(t)).collect()
    }

    pub fn stats(&self) -> FlakyStats {
        let mut stats = FlakyStats {
            total: self.tests.len(),
            ..FlakyStats::default()
        };
        for test in &self.tests {
            if test.acknowledged {
                stats.acknowledged += 1;
            }
            match test.resolution_status {
                ResolutionStatus::Resolved => stats.resolved += 1,
                ResolutionStatus::InProgress | ResolutionStatus::Investigating => {
                    stats.in_progress += 1
                }
                ResolutionStatus::Unresolved => {}
            }
        }
        stats
    }

    /// Flip acknowledgement locally. `None` if the id is unknown.
    pub fn begin_toggle_ack(&mut self, id: &str) -> Option<PendingUpdate> {
        let project = self.project;
        let test = self.get_mut(id)?;
        let previous_ack = test.acknowledged;
        let previous_status = test.resolution_status;
        test.acknowledged = !previous_ack;
        Some(PendingUpdate {
            id: id.to_string(),
            project,
            kind: UpdateKind::Acknowledgement,
            request: test.update_request(),
            previous_ack,
            previous_status,
        })
    }

    /// Change resolution status locally. `None` if the id is unknown.
    pub fn begin_set_status(&mut self, id: &str, status: ResolutionStatus) -> Option<PendingUpdate> {
        let project = self.project;
        let test = self.get_mut(id)?;
        let previous_ack = test.acknowledged;
        let previous_status = test.resolution_status;
        test.resolution_status = status;
        Some(PendingUpdate {
            id: id.to_string(),
            project,
            kind: UpdateKind::Resolution,
            request: test.update_request(),
            previous_ack,
            previous_status,
        })
    }

    /// Keep the local change on success, revert it on failure.
    ///
    /// The revert touches only the same test on the same project's board;
    /// a board reloaded for another project is left alone.
    pub fn settle(&mut self, pending: &PendingUpdate, outcome: &Result<()>) -> Toast {
        if outcome.is_err() {
            if let Some(test) = self.target_mut(pending) {
                match pending.kind {
                    UpdateKind::Acknowledgement => test.acknowledged = pending.previous_ack,
                    UpdateKind::Resolution => test.resolution_status = pending.previous_status,
                }
            }
        }
        Toast::settled(pending, outcome)
    }
}

/// Send a pending update to the backend.
pub async fn commit(api: &ApiClient, pending: &PendingUpdate) -> Result<()> {
    api.update_flaky_status(&pending.request).await
}
