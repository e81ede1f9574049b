// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Conversion job state machine and report.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::gateway::RemoteObjectId;
use crate::core::ConvertError;
use crate::io::WriteSummary;
use crate::schema::{Coercion, Violation};

/// Stage of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Detecting,
    Reading,
    Validating,
    Transforming,
    Writing,
    Publishing,
    Completed,
    Failed,
}

impl JobState {
    /// Lowercase state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Detecting => "detecting",
            JobState::Reading => "reading",
            JobState::Validating => "validating",
            JobState::Transforming => "transforming",
            JobState::Writing => "writing",
            JobState::Publishing => "publishing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Check if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Check if moving from `self` to `next` is a legal transition.
    ///
    /// `Pending → Reading` covers remote sources and explicitly named source
    /// formats. `Validating → Publishing` covers remote-only targets.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Pending, Detecting)
                | (Pending, Reading)
                | (Detecting, Reading)
                | (Reading, Validating)
                | (Validating, Transforming)
                | (Transforming, Validating)
                | (Validating, Writing)
                | (Validating, Publishing)
                | (Writing, Publishing)
                | (Writing, Completed)
                | (Publishing, Completed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a job's state history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChange {
    pub state: JobState,
    pub at: DateTime<Utc>,
}

/// Outcome of one conversion job.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// Job identifier
    pub job_id: Uuid,
    /// Final state, `Completed` or `Failed`
    pub state: JobState,
    /// Every state entered, in order, starting with `Pending`
    pub history: Vec<StateChange>,
    /// Detected or requested source format
    pub source_format: Option<String>,
    /// Target format, when writing locally
    pub target_format: Option<String>,
    /// Violations from the last validation pass (warnings on success)
    pub violations: Vec<Violation>,
    /// Widening coercions applied during validation
    pub coercions: Vec<Coercion>,
    /// Error that failed the job
    pub error: Option<ConvertError>,
    /// Local output summary
    pub output: Option<WriteSummary>,
    /// Uploaded object id
    pub remote_id: Option<RemoteObjectId>,
}

impl ConversionReport {
    /// Check if the job completed.
    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    /// Output path, when a local file was written.
    pub fn output_path(&self) -> Option<&PathBuf> {
        self.output.as_ref().map(|o| &o.path)
    }

    /// States entered, in order.
    pub fn states(&self) -> Vec<JobState> {
        self.history.iter().map(|c| c.state).collect()
    }

    /// Convert into a result carrying the failing error.
    pub fn into_result(self) -> std::result::Result<Self, ConvertError> {
        match self.error.clone() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// A running job: the report plus the transition guard.
#[derive(Debug)]
pub(crate) struct Job {
    report: ConversionReport,
}

impl Job {
    pub(crate) fn new() -> Self {
        Self {
            report: ConversionReport {
                job_id: Uuid::new_v4(),
                state: JobState::Pending,
                history: vec![StateChange {
                    state: JobState::Pending,
                    at: Utc::now(),
                }],
                source_format: None,
                target_format: None,
                violations: Vec::new(),
                coercions: Vec::new(),
                error: None,
                output: None,
                remote_id: None,
            },
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.report.job_id
    }

    pub(crate) fn state(&self) -> JobState {
        self.report.state
    }

    pub(crate) fn report_mut(&mut self) -> &mut ConversionReport {
        &mut self.report
    }

    /// Enter `next`. An illegal transition is a bug in the orchestrator.
    pub(crate) fn transition(&mut self, next: JobState) -> crate::core::Result<()> {
        let current = self.report.state;
        if !current.can_transition_to(next) {
            return Err(ConvertError::config(format!(
                "illegal job transition {current} -> {next}"
            )));
        }
        info!(
            job = %self.report.job_id,
            from = %current,
            to = %next,
            "Job state transition"
        );
        self.report.state = next;
        self.report.history.push(StateChange {
            state: next,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Move to `Failed`, keeping the originating error.
    pub(crate) fn fail(&mut self, error: ConvertError) {
        if self.report.state.is_terminal() {
            return;
        }
        let _ = self.transition(JobState::Failed);
        self.report.error = Some(error);
    }

    pub(crate) fn finish(self) -> ConversionReport {
        self.report
    }
}
