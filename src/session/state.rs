use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::FailureKind,
    media::{ImageHandle, SourceFile},
    upload::estimator::ProgressEstimator,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Processing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

/// Serializable view of the session handed to the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub progress: u8,
    pub source_name: Option<String>,
    pub original_preview_url: Option<String>,
    pub processed_result_url: Option<String>,
    pub error_message: Option<String>,
    pub failure: Option<FailureKind>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Whether a retry affordance should be offered.
    pub retry_available: bool,
    /// 1-based number of the attempt a retry would start, for "attempt n/max" labels.
    pub next_attempt: Option<u32>,
    pub connectivity: Connectivity,
    pub attempt_started_at: Option<DateTime<Utc>>,
}

/// The single live upload session.
///
/// Terminal writes (`succeed`, `fail`) and wholesale replacements
/// (`replace_file`, `reset`) always cancel the attached estimator before
/// touching status or progress, so a late tick can never land after them.
#[derive(Debug)]
pub struct SessionState {
    status: SessionStatus,
    progress: u8,
    source_file: Option<SourceFile>,
    original_preview: Option<ImageHandle>,
    processed_result: Option<ImageHandle>,
    error_message: Option<String>,
    failure: Option<FailureKind>,
    /// Outcome of the last submission of `source_file`. Unlike `failure`, a
    /// rejected drop of some other file never overwrites it.
    attempt_failure: Option<FailureKind>,
    retry_count: u32,
    connectivity: Connectivity,
    attempt_started_at: Option<DateTime<Utc>>,
    /// Bumped on every new attempt, file replacement and reset. Responses and
    /// ticks carrying an older epoch are stale.
    epoch: u64,
    max_retries: u32,
    estimator: Option<ProgressEstimator>,
}

impl SessionState {
    pub fn new(max_retries: u32, connectivity: Connectivity) -> Self {
        Self {
            status: SessionStatus::Idle,
            progress: 0,
            source_file: None,
            original_preview: None,
            processed_result: None,
            error_message: None,
            failure: None,
            attempt_failure: None,
            retry_count: 0,
            connectivity,
            attempt_started_at: None,
            epoch: 0,
            max_retries,
            estimator: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    pub fn attempt_failure(&self) -> Option<FailureKind> {
        self.attempt_failure
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub fn has_estimator(&self) -> bool {
        self.estimator.is_some()
    }

    /// Discard everything about the previous file and adopt `file`.
    pub fn replace_file(&mut self, file: SourceFile, preview: ImageHandle) {
        self.clear();
        self.source_file = Some(file);
        self.original_preview = Some(preview);
    }

    /// Back to the initial idle session. Connectivity is environment state and survives.
    pub fn reset(&mut self) {
        self.clear();
    }

    /// Enter `Processing` for a new attempt and return its epoch.
    pub fn begin_attempt(&mut self) -> u64 {
        self.stop_estimator();
        release(&mut self.processed_result);
        self.status = SessionStatus::Processing;
        self.progress = 0;
        self.error_message = None;
        self.failure = None;
        self.attempt_failure = None;
        self.attempt_started_at = Some(Utc::now());
        self.epoch += 1;
        self.epoch
    }

    pub fn attach_estimator(&mut self, estimator: ProgressEstimator) {
        self.stop_estimator();
        self.estimator = Some(estimator);
    }

    /// Apply one estimator tick. Returns the new value, or `None` when the tick
    /// is stale or the cap is already reached.
    pub fn advance_progress(&mut self, epoch: u64, step: u8, cap: u8) -> Option<u8> {
        if !self.is_current(epoch) || self.status != SessionStatus::Processing {
            return None;
        }
        if self.progress >= cap {
            return None;
        }
        self.progress = self.progress.saturating_add(step).min(cap);
        Some(self.progress)
    }

    pub fn succeed(&mut self, result: ImageHandle) {
        self.stop_estimator();
        release(&mut self.processed_result);
        self.progress = 100;
        self.processed_result = Some(result);
        self.status = SessionStatus::Succeeded;
        self.error_message = None;
        self.failure = None;
        self.attempt_failure = None;
        self.retry_count = 0;
    }

    /// Record the failed outcome of the current file. Progress is left where
    /// the estimator stopped.
    pub fn fail(&mut self, kind: FailureKind) {
        self.stop_estimator();
        release(&mut self.processed_result);
        self.status = SessionStatus::Failed;
        self.error_message = Some(kind.message().to_string());
        self.failure = Some(kind);
        self.attempt_failure = Some(kind);
    }

    /// Show that a dropped file was refused. The current file, its retry
    /// state and any finished or in-flight attempt are left alone; returns
    /// false when nothing was written.
    pub fn reject_input(&mut self) -> bool {
        match self.status {
            SessionStatus::Processing | SessionStatus::Succeeded => false,
            SessionStatus::Idle | SessionStatus::Failed => {
                self.status = SessionStatus::Failed;
                self.error_message = Some(FailureKind::Validation.message().to_string());
                self.failure = Some(FailureKind::Validation);
                true
            }
        }
    }

    pub fn increment_retry(&mut self) -> u32 {
        self.retry_count = (self.retry_count + 1).min(self.max_retries);
        self.retry_count
    }

    /// Returns true when the value actually changed.
    pub fn set_connectivity(&mut self, connectivity: Connectivity) -> bool {
        if self.connectivity == connectivity {
            return false;
        }
        self.connectivity = connectivity;
        true
    }

    pub fn retry_available(&self) -> bool {
        self.status == SessionStatus::Failed
            && self.source_file.is_some()
            && self
                .attempt_failure
                .map(|kind| kind.is_retryable())
                .unwrap_or(false)
            && self.retry_count < self.max_retries
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let retry_available = self.retry_available();
        SessionSnapshot {
            status: self.status,
            progress: self.progress,
            source_name: self.source_file.as_ref().map(|file| file.name.clone()),
            original_preview_url: self.original_preview.as_ref().map(ImageHandle::url),
            processed_result_url: self.processed_result.as_ref().map(ImageHandle::url),
            error_message: self.error_message.clone(),
            failure: self.failure,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            retry_available,
            next_attempt: retry_available.then_some(self.retry_count + 1),
            connectivity: self.connectivity,
            attempt_started_at: self.attempt_started_at,
        }
    }

    fn stop_estimator(&mut self) {
        if let Some(estimator) = self.estimator.take() {
            estimator.cancel();
        }
    }

    fn clear(&mut self) {
        self.stop_estimator();
        release(&mut self.original_preview);
        release(&mut self.processed_result);
        self.status = SessionStatus::Idle;
        self.progress = 0;
        self.source_file = None;
        self.error_message = None;
        self.failure = None;
        self.attempt_failure = None;
        self.retry_count = 0;
        self.attempt_started_at = None;
        self.epoch += 1;
    }
}

fn release(slot: &mut Option<ImageHandle>) {
    if let Some(handle) = slot.take() {
        handle.release();
    }
}
