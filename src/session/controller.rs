use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, Mutex};

use crate::{
    connectivity::{ConnectivityMonitor, ConnectivitySignal},
    error::{FailureKind, UploadError},
    media::{HandleRegistry, ImageBlob, SourceFile},
    settings::ControllerSettings,
    upload::{
        BackgroundRemover, EstimatorSettings, HttpRemover, RetryDecision, RetryPolicy,
        SubmissionPipeline,
    },
};

use super::{
    events::{emit, SessionEvent, EVENT_CAPACITY},
    state::{SessionSnapshot, SessionState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Owns the single upload session and drives it from user actions.
///
/// Cloning is cheap; all clones share one session. Must be created inside a
/// tokio runtime because the connectivity monitor is spawned immediately.
#[derive(Clone)]
pub struct UploadController {
    state: Arc<Mutex<SessionState>>,
    pipeline: Arc<SubmissionPipeline>,
    retry_policy: RetryPolicy,
    connectivity: ConnectivitySignal,
    handles: HandleRegistry,
    events: broadcast::Sender<SessionEvent>,
    monitor: Arc<ConnectivityMonitor>,
}

impl UploadController {
    pub fn new(
        settings: &ControllerSettings,
        remover: Arc<dyn BackgroundRemover>,
        connectivity: ConnectivitySignal,
    ) -> Self {
        let retry_policy = RetryPolicy::new(settings.max_retries);
        let state = Arc::new(Mutex::new(SessionState::new(
            retry_policy.max_retries(),
            connectivity.connectivity(),
        )));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let handles = HandleRegistry::new();

        let pipeline = SubmissionPipeline::new(
            remover,
            connectivity.clone(),
            handles.clone(),
            events.clone(),
            EstimatorSettings::from(settings),
        );
        let monitor = ConnectivityMonitor::spawn(&connectivity, state.clone(), events.clone());

        Self {
            state,
            pipeline: Arc::new(pipeline),
            retry_policy,
            connectivity,
            handles,
            events,
            monitor: Arc::new(monitor),
        }
    }

    /// Controller talking to the HTTP service described by `settings`.
    pub fn with_http(settings: &ControllerSettings, connectivity: ConnectivitySignal) -> Result<Self> {
        let remover = HttpRemover::new(settings)?;
        log_info!("upload controller targeting {}", remover.removal_url());
        Ok(Self::new(settings, Arc::new(remover), connectivity))
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    /// Resolve a preview or result URL from a snapshot to its bytes.
    pub fn image(&self, url: &str) -> Option<ImageBlob> {
        self.handles.get(url)
    }

    pub fn live_images(&self) -> usize {
        self.handles.live_count()
    }

    /// Handle a drop of one or more files: the first one is used, an empty
    /// drop does nothing.
    pub async fn drop_files(
        &self,
        files: Vec<SourceFile>,
    ) -> Option<Result<SessionSnapshot, UploadError>> {
        let file = files.into_iter().next()?;
        Some(self.select_file(file).await)
    }

    /// Make `file` the session's file and submit it.
    ///
    /// A non-image is rejected without replacing the current file. Any other
    /// file discards the previous session entirely, including an attempt that
    /// is still in flight, whose response will be ignored.
    pub async fn select_file(&self, file: SourceFile) -> Result<SessionSnapshot, UploadError> {
        let handles = self.handles.clone();
        let events = self.events.clone();
        self.pipeline
            .submit(&self.state, move |state| {
                if file.is_image() {
                    let preview = handles.create(file.data.clone(), file.media_type.clone());
                    state.replace_file(file.clone(), preview);
                    log_info!("selected '{}' ({} bytes)", file.name, file.len());
                    emit(&events, SessionEvent::StateChanged(state.snapshot()));
                }
                Ok(file)
            })
            .await
    }

    /// Resubmit the current file after a failure, up to the retry cap.
    pub async fn retry(&self) -> Result<SessionSnapshot, UploadError> {
        let policy = self.retry_policy;
        self.pipeline
            .submit(&self.state, move |state| match policy.evaluate(state)? {
                RetryDecision::Exhausted => {
                    log_warn!("retry refused: {} attempts already used", policy.max_retries());
                    state.fail(FailureKind::RetryExhausted);
                    Err(UploadError::RetryExhausted {
                        max: policy.max_retries(),
                    })
                }
                RetryDecision::Resubmit { attempt } => {
                    let file = state.source_file().cloned().ok_or(UploadError::NothingToRetry)?;
                    state.increment_retry();
                    log_info!("retry {attempt}/{} requested", policy.max_retries());
                    Ok(file)
                }
            })
            .await
    }

    /// Start over: drop the file, its images and any attempt in flight.
    pub async fn reset(&self) -> SessionSnapshot {
        let mut guard = self.state.lock().await;
        guard.reset();
        log_info!("session reset");
        let snapshot = guard.snapshot();
        emit(&self.events, SessionEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    /// Stop the connectivity monitor. The session itself stays readable.
    pub fn shutdown(&self) {
        self.monitor.shutdown();
    }
}
