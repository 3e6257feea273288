use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, Mutex};

use crate::{
    connectivity::ConnectivitySignal,
    error::{FailureKind, RemoteError, UploadError},
    media::{HandleRegistry, SourceFile},
    session::{
        events::{emit, SessionEvent},
        state::{SessionSnapshot, SessionState},
    },
};

use super::{
    client::BackgroundRemover,
    estimator::{EstimatorSettings, ProgressEstimator},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Validates a file and runs exactly one attempt against the remote service.
///
/// Every failure is written into the session before it is returned.
pub struct SubmissionPipeline {
    remover: Arc<dyn BackgroundRemover>,
    connectivity: ConnectivitySignal,
    handles: HandleRegistry,
    events: broadcast::Sender<SessionEvent>,
    estimator: EstimatorSettings,
}

impl SubmissionPipeline {
    pub fn new(
        remover: Arc<dyn BackgroundRemover>,
        connectivity: ConnectivitySignal,
        handles: HandleRegistry,
        events: broadcast::Sender<SessionEvent>,
        estimator: EstimatorSettings,
    ) -> Self {
        Self {
            remover,
            connectivity,
            handles,
            events,
            estimator,
        }
    }

    /// Run one attempt for the file `prepare` hands back.
    ///
    /// `prepare` runs under the same session lock as validation and
    /// `begin_attempt`, so no other operation can slip in between adopting a
    /// file and starting its attempt. An error from `prepare` is returned as
    /// is; if it maps to a failure kind the session already records it.
    pub async fn submit<F>(
        &self,
        state: &Arc<Mutex<SessionState>>,
        prepare: F,
    ) -> Result<SessionSnapshot, UploadError>
    where
        F: FnOnce(&mut SessionState) -> Result<SourceFile, UploadError> + Send,
    {
        let (file, epoch) = {
            let mut guard = state.lock().await;
            let file = match prepare(&mut *guard) {
                Ok(file) => file,
                Err(err) => {
                    if err.failure_kind().is_some() {
                        self.emit_state(&guard);
                    }
                    return Err(err);
                }
            };

            if !file.is_image() {
                log_warn!(
                    "rejecting '{}': declared type '{}' is not an image",
                    file.name,
                    file.media_type
                );
                if guard.reject_input() {
                    self.emit_state(&guard);
                }
                return Err(UploadError::Validation {
                    name: file.name,
                    media_type: file.media_type,
                });
            }

            if !self.connectivity.is_online() {
                log_warn!("offline; '{}' not submitted", file.name);
                guard.fail(FailureKind::Offline);
                self.emit_state(&guard);
                return Err(UploadError::Offline);
            }

            let epoch = guard.begin_attempt();
            let estimator =
                ProgressEstimator::start(state.clone(), epoch, self.estimator, self.events.clone());
            guard.attach_estimator(estimator);
            self.emit_state(&guard);
            (file, epoch)
        };

        log_info!(
            "attempt {epoch}: submitting '{}' ({} bytes, {})",
            file.name,
            file.len(),
            file.media_type
        );

        let outcome = self
            .remover
            .remove_background(&file)
            .await
            .and_then(recognise_image);

        let mut guard = state.lock().await;
        if !guard.is_current(epoch) {
            log_info!("attempt {epoch}: response discarded, session moved on");
            return Err(UploadError::Superseded);
        }

        match outcome {
            Ok((data, media_type)) => {
                log_info!("attempt {epoch}: received {} bytes of {media_type}", data.len());
                let handle = self.handles.create(data, media_type);
                guard.succeed(handle);
                self.emit_state(&guard);
                Ok(guard.snapshot())
            }
            Err(err) => {
                let kind = if self.connectivity.is_online() {
                    FailureKind::Server
                } else {
                    FailureKind::Offline
                };
                log_error!("attempt {epoch}: removal failed ({kind:?}): {err}");
                guard.fail(kind);
                self.emit_state(&guard);
                Err(match kind {
                    FailureKind::Offline => UploadError::Offline,
                    _ => UploadError::Server(err),
                })
            }
        }
    }

    fn emit_state(&self, state: &SessionState) {
        emit(&self.events, SessionEvent::StateChanged(state.snapshot()));
    }
}

/// Accept a response body only if it carries a recognisable image signature.
fn recognise_image(data: Bytes) -> Result<(Bytes, &'static str), RemoteError> {
    match image::guess_format(&data) {
        Ok(format) => Ok((data, format.to_mime_type())),
        Err(_) => Err(RemoteError::InvalidPayload(data.len())),
    }
}
