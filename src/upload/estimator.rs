use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    session::{
        events::{emit, SessionEvent},
        state::SessionState,
    },
    settings::ControllerSettings,
};

// Ticks arrive twice a second; per-tick lines go to debug unless verbose.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorSettings {
    pub interval: Duration,
    pub step: u8,
    pub cap: u8,
    pub verbose: bool,
}

impl From<&ControllerSettings> for EstimatorSettings {
    fn from(settings: &ControllerSettings) -> Self {
        Self {
            interval: settings.tick_interval(),
            step: settings.progress_step,
            cap: settings.progress_cap.min(99),
            verbose: settings.verbose_ticks,
        }
    }
}

/// Synthetic progress producer for one submission attempt.
///
/// The remote service reports no progress, so this raises the session's value
/// by `step` every `interval` up to `cap`. It never reports completion.
#[derive(Debug)]
pub struct ProgressEstimator {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl ProgressEstimator {
    pub fn start(
        state: Arc<Mutex<SessionState>>,
        epoch: u64,
        settings: EstimatorSettings,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(estimator_loop(
            state,
            epoch,
            settings,
            events,
            cancel_token.clone(),
        ));

        Self {
            handle,
            cancel_token,
        }
    }

    /// Stop ticking. Synchronous: once this returns no tick can write progress,
    /// even one already waiting on the session lock.
    pub fn cancel(self) {
        self.stop();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    fn stop(&self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

impl Drop for ProgressEstimator {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn estimator_loop(
    state: Arc<Mutex<SessionState>>,
    epoch: u64,
    settings: EstimatorSettings,
    events: broadcast::Sender<SessionEvent>,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let mut guard = state.lock().await;
                // Cancellation happens under this same lock, so checking here
                // orders every tick strictly before or after it.
                if cancel_token.is_cancelled() {
                    break;
                }

                let Some(progress) = guard.advance_progress(epoch, settings.step, settings.cap) else {
                    break;
                };
                emit(&events, SessionEvent::Progress { progress });

                if settings.verbose {
                    log_info!("attempt {epoch}: estimated progress {progress}%");
                } else {
                    log_debug!("attempt {epoch}: estimated progress {progress}%");
                }

                if progress >= settings.cap {
                    break;
                }
            }
        }
    }
}
