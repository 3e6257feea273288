use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use crate::session::{
    events::{emit, SessionEvent},
    state::{Connectivity, SessionState},
};

use super::ConnectivitySignal;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Background observer that copies connectivity transitions into the session.
///
/// It only ever writes the `connectivity` field; an attempt in flight keeps
/// running when the network drops.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    cancel_token: CancellationToken,
}

impl ConnectivityMonitor {
    pub fn spawn(
        signal: &ConnectivitySignal,
        state: Arc<Mutex<SessionState>>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let mut rx = signal.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        log_info!("connectivity monitor shutting down");
                        break;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() {
                            log_warn!("connectivity signal dropped; monitor exiting");
                            break;
                        }
                        let connectivity = Connectivity::from_online(*rx.borrow_and_update());
                        let mut guard = state.lock().await;
                        if guard.set_connectivity(connectivity) {
                            log_info!("connectivity changed: {connectivity:?}");
                            emit(&events, SessionEvent::ConnectivityChanged { connectivity });
                        }
                    }
                }
            }
        });

        Self { cancel_token }
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::state::SessionStatus;

    #[tokio::test]
    async fn mirrors_transitions_without_touching_status() {
        let signal = ConnectivitySignal::new(true);
        let state = Arc::new(Mutex::new(SessionState::new(3, Connectivity::Online)));
        let (events, mut rx) = broadcast::channel(8);
        let monitor = ConnectivityMonitor::spawn(&signal, state.clone(), events);

        signal.set_online(false);
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event in time")
            .expect("channel open");
        assert_eq!(
            event,
            SessionEvent::ConnectivityChanged {
                connectivity: Connectivity::Offline
            }
        );

        let guard = state.lock().await;
        assert_eq!(guard.connectivity(), Connectivity::Offline);
        assert_eq!(guard.status(), SessionStatus::Idle);
        drop(guard);

        monitor.shutdown();
        assert!(!monitor.is_running());
    }
}
