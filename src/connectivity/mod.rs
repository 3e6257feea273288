//! Runtime connectivity: a push-capable signal the host environment drives,
//! and a monitor that mirrors it into the session.

pub mod monitor;

use std::sync::Arc;

use tokio::sync::watch;

use crate::session::state::Connectivity;

pub use monitor::ConnectivityMonitor;

/// Host-side connectivity notifier.
///
/// The embedding shell calls [`set_online`](Self::set_online) on each network
/// transition; the controller queries [`is_online`](Self::is_online) right
/// before a submission and when classifying a failure.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Record a transition. Returns false if the value did not change.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity::from_online(self.is_online())
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(true)
    }
}
