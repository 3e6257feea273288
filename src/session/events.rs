use serde::Serialize;
use tokio::sync::broadcast;

use super::state::{Connectivity, SessionSnapshot};

/// Capacity of the event channel. Slow subscribers see `Lagged` and should
/// re-read the snapshot.
pub const EVENT_CAPACITY: usize = 64;

/// Notifications pushed to the rendering layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    Progress { progress: u8 },
    ConnectivityChanged { connectivity: Connectivity },
}

pub(crate) fn emit(events: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    // No subscribers is normal (headless use, tests).
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kebab_case_tags() {
        let json = serde_json::to_value(SessionEvent::Progress { progress: 40 }).expect("serialize");
        assert_eq!(json["event"], "progress");
        assert_eq!(json["payload"]["progress"], 40);

        let json = serde_json::to_value(SessionEvent::ConnectivityChanged {
            connectivity: Connectivity::Offline,
        })
        .expect("serialize");
        assert_eq!(json["event"], "connectivity-changed");
        assert_eq!(json["payload"]["connectivity"], "offline");
    }
}
