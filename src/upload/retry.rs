use crate::{
    error::{FailureKind, UploadError},
    session::state::{SessionState, SessionStatus},
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// What a retry request should do, once it is known to be allowed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resubmit the same file as attempt `attempt` (1-based, counting retries only).
    Resubmit { attempt: u32 },
    /// Cap reached; record the terminal message without a network call.
    Exhausted,
}

/// Bounded, user-triggered resubmission of the current file.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn evaluate(&self, state: &SessionState) -> Result<RetryDecision, UploadError> {
        match state.status() {
            SessionStatus::Processing => return Err(UploadError::Busy),
            SessionStatus::Idle | SessionStatus::Succeeded => return Err(UploadError::NothingToRetry),
            SessionStatus::Failed => {}
        }

        if state.source_file().is_none() {
            return Err(UploadError::NothingToRetry);
        }

        // A refused drop of another file leaves the current file's outcome in place.
        match state.attempt_failure() {
            None => Err(UploadError::NothingToRetry),
            Some(FailureKind::RetryExhausted) => Ok(RetryDecision::Exhausted),
            Some(_) if state.retry_count() >= self.max_retries => Ok(RetryDecision::Exhausted),
            Some(_) => Ok(RetryDecision::Resubmit {
                attempt: state.retry_count() + 1,
            }),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::{
        media::{HandleRegistry, SourceFile},
        session::state::Connectivity,
    };

    fn failed_session(registry: &HandleRegistry, kind: FailureKind, retries: u32) -> SessionState {
        let mut state = SessionState::new(DEFAULT_MAX_RETRIES, Connectivity::Online);
        let file = SourceFile::new("photo.png", "image/png", Bytes::from_static(b"img"));
        let preview = registry.create(file.data.clone(), file.media_type.clone());
        state.replace_file(file, preview);
        for _ in 0..retries {
            state.increment_retry();
        }
        state.fail(kind);
        state
    }

    #[test]
    fn resubmits_below_the_cap() {
        let registry = HandleRegistry::new();
        let policy = RetryPolicy::default();
        let state = failed_session(&registry, FailureKind::Server, 2);
        assert_eq!(
            policy.evaluate(&state).expect("allowed"),
            RetryDecision::Resubmit { attempt: 3 }
        );
    }

    #[test]
    fn exhausts_at_the_cap() {
        let registry = HandleRegistry::new();
        let policy = RetryPolicy::default();
        let state = failed_session(&registry, FailureKind::Server, 3);
        assert_eq!(policy.evaluate(&state).expect("decided"), RetryDecision::Exhausted);

        let state = failed_session(&registry, FailureKind::RetryExhausted, 3);
        assert_eq!(policy.evaluate(&state).expect("decided"), RetryDecision::Exhausted);
    }

    #[test]
    fn offline_failures_are_retryable() {
        let registry = HandleRegistry::new();
        let state = failed_session(&registry, FailureKind::Offline, 0);
        assert_eq!(
            RetryPolicy::default().evaluate(&state).expect("allowed"),
            RetryDecision::Resubmit { attempt: 1 }
        );
    }

    #[test]
    fn refused_drop_keeps_the_current_file_retryable() {
        let registry = HandleRegistry::new();
        let policy = RetryPolicy::default();
        let mut state = failed_session(&registry, FailureKind::Server, 1);
        assert!(state.reject_input());
        assert_eq!(
            policy.evaluate(&state).expect("allowed"),
            RetryDecision::Resubmit { attempt: 2 }
        );
    }

    #[test]
    fn nothing_to_retry_without_a_failed_attempt() {
        let policy = RetryPolicy::default();
        let mut state = SessionState::new(DEFAULT_MAX_RETRIES, Connectivity::Online);
        assert!(matches!(policy.evaluate(&state), Err(UploadError::NothingToRetry)));

        state.reject_input();
        assert!(matches!(policy.evaluate(&state), Err(UploadError::NothingToRetry)));
    }

    #[test]
    fn rejects_while_processing() {
        let registry = HandleRegistry::new();
        let mut state = failed_session(&registry, FailureKind::Server, 0);
        state.begin_attempt();
        assert!(matches!(
            RetryPolicy::default().evaluate(&state),
            Err(UploadError::Busy)
        ));
    }
}
