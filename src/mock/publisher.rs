//! Mock publisher with failure injection.

use std::sync::Mutex;
use std::time::Duration;

use crate::provider::{PublishError, Publisher};

/// Injected failure behavior for the mock publisher.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    /// Transient (retryable) or permanent failure.
    pub transient: bool,
    /// Failure message returned to the pipeline.
    pub message: String,
    /// Number of attempts to fail before succeeding (None = always fail).
    pub fail_count: Option<u32>,
}

impl PublishFailure {
    /// Always fail with a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            transient: true,
            message: message.into(),
            fail_count: None,
        }
    }

    /// Always fail with a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            transient: false,
            message: message.into(),
            fail_count: None,
        }
    }

    /// Fail the first `count` attempts, then succeed.
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

struct PublisherState {
    failure: Option<PublishFailure>,
    attempts: u32,
    timeouts: Vec<Duration>,
}

type AttemptHook = Box<dyn Fn(u32) + Send + Sync>;

/// Mock publisher. Succeeds with a deterministic locator unless a failure is
/// injected.
pub struct MockPublisher {
    state: Mutex<PublisherState>,
    locator: String,
    on_attempt: Option<AttemptHook>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    /// Create a publisher that always succeeds.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PublisherState {
                failure: None,
                attempts: 0,
                timeouts: Vec::new(),
            }),
            locator: "cas://mock/bundle".to_string(),
            on_attempt: None,
        }
    }

    /// Override the locator returned on success.
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = locator.into();
        self
    }

    /// Inject a failure behavior.
    pub fn with_failure(self, failure: PublishFailure) -> Self {
        self.state.lock().unwrap().failure = Some(failure);
        self
    }

    /// Run a hook at the start of every attempt (attempt number, 1-based).
    /// Used by cancellation tests to cancel a token mid-run.
    pub fn with_attempt_hook(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_attempt = Some(Box::new(hook));
        self
    }

    /// Number of publish attempts observed.
    pub fn attempts(&self) -> u32 {
        self.state.lock().unwrap().attempts
    }

    /// Timeouts handed to each attempt, in order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.state.lock().unwrap().timeouts.clone()
    }
}

impl Publisher for MockPublisher {
    fn publish(&self, _bytes: &[u8], timeout: Duration) -> Result<String, PublishError> {
        let attempt = {
            let mut state = self.state.lock().unwrap();
            state.attempts += 1;
            state.timeouts.push(timeout);
            state.attempts
        };

        if let Some(hook) = &self.on_attempt {
            hook(attempt);
        }

        let state = self.state.lock().unwrap();
        if let Some(failure) = &state.failure {
            let failing = match failure.fail_count {
                Some(count) => attempt <= count,
                None => true,
            };
            if failing {
                return if failure.transient {
                    Err(PublishError::Transient(failure.message.clone()))
                } else {
                    Err(PublishError::Permanent(failure.message.clone()))
                };
            }
        }

        Ok(self.locator.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_by_default() {
        let publisher = MockPublisher::new().with_locator("cas://x");
        let locator = publisher.publish(b"bytes", Duration::from_secs(1)).unwrap();
        assert_eq!(locator, "cas://x");
        assert_eq!(publisher.attempts(), 1);
        assert_eq!(publisher.timeouts(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_fail_count_then_succeed() {
        let publisher =
            MockPublisher::new().with_failure(PublishFailure::transient("flake").with_fail_count(2));

        assert!(publisher.publish(b"b", Duration::ZERO).is_err());
        assert!(publisher.publish(b"b", Duration::ZERO).is_err());
        assert!(publisher.publish(b"b", Duration::ZERO).is_ok());
        assert_eq!(publisher.attempts(), 3);
    }

    #[test]
    fn test_permanent_failure() {
        let publisher = MockPublisher::new().with_failure(PublishFailure::permanent("rejected"));
        let err = publisher.publish(b"b", Duration::ZERO).unwrap_err();
        assert!(matches!(err, PublishError::Permanent(m) if m == "rejected"));
    }
}
