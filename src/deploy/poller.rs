//! Waits for an uploaded deployment to reach a terminal state

use crate::deploy::clock::{Clock, Sleeper, TokioClock};
use crate::deploy::{PublishError, Result};
use crate::portal::PortalApi;
use crate::types::{BundleSpec, DeploymentId, DeploymentState, PublishOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
pub const MAX_BACKOFF: Duration = Duration::from_secs(64);

/// Exponential delay between status polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Return the delay to wait now and double the next one, up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .checked_mul(2)
            .unwrap_or(self.max)
            .min(self.max);
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// Result of a finished poll sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub outcome: PublishOutcome,
    /// Status requests issued, including ones that timed out.
    pub attempts: u32,
    pub elapsed: Duration,
}

pub struct DeploymentPoller {
    config: PollerConfig,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for DeploymentPoller {
    fn default() -> Self {
        Self::new(PollerConfig::default())
    }
}

impl DeploymentPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self::with_time_source(config, Arc::new(TokioClock), Arc::new(TokioClock))
    }

    pub fn with_time_source(
        config: PollerConfig,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            clock,
            sleeper,
        }
    }

    /// Poll until the deployment is validated or published.
    ///
    /// Returns immediately with [`PublishOutcome::Uploaded`] when the bundle
    /// disables verification. Transport timeouts are retried with backoff
    /// until the verification deadline; every other failure ends the loop.
    pub async fn wait(
        &self,
        api: &dyn PortalApi,
        deployment: &DeploymentId,
        spec: &BundleSpec,
        cancel: &CancellationToken,
    ) -> Result<Verification> {
        if !spec.verification_enabled() {
            info!("Verification disabled, not waiting for deployment {}", deployment);
            return Ok(Verification {
                outcome: PublishOutcome::Uploaded,
                attempts: 0,
                elapsed: Duration::ZERO,
            });
        }

        let timeout = spec.verification_timeout;
        let start = self.clock.now();
        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(PublishError::Cancelled);
            }

            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= timeout {
                return Err(PublishError::VerificationTimeout {
                    portal_url: spec.portal_url.clone(),
                    timeout,
                });
            }

            attempts += 1;
            match api.status(deployment).await {
                Ok(state) if state.is_in_progress() => {
                    debug!(attempt = attempts, "Deployment {} is {}", deployment, state);
                }
                Ok(state) => {
                    if let Some(outcome) = PublishOutcome::from_terminal_state(&state) {
                        info!("{}", outcome.message());
                        return Ok(Verification {
                            outcome,
                            attempts,
                            elapsed: self.clock.now().saturating_duration_since(start),
                        });
                    }
                    return Err(match state {
                        DeploymentState::Failed => PublishError::DeploymentFailed {
                            deployment: deployment.clone(),
                            portal_url: spec.portal_url.clone(),
                        },
                        other => PublishError::UnknownState {
                            state: other.to_string(),
                        },
                    });
                }
                Err(e) if e.is_transient() => {
                    warn!("Status request timed out, retrying: {}", e);
                }
                Err(e) => return Err(e.into()),
            }

            let remaining = timeout.saturating_sub(self.clock.now().saturating_duration_since(start));
            let delay = backoff.next_delay().min(remaining);
            debug!("Waiting {:?} before polling deployment {} again", delay, deployment);

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Cancelled while waiting for deployment {}", deployment);
                    return Err(PublishError::Cancelled);
                }
                _ = self.sleeper.sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::clock::ManualClock;
    use crate::portal::PortalError;
    use crate::types::Credentials;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    /// Replays a fixed list of status responses; the last one repeats.
    struct ScriptedPortal {
        responses: Mutex<VecDeque<std::result::Result<DeploymentState, PortalError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedPortal {
        fn new(responses: Vec<std::result::Result<DeploymentState, PortalError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn states(states: &[&str]) -> Self {
            Self::new(states.iter().map(|s| Ok(DeploymentState::from(*s))).collect())
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    fn timeout_error() -> PortalError {
        PortalError::Timeout {
            url: "https://central.sonatype.com/api/v1/publisher/status?id=dep".to_string(),
            message: "operation timed out".to_string(),
        }
    }

    #[async_trait]
    impl PortalApi for ScriptedPortal {
        async fn upload(&self, _bundle: &Path) -> std::result::Result<DeploymentId, PortalError> {
            Ok(DeploymentId::new("dep"))
        }

        async fn status(
            &self,
            _deployment: &DeploymentId,
        ) -> std::result::Result<DeploymentState, PortalError> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                match responses.front().unwrap() {
                    Ok(state) => Ok(state.clone()),
                    Err(_) => Err(timeout_error()),
                }
            }
        }
    }

    fn spec(timeout_secs: i64) -> BundleSpec {
        BundleSpec::new(Credentials::new("user", "pass")).with_verification_timeout_secs(timeout_secs)
    }

    fn poller(clock: &ManualClock) -> DeploymentPoller {
        DeploymentPoller::with_time_source(
            PollerConfig::default(),
            Arc::new(clock.clone()),
            Arc::new(clock.clone()),
        )
    }

    #[test]
    fn test_backoff_sequence_doubles_and_caps() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..9).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 64, 64, 64, 64]);
    }

    #[test]
    fn test_backoff_initial_above_cap_is_clamped() {
        let mut backoff = Backoff::new(Duration::from_secs(100), Duration::from_secs(64));
        assert_eq!(backoff.next_delay(), Duration::from_secs(64));
        assert_eq!(backoff.current(), Duration::from_secs(64));
    }

    #[tokio::test]
    async fn test_polls_until_published() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["PENDING", "VALIDATING", "PUBLISHED"]);

        let verification = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(portal.calls(), 3);
        assert_eq!(verification.attempts, 3);
        assert_eq!(verification.outcome, PublishOutcome::Published);
        // Slept 2s then 4s between the three polls.
        assert_eq!(clock.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_validated_is_terminal_success() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["PUBLISHING", "VALIDATED"]);

        let verification = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(verification.outcome, PublishOutcome::Validated);
        assert_eq!(portal.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_state_stops_immediately() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["FAILED", "PUBLISHED"]);

        let result = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &CancellationToken::new())
            .await;

        match result {
            Err(PublishError::DeploymentFailed {
                deployment,
                portal_url,
            }) => {
                assert_eq!(deployment.as_str(), "dep");
                assert_eq!(portal_url, "https://central.sonatype.com/");
            }
            other => panic!("Expected DeploymentFailed, got {other:?}"),
        }
        assert_eq!(portal.calls(), 1);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_state_is_fatal() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["PENDING", "ARCHIVED"]);

        let result = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(PublishError::UnknownState { ref state }) if state == "ARCHIVED"
        ));
        assert_eq!(portal.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_timeouts_are_retried_with_backoff() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::new(vec![
            Err(timeout_error()),
            Ok(DeploymentState::Pending),
            Err(timeout_error()),
            Ok(DeploymentState::Published),
        ]);

        let verification = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(verification.outcome, PublishOutcome::Published);
        assert_eq!(verification.attempts, 4);
        // Backoff keeps growing across timeouts: 2 + 4 + 8.
        assert_eq!(clock.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test]
    async fn test_http_and_parse_failures_are_not_retried() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::new(vec![
            Err(PortalError::MalformedStatus {
                body: "<html>".to_string(),
            }),
            Ok(DeploymentState::Published),
        ]);

        let result = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(PublishError::Portal(PortalError::MalformedStatus { .. }))
        ));
        assert_eq!(portal.calls(), 1);
    }

    #[tokio::test]
    async fn test_times_out_when_always_pending() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["PENDING"]);

        let result = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(1), &CancellationToken::new())
            .await;

        match result {
            Err(PublishError::VerificationTimeout {
                portal_url,
                timeout,
            }) => {
                assert_eq!(portal_url, "https://central.sonatype.com/");
                assert_eq!(timeout, Duration::from_secs(1));
            }
            other => panic!("Expected VerificationTimeout, got {other:?}"),
        }
        assert_eq!(portal.calls(), 1);
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_long_timeout_uses_capped_backoff() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["PENDING"]);

        let result = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(300), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(PublishError::VerificationTimeout { .. })));
        // 2+4+8+16+32+64+64 = 190, then 64 more reaches 254, then the final
        // wait is clamped to the 46s left before the deadline.
        assert_eq!(portal.calls(), 9);
        assert_eq!(clock.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_disabled_verification_skips_polling() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["FAILED"]);

        let verification = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(0), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(verification.outcome, PublishOutcome::Uploaded);
        assert_eq!(verification.attempts, 0);
        assert_eq!(portal.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_before_polling() {
        let clock = ManualClock::new();
        let portal = ScriptedPortal::states(&["PUBLISHED"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = poller(&clock)
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &cancel)
            .await;

        assert!(matches!(result, Err(PublishError::Cancelled)));
        assert_eq!(portal.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_backoff_ends_loop() {
        let portal = ScriptedPortal::states(&["PENDING"]);
        let cancel = CancellationToken::new();
        let poller = DeploymentPoller::new(PollerConfig {
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(64),
        });

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = poller
            .wait(&portal, &DeploymentId::new("dep"), &spec(600), &cancel)
            .await;

        assert!(matches!(result, Err(PublishError::Cancelled)));
        assert_eq!(portal.calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
