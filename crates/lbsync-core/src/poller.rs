//! Provisioning poller
//!
//! Waits for a long-running remote operation by repeatedly reading the
//! aggregate and classifying its `provisioningState`. The first read happens
//! immediately, later ones on a fixed interval. The whole wait is bounded by a
//! wall-clock timeout, which is reported separately from a failed status.
//!
//! Transport errors end the wait at once; retrying them is the host's call.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model;
use crate::traits::LoadBalancerClient;

/// Rendering of a status the remote did not report
pub const STATUS_MISSING: &str = "<none>";

/// Rendering of a resource that disappeared while being waited on
pub const STATUS_NOT_FOUND: &str = "NotFound";

/// Reduced provisioning status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStatus {
    /// `Accepted` or `Updating`: keep polling
    Pending,
    /// `Succeeded`
    Succeeded,
    /// Anything else, including a missing status
    Failed(String),
}

impl ProvisioningStatus {
    /// Classify a raw provider status
    pub fn classify(status: Option<&str>) -> Self {
        match status {
            Some("Accepted") | Some("Updating") => Self::Pending,
            Some("Succeeded") => Self::Succeeded,
            Some(other) => Self::Failed(other.to_string()),
            None => Self::Failed(STATUS_MISSING.to_string()),
        }
    }

    /// Whether polling stops at this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Polls a [`LoadBalancerClient`] until provisioning settles
#[derive(Clone)]
pub struct ProvisioningPoller {
    client: Arc<dyn LoadBalancerClient>,
    interval: Duration,
    timeout: Duration,
}

impl ProvisioningPoller {
    /// Create a poller with the given cadence and bound
    ///
    /// Both durations must be non-zero.
    pub fn new(
        client: Arc<dyn LoadBalancerClient>,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::config("poll interval must be non-zero"));
        }
        if timeout.is_zero() {
            return Err(Error::config("provisioning timeout must be non-zero"));
        }

        Ok(Self {
            client,
            interval,
            timeout,
        })
    }

    /// Configured wall-clock bound
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait until the aggregate reports `Succeeded`
    ///
    /// Returns the model observed on success.
    pub async fn wait_until_provisioned(&self, scope: &str, name: &str) -> Result<model::LoadBalancer> {
        self.wait_observed(scope, name, |_, _| {}).await
    }

    /// Like [`wait_until_provisioned`](Self::wait_until_provisioned), calling
    /// `observe(attempt, status)` after every read
    pub async fn wait_observed(
        &self,
        scope: &str,
        name: &str,
        observe: impl FnMut(u32, &str) + Send,
    ) -> Result<model::LoadBalancer> {
        tokio::time::timeout(self.timeout, self.poll(scope, name, observe))
            .await
            .map_err(|_| Error::ProvisioningTimeout {
                name: name.to_string(),
                timeout: self.timeout,
            })?
    }

    async fn poll(
        &self,
        scope: &str,
        name: &str,
        mut observe: impl FnMut(u32, &str) + Send,
    ) -> Result<model::LoadBalancer> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        let mut attempt = 0u32;
        while ticks.next().await.is_some() {
            attempt += 1;

            let Some(remote) = self.client.get(scope, name).await? else {
                observe(attempt, STATUS_NOT_FOUND);
                return Err(Error::ProvisioningFailed {
                    name: name.to_string(),
                    status: STATUS_NOT_FOUND.to_string(),
                });
            };

            let raw = remote.provisioning_state().unwrap_or(STATUS_MISSING);
            observe(attempt, raw);
            debug!(scope, name, attempt, status = raw, "provisioning state observed");

            match ProvisioningStatus::classify(remote.provisioning_state()) {
                ProvisioningStatus::Pending => continue,
                ProvisioningStatus::Succeeded => return Ok(remote),
                ProvisioningStatus::Failed(status) => {
                    return Err(Error::ProvisioningFailed {
                        name: name.to_string(),
                        status,
                    });
                }
            }
        }

        // IntervalStream never ends
        Err(Error::Other("provisioning poll stream ended".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    /// Returns scripted statuses, repeating the last one forever
    struct Scripted {
        statuses: Mutex<VecDeque<Option<&'static str>>>,
        gets: AtomicUsize,
    }

    impl Scripted {
        fn new(statuses: Vec<Option<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                gets: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LoadBalancerClient for Scripted {
        async fn get(&self, _scope: &str, name: &str) -> Result<Option<model::LoadBalancer>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().copied().flatten()
            };
            Ok(Some(model::LoadBalancer {
                name: Some(name.to_string()),
                properties: Some(model::LoadBalancerProperties {
                    provisioning_state: status.map(str::to_string),
                    ..Default::default()
                }),
                ..Default::default()
            }))
        }

        async fn create_or_update(
            &self,
            _scope: &str,
            _name: &str,
            model: &model::LoadBalancer,
        ) -> Result<model::LoadBalancer> {
            Ok(model.clone())
        }

        async fn delete(&self, _scope: &str, _name: &str) -> Result<()> {
            Ok(())
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn poller(client: Arc<Scripted>, timeout: Duration) -> ProvisioningPoller {
        ProvisioningPoller::new(client, Duration::from_millis(5), timeout).unwrap()
    }

    #[test_case(Duration::ZERO, Duration::from_secs(1) ; "zero interval")]
    #[test_case(Duration::from_millis(5), Duration::ZERO ; "zero timeout")]
    fn zero_durations_are_rejected(interval: Duration, timeout: Duration) {
        let client = Scripted::new(vec![Some("Succeeded")]);
        let err = ProvisioningPoller::new(client.clone(), interval, timeout)
            .err()
            .expect("rejected");

        assert!(matches!(err, Error::Config(_)), "{:?}", err);
        assert_eq!(client.gets.load(Ordering::SeqCst), 0);
    }

    #[test_case(Some("Accepted"), ProvisioningStatus::Pending ; "accepted")]
    #[test_case(Some("Updating"), ProvisioningStatus::Pending ; "updating")]
    #[test_case(Some("Succeeded"), ProvisioningStatus::Succeeded ; "succeeded")]
    #[test_case(Some("Failed"), ProvisioningStatus::Failed("Failed".into()) ; "failed")]
    #[test_case(Some("Deleting"), ProvisioningStatus::Failed("Deleting".into()) ; "unexpected")]
    #[test_case(None, ProvisioningStatus::Failed(STATUS_MISSING.into()) ; "missing")]
    fn classify(raw: Option<&str>, expected: ProvisioningStatus) {
        assert_eq!(ProvisioningStatus::classify(raw), expected);
    }

    #[tokio::test]
    async fn succeeds_after_n_pending_reads() {
        let client = Scripted::new(vec![
            Some("Updating"),
            Some("Accepted"),
            Some("Updating"),
            Some("Succeeded"),
        ]);

        let mut seen = Vec::new();
        let remote = poller(client.clone(), Duration::from_secs(5))
            .wait_observed("rg", "lb", |attempt, status| seen.push((attempt, status.to_string())))
            .await
            .unwrap();

        assert_eq!(remote.provisioning_state(), Some("Succeeded"));
        assert_eq!(client.gets.load(Ordering::SeqCst), 4);
        assert_eq!(seen.last(), Some(&(4, "Succeeded".to_string())));
    }

    #[tokio::test]
    async fn always_pending_times_out() {
        let client = Scripted::new(vec![Some("Updating")]);
        let bound = Duration::from_millis(100);

        let started = std::time::Instant::now();
        let err = poller(client.clone(), bound)
            .wait_until_provisioned("rg", "lb")
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "{:?}", err);
        assert!(started.elapsed() < bound + Duration::from_secs(2));
        assert!(client.gets.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn failed_status_is_not_a_timeout() {
        let client = Scripted::new(vec![Some("Updating"), Some("Failed")]);

        let err = poller(client, Duration::from_secs(5))
            .wait_until_provisioned("rg", "lb")
            .await
            .unwrap_err();

        assert!(!err.is_timeout());
        assert!(matches!(err, Error::ProvisioningFailed { ref status, .. } if status == "Failed"));
    }

    #[tokio::test]
    async fn missing_status_fails() {
        let client = Scripted::new(vec![None]);
        let err = poller(client, Duration::from_secs(5))
            .wait_until_provisioned("rg", "lb")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProvisioningFailed { .. }));
    }
}
