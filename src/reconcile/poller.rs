//! Status polling
//!
//! Re-fetches a resource until its `status` reaches a target set, bounded by
//! a deadline derived from the run-wide [`TimeoutContext`]. The wait is an
//! ordinary future: dropping it cancels the poll.

use crate::error::{Error, Result};
use crate::linode::LinodeClient;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Wall-clock budget shared by every poll in one module run
#[derive(Debug, Clone, Copy)]
pub struct TimeoutContext {
    deadline: Instant,
}

impl TimeoutContext {
    pub fn new(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.remaining().as_secs()
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// A deadline at most `max` away that never exceeds the run deadline
    pub fn capped(&self, max: Duration) -> Instant {
        (Instant::now() + max).min(self.deadline)
    }
}

fn timed_out(waited: Duration, condition: &str) -> Error {
    Error::PollTimeout {
        waited,
        condition: condition.to_string(),
    }
}

async fn bounded<T, Fut>(deadline: Instant, condition: &str, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    if start >= deadline {
        return Err(timed_out(Duration::ZERO, condition));
    }

    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(timed_out(start.elapsed(), condition)),
    }
}

/// Evaluate `check` every `interval` until it returns true or `deadline` passes
pub async fn poll_condition<F, Fut>(
    mut check: F,
    interval: Duration,
    deadline: Instant,
    condition: &str,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    bounded(deadline, condition, async move {
        loop {
            if check().await? {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    })
    .await
}

/// Fetch every `interval` until `accept` holds for the fetched value
pub async fn poll_until<F, Fut, A>(
    mut fetch: F,
    accept: A,
    interval: Duration,
    deadline: Instant,
    condition: &str,
) -> Result<Value>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value>>,
    A: Fn(&Value) -> bool,
{
    bounded(deadline, condition, async move {
        loop {
            let current = fetch().await?;
            if accept(&current) {
                return Ok(current);
            }
            tokio::time::sleep(interval).await;
        }
    })
    .await
}

pub fn status_in(resource: &Value, targets: &[&str]) -> bool {
    resource
        .get("status")
        .and_then(|v| v.as_str())
        .map(|s| targets.contains(&s))
        .unwrap_or(false)
}

/// Re-fetch `path` until its `status` is one of `targets`; returns the final resource
pub async fn wait_for_status(
    client: &LinodeClient,
    path: &str,
    targets: &[&str],
    interval: Duration,
    deadline: Instant,
) -> Result<Value> {
    let condition = format!("{} status in [{}]", path, targets.join(", "));
    tracing::debug!("Waiting for {}", condition);

    poll_until(
        move || client.get(path),
        |resource| status_in(resource, targets),
        interval,
        deadline,
        &condition,
    )
    .await
}

/// Treat a poll timeout as "transition not observed"
pub fn allow_timeout<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::PollTimeout { condition, .. }) => {
            tracing::debug!("Optional transition not observed: {}", condition);
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_source(
        ready_after: usize,
    ) -> (
        Arc<AtomicUsize>,
        impl FnMut() -> std::future::Ready<Result<Value>>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let fetch = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = if n >= ready_after { "active" } else { "provisioning" };
            std::future::ready(Ok(json!({ "status": status })))
        };
        (calls, fetch)
    }

    #[tokio::test]
    async fn test_poll_until_reaches_target() {
        let (calls, fetch) = counting_source(2);
        let deadline = Instant::now() + Duration::from_secs(5);

        let resource = poll_until(
            fetch,
            |r| status_in(r, &["active"]),
            Duration::from_millis(5),
            deadline,
            "active",
        )
        .await
        .unwrap();

        assert_eq!(resource["status"], "active");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_budget_times_out_without_fetching() {
        let (calls, fetch) = counting_source(0);
        let ctx = TimeoutContext::new(Duration::ZERO);

        let err = poll_until(
            fetch,
            |r| status_in(r, &["active"]),
            Duration::from_secs(4),
            ctx.deadline(),
            "active",
        )
        .await
        .unwrap_err();

        assert!(err.is_poll_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_never_ready_terminates_near_deadline() {
        let (_calls, fetch) = counting_source(usize::MAX);
        let interval = Duration::from_millis(50);
        let budget = Duration::from_millis(200);
        let started = Instant::now();

        let err = poll_until(
            fetch,
            |r| status_in(r, &["active"]),
            interval,
            started + budget,
            "active",
        )
        .await
        .unwrap_err();

        assert!(err.is_poll_timeout());
        assert!(started.elapsed() < budget + interval + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_poll_condition_propagates_errors() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = poll_condition(
            || async { Err::<bool, _>(Error::NotFound("/databases/1".into())) },
            Duration::from_millis(5),
            deadline,
            "cluster size",
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_allow_timeout() {
        let soft = allow_timeout::<()>(Err(timed_out(Duration::from_secs(4), "updating")));
        assert!(matches!(soft, Ok(None)));

        let hard = allow_timeout::<()>(Err(Error::Validation("bad".into())));
        assert!(matches!(hard, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_timeout_context_shrinks_and_caps() {
        let ctx = TimeoutContext::from_secs(60);
        assert!(ctx.seconds_remaining() <= 60);
        assert!(!ctx.is_expired());
        assert!(ctx.capped(Duration::from_secs(4)) < ctx.deadline());
        assert_eq!(ctx.capped(Duration::from_secs(600)), ctx.deadline());
        assert!(TimeoutContext::from_secs(0).is_expired());
    }

    #[test]
    fn test_status_in() {
        assert!(status_in(&json!({"status": "active"}), &["active", "suspended"]));
        assert!(!status_in(&json!({"status": "updating"}), &["active"]));
        assert!(!status_in(&json!({}), &["active"]));
    }
}
