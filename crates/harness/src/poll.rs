//! Bounded polling - the retry primitive that replaces fixed-duration waits
//!
//! Every assertion about an asynchronous UI effect routes through
//! [`poll_for`] / [`poll_until`]: the predicate re-samples its indicators on
//! each attempt until it is satisfied or the deadline elapses. The single
//! sanctioned exception is [`degraded_wait`], used where no reliable
//! indicator for an effect exists; it logs its reason so every such wait is
//! auditable.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{trace, warn};

use crate::error::{HarnessError, HarnessResult};

/// Interval and deadline for one polled condition.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            deadline: Duration::from_secs(10),
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// One sampling attempt: either the condition held (carrying a value for the
/// caller) or it did not, carrying what was observed for diagnostics.
#[derive(Debug)]
pub enum Sample<T> {
    Ready(T),
    Pending { observed: String },
}

impl<T> Sample<T> {
    /// Pending with a displayable last-observed value.
    pub fn pending(observed: impl ToString) -> Self {
        Sample::Pending {
            observed: observed.to_string(),
        }
    }
}

/// Re-invoke `sample` until it yields [`Sample::Ready`] or the deadline
/// elapses, then fail with [`HarnessError::ConditionTimeout`] carrying the
/// last observed value.
///
/// Absence-class errors from the sample (`ElementNotFound`,
/// `ElementNotVisible`) are treated as pending attempts: the element may
/// simply not have appeared yet. All other errors are harness faults and
/// propagate immediately. The sample itself must be free of side effects
/// beyond the read it performs.
pub async fn poll_for<T, F, Fut>(
    cfg: &PollConfig,
    condition: &str,
    mut sample: F,
) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Sample<T>>>,
{
    let deadline = Instant::now() + cfg.deadline;
    let mut last_observed = String::from("<never sampled>");
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        match sample().await {
            Ok(Sample::Ready(value)) => {
                trace!(condition, attempts, "condition satisfied");
                return Ok(value);
            }
            Ok(Sample::Pending { observed }) => {
                last_observed = observed;
            }
            Err(e @ (HarnessError::ElementNotFound(_) | HarnessError::ElementNotVisible(_))) => {
                last_observed = e.to_string();
            }
            Err(e) => return Err(e),
        }

        if Instant::now() >= deadline {
            return Err(HarnessError::ConditionTimeout {
                condition: condition.to_string(),
                last_observed,
            });
        }
        sleep(cfg.interval).await;
    }
}

/// [`poll_for`] for conditions that carry no value.
pub async fn poll_until<F, Fut>(cfg: &PollConfig, condition: &str, sample: F) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Sample<()>>>,
{
    poll_for(cfg, condition, sample).await
}

/// A bounded fixed wait for effects with no observable indicator.
///
/// This is an accepted, explicitly flagged deviation from the polling
/// policy. The reason is logged at WARN so the suite output shows every
/// place still relying on one; each use should name the missing indicator
/// so it can be replaced once one exists.
pub async fn degraded_wait(reason: &str, duration: Duration) {
    warn!(
        "degraded wait {}ms (no reliable indicator): {}",
        duration.as_millis(),
        reason
    );
    sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PollConfig {
        PollConfig::new(Duration::from_millis(10), Duration::from_millis(200))
    }

    #[tokio::test(start_paused = true)]
    async fn satisfied_after_retries() {
        let mut calls = 0u32;
        let result = poll_for(&fast(), "third attempt succeeds", || {
            calls += 1;
            let n = calls;
            async move {
                if n >= 3 {
                    Ok(Sample::Ready(n))
                } else {
                    Ok(Sample::pending(n))
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_carries_last_observed() {
        let err = poll_until(&fast(), "never true", || async {
            Ok(Sample::<()>::pending("align=left"))
        })
        .await
        .unwrap_err();

        match err {
            HarnessError::ConditionTimeout {
                condition,
                last_observed,
            } => {
                assert_eq!(condition, "never true");
                assert_eq!(last_observed, "align=left");
            }
            other => panic!("expected ConditionTimeout, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn absent_element_is_retried_not_fatal() {
        let mut calls = 0u32;
        let result = poll_until(&fast(), "marker appears", || {
            calls += 1;
            let n = calls;
            async move {
                if n >= 2 {
                    Ok(Sample::Ready(()))
                } else {
                    Err(HarnessError::ElementNotFound(
                        ".leaflet-selection-marker-end".into(),
                    ))
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn harness_fault_aborts_polling() {
        let mut calls = 0u32;
        let err = poll_until(&fast(), "aborts", || {
            calls += 1;
            async move {
                Err::<Sample<()>, _>(HarnessError::InputDispatch("socket closed".into()))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, HarnessError::InputDispatch(_)));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_wait_sleeps_for_duration() {
        let start = Instant::now();
        degraded_wait("stacked text has no proxy", Duration::from_millis(500)).await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
