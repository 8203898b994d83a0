//! Rate-limit governor.
//!
//! Wraps a single platform call: when the platform answers with a flood-wait
//! (`Error::RateLimited`), the current flow is suspended for exactly the
//! mandated duration and the *same* call is issued again. Any other outcome is
//! returned unchanged.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{errors::Error, Result};

// Only bounds the displayed resume time; the wait itself is never capped.
const MAX_NOTICE_SECS: u64 = 365 * 24 * 3600;

/// Suspension primitive. Production code uses [`TokioSleeper`]; tests inject a
/// simulated clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Published right before the governor starts waiting.
#[derive(Clone, Debug)]
pub struct RateLimitNotice {
    /// Label of the wrapped call (e.g. `list_participants`).
    pub operation: String,
    pub retry_after: Duration,
    /// 1-based count of consecutive rate limits for this call.
    pub attempt: u32,
    pub resume_at: DateTime<Local>,
}

/// Hook for surfacing "waiting N seconds" status to a caller.
pub trait RateLimitObserver: Send + Sync {
    fn on_wait(&self, notice: &RateLimitNotice);
}

impl<F> RateLimitObserver for F
where
    F: Fn(&RateLimitNotice) + Send + Sync,
{
    fn on_wait(&self, notice: &RateLimitNotice) {
        self(notice)
    }
}

pub struct Governor {
    sleeper: Arc<dyn Sleeper>,
    observer: Option<Arc<dyn RateLimitObserver>>,
    cancel: Option<CancellationToken>,
    waited_ms: AtomicU64,
    waits: AtomicU32,
}

impl Governor {
    pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            sleeper,
            observer: None,
            cancel: None,
            waited_ms: AtomicU64::new(0),
            waits: AtomicU32::new(0),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RateLimitObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// A fired token interrupts a pending wait with `Error::Cancelled`.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Total time spent suspended by this governor.
    pub fn total_waited(&self) -> Duration {
        Duration::from_millis(self.waited_ms.load(Ordering::SeqCst))
    }

    /// Number of rate-limit suspensions so far.
    pub fn wait_count(&self) -> u32 {
        self.waits.load(Ordering::SeqCst)
    }

    /// Invoke `op`, re-invoking it after each rate-limit wait until it
    /// succeeds or fails for another reason.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Err(Error::RateLimited { retry_after_secs }) => {
                    attempt += 1;
                    let retry_after = Duration::from_secs(retry_after_secs);
                    let notice = RateLimitNotice {
                        operation: operation.to_string(),
                        retry_after,
                        attempt,
                        resume_at: Local::now()
                            + chrono::Duration::seconds(retry_after_secs.min(MAX_NOTICE_SECS) as i64),
                    };
                    warn!(
                        operation,
                        retry_after_secs,
                        attempt,
                        resume_at = %notice.resume_at.format("%H:%M:%S"),
                        "rate limited by platform; waiting"
                    );
                    if let Some(observer) = &self.observer {
                        observer.on_wait(&notice);
                    }

                    let sleep = self.sleeper.sleep(retry_after);
                    match &self.cancel {
                        Some(token) => tokio::select! {
                            _ = sleep => {}
                            _ = token.cancelled() => {
                                warn!(operation, attempt, "rate-limit wait cancelled");
                                return Err(Error::Cancelled);
                            }
                        },
                        None => sleep.await,
                    }
                    self.waits.fetch_add(1, Ordering::SeqCst);
                    self.waited_ms
                        .fetch_add(retry_after.as_millis() as u64, Ordering::SeqCst);
                }
                other => return other,
            }
        }
    }
}
