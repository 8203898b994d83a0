use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{MessageId, UserId},
    platform::{
        port::PlatformClient,
        types::{Entity, Message, ParticipantPage, UserProfile},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between any two platform calls.
    pub min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(50), // ~20/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// PlatformClient decorator that spaces out outbound calls.
///
/// Reduces how often the platform answers with a flood-wait; it does not
/// replace the governor, which still handles the waits that do happen.
pub struct ThrottledPlatform {
    inner: Arc<dyn PlatformClient>,
    limiter: Mutex<IntervalLimiter>,
}

impl ThrottledPlatform {
    pub fn new(inner: Arc<dyn PlatformClient>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            limiter: Mutex::new(IntervalLimiter::new(cfg.min_interval)),
        }
    }

    async fn throttle(&self) {
        let wait = { self.limiter.lock().await.reserve_at(Instant::now()) };
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl PlatformClient for ThrottledPlatform {
    async fn resolve(&self, identifier: &str) -> Result<Entity> {
        self.throttle().await;
        self.inner.resolve(identifier).await
    }

    async fn list_participants(
        &self,
        entity: &Entity,
        offset: u32,
        limit: u32,
    ) -> Result<ParticipantPage> {
        self.throttle().await;
        self.inner.list_participants(entity, offset, limit).await
    }

    async fn list_messages(
        &self,
        entity: &Entity,
        offset_id: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.throttle().await;
        self.inner.list_messages(entity, offset_id, limit).await
    }

    async fn list_replies(
        &self,
        entity: &Entity,
        message: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.throttle().await;
        self.inner.list_replies(entity, message, limit).await
    }

    async fn resolve_user(&self, id: UserId) -> Result<UserProfile> {
        self.throttle().await;
        self.inner.resolve_user(id).await
    }
}
