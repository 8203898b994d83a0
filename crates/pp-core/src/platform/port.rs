use async_trait::async_trait;

use crate::{
    domain::{MessageId, UserId},
    platform::types::{Entity, Message, ParticipantPage, UserProfile},
    Result,
};

/// Hexagonal port for the messaging platform.
///
/// Every method may fail with `Error::RateLimited { retry_after_secs }` or
/// `Error::Platform(..)`. Implementations must tolerate concurrent calls from
/// independent runs, or callers must serialize runs externally.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<Entity>;

    async fn list_participants(
        &self,
        entity: &Entity,
        offset: u32,
        limit: u32,
    ) -> Result<ParticipantPage>;

    /// Messages strictly older than `offset_id`, newest first.
    /// `MessageId(0)` starts from the most recent message.
    async fn list_messages(
        &self,
        entity: &Entity,
        offset_id: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>>;

    async fn list_replies(
        &self,
        entity: &Entity,
        message: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>>;

    async fn resolve_user(&self, id: UserId) -> Result<UserProfile>;
}
