use chrono::{DateTime, Utc};

use crate::domain::{ChatId, MessageId, UserId};

/// Resolved handle to a channel/chat. Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub id: ChatId,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl Entity {
    /// Human-readable name used as `source_name` when persisting results.
    pub fn display_name(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        if let Some(username) = self.username.as_deref() {
            return format!("@{username}");
        }
        self.id.0.to_string()
    }
}

/// Raw platform user object (participant row or resolved profile).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub premium: bool,
    pub phone: Option<String>,
    /// Last time the user was seen online, when the platform discloses it.
    pub was_online: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// One page of a participant listing.
#[derive(Clone, Debug, Default)]
pub struct ParticipantPage {
    pub users: Vec<UserProfile>,
}

/// A channel post or a reply in a discussion thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub date: DateTime<Utc>,
    pub sender: Option<UserId>,
    pub text: String,
    /// Number of replies in the post's discussion thread (0 for replies).
    pub reply_count: u32,
    pub reply_to: Option<MessageId>,
}
