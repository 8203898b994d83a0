//! Scripted in-memory platform shared by the collector and service tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChatId, MessageId, UserId},
    errors::Error,
    platform::{
        port::PlatformClient,
        types::{Entity, Message, ParticipantPage, UserProfile},
    },
    Result,
};

pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
}

pub(crate) fn user(id: i64) -> UserProfile {
    UserProfile {
        id: UserId(id),
        username: Some(format!("user{id}")),
        first_name: Some(format!("First{id}")),
        last_name: None,
        premium: false,
        phone: None,
        was_online: None,
    }
}

pub(crate) fn post(id: i32, reply_count: u32) -> Message {
    Message {
        id: MessageId(id),
        date: ts(id as i64 * 60),
        sender: None,
        text: format!("post {id}"),
        reply_count,
        reply_to: None,
    }
}

pub(crate) fn reply(id: i32, parent: i32, sender: Option<i64>, at: i64) -> Message {
    Message {
        id: MessageId(id),
        date: ts(at),
        sender: sender.map(UserId),
        text: format!("reply {id}"),
        reply_count: 0,
        reply_to: Some(MessageId(parent)),
    }
}

pub(crate) fn channel() -> Entity {
    Entity {
        id: ChatId(-1001),
        title: Some("Test Channel".to_string()),
        username: Some("testchan".to_string()),
    }
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    entities: HashMap<String, Entity>,
    participants: Vec<UserProfile>,
    /// Newest first.
    posts: Vec<Message>,
    replies: HashMap<MessageId, Vec<Message>>,
    failing_threads: HashSet<MessageId>,
    users: HashMap<UserId, UserProfile>,
    faults: Mutex<HashMap<&'static str, VecDeque<Error>>>,
    cancel_on: Option<(String, CancellationToken)>,
    calls: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        let mut p = Self::default();
        let chan = channel();
        p.entities.insert("testchan".to_string(), chan);
        p
    }

    pub(crate) fn with_participants(mut self, users: Vec<UserProfile>) -> Self {
        self.participants = users;
        self
    }

    pub(crate) fn with_posts(mut self, posts: Vec<Message>) -> Self {
        self.posts = posts;
        self.posts.sort_by(|a, b| b.id.cmp(&a.id));
        self
    }

    pub(crate) fn with_replies(mut self, post: i32, replies: Vec<Message>) -> Self {
        self.replies.insert(MessageId(post), replies);
        self
    }

    pub(crate) fn with_failing_thread(mut self, post: i32) -> Self {
        self.failing_threads.insert(MessageId(post));
        self
    }

    pub(crate) fn with_users(mut self, users: Vec<UserProfile>) -> Self {
        for u in users {
            self.users.insert(u.id, u);
        }
        self
    }

    /// Make the next call of `op` fail with a flood-wait of `secs`.
    pub(crate) fn rate_limit_next(self, op: &'static str, secs: u64) -> Self {
        self.fail_next(
            op,
            Error::RateLimited {
                retry_after_secs: secs,
            },
        )
    }

    /// Make the next call of `op` fail with `err`.
    pub(crate) fn fail_next(self, op: &'static str, err: Error) -> Self {
        self.faults
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(err);
        self
    }

    /// Fire `token` once a call rendered exactly as `call` has been served.
    pub(crate) fn cancel_after(mut self, call: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((call.to_string(), token));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, op: &'static str, call: String) -> Result<()> {
        if let Some((trigger, token)) = &self.cancel_on {
            if *trigger == call {
                token.cancel();
            }
        }
        self.calls.lock().unwrap().push(call);
        let pending = self
            .faults
            .lock()
            .unwrap()
            .get_mut(op)
            .and_then(|q| q.pop_front());
        match pending {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn resolve(&self, identifier: &str) -> Result<Entity> {
        self.record("resolve", format!("resolve({identifier})"))?;
        self.entities
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::Platform("USERNAME_NOT_OCCUPIED".to_string()))
    }

    async fn list_participants(
        &self,
        _entity: &Entity,
        offset: u32,
        limit: u32,
    ) -> Result<ParticipantPage> {
        self.record(
            "list_participants",
            format!("list_participants({offset},{limit})"),
        )?;
        let users = self
            .participants
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ParticipantPage { users })
    }

    async fn list_messages(
        &self,
        _entity: &Entity,
        offset_id: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.record(
            "list_messages",
            format!("list_messages({},{limit})", offset_id.0),
        )?;
        Ok(self
            .posts
            .iter()
            .filter(|m| offset_id.0 == 0 || m.id < offset_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_replies(
        &self,
        _entity: &Entity,
        message: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.record("list_replies", format!("list_replies({})", message.0))?;
        if self.failing_threads.contains(&message) {
            return Err(Error::Platform("MSG_ID_INVALID".to_string()));
        }
        Ok(self
            .replies
            .get(&message)
            .map(|r| r.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn resolve_user(&self, id: UserId) -> Result<UserProfile> {
        self.record("resolve_user", format!("resolve_user({})", id.0))?;
        self.users
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Platform("USER_ID_INVALID".to_string()))
    }
}
