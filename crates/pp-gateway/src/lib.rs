//! HTTP gateway adapter for the messaging platform.
//!
//! Talks to a user-account gateway exposing the platform over JSON:
//!
//! - `GET /entities/resolve?q=<name>`
//! - `GET /entities/<id>/participants?offset=&limit=`
//! - `GET /entities/<id>/messages?offset_id=&limit=`
//! - `GET /entities/<id>/messages/<msg>/replies?limit=`
//! - `GET /users/<id>`
//!
//! Flood-waits arrive as HTTP 429 (or a `FLOOD_WAIT_<n>` error code) and are
//! surfaced as `Error::RateLimited` for the core governor to absorb.

use std::{sync::OnceLock, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pp_core::{
    domain::{ChatId, MessageId, UserId},
    errors::Error,
    platform::{
        port::PlatformClient,
        types::{Entity, Message, ParticipantPage, UserProfile},
    },
    Result,
};
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct GatewayClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("gateway client build error: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "gateway request");

        let mut req = self.http.get(&url).query(query);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::External(format!("gateway request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.text().await.unwrap_or_default();
            return Err(map_error(status.as_u16(), retry_after.as_deref(), &body));
        }

        resp.json()
            .await
            .map_err(|e| Error::External(format!("gateway json error: {e}")))
    }
}

#[async_trait]
impl PlatformClient for GatewayClient {
    async fn resolve(&self, identifier: &str) -> Result<Entity> {
        let wire: WireEntity = self
            .get_json("/entities/resolve", &[("q", identifier.to_string())])
            .await?;
        Ok(wire.into())
    }

    async fn list_participants(
        &self,
        entity: &Entity,
        offset: u32,
        limit: u32,
    ) -> Result<ParticipantPage> {
        let wire: WireParticipants = self
            .get_json(
                &format!("/entities/{}/participants", entity.id.0),
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(ParticipantPage {
            users: wire.users.into_iter().map(UserProfile::from).collect(),
        })
    }

    async fn list_messages(
        &self,
        entity: &Entity,
        offset_id: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let wire: WireMessages = self
            .get_json(
                &format!("/entities/{}/messages", entity.id.0),
                &[
                    ("offset_id", offset_id.0.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        wire.messages.into_iter().map(Message::try_from).collect()
    }

    async fn list_replies(
        &self,
        entity: &Entity,
        message: MessageId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let wire: WireMessages = self
            .get_json(
                &format!("/entities/{}/messages/{}/replies", entity.id.0, message.0),
                &[("limit", limit.to_string())],
            )
            .await?;
        wire.messages.into_iter().map(Message::try_from).collect()
    }

    async fn resolve_user(&self, id: UserId) -> Result<UserProfile> {
        let wire: WireUser = self.get_json(&format!("/users/{}", id.0), &[]).await?;
        Ok(wire.into())
    }
}

// ============== Wire format ==============

#[derive(Debug, Deserialize)]
struct WireEntity {
    id: i64,
    title: Option<String>,
    username: Option<String>,
}

impl From<WireEntity> for Entity {
    fn from(w: WireEntity) -> Self {
        Entity {
            id: ChatId(w.id),
            title: w.title,
            username: w.username,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    premium: bool,
    phone: Option<String>,
    /// Unix seconds; absent when the user hides their status.
    was_online: Option<i64>,
}

impl From<WireUser> for UserProfile {
    fn from(w: WireUser) -> Self {
        UserProfile {
            id: UserId(w.id),
            username: w.username,
            first_name: w.first_name,
            last_name: w.last_name,
            premium: w.premium,
            phone: w.phone,
            was_online: w.was_online.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireParticipants {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: i32,
    date: i64,
    sender_id: Option<i64>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    reply_count: u32,
    reply_to: Option<i32>,
}

impl TryFrom<WireMessage> for Message {
    type Error = Error;

    fn try_from(w: WireMessage) -> Result<Self> {
        let date = DateTime::<Utc>::from_timestamp(w.date, 0)
            .ok_or_else(|| Error::Platform(format!("message {} has invalid date {}", w.id, w.date)))?;
        Ok(Message {
            id: MessageId(w.id),
            date,
            sender: w.sender_id.map(UserId),
            text: w.text,
            reply_count: w.reply_count,
            reply_to: w.reply_to.map(MessageId),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireMessages {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct WireError {
    error: Option<String>,
    retry_after: Option<u64>,
}

fn flood_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"FLOOD_WAIT_(\d+)").expect("valid regex"))
}

/// Map a non-success gateway response onto the core error type.
fn map_error(status: u16, retry_after_header: Option<&str>, body: &str) -> Error {
    let wire: WireError = serde_json::from_str(body).unwrap_or_default();
    let code = wire.error.clone().unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {status}")
        } else {
            trimmed.chars().take(200).collect()
        }
    });

    let flood_secs = flood_re()
        .captures(&code)
        .and_then(|caps| caps[1].parse::<u64>().ok());

    if status == 429 || flood_secs.is_some() {
        let retry_after_secs = wire
            .retry_after
            .or(flood_secs)
            .or_else(|| retry_after_header.and_then(|h| h.trim().parse::<u64>().ok()))
            .unwrap_or(1);
        return Error::RateLimited { retry_after_secs };
    }

    match status {
        401 | 403 => Error::Unauthorized(format!("gateway rejected credentials: {code}")),
        404 => Error::NotFound(code),
        _ => Error::Platform(code),
    }
}
