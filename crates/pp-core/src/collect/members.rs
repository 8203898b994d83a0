use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    collect::{
        ensure_not_cancelled,
        last_seen::{format_last_seen, hours_since},
        CollectionResult,
    },
    domain::UserId,
    platform::{
        governor::Governor,
        port::PlatformClient,
        types::{Entity, UserProfile},
    },
    Result,
};

pub const DEFAULT_PARTICIPANT_PAGE_SIZE: u32 = 100;
/// Largest participant page the platform serves.
pub const MAX_PARTICIPANT_PAGE_SIZE: u32 = 200;

/// Inclusion filters, applied in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFilters {
    pub premium_only: bool,
    pub with_phone: bool,
    /// Drop users last seen longer ago than this. `0` means no limit.
    pub max_hours_since_seen: Option<u32>,
}

impl MemberFilters {
    pub fn admits(&self, user: &UserProfile, now: DateTime<Utc>) -> bool {
        if self.premium_only && !user.premium {
            return false;
        }
        if self.with_phone && !user.has_phone() {
            return false;
        }
        // Users hiding their last-seen time always pass the age filter.
        if let (Some(max_hours), Some(seen)) = (
            self.max_hours_since_seen.filter(|h| *h > 0),
            user.was_online,
        ) {
            if hours_since(seen, now) > f64::from(max_hours) {
                return false;
            }
        }
        true
    }
}

/// Frozen snapshot of a participant at collection time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub premium: bool,
    pub phone: Option<String>,
    pub last_seen: Option<String>,
}

impl Member {
    pub fn from_profile(user: &UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            premium: user.premium,
            phone: user.phone.clone(),
            last_seen: format_last_seen(user.was_online, now),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub pages_fetched: u32,
    pub users_scanned: u32,
    pub filtered_out: u32,
}

#[derive(Clone, Debug)]
pub struct MemberRun {
    pub entity: Entity,
    pub result: CollectionResult<Member>,
    pub stats: MemberStats,
}

/// Paginates a channel's participant list to completion.
pub struct MemberCollector<'a> {
    platform: &'a dyn PlatformClient,
    governor: &'a Governor,
    page_size: u32,
    cancel: Option<CancellationToken>,
    now: Option<DateTime<Utc>>,
}

impl<'a> MemberCollector<'a> {
    pub fn new(platform: &'a dyn PlatformClient, governor: &'a Governor) -> Self {
        Self {
            platform,
            governor,
            page_size: DEFAULT_PARTICIPANT_PAGE_SIZE,
            cancel: None,
            now: None,
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PARTICIPANT_PAGE_SIZE);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Pin the reference time used for last-seen derivation and filtering.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub async fn collect(&self, entity: &Entity, filters: &MemberFilters) -> Result<MemberRun> {
        let now = self.now.unwrap_or_else(Utc::now);
        let platform = self.platform;
        let page_size = self.page_size;

        let mut members = Vec::new();
        let mut stats = MemberStats::default();
        let mut offset = 0u32;

        loop {
            ensure_not_cancelled(self.cancel.as_ref())?;

            let page = self
                .governor
                .with_retry("list_participants", move || {
                    platform.list_participants(entity, offset, page_size)
                })
                .await?;
            stats.pages_fetched += 1;

            if page.users.is_empty() {
                break;
            }

            let fetched = page.users.len() as u32;
            for user in &page.users {
                stats.users_scanned += 1;
                if filters.admits(user, now) {
                    members.push(Member::from_profile(user, now));
                } else {
                    stats.filtered_out += 1;
                }
            }

            debug!(
                chat_id = entity.id.0,
                offset,
                fetched,
                kept = members.len(),
                "participant page processed"
            );

            offset += fetched;
            if fetched < page_size {
                break;
            }
        }

        info!(
            chat_id = entity.id.0,
            members = members.len(),
            scanned = stats.users_scanned,
            pages = stats.pages_fetched,
            "member collection finished"
        );

        Ok(MemberRun {
            entity: entity.clone(),
            result: CollectionResult::new(members),
            stats,
        })
    }
}
