use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    collect::{ensure_not_cancelled, last_seen::format_last_seen, CollectionResult, ItemOutcome},
    domain::{MessageId, UserId},
    errors::Error,
    platform::{
        governor::Governor,
        port::PlatformClient,
        types::{Entity, Message, UserProfile},
    },
    utils::truncate_text,
    Result,
};

/// Largest message batch requested per history call.
pub const MESSAGE_BATCH_MAX: u32 = 100;
/// Replies scanned per thread. Longer threads are truncated and reported in
/// [`CommentStats::truncated_threads`].
pub const REPLY_CAP: u32 = 100;
const POST_EXCERPT_LEN: usize = 100;

/// Where an author's first folded reply was found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentContext {
    pub post_id: MessageId,
    pub post_date: DateTime<Utc>,
    pub post_excerpt: String,
    /// Sender of the post, when the platform exposes one.
    pub post_author: Option<UserId>,
    pub post_author_username: Option<String>,
    pub comment_id: MessageId,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

/// A unique reply author aggregated across every thread scanned in one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commenter {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub premium: bool,
    pub phone: Option<String>,
    pub last_seen: Option<String>,
    pub comment_count: u32,
    pub last_comment_date: DateTime<Utc>,
    pub first_comment: CommentContext,
}

impl Commenter {
    fn first(
        profile: &UserProfile,
        post: &Message,
        post_author: Option<&UserProfile>,
        reply: &Message,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            premium: profile.premium,
            phone: profile.phone.clone(),
            last_seen: format_last_seen(profile.was_online, now),
            comment_count: 1,
            last_comment_date: reply.date,
            first_comment: CommentContext {
                post_id: post.id,
                post_date: post.date,
                post_excerpt: truncate_text(&post.text, POST_EXCERPT_LEN),
                post_author: post_author.map(|a| a.id),
                post_author_username: post_author.and_then(|a| a.username.clone()),
                comment_id: reply.id,
                text: reply.text.clone(),
                reply_to: reply.reply_to,
            },
        }
    }

    /// Fold another reply by the same author. `last_comment_date` never regresses.
    fn fold(&mut self, reply: &Message) {
        self.comment_count += 1;
        if reply.date > self.last_comment_date {
            self.last_comment_date = reply.date;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentStats {
    pub messages_processed: u32,
    /// Replies folded into a commenter record.
    pub total_comments_processed: u32,
    /// Replies without a sender or whose author could not be resolved.
    pub replies_skipped: u32,
    /// Posts whose reply thread could not be fetched.
    pub messages_skipped: u32,
    /// Posts whose thread had more replies than [`REPLY_CAP`].
    pub truncated_threads: Vec<MessageId>,
    /// `resolve_user` calls issued (at most one per unique author).
    pub profile_lookups: u32,
}

impl CommentStats {
    pub fn truncated(&self) -> bool {
        !self.truncated_threads.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct CommentRun {
    pub entity: Entity,
    pub result: CollectionResult<Commenter>,
    pub stats: CommentStats,
}

/// Per-run memo of `resolve_user`, including authors whose lookup failed.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: HashMap<UserId, Option<UserProfile>>,
    lookups: u32,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookups(&self) -> u32 {
        self.lookups
    }

    pub async fn resolve(
        &mut self,
        platform: &dyn PlatformClient,
        governor: &Governor,
        id: UserId,
    ) -> Result<UserProfile> {
        if let Some(entry) = self.entries.get(&id) {
            return entry.clone().ok_or_else(|| {
                Error::resolution(id.0.to_string(), "profile lookup already failed in this run")
            });
        }

        self.lookups += 1;
        match governor
            .with_retry("resolve_user", move || platform.resolve_user(id))
            .await
        {
            Ok(profile) => {
                self.entries.insert(id, Some(profile.clone()));
                Ok(profile)
            }
            Err(e) if e.is_item_scoped() => {
                self.entries.insert(id, None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

/// Insertion-ordered, unique-by-author accumulator.
#[derive(Debug, Default)]
struct Authors {
    order: Vec<Commenter>,
    index: HashMap<UserId, usize>,
}

impl Authors {
    fn get_mut(&mut self, id: UserId) -> Option<&mut Commenter> {
        let idx = *self.index.get(&id)?;
        self.order.get_mut(idx)
    }

    fn insert(&mut self, commenter: Commenter) {
        self.index.insert(commenter.id, self.order.len());
        self.order.push(commenter);
    }
}

/// Walks a channel's history and reply threads, merging reply authors.
pub struct CommentCollector<'a> {
    platform: &'a dyn PlatformClient,
    governor: &'a Governor,
    cancel: Option<CancellationToken>,
    now: Option<DateTime<Utc>>,
}

impl<'a> CommentCollector<'a> {
    pub fn new(platform: &'a dyn PlatformClient, governor: &'a Governor) -> Self {
        Self {
            platform,
            governor,
            cancel: None,
            now: None,
        }
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Pin the reference time used for last-seen derivation.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub async fn collect(&self, entity: &Entity, message_limit: Option<u32>) -> Result<CommentRun> {
        let now = self.now.unwrap_or_else(Utc::now);
        let platform = self.platform;
        let batch_size = message_limit
            .unwrap_or(MESSAGE_BATCH_MAX)
            .clamp(1, MESSAGE_BATCH_MAX);
        let limit_reached = |processed: u32| message_limit.is_some_and(|l| processed >= l);

        let mut authors = Authors::default();
        let mut profiles = ProfileCache::new();
        let mut stats = CommentStats::default();
        let mut offset_id = MessageId(0);

        'batches: loop {
            ensure_not_cancelled(self.cancel.as_ref())?;
            if limit_reached(stats.messages_processed) {
                break;
            }

            let batch = self
                .governor
                .with_retry("list_messages", move || {
                    platform.list_messages(entity, offset_id, batch_size)
                })
                .await?;
            let Some(last) = batch.last().map(|m| m.id) else {
                break;
            };

            for post in &batch {
                ensure_not_cancelled(self.cancel.as_ref())?;
                if limit_reached(stats.messages_processed) {
                    break 'batches;
                }
                stats.messages_processed += 1;
                if post.reply_count == 0 {
                    continue;
                }

                let thread = self.fetch_thread(entity, post, &mut stats).await;
                let replies = match ItemOutcome::from(thread) {
                    ItemOutcome::Done(replies) => replies,
                    ItemOutcome::Skip(e) => {
                        warn!(post_id = post.id.0, error = %e, "skipping post: replies unavailable");
                        stats.messages_skipped += 1;
                        continue;
                    }
                    ItemOutcome::Fatal(e) => return Err(e),
                };

                let post_author = match post.sender {
                    Some(author) if !replies.is_empty() => {
                        let lookup = profiles.resolve(platform, self.governor, author).await;
                        match ItemOutcome::from(lookup) {
                            ItemOutcome::Done(profile) => Some(profile),
                            ItemOutcome::Skip(e) => {
                                debug!(post_id = post.id.0, author = author.0, error = %e, "post author unavailable");
                                None
                            }
                            ItemOutcome::Fatal(e) => return Err(e),
                        }
                    }
                    _ => None,
                };

                for reply in &replies {
                    let Some(sender) = reply.sender else {
                        stats.replies_skipped += 1;
                        continue;
                    };

                    let lookup = profiles.resolve(platform, self.governor, sender).await;
                    let profile = match ItemOutcome::from(lookup) {
                        ItemOutcome::Done(profile) => profile,
                        ItemOutcome::Skip(e) => {
                            debug!(comment_id = reply.id.0, sender = sender.0, error = %e, "skipping reply");
                            stats.replies_skipped += 1;
                            continue;
                        }
                        ItemOutcome::Fatal(e) => return Err(e),
                    };

                    match authors.get_mut(profile.id) {
                        Some(existing) => existing.fold(reply),
                        None => authors.insert(Commenter::first(
                            &profile,
                            post,
                            post_author.as_ref(),
                            reply,
                            now,
                        )),
                    }
                    stats.total_comments_processed += 1;
                }
            }

            debug!(
                chat_id = entity.id.0,
                offset_id = offset_id.0,
                batch = batch.len(),
                authors = authors.order.len(),
                "message batch processed"
            );

            if offset_id.0 != 0 && last >= offset_id {
                warn!(
                    offset_id = offset_id.0,
                    last = last.0,
                    "message cursor did not advance; stopping"
                );
                break;
            }
            offset_id = last;
        }

        stats.profile_lookups = profiles.lookups();
        info!(
            chat_id = entity.id.0,
            commenters = authors.order.len(),
            messages = stats.messages_processed,
            comments = stats.total_comments_processed,
            truncated_threads = stats.truncated_threads.len(),
            "comment collection finished"
        );

        Ok(CommentRun {
            entity: entity.clone(),
            result: CollectionResult::new(authors.order),
            stats,
        })
    }

    async fn fetch_thread(
        &self,
        entity: &Entity,
        post: &Message,
        stats: &mut CommentStats,
    ) -> Result<Vec<Message>> {
        let platform = self.platform;
        let post_id = post.id;
        let mut replies = self
            .governor
            .with_retry("list_replies", move || {
                platform.list_replies(entity, post_id, REPLY_CAP)
            })
            .await?;

        let cap = REPLY_CAP as usize;
        if post.reply_count > REPLY_CAP || replies.len() > cap {
            warn!(
                post_id = post_id.0,
                reply_count = post.reply_count,
                cap,
                "reply thread truncated"
            );
            stats.truncated_threads.push(post_id);
            replies.truncate(cap);
        }
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::fake::{channel, post, reply, ts, user, FakePlatform};
    use crate::platform::governor::tests::RecordingSleeper;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn governor() -> (Arc<RecordingSleeper>, Governor) {
        let clock = Arc::new(RecordingSleeper::default());
        (clock.clone(), Governor::new(clock))
    }

    fn by_id(run: &CommentRun, id: i64) -> &Commenter {
        run.result
            .items()
            .iter()
            .find(|c| c.id == UserId(id))
            .unwrap()
    }

    #[tokio::test]
    async fn merges_authors_across_threads() {
        let platform = FakePlatform::new()
            .with_posts(vec![post(10, 2), post(9, 0), post(8, 3)])
            .with_replies(10, vec![reply(100, 10, Some(1), 50), reply(101, 10, Some(2), 60)])
            .with_replies(
                8,
                vec![
                    reply(80, 8, Some(1), 70),
                    reply(81, 8, Some(1), 20),
                    reply(82, 8, None, 30),
                ],
            )
            .with_users(vec![user(1), user(2)]);
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        let ids: Vec<i64> = run.result.items().iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        let first = by_id(&run, 1);
        assert_eq!(first.comment_count, 3);
        assert_eq!(first.last_comment_date, ts(70));
        assert_eq!(first.first_comment.comment_id, MessageId(100));
        assert_eq!(first.first_comment.post_id, MessageId(10));
        assert_eq!(by_id(&run, 2).comment_count, 1);

        assert_eq!(run.stats.messages_processed, 3);
        assert_eq!(run.stats.total_comments_processed, 4);
        assert_eq!(run.stats.replies_skipped, 1);
        assert_eq!(run.stats.profile_lookups, 2);
        assert_eq!(platform.count_calls("resolve_user"), 2);
        // The post without replies never asks for a thread.
        assert_eq!(platform.count_calls("list_replies"), 2);
    }

    #[tokio::test]
    async fn counts_match_replies_and_ids_are_unique() {
        let senders = [3, 1, 3, 2, 1, 3, 3, 2];
        let replies: Vec<_> = senders
            .iter()
            .enumerate()
            .map(|(i, s)| reply(200 + i as i32, 20, Some(*s), i as i64))
            .collect();
        let platform = FakePlatform::new()
            .with_posts(vec![post(20, senders.len() as u32)])
            .with_replies(20, replies)
            .with_users(vec![user(1), user(2), user(3)]);
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        let unique: HashSet<_> = run.result.items().iter().map(|c| c.id).collect();
        assert_eq!(unique.len(), run.result.total_count());
        for c in run.result.items() {
            let expected = senders.iter().filter(|s| **s == c.id.0).count() as u32;
            assert_eq!(c.comment_count, expected);
        }
        assert_eq!(by_id(&run, 3).last_comment_date, ts(6));
    }

    #[test]
    fn last_comment_date_never_regresses() {
        let p = post(1, 3);
        let mut c = Commenter::first(&user(1), &p, None, &reply(10, 1, Some(1), 100), ts(0));
        let mut seen = vec![c.last_comment_date];
        for (id, at) in [(11, 50), (12, 300), (13, 200)] {
            c.fold(&reply(id, 1, Some(1), at));
            seen.push(c.last_comment_date);
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(c.last_comment_date, ts(300));
        assert_eq!(c.comment_count, 4);
    }

    #[tokio::test]
    async fn long_thread_is_capped_and_reported() {
        let replies = (0..150)
            .map(|i| reply(1000 + i, 5, Some(i as i64 + 1), i as i64))
            .collect();
        let platform = FakePlatform::new()
            .with_posts(vec![post(5, 150)])
            .with_replies(5, replies)
            .with_users((1..=150).map(user).collect());
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        assert_eq!(run.stats.total_comments_processed, 100);
        assert_eq!(run.result.total_count(), 100);
        assert!(run.stats.truncated());
        assert_eq!(run.stats.truncated_threads, vec![MessageId(5)]);
    }

    #[tokio::test]
    async fn failed_thread_and_unknown_author_are_skipped() {
        let platform = FakePlatform::new()
            .with_posts(vec![post(3, 1), post(2, 2)])
            .with_failing_thread(3)
            .with_replies(
                2,
                vec![
                    reply(21, 2, Some(404), 1),
                    reply(22, 2, Some(404), 2),
                    reply(23, 2, Some(1), 3),
                ],
            )
            .with_users(vec![user(1)]);
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        assert_eq!(run.result.total_count(), 1);
        assert_eq!(run.stats.messages_skipped, 1);
        assert_eq!(run.stats.replies_skipped, 2);
        // The failing author is looked up once, not per reply.
        assert_eq!(platform.count_calls("resolve_user(404)"), 1);
    }

    #[tokio::test]
    async fn message_limit_stops_early() {
        let platform = FakePlatform::new()
            .with_posts((1..=5).map(|id| post(id, 1)).collect())
            .with_replies(5, vec![reply(50, 5, Some(1), 1)])
            .with_replies(4, vec![reply(40, 4, Some(2), 1)])
            .with_replies(3, vec![reply(30, 3, Some(3), 1)])
            .with_users(vec![user(1), user(2), user(3)]);
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), Some(2))
            .await
            .unwrap();

        assert_eq!(run.stats.messages_processed, 2);
        let ids: Vec<i64> = run.result.items().iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(platform.calls()[0], "list_messages(0,2)");
        assert_eq!(platform.count_calls("list_messages"), 1);
    }

    #[tokio::test]
    async fn walks_batches_until_history_is_exhausted() {
        let platform = FakePlatform::new()
            .with_posts((1..=250).map(|id| post(id, 0)).collect());
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        assert!(run.result.is_empty());
        assert_eq!(run.stats.messages_processed, 250);
        assert_eq!(
            platform.calls(),
            vec![
                "list_messages(0,100)",
                "list_messages(151,100)",
                "list_messages(51,100)",
                "list_messages(1,100)",
            ]
        );
    }

    #[tokio::test]
    async fn rate_limits_at_every_level_keep_accumulated_state() {
        let platform = FakePlatform::new()
            .with_posts(vec![post(2, 1), post(1, 1)])
            .with_replies(2, vec![reply(20, 2, Some(1), 1)])
            .with_replies(1, vec![reply(10, 1, Some(1), 5), reply(11, 1, Some(2), 6)])
            .with_users(vec![user(1), user(2)])
            .rate_limit_next("list_messages", 1)
            .rate_limit_next("list_replies", 2)
            .rate_limit_next("resolve_user", 4);
        let (clock, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        assert_eq!(by_id(&run, 1).comment_count, 2);
        assert_eq!(by_id(&run, 2).comment_count, 1);
        assert_eq!(clock.total(), Duration::from_secs(7));
        assert_eq!(gov.wait_count(), 3);
        // Retried calls are the same call, not a restart of the run.
        assert_eq!(platform.count_calls("list_messages(0,"), 2);
    }

    #[tokio::test]
    async fn post_author_is_attached_and_looked_up_once() {
        let mut signed = post(5, 2);
        signed.sender = Some(UserId(9));
        let mut other = post(4, 1);
        other.sender = Some(UserId(9));
        let platform = FakePlatform::new()
            .with_posts(vec![signed, other])
            .with_replies(5, vec![reply(50, 5, Some(1), 1), reply(51, 5, Some(2), 2)])
            .with_replies(4, vec![reply(40, 4, Some(3), 3)])
            .with_users(vec![user(1), user(2), user(3), user(9)]);
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        let ctx = &by_id(&run, 1).first_comment;
        assert_eq!(ctx.post_author, Some(UserId(9)));
        assert_eq!(ctx.post_author_username.as_deref(), Some("user9"));
        assert_eq!(by_id(&run, 3).first_comment.post_author, Some(UserId(9)));
        assert_eq!(platform.count_calls("resolve_user(9)"), 1);
        assert_eq!(run.stats.profile_lookups, 4);
    }

    #[tokio::test]
    async fn unresolvable_post_author_leaves_context_empty() {
        let mut signed = post(5, 1);
        signed.sender = Some(UserId(404));
        let platform = FakePlatform::new()
            .with_posts(vec![signed])
            .with_replies(5, vec![reply(50, 5, Some(1), 1)])
            .with_users(vec![user(1)]);
        let (_, gov) = governor();

        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();

        assert_eq!(run.result.total_count(), 1);
        assert_eq!(by_id(&run, 1).first_comment.post_author, None);
        assert_eq!(run.stats.replies_skipped, 0);
    }

    #[tokio::test]
    async fn history_failure_propagates_unchanged() {
        let platform = FakePlatform::new()
            .with_posts(vec![post(1, 0)])
            .fail_next("list_messages", Error::Platform("CHANNEL_PRIVATE".to_string()));
        let (clock, gov) = governor();

        let err = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Platform(ref m) if m == "CHANNEL_PRIVATE"));
        assert!(clock.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_level_error_from_thread_aborts() {
        let platform = FakePlatform::new()
            .with_posts(vec![post(2, 1), post(1, 1)])
            .with_replies(2, vec![reply(20, 2, Some(1), 1)])
            .with_replies(1, vec![reply(10, 1, Some(1), 1)])
            .with_users(vec![user(1)])
            .fail_next(
                "list_replies",
                Error::Unauthorized("session revoked".to_string()),
            );
        let (_, gov) = governor();

        let err = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(platform.count_calls("list_replies"), 1);
        assert_eq!(platform.count_calls("resolve_user"), 0);
    }

    #[tokio::test]
    async fn run_level_error_from_profile_lookup_aborts() {
        let platform = FakePlatform::new()
            .with_posts(vec![post(2, 1), post(1, 1)])
            .with_replies(2, vec![reply(20, 2, Some(1), 1)])
            .with_replies(1, vec![reply(10, 1, Some(2), 1)])
            .with_users(vec![user(1), user(2)])
            .fail_next(
                "resolve_user",
                Error::Unauthorized("session revoked".to_string()),
            );
        let (_, gov) = governor();

        let err = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(platform.count_calls("list_replies"), 1);
    }

    #[tokio::test]
    async fn cancel_is_checked_between_posts() {
        let token = CancellationToken::new();
        let platform = FakePlatform::new()
            .with_posts(vec![post(3, 1), post(2, 1), post(1, 1)])
            .with_replies(3, vec![reply(30, 3, Some(1), 1)])
            .with_replies(2, vec![reply(20, 2, Some(1), 1)])
            .with_replies(1, vec![reply(10, 1, Some(1), 1)])
            .with_users(vec![user(1)])
            .cancel_after("list_replies(3)", token.clone());
        let (_, gov) = governor();

        let err = CommentCollector::new(&platform, &gov)
            .cancel_token(token)
            .collect(&channel(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(platform.count_calls("list_messages"), 1);
        assert_eq!(platform.count_calls("list_replies"), 1);
    }

    #[tokio::test]
    async fn stalled_cursor_stops_the_walk() {
        struct Stuck(FakePlatform);

        #[async_trait::async_trait]
        impl PlatformClient for Stuck {
            async fn resolve(&self, identifier: &str) -> Result<Entity> {
                self.0.resolve(identifier).await
            }
            async fn list_participants(
                &self,
                entity: &Entity,
                offset: u32,
                limit: u32,
            ) -> Result<crate::platform::types::ParticipantPage> {
                self.0.list_participants(entity, offset, limit).await
            }
            async fn list_messages(
                &self,
                _entity: &Entity,
                _offset_id: MessageId,
                _limit: u32,
            ) -> Result<Vec<Message>> {
                Ok(vec![post(7, 0)])
            }
            async fn list_replies(
                &self,
                entity: &Entity,
                message: MessageId,
                limit: u32,
            ) -> Result<Vec<Message>> {
                self.0.list_replies(entity, message, limit).await
            }
            async fn resolve_user(&self, id: UserId) -> Result<UserProfile> {
                self.0.resolve_user(id).await
            }
        }

        let platform = Stuck(FakePlatform::new());
        let (_, gov) = governor();
        let run = CommentCollector::new(&platform, &gov)
            .collect(&channel(), None)
            .await
            .unwrap();
        assert_eq!(run.stats.messages_processed, 2);
    }
}
