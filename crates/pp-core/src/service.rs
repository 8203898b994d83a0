//! Caller-facing facade: authorization, identifier resolution, collection runs,
//! persistence and auditing.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    collect::{
        comments::{CommentCollector, CommentRun},
        members::{MemberCollector, MemberFilters, MemberRun, DEFAULT_PARTICIPANT_PAGE_SIZE},
    },
    config::Config,
    domain::Caller,
    errors::Error,
    paginate::{paginate, DEFAULT_PAGE_SIZE},
    platform::{
        governor::{Governor, RateLimitNotice, RateLimitObserver, Sleeper, TokioSleeper},
        identifier::normalize_identifier,
        port::PlatformClient,
        types::Entity,
    },
    security::ensure_authorized,
    store::{FileType, ListQuery, NewFile, RecordStore, SavedFile},
    utils::{AuditEvent, AuditLogger},
    Result,
};

#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub allowed_operators: Vec<i64>,
    pub results_page_size: usize,
    pub participant_page_size: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            allowed_operators: Vec::new(),
            results_page_size: DEFAULT_PAGE_SIZE,
            participant_page_size: DEFAULT_PARTICIPANT_PAGE_SIZE,
        }
    }
}

impl From<&Config> for ServiceSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            allowed_operators: cfg.allowed_operators.clone(),
            results_page_size: cfg.results_page_size,
            participant_page_size: cfg.participant_page_size,
        }
    }
}

/// One page of a stored result file.
#[derive(Clone, Debug)]
pub struct FileView {
    pub file: SavedFile,
    pub records: Vec<serde_json::Value>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub struct CollectionService {
    settings: ServiceSettings,
    platform: Arc<dyn PlatformClient>,
    store: Arc<dyn RecordStore>,
    sleeper: Arc<dyn Sleeper>,
    observer: Option<Arc<dyn RateLimitObserver>>,
    audit: Option<AuditLogger>,
    cancel: Option<CancellationToken>,
}

impl CollectionService {
    pub fn new(
        settings: ServiceSettings,
        platform: Arc<dyn PlatformClient>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            settings,
            platform,
            store,
            sleeper: Arc::new(TokioSleeper),
            observer: None,
            audit: None,
            cancel: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RateLimitObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Token checked by every run started from this service.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn page_size(&self) -> usize {
        self.settings.results_page_size
    }

    pub async fn collect_members(
        &self,
        caller: &Caller,
        identifier: &str,
        filters: &MemberFilters,
    ) -> Result<MemberRun> {
        ensure_authorized(caller, &self.settings.allowed_operators)?;
        let governor = self.governor();

        let outcome = async {
            let entity = self.resolve(&governor, identifier).await?;
            let mut collector = MemberCollector::new(self.platform.as_ref(), &governor)
                .page_size(self.settings.participant_page_size);
            if let Some(token) = &self.cancel {
                collector = collector.cancel_token(token.clone());
            }
            collector.collect(&entity, filters).await
        }
        .await;

        match outcome {
            Ok(run) => {
                info!(
                    operator = caller.id.0,
                    source = %run.entity.display_name(),
                    members = run.result.total_count(),
                    waited_secs = governor.total_waited().as_secs_f64(),
                    "member collection finished"
                );
                self.audit(AuditEvent::collection(
                    caller,
                    FileType::Chat.as_str(),
                    &run.entity.display_name(),
                    run.result.total_count(),
                    None,
                    governor.total_waited().as_secs_f64(),
                ));
                Ok(run)
            }
            Err(e) => {
                self.audit(AuditEvent::error(caller, &e.to_string(), Some("collect_members")));
                Err(e)
            }
        }
    }

    pub async fn collect_commenters(
        &self,
        caller: &Caller,
        identifier: &str,
        message_limit: Option<u32>,
    ) -> Result<CommentRun> {
        ensure_authorized(caller, &self.settings.allowed_operators)?;
        let governor = self.governor();

        let outcome = async {
            let entity = self.resolve(&governor, identifier).await?;
            let mut collector = CommentCollector::new(self.platform.as_ref(), &governor);
            if let Some(token) = &self.cancel {
                collector = collector.cancel_token(token.clone());
            }
            collector.collect(&entity, message_limit).await
        }
        .await;

        match outcome {
            Ok(run) => {
                info!(
                    operator = caller.id.0,
                    source = %run.entity.display_name(),
                    commenters = run.result.total_count(),
                    messages = run.stats.messages_processed,
                    waited_secs = governor.total_waited().as_secs_f64(),
                    "comment collection finished"
                );
                self.audit(AuditEvent::collection(
                    caller,
                    FileType::Comments.as_str(),
                    &run.entity.display_name(),
                    run.result.total_count(),
                    Some(run.stats.messages_processed),
                    governor.total_waited().as_secs_f64(),
                ));
                Ok(run)
            }
            Err(e) => {
                self.audit(AuditEvent::error(
                    caller,
                    &e.to_string(),
                    Some("collect_commenters"),
                ));
                Err(e)
            }
        }
    }

    pub async fn save_members(
        &self,
        caller: &Caller,
        run: &MemberRun,
        filters: &MemberFilters,
        filename: Option<&str>,
    ) -> Result<SavedFile> {
        ensure_authorized(caller, &self.settings.allowed_operators)?;
        let metadata = json!({ "filters": filters, "stats": run.stats });
        self.save(
            caller,
            FileType::Chat,
            &run.entity,
            filename,
            metadata,
            to_records(run.result.items())?,
        )
        .await
    }

    pub async fn save_commenters(
        &self,
        caller: &Caller,
        run: &CommentRun,
        message_limit: Option<u32>,
        filename: Option<&str>,
    ) -> Result<SavedFile> {
        ensure_authorized(caller, &self.settings.allowed_operators)?;
        let metadata = json!({ "message_limit": message_limit, "stats": run.stats });
        self.save(
            caller,
            FileType::Comments,
            &run.entity,
            filename,
            metadata,
            to_records(run.result.items())?,
        )
        .await
    }

    pub async fn list_files(&self, caller: &Caller, query: ListQuery) -> Result<Vec<SavedFile>> {
        ensure_authorized(caller, &self.settings.allowed_operators)?;
        self.store.list(caller.id, query).await
    }

    pub async fn view_file(&self, caller: &Caller, id: u64, page: usize) -> Result<FileView> {
        ensure_authorized(caller, &self.settings.allowed_operators)?;
        let file = self.store.get(caller.id, id).await?;
        let records = self.store.read_records(&file).await?;
        let view = paginate(&records, page, self.settings.results_page_size);
        Ok(FileView {
            records: view.items.to_vec(),
            current_page: view.current_page,
            total_pages: view.total_pages,
            total_items: view.total_items,
            file,
        })
    }

    pub async fn delete_file(&self, caller: &Caller, id: u64) -> Result<SavedFile> {
        ensure_authorized(caller, &self.settings.allowed_operators)?;
        let removed = self.store.delete(caller.id, id).await?;
        info!(operator = caller.id.0, file_id = id, filename = %removed.filename, "file deleted");
        self.audit(AuditEvent::file_deleted(caller, id, &removed.filename));
        Ok(removed)
    }

    /// Fresh governor per run so wait totals are per collection.
    fn governor(&self) -> Governor {
        let audit = self.audit.clone();
        let forward = self.observer.clone();
        let observer: Arc<dyn RateLimitObserver> = Arc::new(move |notice: &RateLimitNotice| {
            if let Some(audit) = &audit {
                let event =
                    AuditEvent::rate_limit(&notice.operation, notice.retry_after.as_secs_f64());
                if let Err(e) = audit.write(event) {
                    warn!(error = %e, "audit write failed");
                }
            }
            if let Some(forward) = &forward {
                forward.on_wait(notice);
            }
        });
        let governor = Governor::new(self.sleeper.clone()).with_observer(observer);
        match &self.cancel {
            Some(token) => governor.with_cancel(token.clone()),
            None => governor,
        }
    }

    async fn resolve(&self, governor: &Governor, identifier: &str) -> Result<Entity> {
        let normalized = normalize_identifier(identifier)?;
        let platform = self.platform.as_ref();
        let name = normalized.as_str();

        governor
            .with_retry("resolve", move || platform.resolve(name))
            .await
            .map_err(|e| match e {
                Error::Platform(reason) | Error::NotFound(reason) | Error::External(reason) => {
                    Error::resolution(identifier, reason)
                }
                other => other,
            })
    }

    async fn save(
        &self,
        caller: &Caller,
        file_type: FileType,
        entity: &Entity,
        filename: Option<&str>,
        metadata: serde_json::Value,
        records: Vec<serde_json::Value>,
    ) -> Result<SavedFile> {
        let filename = filename
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_{}.json", file_type.as_str(), entity.id.0));
        let new_file = NewFile {
            filename,
            file_type,
            source_id: entity.id.0.to_string(),
            source_name: entity.display_name(),
            file_metadata: Some(metadata.to_string()),
        };
        let saved = self.store.create(caller.id, new_file, records).await?;
        info!(
            operator = caller.id.0,
            file_id = saved.id,
            path = %saved.file_path.display(),
            "result saved"
        );
        Ok(saved)
    }

    fn audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event) {
            warn!(error = %e, path = %audit.path().display(), "audit write failed");
        }
    }
}

fn to_records<T: Serialize>(items: &[T]) -> Result<Vec<serde_json::Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(Error::from))
        .collect()
}
