//! Persistence of finished collection results.
//!
//! The collectors never touch storage; the service hands a finished result to
//! a [`RecordStore`] together with opaque metadata and reads back the same
//! ordered sequence later.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{domain::OperatorId, errors::Error, Result};

const INDEX_FILE: &str = "index.json";
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Member list of a chat.
    Chat,
    /// Commenters of a channel.
    Comments,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Chat => "chat",
            FileType::Comments => "comments",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    pub id: u64,
    pub filename: String,
    pub file_path: PathBuf,
    pub file_type: FileType,
    pub source_id: String,
    pub source_name: String,
    pub created_at: DateTime<Utc>,
    /// Opaque JSON string (filters, limits, run stats).
    pub file_metadata: Option<String>,
    pub owner_id: OperatorId,
}

#[derive(Clone, Debug)]
pub struct NewFile {
    pub filename: String,
    pub file_type: FileType,
    pub source_id: String,
    pub source_name: String,
    pub file_metadata: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    DateAsc,
    #[default]
    DateDesc,
    NameAsc,
    NameDesc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "date_asc" => Ok(SortOrder::DateAsc),
            "date_desc" => Ok(SortOrder::DateDesc),
            "name_asc" => Ok(SortOrder::NameAsc),
            "name_desc" => Ok(SortOrder::NameDesc),
            other => Err(Error::Config(format!(
                "unknown sort order {other:?} (expected date_asc, date_desc, name_asc or name_desc)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ListQuery {
    pub skip: usize,
    pub limit: usize,
    pub sort: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIST_LIMIT,
            sort: SortOrder::default(),
        }
    }
}

/// Storage port for result files. Every lookup is scoped to the owner.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(
        &self,
        owner: OperatorId,
        file: NewFile,
        records: Vec<serde_json::Value>,
    ) -> Result<SavedFile>;

    async fn list(&self, owner: OperatorId, query: ListQuery) -> Result<Vec<SavedFile>>;

    async fn get(&self, owner: OperatorId, id: u64) -> Result<SavedFile>;

    async fn delete(&self, owner: OperatorId, id: u64) -> Result<SavedFile>;

    async fn read_records(&self, file: &SavedFile) -> Result<Vec<serde_json::Value>>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Index {
    next_id: u64,
    files: Vec<SavedFile>,
}

/// `RecordStore` keeping each result as a JSON array file next to an
/// `index.json` with the metadata rows.
pub struct JsonFileStore {
    dir: PathBuf,
    index: Mutex<Index>,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let index = load_index(&dir.join(INDEX_FILE))?.unwrap_or_default();
        debug!(dir = %dir.display(), files = index.files.len(), "record store opened");
        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    fn save_index(&self, index: &Index) -> Result<()> {
        let txt = serde_json::to_string_pretty(index)?;
        std::fs::write(self.dir.join(INDEX_FILE), txt)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn create(
        &self,
        owner: OperatorId,
        file: NewFile,
        records: Vec<serde_json::Value>,
    ) -> Result<SavedFile> {
        let mut index = self.index.lock().await;
        let id = index.next_id + 1;
        let created_at = Utc::now();

        let filename = sanitize_filename(&file.filename);
        let stamp = created_at.format("%Y%m%d_%H%M%S");
        let mut file_path = self.dir.join(format!("{}_{stamp}_{filename}", owner.0));
        if file_path.exists() {
            file_path = self.dir.join(format!("{}_{stamp}_{id}_{filename}", owner.0));
        }

        std::fs::write(&file_path, serde_json::to_string(&records)?)?;

        let saved = SavedFile {
            id,
            filename,
            file_path,
            file_type: file.file_type,
            source_id: file.source_id,
            source_name: file.source_name,
            created_at,
            file_metadata: file.file_metadata,
            owner_id: owner,
        };
        let mut next = index.clone();
        next.next_id = id;
        next.files.push(saved.clone());
        if let Err(e) = self.save_index(&next) {
            if let Err(cleanup) = std::fs::remove_file(&saved.file_path) {
                warn!(path = %saved.file_path.display(), error = %cleanup, "could not remove orphaned data file");
            }
            return Err(e);
        }
        *index = next;
        Ok(saved)
    }

    async fn list(&self, owner: OperatorId, query: ListQuery) -> Result<Vec<SavedFile>> {
        let index = self.index.lock().await;
        let mut files: Vec<SavedFile> = index
            .files
            .iter()
            .filter(|f| f.owner_id == owner)
            .cloned()
            .collect();

        match query.sort {
            SortOrder::DateAsc => files.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id))),
            SortOrder::DateDesc => files.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id))),
            SortOrder::NameAsc => files.sort_by(|a, b| a.filename.cmp(&b.filename)),
            SortOrder::NameDesc => files.sort_by(|a, b| b.filename.cmp(&a.filename)),
        }

        Ok(files
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect())
    }

    async fn get(&self, owner: OperatorId, id: u64) -> Result<SavedFile> {
        let index = self.index.lock().await;
        index
            .files
            .iter()
            .find(|f| f.id == id && f.owner_id == owner)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("file {id}")))
    }

    async fn delete(&self, owner: OperatorId, id: u64) -> Result<SavedFile> {
        let mut index = self.index.lock().await;
        let pos = index
            .files
            .iter()
            .position(|f| f.id == id && f.owner_id == owner)
            .ok_or_else(|| Error::NotFound(format!("file {id}")))?;

        let mut next = index.clone();
        let removed = next.files.remove(pos);
        self.save_index(&next)?;
        *index = next;

        match std::fs::remove_file(&removed.file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %removed.file_path.display(), "data file already gone");
            }
            Err(e) => {
                warn!(path = %removed.file_path.display(), error = %e, "index row dropped but data file remains");
            }
        }
        Ok(removed)
    }

    async fn read_records(&self, file: &SavedFile) -> Result<Vec<serde_json::Value>> {
        let txt = std::fs::read_to_string(&file.file_path)?;
        Ok(serde_json::from_str(&txt)?)
    }
}

fn load_index(path: &Path) -> Result<Option<Index>> {
    if !path.exists() {
        return Ok(None);
    }
    let txt = std::fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&txt)?))
}

/// Keep the user-supplied name inside the data directory.
fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "results.json".to_string()
    } else {
        cleaned.to_string()
    }
}
