//! File-backed link store
//!
//! Links are persisted as an append-only JSON-lines journal of `linked` and
//! `unlinked` records, replayed when the store is opened. Each mutation holds
//! the store lock across its check and its journal append, so a conflicting
//! insert can never slip in between the two and the journal always matches the
//! in-memory table.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_types::{Link, LocalId, RemoteId};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::table::LinkTable;
use super::LinkStore;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalRecord {
    Linked {
        local: LocalId,
        remote: RemoteId,
        at: DateTime<Utc>,
    },
    Unlinked {
        local: LocalId,
        remote: RemoteId,
        at: DateTime<Utc>,
    },
}

/// Journal-backed link store
pub struct FileLinkStore {
    path: PathBuf,
    table: Mutex<LinkTable>,
}

impl FileLinkStore {
    /// Open the journal at `path`, creating parent directories if needed.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let table = if tokio::fs::try_exists(&path).await? {
            Self::replay(&path).await?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            LinkTable::default()
        };

        info!(path = %path.display(), links = table.len(), "Opened link journal");

        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    async fn replay(path: &Path) -> StoreResult<LinkTable> {
        let file = File::open(path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut table = LinkTable::default();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str::<JournalRecord>(&line)
                .map_err(|e| StoreError::Corrupt(format!("line {line_no}: {e}")))?;
            match record {
                JournalRecord::Linked { local, remote, at } => {
                    let link = Link {
                        local,
                        remote,
                        linked_at: at,
                    };
                    if !table.insert_if_absent(link) {
                        return Err(StoreError::Corrupt(format!(
                            "line {line_no}: link {local} conflicts with an existing link"
                        )));
                    }
                }
                JournalRecord::Unlinked { local, remote, .. } => {
                    if table.remote_for(&local).as_ref() != Some(&remote) {
                        return Err(StoreError::Corrupt(format!(
                            "line {line_no}: unlink of {local} <-> {remote} which is not linked"
                        )));
                    }
                    table.remove_local(&local);
                }
            }
        }

        Ok(table)
    }

    async fn append(&self, record: &JournalRecord) -> StoreResult<()> {
        let json = serde_json::to_string(record)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    /// Rewrite the journal so it holds exactly one record per live link.
    pub async fn compact(&self) -> StoreResult<()> {
        let table = self.table.lock().await;

        let mut contents = String::new();
        for link in table.links() {
            let record = JournalRecord::Linked {
                local: link.local,
                remote: link.remote,
                at: link.linked_at,
            };
            contents.push_str(&serde_json::to_string(&record)?);
            contents.push('\n');
        }

        let staging = self.path.with_extension("compact");
        tokio::fs::write(&staging, contents).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        debug!(path = %self.path.display(), links = table.len(), "Compacted link journal");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LinkStore for FileLinkStore {
    async fn remote_for(&self, local: &LocalId) -> StoreResult<Option<RemoteId>> {
        Ok(self.table.lock().await.remote_for(local))
    }

    async fn local_for(&self, remote: &RemoteId) -> StoreResult<Option<LocalId>> {
        Ok(self.table.lock().await.local_for(remote))
    }

    async fn insert_if_absent(&self, local: LocalId, remote: RemoteId) -> StoreResult<bool> {
        let mut table = self.table.lock().await;
        if !table.is_vacant(&local, &remote) {
            return Ok(false);
        }

        let link = Link::new(local, remote);
        self.append(&JournalRecord::Linked {
            local: link.local,
            remote: link.remote.clone(),
            at: link.linked_at,
        })
        .await?;

        Ok(table.insert_if_absent(link))
    }

    async fn remove_local(&self, local: &LocalId) -> StoreResult<Option<RemoteId>> {
        let mut table = self.table.lock().await;
        let Some(remote) = table.remote_for(local) else {
            return Ok(None);
        };

        self.append(&JournalRecord::Unlinked {
            local: *local,
            remote,
            at: Utc::now(),
        })
        .await?;

        Ok(table.remove_local(local))
    }

    async fn remove_remote(&self, remote: &RemoteId) -> StoreResult<Option<LocalId>> {
        let mut table = self.table.lock().await;
        let Some(local) = table.local_for(remote) else {
            return Ok(None);
        };

        self.append(&JournalRecord::Unlinked {
            local,
            remote: remote.clone(),
            at: Utc::now(),
        })
        .await?;

        Ok(table.remove_remote(remote))
    }

    async fn links(&self) -> StoreResult<Vec<Link>> {
        Ok(self.table.lock().await.links())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.table.lock().await.len())
    }
}
