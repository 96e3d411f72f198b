//! Point-in-time copy of every entity directory plus the index snapshot.
//! There is no restore path; restoring is an operational concern.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use super::{EntityKind, RecordStore, Store, StoreResult, INDEX_FILE};

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub backup_id: String,
    pub path: PathBuf,
    pub files_copied: u64,
    /// Kinds whose directory could not be copied.
    pub skipped_kinds: Vec<String>,
}

impl Store {
    /// Copies every entity directory into `<backup_dir>/<backup_id>/`.
    /// A failure for one kind is logged and skipped; the index snapshot is
    /// always written last.
    pub async fn backup(&self) -> StoreResult<BackupReport> {
        let backup_id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let root = self.config().backup_dir.join(&backup_id);
        let records = self.records();
        records.bounded(&root, fs::create_dir_all(&root)).await?;

        let mut files_copied = 0;
        let mut skipped_kinds = Vec::new();
        for kind in EntityKind::ALL {
            let from = records.kind_dir(kind);
            let to = root.join(kind.dir_name());
            match copy_dir(records, &from, &to).await {
                Ok(n) => files_copied += n,
                Err(e) => {
                    warn!("Backup {backup_id}: skipping {}: {e}", kind.dir_name());
                    skipped_kinds.push(kind.dir_name().to_string());
                }
            }
        }

        records
            .write_json_at(&root.join(INDEX_FILE), &self.index_snapshot())
            .await?;

        info!("Backup {backup_id} complete: {files_copied} files");
        Ok(BackupReport {
            backup_id,
            path: root,
            files_copied,
            skipped_kinds,
        })
    }
}

type CopyFuture<'a> = Pin<Box<dyn Future<Output = StoreResult<u64>> + Send + 'a>>;

fn copy_dir<'a>(records: &'a RecordStore, from: &'a Path, to: &'a Path) -> CopyFuture<'a> {
    Box::pin(async move {
        records.bounded(to, fs::create_dir_all(to)).await?;
        let mut entries = records.bounded(from, fs::read_dir(from)).await?;
        let mut copied = 0;
        while let Some(entry) = records.bounded(from, entries.next_entry()).await? {
            let source = entry.path();
            let target = to.join(entry.file_name());
            let file_type = records.bounded(&source, entry.file_type()).await?;
            if file_type.is_dir() {
                copied += copy_dir(records, &source, &target).await?;
            } else if file_type.is_file() {
                records.bounded(&source, fs::copy(&source, &target)).await?;
                copied += 1;
            }
        }
        Ok(copied)
    })
}
