use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::backup::Progress;
use rusqlite::DatabaseName;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::Db;
use crate::error::StoreError;

pub const SNAPSHOT_EXT: &str = "sqlite3";
const SNAPSHOT_PREFIX: &str = "backup-";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone, Serialize)]
pub struct CreatedSnapshot {
    pub filename: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub filename: String,
    pub size: u64,
    pub created: String,
}

/// Snapshot files of the live database, kept flat in one directory.
///
/// Create, restore and delete take the same lock, so a restore never reads a
/// snapshot that is still being written and two restores never interleave.
pub struct BackupStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub async fn create(&self, db: &Db) -> Result<CreatedSnapshot, StoreError> {
        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut filename = snapshot_name(Utc::now());
        while tokio::fs::try_exists(self.dir.join(&filename)).await? {
            tokio::time::sleep(Duration::from_millis(1)).await;
            filename = snapshot_name(Utc::now());
        }
        let final_path = self.dir.join(&filename);
        let partial = self.dir.join(format!("{filename}{PARTIAL_SUFFIX}"));

        let target = partial.clone();
        let written = db
            .run(move |conn| {
                conn.backup(DatabaseName::Main, &target, None)?;
                Ok(())
            })
            .await;
        if let Err(e) = written {
            if let Err(rm) = tokio::fs::remove_file(&partial).await {
                warn!(path = %partial.display(), error = %rm, "failed to remove partial snapshot");
            }
            return Err(e);
        }
        tokio::fs::rename(&partial, &final_path).await?;

        let (size, sha256) = tokio::task::spawn_blocking(move || digest_file(&final_path)).await??;
        info!(%filename, size, "snapshot written");

        Ok(CreatedSnapshot {
            filename,
            size,
            sha256,
        })
    }

    /// Snapshot files, newest first. A missing directory is an empty list.
    pub async fn list(&self) -> Result<Vec<SnapshotEntry>, StoreError> {
        let mut rd = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found: Vec<(SystemTime, SnapshotEntry)> = Vec::new();
        while let Some(ent) = rd.next_entry().await? {
            let Some(name) = ent.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !has_snapshot_ext(&name) {
                continue;
            }
            let meta = ent.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let created = meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((
                created,
                SnapshotEntry {
                    filename: name,
                    size: meta.len(),
                    created: DateTime::<Utc>::from(created)
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                },
            ));
        }

        found.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.filename.cmp(&a.1.filename))
        });
        Ok(found.into_iter().map(|(_, e)| e).collect())
    }

    /// Overwrite the live database with a snapshot. No safety copy is taken.
    pub async fn restore(&self, db: &Db, filename: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let path = self.existing(filename).await?;

        db.run(move |conn| {
            conn.restore(DatabaseName::Main, &path, None::<fn(Progress)>)?;
            Ok(())
        })
        .await?;
        info!(%filename, "snapshot restored");
        Ok(())
    }

    pub async fn delete(&self, filename: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let path = self.existing(filename).await?;
        tokio::fs::remove_file(&path).await?;
        info!(%filename, "snapshot deleted");
        Ok(())
    }

    async fn existing(&self, filename: &str) -> Result<PathBuf, StoreError> {
        check_name(filename)?;
        if !has_snapshot_ext(filename) {
            return Err(StoreError::not_found("backup file"));
        }
        let path = self.dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StoreError::not_found("backup file")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found("backup file"))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub fn snapshot_name(at: DateTime<Utc>) -> String {
    format!(
        "{SNAPSHOT_PREFIX}{}.{SNAPSHOT_EXT}",
        at.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

fn has_snapshot_ext(name: &str) -> bool {
    Path::new(name).extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXT)
}

/// Only bare file names are accepted; anything that could walk out of the
/// backup directory is a validation error. A bare name that is not a
/// snapshot simply never exists.
pub fn check_name(name: &str) -> Result<(), StoreError> {
    let bad = || StoreError::validation("backupFile", "backupFile must be a bare file name");
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(bad());
    }
    if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
        return Err(bad());
    }
    Ok(())
}

fn digest_file(path: &Path) -> Result<(u64, String), StoreError> {
    let mut f = File::open(path)?;
    let mut hasher = Sha256::new();
    let size = std::io::copy(&mut f, &mut hasher)?;
    Ok((size, format!("{:x}", hasher.finalize())))
}
