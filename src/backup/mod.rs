//! Scheduled JSON backups of the whole library.
//!
//! A croner-driven loop writes the export document into the backup
//! directory and prunes old files beyond the retention count. The admin
//! endpoint reuses `run_once` for on-demand backups.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use croner::Cron;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::store::Store;
use crate::transfer;

#[derive(Debug, Clone, Serialize)]
pub struct BackupFile {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

pub struct BackupRunner {
    store: Arc<Store>,
    dir: PathBuf,
    keep: usize,
    base_url: String,
}

impl BackupRunner {
    pub fn new(store: Arc<Store>, dir: PathBuf, keep: usize, base_url: String) -> Self {
        BackupRunner { store, dir, keep: keep.max(1), base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Write one backup file and prune old ones. Returns the file name.
    pub fn run_once(&self) -> Result<String> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create backup dir: {}", self.dir.display()))?;

        let document = transfer::build_export(&self.store, &self.base_url)
            .context("failed to build export")?;
        let json = serde_json::to_string_pretty(&document).context("failed to serialize export")?;

        let name = format!("prompthive-backup-{}.json", Utc::now().format("%Y%m%d-%H%M%S"));
        let path = self.dir.join(&name);

        // Atomic write via temp + rename, same as any other state file.
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)
            .with_context(|| format!("failed to write backup temp file: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to rename backup file: {}", path.display()))?;

        let pruned = prune_backups(&self.dir, self.keep)?;
        tracing::info!(file = %name, pruned, "backup written");
        Ok(name)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupFile>> {
        let mut files = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read backup dir: {}", self.dir.display())
                });
            }
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".json") {
                continue;
            }
            let metadata = entry.metadata()?;
            files.push(BackupFile {
                name,
                size: metadata.len(),
                modified: metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now()),
            });
        }
        // Newest first; timestamped names sort chronologically.
        files.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(files)
    }
}

/// Remove the oldest backups beyond `keep`. Returns how many were deleted.
fn prune_backups(dir: &Path, keep: usize) -> Result<usize> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read backup dir: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("prompthive-backup-") && name.ends_with(".json"))
        .collect();
    names.sort();

    let mut pruned = 0;
    while names.len() > keep {
        let oldest = names.remove(0);
        if let Err(e) = std::fs::remove_file(dir.join(&oldest)) {
            tracing::warn!(file = %oldest, error = %e, "failed to prune backup");
        } else {
            pruned += 1;
        }
    }
    Ok(pruned)
}

/// Start the scheduled backup loop. The enable_backups flag is re-read on
/// every fire, so toggling it takes effect without a restart.
pub fn spawn_backup_loop(runner: Arc<BackupRunner>, schedule: String) -> Option<JoinHandle<()>> {
    let cron = match Cron::new(&schedule).parse() {
        Ok(cron) => cron,
        Err(e) => {
            tracing::error!(schedule = %schedule, error = %e, "Invalid backup cron expression");
            return None;
        }
    };

    tracing::info!(schedule = %schedule, "Backup loop started");
    Some(tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = match cron.find_next_occurrence(&now, false) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to compute next backup occurrence");
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                    continue;
                }
            };

            let duration = (next - now).to_std().unwrap_or(std::time::Duration::from_secs(1));
            tracing::debug!(next = %next.format("%Y-%m-%d %H:%M:%S UTC"), "Sleeping until next backup");
            tokio::time::sleep(duration).await;

            // Guard against premature wake from sleep imprecision
            let now_after = Utc::now();
            if now_after < next {
                let remaining = (next - now_after).to_std().unwrap_or_default();
                tokio::time::sleep(remaining).await;
            }

            match runner.store.get_global_config() {
                Ok(config) if !config.enable_backups => {
                    tracing::debug!("Backups disabled, skipping scheduled run");
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read global config, skipping backup");
                    continue;
                }
                Ok(_) => {}
            }

            if let Err(e) = runner.run_once() {
                tracing::error!(error = %e, "Scheduled backup failed");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::prompts::NewPrompt;

    fn runner_with_data(dir: &Path, keep: usize) -> BackupRunner {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let user = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        store
            .create_prompt(
                &user.id,
                NewPrompt { title: "Backed up".into(), content: "c".into(), ..NewPrompt::default() },
            )
            .unwrap();
        BackupRunner::new(store, dir.to_path_buf(), keep, "http://localhost:8080".into())
    }

    #[test]
    fn test_run_once_writes_valid_export() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with_data(dir.path(), 5);

        let name = runner.run_once().unwrap();
        let raw = std::fs::read_to_string(dir.path().join(&name)).unwrap();
        let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(document["format"], "prompthive-export");
        assert_eq!(document["version"], 2);
        assert_eq!(document["prompts"].as_array().unwrap().len(), 1);

        let listed = runner.list_backups().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, name);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in ["20250101-000000", "20250102-000000", "20250103-000000"] {
            std::fs::write(
                dir.path().join(format!("prompthive-backup-{stamp}.json")),
                "{}",
            )
            .unwrap();
        }
        // An unrelated file must survive pruning.
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let pruned = prune_backups(dir.path(), 2).unwrap();
        assert_eq!(pruned, 1);
        assert!(!dir.path().join("prompthive-backup-20250101-000000.json").exists());
        assert!(dir.path().join("prompthive-backup-20250103-000000.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_list_backups_empty_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with_data(&dir.path().join("missing"), 5);
        assert!(runner.list_backups().unwrap().is_empty());
    }
}
