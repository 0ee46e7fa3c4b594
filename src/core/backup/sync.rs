//! Incremental, checksum-verified sync of an organized tree.

use super::manifest::{Manifest, ManifestEntry, MANIFEST_FILE};
use crate::core::cache::mtime_secs;
use crate::core::checksum::sha256_file;
use crate::error::BackupError;
use crate::events::{BackupEvent, Event, EventSender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Outcome of one sync pass against one destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Files copied this run
    pub copied: usize,
    /// Files skipped as unchanged
    pub skipped: usize,
    /// Files whose destination checksum was verified
    pub verified: usize,
    /// Relative paths that failed to copy or verify
    pub failed: Vec<String>,
}

/// Outcome of a standalone verification pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Manifest entries checked
    pub checked: usize,
    /// Entries whose destination content no longer matches
    pub mismatched: Vec<String>,
    /// Entries whose destination file is gone
    pub missing: Vec<String>,
}

/// A source file selected for copying in pass 1.
struct CopyTask {
    relative: String,
    source: PathBuf,
    size: u64,
    modified: i64,
    checksum: String,
}

/// Incremental replication with a per-destination manifest.
pub struct BackupSync {
    verify: bool,
}

impl BackupSync {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    /// Sync `source` into `destination`.
    ///
    /// Three passes: diff against the manifest (size/mtime as the cheap
    /// signal), parallel atomic copies, then a single-threaded manifest
    /// rewrite covering only the files that made it.
    pub fn sync(&self, source: &Path, destination: &Path) -> Result<SyncReport, BackupError> {
        self.sync_with_events(source, destination, &crate::events::null_sender())
    }

    /// Sync with progress events.
    pub fn sync_with_events(
        &self,
        source: &Path,
        destination: &Path,
        events: &EventSender,
    ) -> Result<SyncReport, BackupError> {
        if !source.is_dir() {
            return Err(BackupError::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        std::fs::create_dir_all(destination).map_err(|e| BackupError::DestinationUnavailable {
            path: destination.to_path_buf(),
            reason: e.to_string(),
        })?;

        events.send(Event::Backup(BackupEvent::Started {
            destination: destination.to_path_buf(),
        }));

        let mut manifest = Manifest::load(destination);
        let mut report = SyncReport::default();

        // Pass 1: diff. Source checksums for the copy set are computed here
        // so verification later compares destination bytes against them.
        let mut tasks = Vec::new();
        for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.file_name().and_then(|n| n.to_str()) == Some(MANIFEST_FILE) {
                continue;
            }

            let relative = match path.strip_prefix(source) {
                Ok(rel) => rel.to_string_lossy().into_owned(),
                Err(_) => continue,
            };

            let metadata = match std::fs::metadata(path) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat source file");
                    report.failed.push(relative);
                    continue;
                }
            };

            let size = metadata.len();
            let modified = mtime_secs(metadata.modified().unwrap_or(std::time::UNIX_EPOCH));

            if !needs_copy(manifest.get(&relative), size, modified) {
                report.skipped += 1;
                continue;
            }

            match sha256_file(path) {
                Ok(checksum) => tasks.push(CopyTask {
                    relative,
                    source: path.to_path_buf(),
                    size,
                    modified,
                    checksum,
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot checksum source file");
                    report.failed.push(relative);
                }
            }
        }

        // Pass 2: copy in parallel across independent destination files.
        let verify = self.verify;
        let outcomes: Vec<(CopyTask, Result<(), String>)> = tasks
            .into_par_iter()
            .map(|task| {
                let dest_path = destination.join(&task.relative);
                let mut result = copy_atomic(&task.source, &dest_path);

                if result.is_ok() && verify {
                    result = match sha256_file(&dest_path) {
                        Ok(actual) if actual == task.checksum => Ok(()),
                        Ok(_) => Err("checksum mismatch after copy".to_string()),
                        Err(e) => Err(format!("cannot verify destination: {}", e)),
                    };
                }

                (task, result)
            })
            .collect();

        // Pass 3: manifest update, single-threaded. Failed files stay out of
        // the manifest so the next run retries them.
        for (task, result) in outcomes {
            match result {
                Ok(()) => {
                    report.copied += 1;
                    if verify {
                        report.verified += 1;
                    }
                    events.send(Event::Backup(BackupEvent::FileCopied {
                        path: PathBuf::from(&task.relative),
                    }));
                    manifest.insert(
                        task.relative,
                        ManifestEntry {
                            checksum: task.checksum,
                            size: task.size,
                            modified: task.modified,
                        },
                    );
                }
                Err(reason) => {
                    warn!(path = %task.relative, reason = %reason, "backup copy failed");
                    events.send(Event::Backup(BackupEvent::FileFailed {
                        path: PathBuf::from(&task.relative),
                        message: reason,
                    }));
                    report.failed.push(task.relative);
                }
            }
        }

        manifest.save(destination)?;

        events.send(Event::Backup(BackupEvent::Completed {
            destination: destination.to_path_buf(),
            copied: report.copied,
            skipped: report.skipped,
            failed: report.failed.len(),
        }));

        Ok(report)
    }

    /// Re-hash every manifest entry against the destination, without
    /// touching the source.
    pub fn verify(&self, destination: &Path) -> Result<VerifyReport, BackupError> {
        if !destination.is_dir() {
            return Err(BackupError::DestinationUnavailable {
                path: destination.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let manifest = Manifest::load(destination);
        let mut report = VerifyReport::default();

        for (relative, entry) in &manifest.entries {
            let path = destination.join(relative);
            report.checked += 1;

            if !path.is_file() {
                report.missing.push(relative.clone());
                continue;
            }

            match sha256_file(&path) {
                Ok(actual) if actual == entry.checksum => {}
                Ok(_) => report.mismatched.push(relative.clone()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read during verify");
                    report.mismatched.push(relative.clone());
                }
            }
        }

        Ok(report)
    }
}

/// Whether a source file must be (re)copied, by the cheap signal.
fn needs_copy(entry: Option<&ManifestEntry>, size: u64, modified: i64) -> bool {
    match entry {
        None => true,
        Some(entry) => entry.size != size || (entry.modified - modified).abs() > 2,
    }
}

/// Copy through a temp file in the destination directory plus atomic rename;
/// a partially written file is never visible at the final path.
pub(crate) fn copy_atomic(source: &Path, destination: &Path) -> Result<(), String> {
    let parent = destination.parent().ok_or("destination has no parent")?;
    std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;

    let mut reader = std::fs::File::open(source).map_err(|e| e.to_string())?;
    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| e.to_string())?;

    std::io::copy(&mut reader, temp.as_file_mut()).map_err(|e| e.to_string())?;

    temp.persist(destination).map_err(|e| e.to_string())?;
    Ok(())
}
