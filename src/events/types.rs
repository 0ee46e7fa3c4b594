//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organizer pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Metadata extraction phase events
    Extract(ExtractEvent),
    /// Organize phase events
    Organize(OrganizeEvent),
    /// Backup phase events
    Backup(BackupEvent),
    /// Run-level events
    Run(RunEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// A media file was found
    FileFound { path: PathBuf },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Events during the metadata extraction phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtractEvent {
    /// Extraction has started
    Started { total_files: usize },
    /// Progress update during extraction
    Progress(ExtractProgress),
    /// A record was served from the cache (no engines ran)
    CacheHit { path: PathBuf },
    /// Extraction completed
    Completed {
        total_extracted: usize,
        cache_hits: usize,
    },
}

/// Progress information during extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractProgress {
    /// Number of files processed so far
    pub completed: usize,
    /// Total number of files to process
    pub total: usize,
    /// Current file being processed
    pub current_path: PathBuf,
}

/// Events during the organize phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrganizeEvent {
    /// Organizing has started
    Started { total_files: usize },
    /// A file was placed at its destination
    FileOrganized {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A duplicate of an earlier file was detected
    DuplicateFound {
        path: PathBuf,
        original: PathBuf,
        score: f64,
    },
    /// A file was skipped (duplicate action or dry run)
    FileSkipped { path: PathBuf, reason: String },
    /// An error occurred but organizing continues
    Error { path: PathBuf, message: String },
    /// Organizing completed
    Completed { organized: usize, skipped: usize },
}

/// Events during the backup phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackupEvent {
    /// Sync to one destination has started
    Started { destination: PathBuf },
    /// A file was copied to the destination
    FileCopied { path: PathBuf },
    /// A file failed to copy or verify
    FileFailed { path: PathBuf, message: String },
    /// Sync to one destination completed
    Completed {
        destination: PathBuf,
        copied: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Run-level lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    /// The run has started
    Started,
    /// The run moved to a new phase
    PhaseChanged { phase: RunPhase },
    /// The run completed
    Completed { summary: RunSummary },
}

/// Phases of a full organize run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Scanning,
    Extracting,
    Locating,
    Organizing,
    Sessions,
    Backup,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Scanning => write!(f, "Scanning"),
            RunPhase::Extracting => write!(f, "Extracting metadata"),
            RunPhase::Locating => write!(f, "Resolving locations"),
            RunPhase::Organizing => write!(f, "Organizing"),
            RunPhase::Sessions => write!(f, "Detecting sessions"),
            RunPhase::Backup => write!(f, "Backing up"),
        }
    }
}

/// Final summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total media files discovered
    pub total_files: usize,
    /// Files placed at a destination
    pub organized: usize,
    /// Files skipped (duplicates or dry run)
    pub skipped: usize,
    /// Exact duplicates found
    pub duplicates_exact: usize,
    /// Perceptually similar duplicates found
    pub duplicates_similar: usize,
    /// Shooting sessions detected
    pub sessions: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
