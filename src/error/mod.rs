//! # Error Module
//!
//! User-friendly error types for the organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Recoverable stays local** - extraction engine failures degrade the
//!   record, duplicate-check failures degrade to Unique; only unreadable
//!   source / unwritable destination abort a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Duplicate detection error: {0}")]
    Dedupe(#[from] DedupeError),

    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur during media scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a single metadata extraction engine.
///
/// These never escape the extractor - a failing engine is logged and the
/// chain falls through to the next one.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Engine {engine} is not available on this system")]
    Unavailable { engine: &'static str },

    #[error("External tool failed for {path}: {reason}")]
    ToolFailed { path: PathBuf, reason: String },

    #[error("External tool timed out after {seconds}s for {path}")]
    ToolTimeout { path: PathBuf, seconds: u64 },

    #[error("Failed to parse metadata from {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur with the metadata cache store
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Cache corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },

    #[error("Failed to serialize metadata record: {0}")]
    SerializationFailed(String),
}

/// Errors from the reverse geocoding service.
///
/// These are transient by contract: the resolver returns no location and the
/// coordinate stays uncached so a later run retries it.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Request(String),

    #[error("Unexpected geocoding response: {0}")]
    InvalidResponse(String),

    #[error("Failed to persist place cache at {path}: {reason}")]
    CacheIo { path: PathBuf, reason: String },
}

/// Errors that occur during duplicate detection
#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Errors that occur during backup synchronization
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Backup source does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Backup destination unavailable at {path}: {reason}")]
    DestinationUnavailable { path: PathBuf, reason: String },

    #[error("Failed to write manifest at {path}: {reason}")]
    ManifestWrite { path: PathBuf, reason: String },

    #[error("Failed to copy {path}: {reason}")]
    Copy { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;
