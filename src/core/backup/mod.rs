//! # Backup Module
//!
//! Incremental, checksum-verified replication of an organized tree to one
//! or more destinations.
//!
//! ## Passes
//! 1. **Diff** - walk the source, compare size/mtime against the
//!    destination manifest; unchanged files are skipped without hashing
//! 2. **Copy** - stream each selected file through a temp name plus atomic
//!    rename, optionally re-hashing the destination for verification
//! 3. **Manifest** - rewrite entries only for files that copied (and
//!    verified); failures stay absent so the next run retries them

mod manifest;
mod sync;

pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILE};
pub use sync::{BackupSync, SyncReport, VerifyReport};

pub(crate) use sync::copy_atomic;
