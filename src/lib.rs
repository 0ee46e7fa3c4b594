//! # Shutter Sort
//!
//! A metadata-driven photo and video organizer.
//!
//! ## Core Philosophy
//! - **Never lose a file** - copies stage through temp names, backups are verified
//! - **Degrade, don't fail** - a missing tool or broken tag costs fields, not files
//! - **Every file attempted once** - per-file problems accumulate into the run report
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - scanning, metadata extraction, path resolution, dedupe, sessions, backup
//! - `events` - event-driven progress reporting (GUI-ready)
//! - `error` - user-friendly error types
//! - `cli` - command-line interface

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
