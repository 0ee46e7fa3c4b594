//! # Pipeline Module
//!
//! Drives the end-to-end run: scan, extract, locate, resolve, dedupe,
//! place, sessions, backup, aggregating per-file outcomes into a run
//! report.
//!
//! Only two conditions abort a run outright: an unreadable source root and
//! an unwritable destination root. Everything else accumulates into the
//! report, and every discovered file is attempted exactly once.

mod executor;

pub use executor::{
    BackupSettings, DedupeSettings, DestinationReport, OperationMode, Organizer,
    OrganizerBuilder, RunReport,
};
