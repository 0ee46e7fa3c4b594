//! # Events Module
//!
//! Event-driven progress reporting for the organizer pipeline.
//!
//! The core components emit typed events through an `EventSender`; any UI
//! layer (CLI progress bars, a future GUI) consumes them from the paired
//! `EventReceiver`. Components never block on a slow or absent consumer.

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::{
    BackupEvent, Event, ExtractEvent, ExtractProgress, OrganizeEvent, RunEvent, RunPhase,
    RunSummary, ScanEvent,
};
