//! # CLI Module
//!
//! Command-line interface for the organizer.
//!
//! ## Usage
//! ```bash
//! # Organize a camera dump into a dated tree
//! shutter-sort organize ~/DCIM ~/Photos
//!
//! # With duplicate detection, sessions and a verified mirror
//! shutter-sort organize ~/DCIM ~/Photos --dedupe both --sessions --backup /mnt/mirror --verify
//!
//! # Re-check an existing mirror against its manifest
//! shutter-sort verify /mnt/mirror
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use shutter_sort::core::backup::BackupSync;
use shutter_sort::core::cache::SqliteStore;
use shutter_sort::core::dedupe::{DedupeConfig, DedupeMethod, DuplicateAction};
use shutter_sort::core::geocode::{LocationResolver, NominatimGeocoder};
use shutter_sort::core::pipeline::{DedupeSettings, OperationMode, Organizer, RunReport};
use shutter_sort::core::resolve::RoutingRules;
use shutter_sort::core::session::SessionConfig;
use shutter_sort::error::{OrganizerError, Result};
use shutter_sort::events::{Event, EventChannel, ExtractEvent, OrganizeEvent, RunEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Shutter Sort - organize photos and videos by their metadata
#[derive(Parser, Debug)]
#[command(name = "shutter-sort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organize a source tree into a metadata-driven hierarchy
    Organize {
        /// Source directory to scan
        source: PathBuf,

        /// Destination root for the organized tree
        destination: PathBuf,

        /// File naming pattern
        #[arg(long, default_value = "{date}_{original_name}")]
        pattern: String,

        /// Folder pattern below the kind subfolder
        #[arg(long, default_value = "{year}/{month:02d}/{day:02d}")]
        folder: String,

        /// Move files instead of copying
        #[arg(long = "move")]
        move_files: bool,

        /// Skip the RAW/JPG/VIDEOS kind subfolders
        #[arg(long)]
        flat: bool,

        /// Enable duplicate detection
        #[arg(long, value_enum)]
        dedupe: Option<DedupeArg>,

        /// What to do with detected duplicates
        #[arg(long, value_enum, default_value = "skip")]
        action: ActionArg,

        /// Detect shooting sessions
        #[arg(long)]
        sessions: bool,

        /// Session time gap in minutes
        #[arg(long, default_value = "30")]
        session_gap: i64,

        /// Backup destination (repeatable)
        #[arg(long)]
        backup: Vec<PathBuf>,

        /// Verify backup copies by re-hashing
        #[arg(long)]
        verify: bool,

        /// Resolve GPS coordinates to place names
        #[arg(long)]
        geocode: bool,

        /// Minimum delay between geocoding requests, in milliseconds
        #[arg(long, default_value = "1000")]
        geocode_delay_ms: u64,

        /// Resolve and report without writing
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        output: OutputFormat,

        /// Metadata cache database path
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Sync an organized tree to a backup destination
    Backup {
        /// Organized tree to replicate
        source: PathBuf,

        /// Backup destination
        destination: PathBuf,

        /// Verify copies by re-hashing the destination
        #[arg(long)]
        verify: bool,
    },

    /// Re-check a backup destination against its manifest
    Verify {
        /// Backup destination to check
        destination: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DedupeArg {
    /// Exact content hash only
    Hash,
    /// Content hash plus perceptual similarity
    Perceptual,
    /// All tiers
    Both,
}

impl From<DedupeArg> for DedupeMethod {
    fn from(arg: DedupeArg) -> Self {
        match arg {
            DedupeArg::Hash => DedupeMethod::Hash,
            DedupeArg::Perceptual => DedupeMethod::Perceptual,
            DedupeArg::Both => DedupeMethod::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    Skip,
    Rename,
    Quarantine,
}

impl From<ActionArg> for DuplicateAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Skip => DuplicateAction::Skip,
            ActionArg::Rename => DuplicateAction::Rename,
            ActionArg::Quarantine => DuplicateAction::Quarantine,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with progress
    Pretty,
    /// JSON report for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    shutter_sort::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize {
            source,
            destination,
            pattern,
            folder,
            move_files,
            flat,
            dedupe,
            action,
            sessions,
            session_gap,
            backup,
            verify,
            geocode,
            geocode_delay_ms,
            dry_run,
            output,
            cache,
        } => run_organize(OrganizeArgs {
            source,
            destination,
            pattern,
            folder,
            move_files,
            flat,
            dedupe,
            action,
            sessions,
            session_gap,
            backup,
            verify,
            geocode,
            geocode_delay_ms,
            dry_run,
            output,
            cache,
        }),
        Commands::Backup {
            source,
            destination,
            verify,
        } => run_backup(source, destination, verify),
        Commands::Verify { destination } => run_verify(destination),
    }
}

struct OrganizeArgs {
    source: PathBuf,
    destination: PathBuf,
    pattern: String,
    folder: String,
    move_files: bool,
    flat: bool,
    dedupe: Option<DedupeArg>,
    action: ActionArg,
    sessions: bool,
    session_gap: i64,
    backup: Vec<PathBuf>,
    verify: bool,
    geocode: bool,
    geocode_delay_ms: u64,
    dry_run: bool,
    output: OutputFormat,
    cache: Option<PathBuf>,
}

fn data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shutter-sort")
}

fn run_organize(args: OrganizeArgs) -> Result<()> {
    let cache_path = args.cache.unwrap_or_else(|| data_dir().join("metadata.db"));
    let store = SqliteStore::open(&cache_path)?;

    let mut builder = Organizer::builder(args.source, args.destination)
        .naming_pattern(args.pattern)
        .folder_pattern(args.folder)
        .dry_run(args.dry_run)
        .store(Arc::new(store));

    if args.move_files {
        builder = builder.operation(OperationMode::Move);
    }
    if args.flat {
        builder = builder.routing(RoutingRules::flat());
    }
    if let Some(method) = args.dedupe {
        builder = builder.dedupe(DedupeSettings {
            config: DedupeConfig {
                method: method.into(),
                ..Default::default()
            },
            action: args.action.into(),
            ..Default::default()
        });
    }
    if args.sessions {
        builder = builder.sessions(SessionConfig {
            time_gap_minutes: args.session_gap,
            ..Default::default()
        });
    }
    for destination in args.backup {
        builder = builder.backup_to(destination);
    }
    builder = builder.verify_backups(args.verify);

    if args.geocode {
        match NominatimGeocoder::new() {
            Ok(geocoder) => {
                builder = builder.location_resolver(LocationResolver::new(
                    data_dir().join("places.json"),
                    Box::new(geocoder),
                    Duration::from_millis(args.geocode_delay_ms),
                ));
            }
            Err(e) => warn!(error = %e, "geocoding unavailable, continuing without it"),
        }
    }

    let organizer = builder.build();

    let (sender, receiver) = EventChannel::new();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    let progress_thread = thread::spawn(move || {
        if !pretty {
            // Drain silently so the buffer stays bounded on long runs
            for _event in receiver.iter() {}
            return;
        }

        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for event in receiver.iter() {
            match event {
                Event::Run(RunEvent::PhaseChanged { phase }) => {
                    bar.set_message(phase.to_string());
                }
                Event::Extract(ExtractEvent::Started { total_files }) => {
                    bar.set_length(total_files as u64);
                    bar.set_position(0);
                }
                Event::Extract(ExtractEvent::Progress(progress)) => {
                    bar.set_position(progress.completed as u64);
                }
                Event::Organize(OrganizeEvent::Started { total_files }) => {
                    bar.set_length(total_files as u64);
                    bar.set_position(0);
                }
                Event::Organize(OrganizeEvent::FileOrganized { .. })
                | Event::Organize(OrganizeEvent::FileSkipped { .. }) => {
                    bar.inc(1);
                }
                _ => {}
            }
        }

        bar.finish_and_clear();
    });

    let result = organizer.run_with_events(&sender);
    drop(sender);
    let _ = progress_thread.join();

    let report = result?;
    match args.output {
        OutputFormat::Pretty => print_report(&report),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        ),
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!(
        "{} {} scanned, {} organized, {} skipped",
        style("Done:").bold().green(),
        report.scanned,
        report.organized,
        report.skipped
    );

    if report.duplicates_exact + report.duplicates_similar > 0 {
        println!(
            "  duplicates: {} exact, {} similar",
            report.duplicates_exact, report.duplicates_similar
        );
    }
    if !report.sessions.is_empty() {
        println!("  sessions:");
        for session in &report.sessions {
            println!(
                "    {} ({} files, {} - {})",
                style(&session.name).cyan(),
                session.member_count(),
                session.start.format("%H:%M"),
                session.end.format("%H:%M")
            );
        }
    }
    for backup in &report.backups {
        println!(
            "  backup {}: {} copied, {} skipped, {} failed",
            backup.destination.display(),
            backup.report.copied,
            backup.report.skipped,
            backup.report.failed.len()
        );
    }
    if !report.errors.is_empty() {
        println!("  {} {}", style("errors:").bold().red(), report.errors.len());
        for error in &report.errors {
            println!("    {}", style(error).dim());
        }
    }
    println!("  finished in {} ms", report.duration_ms);
}

fn run_backup(source: PathBuf, destination: PathBuf, verify: bool) -> Result<()> {
    let sync = BackupSync::new(verify);
    let report = sync.sync(&source, &destination)?;

    println!(
        "{} {} copied, {} skipped, {} verified, {} failed",
        style("Backup:").bold(),
        report.copied,
        report.skipped,
        report.verified,
        report.failed.len()
    );
    for failed in &report.failed {
        println!("  {} {}", style("failed:").red(), failed);
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(OrganizerError::Config(format!(
            "{} file(s) failed to back up",
            report.failed.len()
        )))
    }
}

fn run_verify(destination: PathBuf) -> Result<()> {
    let sync = BackupSync::new(true);
    let report = sync.verify(&destination)?;

    println!(
        "{} {} checked, {} mismatched, {} missing",
        style("Verify:").bold(),
        report.checked,
        report.mismatched.len(),
        report.missing.len()
    );
    for path in &report.mismatched {
        println!("  {} {}", style("mismatch:").red(), path);
    }
    for path in &report.missing {
        println!("  {} {}", style("missing:").yellow(), path);
    }

    if report.mismatched.is_empty() && report.missing.is_empty() {
        Ok(())
    } else {
        Err(OrganizerError::Config(
            "backup verification found problems".to_string(),
        ))
    }
}
