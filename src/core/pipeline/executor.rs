//! Run execution implementation.

use crate::core::backup::{copy_atomic, BackupSync, SyncReport};
use crate::core::cache::{InMemoryStore, MetadataStore};
use crate::core::dedupe::{DedupeConfig, DuplicateAction, DuplicateDetector, DuplicateVerdict};
use crate::core::geocode::{LocationResolver, PlaceInfo};
use crate::core::metadata::{MetadataExtractor, MetadataRecord};
use crate::core::resolve::{next_available_path, PathResolver, RoutingRules};
use crate::core::scanner::{MediaFile, MediaScanner, ScanConfig, WalkDirScanner};
use crate::core::session::{Session, SessionConfig, SessionDetector, SessionInput};
use crate::core::template::CameraSlugger;
use crate::error::OrganizerError;
use crate::events::{
    Event, EventSender, ExtractEvent, ExtractProgress, OrganizeEvent, RunEvent, RunPhase,
    RunSummary,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

/// Whether source files are copied or moved into the destination tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Copy files to destination (keep originals)
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

/// Duplicate handling for a run.
#[derive(Debug, Clone)]
pub struct DedupeSettings {
    pub config: DedupeConfig,
    pub action: DuplicateAction,
    /// Folder under the destination root for quarantined duplicates
    pub quarantine_folder: String,
}

impl Default for DedupeSettings {
    fn default() -> Self {
        Self {
            config: DedupeConfig::default(),
            action: DuplicateAction::Skip,
            quarantine_folder: "DUPLICATES".to_string(),
        }
    }
}

/// Backup targets for a run.
#[derive(Debug, Clone, Default)]
pub struct BackupSettings {
    pub destinations: Vec<PathBuf>,
    pub verify: bool,
}

/// Per-destination sync outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationReport {
    pub destination: PathBuf,
    pub report: SyncReport,
}

/// Aggregated outcome of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// Media files discovered under the source root
    pub scanned: usize,
    /// Files placed (or, in a dry run, planned) at a destination
    pub organized: usize,
    /// Files not placed (duplicate skip/defer)
    pub skipped: usize,
    /// Exact duplicates found
    pub duplicates_exact: usize,
    /// Perceptually similar duplicates found
    pub duplicates_similar: usize,
    /// Records served from the metadata cache
    pub cache_hits: usize,
    /// Detected shooting sessions
    pub sessions: Vec<Session>,
    /// Per-destination backup outcomes
    pub backups: Vec<DestinationReport>,
    /// Non-fatal per-file error strings
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

type DuplicateCallback = dyn Fn(&Path, &DuplicateVerdict) -> DuplicateAction + Send + Sync;

/// Builder for [`Organizer`].
pub struct OrganizerBuilder {
    source: PathBuf,
    destination: PathBuf,
    naming_pattern: String,
    folder_pattern: String,
    routing: RoutingRules,
    operation: OperationMode,
    dry_run: bool,
    scan: ScanConfig,
    sequence_width: usize,
    camera_mappings: HashMap<String, String>,
    store: Option<Arc<dyn MetadataStore>>,
    dedupe: Option<DedupeSettings>,
    sessions: Option<SessionConfig>,
    backup: BackupSettings,
    location: Option<LocationResolver>,
    on_duplicate: Option<Box<DuplicateCallback>>,
}

impl OrganizerBuilder {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            naming_pattern: "{date}_{original_name}".to_string(),
            folder_pattern: "{year}/{month:02d}/{day:02d}".to_string(),
            routing: RoutingRules::default(),
            operation: OperationMode::Copy,
            dry_run: false,
            scan: ScanConfig::default(),
            sequence_width: 2,
            camera_mappings: HashMap::new(),
            store: None,
            dedupe: None,
            sessions: None,
            backup: BackupSettings::default(),
            location: None,
            on_duplicate: None,
        }
    }

    /// Naming pattern for files (see the template module for variables).
    pub fn naming_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.naming_pattern = pattern.into();
        self
    }

    /// Folder pattern below the kind subfolder.
    pub fn folder_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.folder_pattern = pattern.into();
        self
    }

    pub fn routing(mut self, routing: RoutingRules) -> Self {
        self.routing = routing;
        self
    }

    pub fn operation(mut self, operation: OperationMode) -> Self {
        self.operation = operation;
        self
    }

    /// Resolve and report without writing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// Width of the zero-padded collision sequence number.
    pub fn sequence_width(mut self, width: usize) -> Self {
        self.sequence_width = width;
        self
    }

    /// Custom camera-name-to-slug mappings, checked before built-ins.
    pub fn camera_mappings(mut self, mappings: HashMap<String, String>) -> Self {
        self.camera_mappings = mappings;
        self
    }

    /// Metadata store backend (defaults to an in-memory store).
    pub fn store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enable duplicate detection.
    pub fn dedupe(mut self, settings: DedupeSettings) -> Self {
        self.dedupe = Some(settings);
        self
    }

    /// Enable session detection.
    pub fn sessions(mut self, config: SessionConfig) -> Self {
        self.sessions = Some(config);
        self
    }

    /// Add a backup destination.
    pub fn backup_to(mut self, destination: impl Into<PathBuf>) -> Self {
        self.backup.destinations.push(destination.into());
        self
    }

    /// Verify backup copies by re-hashing the destination.
    pub fn verify_backups(mut self, verify: bool) -> Self {
        self.backup.verify = verify;
        self
    }

    /// Enable location enrichment.
    pub fn location_resolver(mut self, resolver: LocationResolver) -> Self {
        self.location = Some(resolver);
        self
    }

    /// Callback consulted when the duplicate action is `Defer`.
    pub fn on_duplicate(
        mut self,
        callback: impl Fn(&Path, &DuplicateVerdict) -> DuplicateAction + Send + Sync + 'static,
    ) -> Self {
        self.on_duplicate = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Organizer {
        Organizer {
            source: self.source,
            destination: self.destination,
            naming_pattern: self.naming_pattern,
            folder_pattern: self.folder_pattern,
            routing: self.routing,
            operation: self.operation,
            dry_run: self.dry_run,
            scan: self.scan,
            sequence_width: self.sequence_width,
            camera_mappings: self.camera_mappings,
            store: self.store.unwrap_or_else(|| Arc::new(InMemoryStore::new())),
            dedupe: self.dedupe,
            sessions: self.sessions,
            backup: self.backup,
            location: self.location,
            on_duplicate: self.on_duplicate,
        }
    }
}

/// The end-to-end organizer.
pub struct Organizer {
    source: PathBuf,
    destination: PathBuf,
    naming_pattern: String,
    folder_pattern: String,
    routing: RoutingRules,
    operation: OperationMode,
    dry_run: bool,
    scan: ScanConfig,
    sequence_width: usize,
    camera_mappings: HashMap<String, String>,
    store: Arc<dyn MetadataStore>,
    dedupe: Option<DedupeSettings>,
    sessions: Option<SessionConfig>,
    backup: BackupSettings,
    location: Option<LocationResolver>,
    on_duplicate: Option<Box<DuplicateCallback>>,
}

impl Organizer {
    /// Start building an organizer for a source/destination pair.
    pub fn builder(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> OrganizerBuilder {
        OrganizerBuilder::new(source, destination)
    }

    /// Run without progress events.
    pub fn run(&self) -> Result<RunReport, OrganizerError> {
        self.run_with_events(&crate::events::null_sender())
    }

    /// Run the full pipeline with progress events.
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunReport, OrganizerError> {
        let start_time = Instant::now();
        let mut errors: Vec<String> = Vec::new();

        // Fatal pre-checks: these are the only conditions that abort
        if !self.source.is_dir() {
            return Err(OrganizerError::Config(format!(
                "source root is not a readable directory: {}",
                self.source.display()
            )));
        }
        if !self.dry_run {
            std::fs::create_dir_all(&self.destination).map_err(|e| {
                OrganizerError::Config(format!(
                    "destination root is not writable: {}: {}",
                    self.destination.display(),
                    e
                ))
            })?;
        }

        events.send(Event::Run(RunEvent::Started));

        // Phase 1: scan
        events.send(Event::Run(RunEvent::PhaseChanged {
            phase: RunPhase::Scanning,
        }));

        let scanner = WalkDirScanner::new(self.scan.clone());
        let scan_result = scanner.scan_with_events(&self.source, events)?;
        for error in scan_result.errors {
            errors.push(error.to_string());
        }
        let files = scan_result.files;
        let scanned = files.len();

        // Phase 2: extract metadata in parallel through the shared store
        events.send(Event::Run(RunEvent::PhaseChanged {
            phase: RunPhase::Extracting,
        }));
        events.send(Event::Extract(ExtractEvent::Started {
            total_files: scanned,
        }));

        let extractor = MetadataExtractor::new(Arc::clone(&self.store));
        let cache_hits = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);

        let mut extracted: Vec<(MediaFile, MetadataRecord)> = files
            .into_par_iter()
            .map(|file| {
                let extraction = extractor.extract(&file);
                if extraction.from_cache {
                    cache_hits.fetch_add(1, Ordering::SeqCst);
                    events.send(Event::Extract(ExtractEvent::CacheHit {
                        path: file.path.clone(),
                    }));
                }
                events.send(Event::Extract(ExtractEvent::Progress(ExtractProgress {
                    completed: completed.fetch_add(1, Ordering::SeqCst) + 1,
                    total: scanned,
                    current_path: file.path.clone(),
                })));
                (file, extraction.record)
            })
            .collect();

        let cache_hits = cache_hits.load(Ordering::SeqCst);
        events.send(Event::Extract(ExtractEvent::Completed {
            total_extracted: extracted.len(),
            cache_hits,
        }));

        // Deterministic order for collision numbering and session input
        extracted.sort_by(|a, b| a.0.path.cmp(&b.0.path));

        // Phase 3: location enrichment, serialized through the rate gate
        events.send(Event::Run(RunEvent::PhaseChanged {
            phase: RunPhase::Locating,
        }));

        let places: Vec<Option<PlaceInfo>> = extracted
            .iter()
            .map(|(_, record)| {
                let resolver = self.location.as_ref()?;
                let gps = record.gps?;
                resolver.resolve(gps.latitude, gps.longitude)
            })
            .collect();

        // Phase 4: resolve, dedupe, place
        events.send(Event::Run(RunEvent::PhaseChanged {
            phase: RunPhase::Organizing,
        }));
        events.send(Event::Organize(OrganizeEvent::Started {
            total_files: extracted.len(),
        }));

        let path_resolver = PathResolver::new(
            &self.naming_pattern,
            &self.folder_pattern,
            self.routing.clone(),
        )
        .with_slugger(CameraSlugger::with_mappings(self.camera_mappings.clone()))
        .with_sequence_width(self.sequence_width);

        let mut detector = self
            .dedupe
            .as_ref()
            .map(|settings| DuplicateDetector::new(settings.config.clone()));

        let mut organized = 0usize;
        let mut skipped = 0usize;
        let mut duplicates_exact = 0usize;
        let mut duplicates_similar = 0usize;
        let mut session_inputs: Vec<SessionInput> = Vec::new();

        for ((file, record), place) in extracted.iter().zip(places.iter()) {
            let verdict = match detector.as_mut() {
                Some(detector) => match detector.check(file, record) {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        errors.push(format!("{}: {}", file.path.display(), e));
                        DuplicateVerdict::Unique
                    }
                },
                None => DuplicateVerdict::Unique,
            };

            let mut destination =
                path_resolver.resolve(file, record, place.as_ref(), &self.destination);

            if verdict.is_duplicate() {
                let (original, score) = match &verdict {
                    DuplicateVerdict::ExactDuplicateOf { original } => {
                        duplicates_exact += 1;
                        (original.clone(), 1.0)
                    }
                    DuplicateVerdict::SimilarTo { original, score } => {
                        duplicates_similar += 1;
                        (original.clone(), *score)
                    }
                    DuplicateVerdict::Unique => unreachable!(),
                };
                events.send(Event::Organize(OrganizeEvent::DuplicateFound {
                    path: file.path.clone(),
                    original,
                    score,
                }));

                match self.duplicate_action(&file.path, &verdict) {
                    DuplicateAction::Skip | DuplicateAction::Defer => {
                        skipped += 1;
                        events.send(Event::Organize(OrganizeEvent::FileSkipped {
                            path: file.path.clone(),
                            reason: "duplicate".to_string(),
                        }));
                        continue;
                    }
                    DuplicateAction::Rename => {
                        destination = duplicate_rename(&destination, &file.path);
                    }
                    DuplicateAction::Quarantine => {
                        destination = self.quarantine_path(file);
                    }
                }
            }

            if self.dry_run {
                organized += 1;
                events.send(Event::Organize(OrganizeEvent::FileOrganized {
                    source: file.path.clone(),
                    destination: destination.clone(),
                }));
                session_inputs.push(SessionInput {
                    path: destination,
                    record: record.clone(),
                    place: place.clone(),
                });
                continue;
            }

            match self.place_file(&file.path, &destination) {
                Ok(()) => {
                    organized += 1;
                    events.send(Event::Organize(OrganizeEvent::FileOrganized {
                        source: file.path.clone(),
                        destination: destination.clone(),
                    }));
                    session_inputs.push(SessionInput {
                        path: destination,
                        record: record.clone(),
                        place: place.clone(),
                    });
                }
                Err(reason) => {
                    warn!(path = %file.path.display(), reason = %reason, "failed to place file");
                    events.send(Event::Organize(OrganizeEvent::Error {
                        path: file.path.clone(),
                        message: reason.clone(),
                    }));
                    errors.push(format!("{}: {}", file.path.display(), reason));
                }
            }
        }

        events.send(Event::Organize(OrganizeEvent::Completed { organized, skipped }));

        // Phase 5: sessions over the organized batch
        let sessions = match &self.sessions {
            Some(config) => {
                events.send(Event::Run(RunEvent::PhaseChanged {
                    phase: RunPhase::Sessions,
                }));
                SessionDetector::new(config.clone()).detect(&session_inputs)
            }
            None => Vec::new(),
        };

        // Phase 6: backup, one destination at a time
        let mut backups = Vec::new();
        if !self.backup.destinations.is_empty() && !self.dry_run {
            events.send(Event::Run(RunEvent::PhaseChanged {
                phase: RunPhase::Backup,
            }));

            let sync = BackupSync::new(self.backup.verify);
            for destination in &self.backup.destinations {
                match sync.sync_with_events(&self.destination, destination, events) {
                    Ok(report) => backups.push(DestinationReport {
                        destination: destination.clone(),
                        report,
                    }),
                    Err(e) => errors.push(format!("backup {}: {}", destination.display(), e)),
                }
            }
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;

        events.send(Event::Run(RunEvent::Completed {
            summary: RunSummary {
                total_files: scanned,
                organized,
                skipped,
                duplicates_exact,
                duplicates_similar,
                sessions: sessions.len(),
                duration_ms,
            },
        }));

        Ok(RunReport {
            run_id: Uuid::new_v4().to_string(),
            scanned,
            organized,
            skipped,
            duplicates_exact,
            duplicates_similar,
            cache_hits,
            sessions,
            backups,
            errors,
            duration_ms,
        })
    }

    fn duplicate_action(&self, path: &Path, verdict: &DuplicateVerdict) -> DuplicateAction {
        let configured = self
            .dedupe
            .as_ref()
            .map(|s| s.action)
            .unwrap_or(DuplicateAction::Skip);

        if configured != DuplicateAction::Defer {
            return configured;
        }

        match &self.on_duplicate {
            Some(callback) => callback(path, verdict),
            None => {
                warn!(path = %path.display(), "defer action without a callback, skipping");
                DuplicateAction::Skip
            }
        }
    }

    fn quarantine_path(&self, file: &MediaFile) -> PathBuf {
        let folder = self
            .dedupe
            .as_ref()
            .map(|s| s.quarantine_folder.as_str())
            .unwrap_or("DUPLICATES");
        let directory = self.destination.join(folder);

        let stem = file
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("duplicate");
        let extension = file.extension().unwrap_or_default();

        next_available_path(&directory, stem, &extension, self.sequence_width, &file.path)
    }

    fn place_file(&self, source: &Path, destination: &Path) -> Result<(), String> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        match self.operation {
            OperationMode::Copy => copy_atomic(source, destination),
            OperationMode::Move => match std::fs::rename(source, destination) {
                Ok(()) => Ok(()),
                Err(_) => {
                    // Cross-device move: copy then remove
                    copy_atomic(source, destination)?;
                    std::fs::remove_file(source).map_err(|e| e.to_string())
                }
            },
        }
    }
}

/// Suffix a resolved destination for the rename duplicate action.
fn duplicate_rename(destination: &Path, source: &Path) -> PathBuf {
    let directory = destination.parent().unwrap_or(Path::new(""));
    let stem = destination
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("duplicate");
    let extension = destination
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    next_available_path(directory, &format!("{}_dup", stem), extension, 2, source)
}
