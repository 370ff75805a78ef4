//! Persisted editor state for one project.
//!
//! The session lives at `<project>/.deckgen/studio/session.json`. Saves go
//! through a temp file that is synced and renamed over the target, and the
//! previous file is copied to `snapshots/` on a fixed cadence first.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use deck_core::config::StudioConfig;
use deck_core::{Error, EvidenceIndex, FieldUpdates, QualityReport, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SESSION_SCHEMA_VERSION: &str = "1.0";

/// Session directory relative to the project root.
pub const SESSION_DIR: &str = ".deckgen/studio";
pub const SESSION_FILE: &str = "session.json";
pub const SNAPSHOT_DIR: &str = "snapshots";

const SNAPSHOT_PREFIX: &str = "session-";

/// Presenter view state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenterState {
    pub timer_minutes: u32,
    pub last_slide_index: usize,
}

impl Default for PresenterState {
    fn default() -> Self {
        Self {
            timer_minutes: 7,
            last_slide_index: 0,
        }
    }
}

/// Editor state that outlives the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub studio_schema_version: String,
    pub selected_slides: Vec<String>,
    pub slide_order: Vec<String>,
    /// Field edits per slide id, replayed over a freshly generated deck.
    pub draft_overrides: BTreeMap<String, FieldUpdates>,
    pub note_blocks: BTreeMap<String, String>,
    pub pinned_evidence: BTreeMap<String, BTreeSet<String>>,
    pub presenter: PresenterState,
    pub last_validation: Option<QualityReport>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            studio_schema_version: SESSION_SCHEMA_VERSION.to_string(),
            selected_slides: Vec::new(),
            slide_order: Vec::new(),
            draft_overrides: BTreeMap::new(),
            note_blocks: BTreeMap::new(),
            pinned_evidence: BTreeMap::new(),
            presenter: PresenterState::default(),
            last_validation: None,
        }
    }
}

impl Session {
    /// Build a session from arbitrary JSON, keeping every field that parses.
    ///
    /// Missing or malformed fields fall back to their defaults; each
    /// malformed field adds a warning.
    pub fn migrate(value: Value) -> (Self, Vec<String>) {
        let mut session = Session::default();
        let mut warnings = Vec::new();
        let Value::Object(map) = value else {
            warnings.push("Session file is not a JSON object; starting fresh.".to_string());
            return (session, warnings);
        };

        take(&map, "selected_slides", &mut session.selected_slides, &mut warnings);
        take(&map, "slide_order", &mut session.slide_order, &mut warnings);
        take(&map, "draft_overrides", &mut session.draft_overrides, &mut warnings);
        take(&map, "note_blocks", &mut session.note_blocks, &mut warnings);
        take(&map, "pinned_evidence", &mut session.pinned_evidence, &mut warnings);
        take(&map, "presenter", &mut session.presenter, &mut warnings);
        take(&map, "last_validation", &mut session.last_validation, &mut warnings);

        session.studio_schema_version = SESSION_SCHEMA_VERSION.to_string();
        (session, warnings)
    }

    /// Align the session with the current slides and evidence.
    ///
    /// Known ids keep their saved order, new slides are appended in deck
    /// order, and state for unknown slides or evidence is dropped.
    pub fn reconcile(&mut self, slide_ids: &[String], index: &EvidenceIndex) {
        let known: BTreeSet<&str> = slide_ids.iter().map(String::as_str).collect();

        let mut seen = BTreeSet::new();
        let mut order: Vec<String> = self
            .slide_order
            .iter()
            .filter(|id| known.contains(id.as_str()) && seen.insert(id.to_string()))
            .cloned()
            .collect();
        order.extend(slide_ids.iter().filter(|id| !seen.contains(*id)).cloned());
        if order.len() != self.slide_order.len() {
            log::debug!(
                "Reconciled session order from {} to {} slide(s)",
                self.slide_order.len(),
                order.len()
            );
        }
        self.slide_order = order;

        self.selected_slides.retain(|id| known.contains(id.as_str()));
        self.draft_overrides.retain(|id, _| known.contains(id.as_str()));
        self.note_blocks.retain(|id, _| known.contains(id.as_str()));
        self.pinned_evidence.retain(|id, _| known.contains(id.as_str()));
        for pins in self.pinned_evidence.values_mut() {
            pins.retain(|e| index.contains(e));
        }
        self.pinned_evidence.retain(|_, pins| !pins.is_empty());

        let last = slide_ids.len().saturating_sub(1);
        self.presenter.last_slide_index = self.presenter.last_slide_index.min(last);
    }
}

fn take<T: DeserializeOwned>(map: &Map<String, Value>, key: &str, slot: &mut T, warnings: &mut Vec<String>) {
    let Some(value) = map.get(key) else {
        return;
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(e) => warnings.push(format!("Ignored malformed session field '{}': {}", key, e)),
    }
}

/// Lifecycle of a [`SessionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Loaded,
    /// In-memory edits not yet on disk.
    Dirty,
    Saved,
}

/// What a save did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// Read-only mode; nothing was written.
    ReadOnly,
}

impl SaveOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

/// Loaded session plus anything worth telling the user.
#[derive(Debug, Clone)]
pub struct SessionLoad {
    pub session: Session,
    pub warnings: Vec<String>,
}

/// Reads and writes one project's session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    read_only: bool,
    snapshot_every: u32,
    max_snapshots: usize,
    saves: u64,
    state: SessionState,
}

impl SessionStore {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            root: project_root.into(),
            read_only: false,
            snapshot_every: 1,
            max_snapshots: 20,
            saves: 0,
            state: SessionState::Uninitialized,
        }
    }

    pub fn from_config(project_root: impl Into<PathBuf>, config: &StudioConfig) -> Self {
        Self::new(project_root)
            .with_read_only(config.read_only)
            .with_snapshot_every(config.snapshot_every)
            .with_max_snapshots(config.max_snapshots)
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Snapshot before every Nth save (values below 1 mean every save).
    pub fn with_snapshot_every(mut self, every: u32) -> Self {
        self.snapshot_every = every.max(1);
        self
    }

    pub fn with_max_snapshots(mut self, max: usize) -> Self {
        self.max_snapshots = max;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_path(&self) -> PathBuf {
        self.root.join(SESSION_DIR).join(SESSION_FILE)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join(SESSION_DIR).join(SNAPSHOT_DIR)
    }

    /// Load the session file (or defaults) and reconcile it.
    ///
    /// A corrupt file is not an error: the session starts from defaults
    /// and a warning says so.
    pub fn load(&mut self, slide_ids: &[String], index: &EvidenceIndex) -> Result<SessionLoad> {
        let path = self.session_path();
        let (mut session, warnings) = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => Session::migrate(value),
                Err(e) => {
                    log::warn!("Session file {} is corrupt: {}", path.display(), e);
                    (
                        Session::default(),
                        vec![format!("Session file was unreadable and has been reset: {}", e)],
                    )
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => (Session::default(), Vec::new()),
            Err(e) => return Err(session_error("read", &path, e)),
        };

        session.reconcile(slide_ids, index);
        self.state = SessionState::Loaded;
        Ok(SessionLoad { session, warnings })
    }

    pub fn mark_dirty(&mut self) {
        if self.state != SessionState::Uninitialized {
            self.state = SessionState::Dirty;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state == SessionState::Dirty
    }

    /// Write the session atomically. Read-only stores report a no-op.
    pub fn save(&mut self, session: &Session) -> Result<SaveOutcome> {
        if self.read_only {
            log::debug!("Read-only session; skipping save");
            return Ok(SaveOutcome::ReadOnly);
        }

        let path = self.session_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| session_error("create", dir, e))?;
        }

        if self.saves % u64::from(self.snapshot_every) == 0 {
            self.snapshot_existing(&path)?;
        }
        self.saves += 1;

        let mut record = session.clone();
        record.studio_schema_version = SESSION_SCHEMA_VERSION.to_string();
        let json = serde_json::to_string_pretty(&record)?;
        write_atomic(&path, json.as_bytes())?;

        self.state = SessionState::Saved;
        log::debug!("Saved session to {}", path.display());
        Ok(SaveOutcome::Saved(path))
    }

    /// Copy the current file to a new snapshot and prune old ones.
    fn snapshot_existing(&self, path: &Path) -> Result<()> {
        let prior = match fs::read(path) {
            Ok(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(session_error("read", path, e)),
        };

        let dir = self.snapshot_dir();
        fs::create_dir_all(&dir).map_err(|e| session_error("create", &dir, e))?;

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S-%f").to_string();
        let mut attempt = 0u32;
        let mut file = loop {
            let target = dir.join(snapshot_name(&stamp, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(file) => break file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(session_error("create", &target, e)),
            }
        };
        file.write_all(&prior)
            .and_then(|_| file.sync_all())
            .map_err(|e| session_error("write snapshot in", &dir, e))?;

        self.prune_snapshots(&dir)
    }

    fn prune_snapshots(&self, dir: &Path) -> Result<()> {
        let mut snapshots = list_snapshots(dir)?;
        if snapshots.len() <= self.max_snapshots {
            return Ok(());
        }
        let excess = snapshots.len() - self.max_snapshots;
        for stale in snapshots.drain(..excess) {
            if let Err(e) = fs::remove_file(&stale) {
                log::warn!("Could not remove old snapshot {}: {}", stale.display(), e);
            }
        }
        Ok(())
    }
}

/// Snapshot file name for `stamp`. Collisions get a zero-padded `_NNN`
/// suffix, which sorts after the unsuffixed name and after lower counters.
fn snapshot_name(stamp: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}{}.json", SNAPSHOT_PREFIX, stamp)
    } else {
        format!("{}{}_{:03}.json", SNAPSHOT_PREFIX, stamp, attempt)
    }
}

/// Snapshot files in `dir`, oldest first.
pub fn list_snapshots(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(session_error("list", dir, e)),
    };
    let mut snapshots: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(".json"))
        })
        .collect();
    snapshots.sort();
    Ok(snapshots)
}

/// Write to `<path>.tmp`, fsync, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let result = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(session_error("write", path, e));
    }
    Ok(())
}

fn session_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::SessionIoError(format!("Failed to {} {}: {}", action, path.display(), e))
}
