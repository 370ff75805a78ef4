//! Studio state shared by the editing API and autosave.
//!
//! The deck and session sit behind one mutex; every read-modify-write takes
//! it for the whole operation. Evidence, media and config are fixed for the
//! lifetime of the state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deck_core::config::{ImagesConfig, StudioConfig, MIN_AUTOSAVE_SECS};
use deck_core::{
    apply_fixes, autofix, fix_all, Deck, DeckConfig, DeckMetadata, DeckPayload, Error, Evidence,
    EvidenceIndex, FieldUpdates, GitFacts, MediaAsset, OutputFormat, QualityReport, Result, Slide,
    Theme, Validator, VisualSelector,
};
use deck_project::{run_generation, DraftProposal, GenerateOptions};
use deck_render::{BundleWriter, HtmlRenderer, MarkdownRenderer};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::session::{PresenterState, SaveOutcome, Session, SessionLoad, SessionState, SessionStore};

/// Inputs fixed when the studio opens.
#[derive(Debug, Clone)]
pub struct StudioContext {
    pub root: PathBuf,
    pub config: DeckConfig,
    pub schema_version: String,
    pub metadata: DeckMetadata,
    pub git_context: GitFacts,
    pub index: EvidenceIndex,
    pub media: Vec<MediaAsset>,
    pub warnings: Vec<String>,
}

/// Project overview returned by `get_context`.
#[derive(Debug, Clone, Serialize)]
pub struct ContextView {
    pub schema_version: String,
    pub metadata: DeckMetadata,
    pub git_context: GitFacts,
    pub quality_report: QualityReport,
    pub theme: Theme,
    pub images: ImagesConfig,
    pub studio: StudioConfig,
    pub read_only: bool,
    pub session_state: SessionState,
    pub warnings: Vec<String>,
}

/// Response of every slide mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Mutation {
    /// False when read-only mode turned the call into a no-op.
    pub applied: bool,
    pub slides: Vec<Slide>,
    pub quality_report: QualityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes: Option<usize>,
}

/// Partial session update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub selected_slides: Option<Vec<String>>,
    #[serde(default)]
    pub slide_order: Option<Vec<String>>,
    #[serde(default)]
    pub note_blocks: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub pinned_evidence: Option<BTreeMap<String, BTreeSet<String>>>,
    #[serde(default)]
    pub presenter: Option<PresenterState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub applied: bool,
    pub session: Session,
    pub quality_report: QualityReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveView {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub state: SessionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportView {
    pub format: OutputFormat,
    /// Rendered documents by kind, when no output path was given.
    pub outputs: BTreeMap<String, String>,
    pub paths: Vec<PathBuf>,
    pub applied: bool,
}

struct Workspace {
    deck: Deck,
    session: Session,
    store: SessionStore,
    report: QualityReport,
}

/// Clears the in-flight flag when dropped.
pub struct SaveGuard(Arc<AtomicBool>);

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Deck, session and project context for one studio process.
pub struct StudioState {
    context: StudioContext,
    validator: Validator,
    selector: VisualSelector,
    workspace: Mutex<Workspace>,
    saving: Arc<AtomicBool>,
}

impl StudioState {
    /// Generate the deck for `project` and replay the saved session over it.
    ///
    /// The quality gate is not enforced here; the studio always opens and
    /// reports problems instead.
    pub fn open(project: &Path, config: DeckConfig) -> Result<Self> {
        let options = GenerateOptions {
            enforce_gate: false,
            ..GenerateOptions::new(project)
        };
        let generation = run_generation(&options, &config)?;
        let root = project.canonicalize()?;
        let payload = generation.payload;
        let index = generation.index;

        let validator = Validator::new(&config);
        let selector = VisualSelector::new(&config.images);
        let mut deck = Deck::new(payload.slides);

        let mut store = SessionStore::from_config(&root, &config.studio);
        let fresh = !store.session_path().is_file();
        let SessionLoad {
            mut session,
            warnings: session_warnings,
        } = store.load(&deck.order(), &index)?;
        if fresh {
            session.presenter.timer_minutes = config.studio.timer_minutes;
        }

        let mut warnings = generation.warnings;
        warnings.extend(session_warnings);
        replay_session(&mut deck, &mut session, &index, &mut warnings);
        selector.rescore_deck(&mut deck, &payload.media_catalog);

        let report = validator.validate(deck.slides(), &index);
        session.last_validation = Some(report.clone());
        log::debug!(
            "Opened studio for {} with {} slide(s)",
            root.display(),
            deck.len()
        );

        Ok(Self {
            context: StudioContext {
                root,
                config,
                schema_version: payload.schema_version,
                metadata: payload.metadata,
                git_context: payload.git_context,
                index,
                media: payload.media_catalog,
                warnings,
            },
            validator,
            selector,
            workspace: Mutex::new(Workspace {
                deck,
                session,
                store,
                report,
            }),
            saving: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn context(&self) -> &StudioContext {
        &self.context
    }

    pub fn is_read_only(&self) -> bool {
        self.context.config.studio.read_only
    }

    /// Configured autosave period, never below the minimum.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.context.config.studio.autosave_interval_secs.max(MIN_AUTOSAVE_SECS))
    }

    pub fn context_view(&self) -> ContextView {
        let ws = self.workspace.lock();
        ContextView {
            schema_version: self.context.schema_version.clone(),
            metadata: self.context.metadata.clone(),
            git_context: self.context.git_context.clone(),
            quality_report: ws.report.clone(),
            theme: self.context.config.general.theme,
            images: self.context.config.images.clone(),
            studio: self.context.config.studio.clone(),
            read_only: self.is_read_only(),
            session_state: ws.store.state(),
            warnings: self.context.warnings.clone(),
        }
    }

    pub fn evidence(&self) -> Vec<Evidence> {
        self.context.index.records().to_vec()
    }

    pub fn media(&self) -> Vec<MediaAsset> {
        self.context.media.clone()
    }

    pub fn slides(&self) -> Vec<Slide> {
        self.workspace.lock().deck.slides().to_vec()
    }

    pub fn session(&self) -> Session {
        self.workspace.lock().session.clone()
    }

    pub fn session_state(&self) -> SessionState {
        self.workspace.lock().store.state()
    }

    /// Apply field edits to several slides at once.
    ///
    /// Either every patch applies or none does. Visual confidences are
    /// re-scored against the edited text.
    pub fn replace_slides(&self, patches: &[DraftProposal]) -> Result<Mutation> {
        let mut ws = self.workspace.lock();
        if self.is_read_only() {
            return Ok(mutation(&ws, false, None));
        }

        let mut deck = ws.deck.clone();
        for patch in patches {
            deck.replace_fields(&patch.slide_id, &patch.updates, &self.context.index)?;
        }
        self.selector.rescore_deck(&mut deck, &self.context.media);
        self.commit(&mut ws, deck);
        Ok(mutation(&ws, true, None))
    }

    pub fn reorder_slide(&self, slide_id: &str, new_index: usize) -> Result<Mutation> {
        let mut ws = self.workspace.lock();
        if self.is_read_only() {
            return Ok(mutation(&ws, false, None));
        }

        let mut deck = ws.deck.clone();
        deck.reorder(slide_id, new_index)?;
        self.commit(&mut ws, deck);
        Ok(mutation(&ws, true, None))
    }

    /// Update presenter state, selection, order, notes or pins.
    ///
    /// Unknown slide ids and pins to evidence outside the index are
    /// rejected before anything changes.
    pub fn update_session(&self, update: SessionUpdate) -> Result<SessionView> {
        let mut ws = self.workspace.lock();
        if self.is_read_only() {
            return Ok(session_view(&ws, false));
        }

        let known = |id: &String| ws.deck.get(id).is_some();
        let mentioned = update
            .selected_slides
            .iter()
            .flatten()
            .chain(update.note_blocks.iter().flat_map(|m| m.keys()))
            .chain(update.pinned_evidence.iter().flat_map(|m| m.keys()));
        for id in mentioned {
            if !known(id) {
                return Err(Error::UnknownSlide(id.clone()));
            }
        }
        for (slide_id, pins) in update.pinned_evidence.iter().flatten() {
            if let Some(missing) = self.context.index.first_missing(pins) {
                return Err(Error::DanglingReference {
                    slide_id: slide_id.clone(),
                    evidence_id: missing.clone(),
                });
            }
        }

        let mut deck = ws.deck.clone();
        if let Some(order) = &update.slide_order {
            deck.apply_order(order);
        }
        if let Some(notes) = &update.note_blocks {
            for (slide_id, text) in notes {
                let updates = FieldUpdates {
                    notes: Some(text.clone()),
                    ..FieldUpdates::default()
                };
                deck.replace_fields(slide_id, &updates, &self.context.index)?;
            }
        }

        if let Some(selected) = update.selected_slides {
            ws.session.selected_slides = selected;
        }
        if let Some(pins) = update.pinned_evidence {
            ws.session.pinned_evidence = pins.into_iter().filter(|(_, p)| !p.is_empty()).collect();
        }
        if let Some(mut presenter) = update.presenter {
            presenter.last_slide_index = presenter.last_slide_index.min(deck.len().saturating_sub(1));
            ws.session.presenter = presenter;
        }
        self.commit(&mut ws, deck);
        Ok(session_view(&ws, true))
    }

    pub fn save_session(&self) -> Result<SaveView> {
        let mut ws = self.workspace.lock();
        let Workspace { store, session, .. } = &mut *ws;
        let outcome = store.save(session)?;
        Ok(SaveView {
            applied: outcome.applied(),
            path: match outcome {
                SaveOutcome::Saved(path) => Some(path),
                SaveOutcome::ReadOnly => None,
            },
            state: store.state(),
        })
    }

    /// Re-validate the current slides.
    pub fn validate(&self) -> QualityReport {
        let mut ws = self.workspace.lock();
        let report = self.validator.validate(ws.deck.slides(), &self.context.index);
        ws.report = report.clone();
        ws.session.last_validation = Some(report.clone());
        report
    }

    /// Apply remediations for the given issue strings.
    pub fn auto_fix(&self, issues: &[String]) -> Result<Mutation> {
        let mut ws = self.workspace.lock();
        if self.is_read_only() {
            return Ok(mutation(&ws, false, None));
        }

        let parsed = autofix::parse_issues(issues);
        let outcome = apply_fixes(ws.deck.slides(), &self.context.index, &parsed, &self.context.config);
        self.commit(&mut ws, Deck::new(outcome.slides));
        Ok(mutation(&ws, true, None))
    }

    /// Validate and fix repeatedly until the deck stops changing.
    pub fn fix_all(&self, max_passes: Option<usize>) -> Result<Mutation> {
        let mut ws = self.workspace.lock();
        if self.is_read_only() {
            return Ok(mutation(&ws, false, None));
        }

        let outcome = fix_all(
            ws.deck.slides(),
            &self.context.index,
            &self.validator,
            &self.context.config,
            max_passes.unwrap_or(autofix::DEFAULT_MAX_PASSES),
        );
        self.commit(&mut ws, Deck::new(outcome.slides));
        Ok(mutation(&ws, true, Some(outcome.passes)))
    }

    /// Re-select visuals for the given slides, or all slides.
    pub fn auto_fix_visuals(&self, slide_ids: Option<&[String]>) -> Result<Mutation> {
        let mut ws = self.workspace.lock();
        if self.is_read_only() {
            return Ok(mutation(&ws, false, None));
        }

        let mut deck = ws.deck.clone();
        if let Some(unknown) = slide_ids.into_iter().flatten().find(|id| deck.get(id).is_none()) {
            return Err(Error::UnknownSlide(unknown.clone()));
        }
        self.selector
            .attach_all(&mut deck, &self.context.media, &self.context.index, slide_ids)?;
        self.commit(&mut ws, deck);
        Ok(mutation(&ws, true, None))
    }

    /// The current deck as a serializable payload with a fresh report.
    pub fn payload(&self) -> DeckPayload {
        let ws = self.workspace.lock();
        self.payload_of(&ws)
    }

    /// Render the deck; write files only when `output` is given.
    ///
    /// `output` must resolve inside the project directory. Read-only mode
    /// renders but never writes.
    pub fn export(&self, format: OutputFormat, output: Option<&str>) -> Result<ExportView> {
        let payload = self.payload();
        let theme = self.context.config.general.theme;

        let Some(output) = output else {
            let mut outputs = BTreeMap::new();
            if matches!(format, OutputFormat::Html | OutputFormat::Both) {
                outputs.insert("html".to_string(), HtmlRenderer::new().with_theme(theme).render(&payload)?);
            }
            if matches!(format, OutputFormat::Markdown | OutputFormat::Both) {
                outputs.insert("markdown".to_string(), MarkdownRenderer::new().with_theme(theme).render(&payload));
            }
            if format == OutputFormat::Json {
                outputs.insert("json".to_string(), serde_json::to_string_pretty(&payload)?);
            }
            return Ok(ExportView {
                format,
                outputs,
                paths: Vec::new(),
                applied: true,
            });
        };

        let target = safe_project_path(&self.context.root, output)?;
        if self.is_read_only() {
            return Ok(ExportView {
                format,
                outputs: BTreeMap::new(),
                paths: Vec::new(),
                applied: false,
            });
        }

        let depth = target
            .parent()
            .and_then(|dir| dir.strip_prefix(&self.context.root).ok())
            .map(|rel| rel.components().count())
            .unwrap_or(0);
        let files = BundleWriter::new(&target)
            .with_format(format)
            .with_theme(theme)
            .with_asset_prefix("../".repeat(depth))
            .write(&payload)?;
        log::debug!("Exported deck to {}", target.display());

        Ok(ExportView {
            format,
            outputs: BTreeMap::new(),
            paths: files.all(),
            applied: true,
        })
    }

    /// Mark an autosave as in flight; `None` if one already is.
    pub fn try_begin_save(&self) -> Option<SaveGuard> {
        self.saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SaveGuard(Arc::clone(&self.saving)))
    }

    /// Save if there are unsaved edits. `None` means nothing to do.
    pub fn autosave(&self) -> Result<Option<SaveOutcome>> {
        let mut ws = self.workspace.lock();
        if !ws.store.is_dirty() {
            return Ok(None);
        }
        let Workspace { store, session, .. } = &mut *ws;
        store.save(session).map(Some)
    }

    /// Install an edited deck: record changed slides in the session,
    /// refresh the report and mark the session dirty.
    fn commit(&self, ws: &mut Workspace, deck: Deck) {
        for slide in deck.slides() {
            if ws.deck.get(&slide.id) == Some(slide) {
                continue;
            }
            ws.session.draft_overrides.insert(slide.id.clone(), field_snapshot(slide));
            if slide.notes.is_empty() {
                ws.session.note_blocks.remove(&slide.id);
            } else {
                ws.session.note_blocks.insert(slide.id.clone(), slide.notes.clone());
            }
        }
        ws.session.slide_order = deck.order();
        ws.deck = deck;

        ws.report = self.validator.validate(ws.deck.slides(), &self.context.index);
        ws.session.last_validation = Some(ws.report.clone());
        ws.store.mark_dirty();
    }

    fn payload_of(&self, ws: &Workspace) -> DeckPayload {
        DeckPayload {
            schema_version: self.context.schema_version.clone(),
            metadata: self.context.metadata.clone(),
            git_context: self.context.git_context.clone(),
            slides: ws.deck.slides().to_vec(),
            evidence: self.context.index.records().to_vec(),
            media_catalog: self.context.media.clone(),
            quality_report: self.validator.validate(ws.deck.slides(), &self.context.index),
        }
    }
}

fn mutation(ws: &Workspace, applied: bool, passes: Option<usize>) -> Mutation {
    Mutation {
        applied,
        slides: ws.deck.slides().to_vec(),
        quality_report: ws.report.clone(),
        passes,
    }
}

fn session_view(ws: &Workspace, applied: bool) -> SessionView {
    SessionView {
        applied,
        session: ws.session.clone(),
        quality_report: ws.report.clone(),
    }
}

/// Every editable field of a slide, as an update that recreates it.
fn field_snapshot(slide: &Slide) -> FieldUpdates {
    FieldUpdates {
        title: Some(slide.title.clone()),
        subtitle: slide.body.subtitle().map(str::to_string),
        content: slide.body.content().map(str::to_string),
        list_items: slide.body.list_items().map(<[String]>::to_vec),
        notes: Some(slide.notes.clone()),
        claims: Some(slide.claims.clone()),
        evidence_refs: Some(slide.evidence_refs.clone()),
    }
}

/// Replay saved order, edits and notes onto a freshly generated deck.
///
/// Edits that no longer apply (the field is gone or cited evidence
/// vanished) are dropped with a warning.
fn replay_session(deck: &mut Deck, session: &mut Session, index: &EvidenceIndex, warnings: &mut Vec<String>) {
    deck.apply_order(&session.slide_order);

    let mut stale = Vec::new();
    for (slide_id, updates) in &session.draft_overrides {
        if let Err(e) = deck.replace_fields(slide_id, updates, index) {
            warnings.push(format!("Dropped saved edits for slide '{}': {}", slide_id, e));
            stale.push(slide_id.clone());
        }
    }
    for slide_id in stale {
        session.draft_overrides.remove(&slide_id);
    }

    for (slide_id, text) in &session.note_blocks {
        let updates = FieldUpdates {
            notes: Some(text.clone()),
            ..FieldUpdates::default()
        };
        if let Err(e) = deck.replace_fields(slide_id, &updates, index) {
            log::warn!("Could not restore notes for slide '{}': {}", slide_id, e);
        }
    }
    session.slide_order = deck.order();
}

/// Resolve `candidate` against `root` and refuse anything outside it.
///
/// Resolution is lexical, so the target does not need to exist.
pub fn safe_project_path(root: &Path, candidate: &str) -> Result<PathBuf> {
    let unsafe_path = || Error::UnsafePath(candidate.to_string());
    let candidate_path = Path::new(candidate.trim());
    if candidate.trim().is_empty() {
        return Err(unsafe_path());
    }
    let joined = if candidate_path.is_absolute() {
        candidate_path.to_path_buf()
    } else {
        root.join(candidate_path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(unsafe_path());
                }
            }
            Component::CurDir => {}
            other => resolved.push(other.as_os_str()),
        }
    }

    if resolved == root || !resolved.starts_with(root) {
        return Err(unsafe_path());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, open_state, sample_project};

    fn retitle(slide_id: &str, title: &str) -> DraftProposal {
        DraftProposal {
            slide_id: slide_id.into(),
            updates: FieldUpdates {
                title: Some(title.into()),
                ..FieldUpdates::default()
            },
        }
    }

    #[test]
    fn test_open_reconciles_session() {
        let (_dir, state) = open_state(false);
        let slides = state.slides();
        assert!(!slides.is_empty());
        let ids: Vec<String> = slides.iter().map(|s| s.id.clone()).collect();
        assert_eq!(state.session().slide_order, ids);
        assert!(state.session().last_validation.is_some());
        assert_eq!(state.session_state(), SessionState::Loaded);
    }

    #[test]
    fn test_replace_slides_marks_dirty_and_persists() {
        let (dir, state) = open_state(false);
        let result = state.replace_slides(&[retitle("problem", "Why Decks Drift")]).unwrap();
        assert!(result.applied);
        assert_eq!(state.session_state(), SessionState::Dirty);
        assert!(state.session().draft_overrides.contains_key("problem"));

        let saved = state.save_session().unwrap();
        assert!(saved.applied);
        drop(state);

        let reopened = StudioState::open(dir.path(), config(false)).unwrap();
        let problem = reopened.slides().into_iter().find(|s| s.id == "problem").unwrap();
        assert_eq!(problem.title, "Why Decks Drift");
    }

    #[test]
    fn test_replace_slides_is_all_or_nothing() {
        let (_dir, state) = open_state(false);
        let before = state.slides();
        let bad = DraftProposal {
            slide_id: "solution".into(),
            updates: FieldUpdates {
                evidence_refs: Some(vec!["doc.nowhere".into()]),
                ..FieldUpdates::default()
            },
        };
        let err = state
            .replace_slides(&[retitle("problem", "Changed"), bad])
            .unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));
        assert_eq!(state.slides(), before);
        assert_eq!(state.session_state(), SessionState::Loaded);
    }

    #[test]
    fn test_reorder_survives_reopen() {
        let (dir, state) = open_state(false);
        let last = state.slides().len() - 1;
        state.reorder_slide("title", last).unwrap();
        state.save_session().unwrap();
        drop(state);

        let reopened = StudioState::open(dir.path(), config(false)).unwrap();
        assert_eq!(reopened.slides().last().map(|s| s.id.as_str()), Some("title"));
    }

    #[test]
    fn test_read_only_mutations_are_noops() {
        let (_dir, state) = open_state(true);
        let before = state.slides();
        let result = state.replace_slides(&[retitle("problem", "Changed")]).unwrap();
        assert!(!result.applied);
        assert_eq!(state.slides(), before);

        let saved = state.save_session().unwrap();
        assert!(!saved.applied);
        assert!(saved.path.is_none());
    }

    #[test]
    fn test_update_session_rejects_unknown_pins() {
        let (_dir, state) = open_state(false);
        let mut pins = BTreeMap::new();
        pins.insert("problem".to_string(), BTreeSet::from(["doc.nowhere".to_string()]));
        let err = state
            .update_session(SessionUpdate {
                pinned_evidence: Some(pins),
                ..SessionUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));

        let mut pins = BTreeMap::new();
        pins.insert("problem".to_string(), BTreeSet::from(["doc.problem".to_string()]));
        let view = state
            .update_session(SessionUpdate {
                pinned_evidence: Some(pins),
                presenter: Some(PresenterState {
                    timer_minutes: 5,
                    last_slide_index: 99,
                }),
                ..SessionUpdate::default()
            })
            .unwrap();
        assert!(view.applied);
        assert!(view.session.pinned_evidence["problem"].contains("doc.problem"));
        assert_eq!(view.session.presenter.last_slide_index, state.slides().len() - 1);
    }

    #[test]
    fn test_fix_all_reports_passes() {
        let (_dir, state) = open_state(false);
        let result = state.fix_all(None).unwrap();
        assert!(result.applied);
        assert!(result.passes.unwrap_or(0) >= 1);
        assert_eq!(result.quality_report, state.validate());
    }

    #[test]
    fn test_export_renders_and_writes_inside_project() {
        let (dir, state) = open_state(false);
        let rendered = state.export(OutputFormat::Both, None).unwrap();
        assert!(rendered.outputs["html"].starts_with("<!DOCTYPE html>"));
        assert!(rendered.outputs["markdown"].starts_with("---\nmarp: true"));

        let written = state.export(OutputFormat::Html, Some("out/deck.html")).unwrap();
        assert!(written.applied);
        let root = dir.path().canonicalize().unwrap();
        assert!(written.paths.contains(&root.join("out/deck.html")));

        let escaped = state.export(OutputFormat::Html, Some("../deck.html"));
        assert!(matches!(escaped, Err(Error::UnsafePath(_))));
    }

    #[test]
    fn test_safe_project_path() {
        let root = Path::new("/work/project");
        assert_eq!(
            safe_project_path(root, "out/./deck.html").unwrap(),
            PathBuf::from("/work/project/out/deck.html")
        );
        assert!(safe_project_path(root, "out/../../etc/passwd").is_err());
        assert!(safe_project_path(root, "/tmp/deck.html").is_err());
        assert!(safe_project_path(root, ".").is_err());
        assert!(safe_project_path(root, "").is_err());
    }

    #[test]
    fn test_save_guard_blocks_second_save() {
        let dir = sample_project();
        let state = StudioState::open(dir.path(), config(false)).unwrap();
        let guard = state.try_begin_save().unwrap();
        assert!(state.try_begin_save().is_none());
        drop(guard);
        assert!(state.try_begin_save().is_some());
    }
}
