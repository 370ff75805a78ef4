//! End-to-end generation and validation.
//!
//! analyze → docs → git → images → evidence → deck → draft → validate →
//! strict gate → visuals → final validation.

use std::fs;
use std::path::{Path, PathBuf};

use deck_core::{
    build_deck, resolve_slide_types, DeckConfig, DeckMetadata, DeckPayload, DocFacts, Error,
    EvidenceBuilder, EvidenceIndex, GitFacts, ImageMode, MediaAsset, ProjectFacts, QualityReport,
    QualityStatus, Result, Validator, VisualSelector, VisualSummary, PAYLOAD_SCHEMA_VERSION,
};
use serde::Serialize;

use crate::analyzer::ProjectAnalyzer;
use crate::docs::DocParser;
use crate::draft::{Draft, DraftOutcome};
use crate::git::GitCollector;
use crate::images::ImageIndexer;

/// Inputs of one generation run besides the resolved config.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub project: PathBuf,
    pub additional_docs: Vec<PathBuf>,
    /// Slide type names; `None` means every type.
    pub slide_types: Option<Vec<String>>,
    /// Overrides `general.max_slides` when set.
    pub max_slides: Option<usize>,
    /// Overrides `general.draft_path` when set.
    pub draft: Option<PathBuf>,
    /// When false a failing strict gate is reported but does not abort.
    pub enforce_gate: bool,
}

impl GenerateOptions {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            additional_docs: Vec::new(),
            slide_types: None,
            max_slides: None,
            draft: None,
            enforce_gate: true,
        }
    }
}

/// Everything gathered from the project before slides are built.
#[derive(Debug, Clone)]
pub struct ProjectScan {
    pub root: PathBuf,
    pub project: ProjectFacts,
    pub docs: DocFacts,
    pub git: GitFacts,
    pub media: Vec<MediaAsset>,
    pub index: EvidenceIndex,
    pub warnings: Vec<String>,
}

/// Result of [`run_generation`].
#[derive(Debug, Clone)]
pub struct Generation {
    pub payload: DeckPayload,
    pub index: EvidenceIndex,
    pub visuals: VisualSummary,
    pub draft: Option<DraftOutcome>,
    pub warnings: Vec<String>,
}

/// Machine-readable result of [`run_validation`].
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub status: QualityStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: deck_core::quality::QualityMetrics,
    pub slide_count: usize,
    pub evidence_count: usize,
    pub media_count: usize,
    pub git_context: GitFacts,
}

/// Gather facts, media and evidence for a project.
pub fn scan_project(options: &GenerateOptions, config: &DeckConfig) -> Result<ProjectScan> {
    let root = options.project.canonicalize().map_err(|e| {
        Error::ScanError(format!(
            "Project directory does not exist: {} ({})",
            options.project.display(),
            e
        ))
    })?;
    let mut warnings = Vec::new();

    let analysis = ProjectAnalyzer::new(&root).analyze()?;
    warnings.extend(analysis.warnings);
    let project = analysis.facts;

    let parsed = DocParser::new(&root)
        .with_additional_docs(options.additional_docs.clone())
        .parse(&project.project_name);
    warnings.extend(parsed.warnings);
    let docs = parsed.facts;

    let git_scan = GitCollector::new(&root)
        .with_enabled(config.git.include_branch_context)
        .with_base_branch(config.git.base_branch.clone())
        .collect();
    warnings.extend(git_scan.warnings);
    let git = git_scan.facts;

    let media = if config.images.effective_mode() == ImageMode::Off {
        Vec::new()
    } else {
        let indexed = ImageIndexer::new(&root, &config.images).index();
        warnings.extend(indexed.warnings);
        indexed.catalog
    };

    let build = EvidenceBuilder::new()
        .with_project_root(&root)
        .build(&project, &docs, &git, &media)?;
    warnings.extend(build.warnings);

    Ok(ProjectScan {
        root,
        project,
        docs,
        git,
        media,
        index: build.index,
        warnings,
    })
}

/// Build, validate and (optionally) gate a deck for a project.
pub fn run_generation(options: &GenerateOptions, config: &DeckConfig) -> Result<Generation> {
    config.validate()?;
    let scan = scan_project(options, config)?;
    let validator = Validator::new(config);

    let max_slides = options.max_slides.or(config.general.max_slides);
    let types = resolve_slide_types(
        options.slide_types.as_deref(),
        max_slides,
        scan.git.has_context(),
    );
    let mut deck = build_deck(&scan.project, &scan.docs, &scan.git, &scan.index, &types);

    let draft_path = options
        .draft
        .clone()
        .or_else(|| config.general.draft_path.as_ref().map(|p| scan.root.join(p)));
    let draft = match draft_path {
        Some(path) => Some(Draft::from_file(&path)?.apply(&mut deck, &scan.index)),
        None => None,
    };

    let report = validator.validate(deck.slides(), &scan.index);
    if options.enforce_gate {
        report.enforce(validator.is_strict())?;
    }

    let visuals = VisualSelector::new(&config.images).attach_all(
        &mut deck,
        &scan.media,
        &scan.index,
        None,
    )?;

    let report = validator.validate(deck.slides(), &scan.index);
    if options.enforce_gate {
        report.enforce(validator.is_strict())?;
    }
    log::debug!(
        "Generated {} slide(s) with status {:?}",
        deck.len(),
        report.status
    );

    let mut warnings = scan.warnings;
    if let Some(outcome) = &draft {
        warnings.extend(outcome.rejected.iter().map(|r| format!("Rejected draft proposal {}", r)));
    }

    let metadata = DeckMetadata {
        project: if scan.docs.title.trim().is_empty() {
            scan.project.project_name.clone()
        } else {
            scan.docs.title.clone()
        },
        languages: scan.project.languages.clone(),
        dependencies: scan.project.dependencies.clone(),
        frameworks: scan.project.frameworks.clone(),
        file_count: scan.project.file_count,
        total_lines: scan.project.total_lines,
    };

    let payload = DeckPayload {
        schema_version: PAYLOAD_SCHEMA_VERSION.to_string(),
        metadata,
        git_context: scan.git,
        slides: deck.into_slides(),
        evidence: scan.index.records().to_vec(),
        media_catalog: scan.media,
        quality_report: report,
    };

    Ok(Generation {
        payload,
        index: scan.index,
        visuals,
        draft,
        warnings,
    })
}

/// Run the pipeline without writing outputs and summarize the result.
///
/// The strict gate is not enforced; failures show up in `status` and
/// `errors` instead.
pub fn run_validation(options: &GenerateOptions, config: &DeckConfig) -> Result<ValidationSummary> {
    let options = GenerateOptions {
        enforce_gate: false,
        ..options.clone()
    };
    let generation = run_generation(&options, config)?;
    Ok(summarize(&generation.payload, generation.warnings))
}

pub fn summarize(payload: &DeckPayload, mut warnings: Vec<String>) -> ValidationSummary {
    let report: &QualityReport = &payload.quality_report;
    warnings.extend(report.warnings.iter().cloned());
    ValidationSummary {
        status: report.status,
        errors: report.errors.clone(),
        warnings,
        metrics: report.metrics.clone(),
        slide_count: payload.slides.len(),
        evidence_count: payload.evidence.len(),
        media_count: payload.media_catalog.len(),
        git_context: payload.git_context.clone(),
    }
}

/// Load a previously written payload and rebuild its evidence index.
pub fn load_payload(path: &Path) -> Result<(DeckPayload, EvidenceIndex)> {
    let text = fs::read_to_string(path)?;
    let payload: DeckPayload = serde_json::from_str(&text)?;
    let index = EvidenceIndex::from_records(payload.evidence.clone())?;
    Ok((payload, index))
}
