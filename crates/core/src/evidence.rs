//! Evidence index: hashed, id-addressable excerpts of project material.
//!
//! Ids are deterministic functions of their source (a fixed semantic key
//! such as `doc.description`, or a path locator such as `src:src/main.rs:1`),
//! so rebuilding from an unchanged project yields byte-identical evidence.
//! A snippet hash attests to the excerpt as shown, after truncation.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::facts::{DocFacts, GitFacts, ProjectFacts};
use crate::normalize::{normalize_snippet, truncate_snippet, TRUNCATION_MARKER};
use crate::types::{Evidence, MediaAsset, SourceKind};

/// Default maximum snippet length in characters.
pub const DEFAULT_SNIPPET_LIMIT: usize = 320;

/// Lines taken from the top of each key source file.
const SOURCE_SNIPPET_LINES: usize = 12;

/// Number of key files excerpted.
const MAX_SOURCE_SNIPPETS: usize = 3;

/// Hex SHA-256 of the normalized snippet.
pub fn snippet_hash(snippet: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_snippet(snippet).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check that an id is non-empty and free of whitespace and control characters.
pub fn validate_evidence_id(id: &str) -> Result<()> {
    if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidEvidenceId(id.to_string()));
    }
    Ok(())
}

/// Percent-encode `%`, whitespace and control characters so a path can sit in an id.
pub fn encode_path_for_id(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '%' || c.is_whitespace() || c.is_control() {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// 1-based inclusive line span of `snippet` inside `source_text`.
///
/// Both sides are normalized before searching; a truncation marker is
/// stripped first. Returns `None` when the excerpt is not found verbatim.
pub fn line_span(source_text: &str, snippet: &str) -> Option<(usize, usize)> {
    let needle = normalize_snippet(snippet.trim_end_matches(TRUNCATION_MARKER));
    if source_text.is_empty() || needle.is_empty() {
        return None;
    }
    let haystack = normalize_snippet(source_text);
    let idx = haystack.find(&needle)?;
    let start = haystack[..idx].matches('\n').count() + 1;
    let end = start + needle.matches('\n').count();
    Some((start, end))
}

/// Insertion-ordered evidence records addressable by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceIndex {
    records: Vec<Evidence>,
    positions: BTreeMap<String, usize>,
}

impl EvidenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from existing records, e.g. a loaded payload.
    ///
    /// Fails on the first duplicate or malformed id.
    pub fn from_records(records: Vec<Evidence>) -> Result<Self> {
        let mut index = Self::new();
        for record in records {
            index.insert(record)?;
        }
        Ok(index)
    }

    /// Add a record; duplicate ids are a construction error.
    pub fn insert(&mut self, record: Evidence) -> Result<()> {
        validate_evidence_id(&record.id)?;
        if self.positions.contains_key(&record.id) {
            return Err(Error::DuplicateEvidence(record.id));
        }
        self.positions.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Evidence> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Keep only ids present in the index, preserving order.
    pub fn filter_present(&self, ids: &[&str]) -> Vec<String> {
        ids.iter()
            .filter(|id| self.contains(id))
            .map(|id| id.to_string())
            .collect()
    }

    /// First id in `refs` that does not resolve.
    pub fn first_missing<'a>(&self, refs: impl IntoIterator<Item = &'a String>) -> Option<&'a String> {
        refs.into_iter().find(|r| !self.contains(r))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Evidence> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Evidence] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Evidence> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of an evidence build: the index plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBuild {
    pub index: EvidenceIndex,
    pub warnings: Vec<String>,
}

/// Builds an [`EvidenceIndex`] from gathered project facts.
#[derive(Debug, Clone)]
pub struct EvidenceBuilder {
    snippet_limit: usize,
    project_root: Option<PathBuf>,
}

impl EvidenceBuilder {
    pub fn new() -> Self {
        Self {
            snippet_limit: DEFAULT_SNIPPET_LIMIT,
            project_root: None,
        }
    }

    /// Set the maximum snippet length.
    pub fn with_snippet_limit(mut self, limit: usize) -> Self {
        self.snippet_limit = limit.max(1);
        self
    }

    /// Set the project root used to read key-file excerpts.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Build evidence in a fixed order: repo, doc, source, git, media.
    pub fn build(
        &self,
        project: &ProjectFacts,
        docs: &DocFacts,
        git: &GitFacts,
        media: &[MediaAsset],
    ) -> Result<EvidenceBuild> {
        let mut build = EvidenceBuild::default();

        self.add_repo(&mut build.index, project)?;
        self.add_docs(&mut build.index, docs)?;
        if let Some(root) = &self.project_root {
            self.add_source_snippets(&mut build, root, &project.key_files)?;
        }
        self.add_git(&mut build.index, git)?;
        self.add_media(&mut build.index, media)?;

        log::debug!(
            "Built {} evidence records ({} warnings)",
            build.index.len(),
            build.warnings.len()
        );
        Ok(build)
    }

    fn add_repo(&self, index: &mut EvidenceIndex, project: &ProjectFacts) -> Result<()> {
        let languages = project
            .languages_by_count()
            .iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect::<Vec<_>>()
            .join("\n");
        let count = |n: usize| if n == 0 { String::new() } else { n.to_string() };

        let entries = [
            ("repo.project", "Project Name", project.project_name.clone()),
            ("repo.files", "Source File Count", count(project.file_count)),
            ("repo.lines", "Total Source Lines", count(project.total_lines)),
            ("repo.languages", "Languages", languages),
            ("repo.frameworks", "Frameworks", project.frameworks.join("\n")),
            ("repo.dependencies", "Dependencies", project.dependencies.join("\n")),
            ("repo.features", "Detected Features", project.features.join("\n")),
        ];
        for (id, title, value) in entries {
            self.add(index, id, title, SourceKind::Repo, None, &value, "")?;
        }
        Ok(())
    }

    fn add_docs(&self, index: &mut EvidenceIndex, docs: &DocFacts) -> Result<()> {
        let path = docs.source_path.as_deref();
        let text = docs.source_text.as_str();
        let entries = [
            ("doc.title", "README Title", docs.title.clone()),
            ("doc.description", "Project Description", docs.description.clone()),
            ("doc.problem", "Problem Statement", docs.problem.clone()),
            ("doc.solution", "Solution Statement", docs.solution.clone()),
            ("doc.features", "Documented Features", docs.features.join("\n")),
        ];
        for (id, title, value) in entries {
            self.add(index, id, title, SourceKind::Doc, path, &value, text)?;
        }
        Ok(())
    }

    fn add_source_snippets(
        &self,
        build: &mut EvidenceBuild,
        root: &Path,
        key_files: &[String],
    ) -> Result<()> {
        for relative in key_files.iter().take(MAX_SOURCE_SNIPPETS) {
            let path = root.join(relative);
            let text = match std::fs::read(&path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    let warning = format!("Skipped key file {}: {}", relative, e);
                    log::warn!("{}", warning);
                    build.warnings.push(warning);
                    continue;
                }
            };
            let head = text
                .lines()
                .take(SOURCE_SNIPPET_LINES)
                .collect::<Vec<_>>()
                .join("\n");
            let id = format!("src:{}:1", encode_path_for_id(relative));
            self.add(
                &mut build.index,
                &id,
                &format!("Key File Snippet: {}", relative),
                SourceKind::SourceSnippet,
                Some(relative),
                &head,
                &text,
            )?;
        }
        Ok(())
    }

    fn add_git(&self, index: &mut EvidenceIndex, git: &GitFacts) -> Result<()> {
        if !git.available {
            return Ok(());
        }
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let entries = [
            ("git.branch", "Current Branch", opt(&git.branch)),
            ("git.base_branch", "Base Branch", opt(&git.base_branch)),
            ("git.head_sha", "Head Commit", opt(&git.head_sha)),
            ("git.base_sha", "Base Commit", opt(&git.base_sha)),
            ("git.changed_files", "Changed Files", git.top_changed_paths.join("\n")),
            ("git.change_summary", "Change Summary", git.change_summary.clone()),
        ];
        for (id, title, value) in entries {
            self.add(index, id, title, SourceKind::Git, Some(".git"), &value, "")?;
        }
        Ok(())
    }

    fn add_media(&self, index: &mut EvidenceIndex, media: &[MediaAsset]) -> Result<()> {
        for asset in media {
            if asset.source_path.trim().is_empty() || asset.id.trim().is_empty() {
                continue;
            }
            let name = asset
                .source_path
                .rsplit('/')
                .next()
                .unwrap_or(&asset.source_path);
            let value = serde_json::to_string_pretty(&serde_json::json!({
                "source_path": asset.source_path,
                "sha256": asset.sha256,
                "width": asset.width,
                "height": asset.height,
                "tags": asset.tags,
            }))?;
            self.add(
                index,
                &asset.id,
                &format!("Image Asset: {}", name),
                SourceKind::Image,
                Some(&asset.source_path),
                &value,
                &asset.alt,
            )?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add(
        &self,
        index: &mut EvidenceIndex,
        id: &str,
        title: &str,
        kind: SourceKind,
        source_path: Option<&str>,
        value: &str,
        source_text: &str,
    ) -> Result<()> {
        if value.trim().is_empty() {
            return Ok(());
        }
        let snippet = truncate_snippet(value, self.snippet_limit);
        let span = line_span(source_text, &snippet);
        index.insert(Evidence {
            id: id.to_string(),
            title: title.to_string(),
            source_kind: kind,
            source_path: source_path.filter(|p| !p.is_empty()).map(str::to_string),
            start_line: span.map(|s| s.0),
            end_line: span.map(|s| s.1),
            snippet_hash: snippet_hash(&snippet),
            snippet,
        })
    }
}

impl Default for EvidenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
