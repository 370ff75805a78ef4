//! Bundle manifest and shareable zip package.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use deck_core::{DeckPayload, Error, MediaAsset, MediaKind, Result, PAYLOAD_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name of the manifest written next to the artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Screenshots copied into a package.
pub const MAX_PACKAGE_SCREENSHOTS: usize = 4;

const SCREENSHOT_TAGS: &[&str] = &["screenshot", "screen", "demo", "ui", "interface"];

/// One file listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// File name, without directories.
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

/// Content of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    pub payload_schema_version: String,
    pub slide_count: usize,
    pub evidence_count: usize,
    pub media_count: usize,
    pub artifact_count: usize,
    pub artifacts: Vec<ArtifactEntry>,
}

/// Describe the given artifacts. Paths that are not regular files are skipped.
pub fn build_manifest(artifacts: &[PathBuf], payload: &DeckPayload) -> Result<Manifest> {
    let mut entries = Vec::new();
    for path in artifacts.iter().filter(|p| p.is_file()) {
        let bytes = fs::read(path)?;
        entries.push(ArtifactEntry {
            path: file_name(path)?,
            bytes: bytes.len() as u64,
            sha256: format!("{:x}", Sha256::digest(&bytes)),
        });
    }
    entries.sort_by(|a, b| a.path.to_lowercase().cmp(&b.path.to_lowercase()));

    Ok(Manifest {
        schema_version: PAYLOAD_SCHEMA_VERSION.to_string(),
        payload_schema_version: payload.schema_version.clone(),
        slide_count: payload.slides.len(),
        evidence_count: payload.evidence.len(),
        media_count: payload.media_catalog.len(),
        artifact_count: entries.len(),
        artifacts: entries,
    })
}

/// Write `manifest.json` into `bundle_dir` and return its path.
pub fn write_manifest(bundle_dir: &Path, artifacts: &[PathBuf], payload: &DeckPayload) -> Result<PathBuf> {
    let manifest = build_manifest(artifacts, payload)?;
    let target = bundle_dir.join(MANIFEST_FILE);
    fs::write(&target, serde_json::to_string_pretty(&manifest)?)?;
    log::debug!("Wrote manifest with {} artifact(s)", manifest.artifact_count);
    Ok(target)
}

/// Build a zip holding the artifacts, the best screenshots and a summary.
pub fn build_package(
    project_root: &Path,
    output_zip: &Path,
    payload: &DeckPayload,
    artifacts: &[PathBuf],
) -> Result<PathBuf> {
    let root = project_root.canonicalize()?;
    if let Some(parent) = output_zip.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(output_zip)?;
    let mut archive = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in artifacts.iter().filter(|p| p.is_file()) {
        add_file(&mut archive, options, path, &file_name(path)?)?;
    }
    for path in top_screenshots(&payload.media_catalog, &root, MAX_PACKAGE_SCREENSHOTS) {
        let name = format!("screenshots/{}", file_name(&path)?);
        add_file(&mut archive, options, &path, &name)?;
    }

    archive
        .start_file("project-summary.md", options)
        .map_err(zip_error)?;
    archive.write_all(project_summary(payload).as_bytes())?;
    archive.finish().map_err(zip_error)?;

    log::debug!("Wrote package {}", output_zip.display());
    Ok(output_zip.to_path_buf())
}

fn add_file(archive: &mut ZipWriter<File>, options: FileOptions, path: &Path, name: &str) -> Result<()> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    archive.start_file(name, options).map_err(zip_error)?;
    archive.write_all(&bytes)?;
    Ok(())
}

/// Rank catalog images for the package: screenshot-like tags first, then
/// documentation images, then images with known dimensions.
pub fn top_screenshots(catalog: &[MediaAsset], root: &Path, limit: usize) -> Vec<PathBuf> {
    let mut ranked: Vec<(u32, String, PathBuf)> = catalog
        .iter()
        .filter(|m| !m.source_path.trim().is_empty())
        .filter_map(|media| {
            let candidate = root.join(media.source_path.trim()).canonicalize().ok()?;
            if !candidate.starts_with(root) || !candidate.is_file() {
                return None;
            }
            Some((screenshot_score(media), media.source_path.to_lowercase(), candidate))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut seen = BTreeSet::new();
    ranked
        .into_iter()
        .map(|(_, _, path)| path)
        .filter(|path| seen.insert(path.clone()))
        .take(limit)
        .collect()
}

fn screenshot_score(media: &MediaAsset) -> u32 {
    let mut score = 0;
    if media.tags.iter().any(|t| SCREENSHOT_TAGS.contains(&t.to_lowercase().as_str())) {
        score += 3;
    }
    if media.kind == MediaKind::DocImage {
        score += 1;
    }
    if media.width.is_some() && media.height.is_some() {
        score += 1;
    }
    score
}

/// Short Markdown summary of the project for submission forms.
pub fn project_summary(payload: &DeckPayload) -> String {
    let project = match payload.metadata.project.trim() {
        "" => "Untitled Project",
        name => name,
    };
    let body_of = |id: &str| {
        payload
            .slides
            .iter()
            .find(|s| s.id == id)
            .map(|s| match s.body.content().map(str::trim).filter(|c| !c.is_empty()) {
                Some(content) => content.to_string(),
                None => s
                    .body
                    .list_items()
                    .map(|items| items.iter().take(2).cloned().collect::<Vec<_>>().join(" "))
                    .unwrap_or_default(),
            })
            .filter(|text| !text.trim().is_empty())
    };

    let languages = payload
        .metadata
        .languages
        .iter()
        .take(5)
        .map(|(name, count)| format!("{} ({})", name, count))
        .collect::<Vec<_>>()
        .join(", ");

    let lines = [
        format!("# {}", project),
        String::new(),
        "## Problem".into(),
        body_of("problem").unwrap_or_else(|| "Problem statement derived from repository evidence.".into()),
        String::new(),
        "## Solution".into(),
        body_of("solution").unwrap_or_else(|| "Solution summary derived from repository evidence.".into()),
        String::new(),
        "## Tech".into(),
        if languages.is_empty() {
            "See deck for technical details.".into()
        } else {
            languages
        },
        String::new(),
        "## What is Included".into(),
        "- Presentation deck".into(),
        "- Speaker notes".into(),
        "- Talk track".into(),
        "- Screenshots".into(),
    ];
    format!("{}\n", lines.join("\n"))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::PackageError(format!("Artifact has no file name: {}", path.display())))
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::PackageError(e.to_string())
}
