//! Offline index of local project images.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use deck_core::config::ImagesConfig;
use deck_core::{MediaAsset, MediaKind};
use regex::Regex;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::analyzer::{is_ignored, relative_path};

static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

static TAG_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

const MAX_TAGS: usize = 24;
const ID_HASH_CHARS: usize = 12;

/// Indexed media plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    pub catalog: Vec<MediaAsset>,
    pub warnings: Vec<String>,
}

impl ImageIndex {
    pub fn count_of(&self, kind: MediaKind) -> usize {
        self.catalog.iter().filter(|m| m.kind == kind).count()
    }
}

/// Finds images under the project root and the configured image dirs.
#[derive(Debug, Clone)]
pub struct ImageIndexer {
    root: PathBuf,
    image_dirs: Vec<String>,
    allowed: BTreeSet<String>,
    max_bytes: u64,
}

impl ImageIndexer {
    pub fn new(root: impl Into<PathBuf>, config: &ImagesConfig) -> Self {
        Self {
            root: root.into(),
            image_dirs: config.image_dirs.clone(),
            allowed: normalize_extensions(&config.allowed_extensions),
            max_bytes: config.max_image_bytes,
        }
    }

    /// Catalog sorted by lowercase source path. Media ids derive from content.
    pub fn index(&self) -> ImageIndex {
        let mut index = ImageIndex::default();
        let root = match self.root.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                index
                    .warnings
                    .push(format!("Cannot index images in {}: {}", self.root.display(), e));
                return index;
            }
        };

        let doc_refs = collect_markdown_refs(&root);
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for path in self.candidates(&root, &mut index.warnings) {
            let rel = relative_path(&root, &path);
            if !seen.insert(rel.clone()) {
                continue;
            }
            match self.inspect(&path) {
                Ok((sha256, bytes, dims)) => {
                    let alts = doc_refs.get(&rel);
                    let asset = build_asset(&rel, sha256, bytes, dims, alts);
                    index.catalog.push(asset);
                }
                Err(reason) => index.warnings.push(format!("Skipped image {}: {}", rel, reason)),
            }
        }

        index
            .catalog
            .sort_by(|a, b| a.source_path.to_lowercase().cmp(&b.source_path.to_lowercase()));
        merge_duplicates(&mut index);
        log::debug!(
            "Indexed {} image(s) ({} referenced from docs)",
            index.catalog.len(),
            index.count_of(MediaKind::DocImage)
        );
        index
    }

    fn candidates(&self, root: &Path, warnings: &mut Vec<String>) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = vec![root.to_path_buf()];
        for raw in &self.image_dirs {
            let candidate = Path::new(raw);
            let joined = if candidate.is_absolute() {
                candidate.to_path_buf()
            } else {
                root.join(candidate)
            };
            match joined.canonicalize() {
                Ok(dir) if !dir.starts_with(root) => {
                    warnings.push(format!("Skipped image dir outside project root: {}", raw))
                }
                Ok(dir) if dir.is_dir() => {
                    if !dirs.contains(&dir) {
                        dirs.push(dir);
                    }
                }
                _ => warnings.push(format!("Image dir not found: {}", raw)),
            }
        }

        let mut files = Vec::new();
        for dir in dirs {
            // Configured dirs may sit under an ignored parent; only their
            // own descendants are filtered.
            let walker = WalkDir::new(&dir)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry));
            for entry in walker.flatten() {
                if !entry.file_type().is_file() {
                    continue;
                }
                let ext = extension_of(entry.path());
                if self.allowed.contains(&ext) {
                    files.push(entry.into_path());
                }
            }
        }
        files
    }

    fn inspect(&self, path: &Path) -> std::result::Result<(String, u64, Option<(u32, u32)>), String> {
        let bytes = fs::read(path).map_err(|e| e.to_string())?;
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(format!(
                "image exceeds max size ({} bytes > {})",
                size, self.max_bytes
            ));
        }

        let dims = if extension_of(path) == ".svg" {
            let text = String::from_utf8_lossy(&bytes).to_lowercase();
            if text.contains("<script") || text.contains("onload=") || text.contains("javascript:") {
                return Err("SVG contains scripting content".to_string());
            }
            None
        } else {
            Some(image::image_dimensions(path).map_err(|e| format!("unreadable image: {}", e))?)
        };

        let sha256 = format!("{:x}", Sha256::digest(&bytes));
        Ok((sha256, size, dims))
    }
}

fn build_asset(
    rel: &str,
    sha256: String,
    bytes: u64,
    dims: Option<(u32, u32)>,
    doc_alts: Option<&Vec<String>>,
) -> MediaAsset {
    let alts = doc_alts.map(Vec::as_slice).unwrap_or_default();
    let (kind, evidence_refs) = if doc_alts.is_some() {
        (MediaKind::DocImage, vec!["doc.features".to_string(), "doc.solution".to_string()])
    } else {
        (MediaKind::RepoImage, vec!["repo.features".to_string()])
    };
    MediaAsset {
        id: format!("media.{}", &sha256[..ID_HASH_CHARS.min(sha256.len())]),
        source_path: rel.to_string(),
        kind,
        width: dims.map(|d| d.0),
        height: dims.map(|d| d.1),
        sha256,
        bytes,
        tags: collect_tags(rel, alts),
        alt: alts.first().cloned().unwrap_or_default(),
        evidence_refs,
    }
}

/// Collapse byte-identical copies into the first asset in catalog order,
/// so each media id appears once.
fn merge_duplicates(index: &mut ImageIndex) {
    let mut kept: Vec<MediaAsset> = Vec::with_capacity(index.catalog.len());
    let mut by_hash: BTreeMap<String, usize> = BTreeMap::new();

    for asset in index.catalog.drain(..) {
        let Some(&pos) = by_hash.get(&asset.sha256) else {
            by_hash.insert(asset.sha256.clone(), kept.len());
            kept.push(asset);
            continue;
        };
        let first = &mut kept[pos];
        index.warnings.push(format!(
            "Skipped duplicate image {} (same content as {})",
            asset.source_path, first.source_path
        ));
        if asset.kind == MediaKind::DocImage && first.kind != MediaKind::DocImage {
            first.kind = MediaKind::DocImage;
            first.evidence_refs = asset.evidence_refs;
        }
        if first.alt.is_empty() {
            first.alt = asset.alt;
        }
        for tag in asset.tags {
            if first.tags.len() < MAX_TAGS && !first.tags.contains(&tag) {
                first.tags.push(tag);
            }
        }
    }
    index.catalog = kept;
}

/// Lowercase extension with a leading dot.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn normalize_extensions(extensions: &[String]) -> BTreeSet<String> {
    extensions
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .map(|e| if e.starts_with('.') { e } else { format!(".{}", e) })
        .collect()
}

/// Alt texts of local Markdown image references, keyed by project-relative path.
fn collect_markdown_refs(root: &Path) -> BTreeMap<String, Vec<String>> {
    let mut refs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry));

    for entry in walker.flatten() {
        if !entry.file_type().is_file() || extension_of(entry.path()) != ".md" {
            continue;
        }
        let Ok(bytes) = fs::read(entry.path()) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        let doc_dir = entry.path().parent().unwrap_or(root);

        for caps in MARKDOWN_IMAGE.captures_iter(&text) {
            let alt = caps[1].trim().to_string();
            let Some(target) = caps[2].split_whitespace().next() else {
                continue;
            };
            if target.starts_with("http://") || target.starts_with("https://") || target.starts_with("data:") {
                continue;
            }
            let Some(resolved) = lexical_join(doc_dir, target) else {
                continue;
            };
            if !resolved.starts_with(root) {
                continue;
            }
            let alts = refs.entry(relative_path(root, &resolved)).or_default();
            if !alt.is_empty() {
                alts.push(alt);
            }
        }
    }
    refs
}

/// Join and normalize `..`/`.` without touching the filesystem.
fn lexical_join(base: &Path, target: &str) -> Option<PathBuf> {
    let mut out = base.to_path_buf();
    for component in Path::new(target).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

fn collect_tags(source_path: &str, alts: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut tags = Vec::new();
    for chunk in std::iter::once(source_path).chain(alts.iter().map(String::as_str)) {
        for token in TAG_SPLIT.split(&chunk.to_lowercase()) {
            if token.len() >= 2 && seen.insert(token.to_string()) {
                tags.push(token.to_string());
            }
        }
    }
    tags.truncate(MAX_TAGS);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::DeckConfig;
    use tempfile::TempDir;

    fn png(path: &Path, w: u32, h: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::new(w, h).save(path).unwrap();
    }

    #[test]
    fn test_index_repo_and_doc_images() {
        let dir = TempDir::new().unwrap();
        png(&dir.path().join("docs/demo-screen.png"), 4, 3);
        png(&dir.path().join("assets/arch.png"), 2, 2);
        fs::write(
            dir.path().join("README.md"),
            "# X\n\n![Demo screen](docs/demo-screen.png \"title\")\n![remote](https://x.y/z.png)\n",
        )
        .unwrap();

        let index = ImageIndexer::new(dir.path(), &DeckConfig::default().images).index();
        assert!(index.warnings.is_empty(), "{:?}", index.warnings);
        assert_eq!(index.catalog.len(), 2);

        let arch = &index.catalog[0];
        assert_eq!(arch.source_path, "assets/arch.png");
        assert_eq!(arch.kind, MediaKind::RepoImage);
        assert_eq!(arch.evidence_refs, vec!["repo.features"]);
        assert_eq!((arch.width, arch.height), (Some(2), Some(2)));

        let demo = &index.catalog[1];
        assert_eq!(demo.kind, MediaKind::DocImage);
        assert_eq!(demo.alt, "Demo screen");
        assert_eq!(demo.evidence_refs, vec!["doc.features", "doc.solution"]);
        assert_eq!(demo.id, format!("media.{}", &demo.sha256[..12]));
        assert_eq!(demo.tags, vec!["docs", "demo", "screen", "png"]);
    }

    #[test]
    fn test_size_cap_and_hidden_dirs() {
        let dir = TempDir::new().unwrap();
        png(&dir.path().join("big.png"), 64, 64);
        png(&dir.path().join(".cache/hidden.png"), 2, 2);

        let config = ImagesConfig {
            max_image_bytes: 10,
            ..DeckConfig::default().images
        };
        let index = ImageIndexer::new(dir.path(), &config).index();
        assert!(index.catalog.is_empty());
        assert_eq!(index.warnings.len(), 1);
        assert!(index.warnings[0].starts_with("Skipped image big.png"));
    }

    #[test]
    fn test_svg_with_script_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ok.svg"), "<svg></svg>").unwrap();
        fs::write(dir.path().join("bad.svg"), "<svg><script>x</script></svg>").unwrap();

        let index = ImageIndexer::new(dir.path(), &DeckConfig::default().images).index();
        assert_eq!(index.catalog.len(), 1);
        assert_eq!(index.catalog[0].source_path, "ok.svg");
        assert_eq!(index.catalog[0].width, None);
        assert_eq!(index.warnings.len(), 1);
    }

    #[test]
    fn test_missing_image_dir_warns() {
        let dir = TempDir::new().unwrap();
        let config = ImagesConfig {
            image_dirs: vec!["screens".into()],
            ..DeckConfig::default().images
        };
        let index = ImageIndexer::new(dir.path(), &config).index();
        assert_eq!(index.warnings, vec!["Image dir not found: screens".to_string()]);
    }

    #[test]
    fn test_identical_images_share_one_asset() {
        let dir = TempDir::new().unwrap();
        png(&dir.path().join("docs/shot.png"), 4, 4);
        png(&dir.path().join("assets/shot.png"), 4, 4);
        fs::write(dir.path().join("README.md"), "# X\n\n![Main view](docs/shot.png)\n").unwrap();

        let index = ImageIndexer::new(dir.path(), &DeckConfig::default().images).index();
        assert_eq!(index.catalog.len(), 1);

        let shot = &index.catalog[0];
        assert_eq!(shot.source_path, "assets/shot.png");
        assert_eq!(shot.kind, MediaKind::DocImage);
        assert_eq!(shot.alt, "Main view");
        assert_eq!(shot.evidence_refs, vec!["doc.features", "doc.solution"]);
        assert!(shot.tags.contains(&"docs".to_string()));
        assert_eq!(
            index.warnings,
            vec!["Skipped duplicate image docs/shot.png (same content as assets/shot.png)".to_string()]
        );
    }

    #[test]
    fn test_lexical_join() {
        let base = Path::new("/p/docs");
        assert_eq!(lexical_join(base, "../img/a.png"), Some(PathBuf::from("/p/img/a.png")));
        assert_eq!(lexical_join(base, "./b.png"), Some(PathBuf::from("/p/docs/b.png")));
    }
}
