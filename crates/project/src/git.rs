//! Branch context from the local git repository.

use std::path::{Path, PathBuf};
use std::process::Command;

use deck_core::GitFacts;

const BASE_CANDIDATES: &[&str] = &["main", "master", "origin/main", "origin/master"];
const MAX_TOP_PATHS: usize = 10;

/// Git facts plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct GitScan {
    pub facts: GitFacts,
    pub warnings: Vec<String>,
}

/// Collects branch, base and diff facts by shelling out to `git`.
#[derive(Debug, Clone)]
pub struct GitCollector {
    root: PathBuf,
    base_branch: Option<String>,
    enabled: bool,
}

impl GitCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_branch: None,
            enabled: true,
        }
    }

    /// Compare against this ref instead of auto-detecting main/master.
    pub fn with_base_branch(mut self, base: Option<String>) -> Self {
        self.base_branch = base.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Never fails: missing git or a non-repository yields unavailable facts.
    pub fn collect(&self) -> GitScan {
        let mut scan = GitScan::default();

        if !self.enabled {
            scan.facts.change_summary = "Branch context disabled.".to_string();
            return scan;
        }

        match run_git(&self.root, &["rev-parse", "--is-inside-work-tree"]) {
            Some(inside) if inside == "true" => {}
            _ => {
                scan.warnings
                    .push("Project is not a git repository; delta slide will be skipped.".to_string());
                scan.facts.change_summary = "Git context unavailable.".to_string();
                return scan;
            }
        }
        scan.facts.available = true;

        let branch = run_git(&self.root, &["rev-parse", "--abbrev-ref", "HEAD"]);
        let head = run_git(&self.root, &["rev-parse", "HEAD"]);
        let (Some(branch), Some(head)) = (branch, head) else {
            scan.warnings.push("Failed to read branch metadata.".to_string());
            scan.facts.change_summary = "Git metadata partially unavailable.".to_string();
            return scan;
        };
        scan.facts.branch = Some(branch);
        scan.facts.head_sha = Some(head);

        let Some(base) = self.detect_base_branch() else {
            scan.warnings
                .push("Could not detect base branch (tried main/master).".to_string());
            scan.facts.change_summary =
                "Base branch unavailable; showing current branch only.".to_string();
            return scan;
        };
        scan.facts.base_branch = Some(base.clone());

        let merge_base = run_git(&self.root, &["merge-base", "HEAD", &base]);
        let diff = merge_base.as_ref().and_then(|sha| {
            run_git(&self.root, &["diff", "--name-only", &format!("{}..HEAD", sha)])
        });
        let (Some(merge_base), Some(diff)) = (merge_base, diff) else {
            scan.warnings
                .push(format!("Failed to compute git diff against {}.", base));
            scan.facts.change_summary =
                "Branch comparison unavailable due to git command failure.".to_string();
            return scan;
        };
        scan.facts.base_sha = Some(merge_base);

        let mut paths: Vec<String> = diff
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        paths.sort();

        scan.facts.changed_files_count = paths.len();
        scan.facts.change_summary = summarize_changes(&paths);
        paths.truncate(MAX_TOP_PATHS);
        scan.facts.top_changed_paths = paths;

        log::debug!(
            "Git context: {} file(s) changed against {}",
            scan.facts.changed_files_count,
            base
        );
        scan
    }

    fn detect_base_branch(&self) -> Option<String> {
        match &self.base_branch {
            Some(preferred) => ref_exists(&self.root, preferred).then(|| preferred.clone()),
            None => BASE_CANDIDATES
                .iter()
                .find(|candidate| ref_exists(&self.root, candidate))
                .map(|c| c.to_string()),
        }
    }
}

fn run_git(root: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .output()
        .ok()?;
    if !output.status.success() {
        log::debug!("git {} failed in {}", args.join(" "), root.display());
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn ref_exists(root: &Path, reference: &str) -> bool {
    run_git(root, &["rev-parse", "--verify", "--quiet", reference]).is_some()
}

/// Deterministic one-line summary of changed paths by category.
pub fn summarize_changes(paths: &[String]) -> String {
    if paths.is_empty() {
        return "No file changes detected compared to the base branch.".to_string();
    }

    let mut buckets = [
        ("backend", 0usize),
        ("frontend", 0),
        ("docs", 0),
        ("config", 0),
        ("other", 0),
    ];
    for path in paths {
        let lower = path.to_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        let bucket = match ext {
            "md" | "rst" | "txt" => 2,
            "json" | "toml" | "yaml" | "yml" | "ini" => 3,
            "js" | "jsx" | "ts" | "tsx" | "css" | "scss" | "html" | "vue" => 1,
            "py" | "go" | "rs" | "java" | "rb" | "php" | "cs" => 0,
            _ => 4,
        };
        buckets[bucket].1 += 1;
    }

    let breakdown: Vec<String> = buckets
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| format!("{}:{}", name, count))
        .collect();
    format!("{} files changed ({}).", paths.len(), breakdown.join(", "))
}
