//! Typed facts gathered from a project before evidence is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Facts derived from scanning the project tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFacts {
    pub project_name: String,

    /// Language with the most files, if any source was found.
    #[serde(default)]
    pub primary_language: Option<String>,

    /// Language name to file count.
    #[serde(default)]
    pub languages: BTreeMap<String, usize>,

    #[serde(default)]
    pub frameworks: Vec<String>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Capabilities inferred from files and dependencies.
    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub file_count: usize,

    #[serde(default)]
    pub total_lines: usize,

    /// Project-relative paths of entry points and manifests.
    #[serde(default)]
    pub key_files: Vec<String>,
}

impl ProjectFacts {
    /// Languages ordered by file count (descending), then name.
    pub fn languages_by_count(&self) -> Vec<(&str, usize)> {
        let mut langs: Vec<(&str, usize)> =
            self.languages.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        langs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        langs
    }
}

/// Sections extracted from project documentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocFacts {
    /// Project-relative path of the README the sections came from.
    #[serde(default)]
    pub source_path: Option<String>,

    /// Full README text, used to locate line spans. Not serialized.
    #[serde(skip)]
    pub source_text: String,

    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub impact_points: Vec<String>,
    #[serde(default)]
    pub future_items: Vec<String>,
}

/// Version-control context relative to a base branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitFacts {
    /// False when the project is not a repository or git is unavailable.
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default)]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub base_sha: Option<String>,
    #[serde(default)]
    pub changed_files_count: usize,
    #[serde(default)]
    pub top_changed_paths: Vec<String>,
    #[serde(default)]
    pub change_summary: String,
}

impl GitFacts {
    /// True when a branch comparison is possible.
    pub fn has_context(&self) -> bool {
        self.available && self.branch.is_some() && self.base_branch.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_languages_by_count_breaks_ties_by_name() {
        let mut facts = ProjectFacts::default();
        facts.languages.insert("Rust".into(), 4);
        facts.languages.insert("Go".into(), 4);
        facts.languages.insert("Shell".into(), 9);
        let ordered: Vec<&str> = facts.languages_by_count().iter().map(|(n, _)| *n).collect();
        assert_eq!(ordered, vec!["Shell", "Go", "Rust"]);
    }

    #[test]
    fn test_git_context_requires_branch_and_base() {
        let mut git = GitFacts {
            available: true,
            ..Default::default()
        };
        assert!(!git.has_context());
        git.branch = Some("feature/x".into());
        assert!(!git.has_context());
        git.base_branch = Some("main".into());
        assert!(git.has_context());
    }
}
