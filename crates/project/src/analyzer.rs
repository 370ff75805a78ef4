//! Codebase scan: language histogram, line counts, key files, manifests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use deck_core::{Error, ProjectFacts, Result};
use walkdir::{DirEntry, WalkDir};

/// Files larger than this are not read.
const MAX_FILE_BYTES: u64 = 1_000_000;

/// Cap on dependencies taken from one manifest.
const MAX_DEPS_PER_MANIFEST: usize = 10;

const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("py", "Python"),
    ("js", "JavaScript"),
    ("ts", "TypeScript"),
    ("jsx", "React"),
    ("tsx", "React/TypeScript"),
    ("java", "Java"),
    ("cpp", "C++"),
    ("c", "C"),
    ("cs", "C#"),
    ("go", "Go"),
    ("rs", "Rust"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("kt", "Kotlin"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("vue", "Vue"),
    ("sql", "SQL"),
    ("scala", "Scala"),
    ("h", "C/C++ Header"),
    ("hpp", "C++ Header"),
    ("sh", "Shell"),
    ("bash", "Bash"),
    ("ps1", "PowerShell"),
    ("dart", "Dart"),
    ("lua", "Lua"),
    ("ex", "Elixir"),
    ("exs", "Elixir"),
    ("hs", "Haskell"),
    ("ml", "OCaml"),
    ("jl", "Julia"),
    ("json", "JSON"),
    ("yaml", "YAML"),
    ("yml", "YAML"),
    ("toml", "TOML"),
    ("md", "Markdown"),
    ("rst", "reStructuredText"),
];

/// Extensions counted as "Other" text files.
const OTHER_EXTENSIONS: &[&str] = &["txt", "cfg", "conf", "ini", "properties", "gradle", "sbt"];

const IGNORE_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "venv",
    "env",
    "dist",
    "build",
    "coverage",
    "vendor",
    "target",
    "bin",
    "obj",
];

const KEY_FILE_NAMES: &[&str] = &[
    "main.rs",
    "lib.rs",
    "main.py",
    "app.py",
    "server.py",
    "index.js",
    "main.js",
    "app.js",
    "server.js",
    "App.js",
    "index.html",
    "main.go",
    "main.cpp",
    "main.c",
    "main.java",
    "main.rb",
    "index.php",
];

/// Manifest file and the frameworks its content may mention.
const FRAMEWORK_HINTS: &[(&str, &[&str])] = &[
    ("package.json", &["React", "Vue", "Angular", "Express", "Next.js"]),
    ("requirements.txt", &["Django", "Flask", "FastAPI"]),
    ("Gemfile", &["Rails", "Sinatra"]),
    ("pom.xml", &["Spring", "Hibernate"]),
    ("go.mod", &["Gin", "Echo"]),
    ("Cargo.toml", &["Actix", "Rocket", "Axum", "Tokio", "Tauri"]),
];

const CLI_DEPENDENCIES: &[&str] = &["clap", "structopt", "click", "typer", "argparse", "commander", "yargs", "cobra"];

/// Result of a scan.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub facts: ProjectFacts,
    pub warnings: Vec<String>,
}

/// Walks a project tree and summarizes it.
#[derive(Debug, Clone)]
pub struct ProjectAnalyzer {
    root: PathBuf,
}

impl ProjectAnalyzer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scan the project. Fails only when the root is not a directory.
    pub fn analyze(&self) -> Result<Analysis> {
        if !self.root.is_dir() {
            return Err(Error::ScanError(format!(
                "Project directory does not exist: {}",
                self.root.display()
            )));
        }

        let mut analysis = Analysis::default();
        analysis.facts.project_name = project_name(&self.root);
        self.scan_files(&mut analysis);

        let facts = &mut analysis.facts;
        facts.primary_language = primary_language(&facts.languages);
        facts.dependencies = self.detect_dependencies(&mut analysis.warnings);
        facts.frameworks = self.detect_frameworks();
        facts.features = self.detect_features(facts);

        log::debug!(
            "Scanned {}: {} file(s), {} line(s), {} language(s)",
            self.root.display(),
            facts.file_count,
            facts.total_lines,
            facts.languages.len()
        );
        Ok(analysis)
    }

    fn scan_files(&self, analysis: &mut Analysis) {
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    analysis.warnings.push(format!("Failed to read entry: {}", e));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            let language = match language_for(&ext) {
                Some(language) => language,
                None if OTHER_EXTENSIONS.contains(&ext.as_str()) || ext.is_empty() => "Other",
                None => continue,
            };

            if entry.metadata().map(|m| m.len() > MAX_FILE_BYTES).unwrap_or(false) {
                log::debug!("Skipping large file {}", path.display());
                continue;
            }

            let text = match fs::read(path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    analysis
                        .warnings
                        .push(format!("Skipped unreadable file {}: {}", path.display(), e));
                    continue;
                }
            };

            let lines = text.lines().count();
            if language == "Other" && lines == 0 {
                continue;
            }

            let facts = &mut analysis.facts;
            *facts.languages.entry(language.to_string()).or_insert(0) += 1;
            facts.file_count += 1;
            facts.total_lines += lines;

            if KEY_FILE_NAMES.contains(&name.as_ref()) {
                facts.key_files.push(relative_path(&self.root, path));
            }
        }
    }

    fn detect_dependencies(&self, warnings: &mut Vec<String>) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        let parsers: [(&str, fn(&str) -> Option<Vec<String>>); 4] = [
            ("package.json", parse_package_json),
            ("requirements.txt", |text| Some(parse_requirements(text))),
            ("go.mod", |text| Some(parse_go_mod(text))),
            ("Cargo.toml", parse_cargo_toml),
        ];

        for (file_name, parse) in parsers {
            let Some(text) = self.read_root_file(file_name) else {
                continue;
            };
            match parse(&text) {
                Some(found) => {
                    for dep in found.into_iter().take(MAX_DEPS_PER_MANIFEST) {
                        if !deps.contains(&dep) {
                            deps.push(dep);
                        }
                    }
                }
                None => warnings.push(format!("Could not parse {}", file_name)),
            }
        }
        deps
    }

    fn detect_frameworks(&self) -> Vec<String> {
        let mut frameworks = Vec::new();
        for (file_name, candidates) in FRAMEWORK_HINTS {
            let Some(text) = self.read_root_file(file_name) else {
                continue;
            };
            let lower = text.to_lowercase();
            for framework in candidates.iter() {
                let framework = framework.to_string();
                if lower.contains(&framework.to_lowercase()) && !frameworks.contains(&framework) {
                    frameworks.push(framework);
                }
            }
        }
        frameworks
    }

    fn detect_features(&self, facts: &ProjectFacts) -> Vec<String> {
        let mut features = Vec::new();

        let has_cli = facts
            .dependencies
            .iter()
            .any(|d| CLI_DEPENDENCIES.contains(&d.to_lowercase().as_str()));
        if has_cli {
            features.push("Command-line interface".to_string());
        }
        if self.root.join("tests").is_dir() || self.root.join("test").is_dir() {
            features.push("Automated test suite".to_string());
        }
        if facts.languages.contains_key("HTML") || facts.languages.contains_key("CSS") {
            features.push("Web user interface".to_string());
        }
        if self.root.join("Dockerfile").is_file() {
            features.push("Container build".to_string());
        }
        if self.root.join(".github").join("workflows").is_dir() {
            features.push("Continuous integration workflows".to_string());
        }

        let code_languages = facts
            .languages
            .keys()
            .filter(|l| !matches!(l.as_str(), "Markdown" | "JSON" | "YAML" | "TOML" | "Other"))
            .count();
        if code_languages > 1 {
            features.push(format!("Multi-language codebase ({} languages)", code_languages));
        }
        features
    }

    fn read_root_file(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        if !path.is_file() {
            return None;
        }
        fs::read(&path)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub(crate) fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir() && IGNORE_DIRS.contains(&name.as_ref())
}

fn language_for(ext: &str) -> Option<&'static str> {
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, language)| *language)
}

/// Most common language; ties go to the alphabetically first name.
fn primary_language(languages: &BTreeMap<String, usize>) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (name, &count) in languages {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.clone())
}

fn project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

/// Project-relative path with `/` separators.
pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_package_json(text: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    Some(
        value
            .get("dependencies")
            .and_then(|d| d.as_object())
            .map(|deps| deps.keys().cloned().collect())
            .unwrap_or_default(),
    )
}

fn parse_requirements(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(|line| {
            let name = line
                .split(|c: char| matches!(c, '=' | '<' | '>' | '~' | '!' | '[' | ';' | ' '))
                .next()?
                .trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

fn parse_go_mod(text: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let mut in_block = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("require (") {
            in_block = true;
            continue;
        }
        if in_block && trimmed == ")" {
            in_block = false;
            continue;
        }
        let spec = if in_block {
            Some(trimmed)
        } else {
            trimmed.strip_prefix("require ")
        };
        if let Some(module) = spec.and_then(|s| s.split_whitespace().next()) {
            if !module.starts_with("//") {
                deps.push(module.to_string());
            }
        }
    }
    deps
}

fn parse_cargo_toml(text: &str) -> Option<Vec<String>> {
    let value: toml::Value = toml::from_str(text).ok()?;
    let tables = [
        value.get("dependencies"),
        value.get("workspace").and_then(|w| w.get("dependencies")),
    ];
    let mut deps = Vec::new();
    for table in tables.into_iter().flatten().filter_map(|t| t.as_table()) {
        for name in table.keys() {
            if !deps.contains(name) {
                deps.push(name.clone());
            }
        }
    }
    Some(deps)
}
