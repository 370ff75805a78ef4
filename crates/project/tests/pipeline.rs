use std::fs;
use std::path::Path;

use deck_core::{DeckConfig, Error, QualityStatus, SlideType};
use deck_project::{load_payload, run_generation, run_validation, GenerateOptions};
use tempfile::TempDir;

const README: &str = "# Deckgen\n\nTurns a repository into an evidence-backed pitch deck.\n\n\
## Problem\n\nDemo slides drift away from what the code does.\n\n\
## Solution\n\nEvery claim on a slide cites a record from the project itself.\n\n\
## Features\n\n- Evidence index\n- Quality gate\n- Auto-fix\n\n\
![Demo screenshot of the app](docs/demo-screen.png)\n";

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("README.md"), README).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {\n    println!(\"deck\");\n}\n").unwrap();
    fs::write(
        root.join("Cargo.toml"),
        "[package]\nname = \"deckgen\"\n\n[dependencies]\nclap = \"4\"\n",
    )
    .unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    image::RgbImage::new(8, 6).save(root.join("docs/demo-screen.png")).unwrap();
    dir
}

fn config() -> DeckConfig {
    let mut config = DeckConfig::default();
    config.git.include_branch_context = false;
    config
}

fn write_draft(root: &Path, body: &str) -> std::path::PathBuf {
    let path = root.join("draft.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_generation_builds_grounded_deck() {
    let project = sample_project();
    let generation = run_generation(&GenerateOptions::new(project.path()), &config()).unwrap();
    let payload = &generation.payload;

    assert_eq!(payload.schema_version, "2.2");
    assert_eq!(payload.metadata.project, "Deckgen");
    assert_ne!(payload.quality_report.status, QualityStatus::Fail);

    let types: Vec<SlideType> = payload.slides.iter().map(|s| s.slide_type()).collect();
    assert!(!types.contains(&SlideType::Delta));
    assert_eq!(types.first(), Some(&SlideType::Title));
    assert_eq!(types.last(), Some(&SlideType::Closing));

    for slide in &payload.slides {
        for id in slide.cited_evidence() {
            assert!(generation.index.contains(&id), "{} cites unknown {}", slide.id, id);
        }
    }
    assert!(generation.index.contains("doc.problem"));
    assert!(generation.index.contains("src:src/main.rs:1"));
    assert_eq!(payload.media_catalog.len(), 1);
}

#[test]
fn test_generation_is_deterministic() {
    let project = sample_project();
    let options = GenerateOptions::new(project.path());
    let first = run_generation(&options, &config()).unwrap().payload;
    let second = run_generation(&options, &config()).unwrap().payload;
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_strict_gate_lists_errors() {
    let project = sample_project();
    let draft = write_draft(
        project.path(),
        r#"{"proposals": [{"slide_id": "problem", "evidence_refs": [], "claims": [{"text": "Unbacked"}]}]}"#,
    );
    let mut options = GenerateOptions::new(project.path());
    options.draft = Some(draft);

    match run_generation(&options, &config()) {
        Err(Error::QualityGateFailed(errors)) => {
            assert!(errors.iter().any(|e| e.contains("problem")));
        }
        other => panic!("expected gate failure, got {:?}", other.map(|g| g.payload.quality_report)),
    }

    let summary = run_validation(&options, &config()).unwrap();
    assert_eq!(summary.status, QualityStatus::Fail);
    assert!(!summary.errors.is_empty());
}

#[test]
fn test_max_slides_and_requested_types() {
    let project = sample_project();
    let mut options = GenerateOptions::new(project.path());
    options.slide_types = Some(vec!["closing".into(), "problem".into(), "title".into()]);
    options.max_slides = Some(2);

    let payload = run_generation(&options, &config()).unwrap().payload;
    let ids: Vec<&str> = payload.slides.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"title"));
}

#[test]
fn test_images_off_skips_media() {
    let project = sample_project();
    let mut config = config();
    config.images.enabled = false;

    let payload = run_generation(&GenerateOptions::new(project.path()), &config)
        .unwrap()
        .payload;
    assert!(payload.media_catalog.is_empty());
    assert!(payload.slides.iter().all(|s| s.visuals.is_empty()));
}

#[test]
fn test_duplicate_image_copies_do_not_abort() {
    let project = sample_project();
    let root = project.path();
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::copy(root.join("docs/demo-screen.png"), root.join("assets/demo-screen.png")).unwrap();

    let generation = run_generation(&GenerateOptions::new(root), &config()).unwrap();
    let catalog = &generation.payload.media_catalog;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].source_path, "assets/demo-screen.png");
    assert!(generation
        .warnings
        .iter()
        .any(|w| w.contains("Skipped duplicate image docs/demo-screen.png")));
}

#[test]
fn test_payload_round_trip_through_file() {
    let project = sample_project();
    let payload = run_generation(&GenerateOptions::new(project.path()), &config())
        .unwrap()
        .payload;
    let path = project.path().join("deck.json");
    fs::write(&path, serde_json::to_string_pretty(&payload).unwrap()).unwrap();

    let (loaded, index) = load_payload(&path).unwrap();
    assert_eq!(loaded.slides, payload.slides);
    assert_eq!(index.len(), payload.evidence.len());
}

#[test]
fn test_missing_project_is_scan_error() {
    let dir = TempDir::new().unwrap();
    let options = GenerateOptions::new(dir.path().join("missing"));
    assert!(matches!(run_generation(&options, &config()), Err(Error::ScanError(_))));
}
