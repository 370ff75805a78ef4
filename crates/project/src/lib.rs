//! Project scanning and the deck generation pipeline.
//!
//! Collaborators gather typed facts from a local project (source tree,
//! README, git, images); [`pipeline`] turns them into a validated deck.

pub mod analyzer;
pub mod docs;
pub mod draft;
pub mod git;
pub mod images;
pub mod pipeline;

pub use analyzer::{Analysis, ProjectAnalyzer};
pub use docs::{DocParser, ParsedDocs};
pub use draft::{Draft, DraftOutcome, DraftProposal};
pub use git::{GitCollector, GitScan};
pub use images::{ImageIndex, ImageIndexer};
pub use pipeline::{
    load_payload, run_generation, run_validation, scan_project, GenerateOptions, Generation,
    ProjectScan, ValidationSummary,
};
