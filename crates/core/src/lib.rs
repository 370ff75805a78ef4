//! Evidence index, slide/claim model, quality validation, auto-fix and
//! visual selection for evidence-grounded slide decks.

pub mod autofix;
pub mod config;
pub mod error;
pub mod evidence;
pub mod facts;
pub mod normalize;
pub mod quality;
pub mod slides;
pub mod types;
pub mod visuals;

pub use autofix::{apply_fixes, fix_all, FixAllOutcome, FixOutcome};
pub use config::{DeckConfig, ImageMode, OutputFormat, RawConfig, Theme, VisualStyle};
pub use error::{Error, Result};
pub use evidence::{EvidenceBuild, EvidenceBuilder, EvidenceIndex};
pub use facts::{DocFacts, GitFacts, ProjectFacts};
pub use quality::{Issue, QualityReport, QualityStatus, Rule, Severity, Validator};
pub use slides::{build_deck, resolve_slide_types, Deck};
pub use types::{
    Claim, DeckMetadata, DeckPayload, Evidence, FieldUpdates, MediaAsset, MediaKind, Slide,
    SlideBody, SlideType, SourceKind, Visual, VisualKind, PAYLOAD_SCHEMA_VERSION,
};
pub use visuals::{VisualSelector, VisualSummary};
