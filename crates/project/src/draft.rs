//! Externally drafted slide edits.
//!
//! A draft file is JSON produced by any drafting tool:
//!
//! ```json
//! { "proposals": [ { "slide_id": "problem", "content": "...", "claims": [...] } ] }
//! ```
//!
//! Each proposal goes through [`Deck::replace_fields`], so a proposal citing
//! unknown evidence or editing a field the slide does not have is rejected
//! without touching the deck.

use std::fs;
use std::path::Path;

use deck_core::{Deck, Error, EvidenceIndex, FieldUpdates, Result};
use serde::{Deserialize, Serialize};

/// One proposed edit of one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftProposal {
    #[serde(alias = "id")]
    pub slide_id: String,
    #[serde(flatten)]
    pub updates: FieldUpdates,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default, alias = "slides")]
    pub proposals: Vec<DraftProposal>,
}

/// Counts from applying a draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftOutcome {
    pub applied: usize,
    pub rejected: Vec<String>,
}

impl Draft {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            Error::ConfigError(format!("Invalid draft file {}: {}", path.display(), e))
        })
    }

    /// Apply proposals in file order. Rejections are collected, not fatal.
    pub fn apply(&self, deck: &mut Deck, index: &EvidenceIndex) -> DraftOutcome {
        let mut outcome = DraftOutcome::default();
        for proposal in &self.proposals {
            if proposal.updates.is_empty() {
                continue;
            }
            match deck.replace_fields(&proposal.slide_id, &proposal.updates, index) {
                Ok(()) => outcome.applied += 1,
                Err(e) => {
                    log::warn!("Rejected draft proposal for '{}': {}", proposal.slide_id, e);
                    outcome.rejected.push(format!("{}: {}", proposal.slide_id, e));
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{Evidence, Slide, SlideType, SourceKind};

    fn index() -> EvidenceIndex {
        let record = |id: &str| Evidence {
            id: id.into(),
            title: id.into(),
            source_kind: SourceKind::Doc,
            source_path: None,
            start_line: None,
            end_line: None,
            snippet: "x".into(),
            snippet_hash: deck_core::evidence::snippet_hash("x"),
        };
        EvidenceIndex::from_records(vec![record("doc.problem"), record("doc.solution")]).unwrap()
    }

    fn deck() -> Deck {
        Deck::new(vec![
            Slide::new("title", SlideType::Title, "Deck"),
            Slide::new("problem", SlideType::Problem, "Problem"),
        ])
    }

    #[test]
    fn test_parse_draft_aliases() {
        let draft: Draft = serde_json::from_str(
            r#"{"slides": [{"id": "problem", "content": "Slow demos", "evidence_refs": ["doc.problem"]}]}"#,
        )
        .unwrap();
        assert_eq!(draft.proposals.len(), 1);
        assert_eq!(draft.proposals[0].slide_id, "problem");
        assert_eq!(draft.proposals[0].updates.content.as_deref(), Some("Slow demos"));
    }

    #[test]
    fn test_apply_collects_rejections() {
        let draft: Draft = serde_json::from_str(
            r#"{"proposals": [
                {"slide_id": "problem", "content": "Slow demos", "evidence_refs": ["doc.problem"]},
                {"slide_id": "problem", "evidence_refs": ["doc.missing"]},
                {"slide_id": "title", "content": "Titles have no content"},
                {"slide_id": "nope", "title": "x"},
                {"slide_id": "title"}
            ]}"#,
        )
        .unwrap();

        let mut deck = deck();
        let outcome = draft.apply(&mut deck, &index());
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.rejected.len(), 3);

        let problem = deck.get("problem").unwrap();
        assert_eq!(problem.body.content(), Some("Slow demos"));
        assert_eq!(problem.evidence_refs, vec!["doc.problem"]);
    }

    #[test]
    fn test_invalid_draft_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("draft.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(Draft::from_file(&path), Err(Error::ConfigError(_))));
    }
}
