//! Speaker notes and timed talk tracks.

use deck_core::Slide;

/// Pitch lengths in seconds covered by the talk track.
pub const TALK_TRACK_DURATIONS: &[u32] = &[30, 60, 180];

const SUMMARY_CHARS: usize = 200;

/// Speaker notes document, one section per slide.
///
/// Slides without notes get a summary of their body instead.
pub fn speaker_notes(slides: &[Slide]) -> String {
    let mut lines = vec!["# Speaker Notes".to_string(), String::new()];
    for (n, slide) in slides.iter().enumerate() {
        lines.push(format!("## {}. {}", n + 1, display_title(slide, n)));
        lines.push(String::new());

        let notes = slide.notes.trim();
        if notes.is_empty() {
            lines.push(slide_summary(slide));
        } else {
            lines.push(notes.to_string());
        }

        let cited = slide.cited_evidence();
        if !cited.is_empty() {
            lines.push(String::new());
            lines.push(format!("Evidence refs: {}", cited.join(", ")));
        }
        lines.push(String::new());
    }
    format!("{}\n", lines.join("\n").trim())
}

/// Talk track with one section per duration, time split evenly per slide.
pub fn talk_track(slides: &[Slide], durations: &[u32]) -> String {
    let mut lines = vec!["# Talk Track".to_string(), String::new()];
    for &seconds in durations {
        lines.push(format!("## {}", duration_title(seconds)));
        lines.push(String::new());

        if slides.is_empty() {
            lines.push("No slides available.".to_string());
        } else {
            let per_slide = (seconds.max(1) as usize / slides.len()).max(1);
            for (n, slide) in slides.iter().enumerate() {
                lines.push(format!(
                    "- [{:02}s] {}: {}",
                    per_slide,
                    display_title(slide, n),
                    slide_summary(slide)
                ));
            }
        }
        lines.push(String::new());
    }
    format!("{}\n", lines.join("\n").trim())
}

/// Short text describing a slide: subtitle, content, first item or first claim.
pub fn slide_summary(slide: &Slide) -> String {
    let first_item = slide.body.list_items().and_then(|items| items.first()).map(String::as_str);
    let first_claim = slide.claims.first().map(|c| c.text.as_str());

    [slide.body.subtitle(), slide.body.content(), first_item, first_claim]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(|t| t.chars().take(SUMMARY_CHARS).collect())
        .unwrap_or_else(|| "Present the key point and connect it to evidence.".to_string())
}

fn display_title(slide: &Slide, n: usize) -> String {
    let title = slide.title.trim();
    if title.is_empty() {
        format!("Slide {}", n + 1)
    } else {
        title.to_string()
    }
}

fn duration_title(seconds: u32) -> String {
    match seconds {
        180 => "3 Minute Pitch".to_string(),
        s => format!("{} Second Pitch", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::SlideType;

    fn slides() -> Vec<Slide> {
        let mut problem = Slide::new("problem", SlideType::Problem, "The Problem");
        *problem.body.content_mut().unwrap() = "Slides drift from code.".into();
        problem.evidence_refs = vec!["doc.problem".into()];
        problem.notes = "Open with the pain.".into();

        let mut tech = Slide::new("tech", SlideType::Tech, "");
        *tech.body.list_items_mut().unwrap() = vec!["Rust".into()];
        vec![problem, tech]
    }

    #[test]
    fn test_speaker_notes() {
        let notes = speaker_notes(&slides());
        assert!(notes.starts_with("# Speaker Notes\n\n## 1. The Problem\n\nOpen with the pain.\n\nEvidence refs: doc.problem\n"));
        assert!(notes.contains("## 2. Slide 2\n\nRust\n"));
        assert!(notes.ends_with("Rust\n"));
    }

    #[test]
    fn test_talk_track_splits_time() {
        let track = talk_track(&slides(), TALK_TRACK_DURATIONS);
        assert!(track.contains("## 30 Second Pitch\n\n- [15s] The Problem: Slides drift from code."));
        assert!(track.contains("## 60 Second Pitch\n\n- [30s] The Problem"));
        assert!(track.contains("## 3 Minute Pitch\n\n- [90s] The Problem"));
        assert!(track.contains("- [90s] Slide 2: Rust"));
    }

    #[test]
    fn test_talk_track_empty_deck() {
        let track = talk_track(&[], &[30]);
        assert_eq!(track, "# Talk Track\n\n## 30 Second Pitch\n\nNo slides available.\n");
    }

    #[test]
    fn test_summary_fallback() {
        let slide = Slide::new("future", SlideType::Future, "Next");
        assert_eq!(slide_summary(&slide), "Present the key point and connect it to evidence.");
    }
}
