//! Marp-flavoured Markdown deck output.

use deck_core::{DeckPayload, Slide, Theme};

/// Claims listed per slide.
const MAX_CLAIMS: usize = 8;

/// Marp theme name for a configured theme.
pub fn marp_theme(theme: Theme) -> &'static str {
    match theme {
        Theme::Default | Theme::Auto => "default",
        Theme::Dark => "dark",
        Theme::Minimal => "minimal",
        Theme::Colorful => "colorful",
    }
}

/// Formatter for Marp Markdown decks.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    theme: Theme,
    include_notes: bool,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            include_notes: true,
        }
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Emit speaker notes as Marp HTML comments.
    pub fn with_notes(mut self, include: bool) -> Self {
        self.include_notes = include;
        self
    }

    /// Render the whole deck. Output always ends with a single newline.
    pub fn render(&self, payload: &DeckPayload) -> String {
        let mut lines: Vec<String> = vec![
            "---".into(),
            "marp: true".into(),
            format!("theme: {}", marp_theme(self.theme)),
            "paginate: true".into(),
            "---".into(),
        ];

        for (n, slide) in payload.slides.iter().enumerate() {
            if n > 0 {
                lines.push(String::new());
                lines.push("---".into());
            }
            lines.push(String::new());
            self.render_slide(slide, &mut lines);
        }

        format!("{}\n", lines.join("\n").trim_end())
    }

    fn render_slide(&self, slide: &Slide, lines: &mut Vec<String>) {
        let title = slide.title.trim();
        if slide.slide_type().is_bookend() {
            lines.push(format!("# {}", title));
        } else {
            lines.push(format!("## {}", title));
        }
        lines.push(String::new());

        for text in [slide.body.subtitle(), slide.body.content()].into_iter().flatten() {
            let text = text.trim();
            if !text.is_empty() {
                lines.push(text.to_string());
                lines.push(String::new());
            }
        }

        if let Some(items) = slide.body.list_items().filter(|i| !i.is_empty()) {
            lines.extend(items.iter().map(|item| format!("- {}", item)));
            lines.push(String::new());
        }

        for visual in &slide.visuals {
            lines.push(format!("![{}]({})", escape_alt(&visual.alt), visual.source_path));
            if !visual.caption.trim().is_empty() {
                lines.push(format!("*{}*", visual.caption.trim()));
            }
            lines.push(String::new());
        }

        let claims: Vec<&str> = slide
            .claims
            .iter()
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .take(MAX_CLAIMS)
            .collect();
        if !claims.is_empty() {
            lines.push("Claims:".into());
            lines.extend(claims.iter().map(|c| format!("- {}", c)));
            lines.push(String::new());
        }

        if !slide.evidence_refs.is_empty() {
            lines.push(format!("Evidence: {}", slide.evidence_refs.join(", ")));
            lines.push(String::new());
        }

        let notes = slide.notes.trim();
        if self.include_notes && !notes.is_empty() {
            lines.push(format!("<!-- {} -->", notes.replace("-->", "-- >")));
            lines.push(String::new());
        }
    }
}

fn escape_alt(alt: &str) -> String {
    alt.replace('[', "\\[").replace(']', "\\]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{Claim, SlideType, Visual, VisualKind};

    fn payload(slides: Vec<Slide>) -> DeckPayload {
        DeckPayload {
            schema_version: deck_core::PAYLOAD_SCHEMA_VERSION.into(),
            metadata: Default::default(),
            git_context: Default::default(),
            slides,
            evidence: Vec::new(),
            media_catalog: Vec::new(),
            quality_report: Default::default(),
        }
    }

    fn slides() -> Vec<Slide> {
        let mut title = Slide::new("title", SlideType::Title, "Deckgen");
        *title.body.subtitle_mut().unwrap() = "Grounded decks".into();

        let mut demo = Slide::new("demo", SlideType::Demo, "Key Features");
        *demo.body.list_items_mut().unwrap() = vec!["Evidence index".into(), "Auto-fix".into()];
        demo.claims = vec![Claim::new("Evidence index", &["doc.features".to_string()], 0.9)];
        demo.evidence_refs = vec!["doc.features".into()];
        demo.notes = "Show the index --> then the fixer".into();
        demo.visuals.push(Visual {
            id: "media.abc".into(),
            kind: VisualKind::Image,
            source_path: "docs/demo.png".into(),
            alt: "Demo [ui]".into(),
            caption: "Demo (demo)".into(),
            evidence_refs: vec!["doc.features".into()],
            confidence: 0.9,
            width: None,
            height: None,
            sha256: String::new(),
        });
        vec![title, demo]
    }

    #[test]
    fn test_render_front_matter_and_slides() {
        let text = MarkdownRenderer::new()
            .with_theme(Theme::Auto)
            .render(&payload(slides()));
        assert!(text.starts_with("---\nmarp: true\ntheme: default\npaginate: true\n---\n\n# Deckgen\n"));
        assert!(text.contains("\n---\n\n## Key Features\n"));
        assert!(text.contains("- Evidence index\n- Auto-fix\n"));
        assert!(text.contains("![Demo \\[ui\\]](docs/demo.png)\n*Demo (demo)*"));
        assert!(text.contains("Claims:\n- Evidence index\n"));
        assert!(text.contains("Evidence: doc.features"));
        assert!(text.contains("<!-- Show the index -- > then the fixer -->"));
        assert!(text.ends_with("-->\n"));
    }

    #[test]
    fn test_render_without_notes() {
        let text = MarkdownRenderer::new().with_notes(false).render(&payload(slides()));
        assert!(!text.contains("<!--"));
    }

    #[test]
    fn test_render_empty_deck() {
        let text = MarkdownRenderer::new().with_theme(Theme::Dark).render(&payload(Vec::new()));
        assert_eq!(text, "---\nmarp: true\ntheme: dark\npaginate: true\n---\n");
    }
}
