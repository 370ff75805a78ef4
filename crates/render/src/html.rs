//! Self-contained HTML deck.
//!
//! Markup goes through the quick-xml event writer, so every slide string is
//! escaped on the way out. Only the fixed stylesheet and navigation script
//! are written raw.

use deck_core::{DeckPayload, Error, Result, Slide, Theme};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Characters of a claim shown on its chip.
const CLAIM_LABEL_CHARS: usize = 80;
const MAX_CLAIMS: usize = 8;

/// CSS colour variables of one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: &'static str,
    pub panel: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub accent: &'static str,
    pub accent2: &'static str,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Default | Theme::Auto => Palette {
                bg: "#0b1020",
                panel: "#11172b",
                text: "#eef2ff",
                muted: "#a8b2d1",
                accent: "#24d3b5",
                accent2: "#4db2ff",
            },
            Theme::Dark => Palette {
                bg: "#020617",
                panel: "#0b1223",
                text: "#f3f4f6",
                muted: "#9ca3af",
                accent: "#38bdf8",
                accent2: "#a78bfa",
            },
            Theme::Minimal => Palette {
                bg: "#f4f7fb",
                panel: "#ffffff",
                text: "#0f172a",
                muted: "#475569",
                accent: "#0ea5a5",
                accent2: "#0284c7",
            },
            Theme::Colorful => Palette {
                bg: "#1b1028",
                panel: "#24173a",
                text: "#faf5ff",
                muted: "#d8b4fe",
                accent: "#f97316",
                accent2: "#f43f5e",
            },
        }
    }

    fn css_vars(&self) -> String {
        format!(
            ":root {{ --bg: {}; --panel: {}; --text: {}; --muted: {}; --accent: {}; --accent2: {}; }}",
            self.bg, self.panel, self.text, self.muted, self.accent, self.accent2
        )
    }
}

const STYLESHEET: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: "Segoe UI", system-ui, sans-serif; background: var(--bg); color: var(--text); }
.deck { max-width: 1160px; margin: 0 auto; padding: 20px 16px 80px; }
.slide { min-height: 76vh; margin: 16px 0; padding: 28px; border-radius: 22px; background: var(--panel); border: 1px solid var(--accent); position: relative; }
.slide h1 { font-size: clamp(2rem, 3.2vw, 3.2rem); margin: 0 0 14px; }
.slide h2 { font-size: clamp(1.5rem, 2.3vw, 2.4rem); margin: 0 0 14px; }
.subtitle { font-size: 1.08rem; line-height: 1.6; color: var(--muted); }
.content { font-size: 1.05rem; line-height: 1.72; white-space: pre-wrap; }
.slide-list li { margin: 0.48rem 0; line-height: 1.6; }
.visual img { max-width: 100%; max-height: 48vh; border-radius: 12px; }
.visual figcaption { color: var(--muted); font-size: 0.9rem; }
.claims { display: flex; flex-wrap: wrap; gap: 8px; margin-top: 16px; }
.claim-chip { border: 1px solid var(--accent2); border-radius: 999px; padding: 4px 10px; font-size: 0.85rem; }
.evidence-strip { margin-top: 12px; display: flex; flex-wrap: wrap; gap: 6px; }
.evidence-badge { font-family: ui-monospace, monospace; font-size: 0.75rem; color: var(--muted); }
.speaker-notes { display: none; margin-top: 16px; color: var(--muted); }
body.show-notes .speaker-notes { display: block; }
.meta { position: absolute; right: 22px; bottom: 14px; color: var(--muted); font-size: 0.8rem; }
"#;

const NAVIGATION_SCRIPT: &str = r#"
(function () {
  var slides = Array.prototype.slice.call(document.querySelectorAll('.slide'));
  var current = 0;
  function show(i) {
    current = Math.max(0, Math.min(slides.length - 1, i));
    if (slides[current]) { slides[current].scrollIntoView({ behavior: 'smooth' }); }
  }
  document.addEventListener('keydown', function (e) {
    if (e.key === 'ArrowRight' || e.key === 'PageDown') { show(current + 1); }
    if (e.key === 'ArrowLeft' || e.key === 'PageUp') { show(current - 1); }
    if (e.key === 'n') { document.body.classList.toggle('show-notes'); }
  });
})();
"#;

/// Renders a payload to a single HTML document.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    theme: Theme,
    asset_prefix: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            asset_prefix: String::new(),
        }
    }
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Prefix joined to visual source paths (e.g. the path from the output
    /// directory back to the project root).
    pub fn with_asset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.asset_prefix = prefix.into();
        self
    }

    pub fn render(&self, payload: &DeckPayload) -> Result<String> {
        let mut out = HtmlWriter::new();
        let project = if payload.metadata.project.trim().is_empty() {
            "Deck"
        } else {
            payload.metadata.project.trim()
        };

        out.event(Event::DocType(BytesText::from_escaped("html")))?;
        out.start("html", &[("lang", "en")])?;
        out.start("head", &[])?;
        out.empty("meta", &[("charset", "utf-8")])?;
        out.empty(
            "meta",
            &[("name", "viewport"), ("content", "width=device-width, initial-scale=1")],
        )?;
        out.element("title", &[], &format!("{} - Presentation", project))?;
        out.start("style", &[])?;
        out.raw(&Palette::for_theme(self.theme).css_vars())?;
        out.raw(STYLESHEET)?;
        out.end("style")?;
        out.end("head")?;

        out.start("body", &[])?;
        out.start("main", &[("class", "deck")])?;
        let total = payload.slides.len();
        for (n, slide) in payload.slides.iter().enumerate() {
            self.render_slide(&mut out, slide, n + 1, total)?;
        }
        out.end("main")?;
        out.start("script", &[])?;
        out.raw(NAVIGATION_SCRIPT)?;
        out.end("script")?;
        out.end("body")?;
        out.end("html")?;

        out.finish()
    }

    fn render_slide(&self, out: &mut HtmlWriter, slide: &Slide, number: usize, total: usize) -> Result<()> {
        let slide_type = slide.slide_type();
        let class = format!("slide slide-{}", slide_type.as_str());
        let anchor = format!("slide-{}", number);
        out.start(
            "section",
            &[("class", class.as_str()), ("id", anchor.as_str()), ("data-slide-id", slide.id.as_str())],
        )?;

        if slide_type.is_bookend() {
            out.element("h1", &[], &slide.title)?;
        } else {
            out.element("h2", &[], &slide.title)?;
        }
        if let Some(subtitle) = slide.body.subtitle() {
            out.element("p", &[("class", "subtitle")], subtitle)?;
        }
        if let Some(content) = slide.body.content() {
            out.element("div", &[("class", "content")], content)?;
        }
        if let Some(items) = slide.body.list_items() {
            out.start("ul", &[("class", "slide-list")])?;
            for item in items {
                out.element("li", &[], item)?;
            }
            out.end("ul")?;
        }

        for visual in &slide.visuals {
            let src = format!("{}{}", self.asset_prefix, visual.source_path);
            out.start("figure", &[("class", "visual")])?;
            out.empty("img", &[("src", src.as_str()), ("alt", visual.alt.as_str())])?;
            if !visual.caption.trim().is_empty() {
                out.element("figcaption", &[], &visual.caption)?;
            }
            out.end("figure")?;
        }

        let claims: Vec<_> = slide
            .claims
            .iter()
            .filter(|c| !c.text.trim().is_empty())
            .take(MAX_CLAIMS)
            .collect();
        if !claims.is_empty() {
            out.start("div", &[("class", "claims")])?;
            for claim in claims {
                let refs = claim.evidence_refs.join(",");
                let label = format!(
                    "{} ({:.2})",
                    deck_core::normalize::truncate_with_ellipsis(claim.text.trim(), CLAIM_LABEL_CHARS),
                    claim.confidence
                );
                out.element("span", &[("class", "claim-chip"), ("data-evidence", refs.as_str())], &label)?;
            }
            out.end("div")?;
        }

        if !slide.evidence_refs.is_empty() {
            out.start("div", &[("class", "evidence-strip")])?;
            for id in &slide.evidence_refs {
                out.element("span", &[("class", "evidence-badge")], id)?;
            }
            out.end("div")?;
        }

        if !slide.notes.trim().is_empty() {
            out.element("aside", &[("class", "speaker-notes")], slide.notes.trim())?;
        }

        let mut meta = format!("Slide {}/{}", number, total);
        if !slide.evidence_refs.is_empty() {
            meta.push_str(&format!(" · {} evidence reference(s)", slide.evidence_refs.len()));
        }
        out.element("div", &[("class", "meta")], &meta)?;
        out.end("section")
    }
}

/// Thin wrapper mapping quick-xml errors into [`Error::RenderError`].
struct HtmlWriter {
    writer: Writer<Vec<u8>>,
}

impl HtmlWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::RenderError(format!("HTML write failed: {}", e)))
    }

    fn start(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.event(Event::Start(start))
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.event(Event::Empty(start))
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(tag, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    fn raw(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::from_escaped(text)))
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::RenderError(format!("HTML is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{Claim, SlideType};

    fn payload(slides: Vec<Slide>) -> DeckPayload {
        let mut payload = DeckPayload {
            schema_version: deck_core::PAYLOAD_SCHEMA_VERSION.into(),
            metadata: Default::default(),
            git_context: Default::default(),
            slides,
            evidence: Vec::new(),
            media_catalog: Vec::new(),
            quality_report: Default::default(),
        };
        payload.metadata.project = "Deck & Co".into();
        payload
    }

    #[test]
    fn test_render_escapes_slide_text() {
        let mut problem = Slide::new("problem", SlideType::Problem, "<script>alert(1)</script>");
        *problem.body.content_mut().unwrap() = "a < b && c".into();
        problem.evidence_refs = vec!["doc.problem".into()];
        problem.claims = vec![Claim::new("Quote \"this\"", &problem.evidence_refs, 0.9)];

        let html = HtmlRenderer::new().render(&payload(vec![problem])).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Deck &amp; Co - Presentation</title>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("a &lt; b &amp;&amp; c"));
        assert!(html.contains("data-evidence=\"doc.problem\""));
        assert!(html.contains("Slide 1/1 · 1 evidence reference(s)"));
    }

    #[test]
    fn test_theme_palette_applied() {
        let html = HtmlRenderer::new()
            .with_theme(Theme::Minimal)
            .render(&payload(Vec::new()))
            .unwrap();
        assert!(html.contains("--bg: #f4f7fb"));
        assert_eq!(Palette::for_theme(Theme::Auto), Palette::for_theme(Theme::Default));
    }

    #[test]
    fn test_list_and_bookend_headings() {
        let mut tech = Slide::new("tech", SlideType::Tech, "Technology Stack");
        *tech.body.list_items_mut().unwrap() = vec!["Rust".into(), "TOML".into()];
        let closing = Slide::new("closing", SlideType::Closing, "Thank You");

        let html = HtmlRenderer::new().render(&payload(vec![tech, closing])).unwrap();
        assert!(html.contains("<h2>Technology Stack</h2><ul class=\"slide-list\"><li>Rust</li><li>TOML</li></ul>"));
        assert!(html.contains("<h1>Thank You</h1>"));
        assert!(html.contains("id=\"slide-2\""));
    }
}
