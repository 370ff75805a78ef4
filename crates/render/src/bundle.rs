//! Writes a deck and its companion files to disk.

use std::fs;
use std::path::{Path, PathBuf};

use deck_core::{DeckPayload, OutputFormat, Result, Theme};

use crate::html::HtmlRenderer;
use crate::markdown::MarkdownRenderer;
use crate::notes::{speaker_notes, talk_track, TALK_TRACK_DURATIONS};

pub const NOTES_FILE: &str = "notes.md";
pub const TALK_TRACK_FILE: &str = "talk-track.md";

/// Paths produced by [`BundleWriter::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleFiles {
    pub html: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub notes: Option<PathBuf>,
    pub talk_track: Option<PathBuf>,
}

impl BundleFiles {
    /// Every written file, in a stable order.
    pub fn all(&self) -> Vec<PathBuf> {
        [&self.html, &self.markdown, &self.json, &self.notes, &self.talk_track]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

/// Writes deck outputs next to a base path such as `out/presentation.html`.
///
/// The base extension is replaced per format. `Json` writes only the payload;
/// every other format also writes the payload plus speaker notes and a talk
/// track in the same directory.
#[derive(Debug, Clone)]
pub struct BundleWriter {
    base: PathBuf,
    format: OutputFormat,
    theme: Theme,
    asset_prefix: String,
    companions: bool,
}

impl BundleWriter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            format: OutputFormat::Both,
            theme: Theme::Default,
            asset_prefix: String::new(),
            companions: true,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_asset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.asset_prefix = prefix.into();
        self
    }

    /// Skip notes and talk track.
    pub fn with_companions(mut self, enabled: bool) -> Self {
        self.companions = enabled;
        self
    }

    pub fn write(&self, payload: &DeckPayload) -> Result<BundleFiles> {
        let dir = self.base.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let mut files = BundleFiles::default();

        if matches!(self.format, OutputFormat::Html | OutputFormat::Both) {
            let html = HtmlRenderer::new()
                .with_theme(self.theme)
                .with_asset_prefix(self.asset_prefix.clone())
                .render(payload)?;
            files.html = Some(write_text(&self.base.with_extension("html"), &html)?);
        }
        if matches!(self.format, OutputFormat::Markdown | OutputFormat::Both) {
            let markdown = MarkdownRenderer::new().with_theme(self.theme).render(payload);
            files.markdown = Some(write_text(&self.base.with_extension("md"), &markdown)?);
        }
        files.json = Some(write_text(
            &self.base.with_extension("json"),
            &serde_json::to_string_pretty(payload)?,
        )?);

        if self.companions && self.format != OutputFormat::Json {
            files.notes = Some(write_text(&dir.join(NOTES_FILE), &speaker_notes(&payload.slides))?);
            files.talk_track = Some(write_text(
                &dir.join(TALK_TRACK_FILE),
                &talk_track(&payload.slides, TALK_TRACK_DURATIONS),
            )?);
        }

        log::debug!("Wrote {} deck file(s) to {}", files.all().len(), dir.display());
        Ok(files)
    }
}

fn write_text(path: &Path, text: &str) -> Result<PathBuf> {
    fs::write(path, text)?;
    Ok(path.to_path_buf())
}
