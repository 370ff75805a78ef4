//! Layered deck configuration.
//!
//! Resolution order, lowest to highest: built-in defaults, the user file
//! (`<config dir>/deckgen/config.toml`), the project file
//! (`<project>/deckgen.toml`), then CLI overrides. Each layer is parsed into
//! a [`RawConfig`] of optional fields and applied over the previous result.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "deckgen.toml";

/// Smallest allowed autosave interval.
pub const MIN_AUTOSAVE_SECS: u64 = 5;

/// Hard ceiling for visuals on one slide.
pub const MAX_VISUALS_PER_SLIDE: usize = 2;

/// Phrases flagged as unsupported hype by default.
pub const DEFAULT_BANNED_PHRASES: &[&str] = &[
    "cutting-edge",
    "revolutionary",
    "game-changing",
    "game changer",
    "world-class",
    "best-in-class",
    "groundbreaking",
    "next-generation",
    "disruptive",
    "synergy",
];

/// Output formats written by `generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Markdown,
    Json,
    Both,
}

/// Visual theme for HTML output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Default,
    Dark,
    Minimal,
    Colorful,
    Auto,
}

/// How visuals are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Never attach visuals.
    Off,
    /// Attach visuals that clear the confidence floor.
    Auto,
    /// Like `Auto`, plus image coverage and alt text become gate errors.
    Strict,
}

/// Which media kinds get a scoring bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualStyle {
    Evidence,
    Screenshot,
    Mixed,
}

macro_rules! impl_from_str {
    ($ty:ty, $what:literal, [$($name:literal => $variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(Error::ConfigError(format!(
                        "Invalid {} '{}'. Expected one of {}.",
                        $what,
                        other,
                        [$($name),+].join("|")
                    ))),
                }
            }
        }
    };
}

impl_from_str!(OutputFormat, "format", [
    "html" => OutputFormat::Html,
    "markdown" => OutputFormat::Markdown,
    "json" => OutputFormat::Json,
    "both" => OutputFormat::Both,
]);

impl_from_str!(Theme, "theme", [
    "default" => Theme::Default,
    "dark" => Theme::Dark,
    "minimal" => Theme::Minimal,
    "colorful" => Theme::Colorful,
    "auto" => Theme::Auto,
]);

impl_from_str!(ImageMode, "images.mode", [
    "off" => ImageMode::Off,
    "auto" => ImageMode::Auto,
    "strict" => ImageMode::Strict,
]);

impl_from_str!(VisualStyle, "images.visual_style", [
    "evidence" => VisualStyle::Evidence,
    "screenshot" => VisualStyle::Screenshot,
    "mixed" => VisualStyle::Mixed,
]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Treat evidence coverage as an error and enforce the quality gate.
    pub strict_quality: bool,
    /// Keep at most this many slides, chosen by priority.
    pub max_slides: Option<usize>,
    pub theme: Theme,
    pub format: OutputFormat,
    /// Optional JSON file of drafted field proposals.
    pub draft_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    pub banned_phrases: Vec<String>,
    /// List cap enforced by the validator and the list fix.
    pub max_list_items: usize,
    /// Body length above which a slide is dense.
    pub dense_content_chars: usize,
    /// List length above which a slide has many items.
    pub dense_list_items: usize,
    /// Content length after a density fix.
    pub fix_content_chars: usize,
    /// List length after a density fix.
    pub fix_dense_list_items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesConfig {
    pub enabled: bool,
    pub mode: ImageMode,
    /// Extra directories (relative to the project) to index.
    pub image_dirs: Vec<String>,
    pub max_images_per_slide: usize,
    pub min_confidence: f64,
    pub visual_style: VisualStyle,
    pub max_image_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl ImagesConfig {
    /// Mode after accounting for the `enabled` switch.
    pub fn effective_mode(&self) -> ImageMode {
        if self.enabled {
            self.mode
        } else {
            ImageMode::Off
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Base branch to compare against; detected when unset.
    pub base_branch: Option<String>,
    pub include_branch_context: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    pub autosave_interval_secs: u64,
    pub read_only: bool,
    /// Take a snapshot before every Nth save.
    pub snapshot_every: u32,
    pub max_snapshots: usize,
    pub timer_minutes: u32,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckConfig {
    pub general: GeneralConfig,
    pub quality: QualityConfig,
    pub images: ImagesConfig,
    pub git: GitConfig,
    pub studio: StudioConfig,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                strict_quality: true,
                max_slides: None,
                theme: Theme::Default,
                format: OutputFormat::Both,
                draft_path: None,
            },
            quality: QualityConfig {
                banned_phrases: DEFAULT_BANNED_PHRASES.iter().map(|s| s.to_string()).collect(),
                max_list_items: 7,
                dense_content_chars: 900,
                dense_list_items: 8,
                fix_content_chars: 700,
                fix_dense_list_items: 6,
            },
            images: ImagesConfig {
                enabled: true,
                mode: ImageMode::Auto,
                image_dirs: Vec::new(),
                max_images_per_slide: 1,
                min_confidence: 0.72,
                visual_style: VisualStyle::Mixed,
                max_image_bytes: 3_145_728,
                allowed_extensions: [".png", ".jpg", ".jpeg", ".webp", ".gif", ".svg"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            git: GitConfig {
                base_branch: None,
                include_branch_context: true,
            },
            studio: StudioConfig {
                autosave_interval_secs: 20,
                read_only: false,
                snapshot_every: 1,
                max_snapshots: 20,
                timer_minutes: 7,
            },
        }
    }
}

/// One configuration layer; unset fields leave lower layers in place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub general: RawGeneral,
    #[serde(default)]
    pub quality: RawQuality,
    #[serde(default)]
    pub images: RawImages,
    #[serde(default)]
    pub git: RawGit,
    #[serde(default)]
    pub studio: RawStudio,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGeneral {
    pub strict_quality: Option<bool>,
    pub max_slides: Option<usize>,
    pub theme: Option<Theme>,
    pub format: Option<OutputFormat>,
    pub draft_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuality {
    pub banned_phrases: Option<Vec<String>>,
    pub max_list_items: Option<usize>,
    pub dense_content_chars: Option<usize>,
    pub dense_list_items: Option<usize>,
    pub fix_content_chars: Option<usize>,
    pub fix_dense_list_items: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImages {
    pub enabled: Option<bool>,
    pub mode: Option<ImageMode>,
    pub image_dirs: Option<Vec<String>>,
    pub max_images_per_slide: Option<usize>,
    pub min_confidence: Option<f64>,
    pub visual_style: Option<VisualStyle>,
    pub max_image_bytes: Option<u64>,
    pub allowed_extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGit {
    pub base_branch: Option<String>,
    pub include_branch_context: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStudio {
    pub autosave_interval_secs: Option<u64>,
    pub read_only: Option<bool>,
    pub snapshot_every: Option<u32>,
    pub max_snapshots: Option<usize>,
    pub timer_minutes: Option<u32>,
}

impl RawConfig {
    /// Parse a TOML layer.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            Error::ConfigError(format!("Failed to parse config file {}: {}", origin.display(), e))
        })
    }

    /// Read a TOML layer; a missing file is an empty layer.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded config layer from {}", path.display());
        Self::from_toml(&text, path)
    }
}

impl DeckConfig {
    /// `<config dir>/deckgen/config.toml`, when a config dir exists.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("deckgen").join("config.toml"))
    }

    pub fn project_config_path(project: &Path) -> PathBuf {
        project.join(PROJECT_CONFIG_FILE)
    }

    /// Resolve defaults, user file, project file and CLI overrides.
    pub fn load(project: &Path, overrides: RawConfig) -> Result<Self> {
        let mut layers = Vec::with_capacity(3);
        if let Some(user) = Self::user_config_path() {
            layers.push(RawConfig::from_file(&user)?);
        }
        layers.push(RawConfig::from_file(&Self::project_config_path(project))?);
        layers.push(overrides);
        Self::from_layers(layers)
    }

    /// Apply layers over the defaults in order and validate the result.
    pub fn from_layers(layers: impl IntoIterator<Item = RawConfig>) -> Result<Self> {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overwrite every field the layer sets.
    pub fn apply(&mut self, raw: RawConfig) {
        let g = raw.general;
        set(&mut self.general.strict_quality, g.strict_quality);
        if let Some(max) = g.max_slides {
            self.general.max_slides = if max == 0 { None } else { Some(max) };
        }
        set(&mut self.general.theme, g.theme);
        set(&mut self.general.format, g.format);
        if g.draft_path.is_some() {
            self.general.draft_path = g.draft_path;
        }

        let q = raw.quality;
        set(&mut self.quality.banned_phrases, q.banned_phrases);
        set(&mut self.quality.max_list_items, q.max_list_items);
        set(&mut self.quality.dense_content_chars, q.dense_content_chars);
        set(&mut self.quality.dense_list_items, q.dense_list_items);
        set(&mut self.quality.fix_content_chars, q.fix_content_chars);
        set(&mut self.quality.fix_dense_list_items, q.fix_dense_list_items);

        let i = raw.images;
        set(&mut self.images.enabled, i.enabled);
        set(&mut self.images.mode, i.mode);
        set(&mut self.images.image_dirs, i.image_dirs);
        set(&mut self.images.max_images_per_slide, i.max_images_per_slide);
        set(&mut self.images.min_confidence, i.min_confidence);
        set(&mut self.images.visual_style, i.visual_style);
        set(&mut self.images.max_image_bytes, i.max_image_bytes);
        set(&mut self.images.allowed_extensions, i.allowed_extensions);

        if raw.git.base_branch.is_some() {
            self.git.base_branch = raw.git.base_branch;
        }
        set(&mut self.git.include_branch_context, raw.git.include_branch_context);

        let s = raw.studio;
        set(&mut self.studio.autosave_interval_secs, s.autosave_interval_secs);
        set(&mut self.studio.read_only, s.read_only);
        set(&mut self.studio.snapshot_every, s.snapshot_every);
        set(&mut self.studio.max_snapshots, s.max_snapshots);
        set(&mut self.studio.timer_minutes, s.timer_minutes);
    }

    /// Reject values outside their documented ranges.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::ConfigError(msg));

        if self.images.max_images_per_slide > MAX_VISUALS_PER_SLIDE {
            return fail(format!(
                "images.max_images_per_slide must be between 0 and {}.",
                MAX_VISUALS_PER_SLIDE
            ));
        }
        if !(0.0..=1.0).contains(&self.images.min_confidence) {
            return fail("images.min_confidence must be between 0 and 1.".to_string());
        }
        if self.images.max_image_bytes < 16_384 {
            return fail("images.max_image_bytes must be at least 16384.".to_string());
        }
        if let Some(ext) = self
            .images
            .allowed_extensions
            .iter()
            .find(|e| !e.starts_with('.') || e.len() < 2)
        {
            return fail(format!(
                "images.allowed_extensions entries must start with '.', got '{}'.",
                ext
            ));
        }
        if self.studio.autosave_interval_secs < MIN_AUTOSAVE_SECS {
            return fail(format!(
                "studio.autosave_interval_secs must be at least {}.",
                MIN_AUTOSAVE_SECS
            ));
        }
        if self.studio.snapshot_every == 0 {
            return fail("studio.snapshot_every must be at least 1.".to_string());
        }
        if self.quality.max_list_items == 0 || self.quality.fix_dense_list_items == 0 {
            return fail("quality list limits must be at least 1.".to_string());
        }
        if self.quality.fix_content_chars >= self.quality.dense_content_chars {
            return fail(
                "quality.fix_content_chars must be below quality.dense_content_chars.".to_string(),
            );
        }
        Ok(())
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(text: &str) -> RawConfig {
        RawConfig::from_toml(text, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = DeckConfig::default();
        config.validate().unwrap();
        assert_eq!(config.images.min_confidence, 0.72);
        assert_eq!(config.studio.max_snapshots, 20);
        assert!(config.quality.banned_phrases.iter().any(|p| p == "cutting-edge"));
    }

    #[test]
    fn test_layer_precedence() {
        let user = layer("[images]\nmode = \"off\"\nmax_images_per_slide = 2\n");
        let project = layer("[images]\nmode = \"strict\"\n[studio]\ntimer_minutes = 5\n");
        let cli = RawConfig {
            studio: RawStudio {
                timer_minutes: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = DeckConfig::from_layers([user, project, cli]).unwrap();
        assert_eq!(config.images.mode, ImageMode::Strict);
        assert_eq!(config.images.max_images_per_slide, 2);
        assert_eq!(config.studio.timer_minutes, 3);
        assert_eq!(config.studio.autosave_interval_secs, 20);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        for text in [
            "[images]\nmax_images_per_slide = 3\n",
            "[images]\nmin_confidence = 1.5\n",
            "[images]\nmax_image_bytes = 10\n",
            "[images]\nallowed_extensions = [\"png\"]\n",
            "[studio]\nautosave_interval_secs = 2\n",
        ] {
            let err = DeckConfig::from_layers([layer(text)]).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR", "{}", text);
        }
    }

    #[test]
    fn test_unknown_enum_value_is_config_error() {
        let err = RawConfig::from_toml("[general]\ntheme = \"neon\"\n", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(matches!("neon".parse::<Theme>(), Err(Error::ConfigError(_))));
        assert_eq!("Strict".parse::<ImageMode>().unwrap(), ImageMode::Strict);
    }

    #[test]
    fn test_load_reads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[general]\nstrict_quality = false\nmax_slides = 0\n",
        )
        .unwrap();
        let config = DeckConfig::load(dir.path(), RawConfig::default()).unwrap();
        assert!(!config.general.strict_quality);
        assert_eq!(config.general.max_slides, None);
    }

    #[test]
    fn test_disabled_images_turn_mode_off() {
        let config = DeckConfig::from_layers([layer("[images]\nenabled = false\n")]).unwrap();
        assert_eq!(config.images.effective_mode(), ImageMode::Off);
    }
}
