//! Output formats for evidence-grounded decks: Marp Markdown, standalone
//! HTML, JSON payloads, speaker notes, talk tracks and zip packages.

pub mod bundle;
pub mod html;
pub mod markdown;
pub mod notes;
pub mod package;

pub use bundle::{BundleFiles, BundleWriter};
pub use html::{HtmlRenderer, Palette};
pub use markdown::{marp_theme, MarkdownRenderer};
pub use notes::{slide_summary, speaker_notes, talk_track, TALK_TRACK_DURATIONS};
pub use package::{build_manifest, build_package, write_manifest, Manifest};
