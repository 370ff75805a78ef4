//! CLI for generating evidence-grounded slide decks from a project directory.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use deck_core::config::RawConfig;
use deck_core::{fix_all, DeckConfig, ImageMode, OutputFormat, QualityStatus, Theme, Validator};
use deck_project::{load_payload, run_generation, run_validation, GenerateOptions, ValidationSummary};
use deck_render::{build_package, write_manifest, BundleWriter};
use std::fs;
use std::path::{Path, PathBuf};

/// Build pitch decks where every claim cites evidence from the project itself.
#[derive(Parser, Debug)]
#[command(name = "deckgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate deck files for a project
    Generate {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output file; the extension is replaced per format
        #[arg(short, long, default_value = "presentation.html")]
        output: PathBuf,

        /// Output format (html, markdown, json, both)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Also write a zip package with the outputs and screenshots
        #[arg(long)]
        package: Option<PathBuf>,

        /// Skip speaker notes and talk track
        #[arg(long)]
        no_notes: bool,
    },

    /// Run the pipeline and report quality without writing a deck
    Validate {
        #[command(flatten)]
        project: ProjectArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply every automatic fix to a generated JSON deck
    Fix {
        /// Deck JSON written by `generate`
        input: PathBuf,

        /// Project whose configuration applies (default: current directory)
        #[arg(long, default_value = ".")]
        project: PathBuf,

        /// Where to write the fixed deck (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum validate-and-fix passes
        #[arg(long, default_value = "4")]
        max_passes: usize,
    },

    /// Serve the editing API as JSON lines on stdin/stdout
    Studio {
        #[command(flatten)]
        project: ProjectArgs,

        /// Never write the session file
        #[arg(long)]
        read_only: bool,

        /// Autosave interval in seconds (minimum 5)
        #[arg(long)]
        autosave_secs: Option<u64>,
    },
}

/// Options shared by commands that scan a project.
#[derive(Args, Debug)]
struct ProjectArgs {
    /// Project directory
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Theme (default, dark, minimal, colorful, auto)
    #[arg(long)]
    theme: Option<Theme>,

    /// Slide types to include, comma separated
    #[arg(long, value_delimiter = ',')]
    slides: Vec<String>,

    /// Maximum number of slides
    #[arg(long)]
    max_slides: Option<usize>,

    /// Additional documentation files
    #[arg(long = "doc")]
    docs: Vec<PathBuf>,

    /// JSON file of drafted slide edits
    #[arg(long)]
    draft: Option<PathBuf>,

    /// Image mode (off, auto, strict)
    #[arg(long)]
    images: Option<ImageMode>,

    /// Base branch for change context
    #[arg(long)]
    base_branch: Option<String>,

    /// Skip git branch context
    #[arg(long)]
    no_git: bool,

    /// Report quality errors without failing
    #[arg(long)]
    no_strict: bool,
}

impl ProjectArgs {
    /// CLI layer on top of the user and project config files.
    fn overrides(&self) -> RawConfig {
        let mut raw = RawConfig::default();
        raw.general.theme = self.theme;
        raw.general.max_slides = self.max_slides;
        if self.no_strict {
            raw.general.strict_quality = Some(false);
        }
        raw.images.mode = self.images;
        if self.images.is_some() {
            raw.images.enabled = Some(self.images != Some(ImageMode::Off));
        }
        raw.git.base_branch = self.base_branch.clone();
        if self.no_git {
            raw.git.include_branch_context = Some(false);
        }
        raw
    }

    fn load_config(&self, extra: impl FnOnce(&mut RawConfig)) -> Result<DeckConfig> {
        let mut raw = self.overrides();
        extra(&mut raw);
        DeckConfig::load(&self.project, raw)
            .with_context(|| format!("Failed to load configuration for {}", self.project.display()))
    }

    fn options(&self) -> GenerateOptions {
        let mut options = GenerateOptions::new(&self.project);
        options.additional_docs = self.docs.clone();
        options.slide_types = (!self.slides.is_empty()).then(|| self.slides.clone());
        options.max_slides = self.max_slides;
        options.draft = self.draft.clone();
        options
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Command::Generate {
            project,
            output,
            format,
            package,
            no_notes,
        } => generate(&project, &output, format, package.as_deref(), no_notes),
        Command::Validate { project, json } => validate(&project, json),
        Command::Fix {
            input,
            project,
            output,
            max_passes,
        } => fix(&input, &project, output.as_deref(), max_passes),
        Command::Studio {
            project,
            read_only,
            autosave_secs,
        } => studio(&project, read_only, autosave_secs),
    }
}

fn generate(
    args: &ProjectArgs,
    output: &Path,
    format: Option<OutputFormat>,
    package: Option<&Path>,
    no_notes: bool,
) -> Result<()> {
    let config = args.load_config(|raw| raw.general.format = format)?;
    let generation = run_generation(&args.options(), &config).context("Deck generation failed")?;
    for warning in &generation.warnings {
        log::warn!("{}", warning);
    }

    let root = args
        .project
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", args.project.display()))?;
    let out_dir = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from("."),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
    let out_dir = out_dir.canonicalize()?;

    let files = BundleWriter::new(out_dir.join(output.file_name().unwrap_or("presentation.html".as_ref())))
        .with_format(config.general.format)
        .with_theme(config.general.theme)
        .with_asset_prefix(asset_prefix(&root, &out_dir))
        .with_companions(!no_notes)
        .write(&generation.payload)
        .context("Failed to write deck files")?;

    let mut artifacts = files.all();
    let manifest = write_manifest(&out_dir, &artifacts, &generation.payload)
        .context("Failed to write manifest")?;
    artifacts.push(manifest);

    if let Some(package) = package {
        let zip = build_package(&root, package, &generation.payload, &artifacts)
            .with_context(|| format!("Failed to build package {}", package.display()))?;
        artifacts.push(zip);
    }

    let report = &generation.payload.quality_report;
    eprintln!(
        "Generated {} slide(s), quality {:?}, {} visual(s) attached",
        generation.payload.slides.len(),
        report.status,
        generation.visuals.attached
    );
    for warning in &report.warnings {
        eprintln!("  warning: {}", warning);
    }
    for path in &artifacts {
        println!("{}", path.display());
    }
    Ok(())
}

fn validate(args: &ProjectArgs, json: bool) -> Result<()> {
    let config = args.load_config(|_| {})?;
    let summary = run_validation(&args.options(), &config).context("Validation failed to run")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.status == QualityStatus::Fail && Validator::new(&config).is_strict() {
        bail!("Quality gate failed with {} error(s)", summary.errors.len());
    }
    Ok(())
}

fn print_summary(summary: &ValidationSummary) {
    println!("Status: {:?}", summary.status);
    println!(
        "Slides: {}  Evidence: {}  Media: {}",
        summary.slide_count, summary.evidence_count, summary.media_count
    );
    println!(
        "Supported claims: {}/{} ({:.0}%)  Image coverage: {:.0}%",
        summary.metrics.supported_claims,
        summary.metrics.claim_count,
        summary.metrics.supported_claim_ratio * 100.0,
        summary.metrics.image_coverage * 100.0
    );
    if summary.git_context.available {
        println!("Git: {}", summary.git_context.change_summary);
    }
    for error in &summary.errors {
        println!("  error: {}", error);
    }
    for warning in &summary.warnings {
        println!("  warning: {}", warning);
    }
}

fn fix(input: &Path, project: &Path, output: Option<&Path>, max_passes: usize) -> Result<()> {
    let config = DeckConfig::load(project, RawConfig::default())
        .with_context(|| format!("Failed to load configuration for {}", project.display()))?;
    let (mut payload, index) =
        load_payload(input).with_context(|| format!("Failed to read deck {}", input.display()))?;

    let validator = Validator::new(&config);
    let outcome = fix_all(&payload.slides, &index, &validator, &config, max_passes);
    payload.slides = outcome.slides;
    payload.quality_report = outcome.report;

    let target = output.unwrap_or(input);
    fs::write(target, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    eprintln!(
        "{} after {} pass(es); quality {:?}",
        if outcome.changed { "Fixed" } else { "No changes" },
        outcome.passes,
        payload.quality_report.status
    );
    for error in &payload.quality_report.errors {
        eprintln!("  error: {}", error);
    }
    println!("{}", target.display());
    Ok(())
}

fn studio(args: &ProjectArgs, read_only: bool, autosave_secs: Option<u64>) -> Result<()> {
    let config = args.load_config(|raw| {
        if read_only {
            raw.studio.read_only = Some(true);
        }
        raw.studio.autosave_interval_secs = autosave_secs;
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime
        .block_on(deck_studio::run_stdio(&args.project, config))
        .context("Studio session failed")
}

/// Prefix that makes project-relative image paths resolve from `out_dir`.
fn asset_prefix(root: &Path, out_dir: &Path) -> String {
    match out_dir.strip_prefix(root) {
        Ok(rel) => "../".repeat(rel.components().count()),
        Err(_) => format!("{}/", root.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_prefix() {
        let root = Path::new("/work/app");
        assert_eq!(asset_prefix(root, root), "");
        assert_eq!(asset_prefix(root, &root.join("out/site")), "../../");
        assert_eq!(asset_prefix(root, Path::new("/tmp/out")), "/work/app/");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "deckgen",
            "validate",
            "app",
            "--theme",
            "dark",
            "--slides",
            "title,problem",
            "--images",
            "off",
            "--no-git",
        ]);
        let Command::Validate { project, .. } = cli.command else {
            panic!("expected validate");
        };
        let raw = project.overrides();
        assert_eq!(raw.general.theme, Some(Theme::Dark));
        assert_eq!(raw.images.enabled, Some(false));
        assert_eq!(raw.git.include_branch_context, Some(false));
        assert_eq!(
            project.options().slide_types,
            Some(vec!["title".to_string(), "problem".to_string()])
        );
    }
}
