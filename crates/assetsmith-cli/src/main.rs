mod inputs;
mod studio;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use assetsmith_contracts::assets::{AspectRatio, Category, QualityTier};
use assetsmith_contracts::events::{new_session_id, EventWriter};
use assetsmith_contracts::session::{export_gallery, AssetId};
use assetsmith_engine::{
    build_client, encode_file, AssetEngine, EngineConfig, GenerationRequest, ProviderKind,
};
use clap::{Args, Parser, Subcommand};

use crate::inputs::{parse_style_pairs, run_edit, MaskInput};

#[derive(Debug, Parser)]
#[command(name = "assetsmith", version, about = "Game-art asset generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate images for one category.
    Generate(GenerateArgs),
    /// Edit an image, optionally inside a mask.
    Edit(EditArgs),
    /// Engine-targeted critique, optionally followed by a remaster.
    Analyze(AnalyzeArgs),
    /// Describe the visual style of an image.
    Style(ImageArgs),
    /// Brainstorm asset concepts for a theme.
    Ideas(IdeasArgs),
    /// Interactive session.
    Studio(SessionArgs),
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[arg(long, default_value = "gemini")]
    provider: String,
    #[arg(long, default_value = "assetsmith-out")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    image_model: Option<String>,
    #[arg(long)]
    text_model: Option<String>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    session: SessionArgs,
    #[arg(long, default_value = "texture")]
    category: String,
    #[arg(long, default_value = "")]
    prompt: String,
    /// Style option as key=value; repeatable.
    #[arg(long = "set")]
    options: Vec<String>,
    #[arg(long)]
    reference: Option<PathBuf>,
    #[arg(long)]
    aspect: Option<String>,
    #[arg(long, default_value = "final")]
    tier: String,
    #[arg(long, default_value_t = 1)]
    variants: u8,
    #[arg(long)]
    refine: bool,
}

#[derive(Debug, Args)]
struct EditArgs {
    #[command(flatten)]
    session: SessionArgs,
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    prompt: String,
    /// Stroke log (.json) or painted overlay image.
    #[arg(long)]
    mask: Option<PathBuf>,
    #[arg(long = "set")]
    options: Vec<String>,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    session: SessionArgs,
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    engine: Option<String>,
    #[arg(long, default_value = "")]
    focus: String,
    #[arg(long)]
    remaster: bool,
    #[arg(long, default_value = "final")]
    tier: String,
}

#[derive(Debug, Args)]
struct ImageArgs {
    #[command(flatten)]
    session: SessionArgs,
    #[arg(long)]
    image: PathBuf,
}

#[derive(Debug, Args)]
struct IdeasArgs {
    #[command(flatten)]
    session: SessionArgs,
    #[arg(long)]
    theme: String,
    #[arg(long = "set")]
    options: Vec<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("assetsmith error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Edit(args) => run_edit_command(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Style(args) => {
            let engine = open_session(&args.session)?;
            let image = encode_file(&args.image)?;
            println!("{}", engine.describe_style(image)?);
            engine.finish()?;
            Ok(0)
        }
        Command::Ideas(args) => {
            let engine = open_session(&args.session)?;
            let style = parse_style_pairs(&args.options)?;
            println!("{}", engine.brainstorm(&args.theme, style)?);
            engine.finish()?;
            Ok(0)
        }
        Command::Studio(args) => {
            let mut engine = open_session(&args)?;
            studio::run_studio(&mut engine, &args.out)?;
            Ok(0)
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let Some(category) = Category::parse(&args.category) else {
        bail!("unknown category '{}'", args.category);
    };
    if !category.produces_asset() {
        bail!(
            "'{}' does not produce images; use the analyze, style or ideas commands",
            category.as_str()
        );
    }
    let mut engine = open_session(&args.session)?;
    let mut request = GenerationRequest::new(category, args.prompt.as_str())
        .with_style(parse_style_pairs(&args.options)?)
        .with_tier(parse_tier(&args.tier)?)
        .with_variants(args.variants)
        .with_refine(args.refine);
    if let Some(raw) = args.aspect.as_deref() {
        let Some(aspect) = AspectRatio::parse(raw) else {
            bail!("unsupported aspect ratio '{raw}'");
        };
        request = request.with_aspect(aspect);
    }
    if let Some(path) = args.reference.as_deref() {
        request = request.with_reference(encode_file(path)?);
    }
    let ids = engine.generate(request)?;
    save_outputs(&engine, &ids, &args.session.out)?;
    engine.finish()?;
    Ok(0)
}

fn run_edit_command(args: EditArgs) -> Result<i32> {
    let mut engine = open_session(&args.session)?;
    let source = encode_file(&args.image)?;
    let mask = args.mask.as_deref().map(MaskInput::load).transpose()?;
    let style = parse_style_pairs(&args.options)?;
    let ids = run_edit(&mut engine, source, &args.prompt, mask.as_ref(), style)?;
    save_outputs(&engine, &ids, &args.session.out)?;
    engine.finish()?;
    Ok(0)
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let mut engine = open_session(&args.session)?;
    let image = encode_file(&args.image)?;
    let report = engine.analyze(image.clone(), args.engine.as_deref(), &args.focus)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if args.remaster {
        let ids = engine.remaster(image, &report, parse_tier(&args.tier)?)?;
        save_outputs(&engine, &ids, &args.session.out)?;
    }
    engine.finish()?;
    Ok(0)
}

fn open_session(args: &SessionArgs) -> Result<AssetEngine> {
    let Some(provider) = ProviderKind::parse(&args.provider) else {
        bail!("unknown provider '{}' (gemini, dryrun)", args.provider);
    };
    let mut config = EngineConfig::from_env(provider)?;
    if let Some(model) = args.image_model.clone() {
        config.models.image_draft = Some(model.clone());
        config.models.image_final = Some(model);
    }
    if let Some(model) = args.text_model.clone() {
        config.models.text = Some(model);
    }
    let client = build_client(&config)?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(events_path, new_session_id());
    Ok(AssetEngine::new(Arc::clone(&client), config.models, events)?)
}

fn parse_tier(raw: &str) -> Result<QualityTier> {
    QualityTier::parse(raw).with_context(|| format!("unknown tier '{raw}' (draft, final)"))
}

fn save_outputs(engine: &AssetEngine, ids: &[AssetId], out: &Path) -> Result<()> {
    let manifest = export_gallery(engine.registry(), out)?;
    for id in ids {
        let prompt = engine
            .registry()
            .get(*id)
            .map(|asset| asset.origin_prompt().to_string())
            .unwrap_or_default();
        println!("Created {id}: {prompt}");
    }
    println!("Gallery: {}", manifest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::parse_from([
            "assetsmith",
            "generate",
            "--provider",
            "dryrun",
            "--category",
            "banner",
            "--prompt",
            "sunken city",
            "--set",
            "palette=teal",
            "--variants",
            "2",
            "--refine",
        ]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.session.provider, "dryrun");
        assert_eq!(args.category, "banner");
        assert_eq!(args.options, vec!["palette=teal".to_string()]);
        assert_eq!(args.variants, 2);
        assert!(args.refine);
    }

    #[test]
    fn analyze_defaults() {
        let cli = Cli::parse_from(["assetsmith", "analyze", "--image", "shield.png"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.session.provider, "gemini");
        assert!(!args.remaster);
        assert_eq!(args.tier, "final");
    }
}
