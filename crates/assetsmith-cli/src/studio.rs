use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use assetsmith_contracts::analysis::AnalysisReport;
use assetsmith_contracts::assets::{
    AspectRatio, Category, QualityTier, ReferenceUse, StyleOption, StyleOptions,
};
use assetsmith_contracts::session::{export_gallery, AssetId};
use assetsmith_contracts::studio::{parse_command, StudioCommand, STUDIO_HELP_COMMANDS};
use assetsmith_engine::{AssetEngine, EncodedImage, GenerationError, GenerationRequest};

use crate::inputs::{parse_switch, resolve_image, run_edit, MaskInput};

/// Settings carried between studio commands.
pub struct StudioState {
    pub category: Category,
    pub style: StyleOptions,
    pub reference: Option<EncodedImage>,
    pub mask: Option<MaskInput>,
    pub aspect: Option<AspectRatio>,
    pub tier: QualityTier,
    pub variants: u8,
    pub refine: bool,
    pub out_dir: PathBuf,
    last_analysis: Option<(EncodedImage, AnalysisReport)>,
}

impl StudioState {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            category: Category::Texture,
            style: StyleOptions::new(),
            reference: None,
            mask: None,
            aspect: None,
            tier: QualityTier::Final,
            variants: 1,
            refine: false,
            out_dir: out_dir.to_path_buf(),
            last_analysis: None,
        }
    }

    fn request(&self, category: Category, text: &str) -> GenerationRequest {
        let mut request = GenerationRequest::new(category, text)
            .with_style(self.style.clone())
            .with_tier(self.tier)
            .with_variants(self.variants.min(category.spec().max_variants).max(1))
            .with_refine(self.refine);
        if let Some(aspect) = self.aspect {
            request = request.with_aspect(aspect);
        }
        // The style reference only rides along where the category takes one.
        if let Some(reference) = self.reference.clone() {
            if category.spec().reference == ReferenceUse::Style {
                request = request.with_reference(reference);
            }
        }
        request
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run_studio(engine: &mut AssetEngine, out_dir: &Path) -> Result<()> {
    let mut state = StudioState::new(out_dir);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    println!(
        "Assetsmith studio ({}). Type /help for commands.",
        engine.provider()
    );
    loop {
        print!("> ");
        stdout.flush()?;

        line.clear();
        let read = match stdin.lock().read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }
        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        if handle_command(engine, &mut state, &command, &mut stdout)? == Flow::Quit {
            break;
        }
    }
    engine.finish()?;
    Ok(())
}

/// Runs one command. Failures are reported and the session goes on; only an
/// event-log failure ends it.
pub fn handle_command(
    engine: &mut AssetEngine,
    state: &mut StudioState,
    command: &StudioCommand,
    out: &mut impl Write,
) -> Result<Flow> {
    match execute(engine, state, command, out) {
        Ok(flow) => Ok(flow),
        Err(err) => match err.downcast_ref::<GenerationError>() {
            Some(GenerationError::EventLog(_)) => Err(err),
            Some(generation) => {
                writeln!(out, "Failed: {}", generation.user_message())?;
                Ok(Flow::Continue)
            }
            None => {
                writeln!(out, "Failed: {err:#}")?;
                Ok(Flow::Continue)
            }
        },
    }
}

fn execute(
    engine: &mut AssetEngine,
    state: &mut StudioState,
    command: &StudioCommand,
    out: &mut impl Write,
) -> Result<Flow> {
    let prompt = command.prompt.as_deref().unwrap_or_default();
    match command.action.as_str() {
        "noop" => {}
        "help" => writeln!(out, "Commands: {}", STUDIO_HELP_COMMANDS.join(" "))?,
        "quit" => return Ok(Flow::Quit),
        "set_option" => {
            let option = command.arg("option").unwrap_or("style");
            let value = command.arg("value").unwrap_or_default();
            state.style.set(option, value).map_err(anyhow::Error::msg)?;
            if value.is_empty() {
                writeln!(out, "Cleared {option}")?;
            } else {
                writeln!(out, "Set {option}: {value}")?;
            }
        }
        "set_aspect" => match command.arg("value") {
            None => {
                state.aspect = None;
                writeln!(out, "Aspect ratio: category default")?;
            }
            Some(raw) => {
                let Some(aspect) = AspectRatio::parse(raw) else {
                    anyhow::bail!("unsupported aspect ratio '{raw}'");
                };
                state.aspect = Some(aspect);
                writeln!(out, "Aspect ratio: {aspect}")?;
            }
        },
        "set_variants" => {
            let raw = command.arg("value").unwrap_or("1");
            let count: u8 = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("variants must be a number, got '{raw}'"))?;
            if count == 0 {
                anyhow::bail!("variants must be at least 1");
            }
            state.variants = count;
            writeln!(out, "Variants: {count}")?;
        }
        "set_category" => {
            let raw = command.arg("value").unwrap_or_default();
            let Some(category) = Category::parse(raw).filter(|category| category.produces_asset())
            else {
                anyhow::bail!("'{raw}' is not an image category");
            };
            state.category = category;
            writeln!(out, "Category: {}", category.spec().label)?;
        }
        "set_refine" => {
            let raw = command.arg("value").unwrap_or_default();
            let Some(enabled) = parse_switch(raw) else {
                anyhow::bail!("/refine takes on or off");
            };
            state.refine = enabled;
            writeln!(out, "Art-director refinement: {}", if enabled { "on" } else { "off" })?;
        }
        "set_tier" => {
            state.tier = command
                .arg("tier")
                .and_then(QualityTier::parse)
                .unwrap_or_default();
            writeln!(out, "Quality tier: {}", state.tier.as_str())?;
        }
        "set_reference" => match command.arg("path") {
            None => {
                state.reference = None;
                writeln!(out, "Reference cleared")?;
            }
            Some(raw) => {
                state.reference = Some(resolve_image(engine, raw)?);
                writeln!(out, "Reference set: {raw}")?;
            }
        },
        "set_mask" => match command.arg("path") {
            None => {
                state.mask = None;
                writeln!(out, "Mask cleared")?;
            }
            Some(raw) => {
                let mask = MaskInput::load(Path::new(raw))?;
                writeln!(out, "Mask loaded: {}", mask.describe())?;
                state.mask = Some(mask);
            }
        },
        "clear_inputs" => {
            state.reference = None;
            state.mask = None;
            writeln!(out, "Reference and mask cleared")?;
        }
        "generate" => {
            let category = command
                .arg("category")
                .and_then(Category::parse)
                .unwrap_or(state.category);
            state.category = category;
            let ids = engine.generate(state.request(category, prompt))?;
            report_created(engine, &ids, out)?;
        }
        "brainstorm" => {
            let ideas = engine.brainstorm(prompt, state.style.clone())?;
            writeln!(out, "{ideas}")?;
        }
        "edit" => {
            let source = resolve_image(engine, command.arg("path").unwrap_or_default())?;
            let ids = run_edit(engine, source, prompt, state.mask.as_ref(), state.style.clone())?;
            report_created(engine, &ids, out)?;
        }
        "uv_paint" => {
            let layout = resolve_image(engine, command.arg("path").unwrap_or_default())?;
            let request = GenerationRequest::new(Category::UvPaint, prompt)
                .with_style(state.style.clone())
                .with_reference(layout);
            let ids = engine.generate(request)?;
            report_created(engine, &ids, out)?;
        }
        "analyze" => {
            let image = resolve_image(engine, command.arg("path").unwrap_or("latest"))?;
            let report = engine.analyze(image.clone(), state.style.get(StyleOption::Engine), "")?;
            writeln!(out, "Critique: {}", report.critique)?;
            for issue in &report.technical_issues {
                writeln!(out, "  - {issue}")?;
            }
            writeln!(out, "Engine: {}", report.engine_suggestions)?;
            writeln!(out, "Remaster prompt: {}", report.remaster_prompt)?;
            state.last_analysis = Some((image, report));
        }
        "describe_style" => {
            let image = resolve_image(engine, command.arg("path").unwrap_or("latest"))?;
            let description = engine.describe_style(image)?;
            writeln!(out, "{description}")?;
        }
        "remaster" => {
            let (source, report) = match command.arg("target") {
                None => match state.last_analysis.clone() {
                    Some(previous) => previous,
                    None => anyhow::bail!("/remaster needs a target or a previous /analyze"),
                },
                Some(raw) => {
                    let image = resolve_image(engine, raw)?;
                    let report =
                        engine.analyze(image.clone(), state.style.get(StyleOption::Engine), "")?;
                    (image, report)
                }
            };
            let ids = engine.remaster(source, &report, state.tier)?;
            report_created(engine, &ids, out)?;
        }
        "list" => {
            if engine.registry().is_empty() {
                writeln!(out, "Gallery is empty")?;
            }
            for asset in engine.registry().list() {
                writeln!(
                    out,
                    "{}  {:<16} {}",
                    asset.id(),
                    asset.category().as_str(),
                    asset.origin_prompt()
                )?;
            }
        }
        "delete" => {
            let raw = command.arg("id").unwrap_or_default();
            let id: AssetId = raw.parse().map_err(anyhow::Error::msg)?;
            if engine.remove_asset(id)? {
                writeln!(out, "Deleted {id}")?;
            } else {
                writeln!(out, "No asset {id}; nothing deleted")?;
            }
        }
        "export" => {
            let dir = command
                .arg("dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| state.out_dir.clone());
            let manifest = export_gallery(engine.registry(), &dir)?;
            writeln!(out, "Exported {} asset(s) to {}", engine.registry().len(), manifest.display())?;
        }
        "unknown" => {
            writeln!(
                out,
                "Unknown command /{}. Type /help for commands.",
                command.arg("command").unwrap_or_default()
            )?;
        }
        other => writeln!(out, "Unhandled action {other}")?,
    }
    Ok(Flow::Continue)
}

fn report_created(engine: &AssetEngine, ids: &[AssetId], out: &mut impl Write) -> Result<()> {
    for id in ids {
        let category = engine
            .registry()
            .get(*id)
            .map(|asset| asset.category().as_str())
            .unwrap_or_default();
        writeln!(out, "Created {id} ({category})")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assetsmith_contracts::assets::{Category, QualityTier};
    use assetsmith_contracts::events::EventWriter;
    use assetsmith_contracts::studio::parse_command;
    use assetsmith_engine::{AssetEngine, DryrunClient, ModelOverrides};

    use super::{handle_command, Flow, StudioState};

    fn session(dir: &std::path::Path) -> anyhow::Result<(AssetEngine, StudioState)> {
        let engine = AssetEngine::new(
            Arc::new(DryrunClient::new()),
            ModelOverrides::default(),
            EventWriter::discard("session-studio"),
        )?;
        Ok((engine, StudioState::new(dir)))
    }

    fn run(
        engine: &mut AssetEngine,
        state: &mut StudioState,
        line: &str,
    ) -> anyhow::Result<(Flow, String)> {
        let mut out = Vec::new();
        let flow = handle_command(engine, state, &parse_command(line), &mut out)?;
        Ok((flow, String::from_utf8(out)?))
    }

    #[test]
    fn generate_list_delete_export() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (mut engine, mut state) = session(temp.path())?;

        let (_, created) = run(&mut engine, &mut state, "/texture mossy stone wall")?;
        assert!(created.starts_with("Created asset-"));
        assert_eq!(state.category, Category::Texture);

        let (_, listing) = run(&mut engine, &mut state, "/list")?;
        assert!(listing.contains("texture"));
        assert!(listing.contains("mossy stone wall"));

        let (_, exported) = run(&mut engine, &mut state, "/export")?;
        assert!(exported.starts_with("Exported 1 asset(s)"));
        assert!(temp.path().join("gallery.json").exists());

        let id = engine.registry().list()[0].id();
        let (_, deleted) = run(&mut engine, &mut state, &format!("/delete {id}"))?;
        assert_eq!(deleted.trim(), format!("Deleted {id}"));
        let (_, again) = run(&mut engine, &mut state, &format!("/delete {id}"))?;
        assert!(again.contains("nothing deleted"));
        Ok(())
    }

    #[test]
    fn settings_flow_into_requests() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (mut engine, mut state) = session(temp.path())?;
        run(&mut engine, &mut state, "/draft")?;
        run(&mut engine, &mut state, "/variants 2")?;
        run(&mut engine, &mut state, "/palette teal, rust")?;
        assert_eq!(state.tier, QualityTier::Draft);

        run(&mut engine, &mut state, "/banner sunken city")?;
        assert_eq!(engine.registry().len(), 2);

        // Plain text reuses the active category.
        run(&mut engine, &mut state, "/category ui")?;
        run(&mut engine, &mut state, "health potion")?;
        assert_eq!(engine.registry().len(), 4);
        assert_eq!(engine.registry().latest().map(|a| a.category()), Some(Category::UiElement));
        Ok(())
    }

    #[test]
    fn failures_are_reported_and_the_session_continues() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (mut engine, mut state) = session(temp.path())?;

        let (flow, message) = run(&mut engine, &mut state, "/texture")?;
        assert_eq!(flow, Flow::Continue);
        assert!(message.starts_with("Failed:"));

        let (_, missing) = run(&mut engine, &mut state, "/edit /nonexistent/shield.png add moss")?;
        assert!(missing.starts_with("Failed:"));

        let (_, unknown) = run(&mut engine, &mut state, "/sculpt dragon")?;
        assert!(unknown.contains("Unknown command /sculpt"));
        assert!(engine.registry().is_empty());
        Ok(())
    }

    #[test]
    fn edit_analyze_and_remaster_latest_asset() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (mut engine, mut state) = session(temp.path())?;
        run(&mut engine, &mut state, "/logo Ember Keep")?;

        let (_, edited) = run(&mut engine, &mut state, "/edit latest add embers")?;
        assert!(edited.contains("(edit)"));

        let (_, analysis) = run(&mut engine, &mut state, "/analyze latest")?;
        assert!(analysis.starts_with("Critique:"));

        let (_, remastered) = run(&mut engine, &mut state, "/remaster")?;
        assert!(remastered.contains("(remaster)"));
        assert_eq!(engine.registry().len(), 3);
        Ok(())
    }

    #[test]
    fn quit_ends_the_loop() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (mut engine, mut state) = session(temp.path())?;
        let (flow, _) = run(&mut engine, &mut state, "/quit")?;
        assert_eq!(flow, Flow::Quit);
        Ok(())
    }
}
