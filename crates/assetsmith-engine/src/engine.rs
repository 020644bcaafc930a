use std::sync::Arc;

use assetsmith_contracts::analysis::{AnalysisReport, REQUIRED_KEYS};
use assetsmith_contracts::assets::{Category, QualityTier, StyleOption, StyleOptions};
use assetsmith_contracts::events::EventWriter;
use assetsmith_contracts::session::{sanitize_payload, AssetId, SessionRegistry};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::client::GenerativeClient;
use crate::composer::{compose, refine_concept, remaster_text, GenerationRequest, Refinement};
use crate::dispatch::{Dispatcher, ModelOverrides};
use crate::encoder::EncodedImage;
use crate::error::{GenerationError, GenerationResult};
use crate::extract::extract_json_object;
use crate::mask::{build_mask, BrushStroke};

/// One interactive session: dispatches requests and owns the gallery.
pub struct AssetEngine {
    dispatcher: Dispatcher,
    registry: SessionRegistry,
    events: EventWriter,
    started_at: String,
}

impl AssetEngine {
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        overrides: ModelOverrides,
        events: EventWriter,
    ) -> GenerationResult<Self> {
        let started_at = now_utc_iso();
        let engine = Self {
            dispatcher: Dispatcher::new(client, overrides),
            registry: SessionRegistry::new(),
            events,
            started_at,
        };
        engine.emit(
            "session_started",
            json!({
                "provider": engine.dispatcher.client().name(),
                "started_at": engine.started_at,
            }),
        )?;
        Ok(engine)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn provider(&self) -> &str {
        self.dispatcher.client().name()
    }

    /// Runs an image request. Assets are appended only when every variant
    /// succeeded; on failure the registry is unchanged.
    pub fn generate(&mut self, request: GenerationRequest) -> GenerationResult<Vec<AssetId>> {
        let category = request.category;
        if !category.produces_asset() {
            return Err(GenerationError::invalid(format!(
                "{} does not produce gallery assets.",
                category.spec().label
            )));
        }
        let request = self.refine_if_requested(request)?;
        let prompt = compose(&request)?;
        let selection = self.dispatcher.image_model(prompt.tier)?;
        let model = selection.model.name.clone();

        self.emit(
            "prompt_composed",
            json!({
                "category": category.as_str(),
                "tier": prompt.tier.as_str(),
                "variants": prompt.variants,
                "aspect_ratio": prompt.aspect_ratio.map(|ratio| ratio.as_str()),
                "parts": prompt.part_kinds(),
                "text": prompt.text,
            }),
        )?;
        self.emit(
            "generation_started",
            json!({
                "category": category.as_str(),
                "model": model,
                "requested_model": selection.requested,
                "fallback_reason": selection.fallback_reason,
            }),
        )?;

        let images = match self.dispatcher.generate_images(&prompt, &model) {
            Ok(images) => images,
            Err(err) => return Err(self.record_failure(category, &model, err)),
        };

        let mut created = Vec::with_capacity(images.len());
        for image in images {
            let media_type = image.media_type.clone();
            match self
                .registry
                .append(category, image.into_reference(), request.user_text.trim())
            {
                Ok(asset) => created.push((asset.id(), media_type)),
                Err(err) => {
                    self.roll_back(&created);
                    return Err(GenerationError::invalid(err.to_string()));
                }
            }
        }
        for (id, media_type) in &created {
            let logged = self.emit(
                "asset_created",
                json!({
                    "asset_id": id.to_string(),
                    "category": category.as_str(),
                    "media_type": media_type,
                    "model": model,
                }),
            );
            if let Err(err) = logged {
                self.roll_back(&created);
                return Err(err);
            }
        }
        Ok(created.into_iter().map(|(id, _)| id).collect())
    }

    fn roll_back(&mut self, created: &[(AssetId, String)]) {
        for (id, _) in created {
            self.registry.remove(*id);
        }
    }

    /// Edit with a mask painted from `strokes`. The mask is rebuilt on every
    /// call; no strokes means a whole-image edit.
    pub fn edit(
        &mut self,
        source: EncodedImage,
        instruction: &str,
        strokes: &[BrushStroke],
        style: StyleOptions,
    ) -> GenerationResult<Vec<AssetId>> {
        let mask = if strokes.is_empty() {
            None
        } else {
            let (width, height) = source.dimensions()?;
            build_mask(strokes, width, height)?
        };
        self.generate(
            GenerationRequest::new(Category::Edit, instruction)
                .with_reference(source)
                .with_mask(mask)
                .with_style(style),
        )
    }

    pub fn remaster(
        &mut self,
        source: EncodedImage,
        report: &AnalysisReport,
        tier: QualityTier,
    ) -> GenerationResult<Vec<AssetId>> {
        self.generate(
            GenerationRequest::new(Category::Remaster, remaster_text(report))
                .with_reference(source)
                .with_tier(tier),
        )
    }

    /// Engine-targeted critique of an image. Structured; never saved as an asset.
    pub fn analyze(
        &self,
        image: EncodedImage,
        engine: Option<&str>,
        focus: &str,
    ) -> GenerationResult<AnalysisReport> {
        let mut style = StyleOptions::new();
        if let Some(engine) = engine {
            style
                .insert(StyleOption::Engine, engine)
                .map_err(GenerationError::InvalidInput)?;
        }
        let request = GenerationRequest::new(Category::Critique, focus)
            .with_reference(image)
            .with_style(style);
        let (text, model) = self.run_text(&request, Some(AnalysisReport::response_schema()))?;
        let object = match extract_json_object(&text, &REQUIRED_KEYS) {
            Ok(object) => object,
            Err(err) => return Err(self.record_failure(Category::Critique, &model, err)),
        };
        let report = serde_json::from_value::<AnalysisReport>(Value::Object(object))
            .map_err(|err| GenerationError::malformed(format!("analysis has the wrong shape: {err}")))
            .map_err(|err| self.record_failure(Category::Critique, &model, err))?;
        self.emit(
            "analysis_completed",
            json!({
                "technical_issues": report.technical_issues.len(),
                "engine": engine,
            }),
        )?;
        Ok(report)
    }

    pub fn describe_style(&self, image: EncodedImage) -> GenerationResult<String> {
        let request = GenerationRequest::new(Category::StyleExtraction, "").with_reference(image);
        Ok(self.run_text(&request, None)?.0)
    }

    pub fn brainstorm(&self, theme: &str, style: StyleOptions) -> GenerationResult<String> {
        let request = GenerationRequest::new(Category::Brainstorm, theme).with_style(style);
        Ok(self.run_text(&request, None)?.0)
    }

    /// Idempotent. Returns whether an asset was removed.
    pub fn remove_asset(&mut self, id: AssetId) -> GenerationResult<bool> {
        if self.registry.remove(id).is_none() {
            return Ok(false);
        }
        self.emit("asset_removed", json!({ "asset_id": id.to_string() }))?;
        Ok(true)
    }

    /// Source image for follow-up edits of a gallery asset.
    pub fn asset_image(&self, id: AssetId) -> GenerationResult<EncodedImage> {
        let asset = self
            .registry
            .get(id)
            .ok_or_else(|| GenerationError::invalid(format!("No asset {id} in this session.")))?;
        EncodedImage::from_asset(asset)
    }

    pub fn finish(&self) -> GenerationResult<()> {
        self.emit(
            "session_finished",
            json!({
                "started_at": self.started_at,
                "total_assets": self.registry.len(),
            }),
        )
    }

    /// Returns the answer text and the model that produced it.
    fn run_text(
        &self,
        request: &GenerationRequest,
        schema: Option<Value>,
    ) -> GenerationResult<(String, String)> {
        let category = request.category;
        let prompt = compose(request)?;
        let model = self.dispatcher.text_model()?.model.name;
        self.emit(
            "prompt_composed",
            json!({
                "category": category.as_str(),
                "parts": prompt.part_kinds(),
                "text": prompt.text,
            }),
        )?;
        match self.dispatcher.generate_text(&prompt, &model, schema) {
            Ok(text) => {
                self.emit(
                    "text_completed",
                    json!({
                        "category": category.as_str(),
                        "model": model,
                        "chars": text.chars().count(),
                    }),
                )?;
                Ok((text, model))
            }
            Err(err) => Err(self.record_failure(category, &model, err)),
        }
    }

    fn refine_if_requested(&self, request: GenerationRequest) -> GenerationResult<GenerationRequest> {
        let category = request.category;
        if !request.refine || !category.spec().refinable || request.user_text.trim().is_empty() {
            return Ok(request);
        }
        let model = self.dispatcher.text_model()?.model.name;
        match refine_concept(self.dispatcher.client(), &model, category, &request.user_text) {
            Refinement::Refined(text) => {
                self.emit(
                    "refinement_applied",
                    json!({
                        "category": category.as_str(),
                        "model": model,
                        "raw": request.user_text,
                        "refined": text,
                    }),
                )?;
                Ok(GenerationRequest {
                    user_text: text,
                    ..request
                })
            }
            Refinement::Fallback { reason } => {
                self.emit(
                    "refinement_fallback",
                    json!({
                        "category": category.as_str(),
                        "model": model,
                        "reason": reason,
                    }),
                )?;
                Ok(request)
            }
        }
    }

    /// Logs the failure and hands the error back. A log write failure does
    /// not replace the original error.
    fn record_failure(&self, category: Category, model: &str, err: GenerationError) -> GenerationError {
        let _ = self.emit(
            "generation_failed",
            json!({
                "category": category.as_str(),
                "model": model,
                "error_class": err.class(),
                "error": err.to_string(),
            }),
        );
        err
    }

    fn emit(&self, event_type: &str, payload: Value) -> GenerationResult<()> {
        self.events
            .emit(event_type, sanitize_payload(&payload))
            .map(|_| ())
            .map_err(GenerationError::EventLog)
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, Once};

    use assetsmith_contracts::analysis::AnalysisReport;
    use assetsmith_contracts::assets::{Category, QualityTier, StyleOptions};
    use assetsmith_contracts::events::EventWriter;
    use image::{ImageFormat, Rgba, RgbaImage};
    use serde_json::{json, Value};

    use super::AssetEngine;
    use crate::client::{GenerativeClient, ImageCall, Part, ResponseFormat, TextCall};
    use crate::composer::{GenerationRequest, GLOBAL_EDIT_CLAUSE, MASKED_EDIT_CLAUSE};
    use crate::dispatch::ModelOverrides;
    use crate::encoder::EncodedImage;
    use crate::error::{GenerationError, GenerationResult};
    use crate::mask::BrushStroke;

    /// Scripted client recording every call.
    #[derive(Default)]
    struct FakeClient {
        image_replies: Mutex<Vec<GenerationResult<Value>>>,
        text_replies: Mutex<Vec<GenerationResult<Value>>>,
        image_calls: Mutex<Vec<ImageCall>>,
        text_calls: Mutex<Vec<TextCall>>,
        served: AtomicUsize,
        on_image: Option<Box<dyn Fn() + Send + Sync>>,
    }

    impl FakeClient {
        fn images(replies: Vec<GenerationResult<Value>>) -> Self {
            Self {
                image_replies: Mutex::new(replies),
                ..Self::default()
            }
        }

        fn with_text(self, replies: Vec<GenerationResult<Value>>) -> Self {
            *self.text_replies.lock().unwrap() = replies;
            self
        }

        fn pop(queue: &Mutex<Vec<GenerationResult<Value>>>) -> GenerationResult<Value> {
            let mut queue = queue.lock().unwrap();
            if queue.is_empty() {
                return Err(GenerationError::transport("fake", None, "no scripted reply"));
            }
            queue.remove(0)
        }
    }

    impl GenerativeClient for FakeClient {
        fn name(&self) -> &str {
            "dryrun"
        }

        fn generate_image(&self, call: &ImageCall) -> GenerationResult<Value> {
            self.image_calls.lock().unwrap().push(call.clone());
            self.served.fetch_add(1, Ordering::SeqCst);
            if let Some(hook) = &self.on_image {
                hook();
            }
            Self::pop(&self.image_replies)
        }

        fn generate_text(&self, call: &TextCall) -> GenerationResult<Value> {
            self.text_calls.lock().unwrap().push(call.clone());
            Self::pop(&self.text_replies)
        }
    }

    fn image_reply(mime: &str, data: &str) -> GenerationResult<Value> {
        Ok(json!({ "candidates": [{ "content": { "parts": [
            { "inlineData": { "mimeType": mime, "data": data } }
        ]}}]}))
    }

    fn text_reply(text: &str) -> GenerationResult<Value> {
        Ok(json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }))
    }

    fn engine_with(client: Arc<FakeClient>) -> anyhow::Result<AssetEngine> {
        Ok(AssetEngine::new(
            client,
            ModelOverrides::default(),
            EventWriter::discard("session-test"),
        )?)
    }

    fn source_png(width: u32, height: u32) -> anyhow::Result<EncodedImage> {
        let image = RgbaImage::from_pixel(width, height, Rgba([90, 90, 90, 255]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png)?;
        Ok(EncodedImage::from_bytes(&out.into_inner(), Some("image/png"))?)
    }

    #[test]
    fn texture_request_appends_one_asset_with_data_url() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![image_reply("image/jpeg", "X")]));
        let mut engine = engine_with(client.clone())?;

        let ids = engine.generate(GenerationRequest::new(Category::Texture, "mossy stone wall"))?;

        assert_eq!(ids.len(), 1);
        let asset = engine.registry().get(ids[0]).ok_or_else(|| anyhow::anyhow!("missing"))?;
        assert_eq!(asset.category(), Category::Texture);
        assert_eq!(asset.data().to_data_url(), "data:image/jpeg;base64,X");
        assert_eq!(asset.origin_prompt(), "mossy stone wall");

        let calls = client.image_calls.lock().unwrap();
        let Some(Part::Text(text)) = calls[0].parts.last() else {
            anyhow::bail!("instruction part missing");
        };
        assert!(text.contains("seamless, tileable"));
        assert_eq!(calls[0].model, "dryrun-image-1");
        Ok(())
    }

    #[test]
    fn failed_variant_appends_nothing() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![
            image_reply("image/png", "A"),
            Err(GenerationError::transport("fake", Some(503), "overloaded")),
            image_reply("image/png", "C"),
        ]));
        let mut engine = engine_with(client.clone())?;

        let err = engine
            .generate(GenerationRequest::new(Category::Logo, "Ember Keep").with_variants(3))
            .unwrap_err();

        assert!(err.is_transport());
        assert!(engine.registry().is_empty());
        assert_eq!(client.served.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[test]
    fn all_variants_succeed_newest_first() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![
            image_reply("image/png", "A"),
            image_reply("image/png", "B"),
        ]));
        let mut engine = engine_with(client)?;
        let ids = engine.generate(GenerationRequest::new(Category::Banner, "sunken city").with_variants(2))?;
        assert_eq!(ids.len(), 2);
        assert_eq!(engine.registry().len(), 2);
        assert_eq!(engine.registry().latest().map(|asset| asset.id()), Some(ids[1]));
        Ok(())
    }

    #[test]
    fn refusal_leaves_registry_unchanged() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![text_reply("I cannot draw that.")]));
        let mut engine = engine_with(client)?;
        let err = engine
            .generate(GenerationRequest::new(Category::UiElement, "potion"))
            .unwrap_err();
        assert!(err.is_refusal());
        assert!(engine.registry().is_empty());
        Ok(())
    }

    #[test]
    fn invalid_request_makes_no_call() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::default());
        let mut engine = engine_with(client.clone())?;
        let err = engine
            .generate(GenerationRequest::new(Category::Texture, "   "))
            .unwrap_err();
        assert_eq!(err.class(), "invalid_input");
        assert_eq!(client.served.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn edit_without_strokes_sends_no_mask() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![image_reply("image/png", "E")]));
        let mut engine = engine_with(client.clone())?;
        engine.edit(source_png(32, 32)?, "make it night", &[], StyleOptions::new())?;

        let calls = client.image_calls.lock().unwrap();
        let kinds: Vec<&str> = calls[0].parts.iter().map(Part::kind).collect();
        assert_eq!(kinds, vec!["image", "text"]);
        let Some(Part::Text(text)) = calls[0].parts.last() else {
            anyhow::bail!("instruction part missing");
        };
        assert!(text.contains(GLOBAL_EDIT_CLAUSE));
        Ok(())
    }

    #[test]
    fn edit_with_strokes_sends_binary_mask_between_source_and_text() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![image_reply("image/png", "E")]));
        let mut engine = engine_with(client.clone())?;
        let strokes = vec![BrushStroke::paint(vec![[4.0, 4.0], [20.0, 20.0]], 3.0)];
        engine.edit(source_png(24, 24)?, "add moss", &strokes, StyleOptions::new())?;

        let calls = client.image_calls.lock().unwrap();
        let [Part::Image(_), Part::Image(mask), Part::Text(text)] = calls[0].parts.as_slice() else {
            anyhow::bail!("unexpected part layout");
        };
        assert_eq!(mask.media_type, "image/png");
        assert_eq!(mask.dimensions()?, (24, 24));
        assert!(text.contains(MASKED_EDIT_CLAUSE));
        Ok(())
    }

    #[test]
    fn refinement_rewrites_concept_and_falls_back_on_failure() -> anyhow::Result<()> {
        let client = Arc::new(
            FakeClient::images(vec![image_reply("image/png", "A"), image_reply("image/png", "B")])
                .with_text(vec![
                    text_reply("An obsidian keep at dusk."),
                    Err(GenerationError::transport("fake", None, "down")),
                ]),
        );
        let mut engine = engine_with(client.clone())?;

        let refined = engine.generate(
            GenerationRequest::new(Category::Logo, "dark castle").with_refine(true),
        )?;
        let fallback = engine.generate(
            GenerationRequest::new(Category::Logo, "dark castle").with_refine(true),
        )?;

        let prompt_of = |id| {
            engine
                .registry()
                .get(id)
                .map(|asset| asset.origin_prompt().to_string())
                .unwrap_or_default()
        };
        assert_eq!(prompt_of(refined[0]), "An obsidian keep at dusk.");
        assert_eq!(prompt_of(fallback[0]), "dark castle");
        assert_eq!(client.text_calls.lock().unwrap().len(), 2);

        let calls = client.image_calls.lock().unwrap();
        let (Some(Part::Text(first)), Some(Part::Text(second))) =
            (calls[0].parts.last(), calls[1].parts.last())
        else {
            anyhow::bail!("image requests are missing their text part");
        };
        assert!(first.contains("An obsidian keep at dusk."));
        assert!(!first.contains("dark castle"));
        assert!(second.contains("dark castle"));
        assert!(!second.contains("obsidian"));
        Ok(())
    }

    #[test]
    fn draft_tier_uses_draft_model() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![image_reply("image/png", "D")]));
        let mut engine = engine_with(client.clone())?;
        engine.generate(
            GenerationRequest::new(Category::Banner, "frozen harbor").with_tier(QualityTier::Draft),
        )?;
        assert_eq!(client.image_calls.lock().unwrap()[0].model, "dryrun-image-draft");
        Ok(())
    }

    #[test]
    fn analyze_validates_structured_answer() -> anyhow::Result<()> {
        let complete = r#"{"critique":"Solid read.","technicalIssues":["seams"],"engineSuggestions":"Clamp wrap.","remasterPrompt":"clean bark"}"#;
        let client = Arc::new(
            FakeClient::default().with_text(vec![text_reply(complete), text_reply(r#"{"critique":"x"}"#)]),
        );
        let engine = engine_with(client.clone())?;

        let report = engine.analyze(source_png(8, 8)?, Some("Godot"), "")?;
        assert_eq!(report.technical_issues, vec!["seams".to_string()]);
        {
            let calls = client.text_calls.lock().unwrap();
            assert!(matches!(calls[0].format, ResponseFormat::Json { .. }));
            let Some(Part::Text(text)) = calls[0].parts.last() else {
                anyhow::bail!("instruction part missing");
            };
            assert!(text.contains("for Godot"));
        }

        let err = engine.analyze(source_png(8, 8)?, None, "").unwrap_err();
        assert!(err.is_malformed());
        assert!(engine.registry().is_empty());
        Ok(())
    }

    #[test]
    fn malformed_analysis_failure_names_the_text_model() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let client = Arc::new(FakeClient::default().with_text(vec![text_reply("not json at all")]));
        let engine = AssetEngine::new(
            client,
            ModelOverrides::default(),
            EventWriter::new(&events_path, "session-test"),
        )?;
        assert!(engine.analyze(source_png(8, 8)?, None, "").unwrap_err().is_malformed());

        let last: Value = fs::read_to_string(&events_path)?
            .lines()
            .last()
            .map(serde_json::from_str::<Value>)
            .transpose()?
            .unwrap_or(Value::Null);
        assert_eq!(last["type"], json!("generation_failed"));
        assert_eq!(last["category"], json!("critique"));
        assert_eq!(last["model"], json!("dryrun-text-1"));
        Ok(())
    }

    #[test]
    fn log_failure_mid_batch_leaves_registry_unchanged() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let logs = temp.path().join("logs");
        let broken = logs.clone();
        let once = Once::new();
        let client = Arc::new(FakeClient {
            on_image: Some(Box::new(move || {
                once.call_once(|| {
                    let _ = fs::remove_dir_all(&broken);
                    let _ = fs::write(&broken, b"");
                });
            })),
            ..FakeClient::images(vec![
                image_reply("image/png", "A"),
                image_reply("image/png", "B"),
                image_reply("image/png", "C"),
            ])
        });
        let mut engine = AssetEngine::new(
            client.clone(),
            ModelOverrides::default(),
            EventWriter::new(logs.join("events.jsonl"), "session-test"),
        )?;

        let err = engine
            .generate(GenerationRequest::new(Category::Texture, "bark").with_variants(3))
            .unwrap_err();
        assert!(matches!(err, GenerationError::EventLog(_)));
        assert_eq!(client.served.load(Ordering::SeqCst), 3);
        assert!(engine.registry().is_empty());
        Ok(())
    }

    #[test]
    fn remaster_uses_report_prompt_and_source() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![image_reply("image/png", "R")]));
        let mut engine = engine_with(client.clone())?;
        let report = AnalysisReport {
            critique: "muddy".to_string(),
            technical_issues: vec![],
            engine_suggestions: "none".to_string(),
            remaster_prompt: "crisp bronze shield".to_string(),
        };
        let ids = engine.remaster(source_png(8, 8)?, &report, QualityTier::Final)?;
        assert_eq!(
            engine.registry().get(ids[0]).map(|asset| asset.category()),
            Some(Category::Remaster)
        );
        let calls = client.image_calls.lock().unwrap();
        assert_eq!(calls[0].parts.len(), 2);
        Ok(())
    }

    #[test]
    fn text_results_never_become_assets() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::default().with_text(vec![
            text_reply("1. Lantern Keeper\n2. Tide Bell"),
            text_reply("Painterly, warm rim light."),
        ]));
        let mut engine = engine_with(client)?;
        let ideas = engine.brainstorm("haunted lighthouse", StyleOptions::new())?;
        assert!(ideas.contains("Lantern Keeper"));
        let style = engine.describe_style(source_png(4, 4)?)?;
        assert_eq!(style, "Painterly, warm rim light.");
        assert!(engine.registry().is_empty());

        let err = engine
            .generate(GenerationRequest::new(Category::Brainstorm, "x"))
            .unwrap_err();
        assert_eq!(err.class(), "invalid_input");
        Ok(())
    }

    #[test]
    fn remove_is_idempotent_and_logged() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let client = Arc::new(FakeClient::images(vec![image_reply("image/png", "A")]));
        let mut engine = AssetEngine::new(
            client,
            ModelOverrides::default(),
            EventWriter::new(&events_path, "session-test"),
        )?;
        let ids = engine.generate(GenerationRequest::new(Category::Texture, "bark"))?;

        assert!(engine.remove_asset(ids[0])?);
        assert!(!engine.remove_asset(ids[0])?);
        assert!(engine.registry().is_empty());
        engine.finish()?;

        let types: Vec<String> = fs::read_to_string(&events_path)?
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|event| event["type"].as_str().map(str::to_string))
            .collect();
        assert_eq!(
            types,
            vec![
                "session_started",
                "prompt_composed",
                "generation_started",
                "asset_created",
                "asset_removed",
                "session_finished",
            ]
        );
        Ok(())
    }

    #[test]
    fn failures_are_logged_with_error_class() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let client = Arc::new(FakeClient::images(vec![text_reply("nope")]));
        let mut engine = AssetEngine::new(
            client,
            ModelOverrides::default(),
            EventWriter::new(&events_path, "session-test"),
        )?;
        assert!(engine
            .generate(GenerationRequest::new(Category::Texture, "bark"))
            .is_err());
        let last: Value = fs::read_to_string(&events_path)?
            .lines()
            .last()
            .map(serde_json::from_str::<Value>)
            .transpose()?
            .unwrap_or(Value::Null);
        assert_eq!(last["type"], json!("generation_failed"));
        assert_eq!(last["error_class"], json!("refused"));
        Ok(())
    }

    #[test]
    fn asset_image_reuses_gallery_payload() -> anyhow::Result<()> {
        let client = Arc::new(FakeClient::images(vec![image_reply("image/jpeg", "X")]));
        let mut engine = engine_with(client)?;
        let ids = engine.generate(GenerationRequest::new(Category::Texture, "bark"))?;
        let image = engine.asset_image(ids[0])?;
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,X");
        assert!(engine.asset_image("asset-1".parse().map_err(anyhow::Error::msg)?).is_err());
        Ok(())
    }
}
