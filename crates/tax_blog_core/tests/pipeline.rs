use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tax_blog_core::domain::{default_tone, default_word_count};
use tax_blog_core::pipeline::{DRAFT_FAILED_MESSAGE, NO_SUMMARY_TEXT, OFFLINE_MESSAGE};
use tax_blog_core::{
    AuthorProfile, Citation, ConnectivityProbe, ContentPart, ContentPipeline, ContentRequest,
    ContentResponse, GeneratedImage, GenerationRequest, GenerationStatus, GenerativeModelService,
    HistoryItem, HistoryRepository, ImageRequest, ModelSelection, PipelineError, PortError,
    PortResult, ResponseFormat, SiteProfile, TaxCategory, UploadedFile,
};

//=========================================================================================
// Fakes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Research,
    Keywords,
    Draft,
    Metadata,
}

fn classify(request: &ContentRequest) -> Step {
    let prompt = request.prompt_text();
    if request.response_format == ResponseFormat::Json {
        Step::Metadata
    } else if prompt.contains("Write a professional, accurate blog post") {
        Step::Draft
    } else if prompt.contains("SEO strategist") {
        Step::Keywords
    } else {
        Step::Research
    }
}

type Responder = Box<dyn Fn(Step, &ContentRequest) -> PortResult<ContentResponse> + Send + Sync>;

struct ScriptedModel {
    responder: Responder,
    calls: Mutex<Vec<(Step, ContentRequest)>>,
    image: Option<GeneratedImage>,
}

impl ScriptedModel {
    fn new(responder: Responder) -> Arc<Self> {
        Arc::new(Self {
            responder,
            calls: Mutex::new(Vec::new()),
            image: None,
        })
    }

    fn steps(&self) -> Vec<Step> {
        self.calls.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    fn requests_for(&self, step: Step) -> Vec<ContentRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == step)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl GenerativeModelService for ScriptedModel {
    async fn generate_content(&self, request: ContentRequest) -> PortResult<ContentResponse> {
        let step = classify(&request);
        let result = (self.responder)(step, &request);
        self.calls.lock().unwrap().push((step, request));
        result
    }

    async fn generate_image(&self, _request: ImageRequest) -> PortResult<GeneratedImage> {
        self.image
            .clone()
            .ok_or_else(|| PortError::Unexpected("no image".to_string()))
    }
}

#[derive(Default)]
struct MemoryHistory {
    items: Mutex<Vec<HistoryItem>>,
}

#[async_trait]
impl HistoryRepository for MemoryHistory {
    async fn list(&self) -> PortResult<Vec<HistoryItem>> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn get(&self, id: &str) -> PortResult<HistoryItem> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(id.to_string()))
    }

    async fn add(&self, item: HistoryItem) -> PortResult<()> {
        self.items.lock().unwrap().insert(0, item);
        Ok(())
    }

    async fn delete(&self, id: &str) -> PortResult<()> {
        self.items.lock().unwrap().retain(|i| i.id != id);
        Ok(())
    }
}

struct Switch(AtomicBool);

#[async_trait]
impl ConnectivityProbe for Switch {
    async fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn ok(text: &str) -> PortResult<ContentResponse> {
    Ok(ContentResponse {
        text: text.to_string(),
        citations: Vec::new(),
    })
}

fn irs_citation() -> Citation {
    Citation {
        title: "IRS provides tax inflation adjustments".to_string(),
        uri: "https://www.irs.gov/newsroom/inflation-adjustments".to_string(),
        source: "Google Search".to_string(),
    }
}

fn happy_responder() -> Responder {
    Box::new(|step, _request| match step {
        Step::Research => Ok(ContentResponse {
            text: "The 2025 standard deduction is $15,000 for single filers.".to_string(),
            citations: vec![irs_citation()],
        }),
        Step::Keywords => ok("```json\n[\"standard deduction 2025\", 42, \"irs limits\"]\n```"),
        Step::Draft => ok("```html\n<h1>2025 Standard Deduction</h1><p>Body</p>\n```"),
        Step::Metadata => ok(r#"Sure! {"metaTitle": "2025 Standard Deduction Explained", "metaDescription": "New limits.", "slug": "2025-standard-deduction"}"#),
    })
}

struct Harness {
    model: Arc<ScriptedModel>,
    history: Arc<MemoryHistory>,
    online: Arc<Switch>,
    pipeline: ContentPipeline,
}

fn harness(model: Arc<ScriptedModel>) -> Harness {
    let history = Arc::new(MemoryHistory::default());
    let online = Arc::new(Switch(AtomicBool::new(true)));
    let pipeline = ContentPipeline::new(
        model.clone(),
        online.clone(),
        history.clone(),
        ModelSelection::default(),
        SiteProfile::default(),
    );
    Harness {
        model,
        history,
        online,
        pipeline,
    }
}

fn request(topic: &str) -> GenerationRequest {
    GenerationRequest {
        category: TaxCategory::Individual,
        topic: topic.to_string(),
        files: Vec::new(),
        tone: default_tone(),
        word_count: default_word_count(),
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn full_run_calls_steps_in_order_and_stores_history() {
    let h = harness(ScriptedModel::new(happy_responder()));
    let statuses = Mutex::new(Vec::new());
    let author = AuthorProfile::house_author();

    let outcome = h
        .pipeline
        .run(&request("2025 Standard Deduction"), &author, |status, _| {
            statuses.lock().unwrap().push(status)
        })
        .await
        .expect("run should succeed");

    assert_eq!(
        h.model.steps(),
        vec![Step::Research, Step::Keywords, Step::Draft, Step::Metadata]
    );
    assert_eq!(
        *statuses.lock().unwrap(),
        vec![
            GenerationStatus::Researching,
            GenerationStatus::Thinking,
            GenerationStatus::Complete
        ]
    );

    assert_eq!(outcome.research.citations, vec![irs_citation()]);
    assert_eq!(outcome.keywords, vec!["standard deduction 2025", "irs limits"]);
    assert!(outcome
        .blog_content
        .starts_with("<h1>2025 Standard Deduction</h1><p>Body</p>"));
    assert!(outcome.blog_content.contains(r#"<div class="author-box">"#));
    assert!(outcome.blog_content.contains(r#"<div class="disclaimer-box">"#));
    assert_eq!(outcome.seo_metadata.meta_title, "2025 Standard Deduction Explained");
    assert!(outcome
        .seo_metadata
        .schema_json
        .contains("https://www.irs.gov/newsroom/inflation-adjustments"));

    let stored = h.history.list().await.unwrap();
    assert_eq!(stored.len(), 1);
    let item = &stored[0];
    assert_eq!(item, &outcome.history_item);
    assert_eq!(item.topic, "2025 Standard Deduction");
    assert_eq!(item.category, TaxCategory::Individual);
    assert_eq!(item.author, author);
    assert_eq!(item.research_data, outcome.research);
    assert_eq!(item.blog_content, outcome.blog_content);
    assert_eq!(item.seo_metadata, outcome.seo_metadata);
    assert_eq!(item.keywords, outcome.keywords);
}

#[tokio::test]
async fn offline_run_makes_no_model_calls() {
    let h = harness(ScriptedModel::new(happy_responder()));
    h.online.0.store(false, Ordering::SeqCst);
    let statuses = Mutex::new(Vec::new());

    let err = h
        .pipeline
        .run(
            &request("2025 Standard Deduction"),
            &AuthorProfile::house_author(),
            |status, _| statuses.lock().unwrap().push(status),
        )
        .await
        .unwrap_err();

    assert_eq!(err, PipelineError::Offline);
    assert_eq!(err.user_message(), OFFLINE_MESSAGE);
    assert!(h.model.steps().is_empty());
    assert!(statuses.lock().unwrap().is_empty());
    assert!(h.history.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn draft_failure_triggers_exactly_one_fallback() {
    let responder: Responder = Box::new(|step, request| match step {
        Step::Draft if request.thinking_budget.is_some() => Err(PortError::Upstream {
            status: 500,
            message: "thinking overloaded".to_string(),
        }),
        Step::Draft => ok("<h1>Fallback draft</h1>"),
        _ => happy_responder()(step, request),
    });
    let h = harness(ScriptedModel::new(responder));

    let outcome = h
        .pipeline
        .run(&request("Roth IRA limits"), &AuthorProfile::house_author(), |_, _| {})
        .await
        .unwrap();

    let drafts = h.model.requests_for(Step::Draft);
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].model, "gemini-3-pro-preview");
    assert_eq!(drafts[0].thinking_budget, Some(10240));
    assert_eq!(drafts[1].model, "gemini-2.5-flash");
    assert_eq!(drafts[1].thinking_budget, None);
    assert!(outcome.blog_content.starts_with("<h1>Fallback draft</h1>"));
}

#[tokio::test]
async fn double_draft_failure_reports_fallback_error() {
    let responder: Responder = Box::new(|step, request| match step {
        Step::Draft if request.thinking_budget.is_some() => {
            Err(PortError::Unexpected("primary failed".to_string()))
        }
        Step::Draft => Err(PortError::Unexpected("fallback failed".to_string())),
        _ => happy_responder()(step, request),
    });
    let h = harness(ScriptedModel::new(responder));

    let err = h
        .pipeline
        .run(&request("Roth IRA limits"), &AuthorProfile::house_author(), |_, _| {})
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PipelineError::Draft(PortError::Unexpected("fallback failed".to_string()))
    );
    assert_eq!(err.user_message(), DRAFT_FAILED_MESSAGE);
    assert_eq!(h.model.requests_for(Step::Draft).len(), 2);
    assert!(h.model.requests_for(Step::Metadata).is_empty());
    assert!(h.history.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn degraded_steps_do_not_stop_the_run() {
    let responder: Responder = Box::new(|step, _request| match step {
        Step::Draft => ok("<h1>Draft</h1>"),
        _ => Err(PortError::Unexpected("service down".to_string())),
    });
    let h = harness(ScriptedModel::new(responder));

    let outcome = h
        .pipeline
        .run(&request("Estimated Taxes"), &AuthorProfile::house_author(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(outcome.research.text, "");
    assert!(outcome.research.citations.is_empty());
    assert!(outcome.keywords.is_empty());
    assert_eq!(outcome.seo_metadata.meta_title, "Estimated Taxes - Tax Guide");
    assert_eq!(outcome.seo_metadata.schema_json, "{}");
    assert_eq!(h.history.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_research_text_gets_placeholder() {
    let h = harness(ScriptedModel::new(Box::new(|_, _| ok("   "))));
    let research = h
        .pipeline
        .research("FBAR deadlines", TaxCategory::Individual)
        .await;
    assert_eq!(research.text, NO_SUMMARY_TEXT);

    let requests = h.model.requests_for(Step::Research);
    assert!(requests[0].search_grounding);
    assert!(requests[0].prompt_text().contains("site:irs.gov"));
}

#[tokio::test]
async fn unparseable_metadata_uses_defaults() {
    let h = harness(ScriptedModel::new(Box::new(|_, _| ok("I cannot help with that."))));
    let meta = h
        .pipeline
        .metadata("Section 179", "<h1>x</h1>", &AuthorProfile::house_author(), &[])
        .await;
    assert_eq!(meta.slug, "section-179");
    assert!(meta.image_ideas.is_empty());
}

#[tokio::test]
async fn attachments_precede_the_draft_prompt() {
    let h = harness(ScriptedModel::new(happy_responder()));
    let mut req = request("Depreciation");
    req.files.push(UploadedFile {
        name: "notice.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        data: "JVBERi0=".to_string(),
    });

    h.pipeline
        .run(&req, &AuthorProfile::house_author(), |_, _| {})
        .await
        .unwrap();

    let draft = &h.model.requests_for(Step::Draft)[0];
    assert_eq!(
        draft.parts[0],
        ContentPart::InlineData {
            mime_type: "application/pdf".to_string(),
            data: "JVBERi0=".to_string(),
        }
    );
    assert!(matches!(draft.parts.last(), Some(ContentPart::Text(_))));
}

#[tokio::test]
async fn image_step_returns_data_url() {
    let model = Arc::new(ScriptedModel {
        responder: happy_responder(),
        calls: Mutex::new(Vec::new()),
        image: Some(GeneratedImage {
            mime_type: "image/png".to_string(),
            data: "iVBORw0KGgo=".to_string(),
        }),
    });
    let h = harness(model);
    let url = h.pipeline.image("A tax office").await.unwrap();
    assert_eq!(url, "data:image/png;base64,iVBORw0KGgo=");
}

#[tokio::test]
async fn image_step_propagates_failure() {
    let h = harness(ScriptedModel::new(happy_responder()));
    assert!(h.pipeline.image("A tax office").await.is_err());
}
