pub mod domain;
pub mod json_extract;
pub mod pipeline;
pub mod ports;
pub mod prompts;
pub mod publishing;

pub use domain::{
    AuthorProfile, Citation, GenerationRequest, GenerationState, GenerationStatus, HistoryItem,
    ImageIdea, RelatedTopic, SearchResult, SeoMetadata, SiteProfile, SocialPosts, TaxCategory,
    UploadedFile,
};
pub use json_extract::extract_json;
pub use pipeline::{ContentPipeline, GenerationOutcome, ModelSelection, PipelineError, StepProgress};
pub use ports::{
    ConnectivityProbe, ContentPart, ContentRequest, ContentResponse, GenerativeModelService,
    GeneratedImage, HistoryRepository, ImageRequest, PortError, PortResult, ResponseFormat,
};
