//! Generation Service Traits
//!
//! The contract between the workflow core and the remote generation service.
//! The orchestrator only talks to [`GenerationService`], so tests can swap in
//! a mock and other transports can be added without touching workflow logic.
//!
//! # Response Convention
//!
//! Generation endpoints answer with an explicit `ok` flag plus either a
//! payload or an `error` string. Callers must look at `ok`; a successful HTTP
//! status alone never means success.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ManualSection, ResearchBundle, Spec, Template};

/// Failure talking to the generation service
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The request never produced a response (connection, timeout, ...)
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success status without a usable envelope
    #[error("service returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Server-provided message (may be empty)
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Human-readable message, if the failure carried one
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            Self::Transport(message) | Self::Decode(message) => message,
            Self::Status { message, .. } => message,
        };
        let message = message.trim();
        (!message.is_empty()).then_some(message)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Liveness payload from the health endpoint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Short status word ("ok")
    #[serde(default)]
    pub status: String,
    /// Free-form message
    #[serde(default)]
    pub message: String,
}

/// Generic `{ok, message?, error?}` acknowledgement
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    /// Success flag
    pub ok: bool,
    /// Success message
    #[serde(default)]
    pub message: Option<String>,
    /// Failure message
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of the research call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResponse {
    /// Success flag
    pub ok: bool,
    /// Research artifact
    #[serde(default)]
    pub bundle: Option<ResearchBundle>,
    /// Failure message
    #[serde(default)]
    pub error: Option<String>,
}

impl ResearchResponse {
    /// Bundle on success, otherwise the server's message (if any)
    pub fn into_result(self) -> Result<ResearchBundle, Option<String>> {
        match (self.ok, self.bundle) {
            (true, Some(bundle)) => Ok(bundle),
            _ => Err(self.error),
        }
    }
}

/// Result of plan generation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    /// Success flag
    pub ok: bool,
    /// Generated spec
    #[serde(default)]
    pub spec: Option<Spec>,
    /// Failure message
    #[serde(default)]
    pub error: Option<String>,
}

impl PlanResponse {
    /// Spec on success, otherwise the server's message (if any)
    pub fn into_result(self) -> Result<Spec, Option<String>> {
        match (self.ok, self.spec) {
            (true, Some(spec)) => Ok(spec),
            _ => Err(self.error),
        }
    }
}

/// Result of image generation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Success flag
    pub ok: bool,
    /// Storage path on the service side
    #[serde(default)]
    pub image_path: Option<String>,
    /// File name for download
    #[serde(default)]
    pub filename: Option<String>,
    /// Failure message
    #[serde(default)]
    pub error: Option<String>,
}

impl ImageResponse {
    /// `(image_path, filename)` on success, otherwise the server's message
    pub fn into_result(self) -> Result<(String, String), Option<String>> {
        match (self.ok, self.image_path, self.filename) {
            (true, Some(path), Some(filename)) => Ok((path, filename)),
            _ => Err(self.error),
        }
    }
}

/// Content half of a plan request, discriminated by `content_type`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "content_type", rename_all = "lowercase")]
pub enum PlanContent {
    /// Plan from a research bundle
    Research {
        /// The research artifact
        bundle: ResearchBundle,
    },
    /// Plan from manual input
    Manual {
        /// Document title
        title: String,
        /// Main body text
        custom_text: String,
        /// Extra sections
        sections: Vec<ManualSection>,
    },
}

impl PlanContent {
    /// Wire name of the content type
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Research { .. } => "research",
            Self::Manual { .. } => "manual",
        }
    }
}

/// Plan generation request
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PlanRequest {
    /// API credential
    pub api_key: String,
    /// Content and its type
    #[serde(flatten)]
    pub content: PlanContent,
    /// Selected template id
    pub template_id: String,
}

impl std::fmt::Debug for PlanRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanRequest")
            .field("api_key", &"<redacted>")
            .field("content", &self.content)
            .field("template_id", &self.template_id)
            .finish()
    }
}

/// Image generation request
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequest {
    /// API credential
    pub api_key: String,
    /// Spec whose image prompt is used
    pub spec: Spec,
    /// Prompt overriding the spec's own
    pub custom_prompt: Option<String>,
}

impl std::fmt::Debug for ImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRequest")
            .field("api_key", &"<redacted>")
            .field("spec", &self.spec.title)
            .field("custom_prompt", &self.custom_prompt)
            .finish()
    }
}

/// Export target format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Raster image
    Png,
    /// Document
    Pdf,
}

impl ExportFormat {
    /// Path segment and file extension
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("Unsupported format: {other}")),
        }
    }
}

/// Remote generation service
///
/// Implement this trait to plug in a different transport or a test double.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Service name for logs
    fn name(&self) -> &str;

    /// Liveness check
    async fn health_check(&self) -> Result<HealthStatus, ServiceError>;

    /// Ask the service whether a credential works
    async fn test_credential(&self, credential: &str) -> Result<AckResponse, ServiceError>;

    /// Templates, optionally filtered by category
    async fn list_templates(&self, category: Option<&str>) -> Result<Vec<Template>, ServiceError>;

    /// Template categories
    async fn list_categories(&self) -> Result<Vec<String>, ServiceError>;

    /// Research a topic online
    async fn research(&self, topic: &str) -> Result<ResearchResponse, ServiceError>;

    /// Generate a spec from research or manual content
    async fn generate_plan(&self, request: &PlanRequest) -> Result<PlanResponse, ServiceError>;

    /// Generate an image from a spec
    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse, ServiceError>;

    /// Download a generated file
    async fn fetch_file(&self, filename: &str) -> Result<Vec<u8>, ServiceError>;

    /// Convert a generated image to another format
    async fn export_file(
        &self,
        format: ExportFormat,
        image_path: &str,
    ) -> Result<Vec<u8>, ServiceError>;

    /// URL a surface can use to preview a generated file directly
    fn file_url(&self, filename: &str) -> String;
}
