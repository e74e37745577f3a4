//! HTTP Generation Service
//!
//! [`GenerationService`] over the studio's REST API.
//!
//! # Endpoints
//!
//! - `GET  /health`
//! - `POST /settings/test-api-key`
//! - `GET  /templates`, `GET /templates/categories`
//! - `POST /research`
//! - `POST /plan/generate`
//! - `POST /image/generate`
//! - `GET  /files/<filename>`
//! - `POST /export/<format>`
//!
//! Envelope endpoints (`{ok, ..., error?}`) are decoded from the body even
//! on error statuses, so the server's own message reaches the user.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::traits::{
    AckResponse, ExportFormat, GenerationService, HealthStatus, ImageRequest, ImageResponse,
    PlanRequest, PlanResponse, ResearchResponse, ServiceError,
};
use crate::config::StudioConfig;
use crate::model::Template;

#[derive(Deserialize)]
struct TemplateList {
    templates: Vec<Template>,
}

#[derive(Deserialize)]
struct CategoryList {
    categories: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the generation service
#[derive(Clone)]
pub struct HttpService {
    /// Base URL without trailing slash (e.g. `http://localhost:5000/api`)
    base_url: String,
    /// Timeout for image generation, which runs far longer than other calls
    image_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpService {
    /// Create a client for the given base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        image_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            image_timeout,
            http_client,
        })
    }

    /// Create from resolved configuration
    ///
    /// # Errors
    ///
    /// Same as [`HttpService::new`].
    pub fn from_config(config: &StudioConfig) -> Result<Self, ServiceError> {
        Self::new(
            config.service_url.clone(),
            config.request_timeout(),
            config.image_timeout(),
        )
    }

    /// Base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Decode an `{ok, ...}` envelope regardless of status
    async fn envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<T>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ServiceError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            }),
            Err(e) => Err(ServiceError::Decode(e.to_string())),
        }
    }

    /// Decode a plain JSON payload, failing on error statuses
    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    /// Read a binary payload, failing on error statuses
    async fn bytes(response: reqwest::Response) -> Result<Vec<u8>, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Pull `error` out of a JSON body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl GenerationService for HttpService {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        let response = self
            .http_client
            .get(self.url("health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await?;
        Self::json(response).await
    }

    async fn test_credential(&self, credential: &str) -> Result<AckResponse, ServiceError> {
        let response = self
            .http_client
            .post(self.url("settings/test-api-key"))
            .json(&serde_json::json!({ "api_key": credential }))
            .send()
            .await?;
        Self::envelope(response).await
    }

    async fn list_templates(&self, category: Option<&str>) -> Result<Vec<Template>, ServiceError> {
        let mut request = self.http_client.get(self.url("templates"));
        if let Some(category) = category {
            request = request.query(&[("category", category)]);
        }
        let list: TemplateList = Self::json(request.send().await?).await?;
        Ok(list.templates)
    }

    async fn list_categories(&self) -> Result<Vec<String>, ServiceError> {
        let response = self
            .http_client
            .get(self.url("templates/categories"))
            .send()
            .await?;
        let list: CategoryList = Self::json(response).await?;
        Ok(list.categories)
    }

    async fn research(&self, topic: &str) -> Result<ResearchResponse, ServiceError> {
        tracing::debug!(topic, "POST /research");
        let response = self
            .http_client
            .post(self.url("research"))
            .json(&serde_json::json!({ "topic": topic }))
            .send()
            .await?;
        Self::envelope(response).await
    }

    async fn generate_plan(&self, request: &PlanRequest) -> Result<PlanResponse, ServiceError> {
        tracing::debug!(
            content_type = request.content.content_type(),
            template_id = %request.template_id,
            "POST /plan/generate"
        );
        let response = self
            .http_client
            .post(self.url("plan/generate"))
            .json(request)
            .send()
            .await?;
        Self::envelope(response).await
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse, ServiceError> {
        tracing::debug!(
            custom_prompt = request.custom_prompt.is_some(),
            "POST /image/generate"
        );
        let response = self
            .http_client
            .post(self.url("image/generate"))
            .timeout(self.image_timeout)
            .json(request)
            .send()
            .await?;
        Self::envelope(response).await
    }

    async fn fetch_file(&self, filename: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self.http_client.get(self.file_url(filename)).send().await?;
        Self::bytes(response).await
    }

    async fn export_file(
        &self,
        format: ExportFormat,
        image_path: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .http_client
            .post(self.url(&format!("export/{format}")))
            .json(&serde_json::json!({ "image_path": image_path }))
            .send()
            .await?;
        Self::bytes(response).await
    }

    fn file_url(&self, filename: &str) -> String {
        let Ok(mut url) = reqwest::Url::parse(&self.url("files")) else {
            return self.url(&format!("files/{filename}"));
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            // Pushed as a single escaped segment
            segments.push(filename);
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpService {
        HttpService::new(base, Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_is_normalized() {
        let service = service("http://localhost:5000/api/");
        assert_eq!(service.base_url(), "http://localhost:5000/api");
        assert_eq!(service.url("/research"), "http://localhost:5000/api/research");
    }

    #[test]
    fn test_file_url() {
        let service = service("http://localhost:5000/api");
        assert_eq!(
            service.file_url("vibe_20240501_120000_000.png"),
            "http://localhost:5000/api/files/vibe_20240501_120000_000.png"
        );
    }

    #[test]
    fn test_file_url_escapes_filename() {
        let service = service("http://localhost:5000/api");
        assert_eq!(
            service.file_url("a b/../c.png"),
            "http://localhost:5000/api/files/a%20b%2F..%2Fc.png"
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = StudioConfig::with_dir("/tmp/studio");
        config.service_url = "http://studio.local/api".to_string();
        let service = HttpService::from_config(&config).unwrap();
        assert_eq!(service.base_url(), "http://studio.local/api");
        assert_eq!(service.image_timeout, config.image_timeout());
    }

    #[test]
    fn test_error_message_prefers_json_error_field() {
        assert_eq!(
            error_message(r#"{"ok": false, "error": "Invalid API key: bad"}"#),
            "Invalid API key: bad"
        );
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Grab a free port, then release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let service = service(&format!("http://127.0.0.1:{port}/api"));
        let err = service.health_check().await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
        assert!(service.list_categories().await.is_err());
    }

    // ------------------------------------------------------------------
    // Against a one-shot local server
    // ------------------------------------------------------------------

    /// Answer a single request with a fixed status line and body
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the whole request so closing the socket does not reset it
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{addr}/api")
    }

    fn manual_plan() -> PlanRequest {
        PlanRequest {
            api_key: "key".to_string(),
            content: crate::client::PlanContent::Manual {
                title: "Quarterly Report".to_string(),
                custom_text: "Revenue grew 12%".to_string(),
                sections: Vec::new(),
            },
            template_id: "tech-blueprint".to_string(),
        }
    }

    #[tokio::test]
    async fn test_envelope_on_error_status_is_decoded() {
        let base = serve_once(
            "500 Internal Server Error",
            r#"{"ok": false, "error": "quota exceeded"}"#,
        )
        .await;

        let response = service(&base).generate_plan(&manual_plan()).await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("quota exceeded"));
        assert_eq!(response.into_result(), Err(Some("quota exceeded".to_string())));
    }

    #[tokio::test]
    async fn test_plain_text_error_status_keeps_body() {
        let base = serve_once("502 Bad Gateway", "upstream unavailable\n").await;

        let err = service(&base).research("Rust").await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Status {
                status: 502,
                message: "upstream unavailable".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_body_on_success_is_decode_error() {
        let base = serve_once("200 OK", "<html>not json</html>").await;

        let err = service(&base).generate_plan(&manual_plan()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_workflow_falls_back_on_undecodable_response() {
        use crate::credentials::CredentialStore;
        use crate::model::{InputMode, Template};
        use crate::store::StateStore;
        use crate::workflow::{Workflow, WorkflowError};

        let base = serve_once("200 OK", "not json").await;
        let store = StateStore::new(CredentialStore::in_memory("key"));
        store.set_input_mode(InputMode::Manual);
        store.set_manual_title("Quarterly Report");
        store.set_manual_body("Revenue grew 12%");
        store.select_template(Some(Template {
            id: "tech-blueprint".to_string(),
            name: "Tech Blueprint".to_string(),
            description: String::new(),
            category: "Tech".to_string(),
            theme: None,
            preview: None,
        }));
        let workflow = Workflow::new(store, service(&base));

        let err = workflow.generate_spec_from_manual().await.unwrap_err();

        assert_eq!(err, WorkflowError::Remote("Failed to generate spec".to_string()));
        let state = workflow.store().snapshot();
        assert_eq!(state.error.as_deref(), Some("Failed to generate spec"));
        assert!(!state.loading.active);
    }
}
