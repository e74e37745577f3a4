//! Workflow Orchestrator
//!
//! Drives the studio pipelines against a [`GenerationService`] and commits
//! every outcome to the shared [`StateStore`].
//!
//! # Pipeline Shape
//!
//! Every remote pipeline runs the same steps:
//!
//! 1. Reject with [`WorkflowError::Busy`] if another pipeline is loading
//! 2. Run the guard from [`guards`]; a rejection is stored and returned
//! 3. Take the loading flag atomically
//! 4. Call the service
//! 5. Commit the result, or the server's message / the fallback
//! 6. Release the loading flag (on every path)
//!
//! Only step 2 and step 5 ever store an error, so a busy rejection leaves the
//! store exactly as it was.

pub mod guards;

use std::sync::Arc;

use thiserror::Error;

use crate::client::{ExportFormat, GenerationService, ServiceError};
use crate::model::{InputMode, ResearchBundle, Spec, Template, View};
use crate::registry::{Image, PageId};
use crate::store::StateStore;

pub use guards::{ContentSource, Rejection, Transition};

/// Category value meaning "no filter"
pub const ALL_CATEGORIES: &str = "All";

/// Blank credential test
pub const CREDENTIAL_EMPTY: &str = "Please enter an API key";
/// Credential accepted
pub const CREDENTIAL_VALID: &str = "API key is valid!";
/// Credential rejected without a server message
pub const CREDENTIAL_INVALID: &str = "Invalid API key";

/// Failure of a workflow operation
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// A precondition failed; no remote call was made
    #[error("{0}")]
    Validation(String),

    /// The service failed or answered `ok = false`
    #[error("{0}")]
    Remote(String),

    /// Another pipeline holds the loading flag
    #[error("another operation is in progress")]
    Busy,
}

/// A freshly generated image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Registry entry
    pub image: Image,
    /// URL for previewing the file directly from the service
    pub preview_url: String,
}

/// Outcome of a credential test
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialCheck {
    /// Whether the service accepted the credential
    pub valid: bool,
    /// Message for the user
    pub message: String,
}

/// Reachability of the generation service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendStatus {
    /// Health check succeeded
    Online,
    /// Health check failed
    Offline,
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// Message carried by a failed call, if the server itself produced one
///
/// Transport and decode failures have no server message, so the caller's
/// fallback applies.
fn server_message(err: &ServiceError) -> Option<String> {
    match err {
        ServiceError::Status { .. } => err.message().map(str::to_string),
        ServiceError::Transport(_) | ServiceError::Decode(_) => None,
    }
}

/// Pipeline orchestrator
pub struct Workflow<S: GenerationService> {
    store: StateStore,
    service: Arc<S>,
}

impl<S: GenerationService> Clone for Workflow<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: GenerationService> Workflow<S> {
    /// Create an orchestrator owning the service
    pub fn new(store: StateStore, service: S) -> Self {
        Self::with_shared(store, Arc::new(service))
    }

    /// Create an orchestrator over a shared service
    pub fn with_shared(store: StateStore, service: Arc<S>) -> Self {
        tracing::debug!(service = service.name(), "workflow created");
        Self { store, service }
    }

    /// The shared state store
    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// The generation service
    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    // ------------------------------------------------------------------
    // Pipeline plumbing
    // ------------------------------------------------------------------

    fn ensure_idle(&self, transition: Transition) -> Result<(), WorkflowError> {
        if self.store.read(|s| s.loading.active) {
            tracing::warn!(op = transition.name(), "rejected: pipeline busy");
            return Err(WorkflowError::Busy);
        }
        Ok(())
    }

    fn reject(&self, transition: Transition, rejection: Rejection) -> WorkflowError {
        if !self
            .store
            .reject_if_idle(rejection.message, rejection.redirect)
        {
            tracing::warn!(op = transition.name(), "rejected: pipeline busy");
            return WorkflowError::Busy;
        }
        tracing::info!(
            op = transition.name(),
            reason = rejection.message,
            "precondition failed"
        );
        WorkflowError::Validation(rejection.message.to_string())
    }

    fn begin(&self, transition: Transition) -> Result<(), WorkflowError> {
        if self.store.try_begin_loading(transition.loading_message()) {
            tracing::debug!(op = transition.name(), "pipeline started");
            Ok(())
        } else {
            tracing::warn!(op = transition.name(), "rejected: pipeline busy");
            Err(WorkflowError::Busy)
        }
    }

    /// Store a remote failure and release loading
    fn fail(&self, transition: Transition, message: Option<String>) -> WorkflowError {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| transition.fallback_error().to_string());
        tracing::warn!(op = transition.name(), error = %message, "pipeline failed");
        self.store.set_error(message.clone());
        self.store.end_loading();
        WorkflowError::Remote(message)
    }

    // ------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------

    /// Research a topic and store the resulting bundle
    ///
    /// # Errors
    ///
    /// [`WorkflowError::Validation`] for a blank topic,
    /// [`WorkflowError::Remote`] when research fails,
    /// [`WorkflowError::Busy`] while another pipeline runs.
    pub async fn research(&self, topic: &str) -> Result<ResearchBundle, WorkflowError> {
        let transition = Transition::Research;
        self.ensure_idle(transition)?;
        if let Err(rejection) = guards::check_research(topic) {
            return Err(self.reject(transition, rejection));
        }
        self.begin(transition)?;
        self.store.set_topic(topic);

        tracing::info!(topic, "researching topic");
        let outcome = match self.service.research(topic).await {
            Ok(response) => response.into_result(),
            Err(e) => {
                tracing::debug!(error = %e, "research request failed");
                Err(server_message(&e))
            }
        };

        match outcome {
            Ok(bundle) => {
                tracing::info!(
                    topic = %bundle.topic,
                    bytes = bundle.research_data.len(),
                    "research complete"
                );
                self.store.commit_bundle(bundle.clone());
                self.store.end_loading();
                Ok(bundle)
            }
            Err(message) => Err(self.fail(transition, message)),
        }
    }

    /// Generate a spec from the chosen content source and open the editor
    ///
    /// # Errors
    ///
    /// [`WorkflowError::Validation`] when the credential, the content or the
    /// template is missing (the latter also navigates to the template
    /// gallery), [`WorkflowError::Remote`] when generation fails,
    /// [`WorkflowError::Busy`] while another pipeline runs.
    pub async fn generate_spec(&self, source: ContentSource) -> Result<Spec, WorkflowError> {
        let transition = Transition::GenerateSpec(source);
        self.ensure_idle(transition)?;
        let request = match self.store.read(|s| guards::check_spec(s, source)) {
            Ok(request) => request,
            Err(rejection) => return Err(self.reject(transition, rejection)),
        };
        self.begin(transition)?;

        tracing::info!(
            content_type = request.content.content_type(),
            template_id = %request.template_id,
            "generating spec"
        );
        let outcome = match self.service.generate_plan(&request).await {
            Ok(response) => response.into_result(),
            Err(e) => {
                tracing::debug!(error = %e, "plan request failed");
                Err(server_message(&e))
            }
        };

        match outcome {
            Ok(spec) => {
                tracing::info!(
                    title = %spec.title,
                    sections = spec.sections.len(),
                    "spec generated"
                );
                self.store.commit_spec(spec.clone());
                self.store.end_loading();
                Ok(spec)
            }
            Err(message) => Err(self.fail(transition, message)),
        }
    }

    /// Generate a spec from the research bundle
    ///
    /// # Errors
    ///
    /// See [`Workflow::generate_spec`].
    pub async fn generate_spec_from_research(&self) -> Result<Spec, WorkflowError> {
        self.generate_spec(ContentSource::Research).await
    }

    /// Generate a spec from the manual input
    ///
    /// # Errors
    ///
    /// See [`Workflow::generate_spec`].
    pub async fn generate_spec_from_manual(&self) -> Result<Spec, WorkflowError> {
        self.generate_spec(ContentSource::Manual).await
    }

    /// Render the spec to an image and register it on the first page
    ///
    /// # Errors
    ///
    /// [`WorkflowError::Validation`] without credential or spec,
    /// [`WorkflowError::Remote`] when generation fails (the image registry is
    /// left untouched), [`WorkflowError::Busy`] while another pipeline runs.
    pub async fn generate_image(
        &self,
        custom_prompt: Option<String>,
    ) -> Result<GeneratedImage, WorkflowError> {
        let transition = Transition::GenerateImage;
        self.ensure_idle(transition)?;
        let request = match self.store.read(|s| guards::check_image(s, custom_prompt)) {
            Ok(request) => request,
            Err(rejection) => return Err(self.reject(transition, rejection)),
        };
        self.begin(transition)?;

        tracing::info!(
            title = %request.spec.title,
            custom_prompt = request.custom_prompt.is_some(),
            "generating image"
        );
        let outcome = match self.service.generate_image(&request).await {
            Ok(response) => response.into_result(),
            Err(e) => {
                tracing::debug!(error = %e, "image request failed");
                Err(server_message(&e))
            }
        };

        match outcome {
            Ok((path, filename)) => {
                let preview_url = self.service.file_url(&filename);
                let image = self.store.register_image(path, filename, PageId::FIRST);
                self.store.end_loading();
                tracing::info!(id = %image.id, filename = %image.filename, "image generated");
                Ok(GeneratedImage { image, preview_url })
            }
            Err(message) => Err(self.fail(transition, message)),
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Choose topic research and open its form
    pub fn start_topic(&self) {
        self.store.set_input_mode(InputMode::Topic);
    }

    /// Choose manual creation and open its form
    pub fn start_manual(&self) {
        self.store.set_input_mode(InputMode::Manual);
    }

    /// Open the template gallery
    pub fn browse_templates(&self) {
        self.store.set_view(View::Templates);
    }

    /// Select a template and continue to the chosen input form
    ///
    /// Without a chosen input mode the user lands on the topic form.
    pub fn select_template(&self, template: Template) {
        tracing::info!(id = %template.id, "template selected");
        let mode = self.store.read(|s| s.input_mode).unwrap_or(InputMode::Topic);
        self.store.select_template(Some(template));
        self.store.set_input_mode(mode);
    }

    // ------------------------------------------------------------------
    // Supplementary operations
    // ------------------------------------------------------------------

    /// Persist a new credential
    pub fn save_credential(&self, value: impl Into<String>) {
        self.store.set_credential(value);
        tracing::info!("credential saved");
    }

    /// Ask the service whether a credential works; the store is untouched
    pub async fn test_credential(&self, candidate: &str) -> CredentialCheck {
        if candidate.trim().is_empty() {
            return CredentialCheck {
                valid: false,
                message: CREDENTIAL_EMPTY.to_string(),
            };
        }

        let rejected = match self.service.test_credential(candidate).await {
            Ok(ack) if ack.ok => None,
            Ok(ack) => Some(ack.error),
            Err(e) => {
                tracing::debug!(error = %e, "credential test failed");
                Some(server_message(&e))
            }
        };

        let check = match rejected {
            None => CredentialCheck {
                valid: true,
                message: CREDENTIAL_VALID.to_string(),
            },
            Some(message) => CredentialCheck {
                valid: false,
                message: message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| CREDENTIAL_INVALID.to_string()),
            },
        };
        tracing::info!(valid = check.valid, "credential tested");
        check
    }

    /// Health check mapped to a status
    pub async fn check_backend(&self) -> BackendStatus {
        match self.service.health_check().await {
            Ok(health) => {
                tracing::debug!(status = %health.status, "service online");
                BackendStatus::Online
            }
            Err(e) => {
                tracing::warn!(error = %e, "service offline");
                BackendStatus::Offline
            }
        }
    }

    /// Templates in a category; `None` or [`ALL_CATEGORIES`] lists everything
    ///
    /// # Errors
    ///
    /// Returns the service error; nothing is stored.
    pub async fn load_templates(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<Template>, ServiceError> {
        let filter = category.filter(|c| *c != ALL_CATEGORIES && !c.trim().is_empty());
        self.service
            .list_templates(filter)
            .await
            .inspect(|templates| tracing::debug!(count = templates.len(), "templates loaded"))
            .inspect_err(|e| tracing::error!(error = %e, "failed to load templates"))
    }

    /// Template categories, led by [`ALL_CATEGORIES`]
    ///
    /// # Errors
    ///
    /// Returns the service error; nothing is stored.
    pub async fn load_categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories = self
            .service
            .list_categories()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to load categories"))?;

        let mut all = Vec::with_capacity(categories.len() + 1);
        all.push(ALL_CATEGORIES.to_string());
        all.extend(categories.into_iter().filter(|c| c != ALL_CATEGORIES));
        Ok(all)
    }

    /// Download a generated file
    ///
    /// # Errors
    ///
    /// Returns the service error.
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>, ServiceError> {
        let bytes = self.service.fetch_file(filename).await?;
        tracing::info!(filename, bytes = bytes.len(), "file downloaded");
        Ok(bytes)
    }

    /// Convert a generated image to another format
    ///
    /// # Errors
    ///
    /// Returns the service error.
    pub async fn export(
        &self,
        format: ExportFormat,
        image_path: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        let bytes = self.service.export_file(format, image_path).await?;
        tracing::info!(%format, bytes = bytes.len(), "image exported");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_only_from_status() {
        let status = ServiceError::Status {
            status: 400,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(server_message(&status).as_deref(), Some("quota exceeded"));
        assert_eq!(
            server_message(&ServiceError::Transport("connection refused".to_string())),
            None
        );
        assert_eq!(server_message(&ServiceError::Decode("eof".to_string())), None);
    }

    #[test]
    fn test_workflow_error_display() {
        assert_eq!(
            WorkflowError::Validation("Please enter a topic".to_string()).to_string(),
            "Please enter a topic"
        );
        assert_eq!(
            WorkflowError::Busy.to_string(),
            "another operation is in progress"
        );
    }

    #[test]
    fn test_backend_status_display() {
        assert_eq!(BackendStatus::Online.to_string(), "online");
        assert_eq!(BackendStatus::Offline.to_string(), "offline");
    }
}
