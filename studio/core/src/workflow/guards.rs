//! Guarded Transitions
//!
//! The pipeline state machine as pure functions. Each check reads a
//! [`WorkflowState`] and either yields the request the transition needs or a
//! [`Rejection`] naming the message to show (and, for a missing template, the
//! screen to send the user to).
//!
//! ```text
//!            topic non-blank
//! Topic ─────────────────────> Research ──ok──> bundle set
//!
//!   credential? ─> content? ─> template? ──> GenerateSpec ──ok──> Editor
//!        │             │           │
//!        v             v           v
//!     reject        reject    reject + go to Templates
//!
//!   credential? ─> spec? ──> GenerateImage ──ok──> image registered
//! ```
//!
//! Checks run in the listed order; the first failing one wins.

use crate::client::{ImageRequest, PlanContent, PlanRequest};
use crate::model::View;
use crate::store::WorkflowState;

/// Missing topic
pub const TOPIC_REQUIRED: &str = "Please enter a topic";
/// Missing credential
pub const CREDENTIAL_REQUIRED: &str = "Please set your API key in Settings";
/// Topic flow without research
pub const RESEARCH_REQUIRED: &str = "Please research a topic first";
/// Manual flow without title or body
pub const MANUAL_CONTENT_REQUIRED: &str = "Please provide a title and content";
/// No template selected
pub const TEMPLATE_REQUIRED: &str = "Please select a template first";
/// Image generation without a spec
pub const SPEC_REQUIRED: &str = "No spec available";

/// Where spec content comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentSource {
    /// The research bundle
    Research,
    /// The manual input
    Manual,
}

/// The remote pipelines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Research a topic
    Research,
    /// Generate a spec
    GenerateSpec(ContentSource),
    /// Generate an image from the spec
    GenerateImage,
}

impl Transition {
    /// Name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::GenerateSpec(ContentSource::Research) => "generate_spec_research",
            Self::GenerateSpec(ContentSource::Manual) => "generate_spec_manual",
            Self::GenerateImage => "generate_image",
        }
    }

    /// Progress text while the call is in flight
    #[must_use]
    pub fn loading_message(&self) -> &'static str {
        match self {
            Self::Research => "Researching topic online...",
            Self::GenerateSpec(ContentSource::Research) => "Generating infographic spec...",
            Self::GenerateSpec(ContentSource::Manual) => "Generating infographic...",
            Self::GenerateImage => "Generating image (this may take 30-60 seconds)...",
        }
    }

    /// Message when the service fails without saying why
    #[must_use]
    pub fn fallback_error(&self) -> &'static str {
        match self {
            Self::Research => "Failed to research topic",
            Self::GenerateSpec(_) => "Failed to generate spec",
            Self::GenerateImage => "Failed to generate image",
        }
    }
}

/// A failed precondition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// Message for the user
    pub message: &'static str,
    /// Screen to navigate to together with the error
    pub redirect: Option<View>,
}

impl Rejection {
    const fn new(message: &'static str) -> Self {
        Self {
            message,
            redirect: None,
        }
    }
}

/// Research needs a non-blank topic
///
/// # Errors
///
/// Rejects a blank topic.
pub fn check_research(topic: &str) -> Result<(), Rejection> {
    if topic.trim().is_empty() {
        return Err(Rejection::new(TOPIC_REQUIRED));
    }
    Ok(())
}

/// Spec generation needs credential, content and template, in that order
///
/// # Errors
///
/// Rejects with the first missing precondition.
pub fn check_spec(state: &WorkflowState, source: ContentSource) -> Result<PlanRequest, Rejection> {
    if !state.has_credential() {
        return Err(Rejection::new(CREDENTIAL_REQUIRED));
    }

    let content = match source {
        ContentSource::Research => match &state.bundle {
            Some(bundle) => PlanContent::Research {
                bundle: bundle.clone(),
            },
            None => return Err(Rejection::new(RESEARCH_REQUIRED)),
        },
        ContentSource::Manual => {
            if !state.manual.has_content() {
                return Err(Rejection::new(MANUAL_CONTENT_REQUIRED));
            }
            PlanContent::Manual {
                title: state.manual.title.clone(),
                custom_text: state.manual.body.clone(),
                sections: state.manual.sections.clone(),
            }
        }
    };

    let Some(template) = &state.template else {
        return Err(Rejection {
            message: TEMPLATE_REQUIRED,
            redirect: Some(View::Templates),
        });
    };

    Ok(PlanRequest {
        api_key: state.credential.clone(),
        content,
        template_id: template.id.clone(),
    })
}

/// Image generation needs credential and spec
///
/// # Errors
///
/// Rejects with the first missing precondition.
pub fn check_image(
    state: &WorkflowState,
    custom_prompt: Option<String>,
) -> Result<ImageRequest, Rejection> {
    if !state.has_credential() {
        return Err(Rejection::new(CREDENTIAL_REQUIRED));
    }
    let Some(spec) = &state.spec else {
        return Err(Rejection::new(SPEC_REQUIRED));
    };

    Ok(ImageRequest {
        api_key: state.credential.clone(),
        spec: spec.clone(),
        custom_prompt: custom_prompt.filter(|p| !p.trim().is_empty()),
    })
}
