//! Studio Core - Headless Infographic Workflow for vibegraphics
//!
//! This crate holds the whole studio workflow independent of any front end:
//! state, guarded pipelines, routing and the client for the remote generation
//! service. A CLI, desktop app or test harness drives it the same way.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surfaces                              │
//! │   ┌─────────┐   ┌─────────────┐   ┌────────────────────────┐  │
//! │   │   CLI   │   │  Desktop /  │   │   Tests / Headless     │  │
//! │   │ (clap)  │   │    Web      │   │                        │  │
//! │   └────┬────┘   └──────┬──────┘   └───────────┬────────────┘  │
//! │        └───────────────┴──────────────────────┘               │
//! │              Workflow calls (down)   subscribe() (up)         │
//! └────────────────────────────┼──────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼──────────────────────────────────┐
//! │                       STUDIO CORE                             │
//! │  ┌─────────────────────────┴──────────────────────────────┐   │
//! │  │                       Workflow                          │   │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌─────────┐  │   │
//! │  │  │  Guards  │  │  State   │  │  Router  │  │ Service │  │   │
//! │  │  │          │  │  Store   │  │          │  │ (HTTP)  │  │   │
//! │  │  └──────────┘  └──────────┘  └──────────┘  └─────────┘  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Workflow`]: runs the research, spec and image pipelines
//! - [`StateStore`]: shared handle over the [`WorkflowState`]
//! - [`GenerationService`]: remote service seam ([`HttpService`] by default)
//! - [`CredentialStore`]: persisted API credential
//! - [`StudioConfig`]: layered configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use studio_core::{
//!     ConfigOverrides, CredentialStore, HttpService, StateStore, StudioConfig, Workflow,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StudioConfig::load(ConfigOverrides::default())?;
//!     let credentials = CredentialStore::open(config.credentials_path())?;
//!     let store = StateStore::new(credentials);
//!     let workflow = Workflow::new(store, HttpService::from_config(&config)?);
//!
//!     workflow.start_topic();
//!     workflow.research("History of AI").await?;
//!     workflow.generate_spec_from_research().await?;
//!     let generated = workflow.generate_image(None).await?;
//!     println!("{}", generated.preview_url);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`client`]: generation service trait and HTTP implementation
//! - [`config`]: configuration layering (defaults, file, environment)
//! - [`credentials`]: credential persistence
//! - [`model`]: domain types (views, templates, bundles, specs)
//! - [`registry`]: pages and generated images
//! - [`router`]: view to screen mapping
//! - [`store`]: the state store and its change feed
//! - [`workflow`]: guarded pipelines
//!
//! # No UI Dependencies
//!
//! Nothing here renders or parses command lines. Surfaces read state through
//! the store and call into [`Workflow`].

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod model;
pub mod registry;
pub mod router;
pub mod store;
pub mod workflow;

// Re-exports for convenience
pub use client::{ExportFormat, GenerationService, HttpService, ServiceError};
pub use config::{ConfigError, ConfigOverrides, StudioConfig};
pub use credentials::{CredentialError, CredentialStore};
pub use model::{
    InputMode, ManualInput, ManualSection, Palette, ResearchBundle, SectionId, SectionUpdate,
    Spec, SpecSection, Template, View,
};
pub use registry::{Image, ImageId, ImageRegistry, Page, PageId, PageRegistry, PageUpdate};
pub use router::{route, route_name, route_state, Screen};
pub use store::{LoadingState, StateStore, WorkflowState};
pub use workflow::{
    BackendStatus, ContentSource, CredentialCheck, GeneratedImage, Workflow, WorkflowError,
};
