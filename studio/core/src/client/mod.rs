//! Generation Service Client
//!
//! Stateless request/response access to the remote generation service
//! through a common trait interface.
//!
//! # Available Implementations
//!
//! - **HTTP**: the studio REST API (default)
//!
//! # Usage
//!
//! ```ignore
//! use studio_core::client::{GenerationService, HttpService};
//!
//! let service = HttpService::from_config(&config)?;
//! let response = service.research("History of AI").await?;
//! ```

mod http;
mod traits;

pub use http::HttpService;
pub use traits::{
    AckResponse, ExportFormat, GenerationService, HealthStatus, ImageRequest, ImageResponse,
    PlanContent, PlanRequest, PlanResponse, ResearchResponse, ServiceError,
};
