//! CVAT REST client.
//!
//! [`CvatApi`](api::CvatApi) wraps the HTTP endpoints; [`CvatService`](service::CvatService)
//! adapts them to [`annolink_core::service::AnnotationService`]. Label payloads
//! and job listings come back in several shapes depending on the server
//! version; [`labels`] and [`jobs`] reduce them to one form at this boundary.

pub mod api;
pub mod jobs;
pub mod labels;
pub mod models;
pub mod service;

pub use api::{CvatApi, CvatApiError, CvatConnection, Timeouts};
pub use service::CvatService;
