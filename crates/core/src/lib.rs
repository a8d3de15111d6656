//! Cross-instance annotation transfer and deduplicated sampling: pure domain
//! logic.
//!
//! No network access happens here. Remote instances are reached through the
//! [`service::AnnotationService`] trait.

pub mod annotation;
pub mod error;
pub mod frame_identity;
pub mod labels;
pub mod normalize;
pub mod preview;
pub mod remap;
pub mod report;
pub mod sampling;
pub mod segment;
pub mod service;
pub mod types;
