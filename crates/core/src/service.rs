//! The annotation service collaborator.
//!
//! Everything the engine needs from a remote annotation instance. The engine
//! is written against `dyn AnnotationService`; the HTTP implementation lives
//! in its own crate, and tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::annotation::AnnotationSet;
use crate::error::ServiceError;
use crate::labels::Label;
use crate::segment::{Scope, Segment};
use crate::types::{Frame, RemoteId};

#[async_trait]
pub trait AnnotationService: Send + Sync {
    /// Human-readable identity of the instance, used in logs.
    fn describe(&self) -> String;

    /// Verify the instance is reachable and the credentials are accepted.
    async fn check_connection(&self) -> Result<(), ServiceError>;

    /// Frame range of a job.
    async fn segment_info(&self, job: RemoteId) -> Result<Segment, ServiceError>;

    /// Ordered frames of a collection, one per global index.
    async fn collection_frames(&self, collection: RemoteId) -> Result<Vec<Frame>, ServiceError>;

    /// Jobs of a collection. A collection without job structure yields a
    /// single [`Segment::WholeCollection`].
    async fn collection_segments(&self, collection: RemoteId) -> Result<Vec<Segment>, ServiceError>;

    /// Label vocabulary of a collection, already normalized to a flat list.
    async fn labels(&self, collection: RemoteId) -> Result<Vec<Label>, ServiceError>;

    /// Annotations of a job or collection.
    async fn annotations(&self, scope: Scope) -> Result<AnnotationSet, ServiceError>;

    /// Replace the annotations of a job or collection.
    ///
    /// Frame numbers in `payload` are collection-global for either scope kind.
    async fn write_annotations(
        &self,
        scope: Scope,
        payload: &AnnotationSet,
    ) -> Result<(), ServiceError>;
}
