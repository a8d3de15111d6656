//! Read-only previews: frame pairing between two scopes and annotated files
//! of one scope.

use annolink_core::error::ServiceError;
use annolink_core::frame_identity::{preview_matches, MatchPreview};
use annolink_core::preview::{annotation_preview, AnnotationPreview};
use annolink_core::segment::{FrameCoordinatePolicy, Scope};
use annolink_core::service::AnnotationService;

use crate::error::TransferError;
use crate::transfer::{load_side, TransferStage};

/// Which files of the two scopes would pair up. Reads frames only; the frame
/// coordinate policy plays no part in filename pairing.
pub async fn preview_frame_matches(
    source: &dyn AnnotationService,
    target: &dyn AnnotationService,
    source_scope: Scope,
    target_scope: Scope,
) -> Result<MatchPreview, TransferError> {
    let stage = TransferStage::Resolving;
    let source_side = load_side(source, source_scope)
        .await
        .map_err(|e| TransferError::service(stage, e))?;
    let target_side = load_side(target, target_scope)
        .await
        .map_err(|e| TransferError::service(stage, e))?;
    let preview = preview_matches(source_side.segment_frames(), target_side.segment_frames());
    tracing::info!(
        source_scope = %source_scope,
        target_scope = %target_scope,
        matched = preview.matched.len(),
        unmatched_source = preview.unmatched_source.len(),
        "Built match preview",
    );
    Ok(preview)
}

/// Which files of `scope` carry annotations, resolving frame numbers with
/// the policy a transfer would use.
pub async fn preview_annotations(
    service: &dyn AnnotationService,
    scope: Scope,
    policy: &dyn FrameCoordinatePolicy,
) -> Result<AnnotationPreview, ServiceError> {
    let side = load_side(service, scope).await?;
    let set = service.annotations(scope).await?;
    let preview = annotation_preview(&set, side.segment_frames(), &side.segment, policy);
    tracing::info!(
        scope = %scope,
        files = preview.annotated_files().count(),
        shapes = preview.total_shapes,
        tracks = preview.total_tracks,
        "Built annotation preview",
    );
    Ok(preview)
}
