//! Transfer orchestrator.
//!
//! Sequences one transfer request through its stages:
//!
//! ```text
//! Resolving -> RemappingFrames -> RemappingLabels -> ReadyToWrite
//!           -> Writing -> Written -> Verifying -> Done
//! ```
//!
//! Any failure is terminal for the request. Nothing is retried and nothing
//! is kept once [`Transfer::run`] returns.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use annolink_core::annotation::AnnotationSet;
use annolink_core::frame_identity::{resolve, segment_frames};
use annolink_core::labels::reconcile;
use annolink_core::remap::{remap, RemapContext};
use annolink_core::report::TransferReport;
use annolink_core::segment::{FrameCoordinatePolicy, Scope, Segment};
use annolink_core::service::AnnotationService;
use annolink_core::types::Frame;

use crate::error::TransferError;

/// Default wait between the write and the verification read-back, giving
/// the target time to commit.
pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_secs(2);

/// Stages of a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStage {
    Resolving,
    RemappingFrames,
    RemappingLabels,
    ReadyToWrite,
    Writing,
    Written,
    Verifying,
    Done,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving frames",
            Self::RemappingFrames => "remapping frames",
            Self::RemappingLabels => "remapping labels",
            Self::ReadyToWrite => "preparing write",
            Self::Writing => "writing annotations",
            Self::Written => "written",
            Self::Verifying => "verifying annotations",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-request knobs.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub verify_delay: Duration,
    /// Stop at `ReadyToWrite` and return the payload without writing.
    pub dry_run: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            verify_delay: DEFAULT_VERIFY_DELAY,
            dry_run: false,
        }
    }
}

/// Successful transfer: the report and the payload that was (or, for a dry
/// run, would have been) written.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    /// `ReadyToWrite` for a dry run, `Done` otherwise.
    pub stage: TransferStage,
    pub report: TransferReport,
    pub payload: AnnotationSet,
}

/// Segment and frames behind a scope.
pub(crate) struct Side {
    pub(crate) segment: Segment,
    pub(crate) frames: Vec<Frame>,
}

impl Side {
    pub(crate) fn segment_frames(&self) -> &[Frame] {
        segment_frames(&self.frames, &self.segment)
    }
}

/// One transfer engine bound to a source and a target instance.
///
/// Holds only borrowed collaborators and configuration; every request builds
/// its own mapping and report.
pub struct Transfer<'a> {
    source: &'a dyn AnnotationService,
    target: &'a dyn AnnotationService,
    policy: &'a dyn FrameCoordinatePolicy,
    options: TransferOptions,
}

impl<'a> Transfer<'a> {
    pub fn new(
        source: &'a dyn AnnotationService,
        target: &'a dyn AnnotationService,
        policy: &'a dyn FrameCoordinatePolicy,
    ) -> Self {
        Self {
            source,
            target,
            policy,
            options: TransferOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Copy annotations from `source_scope` to `target_scope`.
    pub async fn run(
        &self,
        source_scope: Scope,
        target_scope: Scope,
    ) -> Result<TransferOutcome, TransferError> {
        let mut report = TransferReport::new(source_scope, target_scope, self.options.dry_run);
        tracing::info!(
            source_scope = %source_scope,
            source_instance = %self.source.describe(),
            target_scope = %target_scope,
            target_instance = %self.target.describe(),
            dry_run = self.options.dry_run,
            "Starting annotation transfer",
        );

        // -- Resolving -------------------------------------------------------
        let stage = TransferStage::Resolving;
        let source = load_side(self.source, source_scope)
            .await
            .map_err(|e| TransferError::service(stage, e))?;
        let target = load_side(self.target, target_scope)
            .await
            .map_err(|e| TransferError::service(stage, e))?;
        report.record_segments(
            source.segment,
            target.segment,
            source.segment_frames().len(),
            target.segment_frames().len(),
        );

        let resolution = match resolve(source.segment_frames(), target.segment_frames()) {
            Ok(resolution) => resolution,
            Err(failure) => {
                tracing::error!(
                    source_samples = ?failure.source_samples,
                    target_samples = ?failure.target_samples,
                    "No filenames matched between source and target",
                );
                return Err(failure.into());
            }
        };
        report.record_resolution(&resolution);
        tracing::info!(
            strategy = ?resolution.strategy,
            matched = resolution.matched_count,
            source_frames = report.source_frames,
            ambiguous = resolution.ambiguous.len(),
            "Resolved frame identities",
        );

        // -- RemappingFrames / RemappingLabels -----------------------------
        let annotations = self
            .source
            .annotations(source_scope)
            .await
            .map_err(|e| TransferError::service(TransferStage::RemappingFrames, e))?;

        let stage = TransferStage::RemappingLabels;
        let source_labels = self
            .source
            .labels(source_scope.collection_id())
            .await
            .map_err(|e| TransferError::service(stage, e))?;
        let target_labels = self
            .target
            .labels(target_scope.collection_id())
            .await
            .map_err(|e| TransferError::service(stage, e))?;
        let label_mapping = reconcile(&source_labels, &target_labels);

        let ctx = RemapContext {
            frame_mapping: &resolution.mapping,
            source_segment: &source.segment,
            target_segment: &target.segment,
            policy: self.policy,
        };
        let outcome = remap(&annotations, &ctx, &label_mapping);
        tracing::info!(
            kept_shapes = outcome.frames.kept_shapes,
            skipped_shapes = outcome.frames.skipped_shapes,
            kept_tracks = outcome.frames.kept_tracks,
            skipped_track_shapes = outcome.frames.skipped_track_shapes,
            dropped_tracks = outcome.frames.dropped_tracks,
            label_skips = outcome.labels.skipped(),
            ignored_tags = outcome.ignored_tags,
            "Remapped annotations",
        );
        report.record_remap(&annotations, &outcome, &label_mapping);
        if !report.unmapped_labels.is_empty() {
            tracing::warn!(
                dropped = report.skipped_unmapped_label,
                labels = ?report.unmapped_labels,
                "Dropped annotations whose labels do not exist in the target",
            );
        }

        let payload = outcome.payload;
        if payload.is_empty() {
            report.finish();
            return Err(TransferError::NoAnnotationsToTransfer {
                report: Box::new(report),
            });
        }

        // -- ReadyToWrite ----------------------------------------------------
        if self.options.dry_run {
            report.finish();
            tracing::info!(
                shapes = payload.shapes.len(),
                tracks = payload.tracks.len(),
                "Dry run: payload ready, nothing written",
            );
            return Ok(TransferOutcome {
                stage: TransferStage::ReadyToWrite,
                report,
                payload,
            });
        }

        // -- Writing / Written -----------------------------------------------
        self.target
            .write_annotations(target_scope, &payload)
            .await
            .map_err(|e| TransferError::service(TransferStage::Writing, e))?;
        report.record_write();
        tracing::info!(
            stage = %TransferStage::Written,
            target_scope = %target_scope,
            records = payload.record_count(),
            shapes = payload.shapes.len(),
            tracks = payload.tracks.len(),
            "Annotations written",
        );

        // -- Verifying -------------------------------------------------------
        let stage = TransferStage::Verifying;
        if !self.options.verify_delay.is_zero() {
            tokio::time::sleep(self.options.verify_delay).await;
        }
        let found = self
            .target
            .annotations(target_scope)
            .await
            .map_err(|e| TransferError::service(stage, e))?;
        report.record_verification(&found);
        report.finish();

        let mismatch = found.is_empty()
            || found.shapes.len() != payload.shapes.len()
            || found.tracks.len() != payload.tracks.len();
        if mismatch {
            tracing::error!(
                submitted_shapes = payload.shapes.len(),
                submitted_tracks = payload.tracks.len(),
                found_shapes = found.shapes.len(),
                found_tracks = found.tracks.len(),
                "Verification read-back does not match the submitted payload",
            );
            return Err(TransferError::VerificationMismatch {
                submitted_shapes: payload.shapes.len(),
                submitted_tracks: payload.tracks.len(),
                found_shapes: found.shapes.len(),
                found_tracks: found.tracks.len(),
                report: Box::new(report),
            });
        }

        tracing::info!(
            written = report.written_count(),
            matched_frames = report.matched_frames,
            "Transfer complete",
        );
        Ok(TransferOutcome {
            stage: TransferStage::Done,
            report,
            payload,
        })
    }
}

/// Load the segment and collection frames behind a scope.
pub(crate) async fn load_side(
    service: &dyn AnnotationService,
    scope: Scope,
) -> Result<Side, annolink_core::error::ServiceError> {
    let frames = service.collection_frames(scope.collection_id()).await?;
    let segment = match scope {
        Scope::Job { job, .. } => service.segment_info(job).await?,
        Scope::Collection { .. } => Segment::whole_collection(frames.len()),
    };
    tracing::debug!(scope = %scope, segment = %segment, frames = frames.len(), "Loaded scope");
    Ok(Side { segment, frames })
}
