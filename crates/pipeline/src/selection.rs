//! Per-job random sampling against an annotation service.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use annolink_core::frame_identity::segment_frames;
use annolink_core::sampling::{exclusion_set, sample_unique};
use annolink_core::segment::Segment;
use annolink_core::service::AnnotationService;
use annolink_core::types::{Frame, RemoteId};

use crate::error::SelectionError;

/// What to sample: `count` frames from one job, or from every job of the
/// collection when `job` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRequest {
    pub collection: RemoteId,
    pub job: Option<RemoteId>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedFrame {
    /// `None` when the collection has no job structure.
    pub job_id: Option<RemoteId>,
    pub frame: Frame,
}

/// Outcome of sampling one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub job_id: Option<RemoteId>,
    pub segment: Segment,
    pub total: usize,
    pub requested: usize,
    pub selected: usize,
    pub duplicates_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCheckSummary {
    /// Distinct normalized names in the check collection.
    pub excluded_names: usize,
    pub duplicates_skipped: usize,
    /// Normalized names of skipped candidates, in scan order.
    pub skipped_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionReport {
    pub collection: RemoteId,
    pub frames: Vec<SelectedFrame>,
    pub jobs: Vec<JobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_check: Option<DuplicateCheckSummary>,
}

impl SelectionReport {
    pub fn selected_count(&self) -> usize {
        self.frames.len()
    }

    pub fn requested_count(&self) -> usize {
        self.jobs.iter().map(|j| j.requested).sum()
    }
}

/// Normalized names of every frame in `collection`, for use as an exclusion
/// set when sampling elsewhere.
pub async fn load_exclusion_set(
    service: &dyn AnnotationService,
    collection: RemoteId,
) -> Result<HashSet<String>, SelectionError> {
    let frames = service
        .collection_frames(collection)
        .await
        .map_err(|source| SelectionError::Service {
            what: "check collection frames",
            source,
        })?;
    let excluded = exclusion_set(frames.iter().map(|f| f.path.as_str()));
    tracing::info!(
        collection,
        frames = frames.len(),
        names = excluded.len(),
        "Loaded exclusion set",
    );
    Ok(excluded)
}

/// Sample up to `request.count` frames from each job, each with its own
/// budget.
///
/// A job whose range has no frames in the collection metadata gets a note in
/// its summary and does not stop the other jobs.
pub async fn select_per_job<R>(
    service: &dyn AnnotationService,
    request: SelectionRequest,
    excluded: Option<&HashSet<String>>,
    rng: &mut R,
) -> Result<SelectionReport, SelectionError>
where
    R: Rng + ?Sized,
{
    let segments = match request.job {
        Some(job) => vec![service
            .segment_info(job)
            .await
            .map_err(|source| SelectionError::Service {
                what: "job info",
                source,
            })?],
        None => service
            .collection_segments(request.collection)
            .await
            .map_err(|source| SelectionError::Service {
                what: "jobs",
                source,
            })?,
    };
    if segments.is_empty() {
        return Err(SelectionError::NoJobs {
            collection: request.collection,
        });
    }

    let frames = service
        .collection_frames(request.collection)
        .await
        .map_err(|source| SelectionError::Service {
            what: "collection frames",
            source,
        })?;

    let no_exclusions = HashSet::new();
    let excluded_set = excluded.unwrap_or(&no_exclusions);

    let mut report = SelectionReport {
        collection: request.collection,
        frames: Vec::new(),
        jobs: Vec::with_capacity(segments.len()),
        duplicate_check: None,
    };
    let mut skipped_names = Vec::new();

    for segment in segments {
        let candidates = segment_frames(&frames, &segment);
        let job_id = segment.job_id();

        if candidates.is_empty() {
            tracing::warn!(?job_id, segment = %segment, "No frames found for job range");
            report.jobs.push(JobSummary {
                job_id,
                segment,
                total: 0,
                requested: request.count,
                selected: 0,
                duplicates_skipped: 0,
                note: Some(format!(
                    "No frames in collection metadata for range {}..={}",
                    segment.start(),
                    segment.stop()
                )),
            });
            continue;
        }

        let outcome = sample_unique(candidates, request.count, excluded_set, rng);
        let note = (outcome.selected.len() < request.count).then(|| {
            format!(
                "Only {} of {} requested frames available",
                outcome.selected.len(),
                request.count
            )
        });
        tracing::info!(
            ?job_id,
            total = candidates.len(),
            selected = outcome.selected.len(),
            duplicates_skipped = outcome.duplicates_skipped.len(),
            "Sampled job",
        );

        report.jobs.push(JobSummary {
            job_id,
            segment,
            total: candidates.len(),
            requested: request.count,
            selected: outcome.selected.len(),
            duplicates_skipped: outcome.duplicates_skipped.len(),
            note,
        });
        report.frames.extend(
            outcome
                .selected
                .into_iter()
                .map(|frame| SelectedFrame { job_id, frame }),
        );
        skipped_names.extend(outcome.duplicates_skipped);
    }

    if let Some(excluded) = excluded {
        report.duplicate_check = Some(DuplicateCheckSummary {
            excluded_names: excluded.len(),
            duplicates_skipped: skipped_names.len(),
            skipped_names,
        });
    }
    Ok(report)
}
