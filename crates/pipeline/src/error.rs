use annolink_core::error::ServiceError;
use annolink_core::frame_identity::ResolutionFailure;
use annolink_core::report::TransferReport;
use annolink_core::types::RemoteId;

use crate::transfer::TransferStage;

/// Terminal failures of a transfer request.
///
/// Variants raised after the write carry the report so the caller can see
/// what was submitted even though the target state is suspect.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// No source frame could be paired with a target frame. Nothing was written.
    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),

    /// Remapping left neither shapes nor tracks. Nothing was written.
    #[error(
        "No annotations were remapped. Check that the source has annotations \
         and that filenames and labels match between source and target"
    )]
    NoAnnotationsToTransfer { report: Box<TransferReport> },

    /// The read-back after the write disagrees with what was submitted.
    #[error(
        "Verification failed: submitted {submitted_shapes} shapes and {submitted_tracks} tracks, \
         found {found_shapes} shapes and {found_tracks} tracks"
    )]
    VerificationMismatch {
        submitted_shapes: usize,
        submitted_tracks: usize,
        found_shapes: usize,
        found_tracks: usize,
        report: Box<TransferReport>,
    },

    /// A call to one of the annotation services failed.
    #[error("{stage} failed: {source}")]
    Service {
        stage: TransferStage,
        #[source]
        source: ServiceError,
    },
}

impl TransferError {
    pub fn service(stage: TransferStage, source: ServiceError) -> Self {
        Self::Service { stage, source }
    }

    /// Report attached to the failure, when one exists.
    pub fn report(&self) -> Option<&TransferReport> {
        match self {
            Self::NoAnnotationsToTransfer { report }
            | Self::VerificationMismatch { report, .. } => Some(report),
            Self::Resolution(_) | Self::Service { .. } => None,
        }
    }

    /// Whether anything was written to the target before the failure.
    pub fn wrote_to_target(&self) -> bool {
        match self {
            Self::VerificationMismatch { .. } => true,
            Self::Service { stage, .. } => *stage == TransferStage::Verifying,
            Self::Resolution(_) | Self::NoAnnotationsToTransfer { .. } => false,
        }
    }

    /// Whether re-invoking the whole transfer may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Service { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Failures of per-job sampling.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("No jobs found in task {collection}")]
    NoJobs { collection: RemoteId },

    #[error("Failed to load {what}: {source}")]
    Service {
        what: &'static str,
        #[source]
        source: ServiceError,
    },
}
