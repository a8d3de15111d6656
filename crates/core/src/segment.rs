//! Segments (jobs), scopes, and job-local ↔ global frame translation.
//!
//! A collection's frames are numbered globally from zero. A job owns an
//! inclusive `[start, stop]` slice of them. Annotation sets read at job scope
//! carry frame numbers that may be either job-local or already global; the
//! upstream service does not say which, so the decision is delegated to a
//! [`FrameCoordinatePolicy`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{FrameNumber, RemoteId};

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// A contiguous range of a collection's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// A real job with an inclusive frame range.
    Job {
        id: RemoteId,
        start: FrameNumber,
        stop: FrameNumber,
    },
    /// The whole collection, used when no job structure exists upstream
    /// and for collection-scoped transfers.
    WholeCollection { size: FrameNumber },
}

impl Segment {
    /// Build a job segment, rejecting inverted or negative ranges.
    pub fn job(id: RemoteId, start: FrameNumber, stop: FrameNumber) -> Result<Self, CoreError> {
        if start < 0 {
            return Err(CoreError::Validation(format!(
                "job {id} has negative start frame {start}"
            )));
        }
        if start > stop {
            return Err(CoreError::Validation(format!(
                "job {id} has start frame {start} after stop frame {stop}"
            )));
        }
        Ok(Self::Job { id, start, stop })
    }

    /// Segment spanning `[0, size - 1]`.
    pub fn whole_collection(size: usize) -> Self {
        Self::WholeCollection {
            size: size as FrameNumber,
        }
    }

    /// Job id, or `None` for the whole collection.
    pub fn job_id(&self) -> Option<RemoteId> {
        match self {
            Self::Job { id, .. } => Some(*id),
            Self::WholeCollection { .. } => None,
        }
    }

    pub fn start(&self) -> FrameNumber {
        match self {
            Self::Job { start, .. } => *start,
            Self::WholeCollection { .. } => 0,
        }
    }

    /// Last frame (inclusive). `-1` for an empty collection.
    pub fn stop(&self) -> FrameNumber {
        match self {
            Self::Job { stop, .. } => *stop,
            Self::WholeCollection { size } => size - 1,
        }
    }

    /// Number of frames in the segment.
    pub fn len(&self) -> usize {
        (self.stop() - self.start() + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the global frame `frame` belongs to this segment.
    pub fn contains(&self, frame: FrameNumber) -> bool {
        (self.start()..=self.stop()).contains(&frame)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job { id, start, stop } => write!(f, "job {id} [{start}, {stop}]"),
            Self::WholeCollection { size } => write!(f, "whole collection ({size} frames)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Where annotations live on a remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Job { collection: RemoteId, job: RemoteId },
    Collection { collection: RemoteId },
}

impl Scope {
    /// Job scope when `job` is given, collection scope otherwise.
    pub fn new(collection: RemoteId, job: Option<RemoteId>) -> Self {
        match job {
            Some(job) => Self::Job { collection, job },
            None => Self::Collection { collection },
        }
    }

    pub fn collection_id(&self) -> RemoteId {
        match self {
            Self::Job { collection, .. } | Self::Collection { collection } => *collection,
        }
    }

    pub fn job_id(&self) -> Option<RemoteId> {
        match self {
            Self::Job { job, .. } => Some(*job),
            Self::Collection { .. } => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job { job, .. } => write!(f, "job {job}"),
            Self::Collection { collection } => write!(f, "task {collection}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinate translation
// ---------------------------------------------------------------------------

/// Convert a raw annotation frame number to a global one.
///
/// Whole-collection segments are global by construction. For job segments a
/// value already known to be global passes through; otherwise the segment
/// start is added.
pub fn to_global(
    raw: FrameNumber,
    segment: &Segment,
    source_is_already_global: bool,
) -> FrameNumber {
    match segment {
        Segment::WholeCollection { .. } => raw,
        Segment::Job { start, .. } => {
            if source_is_already_global {
                raw
            } else {
                raw + start
            }
        }
    }
}

/// Decides whether a frame number read at job scope is already global.
pub trait FrameCoordinatePolicy: Send + Sync {
    fn is_already_global(&self, raw: FrameNumber, segment: &Segment) -> bool;

    /// Translate `raw` to a global frame number under this policy.
    fn resolve(&self, raw: FrameNumber, segment: &Segment) -> FrameNumber {
        to_global(raw, segment, self.is_already_global(raw, segment))
    }
}

/// Values inside `[start, stop]` are taken as global, anything else as
/// job-local. Ambiguous when the two ranges overlap.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeHeuristic;

impl FrameCoordinatePolicy for RangeHeuristic {
    fn is_already_global(&self, raw: FrameNumber, segment: &Segment) -> bool {
        segment.contains(raw)
    }
}

/// Every job-scoped value is job-local.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysJobLocal;

impl FrameCoordinatePolicy for AlwaysJobLocal {
    fn is_already_global(&self, _raw: FrameNumber, _segment: &Segment) -> bool {
        false
    }
}

/// Every job-scoped value is already global.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGlobal;

impl FrameCoordinatePolicy for AlwaysGlobal {
    fn is_already_global(&self, _raw: FrameNumber, _segment: &Segment) -> bool {
        true
    }
}

/// Configurable selector over the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicyKind {
    #[default]
    Heuristic,
    JobLocal,
    Global,
}

const VALID_POLICY_STRINGS: &[&str] = &["heuristic", "job_local", "global"];

impl FramePolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::JobLocal => "job_local",
            Self::Global => "global",
        }
    }

    /// Parse a policy name.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "heuristic" => Ok(Self::Heuristic),
            "job_local" => Ok(Self::JobLocal),
            "global" => Ok(Self::Global),
            _ => Err(CoreError::Validation(format!(
                "Invalid frame policy '{s}'. Must be one of: {}",
                VALID_POLICY_STRINGS.join(", ")
            ))),
        }
    }
}

impl FrameCoordinatePolicy for FramePolicyKind {
    fn is_already_global(&self, raw: FrameNumber, segment: &Segment) -> bool {
        match self {
            Self::Heuristic => RangeHeuristic.is_already_global(raw, segment),
            Self::JobLocal => AlwaysJobLocal.is_already_global(raw, segment),
            Self::Global => AlwaysGlobal.is_already_global(raw, segment),
        }
    }
}
