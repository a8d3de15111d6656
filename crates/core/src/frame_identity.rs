//! Frame identity resolution between two collections.
//!
//! Builds the `source global frame -> target global frame` mapping a
//! transfer remaps annotations through. Frames are matched by normalized
//! filename, or by ordinal position when neither side carries real names.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::normalize::{is_placeholder, normalize};
use crate::segment::Segment;
use crate::types::{Frame, FrameNumber};

/// Maximum number of sample keys per side attached to a resolution failure.
pub const MAX_FAILURE_SAMPLES: usize = 10;

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Immutable partial function from source to target global frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameMapping(BTreeMap<FrameNumber, FrameNumber>);

impl FrameMapping {
    pub fn get(&self, source: FrameNumber) -> Option<FrameNumber> {
        self.0.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameNumber, FrameNumber)> + '_ {
        self.0.iter().map(|(s, t)| (*s, *t))
    }
}

impl FromIterator<(FrameNumber, FrameNumber)> for FrameMapping {
    fn from_iter<I: IntoIterator<Item = (FrameNumber, FrameNumber)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How the two frame lists were paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Filename,
    Position,
}

/// Several target frames share one normalized key; only the last one is
/// reachable through the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousMatch {
    pub key: String,
    pub target_frames: Vec<FrameNumber>,
    pub chosen: FrameNumber,
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub mapping: FrameMapping,
    pub strategy: MatchStrategy,
    pub matched_count: usize,
    pub ambiguous: Vec<AmbiguousMatch>,
}

/// Zero frames could be paired. Carries sample keys from both sides for
/// diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error(
    "No matching frames found between source and target \
     (source samples: {source_samples:?}, target samples: {target_samples:?})"
)]
pub struct ResolutionFailure {
    pub source_samples: Vec<String>,
    pub target_samples: Vec<String>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Slice a collection's ordered frames down to the frames of `segment`.
///
/// Frames missing from `all` (segment beyond the metadata) are simply absent.
pub fn segment_frames<'a>(all: &'a [Frame], segment: &Segment) -> &'a [Frame] {
    let len = all.len() as FrameNumber;
    let start = segment.start().clamp(0, len) as usize;
    let end = (segment.stop() + 1).clamp(0, len) as usize;
    if start >= end {
        return &[];
    }
    &all[start..end]
}

/// Pair source frames with target frames.
///
/// Both slices are the ordered frames of a segment, carrying global indices.
pub fn resolve(source: &[Frame], target: &[Frame]) -> Result<Resolution, ResolutionFailure> {
    let resolution = if uses_position_matching(source, target) {
        resolve_by_position(source, target)
    } else {
        resolve_by_filename(source, target)
    };

    if resolution.matched_count == 0 {
        return Err(ResolutionFailure {
            source_samples: sample_keys(source),
            target_samples: sample_keys(target),
        });
    }
    Ok(resolution)
}

/// Position matching applies when both representative names are placeholders.
fn uses_position_matching(source: &[Frame], target: &[Frame]) -> bool {
    match (source.first(), target.first()) {
        (Some(s), Some(t)) => {
            is_placeholder(&normalize(&s.path)) && is_placeholder(&normalize(&t.path))
        }
        _ => false,
    }
}

fn resolve_by_position(source: &[Frame], target: &[Frame]) -> Resolution {
    let mapping: FrameMapping = source
        .iter()
        .zip(target)
        .map(|(s, t)| (s.index, t.index))
        .collect();
    Resolution {
        matched_count: mapping.len(),
        mapping,
        strategy: MatchStrategy::Position,
        ambiguous: Vec::new(),
    }
}

fn resolve_by_filename(source: &[Frame], target: &[Frame]) -> Resolution {
    let (table, ambiguous) = target_table(target);

    let mapping: FrameMapping = source
        .iter()
        .filter_map(|s| table.get(&normalize(&s.path)).map(|t| (s.index, *t)))
        .collect();

    Resolution {
        matched_count: mapping.len(),
        mapping,
        strategy: MatchStrategy::Filename,
        ambiguous,
    }
}

/// Build `key -> target index` (last write wins) and collect every collision.
fn target_table(target: &[Frame]) -> (HashMap<String, FrameNumber>, Vec<AmbiguousMatch>) {
    let mut by_key: BTreeMap<String, Vec<FrameNumber>> = BTreeMap::new();
    for frame in target {
        by_key.entry(normalize(&frame.path)).or_default().push(frame.index);
    }

    let mut table = HashMap::with_capacity(by_key.len());
    let mut ambiguous = Vec::new();
    for (key, frames) in by_key {
        let Some(&chosen) = frames.last() else {
            continue;
        };
        if frames.len() > 1 {
            ambiguous.push(AmbiguousMatch {
                key: key.clone(),
                target_frames: frames,
                chosen,
            });
        }
        table.insert(key, chosen);
    }
    (table, ambiguous)
}

fn sample_keys(frames: &[Frame]) -> Vec<String> {
    frames
        .iter()
        .take(MAX_FAILURE_SAMPLES)
        .map(|f| normalize(&f.path))
        .collect()
}

// ---------------------------------------------------------------------------
// Match preview
// ---------------------------------------------------------------------------

/// One paired file in a [`MatchPreview`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedFile {
    pub source: String,
    pub target: String,
    pub key: String,
}

/// Which files of two segments would pair up, computed without writing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchPreview {
    pub strategy: MatchStrategy,
    pub matched: Vec<MatchedFile>,
    pub unmatched_source: Vec<String>,
    pub unmatched_target: Vec<String>,
    pub ambiguous: Vec<AmbiguousMatch>,
    pub total_source: usize,
    pub total_target: usize,
}

/// Compute a [`MatchPreview`] using the same strategy selection as [`resolve`].
///
/// Never fails: an empty `matched` list is the preview's way of reporting
/// what [`resolve`] would reject.
pub fn preview_matches(source: &[Frame], target: &[Frame]) -> MatchPreview {
    let resolution = if uses_position_matching(source, target) {
        resolve_by_position(source, target)
    } else {
        resolve_by_filename(source, target)
    };

    let target_paths: HashMap<FrameNumber, &str> =
        target.iter().map(|f| (f.index, f.path.as_str())).collect();

    let mut matched = Vec::new();
    let mut unmatched_source = Vec::new();
    let mut used_targets = std::collections::HashSet::new();

    for frame in source {
        match resolution.mapping.get(frame.index) {
            Some(t) => {
                used_targets.insert(t);
                matched.push(MatchedFile {
                    source: frame.path.clone(),
                    target: target_paths.get(&t).copied().unwrap_or_default().to_string(),
                    key: normalize(&frame.path),
                });
            }
            None => unmatched_source.push(frame.path.clone()),
        }
    }

    let unmatched_target = target
        .iter()
        .filter(|f| !used_targets.contains(&f.index))
        .map(|f| f.path.clone())
        .collect();

    MatchPreview {
        strategy: resolution.strategy,
        matched,
        unmatched_source,
        unmatched_target,
        ambiguous: resolution.ambiguous,
        total_source: source.len(),
        total_target: target.len(),
    }
}
