//! Deduplicated random frame sampling.
//!
//! Draws a fixed number of frames from a candidate list while refusing any
//! frame whose normalized filename already exists in another collection.
//! The random source is injected so selections can be reproduced in tests.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::normalize::normalize;
use crate::types::Frame;

/// Result of one sampling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleOutcome {
    /// Accepted frames, in random order.
    pub selected: Vec<Frame>,
    /// Normalized names of candidates rejected as already present.
    pub duplicates_skipped: Vec<String>,
    /// Candidates looked at before stopping.
    pub examined: usize,
}

/// Build an exclusion set from raw paths of an existing collection.
pub fn exclusion_set<'a, I>(paths: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    paths.into_iter().map(normalize).collect()
}

/// Select up to `count` frames at random, skipping excluded names.
///
/// With an empty exclusion set this is a plain uniform sample without
/// replacement of `min(count, candidates.len())` frames. Otherwise the
/// candidates are shuffled and scanned until `count` are accepted or the
/// list is exhausted.
pub fn sample_unique<R>(
    candidates: &[Frame],
    count: usize,
    excluded: &HashSet<String>,
    rng: &mut R,
) -> SampleOutcome
where
    R: Rng + ?Sized,
{
    let mut shuffled = candidates.to_vec();
    shuffled.shuffle(rng);

    if excluded.is_empty() {
        shuffled.truncate(count);
        return SampleOutcome {
            selected: shuffled,
            duplicates_skipped: Vec::new(),
            examined: candidates.len(),
        };
    }

    let mut outcome = SampleOutcome::default();
    for frame in shuffled {
        if outcome.selected.len() >= count {
            break;
        }
        outcome.examined += 1;

        let key = normalize(&frame.path);
        if excluded.contains(&key) {
            outcome.duplicates_skipped.push(key);
            continue;
        }
        outcome.selected.push(frame);
    }
    outcome
}
