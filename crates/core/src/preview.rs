//! Per-file annotation summaries of one scope.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::annotation::AnnotationSet;
use crate::normalize::placeholder_name;
use crate::remap::source_frame;
use crate::segment::{FrameCoordinatePolicy, Segment};
use crate::types::{Frame, FrameNumber};

/// Annotation counts on one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileAnnotations {
    pub frame: FrameNumber,
    pub shapes: usize,
    pub track_shapes: usize,
    /// Set when the frame lies outside the segment's metadata.
    pub outside_segment: bool,
}

/// Summary of a scope: every file of the segment with its annotation counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationPreview {
    /// Keyed by file path, sorted.
    pub files: BTreeMap<String, FileAnnotations>,
    pub total_frames: usize,
    pub total_shapes: usize,
    pub total_tracks: usize,
}

impl AnnotationPreview {
    /// Files carrying at least one annotation.
    pub fn annotated_files(&self) -> impl Iterator<Item = (&String, &FileAnnotations)> {
        self.files
            .iter()
            .filter(|(_, f)| f.shapes + f.track_shapes > 0)
    }
}

/// Group a scope's annotations by the file they sit on.
///
/// `frames` are the segment's frames (global indices); frame numbers are
/// resolved with the same policy a transfer would use.
pub fn annotation_preview(
    set: &AnnotationSet,
    frames: &[Frame],
    segment: &Segment,
    policy: &dyn FrameCoordinatePolicy,
) -> AnnotationPreview {
    let by_index: HashMap<FrameNumber, &str> =
        frames.iter().map(|f| (f.index, f.path.as_str())).collect();

    let mut files: BTreeMap<String, FileAnnotations> = frames
        .iter()
        .map(|f| {
            (
                f.path.clone(),
                FileAnnotations {
                    frame: f.index,
                    ..Default::default()
                },
            )
        })
        .collect();

    for shape in &set.shapes {
        let frame = source_frame(shape, segment, policy);
        entry_for(&mut files, &by_index, frame).shapes += 1;
    }
    for track in &set.tracks {
        for shape in &track.shapes {
            let frame = source_frame(shape, segment, policy);
            entry_for(&mut files, &by_index, frame).track_shapes += 1;
        }
    }

    AnnotationPreview {
        files,
        total_frames: frames.len(),
        total_shapes: set.shapes.len(),
        total_tracks: set.tracks.len(),
    }
}

fn entry_for<'a>(
    files: &'a mut BTreeMap<String, FileAnnotations>,
    by_index: &HashMap<FrameNumber, &str>,
    frame: FrameNumber,
) -> &'a mut FileAnnotations {
    let name = by_index
        .get(&frame)
        .map(|p| p.to_string())
        .unwrap_or_else(|| placeholder_name(frame));
    files.entry(name).or_insert_with(|| FileAnnotations {
        frame,
        outside_segment: true,
        ..Default::default()
    })
}
