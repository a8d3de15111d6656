//! Annotation remapping onto a target collection.
//!
//! Two passes over an [`AnnotationSet`]: the frame pass moves every shape to
//! its target-global frame and drops what cannot be placed; the label pass
//! rewrites label ids and drops records whose label has no target
//! equivalent. Inputs are never mutated.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::annotation::{AnnotationSet, Shape};
use crate::frame_identity::FrameMapping;
use crate::labels::LabelMapping;
use crate::segment::{FrameCoordinatePolicy, Segment};
use crate::types::{FrameNumber, RemoteId};

/// Everything the frame pass needs to place a record.
pub struct RemapContext<'a> {
    pub frame_mapping: &'a FrameMapping,
    pub source_segment: &'a Segment,
    pub target_segment: &'a Segment,
    pub policy: &'a dyn FrameCoordinatePolicy,
}

/// Why a shape could not be placed on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source frame has no counterpart in the frame mapping.
    UnmappedFrame(FrameNumber),
    /// The mapped target frame lies outside the target segment.
    OutsideTarget(FrameNumber),
}

/// Counters of the frame pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameRemapStats {
    pub input_shapes: usize,
    pub kept_shapes: usize,
    pub skipped_shapes: usize,
    pub input_tracks: usize,
    pub kept_tracks: usize,
    pub skipped_track_shapes: usize,
    pub dropped_tracks: usize,
    /// Skips (shape or track shape) because the source frame was unmapped.
    pub unmapped_frames: usize,
    /// Skips (shape or track shape) because the target frame fell outside
    /// the target segment.
    pub outside_target: usize,
}

impl FrameRemapStats {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::UnmappedFrame(_) => self.unmapped_frames += 1,
            SkipReason::OutsideTarget(_) => self.outside_target += 1,
        }
    }
}

/// Counters of the label pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelRemapStats {
    pub skipped_shapes: usize,
    pub skipped_tracks: usize,
    /// Source label ids that had no target equivalent. Records without any
    /// `label_id` are counted but contribute no id.
    pub unmapped_label_ids: BTreeSet<RemoteId>,
}

impl LabelRemapStats {
    pub fn skipped(&self) -> usize {
        self.skipped_shapes + self.skipped_tracks
    }
}

/// Result of both passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemapOutcome {
    pub payload: AnnotationSet,
    pub frames: FrameRemapStats,
    pub labels: LabelRemapStats,
    /// Tags present in the source that are not transferred.
    pub ignored_tags: usize,
}

/// Global source frame of a shape. A missing `frame` is global frame 0.
pub fn source_frame(
    shape: &Shape,
    segment: &Segment,
    policy: &dyn FrameCoordinatePolicy,
) -> FrameNumber {
    match shape.frame() {
        Some(raw) => policy.resolve(raw, segment),
        None => 0,
    }
}

/// Place one shape on the target, or say why it cannot be placed.
pub fn remap_shape(shape: &Shape, ctx: &RemapContext<'_>) -> Result<Shape, SkipReason> {
    let source = source_frame(shape, ctx.source_segment, ctx.policy);
    let target = ctx
        .frame_mapping
        .get(source)
        .ok_or(SkipReason::UnmappedFrame(source))?;
    if !ctx.target_segment.contains(target) {
        return Err(SkipReason::OutsideTarget(target));
    }

    let mut placed = shape.clone();
    placed.strip_server_fields();
    placed.set_frame(target);
    Ok(placed)
}

/// Frame pass: returns a fresh set with every placeable record moved to
/// target-global frames.
pub fn remap_frames(
    set: &AnnotationSet,
    ctx: &RemapContext<'_>,
) -> (AnnotationSet, FrameRemapStats) {
    let mut stats = FrameRemapStats {
        input_shapes: set.shapes.len(),
        input_tracks: set.tracks.len(),
        ..Default::default()
    };
    let mut out = AnnotationSet {
        version: set.version,
        ..Default::default()
    };

    for shape in &set.shapes {
        match remap_shape(shape, ctx) {
            Ok(placed) => out.shapes.push(placed),
            Err(reason) => {
                stats.skipped_shapes += 1;
                stats.record_skip(reason);
            }
        }
    }

    for track in &set.tracks {
        let mut placed_track = track.empty_copy();
        for shape in &track.shapes {
            match remap_shape(shape, ctx) {
                Ok(placed) => placed_track.shapes.push(placed),
                Err(reason) => {
                    stats.skipped_track_shapes += 1;
                    stats.record_skip(reason);
                }
            }
        }
        if placed_track.shapes.is_empty() {
            stats.dropped_tracks += 1;
        } else {
            out.tracks.push(placed_track);
        }
    }

    stats.kept_shapes = out.shapes.len();
    stats.kept_tracks = out.tracks.len();
    (out, stats)
}

/// Label pass over an already frame-remapped set.
pub fn remap_labels(
    mut set: AnnotationSet,
    labels: &LabelMapping,
) -> (AnnotationSet, LabelRemapStats) {
    let mut stats = LabelRemapStats::default();

    let shapes = std::mem::take(&mut set.shapes);
    for mut shape in shapes {
        match shape.label_id().and_then(|id| labels.get(id)) {
            Some(target) => {
                shape.set_label_id(target);
                set.shapes.push(shape);
            }
            None => {
                stats.skipped_shapes += 1;
                stats.unmapped_label_ids.extend(shape.label_id());
            }
        }
    }

    let tracks = std::mem::take(&mut set.tracks);
    for mut track in tracks {
        match track.label_id().and_then(|id| labels.get(id)) {
            Some(target) => {
                track.set_label_id(target);
                set.tracks.push(track);
            }
            None => {
                stats.skipped_tracks += 1;
                stats.unmapped_label_ids.extend(track.label_id());
            }
        }
    }

    (set, stats)
}

/// Run both passes.
pub fn remap(set: &AnnotationSet, ctx: &RemapContext<'_>, labels: &LabelMapping) -> RemapOutcome {
    let (placed, frames) = remap_frames(set, ctx);
    let (payload, label_stats) = remap_labels(placed, labels);
    RemapOutcome {
        payload,
        frames,
        labels: label_stats,
        ignored_tags: set.tags.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{reconcile, Label};
    use crate::segment::{AlwaysJobLocal, RangeHeuristic};
    use serde_json::{json, Value};

    fn set(value: Value) -> AnnotationSet {
        serde_json::from_value(value).unwrap()
    }

    fn mapping(pairs: &[(FrameNumber, FrameNumber)]) -> FrameMapping {
        pairs.iter().copied().collect()
    }

    fn identity_labels(ids: &[RemoteId]) -> LabelMapping {
        let labels: Vec<Label> = ids.iter().map(|id| Label::new(*id, format!("l{id}"))).collect();
        reconcile(&labels, &labels)
    }

    fn frames_of(set: &AnnotationSet) -> Vec<FrameNumber> {
        set.shapes.iter().filter_map(Shape::frame).collect()
    }

    #[test]
    fn shapes_move_to_target_frames_and_lose_identity() {
        let input = set(json!({
            "version": 2,
            "shapes": [
                {"id": 11, "source": "manual", "frame": 0, "label_id": 1, "points": [1, 2, 3, 4]},
                {"id": 12, "frame": 1, "label_id": 1, "points": [5, 6, 7, 8]}
            ]
        }));
        let m = mapping(&[(1, 10), (2, 11)]);
        let source = Segment::job(1, 1, 2).unwrap();
        let target = Segment::job(2, 10, 11).unwrap();
        let ctx = RemapContext {
            frame_mapping: &m,
            source_segment: &source,
            target_segment: &target,
            policy: &AlwaysJobLocal,
        };

        let (out, stats) = remap_frames(&input, &ctx);
        assert_eq!(frames_of(&out), vec![10, 11]);
        assert_eq!(out.version, 2);
        assert!(out.shapes.iter().all(|s| s.0.get("id").is_none() && s.0.get("source").is_none()));
        assert_eq!(out.shapes[1].0["points"], json!([5, 6, 7, 8]));
        assert_eq!(stats.kept_shapes, 2);
        assert_eq!(stats.skipped_shapes, 0);

        // Input untouched.
        assert_eq!(input.shapes[0].0["id"], 11);
        assert_eq!(input.shapes[0].frame(), Some(0));
    }

    #[test]
    fn unmapped_and_out_of_range_frames_are_counted() {
        let input = set(json!({
            "shapes": [
                {"frame": 0, "label_id": 1},
                {"frame": 1, "label_id": 1},
                {"frame": 2, "label_id": 1}
            ]
        }));
        let m = mapping(&[(0, 5), (1, 50)]);
        let source = Segment::whole_collection(3);
        let target = Segment::job(9, 0, 9).unwrap();
        let ctx = RemapContext {
            frame_mapping: &m,
            source_segment: &source,
            target_segment: &target,
            policy: &RangeHeuristic,
        };

        let (out, stats) = remap_frames(&input, &ctx);
        assert_eq!(frames_of(&out), vec![5]);
        assert_eq!(stats.skipped_shapes, 2);
        assert_eq!(stats.unmapped_frames, 1);
        assert_eq!(stats.outside_target, 1);
        assert_eq!(stats.kept_shapes + stats.skipped_shapes, stats.input_shapes);
        for frame in frames_of(&out) {
            assert!(target.contains(frame));
        }
    }

    #[test]
    fn missing_frame_defaults_to_global_zero() {
        let input = set(json!({"shapes": [{"label_id": 1}]}));
        let m = mapping(&[(0, 7)]);
        let source = Segment::job(1, 3, 5).unwrap();
        let target = Segment::whole_collection(10);
        let ctx = RemapContext {
            frame_mapping: &m,
            source_segment: &source,
            target_segment: &target,
            policy: &AlwaysJobLocal,
        };
        let (out, _) = remap_frames(&input, &ctx);
        assert_eq!(frames_of(&out), vec![7]);
    }

    #[test]
    fn tracks_remap_per_shape_and_drop_when_emptied() {
        let input = set(json!({
            "tracks": [
                {"id": 1, "label_id": 1, "shapes": [{"frame": 0}, {"frame": 1}, {"frame": 2}]},
                {"id": 2, "label_id": 1, "shapes": [{"frame": 2}]}
            ]
        }));
        let m = mapping(&[(0, 20), (1, 21)]);
        let source = Segment::whole_collection(3);
        let target = Segment::whole_collection(30);
        let ctx = RemapContext {
            frame_mapping: &m,
            source_segment: &source,
            target_segment: &target,
            policy: &RangeHeuristic,
        };

        let (out, stats) = remap_frames(&input, &ctx);
        assert_eq!(out.tracks.len(), 1);
        let frames: Vec<_> = out.tracks[0].shapes.iter().filter_map(Shape::frame).collect();
        assert_eq!(frames, vec![20, 21]);
        assert!(out.tracks[0].fields.get("id").is_none());
        assert_eq!(stats.skipped_track_shapes, 2);
        assert_eq!(stats.dropped_tracks, 1);
        assert_eq!(stats.kept_tracks, 1);
    }

    #[test]
    fn label_pass_rewrites_and_drops() {
        let input = set(json!({
            "shapes": [{"frame": 0, "label_id": 1}, {"frame": 0, "label_id": 2}, {"frame": 0}],
            "tracks": [
                {"label_id": 2, "shapes": [{"frame": 0}]},
                {"label_id": 1, "shapes": [{"frame": 0}]}
            ]
        }));
        let source = vec![Label::new(1, "car"), Label::new(2, "truck")];
        let target = vec![Label::new(40, "car")];
        let labels = reconcile(&source, &target);

        let (out, stats) = remap_labels(input, &labels);
        assert_eq!(out.shapes.len(), 1);
        assert_eq!(out.shapes[0].label_id(), Some(40));
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].label_id(), Some(40));
        assert_eq!(stats.skipped_shapes, 2);
        assert_eq!(stats.skipped_tracks, 1);
        assert_eq!(stats.skipped(), 3);
        assert_eq!(stats.unmapped_label_ids.into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn remap_runs_both_passes_and_ignores_tags() {
        let input = set(json!({
            "tags": [{"frame": 0, "label_id": 1}],
            "shapes": [{"frame": 0, "label_id": 1}, {"frame": 1, "label_id": 3}]
        }));
        let m = mapping(&[(0, 0), (1, 1)]);
        let seg = Segment::whole_collection(2);
        let ctx = RemapContext {
            frame_mapping: &m,
            source_segment: &seg,
            target_segment: &seg,
            policy: &RangeHeuristic,
        };

        let outcome = remap(&input, &ctx, &identity_labels(&[1]));
        assert_eq!(outcome.payload.shapes.len(), 1);
        assert!(outcome.payload.tags.is_empty());
        assert_eq!(outcome.ignored_tags, 1);
        assert_eq!(outcome.frames.kept_shapes, 2);
        assert_eq!(outcome.labels.skipped_shapes, 1);
    }
}
