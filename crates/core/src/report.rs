//! Transfer reports and non-fatal diagnostics.

use serde::Serialize;

use crate::annotation::AnnotationSet;
use crate::frame_identity::{AmbiguousMatch, MatchStrategy, Resolution};
use crate::labels::LabelMapping;
use crate::remap::RemapOutcome;
use crate::segment::{Scope, Segment};
use crate::types::Timestamp;

/// Non-fatal findings attached to a transfer report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Some, but not all, source annotations reached the payload.
    PartialCoverage { kept: usize, total: usize },
    /// Source labels with no target equivalent; their annotations were dropped.
    LabelGap { labels: Vec<String>, dropped: usize },
    /// Several target frames share one normalized filename.
    AmbiguousMatch(AmbiguousMatch),
}

/// Outcome counters of one transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub source: Scope,
    pub target: Scope,
    pub source_segment: Option<Segment>,
    pub target_segment: Option<Segment>,
    pub strategy: Option<MatchStrategy>,
    pub source_frames: usize,
    pub target_frames: usize,
    pub matched_frames: usize,
    /// Source shapes (outside tracks) before remapping.
    pub source_shapes: usize,
    /// Shapes inside source tracks before remapping.
    pub source_track_shapes: usize,
    pub skipped_shapes: usize,
    pub skipped_track_shapes: usize,
    pub dropped_tracks: usize,
    pub skipped_unmapped_label: usize,
    pub unmapped_labels: Vec<String>,
    pub ignored_tags: usize,
    pub written_shapes: usize,
    pub written_tracks: usize,
    pub written: bool,
    pub verified_shapes: Option<usize>,
    pub verified_tracks: Option<usize>,
    pub dry_run: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl TransferReport {
    pub fn new(source: Scope, target: Scope, dry_run: bool) -> Self {
        Self {
            source,
            target,
            source_segment: None,
            target_segment: None,
            strategy: None,
            source_frames: 0,
            target_frames: 0,
            matched_frames: 0,
            source_shapes: 0,
            source_track_shapes: 0,
            skipped_shapes: 0,
            skipped_track_shapes: 0,
            dropped_tracks: 0,
            skipped_unmapped_label: 0,
            unmapped_labels: Vec::new(),
            ignored_tags: 0,
            written_shapes: 0,
            written_tracks: 0,
            written: false,
            verified_shapes: None,
            verified_tracks: None,
            dry_run,
            diagnostics: Vec::new(),
            started_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_segments(
        &mut self,
        source: Segment,
        target: Segment,
        source_frames: usize,
        target_frames: usize,
    ) {
        self.source_segment = Some(source);
        self.target_segment = Some(target);
        self.source_frames = source_frames;
        self.target_frames = target_frames;
    }

    pub fn record_resolution(&mut self, resolution: &Resolution) {
        self.strategy = Some(resolution.strategy);
        self.matched_frames = resolution.matched_count;
        self.diagnostics.extend(
            resolution
                .ambiguous
                .iter()
                .cloned()
                .map(Diagnostic::AmbiguousMatch),
        );
    }

    /// Fold the remapper's counters into the report and derive coverage
    /// diagnostics.
    pub fn record_remap(
        &mut self,
        source: &AnnotationSet,
        outcome: &RemapOutcome,
        labels: &LabelMapping,
    ) {
        self.source_shapes = source.shapes.len();
        self.source_track_shapes = source.track_shape_count();
        self.skipped_shapes = outcome.frames.skipped_shapes;
        self.skipped_track_shapes = outcome.frames.skipped_track_shapes;
        self.dropped_tracks = outcome.frames.dropped_tracks;
        self.skipped_unmapped_label = outcome.labels.skipped();
        self.unmapped_labels = labels.describe_all(&outcome.labels.unmapped_label_ids);
        self.ignored_tags = outcome.ignored_tags;
        self.written_shapes = outcome.payload.shapes.len();
        self.written_tracks = outcome.payload.tracks.len();

        if self.skipped_unmapped_label > 0 {
            self.diagnostics.push(Diagnostic::LabelGap {
                labels: self.unmapped_labels.clone(),
                dropped: self.skipped_unmapped_label,
            });
        }

        let total = self.source_shapes + self.source_track_shapes;
        let kept = outcome.payload.shapes.len() + outcome.payload.track_shape_count();
        if kept > 0 && kept < total {
            self.diagnostics
                .push(Diagnostic::PartialCoverage { kept, total });
        }
    }

    pub fn record_write(&mut self) {
        self.written = true;
    }

    pub fn record_verification(&mut self, found: &AnnotationSet) {
        self.verified_shapes = Some(found.shapes.len());
        self.verified_tracks = Some(found.tracks.len());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now());
    }

    /// Shapes plus tracks submitted in the payload.
    pub fn written_count(&self) -> usize {
        self.written_shapes + self.written_tracks
    }

    /// Every source annotation reached the payload.
    pub fn is_complete(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::PartialCoverage { .. } | Diagnostic::LabelGap { .. }))
            && self.skipped_shapes == 0
            && self.skipped_track_shapes == 0
    }
}
