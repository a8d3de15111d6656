//! Annotation payload types.
//!
//! Shapes and tracks are kept as opaque JSON objects: geometry, attributes
//! and every other field pass through a transfer untouched. Only `frame`,
//! `label_id` and the server-assigned `id` / `source` fields are read or
//! rewritten.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{FrameNumber, RemoteId};

/// Fields assigned by the server that must not be replayed into another instance.
pub const SERVER_ASSIGNED_FIELDS: &[&str] = &["id", "source"];

/// A single geometric annotation on one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(pub Map<String, Value>);

impl Shape {
    /// Raw `frame` value, if present and integral.
    pub fn frame(&self) -> Option<FrameNumber> {
        self.0.get("frame").and_then(Value::as_i64)
    }

    pub fn set_frame(&mut self, frame: FrameNumber) {
        self.0.insert("frame".to_string(), Value::from(frame));
    }

    pub fn label_id(&self) -> Option<RemoteId> {
        label_id_of(&self.0)
    }

    pub fn set_label_id(&mut self, label_id: RemoteId) {
        self.0.insert("label_id".to_string(), Value::from(label_id));
    }

    pub fn strip_server_fields(&mut self) {
        strip_server_fields(&mut self.0);
    }
}

/// An object followed across frames: a sequence of shapes under one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Track {
    pub fn label_id(&self) -> Option<RemoteId> {
        label_id_of(&self.fields)
    }

    pub fn set_label_id(&mut self, label_id: RemoteId) {
        self.fields
            .insert("label_id".to_string(), Value::from(label_id));
    }

    /// Clone of this track's own fields, server identity removed, with no shapes.
    pub fn empty_copy(&self) -> Self {
        let mut fields = self.fields.clone();
        strip_server_fields(&mut fields);
        Self {
            shapes: Vec::new(),
            fields,
        }
    }
}

/// Full annotation payload of a job or collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl AnnotationSet {
    /// Shapes plus tracks, the count verification compares.
    pub fn record_count(&self) -> usize {
        self.shapes.len() + self.tracks.len()
    }

    /// Total number of shapes inside all tracks.
    pub fn track_shape_count(&self) -> usize {
        self.tracks.iter().map(|t| t.shapes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.tracks.is_empty()
    }
}

fn label_id_of(fields: &Map<String, Value>) -> Option<RemoteId> {
    fields.get("label_id").and_then(Value::as_i64)
}

fn strip_server_fields(fields: &mut Map<String, Value>) {
    for key in SERVER_ASSIGNED_FIELDS {
        fields.remove(*key);
    }
}
