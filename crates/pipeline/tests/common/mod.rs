//! In-memory [`AnnotationService`] for orchestration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use annolink_core::annotation::AnnotationSet;
use annolink_core::error::ServiceError;
use annolink_core::labels::Label;
use annolink_core::segment::{Scope, Segment};
use annolink_core::service::AnnotationService;
use annolink_core::types::{Frame, RemoteId};

type ScopeKey = (RemoteId, Option<RemoteId>);

fn key(scope: Scope) -> ScopeKey {
    (scope.collection_id(), scope.job_id())
}

#[derive(Default)]
struct State {
    frames: BTreeMap<RemoteId, Vec<Frame>>,
    jobs: BTreeMap<RemoteId, (RemoteId, Segment)>,
    labels: BTreeMap<RemoteId, Vec<Label>>,
    annotations: BTreeMap<ScopeKey, AnnotationSet>,
    writes: Vec<(Scope, AnnotationSet)>,
    calls: Vec<&'static str>,
}

/// Fake instance seeded through builder methods.
///
/// Writes replace the stored annotations of the scope, so a read-back sees
/// exactly what was written unless [`FakeService::discarding_writes`] is set.
#[derive(Default)]
pub struct FakeService {
    name: String,
    state: Mutex<State>,
    failing: HashSet<&'static str>,
    failing_after_write: HashSet<&'static str>,
    discard_writes: bool,
    stored_shapes: Option<usize>,
}

impl FakeService {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Add a collection whose frame `i` has path `paths[i]`.
    pub fn with_collection(self, collection: RemoteId, paths: &[&str]) -> Self {
        let frames = paths
            .iter()
            .enumerate()
            .map(|(i, p)| Frame::new(i as i64, *p))
            .collect();
        self.state.lock().unwrap().frames.insert(collection, frames);
        self
    }

    pub fn with_job(self, collection: RemoteId, job: RemoteId, start: i64, stop: i64) -> Self {
        let segment = Segment::job(job, start, stop).unwrap();
        self.state
            .lock()
            .unwrap()
            .jobs
            .insert(job, (collection, segment));
        self
    }

    pub fn with_labels(self, collection: RemoteId, labels: &[(RemoteId, &str)]) -> Self {
        let labels = labels.iter().map(|(id, name)| Label::new(*id, *name)).collect();
        self.state.lock().unwrap().labels.insert(collection, labels);
        self
    }

    pub fn with_annotations(self, scope: Scope, set: Value) -> Self {
        let set: AnnotationSet = serde_json::from_value(set).unwrap();
        self.state.lock().unwrap().annotations.insert(key(scope), set);
        self
    }

    /// Make every call of operation `op` fail with a transport error.
    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.insert(op);
        self
    }

    /// Make `op` fail only once a write has been accepted.
    pub fn failing_after_write(mut self, op: &'static str) -> Self {
        self.failing_after_write.insert(op);
        self
    }

    /// Store only the first `shapes` shapes of each write.
    pub fn truncating_writes(mut self, shapes: usize) -> Self {
        self.stored_shapes = Some(shapes);
        self
    }

    /// Accept writes without storing them.
    pub fn discarding_writes(mut self) -> Self {
        self.discard_writes = true;
        self
    }

    pub fn writes(&self) -> Vec<(Scope, AnnotationSet)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, op: &'static str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        let after_write = !state.writes.is_empty() && self.failing_after_write.contains(op);
        if self.failing.contains(op) || after_write {
            return Err(ServiceError::Transport(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl AnnotationService for FakeService {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn check_connection(&self) -> Result<(), ServiceError> {
        self.enter("check_connection")
    }

    async fn segment_info(&self, job: RemoteId) -> Result<Segment, ServiceError> {
        self.enter("segment_info")?;
        let state = self.state.lock().unwrap();
        state
            .jobs
            .get(&job)
            .map(|(_, segment)| *segment)
            .ok_or(ServiceError::NotFound { entity: "job", id: job })
    }

    async fn collection_frames(&self, collection: RemoteId) -> Result<Vec<Frame>, ServiceError> {
        self.enter("collection_frames")?;
        let state = self.state.lock().unwrap();
        state.frames.get(&collection).cloned().ok_or(ServiceError::NotFound {
            entity: "task",
            id: collection,
        })
    }

    async fn collection_segments(
        &self,
        collection: RemoteId,
    ) -> Result<Vec<Segment>, ServiceError> {
        self.enter("collection_segments")?;
        let state = self.state.lock().unwrap();
        let jobs: Vec<Segment> = state
            .jobs
            .values()
            .filter(|(c, _)| *c == collection)
            .map(|(_, segment)| *segment)
            .collect();
        if !jobs.is_empty() {
            return Ok(jobs);
        }
        Ok(state
            .frames
            .get(&collection)
            .map(|frames| vec![Segment::whole_collection(frames.len())])
            .unwrap_or_default())
    }

    async fn labels(&self, collection: RemoteId) -> Result<Vec<Label>, ServiceError> {
        self.enter("labels")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .labels
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn annotations(&self, scope: Scope) -> Result<AnnotationSet, ServiceError> {
        self.enter("annotations")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .annotations
            .get(&key(scope))
            .cloned()
            .unwrap_or_default())
    }

    async fn write_annotations(
        &self,
        scope: Scope,
        payload: &AnnotationSet,
    ) -> Result<(), ServiceError> {
        self.enter("write_annotations")?;
        let mut state = self.state.lock().unwrap();
        state.writes.push((scope, payload.clone()));
        if !self.discard_writes {
            let mut stored = payload.clone();
            if let Some(keep) = self.stored_shapes {
                stored.shapes.truncate(keep);
            }
            state.annotations.insert(key(scope), stored);
        }
        Ok(())
    }
}
