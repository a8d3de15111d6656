//! Wire types for the CVAT endpoints this crate reads.
//!
//! Only the fields the engine uses are declared. Fields whose shape varies
//! between server versions stay as raw [`serde_json::Value`].

use serde::Deserialize;
use serde_json::Value;

use annolink_core::types::{FrameNumber, RemoteId};

/// `GET /api/jobs/{id}` and entries of job listings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobInfo {
    #[serde(default)]
    pub id: Option<RemoteId>,
    #[serde(default)]
    pub task_id: Option<RemoteId>,
    #[serde(default)]
    pub start_frame: Option<FrameNumber>,
    #[serde(default)]
    pub stop_frame: Option<FrameNumber>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `GET /api/tasks/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInfo {
    pub id: RemoteId,
    #[serde(default)]
    pub name: String,
    /// Number of frames in the task.
    #[serde(default)]
    pub size: i64,
    /// Inline list, `{url}` reference, `{results}` wrapper or dict of labels.
    #[serde(default)]
    pub labels: Value,
    /// Older servers list jobs per segment here.
    #[serde(default)]
    pub segments: Vec<Value>,
    #[serde(default)]
    pub jobs: Value,
    /// Either an embedded project object or an id, depending on version.
    #[serde(default)]
    pub project: Value,
}

/// `GET /api/tasks/{id}/data/meta`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataMeta {
    #[serde(default)]
    pub frames: Vec<FrameMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameMeta {
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_info_tolerates_missing_optional_fields() {
        let task: TaskInfo = serde_json::from_value(json!({"id": 4})).unwrap();
        assert_eq!(task.size, 0);
        assert!(task.labels.is_null());
        assert!(task.segments.is_empty());
    }

    #[test]
    fn job_info_reads_frame_range() {
        let job: JobInfo = serde_json::from_value(json!({
            "id": 68,
            "task_id": 12,
            "start_frame": 100,
            "stop_frame": 149,
            "status": "annotation",
            "assignee": null,
        }))
        .unwrap();
        assert_eq!(job.id, Some(68));
        assert_eq!(job.start_frame, Some(100));
        assert_eq!(job.stop_frame, Some(149));
    }

    #[test]
    fn data_meta_reads_frame_names() {
        let meta: DataMeta = serde_json::from_value(json!({
            "chunk_size": 36,
            "frames": [{"name": "a/1.jpg", "width": 10, "height": 10}, {"width": 1}],
        }))
        .unwrap();
        assert_eq!(meta.frames[0].name, "a/1.jpg");
        assert_eq!(meta.frames[1].name, "");
    }
}
