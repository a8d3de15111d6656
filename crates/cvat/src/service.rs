//! [`AnnotationService`] backed by a CVAT instance.

use async_trait::async_trait;
use serde_json::Value;

use annolink_core::annotation::AnnotationSet;
use annolink_core::error::ServiceError;
use annolink_core::labels::Label;
use annolink_core::segment::{Scope, Segment};
use annolink_core::service::AnnotationService;
use annolink_core::types::{Frame, RemoteId};

use crate::api::{CvatApi, CvatApiError};
use crate::jobs::{jobs_from_task, parse_job_list, parse_job_page, to_segments};
use crate::labels::{parse_label_page, parse_labels, project_labels, LabelPayload};
use crate::models::{DataMeta, JobInfo, TaskInfo};

/// Upper bound on pages followed in any paginated listing.
const MAX_PAGES: u32 = 1000;

pub struct CvatService {
    api: CvatApi,
}

impl CvatService {
    pub fn new(api: CvatApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &CvatApi {
        &self.api
    }

    async fn task(&self, task_id: RemoteId) -> Result<TaskInfo, ServiceError> {
        self.api
            .get_task(task_id)
            .await
            .map_err(lookup_error("task", task_id))
    }

    /// Walk the job discovery chain until one source yields jobs.
    async fn discover_jobs(&self, task: &TaskInfo) -> Result<Vec<JobInfo>, CvatApiError> {
        let task_id = task.id;

        match self.api.get_task_jobs(task_id).await {
            Ok(value) => {
                let jobs = parse_job_list(&value);
                if !jobs.is_empty() {
                    tracing::debug!(task_id, jobs = jobs.len(), "Jobs listed by task endpoint");
                    return Ok(jobs);
                }
            }
            Err(e) => {
                tracing::debug!(
                    task_id,
                    error = %e,
                    "Task jobs endpoint unavailable, trying job listing"
                );
            }
        }

        let mut jobs = Vec::new();
        for page in 1..=MAX_PAGES {
            let value = self.api.list_jobs_page(task_id, page).await?;
            let (found, more) = parse_job_page(&value);
            jobs.extend(found);
            if !more {
                break;
            }
            if page == MAX_PAGES {
                tracing::warn!(task_id, pages = MAX_PAGES, "Job listing truncated");
            }
        }
        jobs.retain(|job| job.task_id.is_none_or(|t| t == task_id));
        if !jobs.is_empty() {
            tracing::debug!(task_id, jobs = jobs.len(), "Jobs found via job listing");
            return Ok(jobs);
        }

        let jobs = jobs_from_task(task);
        tracing::debug!(task_id, jobs = jobs.len(), "Jobs taken from task info");
        Ok(jobs)
    }

    /// Resolve a `labels` field to a flat list, following references.
    async fn resolve_labels(&self, field: &Value) -> Result<Vec<Label>, CvatApiError> {
        let url = match parse_labels(field)? {
            LabelPayload::Inline(labels) => return Ok(labels),
            LabelPayload::Reference(url) => url,
        };

        let mut labels = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;
        while let Some(url) = next {
            pages += 1;
            if pages > MAX_PAGES {
                tracing::warn!(pages = MAX_PAGES, "Label listing truncated");
                break;
            }
            let value = self.api.get_url(&url).await?;
            let (page, more) = parse_label_page(&value)?;
            labels.extend(page);
            next = more;
        }
        Ok(labels)
    }
}

/// Frame list of a task. The task size wins over the metadata length;
/// entries missing from the metadata or without a name get placeholder names.
fn frames_from_meta(size: i64, meta: DataMeta) -> Vec<Frame> {
    let names: Vec<String> = meta.frames.into_iter().map(|f| f.name).collect();
    let size = if size > 0 { size as usize } else { names.len() };
    (0..size)
        .map(|i| Frame::new(i as i64, names.get(i).cloned().unwrap_or_default()))
        .collect()
}

/// Map a 404 on a lookup to [`ServiceError::NotFound`].
fn lookup_error(entity: &'static str, id: RemoteId) -> impl FnOnce(CvatApiError) -> ServiceError {
    move |err| match err.status() {
        Some(404) => ServiceError::NotFound { entity, id },
        _ => err.into(),
    }
}

#[async_trait]
impl AnnotationService for CvatService {
    fn describe(&self) -> String {
        let conn = self.api.connection();
        format!("{} as {}", conn.url, conn.username)
    }

    async fn check_connection(&self) -> Result<(), ServiceError> {
        self.api.check_connection().await?;
        Ok(())
    }

    async fn segment_info(&self, job: RemoteId) -> Result<Segment, ServiceError> {
        let info = self.api.get_job(job).await.map_err(lookup_error("job", job))?;
        match (info.start_frame, info.stop_frame) {
            (Some(start), Some(stop)) => {
                Segment::job(job, start, stop).map_err(|e| ServiceError::Malformed(e.to_string()))
            }
            _ => Err(ServiceError::Malformed(format!(
                "Job {job} has no start_frame/stop_frame"
            ))),
        }
    }

    async fn collection_frames(&self, collection: RemoteId) -> Result<Vec<Frame>, ServiceError> {
        let task = self.task(collection).await?;
        let meta = self
            .api
            .get_data_meta(collection)
            .await
            .map_err(lookup_error("task", collection))?;
        Ok(frames_from_meta(task.size, meta))
    }

    async fn collection_segments(
        &self,
        collection: RemoteId,
    ) -> Result<Vec<Segment>, ServiceError> {
        let task = self.task(collection).await?;
        let jobs = self.discover_jobs(&task).await?;
        Ok(to_segments(&jobs, task.size))
    }

    async fn labels(&self, collection: RemoteId) -> Result<Vec<Label>, ServiceError> {
        let task = self.task(collection).await?;
        let mut labels = self.resolve_labels(&task.labels).await?;
        if labels.is_empty() {
            if let Some(field) = project_labels(&task.project) {
                labels = self.resolve_labels(field).await?;
                tracing::debug!(
                    task_id = collection,
                    labels = labels.len(),
                    "Using project labels"
                );
            }
        }
        Ok(labels)
    }

    async fn annotations(&self, scope: Scope) -> Result<AnnotationSet, ServiceError> {
        let set = match scope {
            Scope::Job { job, .. } => self
                .api
                .get_job_annotations(job)
                .await
                .map_err(lookup_error("job", job))?,
            Scope::Collection { collection } => self
                .api
                .get_task_annotations(collection)
                .await
                .map_err(lookup_error("task", collection))?,
        };
        tracing::debug!(
            scope = %scope,
            shapes = set.shapes.len(),
            tracks = set.tracks.len(),
            "Fetched annotations",
        );
        Ok(set)
    }

    async fn write_annotations(
        &self,
        scope: Scope,
        payload: &AnnotationSet,
    ) -> Result<(), ServiceError> {
        match scope {
            Scope::Job { job, .. } => self.api.upload_job_annotations(job, payload).await?,
            Scope::Collection { collection } => {
                self.api.upload_task_annotations(collection, payload).await?
            }
        }
        Ok(())
    }
}
