//! Job discovery.
//!
//! Servers disagree on where a task's jobs are listed. The service tries, in
//! order: `GET /api/tasks/{id}/jobs`, the paginated `GET /api/jobs?task_id=`,
//! the task's own `jobs` field, its `segments`, and finally a synthetic
//! whole-task segment. The functions here interpret each answer; the calls
//! themselves live in [`crate::service`].

use serde_json::Value;

use annolink_core::segment::Segment;

use crate::models::{JobInfo, TaskInfo};

/// Jobs in a listing answered as a plain list or a `{results}` wrapper.
pub fn parse_job_list(value: &Value) -> Vec<JobInfo> {
    let items: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("results").and_then(Value::as_array) {
            Some(items) => items.as_slice(),
            None => &[],
        },
        _ => &[],
    };
    items.iter().filter_map(parse_job).collect()
}

/// One page of `GET /api/jobs`: the jobs and whether another page follows.
///
/// A non-paginated list is the whole result.
pub fn parse_job_page(value: &Value) -> (Vec<JobInfo>, bool) {
    let has_next = value
        .get("next")
        .is_some_and(|next| !next.is_null() && next.as_str() != Some(""));
    (parse_job_list(value), value.is_object() && has_next)
}

/// Jobs recorded on the task itself: its `jobs` field, else its `segments`.
///
/// A job nested in a segment without its own range inherits the segment's.
pub fn jobs_from_task(task: &TaskInfo) -> Vec<JobInfo> {
    let jobs = parse_job_list(&task.jobs);
    if !jobs.is_empty() {
        return jobs;
    }

    let mut jobs = Vec::new();
    for segment in &task.segments {
        match segment.get("jobs").and_then(Value::as_array) {
            Some(nested) => {
                let start = segment.get("start_frame").and_then(Value::as_i64);
                let stop = segment.get("stop_frame").and_then(Value::as_i64);
                jobs.extend(nested.iter().filter_map(parse_job).map(|mut job| {
                    job.start_frame = job.start_frame.or(start);
                    job.stop_frame = job.stop_frame.or(stop);
                    job
                }));
            }
            None if segment.get("id").is_some() => jobs.extend(parse_job(segment)),
            None => {}
        }
    }
    jobs
}

/// Turn discovered jobs into segments ordered by start frame.
///
/// Jobs without an id or a valid range are dropped with a warning. When
/// nothing usable remains, a task with frames becomes one
/// [`Segment::WholeCollection`]; an empty task yields no segments.
pub fn to_segments(jobs: &[JobInfo], task_size: i64) -> Vec<Segment> {
    let mut segments: Vec<Segment> = jobs
        .iter()
        .filter_map(|job| {
            let (Some(id), Some(start), Some(stop)) = (job.id, job.start_frame, job.stop_frame)
            else {
                tracing::warn!(job = ?job, "Skipping job without id or frame range");
                return None;
            };
            Segment::job(id, start, stop)
                .inspect_err(|e| {
                    tracing::warn!(job_id = id, error = %e, "Skipping job with invalid range")
                })
                .ok()
        })
        .collect();
    segments.sort_by_key(|s| (s.start(), s.job_id()));
    segments.dedup();

    if segments.is_empty() && task_size > 0 {
        tracing::info!(task_size, "No jobs found, using the whole task as one segment");
        segments.push(Segment::whole_collection(task_size as usize));
    }
    segments
}

fn parse_job(value: &Value) -> Option<JobInfo> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}
