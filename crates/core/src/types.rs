use serde::{Deserialize, Serialize};

/// Identifiers assigned by the remote annotation service (tasks, jobs, labels).
pub type RemoteId = i64;

/// Frame numbers. Global (0-based within a collection) unless stated otherwise.
pub type FrameNumber = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// One frame of a collection: its global index and the path it was ingested from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub index: FrameNumber,
    pub path: String,
}

impl Frame {
    /// Build a frame, substituting the placeholder name when `path` is empty.
    pub fn new(index: FrameNumber, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.is_empty() {
            crate::normalize::placeholder_name(index)
        } else {
            path
        };
        Self { index, path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_gets_placeholder() {
        assert_eq!(Frame::new(7, "").path, "frame_7");
    }

    #[test]
    fn real_path_is_kept() {
        let frame = Frame::new(0, "set/a.jpg");
        assert_eq!(frame.index, 0);
        assert_eq!(frame.path, "set/a.jpg");
    }
}
