//! Filename normalization for cross-instance frame identity.
//!
//! Two instances of the annotation service rarely agree on paths: one may
//! keep the original dataset directories, the other may prepend the job id
//! to every file on ingestion (`68_1758259745_7474.jpg`). [`normalize`]
//! reduces a path to a key both sides agree on.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::FrameNumber;

/// Prefix of names synthesized for frames whose path is unknown.
pub const PLACEHOLDER_PREFIX: &str = "frame_";

/// Short numeric ingestion prefix: 1-4 digits followed by an underscore.
///
/// Ten-digit (and longer) runs are timestamps that belong to the filename
/// and must survive.
const JOB_PREFIX_PATTERN: &str = r"^\d{1,4}_";

static JOB_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(JOB_PREFIX_PATTERN).expect("valid regex"));

/// Canonicalize a file path into a comparison key.
///
/// Drops every directory component, then strips one leading short numeric
/// prefix.
///
/// # Examples
///
/// ```
/// use annolink_core::normalize::normalize;
///
/// assert_eq!(normalize("dataset/ex641/68_1758259745_7474.jpg"), "1758259745_7474.jpg");
/// assert_eq!(normalize("1758259745_7474.jpg"), "1758259745_7474.jpg");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(path: &str) -> String {
    let base = match path.rsplit_once('/') {
        Some((_, base)) => base,
        None => path,
    };
    JOB_PREFIX_RE.replace(base, "").into_owned()
}

/// Name synthesized for a frame that carries no path.
pub fn placeholder_name(index: FrameNumber) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}")
}

/// Whether `name` looks like a synthesized placeholder rather than a real file.
pub fn is_placeholder(name: &str) -> bool {
    name.starts_with(PLACEHOLDER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directories() {
        assert_eq!(normalize("a/b/c/img.jpg"), "img.jpg");
    }

    #[test]
    fn strips_short_job_prefix() {
        assert_eq!(normalize("68_1758259745_7474.jpg"), "1758259745_7474.jpg");
        assert_eq!(normalize("1_img1.jpg"), "img1.jpg");
        assert_eq!(normalize("1234_img.jpg"), "img.jpg");
    }

    #[test]
    fn keeps_five_digit_prefix() {
        assert_eq!(normalize("12345_img.jpg"), "12345_img.jpg");
    }

    #[test]
    fn never_strips_timestamp_run() {
        assert_eq!(normalize("1234567890_1.jpg"), "1234567890_1.jpg");
    }

    #[test]
    fn strips_prefix_before_timestamp() {
        assert_eq!(normalize("12_1234567890_1.jpg"), "1234567890_1.jpg");
    }

    #[test]
    fn strips_directories_and_prefix_together() {
        assert_eq!(
            normalize("dataset_baumas/ex641/250919_s1_2_3/68_1758259745_7474.jpg"),
            "1758259745_7474.jpg"
        );
    }

    #[test]
    fn strips_only_one_prefix() {
        assert_eq!(normalize("1_2_img.jpg"), "2_img.jpg");
    }

    #[test]
    fn trailing_slash_yields_empty_key() {
        assert_eq!(normalize("dir/"), "");
    }

    #[test]
    fn empty_input_is_total() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn idempotent_on_realistic_names() {
        let inputs = [
            "",
            "img.jpg",
            "frame_3",
            "a/b/68_1758259745_7474.jpg",
            "1234567890_1.jpg",
            "12_1234567890_1.jpg",
            "12345_x.png",
            "dir/",
            "no_digits_here.jpg",
            "9_",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn placeholder_round_trip() {
        let name = placeholder_name(12);
        assert_eq!(name, "frame_12");
        assert!(is_placeholder(&name));
        assert!(is_placeholder(&normalize(&name)));
        assert!(!is_placeholder("img_12.jpg"));
    }
}
