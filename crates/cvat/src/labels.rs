//! Normalization of task label payloads.
//!
//! Depending on the server version a task's `labels` field is one of:
//!
//! | Shape                          | Handling                          |
//! |--------------------------------|-----------------------------------|
//! | `[{id, name, ..}, ..]`         | used directly                     |
//! | `{"url": ".."}`                | fetched, possibly over many pages |
//! | `{"results": [..], ..}`        | the `results` list                |
//! | `{"<key>": {id, name, ..}, ..}`| the values                        |
//!
//! A list of bare ids or URLs carries no names and is rejected.

use serde_json::Value;

use annolink_core::labels::Label;

use crate::api::CvatApiError;

/// What a `labels` field resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPayload {
    Inline(Vec<Label>),
    /// Labels must be fetched from this URL.
    Reference(String),
}

/// Interpret a task (or project) `labels` field.
pub fn parse_labels(value: &Value) -> Result<LabelPayload, CvatApiError> {
    match value {
        Value::Null => Ok(LabelPayload::Inline(Vec::new())),
        Value::Array(items) => parse_label_list(items).map(LabelPayload::Inline),
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(url) = map.get("url").and_then(Value::as_str) {
                    return Ok(LabelPayload::Reference(url.to_string()));
                }
            }
            if let Some(results) = map.get("results") {
                return match results {
                    Value::Array(items) => parse_label_list(items).map(LabelPayload::Inline),
                    other => Err(unexpected("labels.results", other)),
                };
            }
            if !map.is_empty() && map.values().all(is_label_object) {
                let items: Vec<Value> = map.values().cloned().collect();
                return parse_label_list(&items).map(LabelPayload::Inline);
            }
            Err(unexpected("labels", value))
        }
        other => Err(unexpected("labels", other)),
    }
}

/// One page of a referenced label list: the labels and the `next` link.
pub fn parse_label_page(value: &Value) -> Result<(Vec<Label>, Option<String>), CvatApiError> {
    match value {
        Value::Array(items) => Ok((parse_label_list(items)?, None)),
        Value::Object(map) => {
            let items = map
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| unexpected("label page", value))?;
            let next = map.get("next").and_then(Value::as_str).map(String::from);
            Ok((parse_label_list(items)?, next))
        }
        other => Err(unexpected("label page", other)),
    }
}

/// Labels embedded in a task's `project` field, when it is an object.
pub fn project_labels(project: &Value) -> Option<&Value> {
    project.as_object().and_then(|p| p.get("labels"))
}

fn parse_label_list(items: &[Value]) -> Result<Vec<Label>, CvatApiError> {
    items
        .iter()
        .map(|item| {
            if !is_label_object(item) {
                return Err(unexpected("label entry", item));
            }
            serde_json::from_value::<Label>(item.clone())
                .map_err(|e| CvatApiError::UnexpectedShape(format!("label entry: {e}")))
        })
        .collect()
}

fn is_label_object(value: &Value) -> bool {
    value.as_object().is_some_and(|o| o.contains_key("id"))
}

fn unexpected(what: &str, value: &Value) -> CvatApiError {
    let mut shown = value.to_string();
    if shown.len() > 120 {
        let mut cut = 120;
        while !shown.is_char_boundary(cut) {
            cut -= 1;
        }
        shown.truncate(cut);
        shown.push_str("...");
    }
    CvatApiError::UnexpectedShape(format!("{what}: {shown}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn inline(value: Value) -> Vec<Label> {
        match parse_labels(&value).unwrap() {
            LabelPayload::Inline(labels) => labels,
            other => panic!("expected inline labels, got {other:?}"),
        }
    }

    #[test]
    fn list_of_label_objects() {
        let labels = inline(json!([
            {"id": 1, "name": "car", "color": "#ff0000", "attributes": []},
            {"id": 2, "name": "person"},
        ]));
        assert_eq!(labels, vec![Label::new(1, "car"), Label::new(2, "person")]);
    }

    #[test]
    fn url_reference() {
        let payload = parse_labels(&json!({"url": "http://cvat/api/labels?task_id=5"})).unwrap();
        assert_eq!(
            payload,
            LabelPayload::Reference("http://cvat/api/labels?task_id=5".to_string())
        );
    }

    #[test]
    fn results_wrapper() {
        let labels = inline(json!({"count": 1, "results": [{"id": 3, "name": "dog"}]}));
        assert_eq!(labels, vec![Label::new(3, "dog")]);
    }

    #[test]
    fn dict_of_label_objects() {
        let mut labels = inline(json!({
            "a": {"id": 5, "name": "tree"},
            "b": {"id": 4, "name": "bush"},
        }));
        labels.sort_by_key(|l| l.id);
        assert_eq!(labels, vec![Label::new(4, "bush"), Label::new(5, "tree")]);
    }

    #[test]
    fn missing_or_empty_labels_are_empty() {
        assert!(inline(Value::Null).is_empty());
        assert!(inline(json!([])).is_empty());
    }

    #[test]
    fn bare_ids_are_rejected() {
        assert_matches!(parse_labels(&json!([1, 2, 3])), Err(CvatApiError::UnexpectedShape(_)));
    }

    #[test]
    fn unknown_dict_is_rejected() {
        assert_matches!(
            parse_labels(&json!({"foo": 1, "bar": 2})),
            Err(CvatApiError::UnexpectedShape(_))
        );
    }

    #[test]
    fn label_page_with_next_link() {
        let (labels, next) = parse_label_page(&json!({
            "count": 3,
            "next": "http://cvat/api/labels?page=2",
            "results": [{"id": 1, "name": "car"}],
        }))
        .unwrap();
        assert_eq!(labels, vec![Label::new(1, "car")]);
        assert_eq!(next.as_deref(), Some("http://cvat/api/labels?page=2"));
    }

    #[test]
    fn last_label_page_has_null_next() {
        let (_, next) = parse_label_page(&json!({"next": null, "results": []})).unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn project_labels_only_from_embedded_project() {
        assert!(project_labels(&json!(17)).is_none());
        assert_eq!(
            project_labels(&json!({"id": 17, "labels": []})),
            Some(&json!([]))
        );
    }
}
