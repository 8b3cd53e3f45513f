//! First-match-wins field lookup shared by every analyzer.
//!
//! Records carry no schema, so each concept (text, url, id, ...) is looked
//! up through an ordered list of candidate keys.

use serde_json::Value;

use super::Record;

pub const TEXT_FIELDS: &[&str] = &["text", "content", "body", "message", "description", "summary"];

pub const URL_FIELDS: &[&str] = &[
    "url",
    "link",
    "href",
    "source_url",
    "thread_url",
    "post_url",
    "page_url",
];

pub const ID_FIELDS: &[&str] = &["id", "post_id", "comment_id", "message_id", "item_id", "_id"];

pub const AUTHOR_FIELDS: &[&str] = &[
    "author",
    "user",
    "username",
    "user_name",
    "poster",
    "creator",
];

pub const DATE_FIELDS: &[&str] = &[
    "date",
    "datetime",
    "timestamp",
    "created_at",
    "posted_at",
    "time",
];

pub const THREAD_ID_FIELDS: &[&str] = &["thread_id", "topic_id"];

/// Whether a value counts as "populated": not null, not `false`, not zero,
/// not an empty string, array or object.
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// First candidate key present on the record, whatever its value.
pub fn first_present<'a>(record: &'a Record, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|field| record.get(*field))
}

/// First candidate key whose value is populated.
pub fn first_populated<'a>(record: &'a Record, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| record.get(*field))
        .find(|value| is_populated(value))
}

/// First candidate key holding a string with visible characters.
pub fn first_text<'a>(record: &'a Record, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| record.get(*field))
        .filter_map(Value::as_str)
        .find(|text| !text.trim().is_empty())
}

/// String field by exact name, if it is a string.
pub fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Text form of a value: strings as-is, everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test records must be objects"),
        }
    }

    #[test]
    fn first_present_takes_priority_order() {
        let item = record(json!({"post_id": 7, "id": null}));
        assert_eq!(first_present(&item, ID_FIELDS), Some(&Value::Null));
    }

    #[test]
    fn first_populated_skips_empty_values() {
        let item = record(json!({"author": "", "user": null, "username": "sami"}));
        assert_eq!(
            first_populated(&item, AUTHOR_FIELDS),
            Some(&json!("sami"))
        );
        assert!(first_populated(&record(json!({"author": 0})), AUTHOR_FIELDS).is_none());
    }

    #[test]
    fn first_text_ignores_blank_and_non_strings() {
        let item = record(json!({"text": "   ", "content": 12, "body": "hello"}));
        assert_eq!(first_text(&item, TEXT_FIELDS), Some("hello"));
        assert_eq!(first_text(&record(json!({})), TEXT_FIELDS), None);
    }

    #[test]
    fn value_to_text_unquotes_strings() {
        assert_eq!(value_to_text(&json!("abc")), "abc");
        assert_eq!(value_to_text(&json!(42)), "42");
        assert_eq!(value_to_text(&json!(true)), "true");
    }

    #[test]
    fn populated_rules() {
        assert!(is_populated(&json!("x")));
        assert!(is_populated(&json!(1.5)));
        assert!(is_populated(&json!([0])));
        assert!(!is_populated(&json!(false)));
        assert!(!is_populated(&json!({})));
        assert!(!is_populated(&json!(0.0)));
    }
}
