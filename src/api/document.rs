//! Document values.
//!
//! Documents are JSON objects pulled out of the store's single `json`
//! column. [`DocValue`] mirrors JSON with one addition: string leaves
//! that look like ISO-8601 instants (`YYYY-MM-DDTHH:MM:SS.mmmZ`) are
//! promoted to a typed date on decode and rendered back to the same
//! millisecond form on encode.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Pattern a string leaf must match to be considered a date.
fn isodate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z").expect("isodate pattern")
    })
}

/// A decoded document value: JSON plus a date variant.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<DocValue>),
    Object(BTreeMap<String, DocValue>),
}

impl DocValue {
    /// Converts decoded JSON into a document value, promoting matching
    /// string leaves to dates. Promotion requires the whole leaf to be a
    /// parseable RFC 3339 instant; a date-looking fragment embedded in a
    /// longer string stays a string.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => DocValue::Null,
            Value::Bool(b) => DocValue::Bool(b),
            Value::Number(n) => DocValue::Number(n),
            Value::String(s) => {
                if isodate_regex().is_match(&s) {
                    if let Ok(date) = DateTime::parse_from_rfc3339(&s) {
                        return DocValue::Date(date.with_timezone(&Utc));
                    }
                }
                DocValue::String(s)
            }
            Value::Array(items) => {
                DocValue::Array(items.into_iter().map(DocValue::from_json).collect())
            }
            Value::Object(map) => DocValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, DocValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Renders the value back to plain JSON; dates become their
    /// millisecond ISO form, so decode/encode round-trips.
    pub fn to_json(&self) -> Value {
        match self {
            DocValue::Null => Value::Null,
            DocValue::Bool(b) => Value::Bool(*b),
            DocValue::Number(n) => Value::Number(n.clone()),
            DocValue::String(s) => Value::String(s.clone()),
            DocValue::Date(d) => {
                Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            DocValue::Array(items) => Value::Array(items.iter().map(DocValue::to_json).collect()),
            DocValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Looks up a top-level key; `None` unless this value is an object
    /// holding the key.
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        match self {
            DocValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The document's `id` field, when present.
    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(DocValue::as_str)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, DocValue::Object(_))
    }

    /// Rank used to order values of different kinds, so sorting stays
    /// total and stable whatever a field holds.
    fn kind_rank(&self) -> u8 {
        match self {
            DocValue::Null => 0,
            DocValue::Bool(_) => 1,
            DocValue::Number(_) => 2,
            DocValue::Date(_) => 3,
            DocValue::String(_) => 4,
            DocValue::Array(_) => 5,
            DocValue::Object(_) => 6,
        }
    }

    /// Total ordering for the sort pipeline: numbers numerically, dates
    /// chronologically, strings lexicographically; different kinds by
    /// rank; composites compare as equal, preserving input order under a
    /// stable sort.
    pub fn sort_cmp(&self, other: &DocValue) -> Ordering {
        match (self, other) {
            (DocValue::Bool(a), DocValue::Bool(b)) => a.cmp(b),
            (DocValue::Number(a), DocValue::Number(b)) => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (DocValue::Date(a), DocValue::Date(b)) => a.cmp(b),
            (DocValue::String(a), DocValue::String(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl From<Value> for DocValue {
    fn from(value: Value) -> Self {
        DocValue::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso_string_leaves_become_dates() {
        let doc = DocValue::from_json(json!({
            "id": "a1",
            "created": "2017-05-01T12:00:00.000Z",
            "note": "updated 2017-05-01T12:00:00.000Z later",
        }));
        assert!(matches!(doc.get("created"), Some(DocValue::Date(_))));
        // A date fragment inside a longer string is not a date.
        assert!(matches!(doc.get("note"), Some(DocValue::String(_))));
    }

    #[test]
    fn test_dates_round_trip_to_the_millisecond_form() {
        let raw = json!({"created": "2017-05-01T12:00:00.123Z"});
        let doc = DocValue::from_json(raw.clone());
        assert_eq!(doc.to_json(), raw);
    }

    #[test]
    fn test_non_matching_strings_stay_strings() {
        let doc = DocValue::from_json(json!({"when": "2017-05-01", "zip": "75011"}));
        assert!(matches!(doc.get("when"), Some(DocValue::String(_))));
        assert!(matches!(doc.get("zip"), Some(DocValue::String(_))));
    }

    #[test]
    fn test_nested_leaves_are_promoted_too() {
        let doc = DocValue::from_json(json!({
            "history": [{"at": "2020-02-29T23:59:59.999Z"}],
        }));
        let DocValue::Array(items) = doc.get("history").unwrap() else {
            panic!("expected array");
        };
        assert!(matches!(items[0].get("at"), Some(DocValue::Date(_))));
    }

    #[test]
    fn test_sort_cmp_orders_within_and_across_kinds() {
        let one = DocValue::from_json(json!(1));
        let two = DocValue::from_json(json!(2.5));
        let s = DocValue::from_json(json!("abc"));
        assert_eq!(one.sort_cmp(&two), Ordering::Less);
        assert_eq!(two.sort_cmp(&one), Ordering::Greater);
        // Numbers rank below strings.
        assert_eq!(two.sort_cmp(&s), Ordering::Less);
        assert_eq!(DocValue::Null.sort_cmp(&one), Ordering::Less);
    }

    #[test]
    fn test_dates_compare_chronologically() {
        let earlier = DocValue::from_json(json!("2017-01-01T00:00:00.000Z"));
        let later = DocValue::from_json(json!("2018-01-01T00:00:00.000Z"));
        assert_eq!(earlier.sort_cmp(&later), Ordering::Less);
    }
}
