//! In-memory post-processing of decoded documents.
//!
//! The backing engine only ever runs the where clause; sorting and
//! paging happen client-side, always in the same order:
//! sort → skip → limit → fields.

use crate::api::DocValue;
use crate::query::{QueryOpts, SortDirection};
use std::cmp::Ordering;

/// Applies the directives to a decoded result list.
pub fn apply(list: Vec<DocValue>, opts: &QueryOpts) -> Vec<DocValue> {
    let list = do_sort(list, opts);
    let list = do_skip(list, opts);
    let list = do_limit(list, opts);
    do_fields(list, opts)
}

/// Stable single-key sort; ties keep input order. Documents missing the
/// key sort before those holding one, keeping the comparison total.
fn do_sort(mut list: Vec<DocValue>, opts: &QueryOpts) -> Vec<DocValue> {
    let Some((field, direction)) = &opts.sort else {
        return list;
    };
    list.sort_by(|a, b| {
        let ord = match (a.get(field), b.get(field)) {
            (Some(a), Some(b)) => a.sort_cmp(b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    list
}

fn do_skip(mut list: Vec<DocValue>, opts: &QueryOpts) -> Vec<DocValue> {
    match opts.skip {
        Some(skip) if skip >= list.len() => Vec::new(),
        Some(skip) if skip > 0 => list.split_off(skip),
        _ => list,
    }
}

fn do_limit(mut list: Vec<DocValue>, opts: &QueryOpts) -> Vec<DocValue> {
    match opts.limit {
        Some(limit) if limit >= 0 => {
            list.truncate(limit as usize);
            list
        }
        _ => list,
    }
}

/// Drops every top-level key not in the requested set. An empty set is
/// a no-op; `id` survives only when explicitly requested.
fn do_fields(mut list: Vec<DocValue>, opts: &QueryOpts) -> Vec<DocValue> {
    let Some(fields) = &opts.fields else {
        return list;
    };
    if fields.is_empty() {
        return list;
    }
    for doc in &mut list {
        if let DocValue::Object(map) = doc {
            map.retain(|key, _| fields.iter().any(|f| f == key));
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Vec<DocValue> {
        // Five records with duplicate sort keys, in a known input order.
        [
            json!({"id": "e1", "name": "pear",   "price": 3}),
            json!({"id": "e2", "name": "apple",  "price": 1}),
            json!({"id": "e3", "name": "mango",  "price": 3}),
            json!({"id": "e4", "name": "banana", "price": 2}),
            json!({"id": "e5", "name": "cherry", "price": 1}),
        ]
        .into_iter()
        .map(DocValue::from_json)
        .collect()
    }

    fn ids(list: &[DocValue]) -> Vec<&str> {
        list.iter().map(|d| d.id().unwrap()).collect()
    }

    #[test]
    fn test_sort_is_stable_on_duplicate_keys() {
        let opts = QueryOpts::default().sorted("price", 1);
        let sorted = apply(fixture(), &opts);
        // Ties (price 1: e2,e5; price 3: e1,e3) keep input order.
        assert_eq!(ids(&sorted), vec!["e2", "e5", "e4", "e1", "e3"]);
    }

    #[test]
    fn test_negative_direction_sorts_descending() {
        let opts = QueryOpts::default().sorted("name", -1);
        let sorted = apply(fixture(), &opts);
        assert_eq!(ids(&sorted), vec!["e1", "e3", "e5", "e4", "e2"]);
    }

    #[test]
    fn test_pipeline_runs_sort_then_skip_then_limit_then_fields() {
        let opts = QueryOpts::default()
            .sorted("price", 1)
            .skipping(1)
            .limited(2)
            .with_fields(vec!["name".to_string()]);
        let result = apply(fixture(), &opts);
        // Sorted: e2,e5,e4,e1,e3 → skip 1 → e5,e4 after limit 2.
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get("name").unwrap(), &DocValue::String("cherry".into()));
        assert_eq!(result[1].get("name").unwrap(), &DocValue::String("banana".into()));
        // Fields kept only `name`; `id` was not requested, so it is gone.
        assert!(result[0].id().is_none());
        assert!(result[0].get("price").is_none());
    }

    #[test]
    fn test_swapping_sort_and_limit_would_change_the_result() {
        // The fixed order takes the two cheapest records; limiting the
        // raw input first would have taken e1 and e2 instead.
        let opts = QueryOpts::default().sorted("price", 1).limited(2);
        let result = apply(fixture(), &opts);
        assert_eq!(ids(&result), vec!["e2", "e5"]);
    }

    #[test]
    fn test_skip_past_the_end_yields_empty() {
        let opts = QueryOpts::default().skipping(5);
        assert!(apply(fixture(), &opts).is_empty());
        let opts = QueryOpts::default().skipping(50);
        assert!(apply(fixture(), &opts).is_empty());
    }

    #[test]
    fn test_zero_skip_is_a_no_op() {
        let opts = QueryOpts::default().skipping(0);
        assert_eq!(apply(fixture(), &opts).len(), 5);
    }

    #[test]
    fn test_limit_truncates_and_zero_empties() {
        let opts = QueryOpts::default().limited(3);
        assert_eq!(apply(fixture(), &opts).len(), 3);
        let opts = QueryOpts::default().limited(0);
        assert!(apply(fixture(), &opts).is_empty());
    }

    #[test]
    fn test_negative_limit_returns_the_list_unchanged() {
        let opts = QueryOpts::default().limited(-1);
        assert_eq!(apply(fixture(), &opts).len(), 5);
    }

    #[test]
    fn test_fields_keeps_id_only_when_requested() {
        let opts = QueryOpts::default()
            .with_fields(vec!["id".to_string(), "price".to_string()]);
        let result = apply(fixture(), &opts);
        assert_eq!(result[0].id(), Some("e1"));
        assert!(result[0].get("name").is_none());
    }

    #[test]
    fn test_empty_field_set_is_a_no_op() {
        let opts = QueryOpts::default().with_fields(Vec::new());
        let result = apply(fixture(), &opts);
        assert!(result[0].get("name").is_some());
    }
}
