//! Query compilation and post-processing.
//!
//! Pure functions from a filter specification to SQL text, plus the
//! in-memory sort/skip/limit/fields pipeline applied to decoded
//! documents. No I/O happens here.

pub mod compiler;
pub mod postprocess;

pub use compiler::{compile_select, escape_str, where_clause};
pub use postprocess::apply;

use serde_json::Value;
use std::collections::BTreeMap;

/// What to select. Decided once at the call boundary; downstream code
/// only ever matches on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Exact-id lookup.
    ById(String),
    /// Membership in an id list.
    ByIdList(Vec<String>),
    /// Field equality probes against the serialized JSON blob.
    ///
    /// Each entry compiles to `instr(json, '"key":value')` — a raw
    /// substring match, not a structural query. It is exact-match only
    /// and sensitive to key ordering and whitespace in the stored JSON;
    /// that is the documented contract, not an accident. Keys carrying
    /// a `$` are reserved markers and are skipped.
    ByFieldMap(BTreeMap<String, Value>),
    /// Caller-supplied SQL, passed through verbatim.
    Native(String),
}

impl Filter {
    /// A field map with no usable conditions selects everything.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::ByFieldMap(map) => map.keys().all(|k| k.contains('$')),
            _ => false,
        }
    }
}

/// Sort direction for the post-processing pipeline. Any negative
/// configured value means descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_signum(direction: i32) -> Self {
        if direction < 0 {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }
}

/// Post-processing directives, applied in the fixed order
/// sort → skip → limit → fields regardless of how the caller ordered
/// them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOpts {
    pub sort: Option<(String, SortDirection)>,
    pub skip: Option<usize>,
    /// A negative limit is a no-op; zero or more truncates.
    pub limit: Option<i64>,
    /// Top-level keys to keep; everything else is dropped. `id`
    /// survives only when explicitly requested.
    pub fields: Option<Vec<String>>,
}

impl QueryOpts {
    pub fn sorted(mut self, field: impl Into<String>, direction: i32) -> Self {
        self.sort = Some((field.into(), SortDirection::from_signum(direction)));
        self
    }

    pub fn skipping(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limited(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }
}
