//! Filter-to-SQL compilation.
//!
//! The store's physical schema is fixed at two columns (`id`, `json`),
//! so every read compiles to `SELECT json FROM <table> <where>`. Ids
//! are compared against the primary key; field filters probe the
//! serialized JSON blob with `instr`.

use crate::query::Filter;
use serde_json::Value;

/// Compiles a filter into the full select statement for `table`.
/// Native SQL bypasses the compiler entirely.
pub fn compile_select(table: &str, filter: &Filter) -> String {
    if let Filter::Native(sql) = filter {
        return sql.clone();
    }
    format!("SELECT json FROM {} {}", escape_str(table), where_clause(filter))
}

/// The `WHERE` part alone; empty for a filter with no conditions.
pub fn where_clause(filter: &Filter) -> String {
    match filter {
        Filter::ById(id) => format!("WHERE id = {}", quote_id(id)),
        Filter::ByIdList(ids) => {
            let list: Vec<String> = ids.iter().map(|id| quote_id(id)).collect();
            format!("WHERE id IN ({})", list.join(","))
        }
        Filter::ByFieldMap(map) => {
            let mut clause = String::new();
            for (key, value) in map {
                // Keys carrying a reserved `$` marker are directives for
                // the post-processing pipeline, not conditions.
                if key.contains('$') {
                    continue;
                }
                let condition = format!("instr(json, '\"{}\":{}')", key, literal(value));
                if clause.is_empty() {
                    clause.push_str("WHERE ");
                } else {
                    clause.push_str(" AND ");
                }
                clause.push_str(&condition);
            }
            clause
        }
        Filter::Native(sql) => sql.clone(),
    }
}

/// Double-quoted id literal, embedded double quotes doubled.
fn quote_id(id: &str) -> String {
    format!("\"{}\"", id.replace('"', "\"\""))
}

/// The rendering of a filter value inside an `instr` probe: strings are
/// double-quoted with `"` and `'` doubled, everything else is its bare
/// JSON form.
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('"', "\"\"").replace('\'', "''")),
        other => other.to_string(),
    }
}

/// Escapes a string for use inside a raw SQL literal, per the backing
/// engine's string syntax. Distinct from the `instr` value rendering
/// above.
pub fn escape_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\u{0008}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            '\u{001a}' => out.push_str("\\z"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '"' | '\'' | '\\' | '%' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}
