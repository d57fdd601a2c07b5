//! Store API facade.
//!
//! Wraps the store's two HTTP endpoints: `POST /db/execute` for writes
//! (a JSON array of SQL statements, applied as one transaction) and
//! `GET /db/query?level=..&q=..` for reads. Unwraps the engine's
//! `{results: [...]}` envelope into a success signal, an engine error
//! string, or a list of decoded documents.

pub mod document;

pub use document::DocValue;

use crate::config::StoreConfig;
use crate::error::{Result, RqdocError};
use crate::transport::{RedirectEngine, RequestContext, Transport};
use serde_json::Value;
use tracing::debug;

/// HTTP API facade over an injected [`Transport`].
pub struct StoreApi<T: Transport> {
    engine: RedirectEngine<T>,
}

impl<T: Transport> StoreApi<T> {
    pub fn new(transport: T) -> Self {
        Self {
            engine: RedirectEngine::new(transport),
        }
    }

    pub fn engine(&self) -> &RedirectEngine<T> {
        &self.engine
    }

    /// Executes one insert/update/delete statement.
    pub async fn execute(&self, config: &StoreConfig, statement: &str) -> Result<()> {
        self.execute_transaction(config, &[statement.to_string()])
            .await
    }

    /// Executes a transaction: an array of statements applied together.
    pub async fn execute_transaction(
        &self,
        config: &StoreConfig,
        statements: &[String],
    ) -> Result<()> {
        let body = Value::Array(
            statements
                .iter()
                .map(|s| Value::String(s.clone()))
                .collect(),
        );
        debug!(count = statements.len(), "executing transaction");
        let ctx = RequestContext::post(
            config.endpoint(),
            "/db/execute",
            body,
            config.timeout(),
            config.max_redirects,
        )
        .with_keep_alive(config.keep_alive);
        let data = self.engine.request(ctx).await?;
        if let Some(message) = extract_error(&data) {
            return Err(RqdocError::Sql(message));
        }
        Ok(())
    }

    /// Runs a read query and decodes the rows into documents.
    pub async fn query(&self, config: &StoreConfig, sql: &str) -> Result<Vec<DocValue>> {
        debug!(%sql, level = config.consistency_level.as_str(), "querying");
        let ctx = RequestContext::get(
            config.endpoint(),
            "/db/query",
            config.timeout(),
            config.max_redirects,
        )
        .with_query(vec![
            ("level".to_string(), config.consistency_level.as_str().to_string()),
            ("q".to_string(), sql.to_string()),
        ])
        .with_keep_alive(config.keep_alive);
        let data = self.engine.request(ctx).await?;
        if let Some(message) = extract_error(&data) {
            return Err(RqdocError::Sql(message));
        }
        decode_rows(&data)
    }
}

/// The engine reports statement errors inside the envelope, not via the
/// status code: `results[0].error`, absent means none.
pub fn extract_error(data: &Value) -> Option<String> {
    data.get("results")?
        .get(0)?
        .get("error")?
        .as_str()
        .map(String::from)
}

/// Decodes `results[0].values`. Each value is a one-element array
/// holding the row's JSON string; every row must parse, and one bad row
/// fails the whole query naming the offender. Partial results are never
/// returned.
fn decode_rows(data: &Value) -> Result<Vec<DocValue>> {
    let values = data
        .get("results")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("values"))
        .and_then(Value::as_array);
    let Some(values) = values else {
        return Ok(Vec::new());
    };
    let mut documents = Vec::with_capacity(values.len());
    for (index, row) in values.iter().enumerate() {
        let raw = row
            .get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| RqdocError::BadRow {
                index,
                cause: "value row does not hold a JSON string".to_string(),
            })?;
        let parsed: Value = serde_json::from_str(raw).map_err(|e| RqdocError::BadRow {
            index,
            cause: e.to_string(),
        })?;
        documents.push(DocValue::from_json(parsed));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_error_finds_the_engine_message() {
        let data = json!({"results": [{"error": "no such table: product"}]});
        assert_eq!(
            extract_error(&data).as_deref(),
            Some("no such table: product")
        );
    }

    #[test]
    fn test_extract_error_is_none_on_clean_results() {
        assert_eq!(extract_error(&json!({"results": [{"values": []}]})), None);
        assert_eq!(extract_error(&json!({})), None);
        assert_eq!(extract_error(&json!({"results": []})), None);
    }

    #[test]
    fn test_decode_rows_parses_each_json_string() {
        let data = json!({"results": [{
            "columns": ["json"],
            "types": ["text"],
            "values": [
                [r#"{"id":"a1","name":"apple"}"#],
                [r#"{"id":"a2","name":"pear"}"#],
            ],
        }]});
        let docs = decode_rows(&data).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id(), Some("a2"));
    }

    #[test]
    fn test_decode_rows_yields_empty_on_missing_values() {
        assert!(decode_rows(&json!({})).unwrap().is_empty());
        assert!(decode_rows(&json!({"results": [{}]})).unwrap().is_empty());
    }

    #[test]
    fn test_one_bad_row_fails_the_whole_query() {
        let data = json!({"results": [{
            "values": [
                [r#"{"id":"ok"}"#],
                ["{not json"],
            ],
        }]});
        match decode_rows(&data) {
            Err(RqdocError::BadRow { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected BadRow, got {other:?}"),
        }
    }

    #[test]
    fn test_a_non_string_row_value_is_a_bad_row() {
        let data = json!({"results": [{"values": [[42]]}]});
        assert!(matches!(
            decode_rows(&data),
            Err(RqdocError::BadRow { index: 0, .. })
        ));
    }
}
