//! Document CRUD over the store API.
//!
//! A [`DocumentStore`] binds one logical table and speaks documents:
//! save (create or update), load, list, remove. Every logical table
//! shares the same physical schema, two columns holding the id and the
//! serialized document.

use crate::api::{DocValue, StoreApi};
use crate::config::StoreConfig;
use crate::error::{Result, RqdocError};
use crate::query::{self, compiler, Filter, QueryOpts};
use crate::transport::Transport;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Fixed physical schema of every logical table.
pub const TABLE_SCHEMA: &str = "id text not null primary key, json text";

/// Engine message fragment identifying a missing table.
const NO_SUCH_TABLE: &str = "no such table";

/// Per-call save options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOpts {
    /// Overrides the config's merge behavior for this save.
    pub merge: Option<bool>,
}

/// Per-call remove options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOpts {
    /// Remove everything the filter matches instead of the first match.
    pub all: bool,
    /// Return the removed document.
    pub load: bool,
}

/// CRUD facade for one logical table.
pub struct DocumentStore<T: Transport> {
    api: StoreApi<T>,
    table: String,
}

impl<T: Transport> DocumentStore<T> {
    pub fn new(transport: T, table: impl Into<String>) -> Self {
        Self {
            api: StoreApi::new(transport),
            table: table.into(),
        }
    }

    pub fn api(&self) -> &StoreApi<T> {
        &self.api
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates or updates a document, depending on whether it carries
    /// an `id`. Returns the document as written, id included.
    pub async fn save(
        &self,
        config: &StoreConfig,
        doc: DocValue,
        opts: &SaveOpts,
    ) -> Result<DocValue> {
        let DocValue::Object(map) = doc else {
            return Err(RqdocError::BadOptions(
                "save requires a document object".into(),
            ));
        };
        if map.get("id").is_some() {
            self.update(config, map, opts).await
        } else {
            self.create(config, map).await
        }
    }

    /// Inserts a new document. An id already on the document is kept
    /// (an update that found no row degrades to a create); otherwise an
    /// explicit `id$` override wins, else a fresh UUID.
    async fn create(
        &self,
        config: &StoreConfig,
        mut map: BTreeMap<String, DocValue>,
    ) -> Result<DocValue> {
        let id = match map.get("id") {
            Some(DocValue::String(id)) => id.clone(),
            Some(_) => {
                return Err(RqdocError::BadOptions("id must be a string".into()));
            }
            None => match map.remove("id$") {
                Some(DocValue::String(id)) => id,
                Some(_) => {
                    return Err(RqdocError::BadOptions("id$ must be a string".into()));
                }
                None => Uuid::new_v4().to_string(),
            },
        };
        map.insert("id".to_string(), DocValue::String(id.clone()));
        let doc = DocValue::Object(map);

        let statement = format!(
            "INSERT INTO {}(id, json) VALUES('{}' , '{}')",
            compiler::escape_str(&self.table),
            id,
            sql_json(&doc),
        );
        match self.api.execute(config, &statement).await {
            Ok(()) => {
                debug!(table = %self.table, %id, "document created");
                Ok(doc)
            }
            Err(err) if self.ignores_missing_table(config, &err) => {
                self.create_table(config).await?;
                self.api.execute(config, &statement).await?;
                debug!(table = %self.table, %id, "document created after bootstrap");
                Ok(doc)
            }
            Err(err) => Err(err),
        }
    }

    /// Updates an existing document by id: reads the previous version,
    /// merges when merging is on, and writes the result back. A missing
    /// row degrades to a create.
    async fn update(
        &self,
        config: &StoreConfig,
        map: BTreeMap<String, DocValue>,
        opts: &SaveOpts,
    ) -> Result<DocValue> {
        let Some(DocValue::String(id)) = map.get("id").cloned() else {
            return Err(RqdocError::BadOptions("id must be a string".into()));
        };
        let filter = Filter::ById(id.clone());
        let sql = compiler::compile_select(&self.table, &filter);
        let previous = match self.api.query(config, &sql).await {
            Ok(mut rows) => {
                if rows.is_empty() {
                    None
                } else {
                    Some(rows.remove(0))
                }
            }
            Err(err) if self.ignores_missing_table(config, &err) => {
                self.create_table(config).await?;
                None
            }
            Err(err) => return Err(err),
        };

        let Some(previous) = previous else {
            // Nothing stored under this id yet.
            return self.create(config, map).await;
        };

        let merged = if opts.merge.unwrap_or(config.merge) {
            merge_documents(previous, map)
        } else {
            map
        };
        let doc = DocValue::Object(merged);
        let statement = format!(
            "UPDATE {} SET json = '{}' WHERE id = '{}'",
            compiler::escape_str(&self.table),
            sql_json(&doc),
            id,
        );
        self.api.execute(config, &statement).await?;
        debug!(table = %self.table, %id, "document updated");
        Ok(doc)
    }

    /// Reads one document. A plain id filter goes straight to the
    /// primary key; anything else lists and takes the first match.
    pub async fn load(&self, config: &StoreConfig, filter: &Filter) -> Result<Option<DocValue>> {
        if let Filter::ById(_) = filter {
            let sql = compiler::compile_select(&self.table, filter);
            match self.api.query(config, &sql).await {
                Ok(mut rows) => {
                    if rows.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some(rows.remove(0)))
                    }
                }
                Err(err) if self.ignores_missing_table(config, &err) => Ok(None),
                Err(err) => Err(err),
            }
        } else {
            let mut list = self.list(config, filter, &QueryOpts::default()).await?;
            if list.is_empty() {
                Ok(None)
            } else {
                Ok(Some(list.remove(0)))
            }
        }
    }

    /// Lists documents matching the filter, post-processed in the fixed
    /// sort → skip → limit → fields order.
    pub async fn list(
        &self,
        config: &StoreConfig,
        filter: &Filter,
        opts: &QueryOpts,
    ) -> Result<Vec<DocValue>> {
        let sql = compiler::compile_select(&self.table, filter);
        match self.api.query(config, &sql).await {
            Ok(rows) => Ok(query::apply(rows, opts)),
            Err(err) if self.ignores_missing_table(config, &err) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Removes documents. With `all` and no filter conditions the table
    /// is truncated wholesale; with `all` and conditions every match is
    /// deleted; otherwise only the first match goes, returned when
    /// `load` asks for it.
    pub async fn remove(
        &self,
        config: &StoreConfig,
        filter: &Filter,
        opts: &RemoveOpts,
    ) -> Result<Option<DocValue>> {
        if opts.all {
            if filter.is_empty() {
                self.truncate(config).await?;
            } else {
                let list = self.list(config, filter, &QueryOpts::default()).await?;
                for doc in &list {
                    if let Some(id) = doc.id() {
                        self.delete_by_id(config, id).await?;
                    }
                }
                info!(table = %self.table, count = list.len(), "documents removed");
            }
            return Ok(None);
        }

        let first = if filter.is_empty() {
            let sql = format!(
                "SELECT json FROM {} LIMIT 1",
                compiler::escape_str(&self.table)
            );
            match self.api.query(config, &sql).await {
                Ok(mut rows) => {
                    if rows.is_empty() {
                        None
                    } else {
                        Some(rows.remove(0))
                    }
                }
                Err(err) if self.ignores_missing_table(config, &err) => None,
                Err(err) => return Err(err),
            }
        } else {
            let mut list = self.list(config, filter, &QueryOpts::default()).await?;
            if list.is_empty() {
                None
            } else {
                Some(list.remove(0))
            }
        };

        let Some(doc) = first else {
            return Ok(None);
        };
        let Some(id) = doc.id() else {
            return Ok(None);
        };
        self.delete_by_id(config, id).await?;
        Ok(if opts.load { Some(doc) } else { None })
    }

    async fn delete_by_id(&self, config: &StoreConfig, id: &str) -> Result<()> {
        let statement = format!(
            "DELETE FROM {} {}",
            compiler::escape_str(&self.table),
            compiler::where_clause(&Filter::ById(id.to_string())),
        );
        match self.api.execute(config, &statement).await {
            Ok(()) => Ok(()),
            Err(err) if self.ignores_missing_table(config, &err) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Truncation is a drop/create transaction; the engine has no
    /// TRUNCATE.
    async fn truncate(&self, config: &StoreConfig) -> Result<()> {
        let table = compiler::escape_str(&self.table);
        let transaction = vec![
            format!("DROP TABLE IF EXISTS {table}"),
            format!("CREATE TABLE {table} ({TABLE_SCHEMA})"),
        ];
        self.api.execute_transaction(config, &transaction).await?;
        info!(table = %self.table, "table truncated");
        Ok(())
    }

    async fn create_table(&self, config: &StoreConfig) -> Result<()> {
        let statement = format!(
            "CREATE TABLE {} ({})",
            compiler::escape_str(&self.table),
            TABLE_SCHEMA
        );
        info!(table = %self.table, "creating missing table");
        self.api.execute(config, &statement).await
    }

    /// Whether the config tolerates this error as a missing table:
    /// reads treat it as an empty result, writes create the table and
    /// retry.
    fn ignores_missing_table(&self, config: &StoreConfig, err: &RqdocError) -> bool {
        config.ignore_no_such_table_error && is_no_such_table(err)
    }
}

fn is_no_such_table(err: &RqdocError) -> bool {
    matches!(err, RqdocError::Sql(message) if message.contains(NO_SUCH_TABLE))
}

/// Serializes a document for embedding in a single-quoted SQL literal:
/// JSON text with every `'` doubled.
fn sql_json(doc: &DocValue) -> String {
    doc.to_json_string().replace('\'', "''")
}

/// Previous ⊕ current, current wins on key collisions.
fn merge_documents(
    previous: DocValue,
    current: BTreeMap<String, DocValue>,
) -> BTreeMap<String, DocValue> {
    let mut merged = match previous {
        DocValue::Object(map) => map,
        _ => BTreeMap::new(),
    };
    for (key, value) in current {
        merged.insert(key, value);
    }
    merged
}
