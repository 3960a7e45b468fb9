//! In-memory data source.
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::dataset::{DatasetRef, OtherHasher, Row, Schema};
use crate::error::{Result, WolldbError};
use crate::query::{QueryPart, make_predicate};
use crate::source::Datasource;
use crate::thingy::Thingy;

/// Separator between the values of composite keys read from configuration.
pub const KEY_SEPARATOR: &str = "#";

/// A table held entirely in memory and searched by linear scan.
pub struct RamDatasource {
    name: String,
    schema: Schema,
    data: Vec<DatasetRef>,
}

impl RamDatasource {
    /// Takes ownership of schema and data.
    pub fn new(name: impl Into<String>, schema: Schema, data: Vec<DatasetRef>) -> Self {
        Self {
            name: name.into(),
            schema,
            data,
        }
    }

    /// Builds a source from keyed rows of positional values. Every key may occur
    /// only once.
    pub fn from_table<K, R, V>(
        name: impl Into<String>,
        schema: Schema,
        rows: impl IntoIterator<Item = (K, R)>,
    ) -> Result<Self>
    where
        K: Into<String>,
        R: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let name = name.into();
        let shared = Arc::new(schema.clone());
        let mut data: Vec<DatasetRef> = Vec::new();
        let mut seen: HashSet<String, OtherHasher> = HashSet::default();
        for (key, values) in rows {
            let key = key.into();
            if !seen.insert(key.clone()) {
                return Err(WolldbError::config(format!(
                    "Duplicate key \"{}\" in datasource \"{}\"",
                    key, name
                )));
            }
            let values: Vec<String> = values.into_iter().map(Into::into).collect();
            if values.len() != schema.len() {
                return Err(WolldbError::config(format!(
                    "Row \"{}\" has {} values but the schema has {} columns",
                    key,
                    values.len(),
                    schema.len()
                )));
            }
            let mut row = Row::new(key, Arc::clone(&shared));
            for (column, value) in schema.iter().zip(values) {
                row.set(column.as_str(), value)?;
            }
            data.push(Arc::new(row));
        }
        Ok(Self::new(name, schema, data))
    }

    /// Reads a `Datenquelle` of TYPE `conf`:
    ///
    /// ```text
    /// Datenquelle(
    ///   NAME "personal" TYPE "conf"
    ///   Schema("OID" "Vorname" "Nachname")
    ///   Schluessel("OID")
    ///   Daten(("1" "Max" "Mustermann") ("2" "Erika" "Musterfrau"))
    /// )
    /// ```
    ///
    /// Without `Schluessel` the first column is the key. With several key columns
    /// their values are joined by [`KEY_SEPARATOR`].
    pub fn from_config(desc: &Thingy) -> Result<Self> {
        let name = desc
            .require_child("NAME", "NAME of conf datasource is missing")?
            .to_string();
        let schema_node = desc.require_child(
            "Schema",
            format!("Schema of datasource \"{}\" is missing", name),
        )?;
        let schema = Schema::new(schema_node.iter().map(|c| c.to_string()))?;
        if schema.is_empty() {
            return Err(WolldbError::config(format!(
                "Schema of datasource \"{}\" is empty",
                name
            )));
        }

        let key_columns: Vec<usize> = match desc.child("Schluessel") {
            Ok(node) => node
                .iter()
                .map(|c| {
                    let column = c.to_string();
                    schema.iter().position(|s| *s == column).ok_or_else(|| {
                        WolldbError::config(format!(
                            "Key column \"{}\" is not in the schema of \"{}\"",
                            column, name
                        ))
                    })
                })
                .collect::<Result<_>>()?,
            Err(_) => vec![0],
        };
        if key_columns.is_empty() {
            return Err(WolldbError::config(format!(
                "Schluessel of datasource \"{}\" names no column",
                name
            )));
        }

        let mut rows = Vec::new();
        if let Ok(data) = desc.child("Daten") {
            for row in data {
                let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                let key = key_columns
                    .iter()
                    .map(|&i| values.get(i).map(String::as_str).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(KEY_SEPARATOR);
                rows.push((key, values));
            }
        }
        let source = Self::from_table(name, schema, rows)?;
        debug!(name = %source.name, rows = source.data.len(), "Loaded conf datasource");
        Ok(source)
    }
}

impl Datasource for RamDatasource {
    fn name(&self) -> &str {
        &self.name
    }
    fn schema(&self) -> Schema {
        self.schema.clone()
    }
    fn datasets_by_key(&self, keys: &[String]) -> Vec<DatasetRef> {
        let wanted: HashSet<&str, OtherHasher> = keys.iter().map(String::as_str).collect();
        self.data
            .iter()
            .filter(|ds| wanted.contains(ds.key()))
            .cloned()
            .collect()
    }
    fn find(&self, query: &[QueryPart]) -> Vec<DatasetRef> {
        if query.is_empty() {
            return Vec::new();
        }
        let predicate = make_predicate(query);
        let results: Vec<DatasetRef> = self
            .data
            .iter()
            .filter(|ds| predicate.test(ds.as_ref()))
            .cloned()
            .collect();
        debug!(source = %self.name, parts = query.len(), hits = results.len(), "Searched in memory");
        results
    }
    fn contents(&self) -> Vec<DatasetRef> {
        self.data.clone()
    }
}
