//! Joins a second data source onto a first one.
//!
//! ```text
//! Datenquelle(
//!   TYPE "attach" NAME "mitarbeiter"
//!   SOURCE "personal" ATTACH "telefon"
//!   MATCH("OID" "PersonOID")
//! )
//! ```
//!
//! The schema is the schema of `SOURCE` followed by every column of `ATTACH`
//! prefixed with `ATTACH__`. Each record of `SOURCE` is paired with at most one
//! record of `ATTACH`, found through the `MATCH` column pairs. Records without a
//! partner are kept, their prefixed columns read as `None`.
//!
//! A query that names only prefixed columns runs against `ATTACH` and joins back
//! with full fan-out, so one `ATTACH` record may yield several results there.
use std::sync::Arc;

use tracing::{debug, error};

use crate::dataset::{Dataset, DatasetRef, Schema};
use crate::error::{ColumnNotFound, Result, WolldbError};
use crate::query::{DatasetPredicate, QueryPart, make_predicate};
use crate::source::{Datasource, DatasourceRegistry};
use crate::thingy::Thingy;

pub const CONCAT_SEPARATOR: &str = "__";

#[derive(Debug)]
struct Layout {
    schema: Schema,
    prefix: String,
}

/// A record of the primary source, optionally paired with a secondary record.
#[derive(Debug)]
struct ConcatDataset {
    primary: DatasetRef,
    secondary: Option<DatasetRef>,
    layout: Arc<Layout>,
}
impl Dataset for ConcatDataset {
    fn key(&self) -> &str {
        self.primary.key()
    }
    fn get(&self, column: &str) -> std::result::Result<Option<String>, ColumnNotFound> {
        if !self.layout.schema.contains(column) {
            return Err(ColumnNotFound(column.to_string()));
        }
        match column.strip_prefix(self.layout.prefix.as_str()) {
            Some(attached) => match &self.secondary {
                Some(secondary) => secondary.get(attached),
                None => Ok(None),
            },
            None => self.primary.get(column),
        }
    }
}

pub struct AttachDatasource {
    name: String,
    source: Arc<dyn Datasource>,
    attach: Arc<dyn Datasource>,
    matches: Vec<(String, String)>,
    layout: Arc<Layout>,
}

impl AttachDatasource {
    /// Pairs `source` with `attach`. Each entry of `matches` relates a column of
    /// `source` to a column of `attach`.
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn Datasource>,
        attach: Arc<dyn Datasource>,
        matches: Vec<(String, String)>,
    ) -> Result<Self> {
        let name = name.into();
        if matches.is_empty() {
            return Err(WolldbError::config(format!(
                "Datasource \"{}\" needs at least one MATCH",
                name
            )));
        }
        let schema1 = source.schema();
        let schema2 = attach.schema();
        for (column1, column2) in &matches {
            if !schema1.contains(column1) {
                return Err(WolldbError::config(format!(
                    "MATCH column \"{}\" is not in the schema of \"{}\"",
                    column1,
                    source.name()
                )));
            }
            if !schema2.contains(column2) {
                return Err(WolldbError::config(format!(
                    "MATCH column \"{}\" is not in the schema of \"{}\"",
                    column2,
                    attach.name()
                )));
            }
        }

        // every column starting with the prefix is read from `attach`
        let prefix = format!("{}{}", attach.name(), CONCAT_SEPARATOR);
        if let Some(column) = schema1.iter().find(|c| c.starts_with(prefix.as_str())) {
            return Err(WolldbError::config(format!(
                "Column \"{}\" of \"{}\" collides with the attached columns",
                column,
                source.name()
            )));
        }
        let mut columns = schema1.clone().into_vec();
        columns.extend(schema2.iter().map(|column| format!("{}{}", prefix, column)));
        let layout = Arc::new(Layout {
            schema: Schema::new(columns)?,
            prefix,
        });
        Ok(Self {
            name,
            source,
            attach,
            matches,
            layout,
        })
    }

    pub fn from_config(desc: &Thingy, registry: &DatasourceRegistry) -> Result<Self> {
        let name = desc
            .require_child("NAME", "NAME of attach datasource is missing")?
            .to_string();
        let source_name = desc
            .require_child("SOURCE", format!("SOURCE of \"{}\" is missing", name))?
            .to_string();
        let attach_name = desc
            .require_child("ATTACH", format!("ATTACH of \"{}\" is missing", name))?
            .to_string();
        let source = registry.get(&source_name).ok_or_else(|| {
            WolldbError::config(format!(
                "SOURCE \"{}\" of \"{}\" is not defined (yet)",
                source_name, name
            ))
        })?;
        let attach = registry.get(&attach_name).ok_or_else(|| {
            WolldbError::config(format!(
                "ATTACH \"{}\" of \"{}\" is not defined (yet)",
                attach_name, name
            ))
        })?;

        let mut matches = Vec::new();
        for m in desc.query("MATCH") {
            if m.count() != 2 {
                return Err(WolldbError::config(format!(
                    "MATCH of \"{}\" needs exactly two columns, found {}",
                    name,
                    m.count()
                )));
            }
            matches.push((m.first_child()?.to_string(), m.last_child()?.to_string()));
        }
        Self::new(name, source, attach, matches)
    }

    /// Query parts for the partner source derived from the join columns of
    /// `record`. `None` when a join column holds no value.
    fn correlate(&self, record: &dyn Dataset, reverse: bool) -> Option<Vec<QueryPart>> {
        let mut parts = Vec::with_capacity(self.matches.len());
        for (column1, column2) in &self.matches {
            let (from, to) = if reverse {
                (column2, column1)
            } else {
                (column1, column2)
            };
            match record.get(from) {
                Ok(Some(value)) => parts.push(QueryPart::new(to.as_str(), value)),
                Ok(None) => return None,
                Err(e) => {
                    error!(source = %self.name, error = %e, "Join column lookup failed");
                }
            }
        }
        Some(parts)
    }

    fn concat(&self, primary: DatasetRef, secondary: Option<DatasetRef>) -> DatasetRef {
        Arc::new(ConcatDataset {
            primary,
            secondary,
            layout: Arc::clone(&self.layout),
        })
    }

    fn attach_columns(&self, records: Vec<DatasetRef>, filter: &DatasetPredicate) -> Vec<DatasetRef> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let partners = match self.correlate(record.as_ref(), false) {
                Some(parts) => self.attach.find(&parts),
                None => Vec::new(),
            };
            if partners.is_empty() {
                let joined = self.concat(record, None);
                if filter.test(joined.as_ref()) {
                    results.push(joined);
                }
                continue;
            }
            for partner in partners {
                let joined = self.concat(Arc::clone(&record), Some(partner));
                if filter.test(joined.as_ref()) {
                    results.push(joined);
                    break;
                }
            }
        }
        results
    }

    fn attach_columns_reversed(&self, partners: Vec<DatasetRef>) -> Vec<DatasetRef> {
        let mut results = Vec::new();
        for partner in partners {
            let records = match self.correlate(partner.as_ref(), true) {
                Some(parts) => self.source.find(&parts),
                None => continue,
            };
            for record in records {
                results.push(self.concat(record, Some(Arc::clone(&partner))));
            }
        }
        results
    }
}

impl Datasource for AttachDatasource {
    fn name(&self) -> &str {
        &self.name
    }
    fn schema(&self) -> Schema {
        self.layout.schema.clone()
    }
    fn datasets_by_key(&self, keys: &[String]) -> Vec<DatasetRef> {
        let records = self.source.datasets_by_key(keys);
        self.attach_columns(records, &DatasetPredicate::default())
    }
    fn find(&self, query: &[QueryPart]) -> Vec<DatasetRef> {
        let mut primary = Vec::new();
        let mut prefixed = Vec::new();
        let mut secondary = Vec::new();
        for part in query {
            match part.column().strip_prefix(self.layout.prefix.as_str()) {
                Some(column) => {
                    secondary.push(QueryPart::new(column, part.search_string()));
                    prefixed.push(part.clone());
                }
                None => primary.push(part.clone()),
            }
        }
        let results = if !primary.is_empty() {
            let records = self.source.find(&primary);
            self.attach_columns(records, &make_predicate(&prefixed))
        } else if !secondary.is_empty() {
            let partners = self.attach.find(&secondary);
            self.attach_columns_reversed(partners)
        } else {
            Vec::new()
        };
        debug!(source = %self.name, parts = query.len(), hits = results.len(), "Searched attach join");
        results
    }
    /// Always empty. A full join of both sources is never materialised.
    fn contents(&self) -> Vec<DatasetRef> {
        Vec::new()
    }
}
