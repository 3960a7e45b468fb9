//! A data source that adds computed columns to another source.
//!
//! ```text
//! Datenquelle(
//!   TYPE "funky" NAME "personal_mit_anrede" SOURCE "personal"
//!   Spaltenumsetzung(
//!     Anrede(IF(STRCMP(VALUE "Geschlecht" "w") THEN "Frau" ELSE "Herr"))
//!   )
//! )
//! ```
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dataset::{DatasetRef, Schema};
use crate::error::{Result, WolldbError};
use crate::function::ColumnTransformer;
use crate::query::QueryPart;
use crate::source::{Datasource, DatasourceRegistry};
use crate::thingy::Thingy;

pub const TRANSFORMATION_SECTION: &str = "Spaltenumsetzung";

pub struct FunkyDatasource {
    name: String,
    source: Arc<dyn Datasource>,
    transformer: Arc<ColumnTransformer>,
    schema: Schema,
}

impl FunkyDatasource {
    /// Computed columns come first in the schema. A computed column named like a
    /// column of `source` hides that column.
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn Datasource>,
        transformer: ColumnTransformer,
    ) -> Result<Self> {
        let name = name.into();
        let mut columns = transformer.schema();
        for column in &source.schema() {
            if columns.contains(column) {
                warn!(source = %name, column = %column, "Computed column hides a column of the wrapped source");
            } else {
                columns.push(column.clone());
            }
        }
        Ok(Self {
            name,
            source,
            transformer: Arc::new(transformer),
            schema: Schema::new(columns)?,
        })
    }

    pub fn from_config(desc: &Thingy, registry: &DatasourceRegistry) -> Result<Self> {
        let name = desc
            .require_child("NAME", "NAME of funky datasource is missing")?
            .to_string();
        let source_name = desc
            .require_child("SOURCE", format!("SOURCE of \"{}\" is missing", name))?
            .to_string();
        let source = registry.get(&source_name).ok_or_else(|| {
            WolldbError::config(format!(
                "SOURCE \"{}\" of \"{}\" is not defined (yet)",
                source_name, name
            ))
        })?;
        let transformer = ColumnTransformer::from_config(desc, TRANSFORMATION_SECTION)?;
        debug!(source = %name, computed = transformer.schema().len(), "Read column transformation");
        Self::new(name, source, transformer)
    }

    fn transform(&self, datasets: Vec<DatasetRef>) -> Vec<DatasetRef> {
        ColumnTransformer::transform(&self.transformer, datasets)
    }
}

impl Datasource for FunkyDatasource {
    fn name(&self) -> &str {
        &self.name
    }
    fn schema(&self) -> Schema {
        self.schema.clone()
    }
    fn datasets_by_key(&self, keys: &[String]) -> Vec<DatasetRef> {
        self.transform(self.source.datasets_by_key(keys))
    }
    /// Matches against the values of the wrapped source, not the computed ones.
    fn find(&self, query: &[QueryPart]) -> Vec<DatasetRef> {
        self.transform(self.source.find(query))
    }
    fn contents(&self) -> Vec<DatasetRef> {
        self.transform(self.source.contents())
    }
}
