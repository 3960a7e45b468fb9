//! The data source contract and the registry that builds sources from configuration.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::attach::AttachDatasource;
use crate::dataset::{DatasetRef, OtherHasher, Schema};
use crate::error::{Result, WolldbError};
use crate::funky::FunkyDatasource;
use crate::query::QueryPart;
use crate::ram::RamDatasource;
use crate::thingy::Thingy;

/// A named, read-only table of datasets.
///
/// Sources are immutable once built and are shared as `Arc<dyn Datasource>`
/// between the registry, composite sources and searches.
pub trait Datasource: Send + Sync {
    fn name(&self) -> &str;
    /// A copy of the column list. Callers may keep or modify it freely.
    fn schema(&self) -> Schema;
    /// Every dataset whose key is in `keys`. Unknown keys are skipped.
    fn datasets_by_key(&self, keys: &[String]) -> Vec<DatasetRef>;
    /// Datasets matching all parts of `query`. An empty query finds nothing.
    fn find(&self, query: &[QueryPart]) -> Vec<DatasetRef>;
    fn contents(&self) -> Vec<DatasetRef>;
}

/// A source without any data, useful as a placeholder for an unreachable backend.
#[derive(Debug, Clone)]
pub struct EmptyDatasource {
    name: String,
    schema: Schema,
}
impl EmptyDatasource {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
    pub fn from_config(desc: &Thingy) -> Result<Self> {
        let name = desc
            .require_child("NAME", "NAME of dummy datasource is missing")?
            .to_string();
        let columns = match desc.child("Schema") {
            Ok(node) => node.iter().map(|c| c.to_string()).collect(),
            Err(_) => Vec::new(),
        };
        Ok(Self::new(name, Schema::new(columns)?))
    }
}
impl Datasource for EmptyDatasource {
    fn name(&self) -> &str {
        &self.name
    }
    fn schema(&self) -> Schema {
        self.schema.clone()
    }
    fn datasets_by_key(&self, _keys: &[String]) -> Vec<DatasetRef> {
        Vec::new()
    }
    fn find(&self, _query: &[QueryPart]) -> Vec<DatasetRef> {
        Vec::new()
    }
    fn contents(&self) -> Vec<DatasetRef> {
        Vec::new()
    }
}

// ------------- Registry -------------
/// Named data sources in definition order.
#[derive(Clone, Default)]
pub struct DatasourceRegistry {
    sources: HashMap<String, Arc<dyn Datasource>, OtherHasher>,
    order: Vec<String>,
}
impl DatasourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source under its own name and returns the source it replaced, if any.
    pub fn insert(&mut self, source: Arc<dyn Datasource>) -> Option<Arc<dyn Datasource>> {
        let name = source.name().to_string();
        let previous = self.sources.insert(name.clone(), source);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }
    pub fn get(&self, name: &str) -> Option<Arc<dyn Datasource>> {
        self.sources.get(name).cloned()
    }
    pub fn require(&self, name: &str) -> Result<Arc<dyn Datasource>> {
        self.get(name)
            .ok_or_else(|| WolldbError::DatasourceNotFound(name.to_string()))
    }
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }
    pub fn names(&self) -> &[String] {
        &self.order
    }
    pub fn len(&self) -> usize {
        self.order.len()
    }
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Builds a single source from a `Datenquelle` node, resolving references
    /// against the sources registered so far.
    pub fn build(&self, desc: &Thingy) -> Result<Arc<dyn Datasource>> {
        let kind = desc
            .require_child("TYPE", "TYPE of datasource is missing")?
            .to_string();
        let source: Arc<dyn Datasource> = match kind.as_str() {
            "conf" | "ram" => Arc::new(RamDatasource::from_config(desc)?),
            "attach" => Arc::new(AttachDatasource::from_config(desc, self)?),
            "funky" => Arc::new(FunkyDatasource::from_config(desc, self)?),
            "dummy" => Arc::new(EmptyDatasource::from_config(desc)?),
            other => {
                return Err(WolldbError::config(format!(
                    "Unsupported datasource type \"{}\"",
                    other
                )));
            }
        };
        Ok(source)
    }

    /// Reads every `Datenquelle` of every `Datenquellen` section in order.
    /// A definition that fails is logged and skipped, later definitions that
    /// refer to it fail in turn while independent ones stay usable.
    pub fn from_config(conf: &Thingy) -> Self {
        let mut registry = Self::new();
        let definitions = conf
            .query("Datenquellen")
            .into_iter()
            .flat_map(|section| section.iter().filter(|n| n.name() == "Datenquelle"));
        for desc in definitions {
            match registry.build(desc) {
                Ok(source) => {
                    let name = source.name().to_string();
                    debug!(name = %name, columns = source.schema().len(), "Datasource ready");
                    if registry.insert(source).is_some() {
                        info!(name = %name, "Datasource redefined, the later definition wins");
                    }
                }
                Err(e) => {
                    let name = desc
                        .child("NAME")
                        .map(|n| n.to_string())
                        .unwrap_or_else(|_| "<unnamed>".to_string());
                    warn!(name = %name, error = %e, "Skipping datasource definition");
                }
            }
        }
        registry
    }
}
