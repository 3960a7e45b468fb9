//! The virtual database: named data sources, one of them the main source, and
//! the personal address list (PAL) kept in a local override storage.
//!
//! PAL entries are copies of main source records. They keep the key of the
//! record they were copied from, so [`DatasourceJoiner::refresh_pal`] can read
//! them again later. Values set through [`DatasourceJoiner::set_override`] win
//! over copied values and survive refreshes.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dataset::{Dataset, DatasetRef, OtherHasher, Schema};
use crate::error::{ColumnNotFound, Result, WolldbError};
use crate::query::{Query, QueryPart};
use crate::source::{Datasource, DatasourceRegistry};

pub const NACHNAME: &str = "Nachname";
pub const VORNAME: &str = "Vorname";
pub const ROLLE: &str = "Rolle";

#[derive(Debug, Clone)]
pub struct PalEntry {
    key: String,
    schema: Arc<Schema>,
    values: HashMap<String, Option<String>, OtherHasher>,
    overrides: HashMap<String, String, OtherHasher>,
}

impl PalEntry {
    fn copy_of(record: &dyn Dataset, schema: Arc<Schema>) -> Self {
        let mut entry = Self {
            key: record.key().to_string(),
            schema,
            values: HashMap::default(),
            overrides: HashMap::default(),
        };
        entry.reload(record);
        entry
    }

    fn reload(&mut self, record: &dyn Dataset) {
        self.values = self
            .schema
            .iter()
            .map(|column| (column.clone(), record.get(column).ok().flatten()))
            .collect();
    }

    pub fn is_overridden(&self, column: &str) -> bool {
        self.overrides.contains_key(column)
    }

    fn text(&self, column: &str) -> String {
        self.get(column).ok().flatten().unwrap_or_default()
    }

    /// `Nachname, Vorname`, preceded by `(Rolle) ` when a role is set.
    pub fn display(&self) -> String {
        let rolle = self.text(ROLLE);
        let name = format!("{}, {}", self.text(NACHNAME), self.text(VORNAME));
        if rolle.is_empty() {
            name
        } else {
            format!("({}) {}", rolle, name)
        }
    }
}

impl Dataset for PalEntry {
    fn key(&self) -> &str {
        &self.key
    }
    fn get(&self, column: &str) -> std::result::Result<Option<String>, ColumnNotFound> {
        if let Some(value) = self.overrides.get(column) {
            return Ok(Some(value.clone()));
        }
        match self.values.get(column) {
            Some(value) => Ok(value.clone()),
            None => Err(ColumnNotFound(column.to_string())),
        }
    }
}

/// PAL ordering: Nachname, then Vorname, then Rolle, ignoring case.
pub fn sort_pal(a: &PalEntry, b: &PalEntry) -> Ordering {
    [NACHNAME, VORNAME, ROLLE]
        .iter()
        .map(|column| a.text(column).to_lowercase().cmp(&b.text(column).to_lowercase()))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

pub struct DatasourceJoiner {
    registry: DatasourceRegistry,
    main: Arc<dyn Datasource>,
    main_schema: Arc<Schema>,
    pal: Vec<PalEntry>,
    selected: Option<String>,
}

impl DatasourceJoiner {
    pub fn new(registry: DatasourceRegistry, main_source: &str) -> Result<Self> {
        let main = registry.require(main_source)?;
        let main_schema = Arc::new(main.schema());
        info!(main = %main_source, sources = registry.len(), "Virtual database ready");
        Ok(Self {
            registry,
            main,
            main_schema,
            pal: Vec::new(),
            selected: None,
        })
    }

    pub fn registry(&self) -> &DatasourceRegistry {
        &self.registry
    }
    pub fn main_source_name(&self) -> &str {
        self.main.name()
    }
    pub fn main_schema(&self) -> Schema {
        self.main_schema.as_ref().clone()
    }

    pub fn find(&self, parts: &[QueryPart]) -> Vec<DatasetRef> {
        self.main.find(parts)
    }
    pub fn find_query(&self, query: &Query) -> Result<Vec<DatasetRef>> {
        Ok(self
            .registry
            .require(query.datasource_name())?
            .find(query.parts()))
    }
    pub fn contents_of_main(&self) -> Vec<DatasetRef> {
        self.main.contents()
    }
    pub fn contents_of(&self, name: &str) -> Result<Vec<DatasetRef>> {
        Ok(self.registry.require(name)?.contents())
    }

    // ------------- PAL -------------
    /// Copies all main schema columns of `record` into the PAL and returns its key.
    /// A record with a key already in the PAL replaces that entry.
    pub fn add_to_pal(&mut self, record: &dyn Dataset) -> String {
        let entry = PalEntry::copy_of(record, Arc::clone(&self.main_schema));
        let key = entry.key.clone();
        match self.pal.iter_mut().find(|e| e.key == key) {
            Some(existing) => *existing = entry,
            None => self.pal.push(entry),
        }
        key
    }

    pub fn pal(&self) -> &[PalEntry] {
        &self.pal
    }

    pub fn sorted_pal(&self) -> Vec<&PalEntry> {
        let mut entries: Vec<&PalEntry> = self.pal.iter().collect();
        entries.sort_by(|a, b| sort_pal(a, b));
        entries
    }

    pub fn pal_entry(&self, key: &str) -> Option<&PalEntry> {
        self.pal.iter().find(|e| e.key == key)
    }

    pub fn select(&mut self, key: &str) -> Result<()> {
        if self.pal_entry(key).is_none() {
            return Err(WolldbError::DatasetNotFound(key.to_string()));
        }
        self.selected = Some(key.to_string());
        Ok(())
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.as_deref() == Some(key)
    }

    pub fn selected(&self) -> Result<&PalEntry> {
        self.selected
            .as_deref()
            .and_then(|key| self.pal_entry(key))
            .ok_or_else(|| WolldbError::DatasetNotFound("no sender selected".to_string()))
    }

    /// Removes the entry with `key`. Removing the selected entry clears the selection.
    pub fn remove_from_pal(&mut self, key: &str) -> bool {
        let before = self.pal.len();
        self.pal.retain(|e| e.key != key);
        if self.is_selected(key) {
            self.selected = None;
        }
        self.pal.len() != before
    }

    pub fn set_override(&mut self, key: &str, column: &str, value: impl Into<String>) -> Result<()> {
        if !self.main_schema.contains(column) {
            return Err(ColumnNotFound(column.to_string()).into());
        }
        let entry = self
            .pal
            .iter_mut()
            .find(|e| e.key == key)
            .ok_or_else(|| WolldbError::DatasetNotFound(key.to_string()))?;
        entry.overrides.insert(column.to_string(), value.into());
        Ok(())
    }

    /// Reads every PAL entry again from the main source and returns how many were
    /// found. Entries whose key vanished from the main source stay as they are.
    pub fn refresh_pal(&mut self) -> usize {
        let keys: Vec<String> = self.pal.iter().map(|e| e.key.clone()).collect();
        let fresh = self.main.datasets_by_key(&keys);
        let mut refreshed = 0;
        for record in &fresh {
            if let Some(entry) = self.pal.iter_mut().find(|e| e.key == record.key()) {
                entry.reload(record.as_ref());
                refreshed += 1;
            }
        }
        if refreshed < keys.len() {
            debug!(missing = keys.len() - refreshed, "PAL entries not found in main source, kept unchanged");
        }
        refreshed
    }
}
