// used for the fast string keyed maps and sets
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::{HashMap, HashSet};

// used to print out readable forms of a dataset
use std::fmt;
use std::sync::Arc;

use crate::error::{ColumnNotFound, Result, WolldbError};

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// ------------- Schema -------------
/// Ordered, duplicate free list of column names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<String>,
}
impl Schema {
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::<&str, OtherHasher>::default();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(WolldbError::config(format!(
                    "Column \"{}\" appears more than once in the schema",
                    column
                )));
            }
        }
        Ok(Self { columns })
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
    pub fn len(&self) -> usize {
        self.columns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.columns.iter()
    }
    pub fn into_vec(self) -> Vec<String> {
        self.columns
    }
}
impl<'a> IntoIterator for &'a Schema {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;
    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.columns.join(", "))
    }
}

// ------------- Dataset -------------
/// One keyed row of a data source.
///
/// `get` distinguishes a column that exists but holds no value (`Ok(None)`) from a
/// column the owning schema does not know (`Err(ColumnNotFound)`).
pub trait Dataset: fmt::Debug + Send + Sync {
    fn key(&self) -> &str;
    fn get(&self, column: &str) -> std::result::Result<Option<String>, ColumnNotFound>;
}

pub type DatasetRef = Arc<dyn Dataset>;

/// Plain in-memory row. Columns of the schema that were never set read as `None`.
#[derive(Debug, Clone)]
pub struct Row {
    key: String,
    schema: Arc<Schema>,
    values: HashMap<String, String, OtherHasher>,
}
impl Row {
    pub fn new(key: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            key: key.into(),
            schema,
            values: HashMap::default(),
        }
    }
    pub fn set(
        &mut self,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> std::result::Result<(), ColumnNotFound> {
        let column = column.into();
        if !self.schema.contains(&column) {
            return Err(ColumnNotFound(column));
        }
        self.values.insert(column, value.into());
        Ok(())
    }
    pub fn with(
        mut self,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> std::result::Result<Self, ColumnNotFound> {
        self.set(column, value)?;
        Ok(self)
    }
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }
}
impl Dataset for Row {
    fn key(&self) -> &str {
        &self.key
    }
    fn get(&self, column: &str) -> std::result::Result<Option<String>, ColumnNotFound> {
        match self.values.get(column) {
            Some(value) => Ok(Some(value.clone())),
            None if self.schema.contains(column) => Ok(None),
            None => Err(ColumnNotFound(column.to_string())),
        }
    }
}
