//! Queries and the predicate engine.
//!
//! A query is a conjunction of [`QueryPart`]s. Each part names a column and a
//! search pattern that is compared case-insensitively with the column value:
//!
//! | pattern | matches                               |
//! |---------|---------------------------------------|
//! | `abc`   | values equal to `abc`                 |
//! | `abc*`  | values starting with `abc`            |
//! | `*abc`  | values ending with `abc`              |
//! | `*abc*` | values containing `abc`               |
//! | `*`     | any value that is present             |
//!
//! A `null` value never matches, neither does a column that the dataset does not know.
use std::fmt;

use crate::dataset::Dataset;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPart {
    column: String,
    search: String,
}
impl QueryPart {
    pub fn new(column: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            search: search.into(),
        }
    }
    pub fn column(&self) -> &str {
        &self.column
    }
    pub fn search_string(&self) -> &str {
        &self.search
    }
}
impl fmt::Display for QueryPart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.column, self.search)
    }
}

/// A list of query parts routed to one named data source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    datasource: String,
    parts: Vec<QueryPart>,
}
impl Query {
    pub fn new(datasource: impl Into<String>, parts: Vec<QueryPart>) -> Self {
        Self {
            datasource: datasource.into(),
            parts,
        }
    }
    pub fn datasource_name(&self) -> &str {
        &self.datasource
    }
    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }
    pub fn number_of_parts(&self) -> usize {
        self.parts.len()
    }
}
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        write!(f, "{}({})", self.datasource, parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}
impl Pattern {
    fn parse(search: &str) -> Self {
        let lower = search.to_lowercase();
        if lower == "*" {
            return Pattern::Contains(String::new());
        }
        match (lower.starts_with('*'), lower.ends_with('*')) {
            (true, true) => Pattern::Contains(lower[1..lower.len() - 1].to_string()),
            (true, false) => Pattern::Suffix(lower[1..].to_string()),
            (false, true) => Pattern::Prefix(lower[..lower.len() - 1].to_string()),
            (false, false) => Pattern::Exact(lower),
        }
    }
    fn matches(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        match self {
            Pattern::Exact(p) => value == *p,
            Pattern::Prefix(p) => value.starts_with(p.as_str()),
            Pattern::Suffix(p) => value.ends_with(p.as_str()),
            Pattern::Contains(p) => value.contains(p.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnTest {
    column: String,
    pattern: Pattern,
}

/// Conjunctive test over datasets. An empty predicate accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetPredicate {
    tests: Vec<ColumnTest>,
}
impl DatasetPredicate {
    /// Both predicates must hold.
    pub fn and(mut self, other: DatasetPredicate) -> Self {
        self.tests.extend(other.tests);
        self
    }
    pub fn is_match_all(&self) -> bool {
        self.tests.is_empty()
    }
    pub fn test(&self, dataset: &dyn Dataset) -> bool {
        self.tests.iter().all(|t| match dataset.get(&t.column) {
            Ok(Some(value)) => t.pattern.matches(&value),
            Ok(None) | Err(_) => false,
        })
    }
}

pub fn match_all() -> DatasetPredicate {
    DatasetPredicate::default()
}

pub fn make_predicate(query: &[QueryPart]) -> DatasetPredicate {
    DatasetPredicate {
        tests: query
            .iter()
            .map(|part| ColumnTest {
                column: part.column.clone(),
                pattern: Pattern::parse(&part.search),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Row, Schema};
    use std::sync::Arc;

    fn person(vorname: &str, nachname: &str) -> Row {
        let schema = Arc::new(Schema::new(["Vorname", "Nachname", "Rolle"]).unwrap());
        Row::new(format!("{vorname}.{nachname}"), schema)
            .with("Vorname", vorname)
            .unwrap()
            .with("Nachname", nachname)
            .unwrap()
    }

    #[test]
    fn patterns() {
        let max = person("Max", "Mustermann");
        let q = |c: &str, s: &str| make_predicate(&[QueryPart::new(c, s)]);
        assert!(q("Vorname", "max").test(&max));
        assert!(q("Vorname", "MAX").test(&max));
        assert!(!q("Vorname", "ma").test(&max));
        assert!(q("Nachname", "muster*").test(&max));
        assert!(q("Nachname", "*MANN").test(&max));
        assert!(q("Nachname", "*sterm*").test(&max));
        assert!(q("Nachname", "*").test(&max));
        assert!(!q("Nachname", "*frau").test(&max));
    }

    #[test]
    fn null_and_unknown_columns_never_match() {
        let max = person("Max", "Mustermann");
        assert!(!make_predicate(&[QueryPart::new("Rolle", "*")]).test(&max));
        assert!(!make_predicate(&[QueryPart::new("Telefon", "*")]).test(&max));
    }

    #[test]
    fn conjunction() {
        let max = person("Max", "Mustermann");
        let both = make_predicate(&[QueryPart::new("Vorname", "m*")])
            .and(make_predicate(&[QueryPart::new("Nachname", "x*")]));
        assert!(!both.test(&max));
        assert!(match_all().test(&max));
        assert!(match_all().is_match_all());
    }
}
