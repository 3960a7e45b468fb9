//! Free text search through configurable search strategies.
//!
//! A [`SearchStrategy`] holds query templates per number of words:
//!
//! ```text
//! Suchstrategie(
//!   personal(Nachname "${suchanfrage1}")
//!   personal(Vorname "${suchanfrage1}" Nachname "${suchanfrage2}")
//!   personal(Nachname "${suchanfrage1}" Vorname "${suchanfrage2}")
//! )
//! ```
//!
//! The input `"Max Muster."` has two words, so both two word templates run with
//! `Max` and `Muster*` filled in. Their results are concatenated in template order.
use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, error};

use crate::dataset::{Dataset, DatasetRef, Schema};
use crate::error::Result;
use crate::joiner::DatasourceJoiner;
use crate::query::{Query, QueryPart};
use crate::thingy::Thingy;

pub const STRATEGY_SECTION: &str = "Suchstrategie";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\$\{suchanfrage(\d+)\}").unwrap();
}

/// Query templates indexed by the number of words they consume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStrategy {
    templates: BTreeMap<usize, Vec<Query>>,
}

impl SearchStrategy {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, word_count: usize, template: Query) {
        self.templates.entry(word_count).or_default().push(template);
    }
    pub fn template(&self, word_count: usize) -> Option<&[Query]> {
        self.templates.get(&word_count).map(Vec::as_slice)
    }
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Reads all `Suchstrategie` sections below `conf`. The word count of a
    /// template is the highest `${suchanfrageN}` it mentions.
    pub fn parse(conf: &Thingy) -> Self {
        let mut strategy = Self::new();
        for section in conf.query(STRATEGY_SECTION) {
            for definition in section {
                let parts: Vec<QueryPart> = definition
                    .iter()
                    .map(|column| QueryPart::new(column.name(), column.to_string()))
                    .collect();
                let word_count = parts
                    .iter()
                    .map(|p| highest_placeholder(p.search_string()))
                    .max()
                    .unwrap_or(0);
                strategy.add(word_count, Query::new(definition.name(), parts));
            }
        }
        strategy
    }
}

fn highest_placeholder(pattern: &str) -> usize {
    PLACEHOLDER
        .captures_iter(pattern)
        .filter_map(|c| c[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

/// Turns user input into words. A trailing `*` or `.` on a word marks a prefix
/// search, every other `*` is dropped.
pub fn format_query(word: &str) -> String {
    let prefix = word.ends_with('*') || word.ends_with('.');
    let mut formatted = word.strip_suffix('.').unwrap_or(word).replace('*', "");
    if prefix {
        formatted.push('*');
    }
    formatted
}

fn words(query_string: &str) -> Vec<String> {
    query_string
        .replace(',', " ")
        .split_whitespace()
        .map(format_query)
        .filter(|w| !w.is_empty())
        .collect()
}

fn resolve_template(template: &Query, words: &[String]) -> Query {
    let parts = template
        .parts()
        .iter()
        .map(|part| {
            let search = PLACEHOLDER.replace_all(part.search_string(), |caps: &Captures| {
                match caps[1].parse::<usize>() {
                    Ok(n) if n >= 1 && n <= words.len() => words[n - 1].clone(),
                    _ => caps[0].to_string(),
                }
            });
            QueryPart::new(part.column(), search.into_owned())
        })
        .collect();
    Query::new(template.datasource_name(), parts)
}

/// The concrete queries for `query_string`. Words are dropped from the end
/// until a template exists for the remaining count.
pub fn parse_query(strategy: &SearchStrategy, query_string: &str) -> Vec<Query> {
    let words = words(query_string);
    let found = (0..=words.len())
        .rev()
        .find_map(|count| strategy.template(count).map(|t| (count, t)));
    match found {
        Some((count, templates)) => templates
            .iter()
            .map(|t| resolve_template(t, &words[..count]))
            .collect(),
        None => Vec::new(),
    }
}

/// Runs `query_string` through `strategy`. With `use_main` every query goes to
/// the main source of `joiner` regardless of the source its template names.
/// Fails if a template names an unknown source.
pub fn search(
    query_string: &str,
    strategy: &SearchStrategy,
    joiner: &DatasourceJoiner,
    use_main: bool,
) -> Result<Vec<DatasetRef>> {
    let mut merged = Vec::new();
    for query in parse_query(strategy, query_string) {
        debug!(query = %query, use_main, "Running search query");
        let results = match (query.number_of_parts(), use_main) {
            (0, true) => joiner.contents_of_main(),
            (0, false) => joiner.contents_of(query.datasource_name())?,
            (_, true) => joiner.find(query.parts()),
            (_, false) => joiner.find_query(&query)?,
        };
        merged.extend(results);
    }
    Ok(merged)
}

/// Exact conjunctive search on the main source.
pub fn search_map<I, K, V>(column_values: I, joiner: &DatasourceJoiner) -> Vec<DatasetRef>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let parts: Vec<QueryPart> = column_values
        .into_iter()
        .map(|(column, value)| QueryPart::new(column, value))
        .collect();
    joiner.find(&parts)
}

/// Whether `fresh` differs from `stored` in any column of `schema`. A value that
/// vanished counts as a change only if the stored value was not empty.
pub fn has_data_changed(stored: &dyn Dataset, fresh: &dyn Dataset, schema: &Schema) -> bool {
    for column in schema {
        match (fresh.get(column), stored.get(column)) {
            (Ok(None), Ok(Some(old))) if !old.is_empty() => return true,
            (Ok(Some(new)), Ok(Some(old))) if new != old => return true,
            (Err(e), _) | (_, Err(e)) => {
                error!(column = %column, error = %e, "Cannot compare datasets");
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_words() {
        assert_eq!(format_query("Muster"), "Muster");
        assert_eq!(format_query("Muster."), "Muster*");
        assert_eq!(format_query("Mu*ster*"), "Muster*");
        assert_eq!(format_query("*Muster"), "Muster");
        assert_eq!(format_query("."), "*");
    }

    #[test]
    fn splits_on_commas_and_whitespace() {
        assert_eq!(words("  Mustermann,Max \t Dr. "), ["Mustermann", "Max", "Dr*"]);
        assert!(words("   ").is_empty());
    }

    #[test]
    fn falls_back_to_fewer_words() {
        let conf = Thingy::parse(
            r#"Suchstrategie(
                 personal(Nachname "${suchanfrage1}")
                 personal(Vorname "${suchanfrage1}" Nachname "${suchanfrage2}")
               )"#,
        )
        .unwrap();
        let strategy = SearchStrategy::parse(&conf);
        assert_eq!(strategy.template(1).map(|t| t.len()), Some(1));
        assert_eq!(strategy.template(2).map(|t| t.len()), Some(1));

        let queries = parse_query(&strategy, "Max Muster Extra");
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].parts()[0], QueryPart::new("Vorname", "Max"));
        assert_eq!(queries[0].parts()[1], QueryPart::new("Nachname", "Muster"));
        assert!(parse_query(&strategy, "").is_empty());
    }

    #[test]
    fn words_are_inserted_literally() {
        let mut strategy = SearchStrategy::new();
        strategy.add(
            1,
            Query::new(
                "s",
                vec![QueryPart::new("A", "${suchanfrage1}-${suchanfrage2}")],
            ),
        );
        let queries = parse_query(&strategy, "$1x");
        assert_eq!(queries[0].parts()[0].search_string(), "$1x-${suchanfrage2}");
    }
}
