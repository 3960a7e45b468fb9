//! Wolldb – a virtual database composed of configurable data sources.
//!
//! Letters, forms and mail merges draw their sender and recipient data from
//! several backends. Wolldb presents them as one database of keyed records:
//! * A [`dataset::Dataset`] is a keyed, read-only record with values looked up by
//!   column name. A known column may hold no value (`None`); an unknown column
//!   is an error.
//! * A [`source::Datasource`] is a named table with an ordered, duplicate free
//!   [`dataset::Schema`]. It finds datasets by key, by query, or returns all of them.
//! * A [`query::QueryPart`] pairs a column with a search pattern. Patterns compare
//!   case-insensitively and may use `*` for prefix, suffix and substring matches.
//!
//! ## Data sources
//! * [`ram::RamDatasource`] – an in-memory table, also readable from configuration.
//! * [`attach::AttachDatasource`] – joins a second source onto a first one and
//!   exposes its columns as `ATTACH__column`.
//! * [`funky::FunkyDatasource`] – adds columns computed by [`function`]s.
//! * [`source::EmptyDatasource`] – a schema without data.
//!
//! Sources are defined in a configuration tree ([`thingy::Thingy`]) and built in
//! definition order by [`source::DatasourceRegistry::from_config`]. A source may
//! only refer to sources defined before it. Broken definitions are logged and
//! skipped.
//!
//! ## Searching
//! [`search::search`] splits free text into words and picks the query templates
//! of a [`search::SearchStrategy`] for that word count. The
//! [`joiner::DatasourceJoiner`] routes the resulting queries to the named sources
//! and keeps the personal address list (PAL) of chosen senders, which
//! [`pal::PersonalAddressList`] presents to user interfaces.
//!
//! ## Quick Start
//! ```
//! use wolldb::{joiner::DatasourceJoiner, search, source::DatasourceRegistry, thingy::Thingy};
//! let conf = Thingy::parse(r#"
//!   Datenquellen(
//!     Datenquelle(NAME "personal" TYPE "conf"
//!       Schema("OID" "Vorname" "Nachname")
//!       Daten(("1" "Max" "Mustermann") ("2" "Erika" "Musterfrau")))
//!   )
//!   Suchstrategie(personal(Nachname "${suchanfrage1}"))
//! "#).unwrap();
//! let joiner = DatasourceJoiner::new(DatasourceRegistry::from_config(&conf), "personal").unwrap();
//! let strategy = search::SearchStrategy::parse(&conf);
//! let found = search::search("muster.", &strategy, &joiner, false).unwrap();
//! assert_eq!(found.len(), 2);
//! ```

pub mod attach;
pub mod dataset;
pub mod error;
pub mod function;
pub mod funky;
pub mod joiner;
pub mod pal;
pub mod query;
pub mod ram;
pub mod search;
pub mod settings;
pub mod source;
pub mod thingy;

pub use dataset::{Dataset, DatasetRef, Schema};
pub use error::{Result, WolldbError};
pub use source::{Datasource, DatasourceRegistry};
