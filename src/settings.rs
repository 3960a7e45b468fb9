//! Runtime settings.
//!
//! Read in layers, later ones win:
//! 1. built in defaults
//! 2. `wolldb.toml` in the working directory, or the file given explicitly
//! 3. environment variables prefixed with `WOLLDB_`, e.g. `WOLLDB_MAIN_SOURCE`
use std::fs;
use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::joiner::DatasourceJoiner;
use crate::search::SearchStrategy;
use crate::source::DatasourceRegistry;
use crate::thingy::Thingy;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Configuration tree holding `Datenquellen` and `Suchstrategie`.
    pub conf_file: PathBuf,
    pub main_source: String,
    /// Send every search to the main source.
    pub use_main_source: bool,
    /// Directive for the log filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Settings {
    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("conf_file", "wolldb.conf")?
            .set_default("main_source", "personal")?
            .set_default("use_main_source", false)?
            .set_default("log_filter", "info")?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .add_source(Environment::with_prefix("WOLLDB"))
            .build()?
            .try_deserialize()?;
        debug!(?settings, "Settings loaded");
        Ok(settings)
    }

    /// Loads the settings, from `file` if given (it must then exist), otherwise
    /// from an optional `wolldb.toml`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("wolldb").required(false),
        };
        Self::finish(Self::defaults()?.add_source(source))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::finish(Self::defaults()?.add_source(File::from_str(text, FileFormat::Toml)))
    }

    pub fn read_conf(&self) -> Result<Thingy> {
        let text = fs::read_to_string(&self.conf_file)?;
        Thingy::parse(&text)
    }

    /// Reads the configuration tree and assembles the virtual database and the
    /// search strategy from it.
    pub fn open(&self) -> Result<(DatasourceJoiner, SearchStrategy)> {
        let conf = self.read_conf()?;
        let registry = DatasourceRegistry::from_config(&conf);
        let joiner = DatasourceJoiner::new(registry, &self.main_source)?;
        Ok((joiner, SearchStrategy::parse(&conf)))
    }
}
