//! Sender selection surface on top of the PAL.
//!
//! Entries are presented as display strings carrying the entry key behind
//! [`SENDER_KEY_SEPARATOR`], e.g. `(Chef) Mustermann, Max§§%=%§§4711`.
use std::sync::Arc;

use tracing::{debug, trace};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::joiner::{DatasourceJoiner, PalEntry};

pub const SENDER_KEY_SEPARATOR: &str = "§§%=%§§";

/// Receives the new entry list after every PAL change.
pub trait PalChangeListener: Send + Sync {
    fn pal_changed(&self, entries: &[String]);
}

fn sender_string(entry: &PalEntry) -> String {
    format!("{}{}{}", entry.display(), SENDER_KEY_SEPARATOR, entry.key())
}

/// Splits a sender string back into display text and key.
pub fn split_sender(sender: &str) -> Option<(&str, &str)> {
    sender.rsplit_once(SENDER_KEY_SEPARATOR)
}

pub struct PersonalAddressList {
    joiner: DatasourceJoiner,
    listeners: Vec<Arc<dyn PalChangeListener>>,
}

impl PersonalAddressList {
    pub fn new(joiner: DatasourceJoiner) -> Self {
        Self {
            joiner,
            listeners: Vec::new(),
        }
    }

    pub fn joiner(&self) -> &DatasourceJoiner {
        &self.joiner
    }

    /// Registers `listener` unless the very same listener is already registered.
    pub fn add_listener(&mut self, listener: Arc<dyn PalChangeListener>) {
        if self.listeners.iter().any(|l| same(l, &listener)) {
            trace!("Listener already registered");
            return;
        }
        self.listeners.push(listener);
    }

    pub fn remove_listener(&mut self, listener: &Arc<dyn PalChangeListener>) {
        self.listeners.retain(|l| !same(l, listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The sorted PAL as sender strings.
    pub fn entries(&self) -> Vec<String> {
        self.joiner
            .sorted_pal()
            .into_iter()
            .map(sender_string)
            .collect()
    }

    /// The selected sender, or an empty string if there is none.
    pub fn current_sender(&self) -> String {
        self.joiner
            .selected()
            .map(sender_string)
            .unwrap_or_default()
    }

    pub fn add(&mut self, record: &dyn Dataset) -> String {
        let key = self.joiner.add_to_pal(record);
        self.notify();
        key
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.joiner.remove_from_pal(key);
        if removed {
            self.notify();
        }
        removed
    }

    pub fn select(&mut self, key: &str) -> Result<()> {
        self.joiner.select(key)?;
        self.notify();
        Ok(())
    }

    /// Selects the entry a sender string points to.
    pub fn select_sender(&mut self, sender: &str) -> Result<()> {
        let key = split_sender(sender).map(|(_, key)| key).unwrap_or(sender);
        self.select(key)
    }

    pub fn set_override(&mut self, key: &str, column: &str, value: impl Into<String>) -> Result<()> {
        self.joiner.set_override(key, column, value)?;
        self.notify();
        Ok(())
    }

    pub fn refresh(&mut self) -> usize {
        let refreshed = self.joiner.refresh_pal();
        self.notify();
        refreshed
    }

    fn notify(&self) {
        let entries = self.entries();
        debug!(listeners = self.listeners.len(), entries = entries.len(), "PAL changed");
        for listener in &self.listeners {
            listener.pal_changed(&entries);
        }
    }
}

fn same(a: &Arc<dyn PalChangeListener>, b: &Arc<dyn PalChangeListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
