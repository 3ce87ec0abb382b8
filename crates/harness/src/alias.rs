//! Named slots for captured indicator values
//!
//! Aliases carry a captured value across an asynchronous boundary so a later
//! assertion can compare "after" against "before". Every slot starts at a
//! defined sentinel; a comparison that reaches the sentinel is a harness
//! defect (the capture never happened), reported distinctly from a product
//! failure. The store is scenario-scoped and owned by the step context -
//! nothing is shared across scenarios or sessions.

use std::collections::HashMap;

use crate::error::{HarnessError, HarnessResult};
use crate::indicator::Indicator;

#[derive(Debug, Default)]
pub struct AliasStore {
    slots: HashMap<String, Indicator>,
}

impl AliasStore {
    /// The "unset" marker: a negative offset no real text-position or
    /// attribute read can produce.
    pub const SENTINEL: Indicator = Indicator::Numeric(-1.0);

    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the named slot to the sentinel.
    pub fn init(&mut self, name: &str) {
        self.slots.insert(name.to_string(), Self::SENTINEL);
    }

    /// Overwrite the named slot with a captured value.
    pub fn capture(&mut self, name: &str, value: Indicator) {
        self.slots.insert(name.to_string(), value);
    }

    /// The last captured value, or the sentinel if never captured.
    pub fn read(&self, name: &str) -> Indicator {
        self.slots.get(name).cloned().unwrap_or(Self::SENTINEL)
    }

    /// The last captured value, refusing to hand out the sentinel.
    ///
    /// Assertions must go through this accessor: comparing against the
    /// sentinel would pass or fail on garbage, so it is surfaced as
    /// [`HarnessError::AliasUnset`] instead.
    pub fn value(&self, name: &str) -> HarnessResult<Indicator> {
        let value = self.read(name);
        if value == Self::SENTINEL {
            Err(HarnessError::AliasUnset(name.to_string()))
        } else {
            Ok(value)
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.read(name) != Self::SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_init_yields_sentinel() {
        let store = AliasStore::new();
        assert_eq!(store.read("currentTextPos"), AliasStore::SENTINEL);
    }

    #[test]
    fn read_after_init_yields_sentinel() {
        let mut store = AliasStore::new();
        store.init("originalTextPos");
        assert_eq!(store.read("originalTextPos"), AliasStore::SENTINEL);
        assert!(!store.is_set("originalTextPos"));
    }

    #[test]
    fn capture_overwrites_and_value_returns_it() {
        let mut store = AliasStore::new();
        store.init("originalTextPos");
        store.capture("originalTextPos", Indicator::Numeric(96.0));
        assert_eq!(
            store.value("originalTextPos").unwrap(),
            Indicator::Numeric(96.0)
        );
        assert!(store.is_set("originalTextPos"));
    }

    #[test]
    fn value_refuses_unset_slot() {
        let mut store = AliasStore::new();
        store.init("originalTextPos");
        let err = store.value("originalTextPos").unwrap_err();
        assert!(matches!(err, HarnessError::AliasUnset(name) if name == "originalTextPos"));
    }

    #[test]
    fn init_resets_a_captured_slot() {
        let mut store = AliasStore::new();
        store.capture("pos", Indicator::Numeric(42.0));
        store.init("pos");
        assert!(store.value("pos").is_err());
    }
}
