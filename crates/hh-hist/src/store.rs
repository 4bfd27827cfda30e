//! Keyed histogram store.
//!
//! Maps an [`AggregationKey`] to a [`HistogramBundle`] holding the named
//! histograms for that key. Writes go through exactly two paths:
//!
//! - create on first touch ([`HistogramStore::get_or_create`], fills);
//! - explicit clone ([`HistogramStore::clone_into`]), which refuses to
//!   overwrite an existing histogram.
//!
//! Nothing is ever replaced implicitly, so every (key, histogram) pair has at
//! most one producer within a pass.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use hh_core::{Error, Result};

use crate::binning::{BinningPolicy, ShapeProvider};
use crate::histogram::Histogram;
use crate::key::AggregationKey;

/// The named histograms stored under one key.
#[derive(Debug, Clone)]
pub struct HistogramBundle {
    policy: BinningPolicy,
    histograms: BTreeMap<String, Histogram>,
}

impl HistogramBundle {
    /// Empty bundle whose histograms are created lazily from `policy`.
    pub fn new(policy: BinningPolicy) -> Self {
        Self { policy, histograms: BTreeMap::new() }
    }

    /// Binning policy of the bundle.
    pub fn policy(&self) -> &BinningPolicy {
        &self.policy
    }

    /// Histogram by name.
    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    /// Mutable histogram by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Histogram> {
        self.histograms.get_mut(name)
    }

    /// Existing histogram, or a new empty one from the policy.
    pub fn get_or_create(&mut self, name: &str) -> Result<&mut Histogram> {
        match self.histograms.entry(name.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let hist = self.policy.create(name).ok_or_else(|| {
                    Error::Lookup(format!("histogram '{name}' is not part of the binning policy"))
                })??;
                Ok(e.insert(hist))
            }
        }
    }

    /// Fill histogram `name`.
    pub fn fill(&mut self, name: &str, x: f64, weight: f64) -> Result<()> {
        self.get_or_create(name)?.fill(x, weight);
        Ok(())
    }

    /// Insert a deep copy of `source` under its own name; fails if present.
    pub fn insert_clone(&mut self, source: &Histogram) -> Result<&mut Histogram> {
        match self.histograms.entry(source.name.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateKey(source.name.clone())),
            Entry::Vacant(e) => Ok(e.insert(source.clone())),
        }
    }

    /// Names of the histograms created so far.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Number of histograms created so far.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Whether no histogram has been created yet.
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

/// All histogram bundles of a run, ordered by key.
pub struct HistogramStore {
    provider: Box<dyn ShapeProvider>,
    bundles: BTreeMap<AggregationKey, HistogramBundle>,
}

impl std::fmt::Debug for HistogramStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramStore").field("bundles", &self.bundles.len()).finish()
    }
}

impl HistogramStore {
    /// Empty store; new bundles take their binning from `provider`.
    pub fn new(provider: impl ShapeProvider + 'static) -> Self {
        Self { provider: Box::new(provider), bundles: BTreeMap::new() }
    }

    /// The bundle at `key`, created empty on first touch.
    pub fn get_or_create(&mut self, key: &AggregationKey) -> &mut HistogramBundle {
        let provider = &self.provider;
        self.bundles
            .entry(key.clone())
            .or_insert_with(|| HistogramBundle::new(provider.binning(key)))
    }

    /// Non-creating read.
    pub fn lookup(&self, key: &AggregationKey) -> Option<&HistogramBundle> {
        self.bundles.get(key)
    }

    /// Histogram `name` at `key`, if it was ever filled or cloned.
    pub fn histogram(&self, key: &AggregationKey, name: &str) -> Option<&Histogram> {
        self.bundles.get(key)?.get(name)
    }

    /// Mutable histogram `name` at `key`.
    pub fn histogram_mut(&mut self, key: &AggregationKey, name: &str) -> Option<&mut Histogram> {
        self.bundles.get_mut(key)?.get_mut(name)
    }

    /// Add `weight` at `x` to histogram `name` under `key`.
    pub fn fill(&mut self, key: &AggregationKey, name: &str, x: f64, weight: f64) -> Result<()> {
        self.get_or_create(key).fill(name, x, weight)
    }

    /// Store a deep copy of `source` at `key`; fails if `key` already holds a
    /// histogram with the same name.
    pub fn clone_into(&mut self, key: &AggregationKey, source: &Histogram) -> Result<&mut Histogram> {
        self.get_or_create(key).insert_clone(source).map_err(|_| {
            Error::DuplicateKey(format!("{key} ({})", source.name))
        })
    }

    /// Number of bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the store holds no bundle.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &AggregationKey> {
        self.bundles.keys()
    }

    /// Bundles in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&AggregationKey, &HistogramBundle)> {
        self.bundles.iter()
    }

    /// Every (path, histogram) pair, with `path = key/histogram`, for the
    /// persistence collaborator.
    pub fn artifacts(&self) -> impl Iterator<Item = (String, &Histogram)> {
        self.bundles.iter().flat_map(|(key, bundle)| {
            bundle.histograms.values().map(move |h| (format!("{key}/{}", h.name), h))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::{DefaultShapeProvider, M_SV};
    use hh_category::{Channel, EventCategory, EventEnergyScale, EventRegion, EventSubCategory};

    fn store() -> HistogramStore {
        HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau))
    }

    fn key(sample: &str) -> AggregationKey {
        AggregationKey::new(
            EventCategory::Inclusive,
            EventSubCategory::NoCuts,
            EventRegion::OsIsolated,
            EventEnergyScale::Central,
            sample,
        )
    }

    #[test]
    fn get_or_create_returns_the_same_entry() {
        let mut store = store();
        let first: *const HistogramBundle = store.get_or_create(&key("TT"));
        let second: *const HistogramBundle = store.get_or_create(&key("TT"));
        assert!(std::ptr::eq(first, second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lookup_does_not_create() {
        let mut store = store();
        assert!(store.lookup(&key("TT")).is_none());
        assert!(store.histogram(&key("TT"), M_SV).is_none());
        assert!(store.is_empty());
        store.fill(&key("TT"), M_SV, 125.0, 0.5).unwrap();
        let h = store.histogram(&key("TT"), M_SV).unwrap();
        assert_eq!(h.integral(false).value, 0.5);
    }

    #[test]
    fn clone_into_refuses_occupied_key() {
        let mut store = store();
        store.fill(&key("DATA"), M_SV, 90.0, 1.0).unwrap();
        let source = store.histogram(&key("DATA"), M_SV).unwrap().clone();

        let copy = store.clone_into(&key("QCD"), &source).unwrap();
        copy.scale(2.0);
        assert_eq!(store.histogram(&key("QCD"), M_SV).unwrap().integral(false).value, 2.0);
        assert_eq!(store.histogram(&key("DATA"), M_SV).unwrap().integral(false).value, 1.0);

        let err = store.clone_into(&key("QCD"), &source).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(ref s) if s.contains("Inclusive/NoCuts/OS_Iso/Central/QCD")));
    }

    #[test]
    fn unknown_histogram_name_is_lookup_error() {
        let mut store = store();
        assert!(matches!(store.fill(&key("TT"), "m_xyz", 1.0, 1.0), Err(Error::Lookup(_))));
    }

    #[test]
    fn artifacts_use_path_names() {
        let mut store = store();
        store.fill(&key("TT"), M_SV, 100.0, 1.0).unwrap();
        let paths: Vec<String> = store.artifacts().map(|(p, _)| p).collect();
        assert_eq!(paths, ["Inclusive/NoCuts/OS_Iso/Central/TT/m_sv"]);
    }
}
