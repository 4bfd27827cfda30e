//! What an estimator works on, and the shared inputs it reads.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use hh_category::{
    EventCategory, EventEnergyScale, EventRegion, EventSubCategory, SampleCategoryRegistry,
};
use hh_core::{Error, PhysicalValue};
use hh_hist::{AggregationKey, HistogramStore};
use serde::Serialize;

use crate::config::EstimationConfig;

/// One (kinematic category, sub-selection, variation, histogram) unit of estimation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Scope {
    /// Kinematic category the estimate is written to.
    pub category: EventCategory,
    /// Sub-selection.
    pub sub_category: EventSubCategory,
    /// Systematic variation.
    pub energy_scale: EventEnergyScale,
    /// Histogram name.
    pub histogram: String,
}

impl Scope {
    /// Build a scope.
    pub fn new(
        category: EventCategory,
        sub_category: EventSubCategory,
        energy_scale: EventEnergyScale,
        histogram: impl Into<String>,
    ) -> Self {
        Self { category, sub_category, energy_scale, histogram: histogram.into() }
    }

    /// Every scope with at least one filled histogram in `store`, in order.
    pub fn collect(store: &HistogramStore) -> Vec<Scope> {
        let mut scopes = BTreeSet::new();
        for (key, bundle) in store.iter() {
            for name in bundle.names() {
                scopes.insert(Scope::new(key.category, key.sub_category, key.energy_scale, name));
            }
        }
        scopes.into_iter().collect()
    }

    /// Store key for `sample` in `region` of `category`, sharing this scope's
    /// sub-selection and variation.
    pub fn key(&self, category: EventCategory, region: EventRegion, sample: &str) -> AggregationKey {
        AggregationKey::new(category, self.sub_category, region, self.energy_scale, sample)
    }

    /// Fatal estimation error in `region` of `category`.
    pub fn failure(
        &self,
        category: EventCategory,
        region: EventRegion,
        message: impl Into<String>,
    ) -> Error {
        Error::Estimation {
            histogram: format!("{} ({}/{})", self.histogram, self.sub_category, self.energy_scale),
            category: category.to_string(),
            region: region.to_string(),
            message: message.into(),
        }
    }
}

/// Which estimator produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// W+jets high-MT extrapolation.
    WJets,
    /// True-tau Drell-Yan.
    Ztt,
    /// Derived category.
    Derived,
    /// QCD ABCD method.
    Qcd,
    /// QCD with the non-default ABCD variant.
    QcdAlternative,
    /// Composite sum.
    Composite,
}

/// Numeric breakdown of one estimate, kept for postmortem diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRecord {
    /// Producer.
    pub kind: EstimatorKind,
    /// Where the estimated histogram was written.
    pub key: AggregationKey,
    /// Histogram name.
    pub histogram: String,
    /// Named inputs (control-region yields, ratios).
    pub inputs: BTreeMap<String, PhysicalValue>,
    /// Final yield.
    pub estimate: PhysicalValue,
}

impl EstimateRecord {
    pub(crate) fn new(kind: EstimatorKind, key: AggregationKey, histogram: &str) -> Self {
        Self {
            kind,
            key,
            histogram: histogram.to_string(),
            inputs: BTreeMap::new(),
            estimate: PhysicalValue::ZERO,
        }
    }

    pub(crate) fn input(mut self, name: &str, value: PhysicalValue) -> Self {
        self.inputs.insert(name.to_string(), value);
        self
    }

    pub(crate) fn estimate(mut self, value: PhysicalValue) -> Self {
        self.estimate = value;
        self
    }
}

/// Read-only inputs shared by every estimator of a run.
#[derive(Debug, Clone, Copy)]
pub struct EstimationContext<'a> {
    /// Sample categories.
    pub registry: &'a SampleCategoryRegistry,
    /// Numeric settings.
    pub config: &'a EstimationConfig,
}

impl<'a> EstimationContext<'a> {
    /// Bundle the run inputs.
    pub fn new(registry: &'a SampleCategoryRegistry, config: &'a EstimationConfig) -> Self {
        Self { registry, config }
    }
}
