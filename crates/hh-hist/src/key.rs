//! Composite keys addressing histogram bundles in the store.
//!
//! A full key renders as the path `category/subsel/region/es/sample`, which is
//! also the artifact identifier used when persisting a histogram. Meta-keys
//! leave trailing fields open and render them as `*`.

use std::fmt;
use std::str::FromStr;

use hh_category::{EventCategory, EventEnergyScale, EventRegion, EventSubCategory};
use hh_core::{Error, Result};
use serde::Serialize;

const WILDCARD: &str = "*";

/// Full store key. Ordering is lexicographic over the fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AggregationKey {
    /// Kinematic category.
    pub category: EventCategory,
    /// Sub-selection.
    pub sub_category: EventSubCategory,
    /// Control region.
    pub region: EventRegion,
    /// Systematic variation.
    pub energy_scale: EventEnergyScale,
    /// Sample category name.
    pub sample: String,
}

impl AggregationKey {
    /// Build a key.
    pub fn new(
        category: EventCategory,
        sub_category: EventSubCategory,
        region: EventRegion,
        energy_scale: EventEnergyScale,
        sample: impl Into<String>,
    ) -> Self {
        Self { category, sub_category, region, energy_scale, sample: sample.into() }
    }

    /// Same key for another sample.
    pub fn with_sample(&self, sample: impl Into<String>) -> Self {
        Self { sample: sample.into(), ..self.clone() }
    }

    /// Same key in another region.
    pub fn with_region(&self, region: EventRegion) -> Self {
        Self { region, ..self.clone() }
    }

    /// Same key in another kinematic category.
    pub fn with_category(&self, category: EventCategory) -> Self {
        Self { category, ..self.clone() }
    }

    /// Same key for another sub-selection.
    pub fn with_sub_category(&self, sub_category: EventSubCategory) -> Self {
        Self { sub_category, ..self.clone() }
    }

    /// Same key for another systematic variation.
    pub fn with_energy_scale(&self, energy_scale: EventEnergyScale) -> Self {
        Self { energy_scale, ..self.clone() }
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.category, self.sub_category, self.region, self.energy_scale, self.sample
        )
    }
}

impl FromStr for AggregationKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        let [category, sub_category, region, energy_scale, sample] = parts.as_slice() else {
            return Err(Error::Lookup(format!("malformed histogram path '{s}'")));
        };
        if sample.is_empty() || *sample == WILDCARD {
            return Err(Error::Lookup(format!("histogram path '{s}' has no sample name")));
        }
        Ok(Self {
            category: category.parse()?,
            sub_category: sub_category.parse()?,
            region: region.parse()?,
            energy_scale: energy_scale.parse()?,
            sample: sample.to_string(),
        })
    }
}

/// Key without the sub-selection: the unit an event fan-out starts from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SelectionMetaKey {
    /// Kinematic category.
    pub category: EventCategory,
    /// Control region.
    pub region: EventRegion,
    /// Systematic variation.
    pub energy_scale: EventEnergyScale,
    /// Sample category name.
    pub sample: String,
}

impl SelectionMetaKey {
    /// Complete the key with a sub-selection.
    pub fn with_sub_category(&self, sub_category: EventSubCategory) -> AggregationKey {
        AggregationKey {
            category: self.category,
            sub_category,
            region: self.region,
            energy_scale: self.energy_scale,
            sample: self.sample.clone(),
        }
    }
}

impl fmt::Display for SelectionMetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{WILDCARD}/{}/{}/{}",
            self.category, self.region, self.energy_scale, self.sample
        )
    }
}

/// Key without sub-selection and systematic variation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SampleMetaKey {
    /// Kinematic category.
    pub category: EventCategory,
    /// Control region.
    pub region: EventRegion,
    /// Sample category name.
    pub sample: String,
}

impl SampleMetaKey {
    /// Build a meta-key.
    pub fn new(category: EventCategory, region: EventRegion, sample: impl Into<String>) -> Self {
        Self { category, region, sample: sample.into() }
    }

    /// Fix the systematic variation.
    pub fn with_energy_scale(&self, energy_scale: EventEnergyScale) -> SelectionMetaKey {
        SelectionMetaKey {
            category: self.category,
            region: self.region,
            energy_scale,
            sample: self.sample.clone(),
        }
    }
}

impl fmt::Display for SampleMetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{WILDCARD}/{}/{WILDCARD}/{}", self.category, self.region, self.sample)
    }
}
