//! Multiplicative uncertainties of signal-region yields.
//!
//! Each calculator returns an [`UncertaintyInterval`] of up/down factors, or
//! `None` when its inputs are absent from the store.

use std::collections::BTreeMap;

use hh_category::{
    EventCategory, EventEnergyScale, EventRegion, EventSubCategory, RelaxationMap,
};
use hh_core::{PhysicalValue, Result};
use hh_hist::{AggregationKey, HistogramStore};
use serde::Serialize;

/// Up and down multiplicative factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UncertaintyInterval {
    /// Factor for the upward shift.
    pub up: f64,
    /// Factor for the downward shift.
    pub down: f64,
}

impl UncertaintyInterval {
    /// `1 ± delta`.
    pub fn symmetric(delta: f64) -> Self {
        Self { up: 1.0 + delta, down: 1.0 - delta }
    }
}

/// Where calculators read their yields.
#[derive(Debug, Clone, Copy)]
pub struct UncertaintyContext<'a> {
    /// Filled and estimated histograms.
    pub store: &'a HistogramStore,
    /// Kinematic category.
    pub category: EventCategory,
    /// Sub-selection.
    pub sub_category: EventSubCategory,
    /// Histogram name.
    pub histogram: &'a str,
}

impl UncertaintyContext<'_> {
    /// Signal-region yield of `sample`.
    pub fn yield_of(&self, sample: &str, energy_scale: EventEnergyScale) -> Option<PhysicalValue> {
        self.yield_at(self.category, self.sub_category, sample, energy_scale)
    }

    fn yield_at(
        &self,
        category: EventCategory,
        sub_category: EventSubCategory,
        sample: &str,
        energy_scale: EventEnergyScale,
    ) -> Option<PhysicalValue> {
        let key = AggregationKey::new(category, sub_category, EventRegion::OsIsolated, energy_scale, sample);
        self.store.histogram(&key, self.histogram).map(|h| h.integral(false))
    }
}

/// One source of uncertainty.
pub trait UncertaintyCalculator {
    /// Name of the nuisance.
    fn name(&self) -> String;

    /// Evaluate in `ctx`; `Ok(None)` when inputs are absent.
    fn evaluate(&self, ctx: &UncertaintyContext<'_>) -> Result<Option<UncertaintyInterval>>;
}

/// Statistical error of a sample's signal-region yield.
#[derive(Debug, Clone)]
pub struct StatisticalUncertainty {
    /// Sample category name.
    pub sample: String,
}

impl UncertaintyCalculator for StatisticalUncertainty {
    fn name(&self) -> String {
        format!("stat_{}", self.sample)
    }

    fn evaluate(&self, ctx: &UncertaintyContext<'_>) -> Result<Option<UncertaintyInterval>> {
        Ok(ctx
            .yield_of(&self.sample, EventEnergyScale::Central)
            .filter(|y| y.value != 0.0)
            .map(|y| UncertaintyInterval::symmetric(y.relative_error())))
    }
}

/// Yield ratio between an up/down variation pair and central.
#[derive(Debug, Clone)]
pub struct EnergyScaleUncertainty {
    /// Sample category name.
    pub sample: String,
    /// Upward variation.
    pub up: EventEnergyScale,
    /// Downward variation.
    pub down: EventEnergyScale,
}

impl UncertaintyCalculator for EnergyScaleUncertainty {
    fn name(&self) -> String {
        let label = self.up.as_str().trim_end_matches("Up");
        format!("scale_{label}_{}", self.sample)
    }

    fn evaluate(&self, ctx: &UncertaintyContext<'_>) -> Result<Option<UncertaintyInterval>> {
        let (Some(central), Some(up), Some(down)) = (
            ctx.yield_of(&self.sample, EventEnergyScale::Central),
            ctx.yield_of(&self.sample, self.up),
            ctx.yield_of(&self.sample, self.down),
        ) else {
            return Ok(None);
        };
        if central.value == 0.0 {
            return Ok(None);
        }
        Ok(Some(UncertaintyInterval { up: up.value / central.value, down: down.value / central.value }))
    }
}

/// Difference between two estimation methods of the same background.
#[derive(Debug, Clone)]
pub struct MethodComparisonUncertainty {
    /// Nominal estimate.
    pub nominal: String,
    /// Alternative estimate.
    pub alternative: String,
}

impl UncertaintyCalculator for MethodComparisonUncertainty {
    fn name(&self) -> String {
        format!("method_{}", self.nominal)
    }

    fn evaluate(&self, ctx: &UncertaintyContext<'_>) -> Result<Option<UncertaintyInterval>> {
        let (Some(nominal), Some(alternative)) = (
            ctx.yield_of(&self.nominal, EventEnergyScale::Central),
            ctx.yield_of(&self.alternative, EventEnergyScale::Central),
        ) else {
            return Ok(None);
        };
        if nominal.value == 0.0 {
            return Ok(None);
        }
        let delta = (alternative.value - nominal.value).abs() / nominal.value;
        Ok(Some(UncertaintyInterval::symmetric(delta)))
    }
}

/// Mass-window efficiency difference between a category and its relaxed partner.
#[derive(Debug, Clone)]
pub struct ExtrapolationUncertainty {
    /// Sample category name.
    pub sample: String,
    /// Tight-to-relaxed category map.
    pub relaxation: RelaxationMap,
}

impl ExtrapolationUncertainty {
    fn window_fraction(&self, ctx: &UncertaintyContext<'_>, category: EventCategory) -> Option<f64> {
        let central = EventEnergyScale::Central;
        let all = ctx.yield_at(category, EventSubCategory::NoCuts, &self.sample, central)?;
        let window = ctx.yield_at(category, EventSubCategory::MassWindow, &self.sample, central)?;
        (all.value != 0.0).then(|| window.value / all.value)
    }
}

impl UncertaintyCalculator for ExtrapolationUncertainty {
    fn name(&self) -> String {
        format!("extrapolation_{}", self.sample)
    }

    fn evaluate(&self, ctx: &UncertaintyContext<'_>) -> Result<Option<UncertaintyInterval>> {
        let relaxed = self.relaxation.relax(ctx.category);
        let (Some(tight), Some(loose)) =
            (self.window_fraction(ctx, ctx.category), self.window_fraction(ctx, relaxed))
        else {
            return Ok(None);
        };
        if tight == 0.0 {
            return Ok(None);
        }
        Ok(Some(UncertaintyInterval::symmetric((tight - loose).abs() / tight)))
    }
}

/// Ordered set of calculators evaluated together.
#[derive(Default)]
pub struct UncertaintyCollection {
    calculators: Vec<Box<dyn UncertaintyCalculator>>,
}

impl UncertaintyCollection {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a calculator.
    pub fn push(&mut self, calculator: impl UncertaintyCalculator + 'static) -> &mut Self {
        self.calculators.push(Box::new(calculator));
        self
    }

    /// Number of calculators.
    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    /// Evaluate every calculator; absent inputs are left out of the map.
    pub fn evaluate(&self, ctx: &UncertaintyContext<'_>) -> Result<BTreeMap<String, UncertaintyInterval>> {
        let mut out = BTreeMap::new();
        for calculator in &self.calculators {
            match calculator.evaluate(ctx)? {
                Some(interval) => {
                    out.insert(calculator.name(), interval);
                }
                None => log::debug!("{}: inputs absent, skipped", calculator.name()),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hh_category::Channel;
    use hh_hist::DefaultShapeProvider;

    fn fill(store: &mut HistogramStore, cat: EventCategory, sub: EventSubCategory, es: EventEnergyScale, sample: &str, w: f64) {
        let key = AggregationKey::new(cat, sub, EventRegion::OsIsolated, es, sample);
        store.fill(&key, "m_sv", 120.0, w).unwrap();
    }

    #[test]
    fn collection_evaluates_every_calculator() {
        use EventCategory::{TwoJetsOneBtag as Tight, TwoJetsOneLooseBtag as Loose};
        use EventEnergyScale::{Central, JetDown, JetUp};
        use EventSubCategory::{MassWindow, NoCuts};

        let mut store = HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau));
        fill(&mut store, Tight, NoCuts, Central, "TT", 4.0);
        fill(&mut store, Tight, NoCuts, Central, "TT", 4.0);
        fill(&mut store, Tight, NoCuts, JetUp, "TT", 8.8);
        fill(&mut store, Tight, NoCuts, JetDown, "TT", 7.6);
        fill(&mut store, Tight, NoCuts, Central, "QCD", 10.0);
        fill(&mut store, Tight, NoCuts, Central, "QCD_alt", 12.0);
        fill(&mut store, Tight, MassWindow, Central, "TT", 4.0);
        fill(&mut store, Loose, NoCuts, Central, "TT", 10.0);
        fill(&mut store, Loose, MassWindow, Central, "TT", 6.0);

        let mut collection = UncertaintyCollection::new();
        collection
            .push(StatisticalUncertainty { sample: "TT".into() })
            .push(EnergyScaleUncertainty { sample: "TT".into(), up: JetUp, down: JetDown })
            .push(MethodComparisonUncertainty { nominal: "QCD".into(), alternative: "QCD_alt".into() })
            .push(ExtrapolationUncertainty { sample: "TT".into(), relaxation: RelaxationMap::tight_to_loose() })
            .push(StatisticalUncertainty { sample: "absent".into() });
        assert_eq!(collection.len(), 5);

        let ctx = UncertaintyContext {
            store: &store,
            category: Tight,
            sub_category: NoCuts,
            histogram: "m_sv",
        };
        let result = collection.evaluate(&ctx).unwrap();
        assert_eq!(result.len(), 4);

        // two fills of 4: sqrt(32) / 8
        assert_relative_eq!(result["stat_TT"].up, 1.0 + 32f64.sqrt() / 8.0);
        assert_relative_eq!(result["scale_Jet_TT"].up, 1.1);
        assert_relative_eq!(result["scale_Jet_TT"].down, 0.95);
        assert_relative_eq!(result["method_QCD"].up, 1.2);
        assert_relative_eq!(result["method_QCD"].down, 0.8);
        // f_tight = 0.5, f_loose = 0.6
        assert_relative_eq!(result["extrapolation_TT"].up, 1.2);
    }
}
