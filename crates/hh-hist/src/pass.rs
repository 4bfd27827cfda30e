//! Aggregation pass: routes events of each input source into the store.

use std::collections::BTreeMap;

use hh_category::{EventEnergyScale, SampleCategory, SampleCategoryRegistry, SampleTag};
use hh_core::{Error, Result};
use serde::Serialize;

use crate::event::{EventRecord, EventTruth};
use crate::fill::FillConfig;
use crate::store::HistogramStore;

/// Event counters of a pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassSummary {
    /// Events that produced at least one fill.
    pub processed: usize,
    /// Events skipped because of a NaN weight.
    pub skipped_nan: usize,
    /// Events outside every control region.
    pub unclassified: usize,
    /// Total (category, sub-selection, variation) fills.
    pub fills: usize,
    /// Processed events per destination sample.
    pub per_sample: BTreeMap<String, usize>,
}

/// Single-threaded fill pass over a shared store.
pub struct AggregationPass<'a> {
    registry: &'a SampleCategoryRegistry,
    config: &'a FillConfig,
    store: &'a mut HistogramStore,
    summary: PassSummary,
}

impl<'a> AggregationPass<'a> {
    /// Pass filling `store` with categories from `registry`.
    pub fn new(
        registry: &'a SampleCategoryRegistry,
        config: &'a FillConfig,
        store: &'a mut HistogramStore,
    ) -> Self {
        Self { registry, config, store, summary: PassSummary::default() }
    }

    /// Counters so far.
    pub fn summary(&self) -> &PassSummary {
        &self.summary
    }

    /// Finish the pass and return its counters.
    pub fn into_summary(self) -> PassSummary {
        self.summary
    }

    /// Destination sample for an event of `category`: DY events are split by truth.
    fn route(&self, category: &'a SampleCategory, truth: EventTruth) -> Result<&'a str> {
        if !category.has_tag(SampleTag::DyJets) {
            return Ok(&category.name);
        }
        let tag = match truth {
            EventTruth::TrueTau => SampleTag::ZttMc,
            EventTruth::TauToLepton => SampleTag::ZttLeptonic,
            EventTruth::LeptonFake => SampleTag::ZlMc,
            EventTruth::JetFake => SampleTag::ZjMc,
            EventTruth::Data | EventTruth::Unknown => return Ok(&category.name),
        };
        Ok(self
            .registry
            .optional_with_tag(tag)?
            .map_or(category.name.as_str(), |c| c.name.as_str()))
    }

    /// Fill one event of `source`, given as its reconstruction under each
    /// systematic variation. The central variation decides routing, weight
    /// scale factors and the NaN skip.
    pub fn process_event(
        &mut self,
        source: &str,
        variations: &[(EventEnergyScale, &EventRecord)],
    ) -> Result<()> {
        let (category, source_sf) = self
            .registry
            .category_for_source(source)
            .ok_or_else(|| Error::Lookup(format!("source '{source}' belongs to no sample category")))?;
        let Some(&(_, central)) = variations.iter().find(|(es, _)| *es == EventEnergyScale::Central)
        else {
            return Err(Error::Lookup(format!("event of '{source}' has no central variation")));
        };
        if central.weight.is_nan() {
            log::warn!("{source}: skipping event with NaN weight");
            self.summary.skipped_nan += 1;
            return Ok(());
        }

        let sample = self.route(category, central.truth)?;
        let scale = source_sf * category.extra_jet_sf(central.n_extra_jets);
        let n = self.store.fill_energy_scales(
            sample,
            variations,
            scale,
            self.config,
            self.registry.channel(),
        )?;
        if n == 0 {
            self.summary.unclassified += 1;
        } else {
            self.summary.processed += 1;
            self.summary.fills += n;
            *self.summary.per_sample.entry(sample.to_string()).or_default() += 1;
        }
        Ok(())
    }

    /// Fill every event of `source` with its central variation only.
    pub fn process_source<'e>(
        &mut self,
        source: &str,
        events: impl IntoIterator<Item = &'e EventRecord>,
    ) -> Result<()> {
        let before = self.summary.clone();
        for event in events {
            self.process_event(source, &[(EventEnergyScale::Central, event)])?;
        }
        log::info!(
            "{source}: {} events processed, {} skipped (NaN weight), {} unclassified",
            self.summary.processed - before.processed,
            self.summary.skipped_nan - before.skipped_nan,
            self.summary.unclassified - before.unclassified,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::{DefaultShapeProvider, M_SV};
    use crate::event::tests::sample_event;
    use crate::key::AggregationKey;
    use approx::assert_relative_eq;
    use hh_category::{Channel, EventCategory, EventRegion, EventSubCategory};

    const CONFIG: &str = "\
[DATA]
type: Data
file: data_2012

[TT]
type: Background
file: tt_semi 0.5
exclusive_sf: 1 2.0

[DY]
type: DYJets
file: dy_jets

[ZTT_MC]
type: ZTT_MC
";

    fn registry() -> SampleCategoryRegistry {
        SampleCategoryRegistry::load(CONFIG, "", Channel::MuTau).unwrap()
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
    fn weights_include_source_and_extra_jet_factors() {
        let registry = registry();
        let config = FillConfig::default();
        let mut store = HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau));
        let mut ev = sample_event();
        ev.n_extra_jets = 1;

        let mut pass = AggregationPass::new(&registry, &config, &mut store);
        pass.process_source("tt_semi", [&ev, &sample_event()]).unwrap();
        let summary = pass.into_summary();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.per_sample["TT"], 2);

        let h = store.histogram(&key("TT"), M_SV).unwrap();
        assert_relative_eq!(h.integral(false).value, 0.5 * 2.0 + 0.5);
    }

    #[test]
    fn dy_events_are_routed_by_truth() {
        let registry = registry();
        let config = FillConfig::default();
        let mut store = HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau));
        let true_tau = sample_event();
        let mut jet_fake = sample_event();
        jet_fake.truth = EventTruth::JetFake;

        let mut pass = AggregationPass::new(&registry, &config, &mut store);
        pass.process_source("dy_jets", [&true_tau, &jet_fake]).unwrap();
        assert_eq!(pass.summary().per_sample["ZTT_MC"], 1);
        // no ZJ_MC category declared: stays in DY
        assert_eq!(pass.summary().per_sample["DY"], 1);
    }

    #[test]
    fn nan_and_unclassified_are_counted() {
        let registry = registry();
        let config = FillConfig::default();
        let mut store = HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau));
        let mut nan = sample_event();
        nan.weight = f64::NAN;
        let mut gap = sample_event();
        gap.mt = 50.0;

        let mut pass = AggregationPass::new(&registry, &config, &mut store);
        pass.process_source("data_2012", [&nan, &gap]).unwrap();
        let summary = pass.into_summary();
        assert_eq!(summary.skipped_nan, 1);
        assert_eq!(summary.unclassified, 1);
        assert_eq!(summary.processed, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_source_is_an_error() {
        let registry = registry();
        let config = FillConfig::default();
        let mut store = HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau));
        let mut pass = AggregationPass::new(&registry, &config, &mut store);
        let ev = sample_event();
        assert!(matches!(pass.process_source("nope", [&ev]), Err(Error::Lookup(_))));
    }
}
