//! Limit-setting inputs: final signal-region histograms of `Limits` categories.

use hh_category::{
    Channel, EventCategory, EventEnergyScale, EventRegion, EventSubCategory,
    SampleCategoryRegistry, SampleTag,
};
use hh_hist::{AggregationKey, Histogram, HistogramStore};
use serde::Serialize;

/// One histogram handed to the datacard writer.
#[derive(Debug, Clone, Serialize)]
pub struct LimitsEntry {
    /// Process name in the datacard.
    pub datacard_name: String,
    /// Systematic variation.
    pub energy_scale: EventEnergyScale,
    /// Histogram already scaled by the category's `limits_sf`.
    #[serde(skip)]
    pub histogram: Histogram,
}

impl LimitsEntry {
    /// `datacard[_CMS_scale_<suffix>_8TeV(Up|Down)]`.
    pub fn histogram_name(&self, channel: Channel) -> String {
        match self.energy_scale.datacard_suffix(channel) {
            None => self.datacard_name.clone(),
            Some((suffix, direction)) => {
                format!("{}_CMS_scale_{suffix}_8TeV{}", self.datacard_name, direction.as_str())
            }
        }
    }
}

/// Signal-region `hist_name` of every `Limits` category, for each variation present.
pub fn limits_histograms(
    store: &HistogramStore,
    registry: &SampleCategoryRegistry,
    category: EventCategory,
    sub_category: EventSubCategory,
    hist_name: &str,
) -> Vec<LimitsEntry> {
    let mut entries = Vec::new();
    for sample in registry.with_tag(SampleTag::Limits) {
        for &energy_scale in EventEnergyScale::ALL {
            let key = AggregationKey::new(
                category,
                sub_category,
                EventRegion::OsIsolated,
                energy_scale,
                sample.name.as_str(),
            );
            let Some(h) = store.histogram(&key, hist_name) else {
                continue;
            };
            let mut histogram = h.clone();
            histogram.scale(sample.limits_sf);
            entries.push(LimitsEntry {
                datacard_name: sample.datacard_name().to_string(),
                energy_scale,
                histogram,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use hh_hist::DefaultShapeProvider;

    const CATEGORIES: &str = "\
[ggHH]
type: Signal
type: Limits
file: gghh 1
limits_sf: 0.1
datacard: ggHTohhTo2Tau2B

[TT]
type: Background
type: Limits
file: tt 1

[VV]
type: Background
file: vv 1
";

    #[test]
    fn entries_are_scaled_and_named() {
        let registry = SampleCategoryRegistry::load(CATEGORIES, "", Channel::MuTau).unwrap();
        let mut store = HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau));
        let key = |sample: &str, es| {
            AggregationKey::new(
                EventCategory::TwoJetsTwoBtag,
                EventSubCategory::KinematicFitConverged,
                EventRegion::OsIsolated,
                es,
                sample,
            )
        };
        store.fill(&key("ggHH", EventEnergyScale::Central), "m_ttbb_kinfit", 300.0, 20.0).unwrap();
        store.fill(&key("ggHH", EventEnergyScale::TauUp), "m_ttbb_kinfit", 300.0, 22.0).unwrap();
        store.fill(&key("TT", EventEnergyScale::JetDown), "m_ttbb_kinfit", 300.0, 5.0).unwrap();
        store.fill(&key("VV", EventEnergyScale::Central), "m_ttbb_kinfit", 300.0, 1.0).unwrap();

        let entries = limits_histograms(
            &store,
            &registry,
            EventCategory::TwoJetsTwoBtag,
            EventSubCategory::KinematicFitConverged,
            "m_ttbb_kinfit",
        );
        let names: Vec<String> = entries.iter().map(|e| e.histogram_name(Channel::MuTau)).collect();
        assert_eq!(
            names,
            [
                "ggHTohhTo2Tau2B",
                "ggHTohhTo2Tau2B_CMS_scale_t_mutau_8TeVUp",
                "TT_CMS_scale_j_8TeVDown",
            ]
        );
        assert!((entries[0].histogram.integral(false).value - 2.0).abs() < 1e-12);
        assert_eq!(entries[2].histogram.integral(false).value, 5.0);
    }
}
