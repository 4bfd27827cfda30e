//! Event classification and fan-out fills.
//!
//! One event becomes several fills: one per kinematic category it belongs to,
//! one per matching sub-selection (2 to 4), and one per requested systematic
//! variation. Region classification is dispatched once per channel.

use hh_category::{
    Channel, EnergyScaleSet, EventCategory, EventEnergyScale, EventRegion, EventSubCategory,
};
use hh_core::Result;
use serde::{Deserialize, Serialize};

use crate::binning::HistogramSet;
use crate::event::EventRecord;
use crate::key::SelectionMetaKey;
use crate::store::HistogramStore;

/// Open interval `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Lower bound.
    pub min: f64,
    /// Upper bound (exclusive).
    pub max: f64,
}

impl Window {
    /// Whether `x` lies strictly inside the window.
    pub fn contains(&self, x: f64) -> bool {
        x > self.min && x < self.max
    }
}

/// Rectangular two-mass signal window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MassWindow {
    /// Window on the di-tau mass.
    pub m_sv: Window,
    /// Window on the di-b-jet mass.
    pub m_bb: Window,
}

impl Default for MassWindow {
    fn default() -> Self {
        Self { m_sv: Window { min: 90.0, max: 150.0 }, m_bb: Window { min: 70.0, max: 150.0 } }
    }
}

impl MassWindow {
    /// Whether the event lies inside both mass windows.
    pub fn contains(&self, event: &EventRecord) -> bool {
        self.m_sv.contains(event.m_sv) && self.m_bb.contains(event.m_bb)
    }
}

/// Isolation and transverse-mass cuts defining the control regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionCuts {
    /// First-leg isolation below this value is "isolated".
    pub isolated_max: f64,
    /// First-leg isolation in `[min, max)` is "anti-isolated".
    pub anti_isolated: Window,
    /// Low-MT region upper bound (`None` disables the MT split).
    pub low_mt_max: Option<f64>,
    /// High-MT sideband lower bound.
    pub high_mt_min: Option<f64>,
}

impl RegionCuts {
    /// Electron and muon channels: relative isolation, MT split at 30 / 70 GeV.
    pub fn lepton_tau() -> Self {
        Self {
            isolated_max: 0.1,
            anti_isolated: Window { min: 0.2, max: 0.5 },
            low_mt_max: Some(30.0),
            high_mt_min: Some(70.0),
        }
    }

    /// Di-tau channel: raw tau isolation in GeV, no MT split.
    pub fn tau_tau() -> Self {
        Self {
            isolated_max: 1.0,
            anti_isolated: Window { min: 1.0, max: 4.0 },
            low_mt_max: None,
            high_mt_min: None,
        }
    }
}

/// Settings for classification and fan-out fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Signal mass window.
    pub mass_window: MassWindow,
    /// Loose b-tag working point on the discriminant.
    pub loose_btag_wp: f64,
    /// Region cuts for the electron and muon channels.
    pub lepton_regions: RegionCuts,
    /// Region cuts for the di-tau channel.
    pub tautau_regions: RegionCuts,
    /// Systematic variations to fill.
    pub energy_scales: EnergyScaleSet,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            mass_window: MassWindow::default(),
            loose_btag_wp: 0.244,
            lepton_regions: RegionCuts::lepton_tau(),
            tautau_regions: RegionCuts::tau_tau(),
            energy_scales: EnergyScaleSet::CentralOnly,
        }
    }
}

impl FillConfig {
    /// Region cuts for `channel`.
    pub fn region_cuts(&self, channel: Channel) -> &RegionCuts {
        match channel {
            Channel::ETau | Channel::MuTau => &self.lepton_regions,
            Channel::TauTau => &self.tautau_regions,
        }
    }
}

/// Kinematic categories an event belongs to.
pub fn kinematic_categories(event: &EventRecord, loose_btag_wp: f64) -> Vec<EventCategory> {
    let mut categories = vec![EventCategory::Inclusive];
    if event.n_jets < 2 {
        return categories;
    }
    let n_tight = event.n_retagged_bjets.min(2);
    let n_loose = event.csv.iter().take(2).filter(|&&d| d > loose_btag_wp).count();

    categories.push(EventCategory::TwoJetsInclusive);
    categories.push(EventCategory::from_tight_tags(n_tight));
    categories.push(EventCategory::from_loose_tags(n_loose));
    if n_tight >= 1 {
        categories.push(EventCategory::TwoJetsAtLeastOneBtag);
    }
    if n_loose >= 1 {
        categories.push(EventCategory::TwoJetsAtLeastOneLooseBtag);
    }
    categories
}

/// Control region of an event; `None` if it falls between the defined regions.
pub fn classify_region(channel: Channel, event: &EventRecord, cuts: &RegionCuts) -> Option<EventRegion> {
    if !event.tau_isolated {
        return None;
    }
    let iso = event.lepton_isolation;
    let isolated = if iso < cuts.isolated_max {
        true
    } else if iso >= cuts.anti_isolated.min && iso < cuts.anti_isolated.max {
        false
    } else {
        return None;
    };

    let high_mt = if channel.has_mt_split() {
        match (cuts.low_mt_max, cuts.high_mt_min) {
            (Some(low), _) if event.mt < low => false,
            (_, Some(high)) if event.mt > high => true,
            (None, None) => false,
            _ => return None,
        }
    } else {
        false
    };

    Some(EventRegion::from_flags(event.opposite_sign, isolated, high_mt))
}

/// Sub-selections an event enters (always `NoCuts`, between 2 and 4 in total).
pub fn sub_categories(event: &EventRecord, window: &MassWindow) -> Vec<EventSubCategory> {
    let inside = window.contains(event);
    let mut subs = vec![
        EventSubCategory::NoCuts,
        if inside { EventSubCategory::MassWindow } else { EventSubCategory::OutsideMassWindow },
    ];
    if event.kinfit_converged() {
        subs.push(EventSubCategory::KinematicFitConverged);
        subs.push(if inside {
            EventSubCategory::KinematicFitConvergedWithMassWindow
        } else {
            EventSubCategory::KinematicFitConvergedOutsideMassWindow
        });
    }
    subs
}

impl HistogramStore {
    /// Fill every histogram of `set` for each sub-selection the event enters.
    /// Returns the number of sub-selections filled.
    pub fn fill_sub_categories(
        &mut self,
        meta: &SelectionMetaKey,
        event: &EventRecord,
        weight: f64,
        set: HistogramSet,
        window: &MassWindow,
    ) -> Result<usize> {
        let subs = sub_categories(event, window);
        for sub in &subs {
            let bundle = self.get_or_create(&meta.with_sub_category(*sub));
            let names: Vec<&'static str> = bundle
                .policy()
                .defs()
                .iter()
                .map(|d| d.name)
                .filter(|name| set.contains(name))
                .collect();
            for name in names {
                if let Some(x) = event.observable(name) {
                    bundle.fill(name, x, weight)?;
                }
            }
        }
        Ok(subs.len())
    }

    /// Classify and fill one event of `sample` under every requested variation.
    ///
    /// `variations` holds the event as reconstructed under each hypothesis;
    /// `scale` multiplies the per-variation event weight. Central fills the
    /// full histogram set, other variations only the limit histograms.
    /// Returns the number of (category, sub-selection) fills performed.
    pub fn fill_energy_scales(
        &mut self,
        sample: &str,
        variations: &[(EventEnergyScale, &EventRecord)],
        scale: f64,
        config: &FillConfig,
        channel: Channel,
    ) -> Result<usize> {
        let mut n_fills = 0;
        for &(energy_scale, event) in variations {
            if !config.energy_scales.contains(energy_scale) {
                continue;
            }
            if event.weight.is_nan() {
                log::warn!("{sample}: NaN weight under {energy_scale}, variation skipped");
                continue;
            }
            let Some(region) = classify_region(channel, event, config.region_cuts(channel)) else {
                continue;
            };
            let set = if energy_scale == EventEnergyScale::Central {
                HistogramSet::Full
            } else {
                HistogramSet::Limits
            };
            for category in kinematic_categories(event, config.loose_btag_wp) {
                let meta = SelectionMetaKey {
                    category,
                    region,
                    energy_scale,
                    sample: sample.to_string(),
                };
                n_fills += self.fill_sub_categories(
                    &meta,
                    event,
                    event.weight * scale,
                    set,
                    &config.mass_window,
                )?;
            }
        }
        Ok(n_fills)
    }
}
