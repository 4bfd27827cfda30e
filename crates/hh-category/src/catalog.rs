//! Relaxation and region-pairing maps, bundled into an [`EnumCatalog`].
//!
//! The catalog is built once at startup and passed by reference to every
//! estimator that needs to fall back from a tight kinematic category to a
//! looser one, or to find the high transverse-mass partner of a region.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{EventCategory, EventRegion};

/// Mapping from a statistically poor category to a richer one.
///
/// Categories that are not keys relax to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelaxationMap(BTreeMap<EventCategory, EventCategory>);

impl RelaxationMap {
    /// Empty map (every category relaxes to itself).
    pub fn identity() -> Self {
        Self(BTreeMap::new())
    }

    /// The tight-tag to loose-tag fallbacks used by the data-driven estimators.
    pub fn tight_to_loose() -> Self {
        Self::from_pairs([
            (EventCategory::TwoJetsOneBtag, EventCategory::TwoJetsOneLooseBtag),
            (EventCategory::TwoJetsTwoBtag, EventCategory::TwoJetsTwoLooseBtag),
        ])
    }

    /// Build from explicit pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (EventCategory, EventCategory)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Relaxed category for `category`.
    pub fn relax(&self, category: EventCategory) -> EventCategory {
        self.0.get(&category).copied().unwrap_or(category)
    }

    /// Whether `category` has a looser replacement.
    pub fn is_relaxed(&self, category: EventCategory) -> bool {
        self.relax(category) != category
    }
}

/// Pairs each low transverse-mass region with its high-MT sideband.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionPairing(BTreeMap<EventRegion, EventRegion>);

impl Default for RegionPairing {
    fn default() -> Self {
        Self(BTreeMap::from([
            (EventRegion::OsIsolated, EventRegion::OsIsolatedHighMt),
            (EventRegion::SsIsolated, EventRegion::SsIsolatedHighMt),
            (EventRegion::OsAntiIsolated, EventRegion::OsAntiIsolatedHighMt),
            (EventRegion::SsAntiIsolated, EventRegion::SsAntiIsolatedHighMt),
        ]))
    }
}

impl RegionPairing {
    /// High-MT sideband of a low-MT region.
    pub fn high_mt(&self, low: EventRegion) -> Option<EventRegion> {
        self.0.get(&low).copied()
    }

    /// Low-MT partner of a high-MT sideband.
    pub fn low_mt(&self, high: EventRegion) -> Option<EventRegion> {
        self.0.iter().find(|(_, h)| **h == high).map(|(l, _)| *l)
    }

    /// All (low, high) pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (EventRegion, EventRegion)> + '_ {
        self.0.iter().map(|(l, h)| (*l, *h))
    }
}

/// Constructed-once collection of taxonomy maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumCatalog {
    /// Category used for QCD transfer factors.
    pub qcd_ratio_relaxation: RelaxationMap,
    /// Category used for the QCD shape template.
    pub qcd_shape_relaxation: RelaxationMap,
    /// Category used for the W+jets MC ratio and shape.
    pub wjets_relaxation: RelaxationMap,
    /// Category used for derived-category shapes.
    pub derived_shape_relaxation: RelaxationMap,
    /// Low/high transverse-mass pairing.
    pub high_mt_pairing: RegionPairing,
}

impl Default for EnumCatalog {
    fn default() -> Self {
        Self {
            qcd_ratio_relaxation: RelaxationMap::tight_to_loose(),
            qcd_shape_relaxation: RelaxationMap::tight_to_loose(),
            wjets_relaxation: RelaxationMap::tight_to_loose(),
            derived_shape_relaxation: RelaxationMap::tight_to_loose(),
            high_mt_pairing: RegionPairing::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxation_defaults_to_identity() {
        let map = RelaxationMap::tight_to_loose();
        assert_eq!(map.relax(EventCategory::TwoJetsTwoBtag), EventCategory::TwoJetsTwoLooseBtag);
        assert_eq!(map.relax(EventCategory::Inclusive), EventCategory::Inclusive);
        assert!(map.is_relaxed(EventCategory::TwoJetsOneBtag));
        assert!(!RelaxationMap::identity().is_relaxed(EventCategory::TwoJetsOneBtag));
    }

    #[test]
    fn region_pairing_both_directions() {
        let pairing = RegionPairing::default();
        assert_eq!(pairing.high_mt(EventRegion::SsIsolated), Some(EventRegion::SsIsolatedHighMt));
        assert_eq!(pairing.low_mt(EventRegion::OsIsolatedHighMt), Some(EventRegion::OsIsolated));
        assert_eq!(pairing.high_mt(EventRegion::OsIsolatedHighMt), None);
    }

    #[test]
    fn catalog_overrides_from_yaml() {
        let yaml = "qcd_ratio_relaxation:\n  2jets2btag: 2jets\n";
        let catalog: EnumCatalog = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(
            catalog.qcd_ratio_relaxation.relax(EventCategory::TwoJetsTwoBtag),
            EventCategory::TwoJetsInclusive
        );
        // untouched fields keep their defaults
        assert_eq!(
            catalog.wjets_relaxation.relax(EventCategory::TwoJetsTwoBtag),
            EventCategory::TwoJetsTwoLooseBtag
        );
    }
}
