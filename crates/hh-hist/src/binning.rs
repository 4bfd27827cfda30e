//! Binning policies: which histograms a bundle holds and with which edges.

use hh_category::{Channel, EventCategory};
use hh_core::Result;

use crate::histogram::Histogram;
use crate::key::AggregationKey;

/// Di-tau mass reconstructed by the likelihood fit.
pub const M_SV: &str = "m_sv";
/// Visible di-tau mass.
pub const M_VIS: &str = "m_vis";
/// Di-b-jet mass.
pub const M_BB: &str = "m_bb";
/// Four-body mass from the kinematic fit (filled only when it converged).
pub const M_TTBB_KINFIT: &str = "m_ttbb_kinfit";
/// Leading lepton / tau transverse momentum.
pub const PT_1: &str = "pt_1";
/// Sub-leading tau transverse momentum.
pub const PT_2: &str = "pt_2";
/// Transverse mass of the leading leg and missing energy.
pub const MT_1: &str = "mt_1";
/// Missing transverse energy.
pub const MET: &str = "MET";
/// Discriminant of the leading jet.
pub const CSV_1: &str = "csv_1";
/// Discriminant of the sub-leading jet.
pub const CSV_2: &str = "csv_2";

/// Histograms filled for non-central systematic variations.
pub const LIMIT_HISTOGRAMS: &[&str] = &[M_SV, M_TTBB_KINFIT];

/// Which histograms a fill touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramSet {
    /// Every histogram of the policy (central variation).
    Full,
    /// Only the limit-setting histograms (non-central variations).
    Limits,
}

impl HistogramSet {
    /// Whether `name` belongs to the set.
    pub fn contains(self, name: &str) -> bool {
        match self {
            HistogramSet::Full => true,
            HistogramSet::Limits => LIMIT_HISTOGRAMS.contains(&name),
        }
    }
}

/// Name and bin edges of one histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramDef {
    /// Histogram name.
    pub name: &'static str,
    /// Bin edges.
    pub edges: Vec<f64>,
}

/// The set of histograms a bundle is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct BinningPolicy {
    defs: Vec<HistogramDef>,
}

impl BinningPolicy {
    /// Policy from explicit definitions.
    pub fn new(defs: Vec<HistogramDef>) -> Self {
        Self { defs }
    }

    /// Definition for `name`.
    pub fn def(&self, name: &str) -> Option<&HistogramDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// All definitions.
    pub fn defs(&self) -> &[HistogramDef] {
        &self.defs
    }

    /// Empty histogram for `name`; `None` if the policy does not define it.
    pub fn create(&self, name: &str) -> Option<Result<Histogram>> {
        self.def(name).map(|d| Histogram::new(d.name, d.edges.clone()))
    }
}

/// Supplies the binning policy for a newly created store entry.
pub trait ShapeProvider {
    /// Policy for the bundle at `key`.
    fn binning(&self, key: &AggregationKey) -> BinningPolicy;
}

/// Channel-aware default binning; the two-tag category gets a narrower mass range.
#[derive(Debug, Clone, Copy)]
pub struct DefaultShapeProvider {
    channel: Channel,
}

impl DefaultShapeProvider {
    /// Provider for `channel`.
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

fn variable(edges: &[f64]) -> Vec<f64> {
    edges.to_vec()
}

impl ShapeProvider for DefaultShapeProvider {
    fn binning(&self, key: &AggregationKey) -> BinningPolicy {
        let two_tag = matches!(
            key.category,
            EventCategory::TwoJetsTwoBtag | EventCategory::TwoJetsTwoLooseBtag
        );
        let m_sv = if two_tag {
            variable(&[0., 40., 60., 80., 100., 120., 140., 160., 200., 250., 350.])
        } else {
            variable(&[0., 20., 40., 60., 80., 100., 120., 140., 160., 180., 200., 250., 300., 350.])
        };
        let m_ttbb = if two_tag {
            variable(&[200., 250., 270., 290., 310., 330., 350., 370., 390., 410., 430., 450., 500., 550., 600., 700.])
        } else {
            Histogram::uniform_edges(25, 200.0, 700.0)
        };
        let pt_2_max = match self.channel {
            Channel::TauTau => 200.0,
            Channel::ETau | Channel::MuTau => 150.0,
        };

        BinningPolicy::new(vec![
            HistogramDef { name: M_SV, edges: m_sv },
            HistogramDef { name: M_VIS, edges: Histogram::uniform_edges(35, 0.0, 350.0) },
            HistogramDef { name: M_BB, edges: Histogram::uniform_edges(25, 0.0, 500.0) },
            HistogramDef { name: M_TTBB_KINFIT, edges: m_ttbb },
            HistogramDef { name: PT_1, edges: Histogram::uniform_edges(30, 0.0, 300.0) },
            HistogramDef { name: PT_2, edges: Histogram::uniform_edges(30, 0.0, pt_2_max) },
            HistogramDef { name: MT_1, edges: Histogram::uniform_edges(30, 0.0, 150.0) },
            HistogramDef { name: MET, edges: Histogram::uniform_edges(25, 0.0, 250.0) },
            HistogramDef { name: CSV_1, edges: Histogram::uniform_edges(25, 0.0, 1.0) },
            HistogramDef { name: CSV_2, edges: Histogram::uniform_edges(25, 0.0, 1.0) },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hh_category::{EventEnergyScale, EventRegion, EventSubCategory};

    fn key(category: EventCategory) -> AggregationKey {
        AggregationKey::new(
            category,
            EventSubCategory::NoCuts,
            EventRegion::OsIsolated,
            EventEnergyScale::Central,
            "TT",
        )
    }

    #[test]
    fn two_tag_category_gets_narrower_mass_binning() {
        let provider = DefaultShapeProvider::new(Channel::MuTau);
        let incl = provider.binning(&key(EventCategory::Inclusive));
        let tight = provider.binning(&key(EventCategory::TwoJetsTwoBtag));
        let incl_msv = incl.def(M_SV).unwrap();
        let tight_msv = tight.def(M_SV).unwrap();
        assert!(tight_msv.edges.len() < incl_msv.edges.len());
        assert_eq!(tight.defs().len(), incl.defs().len());
    }

    #[test]
    fn every_policy_histogram_is_constructible() {
        let provider = DefaultShapeProvider::new(Channel::TauTau);
        for cat in EventCategory::ALL {
            let policy = provider.binning(&key(*cat));
            for def in policy.defs() {
                assert!(policy.create(def.name).unwrap().is_ok(), "{} in {}", def.name, cat);
            }
        }
        assert!(provider.binning(&key(EventCategory::Inclusive)).create("nope").is_none());
    }

    #[test]
    fn uniform_edges_match_the_histogram_constructor() {
        let policy = DefaultShapeProvider::new(Channel::MuTau).binning(&key(EventCategory::Inclusive));
        let m_vis = policy.create(M_VIS).unwrap().unwrap();
        assert_eq!(m_vis.bin_edges, Histogram::uniform(M_VIS, 35, 0.0, 350.0).unwrap().bin_edges);
    }

    #[test]
    fn limits_set() {
        assert!(HistogramSet::Limits.contains(M_SV));
        assert!(!HistogramSet::Limits.contains(PT_1));
        assert!(HistogramSet::Full.contains(PT_1));
    }
}
