//! Closed enumerations that make up the histogram taxonomy.
//!
//! Every enumeration has a canonical string name (used in store path names and
//! configuration files), parses back from that name, and is totally ordered by
//! declaration order so it can serve as a composite-key component.

use std::fmt;
use std::str::FromStr;

use hh_core::Error;
use serde::{Deserialize, Serialize};

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok($name::$variant),)+
                    other => Err(Error::config_rule(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

named_enum! {
    /// Final state of the di-tau decay.
    pub enum Channel {
        /// Electron + hadronic tau.
        ETau => "eTau",
        /// Muon + hadronic tau.
        MuTau => "muTau",
        /// Two hadronic taus.
        TauTau => "tauTau",
    }
}

impl Channel {
    /// Lower-case tag used in datacard systematic names.
    pub fn datacard_tag(self) -> &'static str {
        match self {
            Channel::ETau => "etau",
            Channel::MuTau => "mutau",
            Channel::TauTau => "tautau",
        }
    }

    /// Whether the channel splits control regions by transverse mass.
    pub fn has_mt_split(self) -> bool {
        !matches!(self, Channel::TauTau)
    }
}

named_enum! {
    /// Kinematic (jet / b-tag multiplicity) category.
    pub enum EventCategory {
        Inclusive => "Inclusive",
        TwoJetsInclusive => "2jets",
        TwoJetsZeroBtag => "2jets0btag",
        TwoJetsOneBtag => "2jets1btag",
        TwoJetsTwoBtag => "2jets2btag",
        TwoJetsZeroLooseBtag => "2jets0Loosebtag",
        TwoJetsOneLooseBtag => "2jets1Loosebtag",
        TwoJetsTwoLooseBtag => "2jets2Loosebtag",
        TwoJetsAtLeastOneBtag => "2jets_at_least_1btag",
        TwoJetsAtLeastOneLooseBtag => "2jets_at_least_1Loosebtag",
    }
}

impl EventCategory {
    /// Tight (medium working point) tag bin for a two-jet event.
    pub fn from_tight_tags(n_tags: usize) -> Self {
        match n_tags {
            0 => EventCategory::TwoJetsZeroBtag,
            1 => EventCategory::TwoJetsOneBtag,
            _ => EventCategory::TwoJetsTwoBtag,
        }
    }

    /// Loose working point tag bin for a two-jet event.
    pub fn from_loose_tags(n_tags: usize) -> Self {
        match n_tags {
            0 => EventCategory::TwoJetsZeroLooseBtag,
            1 => EventCategory::TwoJetsOneLooseBtag,
            _ => EventCategory::TwoJetsTwoLooseBtag,
        }
    }
}

named_enum! {
    /// Charge-sign x isolation (x transverse mass) control region.
    pub enum EventRegion {
        OsIsolated => "OS_Iso",
        OsAntiIsolated => "OS_AntiIso",
        SsIsolated => "SS_Iso",
        SsAntiIsolated => "SS_AntiIso",
        OsIsolatedHighMt => "OS_Iso_HighMt",
        SsIsolatedHighMt => "SS_Iso_HighMt",
        OsAntiIsolatedHighMt => "OS_AntiIso_HighMt",
        SsAntiIsolatedHighMt => "SS_AntiIso_HighMt",
    }
}

impl EventRegion {
    /// Build a region from its three defining flags.
    pub fn from_flags(opposite_sign: bool, isolated: bool, high_mt: bool) -> Self {
        match (opposite_sign, isolated, high_mt) {
            (true, true, false) => EventRegion::OsIsolated,
            (true, false, false) => EventRegion::OsAntiIsolated,
            (false, true, false) => EventRegion::SsIsolated,
            (false, false, false) => EventRegion::SsAntiIsolated,
            (true, true, true) => EventRegion::OsIsolatedHighMt,
            (false, true, true) => EventRegion::SsIsolatedHighMt,
            (true, false, true) => EventRegion::OsAntiIsolatedHighMt,
            (false, false, true) => EventRegion::SsAntiIsolatedHighMt,
        }
    }

    /// The signal region.
    pub fn is_signal(self) -> bool {
        self == EventRegion::OsIsolated
    }

    /// Whether the region lies in the high transverse-mass sideband.
    pub fn is_high_mt(self) -> bool {
        matches!(
            self,
            EventRegion::OsIsolatedHighMt
                | EventRegion::SsIsolatedHighMt
                | EventRegion::OsAntiIsolatedHighMt
                | EventRegion::SsAntiIsolatedHighMt
        )
    }
}

named_enum! {
    /// Orthogonal cut layer applied within a category and region.
    pub enum EventSubCategory {
        NoCuts => "NoCuts",
        MassWindow => "MassWindow",
        OutsideMassWindow => "OutsideMassWindow",
        KinematicFitConverged => "KinematicFitConverged",
        KinematicFitConvergedWithMassWindow => "KinematicFitConvergedWithMassWindow",
        KinematicFitConvergedOutsideMassWindow => "KinematicFitConvergedOutsideMassWindow",
    }
}

/// Direction of a systematic shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftDirection {
    /// +1 sigma.
    Up,
    /// -1 sigma.
    Down,
}

impl ShiftDirection {
    /// Suffix used in datacard names.
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftDirection::Up => "Up",
            ShiftDirection::Down => "Down",
        }
    }
}

named_enum! {
    /// Reconstruction hypothesis used for a fill.
    pub enum EventEnergyScale {
        Central => "Central",
        TauUp => "TauUp",
        TauDown => "TauDown",
        JetUp => "JetUp",
        JetDown => "JetDown",
        BtagEfficiencyUp => "BtagEfficiencyUp",
        BtagEfficiencyDown => "BtagEfficiencyDown",
        BtagFakeUp => "BtagFakeUp",
        BtagFakeDown => "BtagFakeDown",
    }
}

impl EventEnergyScale {
    /// Datacard systematic suffix and direction; `None` for the central value.
    pub fn datacard_suffix(self, channel: Channel) -> Option<(String, ShiftDirection)> {
        use EventEnergyScale::*;
        let (suffix, dir) = match self {
            Central => return None,
            TauUp => (format!("t_{}", channel.datacard_tag()), ShiftDirection::Up),
            TauDown => (format!("t_{}", channel.datacard_tag()), ShiftDirection::Down),
            JetUp => ("j".to_string(), ShiftDirection::Up),
            JetDown => ("j".to_string(), ShiftDirection::Down),
            BtagEfficiencyUp => ("btagEff".to_string(), ShiftDirection::Up),
            BtagEfficiencyDown => ("btagEff".to_string(), ShiftDirection::Down),
            BtagFakeUp => ("btagFake".to_string(), ShiftDirection::Up),
            BtagFakeDown => ("btagFake".to_string(), ShiftDirection::Down),
        };
        Some((suffix, dir))
    }

    /// Whether this is a jet-energy or b-tag variation.
    pub fn is_jet_or_tag(self) -> bool {
        use EventEnergyScale::*;
        matches!(
            self,
            JetUp | JetDown | BtagEfficiencyUp | BtagEfficiencyDown | BtagFakeUp | BtagFakeDown
        )
    }
}

/// Which systematic variations an event is fanned out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyScaleSet {
    /// Central only.
    #[default]
    CentralOnly,
    /// Central plus jet-energy and b-tag variations.
    CentralJetAndTag,
    /// Every variation.
    All,
}

impl EnergyScaleSet {
    /// Whether `es` belongs to the set.
    pub fn contains(self, es: EventEnergyScale) -> bool {
        match self {
            EnergyScaleSet::CentralOnly => es == EventEnergyScale::Central,
            EnergyScaleSet::CentralJetAndTag => {
                es == EventEnergyScale::Central || es.is_jet_or_tag()
            }
            EnergyScaleSet::All => true,
        }
    }

    /// Members of the set in canonical order.
    pub fn members(self) -> Vec<EventEnergyScale> {
        EventEnergyScale::ALL.iter().copied().filter(|es| self.contains(*es)).collect()
    }
}

named_enum! {
    /// Type tag carried by a sample category.
    pub enum SampleTag {
        Signal => "Signal",
        Background => "Background",
        Data => "Data",
        DyJets => "DYJets",
        Ztt => "ZTT",
        ZttMc => "ZTT_MC",
        ZttLeptonic => "ZTT_L",
        Embedded => "Embedded",
        TtEmbedded => "TT_Embedded",
        Zl => "ZL",
        ZlMc => "ZL_MC",
        Zj => "ZJ",
        ZjMc => "ZJ_MC",
        Qcd => "QCD",
        QcdAlternative => "QCD_alternative",
        WJets => "WJets",
        WJetsMc => "WJets_MC",
        Limits => "Limits",
        Composite => "Composit",
        Sum => "Sum",
    }
}
