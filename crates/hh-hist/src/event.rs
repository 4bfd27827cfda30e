//! Per-event input record supplied by the reconstruction step.

use serde::{Deserialize, Serialize};

use crate::binning::{CSV_1, CSV_2, M_BB, M_SV, M_TTBB_KINFIT, M_VIS, MET, MT_1, PT_1, PT_2};

/// Generator-level origin of the reconstructed tau pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventTruth {
    /// Collision data.
    Data,
    /// Genuine hadronic tau.
    TrueTau,
    /// Tau decaying leptonically, reconstructed as the lepton leg.
    TauToLepton,
    /// Electron or muon misidentified as a tau.
    LeptonFake,
    /// Jet misidentified as a tau.
    JetFake,
    /// Not determined.
    #[default]
    Unknown,
}

/// Output of the kinematic fit collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinFitResult {
    /// Whether the fit converged.
    pub converged: bool,
    /// Fitted four-body mass.
    pub mass: f64,
}

/// One selected event under one reconstruction hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event weight (all corrections applied); NaN events are skipped.
    pub weight: f64,
    /// Generator-level classification.
    pub truth: EventTruth,
    /// Opposite electric charge of the two legs.
    pub opposite_sign: bool,
    /// Isolation of the first leg (relative for leptons, raw for taus).
    pub lepton_isolation: f64,
    /// Whether the hadronic tau passes its isolation requirement.
    pub tau_isolated: bool,
    /// Transverse mass of the first leg and missing energy.
    pub mt: f64,
    /// Number of selected jets.
    pub n_jets: usize,
    /// Number of jets beyond the two leading ones (for exclusive scale factors).
    pub n_extra_jets: usize,
    /// B-tag discriminants, leading jets first.
    pub csv: Vec<f64>,
    /// Number of medium b-tags after efficiency retagging.
    pub n_retagged_bjets: usize,
    /// Visible di-tau mass.
    pub m_vis: f64,
    /// Di-tau mass from the likelihood fit.
    pub m_sv: f64,
    /// Di-b-jet mass.
    pub m_bb: f64,
    /// Transverse momentum of the first leg.
    pub pt_1: f64,
    /// Transverse momentum of the second leg.
    pub pt_2: f64,
    /// Missing transverse energy.
    pub met: f64,
    /// Kinematic fit output, if the fit was run.
    pub kinfit: Option<KinFitResult>,
}

impl EventRecord {
    /// Whether the kinematic fit ran and converged.
    pub fn kinfit_converged(&self) -> bool {
        self.kinfit.is_some_and(|k| k.converged)
    }

    /// Value to histogram for `name`; `None` when the observable is undefined
    /// for this event (missing jets, unconverged fit, unknown name).
    pub fn observable(&self, name: &str) -> Option<f64> {
        match name {
            M_SV => Some(self.m_sv),
            M_VIS => Some(self.m_vis),
            M_BB => (self.n_jets >= 2).then_some(self.m_bb),
            M_TTBB_KINFIT => self.kinfit.filter(|k| k.converged).map(|k| k.mass),
            PT_1 => Some(self.pt_1),
            PT_2 => Some(self.pt_2),
            MT_1 => Some(self.mt),
            MET => Some(self.met),
            CSV_1 => self.csv.first().copied(),
            CSV_2 => self.csv.get(1).copied(),
            _ => None,
        }
    }
}
