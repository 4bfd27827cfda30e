//! # hh-estimate
//!
//! Data-driven background estimation on a filled [`hh_hist::HistogramStore`].
//!
//! - background subtraction with negative-bin repair ([`subtract`]);
//! - QCD ABCD ([`qcd`]), W+jets sideband ([`wjets`]) and ZTT ([`ztt`]) estimators;
//! - derived and composite categories ([`derived`]);
//! - the ordered [`EstimationPipeline`], limit-input export ([`limits`]) and
//!   uncertainty calculators ([`uncertainty`]).
//!
//! Every invariant violation surfaces as [`hh_core::Error::Estimation`] and
//! aborts the run; absent optional inputs are skipped and logged.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod derived;
pub mod limits;
pub mod pipeline;
pub mod qcd;
pub mod subtract;
pub mod uncertainty;
pub mod wjets;
pub mod ztt;

pub use config::{DerivedSpec, EstimationConfig, QcdConfig, WJetsConfig, ZttConfig};
pub use context::{EstimateRecord, EstimationContext, EstimatorKind, Scope};
pub use limits::{LimitsEntry, limits_histograms};
pub use pipeline::EstimationPipeline;
pub use qcd::{QcdMethod, abcd_yield};
pub use subtract::{renormalize, repair_negative_bins, subtract_backgrounds};
pub use uncertainty::{
    EnergyScaleUncertainty, ExtrapolationUncertainty, MethodComparisonUncertainty,
    StatisticalUncertainty, UncertaintyCalculator, UncertaintyCollection, UncertaintyContext,
    UncertaintyInterval,
};
