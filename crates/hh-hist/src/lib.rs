//! # hh-hist
//!
//! Histogram aggregation for the analysis.
//!
//! - [`Histogram`]: fixed-edge 1D histogram with per-bin sum of squared weights.
//! - [`HistogramStore`]: bundles of named histograms keyed by
//!   (category, sub-selection, region, variation, sample), created lazily.
//! - [`AggregationPass`]: classifies events and fans them out into the store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binning;
pub mod event;
pub mod fill;
pub mod histogram;
pub mod key;
pub mod pass;
pub mod store;

pub use binning::{BinningPolicy, DefaultShapeProvider, HistogramDef, HistogramSet, ShapeProvider};
pub use event::{EventRecord, EventTruth, KinFitResult};
pub use fill::{FillConfig, MassWindow, RegionCuts, Window};
pub use histogram::{Histogram, HistogramSummary};
pub use key::{AggregationKey, SampleMetaKey, SelectionMetaKey};
pub use pass::{AggregationPass, PassSummary};
pub use store::{HistogramBundle, HistogramStore};
