//! # hh-category
//!
//! The classification taxonomy of the analysis:
//!
//! - closed enumerations for channel, kinematic category, control region,
//!   sub-selection, systematic variation and sample type tags ([`enums`]);
//! - the relaxation and region-pairing maps ([`EnumCatalog`]);
//! - sample categories and the registry that loads and validates them from
//!   the line-based category configuration ([`SampleCategoryRegistry`]).

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod category;
mod config;
pub mod enums;
pub mod registry;

pub use catalog::{EnumCatalog, RegionPairing, RelaxationMap};
pub use category::SampleCategory;
pub use enums::{
    Channel, EnergyScaleSet, EventCategory, EventEnergyScale, EventRegion, EventSubCategory,
    SampleTag, ShiftDirection,
};
pub use registry::SampleCategoryRegistry;
