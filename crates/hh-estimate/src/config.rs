//! Numeric estimation settings, loaded from YAML (or JSON).

use std::path::Path;

use hh_category::{Channel, EnumCatalog, EventRegion, SampleTag};
use hh_core::{Error, Result};
use hh_hist::FillConfig;
use serde::{Deserialize, Serialize};

use crate::qcd::QcdMethod;

/// QCD estimator settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcdConfig {
    /// Estimator variant; `None` picks the channel default.
    pub method: Option<QcdMethod>,
}

impl QcdConfig {
    /// Variant used for `channel`.
    pub fn method_for(&self, channel: Channel) -> QcdMethod {
        self.method.unwrap_or_else(|| QcdMethod::default_for(channel))
    }
}

/// W+jets estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WJetsConfig {
    /// Low-MT regions to estimate; each needs a high-MT partner in the catalog.
    pub regions: Vec<EventRegion>,
}

impl Default for WJetsConfig {
    fn default() -> Self {
        Self { regions: vec![EventRegion::OsIsolated, EventRegion::SsIsolated] }
    }
}

/// ZTT estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZttConfig {
    /// Region where the embedded sample fixes the normalization.
    pub primary_region: EventRegion,
    /// Subtract the `TT_Embedded` contamination from embedded yields and shapes.
    pub subtract_embedded_contamination: bool,
}

impl Default for ZttConfig {
    fn default() -> Self {
        Self { primary_region: EventRegion::OsIsolated, subtract_embedded_contamination: true }
    }
}

/// One derived category: yields and shapes of `source` written under `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSpec {
    /// Tag of the fine-grained source category.
    pub source: SampleTag,
    /// Tag of the derived category.
    pub target: SampleTag,
}

fn default_derived() -> Vec<DerivedSpec> {
    vec![
        DerivedSpec { source: SampleTag::ZlMc, target: SampleTag::Zl },
        DerivedSpec { source: SampleTag::ZjMc, target: SampleTag::Zj },
    ]
}

/// All numeric knobs of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Floor for bins left negative by background subtraction.
    pub negative_bin_floor: f64,
    /// Classification and fan-out settings of the fill pass.
    pub fill: FillConfig,
    /// QCD settings.
    pub qcd: QcdConfig,
    /// W+jets settings.
    pub wjets: WJetsConfig,
    /// ZTT settings.
    pub ztt: ZttConfig,
    /// Derived categories, built in order.
    pub derived: Vec<DerivedSpec>,
    /// Relaxation and region-pairing maps.
    pub catalog: EnumCatalog,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            negative_bin_floor: 1e-5,
            fill: FillConfig::default(),
            qcd: QcdConfig::default(),
            wjets: WJetsConfig::default(),
            ztt: ZttConfig::default(),
            derived: default_derived(),
            catalog: EnumCatalog::default(),
        }
    }
}

impl EstimationConfig {
    /// Parse YAML (JSON is accepted as a YAML subset).
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML or JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: Self = serde_yaml_ng::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.negative_bin_floor.is_finite() && self.negative_bin_floor > 0.0) {
            return Err(Error::config_rule(format!(
                "negative_bin_floor must be positive, got {}",
                self.negative_bin_floor
            )));
        }
        for region in &self.wjets.regions {
            if self.catalog.high_mt_pairing.high_mt(*region).is_none() {
                return Err(Error::config_rule(format!(
                    "W+jets region {region} has no high-MT partner"
                )));
            }
        }
        Ok(())
    }
}
