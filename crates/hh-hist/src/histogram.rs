//! Weighted 1D histogram with per-bin sum of squared weights.

use hh_core::{Error, PhysicalValue, Result};
use serde::Serialize;

/// A 1D histogram accumulating weighted fills.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// Bin edges (length = n_bins + 1, strictly increasing).
    pub bin_edges: Vec<f64>,
    /// Bin contents (sum of weights per bin, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin.
    pub sumw2: Vec<f64>,
    /// Underflow sum of weights.
    pub underflow: f64,
    /// Overflow sum of weights.
    pub overflow: f64,
    /// Underflow sum of weights squared.
    pub underflow_sumw2: f64,
    /// Overflow sum of weights squared.
    pub overflow_sumw2: f64,
    /// Number of fills (including under/overflow).
    pub entries: f64,
}

/// Compact, serializable description of a histogram.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramSummary {
    /// Histogram name.
    pub name: String,
    /// Number of bins.
    pub n_bins: usize,
    /// Number of fills.
    pub entries: f64,
    /// In-range integral.
    pub integral: PhysicalValue,
    /// Number of bins with negative content.
    pub negative_bins: usize,
}

impl Histogram {
    /// Empty histogram over `bin_edges`.
    pub fn new(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        validate_edges(&name, &bin_edges)?;
        let n_bins = bin_edges.len() - 1;
        Ok(Self {
            title: name.clone(),
            name,
            bin_edges,
            bin_content: vec![0.0; n_bins],
            sumw2: vec![0.0; n_bins],
            underflow: 0.0,
            overflow: 0.0,
            underflow_sumw2: 0.0,
            overflow_sumw2: 0.0,
            entries: 0.0,
        })
    }

    /// Empty histogram with `n_bins` equal-width bins over `[x_min, x_max)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Binning("uniform binning needs at least one bin".into()));
        }
        Self::new(name, Self::uniform_edges(n_bins, x_min, x_max))
    }

    /// Edges of `n_bins` equal-width bins over `[x_min, x_max)`.
    pub fn uniform_edges(n_bins: usize, x_min: f64, x_max: f64) -> Vec<f64> {
        let width = (x_max - x_min) / n_bins as f64;
        (0..=n_bins).map(|i| x_min + width * i as f64).collect()
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.bin_content.len()
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.bin_edges[0]
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.bin_edges[self.bin_edges.len() - 1]
    }

    /// Add `weight` at `x`. Values outside the edges go to under/overflow.
    pub fn fill(&mut self, x: f64, weight: f64) {
        let w2 = weight * weight;
        self.entries += 1.0;
        if x < self.x_min() {
            self.underflow += weight;
            self.underflow_sumw2 += w2;
            return;
        }
        match find_bin(&self.bin_edges, x) {
            Some(b) => {
                self.bin_content[b] += weight;
                self.sumw2[b] += w2;
            }
            None => {
                // NaN lands here as well.
                self.overflow += weight;
                self.overflow_sumw2 += w2;
            }
        }
    }

    /// `self += c * other`. Errors combine as `sumw2 += c^2 * sumw2_other`.
    pub fn add(&mut self, other: &Histogram, c: f64) -> Result<()> {
        if !self.same_binning(other) {
            return Err(Error::Binning(format!(
                "cannot add '{}' ({} bins, [{}, {}]) to '{}' ({} bins, [{}, {}])",
                other.name,
                other.n_bins(),
                other.x_min(),
                other.x_max(),
                self.name,
                self.n_bins(),
                self.x_min(),
                self.x_max()
            )));
        }
        let c2 = c * c;
        for i in 0..self.n_bins() {
            self.bin_content[i] += c * other.bin_content[i];
            self.sumw2[i] += c2 * other.sumw2[i];
        }
        self.underflow += c * other.underflow;
        self.overflow += c * other.overflow;
        self.underflow_sumw2 += c2 * other.underflow_sumw2;
        self.overflow_sumw2 += c2 * other.overflow_sumw2;
        self.entries += other.entries;
        Ok(())
    }

    /// Multiply every bin (and under/overflow) by `k`; errors scale by `|k|`.
    pub fn scale(&mut self, k: f64) {
        let k2 = k * k;
        for i in 0..self.n_bins() {
            self.bin_content[i] *= k;
            self.sumw2[i] *= k2;
        }
        self.underflow *= k;
        self.overflow *= k;
        self.underflow_sumw2 *= k2;
        self.overflow_sumw2 *= k2;
    }

    /// Sum of contents with the error summed in quadrature.
    pub fn integral(&self, include_flows: bool) -> PhysicalValue {
        let mut value: f64 = self.bin_content.iter().sum();
        let mut var: f64 = self.sumw2.iter().sum();
        if include_flows {
            value += self.underflow + self.overflow;
            var += self.underflow_sumw2 + self.overflow_sumw2;
        }
        PhysicalValue::new(value, var.sqrt())
    }

    /// Statistical error of bin `i`.
    pub fn bin_error(&self, i: usize) -> f64 {
        self.sumw2[i].sqrt()
    }

    /// Overwrite the content of bin `i`.
    pub fn set_bin_content(&mut self, i: usize, value: f64) {
        self.bin_content[i] = value;
    }

    /// Overwrite the error of bin `i`.
    pub fn set_bin_error(&mut self, i: usize, error: f64) {
        self.sumw2[i] = error * error;
    }

    /// Whether `other` has identical bin edges.
    pub fn same_binning(&self, other: &Histogram) -> bool {
        self.bin_edges == other.bin_edges
    }

    /// Compact serializable description.
    pub fn summary(&self) -> HistogramSummary {
        HistogramSummary {
            name: self.name.clone(),
            n_bins: self.n_bins(),
            entries: self.entries,
            integral: self.integral(false),
            negative_bins: self.bin_content.iter().filter(|&&v| v < 0.0).count(),
        }
    }
}

fn validate_edges(name: &str, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::Binning(format!("'{name}': need at least 2 bin edges, got {}", edges.len())));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(Error::Binning(format!("'{name}': non-finite bin edge")));
    }
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::Binning(format!("'{name}': bin edges must be strictly increasing")));
    }
    Ok(())
}

/// Find the bin index for a value given sorted bin edges.
///
/// Returns `None` for underflow/overflow.
pub(crate) fn find_bin(edges: &[f64], val: f64) -> Option<usize> {
    if !(val >= edges[0] && val < edges[edges.len() - 1]) {
        return None;
    }
    match edges.binary_search_by(|e| e.total_cmp(&val)) {
        Ok(i) => (i < edges.len() - 1).then_some(i),
        Err(i) => (i > 0 && i < edges.len()).then(|| i - 1),
    }
}
