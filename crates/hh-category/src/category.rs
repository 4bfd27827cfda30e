//! Sample category: one named group of input sources drawn and estimated together.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::enums::{Channel, SampleTag};

/// A named sample category built from the category configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleCategory {
    /// Unique name.
    pub name: String,
    /// Display title (plotting is external; kept verbatim).
    pub title: String,
    /// Display colour name.
    pub color: String,
    /// Whether the category is drawn (set for signals after load).
    pub draw: bool,
    /// Scale factor applied when drawing.
    pub draw_sf: f64,
    /// Scale factor applied when exporting limit inputs.
    pub limits_sf: f64,
    /// Whether the category is subtracted from data in control regions.
    pub is_subtractable: bool,
    /// Type tags.
    pub tags: BTreeSet<SampleTag>,
    /// Channels the category applies to (empty = all).
    pub channels: BTreeSet<Channel>,
    /// Names of summed sub-categories (composite categories only).
    pub sub_categories: Vec<String>,
    /// Input sources and their scale factors.
    pub sources: BTreeMap<String, f64>,
    /// Extra scale factor per number of extra jets.
    pub exclusive_sf: BTreeMap<usize, f64>,
    /// Name used for the category in limit inputs.
    pub datacard: Option<String>,
}

impl SampleCategory {
    /// An empty category with default scale factors.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            color: String::new(),
            draw: false,
            draw_sf: 1.0,
            limits_sf: 1.0,
            is_subtractable: true,
            tags: BTreeSet::new(),
            channels: BTreeSet::new(),
            sub_categories: Vec::new(),
            sources: BTreeMap::new(),
            exclusive_sf: BTreeMap::new(),
            datacard: None,
        }
    }

    /// Whether the category carries `tag`.
    pub fn has_tag(&self, tag: SampleTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Composite categories sum their sub-categories instead of reading sources.
    pub fn is_composite(&self) -> bool {
        self.has_tag(SampleTag::Composite)
    }

    /// Whether the category applies to `channel`.
    pub fn applies_to(&self, channel: Channel) -> bool {
        self.channels.is_empty() || self.channels.contains(&channel)
    }

    /// Whether the category takes part in background subtraction.
    pub fn subtracts_as_background(&self) -> bool {
        self.has_tag(SampleTag::Background) && !self.is_composite() && self.is_subtractable
    }

    /// Name used in limit inputs (falls back to the category name).
    pub fn datacard_name(&self) -> &str {
        self.datacard.as_deref().unwrap_or(&self.name)
    }

    /// Scale factor for an event with `n_extra_jets` extra jets.
    pub fn extra_jet_sf(&self, n_extra_jets: usize) -> f64 {
        self.exclusive_sf.get(&n_extra_jets).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtractable_background_excludes_composites() {
        let mut bkg = SampleCategory::new("TTbar");
        bkg.tags.insert(SampleTag::Background);
        assert!(bkg.subtracts_as_background());

        bkg.is_subtractable = false;
        assert!(!bkg.subtracts_as_background());

        let mut sum = SampleCategory::new("bkg_sum");
        sum.tags.extend([SampleTag::Background, SampleTag::Composite]);
        assert!(!sum.subtracts_as_background());
    }

    #[test]
    fn channel_filter_and_names() {
        let mut c = SampleCategory::new("ZTT");
        assert!(c.applies_to(Channel::TauTau));
        c.channels.insert(Channel::MuTau);
        assert!(!c.applies_to(Channel::TauTau));
        assert_eq!(c.datacard_name(), "ZTT");
        c.datacard = Some("Ztt".into());
        assert_eq!(c.datacard_name(), "Ztt");
        assert_eq!(c.extra_jet_sf(3), 1.0);
    }
}
