//! Registry owning every [`SampleCategory`] of a run.

use std::collections::HashMap;
use std::path::Path;

use hh_core::{Error, Result};

use crate::category::SampleCategory;
use crate::config::{RawBlock, parse_blocks, parse_bool, parse_exclusive_sf, parse_f64, parse_source};
use crate::enums::{Channel, SampleTag};

/// All sample categories loaded for one channel, in configuration order.
#[derive(Debug, Clone)]
pub struct SampleCategoryRegistry {
    channel: Channel,
    categories: Vec<SampleCategory>,
    by_name: HashMap<String, usize>,
    by_source: HashMap<String, usize>,
}

impl SampleCategoryRegistry {
    /// Parse `config_text`, validate every category as it is read and mark the
    /// categories named in the comma-separated `signal_list` for drawing.
    pub fn load(config_text: &str, signal_list: &str, channel: Channel) -> Result<Self> {
        let mut registry = Self {
            channel,
            categories: Vec::new(),
            by_name: HashMap::new(),
            by_source: HashMap::new(),
        };

        for block in parse_blocks(config_text)? {
            let Some(category) = build_category(&block, channel)? else {
                log::debug!("category '{}' skipped for channel {}", block.name, channel);
                continue;
            };
            registry.insert(category, block.line)?;
        }

        registry.set_draw_for_signals(signal_list)?;
        Ok(registry)
    }

    /// Read the configuration from a file and [`load`](Self::load) it.
    pub fn from_path(path: &Path, signal_list: &str, channel: Channel) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::load(&text, signal_list, channel)
    }

    fn insert(&mut self, category: SampleCategory, line: usize) -> Result<()> {
        self.validate(&category, line)?;
        let idx = self.categories.len();
        for source in category.sources.keys() {
            self.by_source.insert(source.clone(), idx);
        }
        self.by_name.insert(category.name.clone(), idx);
        self.categories.push(category);
        Ok(())
    }

    fn validate(&self, category: &SampleCategory, line: usize) -> Result<()> {
        let name = &category.name;
        if self.by_name.contains_key(name) {
            return Err(Error::config(line, format!("category '{name}' is defined more than once")));
        }

        let has_subs = !category.sub_categories.is_empty();
        if has_subs && !category.is_composite() {
            return Err(Error::config(
                line,
                format!("category '{name}' lists sub-categories but is not of type Composit"),
            ));
        }
        if category.is_composite() && !has_subs {
            return Err(Error::config(
                line,
                format!("composite category '{name}' has no sub-categories"),
            ));
        }
        if category.is_composite() && !category.sources.is_empty() {
            return Err(Error::config(
                line,
                format!("composite category '{name}' must not declare file sources"),
            ));
        }

        for sub in &category.sub_categories {
            let Some(sub_cat) = self.get(sub) else {
                return Err(Error::config(
                    line,
                    format!("sub-category '{sub}' of '{name}' is not defined (before use)"),
                ));
            };
            if sub_cat.is_composite() {
                return Err(Error::config(
                    line,
                    format!("sub-category '{sub}' of '{name}' is itself composite"),
                ));
            }
        }

        for source in category.sources.keys() {
            if let Some(&owner) = self.by_source.get(source) {
                return Err(Error::config(
                    line,
                    format!(
                        "source '{source}' of '{name}' is already claimed by '{}'",
                        self.categories[owner].name
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Set `draw` on each category named in the comma-separated list.
    pub fn set_draw_for_signals(&mut self, signal_list: &str) -> Result<()> {
        for signal in signal_list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some(&idx) = self.by_name.get(signal) else {
                return Err(Error::UndefinedSignal(signal.to_string()));
            };
            self.categories[idx].draw = true;
        }
        Ok(())
    }

    /// Active channel.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Every category in configuration order.
    pub fn all(&self) -> &[SampleCategory] {
        &self.categories
    }

    /// Categories carrying `tag`, in configuration order (possibly empty).
    pub fn with_tag(&self, tag: SampleTag) -> Vec<&SampleCategory> {
        self.categories.iter().filter(|c| c.has_tag(tag)).collect()
    }

    /// The single category carrying `tag`.
    pub fn unique_with_tag(&self, tag: SampleTag) -> Result<&SampleCategory> {
        let matches = self.with_tag(tag);
        match matches.as_slice() {
            [one] => Ok(*one),
            [] => Err(Error::Lookup(format!("no sample category with tag {tag}"))),
            many => Err(Error::Lookup(format!(
                "{} sample categories with tag {tag}: {}",
                many.len(),
                many.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// Like [`unique_with_tag`](Self::unique_with_tag) but absence is not an error.
    pub fn optional_with_tag(&self, tag: SampleTag) -> Result<Option<&SampleCategory>> {
        match self.with_tag(tag).len() {
            0 => Ok(None),
            _ => self.unique_with_tag(tag).map(Some),
        }
    }

    /// Category by name; unknown names are lookup errors.
    pub fn find(&self, name: &str) -> Result<&SampleCategory> {
        self.get(name).ok_or_else(|| Error::Lookup(format!("unknown sample category '{name}'")))
    }

    /// Category by name.
    pub fn get(&self, name: &str) -> Option<&SampleCategory> {
        self.by_name.get(name).map(|&idx| &self.categories[idx])
    }

    /// The category owning `source` and the source's scale factor.
    pub fn category_for_source(&self, source: &str) -> Option<(&SampleCategory, f64)> {
        let category = &self.categories[*self.by_source.get(source)?];
        category.sources.get(source).map(|&sf| (category, sf))
    }

    /// Composite categories in configuration order.
    pub fn composites(&self) -> impl Iterator<Item = &SampleCategory> {
        self.categories.iter().filter(|c| c.is_composite())
    }
}

fn build_category(block: &RawBlock, channel: Channel) -> Result<Option<SampleCategory>> {
    let mut category = SampleCategory::new(block.name.clone());

    for attr in &block.attrs {
        let (value, line) = (attr.value.as_str(), attr.line);
        let wrap = |e: Error| match e {
            Error::Config { message, .. } => Error::config(line, message),
            other => other,
        };
        match attr.key.as_str() {
            "type" => {
                category.tags.insert(value.parse::<SampleTag>().map_err(wrap)?);
            }
            "title" => category.title = value.to_string(),
            "color" => category.color = value.to_string(),
            "file" => {
                let (source, sf) = parse_source(value, line)?;
                if category.sources.insert(source.clone(), sf).is_some() {
                    return Err(Error::config(
                        line,
                        format!("source '{source}' listed twice in '{}'", block.name),
                    ));
                }
            }
            "limits_sf" => category.limits_sf = parse_f64(value, line)?,
            "draw_sf" => category.draw_sf = parse_f64(value, line)?,
            "draw" => category.draw = parse_bool(value, line)?,
            "isCategoryToSubtract" => category.is_subtractable = parse_bool(value, line)?,
            "channel" => {
                category.channels.insert(value.parse::<Channel>().map_err(wrap)?);
            }
            "datacard" => category.datacard = Some(value.to_string()),
            "subcategory" => {
                if value.is_empty() {
                    return Err(Error::config(line, "empty sub-category name"));
                }
                category.sub_categories.push(value.to_string());
            }
            "exclusive_sf" => {
                let (n_jets, sf) = parse_exclusive_sf(value, line)?;
                category.exclusive_sf.insert(n_jets, sf);
            }
            other => {
                return Err(Error::config(line, format!("unknown key '{other}'")));
            }
        }
    }

    if !category.applies_to(channel) {
        return Ok(None);
    }
    Ok(Some(category))
}
