//! W+jets estimate from the high transverse-mass sideband.
//!
//! `yield_low = (Data_high - Bkg_high) * (MC_low / MC_high)`, with the MC
//! ratio and the shape taken from the W+jets simulation in the relaxed category.

use hh_category::{EventRegion, SampleCategory, SampleTag};
use hh_core::{Error, PhysicalValue, Result};
use hh_hist::{AggregationKey, Histogram, HistogramStore};

use crate::context::{EstimateRecord, EstimationContext, EstimatorKind, Scope};
use crate::subtract::{background_yield, renormalize};

fn mc_sum(
    store: &HistogramStore,
    samples: &[&SampleCategory],
    at: &AggregationKey,
    name: &str,
) -> Result<Histogram> {
    let mut sum: Option<Histogram> = None;
    for sample in samples {
        let Some(h) = store.histogram(&at.with_sample(sample.name.as_str()), name) else {
            continue;
        };
        match sum.as_mut() {
            Some(total) => total.add(h, 1.0)?,
            None => sum = Some(h.clone()),
        }
    }
    sum.ok_or_else(|| Error::Lookup(format!("{at}/{name}: no W+jets simulation histogram")))
}

/// Estimate W+jets in every configured low-MT region of `scope`.
///
/// Regions whose high-MT data histogram is absent are skipped.
pub fn estimate_wjets(
    ctx: &EstimationContext<'_>,
    store: &mut HistogramStore,
    scope: &Scope,
) -> Result<Vec<EstimateRecord>> {
    let registry = ctx.registry;
    let Some(wjets) = registry.optional_with_tag(SampleTag::WJets)? else {
        return Ok(Vec::new());
    };
    let data = registry.unique_with_tag(SampleTag::Data)?;
    let mc = registry.with_tag(SampleTag::WJetsMc);
    let catalog = &ctx.config.catalog;
    let tight = scope.category;
    let relaxed = catalog.wjets_relaxation.relax(tight);
    let name = scope.histogram.as_str();

    let mut records = Vec::new();
    for &low in &ctx.config.wjets.regions {
        let high = catalog.high_mt_pairing.high_mt(low).ok_or_else(|| {
            Error::Lookup(format!("region {low} has no high-MT partner"))
        })?;
        let Some(data_high) = store.histogram(&scope.key(tight, high, &data.name), name) else {
            log::debug!("{tight}/{high}/{name}: no data, W+jets not estimated");
            continue;
        };
        let data_high = data_high.integral(false);
        let background_high =
            background_yield(store, registry, &scope.key(tight, high, ""), name, &wjets.name);

        let shape_low = mc_sum(store, &mc, &scope.key(relaxed, low, ""), name)?;
        let mc_low = shape_low.integral(false);
        let mc_high = mc_sum(store, &mc, &scope.key(relaxed, high, ""), name)?.integral(false);
        let estimate = extrapolate(data_high, background_high, mc_low, mc_high).ok_or_else(|| {
            scope.failure(relaxed, high, format!("W+jets simulation integral is zero ({mc_high})"))
        })?;
        if estimate.value < 0.0 {
            return Err(scope.failure(
                tight,
                low,
                format!(
                    "negative W+jets yield: ({data_high} - {background_high}) x {mc_low} / {mc_high} = {estimate}"
                ),
            ));
        }

        let target = scope.key(tight, low, &wjets.name);
        let mut shape = shape_low;
        renormalize(&mut shape, estimate, scope, &target)?;
        store.clone_into(&target, &shape)?;
        log::info!(
            "{target}/{name}: W+jets = ({data_high} - {background_high}) x {mc_low} / {mc_high} = {estimate}"
        );
        records.push(
            EstimateRecord::new(EstimatorKind::WJets, target, name)
                .input("data_high_mt", data_high)
                .input("background_high_mt", background_high)
                .input("mc_low_mt", mc_low)
                .input("mc_high_mt", mc_high)
                .estimate(estimate),
        );
    }
    Ok(records)
}

/// `(data_high - background_high) * mc_low / mc_high`; `None` for a zero `mc_high`.
pub fn extrapolate(
    data_high: PhysicalValue,
    background_high: PhysicalValue,
    mc_low: PhysicalValue,
    mc_high: PhysicalValue,
) -> Option<PhysicalValue> {
    mc_low.checked_div(mc_high).map(|ratio| (data_high - background_high) * ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sideband_extrapolation() {
        let y = extrapolate(
            PhysicalValue::exact(200.0),
            PhysicalValue::exact(50.0),
            PhysicalValue::exact(40.0),
            PhysicalValue::exact(100.0),
        )
        .unwrap();
        assert_relative_eq!(y.value, 60.0);
        assert!(extrapolate(y, y, y, PhysicalValue::ZERO).is_none());
    }
}
