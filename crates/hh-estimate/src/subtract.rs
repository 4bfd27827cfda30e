//! Background subtraction, negative-bin repair and renormalization.

use hh_category::SampleCategoryRegistry;
use hh_core::{PhysicalValue, Result};
use hh_hist::{AggregationKey, Histogram, HistogramStore};

use crate::context::Scope;

/// Sum of the in-range integrals of every subtractable background at `at`
/// (the key's sample is ignored), except `exclude`.
pub fn background_yield(
    store: &HistogramStore,
    registry: &SampleCategoryRegistry,
    at: &AggregationKey,
    histogram: &str,
    exclude: &str,
) -> PhysicalValue {
    registry
        .all()
        .iter()
        .filter(|c| c.subtracts_as_background() && c.name != exclude)
        .filter_map(|c| store.histogram(&at.with_sample(c.name.as_str()), histogram))
        .map(|h| h.integral(false))
        .sum()
}

/// Subtract every subtractable background except `exclude` from `histogram`,
/// reading them at `at` (with the sample replaced), then repair negative bins.
///
/// A negative total after subtraction is a fatal estimation error. Returns the
/// integral after repair, which equals the post-subtraction integral.
pub fn subtract_backgrounds(
    store: &HistogramStore,
    registry: &SampleCategoryRegistry,
    scope: &Scope,
    histogram: &mut Histogram,
    at: &AggregationKey,
    exclude: &str,
    floor: f64,
) -> Result<PhysicalValue> {
    let before = histogram.integral(false);
    for background in registry.all().iter().filter(|c| c.subtracts_as_background() && c.name != exclude) {
        let key = at.with_sample(background.name.as_str());
        match store.histogram(&key, &histogram.name) {
            Some(h) => {
                log::debug!("{key}: subtracting {} ({})", background.name, h.integral(false));
                histogram.add(h, -1.0)?;
            }
            None => log::debug!("{key}: {} not found, nothing subtracted", background.name),
        }
    }

    let after = histogram.integral(false);
    if after.value < 0.0 {
        return Err(scope.failure(
            at.category,
            at.region,
            format!("{exclude}: backgrounds exceed {} ({before} -> {after})", at.sample),
        ));
    }
    repair_negative_bins(histogram, floor, &at.to_string());
    Ok(histogram.integral(false))
}

/// Floor negative bins at `floor`, inflating their errors in quadrature by
/// `floor - content`, then rescale so the total integral is unchanged.
/// Returns the number of repaired bins.
pub fn repair_negative_bins(histogram: &mut Histogram, floor: f64, context: &str) -> usize {
    let original = histogram.integral(false).value;
    let mut n_repaired = 0;
    for i in 0..histogram.n_bins() {
        let content = histogram.bin_content[i];
        if content >= 0.0 {
            continue;
        }
        let error = histogram.bin_error(i);
        if content + error >= 0.0 {
            log::warn!("{context}/{}: bin {i} negative within error ({content} ± {error})", histogram.name);
        } else {
            log::error!("{context}/{}: bin {i} negative beyond error ({content} ± {error})", histogram.name);
        }
        histogram.set_bin_content(i, floor);
        histogram.set_bin_error(i, error.hypot(floor - content));
        n_repaired += 1;
    }

    if n_repaired > 0 {
        let floored = histogram.integral(false).value;
        if floored > 0.0 {
            histogram.scale(original / floored);
        }
    }
    n_repaired
}

/// Scale `histogram` so its in-range integral equals `target`.
///
/// An empty shape can only be renormalized to zero.
pub fn renormalize(
    histogram: &mut Histogram,
    target: PhysicalValue,
    scope: &Scope,
    at: &AggregationKey,
) -> Result<()> {
    let current = histogram.integral(false).value;
    if current == 0.0 {
        if target.value == 0.0 {
            return Ok(());
        }
        return Err(scope.failure(
            at.category,
            at.region,
            format!("{}: cannot renormalize an empty shape to {target}", at.sample),
        ));
    }
    histogram.scale(target.value / current);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hh_category::{
        Channel, EventCategory, EventEnergyScale, EventRegion, EventSubCategory,
    };
    use hh_core::Error;
    use hh_hist::DefaultShapeProvider;

    const CATEGORIES: &str = "\
[DATA]
type: Data
file: data

[TT]
type: Background
file: tt

[VV]
type: Background
file: vv
isCategoryToSubtract: false

[QCD]
type: Background
type: QCD
";

    fn scope() -> Scope {
        Scope::new(EventCategory::Inclusive, EventSubCategory::NoCuts, EventEnergyScale::Central, "m_vis")
    }

    fn at(sample: &str) -> AggregationKey {
        scope().key(EventCategory::Inclusive, EventRegion::SsAntiIsolated, sample)
    }

    fn setup(data: &[(f64, f64)], tt: &[(f64, f64)]) -> (HistogramStore, SampleCategoryRegistry) {
        let registry = SampleCategoryRegistry::load(CATEGORIES, "", Channel::MuTau).unwrap();
        let mut store = HistogramStore::new(DefaultShapeProvider::new(Channel::MuTau));
        for &(x, w) in data {
            store.fill(&at("DATA"), "m_vis", x, w).unwrap();
        }
        for &(x, w) in tt {
            store.fill(&at("TT"), "m_vis", x, w).unwrap();
        }
        store.fill(&at("VV"), "m_vis", 55.0, 100.0).unwrap();
        (store, registry)
    }

    #[test]
    fn repair_preserves_integral_and_removes_negative_bins() {
        let (store, registry) = setup(
            &[(15.0, 10.0), (25.0, 1.0), (35.0, 5.0)],
            &[(25.0, 3.0), (35.0, 1.0)],
        );
        let mut h = store.histogram(&at("DATA"), "m_vis").unwrap().clone();
        let result =
            subtract_backgrounds(&store, &registry, &scope(), &mut h, &at("QCD"), "QCD", 1e-5).unwrap();

        assert_relative_eq!(result.value, 12.0, epsilon = 1e-9);
        assert_relative_eq!(h.integral(false).value, 12.0, epsilon = 1e-9);
        assert!(h.bin_content.iter().all(|&v| v >= 0.0));
        // untouched VV (not subtractable) and the excluded category
        assert!(h.bin_content[5] < 1.0);
    }

    #[test]
    fn negative_total_is_fatal() {
        let (store, registry) = setup(&[(25.0, 15.0)], &[(25.0, 20.0)]);
        let mut h = store.histogram(&at("DATA"), "m_vis").unwrap().clone();
        let err = subtract_backgrounds(&store, &registry, &scope(), &mut h, &at("QCD"), "QCD", 1e-5)
            .unwrap_err();
        assert!(matches!(err, Error::Estimation { ref region, .. } if region == "SS_AntiIso"));
    }

    #[test]
    fn excluded_category_is_not_subtracted() {
        let (store, registry) = setup(&[(25.0, 15.0)], &[(25.0, 5.0)]);
        let mut h = store.histogram(&at("DATA"), "m_vis").unwrap().clone();
        let result =
            subtract_backgrounds(&store, &registry, &scope(), &mut h, &at("TT"), "TT", 1e-5).unwrap();
        assert_eq!(result.value, 15.0);
        assert_eq!(background_yield(&store, &registry, &at("QCD"), "m_vis", "QCD").value, 5.0);
    }

    #[test]
    fn repaired_bin_error_is_inflated() {
        let mut h = Histogram::new("x", vec![0.0, 1.0, 2.0]).unwrap();
        h.fill(0.5, 4.0);
        h.fill(1.5, -1.0);
        let before = h.bin_error(1);
        assert_eq!(repair_negative_bins(&mut h, 1e-5, "test"), 1);
        let k = 3.0 / (4.0 + 1e-5);
        assert_relative_eq!(h.bin_content[1], 1e-5 * k);
        assert_relative_eq!(h.bin_error(1), before.hypot(1e-5 + 1.0) * k);
        assert_relative_eq!(h.integral(false).value, 3.0);
    }

    #[test]
    fn renormalize_to_target() {
        let mut h = Histogram::new("x", vec![0.0, 1.0, 2.0]).unwrap();
        h.fill(0.5, 1.0);
        h.fill(1.5, 3.0);
        renormalize(&mut h, PhysicalValue::new(60.0, 5.0), &scope(), &at("W")).unwrap();
        assert_relative_eq!(h.integral(false).value, 60.0);

        let mut empty = Histogram::new("x", vec![0.0, 1.0]).unwrap();
        renormalize(&mut empty, PhysicalValue::ZERO, &scope(), &at("W")).unwrap();
        assert!(renormalize(&mut empty, PhysicalValue::exact(1.0), &scope(), &at("W")).is_err());
    }
}
