//! Derived and composite categories.

use hh_category::EventRegion;
use hh_core::Result;
use hh_hist::HistogramStore;

use crate::config::DerivedSpec;
use crate::context::{EstimateRecord, EstimationContext, EstimatorKind, Scope};
use crate::subtract::renormalize;

/// Build one derived category: per region, yield from the source category in
/// the scope's category, shape from the source in the relaxed category.
///
/// Regions without a source yield are skipped silently, those without a shape
/// template with a warning.
pub fn estimate_derived(
    ctx: &EstimationContext<'_>,
    store: &mut HistogramStore,
    scope: &Scope,
    spec: DerivedSpec,
) -> Result<Vec<EstimateRecord>> {
    let registry = ctx.registry;
    let (Some(source), Some(target)) =
        (registry.optional_with_tag(spec.source)?, registry.optional_with_tag(spec.target)?)
    else {
        return Ok(Vec::new());
    };
    let category = scope.category;
    let shape_category = ctx.config.catalog.derived_shape_relaxation.relax(category);
    let name = scope.histogram.as_str();

    let mut records = Vec::new();
    for &region in EventRegion::ALL {
        let Some(yield_source) = store.histogram(&scope.key(category, region, &source.name), name) else {
            continue;
        };
        let estimate = yield_source.integral(false);
        let shape_key = scope.key(shape_category, region, &source.name);
        let Some(shape_source) = store.histogram(&shape_key, name) else {
            log::warn!("{shape_key}/{name}: shape for {} not found, skipped", target.name);
            continue;
        };
        let mut shape = shape_source.clone();
        let key = scope.key(category, region, &target.name);
        renormalize(&mut shape, estimate, scope, &key)?;
        store.clone_into(&key, &shape)?;
        log::info!("{key}/{name}: {} from {} = {estimate} (shape from {shape_category})", target.name, source.name);
        records.push(
            EstimateRecord::new(EstimatorKind::Derived, key, name)
                .input(&source.name, estimate)
                .estimate(estimate),
        );
    }
    Ok(records)
}

/// Sum every composite category's sub-categories, per region. The first
/// contributor is cloned into the composite key, later ones are added in place.
pub fn combine_composites(
    ctx: &EstimationContext<'_>,
    store: &mut HistogramStore,
    scope: &Scope,
) -> Result<Vec<EstimateRecord>> {
    let category = scope.category;
    let name = scope.histogram.as_str();
    let mut records = Vec::new();

    for composite in ctx.registry.composites() {
        for &region in EventRegion::ALL {
            let key = scope.key(category, region, &composite.name);
            let mut record = EstimateRecord::new(EstimatorKind::Composite, key.clone(), name);
            let mut started = false;
            for sub in &composite.sub_categories {
                let Some(part) = store.histogram(&scope.key(category, region, sub), name).cloned() else {
                    continue;
                };
                record = record.input(sub, part.integral(false));
                if started {
                    if let Some(total) = store.histogram_mut(&key, name) {
                        total.add(&part, 1.0)?;
                    }
                } else {
                    store.clone_into(&key, &part)?;
                    started = true;
                }
            }
            if !started {
                continue;
            }
            if let Some(total) = store.histogram(&key, name) {
                let estimate = total.integral(false);
                log::debug!("{key}/{name}: composite sum {estimate}");
                records.push(record.estimate(estimate));
            }
        }
    }
    Ok(records)
}
