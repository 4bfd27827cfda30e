//! True-tau Drell-Yan (ZTT) estimate.
//!
//! In the primary region, with an embedded sample available, the yield is the
//! inclusive ZTT simulation scaled by the embedded category fraction:
//! `ZTT_MC(Inclusive) * Emb(cat) / Emb(Inclusive)`, embedded yields corrected
//! for `TT_Embedded` contamination when configured. Elsewhere the ZTT
//! simulation integral is taken as is.
//!
//! The shape comes from the embedded sample when present, else from the
//! simulation; it is renormalized to the yield and the leptonic `ZTT_L`
//! component is then added on top with its own normalization.

use hh_category::{EventCategory, EventRegion, SampleCategory, SampleTag};
use hh_core::{PhysicalValue, Result};
use hh_hist::{Histogram, HistogramStore};

use crate::context::{EstimateRecord, EstimationContext, EstimatorKind, Scope};
use crate::subtract::{renormalize, repair_negative_bins};

struct ZttSamples<'r> {
    ztt: &'r SampleCategory,
    mc: Option<&'r SampleCategory>,
    embedded: Option<&'r SampleCategory>,
    contamination: Option<&'r SampleCategory>,
    leptonic: Option<&'r SampleCategory>,
}

fn histogram<'s>(
    store: &'s HistogramStore,
    scope: &Scope,
    category: EventCategory,
    region: EventRegion,
    sample: Option<&SampleCategory>,
) -> Option<&'s Histogram> {
    store.histogram(&scope.key(category, region, &sample?.name), &scope.histogram)
}

/// Embedded histogram with the contamination subtracted; a negative
/// remainder is fatal.
fn embedded_shape(
    store: &HistogramStore,
    scope: &Scope,
    samples: &ZttSamples<'_>,
    category: EventCategory,
    region: EventRegion,
    subtract: bool,
) -> Result<Option<Histogram>> {
    let Some(embedded) = histogram(store, scope, category, region, samples.embedded) else {
        return Ok(None);
    };
    let mut shape = embedded.clone();
    if subtract
        && let Some(contamination) = histogram(store, scope, category, region, samples.contamination)
    {
        shape.add(contamination, -1.0)?;
        let remainder = shape.integral(false);
        if remainder.value < 0.0 {
            return Err(scope.failure(
                category,
                region,
                format!(
                    "embedded yield negative after contamination subtraction ({} - {} = {remainder})",
                    embedded.integral(false),
                    contamination.integral(false),
                ),
            ));
        }
    }
    Ok(Some(shape))
}

/// Estimate ZTT in every region of `scope` that has a ZTT input.
pub fn estimate_ztt(
    ctx: &EstimationContext<'_>,
    store: &mut HistogramStore,
    scope: &Scope,
) -> Result<Vec<EstimateRecord>> {
    let registry = ctx.registry;
    let Some(ztt) = registry.optional_with_tag(SampleTag::Ztt)? else {
        return Ok(Vec::new());
    };
    let samples = ZttSamples {
        ztt,
        mc: registry.optional_with_tag(SampleTag::ZttMc)?,
        embedded: registry.optional_with_tag(SampleTag::Embedded)?,
        contamination: registry.optional_with_tag(SampleTag::TtEmbedded)?,
        leptonic: registry.optional_with_tag(SampleTag::ZttLeptonic)?,
    };
    let settings = &ctx.config.ztt;
    let subtract = settings.subtract_embedded_contamination;
    let category = scope.category;
    let name = scope.histogram.as_str();

    let mut records = Vec::new();
    for &region in EventRegion::ALL {
        let target = scope.key(category, region, &samples.ztt.name);
        let mc = histogram(store, scope, category, region, samples.mc).map(|h| h.integral(false));
        let embedded = embedded_shape(store, scope, &samples, category, region, subtract)?;
        if mc.is_none() && embedded.is_none() {
            continue;
        }

        let mut record = EstimateRecord::new(EstimatorKind::Ztt, target.clone(), name);
        let estimate = match (&embedded, region == settings.primary_region) {
            (Some(emb_cat), true) => {
                let emb_incl = embedded_shape(store, scope, &samples, EventCategory::Inclusive, region, subtract)?
                    .map(|h| h.integral(false))
                    .unwrap_or(PhysicalValue::ZERO);
                let mc_incl = histogram(store, scope, EventCategory::Inclusive, region, samples.mc)
                    .map(|h| h.integral(false));
                let emb_cat = emb_cat.integral(false);
                match mc_incl {
                    Some(mc_incl) => {
                        let fraction = emb_cat.checked_div(emb_incl).ok_or_else(|| {
                            scope.failure(EventCategory::Inclusive, region, "embedded inclusive yield is zero")
                        })?;
                        record = record
                            .input("ztt_mc_inclusive", mc_incl)
                            .input("embedded_category", emb_cat)
                            .input("embedded_inclusive", emb_incl);
                        mc_incl * fraction
                    }
                    // no simulation to normalize against: embedded yield as is
                    None => {
                        record = record.input("embedded_category", emb_cat);
                        emb_cat
                    }
                }
            }
            _ => match mc {
                Some(mc) => {
                    record = record.input("ztt_mc", mc);
                    mc
                }
                None => continue,
            },
        };
        if estimate.value < 0.0 {
            return Err(scope.failure(category, region, format!("negative ZTT yield {estimate}")));
        }

        let shape_source = match embedded {
            Some(shape) => Some(shape),
            None => histogram(store, scope, category, region, samples.mc).cloned(),
        };
        let Some(mut shape) = shape_source else {
            continue;
        };
        repair_negative_bins(&mut shape, ctx.config.negative_bin_floor, &target.to_string());
        renormalize(&mut shape, estimate, scope, &target)?;
        let mut total = estimate;
        if let Some(leptonic) = histogram(store, scope, category, region, samples.leptonic) {
            shape.add(leptonic, 1.0)?;
            let leptonic = leptonic.integral(false);
            record = record.input("ztt_leptonic", leptonic);
            total = total + leptonic;
        }
        store.clone_into(&target, &shape)?;
        log::info!("{target}/{name}: ZTT = {estimate} (total with leptonic part {total})");
        records.push(record.estimate(total));
    }
    Ok(records)
}
