//! QCD multijet estimate with the ABCD method.
//!
//! Two variants share the same arithmetic, `(Data_A - Bkg_A) * N / D`, and
//! differ in which control regions play A, N and D:
//!
//! | method          | A (tight)    | N / D (ratio-relaxed)     | shape (shape-relaxed) |
//! |-----------------|--------------|---------------------------|-----------------------|
//! | `anti_isolated` | `OS_AntiIso` | `SS_Iso` / `SS_AntiIso`   | `OS_AntiIso`          |
//! | `same_sign`     | `SS_Iso`     | `OS_AntiIso` / `SS_AntiIso` | `SS_AntiIso`        |
//!
//! A, N and D are background-subtracted data yields and none may be negative.
//! The result is written for `OS_Iso` under the QCD-tagged category; the other
//! variant is written under the `QCD_alternative` category when one exists.

use hh_category::{Channel, EventCategory, EventRegion, SampleCategory, SampleTag};
use hh_core::{PhysicalValue, Result};
use hh_hist::HistogramStore;
use serde::{Deserialize, Serialize};

use crate::context::{EstimateRecord, EstimationContext, EstimatorKind, Scope};
use crate::subtract::{background_yield, renormalize, subtract_backgrounds};

/// ABCD variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcdMethod {
    /// Normalize in the opposite-sign anti-isolated region.
    AntiIsolated,
    /// Normalize in the same-sign isolated region.
    SameSign,
}

/// Control regions used by one [`QcdMethod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QcdRegions {
    /// Normalization region A.
    pub normalization: EventRegion,
    /// Transfer-factor numerator.
    pub numerator: EventRegion,
    /// Transfer-factor denominator.
    pub denominator: EventRegion,
    /// Shape template region.
    pub shape: EventRegion,
}

impl QcdMethod {
    /// The better-populated variant for `channel`.
    pub fn default_for(channel: Channel) -> Self {
        match channel {
            Channel::TauTau => QcdMethod::AntiIsolated,
            Channel::ETau | Channel::MuTau => QcdMethod::SameSign,
        }
    }

    /// The other variant, used for the method-comparison estimate.
    pub fn alternative(self) -> Self {
        match self {
            QcdMethod::AntiIsolated => QcdMethod::SameSign,
            QcdMethod::SameSign => QcdMethod::AntiIsolated,
        }
    }

    /// Control regions of the variant.
    pub fn regions(self) -> QcdRegions {
        match self {
            QcdMethod::AntiIsolated => QcdRegions {
                normalization: EventRegion::OsAntiIsolated,
                numerator: EventRegion::SsIsolated,
                denominator: EventRegion::SsAntiIsolated,
                shape: EventRegion::OsAntiIsolated,
            },
            QcdMethod::SameSign => QcdRegions {
                normalization: EventRegion::SsIsolated,
                numerator: EventRegion::OsAntiIsolated,
                denominator: EventRegion::SsAntiIsolated,
                shape: EventRegion::SsAntiIsolated,
            },
        }
    }
}

/// `(data_a - background_a) * numerator / denominator`.
///
/// Fails when data is below background in A, when either ratio operand is
/// negative or the denominator is zero, and when the product is negative.
pub fn abcd_yield(
    scope: &Scope,
    data_a: PhysicalValue,
    background_a: PhysicalValue,
    numerator: PhysicalValue,
    denominator: PhysicalValue,
) -> Result<PhysicalValue> {
    let fail = |message: String| scope.failure(scope.category, EventRegion::OsIsolated, message);
    let normalization = data_a - background_a;
    if normalization.value < 0.0 {
        return Err(fail(format!("data {data_a} below background {background_a}")));
    }
    if numerator.value < 0.0 || denominator.value < 0.0 {
        return Err(fail(format!("negative transfer-factor operand ({numerator} / {denominator})")));
    }
    let transfer = numerator
        .checked_div(denominator)
        .ok_or_else(|| fail(format!("zero transfer-factor denominator ({numerator} / {denominator})")))?;
    let estimate = normalization * transfer;
    if estimate.value < 0.0 {
        return Err(fail(format!("negative yield {estimate} = {normalization} x {transfer}")));
    }
    Ok(estimate)
}

/// Estimate QCD for `scope` with the configured method, and with the other
/// method into the `QCD_alternative` category when one is declared.
///
/// A method yields no record when its control-region data is absent.
pub fn estimate_qcd(
    ctx: &EstimationContext<'_>,
    store: &mut HistogramStore,
    scope: &Scope,
) -> Result<Vec<EstimateRecord>> {
    let registry = ctx.registry;
    let Some(qcd) = registry.optional_with_tag(SampleTag::Qcd)? else {
        return Ok(Vec::new());
    };
    let method = ctx.config.qcd.method_for(registry.channel());
    let mut records = Vec::new();
    records.extend(estimate_with(ctx, store, scope, method, qcd, EstimatorKind::Qcd)?);
    if let Some(alternative) = registry.optional_with_tag(SampleTag::QcdAlternative)? {
        records.extend(estimate_with(
            ctx,
            store,
            scope,
            method.alternative(),
            alternative,
            EstimatorKind::QcdAlternative,
        )?);
    }
    Ok(records)
}

fn estimate_with(
    ctx: &EstimationContext<'_>,
    store: &mut HistogramStore,
    scope: &Scope,
    method: QcdMethod,
    qcd: &SampleCategory,
    kind: EstimatorKind,
) -> Result<Option<EstimateRecord>> {
    let registry = ctx.registry;
    let data = registry.unique_with_tag(SampleTag::Data)?;
    let regions = method.regions();
    let catalog = &ctx.config.catalog;
    let tight = scope.category;
    let ratio_category = catalog.qcd_ratio_relaxation.relax(tight);
    let shape_category = catalog.qcd_shape_relaxation.relax(tight);
    let name = scope.histogram.as_str();
    let view: &HistogramStore = store;

    let data_at = |category: EventCategory, region: EventRegion| {
        view
            .histogram(&scope.key(category, region, &data.name), name)
            .map(|h| h.integral(false))
    };
    let background_at = |category: EventCategory, region: EventRegion| {
        background_yield(view, registry, &scope.key(category, region, ""), name, &qcd.name)
    };
    // background-subtracted data; a negative control yield is fatal
    let subtracted_at = |category: EventCategory, region: EventRegion| -> Result<Option<PhysicalValue>> {
        let Some(d) = data_at(category, region) else {
            return Ok(None);
        };
        let background = background_at(category, region);
        let subtracted = d - background;
        if subtracted.value < 0.0 {
            return Err(scope.failure(
                category,
                region,
                format!("{}: backgrounds {background} exceed data {d}", qcd.name),
            ));
        }
        Ok(Some(subtracted))
    };

    let Some(data_a) = data_at(tight, regions.normalization) else {
        log::debug!("{tight}/{}/{name}: no data, {} not estimated", regions.normalization, qcd.name);
        return Ok(None);
    };
    let background_a = background_at(tight, regions.normalization);
    subtracted_at(tight, regions.normalization)?;
    let (Some(numerator), Some(denominator)) = (
        subtracted_at(ratio_category, regions.numerator)?,
        subtracted_at(ratio_category, regions.denominator)?,
    ) else {
        log::debug!("{ratio_category}/{name}: transfer-factor data missing, {} not estimated", qcd.name);
        return Ok(None);
    };
    let estimate = abcd_yield(scope, data_a, background_a, numerator, denominator)?;

    let shape_key = scope.key(shape_category, regions.shape, &data.name);
    let Some(shape_source) = view.histogram(&shape_key, name) else {
        log::warn!("{shape_key}/{name}: shape template for {} not found, no estimate", qcd.name);
        return Ok(None);
    };
    let mut shape = shape_source.clone();
    let at = shape_key.with_sample(qcd.name.as_str());
    subtract_backgrounds(view, registry, scope, &mut shape, &at, &qcd.name, ctx.config.negative_bin_floor)?;
    let target = scope.key(tight, EventRegion::OsIsolated, &qcd.name);
    renormalize(&mut shape, estimate, scope, &target)?;
    store.clone_into(&target, &shape)?;

    log::info!(
        "{target}/{name}: QCD ({method:?}) = ({data_a} - {background_a}) x {numerator} / {denominator} = {estimate}"
    );
    Ok(Some(
        EstimateRecord::new(kind, target, name)
            .input("data_a", data_a)
            .input("background_a", background_a)
            .input("numerator", numerator)
            .input("denominator", denominator)
            .estimate(estimate),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hh_category::{EventEnergyScale, EventSubCategory};
    use hh_core::Error;

    fn scope() -> Scope {
        Scope::new(EventCategory::TwoJetsTwoBtag, EventSubCategory::NoCuts, EventEnergyScale::Central, "m_sv")
    }

    #[test]
    fn abcd_reference_numbers() {
        let data = PhysicalValue::new(120.0, 11.0);
        let bkg = PhysicalValue::new(20.0, 3.0);
        let num = PhysicalValue::new(50.0, 7.0);
        let den = PhysicalValue::new(40.0, 6.0);

        let tf = num / den;
        assert_relative_eq!(tf.value, 1.25);
        assert_relative_eq!(tf.error, 1.25 * (0.14f64.hypot(0.15)), epsilon = 1e-12);

        let y = abcd_yield(&scope(), data, bkg, num, den).unwrap();
        assert_relative_eq!(y.value, 125.0);
        let norm_err = 11.0f64.hypot(3.0);
        assert_relative_eq!(y.error, (1.25 * norm_err).hypot(100.0 * tf.error), epsilon = 1e-9);
    }

    #[test]
    fn data_below_background_is_fatal() {
        let err = abcd_yield(
            &scope(),
            PhysicalValue::new(15.0, 4.0),
            PhysicalValue::new(20.0, 3.0),
            PhysicalValue::new(50.0, 7.0),
            PhysicalValue::new(40.0, 6.0),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Estimation { ref category, ref region, .. }
            if category == "2jets2btag" && region == "OS_Iso"));
    }

    #[test]
    fn zero_denominator_and_negative_ratio_are_fatal() {
        let s = scope();
        let d = PhysicalValue::exact(10.0);
        assert!(abcd_yield(&s, d, PhysicalValue::ZERO, d, PhysicalValue::ZERO).is_err());
        assert!(abcd_yield(&s, d, PhysicalValue::ZERO, -d, d).is_err());
    }

    #[test]
    fn negative_ratio_operands_are_fatal_even_with_positive_ratio() {
        let s = scope();
        let a = PhysicalValue::exact(200.0);
        let err = abcd_yield(&s, a, PhysicalValue::ZERO, PhysicalValue::exact(-20.0), PhysicalValue::exact(-10.0))
            .unwrap_err();
        assert!(err.is_estimation(), "{err}");
    }

    #[test]
    fn method_defaults_and_regions() {
        assert_eq!(QcdMethod::default_for(Channel::TauTau), QcdMethod::AntiIsolated);
        assert_eq!(QcdMethod::default_for(Channel::ETau), QcdMethod::SameSign);
        let r = QcdMethod::SameSign.regions();
        assert_eq!(r.normalization, EventRegion::SsIsolated);
        assert_eq!(r.denominator, EventRegion::SsAntiIsolated);
        assert_eq!(QcdMethod::AntiIsolated.regions().shape, EventRegion::OsAntiIsolated);
        assert_eq!(QcdMethod::SameSign.alternative(), QcdMethod::AntiIsolated);
        assert_eq!(QcdMethod::AntiIsolated.alternative(), QcdMethod::SameSign);
    }
}
