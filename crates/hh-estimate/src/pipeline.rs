//! Ordered run of every estimator over the filled store.

use hh_category::SampleCategoryRegistry;
use hh_core::Result;
use hh_hist::HistogramStore;

use crate::config::EstimationConfig;
use crate::context::{EstimateRecord, EstimationContext, Scope};
use crate::derived::{combine_composites, estimate_derived};
use crate::qcd::estimate_qcd;
use crate::wjets::estimate_wjets;
use crate::ztt::estimate_ztt;

/// Runs the estimators stage by stage: ZTT, derived categories, W+jets, QCD,
/// composites. Each stage covers every scope before the next one starts, so
/// the W+jets sideband subtraction already sees ZTT, ZL and ZJ, and QCD sees
/// W+jets as well.
#[derive(Debug, Clone, Copy)]
pub struct EstimationPipeline<'a> {
    ctx: EstimationContext<'a>,
}

impl<'a> EstimationPipeline<'a> {
    /// Pipeline over `registry` with `config`.
    pub fn new(registry: &'a SampleCategoryRegistry, config: &'a EstimationConfig) -> Self {
        Self { ctx: EstimationContext::new(registry, config) }
    }

    /// Shared estimator inputs.
    pub fn context(&self) -> &EstimationContext<'a> {
        &self.ctx
    }

    /// Run over every scope present in `store`.
    pub fn run_all(&self, store: &mut HistogramStore) -> Result<Vec<EstimateRecord>> {
        let scopes = Scope::collect(store);
        self.run(store, &scopes)
    }

    /// Run over `scopes`; the first fatal error aborts the run.
    pub fn run(&self, store: &mut HistogramStore, scopes: &[Scope]) -> Result<Vec<EstimateRecord>> {
        let ctx = &self.ctx;
        let mut records = Vec::new();
        for scope in scopes {
            records.extend(estimate_ztt(ctx, store, scope)?);
        }
        for spec in &ctx.config.derived {
            for scope in scopes {
                records.extend(estimate_derived(ctx, store, scope, *spec)?);
            }
        }
        for scope in scopes {
            records.extend(estimate_wjets(ctx, store, scope)?);
        }
        for scope in scopes {
            records.extend(estimate_qcd(ctx, store, scope)?);
        }
        for scope in scopes {
            records.extend(combine_composites(ctx, store, scope)?);
        }
        log::info!("estimation done: {} estimates over {} scopes", records.len(), scopes.len());
        Ok(records)
    }
}

/// Pretty JSON dump of estimate records for the diagnostic stream.
pub fn breakdown_json(records: &[EstimateRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}
