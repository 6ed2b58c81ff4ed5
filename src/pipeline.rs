//! End-to-end runs: read or fetch, consolidate, hand back a table. Writing
//! files and printing are left to the caller.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::RevenueConfig;
use crate::consolidate::{
    consolidate_population, consolidate_revenue, Granularity, PopulationTable, RevenueTable,
};
use crate::population::{NormalizerOptions, SheetSource, SpreadsheetNormalizer};
use crate::region::RegionCode;
use crate::revenue::classifier::RevenueClassifier;
use crate::revenue::fetcher::{RevenueFetcher, SweepPlan, SweepReport};
use crate::revenue::http::SiconfiClient;
use crate::revenue::pacing::{Clock, Pacer, TokioClock};
use crate::revenue::source::RevenueSource;
use crate::revenue::wide::load_wide_revenue;

/// Normalizes every requested year and concatenates them. The first year
/// that fails aborts the run.
pub fn run_population(
    source: &impl SheetSource,
    years: &[i32],
    options: NormalizerOptions,
) -> Result<PopulationTable> {
    let normalizer = SpreadsheetNormalizer::new(options);
    let mut batches = Vec::with_capacity(years.len());
    for year in years {
        let sheet = source
            .load(*year)
            .with_context(|| format!("failed loading population sheet for {year}"))?;
        let entries = normalizer
            .normalize(*year, &sheet)
            .with_context(|| format!("failed normalizing population sheet for {year}"))?;
        info!(year, rows = entries.len(), "population year normalized");
        batches.push(entries);
    }
    Ok(consolidate_population(batches))
}

/// Fetcher wired to the live API with the configured pacing and page cap.
pub fn build_fetcher(config: &RevenueConfig) -> Result<RevenueFetcher<SiconfiClient, TokioClock>> {
    let client = SiconfiClient::new(config.client_options())
        .context("failed building HTTP client")?;
    Ok(RevenueFetcher::new(
        client,
        Pacer::new(TokioClock, config.min_interval()),
        RevenueClassifier::default(),
    )
    .with_max_pages(config.max_pages))
}

pub fn sweep_plan(config: &RevenueConfig, regions: &[RegionCode]) -> Result<SweepPlan> {
    let years = config.validated_years()?;
    let sub_periods = config.sub_periods()?;
    Ok(SweepPlan::new(&years, &sub_periods, regions)?)
}

/// Sweeps the plan and consolidates whatever came back. Failed cells are
/// already zeroed by the fetcher and listed in the report.
pub async fn run_revenue_sweep<S: RevenueSource, C: Clock>(
    fetcher: &mut RevenueFetcher<S, C>,
    plan: &SweepPlan,
    granularity: Granularity,
) -> (RevenueTable, SweepReport) {
    info!(cells = plan.len(), "starting revenue sweep");
    let report = fetcher.sweep(plan).await;
    info!(
        requests = report.requests,
        failed = report.failures.len(),
        "revenue sweep finished"
    );
    let table = consolidate_revenue(report.aggregates.iter().cloned(), granularity);
    (table, report)
}

pub fn run_wide(path: &Path, sheet: &str) -> Result<RevenueTable> {
    let rows = load_wide_revenue(path, sheet)
        .with_context(|| format!("failed reading wide revenue workbook {}", path.display()))?;
    info!(rows = rows.len(), "wide revenue rows read");
    Ok(consolidate_revenue(rows, Granularity::Annual))
}
