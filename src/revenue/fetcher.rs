use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::period::{validate_year, PeriodError, SubPeriod};
use crate::region::RegionCode;
use crate::revenue::classifier::RevenueClassifier;
use crate::revenue::pacing::{Clock, Pacer};
use crate::revenue::source::{FiscalCell, RemoteRequestError, RevenueSource};
use crate::revenue::{format_minor, ClassifiedAggregate, RawRecord};

pub const DEFAULT_MAX_PAGES: usize = 50;

/// The cartesian product to sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    years: Vec<i32>,
    sub_periods: Vec<SubPeriod>,
    regions: Vec<RegionCode>,
}

impl SweepPlan {
    /// Inputs are sorted and deduplicated; regions keep IBGE order.
    pub fn new(
        years: &[i32],
        sub_periods: &[SubPeriod],
        regions: &[RegionCode],
    ) -> Result<Self, PeriodError> {
        let mut years = years
            .iter()
            .map(|y| validate_year(*y))
            .collect::<Result<Vec<_>, _>>()?;
        years.sort_unstable();
        years.dedup();
        let mut sub_periods = sub_periods.to_vec();
        sub_periods.sort_unstable();
        sub_periods.dedup();
        let regions = RegionCode::ALL
            .iter()
            .copied()
            .filter(|r| regions.contains(r))
            .collect();
        Ok(Self {
            years,
            sub_periods,
            regions,
        })
    }

    pub fn len(&self) -> usize {
        self.years.len() * self.sub_periods.len() * self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Work queue: year, then sub-period, then region.
    pub fn cells(&self) -> VecDeque<FiscalCell> {
        let mut queue = VecDeque::with_capacity(self.len());
        for year in &self.years {
            for sub_period in &self.sub_periods {
                for region in &self.regions {
                    queue.push_back(FiscalCell {
                        year: *year,
                        sub_period: *sub_period,
                        region: *region,
                    });
                }
            }
        }
        queue
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFailure {
    pub cell: FiscalCell,
    pub error: String,
}

/// Result of a sweep: one aggregate per planned cell, in plan order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub aggregates: Vec<ClassifiedAggregate>,
    pub failures: Vec<CellFailure>,
    pub requests: usize,
}

impl SweepReport {
    pub fn unclassified_minor(&self) -> i64 {
        self.aggregates
            .iter()
            .map(ClassifiedAggregate::unclassified_minor)
            .sum()
    }
}

/// Sequential, paced fetcher. One cell never aborts the sweep: a failed cell
/// is logged, recorded and contributes an all-zero aggregate. There is no
/// retry within a run.
pub struct RevenueFetcher<S: RevenueSource, C: Clock> {
    source: S,
    pacer: Pacer<C>,
    classifier: RevenueClassifier,
    max_pages: usize,
}

impl<S: RevenueSource, C: Clock> RevenueFetcher<S, C> {
    pub fn new(source: S, pacer: Pacer<C>, classifier: RevenueClassifier) -> Self {
        Self {
            source,
            pacer,
            classifier,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn pacer(&self) -> &Pacer<C> {
        &self.pacer
    }

    pub async fn sweep(&mut self, plan: &SweepPlan) -> SweepReport {
        let mut queue = plan.cells();
        let total = queue.len();
        let mut report = SweepReport {
            aggregates: Vec::with_capacity(total),
            ..SweepReport::default()
        };
        let mut done = 0usize;

        while let Some(cell) = queue.pop_front() {
            done += 1;
            let aggregate = match self.fetch_cell(&cell, &mut report.requests).await {
                Ok(records) => {
                    let aggregate = self.classifier.fold_cell(cell.region, cell.period(), &records);
                    if aggregate.unclassified_minor() != 0 {
                        debug!(
                            %cell,
                            unclassified = %format_minor(aggregate.unclassified_minor()),
                            "lines outside the tracked categories"
                        );
                    }
                    info!("[{done}/{total}] {cell} done ({} lines)", records.len());
                    aggregate
                }
                Err(err) => {
                    warn!("[{done}/{total}] {cell} failed, counting as zero: {err}");
                    report.failures.push(CellFailure {
                        cell,
                        error: err.to_string(),
                    });
                    ClassifiedAggregate::zero(cell.region, cell.period())
                }
            };
            report.aggregates.push(aggregate);
        }

        let unclassified = report.unclassified_minor();
        if unclassified != 0 {
            warn!(
                "{} in lines matched no tax category; they are in the totals only",
                format_minor(unclassified)
            );
        }
        report
    }

    /// All pages of one cell. Each request waits its turn with the pacer,
    /// whatever happened to the previous one.
    async fn fetch_cell(
        &mut self,
        cell: &FiscalCell,
        requests: &mut usize,
    ) -> Result<Vec<RawRecord>, RemoteRequestError> {
        let mut records = Vec::new();
        let mut offset = 0usize;
        for _ in 0..self.max_pages {
            self.pacer.wait_turn().await;
            *requests += 1;
            let page = self.source.fetch_page(cell, offset).await?;
            let received = page.items.len();
            records.extend(page.items.into_iter().map(|item| item.into_record(cell)));
            if !page.has_more {
                return Ok(records);
            }
            if received == 0 {
                return Err(RemoteRequestError::Pagination { offset });
            }
            offset += received;
        }
        Err(RemoteRequestError::Other(format!(
            "more than {} pages",
            self.max_pages
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::period::{PeriodKey, SubPeriod};
    use crate::region::RegionCode;
    use crate::revenue::classifier::RevenueClassifier;
    use crate::revenue::fetcher::{RevenueFetcher, SweepPlan};
    use crate::revenue::pacing::{ManualClock, Pacer};
    use crate::revenue::source::{
        FiscalCell, LineItem, RemoteRequestError, RevenueSource, RreoPage,
    };
    use crate::revenue::TaxCategory;

    const INTERVAL: Duration = Duration::from_millis(1100);

    enum Scripted {
        Pages(Vec<RreoPage>),
        Timeout,
    }

    /// Answers by (region, offset); unknown cells get an empty page.
    #[derive(Default)]
    struct ScriptedSource {
        script: HashMap<RegionCode, Scripted>,
        calls: Mutex<Vec<(FiscalCell, usize)>>,
    }

    impl ScriptedSource {
        fn with(mut self, region: RegionCode, answer: Scripted) -> Self {
            self.script.insert(region, answer);
            self
        }

        fn calls(&self) -> Vec<(FiscalCell, usize)> {
            self.calls.lock().expect("calls").clone()
        }
    }

    #[async_trait]
    impl RevenueSource for ScriptedSource {
        async fn fetch_page(
            &self,
            cell: &FiscalCell,
            offset: usize,
        ) -> Result<RreoPage, RemoteRequestError> {
            self.calls.lock().expect("calls").push((*cell, offset));
            match self.script.get(&cell.region) {
                None => Ok(RreoPage::default()),
                Some(Scripted::Timeout) => Err(RemoteRequestError::Other(
                    "operation timed out".to_string(),
                )),
                Some(Scripted::Pages(pages)) => {
                    let mut start = 0;
                    for page in pages {
                        if start == offset {
                            return Ok(page.clone());
                        }
                        start += page.items.len();
                    }
                    Ok(RreoPage::default())
                }
            }
        }
    }

    fn page(items: Vec<LineItem>, has_more: bool) -> RreoPage {
        RreoPage { items, has_more }
    }

    fn sub(n: u8) -> SubPeriod {
        SubPeriod::new(n).expect("valid")
    }

    fn fetcher(source: ScriptedSource) -> RevenueFetcher<ScriptedSource, ManualClock> {
        RevenueFetcher::new(
            source,
            Pacer::new(ManualClock::new(), INTERVAL),
            RevenueClassifier::default(),
        )
    }

    #[test]
    fn plan_orders_year_then_period_then_ibge_region() {
        let plan = SweepPlan::new(
            &[2020, 2019, 2020],
            &[sub(2), sub(1)],
            &[RegionCode::SaoPaulo, RegionCode::Acre],
        )
        .expect("plan");
        let cells: Vec<_> = plan.cells().into_iter().collect();
        assert_eq!(plan.len(), 8);
        assert_eq!(cells[0].year, 2019);
        assert_eq!(cells[0].sub_period, sub(1));
        assert_eq!(cells[0].region, RegionCode::Acre);
        assert_eq!(cells[1].region, RegionCode::SaoPaulo);
        assert_eq!(cells[2].sub_period, sub(2));
        assert_eq!(cells[7].year, 2020);
        assert!(SweepPlan::new(&[1800], &[sub(1)], &RegionCode::ALL).is_err());
    }

    #[tokio::test]
    async fn timed_out_cell_is_zero_and_the_sweep_continues() {
        let source = ScriptedSource::default()
            .with(RegionCode::Acre, Scripted::Timeout)
            .with(
                RegionCode::SaoPaulo,
                Scripted::Pages(vec![page(
                    vec![
                        LineItem::new("ICMS - IMPOSTO SOBRE CIRCULAÇÃO", 100.0),
                        LineItem::new("OUTROS", 5.0),
                    ],
                    false,
                )]),
            );
        let plan =
            SweepPlan::new(&[2021], &[sub(1)], &[RegionCode::Acre, RegionCode::SaoPaulo])
                .expect("plan");
        let mut fetcher = fetcher(source);
        let report = fetcher.sweep(&plan).await;

        assert_eq!(report.aggregates.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].cell.region, RegionCode::Acre);
        assert!(report.failures[0].error.contains("timed out"));

        let acre = &report.aggregates[0];
        assert!(acre.is_zero());
        assert_eq!(acre.period, PeriodKey::bimonthly(2021, sub(1)));

        let sp = &report.aggregates[1];
        assert_eq!(sp.categories.get(TaxCategory::Icms), 10_000);
        assert_eq!(sp.total_minor, 10_500);
        assert_eq!(report.unclassified_minor(), 500);
    }

    #[tokio::test]
    async fn pacing_applies_after_failures_too() {
        let source = ScriptedSource::default().with(RegionCode::Acre, Scripted::Timeout);
        let plan = SweepPlan::new(
            &[2021],
            &[sub(1)],
            &[RegionCode::Acre, RegionCode::Amazonas, RegionCode::Para],
        )
        .expect("plan");
        let mut fetcher = fetcher(source);
        let report = fetcher.sweep(&plan).await;

        assert_eq!(report.requests, 3);
        assert_eq!(fetcher.pacer().clock().sleeps(), vec![INTERVAL, INTERVAL]);
        assert_eq!(fetcher.pacer().clock().elapsed(), INTERVAL * 2);
    }

    #[tokio::test]
    async fn follows_has_more_with_advancing_offset() {
        let source = ScriptedSource::default().with(
            RegionCode::Bahia,
            Scripted::Pages(vec![
                page(vec![LineItem::new("ICMS", 1.0), LineItem::new("IPVA", 2.0)], true),
                page(vec![LineItem::new("ITCMD", 3.0)], false),
            ]),
        );
        let plan = SweepPlan::new(&[2022], &[sub(3)], &[RegionCode::Bahia]).expect("plan");
        let mut fetcher = fetcher(source);
        let report = fetcher.sweep(&plan).await;

        assert!(report.failures.is_empty());
        let agg = &report.aggregates[0];
        assert_eq!(agg.categories.get(TaxCategory::Icms), 100);
        assert_eq!(agg.categories.get(TaxCategory::Ipva), 200);
        assert_eq!(agg.categories.get(TaxCategory::Itcmd), 300);
        assert_eq!(report.requests, 2);

        let offsets: Vec<_> = fetcher.source.calls().into_iter().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0, 2]);
        assert_eq!(fetcher.pacer().clock().sleeps(), vec![INTERVAL]);
    }

    #[tokio::test]
    async fn empty_page_claiming_more_is_a_cell_failure() {
        let source = ScriptedSource::default().with(
            RegionCode::Goias,
            Scripted::Pages(vec![page(vec![], true)]),
        );
        let plan = SweepPlan::new(&[2022], &[sub(1)], &[RegionCode::Goias]).expect("plan");
        let report = fetcher(source).sweep(&plan).await;
        assert_eq!(report.failures.len(), 1);
        assert!(report.aggregates[0].is_zero());
    }

    #[tokio::test]
    async fn page_cap_stops_runaway_pagination() {
        let pages = (0..5)
            .map(|_| page(vec![LineItem::new("ICMS", 1.0)], true))
            .collect();
        let source = ScriptedSource::default().with(RegionCode::Piaui, Scripted::Pages(pages));
        let plan = SweepPlan::new(&[2022], &[sub(1)], &[RegionCode::Piaui]).expect("plan");
        let mut fetcher = fetcher(source).with_max_pages(3);
        let report = fetcher.sweep(&plan).await;
        assert_eq!(report.requests, 3);
        assert_eq!(report.failures.len(), 1);
        assert!(report.aggregates[0].is_zero());
    }

    #[tokio::test]
    async fn output_grid_is_dense_over_the_plan() {
        let plan = SweepPlan::new(&[2019, 2020], &SubPeriod::all(), &RegionCode::ALL).expect("plan");
        let report = fetcher(ScriptedSource::default()).sweep(&plan).await;
        assert_eq!(report.aggregates.len(), 2 * 6 * 27);
        assert!(report.aggregates.iter().all(|a| a.is_zero()));
        assert!(report.failures.is_empty());
    }
}
