use crate::aggregator::{aggregate, AggregateRow};
use crate::error::Result;
use crate::growth::add_growth_columns;
use crate::ingestion::Dataset;
use crate::period::PeriodKey;
use crate::report::SalesTarget;
use crate::schema::{ComparisonConfig, GrowthPairing, Record};
use crate::selector::{available_periods, select_related_periods};
use crate::table::WideTable;
use log::{debug, info};
use serde::Serialize;

/// Everything one related-months comparison produced.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedMonthsReport {
    pub reference: PeriodKey,
    /// Related periods that had data, in chain order.
    pub chain: Vec<PeriodKey>,
    pub aggregates: Vec<AggregateRow>,
    pub table: WideTable,
    /// Reference month against last year's same month times the uplift.
    pub target: SalesTarget,
}

pub struct ComparisonEngine {
    growth_pairing: GrowthPairing,
    target_uplift: f64,
}

impl ComparisonEngine {
    pub fn new(growth_pairing: GrowthPairing) -> Self {
        Self {
            growth_pairing,
            target_uplift: ComparisonConfig::default().target_uplift,
        }
    }

    pub fn with_target_uplift(mut self, target_uplift: f64) -> Self {
        self.target_uplift = target_uplift;
        self
    }

    pub fn from_config(config: &ComparisonConfig) -> Self {
        Self::new(config.growth_pairing).with_target_uplift(config.target_uplift)
    }

    pub fn compare(&self, records: &[Record], reference: PeriodKey) -> Result<RelatedMonthsReport> {
        info!(
            "Building related-months comparison for {} over {} records",
            reference,
            records.len()
        );

        let available = available_periods(records);
        let chain = select_related_periods(reference, &available);
        debug!(
            "Related periods with data: [{}]",
            chain
                .iter()
                .map(PeriodKey::format)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let aggregates = aggregate(records, &chain);
        debug!("Aggregated into {} (period, establishment) groups", aggregates.len());

        let wide = WideTable::pivot(&aggregates, &chain);
        let with_growth = add_growth_columns(&wide, &chain, self.growth_pairing);
        let table = with_growth.sort_by_reference(reference)?;
        debug!(
            "Comparison table has {} establishments and {} columns",
            table.len(),
            table.columns().len()
        );

        let target = SalesTarget::compute(records, reference, self.target_uplift, None);

        Ok(RelatedMonthsReport {
            reference,
            chain,
            aggregates,
            table,
            target,
        })
    }
}

/// Runs the comparison straight from a raw dataset and a `YYYY-MM` reference.
pub fn compare_dataset(
    dataset: &Dataset,
    reference: &str,
    config: &ComparisonConfig,
) -> Result<RelatedMonthsReport> {
    config.validate()?;
    let reference = PeriodKey::parse(reference)?;
    let records = dataset.to_records(&config.columns)?;
    ComparisonEngine::from_config(config).compare(&records, reference)
}
