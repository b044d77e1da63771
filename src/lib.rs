//! # Related Months Report
//!
//! A library for comparing establishment sales across related calendar months,
//! built from monthly transaction exports.
//!
//! ## Core Concepts
//!
//! - **Period Key**: a calendar month written `YYYY-MM`, with exact month arithmetic
//! - **Related-Period Chain**: for reference month R, `[R-13, R-12, R-11, R-1, R]`,
//!   keeping only months that have data
//! - **Aggregate Row**: total value and record count per (period, establishment)
//! - **Wide Table**: one row per establishment, one column per (metric, period),
//!   zero-filled, plus percentage growth between adjacent chain periods
//!
//! ## Example
//!
//! ```rust
//! use related_months_report::*;
//!
//! let p = |s: &str| PeriodKey::parse(s).unwrap();
//! let records = vec![
//!     Record::new(p("2023-01"), "A", 100.0),
//!     Record::new(p("2023-01"), "A", 50.0),
//!     Record::new(p("2024-01"), "A", 200.0),
//! ];
//!
//! let report = build_related_months_report(&records, "2024-01", &ComparisonConfig::default())
//!     .unwrap();
//!
//! assert_eq!(report.table.column_names(), vec![
//!     "total_value_2023-01",
//!     "total_value_2024-01",
//!     "count_2023-01",
//!     "count_2024-01",
//!     "growth_2024-01",
//! ]);
//! ```

pub mod aggregator;
pub mod engine;
pub mod error;
pub mod export;
pub mod growth;
pub mod ingestion;
pub mod period;
pub mod report;
pub mod schema;
pub mod selector;
pub mod table;

pub use aggregator::{aggregate, AggregateRow};
pub use engine::{compare_dataset, ComparisonEngine, RelatedMonthsReport};
pub use error::{ReportError, Result};
pub use growth::{add_growth_columns, growth_pairs, percent_change};
pub use ingestion::{parse_amount, parse_sale_date, Dataset};
pub use period::{months_between, PeriodKey, MAX_YEAR, MIN_YEAR};
pub use report::*;
pub use schema::*;
pub use selector::{available_periods, related_periods, select_related_periods, RELATED_OFFSETS};
pub use table::{ColumnKey, Metric, WideRow, WideTable};

use log::info;
use std::io::Read;

pub struct RelatedMonthsProcessor;

impl RelatedMonthsProcessor {
    pub fn process(
        records: &[Record],
        reference: &str,
        config: &ComparisonConfig,
    ) -> Result<RelatedMonthsReport> {
        config.validate()?;
        let reference = PeriodKey::parse(reference)?;
        ComparisonEngine::from_config(config).compare(records, reference)
    }

    /// Reads and merges CSV exports, then runs the comparison.
    pub fn process_csv<R: Read>(
        readers: Vec<R>,
        reference: &str,
        config: &ComparisonConfig,
    ) -> Result<RelatedMonthsReport> {
        let datasets = readers
            .into_iter()
            .map(Dataset::from_csv_reader)
            .collect::<Result<Vec<_>>>()?;
        info!("Merging {} exported files", datasets.len());

        let merged = Dataset::concat(datasets);
        compare_dataset(&merged, reference, config)
    }
}

pub fn build_related_months_report(
    records: &[Record],
    reference: &str,
    config: &ComparisonConfig,
) -> Result<RelatedMonthsReport> {
    RelatedMonthsProcessor::process(records, reference, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PeriodKey {
        PeriodKey::parse(s).unwrap()
    }

    #[test]
    fn test_end_to_end_processing() {
        let records = vec![
            Record::new(p("2023-01"), "A", 100.0),
            Record::new(p("2023-01"), "A", 50.0),
            Record::new(p("2024-01"), "A", 200.0),
        ];

        let result = build_related_months_report(&records, "2024-01", &ComparisonConfig::default());
        assert!(result.is_ok());

        let report = result.unwrap();
        let table = &report.table;
        assert_eq!(table.value("A", &ColumnKey::total_value(p("2023-01"))), Some(150.0));
        assert_eq!(table.value("A", &ColumnKey::total_value(p("2024-01"))), Some(200.0));
        assert_eq!(table.value("A", &ColumnKey::count(p("2023-01"))), Some(2.0));
        assert_eq!(table.value("A", &ColumnKey::count(p("2024-01"))), Some(1.0));

        let growth = table.value("A", &ColumnKey::growth(p("2024-01"))).unwrap();
        assert!((growth - 33.33).abs() < 0.01, "growth was {}", growth);
    }

    #[test]
    fn test_invalid_reference_period() {
        let result = build_related_months_report(&[], "January", &ComparisonConfig::default());
        assert!(matches!(result, Err(ReportError::InvalidPeriod(_))));
    }

    #[test]
    fn test_process_csv_merges_monthly_files() {
        let last_year = "AnoMes,NomeEstab,ValorTotal\n2023-01,A,100\n2023-01,B,40\n";
        let this_year = "NomeEstab,AnoMes,ValorTotal,TipoVenda\nA,2024-01,90,Online\nB,2024-01,\"60,5\",Online\n";

        let config = ComparisonConfig {
            columns: ColumnMapping::sales_export(),
            ..ComparisonConfig::default()
        };
        let report = RelatedMonthsProcessor::process_csv(
            vec![last_year.as_bytes(), this_year.as_bytes()],
            "2024-01",
            &config,
        )
        .unwrap();

        assert_eq!(report.chain, vec![p("2023-01"), p("2024-01")]);
        assert_eq!(report.table.establishments().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(report.table.value("B", &ColumnKey::total_value(p("2024-01"))), Some(60.5));
        assert_eq!(report.table.value("A", &ColumnKey::growth(p("2024-01"))), Some(-10.0));
    }
}
