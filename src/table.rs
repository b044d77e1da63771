//! Establishment-indexed wide table with one column per (metric, period).
//!
//! Columns are addressed by [`ColumnKey`]; the `total_value_2024-01` style
//! names exist only for display and export.

use crate::aggregator::AggregateRow;
use crate::error::{ReportError, Result};
use crate::period::PeriodKey;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalValue,
    Count,
    Growth,
}

impl Metric {
    pub fn prefix(&self) -> &'static str {
        match self {
            Metric::TotalValue => "total_value",
            Metric::Count => "count",
            Metric::Growth => "growth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    pub metric: Metric,
    pub period: PeriodKey,
}

impl ColumnKey {
    pub fn new(metric: Metric, period: PeriodKey) -> Self {
        Self { metric, period }
    }

    pub fn total_value(period: PeriodKey) -> Self {
        Self::new(Metric::TotalValue, period)
    }

    pub fn count(period: PeriodKey) -> Self {
        Self::new(Metric::Count, period)
    }

    pub fn growth(period: PeriodKey) -> Self {
        Self::new(Metric::Growth, period)
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.metric.prefix(), self.period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideRow {
    pub establishment: String,
    /// Aligned with [`WideTable::columns`].
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WideTable {
    columns: Vec<ColumnKey>,
    #[serde(skip)]
    positions: HashMap<ColumnKey, usize>,
    rows: Vec<WideRow>,
}

impl PartialEq for WideTable {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

impl WideTable {
    /// Pivots aggregate rows into one row per establishment.
    ///
    /// Columns are `total_value` for every chain period, then `count` for
    /// every chain period, both in chain order. Rows are sorted by
    /// establishment name and zero-filled where a pair had no records.
    pub fn pivot(aggregates: &[AggregateRow], chain: &[PeriodKey]) -> Self {
        let columns: Vec<ColumnKey> = chain
            .iter()
            .map(|p| ColumnKey::total_value(*p))
            .chain(chain.iter().map(|p| ColumnKey::count(*p)))
            .collect();
        let positions = index_columns(&columns);

        let establishments: BTreeSet<&str> = aggregates
            .iter()
            .filter(|a| chain.contains(&a.period))
            .map(|a| a.establishment.as_str())
            .collect();

        let mut rows: BTreeMap<&str, Vec<f64>> = establishments
            .into_iter()
            .map(|e| (e, vec![0.0; columns.len()]))
            .collect();

        for agg in aggregates {
            let (Some(&total_pos), Some(&count_pos)) = (
                positions.get(&ColumnKey::total_value(agg.period)),
                positions.get(&ColumnKey::count(agg.period)),
            ) else {
                continue;
            };
            if let Some(values) = rows.get_mut(agg.establishment.as_str()) {
                values[total_pos] += agg.total_value;
                values[count_pos] += agg.count as f64;
            }
        }

        Self {
            columns,
            positions,
            rows: rows
                .into_iter()
                .map(|(establishment, values)| WideRow {
                    establishment: establishment.to_string(),
                    values,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(ColumnKey::to_string).collect()
    }

    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, key: &ColumnKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn establishments(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.establishment.as_str())
    }

    pub fn row(&self, establishment: &str) -> Option<&WideRow> {
        self.rows.iter().find(|r| r.establishment == establishment)
    }

    pub fn value(&self, establishment: &str, key: &ColumnKey) -> Option<f64> {
        let pos = *self.positions.get(key)?;
        self.row(establishment).map(|r| r.values[pos])
    }

    /// Every value of one column, in row order.
    pub fn column_values(&self, key: &ColumnKey) -> Option<Vec<f64>> {
        let pos = *self.positions.get(key)?;
        Some(self.rows.iter().map(|r| r.values[pos]).collect())
    }

    /// Returns a copy of the table with `key` appended as the last column.
    ///
    /// `values` must be in row order; an existing column with the same key is
    /// overwritten in place.
    pub fn with_column(&self, key: ColumnKey, values: &[f64]) -> Self {
        let mut table = self.clone();
        match table.positions.get(&key).copied() {
            Some(pos) => {
                for (row, v) in table.rows.iter_mut().zip(values) {
                    row.values[pos] = *v;
                }
            }
            None => {
                table.positions.insert(key, table.columns.len());
                table.columns.push(key);
                for (i, row) in table.rows.iter_mut().enumerate() {
                    row.values.push(values.get(i).copied().unwrap_or(0.0));
                }
            }
        }
        table
    }

    /// Orders rows by the reference period's total value, highest first.
    ///
    /// Ties keep their current relative order.
    pub fn sort_by_reference(&self, reference: PeriodKey) -> Result<Self> {
        let pos = *self
            .positions
            .get(&ColumnKey::total_value(reference))
            .ok_or_else(|| ReportError::MissingReferenceColumn(reference.to_string()))?;

        let mut table = self.clone();
        table
            .rows
            .sort_by(|a, b| descending_nan_last(a.values[pos], b.values[pos]));
        Ok(table)
    }

    /// Establishment → column name → value, in row order.
    pub fn to_row_maps(&self) -> Vec<(String, BTreeMap<String, f64>)> {
        let names = self.column_names();
        self.rows
            .iter()
            .map(|row| {
                let cells = names.iter().cloned().zip(row.values.iter().copied()).collect();
                (row.establishment.clone(), cells)
            })
            .collect()
    }
}

/// Total order for descending sorts: larger first, NaN after every number.
/// `-0.0` and `0.0` compare equal.
pub(crate) fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn index_columns(columns: &[ColumnKey]) -> HashMap<ColumnKey, usize> {
    columns.iter().enumerate().map(|(i, c)| (*c, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PeriodKey {
        PeriodKey::parse(s).unwrap()
    }

    fn agg(period: &str, establishment: &str, total_value: f64, count: usize) -> AggregateRow {
        AggregateRow {
            period: p(period),
            establishment: establishment.to_string(),
            total_value,
            count,
        }
    }

    #[test]
    fn test_pivot_column_order_and_names() {
        let chain = [p("2023-01"), p("2024-01")];
        let table = WideTable::pivot(&[agg("2024-01", "A", 10.0, 1)], &chain);

        assert_eq!(
            table.column_names(),
            vec![
                "total_value_2023-01",
                "total_value_2024-01",
                "count_2023-01",
                "count_2024-01"
            ]
        );
        assert_eq!(table.columns().len(), 2 * chain.len());
    }

    #[test]
    fn test_pivot_zero_fills_missing_pairs() {
        let chain = [p("2023-01"), p("2023-12"), p("2024-01")];
        let aggregates = vec![
            agg("2023-01", "B", 40.0, 2),
            agg("2024-01", "A", 10.0, 1),
            agg("2023-12", "C", 5.0, 5),
        ];
        let table = WideTable::pivot(&aggregates, &chain);

        assert_eq!(table.establishments().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        for establishment in ["A", "B", "C"] {
            for period in chain {
                assert!(table
                    .value(establishment, &ColumnKey::total_value(period))
                    .is_some());
                assert!(table.value(establishment, &ColumnKey::count(period)).is_some());
            }
        }
        assert_eq!(table.value("A", &ColumnKey::total_value(p("2023-01"))), Some(0.0));
        assert_eq!(table.value("B", &ColumnKey::count(p("2023-01"))), Some(2.0));
        assert_eq!(table.value("C", &ColumnKey::count(p("2024-01"))), Some(0.0));
    }

    #[test]
    fn test_pivot_ignores_periods_outside_chain() {
        let chain = [p("2024-01")];
        let table = WideTable::pivot(
            &[agg("2024-01", "A", 1.0, 1), agg("2020-01", "Z", 9.0, 9)],
            &chain,
        );
        assert_eq!(table.len(), 1);
        assert!(table.row("Z").is_none());
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let chain = [p("2024-01")];
        let aggregates = vec![
            agg("2024-01", "A", 50.0, 1),
            agg("2024-01", "B", 80.0, 1),
            agg("2024-01", "C", 50.0, 1),
            agg("2024-01", "D", 10.0, 1),
            agg("2024-01", "E", 50.0, 1),
        ];
        let table = WideTable::pivot(&aggregates, &chain);
        let sorted = table.sort_by_reference(p("2024-01")).unwrap();

        assert_eq!(
            sorted.establishments().collect::<Vec<_>>(),
            vec!["B", "A", "C", "E", "D"]
        );
    }

    #[test]
    fn test_sort_puts_nan_last_and_ties_signed_zero() {
        let chain = [p("2024-01")];
        let aggregates = vec![
            agg("2024-01", "A", f64::NAN, 1),
            agg("2024-01", "B", 0.0, 1),
            agg("2024-01", "C", 30.0, 1),
            agg("2024-01", "D", f64::NAN, 1),
            agg("2024-01", "E", -0.0, 1),
            agg("2024-01", "F", 70.0, 1),
            agg("2024-01", "G", -5.0, 1),
        ];
        let table = WideTable::pivot(&aggregates, &chain);
        let sorted = table.sort_by_reference(p("2024-01")).unwrap();

        assert_eq!(
            sorted.establishments().collect::<Vec<_>>(),
            vec!["F", "C", "B", "E", "G", "A", "D"]
        );
    }

    #[test]
    fn test_sort_without_reference_column_fails() {
        let table = WideTable::pivot(&[agg("2023-01", "A", 1.0, 1)], &[p("2023-01")]);
        let err = table.sort_by_reference(p("2024-01")).unwrap_err();
        assert!(matches!(err, ReportError::MissingReferenceColumn(ref r) if r == "2024-01"));
    }

    #[test]
    fn test_with_column_leaves_original_untouched() {
        let table = WideTable::pivot(&[agg("2024-01", "A", 1.0, 1)], &[p("2024-01")]);
        let extended = table.with_column(ColumnKey::growth(p("2024-01")), &[12.5]);

        assert_eq!(table.columns().len(), 2);
        assert_eq!(extended.columns().len(), 3);
        assert_eq!(extended.value("A", &ColumnKey::growth(p("2024-01"))), Some(12.5));
    }

    #[test]
    fn test_row_maps_use_display_names() {
        let table = WideTable::pivot(&[agg("2024-01", "A", 3.0, 2)], &[p("2024-01")]);
        let maps = table.to_row_maps();
        assert_eq!(maps[0].0, "A");
        assert_eq!(maps[0].1.get("total_value_2024-01"), Some(&3.0));
        assert_eq!(maps[0].1.get("count_2024-01"), Some(&2.0));
    }
}
