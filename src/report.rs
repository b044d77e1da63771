//! Secondary report sections built from the same records: consolidated
//! totals, per-period pivots, category breakdowns and the sales target.

use crate::growth::percent_change;
use crate::ingestion::parse_amount;
use crate::period::PeriodKey;
use crate::schema::Record;
use crate::table::descending_nan_last;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const TOTAL_LABEL: &str = "Total";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRow {
    pub label: String,
    /// `None` marks a cell with no meaningful number (e.g. a non-summed
    /// column on the total row).
    pub cells: Vec<Option<f64>>,
}

/// A small report table: a label column followed by numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledTable {
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<LabeledRow>,
}

impl LabeledTable {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn row(&self, label: &str) -> Option<&LabeledRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn cell(&self, label: &str, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.row(label)?.cells.get(idx).copied().flatten()
    }
}

/// Returns a copy of `table` with a `Total` row appended.
///
/// Columns named in `value_columns` are summed; every other column is `None`
/// on the total row.
pub fn add_total_row(table: &LabeledTable, value_columns: &[&str]) -> LabeledTable {
    let cells = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            value_columns.contains(&column.as_str()).then(|| {
                table
                    .rows
                    .iter()
                    .filter_map(|r| r.cells.get(idx).copied().flatten())
                    .sum::<f64>()
            })
        })
        .collect();

    let mut result = table.clone();
    result.rows.push(LabeledRow {
        label: TOTAL_LABEL.to_string(),
        cells,
    });
    result
}

/// Inclusive range of sale dates read from a date attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub attribute: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Records with a missing or unreadable date fall outside every range.
    pub fn contains(&self, record: &Record) -> bool {
        record
            .date(&self.attribute)
            .is_some_and(|date| self.start <= date && date <= self.end)
    }
}

/// Which records a report section looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub periods: BTreeSet<PeriodKey>,
    /// `None` keeps every establishment.
    pub establishments: Option<BTreeSet<String>>,
    /// `None` keeps every sale date.
    pub date_range: Option<DateRange>,
}

impl RecordFilter {
    pub fn periods(periods: impl IntoIterator<Item = PeriodKey>) -> Self {
        Self {
            periods: periods.into_iter().collect(),
            establishments: None,
            date_range: None,
        }
    }

    pub fn with_establishments<S: Into<String>>(
        mut self,
        establishments: impl IntoIterator<Item = S>,
    ) -> Self {
        self.establishments = Some(establishments.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_date_range(mut self, attribute: &str, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange {
            attribute: attribute.to_string(),
            start,
            end,
        });
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.periods.contains(&record.period)
            && self
                .establishments
                .as_ref()
                .map_or(true, |set| set.contains(&record.establishment))
            && self
                .date_range
                .as_ref()
                .map_or(true, |range| range.contains(record))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedSummary {
    pub total_value: f64,
    pub record_count: usize,
    pub establishment_count: usize,
    /// Distinct non-blank values of the line attribute.
    pub line_count: usize,
    /// Average value per record; 0 when there are no records.
    pub average_ticket: f64,
}

impl ConsolidatedSummary {
    pub fn from_records(records: &[Record], filter: &RecordFilter, line_attribute: &str) -> Self {
        let mut total_value = 0.0;
        let mut record_count = 0;
        let mut establishments = BTreeSet::new();
        let mut lines = BTreeSet::new();

        for record in records.iter().filter(|r| filter.matches(r)) {
            total_value += record.value;
            record_count += 1;
            establishments.insert(record.establishment.as_str());
            if let Some(line) = record.filled_attribute(line_attribute) {
                lines.insert(line);
            }
        }

        let average_ticket = if record_count > 0 {
            total_value / record_count as f64
        } else {
            0.0
        };

        Self {
            total_value,
            record_count,
            establishment_count: establishments.len(),
            line_count: lines.len(),
            average_ticket,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PivotIndex {
    Establishment,
    Attribute(String),
}

impl PivotIndex {
    fn label<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            PivotIndex::Establishment => Some(record.establishment.as_str()),
            PivotIndex::Attribute(name) => record.attribute(name),
        }
    }

    fn name(&self) -> &str {
        match self {
            PivotIndex::Establishment => "establishment",
            PivotIndex::Attribute(name) => name.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measure {
    SumValue,
    /// Sums a numeric attribute such as a discount column.
    SumAttribute(String),
    Count,
}

impl Measure {
    fn name(&self) -> &str {
        match self {
            Measure::SumValue => "value",
            Measure::SumAttribute(name) => name.as_str(),
            Measure::Count => "count",
        }
    }

    fn amount(&self, record: &Record) -> f64 {
        match self {
            Measure::SumValue => record.value,
            Measure::SumAttribute(name) => {
                record.attribute(name).and_then(parse_amount).unwrap_or(0.0)
            }
            Measure::Count => 1.0,
        }
    }
}

/// Label × period table of `measure`, zero-filled.
///
/// Labels are sorted; columns are the filtered periods that have data, in
/// date order. Records without the index attribute are left out.
pub fn period_pivot(
    records: &[Record],
    filter: &RecordFilter,
    index: &PivotIndex,
    measure: &Measure,
) -> LabeledTable {
    let mut cells: BTreeMap<(&str, PeriodKey), f64> = BTreeMap::new();
    let mut labels = BTreeSet::new();
    let mut periods = BTreeSet::new();

    for record in records.iter().filter(|r| filter.matches(r)) {
        let Some(label) = index.label(record) else {
            continue;
        };
        labels.insert(label);
        periods.insert(record.period);
        *cells.entry((label, record.period)).or_insert(0.0) += measure.amount(record);
    }

    let rows = labels
        .into_iter()
        .map(|label| LabeledRow {
            label: label.to_string(),
            cells: periods
                .iter()
                .map(|p| Some(cells.get(&(label, *p)).copied().unwrap_or(0.0)))
                .collect(),
        })
        .collect();

    LabeledTable {
        index_name: index.name().to_string(),
        columns: periods.iter().map(PeriodKey::format).collect(),
        rows,
    }
}

/// The `n` labels with the largest summed `measure`, highest first.
///
/// One column named after the measure. Ties keep label order; NaN sums go last.
pub fn top_n(
    records: &[Record],
    filter: &RecordFilter,
    index: &PivotIndex,
    measure: &Measure,
    n: usize,
) -> LabeledTable {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records.iter().filter(|r| filter.matches(r)) {
        if let Some(label) = index.label(record) {
            *totals.entry(label).or_insert(0.0) += measure.amount(record);
        }
    }

    let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| descending_nan_last(a.1, b.1));
    ranked.truncate(n);

    LabeledTable {
        index_name: index.name().to_string(),
        columns: vec![measure.name().to_string()],
        rows: ranked
            .into_iter()
            .map(|(label, total)| LabeledRow {
                label: label.to_string(),
                cells: vec![Some(total)],
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteRow {
    pub establishment: String,
    pub origin: String,
    pub destination: String,
}

/// Distinct (establishment, origin, destination) triples in first-seen order.
///
/// Records missing either endpoint are left out.
pub fn route_table(
    records: &[Record],
    filter: &RecordFilter,
    origin_attribute: &str,
    destination_attribute: &str,
) -> Vec<RouteRow> {
    let mut seen = HashSet::new();
    let mut routes = Vec::new();

    for record in records.iter().filter(|r| filter.matches(r)) {
        let (Some(origin), Some(destination)) = (
            record.filled_attribute(origin_attribute),
            record.filled_attribute(destination_attribute),
        ) else {
            continue;
        };
        let route = RouteRow {
            establishment: record.establishment.clone(),
            origin: origin.to_string(),
            destination: destination.to_string(),
        };
        if seen.insert(route.clone()) {
            routes.push(route);
        }
    }

    routes
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Number of sales per weekday, Monday to Sunday, read from a date attribute.
///
/// Every weekday gets a row; records without a readable date are not counted.
pub fn weekday_counts(records: &[Record], filter: &RecordFilter, date_attribute: &str) -> LabeledTable {
    let mut counts = [0usize; 7];
    for record in records.iter().filter(|r| filter.matches(r)) {
        if let Some(date) = record.date(date_attribute) {
            counts[date.weekday().num_days_from_monday() as usize] += 1;
        }
    }

    LabeledTable {
        index_name: "weekday".to_string(),
        columns: vec!["sales".to_string()],
        rows: WEEK
            .iter()
            .zip(counts)
            .map(|(day, count)| LabeledRow {
                label: weekday_label(*day).to_string(),
                cells: vec![Some(count as f64)],
            })
            .collect(),
    }
}

/// Cell-wise `discount / value × 100`, matched by row label and column.
///
/// Cells with no matching value, a zero value, or a non-finite ratio are 0.
pub fn discount_share(discounts: &LabeledTable, values: &LabeledTable) -> LabeledTable {
    let rows = discounts
        .rows
        .iter()
        .map(|row| LabeledRow {
            label: row.label.clone(),
            cells: discounts
                .columns
                .iter()
                .zip(&row.cells)
                .map(|(column, discount)| {
                    let discount = discount.unwrap_or(0.0);
                    let value = values.cell(&row.label, column).unwrap_or(0.0);
                    Some(share_percent(discount, value))
                })
                .collect(),
        })
        .collect();

    LabeledTable {
        index_name: discounts.index_name.clone(),
        columns: discounts.columns.clone(),
        rows,
    }
}

/// Per category value of `attribute`: record count per period, then each
/// count's share of its period total (rounded to 2 decimals).
pub fn category_breakdown(records: &[Record], filter: &RecordFilter, attribute: &str) -> LabeledTable {
    let counts = period_pivot(
        records,
        filter,
        &PivotIndex::Attribute(attribute.to_string()),
        &Measure::Count,
    );

    let period_totals: Vec<f64> = (0..counts.columns.len())
        .map(|idx| {
            counts
                .rows
                .iter()
                .filter_map(|r| r.cells[idx])
                .sum()
        })
        .collect();

    let columns = counts
        .columns
        .iter()
        .map(|p| format!("count_{}", p))
        .chain(counts.columns.iter().map(|p| format!("percent_{}", p)))
        .collect();

    let rows = counts
        .rows
        .iter()
        .map(|row| {
            let shares: Vec<Option<f64>> = row
                .cells
                .iter()
                .zip(&period_totals)
                .map(|(count, total)| {
                    let share = share_percent(count.unwrap_or(0.0), *total);
                    Some((share * 100.0).round() / 100.0)
                })
                .collect();
            LabeledRow {
                label: row.label.clone(),
                cells: row.cells.iter().copied().chain(shares).collect(),
            }
        })
        .collect();

    LabeledTable {
        index_name: counts.index_name,
        columns,
        rows,
    }
}

fn share_percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let share = part / whole * 100.0;
    if share.is_finite() {
        share
    } else {
        0.0
    }
}

/// Sales goal for a month: last year's same month times an uplift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTarget {
    pub reference: PeriodKey,
    pub previous_year_total: f64,
    pub target: f64,
    pub achieved: f64,
    /// Growth of `achieved` over `previous_year_total`, 0 when undefined.
    pub delta_percent: f64,
    pub attained: bool,
}

impl SalesTarget {
    pub fn compute(
        records: &[Record],
        reference: PeriodKey,
        uplift: f64,
        establishments: Option<&BTreeSet<String>>,
    ) -> Self {
        let previous_period = reference.offset(-12);
        let selected = |r: &&Record| establishments.map_or(true, |set| set.contains(&r.establishment));

        let total_for = |period: PeriodKey| -> f64 {
            records
                .iter()
                .filter(selected)
                .filter(|r| r.period == period)
                .map(|r| r.value)
                .sum()
        };

        let previous_year_total = total_for(previous_period);
        let achieved = total_for(reference);
        let target = previous_year_total * uplift;

        Self {
            reference,
            previous_year_total,
            target,
            achieved,
            delta_percent: percent_change(previous_year_total, achieved),
            attained: achieved >= target,
        }
    }
}
