use crate::error::{ReportError, Result};
use crate::period::PeriodKey;
use crate::schema::{ColumnMapping, Record};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::BTreeMap;
use std::io::Read;

/// A raw table of string cells, as read from one or more export files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Builds a dataset, padding or truncating each row to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    /// Merges several exports into one dataset.
    ///
    /// Headers are the union of all inputs in first-seen order; cells a file
    /// does not have are left empty.
    pub fn concat(datasets: Vec<Dataset>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for dataset in &datasets {
            for header in &dataset.headers {
                if !headers.contains(header) {
                    headers.push(header.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for dataset in datasets {
            let mapping: Vec<Option<usize>> = headers
                .iter()
                .map(|h| dataset.column_index(h))
                .collect();
            for row in dataset.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        Self { headers, rows }
    }

    /// Sets `name` to `value` on every row, adding the column if needed.
    pub fn with_constant_column(&self, name: &str, value: &str) -> Self {
        let mut dataset = self.clone();
        match dataset.column_index(name) {
            Some(idx) => {
                let width = dataset.headers.len();
                for row in &mut dataset.rows {
                    row.resize(width, String::new());
                    row[idx] = value.to_string();
                }
            }
            None => {
                dataset.headers.push(name.to_string());
                for row in &mut dataset.rows {
                    row.push(value.to_string());
                }
            }
        }
        dataset
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts rows to records using the mapped period, establishment and
    /// value columns; every other column becomes an attribute.
    ///
    /// Rows with a blank value cell are skipped.
    pub fn to_records(&self, columns: &ColumnMapping) -> Result<Vec<Record>> {
        let mut indices = [0usize; 3];
        for (slot, name) in indices.iter_mut().zip(columns.required()) {
            *slot = self
                .column_index(name)
                .ok_or_else(|| ReportError::MissingRequiredField(name.to_string()))?;
        }
        let [period_idx, establishment_idx, value_idx] = indices;

        let mut records = Vec::with_capacity(self.rows.len());
        let mut skipped = 0usize;

        for (row_idx, row) in self.rows.iter().enumerate() {
            let raw_value = cell(row, value_idx).trim();
            if raw_value.is_empty() {
                skipped += 1;
                continue;
            }

            let value = parse_amount(raw_value).ok_or_else(|| ReportError::InvalidValue {
                row: row_idx + 1,
                column: columns.value.clone(),
                value: raw_value.to_string(),
            })?;
            let period = PeriodKey::parse(cell(row, period_idx).trim())?;

            let attributes: BTreeMap<String, String> = self
                .headers
                .iter()
                .zip(row)
                .enumerate()
                .filter(|(i, _)| ![period_idx, establishment_idx, value_idx].contains(i))
                .map(|(_, (h, v))| (h.clone(), v.clone()))
                .collect();

            records.push(Record {
                period,
                establishment: cell(row, establishment_idx).trim().to_string(),
                value,
                attributes,
            });
        }

        if skipped > 0 {
            debug!(
                "Skipped {} rows with no '{}' value",
                skipped, columns.value
            );
        }

        Ok(records)
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Parses an amount, accepting a decimal comma (`"12,50"`).
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Parses a sale date, with or without a time of day. Times are dropped.
pub fn parse_sale_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}
