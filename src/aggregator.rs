use crate::period::PeriodKey;
use crate::schema::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sum and count of record values for one (period, establishment) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub period: PeriodKey,
    pub establishment: String,
    pub total_value: f64,
    pub count: usize,
}

/// Groups the records whose period is in `included` by (period, establishment).
///
/// Only pairs with at least one record appear. Rows come out ordered by
/// period, then establishment.
pub fn aggregate(records: &[Record], included: &[PeriodKey]) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<(PeriodKey, &str), (f64, usize)> = BTreeMap::new();

    for record in records.iter().filter(|r| included.contains(&r.period)) {
        let entry = groups
            .entry((record.period, record.establishment.as_str()))
            .or_insert((0.0, 0));
        entry.0 += record.value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((period, establishment), (total_value, count))| AggregateRow {
            period,
            establishment: establishment.to_string(),
            total_value,
            count,
        })
        .collect()
}
