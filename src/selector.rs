use crate::period::PeriodKey;
use crate::schema::Record;
use std::collections::BTreeSet;

/// Month offsets of the related-period chain, relative to the reference month.
pub const RELATED_OFFSETS: [i32; 5] = [-13, -12, -11, -1, 0];

/// The full chain for `reference`: the month before, the same month and the
/// month after in the previous year, then the previous month and the
/// reference itself.
pub fn related_periods(reference: PeriodKey) -> [PeriodKey; 5] {
    RELATED_OFFSETS.map(|offset| reference.offset(offset))
}

/// The related chain restricted to periods that actually have data.
///
/// Chain order is kept. The reference itself is dropped when it is not
/// available.
pub fn select_related_periods(
    reference: PeriodKey,
    available: &BTreeSet<PeriodKey>,
) -> Vec<PeriodKey> {
    related_periods(reference)
        .into_iter()
        .filter(|period| available.contains(period))
        .collect()
}

pub fn available_periods(records: &[Record]) -> BTreeSet<PeriodKey> {
    records.iter().map(|r| r.period).collect()
}
