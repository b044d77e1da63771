use crate::period::PeriodKey;
use crate::schema::GrowthPairing;
use crate::table::{ColumnKey, WideTable};

/// Percentage change from `previous` to `current`.
///
/// A zero denominator or a non-finite result yields 0.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let change = (current - previous) / previous * 100.0;
    if change.is_finite() {
        change
    } else {
        0.0
    }
}

/// The (previous, current) period pairs growth is computed for.
pub fn growth_pairs(chain: &[PeriodKey], pairing: GrowthPairing) -> Vec<(PeriodKey, PeriodKey)> {
    let ordered: Vec<PeriodKey> = match pairing {
        GrowthPairing::ChainOrder => chain.to_vec(),
        GrowthPairing::Chronological => {
            let mut sorted = chain.to_vec();
            sorted.sort();
            sorted
        }
    };

    ordered.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Returns a copy of `table` with one `growth` column per adjacent pair,
/// keyed by the later period of the pair.
///
/// Chains shorter than two periods produce no growth columns.
pub fn add_growth_columns(
    table: &WideTable,
    chain: &[PeriodKey],
    pairing: GrowthPairing,
) -> WideTable {
    let mut result = table.clone();

    for (previous, current) in growth_pairs(chain, pairing) {
        let (Some(before), Some(after)) = (
            table.column_values(&ColumnKey::total_value(previous)),
            table.column_values(&ColumnKey::total_value(current)),
        ) else {
            log::debug!(
                "Skipping growth {} -> {}: total value column not in table",
                previous,
                current
            );
            continue;
        };

        let growth: Vec<f64> = before
            .iter()
            .zip(&after)
            .map(|(b, a)| percent_change(*b, *a))
            .collect();
        result = result.with_column(ColumnKey::growth(current), &growth);
    }

    result
}
