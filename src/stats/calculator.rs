//! Statistics Calculator Module
//! Descriptive statistics over the 30-day death rates in the outcome table.

use crate::data::{OutcomeMeasure, OutcomeTable, COL_CAUSE, COL_RATE, COL_STATE};
use polars::prelude::*;

/// Descriptive statistics for a set of 30-day death rates.
#[derive(Debug, Clone)]
pub struct RateStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p95: f64,
    pub p05: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for RateStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            p95: f64::NAN,
            p05: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Handles statistical calculations over the outcome table.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of rates.
    pub fn compute_rate_stats(values: &[f64]) -> RateStats {
        let n = values.len();
        if n == 0 {
            return RateStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std = variance.sqrt();

        RateStats {
            count: n,
            mean,
            median,
            std,
            variance,
            p95: Self::percentile(&sorted, 95.0),
            p05: Self::percentile(&sorted, 5.0),
            min: sorted[0],
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation.
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// All 30-day rates for an outcome, across every state in the table.
    pub fn rates_for_outcome(table: &OutcomeTable, measure: OutcomeMeasure) -> Vec<f64> {
        table
            .frame()
            .clone()
            .lazy()
            .filter(col(COL_CAUSE).eq(lit(measure.name())))
            .select([col(COL_RATE)])
            .collect()
            .ok()
            .and_then(|df| df.column(COL_RATE).ok().cloned())
            .map(|col| {
                col.f64()
                    .ok()
                    .map(|ca| ca.into_iter().filter_map(|v| v).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// 30-day rates for a specific state AND outcome.
    pub fn rates_for_state_and_outcome(
        table: &OutcomeTable,
        state: &str,
        measure: OutcomeMeasure,
    ) -> Vec<f64> {
        table
            .frame()
            .clone()
            .lazy()
            .filter(
                col(COL_CAUSE)
                    .eq(lit(measure.name()))
                    .and(col(COL_STATE).eq(lit(state))),
            )
            .select([col(COL_RATE)])
            .collect()
            .ok()
            .and_then(|df| df.column(COL_RATE).ok().cloned())
            .map(|col| {
                col.f64()
                    .ok()
                    .map(|ca| ca.into_iter().filter_map(|v| v).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Per-state summaries for an outcome, in alphabetical state order.
    ///
    /// Only states with at least one rate for the outcome appear.
    pub fn state_summaries(
        table: &OutcomeTable,
        measure: OutcomeMeasure,
    ) -> Vec<(String, RateStats)> {
        let cause_df = table
            .frame()
            .clone()
            .lazy()
            .filter(col(COL_CAUSE).eq(lit(measure.name())))
            .collect()
            .unwrap_or_default();

        let mut states: Vec<String> = cause_df
            .column(COL_STATE)
            .ok()
            .and_then(|col| col.unique().ok())
            .map(|unique| {
                unique
                    .as_materialized_series()
                    .iter()
                    .filter_map(|v| {
                        if v.is_null() {
                            None
                        } else {
                            Some(v.to_string().trim_matches('"').to_string())
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        states.sort();

        states
            .into_iter()
            .map(|state| {
                let values = Self::rates_for_state_and_outcome(table, &state, measure);
                let stats = Self::compute_rate_stats(&values);
                (state, stats)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnBindings, Reshaper};
    use polars::prelude::{Column, DataFrame};

    #[test]
    fn descriptive_stats_on_known_values() {
        let stats = StatsCalculator::compute_rate_stats(&[9.0, 10.0, 11.0, 12.0, 13.0]);
        assert_eq!(stats.count, 5);
        assert!((stats.mean - 11.0).abs() < 1e-9);
        assert!((stats.median - 11.0).abs() < 1e-9);
        assert!((stats.variance - 2.5).abs() < 1e-9);
        assert!((stats.min - 9.0).abs() < 1e-9);
        assert!((stats.max - 13.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [10.0, 20.0, 30.0];
        // rank 0.1 between the first two values
        assert!((StatsCalculator::percentile(&sorted, 5.0) - 11.0).abs() < 1e-9);
        assert!((StatsCalculator::percentile(&sorted, 50.0) - 20.0).abs() < 1e-9);
        assert!((StatsCalculator::percentile(&sorted, 95.0) - 29.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_yields_zero_count() {
        let stats = StatsCalculator::compute_rate_stats(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn state_summaries_cover_states_with_data() {
        let df = DataFrame::new(vec![
            Column::new("State".into(), vec!["TX", "TX", "AL"]),
            Column::new(
                "Hospital Name".into(),
                vec!["Hospital A", "Hospital B", "Hospital C"],
            ),
            Column::new("HA Rate".into(), vec![Some(10.0), Some(12.0), Some(9.0)]),
            Column::new("HF Rate".into(), vec![None::<f64>, None, None]),
            Column::new("PN Rate".into(), vec![None::<f64>, None, None]),
        ])
        .unwrap();
        let bindings = ColumnBindings {
            state: "State".to_string(),
            hospital: "Hospital Name".to_string(),
            heart_attack: "HA Rate".to_string(),
            heart_failure: "HF Rate".to_string(),
            pneumonia: "PN Rate".to_string(),
        };
        let table = Reshaper::build_outcome_table(&df, &bindings).unwrap();

        let summaries = StatsCalculator::state_summaries(&table, OutcomeMeasure::HeartAttack);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].0, "AL");
        assert_eq!(summaries[1].0, "TX");
        assert_eq!(summaries[1].1.count, 2);
        assert!((summaries[1].1.mean - 11.0).abs() < 1e-9);

        assert!(StatsCalculator::state_summaries(&table, OutcomeMeasure::Pneumonia).is_empty());
    }
}
