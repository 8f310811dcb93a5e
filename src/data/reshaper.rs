//! Outcome Reshaper Module
//! Melts the wide measures frame into the long-form ranked outcome table.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Outcome table column names.
pub const COL_STATE: &str = "state";
pub const COL_HOSPITAL: &str = "hospital";
pub const COL_CAUSE: &str = "cause";
pub const COL_RATE: &str = "rate";
pub const COL_RANK_BEST: &str = "rank_best";
pub const COL_RANK_WORST: &str = "rank_worst";
pub const COL_OUT_OF: &str = "out_of";

#[derive(Error, Debug)]
pub enum ReshapeError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
    #[error("Failed to read column bindings: {0}")]
    BindingsIo(#[from] std::io::Error),
    #[error("Failed to parse column bindings: {0}")]
    BindingsJson(#[from] serde_json::Error),
}

/// Cause-of-death categories measured in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeMeasure {
    HeartAttack,
    HeartFailure,
    Pneumonia,
}

impl OutcomeMeasure {
    pub const ALL: [OutcomeMeasure; 3] = [
        OutcomeMeasure::HeartAttack,
        OutcomeMeasure::HeartFailure,
        OutcomeMeasure::Pneumonia,
    ];

    /// Canonical outcome name, as stored in the table and accepted by queries.
    pub fn name(self) -> &'static str {
        match self {
            OutcomeMeasure::HeartAttack => "heart attack",
            OutcomeMeasure::HeartFailure => "heart failure",
            OutcomeMeasure::Pneumonia => "pneumonia",
        }
    }

    /// Exact (case-sensitive) lookup of a canonical outcome name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "heart attack" => Some(OutcomeMeasure::HeartAttack),
            "heart failure" => Some(OutcomeMeasure::HeartFailure),
            "pneumonia" => Some(OutcomeMeasure::Pneumonia),
            _ => None,
        }
    }
}

/// Source-column bindings for the wide measures frame.
///
/// Defaults match the CMS outcome-of-care header names; any of them can be
/// overridden from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnBindings {
    pub state: String,
    pub hospital: String,
    pub heart_attack: String,
    pub heart_failure: String,
    pub pneumonia: String,
}

impl Default for ColumnBindings {
    fn default() -> Self {
        Self {
            state: "State".to_string(),
            hospital: "Hospital Name".to_string(),
            heart_attack: "Hospital 30-Day Death (Mortality) Rates from Heart Attack".to_string(),
            heart_failure: "Hospital 30-Day Death (Mortality) Rates from Heart Failure"
                .to_string(),
            pneumonia: "Hospital 30-Day Death (Mortality) Rates from Pneumonia".to_string(),
        }
    }
}

impl ColumnBindings {
    /// Source column holding the 30-day rate for a measure.
    pub fn rate_column(&self, measure: OutcomeMeasure) -> &str {
        match measure {
            OutcomeMeasure::HeartAttack => &self.heart_attack,
            OutcomeMeasure::HeartFailure => &self.heart_failure,
            OutcomeMeasure::Pneumonia => &self.pneumonia,
        }
    }

    /// Load bindings from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, ReshapeError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Long-form ranked outcome table; immutable once built.
///
/// One row per hospital and cause of death, with per-(state, cause) best and
/// worst ranks and the group size.
#[derive(Debug)]
pub struct OutcomeTable {
    df: DataFrame,
}

impl OutcomeTable {
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}

struct OutcomeRow {
    state: String,
    hospital: String,
    cause: OutcomeMeasure,
    rate: f64,
    rank_best: u32,
    rank_worst: u32,
}

/// Builds the outcome table from the wide measures frame.
pub struct Reshaper;

impl Reshaper {
    /// Melt, rank and assemble the outcome table.
    ///
    /// Rows whose rate is missing or unparseable are dropped. An empty input
    /// produces an empty table.
    pub fn build_outcome_table(
        df: &DataFrame,
        bindings: &ColumnBindings,
    ) -> Result<OutcomeTable, ReshapeError> {
        let rows = Self::melt(df, bindings)?;

        let mut groups: BTreeMap<(String, OutcomeMeasure), Vec<OutcomeRow>> = BTreeMap::new();
        for row in rows {
            groups
                .entry((row.state.clone(), row.cause))
                .or_default()
                .push(row);
        }

        let mut states: Vec<String> = Vec::new();
        let mut hospitals: Vec<String> = Vec::new();
        let mut causes: Vec<&'static str> = Vec::new();
        let mut rates: Vec<f64> = Vec::new();
        let mut ranks_best: Vec<u32> = Vec::new();
        let mut ranks_worst: Vec<u32> = Vec::new();
        let mut out_ofs: Vec<u32> = Vec::new();

        for (_, mut group) in groups {
            Self::assign_worst_ranks(&mut group);
            // Best ranks go last so the group keeps its canonical ascending order
            Self::assign_best_ranks(&mut group);

            let out_of = group.len() as u32;
            for row in group {
                states.push(row.state);
                hospitals.push(row.hospital);
                causes.push(row.cause.name());
                rates.push(row.rate);
                ranks_best.push(row.rank_best);
                ranks_worst.push(row.rank_worst);
                out_ofs.push(out_of);
            }
        }

        let df = DataFrame::new(vec![
            Column::new(COL_STATE.into(), states),
            Column::new(COL_HOSPITAL.into(), hospitals),
            Column::new(COL_CAUSE.into(), causes),
            Column::new(COL_RATE.into(), rates),
            Column::new(COL_RANK_BEST.into(), ranks_best),
            Column::new(COL_RANK_WORST.into(), ranks_worst),
            Column::new(COL_OUT_OF.into(), out_ofs),
        ])?;

        Ok(OutcomeTable { df })
    }

    /// Melt the wide frame into one record per hospital and cause of death.
    fn melt(df: &DataFrame, bindings: &ColumnBindings) -> Result<Vec<OutcomeRow>, ReshapeError> {
        let state_col = required_column(df, &bindings.state)?;
        let hospital_col = required_column(df, &bindings.hospital)?;

        let mut rows: Vec<OutcomeRow> = Vec::new();
        let mut dropped = 0usize;

        for measure in OutcomeMeasure::ALL {
            let rate_col = required_column(df, bindings.rate_column(measure))?;
            let rate_f64 = rate_col.cast(&DataType::Float64)?;
            let rate_ca = rate_f64.f64()?;

            for i in 0..df.height() {
                match (state_col.get(i), hospital_col.get(i), rate_ca.get(i)) {
                    (Ok(state), Ok(hospital), Some(rate))
                        if !state.is_null() && !hospital.is_null() && !rate.is_nan() =>
                    {
                        rows.push(OutcomeRow {
                            state: state.to_string().trim_matches('"').to_string(),
                            hospital: hospital.to_string().trim_matches('"').to_string(),
                            cause: measure,
                            rate,
                            rank_best: 0,
                            rank_worst: 0,
                        });
                    }
                    _ => dropped += 1,
                }
            }
        }

        debug!(kept = rows.len(), dropped, "melted measures to long form");
        Ok(rows)
    }

    /// "First" tie-break: sort by (rate ascending, hospital name ascending)
    /// and rank by position, so tied rates get strictly increasing ranks in
    /// hospital-name order.
    fn assign_best_ranks(group: &mut [OutcomeRow]) {
        group.sort_by(|a, b| {
            a.rate
                .partial_cmp(&b.rate)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.hospital.cmp(&b.hospital))
        });
        for (i, row) in group.iter_mut().enumerate() {
            row.rank_best = (i + 1) as u32;
        }
    }

    /// "Last" tie-break: sort by (rate descending, hospital name ascending),
    /// then hand ranks out back to front inside each tied-rate block, so the
    /// block's last hospital by name takes the smallest worst-rank.
    fn assign_worst_ranks(group: &mut [OutcomeRow]) {
        group.sort_by(|a, b| {
            b.rate
                .partial_cmp(&a.rate)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.hospital.cmp(&b.hospital))
        });

        let mut start = 0;
        while start < group.len() {
            let mut end = start + 1;
            // exact rate equality is the tie condition
            while end < group.len() && group[end].rate == group[start].rate {
                end += 1;
            }
            for (offset, idx) in (start..end).rev().enumerate() {
                group[idx].rank_worst = (start + offset + 1) as u32;
            }
            start = end;
        }
    }
}

fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ReshapeError> {
    df.column(name)
        .map_err(|_| ReshapeError::MissingColumn(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use proptest::prelude::*;

    fn test_bindings() -> ColumnBindings {
        ColumnBindings {
            state: "State".to_string(),
            hospital: "Hospital Name".to_string(),
            heart_attack: "HA Rate".to_string(),
            heart_failure: "HF Rate".to_string(),
            pneumonia: "PN Rate".to_string(),
        }
    }

    fn wide_frame(
        rows: &[(&str, &str, Option<f64>, Option<f64>, Option<f64>)],
    ) -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "State".into(),
                rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            ),
            Column::new(
                "Hospital Name".into(),
                rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            ),
            Column::new(
                "HA Rate".into(),
                rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            ),
            Column::new(
                "HF Rate".into(),
                rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            ),
            Column::new(
                "PN Rate".into(),
                rows.iter().map(|r| r.4).collect::<Vec<_>>(),
            ),
        ])
        .unwrap()
    }

    /// (hospital, rank_best, rank_worst, out_of) per table row matching the filter.
    fn group_rows(table: &OutcomeTable, state: &str, cause: &str) -> Vec<(String, u32, u32, u32)> {
        let df = table.frame();
        let states = df.column(COL_STATE).unwrap().str().unwrap().clone();
        let hospitals = df.column(COL_HOSPITAL).unwrap().str().unwrap().clone();
        let causes = df.column(COL_CAUSE).unwrap().str().unwrap().clone();
        let best = df.column(COL_RANK_BEST).unwrap().u32().unwrap().clone();
        let worst = df.column(COL_RANK_WORST).unwrap().u32().unwrap().clone();
        let out_of = df.column(COL_OUT_OF).unwrap().u32().unwrap().clone();

        (0..df.height())
            .filter(|&i| states.get(i) == Some(state) && causes.get(i) == Some(cause))
            .map(|i| {
                (
                    hospitals.get(i).unwrap().to_string(),
                    best.get(i).unwrap(),
                    worst.get(i).unwrap(),
                    out_of.get(i).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn tie_break_worked_example() {
        let df = wide_frame(&[
            ("TX", "Hospital A", Some(10.0), None, None),
            ("TX", "Hospital B", Some(10.0), None, None),
            ("TX", "Hospital C", Some(9.0), None, None),
        ]);
        let table = Reshaper::build_outcome_table(&df, &test_bindings()).unwrap();

        let rows = group_rows(&table, "TX", "heart attack");
        assert_eq!(rows.len(), 3);
        // canonical ascending order: C(9.0), A(10.0), B(10.0)
        assert_eq!(rows[0], ("Hospital C".to_string(), 1, 3, 3));
        assert_eq!(rows[1], ("Hospital A".to_string(), 2, 2, 3));
        assert_eq!(rows[2], ("Hospital B".to_string(), 3, 1, 3));
    }

    #[test]
    fn missing_rates_are_dropped_not_nulled() {
        let df = wide_frame(&[
            ("AL", "Hospital A", Some(12.1), None, Some(10.0)),
            ("AL", "Hospital B", None, None, None),
        ]);
        let table = Reshaper::build_outcome_table(&df, &test_bindings()).unwrap();

        // 2 rows survive out of a possible 6
        assert_eq!(table.height(), 2);
        assert_eq!(table.frame().column(COL_RATE).unwrap().null_count(), 0);
    }

    #[test]
    fn unparseable_rates_are_dropped() {
        let df = DataFrame::new(vec![
            Column::new("State".into(), vec!["AK", "AK"]),
            Column::new("Hospital Name".into(), vec!["Hospital A", "Hospital B"]),
            Column::new("HA Rate".into(), vec!["9.5", "garbage"]),
            Column::new("HF Rate".into(), vec![None::<f64>, None]),
            Column::new("PN Rate".into(), vec![None::<f64>, None]),
        ])
        .unwrap();
        let table = Reshaper::build_outcome_table(&df, &test_bindings()).unwrap();

        let rows = group_rows(&table, "AK", "heart attack");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "Hospital A");
    }

    #[test]
    fn groups_are_independent_per_state_and_cause() {
        let df = wide_frame(&[
            ("TX", "Hospital A", Some(10.0), Some(8.0), None),
            ("TX", "Hospital B", Some(11.0), Some(9.0), None),
            ("AL", "Hospital C", Some(7.0), None, None),
        ]);
        let table = Reshaper::build_outcome_table(&df, &test_bindings()).unwrap();

        assert_eq!(group_rows(&table, "TX", "heart attack")[0].3, 2);
        assert_eq!(group_rows(&table, "TX", "heart failure")[0].3, 2);
        let al = group_rows(&table, "AL", "heart attack");
        assert_eq!(al, vec![("Hospital C".to_string(), 1, 1, 1)]);
    }

    #[test]
    fn empty_input_builds_empty_table() {
        let df = wide_frame(&[]);
        let table = Reshaper::build_outcome_table(&df, &test_bindings()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn missing_bound_column_is_reported() {
        let df = DataFrame::new(vec![Column::new("State".into(), vec!["TX"])]).unwrap();
        let err = Reshaper::build_outcome_table(&df, &test_bindings()).unwrap_err();
        assert!(matches!(err, ReshapeError::MissingColumn(name) if name == "Hospital Name"));
    }

    #[test]
    fn outcome_names_are_case_sensitive() {
        assert_eq!(
            OutcomeMeasure::from_name("heart attack"),
            Some(OutcomeMeasure::HeartAttack)
        );
        assert_eq!(OutcomeMeasure::from_name("Heart Attack"), None);
        assert_eq!(OutcomeMeasure::from_name("stroke"), None);
    }

    #[test]
    fn default_bindings_use_cms_headers() {
        let bindings = ColumnBindings::default();
        assert_eq!(bindings.state, "State");
        assert!(bindings
            .rate_column(OutcomeMeasure::Pneumonia)
            .ends_with("Pneumonia"));
    }

    fn raw_group(entries: &[(u8, u8)]) -> Vec<OutcomeRow> {
        entries
            .iter()
            .map(|&(name, rate)| OutcomeRow {
                state: "TX".to_string(),
                hospital: format!("Hospital {name:02}"),
                cause: OutcomeMeasure::HeartAttack,
                rate: 8.0 + rate as f64 * 0.7,
                rank_best: 0,
                rank_worst: 0,
            })
            .collect()
    }

    proptest! {
        /// Both rank assignments produce a permutation of 1..=N, and the two
        /// tie-break conventions mirror each other across the group.
        #[test]
        fn rank_assignments_are_complete_and_complementary(
            entries in prop::collection::vec((0u8..12, 0u8..5), 1..48)
        ) {
            let mut group = raw_group(&entries);
            Reshaper::assign_worst_ranks(&mut group);
            Reshaper::assign_best_ranks(&mut group);

            let n = group.len() as u32;
            let mut best: Vec<u32> = group.iter().map(|r| r.rank_best).collect();
            let mut worst: Vec<u32> = group.iter().map(|r| r.rank_worst).collect();
            best.sort_unstable();
            worst.sort_unstable();
            prop_assert_eq!(best, (1..=n).collect::<Vec<_>>());
            prop_assert_eq!(worst, (1..=n).collect::<Vec<_>>());
            for row in &group {
                prop_assert_eq!(row.rank_best + row.rank_worst, n + 1);
            }
        }
    }
}
