//! Ranking Query Module
//! Read-only lookups over the outcome table: best hospital, Nth-ranked
//! hospital, and per-state rankings across all recognized codes.

use crate::data::{
    OutcomeMeasure, OutcomeTable, COL_CAUSE, COL_HOSPITAL, COL_RANK_BEST, COL_RANK_WORST,
    COL_STATE,
};
use polars::prelude::*;
use std::str::FromStr;
use thiserror::Error;

/// Recognized state and territory codes: the 50 US states plus DC, GU, PR
/// and VI. Sorted; the array order is also the output order of
/// [`Rankings::rank_all`].
pub const STATE_CODES: [&str; 54] = [
    "AK", "AL", "AR", "AZ", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "GU", "HI", "IA", "ID",
    "IL", "IN", "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND",
    "NE", "NH", "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "PR", "RI", "SC", "SD", "TN",
    "TX", "UT", "VA", "VI", "VT", "WA", "WI", "WV", "WY",
];

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid state code '{0}'")]
    InvalidState(String),
    #[error("invalid outcome '{0}'")]
    InvalidOutcome(String),
    #[error("invalid rank '{0}': expected a positive integer, \"best\" or \"worst\"")]
    InvalidRank(String),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Which rank a query targets: the best axis, the worst axis, or an explicit
/// 1-based position on the best axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankSelector {
    Best,
    Worst,
    Position(u32),
}

impl FromStr for RankSelector {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(RankSelector::Best),
            "worst" => Ok(RankSelector::Worst),
            _ => match s.parse::<u32>() {
                Ok(n) if n >= 1 => Ok(RankSelector::Position(n)),
                _ => Err(QueryError::InvalidRank(s.to_string())),
            },
        }
    }
}

/// One `rank_all` row: a state code and the hospital at the requested rank,
/// or `None` when the state has no hospital at that rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRanking {
    pub state: &'static str,
    pub hospital: Option<String>,
}

/// Read-only ranking queries over an [`OutcomeTable`].
pub struct Rankings;

impl Rankings {
    /// Hospital with the lowest 30-day death rate in `state` for `outcome`.
    ///
    /// `Ok(None)` when the state has no data for the outcome.
    pub fn best(
        table: &OutcomeTable,
        state: &str,
        outcome: &str,
    ) -> Result<Option<String>, QueryError> {
        Self::rank_hospital(table, state, outcome, RankSelector::Best)
    }

    /// Hospital at the given rank in `state` for `outcome`.
    ///
    /// Integer positions target the best-ranking axis; a position past the
    /// group size yields `Ok(None)`.
    pub fn rank_hospital(
        table: &OutcomeTable,
        state: &str,
        outcome: &str,
        rank: RankSelector,
    ) -> Result<Option<String>, QueryError> {
        let state = validate_state(state)?;
        let measure = parse_outcome(outcome)?;
        let (rank_col, target) = resolve_rank(rank)?;
        Self::hospital_at(table, state, measure, rank_col, target)
    }

    /// Hospital at the given rank for `outcome` in every recognized state,
    /// one row per code in [`STATE_CODES`] order.
    pub fn rank_all(
        table: &OutcomeTable,
        outcome: &str,
        rank: RankSelector,
    ) -> Result<Vec<StateRanking>, QueryError> {
        let measure = parse_outcome(outcome)?;
        let (rank_col, target) = resolve_rank(rank)?;

        let mut rankings = Vec::with_capacity(STATE_CODES.len());
        for state in STATE_CODES {
            let hospital = Self::hospital_at(table, state, measure, rank_col, target)?;
            rankings.push(StateRanking { state, hospital });
        }
        Ok(rankings)
    }

    fn hospital_at(
        table: &OutcomeTable,
        state: &str,
        measure: OutcomeMeasure,
        rank_col: &str,
        target: u32,
    ) -> Result<Option<String>, QueryError> {
        let matched = table
            .frame()
            .clone()
            .lazy()
            .filter(
                col(COL_STATE)
                    .eq(lit(state))
                    .and(col(COL_CAUSE).eq(lit(measure.name())))
                    .and(col(rank_col).eq(lit(target))),
            )
            .select([col(COL_HOSPITAL)])
            .collect()?;

        let hospital = matched
            .column(COL_HOSPITAL)?
            .str()?
            .iter()
            .next()
            .flatten()
            .map(String::from);
        Ok(hospital)
    }
}

fn validate_state(state: &str) -> Result<&str, QueryError> {
    if STATE_CODES.binary_search(&state).is_ok() {
        Ok(state)
    } else {
        Err(QueryError::InvalidState(state.to_string()))
    }
}

fn parse_outcome(outcome: &str) -> Result<OutcomeMeasure, QueryError> {
    OutcomeMeasure::from_name(outcome).ok_or_else(|| QueryError::InvalidOutcome(outcome.to_string()))
}

fn resolve_rank(rank: RankSelector) -> Result<(&'static str, u32), QueryError> {
    match rank {
        RankSelector::Best => Ok((COL_RANK_BEST, 1)),
        RankSelector::Worst => Ok((COL_RANK_WORST, 1)),
        RankSelector::Position(0) => Err(QueryError::InvalidRank("0".to_string())),
        RankSelector::Position(n) => Ok((COL_RANK_BEST, n)),
    }
}
