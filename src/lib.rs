//! Hospital Outcomes - 30-day mortality rankings from quality-of-care measures
//!
//! Loads the wide quality-of-care CSV, reshapes it into a long-form outcome
//! table ranked within each (state, cause of death) group, and answers
//! best/Nth-rank queries over it.

pub mod charts;
pub mod data;
pub mod query;
pub mod stats;

pub use data::{ColumnBindings, MeasuresLoader, OutcomeMeasure, OutcomeTable, Reshaper};
pub use query::{RankSelector, Rankings, StateRanking};
