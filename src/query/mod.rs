//! Query module - ranking lookups over the outcome table

mod rankings;

pub use rankings::{QueryError, RankSelector, Rankings, StateRanking, STATE_CODES};
