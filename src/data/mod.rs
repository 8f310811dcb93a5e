//! Data module - CSV loading and reshaping

mod loader;
mod reshaper;

pub use loader::{LoaderError, MeasuresLoader, DEFAULT_NA_TOKEN};
pub use reshaper::{
    ColumnBindings, OutcomeMeasure, OutcomeTable, Reshaper, ReshapeError, COL_CAUSE, COL_HOSPITAL,
    COL_OUT_OF, COL_RANK_BEST, COL_RANK_WORST, COL_RATE, COL_STATE,
};
