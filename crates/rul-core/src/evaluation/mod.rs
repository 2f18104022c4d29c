//! Persisted evaluation results.
//!
//! Rows are read through an [`EvaluationSource`] (PostgreSQL in
//! production), decoded into [`EvaluationRecord`]s by the
//! [`ResultStoreAdapter`], and reduced for display by [`DisplaySeries`].

mod display;
mod postgres;
mod record;
mod store;

pub use display::{
    downsample, format_metric, DisplaySeries, SeriesPoint, ACCURACY_METRIC, DEFAULT_STRIDE,
};
pub use postgres::PgEvaluationSource;
pub use record::{decode_row, EvaluationRecord, MetricValue, RawEvaluationRow, StoredColumn};
pub use store::{EvaluationSource, FetchReport, ResultStoreAdapter};
