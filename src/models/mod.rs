// Domain models: sources, snapshots, read-side views and request parameters

mod params;
mod server;
mod summary;

pub use params::{
    ListParams, MAX_STATISTICS_RANGE_DAYS, Precision, StatisticsParams, TimeRange,
    ValidationError,
};
pub use server::{Snapshot, Source, UnknownSource};
pub use summary::{ServerDetail, ServerSummary, SourceSummary, StatisticPoint};
