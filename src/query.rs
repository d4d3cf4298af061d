// Read-side service: validates request parameters, then runs the store query.
// No request reaches the store with invalid parameters.

use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::error::QueryError;
use crate::models::{
    ListParams, ServerDetail, ServerSummary, Source, SourceSummary, StatisticPoint,
    StatisticsParams,
};
use crate::scheduler::truncate_to_interval;
use crate::server_repo::ServerReader;

pub struct QueryService {
    reader: Arc<dyn ServerReader>,
    interval: Duration,
    max_statistics_range: TimeDelta,
}

impl QueryService {
    pub fn new(
        reader: Arc<dyn ServerReader>,
        interval: Duration,
        max_statistics_range: TimeDelta,
    ) -> Self {
        Self {
            reader,
            interval,
            max_statistics_range,
        }
    }

    /// Total players per source over the current collection interval.
    pub async fn list_source_summaries(
        &self,
        players_order_asc: bool,
    ) -> Result<Vec<SourceSummary>, QueryError> {
        let current = truncate_to_interval(Utc::now(), self.interval);
        Ok(self
            .reader
            .list_source_summaries(current, players_order_asc)
            .await?)
    }

    pub async fn list_server_summaries(
        &self,
        params: &ListParams,
    ) -> Result<Vec<ServerSummary>, QueryError> {
        params.validate()?;
        let current = truncate_to_interval(Utc::now(), self.interval);
        Ok(self.reader.list_server_summaries(params, current).await?)
    }

    pub async fn get_server(&self, source: Source, host: &str) -> Result<ServerDetail, QueryError> {
        self.reader
            .get_server(source, host)
            .await?
            .ok_or(QueryError::NotFound)
    }

    /// Averaged player counts per bucket, newest first. A known server with no points in
    /// range yields an empty list; an unknown server is `NotFound`.
    pub async fn list_server_statistics(
        &self,
        params: &StatisticsParams,
    ) -> Result<Vec<StatisticPoint>, QueryError> {
        params.validate(self.max_statistics_range)?;
        let points = self.reader.list_server_statistics(params).await?;
        if points.is_empty() && !self.reader.server_exists(params.source, &params.host).await? {
            return Err(QueryError::NotFound);
        }
        Ok(points)
    }
}
