// Public query API handlers. Raw query strings are parsed here so every malformed
// parameter surfaces as a JSON 400 from `QueryError`, not as an extractor rejection.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::QueryError;
use crate::models::{
    ListParams, Precision, ServerDetail, ServerSummary, Source, SourceSummary, StatisticPoint,
    StatisticsParams, TimeRange, ValidationError,
};
use crate::query::QueryService;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub(super) struct OrderQuery {
    order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ListQuery {
    limit: Option<String>,
    offset: Option<String>,
    order: Option<String>,
    include_offline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct StatisticsQuery {
    from: Option<String>,
    to: Option<String>,
    precision: Option<String>,
}

/// "asc" → true, "desc" or absent → false.
fn parse_order(order: Option<&str>) -> Result<bool, ValidationError> {
    match order.map(str::to_lowercase).as_deref() {
        None | Some("desc") => Ok(false),
        Some("asc") => Ok(true),
        Some(_) => Err(ValidationError::UnknownOrder(
            order.unwrap_or_default().to_string(),
        )),
    }
}

fn parse_int(name: &'static str, value: Option<&str>, default: i64) -> Result<i64, ValidationError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ValidationError::NotAnInteger {
            name,
            value: v.to_string(),
        }),
    }
}

/// Absent ends become the epoch, which range validation rejects as unset.
fn parse_time(value: Option<&str>) -> Result<DateTime<Utc>, ValidationError> {
    match value {
        None => Ok(DateTime::UNIX_EPOCH),
        Some(v) => DateTime::parse_from_rfc3339(v)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| ValidationError::BadTimestamp(v.to_string())),
    }
}

fn parse_source(source: &str) -> Result<Source, ValidationError> {
    Ok(source.parse::<Source>()?)
}

/// GET /api/v1/sources
pub(super) async fn list_sources(
    State(service): State<Arc<QueryService>>,
    Query(q): Query<OrderQuery>,
) -> Result<Json<Vec<SourceSummary>>, QueryError> {
    let asc = parse_order(q.order.as_deref())?;
    Ok(Json(service.list_source_summaries(asc).await?))
}

/// GET /api/v1/sources/{source}/servers
pub(super) async fn list_servers(
    State(service): State<Arc<QueryService>>,
    Path(source): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ServerSummary>>, QueryError> {
    let include_offline = match q.include_offline.as_deref() {
        None => true,
        Some(v) => v
            .parse::<bool>()
            .map_err(|_| ValidationError::BadIncludeOffline(v.to_string()))?,
    };
    let params = ListParams {
        source: parse_source(&source)?,
        limit: parse_int("limit", q.limit.as_deref(), DEFAULT_LIMIT)?,
        offset: parse_int("offset", q.offset.as_deref(), 0)?,
        players_order_asc: parse_order(q.order.as_deref())?,
        include_offline,
    };
    Ok(Json(service.list_server_summaries(&params).await?))
}

/// GET /api/v1/sources/{source}/servers/{host}
pub(super) async fn get_server(
    State(service): State<Arc<QueryService>>,
    Path((source, host)): Path<(String, String)>,
) -> Result<Json<ServerDetail>, QueryError> {
    let source = parse_source(&source)?;
    Ok(Json(service.get_server(source, &host).await?))
}

/// GET /api/v1/sources/{source}/servers/{host}/statistics
pub(super) async fn server_statistics(
    State(service): State<Arc<QueryService>>,
    Path((source, host)): Path<(String, String)>,
    Query(q): Query<StatisticsQuery>,
) -> Result<Json<Vec<StatisticPoint>>, QueryError> {
    let precision = match q.precision.as_deref() {
        None => Precision::default(),
        Some(p) => p.parse()?,
    };
    let params = StatisticsParams {
        source: parse_source(&source)?,
        host,
        time_range: TimeRange {
            from: parse_time(q.from.as_deref())?,
            to: parse_time(q.to.as_deref())?,
        },
        precision,
    };
    Ok(Json(service.list_server_statistics(&params).await?))
}
