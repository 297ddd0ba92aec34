// src/handlers/report.rs
use chrono::Utc;
use log::{error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::host::KeyValueStore;
use crate::models::{CompletedReport, DashboardReading};
use crate::services::reinvestment::PlannerOptions;
use crate::services::report::refresh_report;
use crate::services::store::{load, REPORT_KEY};

pub async fn get_report(store: Arc<dyn KeyValueStore>) -> Result<Json, Rejection> {
    info!("Handling request for the cached report");

    match load::<CompletedReport>(store.as_ref(), REPORT_KEY) {
        Ok(Some(report)) => Ok(warp::reply::json(&report)),
        Ok(None) => Err(warp::reject::custom(ApiError::not_found("No report has been collected yet"))),
        Err(e) => {
            error!("Failed to read cached report: {}", e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

pub async fn post_refresh(
    reading: DashboardReading,
    store: Arc<dyn KeyValueStore>,
    options: PlannerOptions,
) -> Result<Json, Rejection> {
    info!("Refreshing cached report with {} plot summaries", reading.per_plot_summaries.len());

    refresh_report(store.as_ref(), reading, Utc::now(), options)
        .map(|report| warp::reply::json(&report))
        .map_err(|e| {
            error!("Report refresh failed: {}", e);
            warp::reject::custom(ApiError::from(e))
        })
}
