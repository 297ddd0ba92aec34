// src/handlers/plan.rs
use chrono::Utc;
use log::{debug, info};
use serde::Deserialize;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::models::{DashboardReading, DashboardSnapshot, PlotDetail};
use crate::services::reinvestment::PlannerOptions;
use crate::services::report::{compute_plan, validate_snapshot};

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub dashboard: DashboardReading,
    #[serde(default)]
    pub plots: Vec<PlotDetail>,
}

/// Plans from the posted figures alone; nothing is read from or written to the store.
pub async fn post_plan(request: PlanRequest, options: PlannerOptions) -> Result<Json, Rejection> {
    info!("Handling plan request for {} plots", request.plots.len());

    let snapshot = DashboardSnapshot::from_reading(request.dashboard);
    validate_snapshot(&snapshot).map_err(|e| warp::reject::custom(ApiError::from(e)))?;

    let now = Utc::now();
    let plan = compute_plan(&snapshot, &request.plots, now, now, options);
    debug!("Recommending {} pumps", plan.recommended_pumps);
    Ok(warp::reply::json(&plan))
}
