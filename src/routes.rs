// src/routes.rs
use log::info;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::{plan::post_plan, report::get_report, report::post_refresh, status::get_status};
use crate::host::KeyValueStore;
use crate::services::reinvestment::PlannerOptions;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = StatusCode::BAD_REQUEST;
        message = body_error.to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else {
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    store: Arc<dyn KeyValueStore>,
    options: PlannerOptions,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let store_filter = warp::any().map(move || store.clone());
    let options_filter = warp::any().map(move || options);

    let report_route = warp::path!("api" / "v1" / "report")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(get_report);

    let refresh_route = warp::path!("api" / "v1" / "report" / "refresh")
        .and(warp::post())
        .and(warp::body::json())
        .and(store_filter.clone())
        .and(options_filter.clone())
        .and_then(post_refresh);

    let plan_route = warp::path!("api" / "v1" / "plan")
        .and(warp::post())
        .and(warp::body::json())
        .and(options_filter.clone())
        .and_then(post_plan);

    let status_route = warp::path!("api" / "v1" / "status")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(get_status);

    info!("All routes configured successfully.");

    report_route
        .or(refresh_route)
        .or(plan_route)
        .or(status_route)
        .recover(handle_rejection)
}
