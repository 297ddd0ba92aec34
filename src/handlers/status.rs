// src/handlers/status.rs
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::host::KeyValueStore;
use crate::models::{ClaimState, CrawlState};
use crate::services::store::{load, CLAIM_KEY, CRAWL_KEY};

pub async fn get_status(store: Arc<dyn KeyValueStore>) -> Result<Json, Rejection> {
    info!("Handling request for crawl and claim progress");

    // A corrupt blob is reported as absent, the same way the machines skip it.
    let crawl = load::<CrawlState>(store.as_ref(), CRAWL_KEY).unwrap_or_else(|e| {
        warn!("{}", e);
        None
    });
    let claim = load::<ClaimState>(store.as_ref(), CLAIM_KEY).unwrap_or_else(|e| {
        warn!("{}", e);
        None
    });

    Ok(warp::reply::json(&json!({
        "crawl": crawl,
        "claim": claim,
    })))
}
