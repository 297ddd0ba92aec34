// src/services/report.rs
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::error::HelperError;
use crate::host::{Host, KeyValueStore, PageElement};
use crate::models::{CompletedReport, DashboardReading, DashboardSnapshot, PlotDetail};
use crate::services::decay::DecayProjector;
use crate::services::reinvestment::{PlannerOptions, ReinvestmentPlan, ReinvestmentPlanner};
use crate::services::store::{self, REPORT_KEY};

/// A plan built from a snapshot without production or funds would be misleading.
pub fn validate_snapshot(snapshot: &DashboardSnapshot) -> Result<(), HelperError> {
    if snapshot.hourly_production <= 0.0 {
        return Err(HelperError::MissingSnapshotField("hourlyProduction"));
    }
    if snapshot.total_available <= 0.0 {
        return Err(HelperError::MissingSnapshotField("totalAvailable"));
    }
    Ok(())
}

/// Projection plus plan for one snapshot. The estimate seed is tied to the crawl
/// so refreshing the same report reproduces the same estimated schedule.
pub fn compute_plan(
    snapshot: &DashboardSnapshot,
    plots: &[PlotDetail],
    collected_at: DateTime<Utc>,
    now: DateTime<Utc>,
    options: PlannerOptions,
) -> ReinvestmentPlan {
    let seed = collected_at.timestamp() as u64 ^ u64::from(snapshot.total_active_pumps);
    let projection = DecayProjector::new(now)
        .with_estimate_seed(seed)
        .project(Some(snapshot), Some(plots));
    if projection.estimated {
        warn!("Decay schedule is estimated; no measured decay times were available");
    }
    ReinvestmentPlanner::new(now, options).plan(Some(snapshot), projection)
}

pub fn build_report(
    snapshot: DashboardSnapshot,
    plot_details: Vec<PlotDetail>,
    now: DateTime<Utc>,
    options: PlannerOptions,
) -> CompletedReport {
    let reinvestment_plan = compute_plan(&snapshot, &plot_details, now, now, options);
    CompletedReport {
        dashboard_snapshot: snapshot,
        plot_details,
        reinvestment_plan,
        collected_at: now,
        last_refreshed_at: now,
    }
}

/// Recomputes the cached report against a fresh dashboard reading without
/// revisiting any plot page.
pub fn refresh_report(
    store: &dyn KeyValueStore,
    reading: DashboardReading,
    now: DateTime<Utc>,
    options: PlannerOptions,
) -> Result<CompletedReport, HelperError> {
    let mut report: CompletedReport = store::load(store, REPORT_KEY)?.ok_or(HelperError::NoReport)?;

    let snapshot = DashboardSnapshot::from_reading(reading);
    validate_snapshot(&snapshot)?;

    report.reinvestment_plan = compute_plan(&snapshot, &report.plot_details, report.collected_at, now, options);
    report.dashboard_snapshot = snapshot;
    report.last_refreshed_at = now;
    store::save(store, REPORT_KEY, &report)?;

    info!(
        "Refreshed report from {}: {} pumps recommended",
        report.collected_at, report.reinvestment_plan.recommended_pumps
    );
    Ok(report)
}

/// Reads the dashboard off the current page and refreshes the cached report with it.
pub fn refresh_from_page(host: &Host, options: PlannerOptions) -> Result<CompletedReport, HelperError> {
    host.presenter.status("Updating dashboard data...");
    let result = host
        .page
        .dashboard()
        .ok_or(HelperError::PageNotReady { element: PageElement::Dashboard, waited_ms: 0 })
        .and_then(|reading| refresh_report(host.store, reading, Utc::now(), options));

    match &result {
        Ok(report) => {
            host.presenter.show_report(report);
            host.presenter.notice("Dashboard data successfully updated!");
        }
        Err(e) => {
            warn!("Report refresh failed: {}", e);
            host.presenter.error(&e.to_string());
        }
    }
    result
}

/// The cached report, if there is one younger than a day.
pub fn recent_report(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Option<CompletedReport> {
    match store::load::<CompletedReport>(store, REPORT_KEY) {
        Ok(Some(report)) if report.is_recent(now) => Some(report),
        Ok(_) => None,
        Err(e) => {
            warn!("Ignoring cached report: {}", e);
            None
        }
    }
}
