// src/bin/analyze_pages.rs
//! Usage: analyze_pages <dashboard.html> [plot_dir] [--save]
//!
//! Builds a report from saved pages. `plot_dir` holds one `<plot id>.html` per
//! plot; plots without a saved page are reported as failed.
use anyhow::{bail, Context};
use chrono::Utc;
use log::{info, warn};
use std::env;
use std::fs;
use std::path::PathBuf;

use petroleum_helper::config::HelperConfig;
use petroleum_helper::models::{DashboardSnapshot, PlotDetail};
use petroleum_helper::services::report::{build_report, validate_snapshot};
use petroleum_helper::services::scrape::{parse_dashboard, parse_pump_table};
use petroleum_helper::services::store::{save, FileStore, REPORT_KEY};
use petroleum_helper::services::time_parser::format_minutes;
use scraper::Html;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = HelperConfig::from_env();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let persist = args.iter().any(|a| a == "--save");
    args.retain(|a| a != "--save");
    let Some(dashboard_path) = args.first() else {
        bail!("usage: analyze_pages <dashboard.html> [plot_dir] [--save]");
    };
    let plot_dir = args.get(1).map(PathBuf::from);

    let html = fs::read_to_string(dashboard_path).with_context(|| format!("reading {}", dashboard_path))?;
    let snapshot = DashboardSnapshot::from_reading(parse_dashboard(&Html::parse_document(&html)));
    validate_snapshot(&snapshot)?;
    info!(
        "Dashboard: {:.2} cOIL available, {} producing plots",
        snapshot.total_available,
        snapshot.plots.len()
    );

    let now = Utc::now();
    let mut details = Vec::with_capacity(snapshot.plots.len());
    for plot in &snapshot.plots {
        let page = plot_dir.as_ref().map(|dir| dir.join(format!("{}.html", plot.id)));
        let detail = match page.as_ref().map(fs::read_to_string) {
            Some(Ok(html)) => {
                let pumps = parse_pump_table(&Html::parse_document(&html));
                if (pumps.len() as u32) < plot.expected_working_pumps() {
                    warn!("Plot {}: {} of {} pumps in saved page", plot.id, pumps.len(), plot.expected_working_pumps());
                }
                PlotDetail::scraped(plot.clone(), pumps, now)
            }
            Some(Err(e)) => PlotDetail::failed(plot.clone(), e.to_string(), now),
            None => PlotDetail::failed(plot.clone(), "No saved plot page", now),
        };
        details.push(detail);
    }

    let report = build_report(snapshot, details, now, config.planner);
    let plan = &report.reinvestment_plan;
    println!("Immediate repairs:    {:.2} cOIL", plan.immediate_repair_cost);
    println!("Reserved for repairs: {:.2} cOIL", plan.reserved_for_upcoming_repairs);
    println!("Recommended pumps:    {}", plan.recommended_pumps);
    println!("Next critical repair: {}", plan.next_critical_repair_label);
    if plan.is_estimated() {
        println!("(decay schedule estimated, no countdowns were readable)");
    }
    for purchase in &plan.pump_purchase_schedule {
        println!(
            "  pump #{:<2} in {:>7}  balance {:.2} -> {:.2}",
            purchase.pump_number,
            format_minutes(purchase.minute_offset),
            purchase.balance_before,
            purchase.balance_after
        );
    }

    if persist {
        let store = FileStore::open(&config.store_dir)?;
        save(&store, REPORT_KEY, &report)?;
        info!("Report saved under {}", config.store_dir);
    }
    Ok(())
}
