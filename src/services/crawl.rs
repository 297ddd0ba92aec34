// src/services/crawl.rs
//! Visits every producing plot's page in order, collecting pump countdowns, then
//! returns to the dashboard and builds the report.
//!
//! Each page load runs at most one step. A step ends by persisting the whole
//! `CrawlState` and then navigating or reloading, after which the next page load
//! calls `resume` again.
use chrono::Utc;
use log::{error, info, warn};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::HelperConfig;
use crate::error::HelperError;
use crate::host::{Host, PageElement, PageKind};
use crate::models::{CompletedReport, CrawlPhase, CrawlState, DashboardSnapshot, PlotDetail, PlotSummary};
use crate::services::report::{build_report, recent_report, validate_snapshot};
use crate::services::store::{self, CRAWL_KEY, REPORT_KEY};
use crate::services::wait::{settle, wait_for_element};

const CRAWL_PROMPT: &str = "The extension needs to navigate to each plot page to collect data. \
This will temporarily change your view but will return to the dashboard when complete.\n\nDo you want to continue?";
const STUCK_PAGE_ERROR: &str = "Page failed to load correctly after multiple retries";

#[derive(Debug)]
pub enum CrawlOutcome {
    /// Nothing for the crawl to do on this page.
    Idle,
    Declined,
    NothingToCrawl,
    /// Left for another page; the crawl continues on its next load.
    Navigated(String),
    Reloaded,
    Finalized(Box<CompletedReport>),
    ShowedCachedReport,
    Failed(HelperError),
}

pub struct CrawlMachine<'a> {
    host: Host<'a>,
    config: &'a HelperConfig,
}

impl<'a> CrawlMachine<'a> {
    pub fn new(host: Host<'a>, config: &'a HelperConfig) -> Self {
        CrawlMachine { host, config }
    }

    /// Launches a crawl from the dashboard after the user agrees to it.
    pub fn start(&self) -> CrawlOutcome {
        match store::load::<CrawlState>(self.host.store, CRAWL_KEY) {
            Ok(Some(running)) if running.phase() != CrawlPhase::Idle => return self.carry_on(running),
            Ok(_) => {}
            Err(e) => warn!("Replacing unreadable crawl state: {}", e),
        }

        store::clear_reload_retries(self.host.store);
        self.host.presenter.status("Analyzing game data...");

        let Some(reading) = self.host.page.dashboard() else {
            return self.fail(HelperError::PageNotReady { element: PageElement::Dashboard, waited_ms: 0 });
        };
        let snapshot = DashboardSnapshot::from_reading(reading);
        if snapshot.plots.is_empty() {
            self.host.presenter.notice("No producing plots found to analyze.");
            return CrawlOutcome::NothingToCrawl;
        }

        if let Err(declined) = self.host.confirm(CRAWL_PROMPT) {
            info!("Crawl not started: {}", declined);
            self.host.presenter.notice("Analysis cancelled by user.");
            return CrawlOutcome::Declined;
        }

        let state = CrawlState::launch(snapshot.plots, self.host.nav.current_url());
        if let Err(e) = store::save(self.host.store, CRAWL_KEY, &state) {
            return self.fail(e);
        }

        info!("Starting crawl of {} plots", state.targets.len());
        let url = self.config.plot_url(&state.targets[0].id);
        self.host.nav.navigate_to(&url);
        CrawlOutcome::Navigated(url)
    }

    /// A second start never overwrites a live run; it sends the tab back to
    /// wherever that run stands.
    fn carry_on(&self, state: CrawlState) -> CrawlOutcome {
        let url = match state.current_target() {
            Some(target) if state.in_progress => {
                self.host.presenter.notice(&format!(
                    "Analysis already in progress, continuing with plot #{} ({}/{}).",
                    target.id,
                    state.current_index + 1,
                    state.targets.len()
                ));
                self.config.plot_url(&target.id)
            }
            _ => {
                self.host.presenter.notice("Analysis already in progress, finishing up on the dashboard.");
                state.dashboard_url
            }
        };
        info!("Crawl already running, not restarting");
        self.host.nav.navigate_to(&url);
        CrawlOutcome::Navigated(url)
    }

    /// Picks the crawl back up after a page load. Call on every load.
    pub async fn resume(&self) -> CrawlOutcome {
        let state: Option<CrawlState> = match store::load(self.host.store, CRAWL_KEY) {
            Ok(state) => state,
            Err(e) => return self.fail(e),
        };
        let phase = state.as_ref().map(CrawlState::phase).unwrap_or(CrawlPhase::Idle);

        match (self.host.page_kind(), phase, state) {
            (PageKind::Plot, CrawlPhase::Visiting(_), Some(state)) => self.visit_plot(state).await,
            (PageKind::Dashboard, CrawlPhase::Finalizing, Some(state)) => self.finalize(state).await,
            (PageKind::Dashboard, CrawlPhase::Idle, _) => self.show_cached_report(),
            _ => CrawlOutcome::Idle,
        }
    }

    async fn visit_plot(&self, state: CrawlState) -> CrawlOutcome {
        let Some(target) = state.current_target().cloned() else {
            return self.fail(HelperError::CorruptState {
                key: CRAWL_KEY.to_string(),
                reason: format!("no plot at index {}", state.current_index),
            });
        };
        self.host.presenter.status(&format!(
            "Analyzing plot #{} ({}/{})...",
            target.id,
            state.current_index + 1,
            state.targets.len()
        ));

        let page_ready = timeout(
            self.config.page_watchdog,
            self.wait(PageElement::TabButtons, self.config.element_timeout),
        )
        .await;
        match page_ready {
            Err(_) => return self.reload_stuck_page(state, target),
            Ok(Err(e)) => return self.retry_or_give_up(state, target, e.to_string()),
            Ok(Ok(())) => {}
        }
        store::clear_reload_retries(self.host.store);
        settle(self.config.plot_settle).await;

        if !self.host.page.open_pumps_tab() {
            return self.retry_or_give_up(state, target, "Couldn't find Pumps tab".to_string());
        }
        if let Err(e) = self.wait(PageElement::PumpTable, self.config.element_timeout).await {
            return self.retry_or_give_up(state, target, e.to_string());
        }
        settle(self.config.table_settle).await;

        let pumps = self.host.page.pump_records();
        let found = pumps.len() as u32;
        let expected = target.expected_working_pumps();
        info!("Plot {}: {} pump rows, {} with decay times", target.id, found,
            pumps.iter().filter(|p| p.effective_decay_hours() > 0.0).count());

        if found < expected {
            // Partial rows are dropped once the budget runs out; the plot is recorded as failed.
            let shortfall = HelperError::ExtractionShortfall { found, expected };
            return self.retry_or_give_up(state, target, shortfall.to_string());
        }

        self.advance(state, PlotDetail::scraped(target, pumps, Utc::now()))
    }

    async fn wait(&self, element: PageElement, bound: Duration) -> Result<(), HelperError> {
        wait_for_element(self.host.page, element, self.config.poll_interval, bound).await
    }

    fn retry_or_give_up(&self, state: CrawlState, target: PlotSummary, reason: String) -> CrawlOutcome {
        if state.retry_count < self.config.max_retries {
            return self.retry(state, reason);
        }
        let failure = HelperError::PlotFailed { plot_id: target.id.clone(), reason };
        error!("{}", failure);
        self.advance(state, PlotDetail::failed(target, failure.to_string(), Utc::now()))
    }

    /// Same plot again after a full reload; the index does not move.
    fn retry(&self, mut state: CrawlState, reason: String) -> CrawlOutcome {
        state.retry_count += 1;
        warn!("{}; retrying ({}/{})", reason, state.retry_count, self.config.max_retries);
        self.host.presenter.status(&format!(
            "{}. Retrying ({}/{})...",
            reason, state.retry_count, self.config.max_retries
        ));
        if let Err(e) = store::save(self.host.store, CRAWL_KEY, &state) {
            return self.fail(e);
        }
        self.host.nav.reload();
        CrawlOutcome::Reloaded
    }

    /// Watchdog path: the page never rendered at all. Counted separately from
    /// `retry_count` so a hung page cannot keep the crawl on one plot forever.
    fn reload_stuck_page(&self, state: CrawlState, target: PlotSummary) -> CrawlOutcome {
        let reloads = store::reload_retries(self.host.store);
        if reloads < self.config.max_retries {
            warn!("Page seems stuck, reloading (retry {}/{})", reloads + 1, self.config.max_retries);
            if let Err(e) = store::set_reload_retries(self.host.store, reloads + 1) {
                return self.fail(e);
            }
            self.host.nav.reload();
            return CrawlOutcome::Reloaded;
        }

        store::clear_reload_retries(self.host.store);
        error!("Max reloads reached, skipping plot {}", target.id);
        self.advance(state, PlotDetail::failed(target, STUCK_PAGE_ERROR, Utc::now()))
    }

    fn advance(&self, mut state: CrawlState, detail: PlotDetail) -> CrawlOutcome {
        let next_url = state.record_and_advance(detail).map(|next| self.config.plot_url(&next.id));
        if let Err(e) = store::save(self.host.store, CRAWL_KEY, &state) {
            return self.fail(e);
        }

        let url = match next_url {
            Some(url) => url,
            None => {
                info!("All {} plots visited, returning to dashboard", state.targets.len());
                state.dashboard_url
            }
        };
        self.host.nav.navigate_to(&url);
        CrawlOutcome::Navigated(url)
    }

    async fn finalize(&self, state: CrawlState) -> CrawlOutcome {
        self.host.presenter.status("Analysis complete! Processing results...");
        settle(self.config.finalize_settle).await;

        let Some(reading) = self.host.page.dashboard() else {
            return self.fail(HelperError::PageNotReady { element: PageElement::Dashboard, waited_ms: 0 });
        };
        let snapshot = DashboardSnapshot::from_reading(reading);
        if let Err(e) = validate_snapshot(&snapshot) {
            return self.fail(e);
        }

        let failed = state.collected.iter().filter(|d| d.error.is_some()).count();
        info!("Building report from {} plots ({} with errors)", state.collected.len(), failed);
        let report = build_report(snapshot, state.collected, Utc::now(), self.config.planner);
        self.host.presenter.show_report(&report);

        if let Err(e) = store::save(self.host.store, REPORT_KEY, &report) {
            error!("Error storing results: {}", e);
        }
        if let Err(e) = self.host.store.remove(CRAWL_KEY) {
            error!("Failed to clear crawl state: {}", e);
        }
        CrawlOutcome::Finalized(Box::new(report))
    }

    fn show_cached_report(&self) -> CrawlOutcome {
        match recent_report(self.host.store, Utc::now()) {
            Some(report) => {
                self.host.presenter.show_report(&report);
                CrawlOutcome::ShowedCachedReport
            }
            None => CrawlOutcome::Idle,
        }
    }

    fn fail(&self, e: HelperError) -> CrawlOutcome {
        error!("Crawl step failed: {}", e);
        self.host.presenter.error(&format!("Error: {}", e));
        CrawlOutcome::Failed(e)
    }
}
