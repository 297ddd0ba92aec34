// src/helper.rs
//! Entry points the page host calls: one per user action plus `on_page_load`.
use chrono::Utc;
use log::debug;

use crate::config::HelperConfig;
use crate::error::HelperError;
use crate::host::Host;
use crate::models::{CompletedReport, DashboardReading};
use crate::services::claim::{ClaimMachine, ClaimOutcome};
use crate::services::crawl::{CrawlMachine, CrawlOutcome};
use crate::services::report;

/// What the page-load hook did. The claim run is only resumed when the crawl
/// step stayed on the page.
#[derive(Debug)]
pub struct PageLoad {
    pub crawl: CrawlOutcome,
    pub claim: Option<ClaimOutcome>,
}

pub struct Helper<'a> {
    host: Host<'a>,
    config: &'a HelperConfig,
}

impl<'a> Helper<'a> {
    pub fn new(host: Host<'a>, config: &'a HelperConfig) -> Self {
        Helper { host, config }
    }

    pub fn start_crawl(&self) -> CrawlOutcome {
        CrawlMachine::new(self.host, self.config).start()
    }

    pub async fn resume_crawl(&self) -> CrawlOutcome {
        CrawlMachine::new(self.host, self.config).resume().await
    }

    pub fn start_claim(&self) -> ClaimOutcome {
        ClaimMachine::new(self.host, self.config).start()
    }

    pub async fn resume_claim(&self) -> ClaimOutcome {
        ClaimMachine::new(self.host, self.config).resume().await
    }

    /// Recomputes the cached report from the dashboard currently on screen.
    pub fn refresh_report(&self) -> Result<CompletedReport, HelperError> {
        report::refresh_from_page(&self.host, self.config.planner)
    }

    /// Same as `refresh_report` for a reading obtained some other way.
    pub fn refresh_report_with(&self, reading: DashboardReading) -> Result<CompletedReport, HelperError> {
        report::refresh_report(self.host.store, reading, Utc::now(), self.config.planner)
    }

    pub async fn on_page_load(&self) -> PageLoad {
        let crawl = self.resume_crawl().await;
        let claim = match crawl {
            CrawlOutcome::Navigated(_) | CrawlOutcome::Reloaded => None,
            _ => Some(self.resume_claim().await),
        };
        debug!("Page load handled: crawl {:?}, claim {:?}", crawl, claim);
        PageLoad { crawl, claim }
    }
}
