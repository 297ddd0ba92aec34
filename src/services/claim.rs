// src/services/claim.rs
//! Walks every plot with pumps and presses its Store button, totalling what
//! was claimed. Like the crawl, one page load runs one step.
use log::{error, info, warn};

use crate::config::HelperConfig;
use crate::error::HelperError;
use crate::host::{Host, PageElement, PageKind};
use crate::models::{ClaimState, CompletedReport, DashboardSnapshot, PlotSummary};
use crate::services::report::refresh_from_page;
use crate::services::store::{self, CLAIM_KEY, REPORT_KEY};
use crate::services::wait::{poll_until, settle, wait_for_element};

#[derive(Debug)]
pub enum ClaimOutcome {
    Idle,
    Declined,
    NothingToClaim,
    Navigated(String),
    /// Back on the dashboard; the cached report has been refreshed if there was one.
    Completed { total_claimed: f64 },
    Failed(HelperError),
}

/// What happened on a single plot. Never stops the run.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PlotClaim {
    Claimed(f64),
    NothingToClaim,
    NoStoreButton,
    TimedOut,
}

pub struct ClaimMachine<'a> {
    host: Host<'a>,
    config: &'a HelperConfig,
}

impl<'a> ClaimMachine<'a> {
    pub fn new(host: Host<'a>, config: &'a HelperConfig) -> Self {
        ClaimMachine { host, config }
    }

    pub fn start(&self) -> ClaimOutcome {
        match store::load::<ClaimState>(self.host.store, CLAIM_KEY) {
            Ok(Some(running)) if running.in_progress => return self.carry_on(running),
            Ok(_) => {}
            Err(e) => warn!("Replacing unreadable claim state: {}", e),
        }

        self.host.presenter.status("Preparing to claim all rewards...");

        let targets = self.claim_targets();
        if targets.is_empty() {
            self.host.presenter.notice("No plots with pumps found to claim rewards from.");
            return ClaimOutcome::NothingToClaim;
        }

        let prompt = format!(
            "Ready to claim rewards from {} plots. This will navigate through all your plots \
             and require you to approve transactions. Continue?",
            targets.len()
        );
        if let Err(declined) = self.host.confirm(&prompt) {
            info!("Claim run not started: {}", declined);
            self.host.presenter.notice("Claiming cancelled by user.");
            return ClaimOutcome::Declined;
        }

        let state = ClaimState::launch(targets, self.host.nav.current_url());
        if let Err(e) = store::save(self.host.store, CLAIM_KEY, &state) {
            return self.fail(e);
        }
        info!("Claiming from {} plots", state.targets.len());
        let url = self.config.plot_url(&state.targets[0].id);
        self.host.nav.navigate_to(&url);
        ClaimOutcome::Navigated(url)
    }

    fn carry_on(&self, state: ClaimState) -> ClaimOutcome {
        let Some(target) = state.current_target() else {
            return self.fail(HelperError::CorruptState {
                key: CLAIM_KEY.to_string(),
                reason: format!("no plot at index {}", state.current_index),
            });
        };
        self.host.presenter.notice(&format!(
            "Claiming already in progress, continuing with plot #{} ({}/{}).",
            target.id,
            state.current_index + 1,
            state.targets.len()
        ));
        info!("Claim run already in progress, not restarting");
        let url = self.config.plot_url(&target.id);
        self.host.nav.navigate_to(&url);
        ClaimOutcome::Navigated(url)
    }

    /// Plots from the last report when there is one, otherwise from the live dashboard.
    fn claim_targets(&self) -> Vec<PlotSummary> {
        let from_report = match store::load::<CompletedReport>(self.host.store, REPORT_KEY) {
            Ok(Some(report)) => report.plot_details.into_iter().map(|d| d.summary).collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Error getting plots from cached report: {}", e);
                Vec::new()
            }
        };
        let with_pumps = |plots: Vec<PlotSummary>| -> Vec<PlotSummary> {
            plots.into_iter().filter(|p| p.pump_count > 0).collect()
        };

        let targets = with_pumps(from_report);
        if !targets.is_empty() {
            return targets;
        }
        match self.host.page.dashboard() {
            Some(reading) => with_pumps(DashboardSnapshot::from_reading(reading).plots),
            None => Vec::new(),
        }
    }

    pub async fn resume(&self) -> ClaimOutcome {
        let state: ClaimState = match store::load(self.host.store, CLAIM_KEY) {
            Ok(Some(state)) => state,
            Ok(None) => return ClaimOutcome::Idle,
            Err(e) => return self.fail(e),
        };

        match self.host.page_kind() {
            PageKind::Plot if state.in_progress => self.claim_plot(state).await,
            PageKind::Dashboard if !state.in_progress => self.wrap_up(state).await,
            _ => ClaimOutcome::Idle,
        }
    }

    async fn claim_plot(&self, mut state: ClaimState) -> ClaimOutcome {
        let Some(target) = state.current_target().cloned() else {
            return self.fail(HelperError::CorruptState {
                key: CLAIM_KEY.to_string(),
                reason: format!("no plot at index {}", state.current_index),
            });
        };
        self.host.presenter.status(&format!(
            "Claiming rewards from plot #{} ({}/{})...",
            target.id,
            state.current_index + 1,
            state.targets.len()
        ));

        match self.claim_rewards().await {
            Ok(PlotClaim::Claimed(amount)) => {
                state.total_claimed += amount;
                self.host.presenter.notice(&format!("Successfully claimed {:.4} cOIL!", amount));
            }
            Ok(PlotClaim::NothingToClaim) => self.host.presenter.notice("No rewards to claim on this plot."),
            Ok(PlotClaim::NoStoreButton) => {
                self.host.presenter.notice("Could not find Store button. Skipping this plot.")
            }
            Ok(PlotClaim::TimedOut) => self.host.presenter.notice("Wait time exceeded. Moving to next plot."),
            Err(e) => {
                error!("Error claiming from plot {}: {}", target.id, e);
                self.host.presenter.error(&format!("Error: {}", e));
            }
        }
        settle(self.config.after_claim_settle).await;

        let next_url = state.advance().map(|next| self.config.plot_url(&next.id));
        if let Err(e) = store::save(self.host.store, CLAIM_KEY, &state) {
            return self.fail(e);
        }

        let url = match next_url {
            Some(url) => url,
            None => {
                self.host.presenter.status(&format!(
                    "Completed claiming from all plots! Total claimed: {:.4} cOIL. Returning to dashboard...",
                    state.total_claimed
                ));
                settle(self.config.return_settle).await;
                state.dashboard_url
            }
        };
        self.host.nav.navigate_to(&url);
        ClaimOutcome::Navigated(url)
    }

    async fn claim_rewards(&self) -> Result<PlotClaim, HelperError> {
        let page = self.host.page;
        wait_for_element(page, PageElement::RewardsPanel, self.config.poll_interval, self.config.reward_timeout)
            .await?;
        settle(self.config.plot_settle).await;

        let initial = page.reward_value().unwrap_or(0.0);
        if initial <= 0.0 {
            return Ok(PlotClaim::NothingToClaim);
        }
        self.host
            .presenter
            .status(&format!("Found {:.4} cOIL to claim. Clicking Store button...", initial));
        if !page.trigger_claim() {
            return Ok(PlotClaim::NoStoreButton);
        }

        // The value only drops once the transaction is approved and mined.
        let mut current = initial;
        let confirmed = poll_until(
            || {
                if let Some(value) = page.reward_value() {
                    current = value;
                }
                current < initial
            },
            self.config.claim_poll,
            self.config.claim_timeout,
        )
        .await;

        if confirmed {
            Ok(PlotClaim::Claimed(initial - current))
        } else {
            warn!("Reward value never dropped from {:.4}", initial);
            Ok(PlotClaim::TimedOut)
        }
    }

    async fn wrap_up(&self, state: ClaimState) -> ClaimOutcome {
        self.host.presenter.notice(&format!(
            "Claim All Rewards Complete! Successfully claimed {:.4} cOIL from {} plots.",
            state.total_claimed,
            state.targets.len()
        ));
        settle(self.config.claim_summary_settle).await;

        if let Err(e) = self.host.store.remove(CLAIM_KEY) {
            error!("Failed to clear claim state: {}", e);
        }
        if let Err(e) = refresh_from_page(&self.host, self.config.planner) {
            info!("No report refreshed after claiming: {}", e);
        }
        ClaimOutcome::Completed { total_claimed: state.total_claimed }
    }

    fn fail(&self, e: HelperError) -> ClaimOutcome {
        error!("Error during claim process: {}", e);
        self.host.presenter.error(&format!("Error during claim process: {}", e));
        ClaimOutcome::Failed(e)
    }
}
