// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

use crate::services::reinvestment::ReinvestmentPlan;
use crate::services::time_parser::parse_duration;

/// Price of one pump, paid both for a new pump and for repairing a decayed one.
pub const PUMP_COST: f64 = 50.0;

/// One row of a plot's pump table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PumpRecord {
    pub status: String,
    pub durability_percent: u8,
    pub decay_hours: Option<f64>,
    pub decay_duration_text: String,
    pub production: f64,
}

impl Default for PumpRecord {
    fn default() -> Self {
        PumpRecord {
            status: "Unknown".to_string(),
            durability_percent: 100,
            decay_hours: None,
            decay_duration_text: String::new(),
            production: 0.0,
        }
    }
}

impl PumpRecord {
    /// Hours until decay, preferring the numeric field and falling back to the raw text.
    pub fn effective_decay_hours(&self) -> f64 {
        match self.decay_hours {
            Some(hours) if hours > 0.0 => hours,
            _ if !self.decay_duration_text.trim().is_empty() => parse_duration(&self.decay_duration_text),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotSummary {
    pub id: String,
    pub url: String,
    pub pump_count: u32,
    #[serde(default)]
    pub decayed_pump_count: u32,
    pub daily_production: f64,
}

impl PlotSummary {
    /// Pumps the plot's detail page should list as working.
    pub fn expected_working_pumps(&self) -> u32 {
        self.pump_count.saturating_sub(self.decayed_pump_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotDetail {
    #[serde(flatten)]
    pub summary: PlotSummary,
    #[serde(default)]
    pub pump_details: Vec<PumpRecord>,
    #[serde(default)]
    pub valid_pump_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl PlotDetail {
    pub fn scraped(summary: PlotSummary, pumps: Vec<PumpRecord>, at: DateTime<Utc>) -> Self {
        PlotDetail {
            summary,
            valid_pump_count: pumps.len() as u32,
            pump_details: pumps,
            error: None,
            scraped_at: Some(at),
        }
    }

    pub fn failed(summary: PlotSummary, error: impl Into<String>, at: DateTime<Utc>) -> Self {
        PlotDetail {
            summary,
            pump_details: Vec::new(),
            valid_pump_count: 0,
            error: Some(error.into()),
            scraped_at: Some(at),
        }
    }
}

/// Raw figures read off the dashboard page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReading {
    pub balance: f64,
    #[serde(default)]
    pub unclaimed_rewards: f64,
    #[serde(default)]
    pub per_plot_summaries: Vec<PlotSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub current_balance: f64,
    pub unclaimed_rewards: f64,
    pub total_available: f64,
    pub total_daily_production: f64,
    pub hourly_production: f64,
    pub minutely_production: f64,
    pub total_active_pumps: u32,
    pub total_decayed_pumps: u32,
    #[serde(default)]
    pub plots: Vec<PlotSummary>,
}

impl DashboardSnapshot {
    /// Aggregates a dashboard reading, keeping only plots that produce and have pumps.
    pub fn from_reading(reading: DashboardReading) -> Self {
        let plots: Vec<PlotSummary> = reading.per_plot_summaries
            .into_iter()
            .filter(|p| p.daily_production > 0.0 && p.pump_count > 0)
            .collect();

        let total_daily_production: f64 = plots.iter().map(|p| p.daily_production).sum();
        let total_active_pumps = plots.iter().map(|p| p.expected_working_pumps()).sum();
        let total_decayed_pumps = plots.iter().map(|p| p.decayed_pump_count).sum();
        let hourly_production = total_daily_production / 24.0;

        DashboardSnapshot {
            current_balance: reading.balance,
            unclaimed_rewards: reading.unclaimed_rewards,
            total_available: reading.balance + reading.unclaimed_rewards,
            total_daily_production,
            hourly_production,
            minutely_production: hourly_production / 60.0,
            total_active_pumps,
            total_decayed_pumps,
            plots,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayBatch {
    pub minute_offset: u32,
    pub pump_count: u32,
    pub repair_cost: f64,
    pub occurs_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceProjectionPoint {
    pub minute_offset: u32,
    pub occurs_at: DateTime<Utc>,
    pub pump_count_repaired: u32,
    pub repair_cost: f64,
    pub production_accrued: f64,
    pub balance_before: f64,
    pub balance_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowestBalanceEvent {
    pub minute_offset: u32,
    pub pump_count: u32,
    pub occurs_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub pump_number: u32,
    pub minute_offset: u32,
    pub balance_before: f64,
    pub balance_after: f64,
    pub occurs_at: DateTime<Utc>,
}

/// Progress of a crawl across plot pages, persisted wholesale after every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlState {
    pub targets: Vec<PlotSummary>,
    pub collected: Vec<PlotDetail>,
    pub current_index: usize,
    pub dashboard_url: String,
    pub in_progress: bool,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub retry_count: u32,
}

/// Where a persisted crawl stands; derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Visiting(usize),
    Finalizing,
}

impl CrawlState {
    pub fn launch(targets: Vec<PlotSummary>, dashboard_url: impl Into<String>) -> Self {
        CrawlState {
            targets,
            collected: Vec::new(),
            current_index: 0,
            dashboard_url: dashboard_url.into(),
            in_progress: true,
            complete: false,
            retry_count: 0,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        if self.complete {
            CrawlPhase::Finalizing
        } else if self.in_progress {
            CrawlPhase::Visiting(self.current_index)
        } else {
            CrawlPhase::Idle
        }
    }

    pub fn current_target(&self) -> Option<&PlotSummary> {
        self.targets.get(self.current_index)
    }

    /// Records a finished plot and moves on. Returns the next target, or `None`
    /// once every target has been visited and the crawl is marked complete.
    pub fn record_and_advance(&mut self, detail: PlotDetail) -> Option<&PlotSummary> {
        self.collected.push(detail);
        self.current_index += 1;
        self.retry_count = 0;
        if self.current_index >= self.targets.len() {
            self.complete = true;
            self.in_progress = false;
            None
        } else {
            self.targets.get(self.current_index)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimState {
    pub targets: Vec<PlotSummary>,
    pub current_index: usize,
    pub dashboard_url: String,
    pub in_progress: bool,
    #[serde(default)]
    pub total_claimed: f64,
}

impl ClaimState {
    pub fn launch(targets: Vec<PlotSummary>, dashboard_url: impl Into<String>) -> Self {
        ClaimState {
            targets,
            current_index: 0,
            dashboard_url: dashboard_url.into(),
            in_progress: true,
            total_claimed: 0.0,
        }
    }

    pub fn current_target(&self) -> Option<&PlotSummary> {
        self.targets.get(self.current_index)
    }

    pub fn advance(&mut self) -> Option<&PlotSummary> {
        self.current_index += 1;
        if self.current_index >= self.targets.len() {
            self.in_progress = false;
            None
        } else {
            self.targets.get(self.current_index)
        }
    }
}

/// Result of a finished crawl, cached so the dashboard can show it again and refresh it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedReport {
    pub dashboard_snapshot: DashboardSnapshot,
    pub plot_details: Vec<PlotDetail>,
    pub reinvestment_plan: ReinvestmentPlan,
    pub collected_at: DateTime<Utc>,
    pub last_refreshed_at: DateTime<Utc>,
}

impl CompletedReport {
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        now - self.collected_at < chrono::Duration::hours(24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot(id: &str, pumps: u32, decayed: u32, production: f64) -> PlotSummary {
        PlotSummary {
            id: id.to_string(),
            url: format!("/dashboard/plot/{}", id),
            pump_count: pumps,
            decayed_pump_count: decayed,
            daily_production: production,
        }
    }

    #[test]
    fn snapshot_skips_idle_plots_and_derives_rates() {
        let reading = DashboardReading {
            balance: 120.0,
            unclaimed_rewards: 30.0,
            per_plot_summaries: vec![
                plot("1", 10, 2, 48.0),
                plot("2", 0, 0, 12.0),
                plot("3", 4, 0, 0.0),
            ],
        };

        let snapshot = DashboardSnapshot::from_reading(reading);
        assert_eq!(snapshot.plots.len(), 1);
        assert_eq!(snapshot.total_available, 150.0);
        assert_eq!(snapshot.total_active_pumps, 8);
        assert_eq!(snapshot.total_decayed_pumps, 2);
        assert_eq!(snapshot.hourly_production, 2.0);
        assert!((snapshot.minutely_production - 2.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn pump_falls_back_to_duration_text() {
        let pump = PumpRecord {
            decay_hours: None,
            decay_duration_text: "1d 2h".to_string(),
            ..PumpRecord::default()
        };
        assert_eq!(pump.effective_decay_hours(), 26.0);

        let numeric = PumpRecord { decay_hours: Some(3.5), ..pump };
        assert_eq!(numeric.effective_decay_hours(), 3.5);
    }

    #[test]
    fn crawl_state_without_targets_is_rejected() {
        let raw = r#"{"collected":[],"currentIndex":0,"dashboardUrl":"x","inProgress":true}"#;
        assert!(serde_json::from_str::<CrawlState>(raw).is_err());
    }

    #[test]
    fn crawl_completes_after_last_target() {
        let mut state = CrawlState::launch(vec![plot("1", 2, 0, 5.0)], "https://petroleum.land/dashboard");
        assert_eq!(state.phase(), CrawlPhase::Visiting(0));

        let next = state.record_and_advance(PlotDetail::failed(plot("1", 2, 0, 5.0), "boom", Utc::now()));
        assert!(next.is_none());
        assert_eq!(state.phase(), CrawlPhase::Finalizing);
        assert!(!state.in_progress);
        assert_eq!(state.collected.len(), 1);
    }
}
