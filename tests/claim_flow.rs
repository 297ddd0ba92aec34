// tests/claim_flow.rs
mod common;

use chrono::{Duration, Utc};

use common::{plot, reading, Tab, GAME};
use petroleum_helper::config::HelperConfig;
use petroleum_helper::host::PageElement;
use petroleum_helper::models::{ClaimState, CompletedReport, DashboardSnapshot, PlotDetail};
use petroleum_helper::services::claim::{ClaimMachine, ClaimOutcome};
use petroleum_helper::services::report::build_report;
use petroleum_helper::services::store::{self, CLAIM_KEY, REPORT_KEY};

fn claim_underway(index: usize) -> ClaimState {
    let mut state = ClaimState::launch(
        vec![plot("11", 4, 0, 24.0), plot("12", 2, 0, 12.0)],
        format!("{}/dashboard", GAME),
    );
    state.current_index = index;
    state
}

fn plot_tab(state: &ClaimState) -> Tab {
    let tab = Tab::at(&format!("/dashboard/plot/{}", state.targets[state.current_index].id));
    store::save(&tab.store, CLAIM_KEY, state).unwrap();
    tab
}

fn rewards_page(tab: &Tab, readings: &[f64]) {
    tab.page.show(&[PageElement::RewardsPanel]);
    tab.page.has_store_button.set(true);
    tab.page.rewards.borrow_mut().extend(readings.iter().copied());
}

#[test]
fn start_targets_live_plots_without_a_report() {
    let tab = Tab::at("/dashboard");
    *tab.page.dashboard.borrow_mut() = Some(reading(50.0, vec![plot("11", 4, 0, 24.0), plot("13", 0, 0, 0.0)]));
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).start();

    assert!(matches!(outcome, ClaimOutcome::Navigated(ref url) if url == "https://petroleum.land/dashboard/plot/11"));
    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    assert_eq!(state.targets.len(), 1);
    assert_eq!(state.total_claimed, 0.0);
    assert!(tab.gate.prompts.borrow()[0].contains("1 plots"));
}

#[test]
fn start_prefers_plots_from_cached_report() {
    let tab = Tab::at("/dashboard");
    *tab.page.dashboard.borrow_mut() = Some(reading(50.0, vec![plot("11", 4, 0, 24.0)]));
    let snapshot = DashboardSnapshot::from_reading(reading(50.0, vec![plot("21", 3, 0, 24.0)]));
    let details = vec![
        PlotDetail::failed(plot("21", 3, 0, 24.0), "skipped", Utc::now()),
        PlotDetail::failed(plot("22", 2, 0, 12.0), "skipped", Utc::now()),
    ];
    let report = build_report(snapshot, details, Utc::now(), HelperConfig::default().planner);
    store::save(&tab.store, REPORT_KEY, &report).unwrap();
    let config = HelperConfig::default();

    ClaimMachine::new(tab.host(), &config).start();

    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    let ids: Vec<&str> = state.targets.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["21", "22"]);
}

#[test]
fn declining_claim_persists_nothing() {
    let mut tab = Tab::at("/dashboard");
    tab.gate.answer = false;
    *tab.page.dashboard.borrow_mut() = Some(reading(50.0, vec![plot("11", 4, 0, 24.0)]));
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).start();

    assert!(matches!(outcome, ClaimOutcome::Declined));
    assert!(!tab.has_key(CLAIM_KEY));
    assert!(tab.presenter.noticed("Claiming cancelled by user."));
}

#[test]
fn second_start_continues_the_running_claim() {
    let tab = Tab::at("/dashboard");
    *tab.page.dashboard.borrow_mut() = Some(reading(50.0, vec![plot("11", 4, 0, 24.0)]));
    let mut running = claim_underway(1);
    running.total_claimed = 3.0;
    store::save(&tab.store, CLAIM_KEY, &running).unwrap();
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).start();

    assert!(matches!(outcome, ClaimOutcome::Navigated(ref url) if url.ends_with("/dashboard/plot/12")));
    assert!(tab.gate.prompts.borrow().is_empty());
    assert!(tab.presenter.noticed("already in progress"));
    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    assert_eq!(state.targets.len(), 2);
    assert_eq!(state.total_claimed, 3.0);
}

#[test]
fn nothing_to_claim_without_pumps() {
    let tab = Tab::at("/dashboard");
    *tab.page.dashboard.borrow_mut() = Some(reading(50.0, Vec::new()));
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).start();

    assert!(matches!(outcome, ClaimOutcome::NothingToClaim));
    assert!(tab.gate.prompts.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn claim_accumulates_observed_drop() {
    let tab = plot_tab(&claim_underway(0));
    rewards_page(&tab, &[3.5, 3.5, 3.5, 1.0]);
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).resume().await;

    assert!(matches!(outcome, ClaimOutcome::Navigated(ref url) if url.ends_with("/dashboard/plot/12")));
    assert_eq!(tab.page.claim_clicks.get(), 1);
    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    assert_eq!(state.current_index, 1);
    assert!(state.in_progress);
    assert!((state.total_claimed - 2.5).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn zero_reward_is_not_claimed() {
    let tab = plot_tab(&claim_underway(0));
    rewards_page(&tab, &[0.0]);
    let config = HelperConfig::default();

    ClaimMachine::new(tab.host(), &config).resume().await;

    assert_eq!(tab.page.claim_clicks.get(), 0);
    assert!(tab.presenter.noticed("No rewards to claim"));
    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    assert_eq!(state.current_index, 1);
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_claim_moves_on_after_ceiling() {
    let tab = plot_tab(&claim_underway(0));
    rewards_page(&tab, &[2.0]);
    let config = HelperConfig::default();
    let started = tokio::time::Instant::now();

    ClaimMachine::new(tab.host(), &config).resume().await;

    assert!(started.elapsed() >= config.claim_timeout);
    assert!(tab.presenter.noticed("Wait time exceeded"));
    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    assert_eq!(state.current_index, 1);
    assert_eq!(state.total_claimed, 0.0);
}

#[tokio::test(start_paused = true)]
async fn missing_rewards_panel_is_logged_and_skipped() {
    let tab = plot_tab(&claim_underway(0));
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).resume().await;

    assert!(matches!(outcome, ClaimOutcome::Navigated(_)));
    assert_eq!(tab.presenter.errors.borrow().len(), 1);
    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    assert_eq!(state.current_index, 1);
}

#[tokio::test(start_paused = true)]
async fn last_plot_heads_back_to_dashboard() {
    let tab = plot_tab(&claim_underway(1));
    rewards_page(&tab, &[1.25, 0.0]);
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).resume().await;

    assert!(matches!(outcome, ClaimOutcome::Navigated(ref url) if url == "https://petroleum.land/dashboard"));
    let state: ClaimState = tab.load(CLAIM_KEY).unwrap();
    assert!(!state.in_progress);
    assert!((state.total_claimed - 1.25).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn finished_run_clears_state_and_refreshes_report() {
    let tab = Tab::at("/dashboard");
    *tab.page.dashboard.borrow_mut() = Some(reading(180.0, vec![plot("11", 4, 0, 24.0)]));
    let collected = Utc::now() - Duration::hours(2);
    let report = build_report(
        DashboardSnapshot::from_reading(reading(60.0, vec![plot("11", 4, 0, 24.0)])),
        Vec::new(),
        collected,
        HelperConfig::default().planner,
    );
    store::save(&tab.store, REPORT_KEY, &report).unwrap();

    let mut state = claim_underway(1);
    state.total_claimed = 4.0;
    state.advance();
    store::save(&tab.store, CLAIM_KEY, &state).unwrap();
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).resume().await;

    assert!(matches!(outcome, ClaimOutcome::Completed { total_claimed } if total_claimed == 4.0));
    assert!(!tab.has_key(CLAIM_KEY));
    assert!(tab.presenter.noticed("4.0000 cOIL from 2 plots"));
    let refreshed: CompletedReport = tab.load(REPORT_KEY).unwrap();
    assert_eq!(refreshed.dashboard_snapshot.current_balance, 180.0);
    assert_eq!(refreshed.collected_at, collected);
    assert!(refreshed.last_refreshed_at > collected);
}

#[tokio::test(start_paused = true)]
async fn run_in_flight_does_nothing_on_dashboard() {
    let tab = Tab::at("/dashboard");
    store::save(&tab.store, CLAIM_KEY, &claim_underway(0)).unwrap();
    let config = HelperConfig::default();

    let outcome = ClaimMachine::new(tab.host(), &config).resume().await;

    assert!(matches!(outcome, ClaimOutcome::Idle));
    assert!(tab.has_key(CLAIM_KEY));
}

#[tokio::test(start_paused = true)]
async fn page_load_resumes_claim_when_no_crawl_runs() {
    let tab = plot_tab(&claim_underway(0));
    rewards_page(&tab, &[0.0]);
    let config = HelperConfig::default();

    let load = petroleum_helper::Helper::new(tab.host(), &config).on_page_load().await;

    assert!(matches!(load.crawl, petroleum_helper::services::crawl::CrawlOutcome::Idle));
    assert!(matches!(load.claim, Some(ClaimOutcome::Navigated(_))));
}
