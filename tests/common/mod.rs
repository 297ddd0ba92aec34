// tests/common/mod.rs
#![allow(dead_code)]
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use petroleum_helper::host::{ConfirmationGate, Host, KeyValueStore, Navigator, PageElement, PageSource, Presenter};
use petroleum_helper::models::{CompletedReport, DashboardReading, PlotSummary, PumpRecord};
use petroleum_helper::services::store::{self, MemoryStore};

pub const GAME: &str = "https://petroleum.land";

/// A page whose contents the test scripts up front.
#[derive(Default)]
pub struct ScriptedPage {
    pub dashboard: RefCell<Option<DashboardReading>>,
    pub present: RefCell<Vec<PageElement>>,
    pub has_pumps_tab: Cell<bool>,
    pub pumps: RefCell<Vec<PumpRecord>>,
    /// Successive reward readings; the last one repeats.
    pub rewards: RefCell<VecDeque<f64>>,
    pub has_store_button: Cell<bool>,
    pub claim_clicks: Cell<u32>,
}

impl ScriptedPage {
    pub fn show(&self, elements: &[PageElement]) {
        self.present.borrow_mut().extend_from_slice(elements);
    }
}

impl PageSource for ScriptedPage {
    fn dashboard(&self) -> Option<DashboardReading> {
        self.dashboard.borrow().clone()
    }

    fn is_present(&self, element: PageElement) -> bool {
        self.present.borrow().contains(&element)
    }

    fn open_pumps_tab(&self) -> bool {
        self.has_pumps_tab.get()
    }

    fn pump_records(&self) -> Vec<PumpRecord> {
        self.pumps.borrow().clone()
    }

    fn reward_value(&self) -> Option<f64> {
        let mut rewards = self.rewards.borrow_mut();
        if rewards.len() > 1 {
            rewards.pop_front()
        } else {
            rewards.front().copied()
        }
    }

    fn trigger_claim(&self) -> bool {
        self.claim_clicks.set(self.claim_clicks.get() + 1);
        self.has_store_button.get()
    }
}

pub struct RecordingNav {
    pub path: RefCell<String>,
    pub visited: RefCell<Vec<String>>,
    pub reloads: Cell<u32>,
}

impl RecordingNav {
    pub fn at(path: &str) -> Self {
        RecordingNav {
            path: RefCell::new(path.to_string()),
            visited: RefCell::new(Vec::new()),
            reloads: Cell::new(0),
        }
    }

    pub fn last_visit(&self) -> Option<String> {
        self.visited.borrow().last().cloned()
    }
}

impl Navigator for RecordingNav {
    fn navigate_to(&self, url: &str) {
        self.visited.borrow_mut().push(url.to_string());
    }

    fn reload(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }

    fn current_url(&self) -> String {
        format!("{}{}", GAME, self.path.borrow())
    }

    fn current_path(&self) -> String {
        self.path.borrow().clone()
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub statuses: RefCell<Vec<String>>,
    pub notices: RefCell<Vec<String>>,
    pub errors: RefCell<Vec<String>>,
    pub reports: RefCell<Vec<CompletedReport>>,
}

impl RecordingPresenter {
    pub fn noticed(&self, fragment: &str) -> bool {
        self.notices.borrow().iter().any(|n| n.contains(fragment))
    }
}

impl Presenter for RecordingPresenter {
    fn status(&self, message: &str) {
        self.statuses.borrow_mut().push(message.to_string());
    }

    fn notice(&self, message: &str) {
        self.notices.borrow_mut().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }

    fn show_report(&self, report: &CompletedReport) {
        self.reports.borrow_mut().push(report.clone());
    }
}

pub struct Gate {
    pub answer: bool,
    pub prompts: RefCell<Vec<String>>,
}

impl ConfirmationGate for Gate {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answer
    }
}

/// One browser tab: the current page plus everything that survives navigation.
pub struct Tab {
    pub page: ScriptedPage,
    pub store: MemoryStore,
    pub nav: RecordingNav,
    pub presenter: RecordingPresenter,
    pub gate: Gate,
}

impl Tab {
    pub fn at(path: &str) -> Self {
        Tab {
            page: ScriptedPage::default(),
            store: MemoryStore::new(),
            nav: RecordingNav::at(path),
            presenter: RecordingPresenter::default(),
            gate: Gate { answer: true, prompts: RefCell::new(Vec::new()) },
        }
    }

    pub fn host(&self) -> Host<'_> {
        Host {
            page: &self.page,
            store: &self.store,
            nav: &self.nav,
            presenter: &self.presenter,
            gate: &self.gate,
        }
    }

    pub fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        store::load(&self.store, key).unwrap()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.store.get(key).is_some()
    }
}

pub fn plot(id: &str, pumps: u32, decayed: u32, daily: f64) -> PlotSummary {
    PlotSummary {
        id: id.to_string(),
        url: format!("/dashboard/plot/{}", id),
        pump_count: pumps,
        decayed_pump_count: decayed,
        daily_production: daily,
    }
}

pub fn reading(balance: f64, plots: Vec<PlotSummary>) -> DashboardReading {
    DashboardReading { balance, unclaimed_rewards: 0.0, per_plot_summaries: plots }
}

pub fn pumps_decaying_in(hours: &[f64]) -> Vec<PumpRecord> {
    hours
        .iter()
        .map(|h| PumpRecord { status: "Active".to_string(), decay_hours: Some(*h), ..PumpRecord::default() })
        .collect()
}
