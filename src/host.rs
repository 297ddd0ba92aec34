// src/host.rs
//! Collaborators the page-resident host provides to the crawl and claim machines.
use crate::error::HelperError;
use crate::models::{CompletedReport, DashboardReading, PumpRecord};

/// Page elements the machines wait on before reading a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageElement {
    Dashboard,
    TabButtons,
    PumpTable,
    RewardsPanel,
}

/// Which kind of game page the host is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Dashboard,
    Plot,
    Other,
}

impl PageKind {
    pub fn from_path(path: &str) -> Self {
        if path.contains("/dashboard/plot/") {
            PageKind::Plot
        } else if path == "/dashboard" || path == "/dashboard/" {
            PageKind::Dashboard
        } else {
            PageKind::Other
        }
    }
}

/// Read access to the live game page plus the two clicks the machines need.
pub trait PageSource {
    /// Balance, unclaimed rewards and plot list, when the dashboard is rendered.
    fn dashboard(&self) -> Option<DashboardReading>;
    fn is_present(&self, element: PageElement) -> bool;
    /// Switches a plot page to its Pumps tab. False when the tab cannot be found.
    fn open_pumps_tab(&self) -> bool;
    fn pump_records(&self) -> Vec<PumpRecord>;
    fn reward_value(&self) -> Option<f64>;
    /// Presses the claim button. False when there is no button to press.
    fn trigger_claim(&self) -> bool;
}

/// String-keyed, string-valued store that outlives page navigations.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

/// Navigating or reloading abandons whatever the current page was doing; callers
/// return immediately afterwards and pick up again from persisted state.
pub trait Navigator {
    fn navigate_to(&self, url: &str);
    fn reload(&self);
    fn current_url(&self) -> String;
    fn current_path(&self) -> String;
}

pub trait Presenter {
    fn status(&self, message: &str);
    fn notice(&self, message: &str);
    fn error(&self, message: &str);
    fn show_report(&self, report: &CompletedReport);
}

pub trait ConfirmationGate {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Everything a state machine step may touch.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub page: &'a dyn PageSource,
    pub store: &'a dyn KeyValueStore,
    pub nav: &'a dyn Navigator,
    pub presenter: &'a dyn Presenter,
    pub gate: &'a dyn ConfirmationGate,
}

impl<'a> Host<'a> {
    pub fn page_kind(&self) -> PageKind {
        PageKind::from_path(&self.nav.current_path())
    }

    /// Asks the user before a run starts.
    pub fn confirm(&self, prompt: &str) -> Result<(), HelperError> {
        if self.gate.confirm(prompt) {
            Ok(())
        } else {
            Err(HelperError::UserDeclined)
        }
    }
}
