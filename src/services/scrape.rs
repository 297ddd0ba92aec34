// src/services/scrape.rs
//! Reads game pages from their HTML. Class names on the site carry build hashes,
//! so every selector matches on a class substring.
use log::{debug, info};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::host::{PageElement, PageSource};
use crate::models::{DashboardReading, PlotSummary, PumpRecord};
use crate::services::time_parser::parse_duration;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("literal selector")
}

fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("literal number pattern"))
}

fn percent_pattern() -> &'static Regex {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    PERCENT.get_or_init(|| Regex::new(r"(\d+)%").expect("literal percent pattern"))
}

/// First decimal number in `text`, ignoring thousands separators.
pub fn first_number(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    number_pattern()
        .captures(&cleaned)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>()
}

/// Text directly inside `el`, leaving out nested elements.
fn own_text(el: ElementRef) -> String {
    el.children()
        .filter_map(|child| child.value().as_text().map(|t| String::from(&**t)))
        .collect()
}

fn closest_div(el: ElementRef) -> Option<ElementRef> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "div")
}

fn css_for(element: PageElement) -> &'static str {
    match element {
        PageElement::Dashboard => r#"div[class*="balanceItem"]"#,
        PageElement::TabButtons => r#"button[class*="tabButton"]"#,
        PageElement::PumpTable => r#"table[class*="pumpTable"]"#,
        PageElement::RewardsPanel => r#"div[class*="rewardsContainer"]"#,
    }
}

pub fn has_element(doc: &Html, element: PageElement) -> bool {
    doc.select(&selector(css_for(element))).next().is_some()
}

fn read_balance(doc: &Html) -> f64 {
    let value = selector(r#"div[class*="balanceValue"]"#);
    doc.select(&selector(r#"div[class*="balanceItem"]"#))
        .filter(|item| text_of(*item).contains("cOIL"))
        .find_map(|item| item.select(&value).next())
        .and_then(|v| first_number(&text_of(v)))
        .unwrap_or(0.0)
}

fn read_unclaimed(doc: &Html) -> f64 {
    let labelled = doc
        .select(&selector(r#"div[class*="rewardValue"], div[class*="summaryInfo"] h3"#))
        .map(text_of)
        .filter(|text| text.contains("cOIL"))
        .find_map(|text| first_number(&text));
    if let Some(value) = labelled.filter(|v| *v > 0.0) {
        return value;
    }

    let h3 = selector("h3");
    doc.select(&selector("p"))
        .filter(|p| text_of(*p).contains("Current Rewards"))
        .filter_map(closest_div)
        .filter_map(|div| div.select(&h3).next())
        .find_map(|h| first_number(&text_of(h)))
        .unwrap_or(0.0)
}

fn read_plot(link: ElementRef) -> Option<PlotSummary> {
    let item = link.select(&selector(r#"div[class*="plotItem"]"#)).next()?;
    let url = link.value().attr("href")?.to_string();
    let id = url.trim_end_matches('/').rsplit('/').next()?.to_string();

    let stat_label = selector(r#"span[class*="statLabel"]"#);
    let decayed = selector(r#"span[class*="decayedPumps"]"#);
    let mut summary = PlotSummary { id, url, pump_count: 0, decayed_pump_count: 0, daily_production: 0.0 };

    for value in item.select(&selector(r#"span[class*="statValue"]"#)) {
        let Some(label) = closest_div(value).and_then(|div| div.select(&stat_label).next()) else {
            continue;
        };
        let label = text_of(label);
        if label.contains("Production") {
            summary.daily_production = first_number(&text_of(value)).unwrap_or(0.0);
        } else if label.contains("Pumps") {
            // The decayed count sits in a nested span; only the outer text is the total.
            summary.pump_count = first_number(&own_text(value)).unwrap_or(0.0) as u32;
            summary.decayed_pump_count = value
                .select(&decayed)
                .next()
                .and_then(|d| first_number(&text_of(d)))
                .unwrap_or(0.0) as u32;
        }
    }
    Some(summary)
}

/// Balance, rewards and every linked plot on a dashboard page. Plots are not
/// filtered here; `DashboardSnapshot::from_reading` drops idle ones.
pub fn parse_dashboard(doc: &Html) -> DashboardReading {
    let per_plot_summaries: Vec<PlotSummary> = doc
        .select(&selector(r#"a[class*="plotLink"]"#))
        .filter_map(read_plot)
        .collect();
    let reading = DashboardReading {
        balance: read_balance(doc),
        unclaimed_rewards: read_unclaimed(doc),
        per_plot_summaries,
    };
    debug!(
        "Dashboard: balance {}, unclaimed {}, {} plots",
        reading.balance,
        reading.unclaimed_rewards,
        reading.per_plot_summaries.len()
    );
    reading
}

/// Pump rows from a plot page's pump table. Header rows and rows with fewer
/// than six cells are skipped.
pub fn parse_pump_table(doc: &Html) -> Vec<PumpRecord> {
    let th = selector("th");
    let td = selector("td");
    let mut pumps = Vec::new();

    for row in doc.select(&selector(r#"table[class*="pumpTable"] tr"#)) {
        if row.select(&th).next().is_some() {
            continue;
        }
        let cells: Vec<String> = row.select(&td).map(|c| text_of(c).trim().to_string()).collect();
        if cells.len() < 6 {
            continue;
        }

        let durability_percent = percent_pattern()
            .captures(&cells[4])
            .and_then(|caps| caps[1].parse::<u8>().ok())
            .unwrap_or(100);
        let decay_hours = parse_duration(&cells[5]);
        pumps.push(PumpRecord {
            status: cells[2].clone(),
            durability_percent,
            decay_hours: Some(decay_hours),
            decay_duration_text: cells[5].clone(),
            production: cells.get(7).and_then(|c| first_number(c)).unwrap_or(0.0),
        });
    }

    info!(
        "Processed {} pump rows, {} with decay times",
        pumps.len(),
        pumps.iter().filter(|p| p.effective_decay_hours() > 0.0).count()
    );
    pumps
}

pub fn parse_reward_value(doc: &Html) -> Option<f64> {
    let in_panel = selector(r#"div[class*="rewardsContainer"] div[class*="rewardValue"]"#);
    let anywhere = selector(r#"div[class*="rewardValue"]"#);
    doc.select(&in_panel)
        .next()
        .or_else(|| doc.select(&anywhere).next())
        .and_then(|el| first_number(&text_of(el)))
}

fn has_button(doc: &Html, css: &str, caption: &str) -> bool {
    doc.select(&selector(css)).any(|b| text_of(b).contains(caption))
}

/// A fixed snapshot of one page. Clicks cannot change it, so they only report
/// whether the control exists.
pub struct HtmlPage {
    doc: Html,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        HtmlPage { doc: Html::parse_document(html) }
    }
}

impl PageSource for HtmlPage {
    fn dashboard(&self) -> Option<DashboardReading> {
        has_element(&self.doc, PageElement::Dashboard).then(|| parse_dashboard(&self.doc))
    }

    fn is_present(&self, element: PageElement) -> bool {
        has_element(&self.doc, element)
    }

    fn open_pumps_tab(&self) -> bool {
        has_button(&self.doc, r#"button[class*="tabButton"]"#, "Pumps")
    }

    fn pump_records(&self) -> Vec<PumpRecord> {
        parse_pump_table(&self.doc)
    }

    fn reward_value(&self) -> Option<f64> {
        parse_reward_value(&self.doc)
    }

    fn trigger_claim(&self) -> bool {
        has_button(&self.doc, r#"div[class*="rewardsContainer"] button"#, "Store")
    }
}
