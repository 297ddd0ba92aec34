// src/services/decay.rs
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    BalanceProjectionPoint, DashboardSnapshot, DecayBatch, LowestBalanceEvent, PlotDetail, PUMP_COST,
};
use crate::services::time_parser::format_minutes;

/// Width of a decay batch bucket.
pub const BATCH_MINUTES: u32 = 5;
/// Batches past this offset are left out of the balance replay.
pub const REPLAY_HORIZON_MINUTES: u32 = 48 * 60;
pub const DISPLAY_HORIZON_MINUTES: u32 = 24 * 60;
pub const DISPLAY_LIMIT: usize = 30;
pub const NEAR_TERM_MINUTES: u32 = 12 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayProjection {
    pub immediate_repair_cost: f64,
    pub available_after_immediate_repairs: f64,
    pub decay_batches: Vec<DecayBatch>,
    pub balance_projections: Vec<BalanceProjectionPoint>,
    pub lowest_projected_balance: f64,
    pub lowest_balance_event: Option<LowestBalanceEvent>,
    pub total_repair_costs: f64,
    pub next_critical_repair_label: String,
    #[serde(rename = "next12HourRepairCost")]
    pub next_12_hour_repair_cost: f64,
    /// Set when the batches were synthesized from pump counts rather than read off plot pages.
    #[serde(default)]
    pub estimated: bool,
}

impl Default for DecayProjection {
    fn default() -> Self {
        DecayProjection {
            immediate_repair_cost: 0.0,
            available_after_immediate_repairs: 0.0,
            decay_batches: Vec::new(),
            balance_projections: Vec::new(),
            lowest_projected_balance: 0.0,
            lowest_balance_event: None,
            total_repair_costs: 0.0,
            next_critical_repair_label: "None".to_string(),
            next_12_hour_repair_cost: 0.0,
            estimated: false,
        }
    }
}

impl DecayProjection {
    /// Batches worth listing to the player: the next 24 hours, at most 30 rows.
    pub fn upcoming_decays(&self) -> impl Iterator<Item = &DecayBatch> {
        self.decay_batches
            .iter()
            .filter(|b| b.minute_offset <= DISPLAY_HORIZON_MINUTES)
            .take(DISPLAY_LIMIT)
    }
}

/// A single pump reaching zero durability.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayEvent {
    pub minute_offset: u32,
    pub cost: f64,
    pub occurs_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReplay {
    pub points: Vec<BalanceProjectionPoint>,
    pub lowest_balance: f64,
    pub lowest_event: Option<LowestBalanceEvent>,
}

/// Turns scraped pump countdowns into repair batches and a balance trajectory.
#[derive(Debug, Clone, Copy)]
pub struct DecayProjector {
    now: DateTime<Utc>,
    estimate_seed: u64,
}

impl DecayProjector {
    pub fn new(now: DateTime<Utc>) -> Self {
        DecayProjector { now, estimate_seed: now.timestamp() as u64 }
    }

    /// Seed for the fallback estimate, so the same report always estimates the same schedule.
    pub fn with_estimate_seed(mut self, seed: u64) -> Self {
        self.estimate_seed = seed;
        self
    }

    pub fn project(
        &self,
        snapshot: Option<&DashboardSnapshot>,
        plots: Option<&[PlotDetail]>,
    ) -> DecayProjection {
        let (snapshot, plots) = match (snapshot, plots) {
            (Some(s), Some(p)) => (s, p),
            _ => {
                warn!("Missing dashboard snapshot or plot details; returning an empty projection");
                return DecayProjection::default();
            }
        };

        let immediate_repair_cost = snapshot.total_decayed_pumps as f64 * PUMP_COST;
        let available_after_immediate_repairs = (snapshot.total_available - immediate_repair_cost).max(0.0);

        let events = collect_decay_events(plots, self.now);
        let (decay_batches, estimated) = if events.is_empty() {
            warn!(
                "No decay times found in {} plots; estimating from {} active pumps",
                plots.len(),
                snapshot.total_active_pumps
            );
            (estimate_batches(snapshot.total_active_pumps, self.now, self.estimate_seed), true)
        } else {
            debug!("Grouping {} decay events into batches", events.len());
            (group_into_batches(&events), false)
        };

        let total_repair_costs = decay_batches.iter().map(|b| b.repair_cost).sum();
        let next_critical_repair_label = decay_batches
            .first()
            .map(|b| format_minutes(b.minute_offset))
            .unwrap_or_else(|| "None".to_string());
        let next_12_hour_repair_cost = decay_batches
            .iter()
            .filter(|b| b.minute_offset <= NEAR_TERM_MINUTES)
            .map(|b| b.repair_cost)
            .sum();

        let in_horizon: Vec<DecayBatch> = decay_batches
            .iter()
            .filter(|b| b.minute_offset <= REPLAY_HORIZON_MINUTES)
            .cloned()
            .collect();
        let replay = replay_balance(&in_horizon, available_after_immediate_repairs, snapshot.minutely_production);

        DecayProjection {
            immediate_repair_cost,
            available_after_immediate_repairs,
            decay_batches,
            balance_projections: replay.points,
            lowest_projected_balance: replay.lowest_balance,
            lowest_balance_event: replay.lowest_event,
            total_repair_costs,
            next_critical_repair_label,
            next_12_hour_repair_cost,
            estimated,
        }
    }
}

/// Decay events for every pump with a countdown still running at `now`.
///
/// Countdowns are anchored at the time their plot was scraped, so projecting an
/// old crawl later yields the time that is actually left.
pub fn collect_decay_events(plots: &[PlotDetail], now: DateTime<Utc>) -> Vec<DecayEvent> {
    let mut events = Vec::new();

    for plot in plots {
        let anchor = plot.scraped_at.unwrap_or(now);
        let elapsed_minutes = ((now - anchor).num_milliseconds() as f64 / 60_000.0).max(0.0);

        for pump in &plot.pump_details {
            let hours = pump.effective_decay_hours();
            if hours <= 0.0 || !hours.is_finite() {
                continue;
            }

            let remaining = hours * 60.0 - elapsed_minutes;
            if remaining <= 0.0 {
                continue;
            }

            // Countdowns too long for a timestamp are out of any horizon anyway.
            let Some(occurs_at) = Duration::try_milliseconds((hours * 3_600_000.0).round() as i64)
                .and_then(|delta| anchor.checked_add_signed(delta))
            else {
                warn!("Skipping pump on plot {}: decay in {} hours is out of range", plot.summary.id, hours);
                continue;
            };

            events.push(DecayEvent {
                minute_offset: remaining.floor() as u32,
                cost: PUMP_COST,
                occurs_at,
            });
        }
    }

    events
}

/// Buckets events by offset rounded down to the batch width, ascending.
pub fn group_into_batches(events: &[DecayEvent]) -> Vec<DecayBatch> {
    let mut buckets: BTreeMap<u32, DecayBatch> = BTreeMap::new();

    for event in events {
        let key = event.minute_offset / BATCH_MINUTES * BATCH_MINUTES;
        let batch = buckets.entry(key).or_insert_with(|| DecayBatch {
            minute_offset: key,
            pump_count: 0,
            repair_cost: 0.0,
            occurs_at: event.occurs_at,
        });
        batch.pump_count += 1;
        batch.repair_cost += event.cost;
    }

    buckets.into_values().collect()
}

/// Stand-in schedule when no plot page yielded a countdown. Not measured data.
pub fn estimate_batches(total_active_pumps: u32, now: DateTime<Utc>, seed: u64) -> Vec<DecayBatch> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let batch_at = |hour: u32, count: u32| {
        let minute_offset = hour * 60 / BATCH_MINUTES * BATCH_MINUTES;
        DecayBatch {
            minute_offset,
            pump_count: count,
            repair_cost: count as f64 * PUMP_COST,
            occurs_at: now + Duration::minutes(minute_offset as i64),
        }
    };

    if total_active_pumps > 0 {
        (1..=48)
            .map(|hour| {
                let spread = rng.gen::<f64>() * 0.5 + 0.75;
                let count = ((total_active_pumps as f64 * 0.02 * spread).round() as u32).max(1);
                batch_at(hour, count)
            })
            .collect()
    } else {
        (1..=24)
            .step_by(4)
            .map(|hour| batch_at(hour, 5 + rng.gen_range(0..6)))
            .collect()
    }
}

/// Replays batches in order against a running balance that grows by `minutely_production`.
pub fn replay_balance(batches: &[DecayBatch], starting_balance: f64, minutely_production: f64) -> BalanceReplay {
    let mut points = Vec::with_capacity(batches.len());
    let mut running = starting_balance;
    let mut last_minute = 0;
    let mut lowest_balance = starting_balance;
    let mut lowest_event = None;

    for batch in batches {
        let production_accrued = batch.minute_offset.saturating_sub(last_minute) as f64 * minutely_production;
        let balance_before = running + production_accrued;
        let balance_after = balance_before - batch.repair_cost;

        points.push(BalanceProjectionPoint {
            minute_offset: batch.minute_offset,
            occurs_at: batch.occurs_at,
            pump_count_repaired: batch.pump_count,
            repair_cost: batch.repair_cost,
            production_accrued,
            balance_before,
            balance_after,
        });

        if balance_after < lowest_balance {
            lowest_balance = balance_after;
            lowest_event = Some(LowestBalanceEvent {
                minute_offset: batch.minute_offset,
                pump_count: batch.pump_count,
                occurs_at: batch.occurs_at,
            });
        }

        running = balance_after;
        last_minute = batch.minute_offset;
    }

    BalanceReplay { points, lowest_balance, lowest_event }
}
