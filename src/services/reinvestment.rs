// src/services/reinvestment.rs
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{DashboardSnapshot, PurchaseEvent, PUMP_COST};
use crate::services::decay::DecayProjection;

/// Window in which buying now must never push the balance negative.
pub const SAFETY_WINDOW_MINUTES: u32 = 12 * 60;
pub const SCHEDULE_HORIZON_MINUTES: u32 = 24 * 60;
pub const PURCHASE_LOOKAHEAD_MINUTES: u32 = 60;
pub const MAX_SCHEDULED_PURCHASES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    /// When false the plan is the balance-only variant with an empty purchase schedule.
    pub include_purchase_schedule: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        PlannerOptions { include_purchase_schedule: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinvestmentPlan {
    pub immediate_repair_cost: f64,
    pub available_after_immediate_repairs: f64,
    pub max_immediate_pumps: u32,
    pub reserved_for_upcoming_repairs: f64,
    pub recommended_pumps: u32,
    pub pump_purchase_schedule: Vec<PurchaseEvent>,
    pub total_repair_costs: f64,
    pub next_critical_repair_label: String,
    #[serde(rename = "next12HourRepairCost")]
    pub next_12_hour_repair_cost: f64,
    pub projection: DecayProjection,
}

impl ReinvestmentPlan {
    /// True when the schedule behind this plan was estimated rather than scraped.
    pub fn is_estimated(&self) -> bool {
        self.projection.estimated
    }
}

/// Repair costs keyed by the minute they fall due.
struct RepairCalendar(BTreeMap<u32, f64>);

impl RepairCalendar {
    fn from_projection(projection: &DecayProjection) -> Self {
        let mut costs = BTreeMap::new();
        for batch in &projection.decay_batches {
            *costs.entry(batch.minute_offset).or_insert(0.0) += batch.repair_cost;
        }
        RepairCalendar(costs)
    }

    fn due_at(&self, minute: u32) -> f64 {
        self.0.get(&minute).copied().unwrap_or(0.0)
    }

    /// Lowest balance reached over minutes `0..=window`, production accruing from minute 1.
    fn lowest_balance(&self, start: f64, per_minute: f64, window: u32) -> f64 {
        let mut balance = start;
        let mut lowest = start;
        for minute in 0..=window {
            if minute > 0 {
                balance += per_minute;
            }
            balance -= self.due_at(minute);
            lowest = lowest.min(balance);
        }
        lowest
    }

    fn stays_solvent(&self, start: f64, per_minute: f64, after_minute: u32, window: u32) -> bool {
        let mut balance = start;
        for minute in after_minute + 1..=after_minute + window {
            balance += per_minute - self.due_at(minute);
            if balance < 0.0 {
                return false;
            }
        }
        true
    }
}

pub struct ReinvestmentPlanner {
    now: DateTime<Utc>,
    options: PlannerOptions,
}

impl ReinvestmentPlanner {
    pub fn new(now: DateTime<Utc>, options: PlannerOptions) -> Self {
        ReinvestmentPlanner { now, options }
    }

    pub fn plan(&self, snapshot: Option<&DashboardSnapshot>, projection: DecayProjection) -> ReinvestmentPlan {
        let per_minute = snapshot.map(|s| s.minutely_production).unwrap_or(0.0);
        let available = projection.available_after_immediate_repairs;
        let calendar = RepairCalendar::from_projection(&projection);

        let lowest = calendar.lowest_balance(available, per_minute, SAFETY_WINDOW_MINUTES);
        let (recommended_pumps, reserved_for_upcoming_repairs) = if lowest >= 0.0 {
            let pumps = (lowest / PUMP_COST).floor() as u32;
            (pumps, available - pumps as f64 * PUMP_COST)
        } else {
            let reserve = lowest.abs().min(available);
            (((available - reserve) / PUMP_COST).floor() as u32, reserve)
        };
        debug!(
            "Lowest 12h balance {:.2}; recommending {} pumps, reserving {:.2}",
            lowest, recommended_pumps, reserved_for_upcoming_repairs
        );

        let pump_purchase_schedule = if self.options.include_purchase_schedule {
            self.purchase_schedule(&calendar, reserved_for_upcoming_repairs, per_minute)
        } else {
            Vec::new()
        };
        info!(
            "Plan: {} pumps now, {} scheduled over the next day",
            recommended_pumps,
            pump_purchase_schedule.len()
        );

        ReinvestmentPlan {
            immediate_repair_cost: projection.immediate_repair_cost,
            available_after_immediate_repairs: available,
            max_immediate_pumps: (available / PUMP_COST).floor() as u32,
            reserved_for_upcoming_repairs,
            recommended_pumps,
            pump_purchase_schedule,
            total_repair_costs: projection.total_repair_costs,
            next_critical_repair_label: projection.next_critical_repair_label.clone(),
            next_12_hour_repair_cost: projection.next_12_hour_repair_cost,
            projection,
        }
    }

    /// Greedy: at most one pump a minute, bought only if the next hour stays solvent.
    fn purchase_schedule(&self, calendar: &RepairCalendar, start: f64, per_minute: f64) -> Vec<PurchaseEvent> {
        let mut schedule = Vec::new();
        let mut balance = start - calendar.due_at(0);

        for minute in 1..=SCHEDULE_HORIZON_MINUTES {
            balance += per_minute - calendar.due_at(minute);
            if balance < PUMP_COST {
                continue;
            }

            let after = balance - PUMP_COST;
            if !calendar.stays_solvent(after, per_minute, minute, PURCHASE_LOOKAHEAD_MINUTES) {
                continue;
            }

            schedule.push(PurchaseEvent {
                pump_number: schedule.len() as u32 + 1,
                minute_offset: minute,
                balance_before: balance,
                balance_after: after,
                occurs_at: self.now + Duration::minutes(minute as i64),
            });
            balance = after;

            if schedule.len() >= MAX_SCHEDULED_PURCHASES {
                break;
            }
        }

        schedule
    }
}
