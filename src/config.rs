// src/config.rs
use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::reinvestment::PlannerOptions;

#[derive(Debug, Clone)]
pub struct HelperConfig {
    pub port: u16,
    pub store_dir: String,
    pub game_url: String,
    pub max_retries: u32,
    pub element_timeout: Duration,
    pub page_watchdog: Duration,
    pub poll_interval: Duration,
    pub plot_settle: Duration,
    pub table_settle: Duration,
    pub finalize_settle: Duration,
    pub reward_timeout: Duration,
    pub claim_timeout: Duration,
    pub claim_poll: Duration,
    pub after_claim_settle: Duration,
    pub return_settle: Duration,
    pub claim_summary_settle: Duration,
    pub planner: PlannerOptions,
}

impl Default for HelperConfig {
    fn default() -> Self {
        HelperConfig {
            port: 3030,
            store_dir: ".store".to_string(),
            game_url: "https://petroleum.land".to_string(),
            max_retries: 10,
            element_timeout: Duration::from_millis(15_000),
            page_watchdog: Duration::from_millis(20_000),
            poll_interval: Duration::from_millis(500),
            plot_settle: Duration::from_secs(3),
            table_settle: Duration::from_secs(4),
            finalize_settle: Duration::from_secs(3),
            reward_timeout: Duration::from_secs(20),
            claim_timeout: Duration::from_secs(120),
            claim_poll: Duration::from_secs(1),
            after_claim_settle: Duration::from_secs(2),
            return_settle: Duration::from_secs(3),
            claim_summary_settle: Duration::from_secs(5),
            planner: PlannerOptions::default(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} is not valid ({:?}), using the default", name, raw);
            default
        }),
        Err(_) => {
            warn!("{} not set, using the default", name);
            default
        }
    }
}

impl HelperConfig {
    /// Reads `.env` and the process environment over the defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = HelperConfig::default();

        let port = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or_else(|| {
            warn!("$PORT not set, defaulting to {}", defaults.port);
            defaults.port
        });

        HelperConfig {
            port,
            store_dir: env_or("HELPER_STORE_DIR", defaults.store_dir.clone()),
            game_url: env_or::<String>("HELPER_GAME_URL", defaults.game_url.clone())
                .trim_end_matches('/')
                .to_string(),
            max_retries: env_or("HELPER_MAX_RETRIES", defaults.max_retries),
            element_timeout: Duration::from_millis(env_or("HELPER_ELEMENT_TIMEOUT_MS", 15_000)),
            page_watchdog: Duration::from_millis(env_or("HELPER_WATCHDOG_MS", 20_000)),
            poll_interval: Duration::from_millis(env_or("HELPER_POLL_MS", 500)),
            planner: PlannerOptions {
                include_purchase_schedule: env_or("HELPER_PURCHASE_SCHEDULE", true),
            },
            ..defaults
        }
    }

    pub fn plot_url(&self, plot_id: &str) -> String {
        format!("{}/dashboard/plot/{}", self.game_url, plot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_plot_urls() {
        let config = HelperConfig::default();
        assert_eq!(config.plot_url("42"), "https://petroleum.land/dashboard/plot/42");
    }

    #[test]
    fn unset_or_garbled_values_fall_back() {
        assert_eq!(env_or("HELPER_CONFIG_TEST_UNSET", 7u32), 7);

        env::set_var("HELPER_CONFIG_TEST_GARBLED", "ten");
        assert_eq!(env_or("HELPER_CONFIG_TEST_GARBLED", 10u32), 10);
        env::set_var("HELPER_CONFIG_TEST_GARBLED", " 12 ");
        assert_eq!(env_or("HELPER_CONFIG_TEST_GARBLED", 10u32), 12);
    }
}
