// src/services/wait.rs
//! Bounded polling. There is no cancellation here: a wait that must be abandoned
//! is abandoned by reloading the page, which discards the whole task.
use log::debug;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::HelperError;
use crate::host::{PageElement, PageSource};

/// Polls `predicate` every `interval` until it holds or `timeout` has passed.
pub async fn poll_until<F>(mut predicate: F, interval: Duration, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(interval).await;
    }
}

pub async fn wait_for_element(
    page: &dyn PageSource,
    element: PageElement,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HelperError> {
    if poll_until(|| page.is_present(element), interval, timeout).await {
        Ok(())
    } else {
        debug!("{:?} did not appear within {:?}", element, timeout);
        Err(HelperError::PageNotReady { element, waited_ms: timeout.as_millis() as u64 })
    }
}

/// Gives the remote page time to finish rendering.
pub async fn settle(delay: Duration) {
    sleep(delay).await;
}
