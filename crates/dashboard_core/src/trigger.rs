use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, time::Instant};
use tracing::trace;

use crate::{
    error::TransportError,
    pager::{CursorPager, FetchOutcome},
    resources::Resource,
};

pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_millis(500);

/// Turns "end of list is visible" signals into `fetch_next` calls, at most one
/// per interval. The signal source (scroll observer, key press) is up to the
/// caller.
pub struct NextPageTrigger<R: Resource> {
    pager: Arc<CursorPager<R>>,
    interval: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl<R: Resource> NextPageTrigger<R> {
    pub fn new(pager: Arc<CursorPager<R>>, interval: Duration) -> Self {
        Self {
            pager,
            interval,
            last_fired: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn signal(&self) -> Result<FetchOutcome, TransportError> {
        {
            let mut last_fired = self.last_fired.lock().await;
            let now = Instant::now();
            if let Some(previous) = *last_fired {
                if now.duration_since(previous) < self.interval {
                    trace!(resource = R::PATH, "next page signal throttled");
                    return Ok(FetchOutcome::Throttled);
                }
            }
            *last_fired = Some(now);
        }
        self.pager.fetch_next().await
    }
}

#[cfg(test)]
#[path = "tests/trigger_tests.rs"]
mod tests;
