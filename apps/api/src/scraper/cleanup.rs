//! Browser teardown.
//!
//! Every launched session is wrapped in a `SessionGuard`. The workflow
//! releases it with a delay picked from the run's outcome; a guard that is
//! dropped without being released (panic, cancelled request) closes the
//! browser immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::scraper::browser::BrowserSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    AfterSuccess,
    /// Keep the window up so the operator can finish a login or challenge.
    AwaitManualIntervention,
    AfterFailure,
}

#[derive(Debug, Clone)]
pub struct CleanupDelays {
    pub success_grace: Duration,
    pub failure_grace: Duration,
    pub manual_hold: Duration,
}

impl Default for CleanupDelays {
    fn default() -> Self {
        Self {
            success_grace: Duration::from_secs(5),
            failure_grace: Duration::from_secs(5),
            manual_hold: Duration::from_secs(15 * 60),
        }
    }
}

impl CleanupPolicy {
    pub fn delay(self, delays: &CleanupDelays) -> Duration {
        match self {
            CleanupPolicy::AfterSuccess => delays.success_grace,
            CleanupPolicy::AwaitManualIntervention => delays.manual_hold,
            CleanupPolicy::AfterFailure => delays.failure_grace,
        }
    }
}

pub struct SessionGuard {
    session: Arc<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Arc::from(session),
            released: false,
        }
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    /// Schedules the close on a background task and returns its handle.
    /// The caller does not wait for it.
    pub fn release(mut self, delay: Duration) -> JoinHandle<()> {
        self.released = true;
        tokio::spawn(close_after(Arc::clone(&self.session), delay))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("Browser session dropped without cleanup, closing now");
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close_after(Arc::clone(&self.session), Duration::ZERO));
            }
            Err(_) => warn!("No runtime available to close the browser session"),
        }
    }
}

async fn close_after(session: Arc<dyn BrowserSession>, delay: Duration) {
    if !delay.is_zero() {
        info!("Closing browser in {}s", delay.as_secs());
        tokio::time::sleep(delay).await;
    }
    match session.close().await {
        Ok(()) => info!("Browser cleanup completed"),
        Err(e) => warn!("Browser cleanup failed: {e}"),
    }
}
