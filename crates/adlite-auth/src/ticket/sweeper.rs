//! Periodic eviction of expired ticket state

use metrics::counter;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use super::authority::TicketAuthority;
use super::types::CleanupReport;

/// Background task running [`TicketAuthority::cleanup`] on a fixed interval.
///
/// Nothing runs until [`start`](Self::start) is called; dropping the worker
/// stops the task.
pub struct CleanupWorker {
    authority: Arc<dyn TicketAuthority>,
    period: Duration,
    shutdown: Arc<RwLock<bool>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CleanupWorker {
    pub fn new(authority: Arc<dyn TicketAuthority>, period: Duration) -> Self {
        Self {
            authority,
            period,
            shutdown: Arc::new(RwLock::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// Calling `start` on a running worker does nothing.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        info!(
            "Starting ticket cleanup every {}s for realm {}",
            self.period.as_secs(),
            self.authority.realm()
        );
        *self.shutdown.write() = false;

        let authority = Arc::clone(&self.authority);
        let shutdown = Arc::clone(&self.shutdown);
        let period = self.period;

        *handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if *shutdown.read() {
                    break;
                }

                record(&authority.cleanup());
            }

            debug!("Ticket cleanup loop stopped");
        }));
    }

    pub fn stop(&self) {
        info!("Stopping ticket cleanup");
        *self.shutdown.write() = true;
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    /// Run one sweep right away
    pub fn sweep_now(&self) -> CleanupReport {
        let report = self.authority.cleanup();
        record(&report);
        report
    }
}

impl Drop for CleanupWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

fn record(report: &CleanupReport) {
    if report.is_empty() {
        debug!("Ticket cleanup found nothing to evict");
        return;
    }

    counter!("adlite_ticket_evictions_total", "kind" => "pre_auth")
        .increment(report.pre_auth as u64);
    counter!("adlite_ticket_evictions_total", "kind" => "tgt")
        .increment(report.tickets as u64);
    counter!("adlite_ticket_evictions_total", "kind" => "session_key")
        .increment(report.session_keys as u64);
    counter!("adlite_ticket_evictions_total", "kind" => "delegation")
        .increment(report.delegations as u64);

    info!(
        pre_auth = report.pre_auth,
        tickets = report.tickets,
        session_keys = report.session_keys,
        delegations = report.delegations,
        "Evicted expired ticket state"
    );
}
