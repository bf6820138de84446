use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use super::api::QaApi;
use super::render::clock_time;
use crate::models::HealthStatus;

pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Grey,
    Red,
    Green,
}

/// What the widget shows for the latest health check
#[derive(Debug, Clone, PartialEq)]
pub struct HealthState {
    pub loading: bool,
    pub status: Option<HealthStatus>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum HealthEvent {
    CheckStarted,
    CheckSucceeded(HealthStatus),
    CheckFailed(String),
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            loading: true,
            status: None,
            error: None,
        }
    }
}

impl HealthState {
    pub fn apply(&mut self, event: HealthEvent) {
        debug!("Health widget event: {:?}", event);
        match event {
            HealthEvent::CheckStarted => self.loading = true,
            HealthEvent::CheckSucceeded(status) => {
                self.loading = false;
                self.status = Some(status);
                self.error = None;
            }
            HealthEvent::CheckFailed(error) => {
                self.loading = false;
                self.status = None;
                self.error = Some(error);
            }
        }
    }

    pub fn indicator(&self) -> Indicator {
        if self.loading {
            return Indicator::Grey;
        }
        match (&self.error, &self.status) {
            (None, Some(status)) if status.is_healthy() => Indicator::Green,
            _ => Indicator::Red,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.indicator() {
            Indicator::Grey => "Checking...",
            Indicator::Red => "Backend Error",
            Indicator::Green => "Backend Healthy",
        }
    }

    /// Per-service rows: name and whether it reports "active"
    pub fn services(&self) -> Vec<(&str, bool)> {
        self.status
            .iter()
            .flat_map(|status| status.services.iter())
            .map(|(name, state)| (name.as_str(), state == "active"))
            .collect()
    }

    pub fn checked_at(&self) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|status| clock_time(&status.timestamp))
    }
}

/// Background poller behind the status indicator.
///
/// Checks once when mounted and then every `period`. The polling task is
/// aborted when the widget is dropped, and it stops by itself once nobody is
/// watching its state any more.
pub struct HealthWidget {
    state: watch::Receiver<HealthState>,
    task: JoinHandle<()>,
}

impl HealthWidget {
    pub fn mount<A>(api: A, period: Duration) -> Self
    where
        A: QaApi + 'static,
    {
        let (tx, rx) = watch::channel(HealthState::default());
        let task = tokio::spawn(poll(api, period, tx));
        Self { state: rx, task }
    }

    pub fn state(&self) -> HealthState {
        self.state.borrow().clone()
    }

    /// Wait for the next published state. `None` once polling has ended.
    pub async fn changed(&mut self) -> Option<HealthState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait until a check has finished, whatever its outcome.
    pub async fn settled(&mut self) -> Option<HealthState> {
        loop {
            let state = self.state.borrow_and_update().clone();
            if !state.loading {
                return Some(state);
            }
            self.state.changed().await.ok()?;
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.state.clone()
    }
}

impl Drop for HealthWidget {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll<A: QaApi>(api: A, period: Duration, tx: watch::Sender<HealthState>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !publish(&tx, HealthEvent::CheckStarted) {
            break;
        }

        let event = match api.health().await {
            Ok(status) => HealthEvent::CheckSucceeded(status),
            Err(e) => HealthEvent::CheckFailed(e.to_string()),
        };
        if !publish(&tx, event) {
            break;
        }
    }

    debug!("Health polling stopped");
}

fn publish(tx: &watch::Sender<HealthState>, event: HealthEvent) -> bool {
    if tx.is_closed() {
        return false;
    }
    tx.send_modify(|state| state.apply(event));
    true
}
