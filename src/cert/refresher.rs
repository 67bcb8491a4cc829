//! Background platform-certificate refresher.
//!
//! A single task owns the timer. `Enable`/`Disable` arrive as commands over a
//! channel; each tick fetches `/v3/certificates`, decrypts the payload, and
//! swaps the full certificate set into the configuration store. Refresh
//! failures are logged and absorbed so transient outages self-heal on the
//! next tick.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::ClientCore;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefresherState {
    Idle,
    Scheduled,
    Refreshing,
    Stopped,
}

pub(crate) enum RefresherCmd {
    Enable(Duration),
    Disable,
}

pub(crate) struct CertRefresher {
    cmd_tx: mpsc::UnboundedSender<RefresherCmd>,
    state: Arc<RwLock<RefresherState>>,
}

impl CertRefresher {
    /// Spawn the refresher task. It starts `Idle` and does nothing until
    /// enabled. The task exits when the owning client drops this handle.
    pub(crate) fn spawn(core: Arc<ClientCore>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(RefresherState::Idle));
        tokio::spawn(run(core, cmd_rx, Arc::clone(&state)));
        Self { cmd_tx, state }
    }

    /// Cancel any pending tick and schedule the next one after `interval`.
    pub(crate) fn enable(&self, interval: Duration) {
        let _ = self.cmd_tx.send(RefresherCmd::Enable(interval));
    }

    pub(crate) fn disable(&self) {
        let _ = self.cmd_tx.send(RefresherCmd::Disable);
    }

    pub(crate) fn state(&self) -> RefresherState {
        *self.state.read().unwrap()
    }
}

async fn run(
    core: Arc<ClientCore>,
    mut cmd_rx: mpsc::UnboundedReceiver<RefresherCmd>,
    state: Arc<RwLock<RefresherState>>,
) {
    let set_state = |s: RefresherState| *state.write().unwrap() = s;

    let mut interval = DEFAULT_REFRESH_INTERVAL;
    let mut deadline: Option<Instant> = None;

    loop {
        let cmd = match deadline {
            Some(at) => tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => Some(cmd),
                    None => return,
                },
                _ = tokio::time::sleep_until(at) => None,
            },
            None => match cmd_rx.recv().await {
                Some(cmd) => Some(cmd),
                None => return,
            },
        };

        match cmd {
            Some(RefresherCmd::Enable(new_interval)) => {
                interval = new_interval;
                deadline = Some(Instant::now() + interval);
                set_state(RefresherState::Scheduled);
            }
            Some(RefresherCmd::Disable) => {
                deadline = None;
                set_state(RefresherState::Stopped);
            }
            None => {
                // Timer fired. Refresh, then reschedule regardless of outcome.
                set_state(RefresherState::Refreshing);
                match core.refresh_certificates().await {
                    Ok(count) => debug!(count, "platform certificates refreshed"),
                    Err(err) => warn!(error = %err, "certificate refresh failed"),
                }
                deadline = Some(Instant::now() + interval);
                set_state(RefresherState::Scheduled);
            }
        }
    }
}
