//! Console polling scheduler
//!
//! Drives `XboxOnePlayer::update()` on a fixed interval and turns snapshot
//! changes into bus events. Each refresh is awaited before the next tick, so
//! the poller never overlaps refreshes. A refresh that runs past its tick
//! pushes the schedule back instead of firing the missed ticks in a burst.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bus::{BusEvent, SharedBus};
use crate::player::{snapshot_state, PlayerState, XboxOnePlayer};
use crate::smartglass::models::ConnectionState;
use crate::smartglass::version::MIN_REQUIRED_SERVER_VERSION;

/// Trait for background services that can be started/stopped uniformly.
#[async_trait]
pub trait Startable: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start the service. No-op if already running.
    async fn start(&self) -> Result<()>;

    /// Stop the service gracefully.
    async fn stop(&self);
}

/// What the previous tick observed, for change detection.
#[derive(Debug, Default)]
struct Observed {
    connection: Option<ConnectionState>,
    state: Option<PlayerState>,
    source: Option<Option<String>>,
    incompatible_reported: bool,
}

impl Observed {
    /// Compare the player's current snapshot with the last tick and collect
    /// the events to publish.
    fn diff(&mut self, player: &XboxOnePlayer) -> Vec<BusEvent> {
        let snapshot = player.client().snapshot();
        let device_id = player.unique_id().to_string();
        let mut events = Vec::new();

        if !snapshot.server_compatible && !self.incompatible_reported {
            self.incompatible_reported = true;
            events.push(BusEvent::ServerIncompatible {
                version: snapshot.server_version.clone().unwrap_or_default(),
                required: MIN_REQUIRED_SERVER_VERSION.to_string(),
            });
        }

        let connection = snapshot.connection_state();
        if self.connection != Some(connection) {
            self.connection = Some(connection);
            events.push(BusEvent::ConnectionChanged {
                device_id: device_id.clone(),
                state: connection,
            });
        }

        let state = snapshot_state(&snapshot);
        if self.state != Some(state) {
            self.state = Some(state);
            events.push(BusEvent::PlayerStateChanged {
                device_id: device_id.clone(),
                state,
            });
        }

        let source = snapshot.active_app().map(str::to_string);
        if self.source.as_ref() != Some(&source) {
            self.source = Some(source.clone());
            events.push(BusEvent::SourceChanged { device_id, source });
        }

        events
    }
}

/// Periodically refreshes one console.
#[derive(Clone)]
pub struct ConsolePoller {
    player: Arc<XboxOnePlayer>,
    bus: SharedBus,
    period: Duration,
    running: Arc<RwLock<bool>>,
    /// Replaced on every start; a cancelled token cannot be reused
    shutdown: Arc<RwLock<CancellationToken>>,
}

impl ConsolePoller {
    pub fn new(player: Arc<XboxOnePlayer>, bus: SharedBus, period: Duration) -> Self {
        Self {
            player,
            bus,
            period,
            running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(RwLock::new(CancellationToken::new())),
        }
    }

    pub fn player(&self) -> &Arc<XboxOnePlayer> {
        &self.player
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    async fn start_internal(&self) -> Result<()> {
        {
            let mut running = self.running.write().await;
            if *running {
                return Ok(());
            }
            *running = true;
        }

        let shutdown = {
            let mut token = self.shutdown.write().await;
            *token = CancellationToken::new();
            token.clone()
        };

        let player = self.player.clone();
        let bus = self.bus.clone();
        let period = self.period;
        let running = self.running.clone();
        tokio::spawn(async move {
            run_polling_loop(player, bus, period, shutdown).await;
            *running.write().await = false;
        });

        Ok(())
    }

    async fn stop_internal(&self) {
        self.shutdown.read().await.cancel();
    }
}

#[async_trait]
impl Startable for ConsolePoller {
    fn name(&self) -> &'static str {
        "xbox"
    }

    async fn start(&self) -> Result<()> {
        self.start_internal().await
    }

    async fn stop(&self) {
        self.stop_internal().await
    }
}

async fn run_polling_loop(
    player: Arc<XboxOnePlayer>,
    bus: SharedBus,
    period: Duration,
    shutdown: CancellationToken,
) {
    let device_id = player.unique_id().to_string();
    let mut poll_timer = interval(period);
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut observed = Observed::default();

    info!("Polling console {} every {:?}", device_id, period);
    bus.publish(BusEvent::PollerStarted {
        device_id: device_id.clone(),
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Console polling shutting down");
                break;
            }
            _ = poll_timer.tick() => {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Console polling cancelled mid-refresh");
                        break;
                    }
                    _ = player.update() => {}
                }

                for event in observed.diff(&player) {
                    debug!(?event, "Console change");
                    bus.publish(event);
                }
            }
        }
    }

    bus.publish(BusEvent::PollerStopped { device_id });
    info!("Console polling stopped");
}
