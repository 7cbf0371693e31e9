//! The runtime event loop.
//! This module exists to drive the navigation state machine from manual commands, the
//! cycle timer and the periodic refresh, keeping blocking work on the blocking pool.
//! It does not plan or classify; every cycle is delegated to `Pipeline`.

use std::sync::Arc;
use std::time::Duration;

use fogchart_core::{CycleReport, Jitter, JitterRange, NavAction, NavState, NavigationMachine};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

use crate::control_input::ControlCommand;
use crate::now_unix_ms;
use crate::pipeline::Pipeline;
use crate::scheduler::CycleTimer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    pub refresh_every: Duration,
    pub jitter: JitterRange,
    pub seed: u64,
}

/// Latest state for whoever displays it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub text: String,
    pub enabled: bool,
    pub state: NavState,
    pub navigations: u64,
    pub refreshes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CycleKind {
    Navigate,
    Refresh,
}

struct CycleDone {
    kind: CycleKind,
    /// `None` when the blocking task panicked.
    report: Option<CycleReport>,
}

pub struct Controller {
    pipeline: Arc<Pipeline>,
    machine: NavigationMachine,
    timer: CycleTimer,
    fired_rx: UnboundedReceiver<u64>,
    done_tx: UnboundedSender<CycleDone>,
    done_rx: UnboundedReceiver<CycleDone>,
    refresh_every: Duration,
    refresh_in_flight: bool,
    status: watch::Sender<StatusSnapshot>,
}

impl Controller {
    pub fn new(pipeline: Arc<Pipeline>, settings: ControllerSettings) -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(StatusSnapshot::default());
        Self {
            pipeline,
            machine: NavigationMachine::new(Jitter::new(settings.seed, settings.jitter)),
            timer: CycleTimer::new(fired_tx),
            fired_rx,
            done_tx,
            done_rx,
            refresh_every: settings.refresh_every,
            refresh_in_flight: false,
            status,
        }
    }

    pub fn status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    /// Runs until `Quit`, or until the command channel closes while auto-navigation is off.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ControlCommand>) {
        let mut refresh = interval_at(Instant::now() + self.refresh_every, self.refresh_every);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut listening = true;

        loop {
            tokio::select! {
                command = commands.recv(), if listening => match command {
                    Some(ControlCommand::Quit) => break,
                    Some(command) => self.handle(command),
                    None if self.machine.is_enabled() => {
                        info!("control input closed, auto-navigation keeps running");
                        listening = false;
                    }
                    None => break,
                },
                Some(generation) = self.fired_rx.recv() => {
                    let action = self.machine.timer_fired(generation);
                    self.apply(action);
                }
                Some(done) = self.done_rx.recv() => self.finish(done),
                _ = refresh.tick() => self.spawn_cycle(CycleKind::Refresh),
            }
        }

        self.timer.cancel();
        info!("controller stopped");
    }

    fn handle(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::ToggleAuto => {
                let action = self.machine.toggle();
                self.apply(action);
            }
            ControlCommand::Refresh => self.spawn_cycle(CycleKind::Refresh),
            ControlCommand::Calibrate { click, display } => {
                if self.pipeline.calibrate(click, display).is_some() {
                    self.spawn_cycle(CycleKind::Refresh);
                }
            }
            ControlCommand::Status => {
                let status = self.status.borrow();
                info!(
                    enabled = status.enabled,
                    state = ?status.state,
                    navigations = status.navigations,
                    refreshes = status.refreshes,
                    "{}",
                    status.text
                );
            }
            ControlCommand::Quit => {}
        }
        self.publish(None);
    }

    fn apply(&mut self, action: NavAction) {
        match action {
            NavAction::RunCycle => self.spawn_cycle(CycleKind::Navigate),
            NavAction::ArmTimer { generation, delay } => self.timer.arm(generation, delay),
            NavAction::CancelTimer => self.timer.cancel(),
            NavAction::Nothing => {}
        }
        self.publish(None);
    }

    fn spawn_cycle(&mut self, kind: CycleKind) {
        if kind == CycleKind::Refresh {
            // Ticks that land while one is running are dropped, not queued.
            if self.refresh_in_flight {
                return;
            }
            self.refresh_in_flight = true;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let joined = task::spawn_blocking(move || match kind {
                CycleKind::Navigate => pipeline.navigate(now_unix_ms()),
                CycleKind::Refresh => pipeline.refresh(now_unix_ms()),
            })
            .await;
            let report = match joined {
                Ok(report) => Some(report),
                Err(err) => {
                    warn!(error = %err, ?kind, "cycle task failed");
                    None
                }
            };
            // The receiver only goes away on shutdown.
            let _ = done.send(CycleDone { kind, report });
        });
    }

    fn finish(&mut self, done: CycleDone) {
        let text = done.report.as_ref().map(|report| report.observation.status_text());
        match done.kind {
            CycleKind::Refresh => {
                self.refresh_in_flight = false;
                self.status.send_modify(|status| status.refreshes += 1);
            }
            CycleKind::Navigate => {
                self.status.send_modify(|status| status.navigations += 1);
                let action = self.machine.cycle_finished();
                self.apply(action);
            }
        }
        self.publish(text);
    }

    fn publish(&self, text: Option<String>) {
        let (enabled, state) = (self.machine.is_enabled(), self.machine.state());
        self.status.send_modify(|status| {
            status.enabled = enabled;
            status.state = state;
            if let Some(text) = text {
                status.text = text;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use fogchart_core::PixelPos;
    use tokio::time::{sleep, timeout};

    const SETTINGS: ControllerSettings = ControllerSettings {
        refresh_every: Duration::from_secs(10),
        jitter: JitterRange { min_secs: 10, max_secs: 18 },
        seed: 7,
    };

    async fn wait_for(
        status: &mut watch::Receiver<StatusSnapshot>,
        what: impl FnMut(&StatusSnapshot) -> bool,
    ) -> StatusSnapshot {
        timeout(Duration::from_secs(300), status.wait_for(what))
            .await
            .expect("status reached in time")
            .expect("controller alive")
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn toggling_off_while_waiting_suppresses_the_next_cycle() {
        let (pipeline, clicks) = fixture_pipeline();
        let controller = Controller::new(Arc::new(pipeline), SETTINGS);
        let mut status = controller.status();
        let (tx, rx) = mpsc::channel(4);
        let running = tokio::spawn(controller.run(rx));

        tx.send(ControlCommand::ToggleAuto).await.expect("send");
        let waiting = wait_for(&mut status, |s| {
            s.navigations == 1 && matches!(s.state, NavState::Waiting { .. })
        })
        .await;
        assert!(waiting.enabled);
        assert_eq!(waiting.text, "Reachable fog: 2");
        assert_eq!(clicks.taken(), vec![center(50, 0)]);

        tx.send(ControlCommand::ToggleAuto).await.expect("send");
        wait_for(&mut status, |s| !s.enabled && s.state == NavState::Idle).await;
        sleep(Duration::from_secs(60)).await;
        assert_eq!(clicks.taken().len(), 1);
        assert_eq!(status.borrow().navigations, 1);

        tx.send(ControlCommand::Quit).await.expect("send");
        running.await.expect("controller finished");
    }

    #[tokio::test(start_paused = true)]
    async fn auto_navigation_keeps_cycling_after_the_jitter_delay() {
        let (pipeline, clicks) = fixture_pipeline();
        let controller = Controller::new(Arc::new(pipeline), SETTINGS);
        let mut status = controller.status();
        let (tx, rx) = mpsc::channel(4);
        let running = tokio::spawn(controller.run(rx));

        tx.send(ControlCommand::ToggleAuto).await.expect("send");
        wait_for(&mut status, |s| s.navigations >= 2).await;
        assert_eq!(clicks.taken().len(), 2);

        tx.send(ControlCommand::Quit).await.expect("send");
        running.await.expect("controller finished");
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_never_clicks() {
        let (pipeline, clicks) = fixture_pipeline();
        let pipeline = Arc::new(pipeline);
        let controller = Controller::new(Arc::clone(&pipeline), SETTINGS);
        let mut status = controller.status();
        let (tx, rx) = mpsc::channel(4);
        let running = tokio::spawn(controller.run(rx));

        let refreshed = wait_for(&mut status, |s| s.refreshes >= 2).await;
        assert_eq!(refreshed.navigations, 0);
        assert_eq!(refreshed.state, NavState::Idle);
        assert!(clicks.taken().is_empty());
        assert!(pipeline.world().visited.is_empty());

        tx.send(ControlCommand::Quit).await.expect("send");
        running.await.expect("controller finished");
    }

    #[tokio::test(start_paused = true)]
    async fn calibrate_moves_the_grid_and_refreshes() {
        let (pipeline, _clicks) = fixture_pipeline();
        let pipeline = Arc::new(pipeline);
        let controller = Controller::new(Arc::clone(&pipeline), SETTINGS);
        let mut status = controller.status();
        let (tx, rx) = mpsc::channel(4);
        let running = tokio::spawn(controller.run(rx));

        tx.send(ControlCommand::Refresh).await.expect("send");
        wait_for(&mut status, |s| s.refreshes == 1).await;
        let click = PixelPos::new(5, 5);
        tx.send(ControlCommand::Calibrate { click, display: (151, 46) }).await.expect("send");
        wait_for(&mut status, |s| s.refreshes >= 2).await;
        assert_eq!(pipeline.world().geometry().offset_x, 5);

        tx.send(ControlCommand::Quit).await.expect("send");
        running.await.expect("controller finished");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_input_stops_an_idle_controller() {
        let (pipeline, _clicks) = fixture_pipeline();
        let controller = Controller::new(Arc::new(pipeline), SETTINGS);
        let (tx, rx) = mpsc::channel(4);
        drop(tx);
        timeout(Duration::from_secs(1), controller.run(rx)).await.expect("stops at once");
    }
}
