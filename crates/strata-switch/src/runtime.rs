use crate::config::SwitchConfig;
use crate::controller::{AutoSwitchController, ControllerSnapshot, SwitchEvent};
use crate::error::SwitchError;
use crate::executor::{CandidateDirectory, SwitchExecutor};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Capacity of the control channel. Signal producers block when full.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

enum ControlMessage {
    Event(SwitchEvent),
    Shutdown,
}

/// Cloneable handle for pushing events into the switch worker from any
/// thread (registration pollers, settings observers, the executor's
/// validation callback).
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<ControlMessage>,
}

impl EventSender {
    pub fn send(&self, event: SwitchEvent) -> anyhow::Result<()> {
        self.tx
            .send(ControlMessage::Event(event))
            .map_err(|_| anyhow::Error::from(SwitchError::Disconnected))
    }
}

/// Receiving side, consumed by [`AutoSwitchRuntime::spawn`].
pub struct EventInbox {
    rx: Receiver<ControlMessage>,
    tx: Sender<ControlMessage>,
}

/// Create the worker's channel before the runtime exists, so the executor
/// can be built holding an [`EventSender`] for its validation callbacks.
pub fn event_channel() -> (EventSender, EventInbox) {
    let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
    (EventSender { tx: tx.clone() }, EventInbox { rx, tx })
}

/// Thread-owning handle to one [`AutoSwitchController`].
///
/// All events, timer fires and validation results are processed on a
/// single worker thread in arrival order. Timers are realized as receive
/// deadlines on the control channel, so the worker sleeps only inside
/// `recv_timeout`.
///
/// Dropping the runtime triggers a graceful shutdown of the worker thread.
pub struct AutoSwitchRuntime {
    control_tx: Sender<ControlMessage>,
    snapshot: Arc<Mutex<ControllerSnapshot>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AutoSwitchRuntime {
    pub fn spawn<D, E>(
        config: SwitchConfig,
        directory: D,
        executor: E,
        inbox: EventInbox,
    ) -> anyhow::Result<Self>
    where
        D: CandidateDirectory + 'static,
        E: SwitchExecutor + 'static,
    {
        let controller = AutoSwitchController::new(config, directory, executor);
        Self::spawn_controller(controller, inbox)
    }

    /// Run an already constructed controller (custom clock, pre-seeded
    /// candidates) on the worker thread.
    pub fn spawn_controller<D, E>(
        controller: AutoSwitchController<D, E>,
        inbox: EventInbox,
    ) -> anyhow::Result<Self>
    where
        D: CandidateDirectory + 'static,
        E: SwitchExecutor + 'static,
    {
        let snapshot = Arc::new(Mutex::new(controller.snapshot()));
        let snapshot_clone = snapshot.clone();
        let EventInbox { rx, tx } = inbox;

        let handle = thread::Builder::new()
            .name("strata-switch".into())
            .spawn(move || switch_worker(controller, rx, snapshot_clone))
            .map_err(|e| anyhow::anyhow!("Failed to spawn switch worker: {}", e))?;

        Ok(Self {
            control_tx: tx,
            snapshot,
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.control_tx.clone(),
        }
    }

    pub fn send(&self, event: SwitchEvent) -> anyhow::Result<()> {
        self.sender().send(event)
    }

    /// Latest published controller state (thread-safe clone).
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stops the worker thread. Idempotent.
    pub fn shutdown(&mut self) {
        let _ = self.control_tx.send(ControlMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AutoSwitchRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn switch_worker<D, E>(
    mut controller: AutoSwitchController<D, E>,
    control_rx: Receiver<ControlMessage>,
    snapshot: Arc<Mutex<ControllerSnapshot>>,
) where
    D: CandidateDirectory,
    E: SwitchExecutor,
{
    tracing::debug!("switch worker started");
    loop {
        let msg = match controller.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(controller.now());
                match control_rx.recv_timeout(wait) {
                    Ok(msg) => Some(msg),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match control_rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        match msg {
            Some(ControlMessage::Event(event)) => controller.handle(event),
            Some(ControlMessage::Shutdown) => break,
            None => {}
        }
        controller.poll_timers();

        if let Ok(mut s) = snapshot.lock() {
            *s = controller.snapshot();
        }
    }
    tracing::debug!("switch worker stopped");
}
