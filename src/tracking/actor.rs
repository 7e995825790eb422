use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::error::TrackingError;
use crate::tracking::session::TrackingSession;
use crate::types::run::{Notice, SessionSnapshot, Transition};

const COMMAND_BUFFER: usize = 32;

enum Command {
    Start(oneshot::Sender<Result<Transition, TrackingError>>),
    Stop(oneshot::Sender<Transition>),
    Toggle(oneshot::Sender<Result<Transition, TrackingError>>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Cloneable front door to a session owned by its own task.
///
/// Commands and provider events are handled one at a time on that task, so a
/// sample handler always runs to completion before the next Start/Stop.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    notices: broadcast::Sender<Notice>,
}

/// Moves the session onto a tokio task. The task ends, and the session's
/// subscription is released, once every handle is dropped.
pub fn spawn_session(session: TrackingSession) -> SessionHandle {
    let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (snapshot_tx, snapshots) = watch::channel(session.snapshot());
    let notices = session.notice_sender();

    tokio::spawn(run(session, command_rx, snapshot_tx));

    SessionHandle {
        commands,
        snapshots,
        notices,
    }
}

async fn run(
    mut session: TrackingSession,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
) {
    loop {
        tokio::select! {
            // events queued before a command are applied before it
            biased;

            event = session.next_event() => session.handle_event(event),
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Start(reply) => {
                        let _ = reply.send(session.start());
                    }
                    Command::Stop(reply) => {
                        let _ = reply.send(session.stop());
                    }
                    Command::Toggle(reply) => {
                        let result = if session.is_running() {
                            Ok(session.stop())
                        } else {
                            session.start()
                        };
                        let _ = reply.send(result);
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(session.snapshot());
                        continue;
                    }
                }
            }
        }
        snapshots.send_replace(session.snapshot());
    }

    tracing::debug!("Session task exiting");
}

impl SessionHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, TrackingError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| TrackingError::SessionClosed)?;
        response.await.map_err(|_| TrackingError::SessionClosed)
    }

    pub async fn start(&self) -> Result<Transition, TrackingError> {
        self.request(Command::Start).await?
    }

    pub async fn stop(&self) -> Result<Transition, TrackingError> {
        self.request(Command::Stop).await
    }

    /// Stops a running session or starts an idle one.
    pub async fn toggle(&self) -> Result<Transition, TrackingError> {
        self.request(Command::Toggle).await?
    }

    /// Snapshot taken after every already-delivered provider event has been applied.
    pub async fn current(&self) -> Result<SessionSnapshot, TrackingError> {
        self.request(Command::Snapshot).await
    }

    /// Last published snapshot, without waiting on the session task.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }
}
