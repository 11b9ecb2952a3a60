use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::controller::SessionController;
use super::error::SessionError;
use super::event::{EventSender, Intent, SessionEvent};
use super::snapshot::SessionSnapshot;

/// Runs a `SessionController` on a single task
///
/// Intents from the UI, engine callbacks and poller firings all arrive on
/// one channel and are handled strictly one at a time.
pub struct SessionRuntime;

impl SessionRuntime {
    /// Spawn the event loop
    ///
    /// `inbox` must be the receiving half of the channel whose sender was
    /// given to the controller.
    pub fn spawn(
        controller: SessionController,
        inbox: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> SessionHandle {
        let events = controller.events();
        let task = tokio::spawn(run(controller, inbox));

        SessionHandle {
            events,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

async fn run(mut controller: SessionController, mut inbox: mpsc::UnboundedReceiver<SessionEvent>) {
    info!("Session runtime started: {}", controller.session_id());

    while let Some(event) = inbox.recv().await {
        if !controller.handle(event).await {
            break;
        }
    }

    controller.shutdown().await;
    info!("Session runtime stopped: {}", controller.session_id());
}

/// Cloneable front end of a running session
#[derive(Clone)]
pub struct SessionHandle {
    events: EventSender,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    /// Send an intent and wait for its result
    pub async fn intent(&self, intent: Intent) -> Result<(), SessionError> {
        let (reply, result) = oneshot::channel();
        if !self.events.send(SessionEvent::Intent {
            intent,
            reply: Some(reply),
        }) {
            return Err(SessionError::Closed);
        }
        result.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn record(&self) -> Result<(), SessionError> {
        self.intent(Intent::Record).await
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.intent(Intent::Stop).await
    }

    pub async fn play(&self) -> Result<(), SessionError> {
        self.intent(Intent::Play).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.intent(Intent::Pause).await
    }

    pub async fn delete(&self) -> Result<(), SessionError> {
        self.intent(Intent::Delete).await
    }

    /// User dragged the seek bar to `percent`
    pub async fn seek(&self, percent: i32) -> Result<(), SessionError> {
        self.intent(Intent::Seek {
            percent,
            user_originated: true,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, snapshot) = oneshot::channel();
        if !self.events.send(SessionEvent::Snapshot(reply)) {
            return Err(SessionError::Closed);
        }
        snapshot.await.map_err(|_| SessionError::Closed)
    }

    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Stop the event loop and wait for it to finish
    pub async fn shutdown(&self) {
        self.events.send(SessionEvent::Shutdown);

        let mut task = self.task.lock().await;
        if let Some(task) = task.take() {
            if let Err(e) = task.await {
                error!("Session runtime panicked: {}", e);
            }
        }
    }
}
