//! Event dispatcher: one ordered queue and worker task per active chat.
//!
//! # Architecture
//!
//! ```text
//! ChatPlatform::next_events()
//!        |
//!        v
//! +------------------------------------------+
//! |  workers (DashMap<ChatId, Sender>)       |
//! |    +-- chat 1 --> mpsc --> worker task   |
//! |    +-- chat 2 --> mpsc --> worker task   |
//! +------------------------------------------+
//!        |
//!        v
//! CaptureFlow::handle(session, event)  -->  ChatPlatform::send()
//! ```
//!
//! Events of one chat are handled strictly in arrival order; different
//! chats run concurrently. A worker with nothing to do for `worker_idle`
//! removes itself; the next event for that chat starts a new one.
//!
//! # Thread Safety
//!
//! - A sender is only used while its map entry is locked, and a worker only
//!   removes its entry after checking (under the same lock) that its queue
//!   is empty, so no event is lost when a worker exits.
//! - `CancellationToken` stops polling, workers and the cleanup task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::conversation::{CaptureFlow, ChatId, Incoming, Outbox, Reply, SessionStore};
use crate::runtime::{ChatPlatform, PlatformError};

/// Delay before polling again after a platform error
const POLL_RETRY_SECS: u64 = 5;

/// How often idle sessions are swept
const CLEANUP_INTERVAL_SECS: u64 = 60;

/// Time allowed for in-flight events when stopping
const DRAIN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sessions without activity for this long are dropped
    pub session_ttl: Duration,
    /// Workers without events for this long exit
    pub worker_idle: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(crate::conversation::DEFAULT_SESSION_TTL_SECS),
            worker_idle: Duration::from_secs(300),
        }
    }
}

/// Delivers replies of one chat through the platform.
struct PlatformOutbox {
    platform: Arc<dyn ChatPlatform>,
    chat: ChatId,
}

#[async_trait]
impl Outbox for PlatformOutbox {
    async fn push(&self, reply: Reply) {
        if let Err(e) = self.platform.send(self.chat, &reply).await {
            tracing::warn!("Failed to deliver reply to chat {}: {}", self.chat, e);
        }
    }
}

/// State shared by the poll loop and the workers.
struct Shared {
    platform: Arc<dyn ChatPlatform>,
    flow: Arc<CaptureFlow>,
    sessions: Arc<SessionStore>,
    workers: DashMap<ChatId, mpsc::UnboundedSender<Incoming>>,
    shutdown: CancellationToken,
    worker_idle: Duration,
}

impl Shared {
    async fn handle(&self, chat: ChatId, event: Incoming) {
        let session = self.sessions.get_or_create(chat);
        let mut session = session.lock().await;

        let outbox = PlatformOutbox {
            platform: self.platform.clone(),
            chat,
        };
        self.flow
            .handle(&mut session, event, &outbox)
            .instrument(tracing::info_span!("chat", id = chat))
            .await;

        let finished = !session.is_active();
        drop(session);
        if finished {
            self.sessions.remove(chat);
        }
    }
}

enum WorkerStep {
    Event(Incoming),
    Stop,
}

async fn run_worker(shared: Arc<Shared>, chat: ChatId, mut rx: mpsc::UnboundedReceiver<Incoming>) {
    tracing::debug!("Worker for chat {} started", chat);

    loop {
        let step = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => WorkerStep::Event(event),
                None => WorkerStep::Stop,
            },
            _ = tokio::time::sleep(shared.worker_idle) => {
                let mut pending = None;
                shared.workers.remove_if(&chat, |_, _| match rx.try_recv() {
                    Ok(event) => {
                        pending = Some(event);
                        false
                    }
                    Err(_) => true,
                });
                match pending {
                    Some(event) => WorkerStep::Event(event),
                    None => WorkerStep::Stop,
                }
            }
            _ = shared.shutdown.cancelled() => WorkerStep::Stop,
        };

        match step {
            WorkerStep::Event(event) => shared.handle(chat, event).await,
            WorkerStep::Stop => break,
        }
    }

    tracing::debug!("Worker for chat {} stopped", chat);
}

pub struct Dispatcher {
    shared: Arc<Shared>,
    config: DispatcherConfig,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        flow: Arc<CaptureFlow>,
        config: DispatcherConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            platform,
            flow,
            sessions: Arc::new(SessionStore::new()),
            workers: DashMap::new(),
            shutdown: CancellationToken::new(),
            worker_idle: config.worker_idle,
        });
        Self {
            shared,
            config,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Cancelling this token stops [`Dispatcher::run`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.shared.sessions
    }

    /// Number of chats with a running worker.
    pub fn active_workers(&self) -> usize {
        self.shared.workers.len()
    }

    /// Queue an event behind earlier events of the same chat.
    pub fn dispatch(&self, chat: ChatId, event: Incoming) {
        match self.shared.workers.entry(chat) {
            Entry::Occupied(mut entry) => {
                if let Err(mpsc::error::SendError(event)) = entry.get().send(event) {
                    // Worker is gone without removing itself
                    entry.insert(self.spawn_worker(chat, event));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(self.spawn_worker(chat, event));
            }
        }
    }

    fn spawn_worker(&self, chat: ChatId, first: Incoming) -> mpsc::UnboundedSender<Incoming> {
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(first);

        let handle = tokio::spawn(run_worker(self.shared.clone(), chat, rx));
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        tx
    }

    fn spawn_cleanup(&self) -> JoinHandle<()> {
        let sessions = self.shared.sessions.clone();
        let shutdown = self.shared.shutdown.clone();
        let ttl = self.config.session_ttl;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let cleaned = sessions.cleanup_idle(ttl);
                        if cleaned > 0 {
                            tracing::info!("Cleaned up {} idle sessions", cleaned);
                        }
                    }
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Session cleanup task shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Poll the platform and dispatch events until the input closes or the
    /// shutdown token is cancelled.
    pub async fn run(&self) -> Result<(), PlatformError> {
        let platform = self.shared.platform.clone();
        let shutdown = self.shared.shutdown.clone();
        let cleanup = self.spawn_cleanup();

        tracing::info!("Listening for messages on {}", platform.name());

        loop {
            let batch = tokio::select! {
                batch = platform.next_events() => batch,
                _ = shutdown.cancelled() => break,
            };

            match batch {
                Ok(events) => {
                    for (chat, event) in events {
                        tracing::debug!("Received {} from chat {}", event.kind(), chat);
                        self.dispatch(chat, event);
                    }
                }
                Err(PlatformError::Closed) => {
                    tracing::info!("{} input closed", platform.name());
                    break;
                }
                Err(e) => {
                    tracing::warn!("Polling {} failed: {}", platform.name(), e);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(POLL_RETRY_SECS)) => {}
                        _ = shutdown.cancelled() => break,
                    }
                }
            }
        }

        self.drain().await;
        shutdown.cancel();
        let _ = cleanup.await;

        platform.shutdown().await
    }

    /// Let workers finish their queues, then stop them.
    async fn drain(&self) {
        // Dropping the senders ends each worker once its queue is empty
        self.shared.workers.clear();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());

        let wait_all = futures::future::join_all(handles);
        if tokio::time::timeout(Duration::from_secs(DRAIN_TIMEOUT_SECS), wait_all)
            .await
            .is_err()
        {
            tracing::warn!("Workers did not finish within {}s", DRAIN_TIMEOUT_SECS);
        }
    }
}
