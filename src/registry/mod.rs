//! SessionRegistry - owns every live dialogue session.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SessionRegistry                                             │
//! │  sessions: RwLock<HashMap<id, SessionHandle>>                │
//! │  changes:  broadcast::Sender<AnalysisSituationChanged>       │
//! └──────────────────────────────────────────────────────────────┘
//!          │ mpsc (bounded, ordered)         ▲ watch snapshot
//!          ▼                                 │
//!   ┌─────────────┐  ┌─────────────┐  ┌─────────────┐
//!   │ worker s1   │  │ worker s2   │  │ worker s3   │   one task per session
//!   └─────────────┘  └─────────────┘  └─────────────┘
//! ```
//!
//! The map lock is only held to insert, look up or remove a handle; events
//! are never processed under it. Events for one session run strictly in
//! arrival order, different sessions run in parallel.

mod worker;

pub use worker::SessionSnapshot;

use crate::collaborators::DialogueServices;
use crate::config::{DialogueConfig, RegistryConfig};
use crate::dialogue::{DialogueEvent, DialogueStateMachine};
use crate::error::{DialogueError, Result};
use crate::session::Session;
use olap_dialogue_types::{AnalysisSituationChanged, DisplayPayload, Language, QueryShape};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use worker::{Reply, Request, Worker};

/// Receiver yielding a session's snapshot after every committed turn.
pub type SessionWatcher = watch::Receiver<SessionSnapshot>;

struct SessionHandle {
    /// Distinguishes a re-created session from an older one with the same id.
    generation: u64,
    requests: mpsc::Sender<Request>,
    /// Shared with the worker, which publishes committed turns on it.
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Count queued work as activity without waking watchers, so a turn
    /// that is still running is not reaped.
    fn touch(&self) {
        self.snapshot.send_if_modified(|snapshot| {
            snapshot.last_active = Instant::now();
            false
        });
    }

    fn idle_for(&self) -> Duration {
        self.snapshot.borrow().last_active.elapsed()
    }
}

/// Thread-safe registry of dialogue sessions.
///
/// Construct one per process and share it behind an `Arc`; call
/// [`SessionRegistry::shutdown`] before dropping it.
pub struct SessionRegistry {
    machine: Arc<DialogueStateMachine>,
    config: RegistryConfig,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    changes: broadcast::Sender<AnalysisSituationChanged>,
    shutdown: watch::Sender<bool>,
    generations: AtomicU64,
}

impl SessionRegistry {
    pub fn new(config: DialogueConfig, services: DialogueServices) -> Result<Self> {
        let registry = config.registry.clone();
        let machine = DialogueStateMachine::new(config, services)?;
        let (changes, _) = broadcast::channel(registry.notification_capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            machine: Arc::new(machine),
            config: registry,
            sessions: RwLock::new(HashMap::new()),
            changes,
            shutdown,
            generations: AtomicU64::new(0),
        })
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Register a session and start its worker.
    ///
    /// Fails for a blank id, an unsupported locale, or an id that is already
    /// registered. Concurrent creates of one id: exactly one wins.
    pub async fn create(&self, id: &str, locale: &str, shape: QueryShape) -> Result<Session> {
        if id.trim().is_empty() {
            return Err(DialogueError::InvalidArgument("session id must not be blank".into()));
        }
        let language: Language = locale
            .parse()
            .map_err(|e: olap_dialogue_types::UnsupportedLocale| {
                DialogueError::InvalidArgument(e.to_string())
            })?;
        let session = Session::new(id, locale, language).with_shape(shape);

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return Err(DialogueError::DuplicateSession {
                session_id: id.to_string(),
            });
        }

        let (requests, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let (snapshot, _) = watch::channel(SessionSnapshot::initial(session.clone()));
        let snapshot = Arc::new(snapshot);
        let worker = Worker {
            session: session.clone(),
            machine: self.machine.clone(),
            requests: receiver,
            snapshot: snapshot.clone(),
            changes: self.changes.clone(),
        };
        let task = tokio::spawn(worker.run());

        sessions.insert(
            id.to_string(),
            SessionHandle {
                generation: self.generations.fetch_add(1, Ordering::Relaxed),
                requests,
                snapshot,
                task,
            },
        );
        tracing::info!(session_id = %id, locale = %locale, shape = ?shape, "Session created");
        Ok(session)
    }

    /// [`create`](Self::create) with a generated id.
    pub async fn create_generated(&self, locale: &str, shape: QueryShape) -> Result<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        self.create(&id, locale, shape).await
    }

    /// Remove a session. Events already queued still run, then the worker
    /// ends. Returns whether the session existed.
    pub async fn destroy(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Session destroyed");
        }
        removed.is_some()
    }

    async fn remove_generation(&self, id: &str, generation: u64) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(id).is_some_and(|h| h.generation == generation) {
            sessions.remove(id);
            tracing::info!(session_id = %id, "Finished session removed");
        }
    }

    /// Remove sessions idle longer than the configured timeout.
    pub async fn sweep_expired(&self) -> Vec<String> {
        let timeout = self.config.idle_timeout();
        let expired: Vec<(String, u64)> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, h)| h.idle_for() > timeout)
            .map(|(id, h)| (id.clone(), h.generation))
            .collect();

        let mut removed = Vec::new();
        for (id, generation) in expired {
            let mut sessions = self.sessions.write().await;
            let still_idle = sessions
                .get(&id)
                .is_some_and(|h| h.generation == generation && h.idle_for() > timeout);
            if still_idle {
                sessions.remove(&id);
                removed.push(id);
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "Expired sessions removed");
        }
        removed
    }

    /// Periodically sweep expired sessions until [`shutdown`](Self::shutdown).
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(registry.config.reaper_interval());
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        registry.sweep_expired().await;
                    }
                    _ = stop.changed() => break,
                }
            }
            tracing::debug!("Session reaper stopped");
        })
    }

    /// Stop the reaper, close every session and wait for the workers.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let handles: Vec<SessionHandle> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, h)| h)
            .collect();
        let count = handles.len();
        for handle in handles {
            drop(handle.requests);
            if let Err(e) = handle.task.await {
                tracing::warn!(error = %e, "Session worker ended abnormally");
            }
        }
        tracing::info!(sessions = count, "Session registry shut down");
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Start the dialogue, optionally with a first sentence.
    pub async fn start_dialogue(
        &self,
        id: &str,
        initial_sentence: Option<String>,
    ) -> Result<DisplayPayload> {
        self.dispatch(id, DialogueEvent::Start(initial_sentence)).await
    }

    /// Queue an event for a session and wait for its display.
    ///
    /// Waits while the session's queue is full. Unknown, destroyed and
    /// finished sessions fail with `SessionExpired`; dialogue errors come
    /// back as error displays.
    pub async fn dispatch(&self, id: &str, event: DialogueEvent) -> Result<DisplayPayload> {
        let expired = || DialogueError::SessionExpired {
            session_id: id.to_string(),
        };

        let (requests, generation) = {
            let sessions = self.sessions.read().await;
            let handle = sessions.get(id).ok_or_else(expired)?;
            handle.touch();
            (handle.requests.clone(), handle.generation)
        };

        let (reply, response) = oneshot::channel();
        requests
            .send(Request { event, reply })
            .await
            .map_err(|_| expired())?;
        let Reply { display, finished } = response.await.map_err(|_| expired())?;

        if finished {
            self.remove_generation(id, generation).await;
        }
        Ok(display)
    }

    /// [`dispatch`](Self::dispatch) by wire name, e.g. `navigate.rollUp`.
    pub async fn dispatch_named(
        &self,
        id: &str,
        name: &str,
        payload: Option<&str>,
    ) -> Result<DisplayPayload> {
        let event = DialogueEvent::parse(name, payload)?;
        self.dispatch(id, event).await
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Last committed state of a session.
    pub async fn get(&self, id: &str) -> Result<Session> {
        let sessions = self.sessions.read().await;
        let handle = sessions.get(id).ok_or_else(|| DialogueError::SessionExpired {
            session_id: id.to_string(),
        })?;
        let session = handle.snapshot.borrow().session.clone();
        Ok(session)
    }

    pub async fn subscribe(&self, id: &str) -> Result<SessionWatcher> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|h| h.snapshot.subscribe())
            .ok_or_else(|| DialogueError::SessionExpired {
                session_id: id.to_string(),
            })
    }

    /// Every analysis situation change of every session.
    pub fn situation_changes(&self) -> broadcast::Receiver<AnalysisSituationChanged> {
        self.changes.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
