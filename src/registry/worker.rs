//! Per-session worker task.
//!
//! The worker owns the [`Session`] outright. Events arrive in order on a
//! bounded queue and are handled one at a time, so no lock is ever held
//! around a session.

use crate::dialogue::{DialogueEvent, DialogueStateMachine};
use crate::session::Session;
use olap_dialogue_types::{AnalysisSituationChanged, DisplayPayload};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;

/// Latest committed state of a session, published after every turn.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Incremented on each committed turn.
    pub version: u64,
    pub session: Session,
    /// Last time an event was queued for or handled by the session.
    pub last_active: Instant,
}

impl SessionSnapshot {
    pub(crate) fn initial(session: Session) -> Self {
        Self {
            version: 0,
            session,
            last_active: Instant::now(),
        }
    }
}

pub(crate) struct Request {
    pub event: DialogueEvent,
    pub reply: oneshot::Sender<Reply>,
}

#[derive(Debug)]
pub(crate) struct Reply {
    pub display: DisplayPayload,
    /// The dialogue reached its final state; the worker has stopped.
    pub finished: bool,
}

pub(crate) struct Worker {
    pub session: Session,
    pub machine: Arc<DialogueStateMachine>,
    pub requests: mpsc::Receiver<Request>,
    pub snapshot: Arc<watch::Sender<SessionSnapshot>>,
    pub changes: broadcast::Sender<AnalysisSituationChanged>,
}

impl Worker {
    pub async fn run(mut self) {
        let mut version = 0u64;
        tracing::debug!(session_id = %self.session.id, "Session worker started");

        while let Some(Request { event, reply }) = self.requests.recv().await {
            let outcome = self.machine.handle(&mut self.session, event).await;
            let last_active = Instant::now();

            if outcome.error.is_none() {
                version += 1;
                if outcome.situation_changed {
                    // No subscribers is fine.
                    let _ = self.changes.send(AnalysisSituationChanged {
                        session_id: self.session.id.clone(),
                        analysis_situation: self.session.analysis_situation.clone(),
                        language: self.session.language,
                    });
                }
            }
            self.snapshot.send_replace(SessionSnapshot {
                version,
                session: self.session.clone(),
                last_active,
            });

            let finished = self.session.is_finished();
            if reply
                .send(Reply {
                    display: outcome.display,
                    finished,
                })
                .is_err()
            {
                tracing::debug!(session_id = %self.session.id, "Caller went away before reply");
            }
            if finished {
                break;
            }
        }

        tracing::debug!(session_id = %self.session.id, "Session worker stopped");
    }
}
