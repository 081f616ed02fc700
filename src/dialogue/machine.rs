//! DialogueStateMachine - runs one turn of a session's dialogue.
//!
//! ```text
//!   external event
//!        │
//!        ▼
//!   ┌─────────────┐   lookup (state, event, guard)   ┌──────────────┐
//!   │ working copy│ ───────────────────────────────► │  transition  │
//!   │  of Session │ ◄─────────────────────────────── │ action + to  │
//!   └─────────────┘   internal event raised by action └──────────────┘
//!        │
//!        ▼  waiting state reached
//!   commit copy + display          (any error: drop copy, error display)
//! ```
//!
//! A turn is all-or-nothing. The caller's session is only replaced once the
//! whole chain of internal events has reached a waiting state.

use super::event::DialogueEvent;
use super::state::DialogueState;
use super::table::{self, Target};
use crate::collaborators::DialogueServices;
use crate::config::DialogueConfig;
use crate::error::{DialogueError, Result};
use crate::merge::SlotMerger;
use crate::session::Session;
use crate::solver::ConstraintSolver;
use olap_dialogue_types::DisplayPayload;
use tracing::Instrument;

/// Scratch state of one turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub display: Option<DisplayPayload>,
    /// Set when the last action produced a display.
    pub(super) shown: bool,
    /// Waiting state a `Resume` target returns to.
    pub checkpoint_state: DialogueState,
    /// Display the user is currently answering.
    pub checkpoint_display: Option<DisplayPayload>,
}

impl Turn {
    fn new(session: &Session) -> Self {
        Self {
            display: None,
            shown: false,
            checkpoint_state: session.current_state,
            checkpoint_display: session.last_display.clone(),
        }
    }

    pub(super) fn show(&mut self, display: DisplayPayload) {
        self.display = Some(display);
        self.shown = true;
    }
}

/// What a handled event produced.
#[derive(Debug)]
pub struct TurnOutcome {
    pub display: DisplayPayload,
    pub situation_changed: bool,
    /// Set when the turn failed and the session was left as it was.
    pub error: Option<DialogueError>,
}

/// Drives sessions through the transition table.
///
/// Stateless between turns; one machine can serve every session.
#[derive(Debug, Clone)]
pub struct DialogueStateMachine {
    pub(super) config: DialogueConfig,
    pub(super) services: DialogueServices,
    pub(super) solver: ConstraintSolver,
    pub(super) merger: SlotMerger,
}

impl DialogueStateMachine {
    /// Build a machine. Fails if the transition table is inconsistent.
    pub fn new(config: DialogueConfig, services: DialogueServices) -> Result<Self> {
        table::validate().map_err(DialogueError::StateMachineInstantiation)?;
        Ok(Self {
            solver: ConstraintSolver::new(config.solver.clone()),
            merger: SlotMerger::new(services.catalog.clone()),
            config,
            services,
        })
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    /// Handle one external event.
    ///
    /// Never fails: errors become an error display and leave `session`
    /// untouched.
    pub async fn handle(&self, session: &mut Session, event: DialogueEvent) -> TurnOutcome {
        let span = tracing::info_span!(
            "dialogue_turn",
            session_id = %session.id,
            state = %session.current_state,
            event = %event
        );

        let mut working = session.clone();
        match self.run_turn(&mut working, event).instrument(span).await {
            Ok(display) => {
                let situation_changed = working.analysis_situation != session.analysis_situation;
                working.last_display = Some(display.clone());
                working.clear_pending();
                working.touch();
                *session = working;
                TurnOutcome {
                    display,
                    situation_changed,
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %session.id,
                    state = %session.current_state,
                    error = %err,
                    "Dialogue turn failed, session unchanged"
                );
                TurnOutcome {
                    display: DisplayPayload::error(err.message_key(), Some(err.to_string())),
                    situation_changed: false,
                    error: Some(err),
                }
            }
        }
    }

    async fn run_turn(&self, session: &mut Session, event: DialogueEvent) -> Result<DisplayPayload> {
        let mut turn = Turn::new(session);
        let mut next = Some(event);
        let mut internal_steps = 0usize;

        while let Some(event) = next.take() {
            let from = session.current_state;
            let transition =
                table::lookup(from, &event, &session.analysis_situation, session.focus)
                    .ok_or_else(|| DialogueError::IllegalTransition {
                        state: from.to_string(),
                        event: event.name(),
                    })?;

            tracing::debug!(
                from = %from,
                event = %event,
                action = ?transition.action,
                "Transition"
            );

            next = self
                .run_action(transition.action, session, &mut turn, &event)
                .await?;

            session.current_state = match transition.to {
                Target::State(state) => state,
                Target::Resume => turn.checkpoint_state,
            };

            if session.current_state.is_waiting() && std::mem::take(&mut turn.shown) {
                turn.checkpoint_state = session.current_state;
                turn.checkpoint_display = turn.display.clone();
            }

            if next.is_some() {
                internal_steps += 1;
                if internal_steps > self.config.max_internal_steps {
                    return Err(DialogueError::StateMachineExecution {
                        state: session.current_state.to_string(),
                        message: format!(
                            "more than {} internal events in one turn",
                            self.config.max_internal_steps
                        ),
                    });
                }
            }
        }

        if !session.current_state.is_waiting() {
            return Err(DialogueError::StateMachineExecution {
                state: session.current_state.to_string(),
                message: "turn ended outside a waiting state".into(),
            });
        }

        turn.display.ok_or_else(|| DialogueError::StateMachineExecution {
            state: session.current_state.to_string(),
            message: "turn produced no display".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CubeDef, DimensionDef, InMemoryCubeSchema};
    use crate::dialogue::Operation;
    use olap_dialogue_types::Language;

    fn machine() -> DialogueStateMachine {
        let schema = InMemoryCubeSchema::new().cube(
            CubeDef::new("cube:sales", "Sales")
                .measure("m:revenue", "Revenue")
                .measure("m:quantity", "Quantity")
                .dimension(
                    DimensionDef::new("dim:time", "Time")
                        .level("l:year", "Year")
                        .level("l:month", "Month"),
                ),
        );
        DialogueStateMachine::new(DialogueConfig::default(), DialogueServices::in_memory(schema))
            .unwrap()
    }

    fn session() -> Session {
        Session::new("s1", "en", Language::En)
    }

    #[tokio::test]
    async fn test_start_without_sentence_shows_cubes() {
        let m = machine();
        let mut s = session();
        let outcome = m.handle(&mut s, DialogueEvent::Start(None)).await;
        assert!(outcome.error.is_none());
        assert_eq!(s.current_state, DialogueState::SelectCube);
        assert_eq!(outcome.display.message_key(), "selectCube");
        assert_eq!(outcome.display.items()[0].id, "cube:sales");
    }

    #[tokio::test]
    async fn test_start_with_sentence_fills_situation() {
        let m = machine();
        let mut s = session();
        let outcome = m
            .handle(&mut s, DialogueEvent::Start(Some("revenue by year".into())))
            .await;
        assert!(outcome.error.is_none(), "{:?}", outcome.error);
        assert!(outcome.situation_changed);
        assert_eq!(s.current_state, DialogueState::DisplayOperations);
        let focus = s.analysis_situation.focus();
        assert_eq!(focus.cube.as_deref(), Some("cube:sales"));
        assert!(focus.measures.contains("m:revenue"));
        assert_eq!(focus.dimension_qualification("dim:time").unwrap().granularity_level, "l:year");
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_session_unchanged() {
        let m = machine();
        let mut s = session();
        let before = s.clone();
        let outcome = m.handle(&mut s, DialogueEvent::ExecuteQuery).await;
        assert!(matches!(
            outcome.error,
            Some(DialogueError::IllegalTransition { .. })
        ));
        assert!(outcome.display.is_error());
        assert_eq!(s, before);
    }

    #[tokio::test]
    async fn test_unresolvable_input_reprompts() {
        let m = machine();
        let mut s = session();
        m.handle(&mut s, DialogueEvent::Start(None)).await;
        let outcome = m.handle(&mut s, DialogueEvent::UserInput("xyzzy".into())).await;
        assert!(outcome.error.is_none());
        assert_eq!(s.current_state, DialogueState::SelectCube);
        match outcome.display {
            DisplayPayload::List { reprompt, .. } => assert!(reprompt),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_navigate_before_cube_is_illegal() {
        let m = machine();
        let mut s = session();
        m.handle(&mut s, DialogueEvent::Start(None)).await;
        let outcome = m
            .handle(&mut s, DialogueEvent::Navigate(Operation::AddMeasure))
            .await;
        assert!(outcome.error.is_some());
        assert_eq!(s.current_state, DialogueState::SelectCube);
    }

    #[tokio::test]
    async fn test_internal_step_limit() {
        let config = DialogueConfig {
            max_internal_steps: 1,
            ..DialogueConfig::default()
        };
        let m = DialogueStateMachine::new(config, machine().services.clone()).unwrap();
        let mut s = session();
        m.handle(&mut s, DialogueEvent::Start(None)).await;
        // resolving and applying the cube raise two internal events
        let outcome = m.handle(&mut s, DialogueEvent::UserInput("1".into())).await;
        assert!(matches!(
            outcome.error,
            Some(DialogueError::StateMachineExecution { .. })
        ));
        assert_eq!(s.current_state, DialogueState::SelectCube);
    }
}
