//! Handlers behind the transition table's actions.
//!
//! Each handler works on the turn's working copy of the session and returns
//! the internal event to raise next, if any.

use super::apply::{apply_selection, Applied};
use super::event::DialogueEvent;
use super::intent::{rank_options, remainder, resolve, resolve_pair, Ranked, Resolution};
use super::machine::{DialogueStateMachine, Turn};
use super::operation::{focus_display_item, offered_operations, ControlIntent, Operation};
use super::table::Action;
use crate::collaborators::ValueOptions;
use crate::error::{DialogueError, Result};
use crate::merge::{keep_best_label_matches, restrict_to_cube, seed_base_levels};
use crate::session::{Session, ValueSelection};
use olap_dialogue_types::{
    renumber, ContextFocus, DisplayItem, DisplayPayload, ElementId, QueryShape, SimpleSituation,
};
use std::collections::BTreeSet;

/// Session key of the last query result.
pub const LAST_QUERY_RESULT: &str = "lastQueryResult";

const OPERATION_CONTROLS: [ControlIntent; 5] = [
    ControlIntent::ExecuteQuery,
    ControlIntent::ReviseQuery,
    ControlIntent::MoreInformation,
    ControlIntent::Abort,
    ControlIntent::Exit,
];

fn user_text(event: &DialogueEvent) -> Option<&str> {
    match event {
        DialogueEvent::UserInput(text) => Some(text),
        DialogueEvent::Start(text) => text.as_deref(),
        _ => None,
    }
}

fn missing(session: &Session, what: &str) -> DialogueError {
    DialogueError::StateMachineExecution {
        state: session.current_state.to_string(),
        message: format!("no {} available", what),
    }
}

/// Event for a recognised control intent. "More information" keeps what
/// else was said as free text for the parser.
fn control_event(
    session: &mut Session,
    control: ControlIntent,
    input: &str,
    ranked: &Ranked,
) -> DialogueEvent {
    if control == ControlIntent::MoreInformation {
        session.pending_user_input =
            Some(remainder(input, &ranked.matched).unwrap_or_else(|| input.to_string()));
    }
    DialogueEvent::from(control)
}

impl DialogueStateMachine {
    pub(super) async fn run_action(
        &self,
        action: Action,
        session: &mut Session,
        turn: &mut Turn,
        event: &DialogueEvent,
    ) -> Result<Option<DialogueEvent>> {
        match action {
            Action::ParseFreeText => self.parse_free_text(session, event).await,
            Action::DisplayCubes => self.display_cubes(session, turn).await,
            Action::DisplayOperations => {
                self.display_operations(session, turn);
                Ok(None)
            }
            Action::SelectOperation => {
                let DialogueEvent::Navigate(operation) = event else {
                    return Err(missing(session, "operation"));
                };
                session.last_operation = Some(*operation);
                session.pending_remainder = None;
                self.display_values(session, turn).await
            }
            Action::ResolveOperationIntent => self.resolve_operation_intent(session, turn, event),
            Action::DetermineOperation => self.determine_operation(session, turn, event),
            Action::DisplayValues => self.display_values(session, turn).await,
            Action::ResolveValueIntent => self.resolve_value_intent(session, turn, event),
            Action::DetermineValue => self.determine_value(session).await,
            Action::ExecuteQuery => self.execute_query(session, turn).await,
            Action::SwitchFocus => self.switch_focus(session, event).await,
            Action::ExitApplication => {
                tracing::info!(session_id = %session.id, "Dialogue finished");
                turn.show(DisplayPayload::exit());
                Ok(None)
            }
            Action::Reprompt => {
                let display = turn
                    .checkpoint_display
                    .clone()
                    .ok_or_else(|| missing(session, "display to repeat"))?;
                turn.show(display.into_reprompt());
                Ok(None)
            }
            Action::Nothing => Ok(None),
        }
    }

    // ------------------------------------------------------------------------
    // Free text
    // ------------------------------------------------------------------------

    /// Annotate, look up, filter, solve and merge. Always ends `Determined`;
    /// text that yields nothing simply leaves the situation as it was.
    async fn parse_free_text(
        &self,
        session: &mut Session,
        event: &DialogueEvent,
    ) -> Result<Option<DialogueEvent>> {
        let text = user_text(event)
            .map(str::to_string)
            .or_else(|| session.pending_user_input.take());
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Ok(Some(DialogueEvent::Determined));
        };
        let language = session.language;
        let services = &self.services;

        let word_groups = services
            .annotator
            .annotate(language, &text)
            .await
            .map_err(|e| DialogueError::collaborator("annotator", e))?;
        let candidates = services
            .schema
            .schema_candidates(language, &word_groups)
            .await
            .map_err(|e| DialogueError::collaborator("schema lookup", e))?;
        let candidates = restrict_to_cube(candidates, session.analysis_situation.cube());

        let elements: Vec<ElementId> = candidates
            .iter()
            .map(|c| c.element.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let candidates = match services.schema.labels(language, &elements).await {
            Ok(labels) => keep_best_label_matches(candidates, &labels),
            Err(err) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %err,
                    "Label lookup failed, solving unfiltered candidates"
                );
                candidates
            }
        };

        tracing::debug!(
            session_id = %session.id,
            word_groups = word_groups.len(),
            candidates = candidates.len(),
            "Solving free text"
        );
        let solution = self.solver.solve_for_shape(session.shape, &candidates);
        if solution.budget_exhausted {
            tracing::warn!(
                session_id = %session.id,
                candidates = candidates.len(),
                "Solver budget exhausted, using best solution found so far"
            );
        }
        if !solution.is_unset() {
            let report = self
                .merger
                .merge(
                    &mut session.analysis_situation,
                    &solution.to_situation(),
                    language,
                )
                .await?;
            if report.cube_selected {
                tracing::info!(
                    session_id = %session.id,
                    cube = solution.cube.as_deref().unwrap_or_default(),
                    "Cube selected from free text"
                );
            }
        }
        Ok(Some(DialogueEvent::Determined))
    }

    // ------------------------------------------------------------------------
    // Displays
    // ------------------------------------------------------------------------

    async fn display_cubes(
        &self,
        session: &mut Session,
        turn: &mut Turn,
    ) -> Result<Option<DialogueEvent>> {
        let cubes = self
            .services
            .catalog
            .cubes(session.language)
            .await
            .map_err(|e| DialogueError::collaborator("schema catalog", e))?;
        session.last_operation = Some(Operation::SelectCube);
        turn.show(DisplayPayload::list(Operation::SelectCube.name(), cubes));
        Ok(None)
    }

    fn display_operations(&self, session: &mut Session, turn: &mut Turn) {
        let language = session.language;
        let focus = session.focus;
        let view = session.analysis_situation.view(focus);
        let mut items: Vec<DisplayItem> = offered_operations(&view)
            .into_iter()
            .filter(|op| op.edits_in(focus))
            .map(|op| op.display_item(language))
            .collect();
        if session.shape == QueryShape::Comparative {
            items.extend(
                ContextFocus::ALL
                    .into_iter()
                    .filter(|other| *other != focus)
                    .map(|other| focus_display_item(other, language)),
            );
        }
        if session.analysis_situation.is_cube_defined_in(focus) {
            items.push(ControlIntent::ExecuteQuery.display_item(language, 0));
        }
        items.push(ControlIntent::Exit.display_item(language, 0));
        renumber(&mut items);

        session.last_operation = None;
        turn.show(DisplayPayload::list("selectOperation", items));
    }

    /// Show the values of the current operation. Nothing to choose from
    /// aborts back to the operations; a remainder from the operation
    /// utterance is tried as the answer right away.
    async fn display_values(
        &self,
        session: &mut Session,
        turn: &mut Turn,
    ) -> Result<Option<DialogueEvent>> {
        let operation = session
            .last_operation
            .ok_or_else(|| missing(session, "operation"))?;
        let view = session.analysis_situation.view(session.focus);
        let options = self
            .services
            .catalog
            .value_options(session.language, &view, operation)
            .await
            .map_err(|e| DialogueError::collaborator("schema catalog", e))?;

        if options.is_empty() {
            tracing::info!(
                session_id = %session.id,
                operation = %operation,
                "No values to choose from"
            );
            session.pending_remainder = None;
            return Ok(Some(DialogueEvent::Abort));
        }

        turn.show(match options {
            ValueOptions::List(items) => DisplayPayload::list(operation.name(), items),
            ValueOptions::TwoList { left, right } => {
                DisplayPayload::two_list(operation.name(), left, right)
            }
        });
        Ok(session.pending_remainder.take().map(DialogueEvent::UserInput))
    }

    // ------------------------------------------------------------------------
    // Intent resolution
    // ------------------------------------------------------------------------

    fn rank(
        &self,
        session: &Session,
        input: &str,
        items: &[DisplayItem],
        controls: &[ControlIntent],
    ) -> Vec<Ranked> {
        rank_options(
            input,
            items,
            controls,
            session.language,
            self.services.matcher.as_ref(),
            self.config.intent.min_confidence,
        )
    }

    /// Controls win right away; anything else that matches an operation is
    /// handed on as input for `DetermineOperation`.
    fn resolve_operation_intent(
        &self,
        session: &mut Session,
        turn: &Turn,
        event: &DialogueEvent,
    ) -> Result<Option<DialogueEvent>> {
        let input = user_text(event).ok_or_else(|| missing(session, "user input"))?;
        let items = turn
            .checkpoint_display
            .as_ref()
            .map(|d| d.items().to_vec())
            .unwrap_or_default();

        let ranked = self.rank(session, input, &items, &OPERATION_CONTROLS);
        Ok(Some(match resolve(&ranked) {
            Resolution::Control(control, top) => control_event(session, control, input, &top),
            Resolution::Item(top) => match top
                .id
                .strip_prefix("switch.")
                .and_then(ContextFocus::from_name)
            {
                Some(focus) => DialogueEvent::SwitchFocus(focus),
                None => DialogueEvent::UserInput(input.to_string()),
            },
            Resolution::NoMatch => DialogueEvent::InvalidInput,
        }))
    }

    fn determine_operation(
        &self,
        session: &mut Session,
        turn: &Turn,
        event: &DialogueEvent,
    ) -> Result<Option<DialogueEvent>> {
        let input = user_text(event).ok_or_else(|| missing(session, "user input"))?;
        let operations: Vec<DisplayItem> = turn
            .checkpoint_display
            .as_ref()
            .map(|d| d.items())
            .unwrap_or_default()
            .iter()
            .filter(|item| item.id.starts_with("navigate."))
            .cloned()
            .collect();

        let ranked = self.rank(session, input, &operations, &[]);
        let Resolution::Item(top) = resolve(&ranked) else {
            return Ok(Some(DialogueEvent::InvalidInput));
        };
        let view = session.analysis_situation.view(session.focus);
        let operation = top
            .id
            .strip_prefix("navigate.")
            .and_then(Operation::from_name)
            .filter(|op| op.edits_in(session.focus) && op.is_applicable(&view));
        let Some(operation) = operation else {
            return Ok(Some(DialogueEvent::InvalidInput));
        };

        tracing::debug!(
            session_id = %session.id,
            operation = %operation,
            confidence = top.confidence,
            "Operation determined"
        );
        session.last_operation = Some(operation);
        session.pending_remainder = remainder(input, &top.matched);
        Ok(Some(DialogueEvent::Determined))
    }

    fn resolve_value_intent(
        &self,
        session: &mut Session,
        turn: &Turn,
        event: &DialogueEvent,
    ) -> Result<Option<DialogueEvent>> {
        let input = user_text(event).ok_or_else(|| missing(session, "user input"))?;
        let display = turn
            .checkpoint_display
            .as_ref()
            .ok_or_else(|| missing(session, "value display"))?;

        let mut controls = vec![
            ControlIntent::Abort,
            ControlIntent::MoreInformation,
            ControlIntent::Exit,
        ];
        if session.analysis_situation.is_cube_defined_in(session.focus) {
            controls.push(ControlIntent::ExecuteQuery);
        }

        if let DisplayPayload::TwoList { left, right, .. } = display {
            let ranked = self.rank(session, input, &[], &controls);
            if let Resolution::Control(control, top) = resolve(&ranked) {
                return Ok(Some(control_event(session, control, input, &top)));
            }
            return Ok(Some(
                match resolve_pair(
                    input,
                    left,
                    right,
                    session.language,
                    self.services.matcher.as_ref(),
                    self.config.intent.min_confidence,
                ) {
                    Some((current, replacement)) => {
                        session.pending_selection = Some(ValueSelection::Pair {
                            current,
                            replacement,
                        });
                        DialogueEvent::Determined
                    }
                    None => DialogueEvent::InvalidInput,
                },
            ));
        }

        let items = display.items();
        let ranked = self.rank(session, input, items, &controls);
        Ok(Some(match resolve(&ranked) {
            Resolution::Control(control, top) => control_event(session, control, input, &top),
            Resolution::Item(top) => match items.iter().find(|i| i.id == top.id) {
                Some(item) => {
                    session.pending_selection = Some(ValueSelection::Single { item: item.clone() });
                    DialogueEvent::Determined
                }
                None => DialogueEvent::InvalidInput,
            },
            Resolution::NoMatch => DialogueEvent::InvalidInput,
        }))
    }

    async fn determine_value(&self, session: &mut Session) -> Result<Option<DialogueEvent>> {
        let operation = session
            .last_operation
            .ok_or_else(|| missing(session, "operation"))?;
        let selection = session
            .pending_selection
            .take()
            .ok_or_else(|| missing(session, "value selection"))?;

        let focus = session.focus;
        let current_cube = session.analysis_situation.view(focus).cube;
        let base_levels = match (&selection, operation) {
            (ValueSelection::Single { item }, Operation::SelectCube)
                if operation.edits_in(focus)
                    && current_cube.as_deref() != Some(item.id.as_str()) =>
            {
                self.services
                    .catalog
                    .base_levels(session.language, &item.id)
                    .await
                    .map_err(|e| DialogueError::collaborator("schema catalog", e))?
            }
            _ => Vec::new(),
        };

        let applied = apply_selection(
            &mut session.analysis_situation,
            focus,
            operation,
            &selection,
            &base_levels,
        );
        tracing::debug!(
            session_id = %session.id,
            operation = %operation,
            applied = ?applied,
            "Value applied"
        );
        if applied == Applied::Rejected {
            return Ok(Some(DialogueEvent::InvalidInput));
        }
        session.last_operation = None;
        Ok(Some(DialogueEvent::Determined))
    }

    /// Move the edits to another part of a comparative situation. A context
    /// of comparison without a cube starts out on the cube of interest.
    async fn switch_focus(
        &self,
        session: &mut Session,
        event: &DialogueEvent,
    ) -> Result<Option<DialogueEvent>> {
        let DialogueEvent::SwitchFocus(focus) = event else {
            return Err(missing(session, "focus"));
        };
        let focus = *focus;
        let needs_cube = focus == ContextFocus::Comparison
            && !session.analysis_situation.is_cube_defined_in(focus);
        let interest_cube = session.analysis_situation.cube().map(str::to_string);
        if needs_cube {
            if let Some(cube) = interest_cube {
                let base_levels = self
                    .services
                    .catalog
                    .base_levels(session.language, &cube)
                    .await
                    .map_err(|e| DialogueError::collaborator("schema catalog", e))?;
                let mut context = SimpleSituation::with_cube(cube);
                seed_base_levels(&mut context, &base_levels);
                session.analysis_situation.store(focus, context);
            }
        }

        tracing::info!(
            session_id = %session.id,
            from = session.focus.name(),
            to = focus.name(),
            "Focus switched"
        );
        session.focus = focus;
        session.last_operation = None;
        Ok(Some(DialogueEvent::Determined))
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    async fn execute_query(
        &self,
        session: &mut Session,
        turn: &mut Turn,
    ) -> Result<Option<DialogueEvent>> {
        let result = self
            .services
            .executor
            .execute(session.language, &session.analysis_situation)
            .await
            .map_err(|e| DialogueError::collaborator("query executor", e))?;

        let stored = serde_json::to_value(&result).map_err(|e| {
            DialogueError::StateMachineExecution {
                state: session.current_state.to_string(),
                message: e.to_string(),
            }
        })?;
        session
            .additional_data
            .insert(LAST_QUERY_RESULT.to_string(), stored);

        tracing::info!(
            session_id = %session.id,
            rows = result.rows.len(),
            "Query executed"
        );
        let items = vec![
            ControlIntent::ReviseQuery.display_item(session.language, 1),
            ControlIntent::Exit.display_item(session.language, 2),
        ];
        turn.show(DisplayPayload::QueryResult {
            message_key: "queryResult".to_string(),
            result,
            items,
        });
        Ok(Some(DialogueEvent::Determined))
    }
}
