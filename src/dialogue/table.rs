//! Transition table of the dialogue state machine.
//!
//! Rows are matched top to bottom; the first row for `(state, event)` whose
//! guard holds is taken. The row's action runs, the machine moves to the
//! row's target, and an event raised by the action is looked up from there.

use super::event::{DialogueEvent, EventKind};
use super::state::DialogueState;
use olap_dialogue_types::{AnalysisSituation, ContextFocus, QueryShape};

/// Handlers available to transitions, dispatched by `run_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Annotate, look up, filter, solve and merge free text.
    ParseFreeText,
    DisplayCubes,
    DisplayOperations,
    /// Remember a navigated operation and show its values.
    SelectOperation,
    ResolveOperationIntent,
    DetermineOperation,
    DisplayValues,
    ResolveValueIntent,
    DetermineValue,
    ExecuteQuery,
    /// Change the edited part of a comparative situation.
    SwitchFocus,
    ExitApplication,
    /// Show the last waiting state's display again.
    Reprompt,
    Nothing,
}

/// Condition on a transition.
///
/// Cube checks look at the part of the situation in focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    CubeDefined,
    /// `Start` carries a non-blank sentence.
    HasSentence,
    /// The navigated operation may be used in the current situation.
    OperationAllowed,
    /// The situation has a context of comparison.
    Comparative,
}

impl Guard {
    pub fn holds(
        &self,
        situation: &AnalysisSituation,
        focus: ContextFocus,
        event: &DialogueEvent,
    ) -> bool {
        match self {
            Guard::CubeDefined => situation.is_cube_defined_in(focus),
            Guard::HasSentence => {
                matches!(event, DialogueEvent::Start(Some(text)) if !text.trim().is_empty())
            }
            Guard::OperationAllowed => match event {
                DialogueEvent::Navigate(op) => {
                    op.edits_in(focus)
                        && (!op.requires_cube() || situation.is_cube_defined_in(focus))
                }
                _ => false,
            },
            Guard::Comparative => situation.shape() == QueryShape::Comparative,
        }
    }
}

/// Where a transition lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    State(DialogueState),
    /// Back to the waiting state the turn last showed a display in.
    Resume,
}

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: DialogueState,
    pub on: EventKind,
    pub guard: Option<Guard>,
    pub action: Action,
    pub to: Target,
}

const fn row(
    from: DialogueState,
    on: EventKind,
    guard: Option<Guard>,
    action: Action,
    to: Target,
) -> Transition {
    Transition {
        from,
        on,
        guard,
        action,
        to,
    }
}

use Action as A;
use DialogueState as S;
use EventKind as E;
use Target::{Resume, State as To};

const CUBE: Option<Guard> = Some(Guard::CubeDefined);
const ALLOWED: Option<Guard> = Some(Guard::OperationAllowed);
const COMPARATIVE: Option<Guard> = Some(Guard::Comparative);

/// The dialogue protocol.
#[rustfmt::skip]
pub static TRANSITIONS: &[Transition] = &[
    // start
    row(S::Idle, E::Start, Some(Guard::HasSentence), A::ParseFreeText, To(S::ParseFreeText)),
    row(S::Idle, E::Start, None, A::DisplayCubes, To(S::SelectCube)),
    // free text
    row(S::ParseFreeText, E::Determined, CUBE, A::DisplayOperations, To(S::DisplayOperations)),
    row(S::ParseFreeText, E::Determined, None, A::DisplayCubes, To(S::SelectCube)),
    // cube selection
    row(S::SelectCube, E::UserInput, None, A::ResolveValueIntent, To(S::DetermineValueInputIntent)),
    row(S::SelectCube, E::Navigate, ALLOWED, A::SelectOperation, To(S::DisplayValues)),
    row(S::SelectCube, E::MoreInformation, None, A::ParseFreeText, To(S::ParseFreeText)),
    row(S::SelectCube, E::ExecuteQuery, None, A::Reprompt, Resume),
    row(S::SelectCube, E::SwitchFocus, COMPARATIVE, A::SwitchFocus, To(S::SwitchFocus)),
    row(S::SelectCube, E::SwitchFocus, None, A::Reprompt, Resume),
    row(S::SelectCube, E::Exit, None, A::ExitApplication, To(S::Finished)),
    // operations
    row(S::DisplayOperations, E::UserInput, None, A::ResolveOperationIntent, To(S::DetermineOperationInputIntent)),
    row(S::DisplayOperations, E::Navigate, ALLOWED, A::SelectOperation, To(S::DisplayValues)),
    row(S::DisplayOperations, E::ExecuteQuery, CUBE, A::ExecuteQuery, To(S::Executable)),
    row(S::DisplayOperations, E::ExecuteQuery, None, A::Reprompt, Resume),
    row(S::DisplayOperations, E::MoreInformation, None, A::ParseFreeText, To(S::ParseFreeText)),
    row(S::DisplayOperations, E::SwitchFocus, COMPARATIVE, A::SwitchFocus, To(S::SwitchFocus)),
    row(S::DisplayOperations, E::SwitchFocus, None, A::Reprompt, Resume),
    row(S::DisplayOperations, E::Exit, None, A::ExitApplication, To(S::Finished)),
    row(S::DetermineOperationInputIntent, E::UserInput, None, A::DetermineOperation, To(S::DetermineOperation)),
    row(S::DetermineOperationInputIntent, E::ExecuteQuery, CUBE, A::ExecuteQuery, To(S::Executable)),
    row(S::DetermineOperationInputIntent, E::ExecuteQuery, None, A::Reprompt, Resume),
    row(S::DetermineOperationInputIntent, E::ReviseQuery, CUBE, A::DisplayOperations, To(S::DisplayOperations)),
    row(S::DetermineOperationInputIntent, E::ReviseQuery, None, A::DisplayCubes, To(S::SelectCube)),
    row(S::DetermineOperationInputIntent, E::MoreInformation, None, A::ParseFreeText, To(S::ParseFreeText)),
    row(S::DetermineOperationInputIntent, E::Abort, None, A::Reprompt, Resume),
    row(S::DetermineOperationInputIntent, E::InvalidInput, None, A::Reprompt, Resume),
    row(S::DetermineOperationInputIntent, E::SwitchFocus, COMPARATIVE, A::SwitchFocus, To(S::SwitchFocus)),
    row(S::DetermineOperationInputIntent, E::SwitchFocus, None, A::Reprompt, Resume),
    row(S::DetermineOperationInputIntent, E::Exit, None, A::ExitApplication, To(S::Finished)),
    row(S::DetermineOperation, E::Determined, None, A::DisplayValues, To(S::DisplayValues)),
    row(S::DetermineOperation, E::InvalidInput, None, A::Reprompt, Resume),
    // values
    row(S::DisplayValues, E::UserInput, None, A::ResolveValueIntent, To(S::DetermineValueInputIntent)),
    row(S::DisplayValues, E::Navigate, ALLOWED, A::SelectOperation, To(S::DisplayValues)),
    row(S::DisplayValues, E::Abort, CUBE, A::DisplayOperations, To(S::DisplayOperations)),
    row(S::DisplayValues, E::Abort, None, A::DisplayCubes, To(S::SelectCube)),
    row(S::DisplayValues, E::ExecuteQuery, CUBE, A::ExecuteQuery, To(S::Executable)),
    row(S::DisplayValues, E::ExecuteQuery, None, A::Reprompt, Resume),
    row(S::DisplayValues, E::SwitchFocus, COMPARATIVE, A::SwitchFocus, To(S::SwitchFocus)),
    row(S::DisplayValues, E::SwitchFocus, None, A::Reprompt, Resume),
    row(S::DisplayValues, E::MoreInformation, None, A::ParseFreeText, To(S::ParseFreeText)),
    row(S::DisplayValues, E::Exit, None, A::ExitApplication, To(S::Finished)),
    row(S::DetermineValueInputIntent, E::Determined, None, A::DetermineValue, To(S::DetermineValue)),
    row(S::DetermineValueInputIntent, E::InvalidInput, None, A::Reprompt, Resume),
    row(S::DetermineValueInputIntent, E::Abort, CUBE, A::DisplayOperations, To(S::DisplayOperations)),
    row(S::DetermineValueInputIntent, E::Abort, None, A::DisplayCubes, To(S::SelectCube)),
    row(S::DetermineValueInputIntent, E::ExecuteQuery, CUBE, A::ExecuteQuery, To(S::Executable)),
    row(S::DetermineValueInputIntent, E::ExecuteQuery, None, A::Reprompt, Resume),
    row(S::DetermineValueInputIntent, E::MoreInformation, None, A::ParseFreeText, To(S::ParseFreeText)),
    row(S::DetermineValueInputIntent, E::Exit, None, A::ExitApplication, To(S::Finished)),
    row(S::DetermineValue, E::Determined, CUBE, A::DisplayOperations, To(S::DisplayOperations)),
    row(S::DetermineValue, E::Determined, None, A::DisplayCubes, To(S::SelectCube)),
    row(S::DetermineValue, E::InvalidInput, None, A::Reprompt, Resume),
    // execution
    row(S::Executable, E::Determined, None, A::Nothing, To(S::Executed)),
    row(S::Executed, E::UserInput, None, A::ResolveOperationIntent, To(S::DetermineOperationInputIntent)),
    row(S::Executed, E::ReviseQuery, CUBE, A::DisplayOperations, To(S::DisplayOperations)),
    row(S::Executed, E::ExecuteQuery, CUBE, A::ExecuteQuery, To(S::Executable)),
    row(S::Executed, E::Navigate, ALLOWED, A::SelectOperation, To(S::DisplayValues)),
    row(S::Executed, E::MoreInformation, None, A::ParseFreeText, To(S::ParseFreeText)),
    row(S::Executed, E::SwitchFocus, COMPARATIVE, A::SwitchFocus, To(S::SwitchFocus)),
    row(S::Executed, E::SwitchFocus, None, A::Reprompt, Resume),
    row(S::Executed, E::Exit, None, A::ExitApplication, To(S::Finished)),
    // focus
    row(S::SwitchFocus, E::Determined, CUBE, A::DisplayOperations, To(S::DisplayOperations)),
    row(S::SwitchFocus, E::Determined, None, A::DisplayCubes, To(S::SelectCube)),
];

/// First applicable row for `event` in `state`.
pub fn lookup(
    state: DialogueState,
    event: &DialogueEvent,
    situation: &AnalysisSituation,
    focus: ContextFocus,
) -> Option<&'static Transition> {
    let kind = event.kind();
    TRANSITIONS.iter().find(|t| {
        t.from == state
            && t.on == kind
            && t.guard.map_or(true, |g| g.holds(situation, focus, event))
    })
}

/// Structural checks run once when a machine is built.
///
/// Every transient state must handle the events its action can raise, and
/// no row may start in the final state.
pub fn validate() -> Result<(), String> {
    for t in TRANSITIONS {
        if t.from.is_final() {
            return Err(format!("transition out of final state on {}", t.on));
        }
    }
    let transient = [
        (S::ParseFreeText, E::Determined),
        (S::DetermineOperationInputIntent, E::UserInput),
        (S::DetermineOperationInputIntent, E::InvalidInput),
        (S::DetermineOperation, E::Determined),
        (S::DetermineOperation, E::InvalidInput),
        (S::DetermineValueInputIntent, E::Determined),
        (S::DetermineValueInputIntent, E::InvalidInput),
        (S::DetermineValue, E::Determined),
        (S::Executable, E::Determined),
        (S::SwitchFocus, E::Determined),
    ];
    for (state, kind) in transient {
        if !TRANSITIONS
            .iter()
            .any(|t| t.from == state && t.on == kind && t.guard.is_none())
        {
            return Err(format!("{state} has no unguarded transition on {kind}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::Operation;
    use olap_dialogue_types::SimpleSituation;

    const INTEREST: ContextFocus = ContextFocus::Interest;

    #[test]
    fn test_table_is_valid() {
        validate().unwrap();
    }

    #[test]
    fn test_execute_query_guarded_by_cube() {
        let empty = AnalysisSituation::empty(QueryShape::Simple);
        let with_cube = AnalysisSituation::Simple(SimpleSituation::with_cube("cube:sales"));

        let t = lookup(S::DisplayOperations, &DialogueEvent::ExecuteQuery, &empty, INTEREST);
        assert_eq!(t.unwrap().to, Resume);

        let t = lookup(S::DisplayOperations, &DialogueEvent::ExecuteQuery, &with_cube, INTEREST);
        assert_eq!(t.unwrap().to, To(S::Executable));
    }

    #[test]
    fn test_execute_query_from_values_without_cube_reprompts() {
        let empty = AnalysisSituation::empty(QueryShape::Simple);
        let t = lookup(S::DisplayValues, &DialogueEvent::ExecuteQuery, &empty, INTEREST).unwrap();
        assert_eq!(t.action, A::Reprompt);
        assert_eq!(t.to, Resume);
    }

    #[test]
    fn test_navigation_requires_cube_except_select_cube() {
        let empty = AnalysisSituation::empty(QueryShape::Simple);
        let add = DialogueEvent::Navigate(Operation::AddMeasure);
        let select = DialogueEvent::Navigate(Operation::SelectCube);
        assert!(lookup(S::SelectCube, &add, &empty, INTEREST).is_none());
        assert!(lookup(S::SelectCube, &select, &empty, INTEREST).is_some());
    }

    #[test]
    fn test_focus_switch_needs_comparative_situation() {
        let event = DialogueEvent::SwitchFocus(ContextFocus::Comparison);
        let simple = AnalysisSituation::Simple(SimpleSituation::with_cube("cube:sales"));
        let t = lookup(S::DisplayOperations, &event, &simple, INTEREST).unwrap();
        assert_eq!(t.action, A::Reprompt);

        let mut comparative = AnalysisSituation::empty(QueryShape::Comparative);
        comparative.focus_mut().cube = Some("cube:sales".into());
        let t = lookup(S::DisplayOperations, &event, &comparative, INTEREST).unwrap();
        assert_eq!(t.action, A::SwitchFocus);
        assert_eq!(t.to, To(S::SwitchFocus));
    }

    #[test]
    fn test_guards_follow_focus() {
        let mut situation = AnalysisSituation::empty(QueryShape::Comparative);
        situation.focus_mut().cube = Some("cube:sales".into());

        // the comparison context has no cube yet
        let t = lookup(
            S::SwitchFocus,
            &DialogueEvent::Determined,
            &situation,
            ContextFocus::Comparison,
        );
        assert_eq!(t.unwrap().action, A::DisplayCubes);

        // the comparative part edits slots only
        let drill = DialogueEvent::Navigate(Operation::DrillDown);
        let add = DialogueEvent::Navigate(Operation::AddMeasure);
        let comparative = ContextFocus::Comparative;
        assert!(lookup(S::DisplayOperations, &drill, &situation, comparative).is_none());
        assert!(lookup(S::DisplayOperations, &add, &situation, comparative).is_some());
    }

    #[test]
    fn test_final_state_has_no_transitions() {
        let situation = AnalysisSituation::default();
        assert!(lookup(S::Finished, &DialogueEvent::Exit, &situation, INTEREST).is_none());
        let hello = DialogueEvent::UserInput("hello".into());
        assert!(lookup(S::Finished, &hello, &situation, INTEREST).is_none());
    }

    #[test]
    fn test_start_with_and_without_sentence() {
        let situation = AnalysisSituation::default();
        let sentence = DialogueEvent::Start(Some("revenue by year".into()));
        let t = lookup(S::Idle, &sentence, &situation, INTEREST).unwrap();
        assert_eq!(t.action, A::ParseFreeText);

        let blank = DialogueEvent::Start(Some("  ".into()));
        let t = lookup(S::Idle, &blank, &situation, INTEREST).unwrap();
        assert_eq!(t.action, A::DisplayCubes);
    }
}
