//! End-to-end dialogues against the in-memory schema.
//!
//! Run: cargo test --test dialogue_flow

mod helpers;

use helpers::{config, sales_schema, services, FailingExecutor, LabelsDown, LookupDown};
use olap_dialogue::collaborators::{CubeDef, DimensionDef};
use olap_dialogue::config::SolverSettings;
use olap_dialogue::dialogue::LAST_QUERY_RESULT;
use olap_dialogue::types::{AnalysisSituation, ContextFocus, DisplayPayload, Language, QueryShape};
use olap_dialogue::{
    DialogueEvent, DialogueServices, DialogueState, DialogueStateMachine, InMemoryCubeSchema,
    Operation, Session,
};
use std::sync::Arc;

fn machine_with(services: DialogueServices) -> DialogueStateMachine {
    DialogueStateMachine::new(config(), services).expect("machine")
}

fn machine() -> DialogueStateMachine {
    machine_with(services())
}

fn session(language: Language) -> Session {
    Session::new("s1", language.as_str(), language)
}

async fn say(m: &DialogueStateMachine, s: &mut Session, text: &str) -> DisplayPayload {
    let outcome = m.handle(s, DialogueEvent::UserInput(text.into())).await;
    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    outcome.display
}

fn item_ids(display: &DisplayPayload) -> Vec<&str> {
    display.items().iter().map(|i| i.id.as_str()).collect()
}

#[tokio::test]
async fn test_complete_dialogue() {
    let m = machine();
    let mut s = session(Language::En);

    let outcome = m
        .handle(&mut s, DialogueEvent::Start(Some("Revenue by year".into())))
        .await;
    assert!(outcome.situation_changed);
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
    assert_eq!(outcome.display.message_key(), "selectOperation");
    let ids = item_ids(&outcome.display);
    assert!(ids.contains(&"navigate.addMeasure"));
    assert!(ids.contains(&"navigate.dropMeasure"));
    assert!(!ids.contains(&"navigate.moveUpDiceNode"));
    assert_eq!(ids[ids.len() - 2..], ["executeQuery", "exit"]);

    let focus = s.analysis_situation.focus();
    assert_eq!(focus.cube.as_deref(), Some("cube:sales"));
    assert_eq!(focus.dimension_qualification("dim:time").unwrap().granularity_level, "l:year");
    assert_eq!(focus.dimension_qualification("dim:geo").unwrap().granularity_level, "l:city");

    // operation and value in one utterance
    let display = say(&m, &mut s, "add measure quantity").await;
    assert_eq!(display.message_key(), "selectOperation");
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
    let measures: Vec<_> = s.analysis_situation.focus().measures.iter().cloned().collect();
    assert_eq!(measures, vec!["m:quantity".to_string(), "m:revenue".to_string()]);

    let display = say(&m, &mut s, "execute query").await;
    assert_eq!(s.current_state, DialogueState::Executed);
    match &display {
        DisplayPayload::QueryResult { result, items, .. } => {
            assert!(result.columns.contains(&"Revenue".to_string()));
            assert_eq!(items[0].id, "reviseQuery");
            assert_eq!(items[0].position, 1);
            assert_eq!(items[1].id, "exit");
            assert_eq!(items[1].position, 2);
        }
        other => panic!("Expected query result, got {:?}", other),
    }
    assert!(s.additional_data.contains_key(LAST_QUERY_RESULT));

    say(&m, &mut s, "1").await;
    assert_eq!(s.current_state, DialogueState::DisplayOperations);

    let display = say(&m, &mut s, "bye").await;
    assert_eq!(display, DisplayPayload::exit());
    assert!(s.is_finished());
}

#[tokio::test]
async fn test_refocus_with_two_lists() {
    let m = machine();
    let mut s = session(Language::En);
    m.handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;

    let outcome = m
        .handle(&mut s, DialogueEvent::Navigate(Operation::RefocusMeasure))
        .await;
    assert_eq!(s.current_state, DialogueState::DisplayValues);
    match &outcome.display {
        DisplayPayload::TwoList { left, right, .. } => {
            assert_eq!(left.len(), 1);
            assert_eq!(right.len(), 2);
        }
        other => panic!("Expected two lists, got {:?}", other),
    }

    say(&m, &mut s, "1,2").await;
    let measures: Vec<_> = s.analysis_situation.focus().measures.iter().cloned().collect();
    assert_eq!(measures, vec!["m:costs".to_string()]);
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
}

#[tokio::test]
async fn test_back_from_values_and_empty_values() {
    let m = machine();
    let mut s = session(Language::En);
    m.handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;

    m.handle(&mut s, DialogueEvent::Navigate(Operation::AddMeasure))
        .await;
    assert_eq!(s.current_state, DialogueState::DisplayValues);
    let display = say(&m, &mut s, "go back").await;
    assert_eq!(display.message_key(), "selectOperation");
    assert_eq!(s.current_state, DialogueState::DisplayOperations);

    // nothing is diced, so there is nothing to widen
    let outcome = m
        .handle(&mut s, DialogueEvent::Navigate(Operation::MoveUpDiceNode))
        .await;
    assert!(outcome.error.is_none());
    assert_eq!(outcome.display.message_key(), "selectOperation");
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
}

#[tokio::test]
async fn test_more_information_parses_remaining_text() {
    let m = machine();
    let mut s = session(Language::En);
    m.handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;

    say(&m, &mut s, "more info recent years").await;
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
    let time = s
        .analysis_situation
        .focus()
        .dimension_qualification("dim:time")
        .unwrap();
    assert!(time.slice_conditions.contains("sc:recent"));
}

#[tokio::test]
async fn test_german_numbered_selection() {
    let m = machine();
    let mut s = session(Language::De);
    m.handle(&mut s, DialogueEvent::Start(None)).await;
    assert_eq!(s.current_state, DialogueState::SelectCube);

    say(&m, &mut s, "die zweite Option").await;
    assert_eq!(s.analysis_situation.cube(), Some("cube:stock"));
    let product = s
        .analysis_situation
        .focus()
        .dimension_qualification("dim:product")
        .unwrap();
    assert_eq!(product.granularity_level, "l:product");
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
}

#[tokio::test]
async fn test_query_failure_shows_error_and_keeps_session() {
    let m = machine_with(services().with_executor(Arc::new(FailingExecutor)));
    let mut s = session(Language::En);
    m.handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;
    let before = s.clone();

    let outcome = m.handle(&mut s, DialogueEvent::ExecuteQuery).await;
    assert!(outcome.error.is_some());
    assert_eq!(
        outcome.display,
        DisplayPayload::error(
            "errorExecuteQuery",
            Some("query executor failed: warehouse unreachable".into())
        )
    );
    assert_eq!(s, before);
}

#[tokio::test]
async fn test_lookup_failure_keeps_dialogue_idle() {
    let m = machine_with(services().with_schema_lookup(Arc::new(LookupDown)));
    let mut s = session(Language::En);
    let outcome = m
        .handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;
    assert_eq!(outcome.display.message_key(), "errorLoadData");
    assert_eq!(s.current_state, DialogueState::Idle);
}

#[tokio::test]
async fn test_label_failure_still_solves() {
    let schema = Arc::new(sales_schema());
    let m = machine_with(services().with_schema_lookup(Arc::new(LabelsDown(schema))));
    let mut s = session(Language::En);
    let outcome = m
        .handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;
    assert!(outcome.error.is_none());
    assert_eq!(s.analysis_situation.cube(), Some("cube:sales"));
}

fn twin_cubes(reversed: bool) -> InMemoryCubeSchema {
    let a = CubeDef::new("cube:a", "Alpha")
        .measure("m:revenue", "Revenue")
        .dimension(DimensionDef::new("dim:time", "Time").level("l:year", "Year"));
    let b = CubeDef::new("cube:b", "Beta")
        .measure("m:revenue", "Revenue")
        .dimension(DimensionDef::new("dim:time", "Time").level("l:year", "Year"));
    if reversed {
        InMemoryCubeSchema::new().cube(b).cube(a)
    } else {
        InMemoryCubeSchema::new().cube(a).cube(b)
    }
}

#[tokio::test]
async fn test_equal_scores_pick_the_same_cube_every_time() {
    for reversed in [false, true] {
        let m = machine_with(DialogueServices::in_memory(twin_cubes(reversed)));
        for _ in 0..5 {
            let mut s = session(Language::En);
            let outcome = m
                .handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
                .await;
            assert!(outcome.error.is_none());
            assert_eq!(s.analysis_situation.cube(), Some("cube:a"));
        }
    }
}

#[tokio::test]
async fn test_equally_similar_options_resolve_by_position() {
    let schema = InMemoryCubeSchema::new()
        .cube(CubeDef::new("cube:y", "Sales").measure("m:revenue", "Revenue"))
        .cube(CubeDef::new("cube:x", "Sales").measure("m:revenue", "Revenue"));
    let m = machine_with(DialogueServices::in_memory(schema));

    for _ in 0..5 {
        let mut s = session(Language::En);
        m.handle(&mut s, DialogueEvent::Start(None)).await;
        say(&m, &mut s, "sales").await;
        assert_eq!(s.analysis_situation.cube(), Some("cube:y"));
    }
}

#[tokio::test]
async fn test_events_after_finish_are_rejected() {
    let m = machine();
    let mut s = session(Language::En);
    m.handle(&mut s, DialogueEvent::Start(None)).await;
    m.handle(&mut s, DialogueEvent::Exit).await;
    assert!(s.is_finished());

    let before = s.clone();
    let outcome = m.handle(&mut s, DialogueEvent::UserInput("hello".into())).await;
    assert!(outcome.display.is_error());
    assert_eq!(s, before);
}

#[tokio::test]
async fn test_comparison_context_is_edited_after_switching() {
    let m = machine();
    let mut s = session(Language::En).with_shape(QueryShape::Comparative);
    let outcome = m
        .handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;
    let ids = item_ids(&outcome.display);
    assert!(ids.contains(&"switch.comparison"));
    assert!(ids.contains(&"switch.comparative"));
    assert!(!ids.contains(&"switch.interest"));

    let outcome = m
        .handle(&mut s, DialogueEvent::SwitchFocus(ContextFocus::Comparison))
        .await;
    assert!(outcome.error.is_none());
    assert_eq!(s.focus, ContextFocus::Comparison);
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
    assert!(item_ids(&outcome.display).contains(&"switch.interest"));

    m.handle(&mut s, DialogueEvent::Navigate(Operation::AddMeasure))
        .await;
    assert_eq!(s.current_state, DialogueState::DisplayValues);
    say(&m, &mut s, "quantity").await;
    assert_eq!(s.current_state, DialogueState::DisplayOperations);

    let AnalysisSituation::Comparative(c) = &s.analysis_situation else {
        panic!("Expected comparative situation");
    };
    assert_eq!(c.context_of_comparison.cube.as_deref(), Some("cube:sales"));
    let compared: Vec<_> = c.context_of_comparison.measures.iter().cloned().collect();
    assert_eq!(compared, vec!["m:quantity".to_string()]);
    let interest: Vec<_> = c.context_of_interest.measures.iter().cloned().collect();
    assert_eq!(interest, vec!["m:revenue".to_string()]);

    // switching by name, then only slot edits are offered
    let display = say(&m, &mut s, "edit comparison").await;
    assert_eq!(s.focus, ContextFocus::Comparative);
    let ids = item_ids(&display);
    assert!(ids.contains(&"navigate.addMeasure"));
    assert!(!ids.contains(&"navigate.rollUp"));
    assert!(!ids.contains(&"navigate.selectCube"));
}

#[tokio::test]
async fn test_focus_switch_in_simple_dialogue_reprompts() {
    let m = machine();
    let mut s = session(Language::En);
    m.handle(&mut s, DialogueEvent::Start(Some("revenue".into())))
        .await;
    let before = s.last_display.clone();

    let outcome = m
        .handle(&mut s, DialogueEvent::SwitchFocus(ContextFocus::Comparison))
        .await;
    assert!(outcome.error.is_none());
    assert_eq!(s.focus, ContextFocus::Interest);
    assert_eq!(s.current_state, DialogueState::DisplayOperations);
    assert!(matches!(outcome.display, DisplayPayload::List { reprompt: true, .. }));
    assert_eq!(
        outcome.display.items(),
        before.as_ref().map(|d| d.items()).unwrap_or_default()
    );
}

#[tokio::test]
async fn test_exhausted_solver_budget_keeps_greedy_answer() {
    let config = config().solver(SolverSettings::default().max_steps(0));
    let m = DialogueStateMachine::new(config, services()).expect("machine");
    let mut s = session(Language::En);
    let outcome = m
        .handle(&mut s, DialogueEvent::Start(Some("revenue by year".into())))
        .await;
    assert!(outcome.error.is_none());
    assert_eq!(s.current_state, DialogueState::DisplayOperations);

    let focus = s.analysis_situation.focus();
    assert_eq!(focus.cube.as_deref(), Some("cube:sales"));
    assert!(focus.measures.contains("m:revenue"));
    assert_eq!(focus.dimension_qualification("dim:time").unwrap().granularity_level, "l:year");
}
