//! Dialogue events.

use super::operation::{ControlIntent, Operation};
use crate::error::{DialogueError, Result};
use olap_dialogue_types::ContextFocus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input to the dialogue state machine.
///
/// External events come from the transport; `Determined`, `InvalidInput`
/// and `Abort` are normally raised by actions while a turn is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum DialogueEvent {
    /// Dialogue start, with the optional first sentence.
    Start(Option<String>),
    UserInput(String),
    Navigate(Operation),
    /// Edit another part of a comparative situation.
    SwitchFocus(ContextFocus),
    MoreInformation,
    InvalidInput,
    Determined,
    ExecuteQuery,
    ReviseQuery,
    Abort,
    Exit,
}

/// Event without payload, used as transition table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    UserInput,
    Navigate,
    SwitchFocus,
    MoreInformation,
    InvalidInput,
    Determined,
    ExecuteQuery,
    ReviseQuery,
    Abort,
    Exit,
}

impl DialogueEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DialogueEvent::Start(_) => EventKind::Start,
            DialogueEvent::UserInput(_) => EventKind::UserInput,
            DialogueEvent::Navigate(_) => EventKind::Navigate,
            DialogueEvent::SwitchFocus(_) => EventKind::SwitchFocus,
            DialogueEvent::MoreInformation => EventKind::MoreInformation,
            DialogueEvent::InvalidInput => EventKind::InvalidInput,
            DialogueEvent::Determined => EventKind::Determined,
            DialogueEvent::ExecuteQuery => EventKind::ExecuteQuery,
            DialogueEvent::ReviseQuery => EventKind::ReviseQuery,
            DialogueEvent::Abort => EventKind::Abort,
            DialogueEvent::Exit => EventKind::Exit,
        }
    }

    /// Wire name (`userInput`, `navigate.drillDown`, ...).
    pub fn name(&self) -> String {
        match self {
            DialogueEvent::Start(_) => "start".to_string(),
            DialogueEvent::UserInput(_) => "userInput".to_string(),
            DialogueEvent::Navigate(op) => op.event_name(),
            DialogueEvent::SwitchFocus(focus) => format!("switch.{}", focus.name()),
            DialogueEvent::MoreInformation => "moreInformation".to_string(),
            DialogueEvent::InvalidInput => "invalidInput".to_string(),
            DialogueEvent::Determined => "determined".to_string(),
            DialogueEvent::ExecuteQuery => "executeQuery".to_string(),
            DialogueEvent::ReviseQuery => "reviseQuery".to_string(),
            DialogueEvent::Abort => "abort".to_string(),
            DialogueEvent::Exit => "exit".to_string(),
        }
    }

    /// Build an event from its wire name. `userInput` needs a payload.
    pub fn parse(name: &str, payload: Option<&str>) -> Result<Self> {
        if let Some(op) = name.strip_prefix("navigate.") {
            return Operation::from_name(op)
                .map(DialogueEvent::Navigate)
                .ok_or_else(|| DialogueError::UnknownEvent(name.to_string()));
        }
        if let Some(focus) = name.strip_prefix("switch.") {
            return ContextFocus::from_name(focus)
                .map(DialogueEvent::SwitchFocus)
                .ok_or_else(|| DialogueError::UnknownEvent(name.to_string()));
        }
        match name {
            "start" => Ok(DialogueEvent::Start(payload.map(str::to_string))),
            "userInput" => match payload {
                Some(text) => Ok(DialogueEvent::UserInput(text.to_string())),
                None => Err(DialogueError::InvalidArgument(
                    "userInput requires a text payload".into(),
                )),
            },
            "invalidInput" => Ok(DialogueEvent::InvalidInput),
            "determined" => Ok(DialogueEvent::Determined),
            other => ControlIntent::from_name(other)
                .map(DialogueEvent::from)
                .ok_or_else(|| DialogueError::UnknownEvent(other.to_string())),
        }
    }
}

impl From<ControlIntent> for DialogueEvent {
    fn from(intent: ControlIntent) -> Self {
        match intent {
            ControlIntent::ExecuteQuery => DialogueEvent::ExecuteQuery,
            ControlIntent::ReviseQuery => DialogueEvent::ReviseQuery,
            ControlIntent::MoreInformation => DialogueEvent::MoreInformation,
            ControlIntent::Abort => DialogueEvent::Abort,
            ControlIntent::Exit => DialogueEvent::Exit,
        }
    }
}

impl fmt::Display for DialogueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
