//! Dialogue states.
//!
//! ```text
//!  Idle ──start──► ParseFreeText ──► SelectCube ◄─────────────────┐
//!                        │               │ userInput              │
//!                        ▼               ▼                        │
//!               DisplayOperations  DetermineValueInputIntent ─► DetermineValue
//!                 │ userInput            ▲ userInput                 │
//!                 ▼                      │                           │
//!  DetermineOperationInputIntent ─► DetermineOperation ─► DisplayValues
//!                 │ executeQuery                                     │
//!                 ▼                                                  │
//!            Executable ──► Executed ──reviseQuery──► DisplayOperations ◄┘
//!
//!  any waiting state ──exit──► Finished
//!  any waiting state ──switch──► SwitchFocus ──► DisplayOperations | SelectCube
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cursor of a session's dialogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// Created, dialogue not started yet.
    #[default]
    Idle,
    ParseFreeText,
    SelectCube,
    DisplayOperations,
    DetermineOperationInputIntent,
    DetermineOperation,
    DisplayValues,
    DetermineValueInputIntent,
    DetermineValue,
    Executable,
    Executed,
    /// Moving to another part of a comparative situation.
    SwitchFocus,
    Finished,
}

impl DialogueState {
    /// Waits for an external event. All other states are left again within
    /// the same turn.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            DialogueState::Idle
                | DialogueState::SelectCube
                | DialogueState::DisplayOperations
                | DialogueState::DisplayValues
                | DialogueState::Executed
                | DialogueState::Finished
        )
    }

    pub fn is_final(&self) -> bool {
        matches!(self, DialogueState::Finished)
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
