//! Dialogue state machine.
//!
//! The protocol lives in [`table::TRANSITIONS`]; [`DialogueStateMachine`]
//! walks it for one external event at a time and dispatches the row actions
//! to the handlers in `actions`.

mod actions;
pub mod apply;
pub mod event;
pub mod intent;
pub mod machine;
pub mod operation;
pub mod state;
pub mod table;

pub use actions::LAST_QUERY_RESULT;
pub use apply::{apply_selection, Applied};
pub use event::{DialogueEvent, EventKind};
pub use intent::{Ranked, Resolution};
pub use machine::{DialogueStateMachine, Turn, TurnOutcome};
pub use operation::{focus_display_item, offered_operations, ControlIntent, Operation};
pub use state::DialogueState;
