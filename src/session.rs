//! Per-session dialogue data.

use crate::dialogue::{DialogueState, Operation};
use chrono::{DateTime, Utc};
use olap_dialogue_types::{AnalysisSituation, ContextFocus, DisplayItem, Language, QueryShape};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value(s) chosen from a display, waiting to be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSelection {
    Single { item: DisplayItem },
    /// Replace `current` with `replacement`.
    Pair {
        current: DisplayItem,
        replacement: DisplayItem,
    },
}

/// One user's conversation.
///
/// Owned and mutated by exactly one session worker; everybody else sees
/// clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------
    pub id: String,
    pub locale: String,
    pub language: Language,
    pub shape: QueryShape,

    // ------------------------------------------------------------------------
    // Dialogue
    // ------------------------------------------------------------------------
    pub current_state: DialogueState,
    pub analysis_situation: AnalysisSituation,

    /// Part of a comparative situation that operations edit.
    #[serde(default)]
    pub focus: ContextFocus,

    /// Text the last turn is working on (free text for the solver).
    #[serde(default)]
    pub pending_user_input: Option<String>,

    /// Input left after an operation was recognised in it, used as value
    /// input once the values are shown.
    #[serde(default)]
    pub pending_remainder: Option<String>,

    #[serde(default)]
    pub pending_selection: Option<ValueSelection>,

    /// Operation whose values are shown or being applied.
    #[serde(default)]
    pub last_operation: Option<Operation>,

    #[serde(default)]
    pub last_display: Option<olap_dialogue_types::DisplayPayload>,

    /// Free-form data for hosts and rules (e.g. the last query result).
    #[serde(default)]
    pub additional_data: HashMap<String, serde_json::Value>,

    // ------------------------------------------------------------------------
    // Timestamps
    // ------------------------------------------------------------------------
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, locale: impl Into<String>, language: Language) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            locale: locale.into(),
            language,
            shape: QueryShape::Simple,
            current_state: DialogueState::Idle,
            analysis_situation: AnalysisSituation::default(),
            focus: ContextFocus::Interest,
            pending_user_input: None,
            pending_remainder: None,
            pending_selection: None,
            last_operation: None,
            last_display: None,
            additional_data: HashMap::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Builder: query shape, which also resets the situation to that shape.
    pub fn with_shape(mut self, shape: QueryShape) -> Self {
        self.shape = shape;
        self.analysis_situation = AnalysisSituation::empty(shape);
        self.focus = ContextFocus::Interest;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.current_state.is_final()
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// Drop per-turn scratch data.
    pub fn clear_pending(&mut self) {
        self.pending_user_input = None;
        self.pending_remainder = None;
        self.pending_selection = None;
    }
}
