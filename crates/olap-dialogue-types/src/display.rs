//! Outbound messages: display payloads and situation change notifications.

use crate::{AnalysisSituation, ElementId, Language};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// DISPLAY ITEMS
// ============================================================================

/// One selectable entry of a list display.
///
/// `position` is the 1-based number the user can answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<ElementId>,
}

impl DisplayItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, position: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            details: None,
            position,
            dimension: None,
            level: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_dimension(mut self, dimension: impl Into<ElementId>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<ElementId>) -> Self {
        self.level = Some(level.into());
        self
    }
}

/// Renumber items 1..=n in their current order.
pub fn renumber(items: &mut [DisplayItem]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.position = idx as u32 + 1;
    }
}

// ============================================================================
// QUERY RESULT
// ============================================================================

/// Tabular result of an executed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub executed_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            columns,
            rows,
            executed_at: Utc::now(),
        }
    }
}

// ============================================================================
// DISPLAY PAYLOAD
// ============================================================================

/// What the transport should show the user after a turn.
///
/// `message_key` names the prompt text in the client's resource bundle.
/// `reprompt` is set when the same list is shown again after input that
/// could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayPayload {
    List {
        message_key: String,
        items: Vec<DisplayItem>,
        #[serde(default)]
        reprompt: bool,
    },
    TwoList {
        message_key: String,
        left: Vec<DisplayItem>,
        right: Vec<DisplayItem>,
        #[serde(default)]
        reprompt: bool,
    },
    QueryResult {
        message_key: String,
        result: QueryResult,
        /// Follow-up operations.
        items: Vec<DisplayItem>,
    },
    Error {
        message_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Exit {
        message_key: String,
    },
}

impl DisplayPayload {
    pub fn list(message_key: impl Into<String>, items: Vec<DisplayItem>) -> Self {
        DisplayPayload::List {
            message_key: message_key.into(),
            items,
            reprompt: false,
        }
    }

    pub fn two_list(
        message_key: impl Into<String>,
        left: Vec<DisplayItem>,
        right: Vec<DisplayItem>,
    ) -> Self {
        DisplayPayload::TwoList {
            message_key: message_key.into(),
            left,
            right,
            reprompt: false,
        }
    }

    pub fn error(message_key: impl Into<String>, detail: Option<String>) -> Self {
        DisplayPayload::Error {
            message_key: message_key.into(),
            detail,
        }
    }

    pub fn exit() -> Self {
        DisplayPayload::Exit {
            message_key: "exit".to_string(),
        }
    }

    pub fn message_key(&self) -> &str {
        match self {
            DisplayPayload::List { message_key, .. }
            | DisplayPayload::TwoList { message_key, .. }
            | DisplayPayload::QueryResult { message_key, .. }
            | DisplayPayload::Error { message_key, .. }
            | DisplayPayload::Exit { message_key } => message_key,
        }
    }

    /// Items of a single list (list displays and query result follow-ups).
    pub fn items(&self) -> &[DisplayItem] {
        match self {
            DisplayPayload::List { items, .. } | DisplayPayload::QueryResult { items, .. } => items,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DisplayPayload::Error { .. })
    }

    /// Same display, flagged as a re-prompt.
    pub fn into_reprompt(self) -> Self {
        match self {
            DisplayPayload::List {
                message_key, items, ..
            } => DisplayPayload::List {
                message_key,
                items,
                reprompt: true,
            },
            DisplayPayload::TwoList {
                message_key,
                left,
                right,
                ..
            } => DisplayPayload::TwoList {
                message_key,
                left,
                right,
                reprompt: true,
            },
            other => other,
        }
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Sent whenever a session's analysis situation changed during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSituationChanged {
    pub session_id: String,
    pub analysis_situation: AnalysisSituation,
    pub language: Language,
}
