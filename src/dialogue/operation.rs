//! Operations the user can navigate to, and control intents.

use olap_dialogue_types::{ContextFocus, DisplayItem, Language, SimpleSituation, SlotType};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// OPERATIONS
// ============================================================================

/// A slot-editing operation, addressed by `navigate.<name>` events.
///
/// Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    SelectCube,
    AddMeasure,
    RefocusMeasure,
    DropMeasure,
    DrillDown,
    RollUp,
    MoveDownDiceNode,
    MoveUpDiceNode,
    NarrowSliceCondition,
    BroadenSliceCondition,
    RefocusSliceCondition,
    NarrowFilter,
    BroadenFilter,
    RefocusFilter,
    NarrowBaseMeasureCondition,
    BroadenBaseMeasureCondition,
    RefocusBaseMeasureCondition,
}

/// How an operation changes the selected value(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Add,
    Remove,
    /// Swap a current selection (left list) for a new one (right list).
    Replace,
    Set,
}

/// Part of the situation an operation edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Cube,
    Slot(SlotType),
    Granularity,
    DiceNode,
    SliceCondition,
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Operation::SelectCube,
        Operation::AddMeasure,
        Operation::RefocusMeasure,
        Operation::DropMeasure,
        Operation::DrillDown,
        Operation::RollUp,
        Operation::MoveDownDiceNode,
        Operation::MoveUpDiceNode,
        Operation::NarrowSliceCondition,
        Operation::BroadenSliceCondition,
        Operation::RefocusSliceCondition,
        Operation::NarrowFilter,
        Operation::BroadenFilter,
        Operation::RefocusFilter,
        Operation::NarrowBaseMeasureCondition,
        Operation::BroadenBaseMeasureCondition,
        Operation::RefocusBaseMeasureCondition,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::SelectCube => "selectCube",
            Operation::AddMeasure => "addMeasure",
            Operation::RefocusMeasure => "refocusMeasure",
            Operation::DropMeasure => "dropMeasure",
            Operation::DrillDown => "drillDown",
            Operation::RollUp => "rollUp",
            Operation::MoveDownDiceNode => "moveDownDiceNode",
            Operation::MoveUpDiceNode => "moveUpDiceNode",
            Operation::NarrowSliceCondition => "narrowSliceCondition",
            Operation::BroadenSliceCondition => "broadenSliceCondition",
            Operation::RefocusSliceCondition => "refocusSliceCondition",
            Operation::NarrowFilter => "narrowFilter",
            Operation::BroadenFilter => "broadenFilter",
            Operation::RefocusFilter => "refocusFilter",
            Operation::NarrowBaseMeasureCondition => "narrowBaseMeasureCondition",
            Operation::BroadenBaseMeasureCondition => "broadenBaseMeasureCondition",
            Operation::RefocusBaseMeasureCondition => "refocusBaseMeasureCondition",
        }
    }

    /// Wire name of the navigation event, e.g. `navigate.addMeasure`.
    pub fn event_name(self) -> String {
        format!("navigate.{}", self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// 1-based position in operation lists.
    pub fn position(self) -> u32 {
        self as u32 + 1
    }

    pub fn display_name(self, language: Language) -> &'static str {
        match (self, language) {
            (Operation::SelectCube, Language::En) => "Select cube",
            (Operation::SelectCube, Language::De) => "Würfel auswählen",
            (Operation::AddMeasure, Language::En) => "Add measure",
            (Operation::AddMeasure, Language::De) => "Kennzahl hinzufügen",
            (Operation::RefocusMeasure, Language::En) => "Replace measure",
            (Operation::RefocusMeasure, Language::De) => "Kennzahl ersetzen",
            (Operation::DropMeasure, Language::En) => "Drop measure",
            (Operation::DropMeasure, Language::De) => "Kennzahl entfernen",
            (Operation::DrillDown, Language::En) => "Drill down",
            (Operation::DrillDown, Language::De) => "Detaillieren",
            (Operation::RollUp, Language::En) => "Roll up",
            (Operation::RollUp, Language::De) => "Verdichten",
            (Operation::MoveDownDiceNode, Language::En) => "Dice into node",
            (Operation::MoveDownDiceNode, Language::De) => "Auf Knoten einschränken",
            (Operation::MoveUpDiceNode, Language::En) => "Widen dice node",
            (Operation::MoveUpDiceNode, Language::De) => "Knoten erweitern",
            (Operation::NarrowSliceCondition, Language::En) => "Add slice condition",
            (Operation::NarrowSliceCondition, Language::De) => "Einschränkung hinzufügen",
            (Operation::BroadenSliceCondition, Language::En) => "Remove slice condition",
            (Operation::BroadenSliceCondition, Language::De) => "Einschränkung entfernen",
            (Operation::RefocusSliceCondition, Language::En) => "Replace slice condition",
            (Operation::RefocusSliceCondition, Language::De) => "Einschränkung ersetzen",
            (Operation::NarrowFilter, Language::En) => "Add filter",
            (Operation::NarrowFilter, Language::De) => "Filter hinzufügen",
            (Operation::BroadenFilter, Language::En) => "Remove filter",
            (Operation::BroadenFilter, Language::De) => "Filter entfernen",
            (Operation::RefocusFilter, Language::En) => "Replace filter",
            (Operation::RefocusFilter, Language::De) => "Filter ersetzen",
            (Operation::NarrowBaseMeasureCondition, Language::En) => "Add base measure condition",
            (Operation::NarrowBaseMeasureCondition, Language::De) => {
                "Basiskennzahl-Bedingung hinzufügen"
            }
            (Operation::BroadenBaseMeasureCondition, Language::En) => {
                "Remove base measure condition"
            }
            (Operation::BroadenBaseMeasureCondition, Language::De) => {
                "Basiskennzahl-Bedingung entfernen"
            }
            (Operation::RefocusBaseMeasureCondition, Language::En) => {
                "Replace base measure condition"
            }
            (Operation::RefocusBaseMeasureCondition, Language::De) => {
                "Basiskennzahl-Bedingung ersetzen"
            }
        }
    }

    pub fn edit(self) -> Edit {
        match self {
            Operation::AddMeasure
            | Operation::NarrowSliceCondition
            | Operation::NarrowFilter
            | Operation::NarrowBaseMeasureCondition => Edit::Add,
            Operation::DropMeasure
            | Operation::BroadenSliceCondition
            | Operation::BroadenFilter
            | Operation::BroadenBaseMeasureCondition => Edit::Remove,
            Operation::RefocusMeasure
            | Operation::RefocusSliceCondition
            | Operation::RefocusFilter
            | Operation::RefocusBaseMeasureCondition => Edit::Replace,
            Operation::SelectCube
            | Operation::DrillDown
            | Operation::RollUp
            | Operation::MoveDownDiceNode
            | Operation::MoveUpDiceNode => Edit::Set,
        }
    }

    pub fn target(self) -> Target {
        match self {
            Operation::SelectCube => Target::Cube,
            Operation::AddMeasure | Operation::RefocusMeasure | Operation::DropMeasure => {
                Target::Slot(SlotType::Measure)
            }
            Operation::DrillDown | Operation::RollUp => Target::Granularity,
            Operation::MoveDownDiceNode | Operation::MoveUpDiceNode => Target::DiceNode,
            Operation::NarrowSliceCondition
            | Operation::BroadenSliceCondition
            | Operation::RefocusSliceCondition => Target::SliceCondition,
            Operation::NarrowFilter | Operation::BroadenFilter | Operation::RefocusFilter => {
                Target::Slot(SlotType::MeasurePredicate)
            }
            Operation::NarrowBaseMeasureCondition
            | Operation::BroadenBaseMeasureCondition
            | Operation::RefocusBaseMeasureCondition => {
                Target::Slot(SlotType::BaseMeasurePredicate)
            }
        }
    }

    pub fn requires_cube(self) -> bool {
        self != Operation::SelectCube
    }

    /// Values are picked from two lists (current, replacement).
    pub fn uses_two_lists(self) -> bool {
        self.edit() == Edit::Replace
    }

    /// Whether the operation makes sense for the situation right now.
    ///
    /// Removing and replacing need something selected; dice widening needs a
    /// dice. Adding is always offered once a cube is set, the value list may
    /// still turn out empty.
    pub fn is_applicable(self, situation: &SimpleSituation) -> bool {
        if !situation.is_cube_defined() {
            return self == Operation::SelectCube;
        }
        let has_current = match self.target() {
            Target::Cube | Target::Granularity => true,
            Target::Slot(slot) => situation.slot(slot).is_some_and(|set| !set.is_empty()),
            Target::SliceCondition => situation.slice_conditions().next().is_some(),
            Target::DiceNode => situation
                .dimension_qualifications
                .values()
                .any(|dq| dq.is_diced()),
        };
        match (self.edit(), self) {
            (Edit::Remove | Edit::Replace, _) => has_current,
            (_, Operation::MoveUpDiceNode) => has_current,
            _ => true,
        }
    }

    /// The comparative part of a situation only has measure, filter and
    /// join condition slots.
    pub fn edits_in(self, focus: ContextFocus) -> bool {
        focus != ContextFocus::Comparative || matches!(self.target(), Target::Slot(_))
    }

    pub fn display_item(self, language: Language) -> DisplayItem {
        DisplayItem::new(self.event_name(), self.display_name(language), self.position())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// CONTROL INTENTS
// ============================================================================

/// Intents that steer the dialogue instead of editing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlIntent {
    ExecuteQuery,
    ReviseQuery,
    MoreInformation,
    Abort,
    Exit,
}

impl ControlIntent {
    pub const ALL: [ControlIntent; 5] = [
        ControlIntent::ExecuteQuery,
        ControlIntent::ReviseQuery,
        ControlIntent::MoreInformation,
        ControlIntent::Abort,
        ControlIntent::Exit,
    ];

    /// Wire name, shared with the corresponding dialogue event.
    pub fn name(self) -> &'static str {
        match self {
            ControlIntent::ExecuteQuery => "executeQuery",
            ControlIntent::ReviseQuery => "reviseQuery",
            ControlIntent::MoreInformation => "moreInformation",
            ControlIntent::Abort => "abort",
            ControlIntent::Exit => "exit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn display_name(self, language: Language) -> &'static str {
        match (self, language) {
            (ControlIntent::ExecuteQuery, Language::En) => "Execute query",
            (ControlIntent::ExecuteQuery, Language::De) => "Abfrage ausführen",
            (ControlIntent::ReviseQuery, Language::En) => "Revise query",
            (ControlIntent::ReviseQuery, Language::De) => "Abfrage überarbeiten",
            (ControlIntent::MoreInformation, Language::En) => "More information",
            (ControlIntent::MoreInformation, Language::De) => "Weitere Informationen",
            (ControlIntent::Abort, Language::En) => "Back",
            (ControlIntent::Abort, Language::De) => "Zurück",
            (ControlIntent::Exit, Language::En) => "Exit",
            (ControlIntent::Exit, Language::De) => "Beenden",
        }
    }

    /// Phrases recognised besides the display name.
    pub fn synonyms(self, language: Language) -> &'static [&'static str] {
        match (self, language) {
            (ControlIntent::ExecuteQuery, Language::En) => {
                &["run query", "run", "execute", "show result", "show results"]
            }
            (ControlIntent::ExecuteQuery, Language::De) => {
                &["ausführen", "abfrage starten", "ergebnis anzeigen"]
            }
            (ControlIntent::ReviseQuery, Language::En) => &["revise", "change query", "modify query"],
            (ControlIntent::ReviseQuery, Language::De) => &["überarbeiten", "abfrage ändern"],
            (ControlIntent::MoreInformation, Language::En) => &["more info", "tell me more"],
            (ControlIntent::MoreInformation, Language::De) => &["mehr informationen"],
            (ControlIntent::Abort, Language::En) => &["go back", "cancel", "abort"],
            (ControlIntent::Abort, Language::De) => &["abbrechen", "zurückgehen"],
            (ControlIntent::Exit, Language::En) => &["quit", "bye", "goodbye", "stop"],
            (ControlIntent::Exit, Language::De) => &["ende", "tschüss", "aufhören"],
        }
    }

    /// Item shown in operation lists. Positions follow the operations.
    pub fn display_item(self, language: Language, position: u32) -> DisplayItem {
        DisplayItem::new(self.name(), self.display_name(language), position)
    }
}

/// Item offering a move to another part of a comparative situation.
pub fn focus_display_item(focus: ContextFocus, language: Language) -> DisplayItem {
    let title = match (focus, language) {
        (ContextFocus::Interest, Language::De) => "Interessenskontext bearbeiten",
        (ContextFocus::Interest, _) => "Edit context of interest",
        (ContextFocus::Comparison, Language::De) => "Vergleichskontext bearbeiten",
        (ContextFocus::Comparison, _) => "Edit context of comparison",
        (ContextFocus::Comparative, Language::De) => "Vergleich bearbeiten",
        (ContextFocus::Comparative, _) => "Edit comparison",
    };
    DisplayItem::new(format!("switch.{}", focus.name()), title, 0)
}

/// Operations offered for the situation, in display order.
pub fn offered_operations(situation: &SimpleSituation) -> Vec<Operation> {
    Operation::ALL
        .into_iter()
        .filter(|op| op.is_applicable(situation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use olap_dialogue_types::DimensionQualification;

    #[test]
    fn test_event_names_round_trip() {
        for op in Operation::ALL {
            let name = op.event_name();
            let stripped = name.strip_prefix("navigate.").unwrap();
            assert_eq!(Operation::from_name(stripped), Some(op));
        }
        assert_eq!(Operation::DropMeasure.event_name(), "navigate.dropMeasure");
    }

    #[test]
    fn test_without_cube_only_select_cube_is_offered() {
        let offered = offered_operations(&SimpleSituation::default());
        assert_eq!(offered, vec![Operation::SelectCube]);
    }

    #[test]
    fn test_removal_needs_something_to_remove() {
        let mut situation = SimpleSituation::with_cube("cube:sales");
        let offered = offered_operations(&situation);
        assert!(offered.contains(&Operation::AddMeasure));
        assert!(!offered.contains(&Operation::DropMeasure));
        assert!(!offered.contains(&Operation::BroadenSliceCondition));
        assert!(!offered.contains(&Operation::MoveUpDiceNode));

        situation.measures.insert("m:revenue".into());
        let mut dq = DimensionQualification::new("dim:time");
        dq.slice_conditions.insert("sc:2020".into());
        situation.add_dimension_qualification(dq);

        let offered = offered_operations(&situation);
        assert!(offered.contains(&Operation::DropMeasure));
        assert!(offered.contains(&Operation::RefocusMeasure));
        assert!(offered.contains(&Operation::BroadenSliceCondition));
        assert!(!offered.contains(&Operation::BroadenFilter));
    }

    #[test]
    fn test_comparative_part_edits_slots_only() {
        let comparative = ContextFocus::Comparative;
        assert!(Operation::AddMeasure.edits_in(comparative));
        assert!(Operation::NarrowFilter.edits_in(comparative));
        assert!(Operation::RefocusBaseMeasureCondition.edits_in(comparative));
        assert!(!Operation::SelectCube.edits_in(comparative));
        assert!(!Operation::RollUp.edits_in(comparative));
        assert!(!Operation::NarrowSliceCondition.edits_in(comparative));
        assert!(Operation::ALL.iter().all(|op| op.edits_in(ContextFocus::Comparison)));
    }

    #[test]
    fn test_positions_follow_declaration_order() {
        assert_eq!(Operation::SelectCube.position(), 1);
        assert_eq!(Operation::AddMeasure.position(), 2);
        assert!(Operation::DrillDown.position() < Operation::RollUp.position());
    }
}
