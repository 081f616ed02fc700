//! Applying a chosen value to the analysis situation.

use super::operation::{Edit, Operation, Target};
use crate::collaborators::BaseLevel;
use crate::merge::seed_base_levels;
use crate::session::ValueSelection;
use olap_dialogue_types::{
    AnalysisSituation, ContextFocus, DisplayItem, QueryShape, SimpleSituation, SlotType, TOP_LEVEL,
};

/// Result of applying a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
    /// The selection does not fit the operation (e.g. a level without its
    /// dimension).
    Rejected,
}

/// Apply `selection` for `operation` to the part of `situation` in `focus`.
///
/// Selecting a cube for the context of interest resets the situation to
/// that cube; for the context of comparison only that context is reset.
/// Both seed `base_levels`. The comparative part has no cube of its own.
pub fn apply_selection(
    situation: &mut AnalysisSituation,
    focus: ContextFocus,
    operation: Operation,
    selection: &ValueSelection,
    base_levels: &[BaseLevel],
) -> Applied {
    if operation == Operation::SelectCube {
        let ValueSelection::Single { item } = selection else {
            return Applied::Rejected;
        };
        return select_cube(situation, focus, item, base_levels);
    }
    if !operation.edits_in(focus) {
        return Applied::Rejected;
    }

    let before = situation.view(focus);
    let mut view = before.clone();
    let applied = match selection {
        ValueSelection::Single { item } => apply_single(&mut view, operation, item),
        ValueSelection::Pair {
            current,
            replacement,
        } if operation.edit() == Edit::Replace => {
            apply_single(&mut view, remove_variant(operation), current)
                && apply_single(&mut view, add_variant(operation), replacement)
        }
        ValueSelection::Pair { .. } => false,
    };
    if !applied {
        Applied::Rejected
    } else if view == before {
        Applied::Unchanged
    } else {
        situation.store(focus, view);
        Applied::Changed
    }
}

fn select_cube(
    situation: &mut AnalysisSituation,
    focus: ContextFocus,
    item: &DisplayItem,
    base_levels: &[BaseLevel],
) -> Applied {
    match focus {
        ContextFocus::Comparative => Applied::Rejected,
        ContextFocus::Comparison if situation.shape() == QueryShape::Comparative => {
            if situation.view(focus).cube.as_deref() == Some(item.id.as_str()) {
                return Applied::Unchanged;
            }
            let mut context = SimpleSituation::with_cube(item.id.clone());
            seed_base_levels(&mut context, base_levels);
            situation.store(focus, context);
            Applied::Changed
        }
        _ => {
            if situation.cube() == Some(item.id.as_str()) {
                return Applied::Unchanged;
            }
            let mut fresh = AnalysisSituation::empty(situation.shape());
            let contexts: Vec<&mut SimpleSituation> = match &mut fresh {
                AnalysisSituation::Simple(s) => vec![s],
                AnalysisSituation::Comparative(c) => {
                    vec![&mut c.context_of_interest, &mut c.context_of_comparison]
                }
            };
            for context in contexts {
                context.cube = Some(item.id.clone());
                seed_base_levels(context, base_levels);
            }
            *situation = fresh;
            Applied::Changed
        }
    }
}

fn remove_variant(operation: Operation) -> Operation {
    match operation.target() {
        Target::SliceCondition => Operation::BroadenSliceCondition,
        Target::Slot(SlotType::MeasurePredicate) => Operation::BroadenFilter,
        Target::Slot(SlotType::BaseMeasurePredicate) => {
            Operation::BroadenBaseMeasureCondition
        }
        _ => Operation::DropMeasure,
    }
}

fn add_variant(operation: Operation) -> Operation {
    match operation.target() {
        Target::SliceCondition => Operation::NarrowSliceCondition,
        Target::Slot(SlotType::MeasurePredicate) => Operation::NarrowFilter,
        Target::Slot(SlotType::BaseMeasurePredicate) => {
            Operation::NarrowBaseMeasureCondition
        }
        _ => Operation::AddMeasure,
    }
}

/// Returns false when the item cannot be applied.
fn apply_single(focus: &mut SimpleSituation, operation: Operation, item: &DisplayItem) -> bool {
    match operation.target() {
        Target::Cube => false,
        Target::Slot(slot) => {
            let Some(set) = focus.slot_mut(slot) else {
                return false;
            };
            match operation.edit() {
                Edit::Add | Edit::Set => {
                    set.insert(item.id.clone());
                }
                Edit::Remove => {
                    set.remove(&item.id);
                }
                Edit::Replace => return false,
            }
            true
        }
        Target::Granularity => {
            let Some(dimension) = item.dimension.as_deref() else {
                return false;
            };
            focus.dimension_qualification_mut(dimension).granularity_level = item.id.clone();
            true
        }
        Target::DiceNode => {
            let Some(dimension) = item.dimension.as_deref() else {
                return false;
            };
            let dq = focus.dimension_qualification_mut(dimension);
            dq.dice_node = item.id.clone();
            dq.dice_level = item.level.clone().unwrap_or_else(|| TOP_LEVEL.to_string());
            true
        }
        Target::SliceCondition => {
            let Some(dimension) = item.dimension.as_deref() else {
                return false;
            };
            let dq = focus.dimension_qualification_mut(dimension);
            match operation.edit() {
                Edit::Add | Edit::Set => {
                    dq.slice_conditions.insert(item.id.clone());
                }
                Edit::Remove => {
                    dq.slice_conditions.remove(&item.id);
                }
                Edit::Replace => return false,
            }
            true
        }
    }
}
