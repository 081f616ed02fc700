//! Pure score function for candidate assignments.
//!
//! Kept separate from the search so it can be checked on arbitrary
//! assignments, including infeasible ones the search would never produce.

use olap_dialogue_types::{ElementType, Similarity, SlotType};
use std::collections::{BTreeSet, HashSet};

/// Slack for comparing float score sums.
pub const SCORE_EPSILON: f64 = 1e-9;

/// Hard constraint violations count negatively; soft is the score sum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HardSoftScore {
    pub hard: i64,
    pub soft: f64,
}

impl HardSoftScore {
    pub fn is_feasible(&self) -> bool {
        self.hard == 0
    }

    /// Strictly better: fewer violations, or as many and a higher soft score.
    pub fn is_better_than(&self, other: &HardSoftScore) -> bool {
        self.hard > other.hard || (self.hard == other.hard && self.soft > other.soft + SCORE_EPSILON)
    }
}

/// A broken hard constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Selection from a cube other than the chosen one, or with no cube chosen.
    ForeignCube { element: String },
    /// Two dimension-qualifying selections for one dimension.
    SharedDimension { dimension: String },
    /// Level or level predicate without a dimension.
    MissingDimension { element: String },
    /// Slot type not enabled for this solve.
    DisabledSlot { element: String },
    DuplicateElement { element: String },
    /// One term mapped to more than one element.
    TermReused { term: String },
}

/// Every hard constraint the assignment breaks.
pub fn violations(
    enabled: &BTreeSet<SlotType>,
    cube: Option<&str>,
    selections: &[&Similarity],
) -> Vec<Violation> {
    let mut found = Vec::new();
    let mut dimensions = HashSet::new();
    let mut elements = HashSet::new();
    let mut terms = HashSet::new();

    for s in selections {
        let in_cube = match (cube, s.element_type) {
            (Some(cube), ElementType::Cube) => s.element == cube,
            (Some(cube), _) => s.source_cube == cube,
            (None, _) => false,
        };
        if !in_cube {
            found.push(Violation::ForeignCube {
                element: s.element.clone(),
            });
        }

        if let Some(slot) = s.element_type.slot_type() {
            if !enabled.contains(&slot) {
                found.push(Violation::DisabledSlot {
                    element: s.element.clone(),
                });
            }
            if slot.is_dimension_qualifying() {
                match &s.dimension {
                    Some(dim) if !dimensions.insert(dim.as_str()) => {
                        found.push(Violation::SharedDimension {
                            dimension: dim.clone(),
                        })
                    }
                    Some(_) => {}
                    None => found.push(Violation::MissingDimension {
                        element: s.element.clone(),
                    }),
                }
            }
        }

        if !elements.insert(s.element.as_str()) {
            found.push(Violation::DuplicateElement {
                element: s.element.clone(),
            });
        }
        if !terms.insert(s.term.as_str()) {
            found.push(Violation::TermReused {
                term: s.term.clone(),
            });
        }
    }
    found
}

/// Score an assignment.
pub fn evaluate(
    enabled: &BTreeSet<SlotType>,
    cube: Option<&str>,
    selections: &[&Similarity],
) -> HardSoftScore {
    HardSoftScore {
        hard: -(violations(enabled, cube, selections).len() as i64),
        soft: selections.iter().map(|s| s.score).sum(),
    }
}
