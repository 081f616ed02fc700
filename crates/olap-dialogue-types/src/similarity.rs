//! Scored candidate matches between user terms and schema elements.

use crate::ElementId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// ELEMENT TYPES
// ============================================================================

/// Kind of schema element a candidate points at.
///
/// Declaration order is significant: it is the secondary sort key of the
/// canonical candidate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Cube,
    /// Aggregate measure.
    Measure,
    Level,
    LevelPredicate,
    BaseMeasurePredicate,
    /// Aggregate measure predicate, shown to users as a "filter".
    MeasurePredicate,
    ComparativeMeasure,
    ComparativeMeasurePredicate,
    JoinConditionPredicate,
}

impl ElementType {
    pub const ALL: [ElementType; 9] = [
        ElementType::Cube,
        ElementType::Measure,
        ElementType::Level,
        ElementType::LevelPredicate,
        ElementType::BaseMeasurePredicate,
        ElementType::MeasurePredicate,
        ElementType::ComparativeMeasure,
        ElementType::ComparativeMeasurePredicate,
        ElementType::JoinConditionPredicate,
    ];

    /// Slot this element fills, `None` for cubes.
    pub fn slot_type(self) -> Option<SlotType> {
        match self {
            ElementType::Cube => None,
            ElementType::Measure => Some(SlotType::Measure),
            ElementType::Level => Some(SlotType::Level),
            ElementType::LevelPredicate => Some(SlotType::LevelPredicate),
            ElementType::BaseMeasurePredicate => Some(SlotType::BaseMeasurePredicate),
            ElementType::MeasurePredicate => Some(SlotType::MeasurePredicate),
            ElementType::ComparativeMeasure => Some(SlotType::ComparativeMeasure),
            ElementType::ComparativeMeasurePredicate => {
                Some(SlotType::ComparativeMeasurePredicate)
            }
            ElementType::JoinConditionPredicate => Some(SlotType::JoinConditionPredicate),
        }
    }

    /// Schema type IRI used by the graph store.
    pub fn iri(self) -> &'static str {
        match self {
            ElementType::Cube => "http://dke.jku.at/inga/cubes#BaseCube",
            ElementType::Measure => "http://dke.jku.at/inga/cubes#AggregateMeasure",
            ElementType::Level => "http://dke.jku.at/inga/cubes#Level",
            ElementType::LevelPredicate => "http://dke.jku.at/inga/cubes#LevelPredicate",
            ElementType::BaseMeasurePredicate => {
                "http://dke.jku.at/inga/cubes#BaseMeasurePredicate"
            }
            ElementType::MeasurePredicate => {
                "http://dke.jku.at/inga/cubes#AggregateMeasurePredicate"
            }
            ElementType::ComparativeMeasure => "http://dke.jku.at/inga/cubes#ComparativeMeasure",
            ElementType::ComparativeMeasurePredicate => {
                "http://dke.jku.at/inga/cubes#ComparativeMeasurePredicate"
            }
            ElementType::JoinConditionPredicate => {
                "http://dke.jku.at/inga/cubes#JoinConditionPredicate"
            }
        }
    }

    pub fn from_iri(iri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.iri() == iri)
    }
}

/// A fillable slot of an analysis situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Measure,
    Level,
    LevelPredicate,
    BaseMeasurePredicate,
    MeasurePredicate,
    ComparativeMeasure,
    ComparativeMeasurePredicate,
    JoinConditionPredicate,
}

impl SlotType {
    /// Slots that qualify a dimension and therefore compete per dimension.
    pub fn is_dimension_qualifying(self) -> bool {
        matches!(self, SlotType::Level | SlotType::LevelPredicate)
    }

    /// Slots that only exist in comparative situations.
    pub fn is_comparative(self) -> bool {
        matches!(
            self,
            SlotType::ComparativeMeasure
                | SlotType::ComparativeMeasurePredicate
                | SlotType::JoinConditionPredicate
        )
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotType::Measure => "measure",
            SlotType::Level => "level",
            SlotType::LevelPredicate => "level_predicate",
            SlotType::BaseMeasurePredicate => "base_measure_predicate",
            SlotType::MeasurePredicate => "measure_predicate",
            SlotType::ComparativeMeasure => "comparative_measure",
            SlotType::ComparativeMeasurePredicate => "comparative_measure_predicate",
            SlotType::JoinConditionPredicate => "join_condition_predicate",
        };
        f.write_str(name)
    }
}

// ============================================================================
// SIMILARITY
// ============================================================================

/// A scored mapping from a user term (word group) to a schema element.
///
/// Immutable value object shared between the lookup, the solver and the
/// merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    /// Word group the match was found for.
    pub term: String,
    /// Cube the element belongs to. For cube candidates this is the cube itself.
    pub source_cube: ElementId,
    pub element: ElementId,
    pub element_type: ElementType,
    /// Dimension qualified by a level or level predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<ElementId>,
    /// Match quality in `[0, 1]`.
    pub score: f64,
}

impl Similarity {
    pub fn new(
        term: impl Into<String>,
        source_cube: impl Into<ElementId>,
        element: impl Into<ElementId>,
        element_type: ElementType,
        score: f64,
    ) -> Self {
        Self {
            term: term.into(),
            source_cube: source_cube.into(),
            element: element.into(),
            element_type,
            dimension: None,
            score,
        }
    }

    /// Candidate for a cube itself.
    pub fn cube(term: impl Into<String>, cube: impl Into<ElementId>, score: f64) -> Self {
        let cube = cube.into();
        Self::new(term, cube.clone(), cube, ElementType::Cube, score)
    }

    /// Attach the dimension a level or level predicate belongs to.
    pub fn with_dimension(mut self, dimension: impl Into<ElementId>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    /// Score is finite and within `[0, 1]`.
    pub fn has_valid_score(&self) -> bool {
        self.score.is_finite() && (0.0..=1.0).contains(&self.score)
    }

    /// Canonical candidate order: score descending, then element type, then
    /// term, element and source cube lexically.
    ///
    /// This is a total order, so sorting by it is independent of the order
    /// candidates arrived in.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.element_type.cmp(&other.element_type))
            .then_with(|| self.term.cmp(&other.term))
            .then_with(|| self.element.cmp(&other.element))
            .then_with(|| self.source_cube.cmp(&other.source_cube))
            .then_with(|| self.dimension.cmp(&other.dimension))
    }
}
