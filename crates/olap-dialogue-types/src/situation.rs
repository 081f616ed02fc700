//! The analysis situation: the multidimensional query under construction.

use crate::{ElementId, SlotType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Level used when a dimension is not rolled up or drilled into.
pub const TOP_LEVEL: &str = "http://dke.jku.at/ida/constants#top";

/// Dice node meaning "no dice restriction".
pub const ALL_NODES: &str = "http://dke.jku.at/ida/constants#all";

// ============================================================================
// QUERY SHAPE
// ============================================================================

/// Whether a query compares two contexts or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    #[default]
    Simple,
    Comparative,
}

// ============================================================================
// CONTEXT FOCUS
// ============================================================================

/// Part of a comparative situation the dialogue currently edits.
///
/// Simple situations have a single context and ignore the focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextFocus {
    #[default]
    Interest,
    Comparison,
    /// Comparative measures, comparative predicates and join conditions.
    Comparative,
}

impl ContextFocus {
    pub const ALL: [ContextFocus; 3] = [
        ContextFocus::Interest,
        ContextFocus::Comparison,
        ContextFocus::Comparative,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ContextFocus::Interest => "interest",
            ContextFocus::Comparison => "comparison",
            ContextFocus::Comparative => "comparative",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

// ============================================================================
// DIMENSION QUALIFICATION
// ============================================================================

/// Granularity, dice and slice settings for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionQualification {
    pub dimension: ElementId,
    pub granularity_level: ElementId,
    pub dice_level: ElementId,
    pub dice_node: ElementId,
    #[serde(default)]
    pub slice_conditions: BTreeSet<ElementId>,
}

impl DimensionQualification {
    /// Qualification with every setting at its default.
    pub fn new(dimension: impl Into<ElementId>) -> Self {
        Self {
            dimension: dimension.into(),
            granularity_level: TOP_LEVEL.to_string(),
            dice_level: TOP_LEVEL.to_string(),
            dice_node: ALL_NODES.to_string(),
            slice_conditions: BTreeSet::new(),
        }
    }

    pub fn with_granularity(mut self, level: impl Into<ElementId>) -> Self {
        self.granularity_level = level.into();
        self
    }

    /// Granularity still at the "top" default.
    pub fn has_default_granularity(&self) -> bool {
        self.granularity_level == TOP_LEVEL
    }

    pub fn is_diced(&self) -> bool {
        self.dice_node != ALL_NODES
    }
}

// ============================================================================
// SIMPLE SITUATION
// ============================================================================

/// A single (non-comparative) query context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleSituation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cube: Option<ElementId>,
    #[serde(default)]
    pub measures: BTreeSet<ElementId>,
    #[serde(default)]
    pub base_measure_conditions: BTreeSet<ElementId>,
    /// Aggregate measure predicates ("filters").
    #[serde(default)]
    pub measure_predicates: BTreeSet<ElementId>,
    /// Keyed by dimension, so each dimension is qualified at most once.
    #[serde(default)]
    pub dimension_qualifications: BTreeMap<ElementId, DimensionQualification>,
}

impl SimpleSituation {
    pub fn with_cube(cube: impl Into<ElementId>) -> Self {
        Self {
            cube: Some(cube.into()),
            ..Default::default()
        }
    }

    pub fn is_cube_defined(&self) -> bool {
        self.cube.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Cube and at least one measure are set, and every qualified dimension
    /// has a granularity level.
    pub fn is_executable(&self) -> bool {
        self.is_cube_defined()
            && !self.measures.is_empty()
            && self
                .dimension_qualifications
                .values()
                .all(|dq| !dq.granularity_level.is_empty())
    }

    pub fn dimension_qualification(&self, dimension: &str) -> Option<&DimensionQualification> {
        self.dimension_qualifications.get(dimension)
    }

    /// Add a qualification for a dimension that has none yet.
    ///
    /// Returns `false` (and leaves the situation unchanged) if the dimension
    /// is already qualified.
    pub fn add_dimension_qualification(&mut self, dq: DimensionQualification) -> bool {
        if self.dimension_qualifications.contains_key(&dq.dimension) {
            return false;
        }
        self.dimension_qualifications.insert(dq.dimension.clone(), dq);
        true
    }

    /// Qualification for `dimension`, created with defaults when missing.
    pub fn dimension_qualification_mut(&mut self, dimension: &str) -> &mut DimensionQualification {
        self.dimension_qualifications
            .entry(dimension.to_string())
            .or_insert_with(|| DimensionQualification::new(dimension))
    }

    /// Element set backing a non-dimension slot of this context.
    pub fn slot(&self, slot: SlotType) -> Option<&BTreeSet<ElementId>> {
        match slot {
            SlotType::Measure => Some(&self.measures),
            SlotType::BaseMeasurePredicate => Some(&self.base_measure_conditions),
            SlotType::MeasurePredicate => Some(&self.measure_predicates),
            _ => None,
        }
    }

    pub fn slot_mut(&mut self, slot: SlotType) -> Option<&mut BTreeSet<ElementId>> {
        match slot {
            SlotType::Measure => Some(&mut self.measures),
            SlotType::BaseMeasurePredicate => Some(&mut self.base_measure_conditions),
            SlotType::MeasurePredicate => Some(&mut self.measure_predicates),
            _ => None,
        }
    }

    /// All slice conditions across dimensions, with their dimension.
    pub fn slice_conditions(&self) -> impl Iterator<Item = (&ElementId, &ElementId)> {
        self.dimension_qualifications
            .values()
            .flat_map(|dq| dq.slice_conditions.iter().map(move |s| (&dq.dimension, s)))
    }
}

// ============================================================================
// COMPARATIVE SITUATION
// ============================================================================

/// Two query contexts compared through comparative measures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparativeSituation {
    pub context_of_interest: SimpleSituation,
    pub context_of_comparison: SimpleSituation,
    #[serde(default)]
    pub comparative_measures: BTreeSet<ElementId>,
    #[serde(default)]
    pub comparative_measure_predicates: BTreeSet<ElementId>,
    #[serde(default)]
    pub join_conditions: BTreeSet<ElementId>,
}

impl ComparativeSituation {
    pub fn slot_mut(&mut self, slot: SlotType) -> Option<&mut BTreeSet<ElementId>> {
        match slot {
            SlotType::ComparativeMeasure => Some(&mut self.comparative_measures),
            SlotType::ComparativeMeasurePredicate => Some(&mut self.comparative_measure_predicates),
            SlotType::JoinConditionPredicate => Some(&mut self.join_conditions),
            other => self.context_of_interest.slot_mut(other),
        }
    }
}

// ============================================================================
// ANALYSIS SITUATION
// ============================================================================

/// The query under construction for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisSituation {
    Simple(SimpleSituation),
    Comparative(ComparativeSituation),
}

impl Default for AnalysisSituation {
    fn default() -> Self {
        AnalysisSituation::Simple(SimpleSituation::default())
    }
}

impl AnalysisSituation {
    /// Empty situation of the given shape.
    pub fn empty(shape: QueryShape) -> Self {
        match shape {
            QueryShape::Simple => AnalysisSituation::Simple(SimpleSituation::default()),
            QueryShape::Comparative => {
                AnalysisSituation::Comparative(ComparativeSituation::default())
            }
        }
    }

    pub fn shape(&self) -> QueryShape {
        match self {
            AnalysisSituation::Simple(_) => QueryShape::Simple,
            AnalysisSituation::Comparative(_) => QueryShape::Comparative,
        }
    }

    /// Context the dialogue edits: the situation itself, or the context of
    /// interest of a comparison.
    pub fn focus(&self) -> &SimpleSituation {
        match self {
            AnalysisSituation::Simple(s) => s,
            AnalysisSituation::Comparative(c) => &c.context_of_interest,
        }
    }

    pub fn focus_mut(&mut self) -> &mut SimpleSituation {
        match self {
            AnalysisSituation::Simple(s) => s,
            AnalysisSituation::Comparative(c) => &mut c.context_of_interest,
        }
    }

    pub fn cube(&self) -> Option<&str> {
        self.focus().cube.as_deref()
    }

    /// Editable copy of the focused part.
    ///
    /// The comparative part is presented as a context on the cube of
    /// interest: its measures, filters and base measure conditions are the
    /// comparative measures, comparative predicates and join conditions.
    pub fn view(&self, focus: ContextFocus) -> SimpleSituation {
        match (self, focus) {
            (AnalysisSituation::Simple(s), _) => s.clone(),
            (AnalysisSituation::Comparative(c), ContextFocus::Interest) => {
                c.context_of_interest.clone()
            }
            (AnalysisSituation::Comparative(c), ContextFocus::Comparison) => {
                c.context_of_comparison.clone()
            }
            (AnalysisSituation::Comparative(c), ContextFocus::Comparative) => SimpleSituation {
                cube: c.context_of_interest.cube.clone(),
                measures: c.comparative_measures.clone(),
                base_measure_conditions: c.join_conditions.clone(),
                measure_predicates: c.comparative_measure_predicates.clone(),
                dimension_qualifications: BTreeMap::new(),
            },
        }
    }

    /// Write back a view taken with [`view`](Self::view) for the same focus.
    pub fn store(&mut self, focus: ContextFocus, view: SimpleSituation) {
        match (self, focus) {
            (AnalysisSituation::Simple(s), _) => *s = view,
            (AnalysisSituation::Comparative(c), ContextFocus::Interest) => {
                c.context_of_interest = view
            }
            (AnalysisSituation::Comparative(c), ContextFocus::Comparison) => {
                c.context_of_comparison = view
            }
            (AnalysisSituation::Comparative(c), ContextFocus::Comparative) => {
                c.comparative_measures = view.measures;
                c.comparative_measure_predicates = view.measure_predicates;
                c.join_conditions = view.base_measure_conditions;
            }
        }
    }

    /// Cube check for the focused part; the comparative part shares the
    /// cube of interest.
    pub fn is_cube_defined_in(&self, focus: ContextFocus) -> bool {
        match (self, focus) {
            (AnalysisSituation::Comparative(c), ContextFocus::Comparison) => {
                c.context_of_comparison.is_cube_defined()
            }
            _ => self.is_cube_defined(),
        }
    }

    pub fn is_cube_defined(&self) -> bool {
        self.focus().is_cube_defined()
    }

    pub fn is_executable(&self) -> bool {
        match self {
            AnalysisSituation::Simple(s) => s.is_executable(),
            AnalysisSituation::Comparative(c) => {
                c.context_of_interest.is_executable() && c.context_of_comparison.is_cube_defined()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_qualification_defaults() {
        let dq = DimensionQualification::new("dim:time");
        assert_eq!(dq.granularity_level, TOP_LEVEL);
        assert_eq!(dq.dice_level, TOP_LEVEL);
        assert_eq!(dq.dice_node, ALL_NODES);
        assert!(dq.has_default_granularity());
        assert!(!dq.is_diced());
    }

    #[test]
    fn test_one_qualification_per_dimension() {
        let mut s = SimpleSituation::with_cube("cube:sales");
        assert!(s.add_dimension_qualification(DimensionQualification::new("dim:time")));
        assert!(!s.add_dimension_qualification(
            DimensionQualification::new("dim:time").with_granularity("lvl:year")
        ));
        assert_eq!(s.dimension_qualifications.len(), 1);
        assert!(s.dimension_qualification("dim:time").unwrap().has_default_granularity());
    }

    #[test]
    fn test_executable_requires_cube_and_measure() {
        let mut s = SimpleSituation::default();
        assert!(!s.is_executable());
        s.cube = Some("  ".into());
        assert!(!s.is_cube_defined());
        s.cube = Some("cube:sales".into());
        assert!(s.is_cube_defined());
        assert!(!s.is_executable());
        s.measures.insert("m:revenue".into());
        assert!(s.is_executable());
    }

    #[test]
    fn test_serde_tagging() {
        let situation = AnalysisSituation::Simple(SimpleSituation::with_cube("cube:sales"));
        let json = serde_json::to_value(&situation).unwrap();
        assert_eq!(json["type"], "simple");
        assert_eq!(json["cube"], "cube:sales");

        let back: AnalysisSituation = serde_json::from_value(json).unwrap();
        assert_eq!(back, situation);
    }

    #[test]
    fn test_views_follow_focus() {
        let mut situation = AnalysisSituation::empty(QueryShape::Comparative);
        situation.focus_mut().cube = Some("cube:sales".into());
        assert!(!situation.is_cube_defined_in(ContextFocus::Comparison));
        assert!(situation.is_cube_defined_in(ContextFocus::Comparative));

        let mut comparative = situation.view(ContextFocus::Comparative);
        assert_eq!(comparative.cube.as_deref(), Some("cube:sales"));
        comparative.measures.insert("m:revenueShare".into());
        comparative.base_measure_conditions.insert("jc:sameRegion".into());
        situation.store(ContextFocus::Comparative, comparative);

        let mut comparison = situation.view(ContextFocus::Comparison);
        comparison.cube = Some("cube:sales".into());
        comparison.measures.insert("m:revenue".into());
        situation.store(ContextFocus::Comparison, comparison);

        let AnalysisSituation::Comparative(c) = &situation else {
            panic!("Expected comparative situation");
        };
        assert!(c.comparative_measures.contains("m:revenueShare"));
        assert!(c.join_conditions.contains("jc:sameRegion"));
        assert!(c.context_of_comparison.measures.contains("m:revenue"));
        assert!(c.context_of_interest.measures.is_empty());
    }

    #[test]
    fn test_simple_situation_ignores_focus() {
        let mut situation = AnalysisSituation::Simple(SimpleSituation::with_cube("cube:sales"));
        let mut view = situation.view(ContextFocus::Comparison);
        view.measures.insert("m:revenue".into());
        situation.store(ContextFocus::Comparison, view);
        assert!(situation.focus().measures.contains("m:revenue"));
        assert_eq!(ContextFocus::from_name("comparative"), Some(ContextFocus::Comparative));
    }

    #[test]
    fn test_comparative_focus() {
        let mut situation = AnalysisSituation::empty(QueryShape::Comparative);
        situation.focus_mut().cube = Some("cube:sales".into());
        assert!(situation.is_cube_defined());
        assert_eq!(situation.cube(), Some("cube:sales"));
        assert_eq!(situation.shape(), QueryShape::Comparative);
    }
}
