//! Merging solver solutions into a session's analysis situation.
//!
//! Solved values are suggestions. They only ever fill slots that are still
//! empty; anything the user already set stays as it is.

pub mod filter;

use crate::collaborators::{BaseLevel, SchemaCatalog};
use crate::error::{DialogueError, Result};
use olap_dialogue_types::{
    AnalysisSituation, DimensionQualification, Language, SimpleSituation, SlotType,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub use filter::{keep_best_label_matches, restrict_to_cube};

/// What a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub changed: bool,
    /// The target had no cube and got the solution's.
    pub cube_selected: bool,
}

/// Seed a qualification at the base level for every dimension not yet
/// qualified. Returns the dimensions that were seeded.
pub fn seed_base_levels(into: &mut SimpleSituation, base_levels: &[BaseLevel]) -> BTreeSet<String> {
    base_levels
        .iter()
        .filter(|bl| {
            into.add_dimension_qualification(
                DimensionQualification::new(bl.dimension.clone()).with_granularity(bl.level.clone()),
            )
        })
        .map(|bl| bl.dimension.clone())
        .collect()
}

/// Merge one context. `base_levels` are used only if `into` has no cube.
fn merge_context(
    into: &mut SimpleSituation,
    solution: &SimpleSituation,
    base_levels: &[BaseLevel],
) -> MergeReport {
    let Some(cube) = solution.cube.as_ref().filter(|_| solution.is_cube_defined()) else {
        return MergeReport::default();
    };
    let before = into.clone();

    let mut seeded = BTreeSet::new();
    let cube_selected = match &into.cube {
        None => {
            into.cube = Some(cube.clone());
            seeded = seed_base_levels(into, base_levels);
            true
        }
        Some(current) if current == cube => false,
        Some(_) => return MergeReport::default(),
    };

    for slot in [
        SlotType::Measure,
        SlotType::BaseMeasurePredicate,
        SlotType::MeasurePredicate,
    ] {
        let solved = solution.slot(slot).cloned().unwrap_or_default();
        if let Some(target) = into.slot_mut(slot) {
            if target.is_empty() && !solved.is_empty() {
                *target = solved;
            }
        }
    }

    for (dimension, solved) in &solution.dimension_qualifications {
        let fresh = seeded.contains(dimension) || into.dimension_qualification(dimension).is_none();
        let dq = into.dimension_qualification_mut(dimension);
        if !solved.has_default_granularity() && (fresh || dq.has_default_granularity()) {
            dq.granularity_level = solved.granularity_level.clone();
        }
        if dq.slice_conditions.is_empty() && !solved.slice_conditions.is_empty() {
            dq.slice_conditions = solved.slice_conditions.clone();
        }
    }

    MergeReport {
        changed: *into != before,
        cube_selected,
    }
}

/// Merges solver output using the schema catalog for base levels.
#[derive(Clone)]
pub struct SlotMerger {
    catalog: Arc<dyn SchemaCatalog>,
}

impl SlotMerger {
    pub fn new(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { catalog }
    }

    /// Merge `solution` into `into`.
    ///
    /// The base-level lookup happens before anything is written, so on error
    /// `into` is untouched. An unset solution is a no-op.
    pub async fn merge(
        &self,
        into: &mut AnalysisSituation,
        solution: &AnalysisSituation,
        language: Language,
    ) -> Result<MergeReport> {
        let Some(cube) = solution.cube().filter(|_| solution.is_cube_defined()) else {
            return Ok(MergeReport::default());
        };

        let needs_seed = match into {
            AnalysisSituation::Simple(s) => s.cube.is_none(),
            AnalysisSituation::Comparative(c) => {
                c.context_of_interest.cube.is_none() || c.context_of_comparison.cube.is_none()
            }
        };
        let base_levels = if needs_seed {
            self.catalog
                .base_levels(language, cube)
                .await
                .map_err(|e| DialogueError::collaborator("schema catalog", e))?
        } else {
            Vec::new()
        };

        let report = match (into, solution) {
            (AnalysisSituation::Comparative(into), AnalysisSituation::Comparative(solved)) => {
                let mut report = merge_context(
                    &mut into.context_of_interest,
                    &solved.context_of_interest,
                    &base_levels,
                );
                let comparison = merge_context(
                    &mut into.context_of_comparison,
                    &solved.context_of_comparison,
                    &base_levels,
                );
                report.changed |= comparison.changed;

                // Comparative slots follow the context of interest's cube.
                if into.context_of_interest.cube.as_deref() == Some(cube) {
                    for slot in [
                        SlotType::ComparativeMeasure,
                        SlotType::ComparativeMeasurePredicate,
                        SlotType::JoinConditionPredicate,
                    ] {
                        let solved_set = match slot {
                            SlotType::ComparativeMeasure => &solved.comparative_measures,
                            SlotType::ComparativeMeasurePredicate => {
                                &solved.comparative_measure_predicates
                            }
                            _ => &solved.join_conditions,
                        };
                        if let Some(target) = into.slot_mut(slot) {
                            if target.is_empty() && !solved_set.is_empty() {
                                *target = solved_set.clone();
                                report.changed = true;
                            }
                        }
                    }
                }
                report
            }
            (into, solution) => merge_context(into.focus_mut(), solution.focus(), &base_levels),
        };

        if report.changed {
            tracing::debug!(cube = %cube, cube_selected = report.cube_selected, "Merged solver solution");
        }
        Ok(report)
    }
}

impl std::fmt::Debug for SlotMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotMerger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CubeDef, DimensionDef, InMemoryCubeSchema};
    use olap_dialogue_types::{QueryShape, TOP_LEVEL};

    fn merger() -> SlotMerger {
        let schema = InMemoryCubeSchema::new().cube(
            CubeDef::new("C1", "Sales")
                .measure("m1", "Revenue")
                .measure("m2", "Quantity")
                .dimension(
                    DimensionDef::new("time", "Time")
                        .level("year", "Year")
                        .level("month", "Month"),
                )
                .dimension(DimensionDef::new("geo", "Geography").level("country", "Country")),
        );
        SlotMerger::new(Arc::new(schema))
    }

    fn solution(cube: &str) -> AnalysisSituation {
        let mut s = SimpleSituation::with_cube(cube);
        s.measures.insert("m1".into());
        s.add_dimension_qualification(DimensionQualification::new("time").with_granularity("year"));
        AnalysisSituation::Simple(s)
    }

    #[tokio::test]
    async fn test_unset_solution_is_noop() {
        let mut into = AnalysisSituation::Simple(SimpleSituation::with_cube("C1"));
        let before = into.clone();
        let report = merger()
            .merge(&mut into, &AnalysisSituation::empty(QueryShape::Simple), Language::En)
            .await
            .unwrap();
        assert!(!report.changed);
        assert_eq!(into, before);
    }

    #[tokio::test]
    async fn test_fresh_cube_is_seeded_and_filled() {
        let mut into = AnalysisSituation::default();
        let report = merger()
            .merge(&mut into, &solution("C1"), Language::En)
            .await
            .unwrap();
        assert!(report.changed);
        assert!(report.cube_selected);

        let focus = into.focus();
        assert_eq!(focus.cube.as_deref(), Some("C1"));
        assert!(focus.measures.contains("m1"));
        // solved level overrides the seeded base level
        assert_eq!(focus.dimension_qualification("time").unwrap().granularity_level, "year");
        // unsolved dimension keeps its base level
        assert_eq!(
            focus.dimension_qualification("geo").unwrap().granularity_level,
            "country"
        );
    }

    #[tokio::test]
    async fn test_user_cube_is_never_overwritten() {
        let mut into = AnalysisSituation::Simple(SimpleSituation::with_cube("A"));
        let before = into.clone();
        let report = merger()
            .merge(&mut into, &solution("B"), Language::En)
            .await
            .unwrap();
        assert!(!report.changed);
        assert_eq!(into, before);
    }

    #[tokio::test]
    async fn test_user_slots_are_kept() {
        let mut user = SimpleSituation::with_cube("C1");
        user.measures.insert("m2".into());
        user.add_dimension_qualification(DimensionQualification::new("time").with_granularity("month"));
        let mut into = AnalysisSituation::Simple(user);

        merger()
            .merge(&mut into, &solution("C1"), Language::En)
            .await
            .unwrap();

        let focus = into.focus();
        assert_eq!(focus.measures.len(), 1);
        assert!(focus.measures.contains("m2"));
        assert_eq!(focus.dimension_qualification("time").unwrap().granularity_level, "month");
    }

    #[tokio::test]
    async fn test_default_granularity_accepts_solved_level() {
        let mut user = SimpleSituation::with_cube("C1");
        user.add_dimension_qualification(DimensionQualification::new("time"));
        let mut into = AnalysisSituation::Simple(user);
        assert_eq!(
            into.focus().dimension_qualification("time").unwrap().granularity_level,
            TOP_LEVEL
        );

        let report = merger()
            .merge(&mut into, &solution("C1"), Language::En)
            .await
            .unwrap();
        assert!(report.changed);
        assert!(!report.cube_selected);
        assert_eq!(into.focus().dimension_qualification("time").unwrap().granularity_level, "year");
    }
}
