//! Weighted constraint solver turning scored candidates into an analysis
//! situation.
//!
//! ## Constraints
//!
//! Hard (never broken by a returned solution):
//! - every non-cube selection belongs to the chosen cube
//! - at most one level / level predicate per dimension
//! - only enabled slot types are selected
//! - an element is selected at most once, and a term maps to one element
//!
//! Soft: maximise the sum of selected scores.
//!
//! ## Determinism
//!
//! Candidates are put in canonical order (score descending, then element
//! type, term, element, cube). Roots are tried in order of first appearance
//! in that order and a later assignment only wins with a strictly higher
//! score, so equal-scoring answers resolve to the canonically first one no
//! matter how the input was ordered.

pub mod problem;
pub mod score;
pub mod search;

use crate::config::SolverSettings;
use olap_dialogue_types::{
    AnalysisSituation, ComparativeSituation, ElementType, QueryShape, SimpleSituation, Similarity,
    SlotType,
};
use std::collections::BTreeSet;
use std::time::Duration;

pub use problem::SolverProblem;
pub use score::{evaluate, violations, HardSoftScore, Violation};
use search::{best_subset, Budget};

/// Chosen cube and selections of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSolution {
    pub shape: QueryShape,
    pub cube: Option<String>,
    /// Accepted selections in canonical order.
    pub selections: Vec<Similarity>,
    pub score: HardSoftScore,
    /// The search budget ran out before the search space was covered.
    pub budget_exhausted: bool,
}

impl SolverSolution {
    fn unset(shape: QueryShape) -> Self {
        Self {
            shape,
            cube: None,
            selections: Vec::new(),
            score: HardSoftScore::default(),
            budget_exhausted: false,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.cube.is_none()
    }

    /// The solution as an analysis situation of its shape.
    pub fn to_situation(&self) -> AnalysisSituation {
        let Some(cube) = &self.cube else {
            return AnalysisSituation::empty(self.shape);
        };

        let mut context = SimpleSituation::with_cube(cube.clone());
        let mut comparative = ComparativeSituation::default();
        for s in &self.selections {
            let Some(slot) = s.element_type.slot_type() else {
                continue;
            };
            match (slot, &s.dimension) {
                (SlotType::Level, Some(dim)) => {
                    context.dimension_qualification_mut(dim).granularity_level = s.element.clone();
                }
                (SlotType::LevelPredicate, Some(dim)) => {
                    context
                        .dimension_qualification_mut(dim)
                        .slice_conditions
                        .insert(s.element.clone());
                }
                (SlotType::Level | SlotType::LevelPredicate, None) => {}
                (slot, _) if slot.is_comparative() => {
                    if let Some(set) = comparative.slot_mut(slot) {
                        set.insert(s.element.clone());
                    }
                }
                (slot, _) => {
                    if let Some(set) = context.slot_mut(slot) {
                        set.insert(s.element.clone());
                    }
                }
            }
        }

        match self.shape {
            QueryShape::Simple => AnalysisSituation::Simple(context),
            QueryShape::Comparative => {
                comparative.context_of_interest = context;
                comparative.context_of_comparison = SimpleSituation::with_cube(cube.clone());
                AnalysisSituation::Comparative(comparative)
            }
        }
    }
}

/// Stateless solver; holds only its settings.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSolver {
    settings: SolverSettings,
}

impl ConstraintSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Solve with the slot types enabled in the settings.
    pub fn solve_for_shape(&self, shape: QueryShape, candidates: &[Similarity]) -> SolverSolution {
        let enabled = self.settings.enabled_slot_types(shape);
        self.solve(shape, &enabled, candidates)
    }

    /// Best feasible assignment of `candidates`.
    ///
    /// An empty candidate set yields an unset solution, which callers treat
    /// as "leave the situation unchanged".
    pub fn solve(
        &self,
        shape: QueryShape,
        enabled: &BTreeSet<SlotType>,
        candidates: &[Similarity],
    ) -> SolverSolution {
        let problem = SolverProblem::new(shape, enabled, candidates);
        if problem.is_empty() {
            tracing::debug!("No candidates, returning unset solution");
            return SolverSolution::unset(shape);
        }

        let mut budget = Budget::new(
            self.settings.max_steps,
            self.settings.time_limit_ms.map(Duration::from_millis),
        );

        let mut best: Option<(String, Vec<Similarity>, f64)> = None;
        for root in &problem.roots {
            let pool = problem.pool(root);
            let result = best_subset(&pool, &mut budget);
            let improves = match &best {
                None => true,
                Some((_, _, best_score)) => result.score > best_score + score::SCORE_EPSILON,
            };
            if improves {
                let selections = result
                    .selected
                    .iter()
                    .map(|&idx| pool[idx].clone())
                    .collect();
                best = Some((root.clone(), selections, result.score));
            }
        }

        let Some((cube, selections, _)) = best else {
            return SolverSolution::unset(shape);
        };

        let refs: Vec<&Similarity> = selections.iter().collect();
        let score = evaluate(&problem.enabled, Some(cube.as_str()), &refs);
        if !score.is_feasible() {
            // Search only builds compatible subsets; reaching this is a bug.
            tracing::error!(cube = %cube, hard = score.hard, "Solver produced an infeasible assignment");
        }
        if budget.is_exhausted() {
            tracing::debug!(
                steps = budget.steps(),
                roots = problem.roots.len(),
                "Solver budget exhausted, returning best assignment so far"
            );
        }
        tracing::debug!(
            cube = %cube,
            selections = selections.len(),
            soft = score.soft,
            "Solved analysis situation"
        );

        SolverSolution {
            shape,
            cube: Some(cube),
            selections,
            score,
            budget_exhausted: budget.is_exhausted(),
        }
    }
}

/// Cube candidates in a solution don't fill a slot; handy for callers that
/// only care about slot selections.
pub fn slot_selections(solution: &SolverSolution) -> impl Iterator<Item = &Similarity> {
    solution
        .selections
        .iter()
        .filter(|s| s.element_type != ElementType::Cube)
}
