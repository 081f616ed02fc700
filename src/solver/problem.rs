//! Solver input: validated candidates in canonical order.

use olap_dialogue_types::{ElementType, QueryShape, Similarity, SlotType};
use std::collections::BTreeSet;

/// Candidates prepared for one solve.
#[derive(Debug, Clone)]
pub struct SolverProblem {
    pub shape: QueryShape,
    pub enabled: BTreeSet<SlotType>,
    /// Root cube choices, in order of first appearance in canonical order.
    pub roots: Vec<String>,
    /// Selectable candidates, canonical order, duplicates removed.
    pub candidates: Vec<Similarity>,
}

impl SolverProblem {
    pub fn new(shape: QueryShape, enabled: &BTreeSet<SlotType>, candidates: &[Similarity]) -> Self {
        let enabled: BTreeSet<SlotType> = enabled
            .iter()
            .copied()
            .filter(|slot| shape == QueryShape::Comparative || !slot.is_comparative())
            .collect();

        let mut valid: Vec<Similarity> = candidates
            .iter()
            .filter(|c| {
                if c.has_valid_score() {
                    true
                } else {
                    tracing::warn!(term = %c.term, element = %c.element, score = c.score, "Dropping candidate with invalid score");
                    false
                }
            })
            .cloned()
            .collect();
        valid.sort_by(Similarity::canonical_cmp);
        valid.dedup();

        let mut roots: Vec<String> = Vec::new();
        for c in &valid {
            if !roots.contains(&c.source_cube) {
                roots.push(c.source_cube.clone());
            }
        }

        let candidates = valid
            .into_iter()
            .filter(|c| is_selectable(c, &enabled))
            .collect();

        Self {
            shape,
            enabled,
            roots,
            candidates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Candidates that may be selected when `root` is the chosen cube.
    pub fn pool(&self, root: &str) -> Vec<&Similarity> {
        self.candidates
            .iter()
            .filter(|c| c.source_cube == root)
            .collect()
    }
}

fn is_selectable(c: &Similarity, enabled: &BTreeSet<SlotType>) -> bool {
    match c.element_type.slot_type() {
        None => {
            if c.element_type == ElementType::Cube && c.element != c.source_cube {
                tracing::warn!(element = %c.element, cube = %c.source_cube, "Cube candidate not pointing at its own cube");
                return false;
            }
            true
        }
        Some(slot) if !enabled.contains(&slot) => false,
        Some(slot) if slot.is_dimension_qualifying() && c.dimension.is_none() => {
            tracing::warn!(element = %c.element, "Dimension-qualifying candidate without dimension");
            false
        }
        Some(_) => true,
    }
}
