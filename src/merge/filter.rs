//! Candidate reduction before solving.

use crate::collaborators::string_similarity;
use olap_dialogue_types::{ElementId, Similarity};
use std::collections::HashMap;

/// Drop candidates from cubes other than `cube` once a cube is fixed.
pub fn restrict_to_cube(candidates: Vec<Similarity>, cube: Option<&str>) -> Vec<Similarity> {
    match cube {
        Some(cube) => candidates
            .into_iter()
            .filter(|c| c.source_cube == cube)
            .collect(),
        None => candidates,
    }
}

/// Per term, keep only the candidates whose label reads most like the term.
///
/// Graph lookups return every element loosely related to a word group; the
/// string similarity of the element's label to the term separates the
/// intended element from the rest. Candidates without a known label score
/// zero, so a term whose candidates all lack labels keeps all of them.
/// Input order is preserved.
pub fn keep_best_label_matches(
    candidates: Vec<Similarity>,
    labels: &HashMap<ElementId, String>,
) -> Vec<Similarity> {
    let label_score = |c: &Similarity| -> f64 {
        labels
            .get(&c.element)
            .map_or(0.0, |label| string_similarity(&c.term, label))
    };

    let mut best_per_term: HashMap<&str, f64> = HashMap::new();
    for c in &candidates {
        let score = label_score(c);
        let best = best_per_term.entry(c.term.as_str()).or_insert(score);
        if score > *best {
            *best = score;
        }
    }

    let keep: Vec<bool> = candidates
        .iter()
        .map(|c| {
            let best = best_per_term.get(c.term.as_str()).copied().unwrap_or(0.0);
            label_score(c) >= best
        })
        .collect();

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use olap_dialogue_types::ElementType;

    #[test]
    fn test_keeps_closest_label_per_term() {
        let candidates = vec![
            Similarity::new("revenue", "C1", "m:revenue", ElementType::Measure, 0.7),
            Similarity::new("revenue", "C1", "m:netRevenue", ElementType::Measure, 0.9),
            Similarity::new("year", "C1", "l:year", ElementType::Level, 0.6),
        ];
        let labels = HashMap::from([
            ("m:revenue".to_string(), "Revenue".to_string()),
            ("m:netRevenue".to_string(), "Net revenue after tax".to_string()),
            ("l:year".to_string(), "Year".to_string()),
        ]);

        let kept = keep_best_label_matches(candidates, &labels);
        let elements: Vec<_> = kept.iter().map(|c| c.element.as_str()).collect();
        assert_eq!(elements, vec!["m:revenue", "l:year"]);
    }

    #[test]
    fn test_unlabelled_candidates_survive_together() {
        let candidates = vec![
            Similarity::new("x", "C1", "a", ElementType::Measure, 0.7),
            Similarity::new("x", "C1", "b", ElementType::Measure, 0.9),
        ];
        let kept = keep_best_label_matches(candidates, &HashMap::new());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_restrict_to_cube() {
        let candidates = vec![
            Similarity::new("revenue", "C1", "m1", ElementType::Measure, 0.7),
            Similarity::new("revenue", "C2", "m2", ElementType::Measure, 0.9),
        ];
        let kept = restrict_to_cube(candidates.clone(), Some("C1"));
        assert_eq!(kept.len(), 1);
        assert_eq!(restrict_to_cube(candidates, None).len(), 2);
    }
}
