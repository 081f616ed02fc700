//! String similarity between user input and option labels.

use super::OptionMatcher;
use olap_dialogue_types::DisplayItem;

/// One option scored against the user's input.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionMatch {
    pub item_id: String,
    pub position: u32,
    pub confidence: f64,
    /// Normalised part of the input that produced the match.
    pub matched: String,
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalised Levenshtein times Jaro-Winkler on normalised text, in `[0, 1]`.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b) * strsim::jaro_winkler(&a, &b)
}

/// Best score of `label` against the whole input or any token window of
/// roughly the label's length. Returns the score and the matched text.
pub fn best_window(input: &str, label: &str) -> (f64, String) {
    let input = normalize(input);
    let label = normalize(label);
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let label_len = label.split_whitespace().count().max(1);

    let mut best = (string_similarity(&input, &label), input.clone());
    let min_size = label_len.saturating_sub(1).max(1);
    for size in min_size..=label_len + 1 {
        if size > tokens.len() {
            break;
        }
        for start in 0..=tokens.len() - size {
            let window = tokens[start..start + size].join(" ");
            let score = string_similarity(&window, &label);
            if score > best.0 {
                best = (score, window);
            }
        }
    }
    best
}

/// [`OptionMatcher`] scoring option titles with [`best_window`].
#[derive(Debug, Clone, Default)]
pub struct StringSimilarityMatcher;

impl OptionMatcher for StringSimilarityMatcher {
    fn option_candidates(&self, input: &str, options: &[DisplayItem]) -> Vec<OptionMatch> {
        options
            .iter()
            .filter_map(|item| {
                let (confidence, matched) = best_window(input, &item.title);
                (confidence > 0.0).then(|| OptionMatch {
                    item_id: item.id.clone(),
                    position: item.position,
                    confidence,
                    matched,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Add   a Measure! "), "add a measure");
        assert_eq!(normalize("year-2020"), "year 2020");
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(string_similarity("Revenue", "revenue"), 1.0);
        assert_eq!(string_similarity("", "revenue"), 0.0);
        let typo = string_similarity("revnue", "revenue");
        assert!(typo > 0.7 && typo < 1.0, "got {typo}");
        assert!(string_similarity("time", "revenue") < 0.3);
    }

    #[test]
    fn test_window_finds_label_inside_sentence() {
        let (score, matched) = best_window("please drop measure revenue", "Drop measure");
        assert_eq!(score, 1.0);
        assert_eq!(matched, "drop measure");
    }

    #[test]
    fn test_matcher_scores_every_option() {
        let options = vec![
            DisplayItem::new("m:revenue", "Revenue", 1),
            DisplayItem::new("m:quantity", "Quantity", 2),
        ];
        let matches = StringSimilarityMatcher.option_candidates("revenue", &options);
        let best = matches
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .unwrap();
        assert_eq!(best.item_id, "m:revenue");
        assert_eq!(best.confidence, 1.0);
    }
}
