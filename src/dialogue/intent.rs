//! Resolving free text against the options on screen.
//!
//! Inputs can pick an option by number ("2"), by a numbered phrase
//! ("option two", "second option", "zweite Option"), by text similar to the
//! option's title, or name a control intent ("exit", "go back").
//!
//! Results are ranked by confidence, then display position, then id, so two
//! options with the same confidence always resolve the same way.

use super::operation::ControlIntent;
use crate::collaborators::matcher::{best_window, normalize};
use crate::collaborators::OptionMatcher;
use olap_dialogue_types::{DisplayItem, Language};
use std::collections::HashSet;

/// Position given to control intents that are not on screen.
const HIDDEN_POSITION: u32 = u32::MAX;

const ORDINALS_EN: [(&str, &str); 10] = [
    ("one", "first"),
    ("two", "second"),
    ("three", "third"),
    ("four", "fourth"),
    ("five", "fifth"),
    ("six", "sixth"),
    ("seven", "seventh"),
    ("eight", "eighth"),
    ("nine", "ninth"),
    ("ten", "tenth"),
];

const ORDINALS_DE: [(&str, &str); 10] = [
    ("eins", "erste"),
    ("zwei", "zweite"),
    ("drei", "dritte"),
    ("vier", "vierte"),
    ("fünf", "fünfte"),
    ("sechs", "sechste"),
    ("sieben", "siebte"),
    ("acht", "achte"),
    ("neun", "neunte"),
    ("zehn", "zehnte"),
];

/// Words that may surround a number without changing its meaning.
const FILLERS: &[&str] = &[
    "option", "the", "number", "no", "nr", "choice", "item", "take", "nummer", "die", "der",
    "das", "wahl", "auswahl", "nehme", "ich",
];

const CONJUNCTIONS: &[&str] = &["and", "with", "by", "und", "mit", "durch"];

/// A scored option.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub id: String,
    pub position: u32,
    pub confidence: f64,
    /// Normalised part of the input that matched.
    pub matched: String,
}

/// Outcome of resolving one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Control(ControlIntent, Ranked),
    Item(Ranked),
    /// Nothing matched confidently.
    NoMatch,
}

fn ordinal_value(token: &str, language: Language) -> Option<u32> {
    let table = match language {
        Language::En => &ORDINALS_EN,
        Language::De => &ORDINALS_DE,
    };
    table.iter().enumerate().find_map(|(idx, (cardinal, ordinal))| {
        let declined = language == Language::De && is_declined(token, ordinal);
        (token == *cardinal || token == *ordinal || declined).then_some(idx as u32 + 1)
    })
}

/// German ordinal with a declension ending: zweiten, zweiter, zweites, zweitem.
fn is_declined(token: &str, ordinal: &str) -> bool {
    token
        .strip_prefix(ordinal)
        .is_some_and(|ending| matches!(ending, "n" | "r" | "s" | "m"))
}

/// A number written as digits ("2", "2nd") or as a word.
pub fn parse_number(token: &str, language: Language) -> Option<u32> {
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        let suffix = &token[digits.len()..];
        if matches!(suffix, "" | "st" | "nd" | "rd" | "th") {
            return digits.parse().ok();
        }
        return None;
    }
    ordinal_value(token, language)
}

fn significant_tokens(input: &str) -> Vec<String> {
    normalize(input)
        .split_whitespace()
        .filter(|t| !FILLERS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Position picked by a numbered answer, e.g. "2", "option two", "second".
pub fn numbered_selection(input: &str, language: Language) -> Option<u32> {
    match significant_tokens(input).as_slice() {
        [only] => parse_number(only, language),
        _ => None,
    }
}

/// Two positions, e.g. "1,3" or "one and three", for two-list displays.
pub fn pair_selection(input: &str, language: Language) -> Option<(u32, u32)> {
    let tokens: Vec<String> = significant_tokens(input)
        .into_iter()
        .filter(|t| !CONJUNCTIONS.contains(&t.as_str()))
        .collect();
    match tokens.as_slice() {
        [a, b] => Some((parse_number(a, language)?, parse_number(b, language)?)),
        _ => None,
    }
}

/// Rank displayed items and control intents against `input`.
///
/// Results below `min_confidence` are dropped; each id appears once with its
/// best confidence.
pub fn rank_options(
    input: &str,
    items: &[DisplayItem],
    controls: &[ControlIntent],
    language: Language,
    matcher: &dyn OptionMatcher,
    min_confidence: f64,
) -> Vec<Ranked> {
    let mut results = Vec::new();

    if let Some(position) = numbered_selection(input, language) {
        if let Some(item) = items.iter().find(|i| i.position == position) {
            results.push(Ranked {
                id: item.id.clone(),
                position,
                confidence: 1.0,
                matched: normalize(input),
            });
        }
    }

    results.extend(
        matcher
            .option_candidates(input, items)
            .into_iter()
            .map(|m| Ranked {
                id: m.item_id,
                position: m.position,
                confidence: m.confidence,
                matched: m.matched,
            }),
    );

    for control in controls {
        let position = items
            .iter()
            .find(|i| i.id == control.name())
            .map_or(HIDDEN_POSITION, |i| i.position);
        let phrases = std::iter::once(control.display_name(language))
            .chain(control.synonyms(language).iter().copied());
        for phrase in phrases {
            let (confidence, matched) = best_window(input, phrase);
            results.push(Ranked {
                id: control.name().to_string(),
                position,
                confidence,
                matched,
            });
        }
    }

    results.retain(|r| r.confidence >= min_confidence);
    results.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.position.cmp(&b.position))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut seen = HashSet::new();
    results.retain(|r| seen.insert(r.id.clone()));
    results
}

/// The single best result.
pub fn resolve(ranked: &[Ranked]) -> Resolution {
    match ranked.first() {
        None => Resolution::NoMatch,
        Some(top) => match ControlIntent::from_name(&top.id) {
            Some(control) => Resolution::Control(control, top.clone()),
            None => Resolution::Item(top.clone()),
        },
    }
}

/// Pick one item from each list of a two-list display.
pub fn resolve_pair(
    input: &str,
    left: &[DisplayItem],
    right: &[DisplayItem],
    language: Language,
    matcher: &dyn OptionMatcher,
    min_confidence: f64,
) -> Option<(DisplayItem, DisplayItem)> {
    if let Some((a, b)) = pair_selection(input, language) {
        let current = left.iter().find(|i| i.position == a)?;
        let replacement = right.iter().find(|i| i.position == b)?;
        return Some((current.clone(), replacement.clone()));
    }

    let best = |items: &[DisplayItem]| -> Option<DisplayItem> {
        let ranked = rank_options(input, items, &[], language, matcher, min_confidence);
        let top = ranked.first()?;
        items.iter().find(|i| i.id == top.id).cloned()
    };
    let current = best(left)?;
    let replacement = best(right)?;
    (current.id != replacement.id).then_some((current, replacement))
}

/// Input with the matched words removed, if anything meaningful is left.
pub fn remainder(input: &str, matched: &str) -> Option<String> {
    let input = normalize(input);
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let needle: Vec<&str> = matched.split_whitespace().collect();
    if needle.is_empty() || needle.len() >= tokens.len() {
        return None;
    }
    let start = tokens.windows(needle.len()).position(|w| w == needle.as_slice())?;
    let rest: Vec<&str> = tokens[..start]
        .iter()
        .chain(tokens[start + needle.len()..].iter())
        .copied()
        .filter(|t| !FILLERS.contains(t))
        .collect();
    (!rest.is_empty()).then(|| rest.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::StringSimilarityMatcher;

    fn items() -> Vec<DisplayItem> {
        vec![
            DisplayItem::new("m:revenue", "Revenue", 1),
            DisplayItem::new("m:quantity", "Quantity", 2),
            DisplayItem::new("m:costs", "Costs", 3),
        ]
    }

    #[test]
    fn test_numbered_phrases() {
        assert_eq!(numbered_selection("2", Language::En), Some(2));
        assert_eq!(numbered_selection("option two", Language::En), Some(2));
        assert_eq!(numbered_selection("the second option", Language::En), Some(2));
        assert_eq!(numbered_selection("second", Language::En), Some(2));
        assert_eq!(numbered_selection("option 3", Language::En), Some(3));
        assert_eq!(numbered_selection("3rd", Language::En), Some(3));
        assert_eq!(numbered_selection("die zweite Option", Language::De), Some(2));
        assert_eq!(numbered_selection("zweiten", Language::De), Some(2));
        assert_eq!(numbered_selection("revenue", Language::En), None);
        assert_eq!(numbered_selection("1 2", Language::En), None);
    }

    #[test]
    fn test_only_german_declension_endings_count() {
        assert_eq!(parse_number("zweiten", Language::De), Some(2));
        assert_eq!(parse_number("dritter", Language::De), Some(3));
        assert_eq!(parse_number("erstes", Language::De), Some(1));
        assert_eq!(parse_number("achtel", Language::De), None);
        assert_eq!(parse_number("seconds", Language::En), None);
        assert_eq!(parse_number("thirds", Language::En), None);
        assert_eq!(parse_number("second", Language::En), Some(2));
        assert_eq!(numbered_selection("die achtel", Language::De), None);
    }

    #[test]
    fn test_pair_selection() {
        assert_eq!(pair_selection("1,3", Language::En), Some((1, 3)));
        assert_eq!(pair_selection("one and three", Language::En), Some((1, 3)));
        assert_eq!(pair_selection("eins und zwei", Language::De), Some((1, 2)));
        assert_eq!(pair_selection("3", Language::En), None);
    }

    #[test]
    fn test_number_selects_item() {
        let ranked = rank_options(
            "option two",
            &items(),
            &[],
            Language::En,
            &StringSimilarityMatcher,
            0.6,
        );
        match resolve(&ranked) {
            Resolution::Item(top) => assert_eq!(top.id, "m:quantity"),
            other => panic!("Expected Item, got {:?}", other),
        }
    }

    #[test]
    fn test_control_synonym_wins() {
        let ranked = rank_options(
            "go back",
            &items(),
            &[ControlIntent::Abort, ControlIntent::Exit],
            Language::En,
            &StringSimilarityMatcher,
            0.6,
        );
        match resolve(&ranked) {
            Resolution::Control(ControlIntent::Abort, _) => {}
            other => panic!("Expected Abort, got {:?}", other),
        }
    }

    #[test]
    fn test_no_match_below_threshold() {
        let ranked = rank_options(
            "xyzzy",
            &items(),
            &[],
            Language::En,
            &StringSimilarityMatcher,
            0.6,
        );
        assert_eq!(resolve(&ranked), Resolution::NoMatch);
    }

    #[test]
    fn test_ties_resolve_by_position_then_id() {
        let tied = vec![
            DisplayItem::new("b", "Sales", 2),
            DisplayItem::new("a", "Sales", 2),
            DisplayItem::new("c", "Sales", 1),
        ];
        for _ in 0..3 {
            let ranked = rank_options(
                "sales",
                &tied,
                &[],
                Language::En,
                &StringSimilarityMatcher,
                0.6,
            );
            let ids: Vec<_> = ranked.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["c", "a", "b"]);
        }
    }

    #[test]
    fn test_resolve_pair_by_numbers_and_text() {
        let left = vec![DisplayItem::new("m:revenue", "Revenue", 1)];
        let right = vec![
            DisplayItem::new("m:quantity", "Quantity", 1),
            DisplayItem::new("m:costs", "Costs", 2),
        ];
        let (current, replacement) =
            resolve_pair("1,2", &left, &right, Language::En, &StringSimilarityMatcher, 0.6)
                .unwrap();
        assert_eq!(current.id, "m:revenue");
        assert_eq!(replacement.id, "m:costs");

        let (current, replacement) = resolve_pair(
            "revenue with quantity",
            &left,
            &right,
            Language::En,
            &StringSimilarityMatcher,
            0.6,
        )
        .unwrap();
        assert_eq!(current.id, "m:revenue");
        assert_eq!(replacement.id, "m:quantity");
    }

    #[test]
    fn test_remainder() {
        assert_eq!(
            remainder("Drop measure Revenue", "drop measure").as_deref(),
            Some("revenue")
        );
        assert_eq!(remainder("drop measure", "drop measure"), None);
        assert_eq!(remainder("add measure", "xyz"), None);
    }
}
