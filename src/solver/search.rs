//! Branch-and-bound search for the best feasible subset of one cube's
//! candidates.
//!
//! Candidates are visited in canonical order and the "include" branch is
//! explored first, so the first leaf reached is the greedy assignment. An
//! assignment only replaces the incumbent when its score is strictly higher,
//! which makes the greedy-first, canonical-order assignment the winner of
//! every tie.

use super::score::SCORE_EPSILON;
use olap_dialogue_types::Similarity;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Search effort bound shared by all roots of one solve.
#[derive(Debug)]
pub struct Budget {
    max_steps: u64,
    deadline: Option<Instant>,
    steps: u64,
    exhausted: bool,
}

impl Budget {
    pub fn new(max_steps: u64, time_limit: Option<Duration>) -> Self {
        Self {
            max_steps,
            deadline: time_limit.map(|limit| Instant::now() + limit),
            steps: 0,
            exhausted: false,
        }
    }

    /// Count one search node. Returns `false` once the budget is spent.
    fn tick(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        self.steps += 1;
        if self.steps > self.max_steps {
            self.exhausted = true;
        } else if self.steps % 256 == 0 {
            if let Some(deadline) = self.deadline {
                self.exhausted = Instant::now() >= deadline;
            }
        }
        !self.exhausted
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

/// Best subset found for one root: indices into the pool and their score sum.
#[derive(Debug, Clone, PartialEq)]
pub struct RootResult {
    pub selected: Vec<usize>,
    pub score: f64,
}

fn qualifies_dimension(c: &Similarity) -> bool {
    c.element_type
        .slot_type()
        .is_some_and(|slot| slot.is_dimension_qualifying())
}

struct Search<'a> {
    pool: &'a [&'a Similarity],
    /// `suffix[i]` = sum of scores of `pool[i..]`.
    suffix: Vec<f64>,
    chosen: Vec<usize>,
    terms: HashSet<&'a str>,
    elements: HashSet<&'a str>,
    dimensions: HashSet<&'a str>,
    current: f64,
    best: RootResult,
}

impl<'a> Search<'a> {
    fn new(pool: &'a [&'a Similarity]) -> Self {
        let mut suffix = vec![0.0; pool.len() + 1];
        for i in (0..pool.len()).rev() {
            suffix[i] = suffix[i + 1] + pool[i].score;
        }
        Self {
            pool,
            suffix,
            chosen: Vec::new(),
            terms: HashSet::new(),
            elements: HashSet::new(),
            dimensions: HashSet::new(),
            current: 0.0,
            best: RootResult {
                selected: Vec::new(),
                score: 0.0,
            },
        }
    }

    fn compatible(&self, c: &Similarity) -> bool {
        if self.terms.contains(c.term.as_str()) || self.elements.contains(c.element.as_str()) {
            return false;
        }
        match &c.dimension {
            Some(dim) if qualifies_dimension(c) => !self.dimensions.contains(dim.as_str()),
            _ => true,
        }
    }

    fn push(&mut self, idx: usize) {
        let c = self.pool[idx];
        self.chosen.push(idx);
        self.terms.insert(c.term.as_str());
        self.elements.insert(c.element.as_str());
        if qualifies_dimension(c) {
            if let Some(dim) = &c.dimension {
                self.dimensions.insert(dim.as_str());
            }
        }
        self.current += c.score;
    }

    fn pop(&mut self) {
        if let Some(idx) = self.chosen.pop() {
            let c = self.pool[idx];
            self.terms.remove(c.term.as_str());
            self.elements.remove(c.element.as_str());
            if qualifies_dimension(c) {
                if let Some(dim) = &c.dimension {
                    self.dimensions.remove(dim.as_str());
                }
            }
            self.current -= c.score;
        }
    }

    fn record_if_better(&mut self) {
        if self.current > self.best.score + SCORE_EPSILON {
            self.best = RootResult {
                selected: self.chosen.clone(),
                score: self.current,
            };
        }
    }

    /// Take every compatible candidate in order.
    fn greedy(&mut self) {
        for idx in 0..self.pool.len() {
            if self.compatible(self.pool[idx]) {
                self.push(idx);
            }
        }
        self.record_if_better();
        while !self.chosen.is_empty() {
            self.pop();
        }
        self.current = 0.0;
    }

    fn branch(&mut self, idx: usize, budget: &mut Budget) {
        if !budget.tick() {
            return;
        }
        if self.current + self.suffix[idx] <= self.best.score + SCORE_EPSILON {
            return;
        }
        if idx == self.pool.len() {
            self.record_if_better();
            return;
        }
        if self.compatible(self.pool[idx]) {
            self.push(idx);
            self.branch(idx + 1, budget);
            self.pop();
        }
        self.branch(idx + 1, budget);
    }
}

/// Best feasible subset of `pool` (one root's candidates, canonical order).
///
/// The greedy assignment is always computed, so an exhausted budget still
/// yields a feasible answer.
pub fn best_subset(pool: &[&Similarity], budget: &mut Budget) -> RootResult {
    let mut search = Search::new(pool);
    search.greedy();
    search.branch(0, budget);
    search.best
}
