//! In-memory schema backing every collaborator.
//!
//! Word groups are plain 1-3 token n-grams and schema lookup is label string
//! similarity, which is enough to drive whole dialogues in tests and demos.

use super::{
    string_similarity, Annotator, BaseLevel, QueryExecutor, SchemaCatalog, SchemaLookup,
    ValueOptions,
};
use crate::collaborators::matcher::normalize;
use crate::dialogue::operation::{Edit, Target};
use crate::dialogue::Operation;
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use olap_dialogue_types::{
    renumber, AnalysisSituation, DisplayItem, ElementId, ElementType, Language, QueryResult,
    Similarity, SimpleSituation, SlotType, ALL_NODES, TOP_LEVEL,
};
use std::collections::{BTreeSet, HashMap};

/// Minimum label similarity for a schema candidate.
const LOOKUP_THRESHOLD: f64 = 0.75;

const MAX_NGRAM: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaElement {
    pub id: ElementId,
    pub label: String,
}

impl SchemaElement {
    fn new(id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    fn item(&self) -> DisplayItem {
        DisplayItem::new(self.id.clone(), self.label.clone(), 0)
    }
}

/// A dice node. Nodes without parent sit directly below "all".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDef {
    pub id: ElementId,
    pub label: String,
    pub level: ElementId,
    pub parent: Option<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionDef {
    pub id: ElementId,
    pub label: String,
    /// Coarsest first.
    pub levels: Vec<SchemaElement>,
    pub slice_conditions: Vec<SchemaElement>,
    pub nodes: Vec<NodeDef>,
}

impl DimensionDef {
    pub fn new(id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            levels: Vec::new(),
            slice_conditions: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Add a level finer than the ones added so far.
    pub fn level(mut self, id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        self.levels.push(SchemaElement::new(id, label));
        self
    }

    pub fn slice_condition(mut self, id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        self.slice_conditions.push(SchemaElement::new(id, label));
        self
    }

    pub fn node(
        mut self,
        id: impl Into<ElementId>,
        label: impl Into<String>,
        level: impl Into<ElementId>,
        parent: Option<&str>,
    ) -> Self {
        self.nodes.push(NodeDef {
            id: id.into(),
            label: label.into(),
            level: level.into(),
            parent: parent.map(str::to_string),
        });
        self
    }

    /// Index of `level` with "top" at 0 and the schema levels after it.
    fn level_rank(&self, level: &str) -> Option<usize> {
        if level == TOP_LEVEL {
            return Some(0);
        }
        self.levels.iter().position(|l| l.id == level).map(|i| i + 1)
    }

    fn level_item(&self, rank: usize, language: Language) -> DisplayItem {
        let (id, label) = match rank {
            0 => (
                TOP_LEVEL.to_string(),
                match language {
                    Language::En => format!("All {}", self.label),
                    Language::De => format!("Alle {}", self.label),
                },
            ),
            n => (self.levels[n - 1].id.clone(), self.levels[n - 1].label.clone()),
        };
        DisplayItem::new(id.clone(), label, 0)
            .with_dimension(self.id.clone())
            .with_level(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeDef {
    pub id: ElementId,
    pub label: String,
    pub measures: Vec<SchemaElement>,
    /// Aggregate measure predicates.
    pub filters: Vec<SchemaElement>,
    pub base_measure_conditions: Vec<SchemaElement>,
    pub dimensions: Vec<DimensionDef>,
}

impl CubeDef {
    pub fn new(id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            measures: Vec::new(),
            filters: Vec::new(),
            base_measure_conditions: Vec::new(),
            dimensions: Vec::new(),
        }
    }

    pub fn measure(mut self, id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        self.measures.push(SchemaElement::new(id, label));
        self
    }

    pub fn filter(mut self, id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        self.filters.push(SchemaElement::new(id, label));
        self
    }

    pub fn base_measure_condition(
        mut self,
        id: impl Into<ElementId>,
        label: impl Into<String>,
    ) -> Self {
        self.base_measure_conditions
            .push(SchemaElement::new(id, label));
        self
    }

    pub fn dimension(mut self, dimension: DimensionDef) -> Self {
        self.dimensions.push(dimension);
        self
    }

    fn dimension_def(&self, id: &str) -> Option<&DimensionDef> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    fn slot_elements(&self, slot: SlotType) -> &[SchemaElement] {
        match slot {
            SlotType::Measure => &self.measures,
            SlotType::MeasurePredicate => &self.filters,
            SlotType::BaseMeasurePredicate => &self.base_measure_conditions,
            _ => &[],
        }
    }

    /// Every labelled element of the cube with its type and dimension.
    fn elements(&self) -> Vec<(&SchemaElement, ElementType, Option<&str>)> {
        let mut out: Vec<(&SchemaElement, ElementType, Option<&str>)> = Vec::new();
        out.extend(self.measures.iter().map(|e| (e, ElementType::Measure, None)));
        out.extend(self.filters.iter().map(|e| (e, ElementType::MeasurePredicate, None)));
        out.extend(
            self.base_measure_conditions
                .iter()
                .map(|e| (e, ElementType::BaseMeasurePredicate, None)),
        );
        for dim in &self.dimensions {
            out.extend(
                dim.levels
                    .iter()
                    .map(|e| (e, ElementType::Level, Some(dim.id.as_str()))),
            );
            out.extend(
                dim.slice_conditions
                    .iter()
                    .map(|e| (e, ElementType::LevelPredicate, Some(dim.id.as_str()))),
            );
        }
        out
    }
}

/// Cubes held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCubeSchema {
    cubes: Vec<CubeDef>,
}

impl InMemoryCubeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cube(mut self, cube: CubeDef) -> Self {
        self.cubes.push(cube);
        self
    }

    fn cube_def(&self, id: &str) -> anyhow::Result<&CubeDef> {
        self.cubes
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("unknown cube '{}'", id))
    }

    fn slot_options(cube: &CubeDef, selected: &BTreeSet<ElementId>, slot: SlotType, edit: Edit) -> ValueOptions {
        let (chosen, free): (Vec<_>, Vec<_>) = cube
            .slot_elements(slot)
            .iter()
            .map(SchemaElement::item)
            .partition(|item| selected.contains(&item.id));
        split_options(chosen, free, edit)
    }

    fn slice_options(cube: &CubeDef, situation: &SimpleSituation, edit: Edit) -> ValueOptions {
        let mut chosen = Vec::new();
        let mut free = Vec::new();
        for dim in &cube.dimensions {
            let selected = situation
                .dimension_qualification(&dim.id)
                .map(|dq| &dq.slice_conditions);
            for sc in &dim.slice_conditions {
                let item = sc.item().with_dimension(dim.id.clone());
                if selected.is_some_and(|set| set.contains(&sc.id)) {
                    chosen.push(item);
                } else {
                    free.push(item);
                }
            }
        }
        split_options(chosen, free, edit)
    }

    fn granularity_options(
        cube: &CubeDef,
        situation: &SimpleSituation,
        finer: bool,
        language: Language,
    ) -> ValueOptions {
        let mut items = Vec::new();
        for dim in &cube.dimensions {
            let current = situation
                .dimension_qualification(&dim.id)
                .map_or(TOP_LEVEL, |dq| dq.granularity_level.as_str());
            let Some(rank) = dim.level_rank(current) else {
                continue;
            };
            let ranks: Vec<usize> = if finer {
                (rank + 1..=dim.levels.len()).collect()
            } else {
                (0..rank).rev().collect()
            };
            items.extend(ranks.into_iter().map(|r| dim.level_item(r, language)));
        }
        renumber(&mut items);
        ValueOptions::List(items)
    }

    fn dice_options(
        cube: &CubeDef,
        situation: &SimpleSituation,
        down: bool,
        language: Language,
    ) -> ValueOptions {
        let mut items = Vec::new();
        for dim in &cube.dimensions {
            let current = situation
                .dimension_qualification(&dim.id)
                .map_or(ALL_NODES, |dq| dq.dice_node.as_str());
            if down {
                let parent = (current != ALL_NODES).then_some(current);
                items.extend(
                    dim.nodes
                        .iter()
                        .filter(|n| n.parent.as_deref() == parent)
                        .map(|n| {
                            DisplayItem::new(n.id.clone(), n.label.clone(), 0)
                                .with_dimension(dim.id.clone())
                                .with_level(n.level.clone())
                        }),
                );
            } else if current != ALL_NODES {
                let parent = dim
                    .nodes
                    .iter()
                    .find(|n| n.id == current)
                    .and_then(|n| n.parent.as_ref())
                    .and_then(|p| dim.nodes.iter().find(|n| &n.id == p));
                let item = match parent {
                    Some(p) => DisplayItem::new(p.id.clone(), p.label.clone(), 0)
                        .with_level(p.level.clone()),
                    None => DisplayItem::new(ALL_NODES, dim.level_item(0, language).title, 0)
                        .with_level(TOP_LEVEL),
                };
                items.push(item.with_dimension(dim.id.clone()));
            }
        }
        renumber(&mut items);
        ValueOptions::List(items)
    }
}

/// Build the option lists for an edit from chosen and not yet chosen items.
fn split_options(mut chosen: Vec<DisplayItem>, mut free: Vec<DisplayItem>, edit: Edit) -> ValueOptions {
    renumber(&mut chosen);
    renumber(&mut free);
    match edit {
        Edit::Remove => ValueOptions::List(chosen),
        Edit::Replace => ValueOptions::TwoList {
            left: chosen,
            right: free,
        },
        Edit::Add | Edit::Set => ValueOptions::List(free),
    }
}

#[async_trait]
impl Annotator for InMemoryCubeSchema {
    async fn annotate(&self, _language: Language, text: &str) -> anyhow::Result<Vec<String>> {
        let normalized = normalize(text);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let mut groups = Vec::new();
        for size in 1..=MAX_NGRAM.min(tokens.len()) {
            for window in tokens.windows(size) {
                let group = window.join(" ");
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }
        Ok(groups)
    }
}

#[async_trait]
impl SchemaLookup for InMemoryCubeSchema {
    async fn schema_candidates(
        &self,
        _language: Language,
        word_groups: &[String],
    ) -> anyhow::Result<Vec<Similarity>> {
        let mut out = Vec::new();
        for group in word_groups {
            for cube in &self.cubes {
                let score = string_similarity(group, &cube.label);
                if score >= LOOKUP_THRESHOLD {
                    out.push(Similarity::cube(group.clone(), cube.id.clone(), score));
                }
                for (element, element_type, dimension) in cube.elements() {
                    let score = string_similarity(group, &element.label);
                    if score < LOOKUP_THRESHOLD {
                        continue;
                    }
                    let candidate = Similarity::new(
                        group.clone(),
                        cube.id.clone(),
                        element.id.clone(),
                        element_type,
                        score,
                    );
                    out.push(match dimension {
                        Some(dim) => candidate.with_dimension(dim),
                        None => candidate,
                    });
                }
            }
        }
        Ok(out)
    }

    async fn labels(
        &self,
        _language: Language,
        elements: &[ElementId],
    ) -> anyhow::Result<HashMap<ElementId, String>> {
        let mut labels = HashMap::new();
        for cube in &self.cubes {
            if elements.contains(&cube.id) {
                labels.entry(cube.id.clone()).or_insert_with(|| cube.label.clone());
            }
            for (element, _, _) in cube.elements() {
                if elements.contains(&element.id) {
                    labels
                        .entry(element.id.clone())
                        .or_insert_with(|| element.label.clone());
                }
            }
        }
        Ok(labels)
    }
}

#[async_trait]
impl SchemaCatalog for InMemoryCubeSchema {
    async fn cubes(&self, _language: Language) -> anyhow::Result<Vec<DisplayItem>> {
        let mut items: Vec<DisplayItem> = self
            .cubes
            .iter()
            .map(|c| DisplayItem::new(c.id.clone(), c.label.clone(), 0))
            .collect();
        renumber(&mut items);
        Ok(items)
    }

    async fn base_levels(&self, _language: Language, cube: &str) -> anyhow::Result<Vec<BaseLevel>> {
        let cube = self.cube_def(cube)?;
        Ok(cube
            .dimensions
            .iter()
            .filter_map(|d| {
                d.levels.last().map(|level| BaseLevel {
                    dimension: d.id.clone(),
                    level: level.id.clone(),
                })
            })
            .collect())
    }

    async fn value_options(
        &self,
        language: Language,
        situation: &SimpleSituation,
        operation: Operation,
    ) -> anyhow::Result<ValueOptions> {
        if operation == Operation::SelectCube {
            return Ok(ValueOptions::List(self.cubes(language).await?));
        }
        let Some(cube_id) = situation.cube.as_deref() else {
            bail!("{} needs a cube", operation);
        };
        let cube = self.cube_def(cube_id)?;
        let edit = operation.edit();
        Ok(match operation.target() {
            Target::Cube => ValueOptions::List(self.cubes(language).await?),
            Target::Slot(slot) => {
                let selected = situation.slot(slot).cloned().unwrap_or_default();
                Self::slot_options(cube, &selected, slot, edit)
            }
            Target::SliceCondition => Self::slice_options(cube, situation, edit),
            Target::Granularity => Self::granularity_options(
                cube,
                situation,
                operation == Operation::DrillDown,
                language,
            ),
            Target::DiceNode => Self::dice_options(
                cube,
                situation,
                operation == Operation::MoveDownDiceNode,
                language,
            ),
        })
    }
}

#[async_trait]
impl QueryExecutor for InMemoryCubeSchema {
    async fn execute(
        &self,
        _language: Language,
        situation: &AnalysisSituation,
    ) -> anyhow::Result<QueryResult> {
        let focus = situation.focus();
        let cube_id = focus.cube.as_deref().ok_or_else(|| anyhow!("no cube selected"))?;
        let cube = self.cube_def(cube_id)?;
        if focus.measures.is_empty() {
            bail!("no measures selected");
        }

        let mut columns = Vec::new();
        let mut row = Vec::new();
        for dq in focus.dimension_qualifications.values() {
            if dq.has_default_granularity() {
                continue;
            }
            let label = cube
                .dimension_def(&dq.dimension)
                .and_then(|d| d.levels.iter().find(|l| l.id == dq.granularity_level))
                .map_or_else(|| dq.granularity_level.clone(), |l| l.label.clone());
            columns.push(label);
            row.push(serde_json::Value::String("*".into()));
        }
        for measure in &focus.measures {
            let label = cube
                .measures
                .iter()
                .find(|m| &m.id == measure)
                .map_or_else(|| measure.clone(), |m| m.label.clone());
            columns.push(label);
            row.push(serde_json::json!(0));
        }
        Ok(QueryResult::new(columns, vec![row]))
    }
}
