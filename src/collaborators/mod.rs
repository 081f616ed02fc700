//! External services the dialogue engine depends on.
//!
//! These are pure service contracts. The engine never talks to an NLP
//! pipeline, a graph store or a query engine directly; a host wires concrete
//! implementations into [`DialogueServices`]. In-memory implementations live
//! in [`memory`] and a string-similarity option matcher in [`matcher`].

pub mod matcher;
pub mod memory;

use crate::dialogue::Operation;
use async_trait::async_trait;
use olap_dialogue_types::{
    AnalysisSituation, DisplayItem, ElementId, Language, QueryResult, Similarity, SimpleSituation,
};
use std::collections::HashMap;
use std::sync::Arc;

pub use matcher::{string_similarity, OptionMatch, StringSimilarityMatcher};
pub use memory::{CubeDef, DimensionDef, InMemoryCubeSchema};

/// Splits a sentence into word groups used as lookup units.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, language: Language, text: &str) -> anyhow::Result<Vec<String>>;
}

/// Schema-based similarity search.
#[async_trait]
pub trait SchemaLookup: Send + Sync {
    /// Scored schema candidates for the given word groups.
    async fn schema_candidates(
        &self,
        language: Language,
        word_groups: &[String],
    ) -> anyhow::Result<Vec<Similarity>>;

    /// Display labels of schema elements. Unknown ids are left out.
    async fn labels(
        &self,
        language: Language,
        elements: &[ElementId],
    ) -> anyhow::Result<HashMap<ElementId, String>>;
}

/// Coarsest-to-finest default granularity for one dimension of a cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseLevel {
    pub dimension: ElementId,
    pub level: ElementId,
}

/// Values the user can choose from for an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueOptions {
    List(Vec<DisplayItem>),
    /// Replace one of `left` (current selections) with one of `right`.
    TwoList {
        left: Vec<DisplayItem>,
        right: Vec<DisplayItem>,
    },
}

impl ValueOptions {
    /// Nothing to choose from.
    pub fn is_empty(&self) -> bool {
        match self {
            ValueOptions::List(items) => items.is_empty(),
            ValueOptions::TwoList { left, right } => left.is_empty() || right.is_empty(),
        }
    }
}

/// Schema browsing used to build value displays.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    async fn cubes(&self, language: Language) -> anyhow::Result<Vec<DisplayItem>>;

    async fn base_levels(&self, language: Language, cube: &str) -> anyhow::Result<Vec<BaseLevel>>;

    async fn value_options(
        &self,
        language: Language,
        situation: &SimpleSituation,
        operation: Operation,
    ) -> anyhow::Result<ValueOptions>;
}

/// String similarity of free text against a finite option list.
pub trait OptionMatcher: Send + Sync {
    fn option_candidates(&self, input: &str, options: &[DisplayItem]) -> Vec<OptionMatch>;
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        language: Language,
        situation: &AnalysisSituation,
    ) -> anyhow::Result<QueryResult>;
}

/// Collaborators handed to every session's state machine.
#[derive(Clone)]
pub struct DialogueServices {
    pub annotator: Arc<dyn Annotator>,
    pub schema: Arc<dyn SchemaLookup>,
    pub catalog: Arc<dyn SchemaCatalog>,
    pub matcher: Arc<dyn OptionMatcher>,
    pub executor: Arc<dyn QueryExecutor>,
}

impl DialogueServices {
    /// All schema services backed by one in-memory schema.
    pub fn in_memory(schema: InMemoryCubeSchema) -> Self {
        let schema = Arc::new(schema);
        Self {
            annotator: schema.clone(),
            schema: schema.clone(),
            catalog: schema.clone(),
            matcher: Arc::new(StringSimilarityMatcher::default()),
            executor: schema,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_schema_lookup(mut self, schema: Arc<dyn SchemaLookup>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_annotator(mut self, annotator: Arc<dyn Annotator>) -> Self {
        self.annotator = annotator;
        self
    }
}

impl std::fmt::Debug for DialogueServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueServices").finish_non_exhaustive()
    }
}
