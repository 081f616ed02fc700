//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use olap_dialogue::collaborators::{CubeDef, DimensionDef, QueryExecutor, SchemaLookup};
use olap_dialogue::types::{AnalysisSituation, ElementId, Language, QueryResult, Similarity};
use olap_dialogue::{DialogueConfig, DialogueServices, InMemoryCubeSchema};
use std::collections::HashMap;
use std::sync::Arc;

/// A sales cube with two dimensions, filters and dice nodes.
pub fn sales_schema() -> InMemoryCubeSchema {
    InMemoryCubeSchema::new()
        .cube(
            CubeDef::new("cube:sales", "Sales")
                .measure("m:revenue", "Revenue")
                .measure("m:quantity", "Quantity")
                .measure("m:costs", "Costs")
                .filter("f:highRevenue", "High revenue")
                .dimension(
                    DimensionDef::new("dim:time", "Time")
                        .level("l:year", "Year")
                        .level("l:month", "Month")
                        .slice_condition("sc:recent", "Recent years")
                        .node("n:2020", "2020", "l:year", None)
                        .node("n:2021", "2021", "l:year", None),
                )
                .dimension(
                    DimensionDef::new("dim:geo", "Geography")
                        .level("l:country", "Country")
                        .level("l:city", "City"),
                ),
        )
        .cube(
            CubeDef::new("cube:stock", "Stock")
                .measure("m:stockLevel", "Stock level")
                .dimension(DimensionDef::new("dim:product", "Product").level("l:product", "Product")),
        )
}

pub fn services() -> DialogueServices {
    DialogueServices::in_memory(sales_schema())
}

pub fn config() -> DialogueConfig {
    DialogueConfig::default()
}

/// Query executor that always fails.
pub struct FailingExecutor;

#[async_trait]
impl QueryExecutor for FailingExecutor {
    async fn execute(
        &self,
        _language: Language,
        _situation: &AnalysisSituation,
    ) -> anyhow::Result<QueryResult> {
        anyhow::bail!("warehouse unreachable")
    }
}

/// Schema lookup whose label service is down.
pub struct LabelsDown(pub Arc<InMemoryCubeSchema>);

#[async_trait]
impl SchemaLookup for LabelsDown {
    async fn schema_candidates(
        &self,
        language: Language,
        word_groups: &[String],
    ) -> anyhow::Result<Vec<Similarity>> {
        self.0.schema_candidates(language, word_groups).await
    }

    async fn labels(
        &self,
        _language: Language,
        _elements: &[ElementId],
    ) -> anyhow::Result<HashMap<ElementId, String>> {
        anyhow::bail!("label index offline")
    }
}

/// Schema lookup that always fails.
pub struct LookupDown;

#[async_trait]
impl SchemaLookup for LookupDown {
    async fn schema_candidates(
        &self,
        _language: Language,
        _word_groups: &[String],
    ) -> anyhow::Result<Vec<Similarity>> {
        anyhow::bail!("graph store unreachable")
    }

    async fn labels(
        &self,
        _language: Language,
        _elements: &[ElementId],
    ) -> anyhow::Result<HashMap<ElementId, String>> {
        Ok(HashMap::new())
    }
}
