//! JSON input files.
//!
//! Tables arrive as arrays of row objects; networks as `NetworkSpec`
//! objects; systems for `profile` bundle any of these.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use kappa_core::{Row, Table, FITNESS_COLUMNS, VIABILITY_COLUMNS};
use kappa_graph::{CommunityMethod, InteractionNetwork};
use kappa_metrics::{StateSet, SystemData};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load an array of row objects as a table named after the file stem. An
/// empty array becomes an empty table with the `schema` columns.
pub fn read_table(path: &Path, schema: &[&str]) -> Result<Table> {
    let rows: Vec<Row> = read_json(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());
    Ok(Table::from_rows(&name, &rows).with_empty_schema(schema))
}

#[derive(Debug, Deserialize)]
pub struct InformationInput {
    pub components: Vec<Vec<f64>>,
    pub joint: Vec<f64>,
}

/// One system in a `profile` input file.
#[derive(Debug, Deserialize)]
pub struct SystemSpec {
    pub name: String,
    #[serde(default)]
    pub network: Option<InteractionNetwork>,
    #[serde(default)]
    pub viability: Option<Vec<Row>>,
    #[serde(default)]
    pub fitness: Option<Vec<Row>>,
    #[serde(default)]
    pub states: Option<StateSet>,
    #[serde(default)]
    pub community_method: Option<CommunityMethod>,
}

impl From<SystemSpec> for SystemData {
    fn from(spec: SystemSpec) -> Self {
        SystemData {
            viability: spec
                .viability
                .map(|rows| Table::from_rows("viability", &rows).with_empty_schema(&VIABILITY_COLUMNS)),
            fitness: spec
                .fitness
                .map(|rows| Table::from_rows("fitness", &rows).with_empty_schema(&FITNESS_COLUMNS)),
            name: spec.name,
            network: spec.network,
            states: spec.states,
            community_method: spec.community_method,
        }
    }
}
