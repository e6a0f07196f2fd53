use serde::{Deserialize, Serialize};

use crate::table::{FieldValue, Table};

pub const COMPONENT_ID: &str = "component_id";
pub const VIABILITY_ISOLATED: &str = "viability_isolated";
pub const VIABILITY_INTEGRATED: &str = "viability_integrated";
pub const COLLECTIVE_ID: &str = "collective_id";
pub const FITNESS: &str = "fitness";

/// Columns a viability table must carry.
pub const VIABILITY_COLUMNS: [&str; 3] = [COMPONENT_ID, VIABILITY_ISOLATED, VIABILITY_INTEGRATED];

/// Columns a fitness table must carry.
pub const FITNESS_COLUMNS: [&str; 3] = [COLLECTIVE_ID, COMPONENT_ID, FITNESS];

/// Viability of one component measured alone and inside its collective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViabilityRecord {
    pub component_id: String,
    pub viability_isolated: Option<f64>,
    pub viability_integrated: Option<f64>,
}

impl ViabilityRecord {
    pub fn new(component_id: &str, isolated: f64, integrated: f64) -> Self {
        Self {
            component_id: component_id.to_string(),
            viability_isolated: Some(isolated),
            viability_integrated: Some(integrated),
        }
    }

    /// Collect records into a table with the standard viability schema.
    pub fn to_table(records: &[ViabilityRecord]) -> Table {
        Table::new("viability")
            .with_column(
                COMPONENT_ID,
                records.iter().map(|r| FieldValue::from(r.component_id.as_str())).collect::<Vec<_>>(),
            )
            .with_column(
                VIABILITY_ISOLATED,
                records.iter().map(|r| r.viability_isolated).collect::<Vec<_>>(),
            )
            .with_column(
                VIABILITY_INTEGRATED,
                records.iter().map(|r| r.viability_integrated).collect::<Vec<_>>(),
            )
    }
}

/// Fitness of one component, tagged with the collective it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessRecord {
    pub collective_id: String,
    pub component_id: String,
    pub fitness: Option<f64>,
}

impl FitnessRecord {
    pub fn new(collective_id: &str, component_id: &str, fitness: f64) -> Self {
        Self {
            collective_id: collective_id.to_string(),
            component_id: component_id.to_string(),
            fitness: Some(fitness),
        }
    }

    /// Collect records into a table with the standard fitness schema.
    pub fn to_table(records: &[FitnessRecord]) -> Table {
        Table::new("fitness")
            .with_column(
                COLLECTIVE_ID,
                records.iter().map(|r| FieldValue::from(r.collective_id.as_str())).collect::<Vec<_>>(),
            )
            .with_column(
                COMPONENT_ID,
                records.iter().map(|r| FieldValue::from(r.component_id.as_str())).collect::<Vec<_>>(),
            )
            .with_column(FITNESS, records.iter().map(|r| r.fitness).collect::<Vec<_>>())
    }
}
