use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use kappa_core::{KappaError, FITNESS_COLUMNS, VIABILITY_COLUMNS};
use kappa_graph::{CommunityMethod, InteractionNetwork};
use kappa_metrics::{
    cohesion_coefficient, detect_in_table, emergent_complexity, emergent_information,
    hierarchical_coherence, integration_index, modular_independence, modularity_from_membership,
    profile_many, validate_in_table, PredictionMethod, StateSet, SystemData,
};

use crate::cli::Command;
use crate::config::Settings;
use crate::input::{read_json, read_table, InformationInput, SystemSpec};

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to serialize result")
}

/// Execute one subcommand and return its JSON result record.
pub fn run(command: &Command, settings: &Settings) -> Result<Value> {
    let config = &settings.metrics;
    match command {
        Command::Integration { input } => {
            let network: InteractionNetwork = read_json(input)?;
            to_value(&integration_index(&network))
        }

        Command::Cohesion { input } => {
            let table = read_table(input, &VIABILITY_COLUMNS)?;
            to_value(&cohesion_coefficient(&table, &config.cohesion)?)
        }

        Command::Modularity {
            input,
            method,
            membership,
        } => {
            let network: InteractionNetwork = read_json(input)?;
            if let Some(path) = membership {
                let labels: Vec<usize> = read_json(path)?;
                return to_value(&modularity_from_membership(
                    &network,
                    &labels,
                    &config.modularity,
                )?);
            }
            let method = match method {
                Some(name) => name.parse::<CommunityMethod>()?,
                None => config.modularity.default_method,
            };
            to_value(&modular_independence(&network, method, &config.modularity))
        }

        Command::Emergence { input, method } => {
            let mut states: StateSet = read_json(input)?;
            if let Some(name) = method {
                states.method = name.parse::<PredictionMethod>()?;
            }
            to_value(&emergent_complexity(
                &states.components,
                states.collective,
                states.method,
                &config.emergence,
            ))
        }

        Command::Information { input } => {
            let data: InformationInput = read_json(input)?;
            to_value(&emergent_information(&data.components, &data.joint))
        }

        Command::Coherence { input } => {
            let table = read_table(input, &FITNESS_COLUMNS)?;
            to_value(&hierarchical_coherence(&table, &config.coherence)?)
        }

        Command::Threshold {
            input,
            predictor,
            outcome,
            initial_guess,
        } => {
            let table = read_table(input, &[predictor.as_str(), outcome.as_str()])?;
            let guess = initial_guess.unwrap_or(config.threshold.initial_guess);
            let result = detect_in_table(&table, predictor, outcome, guess, &config.threshold)?;
            to_value(&result)
        }

        Command::Validate {
            input,
            predictor,
            outcome,
        } => {
            let table = read_table(input, &[predictor.as_str(), outcome.as_str()])?;
            to_value(&validate_in_table(&table, predictor, outcome, &config.threshold)?)
        }

        Command::Profile { input } => {
            let specs: Vec<SystemSpec> = read_json(input)?;
            let systems: Vec<SystemData> = specs.into_iter().map(SystemData::from).collect();
            let names: Vec<String> = systems.iter().map(|s| s.name.clone()).collect();
            let results = profile_many(&systems, config);

            let mut out = Vec::with_capacity(results.len());
            for (name, result) in names.into_iter().zip(results) {
                match result {
                    Ok(profile) => out.push(to_value(&profile)?),
                    Err(e) => out.push(error_record(&name, &e)),
                }
            }
            info!("Profiled {} systems", out.len());
            Ok(Value::Array(out))
        }
    }
}

fn error_record(name: &str, error: &KappaError) -> Value {
    serde_json::json!({ "name": name, "error": error.to_string() })
}
