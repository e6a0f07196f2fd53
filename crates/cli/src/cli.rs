use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Integration metrics and threshold detection for biological systems.
///
/// Every command reads one JSON input file and prints its result record as
/// JSON on stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "kappa", version, about)]
pub struct CliArgs {
    /// YAML file with metric constants (overrides KAPPA_METRICS_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Integration Index of a network ({"adjacency": [[..]], "labels"?, "directed"?})
    Integration {
        input: PathBuf,
    },

    /// Cohesion Coefficient of a viability table (array of row objects)
    Cohesion {
        input: PathBuf,
    },

    /// Modular Independence of a network
    Modularity {
        input: PathBuf,
        /// Detection algorithm: louvain, walktrap or fast_greedy
        #[arg(long)]
        method: Option<String>,
        /// Score this membership (JSON array, one label per node) instead of detecting
        #[arg(long, conflicts_with = "method")]
        membership: Option<PathBuf>,
    },

    /// Emergent Complexity from component and collective values
    /// ({"components": [..], "collective": x, "method"?})
    Emergence {
        input: PathBuf,
        /// Additive prediction: sum, mean or max (overrides the file)
        #[arg(long)]
        method: Option<String>,
    },

    /// Information-theoretic emergence
    /// ({"components": [[..], ..], "joint": [..]})
    Information {
        input: PathBuf,
    },

    /// Hierarchical Coherence of a fitness table (array of row objects)
    Coherence {
        input: PathBuf,
    },

    /// Segmented-regression breakpoint of outcome on predictor
    Threshold {
        input: PathBuf,
        #[arg(long, default_value = "cohesion")]
        predictor: String,
        #[arg(long, default_value = "irreversible")]
        outcome: String,
        /// Breakpoint seed (defaults to the configured initial guess)
        #[arg(long)]
        initial_guess: Option<f64>,
    },

    /// Cross-check the breakpoint with logistic and curvature estimators
    Validate {
        input: PathBuf,
        #[arg(long, default_value = "cohesion")]
        predictor: String,
        #[arg(long, default_value = "irreversible")]
        outcome: String,
    },

    /// Run every applicable metric over a list of systems
    Profile {
        input: PathBuf,
    },
}
