//! Integration metrics for biological systems and detection of the
//! cohesion threshold at which integration becomes irreversible.

pub mod algorithms;
pub mod config;
pub mod engine;
pub mod threshold;

pub use algorithms::coherence::{
    coherence_proxy, fitness_table_from_groups, hierarchical_coherence, CoherenceResult,
};
pub use algorithms::cohesion::{cohesion_coefficient, cohesion_proxy, CohesionResult};
pub use algorithms::emergence::{
    emergent_complexity, emergent_information, EmergenceResult, InformationEmergenceResult,
    PredictionMethod,
};
pub use algorithms::integration::{integration_index, IntegrationResult};
pub use algorithms::modularity::{
    modular_independence, modularity_from_membership, rescale_modularity, ModularityResult,
};
pub use algorithms::proxy::ProxyEstimate;
pub use config::{
    CoherenceConfig, CohesionConfig, EmergenceConfig, MetricsConfig, ModularityConfig,
    ThresholdConfig,
};
pub use engine::{profile_many, IntegrationProfile, StateSet, SystemData};
pub use threshold::{
    detect, detect_in_table, validate_in_table, validate_multi_method, MultiMethodValidation,
    ThresholdDataset, ThresholdResult,
};
