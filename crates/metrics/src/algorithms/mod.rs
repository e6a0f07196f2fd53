pub mod coherence;
pub mod cohesion;
pub mod emergence;
pub mod integration;
pub mod modularity;
pub mod proxy;
pub mod stats;
