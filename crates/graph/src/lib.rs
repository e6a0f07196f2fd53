pub mod community;
pub mod network;
pub mod stats;

pub use community::{detect_communities, modularity, CommunityMethod, Partition};
pub use network::{InteractionNetwork, NetworkSpec};
pub use stats::{network_stats, NetworkStats};
