pub mod config;
pub mod diagnostic;
pub mod error;
pub mod records;
pub mod table;

pub use config::Config;
pub use diagnostic::*;
pub use error::*;
pub use records::*;
pub use table::*;
