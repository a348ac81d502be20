pub mod config;
pub mod error;
pub mod factory;
pub mod providers;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::ScoringError;
pub use factory::*;
pub use traits::*;
pub use types::*;
