pub mod config;
pub mod error;
pub mod types;

pub use config::MinutesConfig;
pub use error::{MinutesError, Result};
pub use types::*;
