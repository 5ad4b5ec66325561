pub mod config;
pub mod content;
pub mod error;
pub mod model;

pub use config::RefreshConfig;
pub use content::*;
pub use error::*;
pub use model::*;
