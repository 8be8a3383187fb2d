pub mod config;
pub mod error;

pub use config::{BoundsPolicy, TreeConfig};
pub use error::{Result, TreeError};
