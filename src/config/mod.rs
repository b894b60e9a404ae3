//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → BreakerSettings handed to CircuitBreakerManager
//!     → ValidatorConfig handed to ResponseValidator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BreakerSettings;
pub use schema::CircuitBreakerConfig;
pub use schema::GuardConfig;
pub use schema::ObservabilityConfig;
pub use schema::PipelineConfig;
pub use schema::ValidatorConfig;
