pub mod config;
pub mod container;
pub mod errors;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::ContainerConfig;
pub use container::{
    activate, activate_with, select_constructor, Constructor, ContainerStats, Dependencies,
    Descriptor, Implements, Injectable, Scope, ScopeState, ServiceContainer, ServiceKey,
    ServiceLifetime,
};
pub use errors::{ConfigError, ConstructorProblem, ContainerError};
