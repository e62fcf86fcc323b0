//! Domain layer - business logic and services

pub mod events;
pub mod repository;
pub mod service;
pub mod validation;

pub use events::{EventEmitter, LogDefinition, LogEmit, LogEvent, LogLevel, LogListener};
pub use repository::{RegistryStore, RegistryTables, Repository};
pub use service::Service;
pub use validation::{FieldDefinition, FieldKind};
