pub mod allergens;
pub mod audit;
pub mod config;
pub mod constraints;
pub mod errors;
pub mod fixtures;
pub mod menu;
pub mod validation;
pub mod validators;

pub use allergens::{Allergen, AllergenSet};
pub use audit::{AuditRecord, AuditSink, InMemoryAuditSink, JsonlAuditSink};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use constraints::ConstraintExtractor;
pub use errors::MenuError;
pub use menu::{Dish, Menu, MenuIndex};
pub use validation::{
    Correction, ErrorKind, Severity, ValidationError, ValidationResult, Validator,
};
pub use validators::{AllergenValidator, PriceValidator};
